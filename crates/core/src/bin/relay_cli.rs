//! Command-line client for the relay service

use std::env;
use std::process;

use chess_relay_core::client::{RelayClient, DEFAULT_BASE_URL};
use chess_relay_core::{AnalyzeRequest, AnalyzeResult};

const BAR_WIDTH: usize = 50;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let mut args: Vec<String> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "relay_cli".to_string());

    let base = match take_option(&mut args, "--base") {
        Some(base) => base,
        None => env::var("RELAY_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
    };

    if args.len() < 2 {
        print_usage(&program);
        process::exit(1);
    }

    let client = match RelayClient::new(&base) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match args[1].as_str() {
        "health" => match client.health().await {
            Ok(()) => println!("{}: ok", client.base_url()),
            Err(e) => {
                eprintln!("{}: unhealthy ({})", client.base_url(), e);
                process::exit(1);
            }
        },
        "analyze" => {
            let Some(request) = build_request(&args[2..]) else {
                println!("Error: Please provide one of --fen, --pgn, --uci or --san");
                println!("Usage: {} analyze --fen \"<fen>\"", program);
                process::exit(1);
            };
            match client.analyze(&request).await {
                Ok(result) => print_result(&result),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            }
        }
        _ => {
            print_usage(&program);
            process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    println!("Usage: {} [--base <url>] <command> [arguments]", program);
    println!();
    println!("Commands:");
    println!("  health                      Check that the relay can reach its engine");
    println!("  analyze --fen \"<fen>\"       Analyze a position");
    println!("  analyze --pgn \"<pgn>\"       Analyze the final position of a game");
    println!("  analyze --uci \"<moves>\"     Analyze after UCI moves from the start");
    println!("  analyze --san \"<moves>\"     Analyze after SAN moves from the start");
    println!();
    println!("The base URL defaults to $RELAY_URL or {}.", DEFAULT_BASE_URL);
}

/// Removes `name <value>` from `args` and returns the value.
fn take_option(args: &mut Vec<String>, name: &str) -> Option<String> {
    let index = args.iter().position(|a| a == name)?;
    if index + 1 >= args.len() {
        args.remove(index);
        return None;
    }
    let value = args.remove(index + 1);
    args.remove(index);
    Some(value)
}

fn build_request(args: &[String]) -> Option<AnalyzeRequest> {
    let mut request = AnalyzeRequest::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter.next()?.clone();
        match flag.as_str() {
            "--fen" => request.fen = value,
            "--pgn" => request.pgn = value,
            "--uci" => request.uci = value,
            "--san" => request.san = value,
            _ => return None,
        }
    }
    (request != AnalyzeRequest::default()).then_some(request)
}

fn print_result(result: &AnalyzeResult) {
    println!();
    if result.best_move_san.is_empty() {
        println!("   Best move:  {}", result.best_move_uci);
    } else {
        println!("   Best move:  {} ({})", result.best_move_san, result.best_move_uci);
    }
    match result.evaluation() {
        Some(eval) => println!("   Evaluation: {}", eval),
        None => println!("   Evaluation: n/a"),
    }
    println!("   Depth:      {}", result.depth);
    if !result.pv.is_empty() {
        println!("   Line:       {}", result.pv.join(" "));
    }
    println!();
    println!("   {}", render_bar(result.eval_bar.unwrap_or(50)));
    println!();
}

fn render_bar(bar: u8) -> String {
    let bar = bar.min(100);
    let white = usize::from(bar) * BAR_WIDTH / 100;
    format!(
        "White {:>3}% {}{} {:>3}% Black",
        bar,
        "█".repeat(white),
        "░".repeat(BAR_WIDTH - white),
        100 - bar
    )
}
