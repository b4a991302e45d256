//! UCI output parsing
//!
//! Both parsers are total: missing or malformed fields come back zeroed
//! rather than as errors.

use serde::Serialize;

/// Search statistics taken from a single `info` line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub depth: u32,
    pub nodes: u64,
    pub nps: u64,
    /// Centipawns from the side to move's point of view.
    pub score_cp: Option<i32>,
    /// Mate distance from the side to move's point of view.
    pub score_mate: Option<i32>,
    pub pv: Vec<String>,
}

impl EngineInfo {
    fn is_useful(&self) -> bool {
        !self.pv.is_empty() || self.score_cp.is_some() || self.score_mate.is_some()
    }
}

/// Returns the move of the first `bestmove` line, or an empty string.
pub fn parse_best_move(output: &str) -> String {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("bestmove "))
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string()
}

/// Finds the latest `info ... score ...` line that carries a score or a
/// principal variation.
pub fn parse_engine_info(output: &str) -> EngineInfo {
    output
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with("info ") && line.contains(" score "))
        .map(parse_info_line)
        .find(EngineInfo::is_useful)
        .unwrap_or_default()
}

/// Parses one `info` line. `pv` is the last field and swallows the rest. A
/// field whose value is missing or malformed consumes only its keyword.
pub fn parse_info_line(line: &str) -> EngineInfo {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut info = EngineInfo::default();
    let mut i = 0;

    while i < parts.len() {
        match parts[i] {
            "depth" => match parts.get(i + 1).map(|v| v.parse()) {
                Some(Ok(depth)) => {
                    info.depth = depth;
                    i += 2;
                }
                _ => i += 1,
            },
            "nodes" => match parts.get(i + 1).map(|v| v.parse()) {
                Some(Ok(nodes)) => {
                    info.nodes = nodes;
                    i += 2;
                }
                _ => i += 1,
            },
            "nps" => match parts.get(i + 1).map(|v| v.parse()) {
                Some(Ok(nps)) => {
                    info.nps = nps;
                    i += 2;
                }
                _ => i += 1,
            },
            "score" => {
                let value = parts.get(i + 2).and_then(|v| v.parse::<i32>().ok());
                match (parts.get(i + 1).copied(), value) {
                    (Some("cp"), Some(value)) => {
                        info.score_cp = Some(value);
                        i += 3;
                    }
                    (Some("mate"), Some(value)) => {
                        info.score_mate = Some(value);
                        i += 3;
                    }
                    _ => i += 1,
                }
            }
            "pv" => {
                info.pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            _ => {
                i += 1;
            }
        }
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOCKFISH_OUTPUT: &str = "\
Stockfish 16 by the Stockfish developers (see AUTHORS file)
id name Stockfish 16
uciok
readyok
readyok
info string NNUE evaluation using nn-5af11540bbfe.nnue enabled
info depth 1 seldepth 1 multipv 1 score cp 18 nodes 20 nps 10000 hashfull 0 tbhits 0 time 2 pv e2e4
info depth 2 seldepth 2 multipv 1 score cp 31 nodes 60 nps 30000 hashfull 0 tbhits 0 time 2 pv e2e4 e7e5
info depth 12 seldepth 16 multipv 1 score cp 35 nodes 81245 nps 812450 hashfull 30 tbhits 0 time 100 pv e2e4 e7e5 g1f3 b8c6
info depth 12 currmove d2d4 currmovenumber 2
bestmove e2e4 ponder e7e5
";

    #[test]
    fn test_parse_best_move() {
        assert_eq!(parse_best_move(STOCKFISH_OUTPUT), "e2e4");
        assert_eq!(parse_best_move("bestmove (none)\n"), "(none)");
        assert_eq!(parse_best_move("info depth 3 score cp 1 pv e2e4\n"), "");
        assert_eq!(parse_best_move(""), "");
    }

    #[test]
    fn test_latest_scored_line_wins() {
        let info = parse_engine_info(STOCKFISH_OUTPUT);
        assert_eq!(info.depth, 12);
        assert_eq!(info.nodes, 81245);
        assert_eq!(info.nps, 812450);
        assert_eq!(info.score_cp, Some(35));
        assert_eq!(info.score_mate, None);
        assert_eq!(info.pv, vec!["e2e4", "e7e5", "g1f3", "b8c6"]);
    }

    #[test]
    fn test_mate_score() {
        let info = parse_info_line("info depth 20 score mate -3 nodes 1000 nps 5000 pv h7h8 g8h8");
        assert_eq!(info.score_mate, Some(-3));
        assert_eq!(info.score_cp, None);
        assert_eq!(info.pv, vec!["h7h8", "g8h8"]);
    }

    #[test]
    fn test_bound_markers_ignored() {
        let info = parse_info_line("info depth 9 score cp -41 upperbound nodes 512 pv d7d5");
        assert_eq!(info.score_cp, Some(-41));
        assert_eq!(info.nodes, 512);
        assert_eq!(info.pv, vec!["d7d5"]);
    }

    #[test]
    fn test_malformed_fields_are_zeroed() {
        let info = parse_info_line("info depth deep score cp lots nodes -5 nps");
        assert_eq!(info, EngineInfo::default());
    }

    #[test]
    fn test_missing_value_keeps_next_field() {
        let info = parse_info_line("info depth score cp 5 nodes 10 pv e2e4");
        assert_eq!(info.depth, 0);
        assert_eq!(info.score_cp, Some(5));
        assert_eq!(info.nodes, 10);
        assert_eq!(info.pv, vec!["e2e4".to_string()]);

        let info = parse_info_line("info depth 9 score nodes 77 nps pv d2d4");
        assert_eq!(info.depth, 9);
        assert_eq!(info.score_cp, None);
        assert_eq!(info.nodes, 77);
        assert_eq!(info.nps, 0);
        assert_eq!(info.pv, vec!["d2d4".to_string()]);
    }

    #[test]
    fn test_trailing_pv_token_without_moves() {
        let info = parse_info_line("info depth 4 score cp 10 pv");
        assert_eq!(info.depth, 4);
        assert_eq!(info.score_cp, Some(10));
        assert!(info.pv.is_empty());
    }

    #[test]
    fn test_unscored_output_gives_empty_info() {
        let output = "info depth 1 currmove e2e4\ninfo string hello\nbestmove e2e4\n";
        assert_eq!(parse_engine_info(output), EngineInfo::default());
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let first = (parse_best_move(STOCKFISH_OUTPUT), parse_engine_info(STOCKFISH_OUTPUT));
        let second = (parse_best_move(STOCKFISH_OUTPUT), parse_engine_info(STOCKFISH_OUTPUT));
        assert_eq!(first, second);
    }

    #[test]
    fn test_crlf_output() {
        let output = "info depth 5 score cp 12 nodes 99 pv g1f3\r\nbestmove g1f3\r\n";
        assert_eq!(parse_best_move(output), "g1f3");
        assert_eq!(parse_engine_info(output).pv, vec!["g1f3"]);
    }
}
