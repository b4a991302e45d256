//! One UCI search over a transport
//!
//! The session writes the whole handshake up front, then polls the shared
//! output buffer until a `bestmove` line shows up or the poll budget runs
//! out. It always finishes by sending `quit` and closing stdin.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::transport::{EngineProcess, ExitReport, OutputBuffer, Transport};

/// Marker that ends a search.
pub const BESTMOVE_MARKER: &str = "bestmove ";

/// How long a session waits for `bestmove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_polls: 300,
        }
    }
}

impl SessionLimits {
    /// Total time the poller waits before giving up.
    pub fn budget(&self) -> Duration {
        self.poll_interval * self.max_polls
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    /// The process exited before the poller finished.
    Running,
    BestMoveSeen,
    TimedOut,
    /// Writing to the engine failed.
    StreamClosed,
}

/// A search to run.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    /// Command that starts the engine.
    pub engine_command: &'a str,
    /// The `position ...` command.
    pub position_command: &'a str,
    pub depth: u32,
    pub limits: SessionLimits,
}

/// Runs one search and returns everything the engine printed.
///
/// Once the transcript holds a best move the session succeeds, even if the
/// engine then exits badly. Without one, a used-up poll budget is a timeout
/// and a bad exit is an engine failure. An engine that exits cleanly without
/// a best move gives a transcript with no best move.
pub async fn run_search<T: Transport>(transport: &T, search: SearchRequest<'_>) -> Result<String> {
    let EngineProcess { stdin, output, mut exit } =
        transport.spawn(search.engine_command).await?;

    let poller = drive(stdin, &output, &search);
    tokio::pin!(poller);

    let (state, exited) = tokio::select! {
        state = &mut poller => (state, (&mut exit).await),
        exited = &mut exit => (PollState::Running, exited),
    };

    let transcript = output.snapshot();
    let failure = match exited {
        Ok(report) if report.success() => None,
        Ok(report) => Some(exit_error(search.engine_command, &report)),
        Err(e) => Some(e),
    };

    if transcript.contains(BESTMOVE_MARKER) {
        if let Some(err) = failure {
            tracing::warn!(error = %err, "engine exited badly after its best move");
        }
        return Ok(transcript);
    }
    if state == PollState::TimedOut {
        return Err(Error::AnalysisTimeout(search.limits.budget()));
    }
    match failure {
        Some(err) => Err(err),
        None => {
            tracing::debug!(?state, "engine finished without a best move");
            Ok(transcript)
        }
    }
}

fn exit_error(command: &str, report: &ExitReport) -> Error {
    if report.command_not_found() {
        Error::EngineStart(format!("{}: {}", command, report))
    } else {
        Error::Engine(report.to_string())
    }
}

async fn drive(
    mut stdin: Box<dyn AsyncWrite + Send + Unpin>,
    output: &OutputBuffer,
    search: &SearchRequest<'_>,
) -> PollState {
    let go = format!("go depth {}", search.depth);
    let handshake = [
        "uci",
        "isready",
        "ucinewgame",
        "isready",
        search.position_command,
        go.as_str(),
    ];

    let mut state = PollState::Running;
    for command in handshake {
        tracing::debug!(command, "uci >");
        if let Err(e) = send(&mut stdin, command).await {
            tracing::warn!(command, error = %e, "failed to write to engine");
            state = PollState::StreamClosed;
            break;
        }
    }

    let mut polls = 0;
    while state == PollState::Running {
        if output.contains(BESTMOVE_MARKER) {
            state = PollState::BestMoveSeen;
        } else if polls >= search.limits.max_polls {
            state = PollState::TimedOut;
        } else {
            tokio::time::sleep(search.limits.poll_interval).await;
            polls += 1;
        }
    }

    // the engine may already be gone
    let _ = send(&mut stdin, "quit").await;
    let _ = stdin.shutdown().await;
    state
}

async fn send<W: AsyncWrite + Unpin + ?Sized>(stdin: &mut W, command: &str) -> std::io::Result<()> {
    stdin.write_all(command.as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::{EngineScript, ScriptedTransport};

    const SEARCH: &str = "info depth 12 score cp 35 nodes 81245 nps 812450 pv e2e4 e7e5\nbestmove e2e4 ponder e7e5\n";

    fn fast() -> SessionLimits {
        SessionLimits {
            poll_interval: Duration::from_millis(5),
            max_polls: 20,
        }
    }

    fn search(limits: SessionLimits) -> SearchRequest<'static> {
        SearchRequest {
            engine_command: "stockfish",
            position_command: "position startpos moves e2e4",
            depth: 12,
            limits,
        }
    }

    #[test]
    fn test_default_limits() {
        let limits = SessionLimits::default();
        assert_eq!(limits.budget(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_command_sequence() {
        let transport = ScriptedTransport::new(EngineScript::answering(SEARCH));
        let transcript = run_search(&transport, search(fast())).await.unwrap();

        assert!(transcript.contains("uciok"));
        assert!(transcript.contains("bestmove e2e4"));
        assert_eq!(
            transport.sent(),
            vec![
                "uci",
                "isready",
                "ucinewgame",
                "isready",
                "position startpos moves e2e4",
                "go depth 12",
                "quit",
            ]
        );
    }

    #[tokio::test]
    async fn test_bad_exit_after_best_move_is_ignored() {
        let transport = ScriptedTransport::new(EngineScript::answering(SEARCH).exit_code(1));
        let transcript = run_search(&transport, search(fast())).await.unwrap();
        assert!(transcript.contains("bestmove e2e4"));
    }

    #[tokio::test]
    async fn test_crash_with_best_move_succeeds() {
        let script = EngineScript::answering(SEARCH).exit_code(139).crash_after_search();
        let transport = ScriptedTransport::new(script);
        assert!(run_search(&transport, search(fast())).await.is_ok());
    }

    #[tokio::test]
    async fn test_crash_without_best_move_is_engine_error() {
        let script = EngineScript::answering("info depth 3 score cp 5 pv e2e4\n")
            .exit_code(1)
            .crash_after_search();
        let transport = ScriptedTransport::new(script);
        let err = run_search(&transport, search(fast())).await.unwrap_err();
        assert!(matches!(err, Error::Engine(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_missing_exit_status_is_engine_error() {
        let mut script = EngineScript::answering("").crash_after_search();
        script.exit_code = None;
        let transport = ScriptedTransport::new(script);
        let err = run_search(&transport, search(fast())).await.unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
    }

    #[tokio::test]
    async fn test_command_not_found_exit_is_start_error() {
        let script = EngineScript::answering("").exit_code(127).crash_after_search();
        let transport = ScriptedTransport::new(script);
        let err = run_search(&transport, search(fast())).await.unwrap_err();
        assert!(matches!(err, Error::EngineStart(_)));
    }

    #[tokio::test]
    async fn test_silent_engine_times_out() {
        let transport = ScriptedTransport::new(EngineScript::answering("info depth 1\n"));
        let err = run_search(&transport, search(fast())).await.unwrap_err();
        match err {
            Error::AnalysisTimeout(budget) => assert_eq!(budget, Duration::from_millis(100)),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(transport.sent().last().map(String::as_str), Some("quit"));
    }

    #[tokio::test]
    async fn test_clean_exit_without_best_move() {
        let script = EngineScript::answering("info string no legal moves\n").crash_after_search();
        let transport = ScriptedTransport::new(script);
        let transcript = run_search(&transport, search(fast())).await.unwrap();
        assert!(!transcript.contains(BESTMOVE_MARKER));
    }

    #[tokio::test]
    async fn test_transport_failures_pass_through() {
        let err = run_search(&ScriptedTransport::failing_connect(), search(fast()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection(_)));

        let err = run_search(&ScriptedTransport::failing_start(), search(fast()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EngineStart(_)));
    }
}
