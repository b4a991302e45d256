//! Error types for chess-relay-core

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No usable notation field in the request.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("invalid position: {0}")]
    InvalidPosition(String),

    #[error("invalid move: {0}")]
    InvalidMove(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("failed to start engine: {0}")]
    EngineStart(String),

    /// The engine stream broke or the process exited badly without a best move.
    #[error("engine failure: {0}")]
    Engine(String),

    #[error("no best move within {0:?}")]
    AnalysisTimeout(Duration),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by the caller's input. The engine is never
    /// invoked for these.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequest(_) | Error::InvalidPosition(_) | Error::InvalidMove(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(Error::InvalidRequest("empty".into()).is_client_error());
        assert!(Error::InvalidPosition("bad fen".into()).is_client_error());
        assert!(Error::InvalidMove("e9".into()).is_client_error());

        assert!(!Error::Connection("refused".into()).is_client_error());
        assert!(!Error::EngineStart("not found".into()).is_client_error());
        assert!(!Error::AnalysisTimeout(Duration::from_secs(30)).is_client_error());
        assert!(!Error::Config("SSH_HOST and SSH_USER required".into()).is_client_error());
    }
}
