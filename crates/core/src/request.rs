//! Analyze request shapes

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Body of `POST /api/v1/analyze`. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    pub fen: String,
    pub pgn: String,
    pub uci: String,
    pub san: String,
}

/// What to do when more than one notation field is filled in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestPolicy {
    /// Exactly one field must be populated.
    #[default]
    Strict,
    /// PGN, then FEN with moves, then FEN, then SAN, then UCI.
    Lenient,
}

/// The single authoritative notation of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notation {
    Fen(String),
    Pgn(String),
    /// SAN move list, played from `base` or the standard start.
    San { base: Option<String>, moves: String },
    /// UCI move list, played from `base` or the standard start.
    Uci { base: Option<String>, moves: String },
}

impl AnalyzeRequest {
    pub fn fen(fen: impl Into<String>) -> Self {
        Self { fen: fen.into(), ..Self::default() }
    }

    pub fn pgn(pgn: impl Into<String>) -> Self {
        Self { pgn: pgn.into(), ..Self::default() }
    }

    pub fn uci(moves: impl Into<String>) -> Self {
        Self { uci: moves.into(), ..Self::default() }
    }

    pub fn san(moves: impl Into<String>) -> Self {
        Self { san: moves.into(), ..Self::default() }
    }

    /// Picks the authoritative notation according to `policy`.
    pub fn to_notation(&self, policy: RequestPolicy) -> Result<Notation> {
        let field = |v: &str| {
            let v = v.trim();
            (!v.is_empty()).then(|| v.to_string())
        };
        let fen = field(&self.fen);
        let pgn = field(&self.pgn);
        let uci = field(&self.uci);
        let san = field(&self.san);

        if fen.is_none() && pgn.is_none() && uci.is_none() && san.is_none() {
            return Err(Error::InvalidRequest("fen, pgn, uci or san required".into()));
        }

        let notation = match policy {
            RequestPolicy::Strict => match (pgn, fen, san, uci) {
                (Some(pgn), None, None, None) => Notation::Pgn(pgn),
                (None, Some(fen), None, None) => Notation::Fen(fen),
                (None, None, Some(moves), None) => Notation::San { base: None, moves },
                (None, None, None, Some(moves)) => Notation::Uci { base: None, moves },
                _ => {
                    return Err(Error::InvalidRequest(
                        "provide exactly one of: fen, pgn, uci, san".into(),
                    ))
                }
            },
            RequestPolicy::Lenient => match (pgn, fen, san, uci) {
                (Some(pgn), ..) => Notation::Pgn(pgn),
                (None, base, Some(moves), _) => Notation::San { base, moves },
                (None, base, None, Some(moves)) => Notation::Uci { base, moves },
                (None, Some(fen), None, None) => Notation::Fen(fen),
                (None, None, None, None) => {
                    return Err(Error::InvalidRequest("fen, pgn, uci or san required".into()))
                }
            },
        };
        Ok(notation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    #[test]
    fn test_empty_request_rejected() {
        for policy in [RequestPolicy::Strict, RequestPolicy::Lenient] {
            let err = AnalyzeRequest::default().to_notation(policy).unwrap_err();
            assert!(matches!(err, Error::InvalidRequest(_)));
        }
    }

    #[test]
    fn test_whitespace_only_counts_as_empty() {
        let req = AnalyzeRequest { fen: "  ".into(), san: "\n".into(), ..Default::default() };
        assert!(matches!(
            req.to_notation(RequestPolicy::Strict),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_strict_single_field() {
        assert_eq!(
            AnalyzeRequest::fen(AFTER_E4).to_notation(RequestPolicy::Strict).unwrap(),
            Notation::Fen(AFTER_E4.to_string())
        );
        assert_eq!(
            AnalyzeRequest::san(" e4 e5 ").to_notation(RequestPolicy::Strict).unwrap(),
            Notation::San { base: None, moves: "e4 e5".into() }
        );
        assert_eq!(
            AnalyzeRequest::uci("e2e4").to_notation(RequestPolicy::Strict).unwrap(),
            Notation::Uci { base: None, moves: "e2e4".into() }
        );
        assert_eq!(
            AnalyzeRequest::pgn("1. e4 *").to_notation(RequestPolicy::Strict).unwrap(),
            Notation::Pgn("1. e4 *".into())
        );
    }

    #[test]
    fn test_strict_rejects_multiple_fields() {
        let req = AnalyzeRequest { fen: AFTER_E4.into(), san: "e5".into(), ..Default::default() };
        let err = req.to_notation(RequestPolicy::Strict).unwrap_err();
        assert_eq!(err.to_string(), "provide exactly one of: fen, pgn, uci, san");
    }

    #[test]
    fn test_lenient_precedence() {
        let all = AnalyzeRequest {
            fen: AFTER_E4.into(),
            pgn: "1. d4 *".into(),
            uci: "e7e5".into(),
            san: "e5".into(),
        };
        assert_eq!(
            all.to_notation(RequestPolicy::Lenient).unwrap(),
            Notation::Pgn("1. d4 *".into())
        );

        let fen_and_moves = AnalyzeRequest { pgn: String::new(), ..all.clone() };
        assert_eq!(
            fen_and_moves.to_notation(RequestPolicy::Lenient).unwrap(),
            Notation::San { base: Some(AFTER_E4.into()), moves: "e5".into() }
        );

        let fen_and_uci = AnalyzeRequest { san: String::new(), ..fen_and_moves };
        assert_eq!(
            fen_and_uci.to_notation(RequestPolicy::Lenient).unwrap(),
            Notation::Uci { base: Some(AFTER_E4.into()), moves: "e7e5".into() }
        );
    }

    #[test]
    fn test_deserialize_partial_body() {
        let req: AnalyzeRequest = serde_json::from_str(r#"{"san":"e4 e5"}"#).unwrap();
        assert_eq!(req, AnalyzeRequest::san("e4 e5"));
    }
}
