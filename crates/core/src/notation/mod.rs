//! Notation conversion
//!
//! Turns a request notation into the literal `position ...` command sent to
//! the engine plus the board it describes, and renders engine moves back
//! into SAN.

pub mod pgn;
pub mod san;

use shakmaty::{
    fen::Fen, san::SanPlus, uci::UciMove, CastlingMode, Chess, EnPassantMode, Position,
};

use crate::error::{Error, Result};
use crate::request::Notation;

pub use pgn::{replay_pgn, sanitize_pgn, PgnReplay};
pub use san::{clean_san_token, san_to_uci};

/// A position ready to be sent to the engine.
#[derive(Debug, Clone)]
pub struct ResolvedPosition {
    /// The literal `position ...` UCI command.
    pub command: String,
    /// The board the command describes.
    pub position: Chess,
}

/// Parses and validates a FEN string.
pub fn position_from_fen(fen: &str) -> Result<Chess> {
    let parsed: Fen = fen
        .trim()
        .parse()
        .map_err(|e| Error::InvalidPosition(format!("{}: {}", fen, e)))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| Error::InvalidPosition(format!("{}: {}", fen, e)))
}

/// Renders a position as FEN.
pub fn fen_of(position: &Chess) -> String {
    Fen::from_position(position, EnPassantMode::Legal).to_string()
}

/// Plays UCI moves from `start`, never touching `start` itself.
pub fn replay_uci<S: AsRef<str>>(start: &Chess, moves: &[S]) -> Result<Chess> {
    let mut position = start.clone();
    for token in moves {
        let token = token.as_ref();
        let uci: UciMove = token
            .parse()
            .map_err(|e| Error::InvalidMove(format!("{}: {}", token, e)))?;
        let mv = uci
            .to_move(&position)
            .map_err(|e| Error::InvalidMove(format!("{}: {}", token, e)))?;
        position = position
            .play(mv)
            .map_err(|e| Error::InvalidMove(format!("{}: {}", token, e)))?;
    }
    Ok(position)
}

/// Builds the engine command and board for `notation`.
pub fn resolve(notation: &Notation) -> Result<ResolvedPosition> {
    match notation {
        Notation::Pgn(text) => {
            let replay = replay_pgn(text)?;
            Ok(ResolvedPosition {
                command: format!("position fen {}", fen_of(&replay.position)),
                position: replay.position,
            })
        }
        Notation::Fen(fen) => {
            let (command, position) = base_position(Some(fen))?;
            Ok(ResolvedPosition { command, position })
        }
        Notation::San { base, moves } => {
            let (base_cmd, start) = base_position(base.as_deref())?;
            let (uci_moves, position) = san_to_uci(&start, moves)?;
            Ok(ResolvedPosition {
                command: format!("{} moves {}", base_cmd, uci_moves.join(" ")),
                position,
            })
        }
        Notation::Uci { base, moves } => {
            let (base_cmd, start) = base_position(base.as_deref())?;
            let tokens: Vec<&str> = moves.split_whitespace().collect();
            if tokens.is_empty() {
                return Ok(ResolvedPosition { command: base_cmd, position: start });
            }
            let position = replay_uci(&start, &tokens)?;
            Ok(ResolvedPosition {
                command: format!("{} moves {}", base_cmd, tokens.join(" ")),
                position,
            })
        }
    }
}

fn base_position(fen: Option<&str>) -> Result<(String, Chess)> {
    match fen {
        Some(fen) => {
            let position = position_from_fen(fen)?;
            Ok((format!("position fen {}", fen.trim()), position))
        }
        None => Ok(("position startpos".to_string(), Chess::default())),
    }
}

/// Renders a UCI move as SAN with a check or mate suffix. Returns an empty
/// string when the move is empty or does not decode in `position`.
pub fn uci_to_san(uci_move: &str, position: &Chess) -> String {
    let Ok(uci) = uci_move.trim().parse::<UciMove>() else {
        return String::new();
    };
    let Ok(mv) = uci.to_move(position) else {
        return String::new();
    };

    SanPlus::from_move(position.clone(), mv).to_string()
}
