//! SAN move lists

use shakmaty::{san::SanPlus, CastlingMode, Chess, Position};

use crate::error::{Error, Result};

const GAME_RESULTS: [&str; 3] = ["1-0", "0-1", "1/2-1/2"];

/// Reduces a whitespace-separated token to the move it carries, if any.
///
/// Move-number markers such as `12.` or `3...` yield `None`, a glued token
/// like `1.e4` yields `e4`, and game results are dropped.
pub fn clean_san_token(token: &str) -> Option<&str> {
    if token.is_empty() || GAME_RESULTS.contains(&token) || token.ends_with('.') {
        return None;
    }
    let token = match token.rfind('.') {
        Some(idx) => &token[idx + 1..],
        None => token,
    };
    (!token.is_empty()).then_some(token)
}

/// Decodes a SAN move list against `start`, returning the UCI encoding of
/// every move and the position reached after the last one.
pub fn san_to_uci(start: &Chess, san_moves: &str) -> Result<(Vec<String>, Chess)> {
    let mut position = start.clone();
    let mut uci_moves = Vec::new();

    for token in san_moves.split_whitespace().filter_map(clean_san_token) {
        let san: SanPlus = token
            .parse()
            .map_err(|e| Error::InvalidMove(format!("{}: {}", token, e)))?;
        let mv = san
            .san
            .to_move(&position)
            .map_err(|e| Error::InvalidMove(format!("{}: {}", token, e)))?;

        uci_moves.push(mv.to_uci(CastlingMode::Standard).to_string());
        position = position
            .play(mv)
            .map_err(|e| Error::InvalidMove(format!("{}: {}", token, e)))?;
    }

    if uci_moves.is_empty() {
        return Err(Error::InvalidMove("no SAN moves parsed".into()));
    }
    Ok((uci_moves, position))
}
