//! PGN replay
//!
//! A PGN always collapses to the position reached after its mainline.

use pgn_reader::{RawTag, SanPlus, Skip, Visitor};
use regex::Regex;
use shakmaty::{Chess, Position};
use std::io::Cursor;
use std::ops::ControlFlow;
use std::sync::OnceLock;

use super::position_from_fen;
use crate::error::{Error, Result};

/// Final state of a replayed game.
#[derive(Debug, Clone)]
pub struct PgnReplay {
    pub position: Chess,
    pub plies: usize,
}

/// Strips tag pairs, comments, variations and NAGs from movetext.
pub fn sanitize_pgn(pgn: &str) -> String {
    static PATTERNS: OnceLock<[Regex; 4]> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [r"\[[^\]]*\]", r"\{[^}]*\}", r"\([^)]*\)", r"\$\d+"]
            .map(|p| Regex::new(p).expect("PGN sanitizer pattern should be valid"))
    });

    let mut text = pgn.to_string();
    for pattern in patterns {
        text = pattern.replace_all(&text, " ").into_owned();
    }
    text.replace('\r', "\n").trim().to_string()
}

/// Value of the first `[FEN "..."]` tag pair, if any.
pub fn setup_fen_tag(pgn: &str) -> Option<String> {
    static FEN_TAG: OnceLock<Regex> = OnceLock::new();
    let pattern = FEN_TAG.get_or_init(|| {
        Regex::new(r#"\[\s*FEN\s+"([^"]*)"\s*\]"#).expect("FEN tag pattern should be valid")
    });
    pattern
        .captures(pgn)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|fen| !fen.is_empty())
}

/// Replays the first game of `pgn`. The sanitized text is tried first,
/// starting from the game's `[FEN]` tag when it has one; if it does not
/// parse, the original text gets a second chance.
pub fn replay_pgn(pgn: &str) -> Result<PgnReplay> {
    let setup_fen = setup_fen_tag(pgn);
    match read_first_game(&sanitize_pgn(pgn), setup_fen) {
        Ok(replay) => Ok(replay),
        Err(e) => {
            tracing::debug!(error = %e, "sanitized PGN rejected, retrying original text");
            read_first_game(pgn, None)
        }
    }
}

fn read_first_game(text: &str, setup_fen: Option<String>) -> Result<PgnReplay> {
    let cursor = Cursor::new(text.as_bytes());
    let mut reader = pgn_reader::Reader::new(cursor);

    match reader.read_game(&mut GameReplay { setup_fen }) {
        Ok(Some(replay)) => replay,
        Ok(None) => Err(Error::InvalidPosition("no game found in PGN".into())),
        Err(e) => Err(Error::InvalidPosition(format!("PGN parse error: {}", e))),
    }
}

#[derive(Default)]
struct GameTags {
    setup_fen: Option<String>,
}

struct GameMoves {
    position: Chess,
    plies: usize,
    error: Option<Error>,
}

/// Replays the mainline. `setup_fen` is the start position used when the
/// game text itself carries no `[FEN]` tag.
struct GameReplay {
    setup_fen: Option<String>,
}

impl Visitor for GameReplay {
    type Tags = GameTags;
    type Movetext = GameMoves;
    type Output = Result<PgnReplay>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(GameTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        if name == b"FEN" {
            tags.setup_fen = Some(value.decode_utf8_lossy().to_string());
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let start = match tags.setup_fen.or_else(|| self.setup_fen.clone()) {
            Some(fen) => position_from_fen(&fen),
            None => Ok(Chess::default()),
        };

        let movetext = match start {
            Ok(position) => GameMoves { position, plies: 0, error: None },
            Err(e) => GameMoves { position: Chess::default(), plies: 0, error: Some(e) },
        };
        ControlFlow::Continue(movetext)
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        if movetext.error.is_some() {
            return ControlFlow::Continue(());
        }

        let ply = movetext.plies + 1;
        match san.san.to_move(&movetext.position) {
            Ok(m) => match movetext.position.clone().play(m) {
                Ok(next) => {
                    movetext.position = next;
                    movetext.plies = ply;
                }
                Err(e) => {
                    movetext.error = Some(Error::InvalidMove(format!("{} at ply {}: {}", san, ply, e)));
                }
            },
            Err(e) => {
                movetext.error = Some(Error::InvalidMove(format!("{} at ply {}: {}", san, ply, e)));
            }
        }

        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        _movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        match movetext.error {
            Some(e) => Err(e),
            None => Ok(PgnReplay {
                position: movetext.position,
                plies: movetext.plies,
            }),
        }
    }
}
