//! Position evaluations from White's point of view

use std::fmt;

use shakmaty::Color;

use super::parser::EngineInfo;

/// Represents a position evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Centipawn score (positive = white advantage)
    Centipawns(i32),
    /// Forced mate (positive = white mates, negative = black mates)
    Mate(i32),
}

impl Evaluation {
    /// Reorients an engine score, which is relative to the side to move.
    /// A mate score takes precedence over a centipawn score.
    pub fn from_engine(info: &EngineInfo, side_to_move: Color) -> Option<Self> {
        let sign = match side_to_move {
            Color::White => 1,
            Color::Black => -1,
        };
        Self::from_parts(
            info.score_cp.map(|cp| cp.saturating_mul(sign)),
            info.score_mate.map(|m| m.saturating_mul(sign)),
        )
    }

    /// Builds an evaluation from already White-relative parts.
    pub fn from_parts(cp: Option<i32>, mate: Option<i32>) -> Option<Self> {
        match (mate, cp) {
            (Some(m), _) => Some(Evaluation::Mate(m)),
            (None, Some(cp)) => Some(Evaluation::Centipawns(cp)),
            (None, None) => None,
        }
    }

    pub fn centipawns(&self) -> Option<i32> {
        match self {
            Evaluation::Centipawns(cp) => Some(*cp),
            Evaluation::Mate(_) => None,
        }
    }

    pub fn mate(&self) -> Option<i32> {
        match self {
            Evaluation::Mate(m) => Some(*m),
            Evaluation::Centipawns(_) => None,
        }
    }

    /// White's share of the evaluation bar, 0 to 100.
    pub fn bar(&self) -> u8 {
        match self {
            Evaluation::Mate(m) if *m > 0 => 100,
            Evaluation::Mate(m) if *m < 0 => 0,
            // `mate 0` carries no side; treat it as level
            Evaluation::Mate(_) => 50,
            Evaluation::Centipawns(cp) => {
                let value = 50.0 + 50.0 * (f64::from(*cp) / 400.0).tanh();
                value.round().clamp(0.0, 100.0) as u8
            }
        }
    }
}

/// Evaluation bar for White-relative scores, `None` when there is no score.
pub fn eval_bar(cp: Option<i32>, mate: Option<i32>) -> Option<u8> {
    Evaluation::from_parts(cp, mate).map(|e| e.bar())
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => {
                let score = *cp as f32 / 100.0;
                if score >= 0.0 {
                    write!(f, "+{:.2}", score)
                } else {
                    write!(f, "{:.2}", score)
                }
            }
            Evaluation::Mate(moves) => write!(f, "M{}", moves),
        }
    }
}
