//! UCI engine interaction

pub mod evaluation;
pub mod parser;
pub mod session;

pub use evaluation::{eval_bar, Evaluation};
pub use parser::{parse_best_move, parse_engine_info, EngineInfo};
pub use session::{run_search, SearchRequest, SessionLimits, BESTMOVE_MARKER};
