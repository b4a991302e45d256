//! Chess Relay Core Library
//!
//! Resolves chess notation into engine positions, drives a UCI engine over
//! SSH or a local pipe, and normalizes what the engine reports.

pub mod analyzer;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod notation;
pub mod request;
pub mod transport;

pub use analyzer::{AnalyzeResult, Analyzer, AnalyzerSettings};
pub use client::RelayClient;
pub use config::{Config, TransportKind};
pub use engine::{eval_bar, EngineInfo, Evaluation, SessionLimits};
pub use error::{Error, Result};
pub use request::{AnalyzeRequest, Notation, RequestPolicy};
pub use transport::{EngineTransport, Transport};
