//! Analysis orchestration
//!
//! Resolves the request notation, runs one engine search and turns the
//! transcript into an [`AnalyzeResult`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shakmaty::Position;
use tracing::info;

use crate::config::Config;
use crate::engine::{
    parse_best_move, parse_engine_info, run_search, Evaluation, SearchRequest, SessionLimits,
};
use crate::error::{Error, Result};
use crate::notation::{self, ResolvedPosition};
use crate::request::{AnalyzeRequest, Notation, RequestPolicy};
use crate::transport::Transport;

/// Result of one analysis. Scores are from White's point of view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    pub best_move_uci: String,
    #[serde(default)]
    pub best_move_san: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_cp: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_mate: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_bar: Option<u8>,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub nodes: u64,
    #[serde(default)]
    pub nps: u64,
    #[serde(default)]
    pub pv: Vec<String>,
    #[serde(default)]
    pub position_fen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl AnalyzeResult {
    /// Builds a result from an engine transcript for `resolved`.
    pub fn from_transcript(transcript: &str, resolved: &ResolvedPosition, include_raw: bool) -> Self {
        let best_move_uci = parse_best_move(transcript);
        let best_move_san = notation::uci_to_san(&best_move_uci, &resolved.position);
        let info = parse_engine_info(transcript);
        let evaluation = Evaluation::from_engine(&info, resolved.position.turn());

        Self {
            best_move_uci,
            best_move_san,
            evaluation_cp: evaluation.and_then(|e| e.centipawns()),
            evaluation_mate: evaluation.and_then(|e| e.mate()),
            eval_bar: evaluation.map(|e| e.bar()),
            depth: info.depth,
            nodes: info.nodes,
            nps: info.nps,
            pv: info.pv,
            position_fen: notation::fen_of(&resolved.position),
            raw: include_raw.then(|| transcript.to_string()),
        }
    }

    /// The White-relative evaluation, if the engine reported a score.
    pub fn evaluation(&self) -> Option<Evaluation> {
        Evaluation::from_parts(self.evaluation_cp, self.evaluation_mate)
    }
}

/// Knobs for a single analysis.
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    /// Command that starts the engine on the far side of the transport.
    pub engine_path: String,
    pub depth: u32,
    pub include_raw: bool,
    /// Upper bound for the whole session, dial included.
    pub request_timeout: Duration,
    pub limits: SessionLimits,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl AnalyzerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            engine_path: config.engine_path.clone(),
            depth: config.analysis_depth,
            include_raw: config.include_raw,
            request_timeout: config.request_timeout,
            limits: SessionLimits::default(),
        }
    }
}

/// Runs analyses over a transport. Holds no per-request state, so one
/// analyzer serves any number of concurrent requests.
pub struct Analyzer<T> {
    transport: T,
    settings: AnalyzerSettings,
}

impl<T: Transport> Analyzer<T> {
    pub fn new(transport: T, settings: AnalyzerSettings) -> Self {
        Self { transport, settings }
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Checks that an engine channel can be opened.
    pub async fn health(&self) -> Result<()> {
        self.transport.probe().await
    }

    /// Validates a wire request and analyzes it.
    pub async fn analyze_request(
        &self,
        request: &AnalyzeRequest,
        policy: RequestPolicy,
    ) -> Result<AnalyzeResult> {
        let notation = request.to_notation(policy)?;
        self.analyze(&notation).await
    }

    pub async fn analyze(&self, notation: &Notation) -> Result<AnalyzeResult> {
        let resolved = notation::resolve(notation)?;
        info!(
            depth = self.settings.depth,
            command = %resolved.command,
            "analyzing position"
        );

        let search = SearchRequest {
            engine_command: &self.settings.engine_path,
            position_command: &resolved.command,
            depth: self.settings.depth,
            limits: self.settings.limits,
        };
        let transcript = tokio::time::timeout(
            self.settings.request_timeout,
            run_search(&self.transport, search),
        )
        .await
        .map_err(|_| Error::AnalysisTimeout(self.settings.request_timeout))??;

        let result = AnalyzeResult::from_transcript(&transcript, &resolved, self.settings.include_raw);
        info!(
            best_move = %result.best_move_uci,
            depth = result.depth,
            eval_bar = ?result.eval_bar,
            "analysis complete"
        );
        Ok(result)
    }
}
