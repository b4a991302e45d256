//! In-memory engine for tests
//!
//! Answers the UCI handshake, prints a canned search on `go` and records
//! every command it receives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};

use super::{EngineProcess, ExitReport, ExitWatch, OutputBuffer, Transport};
use crate::error::{Error, Result};

/// How the scripted engine behaves.
#[derive(Debug, Clone, Default)]
pub struct EngineScript {
    /// Printed in response to `go`.
    pub search_output: String,
    /// `None` ends the process without a status.
    pub exit_code: Option<i32>,
    /// Exit right after printing the search instead of waiting for `quit`.
    pub crash_after_search: bool,
    /// Ignore `quit` and end of input and never exit.
    pub hang: bool,
    pub fail_connect: bool,
    pub fail_start: bool,
}

impl EngineScript {
    /// An engine that prints `search_output` and exits cleanly on `quit`.
    pub fn answering(search_output: &str) -> Self {
        Self {
            search_output: search_output.to_string(),
            exit_code: Some(0),
            ..Self::default()
        }
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn crash_after_search(mut self) -> Self {
        self.crash_after_search = true;
        self
    }

    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: EngineScript,
    sent: Arc<Mutex<Vec<String>>>,
    spawns: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

/// Counts a running scripted engine until its task ends or is aborted.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn enter(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live.clone())
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    pub fn new(script: EngineScript) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    pub fn failing_connect() -> Self {
        Self::new(EngineScript {
            fail_connect: true,
            ..EngineScript::default()
        })
    }

    pub fn failing_start() -> Self {
        Self::new(EngineScript {
            fail_start: true,
            ..EngineScript::default()
        })
    }

    /// Every line the engine received, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of spawn attempts.
    pub fn spawns(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }

    /// Engines whose task is still running. Drops to zero once every
    /// engine has exited or been aborted.
    pub fn live_engines(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    async fn spawn(&self, command: &str) -> Result<EngineProcess> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_connect {
            return Err(Error::Connection("scripted host unreachable".into()));
        }
        if self.script.fail_start {
            return Err(Error::EngineStart(format!("{}: command not found", command)));
        }

        let (stdin, feed) = tokio::io::duplex(4096);
        let output = OutputBuffer::default();
        let task = tokio::spawn(run(
            self.script.clone(),
            feed,
            output.clone(),
            self.sent.clone(),
            LiveGuard::enter(&self.live),
        ));

        Ok(EngineProcess {
            stdin: Box::new(stdin),
            output,
            exit: ExitWatch::new(task),
        })
    }

    async fn probe(&self) -> Result<()> {
        if self.script.fail_connect {
            return Err(Error::Connection("scripted host unreachable".into()));
        }
        Ok(())
    }
}

async fn run(
    script: EngineScript,
    feed: DuplexStream,
    output: OutputBuffer,
    sent: Arc<Mutex<Vec<String>>>,
    _live: LiveGuard,
) -> Result<ExitReport> {
    let mut lines = BufReader::new(feed).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        sent.lock().unwrap_or_else(PoisonError::into_inner).push(line.clone());

        match line.split_whitespace().next() {
            Some("uci") => output.append(b"id name Scripted Engine\nuciok\n"),
            Some("isready") => output.append(b"readyok\n"),
            Some("go") => {
                output.append(script.search_output.as_bytes());
                if script.crash_after_search {
                    break;
                }
            }
            Some("quit") if !script.hang => break,
            _ => {}
        }
    }

    if script.hang {
        std::future::pending::<()>().await;
    }
    Ok(ExitReport {
        code: script.exit_code,
        signal: None,
    })
}
