//! Channels to an engine process
//!
//! A transport starts one engine process per call and hands back its stdin,
//! a shared buffer that accumulates everything the process prints, and a
//! future that resolves when the process has exited.

pub mod local;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
pub mod ssh;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;

use crate::config::{Config, TransportKind};
use crate::error::{Error, Result};

pub use local::LocalTransport;
pub use ssh::SshTransport;

/// Something that can start an engine process.
pub trait Transport: Send + Sync {
    /// Opens a fresh channel and starts `command` on it.
    fn spawn(&self, command: &str) -> impl Future<Output = Result<EngineProcess>> + Send;

    /// Establishes and releases a channel without starting anything.
    fn probe(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Handles to a running engine process.
pub struct EngineProcess {
    pub stdin: Box<dyn AsyncWrite + Send + Unpin>,
    pub output: OutputBuffer,
    pub exit: ExitWatch,
}

/// Append-only record of everything the process wrote to stdout and stderr.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer(Arc<Mutex<Vec<u8>>>);

impl OutputBuffer {
    pub fn append(&self, bytes: &[u8]) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
    }

    pub fn contains(&self, needle: &str) -> bool {
        let needle = needle.as_bytes();
        if needle.is_empty() {
            return true;
        }
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .windows(needle.len())
            .any(|window| window == needle)
    }

    pub fn snapshot(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// How a process ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitReport {
    /// `None` when the process vanished without reporting a status.
    pub code: Option<i32>,
    pub signal: Option<String>,
}

impl ExitReport {
    pub fn code(code: i32) -> Self {
        Self { code: Some(code), signal: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Shell convention for "command not found".
    pub fn command_not_found(&self) -> bool {
        self.code == Some(127)
    }
}

impl std::fmt::Display for ExitReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, &self.signal) {
            (_, Some(signal)) => write!(f, "killed by signal {}", signal),
            (Some(code), None) => write!(f, "exit status {}", code),
            (None, None) => write!(f, "exited without a status"),
        }
    }
}

/// Resolves with the exit report once the process is gone and its output
/// drained. Dropping the watch tears the process and its channel down.
pub struct ExitWatch(JoinHandle<Result<ExitReport>>);

impl ExitWatch {
    pub fn new(task: JoinHandle<Result<ExitReport>>) -> Self {
        Self(task)
    }
}

impl Future for ExitWatch {
    type Output = Result<ExitReport>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx).map(|joined| match joined {
            Ok(report) => report,
            Err(e) => Err(Error::Engine(format!("process task failed: {}", e))),
        })
    }
}

impl Drop for ExitWatch {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The transport selected by configuration.
pub enum EngineTransport {
    Ssh(SshTransport),
    Local(LocalTransport),
}

impl EngineTransport {
    pub fn from_config(config: &Config) -> Self {
        match config.transport {
            TransportKind::Ssh => EngineTransport::Ssh(SshTransport::new(config.ssh.clone())),
            TransportKind::Local => EngineTransport::Local(LocalTransport::new(&config.engine_path)),
        }
    }
}

impl Transport for EngineTransport {
    async fn spawn(&self, command: &str) -> Result<EngineProcess> {
        match self {
            EngineTransport::Ssh(ssh) => ssh.spawn(command).await,
            EngineTransport::Local(local) => local.spawn(command).await,
        }
    }

    async fn probe(&self) -> Result<()> {
        match self {
            EngineTransport::Ssh(ssh) => ssh.probe().await,
            EngineTransport::Local(local) => local.probe().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_buffer_is_shared() {
        let output = OutputBuffer::default();
        let writer = output.clone();
        writer.append(b"info depth 1\nbest");
        assert!(!output.contains("bestmove "));
        writer.append(b"move e2e4\n");
        assert!(output.contains("bestmove "));
        assert_eq!(output.snapshot(), "info depth 1\nbestmove e2e4\n");
    }

    #[test]
    fn test_exit_report() {
        assert!(ExitReport::code(0).success());
        assert!(!ExitReport::code(1).success());
        assert!(!ExitReport::default().success());
        assert!(ExitReport::code(127).command_not_found());
        assert_eq!(ExitReport::code(3).to_string(), "exit status 3");
        assert_eq!(ExitReport::default().to_string(), "exited without a status");
    }

    #[tokio::test]
    async fn test_exit_watch_resolves() {
        let watch = ExitWatch::new(tokio::spawn(async { Ok(ExitReport::code(0)) }));
        assert_eq!(watch.await.unwrap(), ExitReport::code(0));
    }

    #[tokio::test]
    async fn test_dropping_exit_watch_aborts_task() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let watch = ExitWatch::new(tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
            Ok(ExitReport::code(0))
        }));
        drop(watch);
        // the sender is dropped once the task is aborted
        assert!(rx.await.is_err());
    }
}
