//! Local subprocess transport

use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use super::{EngineProcess, ExitReport, ExitWatch, OutputBuffer, Transport};
use crate::error::{Error, Result};

/// Runs the engine on this machine.
pub struct LocalTransport {
    engine_path: String,
}

impl LocalTransport {
    pub fn new(engine_path: &str) -> Self {
        Self {
            engine_path: engine_path.to_string(),
        }
    }

    fn start(command: &str) -> Result<Child> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::EngineStart("empty engine command".into()))?;

        Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::EngineStart(format!("{}: {}", program, e)))
    }
}

impl Transport for LocalTransport {
    async fn spawn(&self, command: &str) -> Result<EngineProcess> {
        let mut child = Self::start(command)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::EngineStart("failed to open stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::EngineStart("failed to open stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::EngineStart("failed to open stderr".into()))?;

        let output = OutputBuffer::default();
        let out_pump = tokio::spawn(drain(stdout, output.clone()));
        let err_pump = tokio::spawn(drain(stderr, output.clone()));
        tracing::debug!(command, pid = child.id(), "local engine started");

        // The child is owned by the exit task, so aborting the task kills it.
        let task = tokio::spawn(async move {
            let status = child.wait().await?;
            let _ = out_pump.await;
            let _ = err_pump.await;
            Ok(report(status))
        });

        Ok(EngineProcess {
            stdin: Box::new(stdin),
            output,
            exit: ExitWatch::new(task),
        })
    }

    async fn probe(&self) -> Result<()> {
        let mut child = Self::start(&self.engine_path)?;
        let _ = child.kill().await;
        Ok(())
    }
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R, output: OutputBuffer) {
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => output.append(&buf[..n]),
        }
    }
}

fn report(status: std::process::ExitStatus) -> ExitReport {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt;
        status.signal().map(|s| s.to_string())
    };
    #[cfg(not(unix))]
    let signal = None;

    ExitReport {
        code: status.code(),
        signal,
    }
}
