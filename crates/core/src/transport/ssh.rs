//! SSH transport
//!
//! Every spawn dials, authenticates and opens a single exec channel. The
//! connection lives inside the pump task and is closed when the task ends or
//! is aborted.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use russh::client::{self, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key;
use tokio::io::{AsyncReadExt, DuplexStream};

use super::{EngineProcess, ExitReport, ExitWatch, OutputBuffer, Transport};
use crate::config::{Credential, SshConfig};
use crate::error::{Error, Result};

const STDIN_BUFFER: usize = 4096;

/// Accepts any host key. The engine host is reached over a private network
/// and is not pinned.
struct AcceptAnyHost;

#[async_trait]
impl client::Handler for AcceptAnyHost {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

enum Auth {
    Password(String),
    Key(Arc<key::KeyPair>),
}

pub struct SshTransport {
    config: SshConfig,
}

impl SshTransport {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    fn auth(&self) -> Result<Auth> {
        match &self.config.credential {
            Some(Credential::PrivateKey(value)) => {
                let material = if Path::new(value).is_file() {
                    std::fs::read_to_string(value).unwrap_or_else(|_| value.clone())
                } else {
                    value.clone()
                };
                let pair = russh_keys::decode_secret_key(&material, None)
                    .map_err(|e| Error::Config(format!("invalid SSH private key: {}", e)))?;
                Ok(Auth::Key(Arc::new(pair)))
            }
            Some(Credential::Password(password)) => Ok(Auth::Password(password.clone())),
            None => Err(Error::Config("SSH_PASSWORD or SSH_PRIVATE_KEY required".into())),
        }
    }

    async fn connect(&self) -> Result<Handle<AcceptAnyHost>> {
        if self.config.host.is_empty() || self.config.user.is_empty() {
            return Err(Error::Config("SSH_HOST and SSH_USER required".into()));
        }
        let auth = self.auth()?;
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let dial = async {
            let config = Arc::new(client::Config::default());
            let mut handle = client::connect(config, addr.as_str(), AcceptAnyHost)
                .await
                .map_err(|e| Error::Connection(format!("{}: {}", addr, e)))?;

            let user = self.config.user.clone();
            let accepted = match auth {
                Auth::Password(password) => handle.authenticate_password(user, password).await,
                Auth::Key(pair) => handle.authenticate_publickey(user, pair).await,
            }
            .map_err(|e| Error::Connection(format!("{}: {}", addr, e)))?;

            if !accepted {
                return Err(Error::Connection(format!(
                    "{}: authentication rejected for user {}",
                    addr, self.config.user
                )));
            }
            Ok(handle)
        };

        tokio::time::timeout(self.config.timeout, dial)
            .await
            .map_err(|_| {
                Error::Connection(format!("{}: timed out after {:?}", addr, self.config.timeout))
            })?
    }
}

impl Transport for SshTransport {
    async fn spawn(&self, command: &str) -> Result<EngineProcess> {
        let handle = self.connect().await?;
        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::Connection(format!("failed to open session: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::EngineStart(format!("{}: {}", command, e)))?;

        let output = OutputBuffer::default();
        // wait for the server to accept the exec request
        loop {
            match channel.wait().await {
                Some(ChannelMsg::Success) => break,
                Some(ChannelMsg::Failure) => {
                    return Err(Error::EngineStart(format!("{}: exec request refused", command)));
                }
                Some(ChannelMsg::Data { ref data }) => output.append(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => output.append(data),
                Some(_) => {}
                None => {
                    return Err(Error::EngineStart(format!(
                        "{}: channel closed before the engine started",
                        command
                    )));
                }
            }
        }
        tracing::debug!(host = %self.config.host, command, "remote engine started");

        let (stdin, feed) = tokio::io::duplex(STDIN_BUFFER);
        let task = tokio::spawn(pump(handle, channel, feed, output.clone()));

        Ok(EngineProcess {
            stdin: Box::new(stdin),
            output,
            exit: ExitWatch::new(task),
        })
    }

    async fn probe(&self) -> Result<()> {
        let handle = self.connect().await?;
        // a failed goodbye does not make the host unhealthy
        let _ = handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await;
        Ok(())
    }
}

/// Shuttles stdin into the channel and channel output into `output` until
/// the remote side closes the channel.
async fn pump(
    handle: Handle<AcceptAnyHost>,
    mut channel: Channel<Msg>,
    mut feed: DuplexStream,
    output: OutputBuffer,
) -> Result<ExitReport> {
    let mut buf = [0u8; 1024];
    let mut stdin_open = true;
    let mut report = ExitReport::default();

    loop {
        tokio::select! {
            read = feed.read(&mut buf), if stdin_open => match read {
                Ok(0) | Err(_) => {
                    stdin_open = false;
                    channel
                        .eof()
                        .await
                        .map_err(|e| Error::Engine(format!("failed to close stdin: {}", e)))?;
                }
                Ok(n) => {
                    channel
                        .data(&buf[..n])
                        .await
                        .map_err(|e| Error::Engine(format!("failed to write to engine: {}", e)))?;
                }
            },
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Data { ref data }) => output.append(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => output.append(data),
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    report.code = Some(exit_status as i32);
                }
                Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                    report.signal = Some(format!("{:?}", signal_name));
                }
                Some(_) => {}
                None => break,
            },
        }
    }

    let _ = handle
        .disconnect(Disconnect::ByApplication, "", "English")
        .await;
    Ok(report)
}
