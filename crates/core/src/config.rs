//! Environment configuration

use std::env;
use std::time::Duration;

use crate::request::RequestPolicy;

/// How the engine process is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Run the engine on a remote host over SSH.
    Ssh,
    /// Spawn the engine as a local subprocess.
    Local,
}

/// Credential used to authenticate the SSH session.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    /// PEM key material, or a path to a file holding it.
    PrivateKey(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Password(_) => write!(f, "Password(***)"),
            Credential::PrivateKey(_) => write!(f, "PrivateKey(***)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub credential: Option<Credential>,
    pub timeout: Duration,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 22,
            user: String::new(),
            credential: None,
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub ssh: SshConfig,
    pub engine_path: String,
    pub analysis_depth: u32,
    pub include_raw: bool,
    pub transport: TransportKind,
    pub request_policy: RequestPolicy,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            ssh: SshConfig::default(),
            engine_path: "stockfish".to_string(),
            analysis_depth: 12,
            include_raw: false,
            transport: TransportKind::Ssh,
            request_policy: RequestPolicy::Strict,
            request_timeout: Duration::from_secs(45),
        }
    }
}

impl Config {
    /// Reads configuration from the process environment. Values that fail to
    /// parse fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credential = get("SSH_PRIVATE_KEY")
            .map(Credential::PrivateKey)
            .or_else(|| get("SSH_PASSWORD").map(Credential::Password));

        Self {
            server_port: get("SERVER_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.server_port),
            ssh: SshConfig {
                host: get("SSH_HOST").unwrap_or_default(),
                port: get("SSH_PORT")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(defaults.ssh.port),
                user: get("SSH_USER").unwrap_or_default(),
                credential,
                timeout: get("SSH_TIMEOUT")
                    .and_then(|v| parse_duration(&v))
                    .unwrap_or(defaults.ssh.timeout),
            },
            engine_path: get("STOCKFISH_PATH").unwrap_or(defaults.engine_path),
            analysis_depth: get("ANALYSIS_DEPTH")
                .and_then(|v| v.trim().parse().ok())
                .filter(|d| *d > 0)
                .unwrap_or(defaults.analysis_depth),
            include_raw: get("INCLUDE_RAW")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.include_raw),
            transport: match get("ENGINE_TRANSPORT").as_deref().map(str::trim) {
                Some(v) if v.eq_ignore_ascii_case("local") => TransportKind::Local,
                _ => TransportKind::Ssh,
            },
            request_policy: match get("REQUEST_POLICY").as_deref().map(str::trim) {
                Some(v) if v.eq_ignore_ascii_case("lenient") => RequestPolicy::Lenient,
                _ => RequestPolicy::Strict,
            },
            request_timeout: get("REQUEST_TIMEOUT")
                .and_then(|v| parse_duration(&v))
                .unwrap_or(defaults.request_timeout),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parses `500ms`, `5s`, `2m` or a bare number of seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Some(ms) = value.strip_suffix("ms") {
        return ms.trim().parse().ok().map(Duration::from_millis);
    }
    if let Some(secs) = value.strip_suffix('s') {
        return secs.trim().parse().ok().map(Duration::from_secs);
    }
    if let Some(mins) = value.strip_suffix('m') {
        return mins
            .trim()
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60));
    }
    value.parse().ok().map(Duration::from_secs)
}
