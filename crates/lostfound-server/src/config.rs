use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use tracing::warn;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    /// Exact allowed origin; permissive when unset.
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let port = match get("LOSTFOUND_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("LOSTFOUND_PORT is not a port number: {}", raw))?,
            None => 5000,
        };

        let dev = get("LOSTFOUND_DEV").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        let jwt_secret = match get("LOSTFOUND_JWT_SECRET") {
            Some(secret) if !PLACEHOLDER_SECRETS.contains(&secret.as_str()) => secret,
            _ if dev => {
                warn!("LOSTFOUND_JWT_SECRET unset or a placeholder; using an ephemeral dev secret");
                ephemeral_secret()
            }
            _ => bail!(
                "LOSTFOUND_JWT_SECRET is unset or still a placeholder. \
                 Set it in your .env file, or set LOSTFOUND_DEV=1 for a throwaway secret."
            ),
        };

        Ok(Self {
            host: get("LOSTFOUND_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("LOSTFOUND_DB_PATH").unwrap_or_else(|| "lostfound.db".into()).into(),
            jwt_secret,
            upload_dir: get("LOSTFOUND_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            cors_origin: get("LOSTFOUND_CORS_ORIGIN"),
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

/// Tokens signed with it die with the process.
fn ephemeral_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    STANDARD.encode(bytes)
}
