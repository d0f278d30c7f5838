use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = get("ROSTER_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("ROSTER_JWT_SECRET is unset or still a placeholder");
        }

        let host = get("ROSTER_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("ROSTER_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("ROSTER_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("ROSTER_HOST/ROSTER_PORT do not form a socket address")?;

        let max_upload_bytes = match get("ROSTER_MAX_UPLOAD_BYTES") {
            Some(v) => v.parse().context("ROSTER_MAX_UPLOAD_BYTES must be a byte count")?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            addr,
            db_path: get("ROSTER_DB_PATH").unwrap_or_else(|| "roster.db".into()).into(),
            upload_dir: get("ROSTER_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            max_upload_bytes,
            jwt_secret,
        })
    }
}
