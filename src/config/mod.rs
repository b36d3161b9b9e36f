//! Settings: a key-value store backed by SQLite, layered under CLI flags and
//! environment variables.
//!
//! Resolution order for each setting is CLI flag, then environment variable,
//! then the stored value, then the built-in default.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::Connection;
use tracing::debug;

use crate::consts::{DEFAULT_AUTH_URL, DEFAULT_UPLOAD_URL, MAX_POLL_ATTEMPTS, POLL_INTERVAL};

pub const AUTH_URL: &str = "auth_url";
pub const UPLOAD_URL: &str = "upload_url";
pub const POLL_SECS: &str = "poll_secs";
pub const MAX_ATTEMPTS: &str = "max_attempts";
pub const OUT_DIR: &str = "out_dir";

/// Keys `pixora config set` accepts.
pub const KEYS: &[&str] = &[AUTH_URL, UPLOAD_URL, POLL_SECS, MAX_ATTEMPTS, OUT_DIR];

/// Persistent key-value configuration store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("config connection lock poisoned"))
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Set a config value (upsert). Unknown keys and malformed values are
    /// rejected.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        validate(key, value)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// All stored pairs, sorted by key.
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config ORDER BY key ASC")?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pairs)
    }
}

fn validate(key: &str, value: &str) -> Result<()> {
    match key {
        AUTH_URL | UPLOAD_URL => {
            reqwest::Url::parse(value).with_context(|| format!("{key} must be a URL"))?;
        }
        POLL_SECS => {
            let secs: u64 = value
                .parse()
                .with_context(|| format!("{key} must be a whole number of seconds"))?;
            if secs == 0 {
                bail!("{key} must be at least 1");
            }
        }
        MAX_ATTEMPTS => {
            let n: u32 = value
                .parse()
                .with_context(|| format!("{key} must be a positive integer"))?;
            if n == 0 {
                bail!("{key} must be at least 1");
            }
        }
        OUT_DIR => {
            if value.trim().is_empty() {
                bail!("{key} cannot be empty");
            }
        }
        _ => bail!("unknown config key: {key} (known: {})", KEYS.join(", ")),
    }
    Ok(())
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub auth_url: Option<String>,
    pub upload_url: Option<String>,
    pub poll_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub out_dir: Option<PathBuf>,
}

/// Fully resolved settings for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub auth_url: String,
    pub upload_url: String,
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub out_dir: PathBuf,
}

impl Settings {
    /// Resolve against the process environment.
    pub fn resolve(config: &Config, overrides: &Overrides) -> Result<Self> {
        Self::resolve_with(config, overrides, |name| std::env::var(name).ok())
    }

    /// Resolve with an injectable environment lookup.
    pub fn resolve_with(
        config: &Config,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let pick = |flag: Option<String>, var: &str, key: &str| -> Result<Option<String>> {
            if flag.is_some() {
                debug!(key, "using command-line value");
                return Ok(flag);
            }
            if let Some(value) = env(var).filter(|v| !v.trim().is_empty()) {
                debug!(key, var, "using environment value");
                return Ok(Some(value));
            }
            config.get(key)
        };

        let auth_url = pick(overrides.auth_url.clone(), "PIXORA_AUTH_URL", AUTH_URL)?
            .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string());
        let upload_url = pick(overrides.upload_url.clone(), "PIXORA_UPLOAD_URL", UPLOAD_URL)?
            .unwrap_or_else(|| DEFAULT_UPLOAD_URL.to_string());

        let poll_interval = match pick(
            overrides.poll_secs.map(|s| s.to_string()),
            "PIXORA_POLL_SECS",
            POLL_SECS,
        )? {
            Some(secs) => {
                let secs: u64 = secs
                    .parse()
                    .with_context(|| format!("invalid {POLL_SECS}: {secs}"))?;
                if secs == 0 {
                    bail!("{POLL_SECS} must be at least 1");
                }
                Duration::from_secs(secs)
            }
            None => POLL_INTERVAL,
        };

        let max_attempts = match pick(
            overrides.max_attempts.map(|n| n.to_string()),
            "PIXORA_MAX_ATTEMPTS",
            MAX_ATTEMPTS,
        )? {
            Some(n) => n
                .parse::<u32>()
                .with_context(|| format!("invalid {MAX_ATTEMPTS}: {n}"))?
                .max(1),
            None => MAX_POLL_ATTEMPTS,
        };

        let out_dir = match overrides.out_dir.clone() {
            Some(dir) => dir,
            None => pick(None, "PIXORA_OUT_DIR", OUT_DIR)?
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        Ok(Self {
            auth_url,
            upload_url,
            poll_interval,
            max_attempts,
            out_dir,
        })
    }
}
