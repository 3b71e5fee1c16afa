// src/config.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::{env, path::PathBuf, str::FromStr, time::Duration};
use tracing_subscriber::{fmt, EnvFilter};

use crate::process::MonthNames;

pub const DEFAULT_RCEM_URL: &str =
    "https://www.pse.pl/oire/rcem-rynkowa-miesieczna-cena-energii-elektrycznej";
pub const DEFAULT_RCE_API_BASE: &str = "https://api.raporty.pse.pl/api/rce-pln";
pub const DEFAULT_USER_AGENT: &str = "rcem-updater/1.0 (+https://github.com)";

/// Earliest business date the hourly backfill starts from.
pub fn default_rce_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2004, 7, 1).expect("static date is valid")
}

/// HTTP behaviour shared by every fetcher.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 3,
            initial_backoff_ms: 500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpSettings {
    pub fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .context("building HTTP client")
    }
}

/// Runtime settings, resolved from the environment with defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub rcem_url: String,
    pub rce_api_base: String,
    pub data_dir: PathBuf,
    pub http: HttpSettings,
    pub month_names: MonthNames,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rcem_url: DEFAULT_RCEM_URL.to_string(),
            rce_api_base: DEFAULT_RCE_API_BASE.to_string(),
            data_dir: PathBuf::from("."),
            http: HttpSettings::default(),
            month_names: MonthNames::default(),
        }
    }
}

impl Settings {
    /// Read `RCEM_URL`, `RCE_API_BASE`, `DATA_DIR`, `HTTP_TIMEOUT_SECS`,
    /// `HTTP_MAX_RETRIES`, `HTTP_BACKOFF_MS`, `USER_AGENT` and `MONTH_NAMES`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut s = Settings::default();
        if let Some(v) = lookup("RCEM_URL") {
            s.rcem_url = v;
        }
        if let Some(v) = lookup("RCE_API_BASE") {
            s.rce_api_base = v;
        }
        if let Some(v) = lookup("DATA_DIR") {
            s.data_dir = PathBuf::from(v);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "HTTP_TIMEOUT_SECS")? {
            s.http.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = parse_var::<u32>(&lookup, "HTTP_MAX_RETRIES")? {
            s.http.max_retries = n;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "HTTP_BACKOFF_MS")? {
            s.http.initial_backoff_ms = ms;
        }
        if let Some(v) = lookup("USER_AGENT") {
            s.http.user_agent = v;
        }
        if let Some(names) = parse_var::<MonthNames>(&lookup, "MONTH_NAMES")? {
            s.month_names = names;
        }
        Ok(s)
    }

    pub fn rcem_file(&self) -> PathBuf {
        self.data_dir.join("rcem.json")
    }

    pub fn rcem_changes_file(&self) -> PathBuf {
        self.data_dir.join("rcem_changes.txt")
    }

    pub fn rce_file(&self) -> PathBuf {
        self.data_dir.join("rce.json")
    }

    pub fn rce_changes_file(&self) -> PathBuf {
        self.data_dir.join("rce_changes.txt")
    }
}

fn parse_var<T>(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", key, raw, e)),
        None => Ok(None),
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins, then `LOG_LEVEL`, then `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        EnvFilter::new(level)
    });
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
}
