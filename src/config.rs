use crate::error::{Error, Result};
use crate::services::scoring::ScoringModel;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Api,
    Worker,
    All,
}

impl AppMode {
    pub fn runs_api(self) -> bool {
        matches!(self, AppMode::Api | AppMode::All)
    }

    pub fn runs_worker(self) -> bool {
        matches!(self, AppMode::Worker | AppMode::All)
    }
}

impl FromStr for AppMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "api" | "server" => Ok(AppMode::Api),
            "worker" => Ok(AppMode::Worker),
            "all" => Ok(AppMode::All),
            other => Err(format!("unknown mode '{}' (expected api, worker or all)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub notification_interval: Duration,
    pub analysis_interval: Duration,
    pub report_interval: Duration,
    pub analysis_timeout: Duration,
    /// `None` leaves rows stuck in `processing` alone.
    pub analysis_stale_after: Option<Duration>,
    pub report_threshold: i32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            notification_interval: Duration::from_secs(15),
            analysis_interval: Duration::from_secs(15),
            report_interval: Duration::from_secs(300),
            analysis_timeout: Duration::from_secs(60),
            analysis_stale_after: Some(Duration::from_secs(900)),
            report_threshold: 80,
        }
    }
}

impl WorkerConfig {
    /// A stale window at or below the analysis timeout would let another
    /// worker reclaim a row that is still being analyzed.
    pub fn validate(&self) -> Result<()> {
        if let Some(stale_after) = self.analysis_stale_after {
            if stale_after <= self.analysis_timeout {
                return Err(Error::Config(format!(
                    "ANALYSIS_STALE_AFTER_SECS ({}) must be greater than ANALYSIS_TIMEOUT_SECS ({})",
                    stale_after.as_secs(),
                    self.analysis_timeout.as_secs()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub mode: AppMode,
    pub scoring_model: ScoringModel,
    pub public_rps: u32,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub worker: WorkerConfig,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let stale_secs: u64 = get_env_parse_or("ANALYSIS_STALE_AFTER_SECS", 900)?;
        let worker = WorkerConfig {
            notification_interval: get_secs_or("NOTIFICATION_INTERVAL_SECS", 15)?,
            analysis_interval: get_secs_or("ANALYSIS_INTERVAL_SECS", 15)?,
            report_interval: get_secs_or("REPORT_INTERVAL_SECS", 300)?,
            analysis_timeout: get_secs_or("ANALYSIS_TIMEOUT_SECS", 60)?,
            analysis_stale_after: (stale_secs > 0).then(|| Duration::from_secs(stale_secs)),
            report_threshold: get_env_parse_or("REPORT_THRESHOLD", 80)?,
        };
        worker.validate()?;

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:3001"),
            database_url: get_env("DATABASE_URL")?,
            mode: get_env_parse_or("APP_MODE", AppMode::All)?,
            scoring_model: get_env_parse_or("FIT_SCORE_MODEL", ScoringModel::Skills)?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 100)?,
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            openai_model: get_env_or("OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: get_env_or(
                "OPENAI_BASE_URL",
                crate::services::ai_service::DEFAULT_OPENAI_BASE_URL,
            ),
            worker,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn get_secs_or(name: &str, default: u64) -> Result<Duration> {
    let secs: u64 = get_env_parse_or(name, default)?;
    if secs == 0 {
        return Err(Error::Config(format!("{} must be greater than zero", name)));
    }
    Ok(Duration::from_secs(secs))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
