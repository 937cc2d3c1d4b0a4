//! Orchestrator configuration
//!
//! Defines every configurable parameter of the orchestrator: the HTTP bind
//! address, storage backends, the job source, pipeline pacing and the
//! optional chat adapter.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::limit::{Rate, RateLimits};
use crate::service::controller::PipelineSettings;

/// Orchestrator configuration
///
/// Pacing values are plain configuration inputs; nothing in the pipeline
/// derives them.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address (e.g., "0.0.0.0:5000")
    pub bind_addr: String,

    /// Postgres URL; when unset, state lives in `state_file` and results/logs in memory
    pub database_url: Option<String>,

    /// Maximum pooled database connections
    pub db_pool_size: u32,

    /// How long to wait for a pooled connection
    pub db_pool_timeout: Duration,

    /// JSON state file used when no database is configured
    pub state_file: PathBuf,

    /// Optional `credential,secondary` file; takes precedence over the job_source table
    pub jobs_file: Option<PathBuf>,

    /// Credential handed to the executor together with every job
    pub static_credential: String,

    /// Endpoint of the webhook executor
    pub executor_url: String,

    /// Pause between two consecutive jobs
    pub inter_job_delay: Duration,

    /// Per-job duration estimate used for the ETA
    pub job_estimate: Duration,

    /// Deadline passed through to the executor for each job
    pub job_deadline: Option<Duration>,

    /// Resume a run that was interrupted by a restart
    pub auto_resume: bool,

    /// Allowed CORS origin of the web dashboard; any origin when unset
    pub dashboard_origin: Option<String>,

    /// Per-client budgets of the HTTP control routes
    pub rate_limits: RateLimits,

    /// Chat adapter settings, present when a bot token is configured
    pub telegram: Option<TelegramConfig>,
}

/// Chat adapter configuration
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,

    /// Chats allowed to issue control commands
    pub allowed_chats: Vec<i64>,

    /// Chat receiving progress notifications
    pub notify_chat: Option<i64>,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("allowed_chats", &self.allowed_chats)
            .field("notify_chat", &self.notify_chat)
            .finish()
    }
}

impl Config {
    /// Creates a configuration with defaults for everything but the required values
    pub fn new(static_credential: String, executor_url: String) -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            database_url: None,
            db_pool_size: 5,
            db_pool_timeout: Duration::from_secs(30),
            state_file: PathBuf::from("conveyor-state.json"),
            jobs_file: None,
            static_credential,
            executor_url,
            inter_job_delay: Duration::from_secs(30),
            job_estimate: Duration::from_secs(300), // 5 minutes
            job_deadline: None,
            auto_resume: false,
            dashboard_origin: None,
            rate_limits: RateLimits::default(),
            telegram: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - STATIC_CREDENTIAL (required)
    /// - EXECUTOR_URL (required)
    /// - BIND_ADDR (optional, default: 0.0.0.0:5000)
    /// - DATABASE_URL (optional)
    /// - DB_POOL_SIZE (optional, default: 5)
    /// - DB_POOL_TIMEOUT (optional, seconds, default: 30)
    /// - STATE_FILE (optional, default: conveyor-state.json)
    /// - JOBS_FILE (optional)
    /// - INTER_JOB_DELAY (optional, seconds, default: 30)
    /// - JOB_ESTIMATE (optional, seconds, default: 300)
    /// - JOB_DEADLINE (optional, seconds)
    /// - AUTO_RESUME (optional, default: false)
    /// - DASHBOARD_ORIGIN (optional)
    /// - RATE_LIMIT_STATUS (optional, per minute, default: 10, 0 disables)
    /// - RATE_LIMIT_CONTROL (optional, per hour, default: 5, 0 disables)
    /// - RATE_LIMIT_LISTING (optional, per minute, default: 20, 0 disables)
    /// - TELEGRAM_BOT_TOKEN, TELEGRAM_ALLOWED_CHATS, TELEGRAM_NOTIFY_CHAT (optional)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let static_credential = lookup("STATIC_CREDENTIAL")
            .ok_or_else(|| anyhow::anyhow!("STATIC_CREDENTIAL environment variable not set"))?;

        let executor_url = lookup("EXECUTOR_URL")
            .ok_or_else(|| anyhow::anyhow!("EXECUTOR_URL environment variable not set"))?;

        let mut config = Self::new(static_credential, executor_url);

        if let Some(bind_addr) = lookup("BIND_ADDR") {
            config.bind_addr = bind_addr;
        }

        config.database_url = lookup("DATABASE_URL").filter(|s| !s.is_empty());

        config.db_pool_size = lookup("DB_POOL_SIZE")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(config.db_pool_size);

        config.db_pool_timeout =
            parse_secs(lookup("DB_POOL_TIMEOUT")).unwrap_or(config.db_pool_timeout);

        if let Some(state_file) = lookup("STATE_FILE") {
            config.state_file = PathBuf::from(state_file);
        }

        config.jobs_file = lookup("JOBS_FILE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        config.inter_job_delay =
            parse_secs(lookup("INTER_JOB_DELAY")).unwrap_or(config.inter_job_delay);
        config.job_estimate = parse_secs(lookup("JOB_ESTIMATE")).unwrap_or(config.job_estimate);
        config.job_deadline = parse_secs(lookup("JOB_DEADLINE"));

        config.auto_resume = lookup("AUTO_RESUME")
            .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        config.dashboard_origin = lookup("DASHBOARD_ORIGIN").filter(|s| !s.is_empty());

        let defaults = RateLimits::default();
        config.rate_limits = RateLimits {
            status: parse_rate(lookup("RATE_LIMIT_STATUS"), defaults.status, Rate::per_minute),
            control: parse_rate(lookup("RATE_LIMIT_CONTROL"), defaults.control, Rate::per_hour),
            listing: parse_rate(lookup("RATE_LIMIT_LISTING"), defaults.listing, Rate::per_minute),
        };

        if let Some(bot_token) = lookup("TELEGRAM_BOT_TOKEN").filter(|s| !s.is_empty()) {
            let allowed_chats = lookup("TELEGRAM_ALLOWED_CHATS")
                .map(|s| parse_chat_ids(&s))
                .transpose()?
                .unwrap_or_default();

            let notify_chat = lookup("TELEGRAM_NOTIFY_CHAT")
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.trim()
                        .parse::<i64>()
                        .map_err(|_| anyhow::anyhow!("TELEGRAM_NOTIFY_CHAT is not a chat id: {}", s))
                })
                .transpose()?;

            config.telegram = Some(TelegramConfig {
                bot_token,
                allowed_chats,
                notify_chat,
            });
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.static_credential.is_empty() {
            anyhow::bail!("static_credential cannot be empty");
        }

        if !self.executor_url.starts_with("http://") && !self.executor_url.starts_with("https://")
        {
            anyhow::bail!("executor_url must start with http:// or https://");
        }

        if self.db_pool_size == 0 {
            anyhow::bail!("db_pool_size must be greater than 0");
        }

        if self.job_estimate.is_zero() {
            anyhow::bail!("job_estimate must be greater than 0");
        }

        if let Some(telegram) = &self.telegram {
            if telegram.allowed_chats.is_empty() {
                anyhow::bail!(
                    "TELEGRAM_ALLOWED_CHATS must list at least one chat id when the chat adapter is enabled"
                );
            }
        }

        Ok(())
    }

    /// Pacing and credentials handed to the pipeline controller
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            inter_job_delay: self.inter_job_delay,
            job_estimate: self.job_estimate,
            job_deadline: self.job_deadline,
            static_credential: self.static_credential.clone(),
        }
    }
}

fn parse_secs(value: Option<String>) -> Option<Duration> {
    value
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Unset or unparsable keeps `default`; 0 lifts the limit
fn parse_rate(
    value: Option<String>,
    default: Option<Rate>,
    rate: fn(u32) -> Rate,
) -> Option<Rate> {
    match value.and_then(|s| s.trim().parse::<u32>().ok()) {
        Some(0) => None,
        Some(requests) => Some(rate(requests)),
        None => default,
    }
}

fn parse_chat_ids(value: &str) -> anyhow::Result<Vec<i64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| anyhow::anyhow!("invalid chat id in TELEGRAM_ALLOWED_CHATS: {}", s))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("STATIC_CREDENTIAL", "s3cret"),
            ("EXECUTOR_URL", "http://localhost:9000/execute"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&required())).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.inter_job_delay, Duration::from_secs(30));
        assert_eq!(config.job_estimate, Duration::from_secs(300));
        assert_eq!(config.job_deadline, None);
        assert!(!config.auto_resume);
        assert!(config.database_url.is_none());
        assert!(config.telegram.is_none());
        assert_eq!(config.rate_limits, RateLimits::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rate_limit_overrides() {
        let mut vars = required();
        vars.extend([("RATE_LIMIT_CONTROL", "20"), ("RATE_LIMIT_LISTING", "0")]);

        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.rate_limits.status, Some(Rate::per_minute(10)));
        assert_eq!(config.rate_limits.control, Some(Rate::per_hour(20)));
        assert_eq!(config.rate_limits.listing, None);
    }

    #[test]
    fn test_missing_required_values() {
        assert!(Config::from_lookup(lookup_from(&[("EXECUTOR_URL", "http://x")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("STATIC_CREDENTIAL", "x")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut vars = required();
        vars.extend([
            ("INTER_JOB_DELAY", "5"),
            ("JOB_ESTIMATE", "120"),
            ("JOB_DEADLINE", "600"),
            ("AUTO_RESUME", "true"),
            ("DATABASE_URL", "postgres://localhost/conveyor"),
            ("JOBS_FILE", "/data/jobs.txt"),
        ]);

        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.inter_job_delay, Duration::from_secs(5));
        assert_eq!(config.job_estimate, Duration::from_secs(120));
        assert_eq!(config.job_deadline, Some(Duration::from_secs(600)));
        assert!(config.auto_resume);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/conveyor")
        );
        assert_eq!(config.jobs_file, Some(PathBuf::from("/data/jobs.txt")));

        let settings = config.pipeline_settings();
        assert_eq!(settings.static_credential, "s3cret");
        assert_eq!(settings.job_deadline, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_telegram_settings() {
        let mut vars = required();
        vars.extend([
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_ALLOWED_CHATS", "42, -1001"),
            ("TELEGRAM_NOTIFY_CHAT", "42"),
        ]);

        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        let telegram = config.telegram.as_ref().unwrap();
        assert_eq!(telegram.allowed_chats, vec![42, -1001]);
        assert_eq!(telegram.notify_chat, Some(42));
        assert!(!format!("{:?}", telegram).contains("123:abc"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_chat_id_is_rejected() {
        let mut vars = required();
        vars.extend([
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_ALLOWED_CHATS", "42,abc"),
        ]);
        assert!(Config::from_lookup(lookup_from(&vars)).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::from_lookup(lookup_from(&required())).unwrap();

        config.executor_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
        config.executor_url = "https://executor.internal/run".to_string();
        assert!(config.validate().is_ok());

        config.static_credential = String::new();
        assert!(config.validate().is_err());
        config.static_credential = "s3cret".to_string();

        config.telegram = Some(TelegramConfig {
            bot_token: "123:abc".to_string(),
            allowed_chats: Vec::new(),
            notify_chat: None,
        });
        assert!(config.validate().is_err());
    }
}
