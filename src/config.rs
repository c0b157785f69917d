//! Configuration for the leadhook CLI.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use leadhook_delivery::{ClientConfig, RetryConfig};
use serde::{Deserialize, Serialize};

/// File read from the working directory unless `--config` names another.
pub const CONFIG_FILE: &str = "leadhook.toml";

/// Prefix for environment overrides, e.g. `LEADHOOK_MAX_RETRIES`.
pub const ENV_PREFIX: &str = "LEADHOOK_";

/// Delivery settings with defaults, file, and environment overrides.
///
/// Sources in priority order:
/// 1. Environment variables with the `LEADHOOK_` prefix
/// 2. The configuration file (`leadhook.toml`)
/// 3. Built-in defaults, which match [`RetryConfig::DEFAULT`]
///
/// The webhook secret is never read from the prefixed environment here;
/// the CLI takes it from `--secret` or `LEADHOOK_WEBHOOK_SECRET` directly,
/// so numeric-looking secrets stay strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Retry
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Wait before the first retry, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Growth factor between consecutive waits.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Per-attempt budget, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Randomization applied to each wait (0.0 to 1.0).
    #[serde(default)]
    pub jitter_factor: f64,

    // Client
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Redirects followed before giving up.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    /// Shared secret used when the command line does not supply one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,

    // Logging
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Config {
    /// Loads configuration from defaults, `path` (or `leadhook.toml`), and
    /// the environment, then validates it.
    ///
    /// A missing file is not an error; an explicitly named one must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                anyhow::ensure!(path.exists(), "config file {} not found", path.display());
                path.to_path_buf()
            },
            None => PathBuf::from(CONFIG_FILE),
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["webhook_secret"]));

        let config: Self = figment.extract().context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Retry policy built from the retry settings.
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            timeout: Duration::from_millis(self.timeout_ms),
            jitter_factor: self.jitter_factor,
        }
    }

    /// HTTP client settings. The client-wide timeout matches the attempt budget.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            user_agent: self.user_agent.clone(),
            max_redirects: self.max_redirects,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            anyhow::bail!("user_agent must not be empty");
        }

        if self.webhook_secret.as_deref().is_some_and(str::is_empty) {
            anyhow::bail!("webhook_secret must not be empty when set");
        }

        self.to_retry_config().validate().context("invalid retry settings")?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            timeout_ms: default_timeout_ms(),
            jitter_factor: 0.0,
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            webhook_secret: None,
            log_filter: default_log_filter(),
        }
    }
}

fn default_max_retries() -> u32 {
    RetryConfig::DEFAULT.max_retries
}

fn default_initial_delay_ms() -> u64 {
    duration_ms(RetryConfig::DEFAULT.initial_delay)
}

fn default_backoff_multiplier() -> f64 {
    RetryConfig::DEFAULT.backoff_multiplier
}

fn default_timeout_ms() -> u64 {
    duration_ms(RetryConfig::DEFAULT.timeout)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn default_user_agent() -> String {
    ClientConfig::default().user_agent
}

fn default_max_redirects() -> u32 {
    3
}

fn default_log_filter() -> String {
    "info,leadhook=debug".to_string()
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    fn load(path: Option<&Path>) -> figment::error::Result<Config> {
        Config::load(path).map_err(|e| format!("{e:#}").into())
    }

    #[test]
    fn defaults_match_standard_retry_policy() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.to_retry_config(), RetryConfig::DEFAULT);
        assert_eq!(config.initial_delay_ms, 1000);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.to_client_config().timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("leadhook/"));
    }

    #[test]
    fn loads_defaults_without_file_or_env() {
        Jail::expect_with(|_jail| {
            let config = load(None)?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                    max_retries = 5
                    initial_delay_ms = 250
                    backoff_multiplier = 2.0
                    webhook_secret = "from-file"
                "#,
            )?;

            let config = load(None)?;
            let retry = config.to_retry_config();
            assert_eq!(retry.max_retries, 5);
            assert_eq!(retry.initial_delay, Duration::from_millis(250));
            assert_eq!(retry.backoff_delay(3), Duration::from_millis(1000));
            assert_eq!(config.webhook_secret.as_deref(), Some("from-file"));
            assert_eq!(config.timeout_ms, 30_000);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "max_retries = 5\ntimeout_ms = 9000")?;
            jail.set_env("LEADHOOK_MAX_RETRIES", "1");
            jail.set_env("LEADHOOK_USER_AGENT", "ops-probe/1.0");

            let config = load(None)?;
            assert_eq!(config.max_retries, 1);
            assert_eq!(config.timeout_ms, 9000);
            assert_eq!(config.to_client_config().user_agent, "ops-probe/1.0");
            Ok(())
        });
    }

    #[test]
    fn secret_is_not_taken_from_prefixed_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("LEADHOOK_WEBHOOK_SECRET", "12345");

            let config = load(None)?;
            assert_eq!(config.webhook_secret, None);
            Ok(())
        });
    }

    #[test]
    fn explicit_path_must_exist() {
        Jail::expect_with(|_jail| {
            let error = load(Some(Path::new("missing.toml"))).unwrap_err();
            assert!(error.to_string().contains("missing.toml"));
            Ok(())
        });
    }

    #[test]
    fn explicit_path_is_used() {
        Jail::expect_with(|jail| {
            jail.create_file("staging.toml", "max_redirects = 0")?;

            let config = load(Some(Path::new("staging.toml")))?;
            assert_eq!(config.max_redirects, 0);
            Ok(())
        });
    }

    #[test]
    fn rejects_invalid_retry_settings() {
        Jail::expect_with(|jail| {
            jail.set_env("LEADHOOK_BACKOFF_MULTIPLIER", "0.5");
            assert!(load(None).is_err());

            jail.set_env("LEADHOOK_BACKOFF_MULTIPLIER", "2");
            jail.set_env("LEADHOOK_TIMEOUT_MS", "0");
            assert!(load(None).is_err());

            jail.set_env("LEADHOOK_TIMEOUT_MS", "1000");
            jail.set_env("LEADHOOK_JITTER_FACTOR", "1.5");
            let error = load(None).unwrap_err();
            assert!(error.to_string().contains("jitter_factor"));
            Ok(())
        });
    }

    #[test]
    fn rejects_empty_user_agent() {
        let config = Config { user_agent: "  ".to_string(), ..Config::default() };
        assert!(config.validate().is_err());
    }
}
