//! Layered configuration: defaults → config file → `SETTLE_*` env → flags

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use settle_poll::{PolicyError, PollPolicy};

/// Environment variable prefix; nested keys split on `__`
pub const ENV_PREFIX: &str = "SETTLE_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub poll: PollConfig,
    pub http: HttpConfig,
    pub exec: ExecConfig,
    pub probe: ProbeConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

impl PollConfig {
    /// Build a policy, letting explicit flags override configured values
    pub fn policy(
        &self,
        interval: Option<Duration>,
        timeout: Option<Duration>,
    ) -> Result<PollPolicy, PolicyError> {
        PollPolicy::new(
            interval.unwrap_or(self.interval),
            timeout.unwrap_or(self.timeout),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout; a hung request counts as one failed attempt
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Longest a single run may take; it is also cut short by the poll deadline
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Duration,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Probes per second
    pub rate: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            rate: settle_poll::DEFAULT_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

/// `$XDG_CONFIG_HOME/settle/settle.toml` or the platform equivalent
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("settle").join("settle.toml"))
}

/// Load configuration.
///
/// An explicit `path` must exist; the default location is optional.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

    match path {
        Some(path) => {
            if !path.is_file() {
                bail!("config file {} does not exist", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            if let Some(path) = default_config_path() {
                figment = figment.merge(Toml::file(path));
            }
        }
    }

    let config: AppConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("failed to extract configuration")?;

    validate(&config)?;
    Ok(config)
}

/// Reject values that would fail later, before any polling starts
pub fn validate(config: &AppConfig) -> Result<()> {
    config
        .poll
        .policy(None, None)
        .context("invalid [poll] configuration")?;

    if config.probe.rate == 0 {
        return Err(PolicyError::ZeroRate).context("invalid [probe] configuration");
    }

    if config.http.request_timeout.is_zero() {
        bail!("invalid [http] configuration: request_timeout must be greater than zero");
    }

    if config.exec.attempt_timeout.is_zero() {
        bail!("invalid [exec] configuration: attempt_timeout must be greater than zero");
    }

    let levels = ["trace", "debug", "info", "warn", "error"];
    if !levels.contains(&config.log.level.to_ascii_lowercase().as_str()) {
        bail!(
            "invalid [log] configuration: level {:?} must be one of {}",
            config.log.level,
            levels.join(", ")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(validate(&config).is_ok());
        assert_eq!(
            config.poll.policy(None, None).unwrap(),
            PollPolicy::from_millis(1_000, 10_000).unwrap()
        );
    }

    #[test]
    fn file_then_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "settle.toml",
                r#"
                [poll]
                interval = "500ms"
                timeout = "5s"

                [log]
                format = "json"
                "#,
            )?;
            jail.set_env("SETTLE_POLL__TIMEOUT", "30s");
            jail.set_env("SETTLE_PROBE__RATE", "20");

            let config = load(Some(Path::new("settle.toml"))).map_err(|e| e.to_string())?;

            assert_eq!(config.poll.interval, Duration::from_millis(500));
            assert_eq!(config.poll.timeout, Duration::from_secs(30));
            assert_eq!(config.probe.rate, 20);
            assert_eq!(config.log.format, LogFormat::Json);
            assert_eq!(config.log.level, "info");
            Ok(())
        });
    }

    #[test]
    fn flags_override_configured_policy() {
        let poll = PollConfig::default();
        let policy = poll
            .policy(Some(Duration::from_millis(250)), None)
            .unwrap();
        assert_eq!(policy.interval(), Duration::from_millis(250));
        assert_eq!(policy.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        Jail::expect_with(|_| {
            let err = load(Some(Path::new("nope.toml"))).unwrap_err();
            assert!(err.to_string().contains("does not exist"));
            Ok(())
        });
    }

    #[test]
    fn zero_interval_is_rejected_at_load() {
        Jail::expect_with(|jail| {
            jail.set_env("SETTLE_POLL__INTERVAL", "0s");
            let err = load(Some(Path::new("settle.toml"))).unwrap_err();
            assert!(err.to_string().contains("does not exist"));

            jail.create_file("settle.toml", "")?;
            let err = load(Some(Path::new("settle.toml"))).unwrap_err();
            assert!(format!("{err:#}").contains("poll interval must be greater than zero"));
            Ok(())
        });
    }

    #[test]
    fn zero_attempt_timeout_is_rejected() {
        let mut config = AppConfig::default();
        assert_eq!(config.exec.attempt_timeout, Duration::from_secs(30));
        config.exec.attempt_timeout = Duration::ZERO;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("[exec]"));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut config = AppConfig::default();
        config.log.level = "loud".into();
        assert!(validate(&config).is_err());
    }
}
