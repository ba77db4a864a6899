use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::derived::{StockThresholds, UrgencyThresholds};
use crate::domain::UserId;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PortalConfig {
    pub gateway: GatewayConfig,
    pub thresholds: ThresholdConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Sent as the `userId` header on every mutating call.
    pub acting_user_id: UserId,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThresholdConfig {
    pub urgency_immediate_days: i64,
    pub urgency_urgent_days: i64,
    pub urgency_soon_days: i64,
    pub stock_low_ratio: f64,
    pub stock_high_ratio: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub acting_user_id: Option<i64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for PortalConfig {
    fn default() -> Self {
        let urgency = UrgencyThresholds::default();
        let stock = StockThresholds::default();
        Self {
            gateway: GatewayConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_secs: 15,
                acting_user_id: UserId(1),
            },
            thresholds: ThresholdConfig {
                urgency_immediate_days: urgency.immediate_days,
                urgency_urgent_days: urgency.urgent_days,
                urgency_soon_days: urgency.soon_days,
                stock_low_ratio: stock.low_ratio,
                stock_high_ratio: stock.high_ratio,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl ThresholdConfig {
    pub fn urgency(&self) -> UrgencyThresholds {
        UrgencyThresholds {
            immediate_days: self.urgency_immediate_days,
            urgent_days: self.urgency_urgent_days,
            soon_days: self.urgency_soon_days,
        }
    }

    pub fn stock(&self) -> StockThresholds {
        StockThresholds { low_ratio: self.stock_low_ratio, high_ratio: self.stock_high_ratio }
    }
}

impl PortalConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("partsdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(gateway) = patch.gateway {
            if let Some(base_url) = gateway.base_url {
                self.gateway.base_url = base_url;
            }
            if let Some(timeout_secs) = gateway.timeout_secs {
                self.gateway.timeout_secs = timeout_secs;
            }
            if let Some(acting_user_id) = gateway.acting_user_id {
                self.gateway.acting_user_id = UserId(acting_user_id);
            }
        }

        if let Some(thresholds) = patch.thresholds {
            if let Some(days) = thresholds.urgency_immediate_days {
                self.thresholds.urgency_immediate_days = days;
            }
            if let Some(days) = thresholds.urgency_urgent_days {
                self.thresholds.urgency_urgent_days = days;
            }
            if let Some(days) = thresholds.urgency_soon_days {
                self.thresholds.urgency_soon_days = days;
            }
            if let Some(ratio) = thresholds.stock_low_ratio {
                self.thresholds.stock_low_ratio = ratio;
            }
            if let Some(ratio) = thresholds.stock_high_ratio {
                self.thresholds.stock_high_ratio = ratio;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PARTSDESK_GATEWAY_BASE_URL") {
            self.gateway.base_url = value;
        }
        if let Some(value) = read_env("PARTSDESK_GATEWAY_TIMEOUT_SECS") {
            self.gateway.timeout_secs = parse_u64("PARTSDESK_GATEWAY_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("PARTSDESK_ACTING_USER_ID") {
            self.gateway.acting_user_id = UserId(parse_i64("PARTSDESK_ACTING_USER_ID", &value)?);
        }

        if let Some(value) = read_env("PARTSDESK_STOCK_LOW_RATIO") {
            self.thresholds.stock_low_ratio = parse_f64("PARTSDESK_STOCK_LOW_RATIO", &value)?;
        }
        if let Some(value) = read_env("PARTSDESK_STOCK_HIGH_RATIO") {
            self.thresholds.stock_high_ratio = parse_f64("PARTSDESK_STOCK_HIGH_RATIO", &value)?;
        }

        let log_level =
            read_env("PARTSDESK_LOGGING_LEVEL").or_else(|| read_env("PARTSDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PARTSDESK_LOGGING_FORMAT").or_else(|| read_env("PARTSDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.gateway.base_url = base_url;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.gateway.timeout_secs = timeout_secs;
        }
        if let Some(acting_user_id) = overrides.acting_user_id {
            self.gateway.acting_user_id = UserId(acting_user_id);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_gateway(&self.gateway)?;
        validate_thresholds(&self.thresholds)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("partsdesk.toml"), PathBuf::from("config/partsdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_gateway(gateway: &GatewayConfig) -> Result<(), ConfigError> {
    let base_url = gateway.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "gateway.base_url must start with http:// or https://".to_string(),
        ));
    }

    if gateway.timeout_secs == 0 || gateway.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "gateway.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if gateway.acting_user_id.0 <= 0 {
        return Err(ConfigError::Validation(
            "gateway.acting_user_id must be a positive user id".to_string(),
        ));
    }

    Ok(())
}

fn validate_thresholds(thresholds: &ThresholdConfig) -> Result<(), ConfigError> {
    let increasing = thresholds.urgency_immediate_days < thresholds.urgency_urgent_days
        && thresholds.urgency_urgent_days < thresholds.urgency_soon_days;
    if !increasing {
        return Err(ConfigError::Validation(
            "thresholds.urgency_*_days must be strictly increasing (immediate < urgent < soon)"
                .to_string(),
        ));
    }

    let low = thresholds.stock_low_ratio;
    let high = thresholds.stock_high_ratio;
    if !(low > 0.0 && low < high && high <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "thresholds.stock ratios must satisfy 0 < low < high <= 1 (got low={low}, high={high})"
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    gateway: Option<GatewayPatch>,
    thresholds: Option<ThresholdPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    acting_user_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ThresholdPatch {
    urgency_immediate_days: Option<i64>,
    urgency_urgent_days: Option<i64>,
    urgency_soon_days: Option<i64>,
    stock_low_ratio: Option<f64>,
    stock_high_ratio: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
