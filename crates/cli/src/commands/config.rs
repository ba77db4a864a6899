use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use partsdesk_core::config::{resolve_config_path, LoadOptions, PortalConfig};
use toml::Value;

use crate::commands::CommandResult;

const COMMAND: &str = "config";

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match PortalConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let gateway = &config.gateway;
    let thresholds = &config.thresholds;
    let fields: Vec<(&str, String, String)> = vec![
        (
            "gateway.base_url",
            gateway.base_url.clone(),
            source("gateway.base_url", &["PARTSDESK_GATEWAY_BASE_URL"]),
        ),
        (
            "gateway.timeout_secs",
            gateway.timeout_secs.to_string(),
            source("gateway.timeout_secs", &["PARTSDESK_GATEWAY_TIMEOUT_SECS"]),
        ),
        (
            "gateway.acting_user_id",
            gateway.acting_user_id.to_string(),
            source("gateway.acting_user_id", &["PARTSDESK_ACTING_USER_ID"]),
        ),
        (
            "thresholds.urgency_immediate_days",
            thresholds.urgency_immediate_days.to_string(),
            source("thresholds.urgency_immediate_days", &[]),
        ),
        (
            "thresholds.urgency_urgent_days",
            thresholds.urgency_urgent_days.to_string(),
            source("thresholds.urgency_urgent_days", &[]),
        ),
        (
            "thresholds.urgency_soon_days",
            thresholds.urgency_soon_days.to_string(),
            source("thresholds.urgency_soon_days", &[]),
        ),
        (
            "thresholds.stock_low_ratio",
            thresholds.stock_low_ratio.to_string(),
            source("thresholds.stock_low_ratio", &["PARTSDESK_STOCK_LOW_RATIO"]),
        ),
        (
            "thresholds.stock_high_ratio",
            thresholds.stock_high_ratio.to_string(),
            source("thresholds.stock_high_ratio", &["PARTSDESK_STOCK_HIGH_RATIO"]),
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["PARTSDESK_LOGGING_LEVEL", "PARTSDESK_LOG_LEVEL"]),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            source("logging.format", &["PARTSDESK_LOGGING_FORMAT", "PARTSDESK_LOG_FORMAT"]),
        ),
    ];

    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];
    lines.extend(fields.iter().map(|(key, value, source)| render_line(key, value, source)));

    CommandResult::success_with(COMMAND, lines.join("\n"), Some(&config))
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }
    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }
    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: &str) -> String {
    format!("- {key} = {value} (source: {source})")
}
