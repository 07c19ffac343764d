//! Process configuration, loaded from environment variables at startup.

use framekit_hub::HubConfig;
use framekit_hub::api::{DEFAULT_ENDPOINT, MAX_PAGE_SIZE};

/// Runtime configuration for the framekit CLI.
///
/// Every field has a default so the tool runs without any environment
/// variables set. Per-command values (output root, bucket, ...) come from
/// CLI flags instead.
#[derive(Debug, Clone)]
pub struct Config {
    /// `tracing` filter string, e.g. `"info"` or `"debug,reqwest=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Base URL of the datasets-server rows API.
    pub hub_endpoint: String,

    /// Rows requested per page (1..=100).
    pub hub_page_size: usize,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            log_level: env_or("FRAMEKIT_LOG", "info"),
            log_json: std::env::var("FRAMEKIT_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            hub_endpoint: env_or("FRAMEKIT_HUB_ENDPOINT", DEFAULT_ENDPOINT),
            hub_page_size: parse_env("FRAMEKIT_HUB_PAGE_SIZE", MAX_PAGE_SIZE),
        }
    }

    /// Hub settings: token and proxy from the environment, endpoint and page
    /// size from this config.
    pub fn hub(&self) -> HubConfig {
        HubConfig::from_env()
            .set_endpoint(&self.hub_endpoint)
            .set_page_size(self.hub_page_size)
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
