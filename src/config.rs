use std::time::Duration;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_LANGS: &str = "en";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub default_langs: Vec<String>,
    pub default_join: bool,
    pub provider_timeout: Duration,
    pub youtube_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Blank values are
    /// treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match var("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                expected: "a TCP port number",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let default_langs = var("TRANSCRIPT_DEFAULT_LANGS")
            .map(|raw| parse_langs(&raw))
            .filter(|langs| !langs.is_empty())
            .unwrap_or_else(|| parse_langs(DEFAULT_LANGS));

        let default_join = var("TRANSCRIPT_DEFAULT_JOIN")
            .map(|raw| parse_join(&raw))
            .unwrap_or(false);

        let timeout_secs = match var("PROVIDER_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid {
                    var: "PROVIDER_TIMEOUT_SECS",
                    expected: "a positive number of seconds",
                    value: raw,
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let youtube_base_url = var("YOUTUBE_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_YOUTUBE_BASE_URL.to_string());

        Ok(Self {
            port,
            default_langs,
            default_join,
            provider_timeout: Duration::from_secs(timeout_secs),
            youtube_base_url,
        })
    }
}

/// Splits a comma-separated language list, dropping blank entries.
pub fn parse_langs(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect()
}

/// Only `true`, in any case, enables joining.
pub fn parse_join(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}
