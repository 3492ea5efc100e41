//! Startup configuration from the environment
//!
//! A `.env` file in the working directory is read first when present;
//! variables already set in the process environment win.

use crate::llm::DEFAULT_BASE_URL;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_PORT: u16 = 8501;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY not found in environment variables. Please set it in a .env file.")]
    MissingApiKey,
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Server and model settings
#[derive(Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub model: String,
    pub gemini_base_url: String,
    pub request_timeout: Duration,
    /// Reply length cap sent with every request; unset means model default
    pub max_output_tokens: Option<u32>,
    /// Sessions idle this long with no open stream are dropped
    pub session_idle: Duration,
    pub bind: IpAddr,
    pub port: u16,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("gemini_api_key", &"<redacted>")
            .field("model", &self.model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("session_idle", &self.session_idle)
            .field("bind", &self.bind)
            .field("port", &self.port)
            .finish()
    }
}

impl AppConfig {
    /// Load `.env` (if any) and read the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::info!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
        }
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let gemini_api_key = non_blank(API_KEY_VAR)
            .map(|k| k.trim().to_string())
            .ok_or(ConfigError::MissingApiKey)?;

        let model = non_blank("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let gemini_base_url =
            non_blank("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let request_timeout = Duration::from_secs(parse_or(
            non_blank("GEMINI_TIMEOUT_SECS"),
            "GEMINI_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);
        let max_output_tokens = non_blank("GEMINI_MAX_OUTPUT_TOKENS")
            .map(|raw| {
                raw.trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|&max| max > 0)
                    .ok_or(ConfigError::Invalid {
                        var: "GEMINI_MAX_OUTPUT_TOKENS",
                        value: raw,
                    })
            })
            .transpose()?;
        let idle_raw = non_blank("WHITEBOX_SESSION_IDLE_SECS");
        let session_idle = match parse_or(
            idle_raw.clone(),
            "WHITEBOX_SESSION_IDLE_SECS",
            DEFAULT_SESSION_IDLE_SECS,
        )? {
            0 => {
                return Err(ConfigError::Invalid {
                    var: "WHITEBOX_SESSION_IDLE_SECS",
                    value: idle_raw.unwrap_or_default(),
                })
            }
            secs => Duration::from_secs(secs),
        };
        let bind = parse_or(
            non_blank("WHITEBOX_BIND"),
            "WHITEBOX_BIND",
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        )?;
        let port = parse_or(non_blank("WHITEBOX_PORT"), "WHITEBOX_PORT", DEFAULT_PORT)?;

        Ok(Self {
            gemini_api_key,
            model,
            gemini_base_url,
            request_timeout,
            max_output_tokens,
            session_idle,
            bind,
            port,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}
