use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::background::OverflowPolicy;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/helpdesk";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PORTAL_DOMAIN: &str = "helpdesk.local";
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// What happens to an already persisted comment when the status transition
/// requested with it fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommentTransitionMode {
    /// The comment is kept.
    PersistFirst,
    /// The comment is deleted again before the error is returned.
    #[default]
    Compensate,
}

impl CommentTransitionMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "persist_first" => Some(CommentTransitionMode::PersistFirst),
            "compensate" => Some(CommentTransitionMode::Compensate),
            _ => None,
        }
    }
}

/// Business settings handed to the services. Fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct Settings {
    pub portal_domain: String,
    pub comment_transition_mode: CommentTransitionMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            portal_domain: DEFAULT_PORTAL_DOMAIN.to_string(),
            comment_transition_mode: CommentTransitionMode::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub request_timeout: Duration,
    pub queue_capacity: usize,
    pub queue_overflow: OverflowPolicy,
    pub cors_allowed_origins: Option<String>,
    pub production: bool,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unparsable values fall back to
    /// their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = Settings {
            portal_domain: lookup("PORTAL_DOMAIN")
                .unwrap_or_else(|| DEFAULT_PORTAL_DOMAIN.to_string()),
            comment_transition_mode: parse_or(
                &lookup,
                "COMMENT_TRANSITION_MODE",
                CommentTransitionMode::parse,
                CommentTransitionMode::default(),
            ),
        };

        Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                |v| u32::from_str(v).ok(),
                DEFAULT_MAX_CONNECTIONS,
            ),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                |v| u64::from_str(v).ok(),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            queue_capacity: parse_or(
                &lookup,
                "BACKGROUND_QUEUE_CAPACITY",
                |v| usize::from_str(v).ok().filter(|capacity| *capacity > 0),
                DEFAULT_QUEUE_CAPACITY,
            ),
            queue_overflow: parse_or(
                &lookup,
                "BACKGROUND_QUEUE_OVERFLOW",
                OverflowPolicy::parse,
                OverflowPolicy::default(),
            ),
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS"),
            production: lookup("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
            settings,
        }
    }
}

fn parse_or<F, P, T>(lookup: &F, key: &str, parse: P, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    match lookup(key) {
        None => default,
        Some(raw) => parse(raw.trim()).unwrap_or_else(|| {
            tracing::warn!(key, value = %raw, "Config: invalid value, using default");
            default
        }),
    }
}
