use std::time::Duration;

use crate::error::{Result, SessionError};

pub const DEFAULT_TTL_SECS: u64 = 3600;
pub const DEFAULT_KEY_PREFIX: &str = "chat:session:";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionBackend {
    /// Process memory; lost on restart.
    Memory,
    Redis { url: String, key_prefix: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    /// Refreshed on every write.
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Memory,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
        }
    }
}

impl SessionConfig {
    /// Reads `SESSION_STORE`, `REDIS_URL`, `REDIS_KEY_PREFIX`, `SESSION_TTL_SECS`.
    pub fn from_env() -> Result<Self> {
        let ttl_secs = match env_opt("SESSION_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| SessionError::Config(format!("SESSION_TTL_SECS='{raw}': {e}")))?,
            None => DEFAULT_TTL_SECS,
        };
        if ttl_secs == 0 {
            return Err(SessionError::Config("SESSION_TTL_SECS must be > 0".into()));
        }

        let backend = match env_opt("SESSION_STORE")
            .unwrap_or_else(|| "memory".into())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => SessionBackend::Memory,
            "redis" => SessionBackend::Redis {
                url: env_opt("REDIS_URL").ok_or_else(|| {
                    SessionError::Config("REDIS_URL is required when SESSION_STORE=redis".into())
                })?,
                key_prefix: env_opt("REDIS_KEY_PREFIX").unwrap_or_else(|| DEFAULT_KEY_PREFIX.into()),
            },
            other => {
                return Err(SessionError::Config(format!(
                    "SESSION_STORE='{other}' is not one of memory|redis"
                )));
            }
        };

        Ok(Self {
            backend,
            ttl: Duration::from_secs(ttl_secs),
        })
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
