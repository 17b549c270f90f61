use chrono::Duration;
use thiserror::Error;

use crate::gate::route_table::{
    parse_patterns, DEFAULT_MACHINE_API_ROUTES, DEFAULT_PROTECTED_ROUTES, DEFAULT_PUBLIC_ROUTES,
};
use crate::gate::{GateConfig, RouteTable};

/// Upper bound for every TTL and interval setting (one year)
pub const MAX_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub gate: GateConfig,
    pub node: NodeConfig,
    /// Base URL of the email application that gated requests are forwarded to
    pub upstream_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub cache_sweep_interval_seconds: u64,
    pub config_cache_ttl_seconds: u64,
    pub min_password_len: usize,
    /// Adds the `Secure` attribute to the session cookie
    pub secure_cookies: bool,
    pub session_cache_capacity: usize,
    pub session_cache_ttl_seconds: u64,
    pub session_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cache_sweep_interval_seconds: 60,
            config_cache_ttl_seconds: 300, // 5 minutes
            min_password_len: 8,
            secure_cookies: false,
            session_cache_capacity: 10_000,
            session_cache_ttl_seconds: 300, // 5 minutes
            session_ttl_seconds: 3600,      // 1 hour
        }
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_seconds as i64)
    }

    pub fn config_cache_ttl(&self) -> Duration {
        Duration::seconds(self.config_cache_ttl_seconds as i64)
    }

    pub fn session_cache_ttl(&self) -> Duration {
        Duration::seconds(self.session_cache_ttl_seconds as i64)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let node_defaults = NodeConfig::default();
        let auth_defaults = AuthConfig::default();

        let bind_address = lookup("BIND_ADDRESS").unwrap_or(node_defaults.bind_address);
        let data_dir = lookup("DATA_DIR").unwrap_or(node_defaults.data_dir);

        let upstream_url = lookup("UPSTREAM_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        let number = |name: &str, default: u64| -> Result<u64, ConfigError> {
            match lookup(name) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    ConfigError::ValidationError(format!("{name} must be a non-negative integer"))
                }),
                None => Ok(default),
            }
        };

        let secure_cookies = lookup("SECURE_COOKIES")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(auth_defaults.secure_cookies);

        let auth = AuthConfig {
            cache_sweep_interval_seconds: number(
                "CACHE_SWEEP_INTERVAL_SECONDS",
                auth_defaults.cache_sweep_interval_seconds,
            )?,
            config_cache_ttl_seconds: number(
                "CONFIG_CACHE_TTL_SECONDS",
                auth_defaults.config_cache_ttl_seconds,
            )?,
            min_password_len: auth_defaults.min_password_len,
            secure_cookies,
            session_cache_capacity: number(
                "SESSION_CACHE_CAPACITY",
                auth_defaults.session_cache_capacity as u64,
            )? as usize,
            session_cache_ttl_seconds: number(
                "SESSION_CACHE_TTL_SECONDS",
                auth_defaults.session_cache_ttl_seconds,
            )?,
            session_ttl_seconds: number("SESSION_TTL_SECONDS", auth_defaults.session_ttl_seconds)?,
        };

        let routes = |name: &str, defaults: &[&str]| {
            let raw = lookup(name);
            let patterns = match raw.as_deref() {
                Some(list) => parse_patterns(list.split(',')),
                None => parse_patterns(defaults.iter().copied()),
            };
            patterns.map_err(|e| ConfigError::ValidationError(format!("{name}: {e}")))
        };

        let machine_api = routes("MACHINE_API_ROUTES", DEFAULT_MACHINE_API_ROUTES)?;
        let public = routes("PUBLIC_ROUTES", DEFAULT_PUBLIC_ROUTES)?;
        let protected = routes("PROTECTED_ROUTES", DEFAULT_PROTECTED_ROUTES)?;
        let table = RouteTable::from_lists(&machine_api, &public, &protected)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        let config = Config {
            auth,
            gate: GateConfig {
                routes: table,
                ..GateConfig::default()
            },
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            upstream_url,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.session_ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "SESSION_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }
        if self.auth.session_cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "SESSION_CACHE_CAPACITY must be greater than 0".to_string(),
            ));
        }
        if self.auth.cache_sweep_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "CACHE_SWEEP_INTERVAL_SECONDS must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("SESSION_TTL_SECONDS", self.auth.session_ttl_seconds),
            ("CONFIG_CACHE_TTL_SECONDS", self.auth.config_cache_ttl_seconds),
            ("SESSION_CACHE_TTL_SECONDS", self.auth.session_cache_ttl_seconds),
            (
                "CACHE_SWEEP_INTERVAL_SECONDS",
                self.auth.cache_sweep_interval_seconds,
            ),
        ] {
            if value > MAX_TTL_SECONDS {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be at most {MAX_TTL_SECONDS}"
                )));
            }
        }
        if let Some(url) = &self.upstream_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "UPSTREAM_URL must be an http(s) URL, got '{url}'"
                )));
            }
        }

        if self.auth.session_cache_ttl_seconds > self.auth.session_ttl_seconds {
            tracing::warn!(
                "SESSION_CACHE_TTL_SECONDS ({}) exceeds SESSION_TTL_SECONDS ({}). \
                 Expired sessions may be accepted from cache.",
                self.auth.session_cache_ttl_seconds,
                self.auth.session_ttl_seconds
            );
        }

        Ok(())
    }
}
