//! Gateway configuration with validation.
//!
//! One HTTP listener serves the REST operator API and the WebSocket
//! upgrade route side by side, so unlike a multi-port JSON-RPC gateway
//! there is only one bind address to configure (§6).

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration.
    pub http: HttpConfig,
    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,
    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
    /// CORS configuration.
    pub cors: CorsConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            rate_limit: RateLimitConfig::default(),
            timeouts: TimeoutConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.enabled && self.rate_limit.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "requests_per_second cannot be 0 while rate limiting is enabled".into(),
            ));
        }

        if self.timeouts.default.as_millis() == 0 {
            return Err(ConfigError::InvalidTimeout("default timeout cannot be 0".into()));
        }

        Ok(())
    }

    /// The single bind address this gateway listens on.
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: IpAddr,
    /// Port. 7420 has no special meaning beyond staying out of the way of
    /// common local dev ports.
    pub port: u16,
    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 7420,
            keep_alive: Duration::from_secs(75),
        }
    }
}

/// Rate limiting configuration (§7 resource errors: `overloaded`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Read requests (GET) allowed per second per IP.
    pub requests_per_second: u32,
    /// Write requests (everything else) allowed per second per IP.
    pub writes_per_second: u32,
    /// Burst allowance for reads; writes get a tenth of this.
    pub burst_size: u32,
    pub enabled: bool,
    /// IPs exempt from rate limiting (operator tooling, health checks).
    pub whitelist: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 100,
            writes_per_second: 20,
            burst_size: 200,
            enabled: true,
            whitelist: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Applied uniformly to every route; the operator API has no
    /// per-endpoint latency tiers the way a JSON-RPC method registry would.
    #[serde(with = "humantime_serde")]
    pub default: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { default: Duration::from_secs(10) }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age: u64,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()],
            allowed_headers: vec!["Content-Type".to_string()],
            expose_headers: vec![],
            max_age: 86_400,
            allow_credentials: false,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(secs) = s.strip_suffix('s') {
            secs.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| "invalid seconds")
        } else if let Some(ms) = s.strip_suffix("ms") {
            ms.trim().parse::<u64>().map(Duration::from_millis).map_err(|_| "invalid milliseconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            s.parse::<u64>().map(Duration::from_secs).map_err(|_| "invalid duration format")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http.port, 7420);
    }

    #[test]
    fn zero_rate_limit_when_enabled_is_rejected() {
        let mut config = GatewayConfig::default();
        config.rate_limit.requests_per_second = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRateLimit(_))));
    }

    #[test]
    fn zero_rate_limit_when_disabled_is_accepted() {
        let mut config = GatewayConfig::default();
        config.rate_limit.requests_per_second = 0;
        config.rate_limit.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_default_timeout_is_rejected() {
        let mut config = GatewayConfig::default();
        config.timeouts.default = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout(_))));
    }

    #[test]
    fn http_addr_uses_configured_port() {
        let config = GatewayConfig::default();
        assert_eq!(config.http_addr().port(), 7420);
    }
}
