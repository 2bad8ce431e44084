use std::env;
use std::time::Duration;

const DEFAULT_RATE_LIMIT_RPM: u32 = 600;
const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_TOMBSTONE_TTL_SECS: u64 = 3600;
const DEFAULT_SSE_KEEPALIVE_SECS: u64 = 15;

#[derive(Clone)]
pub struct ServerConfig {
    /// Listen port (`MCP_HTTP_PORT`, required)
    pub port: u16,
    /// Log every POST with session routing details
    pub debug: bool,
    /// CORS allowed origins
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute
    pub rate_limit_rpm: u32,
    /// Maximum accepted request body
    pub max_body_bytes: usize,
    /// How long a closed session id is remembered
    pub tombstone_ttl_secs: u64,
    /// Idle interval after which a standing stream sends a keep-alive comment
    pub sse_keepalive: Duration,
    /// Bearer token required for /metrics (None = public)
    pub metrics_token: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("debug", &self.debug)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("tombstone_ttl_secs", &self.tombstone_ttl_secs)
            .field("sse_keepalive", &self.sse_keepalive)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        // Required: port
        let raw_port = get("MCP_HTTP_PORT").ok_or(ConfigError::MissingRequired("MCP_HTTP_PORT"))?;
        let port = raw_port
            .parse::<u16>()
            .ok()
            .filter(|p| *p > 0)
            .ok_or(ConfigError::InvalidNumber {
                name: "MCP_HTTP_PORT",
                value: raw_port,
            })?;

        let debug = get("MCP_HTTP_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let allowed_origins: Vec<String> = get("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:6274".to_string(),
                ]
            });

        let rate_limit_rpm = parse_or("RATE_LIMIT_RPM", get("RATE_LIMIT_RPM"), DEFAULT_RATE_LIMIT_RPM)?;
        let max_body_bytes = parse_or("MAX_BODY_BYTES", get("MAX_BODY_BYTES"), DEFAULT_MAX_BODY_BYTES)?;
        let tombstone_ttl_secs = parse_or(
            "SESSION_TOMBSTONE_TTL_SECS",
            get("SESSION_TOMBSTONE_TTL_SECS"),
            DEFAULT_TOMBSTONE_TTL_SECS,
        )?;
        let sse_keepalive = Duration::from_secs(parse_or(
            "SSE_KEEPALIVE_SECS",
            get("SSE_KEEPALIVE_SECS"),
            DEFAULT_SSE_KEEPALIVE_SECS,
        )?);

        let metrics_token = get("METRICS_TOKEN");
        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set; /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            port,
            debug,
            allowed_origins,
            rate_limit_rpm,
            max_body_bytes,
            tombstone_ttl_secs,
            sse_keepalive,
            metrics_token,
        })
    }
}

/// Parse a positive number, falling back to `default` when unset.
fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .ok()
            .filter(|n| *n > T::default())
            .ok_or(ConfigError::InvalidNumber { name, value: raw }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
}
