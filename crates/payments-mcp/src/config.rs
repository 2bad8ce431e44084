use std::env;

use url::Url;

pub const DEFAULT_WOOVI_BASE_URL: &str = "https://api.openpix.com.br/api/v1";
pub const DEFAULT_PAGARME_BASE_URL: &str = "https://api.pagar.me/core/v5";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Credentials and endpoints for the upstream payment providers.
///
/// Credentials are optional at startup: a tool whose provider is not
/// configured fails at call time with a tool-level error.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Woovi/OpenPix application id, sent verbatim as `Authorization`
    pub woovi_app_id: Option<String>,
    /// Woovi API base, without trailing slash
    pub woovi_base_url: String,
    /// Pagar.me secret key (basic auth username)
    pub pagarme_api_key: Option<String>,
    /// Pagar.me public key, fallback for tokenization tools
    pub pagarme_public_key: Option<String>,
    /// Pagar.me Core API base, without trailing slash
    pub pagarme_base_url: String,
    /// Per-request upstream timeout
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field(
                "woovi_app_id",
                &self.woovi_app_id.as_ref().map(|_| "[REDACTED]"),
            )
            .field("woovi_base_url", &self.woovi_base_url)
            .field(
                "pagarme_api_key",
                &self.pagarme_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "pagarme_public_key",
                &self.pagarme_public_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("pagarme_base_url", &self.pagarme_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            woovi_app_id: None,
            woovi_base_url: DEFAULT_WOOVI_BASE_URL.to_string(),
            pagarme_api_key: None,
            pagarme_public_key: None,
            pagarme_base_url: DEFAULT_PAGARME_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let woovi_base_url = base_url(
            non_empty("WOOVI_BASE_URL").unwrap_or_else(|| DEFAULT_WOOVI_BASE_URL.to_string()),
        )?;
        let pagarme_base_url = base_url(
            non_empty("PAGARME_BASE_URL").unwrap_or_else(|| DEFAULT_PAGARME_BASE_URL.to_string()),
        )?;

        let request_timeout_secs = match non_empty("PROVIDER_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidNumber {
                    name: "PROVIDER_TIMEOUT_SECS",
                    value: raw,
                })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let config = Self {
            woovi_app_id: non_empty("WOOVI_APP_ID"),
            woovi_base_url,
            pagarme_api_key: non_empty("PAGARME_API_KEY"),
            pagarme_public_key: non_empty("PAGARME_PUBLIC_KEY"),
            pagarme_base_url,
            request_timeout_secs,
        };

        if config.woovi_app_id.is_none() {
            tracing::warn!("WOOVI_APP_ID not set; woovi_* tools will fail until configured");
        }
        if config.pagarme_api_key.is_none() {
            tracing::warn!("PAGARME_API_KEY not set; pagarme_* tools will fail until configured");
        }

        Ok(config)
    }
}

/// Validate a base URL and strip the trailing slash.
fn base_url(raw: String) -> Result<String, ConfigError> {
    Url::parse(&raw).map_err(|_| ConfigError::InvalidUrl(raw.clone()))?;
    Ok(raw.trim_end_matches('/').to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_credentials() {
        let config = ProviderConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.woovi_app_id.is_none());
        assert!(config.pagarme_api_key.is_none());
        assert_eq!(config.woovi_base_url, DEFAULT_WOOVI_BASE_URL);
        assert_eq!(config.pagarme_base_url, DEFAULT_PAGARME_BASE_URL);
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let config = ProviderConfig::from_lookup(lookup(&[(
            "WOOVI_BASE_URL",
            "https://api.woovi-sandbox.com/api/v1/",
        )]))
        .unwrap();
        assert_eq!(config.woovi_base_url, "https://api.woovi-sandbox.com/api/v1");
    }

    #[test]
    fn test_blank_credentials_are_unset() {
        let config =
            ProviderConfig::from_lookup(lookup(&[("PAGARME_API_KEY", "   ")])).unwrap();
        assert!(config.pagarme_api_key.is_none());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = ProviderConfig::from_lookup(lookup(&[("PAGARME_BASE_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ProviderConfig::from_lookup(lookup(&[
            ("WOOVI_APP_ID", "app-id-value"),
            ("PAGARME_API_KEY", "secret-key-value"),
        ]))
        .unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("app-id-value"));
        assert!(!printed.contains("secret-key-value"));
        assert!(printed.contains("[REDACTED]"));
    }
}
