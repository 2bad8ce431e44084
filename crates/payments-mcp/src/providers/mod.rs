//! HTTP clients for the upstream payment providers.
//!
//! All clients share one `reqwest::Client` built with a request timeout and
//! redirects disabled. Clients are cheap to construct and are built per call
//! from [`Providers`], so a missing credential surfaces as a tool error at
//! call time rather than at startup.

pub mod pagarme;
pub mod woovi;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::ToolError;

pub use pagarme::PagarmeClient;
pub use woovi::WooviClient;

/// Empty query string for calls without parameters.
pub(crate) const NO_QUERY: &[(&str, &str)] = &[];

/// Shared HTTP client plus provider configuration.
#[derive(Clone)]
pub struct Providers {
    http: reqwest::Client,
    config: Arc<ProviderConfig>,
}

impl Providers {
    pub fn new(config: ProviderConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!(
                "payments-integration-mcp/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn woovi(&self) -> Result<WooviClient, ToolError> {
        let app_id = self
            .config
            .woovi_app_id
            .clone()
            .ok_or(ToolError::MissingCredential("WOOVI_APP_ID"))?;
        Ok(WooviClient::new(
            self.http.clone(),
            &self.config.woovi_base_url,
            app_id,
        ))
    }

    pub fn pagarme(&self) -> Result<PagarmeClient, ToolError> {
        let api_key = self
            .config
            .pagarme_api_key
            .clone()
            .ok_or(ToolError::MissingCredential("PAGARME_API_KEY"))?;
        Ok(PagarmeClient::new(
            self.http.clone(),
            &self.config.pagarme_base_url,
            Some(api_key),
        ))
    }

    /// Client for the tokenization endpoints, which authenticate with the
    /// public key in the query string instead of the secret key.
    ///
    /// `public_key` overrides `PAGARME_PUBLIC_KEY` when given.
    pub fn pagarme_public(
        &self,
        public_key: Option<&str>,
    ) -> Result<(PagarmeClient, String), ToolError> {
        let public_key = public_key
            .map(str::to_string)
            .or_else(|| self.config.pagarme_public_key.clone())
            .ok_or_else(|| {
                ToolError::Rejected(
                    "public key missing: pass publicKey or set PAGARME_PUBLIC_KEY".to_string(),
                )
            })?;
        let client = PagarmeClient::new(self.http.clone(), &self.config.pagarme_base_url, None);
        Ok((client, public_key))
    }
}

/// Read an upstream response. Non-2xx statuses become
/// [`ToolError::Upstream`] carrying the decoded body.
pub(crate) async fn read_response(resp: reqwest::Response) -> Result<Value, ToolError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    into_result(status, decode_body(&text))
}

fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn into_result(status: u16, body: Value) -> Result<Value, ToolError> {
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        tracing::debug!(status, "upstream returned an error status");
        Err(ToolError::Upstream { status, body })
    }
}

/// Percent-encode a path segment.
pub(crate) fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}
