use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::read_response;
use crate::error::ToolError;

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Pagar.me Core API v5 client.
///
/// Authenticated clients use HTTP basic auth with the secret key as user and
/// an empty password. Tokenization calls use an unauthenticated client and
/// pass the public key as `appId`.
#[derive(Clone)]
pub struct PagarmeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for PagarmeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagarmeClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl PagarmeClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        idempotency_key: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            req = req.basic_auth(key, Some(""));
        }
        if let Some(idem) = idempotency_key {
            req = req.header(IDEMPOTENCY_HEADER, idem);
        }
        req
    }

    pub async fn get<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<Value, ToolError> {
        tracing::debug!(path, "pagarme GET");
        let resp = self.request(Method::GET, path, None).query(query).send().await?;
        read_response(resp).await
    }

    pub async fn post<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
        body: &Value,
        idempotency_key: Option<&str>,
    ) -> Result<Value, ToolError> {
        tracing::debug!(path, "pagarme POST");
        let resp = self
            .request(Method::POST, path, idempotency_key)
            .query(query)
            .json(body)
            .send()
            .await?;
        read_response(resp).await
    }

    pub async fn patch(
        &self,
        path: &str,
        body: &Value,
        idempotency_key: Option<&str>,
    ) -> Result<Value, ToolError> {
        tracing::debug!(path, "pagarme PATCH");
        let resp = self
            .request(Method::PATCH, path, idempotency_key)
            .json(body)
            .send()
            .await?;
        read_response(resp).await
    }

    pub async fn delete(
        &self,
        path: &str,
        body: Option<&Value>,
        idempotency_key: Option<&str>,
    ) -> Result<Value, ToolError> {
        tracing::debug!(path, "pagarme DELETE");
        let mut req = self.request(Method::DELETE, path, idempotency_key);
        if let Some(body) = body {
            req = req.json(body);
        }
        read_response(req.send().await?).await
    }
}
