use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::read_response;
use crate::error::ToolError;

/// Woovi/OpenPix REST client. The app id is sent verbatim as `Authorization`.
#[derive(Clone)]
pub struct WooviClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
}

impl std::fmt::Debug for WooviClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooviClient")
            .field("base_url", &self.base_url)
            .field("app_id", &"[REDACTED]")
            .finish()
    }
}

impl WooviClient {
    pub fn new(http: reqwest::Client, base_url: &str, app_id: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_id,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(AUTHORIZATION, &self.app_id)
            .header(ACCEPT, "application/json")
    }

    pub async fn get<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<Value, ToolError> {
        tracing::debug!(path, "woovi GET");
        let resp = self.request(Method::GET, path).query(query).send().await?;
        read_response(resp).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ToolError> {
        tracing::debug!(path, "woovi POST");
        let resp = self.request(Method::POST, path).json(body).send().await?;
        read_response(resp).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ToolError> {
        tracing::debug!(path, "woovi DELETE");
        let resp = self.request(Method::DELETE, path).send().await?;
        read_response(resp).await
    }
}
