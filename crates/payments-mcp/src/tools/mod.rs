//! MCP tools backed by the payment providers.
//!
//! Every tool follows the same path: arguments are deserialized and checked
//! by [`crate::validation::parse_input`], then forwarded to the provider.
//! Errors of any kind become an `isError` [`ToolOutput`]; they never fail the
//! JSON-RPC request that carried the call.

pub mod pagarme;
pub mod woovi;

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::ToolError;
use crate::providers::Providers;

/// Entry in the `tools/list` result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub(crate) fn new<T: JsonSchema>(
        name: &'static str,
        title: &'static str,
        description: &'static str,
    ) -> Self {
        let mut input_schema = schemars::schema_for!(T).to_value();
        if let Some(obj) = input_schema.as_object_mut() {
            obj.remove("$schema");
        }
        Self {
            name,
            title,
            description,
            input_schema,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    pub content: Vec<TextContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolOutput {
    /// Success: pretty JSON as text, plus the value itself when it is an object.
    pub fn ok(data: Value) -> Self {
        let text = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());
        let structured_content = data.is_object().then_some(data);
        Self {
            content: vec![TextContent { kind: "text", text }],
            structured_content,
            is_error: false,
        }
    }

    pub fn fail(err: &ToolError) -> Self {
        let message = match err {
            ToolError::Upstream { status, body } => {
                serde_json::json!({ "statusCode": status, "body": body }).to_string()
            }
            other => other.to_string(),
        };
        Self {
            content: vec![TextContent {
                kind: "text",
                text: format!("API error: {message}"),
            }],
            structured_content: None,
            is_error: true,
        }
    }

    pub fn from_result(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(&e),
        }
    }
}

/// First non-null member among `keys`, for payloads with alternative spellings.
pub(crate) fn first_of(value: &Value, keys: &[&str]) -> Value {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null)
}

/// All tools exposed by the server, shared by every session.
pub struct ToolRegistry {
    providers: Providers,
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new(config: ProviderConfig) -> Result<Self, ToolError> {
        let mut definitions = pagarme::definitions();
        definitions.extend(woovi::definitions());
        Ok(Self {
            providers: Providers::new(config)?,
            definitions,
        })
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }

    /// Run a tool. Returns `None` for an unknown tool name.
    pub async fn call(&self, name: &str, args: Value) -> Option<ToolOutput> {
        if !self.contains(name) {
            return None;
        }

        let result = if name.starts_with("pagarme_") {
            pagarme::call(&self.providers, name, args).await
        } else {
            woovi::call(&self.providers, name, args).await
        }?;

        match &result {
            Ok(_) => tracing::debug!(tool = name, "tool call succeeded"),
            Err(ToolError::InvalidInput(reason)) => {
                tracing::debug!(tool = name, reason = %reason, "tool input rejected")
            }
            Err(e) => tracing::warn!(tool = name, error = %e, "tool call failed"),
        }

        Some(ToolOutput::from_result(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_output_shape() {
        let out = serde_json::to_value(ToolOutput::ok(json!({"id": "ch_1"}))).unwrap();
        assert_eq!(out["content"][0]["type"], "text");
        assert!(out["content"][0]["text"].as_str().unwrap().contains("ch_1"));
        assert_eq!(out["structuredContent"]["id"], "ch_1");
        assert!(out.get("isError").is_none());
    }

    #[test]
    fn test_non_object_payload_has_no_structured_content() {
        let out = ToolOutput::ok(json!([1, 2]));
        assert!(out.structured_content.is_none());
    }

    #[test]
    fn test_upstream_failure_rendering() {
        let err = ToolError::Upstream {
            status: 401,
            body: json!({"message": "Authorization has been denied"}),
        };
        let out = serde_json::to_value(ToolOutput::fail(&err)).unwrap();
        assert_eq!(out["isError"], true);
        let text = out["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("API error: "));
        assert!(text.contains("\"statusCode\":401"));
    }

    #[test]
    fn test_registry_lists_every_tool_once() {
        let registry = ToolRegistry::new(ProviderConfig::default()).unwrap();
        let names: Vec<_> = registry.definitions().iter().map(|d| d.name).collect();
        assert_eq!(names.len(), 25);
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
        assert!(names.contains(&"pagarme_create_order_pix_split"));
        assert!(names.contains(&"woovi_verify_webhook_hmac"));
    }

    #[test]
    fn test_schemas_are_objects_with_camel_case_fields() {
        let registry = ToolRegistry::new(ProviderConfig::default()).unwrap();
        for def in registry.definitions() {
            assert_eq!(def.input_schema["type"], "object", "{}", def.name);
        }
        let customer = registry
            .definitions()
            .iter()
            .find(|d| d.name == "pagarme_create_customer")
            .unwrap();
        assert!(customer.input_schema["properties"]["idempotencyKey"].is_object());
        assert!(customer.input_schema["properties"]["idempotency_key"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_none() {
        let registry = ToolRegistry::new(ProviderConfig::default()).unwrap();
        assert!(registry.call("stripe_charge", json!({})).await.is_none());
    }
}
