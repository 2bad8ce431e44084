//! Woovi/OpenPix tools.
//!
//! Charge payloads come back in a few shapes depending on endpoint and API
//! revision. [`normalize_charge`] flattens them into one summary while
//! keeping the raw response alongside.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{first_of, ToolDefinition};
use crate::error::ToolError;
use crate::hmac::{verify_signature, WebhookAlgorithm};
use crate::providers::{segment, Providers, NO_QUERY};
use crate::validation::{parse_input, Validate, Validator};

/// Tax id, either bare or with an explicit type.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TaxId {
    Plain(String),
    Detailed {
        #[serde(rename = "taxID")]
        tax_id: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
}

impl TaxId {
    fn value(&self) -> &str {
        match self {
            TaxId::Plain(v) => v,
            TaxId::Detailed { tax_id, .. } => tax_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CustomerAddress {
    pub zipcode: String,
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
}

impl Validate for CustomerAddress {
    fn validate(&self, v: &mut Validator) {
        v.min_len("zipcode", &self.zipcode, 5);
        v.min_len("street", &self.street, 1);
        v.min_len("number", &self.number, 1);
        v.min_len("neighborhood", &self.neighborhood, 1);
        v.min_len("city", &self.city, 1);
        v.min_len("state", &self.state, 2);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Customer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "taxID", default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<TaxId>,
    #[serde(rename = "correlationID", default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<CustomerAddress>,
}

impl Validate for Customer {
    fn validate(&self, v: &mut Validator) {
        v.min_len("name", &self.name, 1);
        if let Some(email) = &self.email {
            v.email("email", email);
        }
        v.opt_min_len("phone", self.phone.as_deref(), 8);
        if let Some(tax_id) = &self.tax_id {
            v.min_len("taxID", tax_id.value(), 5);
        }
        v.opt_min_len("correlationID", self.correlation_id.as_deref(), 1);
        if let Some(address) = &self.address {
            v.nested("address", |v| address.validate(v));
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateChargeInput {
    #[serde(rename = "correlationID")]
    pub correlation_id: String,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Validate for CreateChargeInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("correlationID", &self.correlation_id, 1);
        v.positive("value", self.value);
        v.opt_max_len("comment", self.comment.as_deref(), 140);
        if let Some(customer) = &self.customer {
            v.nested("customer", |v| customer.validate(v));
        }
    }
}

/// Charge or refund id; also accepts a correlationID where the API does.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct IdInput {
    pub id: String,
}

impl Validate for IdInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("id", &self.id, 1);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeStatus {
    Active,
    Completed,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListChargesInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ChargeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
}

impl Validate for ListChargesInput {
    fn validate(&self, _v: &mut Validator) {}
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateRefundInput {
    #[serde(rename = "transactionEndToEndId")]
    pub transaction_end_to_end_id: String,
    #[serde(rename = "correlationID")]
    pub correlation_id: String,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Validate for CreateRefundInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("transactionEndToEndId", &self.transaction_end_to_end_id, 1);
        v.min_len("correlationID", &self.correlation_id, 1);
        v.positive("value", self.value);
        v.opt_max_len("comment", self.comment.as_deref(), 140);
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListRefundsInput {}

impl Validate for ListRefundsInput {
    fn validate(&self, _v: &mut Validator) {}
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateChargeRefundInput {
    #[serde(skip_serializing)]
    pub id: String,
    pub value: i64,
    #[serde(rename = "correlationID")]
    pub correlation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(
        rename = "transactionEndToEndId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_end_to_end_id: Option<String>,
}

impl Validate for CreateChargeRefundInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("id", &self.id, 1);
        v.positive("value", self.value);
        v.min_len("correlationID", &self.correlation_id, 1);
        v.opt_max_len("comment", self.comment.as_deref(), 140);
        v.opt_min_len(
            "transactionEndToEndId",
            self.transaction_end_to_end_id.as_deref(),
            1,
        );
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VerifyWebhookHmacInput {
    pub secret: String,
    pub signature: String,
    /// Raw request body exactly as received.
    pub body: String,
    #[serde(default)]
    pub algorithm: WebhookAlgorithm,
}

impl Validate for VerifyWebhookHmacInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("secret", &self.secret, 1);
        v.min_len("signature", &self.signature, 1);
        v.min_len("body", &self.body, 1);
    }
}

/// Summarise a charge response into `{charge, pix, raw}`.
///
/// Accepts both `{charge: {...}}` envelopes and bare charge objects, and
/// tolerates the alternative spellings seen across API revisions.
pub fn normalize_charge(data: &Value) -> Value {
    let charge = match data.get("charge") {
        Some(c) if !c.is_null() => c,
        _ => data,
    };
    if charge.is_null() {
        return json!({ "charge": null, "pix": null, "raw": data });
    }

    let pix_method = charge
        .pointer("/paymentMethods/pix")
        .filter(|p| !p.is_null());
    let br_code = [
        data.get("brCode"),
        charge.get("brCode"),
        pix_method.and_then(|p| p.get("brCode")),
    ]
    .into_iter()
    .flatten()
    .find(|v| !v.is_null())
    .cloned()
    .unwrap_or(Value::Null);

    let correlation_id = match first_of(charge, &["correlationID"]) {
        Value::Null => first_of(data, &["correlationID"]),
        v => v,
    };

    let summary = json!({
        "correlationID": correlation_id,
        "identifier": first_of(charge, &["identifier", "transactionID", "transactionId"]),
        "transactionID": first_of(charge, &["transactionID", "transactionId"]),
        "status": first_of(charge, &["status"]),
        "value": first_of(charge, &["value"]),
        "fee": first_of(charge, &["fee"]),
        "expiresDate": first_of(charge, &["expiresDate", "expires_date"]),
        "expiresIn": first_of(charge, &["expiresIn", "expires_in"]),
        "pixKey": first_of(charge, &["pixKey"]),
        "paymentLinkUrl": first_of(charge, &["paymentLinkUrl", "paymentLinkURL"]),
        "qrCodeImage": first_of(charge, &["qrCodeImage", "qr_code_image"]),
        "brCode": br_code,
    });

    let pix = match pix_method {
        Some(p) => {
            let pix_br_code = match first_of(p, &["brCode"]) {
                Value::Null => br_code.clone(),
                v => v,
            };
            json!({
                "status": first_of(p, &["status"]),
                "txId": first_of(p, &["txId", "txid"]),
                "brCode": pix_br_code,
                "qrCodeImage": first_of(p, &["qrCodeImage"]),
                "transactionID": first_of(p, &["transactionID"]),
                "identifier": first_of(p, &["identifier"]),
                "value": first_of(p, &["value"]),
                "fee": first_of(p, &["fee"]),
            })
        }
        None => Value::Null,
    };

    json!({ "charge": summary, "pix": pix, "raw": data })
}

/// Summarise a charge list into `{charges, pageInfo, raw}`.
pub fn normalize_charge_list(data: &Value) -> Value {
    let items = ["charges", "data"]
        .iter()
        .find_map(|k| data.get(*k).and_then(Value::as_array))
        .or_else(|| data.as_array());

    let charges = match items {
        Some(items) => Value::Array(
            items
                .iter()
                .map(|c| normalize_charge(&json!({ "charge": c }))["charge"].clone())
                .collect(),
        ),
        None => Value::Null,
    };

    json!({
        "charges": charges,
        "pageInfo": first_of(data, &["pageInfo", "paging"]),
        "raw": data,
    })
}

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new::<CreateChargeInput>(
            "woovi_create_charge",
            "Woovi/OpenPix - Create Charge",
            "Create a Pix charge via POST /api/v1/charge.",
        ),
        ToolDefinition::new::<IdInput>(
            "woovi_get_charge",
            "Woovi/OpenPix - Get Charge",
            "Fetch a charge by id or correlationID via GET /api/v1/charge/{id}.",
        ),
        ToolDefinition::new::<ListChargesInput>(
            "woovi_list_charges",
            "Woovi/OpenPix - List Charges",
            "List charges via GET /api/v1/charge, filtered by start/end/status/customer/subscription.",
        ),
        ToolDefinition::new::<IdInput>(
            "woovi_delete_charge",
            "Woovi/OpenPix - Delete Charge",
            "Delete a charge via DELETE /api/v1/charge/{id}.",
        ),
        ToolDefinition::new::<CreateRefundInput>(
            "woovi_create_refund",
            "Woovi/OpenPix - Create Refund",
            "Create a refund by transactionEndToEndId via POST /api/v1/refund.",
        ),
        ToolDefinition::new::<ListRefundsInput>(
            "woovi_list_refunds",
            "Woovi/OpenPix - List Refunds",
            "List refunds via GET /api/v1/refund.",
        ),
        ToolDefinition::new::<IdInput>(
            "woovi_get_refund",
            "Woovi/OpenPix - Get Refund",
            "Fetch a refund by refund id or correlationID via GET /api/v1/refund/{id}.",
        ),
        ToolDefinition::new::<IdInput>(
            "woovi_get_charge_refunds",
            "Woovi/OpenPix - Get Charge Refunds",
            "List the refunds of a charge via GET /api/v1/charge/{id}/refund.",
        ),
        ToolDefinition::new::<CreateChargeRefundInput>(
            "woovi_create_charge_refund",
            "Woovi/OpenPix - Create Charge Refund",
            "Refund a charge via POST /api/v1/charge/{id}/refund.",
        ),
        ToolDefinition::new::<VerifyWebhookHmacInput>(
            "woovi_verify_webhook_hmac",
            "Woovi/OpenPix - Verify Webhook HMAC",
            "Check the X-OpenPix-Signature HMAC of a webhook body (base64, sha1 by default).",
        ),
    ]
}

pub(super) async fn call(
    providers: &Providers,
    name: &str,
    args: Value,
) -> Option<Result<Value, ToolError>> {
    let result = match name {
        "woovi_create_charge" => create_charge(providers, args).await,
        "woovi_get_charge" => get_charge(providers, args).await,
        "woovi_list_charges" => list_charges(providers, args).await,
        "woovi_delete_charge" => delete_charge(providers, args).await,
        "woovi_create_refund" => create_refund(providers, args).await,
        "woovi_list_refunds" => list_refunds(providers, args).await,
        "woovi_get_refund" => get_refund(providers, args).await,
        "woovi_get_charge_refunds" => get_charge_refunds(providers, args).await,
        "woovi_create_charge_refund" => create_charge_refund(providers, args).await,
        "woovi_verify_webhook_hmac" => verify_webhook_hmac(args),
        _ => return None,
    };
    Some(result)
}

async fn create_charge(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: CreateChargeInput = parse_input(args)?;
    let data = providers.woovi()?.post("/charge", &input).await?;
    Ok(normalize_charge(&data))
}

async fn get_charge(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: IdInput = parse_input(args)?;
    let data = providers
        .woovi()?
        .get(&format!("/charge/{}", segment(&input.id)), NO_QUERY)
        .await?;
    Ok(normalize_charge(&data))
}

async fn list_charges(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: ListChargesInput = parse_input(args)?;
    let data = providers.woovi()?.get("/charge", &input).await?;
    Ok(normalize_charge_list(&data))
}

async fn delete_charge(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: IdInput = parse_input(args)?;
    let data = providers
        .woovi()?
        .delete(&format!("/charge/{}", segment(&input.id)))
        .await?;
    Ok(json!({ "deleted": true, "raw": data }))
}

async fn create_refund(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: CreateRefundInput = parse_input(args)?;
    providers.woovi()?.post("/refund", &input).await
}

async fn list_refunds(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let _: ListRefundsInput = parse_input(args)?;
    providers.woovi()?.get("/refund", NO_QUERY).await
}

async fn get_refund(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: IdInput = parse_input(args)?;
    providers
        .woovi()?
        .get(&format!("/refund/{}", segment(&input.id)), NO_QUERY)
        .await
}

async fn get_charge_refunds(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: IdInput = parse_input(args)?;
    providers
        .woovi()?
        .get(&format!("/charge/{}/refund", segment(&input.id)), NO_QUERY)
        .await
}

async fn create_charge_refund(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: CreateChargeRefundInput = parse_input(args)?;
    providers
        .woovi()?
        .post(&format!("/charge/{}/refund", segment(&input.id)), &input)
        .await
}

fn verify_webhook_hmac(args: Value) -> Result<Value, ToolError> {
    let input: VerifyWebhookHmacInput = parse_input(args)?;
    let outcome = verify_signature(
        input.algorithm,
        input.secret.as_bytes(),
        input.body.as_bytes(),
        &input.signature,
    );
    if !outcome.valid {
        tracing::debug!("webhook signature mismatch");
    }
    Ok(serde_json::to_value(outcome)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    #[test]
    fn test_normalize_enveloped_charge() {
        let data = json!({
            "charge": {
                "correlationID": "order-1",
                "transactionID": "tx-9",
                "status": "ACTIVE",
                "value": 1000,
                "paymentLinkURL": "https://woovi.com/pay/abc",
                "paymentMethods": {"pix": {"status": "ACTIVE", "txid": "t1", "value": 1000}}
            },
            "brCode": "000201..."
        });
        let out = normalize_charge(&data);
        assert_eq!(out["charge"]["correlationID"], "order-1");
        assert_eq!(out["charge"]["identifier"], "tx-9");
        assert_eq!(out["charge"]["transactionID"], "tx-9");
        assert_eq!(out["charge"]["paymentLinkUrl"], "https://woovi.com/pay/abc");
        assert_eq!(out["charge"]["brCode"], "000201...");
        assert_eq!(out["pix"]["txId"], "t1");
        assert_eq!(out["pix"]["brCode"], "000201...");
        assert_eq!(out["raw"], data);
    }

    #[test]
    fn test_normalize_bare_charge_without_pix() {
        let data = json!({"correlationID": "c", "status": "COMPLETED", "expires_in": 60});
        let out = normalize_charge(&data);
        assert_eq!(out["charge"]["status"], "COMPLETED");
        assert_eq!(out["charge"]["expiresIn"], 60);
        assert!(out["pix"].is_null());
        assert!(out["charge"]["brCode"].is_null());
    }

    #[test]
    fn test_normalize_null_payload() {
        let out = normalize_charge(&Value::Null);
        assert!(out["charge"].is_null());
        assert!(out["pix"].is_null());
    }

    #[test]
    fn test_normalize_list_shapes() {
        let out = normalize_charge_list(&json!({
            "charges": [{"correlationID": "a"}, {"correlationID": "b"}],
            "pageInfo": {"hasNextPage": false}
        }));
        assert_eq!(out["charges"][1]["correlationID"], "b");
        assert_eq!(out["pageInfo"]["hasNextPage"], false);

        let out = normalize_charge_list(&json!([{"status": "EXPIRED"}]));
        assert_eq!(out["charges"][0]["status"], "EXPIRED");
        assert!(out["pageInfo"].is_null());

        let out = normalize_charge_list(&json!({"error": "x"}));
        assert!(out["charges"].is_null());
    }

    #[test]
    fn test_create_charge_rejects_unknown_customer_fields() {
        let err = parse_input::<CreateChargeInput>(json!({
            "correlationID": "c-1", "value": 100,
            "customer": {"name": "Ana", "nickname": "a"}
        }))
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn test_create_charge_rules() {
        let err = parse_input::<CreateChargeInput>(json!({
            "correlationID": "", "value": 0, "comment": "x".repeat(141),
            "customer": {"name": "Ana", "taxID": "123", "phone": "1234"}
        }))
        .unwrap_err()
        .to_string();
        assert!(err.contains("correlationID:"));
        assert!(err.contains("value:"));
        assert!(err.contains("comment:"));
        assert!(err.contains("customer.taxID:"));
        assert!(err.contains("customer.phone:"));
    }

    #[test]
    fn test_tax_id_forms_and_wire_names() {
        let input: CreateChargeInput = parse_input(json!({
            "correlationID": "c-1", "value": 100,
            "customer": {"name": "Ana", "taxID": {"taxID": "12345678909", "type": "BR:CPF"}}
        }))
        .unwrap();
        let wire = serde_json::to_value(&input).unwrap();
        assert_eq!(wire["correlationID"], "c-1");
        assert_eq!(wire["customer"]["taxID"]["taxID"], "12345678909");
        assert!(wire.get("comment").is_none());
    }

    #[test]
    fn test_charge_refund_id_not_in_body() {
        let input: CreateChargeRefundInput = parse_input(json!({
            "id": "charge-1", "value": 50, "correlationID": "r-1"
        }))
        .unwrap();
        let wire = serde_json::to_value(&input).unwrap();
        assert!(wire.get("id").is_none());
        assert_eq!(wire["value"], 50);
    }

    #[test]
    fn test_status_filter_values() {
        let input: ListChargesInput = parse_input(json!({"status": "COMPLETED"})).unwrap();
        assert_eq!(serde_json::to_value(&input).unwrap(), json!({"status": "COMPLETED"}));
        assert!(parse_input::<ListChargesInput>(json!({"status": "PAID"})).is_err());
    }

    #[test]
    fn test_verify_webhook_hmac_is_local() {
        let out = verify_webhook_hmac(json!({
            "secret": "secret",
            "signature": "GhIWzh81nn0vhOActXBKUL4Zu/U=",
            "body": "{\"event\":\"OPENPIX:CHARGE_COMPLETED\"}"
        }))
        .unwrap();
        assert_eq!(out["valid"], true);
        assert_eq!(out["computedSignature"], "GhIWzh81nn0vhOActXBKUL4Zu/U=");

        let out = verify_webhook_hmac(json!({
            "secret": "secret",
            "signature": "GhIWzh81nn0vhOActXBKUL4Zu/U=",
            "body": "{\"event\":\"OPENPIX:CHARGE_COMPLETED\"}",
            "algorithm": "sha256"
        }))
        .unwrap();
        assert_eq!(out["valid"], false);
        assert_eq!(
            out["computedSignature"],
            "Ws7L69PCPGOEVcGvPl+ZsnCcA77Yqr//y/wSIYeyypo="
        );
    }

    #[tokio::test]
    async fn test_missing_app_id_fails_at_call_time() {
        let providers = Providers::new(ProviderConfig::default()).unwrap();
        let result = call(&providers, "woovi_get_charge", json!({"id": "abc"}))
            .await
            .unwrap();
        assert!(matches!(
            result,
            Err(ToolError::MissingCredential("WOOVI_APP_ID"))
        ));
    }

    #[tokio::test]
    async fn test_webhook_tool_needs_no_credentials() {
        let providers = Providers::new(ProviderConfig::default()).unwrap();
        let result = call(
            &providers,
            "woovi_verify_webhook_hmac",
            json!({"secret": "s", "signature": "x", "body": "{}"}),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(result["valid"], false);
    }
}
