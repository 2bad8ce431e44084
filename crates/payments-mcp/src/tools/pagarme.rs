//! Pagar.me Core API v5 tools.
//!
//! Tool arguments arrive in camelCase; the Core API expects snake_case.
//! Nested types that are forwarded as-is carry split serde renames so one
//! struct covers both directions.

use std::collections::BTreeMap;

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{first_of, ToolDefinition};
use crate::error::ToolError;
use crate::providers::{segment, PagarmeClient, Providers, NO_QUERY};
use crate::validation::{parse_input, Validate, Validator};

type Metadata = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PersonType {
    Individual,
    Company,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct Address {
    pub street: String,
    pub number: String,
    pub zip_code: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub country: String,
    #[serde(default)]
    pub complement: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Validate for Address {
    fn validate(&self, v: &mut Validator) {
        v.min_len("street", &self.street, 1);
        v.min_len("number", &self.number, 1);
        v.min_len("zipCode", &self.zip_code, 1);
        v.min_len("neighborhood", &self.neighborhood, 1);
        v.min_len("city", &self.city, 1);
        v.min_len("state", &self.state, 1);
        v.min_len("country", &self.country, 2);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct Phone {
    pub country_code: String,
    pub area_code: String,
    pub number: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Validate for Phone {
    fn validate(&self, v: &mut Validator) {
        v.min_len("countryCode", &self.country_code, 1);
        v.min_len("areaCode", &self.area_code, 1);
        v.min_len("number", &self.number, 1);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct Phones {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_phone: Option<Phone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<Phone>,
}

impl Validate for Phones {
    fn validate(&self, v: &mut Validator) {
        if let Some(phone) = &self.home_phone {
            v.nested("homePhone", |v| phone.validate(v));
        }
        if let Some(phone) = &self.mobile_phone {
            v.nested("mobilePhone", |v| phone.validate(v));
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerInput {
    pub name: String,
    pub email: String,
    pub document: String,
    #[serde(rename = "type")]
    pub kind: PersonType,
    pub address: Address,
    pub code: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub phones: Phones,
    pub gender: Option<String>,
    pub document_type: Option<String>,
    pub idempotency_key: Option<String>,
}

impl Validate for CreateCustomerInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("name", &self.name, 1);
        v.email("email", &self.email);
        v.min_len("document", &self.document, 5);
        v.nested("address", |v| self.address.validate(v));
        v.opt_min_len("code", self.code.as_deref(), 1);
        v.nested("phones", |v| self.phones.validate(v));
        v.opt_min_len("idempotencyKey", self.idempotency_key.as_deref(), 1);
    }
}

impl CreateCustomerInput {
    fn body(&self) -> Value {
        strip_nulls(json!({
            "name": self.name,
            "email": self.email,
            "document": self.document,
            "type": self.kind,
            "address": self.address,
            "metadata": self.metadata,
            "phones": self.phones,
            "code": self.code.as_deref().unwrap_or(&self.document),
            "gender": self.gender,
            "document_type": self.document_type,
        }))
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetCustomerInput {
    pub customer_id: String,
}

impl Validate for GetCustomerInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("customerId", &self.customer_id, 1);
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerMetadataInput {
    pub customer_id: String,
    pub metadata: Metadata,
    pub idempotency_key: Option<String>,
}

impl Validate for UpdateCustomerMetadataInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("customerId", &self.customer_id, 1);
        v.opt_min_len("idempotencyKey", self.idempotency_key.as_deref(), 1);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct BankAccount {
    pub holder_name: String,
    pub holder_type: String,
    pub holder_document: String,
    pub bank: String,
    pub branch_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_check_digit: Option<String>,
    pub account_number: String,
    pub account_check_digit: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pix_key: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Validate for BankAccount {
    fn validate(&self, v: &mut Validator) {
        v.min_len("holderName", &self.holder_name, 1);
        v.min_len("holderType", &self.holder_type, 1);
        v.min_len("holderDocument", &self.holder_document, 1);
        v.min_len("bank", &self.bank, 1);
        v.min_len("branchNumber", &self.branch_number, 1);
        v.min_len("accountNumber", &self.account_number, 1);
        v.min_len("accountCheckDigit", &self.account_check_digit, 1);
        v.min_len("type", &self.kind, 1);
    }
}

fn default_payment_mode() -> String {
    "bank_transfer".to_string()
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecipientInput {
    pub name: String,
    pub email: String,
    pub description: Option<String>,
    pub document: String,
    #[serde(rename = "type")]
    pub kind: PersonType,
    pub code: Option<String>,
    #[serde(default = "default_payment_mode")]
    pub payment_mode: String,
    pub default_bank_account: BankAccount,
    #[serde(default)]
    pub metadata: Metadata,
    pub idempotency_key: Option<String>,
}

impl Validate for CreateRecipientInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("name", &self.name, 1);
        v.email("email", &self.email);
        v.min_len("document", &self.document, 5);
        v.opt_min_len("code", self.code.as_deref(), 1);
        v.nested("defaultBankAccount", |v| self.default_bank_account.validate(v));
        v.opt_min_len("idempotencyKey", self.idempotency_key.as_deref(), 1);
    }
}

impl CreateRecipientInput {
    fn body(&self) -> Value {
        strip_nulls(json!({
            "name": self.name,
            "email": self.email,
            "description": self.description,
            "document": self.document,
            "type": self.kind,
            "default_bank_account": self.default_bank_account,
            "metadata": self.metadata,
            "code": self.code.as_deref().unwrap_or(&self.document),
            "payment_mode": self.payment_mode,
        }))
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecipientDefaultBankAccountInput {
    pub recipient_id: String,
    #[serde(default = "default_payment_mode")]
    pub payment_mode: String,
    pub bank_account: BankAccount,
    pub idempotency_key: Option<String>,
}

impl Validate for UpdateRecipientDefaultBankAccountInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("recipientId", &self.recipient_id, 1);
        v.nested("bankAccount", |v| self.bank_account.validate(v));
        v.opt_min_len("idempotencyKey", self.idempotency_key.as_deref(), 1);
    }
}

/// `page`/`size` query parameters; absent values are omitted.
#[derive(Debug, Clone, Default, Serialize)]
struct Paging {
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetRecipientsInput {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl Validate for GetRecipientsInput {
    fn validate(&self, v: &mut Validator) {
        v.opt_positive("page", self.page);
        v.opt_positive("size", self.size);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct Card {
    pub number: String,
    pub holder_name: String,
    pub exp_month: i64,
    pub exp_year: i64,
    pub cvv: String,
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Validate for Card {
    fn validate(&self, v: &mut Validator) {
        v.min_len("number", &self.number, 12);
        v.min_len("holderName", &self.holder_name, 1);
        v.range("expMonth", self.exp_month, 1, 12);
        v.min("expYear", self.exp_year, 0);
        v.min_len("cvv", &self.cvv, 3);
        v.min_len("brand", &self.brand, 1);
        v.opt_min_len("label", self.label.as_deref(), 1);
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardTokenInput {
    pub public_key: Option<String>,
    pub card: Card,
    pub idempotency_key: Option<String>,
}

impl Validate for CreateCardTokenInput {
    fn validate(&self, v: &mut Validator) {
        v.opt_min_len("publicKey", self.public_key.as_deref(), 1);
        v.nested("card", |v| self.card.validate(v));
        v.opt_min_len("idempotencyKey", self.idempotency_key.as_deref(), 1);
    }
}

impl CreateCardTokenInput {
    fn body(&self) -> Value {
        let mut card = self.card.clone();
        card.label.get_or_insert_with(|| "default".to_string());
        json!({ "type": "card", "card": card })
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetTokenInput {
    pub token_id: String,
    pub public_key: Option<String>,
}

impl Validate for GetTokenInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("tokenId", &self.token_id, 1);
        v.opt_min_len("publicKey", self.public_key.as_deref(), 1);
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetOrderInput {
    pub order_id: String,
}

impl Validate for GetOrderInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("orderId", &self.order_id, 1);
    }
}

fn default_category() -> String {
    "other".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OrderItem {
    pub amount: i64,
    pub description: String,
    pub quantity: i64,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Validate for OrderItem {
    fn validate(&self, v: &mut Validator) {
        v.positive("amount", self.amount);
        v.min_len("description", &self.description, 1);
        v.positive("quantity", self.quantity);
        v.min_len("category", &self.category, 1);
        v.opt_min_len("code", self.code.as_deref(), 1);
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub name: String,
    pub email: String,
    pub document: String,
    #[serde(rename = "type")]
    pub kind: PersonType,
    pub address: Address,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub phones: Phones,
    pub code: Option<String>,
}

impl Validate for OrderCustomer {
    fn validate(&self, v: &mut Validator) {
        v.min_len("name", &self.name, 1);
        v.email("email", &self.email);
        v.min_len("document", &self.document, 5);
        v.nested("address", |v| self.address.validate(v));
        v.nested("phones", |v| self.phones.validate(v));
        v.opt_min_len("code", self.code.as_deref(), 1);
    }
}

impl OrderCustomer {
    fn body(&self) -> Value {
        json!({
            "name": self.name,
            "email": self.email,
            "document": self.document,
            "type": self.kind,
            "address": self.address,
            "metadata": self.metadata,
            "phones": self.phones,
            "code": self.code.as_deref().unwrap_or(&self.document),
        })
    }
}

fn validate_items(items: &[OrderItem], v: &mut Validator) {
    v.non_empty("items", items);
    for (i, item) in items.iter().enumerate() {
        v.nested(&format!("items[{i}]"), |v| item.validate(v));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct PixOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPixSplitInput {
    pub recipient_id: String,
    pub items: Vec<OrderItem>,
    pub customer: OrderCustomer,
    pub pix: Option<PixOptions>,
    pub code: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub idempotency_key: Option<String>,
}

impl Validate for CreateOrderPixSplitInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("recipientId", &self.recipient_id, 1);
        validate_items(&self.items, v);
        v.nested("customer", |v| self.customer.validate(v));
        if let Some(pix) = &self.pix {
            v.nested("pix", |v| v.opt_positive("expiresIn", pix.expires_in));
        }
        v.opt_min_len("code", self.code.as_deref(), 1);
        v.opt_min_len("idempotencyKey", self.idempotency_key.as_deref(), 1);
    }
}

impl CreateOrderPixSplitInput {
    fn body(&self, split_recipient_id: &str, total: i64, code: String) -> Value {
        strip_nulls(json!({
            "items": self.items,
            "customer": self.customer.body(),
            "payments": [{
                "payment_method": "pix",
                "split": [flat_split(split_recipient_id, total, false)],
                "pix": self.pix,
            }],
            "code": code,
            "closed": true,
            "metadata": self.metadata,
        }))
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all(serialize = "snake_case", deserialize = "camelCase"))]
pub struct CreditCardOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<i64>,
    #[serde(default = "default_true")]
    pub capture: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_token: Option<String>,
}

impl Validate for CreditCardOptions {
    fn validate(&self, v: &mut Validator) {
        v.opt_positive("installments", self.installments);
        v.opt_min_len("statementDescriptor", self.statement_descriptor.as_deref(), 1);
        v.opt_min_len("cardId", self.card_id.as_deref(), 1);
        v.opt_min_len("cardToken", self.card_token.as_deref(), 1);
        if self.card_id.is_none() && self.card_token.is_none() {
            v.issue("cardToken", "provide creditCard.cardToken or creditCard.cardId");
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderCreditCardSplitInput {
    pub recipient_id: String,
    pub items: Vec<OrderItem>,
    pub customer: OrderCustomer,
    pub credit_card: CreditCardOptions,
    pub code: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub idempotency_key: Option<String>,
}

impl Validate for CreateOrderCreditCardSplitInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("recipientId", &self.recipient_id, 1);
        validate_items(&self.items, v);
        v.nested("customer", |v| self.customer.validate(v));
        v.nested("creditCard", |v| self.credit_card.validate(v));
        v.opt_min_len("code", self.code.as_deref(), 1);
        v.opt_min_len("idempotencyKey", self.idempotency_key.as_deref(), 1);
    }
}

impl CreateOrderCreditCardSplitInput {
    fn body(&self, total: i64, code: String) -> Value {
        strip_nulls(json!({
            "items": self.items,
            "customer": self.customer.body(),
            "payments": [{
                "payment_method": "credit_card",
                "amount": total,
                "split": [flat_split(&self.recipient_id, total, true)],
                "credit_card": self.credit_card,
            }],
            "code": code,
            "closed": true,
            "metadata": self.metadata,
        }))
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetChargeInput {
    pub charge_id: String,
}

impl Validate for GetChargeInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("chargeId", &self.charge_id, 1);
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetChargeTransactionsInput {
    pub charge_id: String,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl Validate for GetChargeTransactionsInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("chargeId", &self.charge_id, 1);
        v.opt_positive("page", self.page);
        v.opt_positive("size", self.size);
    }
}

/// Input shared by capture and cancel.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChargeAdjustmentInput {
    pub charge_id: String,
    pub amount: Option<i64>,
    pub recipient_id: Option<String>,
    pub idempotency_key: Option<String>,
}

impl Validate for ChargeAdjustmentInput {
    fn validate(&self, v: &mut Validator) {
        v.min_len("chargeId", &self.charge_id, 1);
        v.opt_positive("amount", self.amount);
        v.opt_min_len("recipientId", self.recipient_id.as_deref(), 1);
        v.opt_min_len("idempotencyKey", self.idempotency_key.as_deref(), 1);
    }
}

impl ChargeAdjustmentInput {
    /// Request body, or `None` when neither amount nor recipient was given.
    /// A split is attached only when both are present.
    fn body(&self) -> Option<Value> {
        if self.amount.is_none() && self.recipient_id.is_none() {
            return None;
        }
        let split = match (self.amount, &self.recipient_id) {
            (Some(amount), Some(recipient)) => Some(vec![flat_split(recipient, amount, true)]),
            _ => None,
        };
        Some(strip_nulls(json!({ "amount": self.amount, "split": split })))
    }
}

/// One flat split rule sending `amount` to `recipient_id`, liable for
/// chargebacks and paying the processing fee.
fn flat_split(recipient_id: &str, amount: i64, charge_remainder_fee: bool) -> Value {
    json!({
        "type": "flat",
        "amount": amount,
        "recipient_id": recipient_id,
        "options": {
            "liable": true,
            "charge_processing_fee": true,
            "charge_remainder_fee": charge_remainder_fee,
        },
    })
}

fn order_total(items: &[OrderItem]) -> Result<i64, ToolError> {
    items
        .iter()
        .try_fold(0i64, |sum, item| {
            item.amount
                .checked_mul(item.quantity)
                .and_then(|line| sum.checked_add(line))
        })
        .ok_or_else(|| ToolError::InvalidInput("items: order total overflows".to_string()))
}

fn pix_order_code() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("pix_{}_{}", Utc::now().timestamp_millis(), &suffix[..6])
}

fn card_order_code() -> String {
    format!("cc_{}", Utc::now().timestamp_millis())
}

/// Gateway recipient id (`rp_…`) from a recipient resource.
fn gateway_recipient_id(recipient: &Value) -> Option<String> {
    ["gateway_recipients", "gatewayRecipients"]
        .iter()
        .filter_map(|key| recipient.get(*key).and_then(Value::as_array))
        .flatten()
        .filter_map(|g| g.get("id").and_then(Value::as_str))
        .find(|id| id.starts_with("rp_"))
        .map(str::to_string)
}

/// Split rules take the gateway recipient id. A `re_…` id is resolved with
/// one lookup; anything else is passed through.
async fn resolve_split_recipient(
    client: &PagarmeClient,
    recipient_id: &str,
) -> Result<String, ToolError> {
    if !recipient_id.starts_with("re_") {
        return Ok(recipient_id.to_string());
    }

    let recipient = client
        .get(&format!("/recipients/{}", segment(recipient_id)), NO_QUERY)
        .await?;
    gateway_recipient_id(&recipient).ok_or_else(|| {
        ToolError::Rejected(format!(
            "recipient {recipient_id} has no gateway recipient id (rp_...) available; \
             check that it is fully approved in the gateway"
        ))
    })
}

/// QR code details from the first charge transaction that carries one.
fn pix_summary(transactions: &Value) -> Value {
    let Some(data) = transactions.get("data").and_then(Value::as_array) else {
        return Value::Null;
    };
    let has_qr = |t: &&Value| {
        ["qr_code", "qrCode", "qr_code_url", "qrCodeUrl"]
            .iter()
            .any(|k| t.get(*k).is_some_and(|v| !v.is_null()))
    };
    match data.iter().find(has_qr) {
        Some(tx) => json!({
            "qrCode": first_of(tx, &["qr_code", "qrCode"]),
            "qrCodeUrl": first_of(tx, &["qr_code_url", "qrCodeUrl"]),
            "expiresAt": first_of(tx, &["expires_at", "expiresAt"]),
            "endToEndId": first_of(tx, &["end_to_end_id", "endToEndId"]),
            "status": first_of(tx, &["status"]),
        }),
        None => Value::Null,
    }
}

/// Drop `null` object members so optional fields are omitted upstream.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new::<CreateCustomerInput>(
            "pagarme_create_customer",
            "Pagar.me - Create Customer",
            "Create a customer in Pagar.me (Core API v5).",
        ),
        ToolDefinition::new::<GetCustomerInput>(
            "pagarme_get_customer",
            "Pagar.me - Get Customer",
            "Fetch a Pagar.me customer by customerId.",
        ),
        ToolDefinition::new::<UpdateCustomerMetadataInput>(
            "pagarme_update_customer_metadata",
            "Pagar.me - Update Customer Metadata",
            "Replace the metadata of a Pagar.me customer.",
        ),
        ToolDefinition::new::<CreateRecipientInput>(
            "pagarme_create_recipient",
            "Pagar.me - Create Recipient",
            "Create a recipient with a default bank account in Pagar.me.",
        ),
        ToolDefinition::new::<UpdateRecipientDefaultBankAccountInput>(
            "pagarme_update_recipient_default_bank_account",
            "Pagar.me - Update Recipient Default Bank Account",
            "Update the default bank account of a Pagar.me recipient.",
        ),
        ToolDefinition::new::<GetRecipientsInput>(
            "pagarme_get_recipients",
            "Pagar.me - List Recipients",
            "List Pagar.me recipients (paginated).",
        ),
        ToolDefinition::new::<CreateCardTokenInput>(
            "pagarme_create_card_token",
            "Pagar.me - Create Card Token",
            "Create a card token with the public key, for use in card payments.",
        ),
        ToolDefinition::new::<GetTokenInput>(
            "pagarme_get_token",
            "Pagar.me - Get Token",
            "Fetch a Pagar.me token by tokenId (requires the public key).",
        ),
        ToolDefinition::new::<GetOrderInput>(
            "pagarme_get_order",
            "Pagar.me - Get Order",
            "Fetch a Pagar.me V5 order by id (e.g. or_xxxxxxxx).",
        ),
        ToolDefinition::new::<CreateOrderPixSplitInput>(
            "pagarme_create_order_pix_split",
            "Pagar.me - Create Order (Pix + Split)",
            "Create a Pix order with a 100% split to one recipient. Returns the QR code, \
             QR code URL and expiry from the charge transactions.",
        ),
        ToolDefinition::new::<CreateOrderCreditCardSplitInput>(
            "pagarme_create_order_credit_card_split",
            "Pagar.me - Create Order (Credit Card + Split)",
            "Create a credit card order with a 100% split to one recipient.",
        ),
        ToolDefinition::new::<GetChargeInput>(
            "pagarme_get_charge",
            "Pagar.me - Get Charge",
            "Fetch a Pagar.me charge by chargeId.",
        ),
        ToolDefinition::new::<GetChargeTransactionsInput>(
            "pagarme_get_charge_transactions",
            "Pagar.me - List Charge Transactions",
            "List the transactions of a charge (includes the Pix QR code).",
        ),
        ToolDefinition::new::<ChargeAdjustmentInput>(
            "pagarme_capture_charge",
            "Pagar.me - Capture Charge",
            "Capture a charge created with capture=false.",
        ),
        ToolDefinition::new::<ChargeAdjustmentInput>(
            "pagarme_cancel_charge",
            "Pagar.me - Cancel Charge",
            "Cancel or refund a charge.",
        ),
    ]
}

pub(super) async fn call(
    providers: &Providers,
    name: &str,
    args: Value,
) -> Option<Result<Value, ToolError>> {
    let result = match name {
        "pagarme_create_customer" => create_customer(providers, args).await,
        "pagarme_get_customer" => get_customer(providers, args).await,
        "pagarme_update_customer_metadata" => update_customer_metadata(providers, args).await,
        "pagarme_create_recipient" => create_recipient(providers, args).await,
        "pagarme_update_recipient_default_bank_account" => {
            update_recipient_default_bank_account(providers, args).await
        }
        "pagarme_get_recipients" => get_recipients(providers, args).await,
        "pagarme_create_card_token" => create_card_token(providers, args).await,
        "pagarme_get_token" => get_token(providers, args).await,
        "pagarme_get_order" => get_order(providers, args).await,
        "pagarme_create_order_pix_split" => create_order_pix_split(providers, args).await,
        "pagarme_create_order_credit_card_split" => {
            create_order_credit_card_split(providers, args).await
        }
        "pagarme_get_charge" => get_charge(providers, args).await,
        "pagarme_get_charge_transactions" => get_charge_transactions(providers, args).await,
        "pagarme_capture_charge" => capture_charge(providers, args).await,
        "pagarme_cancel_charge" => cancel_charge(providers, args).await,
        _ => return None,
    };
    Some(result)
}

async fn create_customer(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: CreateCustomerInput = parse_input(args)?;
    let client = providers.pagarme()?;
    client
        .post("/customers", NO_QUERY, &input.body(), input.idempotency_key.as_deref())
        .await
}

async fn get_customer(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: GetCustomerInput = parse_input(args)?;
    let client = providers.pagarme()?;
    client
        .get(&format!("/customers/{}", segment(&input.customer_id)), NO_QUERY)
        .await
}

async fn update_customer_metadata(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: UpdateCustomerMetadataInput = parse_input(args)?;
    let client = providers.pagarme()?;
    client
        .patch(
            &format!("/customers/{}/metadata", segment(&input.customer_id)),
            &json!({ "metadata": input.metadata }),
            input.idempotency_key.as_deref(),
        )
        .await
}

async fn create_recipient(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: CreateRecipientInput = parse_input(args)?;
    let client = providers.pagarme()?;
    client
        .post("/recipients", NO_QUERY, &input.body(), input.idempotency_key.as_deref())
        .await
}

async fn update_recipient_default_bank_account(
    providers: &Providers,
    args: Value,
) -> Result<Value, ToolError> {
    let input: UpdateRecipientDefaultBankAccountInput = parse_input(args)?;
    let client = providers.pagarme()?;
    let body = json!({
        "bank_account": input.bank_account,
        "payment_mode": input.payment_mode,
    });
    client
        .patch(
            &format!(
                "/recipients/{}/default-bank-account",
                segment(&input.recipient_id)
            ),
            &body,
            input.idempotency_key.as_deref(),
        )
        .await
}

async fn get_recipients(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: GetRecipientsInput = parse_input(args)?;
    let client = providers.pagarme()?;
    let paging = Paging {
        page: input.page,
        size: input.size,
    };
    client.get("/recipients", &paging).await
}

async fn create_card_token(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: CreateCardTokenInput = parse_input(args)?;
    let (client, public_key) = providers.pagarme_public(input.public_key.as_deref())?;
    client
        .post(
            "/tokens",
            &[("appId", public_key.as_str())],
            &input.body(),
            input.idempotency_key.as_deref(),
        )
        .await
}

async fn get_token(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: GetTokenInput = parse_input(args)?;
    let (client, public_key) = providers.pagarme_public(input.public_key.as_deref())?;
    client
        .get(
            &format!("/tokens/{}", segment(&input.token_id)),
            &[("appId", public_key.as_str())],
        )
        .await
}

async fn get_order(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: GetOrderInput = parse_input(args)?;
    let client = providers.pagarme()?;
    client
        .get(&format!("/orders/{}", segment(&input.order_id)), NO_QUERY)
        .await
}

async fn create_order_pix_split(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: CreateOrderPixSplitInput = parse_input(args)?;
    let client = providers.pagarme()?;

    let total = order_total(&input.items)?;
    let split_recipient = resolve_split_recipient(&client, &input.recipient_id).await?;
    let code = input.code.clone().unwrap_or_else(pix_order_code);
    let body = input.body(&split_recipient, total, code);

    let order = client
        .post("/orders", NO_QUERY, &body, input.idempotency_key.as_deref())
        .await?;
    let charge_id = order
        .pointer("/charges/0/id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let pix = match &charge_id {
        Some(id) => {
            let transactions = client
                .get(&format!("/charges/{}/transactions", segment(id)), NO_QUERY)
                .await?;
            pix_summary(&transactions)
        }
        None => Value::Null,
    };

    tracing::info!(charge_id = ?charge_id, total, "pix split order created");
    Ok(json!({ "order": order, "chargeId": charge_id, "pix": pix }))
}

async fn create_order_credit_card_split(
    providers: &Providers,
    args: Value,
) -> Result<Value, ToolError> {
    let input: CreateOrderCreditCardSplitInput = parse_input(args)?;
    let client = providers.pagarme()?;

    let total = order_total(&input.items)?;
    let code = input.code.clone().unwrap_or_else(card_order_code);
    let body = input.body(total, code);

    let order = client
        .post("/orders", NO_QUERY, &body, input.idempotency_key.as_deref())
        .await?;
    let charge_id = order
        .pointer("/charges/0/id")
        .and_then(Value::as_str)
        .map(str::to_string);

    tracing::info!(charge_id = ?charge_id, total, "credit card split order created");
    Ok(json!({ "order": order, "chargeId": charge_id }))
}

async fn get_charge(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: GetChargeInput = parse_input(args)?;
    let client = providers.pagarme()?;
    client
        .get(&format!("/charges/{}", segment(&input.charge_id)), NO_QUERY)
        .await
}

async fn get_charge_transactions(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: GetChargeTransactionsInput = parse_input(args)?;
    let client = providers.pagarme()?;
    let paging = Paging {
        page: input.page,
        size: input.size,
    };
    client
        .get(
            &format!("/charges/{}/transactions", segment(&input.charge_id)),
            &paging,
        )
        .await
}

async fn capture_charge(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: ChargeAdjustmentInput = parse_input(args)?;
    let client = providers.pagarme()?;
    let body = input.body().unwrap_or_else(|| json!({}));
    client
        .post(
            &format!("/charges/{}/capture", segment(&input.charge_id)),
            NO_QUERY,
            &body,
            input.idempotency_key.as_deref(),
        )
        .await
}

async fn cancel_charge(providers: &Providers, args: Value) -> Result<Value, ToolError> {
    let input: ChargeAdjustmentInput = parse_input(args)?;
    let client = providers.pagarme()?;
    let body = input.body();
    client
        .delete(
            &format!("/charges/{}", segment(&input.charge_id)),
            body.as_ref(),
            input.idempotency_key.as_deref(),
        )
        .await
}
