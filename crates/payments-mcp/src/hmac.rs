use base64::Engine;
use hmac::{Hmac, Mac};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;

use crate::security::constant_time_eq;

/// Digest used for OpenPix webhook signatures (`X-OpenPix-Signature`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WebhookAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

/// Outcome of a webhook signature check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookVerification {
    pub valid: bool,
    pub computed_signature: String,
}

/// Compute the base64-encoded HMAC of `body` under `secret`.
pub fn compute_signature(algorithm: WebhookAlgorithm, secret: &[u8], body: &[u8]) -> String {
    let raw = match algorithm {
        WebhookAlgorithm::Sha1 => {
            let mut mac =
                Hmac::<Sha1>::new_from_slice(secret).expect("HMAC accepts any key length");
            mac.update(body);
            mac.finalize().into_bytes().to_vec()
        }
        WebhookAlgorithm::Sha256 => {
            let mut mac =
                Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key length");
            mac.update(body);
            mac.finalize().into_bytes().to_vec()
        }
    };
    base64::engine::general_purpose::STANDARD.encode(raw)
}

/// Verify a received signature against the body.
///
/// The MAC is always computed before comparing, and the comparison itself is
/// constant-time, so malformed signatures take the same path as wrong ones.
pub fn verify_signature(
    algorithm: WebhookAlgorithm,
    secret: &[u8],
    body: &[u8],
    signature: &str,
) -> WebhookVerification {
    let computed = compute_signature(algorithm, secret, body);
    WebhookVerification {
        valid: constant_time_eq(computed.as_bytes(), signature.trim().as_bytes()),
        computed_signature: computed,
    }
}
