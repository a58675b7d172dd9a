use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::error::AppResult;

type HmacSha256 = Hmac<Sha256>;

/// Remote payment-intent record as returned by the gateway.
#[derive(Debug, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

/// Thin client for the hosted payment gateway. Creating an intent is a
/// single authenticated POST; callback verification is a local HMAC check
/// and never goes over the network.
#[derive(Clone)]
pub struct PaymentGateway {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
    endpoint: String,
}

impl PaymentGateway {
    pub const PROVIDER: &'static str = "razorpay";

    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Public key identifier, safe to hand to clients for the hosted form.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Create a remote payment-intent record for `amount` minor units.
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
        notes: Value,
    ) -> AppResult<RemoteOrder> {
        let url = format!("{}/v1/orders", self.endpoint);
        let remote = self
            .http
            .post(url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&serde_json::json!({
                "amount": amount,
                "currency": currency,
                "receipt": receipt,
                "notes": notes,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<RemoteOrder>()
            .await?;

        Ok(remote)
    }

    /// Check a payment callback: the gateway signs
    /// `"<remote_order_id>|<remote_payment_id>"` with the key secret using
    /// HMAC-SHA256 and sends the hex digest as `signature`.
    pub fn verify_signature(
        &self,
        remote_order_id: &str,
        remote_payment_id: &str,
        signature: &str,
    ) -> bool {
        let payload = format!("{remote_order_id}|{remote_payment_id}");
        let Ok(mut mac) = HmacSha256::new_from_slice(self.key_secret.as_bytes()) else {
            return false;
        };
        mac.update(payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());
        expected == signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("valid key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn matching_signature_verifies() {
        let gateway = PaymentGateway::new("key", "secret", "https://gateway.test");
        let sig = sign("secret", "A|B");
        assert!(gateway.verify_signature("A", "B", &sig));
    }

    #[test]
    fn any_single_character_mutation_fails() {
        let gateway = PaymentGateway::new("key", "secret", "https://gateway.test");
        let sig = sign("secret", "A|B");

        for i in 0..sig.len() {
            let mut bytes = sig.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(bytes).expect("ascii hex");
            if mutated == sig {
                continue;
            }
            assert!(
                !gateway.verify_signature("A", "B", &mutated),
                "mutated signature at index {i} should not verify"
            );
        }
    }

    #[test]
    fn wrong_secret_or_payload_fails() {
        let gateway = PaymentGateway::new("key", "secret", "https://gateway.test");
        let sig = sign("other-secret", "A|B");
        assert!(!gateway.verify_signature("A", "B", &sig));

        let sig = sign("secret", "A|C");
        assert!(!gateway.verify_signature("A", "B", &sig));
    }
}
