use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    pub key_id: String,
    pub remote_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub order_id: Uuid,
}

/// Callback payload. The three `remote_*` fields keep the gateway's
/// snake_case names; `orderId` is ours.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(rename = "orderId")]
    pub order_id: Option<Uuid>,
    pub remote_order_id: Option<String>,
    pub remote_payment_id: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
