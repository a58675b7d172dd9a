use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};

use crate::{
    dto::payments::{
        InitiatePaymentRequest, InitiatePaymentResponse, VerifyPaymentRequest,
        VerifyPaymentResponse,
    },
    error::AppError,
    services::payment_service,
    state::AppState,
};

// The payment endpoints speak the gateway's flat wire shape end to end:
// error bodies are a bare `{error}` object, not the response envelope.
pub struct FlatError(pub AppError);

impl From<AppError> for FlatError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for FlatError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/initiate", post(initiate_payment))
        .route("/verify", post(verify_payment))
}

#[utoipa::path(
    post,
    path = "/api/payments/initiate",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 200, description = "Remote payment intent created", body = InitiatePaymentResponse),
        (status = 400, description = "Missing orderId or order already paid"),
        (status = 404, description = "Order not found"),
        (status = 502, description = "Gateway failure"),
    ),
    tag = "Payments"
)]
pub async fn initiate_payment(
    State(state): State<AppState>,
    Json(payload): Json<InitiatePaymentRequest>,
) -> Result<Json<InitiatePaymentResponse>, FlatError> {
    let order_id = payload
        .order_id
        .ok_or_else(|| AppError::BadRequest("Missing orderId".into()))?;
    let resp = payment_service::initiate_payment(&state, order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = VerifyPaymentResponse),
        (status = 400, description = "Missing fields or signature mismatch", body = VerifyPaymentResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<(StatusCode, Json<VerifyPaymentResponse>), FlatError> {
    match payment_service::verify_payment(&state, payload).await {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(VerifyPaymentResponse {
                ok: true,
                error: None,
            }),
        )),
        Err(AppError::VerificationFailed) => Ok((
            StatusCode::BAD_REQUEST,
            Json(VerifyPaymentResponse {
                ok: false,
                error: Some("Invalid signature".into()),
            }),
        )),
        Err(err) => Err(FlatError(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn error_bodies_are_flat() {
        let resp = FlatError(AppError::BadRequest("Missing orderId".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(
            body,
            serde_json::json!({ "error": "Bad Request: Missing orderId" })
        );
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let resp = FlatError(AppError::NotFound).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
