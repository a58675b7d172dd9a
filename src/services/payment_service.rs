use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit,
    dto::payments::{InitiatePaymentResponse, VerifyPaymentRequest},
    entity::orders::{ActiveModel as OrderActive, Entity as Orders},
    error::{AppError, AppResult},
    gateway::PaymentGateway,
    models::PaymentRecord,
    state::AppState,
};

// Flat MVP charge: the amount is a policy constant in minor units, not
// derived from the order's line items.
const CHARGE_AMOUNT_MINOR: i64 = 10_000;
const CHARGE_CURRENCY: &str = "INR";

/// Create a remote payment intent for an existing order and record it in
/// the order's payment sub-record. Re-initiating replaces the previous
/// attempt wholesale; the old remote order id becomes unreferenceable.
pub async fn initiate_payment(
    state: &AppState,
    order_id: Uuid,
) -> AppResult<InitiatePaymentResponse> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.status == "paid" {
        return Err(AppError::BadRequest("Order already paid".into()));
    }

    let receipt = format!("hb_{order_id}");
    let notes = serde_json::json!({
        "orderId": order_id,
        "email": order.email.clone().unwrap_or_default(),
    });

    // Gateway failure propagates here with the order untouched; the caller
    // may retry by initiating again.
    let remote = state
        .gateway
        .create_order(CHARGE_AMOUNT_MINOR, CHARGE_CURRENCY, &receipt, notes)
        .await?;

    let record = PaymentRecord {
        provider: PaymentGateway::PROVIDER.to_string(),
        remote_order_id: remote.id.clone(),
        remote_payment_id: None,
        signature: None,
        amount_minor_units: Some(CHARGE_AMOUNT_MINOR),
        currency: Some(CHARGE_CURRENCY.to_string()),
        status: "created".into(),
        created_at: Some(Utc::now()),
    };

    let user_id = order.user_id;
    let mut active: OrderActive = order.into();
    active.payment = Set(Some(as_json(&record)?));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user_id),
        "payment_initiated",
        "orders",
        serde_json::json!({ "order_id": order_id, "remote_order_id": remote.id }),
    )
    .await;

    Ok(InitiatePaymentResponse {
        key_id: state.gateway.key_id().to_string(),
        remote_order_id: remote.id,
        amount: CHARGE_AMOUNT_MINOR,
        currency: CHARGE_CURRENCY.to_string(),
        order_id,
    })
}

/// Verify a payment callback and mark the order paid. The signature check
/// and the write happen under one row lock so a racing verify cannot
/// observe a half-applied state; a repeat of an already-recorded valid
/// callback is a no-op success.
pub async fn verify_payment(state: &AppState, payload: VerifyPaymentRequest) -> AppResult<()> {
    let order_id = required(payload.order_id)?;
    let remote_order_id = required_str(payload.remote_order_id)?;
    let remote_payment_id = required_str(payload.remote_payment_id)?;
    let signature = required_str(payload.signature)?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if !state
        .gateway
        .verify_signature(&remote_order_id, &remote_payment_id, &signature)
    {
        // Mismatch leaves the order exactly as it was; the transaction is
        // dropped without a write and no audit row is produced.
        return Err(AppError::VerificationFailed);
    }

    if order.status == "paid" {
        txn.commit().await?;
        return Ok(());
    }

    let user_id = order.user_id;
    let record = PaymentRecord {
        provider: PaymentGateway::PROVIDER.to_string(),
        remote_order_id: remote_order_id.clone(),
        remote_payment_id: Some(remote_payment_id),
        signature: Some(signature),
        amount_minor_units: None,
        currency: None,
        status: "paid".into(),
        created_at: None,
    };

    let mut active: OrderActive = order.into();
    active.status = Set("paid".into());
    active.paid_at = Set(Some(Utc::now().into()));
    active.payment = Set(Some(as_json(&record)?));
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user_id),
        "payment_verified",
        "orders",
        serde_json::json!({ "order_id": order_id, "remote_order_id": remote_order_id }),
    )
    .await;

    Ok(())
}

fn required<T>(field: Option<T>) -> AppResult<T> {
    field.ok_or_else(|| AppError::BadRequest("Missing payment fields".into()))
}

fn required_str(field: Option<String>) -> AppResult<String> {
    match required(field)? {
        s if s.trim().is_empty() => Err(AppError::BadRequest("Missing payment fields".into())),
        s => Ok(s),
    }
}

fn as_json(record: &PaymentRecord) -> AppResult<serde_json::Value> {
    serde_json::to_value(record).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}
