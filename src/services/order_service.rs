use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CreateOrderRequest, CreateOrderResponse, OrderList, OrderWithItems},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, PaymentRecord, Tracking},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Create an order from a checkout payload. Quantities default to 1 and
/// missing prices are stored as NULL; the order starts in `created`.
pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<CreateOrderResponse> {
    let user_id = payload
        .user_id
        .ok_or_else(|| AppError::BadRequest("Missing userId".into()))?;
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }

    let order_id = Uuid::new_v4();
    let currency = payload.currency.unwrap_or_else(|| "INR".to_string());

    let txn = state.orm.begin().await?;

    OrderActive {
        id: Set(order_id),
        user_id: Set(user_id),
        email: Set(payload.email.clone()),
        currency: Set(currency),
        status: Set("created".into()),
        fulfillment_status: Set(None),
        tracking_carrier: Set(None),
        tracking_number: Set(None),
        tracking_url: Set(None),
        admin_notes: Set(None),
        payment: Set(None),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for item in &payload.items {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(item.id),
            slug: Set(item.slug.clone().unwrap_or_default()),
            title: Set(item.title.clone().unwrap_or_default()),
            quantity: Set(item.qty.unwrap_or(1)),
            unit_price: Set(item.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order_id }),
    )
    .await;

    Ok(CreateOrderResponse { order_id })
}

pub async fn list_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let orders: Vec<Order> = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let total = orders.len() as i64;
    let meta = Meta::new(1, total, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    let tracking = match (
        model.tracking_carrier,
        model.tracking_number,
        model.tracking_url,
    ) {
        (None, None, None) => None,
        (carrier, tracking_number, tracking_url) => Some(Tracking {
            carrier,
            tracking_number,
            tracking_url,
        }),
    };

    // A payment blob that fails to parse is surfaced as absent rather than
    // failing the whole read.
    let payment = model
        .payment
        .and_then(|value| serde_json::from_value::<PaymentRecord>(value).ok());

    Order {
        id: model.id,
        user_id: model.user_id,
        email: model.email,
        currency: model.currency,
        status: model.status,
        fulfillment_status: model.fulfillment_status,
        tracking,
        admin_notes: model.admin_notes,
        payment,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        slug: model.slug,
        title: model.title,
        quantity: model.quantity,
        unit_price: model.unit_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
