use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    access::ensure_admin,
    audit,
    dto::{
        catalog::{
            CreateCategoryRequest, CreateProductRequest, UpdateCategoryRequest,
            UpdateProductRequest,
        },
        orders::{OrderList, OrderWithItems, UpdateFulfillmentRequest},
    },
    entity::{
        categories::{
            ActiveModel as CategoryActive, Entity as Categories, Model as CategoryModel,
        },
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
            Model as ProductModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Category, ORDER_STATUSES, Order, Product},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service::{order_from_entity, order_item_from_entity},
    state::AppState,
};

pub async fn list_recent_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(&state.pool, user).await?;
    let (page, limit, offset) = query.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(&state.pool, user).await?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(order_from_entity);
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
        "Order found",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

/// Overwrite the logistics overlay of an order. This touches only the
/// fulfillment columns; `status`, `payment` and `paid_at` stay whatever the
/// payment flow made them. Any of the five statuses may be set directly.
pub async fn update_fulfillment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateFulfillmentRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(&state.pool, user).await?;
    validate_order_status(&payload.fulfillment_status)?;

    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let tracking = payload.tracking.clone().unwrap_or_default();

    let mut active: OrderActive = existing.into();
    active.fulfillment_status = Set(Some(payload.fulfillment_status.clone()));
    active.tracking_carrier = Set(tracking.carrier);
    active.tracking_number = Set(tracking.tracking_number);
    active.tracking_url = Set(tracking.tracking_url);
    active.admin_notes = Set(payload.admin_notes.clone());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "fulfillment_update",
        "orders",
        serde_json::json!({
            "order_id": order.id,
            "fulfillment_status": payload.fulfillment_status,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(&state.pool, user).await?;

    let category = Categories::find_by_id(payload.category_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Category not found".into()))?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title),
        slug: Set(payload.slug),
        description: Set(payload.description),
        images: Set(as_json(&payload.images)?),
        prices: Set(as_json(&payload.prices)?),
        stock: Set(payload.stock),
        active: Set(payload.active),
        category_id: Set(category.id),
        category_name: Set(category.name.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit_catalog(state, user, "product_create", "products", product.id).await;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(&state.pool, user).await?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ProductActive = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(slug) = payload.slug {
        active.slug = Set(slug);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(images) = payload.images.as_ref() {
        active.images = Set(as_json(images)?);
    }
    if let Some(prices) = payload.prices.as_ref() {
        active.prices = Set(as_json(prices)?);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(is_active) = payload.active {
        active.active = Set(is_active);
    }
    if let Some(category_id) = payload.category_id {
        // Re-cache the category name alongside the id.
        let category = Categories::find_by_id(category_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::BadRequest("Category not found".into()))?;
        active.category_id = Set(category.id);
        active.category_name = Set(category.name);
    }
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    audit_catalog(state, user, "product_update", "products", product.id).await;

    Ok(ApiResponse::success(
        "Product updated",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(&state.pool, user).await?;

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit_catalog(state, user, "product_delete", "products", id).await;

    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(&state.pool, user).await?;

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        slug: Set(payload.slug),
        active: Set(payload.active),
        sort_order: Set(payload.sort_order),
        image_url: Set(payload.image_url),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit_catalog(state, user, "category_create", "categories", category.id).await;

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(&state.pool, user).await?;

    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: CategoryActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(slug) = payload.slug {
        active.slug = Set(slug);
    }
    if let Some(is_active) = payload.active {
        active.active = Set(is_active);
    }
    if let Some(sort_order) = payload.sort_order {
        active.sort_order = Set(sort_order);
    }
    if let Some(image_url) = payload.image_url {
        // Some(None) is an explicit clear.
        active.image_url = Set(image_url);
    }
    let category = active.update(&state.orm).await?;

    audit_catalog(state, user, "category_update", "categories", category.id).await;

    Ok(ApiResponse::success(
        "Category updated",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

/// Delete a category unless a product still references it. The existence
/// check and the delete are two separate statements; a product created in
/// between can leave a dangling reference (accepted limitation of the
/// document-store model this mirrors).
pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(&state.pool, user).await?;

    let referencing = Products::find()
        .filter(ProdCol::CategoryId.eq(id))
        .count(&state.orm)
        .await?;
    if referencing > 0 {
        return Err(AppError::BadRequest(
            "Category still has products".into(),
        ));
    }

    let result = Categories::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit_catalog(state, user, "category_delete", "categories", id).await;

    Ok(ApiResponse::success(
        "Category deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn as_json<T: serde::Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

fn validate_order_status(status: &str) -> Result<(), AppError> {
    if ORDER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid order status".into()))
    }
}

async fn audit_catalog(state: &AppState, user: &AuthUser, action: &str, resource: &str, id: Uuid) {
    audit::record(
        &state.pool,
        Some(user.user_id),
        action,
        resource,
        serde_json::json!({ "id": id }),
    )
    .await;
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        title: model.title,
        slug: model.slug,
        description: model.description,
        images: serde_json::from_value(model.images).unwrap_or_default(),
        prices: serde_json::from_value(model.prices).unwrap_or_default(),
        stock: model.stock,
        active: model.active,
        category_id: model.category_id,
        category_name: model.category_name,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        slug: model.slug,
        active: model.active,
        sort_order: model.sort_order,
        image_url: model.image_url,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
