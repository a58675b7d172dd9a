use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{Category, Product},
    services::catalog_service,
    state::AppState,
};

// Public storefront reads. These return the bare records (no response
// envelope) because storefront clients consume them directly.

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductSlugQuery {
    pub slug: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/products", get(list_products))
        .route("/product", get(get_product_by_slug))
}

#[utoipa::path(
    get,
    path = "/api/catalog/categories",
    responses(
        (status = 200, description = "Active categories in display order", body = Vec<Category>)
    ),
    tag = "Catalog"
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    let categories = catalog_service::list_categories(&state.pool).await?;
    Ok(Json(categories))
}

#[utoipa::path(
    get,
    path = "/api/catalog/products",
    params(
        ("category" = Option<String>, Query, description = "Category id filter; \"all\" or absent for every category")
    ),
    responses(
        (status = 200, description = "Active products", body = Vec<Product>)
    ),
    tag = "Catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let products = catalog_service::list_products(&state.pool, query.category.as_deref()).await?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/catalog/product",
    params(
        ("slug" = String, Query, description = "Product slug")
    ),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 400, description = "Missing slug"),
        (status = 404, description = "Not Found"),
    ),
    tag = "Catalog"
)]
pub async fn get_product_by_slug(
    State(state): State<AppState>,
    Query(query): Query<ProductSlugQuery>,
) -> AppResult<Json<Product>> {
    let slug = query
        .slug
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing slug".into()))?;
    let product = catalog_service::get_product_by_slug(&state.pool, &slug).await?;
    Ok(Json(product))
}
