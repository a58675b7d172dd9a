use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    models::{Category, Product},
};

/// Sentinel category filter meaning "no restriction".
pub const ALL_CATEGORIES: &str = "all";

/// Active categories in display order. Empty table yields an empty list.
pub async fn list_categories(pool: &DbPool) -> AppResult<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE active = TRUE ORDER BY sort_order ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(categories)
}

/// Active products, optionally restricted to one category. `None`, empty or
/// the `"all"` sentinel mean no category filter.
pub async fn list_products(pool: &DbPool, category: Option<&str>) -> AppResult<Vec<Product>> {
    let filter = category.filter(|c| !c.is_empty() && *c != ALL_CATEGORIES);

    let products = match filter {
        Some(raw) => {
            let category_id = Uuid::parse_str(raw)
                .map_err(|_| AppError::BadRequest("Invalid category id".into()))?;
            sqlx::query_as::<_, Product>(
                "SELECT * FROM products WHERE active = TRUE AND category_id = $1 ORDER BY created_at",
            )
            .bind(category_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Product>(
                "SELECT * FROM products WHERE active = TRUE ORDER BY created_at",
            )
            .fetch_all(pool)
            .await?
        }
    };

    Ok(products)
}

/// Single active product by slug. Slug uniqueness is not enforced at write
/// time; when slugs collide the first match wins.
pub async fn get_product_by_slug(pool: &DbPool, slug: &str) -> AppResult<Product> {
    let product = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE slug = $1 AND active = TRUE LIMIT 1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    match product {
        Some(p) => Ok(p),
        None => Err(AppError::NotFound),
    }
}
