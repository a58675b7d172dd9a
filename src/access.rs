use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
};

/// Binary allow-list membership check. Every call is a fresh lookup; there
/// is deliberately no caching so a revoked admin loses access immediately.
pub async fn is_admin(pool: &DbPool, user_id: Uuid) -> AppResult<bool> {
    let row: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM admins WHERE user_id = $1)")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// Guard for admin-scoped operations. Advisory at this layer: the data
/// store's own access rules remain the real enforcement boundary.
pub async fn ensure_admin(pool: &DbPool, user: &AuthUser) -> AppResult<()> {
    if is_admin(pool, user.user_id).await? {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
