use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use password_hash::rand_core::OsRng;
use serde_json::json;
use storefront_api::db::create_pool;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")?;

    let pool = create_pool(&database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123").await?;
    ensure_allowlisted(&pool, admin_id).await?;
    let user_id = ensure_user(&pool, "user@example.com", "user123").await?;

    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(id)
}

async fn ensure_allowlisted(pool: &sqlx::PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO admins (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let existing: (i64,) = sqlx::query_as("SELECT count(*) FROM categories")
        .fetch_one(pool)
        .await?;
    if existing.0 > 0 {
        return Ok(());
    }

    let teas = seed_category(pool, "Teas", "teas", 1).await?;
    let blends = seed_category(pool, "Herbal Blends", "herbal-blends", 2).await?;

    seed_product(
        pool,
        "Darjeeling First Flush",
        "darjeeling-first-flush",
        teas,
        "Teas",
        json!({ "INR": 499, "USD": 7, "EUR": 6 }),
        25,
    )
    .await?;
    seed_product(
        pool,
        "Tulsi Ginger Blend",
        "tulsi-ginger-blend",
        blends,
        "Herbal Blends",
        json!({ "INR": 349, "USD": 5, "EUR": 5 }),
        40,
    )
    .await?;

    Ok(())
}

async fn seed_category(
    pool: &sqlx::PgPool,
    name: &str,
    slug: &str,
    sort_order: i32,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO categories (id, name, slug, active, sort_order) VALUES ($1, $2, $3, TRUE, $4)",
    )
    .bind(id)
    .bind(name)
    .bind(slug)
    .bind(sort_order)
    .execute(pool)
    .await?;
    Ok(id)
}

async fn seed_product(
    pool: &sqlx::PgPool,
    title: &str,
    slug: &str,
    category_id: Uuid,
    category_name: &str,
    prices: serde_json::Value,
    stock: i32,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO products (id, title, slug, description, images, prices, stock, active, category_id, category_name)
        VALUES ($1, $2, $3, $4, '[]'::jsonb, $5, $6, TRUE, $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(title)
    .bind(slug)
    .bind(format!("{title} from the demo catalog"))
    .bind(prices)
    .bind(stock)
    .bind(category_id)
    .bind(category_name)
    .execute(pool)
    .await?;
    Ok(())
}
