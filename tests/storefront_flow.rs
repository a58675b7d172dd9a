use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use storefront_api::{
    db::{create_orm_conn, create_pool},
    dto::{
        auth::{LoginRequest, RegisterRequest},
        catalog::{
            CreateCategoryRequest, CreateProductRequest, UpdateCategoryRequest,
            UpdateProductRequest,
        },
        orders::{
            CreateOrderRequest, OrderItemInput, TrackingInput, UpdateFulfillmentRequest,
        },
        payments::VerifyPaymentRequest,
    },
    error::AppError,
    gateway::PaymentGateway,
    middleware::auth::AuthUser,
    routes::params::OrderListQuery,
    services::{admin_service, auth_service, catalog_service, order_service, payment_service},
    state::AppState,
};

const GATEWAY_KEY_ID: &str = "rzp_test_key";
const GATEWAY_SECRET: &str = "test_secret";

// Integration flow: admin builds the catalog; user places an order; a signed
// callback marks it paid; admin updates fulfillment and cleans up.
#[tokio::test]
async fn catalog_order_payment_and_admin_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let admin_id = create_user(&state, "admin@flow.test").await?;
    sqlx::query("INSERT INTO admins (user_id) VALUES ($1)")
        .bind(admin_id)
        .execute(&state.pool)
        .await?;
    let user_id = create_user(&state, "user@flow.test").await?;

    let admin = AuthUser { user_id: admin_id };
    let user = AuthUser { user_id };

    // Registration rejects a taken email; login rejects a wrong password.
    let registered = auth_service::register_user(
        &state.pool,
        RegisterRequest {
            email: "shopper@flow.test".into(),
            password: "secret123".into(),
        },
    )
    .await?;
    assert_eq!(registered.data.expect("user").email, "shopper@flow.test");
    let duplicate = auth_service::register_user(
        &state.pool,
        RegisterRequest {
            email: "shopper@flow.test".into(),
            password: "secret123".into(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));
    let bad_login = auth_service::login_user(
        &state.pool,
        LoginRequest {
            email: "shopper@flow.test".into(),
            password: "wrong".into(),
        },
    )
    .await;
    assert!(matches!(bad_login, Err(AppError::BadRequest(_))));

    // The access gate rejects identities outside the allow-list.
    let denied =
        admin_service::create_category(&state, &user, category_payload("Teas", "teas", 1)).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    // Admin builds the catalog.
    let teas = admin_service::create_category(&state, &admin, category_payload("Teas", "teas", 1))
        .await?
        .data
        .expect("category");
    let extras = admin_service::create_category(
        &state,
        &admin,
        CreateCategoryRequest {
            name: "Extras".into(),
            slug: "extras".into(),
            active: true,
            sort_order: 2,
            image_url: Some("extras.jpg".into()),
        },
    )
    .await?
    .data
    .expect("category");
    assert_eq!(extras.image_url.as_deref(), Some("extras.jpg"));

    let product = admin_service::create_product(
        &state,
        &admin,
        product_payload("Green Tea", "green-tea", teas.id, true),
    )
    .await?
    .data
    .expect("product");
    assert_eq!(product.category_name, "Teas");

    let hidden = admin_service::create_product(
        &state,
        &admin,
        product_payload("Retired Tin", "retired-tin", teas.id, false),
    )
    .await?
    .data
    .expect("product");

    let unknown_category = admin_service::create_product(
        &state,
        &admin,
        product_payload("Orphan", "orphan", Uuid::new_v4(), true),
    )
    .await;
    assert!(matches!(unknown_category, Err(AppError::BadRequest(_))));

    // Public catalog reads: inactive products stay invisible.
    let categories = catalog_service::list_categories(&state.pool).await?;
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].slug, "teas");

    let all = catalog_service::list_products(&state.pool, None).await?;
    assert_eq!(all.len(), 1);
    let sentinel = catalog_service::list_products(&state.pool, Some("all")).await?;
    assert_eq!(sentinel.len(), 1);
    let filtered =
        catalog_service::list_products(&state.pool, Some(&teas.id.to_string())).await?;
    assert_eq!(filtered.len(), 1);
    let empty =
        catalog_service::list_products(&state.pool, Some(&extras.id.to_string())).await?;
    assert!(empty.is_empty());
    let invalid = catalog_service::list_products(&state.pool, Some("not-a-uuid")).await;
    assert!(matches!(invalid, Err(AppError::BadRequest(_))));

    let by_slug = catalog_service::get_product_by_slug(&state.pool, "green-tea").await?;
    assert_eq!(by_slug.id, product.id);
    assert_eq!(by_slug.prices.get("INR"), Some(&499));
    assert_eq!(by_slug.images, vec!["green-tea.jpg".to_string()]);
    let missing_slug = catalog_service::get_product_by_slug(&state.pool, "retired-tin").await;
    assert!(matches!(missing_slug, Err(AppError::NotFound)));

    // Order creation validates its payload.
    let no_user = order_service::create_order(
        &state,
        CreateOrderRequest {
            user_id: None,
            email: None,
            currency: None,
            items: vec![item_input(product.id, Some(2))],
        },
    )
    .await;
    assert!(matches!(no_user, Err(AppError::BadRequest(_))));

    let no_items = order_service::create_order(
        &state,
        CreateOrderRequest {
            user_id: Some(user_id),
            email: None,
            currency: None,
            items: vec![],
        },
    )
    .await;
    assert!(matches!(no_items, Err(AppError::BadRequest(_))));

    let created = order_service::create_order(
        &state,
        CreateOrderRequest {
            user_id: Some(user_id),
            email: Some("user@flow.test".into()),
            currency: None,
            items: vec![item_input(product.id, Some(2)), item_input(product.id, None)],
        },
    )
    .await?;
    let order_id = created.order_id;

    let fetched = order_service::get_order(&state, &user, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(fetched.order.status, "created");
    assert_eq!(fetched.order.currency, "INR");
    assert!(fetched.order.fulfillment_status.is_none());
    assert_eq!(fetched.items.len(), 2);
    // One line posted qty 2, the other omitted qty and defaulted to 1.
    let quantities: i32 = fetched.items.iter().map(|it| it.quantity).sum();
    assert_eq!(quantities, 3);

    let listed = order_service::list_orders(&state, &user)
        .await?
        .data
        .expect("orders");
    assert_eq!(listed.items.len(), 1);

    // Other users cannot read the order; admins can.
    let foreign = order_service::get_order(&state, &admin, order_id).await;
    assert!(matches!(foreign, Err(AppError::NotFound)));
    let via_admin = admin_service::get_order_admin(&state, &admin, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(via_admin.order.id, order_id);

    // Initiating against an unknown order fails before any gateway call.
    let unknown = payment_service::initiate_payment(&state, Uuid::new_v4()).await;
    assert!(matches!(unknown, Err(AppError::NotFound)));

    // Callback with incomplete fields is rejected.
    let incomplete = payment_service::verify_payment(
        &state,
        VerifyPaymentRequest {
            order_id: Some(order_id),
            remote_order_id: Some("order_r1".into()),
            remote_payment_id: None,
            signature: Some("sig".into()),
        },
    )
    .await;
    assert!(matches!(incomplete, Err(AppError::BadRequest(_))));

    // A forged signature leaves the order exactly as it was.
    let forged = payment_service::verify_payment(
        &state,
        verify_payload(order_id, "order_r1", "pay_r1", "deadbeef"),
    )
    .await;
    assert!(matches!(forged, Err(AppError::VerificationFailed)));
    let untouched = order_service::get_order(&state, &user, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(untouched.order.status, "created");
    assert!(untouched.order.paid_at.is_none());
    assert!(untouched.order.payment.is_none());

    // A correctly signed callback marks the order paid.
    let signature = sign("order_r1|pay_r1");
    payment_service::verify_payment(
        &state,
        verify_payload(order_id, "order_r1", "pay_r1", &signature),
    )
    .await?;
    let paid = order_service::get_order(&state, &user, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(paid.order.status, "paid");
    assert!(paid.order.paid_at.is_some());
    let record = paid.order.payment.expect("payment record");
    assert_eq!(record.status, "paid");
    assert_eq!(record.provider, "razorpay");
    assert_eq!(record.remote_order_id, "order_r1");
    assert_eq!(record.remote_payment_id.as_deref(), Some("pay_r1"));

    // Replaying the same valid callback is a no-op success.
    payment_service::verify_payment(
        &state,
        verify_payload(order_id, "order_r1", "pay_r1", &signature),
    )
    .await?;
    let replayed = order_service::get_order(&state, &user, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(replayed.order.paid_at, paid.order.paid_at);

    // A paid order cannot start another payment.
    let again = payment_service::initiate_payment(&state, order_id).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    // Fulfillment overlay: independent of the payment axis.
    let invalid_status = admin_service::update_fulfillment(
        &state,
        &admin,
        order_id,
        UpdateFulfillmentRequest {
            fulfillment_status: "teleported".into(),
            tracking: None,
            admin_notes: None,
        },
    )
    .await;
    assert!(matches!(invalid_status, Err(AppError::BadRequest(_))));

    let updated = admin_service::update_fulfillment(
        &state,
        &admin,
        order_id,
        UpdateFulfillmentRequest {
            fulfillment_status: "shipped".into(),
            tracking: Some(TrackingInput {
                carrier: Some("bluedart".into()),
                tracking_number: Some("BD123".into()),
                tracking_url: None,
            }),
            admin_notes: Some("left warehouse".into()),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(updated.fulfillment_status.as_deref(), Some("shipped"));
    assert_eq!(updated.status, "paid");
    assert!(updated.payment.is_some());
    let tracking = updated.tracking.expect("tracking");
    assert_eq!(tracking.carrier.as_deref(), Some("bluedart"));
    assert_eq!(tracking.tracking_number.as_deref(), Some("BD123"));

    // Omitting tracking on a later update clears the previous one.
    let cleared = admin_service::update_fulfillment(
        &state,
        &admin,
        order_id,
        UpdateFulfillmentRequest {
            fulfillment_status: "delivered".into(),
            tracking: None,
            admin_notes: None,
        },
    )
    .await?
    .data
    .expect("order");
    assert!(cleared.tracking.is_none());
    assert!(cleared.admin_notes.is_none());

    // Admin order listing with a status filter.
    let denied_list = admin_service::list_recent_orders(&state, &user, order_query(None)).await;
    assert!(matches!(denied_list, Err(AppError::Forbidden)));

    let paid_page = admin_service::list_recent_orders(&state, &admin, order_query(Some("paid")))
        .await?
        .data
        .expect("orders");
    assert!(paid_page.items.iter().any(|o| o.id == order_id));
    let created_page =
        admin_service::list_recent_orders(&state, &admin, order_query(Some("created")))
            .await?
            .data
            .expect("orders");
    assert!(created_page.items.is_empty());

    // Partial product update re-caches the category name.
    let moved = admin_service::update_product(
        &state,
        &admin,
        product.id,
        UpdateProductRequest {
            title: None,
            slug: None,
            description: None,
            images: None,
            prices: None,
            stock: Some(5),
            active: None,
            category_id: Some(extras.id),
        },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(moved.stock, 5);
    assert_eq!(moved.title, "Green Tea");
    assert_eq!(moved.category_name, "Extras");

    // Explicit null clears the category image; absent fields stay put.
    let cleared_cat = admin_service::update_category(
        &state,
        &admin,
        extras.id,
        UpdateCategoryRequest {
            name: None,
            slug: None,
            active: None,
            sort_order: None,
            image_url: Some(None),
        },
    )
    .await?
    .data
    .expect("category");
    assert_eq!(cleared_cat.name, "Extras");
    assert!(cleared_cat.image_url.is_none());

    // A category keeping products cannot be deleted.
    let blocked = admin_service::delete_category(&state, &admin, extras.id).await;
    assert!(matches!(blocked, Err(AppError::BadRequest(_))));

    admin_service::delete_product(&state, &admin, product.id).await?;
    admin_service::delete_product(&state, &admin, hidden.id).await?;
    admin_service::delete_category(&state, &admin, extras.id).await?;
    admin_service::delete_category(&state, &admin, teas.id).await?;

    let gone = admin_service::delete_product(&state, &admin, product.id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    Ok(())
}

fn sign(payload: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(GATEWAY_SECRET.as_bytes()).expect("valid key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn verify_payload(
    order_id: Uuid,
    remote_order_id: &str,
    remote_payment_id: &str,
    signature: &str,
) -> VerifyPaymentRequest {
    VerifyPaymentRequest {
        order_id: Some(order_id),
        remote_order_id: Some(remote_order_id.into()),
        remote_payment_id: Some(remote_payment_id.into()),
        signature: Some(signature.into()),
    }
}

fn item_input(id: Uuid, qty: Option<i32>) -> OrderItemInput {
    OrderItemInput {
        id,
        slug: Some("green-tea".into()),
        title: Some("Green Tea".into()),
        price: Some(499),
        qty,
    }
}

fn category_payload(name: &str, slug: &str, sort_order: i32) -> CreateCategoryRequest {
    CreateCategoryRequest {
        name: name.into(),
        slug: slug.into(),
        active: true,
        sort_order,
        image_url: None,
    }
}

fn product_payload(title: &str, slug: &str, category_id: Uuid, active: bool) -> CreateProductRequest {
    CreateProductRequest {
        title: title.into(),
        slug: slug.into(),
        description: None,
        images: vec![format!("{slug}.jpg")],
        prices: BTreeMap::from([("INR".to_string(), 499)]),
        stock: 10,
        active,
        category_id,
    }
}

fn order_query(status: Option<&str>) -> OrderListQuery {
    OrderListQuery {
        page: Some(1),
        per_page: Some(20),
        status: status.map(Into::into),
        sort_order: None,
    }
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let orm = create_orm_conn(database_url).await?;

    // Clean tables between runs.
    sqlx::query(
        "TRUNCATE TABLE order_items, orders, products, categories, admins, audit_logs, users CASCADE",
    )
    .execute(&pool)
    .await?;

    let gateway = PaymentGateway::new(GATEWAY_KEY_ID, GATEWAY_SECRET, "https://gateway.test");
    Ok(AppState { pool, orm, gateway })
}

async fn create_user(state: &AppState, email: &str) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, 'dummy')")
        .bind(id)
        .bind(email)
        .execute(&state.pool)
        .await?;
    Ok(id)
}
