use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        catalog::{
            CreateCategoryRequest, CreateProductRequest, UpdateCategoryRequest,
            UpdateProductRequest,
        },
        orders::{
            CreateOrderRequest, CreateOrderResponse, OrderItemInput, OrderList, OrderWithItems,
            TrackingInput, UpdateFulfillmentRequest,
        },
        payments::{
            InitiatePaymentRequest, InitiatePaymentResponse, VerifyPaymentRequest,
            VerifyPaymentResponse,
        },
    },
    models::{Category, Order, OrderItem, PaymentRecord, Product, Tracking, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, catalog, health, orders, params, payments},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        catalog::list_categories,
        catalog::list_products,
        catalog::get_product_by_slug,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        payments::initiate_payment,
        payments::verify_payment,
        admin::list_recent_orders,
        admin::get_order_admin,
        admin::update_fulfillment,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::create_category,
        admin::update_category,
        admin::delete_category,
    ),
    components(
        schemas(
            User,
            Category,
            Product,
            Order,
            OrderItem,
            Tracking,
            PaymentRecord,
            CreateOrderRequest,
            CreateOrderResponse,
            OrderItemInput,
            OrderList,
            OrderWithItems,
            TrackingInput,
            UpdateFulfillmentRequest,
            InitiatePaymentRequest,
            InitiatePaymentResponse,
            VerifyPaymentRequest,
            VerifyPaymentResponse,
            CreateProductRequest,
            UpdateProductRequest,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            params::OrderListQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<Product>,
            ApiResponse<Category>,
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Catalog", description = "Public catalog reads"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Payments", description = "Payment gateway bridge"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Auth", description = "Authentication endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
