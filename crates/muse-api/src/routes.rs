use axum::{
    Json, Router,
    routing::{get, patch, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::{AppState, auth, categories, orders, products};

/// Full HTTP surface. Everything except the banner lives under `/api`;
/// handlers that need a caller take the `AuthUser` extractor, so public and
/// protected methods can share a path.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        // Auth
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/profile", get(auth::profile))
        // Catalog
        .route("/products", get(products::list_products).post(products::create_product))
        .route("/products/{id}", get(products::get_product).put(products::update_product))
        .route("/my-products", get(products::my_products))
        .route("/categories", get(categories::list_categories))
        .route(
            "/categories/{category_id}/subcategories",
            get(categories::list_subcategories),
        )
        // Orders
        .route("/orders", post(orders::place_order))
        .route("/my-orders", get(orders::my_orders))
        .route("/received-orders", get(orders::received_orders))
        .route("/orders/{id}/status", patch(orders::update_order_status));

    Router::new()
        .route("/", get(welcome))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn welcome() -> &'static str {
    "Welcome to Muse Mart Backend API!"
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
