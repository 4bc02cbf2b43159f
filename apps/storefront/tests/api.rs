//! End-to-end tests of the storefront router.
//!
//! Each test builds the router over an in-memory snapshot and drives it
//! with `oneshot`, carrying cookies between requests by hand.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use maple_core::cache::SystemClock;
use maple_core::catalog::MemoryCatalog;
use maple_core::context::EngineOptions;
use maple_core::jurisdiction::CookiePolicy;
use maple_core::settings::{SettingKey, SettingsMap};
use maple_core::{CategoryId, Jurisdiction, Product, ProductId, ProductKind, PurchaseGuardScope};
use maple_db::CatalogSnapshot;
use maple_storefront::{build_router, AppState};

// =============================================================================
// Fixtures
// =============================================================================

fn simple(id: u64, name: &str, category: u64, price: i64) -> Product {
    Product {
        id: ProductId(id),
        name: name.to_string(),
        kind: ProductKind::Simple,
        category_ids: vec![CategoryId(category)],
        regular_price: Some(Decimal::from(price)),
        sale: None,
        size: None,
    }
}

fn snapshot() -> CatalogSnapshot {
    let catalog = MemoryCatalog::new()
        .with_category(CategoryId(1), None)
        .with_category(CategoryId(2), None)
        .with_product(simple(1, "Mango Pod", 1, 100))
        .with_product(simple(2, "Coil Pack", 2, 20))
        .with_product(simple(3, "Mint Pod", 1, 50));

    let settings = SettingsMap::new()
        .with(SettingKey::TaxRate(Jurisdiction::Ontario), "13")
        .with(SettingKey::TaxRate(Jurisdiction::Quebec), "14,975")
        .with_list(SettingKey::TaxableRootCategories, [1])
        .with_list(SettingKey::HiddenProducts(Jurisdiction::Quebec), [3]);

    CatalogSnapshot::from_parts(catalog, settings)
}

fn state_with(options: EngineOptions) -> Arc<AppState> {
    Arc::new(AppState::new(
        snapshot(),
        Arc::new(SystemClock),
        options,
        CookiePolicy::for_site("shop.example", None, false),
    ))
}

fn app_with(options: EngineOptions) -> Router {
    build_router(state_with(options))
}

fn app() -> Router {
    app_with(EngineOptions::default())
}

fn get(uri: &str, cookies: &str) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if !cookies.is_empty() {
        builder = builder.header(COOKIE, cookies);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, cookies: &str, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if !cookies.is_empty() {
        builder = builder.header(COOKIE, cookies);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// `name=value` of the session cookie the server issued.
fn session_of(response: &Response<Body>) -> String {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with("session="))
        .and_then(|c| c.split(';').next().map(str::to_string))
        .unwrap()
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn product_ids(listing: &Value) -> Vec<u64> {
    listing["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_u64().unwrap())
        .collect()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_reports_snapshot() {
    let response = app().oneshot(get("/health", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["products"], 3);
    assert!(body["database"].is_null());
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_listing_prices_for_query_province() {
    let response = app()
        .oneshot(get("/products?province=on", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = set_cookies(&response);
    assert!(cookies.iter().any(|c| c.starts_with("province=ON")));
    assert!(cookies.iter().any(|c| c.starts_with("session=")));

    let body = json_body(response).await;
    assert_eq!(body["province"], "ON");
    let products = body["products"].as_array().unwrap();
    let mango = products.iter().find(|p| p["id"] == 1).unwrap();
    let coils = products.iter().find(|p| p["id"] == 2).unwrap();
    assert_eq!(mango["priceHtml"], "$113.00");
    // Accessories sit outside the taxable tree.
    assert_eq!(coils["priceHtml"], "$20.00");
}

#[tokio::test]
async fn test_listing_without_province_is_untaxed() {
    let response = app().oneshot(get("/products", "")).await.unwrap();
    let cookies = set_cookies(&response);
    assert!(!cookies.iter().any(|c| c.starts_with("province=")));

    let body = json_body(response).await;
    assert!(body["province"].is_null());
    let mango = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == 1)
        .cloned()
        .unwrap();
    assert_eq!(mango["priceHtml"], "$100.00");
}

#[tokio::test]
async fn test_cookie_province_hides_products() {
    let response = app()
        .oneshot(get("/products", "province=QC"))
        .await
        .unwrap();
    // Cookie already matches; nothing to write back.
    assert!(!set_cookies(&response)
        .iter()
        .any(|c| c.starts_with("province=")));

    let body = json_body(response).await;
    assert_eq!(body["province"], "QC");
    let ids = product_ids(&body);
    assert!(ids.contains(&1));
    assert!(!ids.contains(&3));
}

#[tokio::test]
async fn test_whitelist_loses_hidden_ids() {
    let response = app()
        .oneshot(get("/products?province=QC&ids=3,2", ""))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(product_ids(&body), vec![2]);
}

#[tokio::test]
async fn test_malformed_whitelist_is_rejected() {
    let response = app()
        .oneshot(get("/products?ids=2,abc", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unrecognized_cookie_is_cleared() {
    let response = app()
        .oneshot(get("/products", "province=ZZ"))
        .await
        .unwrap();
    let cleared = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with("province="))
        .unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let body = json_body(response).await;
    assert!(body["province"].is_null());
}

#[tokio::test]
async fn test_hidden_product_page_is_not_found() {
    let response = app()
        .oneshot(get("/products/3?province=QC", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let response = app()
        .oneshot(get("/products/3?province=ON", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["product"]["priceHtml"], "$56.50");
    assert_eq!(body["purchasable"], true);
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_cart_lines_priced_for_province() {
    let app = app();
    let response = app
        .clone()
        .oneshot(post(
            "/cart/items?province=ON",
            "",
            json!({ "productId": 1, "quantity": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = session_of(&response);

    let body = json_body(response).await;
    let line = &body["lines"][0];
    assert_eq!(line["unitPriceHtml"], "$113.00");
    assert_eq!(line["subtotalHtml"], "$226.00");
    assert_eq!(body["totals"]["subtotalHtml"], "$226.00");

    // Switching province on the cart page reprices the same lines.
    let cookies = format!("{}; province=ON", session);
    let response = app
        .oneshot(get("/cart?province=QC", &cookies))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["province"], "QC");
    assert_eq!(body["lines"][0]["unitPriceHtml"], "$114.98");
    assert_eq!(body["lines"][0]["subtotalHtml"], "$229.95");
}

#[tokio::test]
async fn test_viewing_cart_does_not_store_one() {
    let state = state_with(EngineOptions::default());
    let app = build_router(state.clone());

    for _ in 0..3 {
        let response = app.clone().oneshot(get("/cart", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["lines"].as_array().unwrap().len(), 0);
        assert_eq!(body["totals"]["itemCount"], 0);
    }
    let response = app
        .clone()
        .oneshot(post("/checkout/validate", "", json!({ "shippingState": "ON" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.carts.session_count(), 0);

    let response = app
        .oneshot(post("/cart/items", "", json!({ "productId": 1 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.carts.session_count(), 1);
}

#[tokio::test]
async fn test_product_page_add_blocked_when_hidden() {
    let response = app()
        .oneshot(post(
            "/cart/items?province=QC",
            "",
            json!({ "productId": 3, "fromProductPage": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "NOT_PURCHASABLE");
}

#[tokio::test]
async fn test_guard_scope_controls_other_origins() {
    let request = || {
        post(
            "/cart/items?province=QC",
            "",
            json!({ "productId": 3 }),
        )
    };

    let response = app().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let strict = app_with(EngineOptions {
        purchase_guard: PurchaseGuardScope::Everywhere,
        ..EngineOptions::default()
    });
    let response = strict.oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_add_rejects_zero_quantity_and_unknown_product() {
    let response = app()
        .oneshot(post("/cart/items", "", json!({ "productId": 1, "quantity": 0 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app()
        .oneshot(post("/cart/items", "", json!({ "productId": 99 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_lists_unavailable_items() {
    let app = app();
    let response = app
        .clone()
        .oneshot(post("/cart/items", "", json!({ "productId": 3 })))
        .await
        .unwrap();
    let session = session_of(&response);

    let response = app
        .clone()
        .oneshot(post(
            "/checkout/validate",
            &session,
            json!({ "shippingState": "QC" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAVAILABLE_ITEMS");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("\"Mint Pod\""));

    let response = app
        .oneshot(post(
            "/checkout/validate",
            &session,
            json!({ "shippingState": "ON" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["province"], "ON");
    assert_eq!(body["cart"]["lines"][0]["unitPriceHtml"], "$56.50");
}
