//! Integration tests for SaveRush.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p saverush-integration-tests
//! ```
//!
//! No external services are needed: [`FakeBackend`] serves the SaveRush
//! REST API from an in-process axum server on an ephemeral port, and the
//! tests drive the real `BackendClient` against it.
//!
//! # Test Categories
//!
//! - `guest_migration` - guest cart persisted to disk and moved on login
//! - `coupon_pricing` - server-driven coupon pricing and checkout
//! - `auth_session` - login degradation and logout

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

use saverush_storefront::config::{BackendConfig, StorefrontConfig};

/// ID token the fake backend refuses at login.
pub const REJECTED_ID_TOKEN: &str = "reject";

/// A request the fake backend received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Value,
}

#[derive(Debug, Clone)]
struct ProductRecord {
    name: String,
    price: Decimal,
}

#[derive(Debug, Clone)]
struct CouponRecord {
    code: String,
    discount: Decimal,
}

#[derive(Debug, Default, Clone)]
struct CartRecord {
    lines: Vec<(String, u32)>,
    coupon: Option<String>,
}

#[derive(Debug, Default)]
struct BackendState {
    products: HashMap<String, ProductRecord>,
    coupons: HashMap<String, CouponRecord>,
    carts: HashMap<String, CartRecord>,
    tokens: HashMap<String, String>,
    failing_products: HashSet<String>,
    bare_line_replies: bool,
    orders: Vec<Value>,
    calls: Vec<RecordedCall>,
}

type Shared = Arc<Mutex<BackendState>>;

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// FakeBackend
// =============================================================================

/// In-process stand-in for the SaveRush backend.
///
/// The server task is aborted when the value is dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Start a fake backend on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new().nest("/api", routes(Arc::clone(&state)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener
            .local_addr()
            .expect("Failed to read fake backend address");

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL of the API, with a trailing slash.
    ///
    /// # Panics
    ///
    /// Panics if the bound address does not form a valid URL.
    #[must_use]
    pub fn api_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/", self.addr)).expect("Invalid fake backend URL")
    }

    /// Storefront configuration pointing at this backend.
    #[must_use]
    pub fn config(&self, state_file: PathBuf) -> StorefrontConfig {
        StorefrontConfig {
            backend: BackendConfig {
                api_url: self.api_url(),
                catalog_cache_ttl: Duration::from_secs(60),
            },
            state_file,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// User id the backend assigns to `id_token` at login.
    #[must_use]
    pub fn user_id_for(id_token: &str) -> String {
        format!("user-{id_token}")
    }

    pub fn add_product(&self, id: &str, name: &str, price: Decimal) {
        lock(&self.state).products.insert(
            id.to_string(),
            ProductRecord {
                name: name.to_string(),
                price,
            },
        );
    }

    pub fn add_coupon(&self, id: &str, code: &str, discount: Decimal) {
        lock(&self.state).coupons.insert(
            id.to_string(),
            CouponRecord {
                code: code.to_string(),
                discount,
            },
        );
    }

    /// Make every `POST /cart/add` for `product_id` fail.
    pub fn fail_add_for(&self, product_id: &str) {
        lock(&self.state)
            .failing_products
            .insert(product_id.to_string());
    }

    /// Answer `POST /cart/add` and `PUT /cart/update` with `{"success": true}` and no cart.
    pub fn omit_line_reply_data(&self) {
        lock(&self.state).bare_line_replies = true;
    }

    /// Every request received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.state).calls.clone()
    }

    /// Requests received for `path` (relative to the API root, e.g. `/cart/add`).
    #[must_use]
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }

    /// `(product id, quantity)` lines of a user's backend cart.
    #[must_use]
    pub fn cart_of(&self, user_id: &str) -> Vec<(String, u32)> {
        lock(&self.state)
            .carts
            .get(user_id)
            .map(|cart| cart.lines.clone())
            .unwrap_or_default()
    }

    /// Orders placed so far, as returned to the client.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        lock(&self.state).orders.clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Routes
// =============================================================================

fn routes(state: Shared) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/products/{id}", get(get_product))
        .route("/cart", get(get_cart))
        .route("/cart/add", post(add_to_cart))
        .route("/cart/update", put(update_cart))
        .route("/cart/remove/{id}", delete(remove_from_cart))
        .route("/cart/clear", delete(clear_cart))
        .route("/cart/checkout", post(checkout))
        .route("/coupons/apply", post(apply_coupon))
        .route("/coupons/remove", post(remove_coupon))
        .with_state(state)
}

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn bearer_user(state: &BackendState, headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    state.tokens.get(token).cloned()
}

fn record(state: &mut BackendState, method: &'static str, path: impl Into<String>, body: Value) {
    state.calls.push(RecordedCall {
        method,
        path: path.into(),
        body,
    });
}

fn fake_jwt(user_id: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp();
    let claims = json!({ "userId": user_id, "phone": "+919876543210", "exp": exp });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.fake-signature")
}

/// Line and pricing JSON for a user's cart.
fn cart_json(state: &BackendState, user_id: &str) -> Value {
    let cart = state.carts.get(user_id).cloned().unwrap_or_default();

    let mut original = Decimal::ZERO;
    let items: Vec<Value> = cart
        .lines
        .iter()
        .filter_map(|(id, quantity)| {
            let product = state.products.get(id)?;
            original += product.price * Decimal::from(*quantity);
            Some(json!({
                "productId": {
                    "_id": id,
                    "name": product.name,
                    "image": "",
                    "price": product.price,
                },
                "quantity": quantity,
            }))
        })
        .collect();

    let (current, coupon) = apply_discount(state, cart.coupon.as_deref(), original);
    json!({
        "items": items,
        "totalPrice": original,
        "originalPrice": original,
        "currentPrice": current,
        "appliedCoupon": coupon,
    })
}

fn apply_discount(state: &BackendState, coupon_id: Option<&str>, original: Decimal) -> (Decimal, Value) {
    let Some((id, coupon)) = coupon_id.and_then(|id| state.coupons.get(id).map(|c| (id, c))) else {
        return (original, Value::Null);
    };
    let current = (original - coupon.discount).max(Decimal::ZERO);
    (
        current,
        json!({ "id": id, "code": coupon.code, "discount": coupon.discount }),
    )
}

fn pricing_json(state: &BackendState, user_id: &str) -> Value {
    let cart = cart_json(state, user_id);
    json!({
        "currentPrice": cart["currentPrice"],
        "originalPrice": cart["originalPrice"],
        "appliedCoupon": cart["appliedCoupon"],
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    id_token: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    let mut state = lock(&state);
    record(&mut state, "POST", "/auth/login", json!({ "idToken": "[redacted]" }));

    if body.id_token == REJECTED_ID_TOKEN {
        return fail(StatusCode::UNAUTHORIZED, "Invalid ID token");
    }

    let user_id = FakeBackend::user_id_for(&body.id_token);
    let token = fake_jwt(&user_id);
    state.tokens.insert(token.clone(), user_id.clone());

    ok(json!({
        "token": token,
        "user": { "_id": user_id, "phone": "+919876543210" },
    }))
}

async fn get_product(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut state = lock(&state);
    record(&mut state, "GET", format!("/products/{id}"), Value::Null);

    match state.products.get(&id) {
        Some(product) => ok(json!({
            "_id": id,
            "name": product.name,
            "image": format!("https://img.saverush.test/{id}.png"),
            "price": product.price,
        })),
        None => fail(StatusCode::NOT_FOUND, "Product not found"),
    }
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    record(&mut state, "GET", "/cart", Value::Null);

    let Some(user_id) = bearer_user(&state, &headers) else {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    };
    ok(cart_json(&state, &user_id))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineBody {
    product_id: String,
    quantity: u32,
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Response {
    let mut state = lock(&state);
    record(
        &mut state,
        "POST",
        "/cart/add",
        json!({ "productId": body.product_id, "quantity": body.quantity }),
    );

    let Some(user_id) = bearer_user(&state, &headers) else {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    };
    if state.failing_products.contains(&body.product_id) {
        return fail(StatusCode::CONFLICT, "Out of stock");
    }
    if !state.products.contains_key(&body.product_id) {
        return fail(StatusCode::NOT_FOUND, "Product not found");
    }

    let cart = state.carts.entry(user_id.clone()).or_default();
    match cart.lines.iter_mut().find(|(id, _)| *id == body.product_id) {
        Some((_, quantity)) => *quantity = (*quantity + body.quantity).min(99),
        None => cart.lines.push((body.product_id, body.quantity.min(99))),
    }
    line_reply(&state, &user_id)
}

async fn update_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Response {
    let mut state = lock(&state);
    record(
        &mut state,
        "PUT",
        "/cart/update",
        json!({ "productId": body.product_id, "quantity": body.quantity }),
    );

    let Some(user_id) = bearer_user(&state, &headers) else {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    };

    let cart = state.carts.entry(user_id.clone()).or_default();
    let Some(index) = cart.lines.iter().position(|(id, _)| *id == body.product_id) else {
        return fail(StatusCode::NOT_FOUND, "Item not in cart");
    };
    if body.quantity == 0 {
        cart.lines.remove(index);
    } else if let Some((_, quantity)) = cart.lines.get_mut(index) {
        *quantity = body.quantity.min(99);
    }
    line_reply(&state, &user_id)
}

fn line_reply(state: &BackendState, user_id: &str) -> Response {
    if state.bare_line_replies {
        return Json(json!({ "success": true })).into_response();
    }
    ok(cart_json(state, user_id))
}

async fn remove_from_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut state = lock(&state);
    record(&mut state, "DELETE", format!("/cart/remove/{id}"), Value::Null);

    let Some(user_id) = bearer_user(&state, &headers) else {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    };
    if let Some(cart) = state.carts.get_mut(&user_id) {
        cart.lines.retain(|(line_id, _)| *line_id != id);
    }
    ok(cart_json(&state, &user_id))
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    record(&mut state, "DELETE", "/cart/clear", Value::Null);

    let Some(user_id) = bearer_user(&state, &headers) else {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    };
    if let Some(cart) = state.carts.get_mut(&user_id) {
        cart.lines.clear();
    }
    Json(json!({ "success": true, "message": "Cart cleared" })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutBody {
    address_id: String,
    payment_method_id: String,
    #[serde(default)]
    coupon_code: Option<String>,
}

async fn checkout(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CheckoutBody>,
) -> Response {
    let mut state = lock(&state);
    record(
        &mut state,
        "POST",
        "/cart/checkout",
        json!({
            "addressId": body.address_id,
            "paymentMethodId": body.payment_method_id,
            "couponCode": body.coupon_code,
        }),
    );

    let Some(user_id) = bearer_user(&state, &headers) else {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    };
    let cart = cart_json(&state, &user_id);
    if cart["items"].as_array().is_none_or(Vec::is_empty) {
        return fail(StatusCode::BAD_REQUEST, "Cart is empty");
    }

    let order = json!({
        "_id": format!("order-{}", state.orders.len() + 1),
        "status": "confirmed",
        "totalAmount": cart["currentPrice"],
    });
    state.orders.push(order.clone());
    state.carts.remove(&user_id);
    ok(order)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CouponBody {
    coupon_id: String,
}

async fn apply_coupon(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CouponBody>,
) -> Response {
    let mut state = lock(&state);
    record(
        &mut state,
        "POST",
        "/coupons/apply",
        json!({ "couponId": body.coupon_id }),
    );

    let Some(user_id) = bearer_user(&state, &headers) else {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    };
    if !state.coupons.contains_key(&body.coupon_id) {
        return fail(StatusCode::BAD_REQUEST, "Invalid coupon code");
    }
    let cart = state.carts.entry(user_id.clone()).or_default();
    if cart.lines.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Add items before applying a coupon");
    }
    cart.coupon = Some(body.coupon_id);
    ok(pricing_json(&state, &user_id))
}

async fn remove_coupon(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    record(&mut state, "POST", "/coupons/remove", Value::Null);

    let Some(user_id) = bearer_user(&state, &headers) else {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    };
    if let Some(cart) = state.carts.get_mut(&user_id) {
        cart.coupon = None;
    }
    ok(pricing_json(&state, &user_id))
}
