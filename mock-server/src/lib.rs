//! In-memory stand-in for the shop backend, served under `/api`.
//!
//! Users, carts and orders live in a single `RwLock`ed `Shop`; the product
//! catalog is fixed. Failures answer with `{"message": ...}` except login,
//! which answers `{"error": ...}` like the real service.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: u64,
    pub items: Vec<CartItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: Uuid,
    pub user_id: u64,
    pub items: Vec<CartItem>,
    pub total_cents: i64,
    pub status: String,
    #[serde(flatten)]
    pub shipping: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: u64,
    pub email: String,
}

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct PlaceOrder {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(flatten)]
    pub shipping: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct User {
    id: u64,
    email: String,
    password: String,
}

#[derive(Default)]
pub struct Shop {
    users: HashMap<String, User>,
    next_user_id: u64,
    carts: HashMap<u64, Vec<CartItem>>,
    orders: HashMap<u64, Vec<Order>>,
}

impl Shop {
    fn user_exists(&self, id: u64) -> bool {
        self.users.values().any(|u| u.id == id)
    }
}

pub type Db = Arc<RwLock<Shop>>;

type Failure = (StatusCode, Json<ErrorBody>);

fn quantity_too_large() -> Failure {
    fail(StatusCode::BAD_REQUEST, "Quantity too large")
}

fn fail(status: StatusCode, message: &str) -> Failure {
    (
        status,
        Json(ErrorBody {
            message: Some(message.to_string()),
            error: None,
        }),
    )
}

pub fn catalog() -> Vec<Product> {
    [(1, "Ceramic Mug", 1200), (2, "Canvas Tote", 1800), (3, "Notebook", 650)]
        .into_iter()
        .map(|(id, name, price_cents)| Product {
            id,
            name: name.to_string(),
            price_cents,
        })
        .collect()
}

fn price_of(product_id: i64) -> Option<i64> {
    catalog()
        .into_iter()
        .find(|p| p.id == product_id)
        .map(|p| p.price_cents)
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Shop::default()));
    let api = Router::new()
        .route("/products", get(list_products))
        .route("/cart", get(get_cart).post(add_to_cart))
        .route("/cart/remove", post(remove_from_cart))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/orders", get(list_orders).post(place_order));
    Router::new().nest("/api", api).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Resolve `?userId=` to a registered user id.
fn require_user(shop: &Shop, query: &UserQuery) -> Result<u64, Failure> {
    let raw = query
        .user_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| fail(StatusCode::BAD_REQUEST, "userId is required"))?;
    raw.parse::<u64>()
        .ok()
        .filter(|id| shop.user_exists(*id))
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "User not found"))
}

async fn list_products() -> Json<Vec<Product>> {
    Json(catalog())
}

async fn get_cart(State(db): State<Db>, Query(query): Query<UserQuery>) -> Result<Json<Cart>, Failure> {
    let shop = db.read().await;
    let user_id = require_user(&shop, &query)?;
    let items = shop.carts.get(&user_id).cloned().unwrap_or_default();
    Ok(Json(Cart { user_id, items }))
}

async fn add_to_cart(
    State(db): State<Db>,
    Query(query): Query<UserQuery>,
    Json(input): Json<CartItem>,
) -> Result<Json<Cart>, Failure> {
    let mut shop = db.write().await;
    let user_id = require_user(&shop, &query)?;
    if price_of(input.product_id).is_none() {
        return Err(fail(StatusCode::NOT_FOUND, "Product not found"));
    }
    if input.quantity <= 0 {
        return Err(fail(StatusCode::BAD_REQUEST, "Quantity must be positive"));
    }
    let items = shop.carts.entry(user_id).or_default();
    match items.iter_mut().find(|i| i.product_id == input.product_id) {
        Some(existing) => {
            existing.quantity = existing
                .quantity
                .checked_add(input.quantity)
                .ok_or_else(quantity_too_large)?;
        }
        None => items.push(input),
    }
    let items = items.clone();
    Ok(Json(Cart { user_id, items }))
}

async fn remove_from_cart(
    State(db): State<Db>,
    Query(query): Query<UserQuery>,
    Json(input): Json<CartItem>,
) -> Result<Json<Cart>, Failure> {
    let mut shop = db.write().await;
    let user_id = require_user(&shop, &query)?;
    if input.quantity <= 0 {
        return Err(fail(StatusCode::BAD_REQUEST, "Quantity must be positive"));
    }
    let items = shop.carts.entry(user_id).or_default();
    let pos = items
        .iter()
        .position(|i| i.product_id == input.product_id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "Item not in cart"))?;
    items[pos].quantity -= input.quantity;
    if items[pos].quantity <= 0 {
        items.remove(pos);
    }
    let items = items.clone();
    Ok(Json(Cart { user_id, items }))
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<Credentials>,
) -> Result<(StatusCode, Json<AuthResponse>), Failure> {
    if input.email.is_empty() || input.password.is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "Email and password are required"));
    }
    let mut shop = db.write().await;
    if shop.users.contains_key(&input.email) {
        return Err(fail(StatusCode::CONFLICT, "Email already registered"));
    }
    shop.next_user_id += 1;
    let user = User {
        id: shop.next_user_id,
        email: input.email.clone(),
        password: input.password,
    };
    let response = AuthResponse {
        user_id: user.id,
        email: user.email.clone(),
    };
    shop.users.insert(input.email, user);
    info!(user_id = response.user_id, "registered user");
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(State(db): State<Db>, Json(input): Json<Credentials>) -> Result<Json<AuthResponse>, Failure> {
    let shop = db.read().await;
    match shop.users.get(&input.email) {
        Some(user) if user.password == input.password => Ok(Json(AuthResponse {
            user_id: user.id,
            email: user.email.clone(),
        })),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                message: None,
                error: Some("Invalid credentials".to_string()),
            }),
        )),
    }
}

async fn place_order(
    State(db): State<Db>,
    Query(query): Query<UserQuery>,
    Json(input): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<Order>), Failure> {
    let mut shop = db.write().await;
    let user_id = require_user(&shop, &query)?;
    if input.items.is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "Order must contain at least one item"));
    }
    let mut total_cents: i64 = 0;
    for item in &input.items {
        let price = price_of(item.product_id).ok_or_else(|| fail(StatusCode::NOT_FOUND, "Product not found"))?;
        if item.quantity <= 0 {
            return Err(fail(StatusCode::BAD_REQUEST, "Quantity must be positive"));
        }
        total_cents = price
            .checked_mul(item.quantity)
            .and_then(|line| total_cents.checked_add(line))
            .ok_or_else(quantity_too_large)?;
    }
    let order = Order {
        order_id: Uuid::new_v4(),
        user_id,
        items: input.items,
        total_cents,
        status: "PLACED".to_string(),
        shipping: input.shipping,
    };
    shop.carts.remove(&user_id);
    shop.orders.entry(user_id).or_default().push(order.clone());
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(State(db): State<Db>, Query(query): Query<UserQuery>) -> Result<Json<Vec<Order>>, Failure> {
    let shop = db.read().await;
    let user_id = require_user(&shop, &query)?;
    Ok(Json(shop.orders.get(&user_id).cloned().unwrap_or_default()))
}
