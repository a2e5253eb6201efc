//! Domain DTOs for the shop API.
//!
//! # Design
//! The backend's products, carts, orders and auth payloads are treated as
//! opaque JSON (`serde_json::Value`) and returned to callers unchanged. Only
//! the shapes the client itself constructs are typed here.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a product. The backend may use numeric or string ids; the
/// client passes either through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Number(n) => write!(f, "{n}"),
            ProductId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        ProductId::Number(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        ProductId::Text(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        ProductId::Text(id)
    }
}

/// `{ productId, quantity }` as sent for cart mutations and order items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// A caller-side cart row. Only `id` and `quantity` are read; any other
/// fields a UI keeps alongside them are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CartEntry {
    pub id: ProductId,
    pub quantity: i64,
}

impl From<&CartEntry> for CartLine {
    fn from(entry: &CartEntry) -> Self {
        CartLine {
            product_id: entry.id.clone(),
            quantity: entry.quantity,
        }
    }
}

/// Free-form shipping fields merged into the order payload.
pub type ShippingDetails = Map<String, Value>;

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// User profile returned by `ApiClient::fetch_user_details`.
///
/// This is a placeholder: the backend has no profile endpoint yet, so the
/// value is assembled from the session plus fixed address and phone fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: String,
    pub phone: String,
}

/// Build the order payload: `items` first, then every shipping field, so a
/// shipping key named `items` replaces the generated list.
pub fn order_payload(items: Vec<CartLine>, shipping: &ShippingDetails) -> Result<Value, serde_json::Error> {
    let mut payload = Map::new();
    payload.insert("items".to_string(), serde_json::to_value(items)?);
    for (key, value) in shipping {
        payload.insert(key.clone(), value.clone());
    }
    Ok(Value::Object(payload))
}
