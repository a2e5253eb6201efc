//! Stateless HTTP request builder and response parser for the shop API.
//!
//! # Design
//! `ShopClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Session lookup and I/O belong to `ApiClient`; this layer is deterministic.
//!
//! Authorized endpoints take the user id as a `userId` query parameter. The
//! backend does no further authentication.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{order_payload, CartEntry, CartLine, LoginRequest, ShippingDetails};

/// Message used when neither the body nor the status line explains a failure.
/// An unparsable error body falls back to the status text first; this applies
/// only when that is empty too.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Login's fallback when the error body is JSON without `message`/`error`.
pub const UNKNOWN_LOGIN_ERROR: &str = "Unknown Error";

/// Synchronous, stateless client for the shop API.
#[derive(Debug, Clone)]
pub struct ShopClient {
    base_url: String,
}

impl ShopClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_fetch_products(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/products", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_add_to_cart(&self, user_id: &str, line: &CartLine) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, self.user_url("/cart", user_id), line)
    }

    pub fn build_fetch_cart_items(&self, user_id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.user_url("/cart", user_id),
            headers: json_headers(),
            body: None,
        }
    }

    pub fn build_remove_cart_item(&self, user_id: &str, line: &CartLine) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, self.user_url("/cart/remove", user_id), line)
    }

    /// `user_data` is forwarded verbatim as the registration body.
    pub fn build_register_user<T: Serialize + ?Sized>(&self, user_data: &T) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, format!("{}/auth/register", self.base_url), user_data)
    }

    pub fn build_login_user(&self, email: &str, password: &str) -> Result<HttpRequest, ApiError> {
        let body = LoginRequest { email, password };
        self.json_request(HttpMethod::Post, format!("{}/auth/login", self.base_url), &body)
    }

    pub fn build_place_order(
        &self,
        user_id: &str,
        cart: &[CartEntry],
        shipping: &ShippingDetails,
    ) -> Result<HttpRequest, ApiError> {
        let items = cart.iter().map(CartLine::from).collect();
        let payload = order_payload(items, shipping).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.json_request(HttpMethod::Post, self.user_url("/orders", user_id), &payload)
    }

    pub fn build_fetch_order_history(&self, user_id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.user_url("/orders", user_id),
            headers: json_headers(),
            body: None,
        }
    }

    pub fn parse_fetch_products(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_json(response)
    }

    pub fn parse_add_to_cart(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_json(response)
    }

    pub fn parse_fetch_cart_items(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_json(response)
    }

    /// The body of a successful removal is ignored.
    pub fn parse_remove_cart_item(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_register_user(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_json(response)
    }

    /// Like the other parsers on success; on failure the raw body text is
    /// inspected first so non-JSON error pages still reach the caller.
    pub fn parse_login_user(&self, response: HttpResponse) -> Result<Value, ApiError> {
        if !response.is_success() {
            return Err(login_error(&response));
        }
        decode(&response.body)
    }

    pub fn parse_place_order(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_json(response)
    }

    pub fn parse_fetch_order_history(&self, response: HttpResponse) -> Result<Value, ApiError> {
        parse_json(response)
    }

    fn user_url(&self, path: &str, user_id: &str) -> String {
        let user_id: String = form_urlencoded::byte_serialize(user_id.as_bytes()).collect();
        format!("{}{path}?userId={user_id}", self.base_url)
    }

    fn json_request<T: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        url: String,
        payload: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method,
            url,
            headers: json_headers(),
            body: Some(body),
        })
    }
}

fn json_headers() -> Vec<(String, String)> {
    vec![("content-type".to_string(), "application/json".to_string())]
}

/// Error payload the backend may attach to a failure.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Decode `body` as `T`, or use `fallback` if it is not valid for `T`.
pub(crate) fn parse_or<T: DeserializeOwned>(body: &str, fallback: impl FnOnce() -> T) -> T {
    serde_json::from_str(body).unwrap_or_else(|_| fallback())
}

fn non_empty(text: &str) -> Option<&str> {
    Some(text).filter(|t| !t.is_empty())
}

fn status_text_or_unknown(response: &HttpResponse) -> String {
    non_empty(&response.status_text).unwrap_or(UNKNOWN_ERROR).to_string()
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let body: ErrorBody = parse_or(&response.body, ErrorBody::default);
    let message = match body.message.as_deref().and_then(non_empty) {
        Some(message) => message.to_string(),
        None => status_text_or_unknown(response),
    };
    Err(ApiError::Request {
        status: response.status,
        message,
    })
}

fn login_error(response: &HttpResponse) -> ApiError {
    let message = match serde_json::from_str::<Value>(&response.body) {
        Ok(json) => ["message", "error"]
            .iter()
            .find_map(|key| json.get(key).and_then(Value::as_str).and_then(non_empty))
            .unwrap_or(UNKNOWN_LOGIN_ERROR)
            .to_string(),
        Err(_) if response.body.trim().is_empty() => status_text_or_unknown(response),
        Err(_) => response.body.clone(),
    };
    ApiError::Request {
        status: response.status,
        message,
    }
}

fn decode(body: &str) -> Result<Value, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Transport(format!("malformed response body: {e}")))
}

fn parse_json(response: HttpResponse) -> Result<Value, ApiError> {
    check_status(&response)?;
    decode(&response.body)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::ProductId;

    fn client() -> ShopClient {
        ShopClient::new("http://localhost:8080/api")
    }

    fn response(status: u16, status_text: &str, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            status_text: status_text.to_string(),
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn body_json(req: &HttpRequest) -> Value {
        serde_json::from_str(req.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn build_fetch_products_produces_correct_request() {
        let req = client().build_fetch_products();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8080/api/products");
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn build_add_to_cart_produces_correct_request() {
        let line = CartLine {
            product_id: ProductId::Number(3),
            quantity: 2,
        };
        let req = client().build_add_to_cart("42", &line).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8080/api/cart?userId=42");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        assert_eq!(body_json(&req), json!({"productId": 3, "quantity": 2}));
    }

    #[test]
    fn build_fetch_cart_items_sends_json_header_without_body() {
        let req = client().build_fetch_cart_items("42");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8080/api/cart?userId=42");
        assert_eq!(req.headers.len(), 1);
        assert!(req.body.is_none());
    }

    #[test]
    fn build_remove_cart_item_targets_remove_endpoint() {
        let line = CartLine {
            product_id: "sku-1".into(),
            quantity: 1,
        };
        let req = client().build_remove_cart_item("42", &line).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8080/api/cart/remove?userId=42");
        assert_eq!(body_json(&req), json!({"productId": "sku-1", "quantity": 1}));
    }

    #[test]
    fn user_id_is_query_encoded() {
        let req = client().build_fetch_order_history("a b&c");
        assert_eq!(req.url, "http://localhost:8080/api/orders?userId=a+b%26c");
    }

    #[test]
    fn build_register_forwards_user_data_verbatim() {
        let data = json!({"email": "a@b.com", "password": "pw", "name": "Ann"});
        let req = client().build_register_user(&data).unwrap();
        assert_eq!(req.url, "http://localhost:8080/api/auth/register");
        assert_eq!(body_json(&req), data);
    }

    #[test]
    fn build_login_produces_credentials_body() {
        let req = client().build_login_user("a@b.com", "pw").unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:8080/api/auth/login");
        assert_eq!(body_json(&req), json!({"email": "a@b.com", "password": "pw"}));
    }

    #[test]
    fn build_place_order_maps_cart_entries() {
        let cart = vec![
            CartEntry {
                id: ProductId::Number(1),
                quantity: 2,
            },
            CartEntry {
                id: "sku-9".into(),
                quantity: 1,
            },
        ];
        let shipping = json!({"address": "1 Main St"});
        let req = client()
            .build_place_order("7", &cart, shipping.as_object().unwrap())
            .unwrap();
        assert_eq!(req.url, "http://localhost:8080/api/orders?userId=7");
        assert_eq!(
            body_json(&req),
            json!({
                "items": [
                    {"productId": 1, "quantity": 2},
                    {"productId": "sku-9", "quantity": 1}
                ],
                "address": "1 Main St"
            })
        );
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = ShopClient::new("http://localhost:8080/api/");
        assert_eq!(client.build_fetch_products().url, "http://localhost:8080/api/products");
    }

    #[test]
    fn parse_fetch_products_success() {
        let products = client()
            .parse_fetch_products(response(200, "OK", r#"[{"id":1,"name":"Mug"}]"#))
            .unwrap();
        assert_eq!(products, json!([{"id": 1, "name": "Mug"}]));
    }

    #[test]
    fn error_message_comes_from_body() {
        let err = client()
            .parse_add_to_cart(response(400, "Bad Request", r#"{"message":"bad input"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Request { status: 400, ref message } if message == "bad input"));
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("bad input"));
    }

    #[test]
    fn unparsable_error_body_falls_back_to_status_text() {
        let err = client()
            .parse_fetch_cart_items(response(502, "Bad Gateway", "<html>oops</html>"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Request { status: 502, ref message } if message == "Bad Gateway"));
    }

    #[test]
    fn error_body_without_message_falls_back_to_status_text() {
        let err = client()
            .parse_place_order(response(500, "Internal Server Error", r#"{"error":"boom"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Request { ref message, .. } if message == "Internal Server Error"));
    }

    #[test]
    fn missing_status_text_uses_unknown_error() {
        let err = client()
            .parse_fetch_order_history(response(500, "", "garbage"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Request { ref message, .. } if message == UNKNOWN_ERROR));
    }

    #[test]
    fn parse_remove_cart_item_ignores_body() {
        assert!(client()
            .parse_remove_cart_item(response(200, "OK", "not even json"))
            .is_ok());
        let err = client()
            .parse_remove_cart_item(response(404, "Not Found", r#"{"message":"no such item"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Request { status: 404, ref message } if message == "no such item"));
    }

    #[test]
    fn malformed_success_body_is_transport_error() {
        let err = client()
            .parse_fetch_products(response(200, "OK", "not json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn login_error_prefers_message_then_error() {
        let c = client();
        let err = c
            .parse_login_user(response(401, "Unauthorized", r#"{"message":"nope"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Request { ref message, .. } if message == "nope"));

        let err = c
            .parse_login_user(response(401, "Unauthorized", r#"{"error":"Invalid credentials"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Request { ref message, .. } if message == "Invalid credentials"));

        let err = c
            .parse_login_user(response(401, "Unauthorized", r#"{"code":7}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Request { ref message, .. } if message == UNKNOWN_LOGIN_ERROR));
    }

    #[test]
    fn login_error_uses_raw_text_when_not_json() {
        let err = client()
            .parse_login_user(response(503, "Service Unavailable", "maintenance window"))
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 503 - maintenance window");

        let err = client()
            .parse_login_user(response(503, "Service Unavailable", ""))
            .unwrap_err();
        assert!(matches!(err, ApiError::Request { ref message, .. } if message == "Service Unavailable"));
    }

    #[test]
    fn parse_or_uses_fallback_only_on_failure() {
        assert_eq!(parse_or::<i64>("5", || 0), 5);
        assert_eq!(parse_or::<i64>("five", || 0), 0);
    }
}
