//! Async shop operations over an `HttpTransport`.
//!
//! # Design
//! `ApiClient` pairs a `ShopClient` with a transport. Each operation takes
//! the caller's `Session` explicitly: authorized operations read the user id
//! from it and fail with `ApiError::NotLoggedIn` before any I/O when it is
//! missing; register and login write it on success. Failures are logged where
//! they happen and returned unchanged. Nothing is retried or cached.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::client::ShopClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::session::Session;
use crate::store::KeyValueStore;
use crate::types::{CartEntry, CartLine, ProductId, ShippingDetails, UserDetails};

/// Quantity used by `add_to_cart` when the caller passes `None`.
pub const DEFAULT_CART_QUANTITY: i64 = 1;

/// Artificial latency of the `fetch_user_details` placeholder.
pub const USER_DETAILS_DELAY: Duration = Duration::from_millis(500);

const MOCK_ADDRESS: &str = "123 Mock Address, Mock City";
const MOCK_PHONE: &str = "555-1234";

#[derive(Debug, Clone)]
pub struct ApiClient<T = ReqwestTransport> {
    client: ShopClient,
    transport: T,
}

impl ApiClient<ReqwestTransport> {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(ShopClient::new(&config.base_url), ReqwestTransport::new())
    }
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(client: ShopClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &ShopClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn fetch_products(&self) -> Result<Value, ApiError> {
        logged("fetching products", async {
            let response = self.send(self.client.build_fetch_products()).await?;
            self.client.parse_fetch_products(response)
        })
        .await
    }

    /// Add `quantity` (default 1) of a product to the user's cart.
    pub async fn add_to_cart<S: KeyValueStore>(
        &self,
        session: &Session<S>,
        product_id: impl Into<ProductId>,
        quantity: Option<i64>,
    ) -> Result<Value, ApiError> {
        let line = CartLine {
            product_id: product_id.into(),
            quantity: quantity.unwrap_or(DEFAULT_CART_QUANTITY),
        };
        logged("adding to cart", async {
            let user_id = require_user(session, "add to cart")?;
            let request = self.client.build_add_to_cart(&user_id, &line)?;
            let response = self.send(request).await?;
            self.client.parse_add_to_cart(response)
        })
        .await
    }

    pub async fn fetch_cart_items<S: KeyValueStore>(&self, session: &Session<S>) -> Result<Value, ApiError> {
        logged("fetching cart items", async {
            let user_id = require_user(session, "fetch cart items")?;
            let response = self.send(self.client.build_fetch_cart_items(&user_id)).await?;
            self.client.parse_fetch_cart_items(response)
        })
        .await
    }

    pub async fn remove_cart_item<S: KeyValueStore>(
        &self,
        session: &Session<S>,
        product_id: impl Into<ProductId>,
        quantity: i64,
    ) -> Result<(), ApiError> {
        let line = CartLine {
            product_id: product_id.into(),
            quantity,
        };
        logged("removing cart item", async {
            let user_id = require_user(session, "remove cart item")?;
            let request = self.client.build_remove_cart_item(&user_id, &line)?;
            let response = self.send(request).await?;
            self.client.parse_remove_cart_item(response)
        })
        .await
    }

    /// Register a new account and store the returned identity in `session`.
    pub async fn register_user<S, U>(&self, session: &Session<S>, user_data: &U) -> Result<Value, ApiError>
    where
        S: KeyValueStore,
        U: Serialize + ?Sized + Sync,
    {
        logged("registering user", async {
            let request = self.client.build_register_user(user_data)?;
            let response = self.send(request).await?;
            let payload = self.client.parse_register_user(response)?;
            session.persist_auth_payload(&payload);
            Ok(payload)
        })
        .await
    }

    /// Log in and store the returned identity in `session`.
    pub async fn login_user<S: KeyValueStore>(
        &self,
        session: &Session<S>,
        email: &str,
        password: &str,
    ) -> Result<Value, ApiError> {
        logged("logging in", async {
            debug!(email, password_len = password.len(), "sending login request");
            let request = self.client.build_login_user(email, password)?;
            let response = self.send(request).await?;
            let payload = self.client.parse_login_user(response)?;
            session.persist_auth_payload(&payload);
            Ok(payload)
        })
        .await
    }

    /// Placeholder profile lookup. No backend endpoint exists yet: after a
    /// fixed delay this returns the session's id and email with a canned
    /// address and phone, and never touches the transport.
    pub async fn fetch_user_details<S: KeyValueStore>(&self, session: &Session<S>) -> Result<UserDetails, ApiError> {
        logged("fetching user details", async {
            let user_id = require_user(session, "fetch user details")?;
            info!("simulated API: returning mock user details");
            tokio::time::sleep(USER_DETAILS_DELAY).await;
            let email = session.email();
            Ok(UserDetails {
                id: user_id,
                name: email.clone(),
                email,
                address: MOCK_ADDRESS.to_string(),
                phone: MOCK_PHONE.to_string(),
            })
        })
        .await
    }

    /// Submit the cart as an order. `shipping` fields are merged into the
    /// payload next to `items`.
    pub async fn place_order<S: KeyValueStore>(
        &self,
        session: &Session<S>,
        cart: &[CartEntry],
        shipping: &ShippingDetails,
    ) -> Result<Value, ApiError> {
        logged("placing order", async {
            let user_id = require_user(session, "place order")?;
            let request = self.client.build_place_order(&user_id, cart, shipping)?;
            let response = self.send(request).await?;
            self.client.parse_place_order(response)
        })
        .await
    }

    pub async fn fetch_order_history<S: KeyValueStore>(&self, session: &Session<S>) -> Result<Value, ApiError> {
        logged("fetching order history", async {
            let user_id = require_user(session, "fetch order history")?;
            let response = self.send(self.client.build_fetch_order_history(&user_id)).await?;
            self.client.parse_fetch_order_history(response)
        })
        .await
    }

    /// Forget the stored identity. No request is made.
    pub fn clear_auth_token<S: KeyValueStore>(&self, session: &Session<S>) {
        session.clear();
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");
        let response = self.transport.execute(request).await?;
        debug!(status = response.status, "received response");
        Ok(response)
    }
}

fn require_user<S: KeyValueStore>(session: &Session<S>, action: &'static str) -> Result<String, ApiError> {
    session.user_id().ok_or(ApiError::NotLoggedIn { action })
}

async fn logged<R>(operation: &'static str, fut: impl Future<Output = Result<R, ApiError>>) -> Result<R, ApiError> {
    let result = fut.await;
    if let Err(e) = &result {
        error!(operation, error = %e, "shop API call failed");
    }
    result
}
