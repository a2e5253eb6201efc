//! Async client for the shop backend: products, cart, auth and orders.
//!
//! # Overview
//! `ShopClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network. `ApiClient` drives it over an
//! `HttpTransport`, reading and writing the caller's `Session` (user id and
//! email kept in a `KeyValueStore`).
//!
//! # Design
//! - `ShopClient` is stateless: it holds only `base_url`.
//! - Each operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and testable without a server.
//! - The session is passed into every call; there is no hidden global state.
//! - Backend payloads are opaque `serde_json::Value`s returned unchanged.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod store;
pub mod types;

pub use api::ApiClient;
pub use client::ShopClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use session::Session;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{CartEntry, CartLine, ProductId, ShippingDetails, UserDetails};
