//! The caller-owned session: who is logged in.
//!
//! A session is two entries in a `KeyValueStore`, `userId` and `email`. It is
//! an identification, not a credential: there is no token, expiry or
//! signature, and the backend trusts the id as given.

use serde_json::Value;
use tracing::warn;

use crate::store::KeyValueStore;

pub const USER_ID_KEY: &str = "userId";
pub const EMAIL_KEY: &str = "email";

#[derive(Debug)]
pub struct Session<S> {
    store: S,
}

impl<S: KeyValueStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The stored user id, if present and non-empty.
    pub fn user_id(&self) -> Option<String> {
        self.store.get(USER_ID_KEY).filter(|id| !id.is_empty())
    }

    pub fn email(&self) -> Option<String> {
        self.store.get(EMAIL_KEY)
    }

    pub fn is_logged_in(&self) -> bool {
        self.user_id().is_some()
    }

    pub fn persist(&self, user_id: &str, email: Option<&str>) {
        self.store.set(USER_ID_KEY, user_id);
        match email {
            Some(email) => self.store.set(EMAIL_KEY, email),
            None => self.store.remove(EMAIL_KEY),
        }
    }

    /// Record the identity returned by register or login. Numeric ids are
    /// stored in their decimal form. Returns `false` if the payload has no
    /// usable `userId`; any previously stored id is then dropped so later
    /// calls cannot run as an earlier user.
    pub fn persist_auth_payload(&self, payload: &Value) -> bool {
        let email = payload.get(EMAIL_KEY).and_then(Value::as_str);
        let user_id = match payload.get(USER_ID_KEY) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                warn!("auth response carried no userId, stale session dropped");
                self.store.remove(USER_ID_KEY);
                match email {
                    Some(email) => self.store.set(EMAIL_KEY, email),
                    None => self.store.remove(EMAIL_KEY),
                }
                return false;
            }
        };
        self.persist(&user_id, email);
        true
    }

    pub fn clear(&self) {
        self.store.remove(USER_ID_KEY);
        self.store.remove(EMAIL_KEY);
    }
}
