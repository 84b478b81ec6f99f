//! Session storage
//!
//! Persistence boundary for the signed-in user's token and identity. Hosts
//! back it with whatever storage they have; [`MemorySessionStore`] is the
//! in-process default.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// The signed-in user, as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: i64,
    pub username: String,
}

/// Persisted session state for the signed-in user.
///
/// A 401 from the API clears the store (forced logout); hosts watch
/// [`token`](Self::token) turning `None` to route back to sign-in.
pub trait SessionStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn user(&self) -> Option<UserInfo>;
    /// Store a fresh session after sign-in
    fn store(&self, token: String, user: UserInfo);
    /// Drop the session entirely
    fn clear(&self);
}

/// In-process session store.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<Option<(String, UserInfo)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Option<String> {
        self.inner.read().as_ref().map(|(token, _)| token.clone())
    }

    fn user(&self) -> Option<UserInfo> {
        self.inner.read().as_ref().map(|(_, user)| user.clone())
    }

    fn store(&self, token: String, user: UserInfo) {
        *self.inner.write() = Some((token, user));
    }

    fn clear(&self) {
        *self.inner.write() = None;
    }
}
