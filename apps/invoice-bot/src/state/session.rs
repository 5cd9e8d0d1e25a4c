//! # Session State
//!
//! Per-user cart storage. Carts live only in memory; a restart empties them,
//! and so does a long enough silence (see [`Sessions::evict_idle`]).
//!
//! ## Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  user 501: msg A ──► lock(501) ─── handle A ─── unlock                 │
//! │  user 501: msg B ──► lock(501) ··· waits ······· handle B ── unlock    │
//! │  user 777: msg C ──► lock(777) ─── handle C ─── unlock   (in parallel) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use invoice_core::{Cart, UserId};

/// One user's cart, locked for the duration of a message.
pub type SessionHandle = Arc<tokio::sync::Mutex<Cart>>;

#[derive(Debug)]
struct Session {
    cart: SessionHandle,
    last_used: Instant,
}

/// All live sessions, keyed by user.
#[derive(Debug, Default)]
pub struct Sessions {
    carts: Mutex<HashMap<UserId, Session>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the user's session, creating an empty cart on first use.
    pub fn get(&self, user_id: &UserId) -> SessionHandle {
        // Inserts are single calls, so a poisoned map is still consistent.
        let mut carts = self.carts.lock().unwrap_or_else(|e| e.into_inner());
        let session = carts.entry(user_id.clone()).or_insert_with(|| Session {
            cart: Arc::new(tokio::sync::Mutex::new(Cart::new())),
            last_used: Instant::now(),
        });
        session.last_used = Instant::now();
        session.cart.clone()
    }

    /// Drops sessions unused for at least `max_idle`, cart included.
    ///
    /// A session whose handle is still held elsewhere (a message in flight)
    /// is kept. Returns the number of sessions dropped.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut carts = self.carts.lock().unwrap_or_else(|e| e.into_inner());
        let before = carts.len();
        carts.retain(|_, session| {
            session.last_used.elapsed() < max_idle || Arc::strong_count(&session.cart) > 1
        });
        before - carts.len()
    }

    /// Number of users with a live session.
    pub fn len(&self) -> usize {
        self.carts.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
