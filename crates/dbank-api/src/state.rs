//! # Application State
//!
//! Shared state for the axum application: one in-memory [`Store`] per
//! entity type plus the optional Postgres pool used for write-through
//! persistence. Cheaply cloneable — all clones share the same stores.

use sqlx::PgPool;

use dbank_state::{Account, Card, Operation, Store};

/// Shared application state passed to all route handlers.
#[derive(Clone, Default)]
pub struct AppState {
    pub accounts: Store<Account>,
    pub cards: Store<Card>,
    pub operations: Store<Operation>,
    /// Write-through target. `None` = in-memory-only mode.
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Fresh in-memory-only state.
    pub fn new() -> Self {
        Self::default()
    }

    /// State backed by a Postgres pool for write-through persistence.
    pub fn with_pool(pool: Option<PgPool>) -> Self {
        Self {
            db_pool: pool,
            ..Self::default()
        }
    }
}
