//! # Database Persistence Layer
//!
//! Optional Postgres persistence via SQLx. When `DATABASE_URL` is set,
//! every successful write is mirrored to Postgres (write-through) and
//! the stores are rehydrated from it on startup. When absent, the API
//! runs in-memory only — suitable for development and tests.
//!
//! The in-memory stores stay authoritative during request handling; the
//! database is a durability mirror. A failed mirror write is surfaced to
//! the client as a 500 because the in-memory record would otherwise be
//! silently lost on restart.

pub mod accounts;
pub mod cards;
pub mod operations;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::state::AppState;

/// Initialize the connection pool and run embedded migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Load every persisted record into the in-memory stores on startup.
/// Inactive (soft-deleted) rows are loaded too — they stay resident for
/// audit and must keep shadowing their ids.
pub async fn hydrate(state: &AppState, pool: &PgPool) -> Result<(), sqlx::Error> {
    let accounts = accounts::load_all(pool).await?;
    let cards = cards::load_all(pool).await?;
    let operations = operations::load_all(pool).await?;

    tracing::info!(
        accounts = accounts.len(),
        cards = cards.len(),
        operations = operations.len(),
        "hydrated in-memory stores from database"
    );

    for account in accounts {
        state.accounts.insert(account);
    }
    for card in cards {
        state.cards.insert(card);
    }
    for operation in operations {
        state.operations.insert(operation);
    }
    Ok(())
}

/// Persist to Postgres if a pool is configured, mapping failure to a
/// client-visible internal error.
macro_rules! persist {
    ($state:expr, $save_fn:path, $record:expr) => {
        if let Some(ref pool) = $state.db_pool {
            if let Err(e) = $save_fn(pool, $record).await {
                tracing::error!(error = %e, "failed to persist record to database");
                return Err(crate::error::AppError::Internal(
                    "record updated in-memory but database persist failed".to_string(),
                ));
            }
        }
    };
}

pub(crate) use persist;
