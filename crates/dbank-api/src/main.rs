//! dbank API server entry point.
//!
//! Configuration is environment-driven: `DBANK_PORT` (default 8080),
//! `DATABASE_URL` (optional — absent means in-memory-only mode), and
//! `RUST_LOG` for log filtering.

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use dbank_api::{app, db, state::AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("DBANK_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let pool = match db::init_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "database initialization failed");
            std::process::exit(1);
        }
    };

    let state = AppState::with_pool(pool);
    if let Some(ref pool) = state.db_pool {
        if let Err(e) = db::hydrate(&state, pool).await {
            tracing::error!(error = %e, "failed to hydrate stores from database");
            std::process::exit(1);
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("dbank-api listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");
    axum::serve(listener, app(state).into_make_service())
        .await
        .expect("server error");
}
