//! # plant-auth server
//!
//! axum server exposing the `/auth/*` endpoints.
//!
//! ## Quick Start
//!
//! 1. **Start the server** (the secret must decode to at least 32 bytes):
//!    ```bash
//!    PLANT_AUTH_SECRET=$(head -c 32 /dev/urandom | base64) cargo run
//!    ```
//!
//! 2. **Sign up and log in**:
//!    ```bash
//!    curl -X POST http://127.0.0.1:8080/auth/signup \
//!      -H "Content-Type: application/json" \
//!      -d '{"email":"user@example.com","password":"pw"}'
//!    curl -X POST http://127.0.0.1:8080/auth/login \
//!      -H "Content-Type: application/json" \
//!      -d '{"email":"user@example.com","password":"pw"}'
//!    ```
//!
//! 3. **Access the protected endpoint**:
//!    ```bash
//!    curl -H "Authorization: Bearer <your-token>" http://127.0.0.1:8080/auth/me
//!    ```
//!
//! 4. **Logout**; the token is refused from now on:
//!    ```bash
//!    curl -X POST -H "Authorization: Bearer <your-token>" \
//!      http://127.0.0.1:8080/auth/logout
//!    ```

use std::sync::Arc;

use plant_auth::{AuthConfig, AuthContext, InMemoryCredentialStore, SystemClock, axum_support};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AuthConfig::from_env()?;
    let credentials = Arc::new(InMemoryCredentialStore::new());
    let ctx = AuthContext::from_config(&config, credentials, Arc::new(SystemClock))?;

    // One sweep task for the whole process.
    let sweeper = ctx.revocations.spawn_sweeper(config.sweep_interval());

    let app = axum_support::router(ctx).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "plant-auth server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    Ok(())
}
