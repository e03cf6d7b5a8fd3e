//! Axum server setup.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use super::routes::api_router;
use super::state::AppState;

/// Build the admin router with its state and CORS applied
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_router())
        .layer(cors)
        .with_state(state)
}

/// Serve the admin API until `shutdown` resolves
pub async fn run_server<F>(
    state: Arc<AppState>,
    bind: SocketAddr,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("Herd admin API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
