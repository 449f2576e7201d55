use super::handlers::{health, proxy_page, relay_resource};
use super::state::AppState;
use axum::routing::get;
use axum::Router;
use shroud_types::{ShroudError, ShroudResult};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Dropping a timed-out request future abandons its in-flight fetches.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let endpoints = state.handler().links().endpoints().clone();

    Router::new()
        .route("/health", get(health))
        .route(&endpoints.proxy_path, get(proxy_page))
        .route(&format!("{}*resource", endpoints.image_path), get(relay_resource))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

pub struct ApiServer {
    addr: SocketAddr,
    state: AppState,
    request_timeout: Duration,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, state: AppState, request_timeout: Duration) -> Self {
        Self {
            addr,
            state,
            request_timeout,
        }
    }

    pub async fn serve<F>(self, shutdown: F) -> ShroudResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| ShroudError::Internal(format!("Failed to bind proxy server on {}: {}", self.addr, e)))?;
        self.serve_on(listener, shutdown).await
    }

    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> ShroudResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener
            .local_addr()
            .map_err(|e| ShroudError::Internal(format!("Listener has no local address: {}", e)))?;
        info!("Proxy listening on http://{}", local);

        axum::serve(listener, router(self.state, self.request_timeout))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ShroudError::Internal(format!("Proxy server error: {}", e)))?;

        info!("Proxy server stopped");
        Ok(())
    }
}
