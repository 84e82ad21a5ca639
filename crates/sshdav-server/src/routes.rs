//! Router wiring for the WebDAV handler.

use axum::extract::{Request, State};
use axum::response::IntoResponse;
use axum::Router;
use dav_server::DavHandler;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

/// Default max concurrent requests.
const DEFAULT_CONCURRENCY_LIMIT: usize = 256;

async fn dav(State(handler): State<DavHandler>, req: Request) -> impl IntoResponse {
    handler.handle(req).await
}

/// Build the Axum router. Every method on every path goes to the WebDAV
/// handler, which strips the configured prefix itself.
pub fn build_router(handler: DavHandler) -> Router {
    Router::new()
        .fallback(dav)
        .with_state(handler)
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(DEFAULT_CONCURRENCY_LIMIT))
}
