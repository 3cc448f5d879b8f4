//! Request routing for the collection endpoint

use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Path accepting collection submissions
pub const COLLECTION_PATH: &str = "/collection";

/// Body returned for every accepted submission
pub const COLLECTION_RESPONSE: &str = "YEAH I'M IN";

/// Build the application router
///
/// Only `POST /collection` is served; other paths get 404 and other
/// methods on the collection path get 405.
pub fn router() -> Router {
    Router::new()
        .route(COLLECTION_PATH, post(collection))
        .layer(TraceLayer::new_for_http())
}

async fn collection() -> &'static str {
    tracing::debug!("Collection submission accepted");
    COLLECTION_RESPONSE
}
