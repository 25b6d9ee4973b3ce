//! Content routes
//!
//! One route: `GET /<key>` resolves the full request path (leading slash
//! included) through the layered reader and answers with the content and its
//! mimetype, or 404 when the key is absent in both layers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::observability::Logger;
use crate::overlay::LayeredReader;

/// Shared read-only state for the content handlers.
pub struct ContentState {
    pub reader: LayeredReader,
}

impl ContentState {
    pub fn new(reader: LayeredReader) -> Self {
        Self { reader }
    }
}

/// Builds the content router over the given state.
pub fn content_routes(state: Arc<ContentState>) -> Router {
    Router::new()
        .route("/*key", get(get_resource))
        .with_state(state)
}

async fn get_resource(
    State(state): State<Arc<ContentState>>,
    Path(path): Path<String>,
) -> Response {
    // Stored keys are URL-like paths with a leading slash; the wildcard
    // capture strips it, so put it back to form the canonical key.
    let key = format!("/{}", path);

    match state.reader.resolve(key.as_bytes()) {
        Ok(Some(resolved)) => {
            let mimetype = resolved.mimetype_or_default().to_string();
            ([(header::CONTENT_TYPE, mimetype)], resolved.content).into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "key not found").into_response(),
        Err(e) => {
            Logger::error(
                "resolve_failed",
                &[("key", key.as_str()), ("error", &e.to_string())],
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "store read failed").into_response()
        }
    }
}
