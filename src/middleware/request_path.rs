use axum::{extract::Request, middleware::Next, response::{IntoResponse, Response}};

use crate::error::ErrorEnvelope;

/// Fills the `path` of error envelopes with the URI the client requested.
pub async fn attach_request_path(request: Request, next: Next) -> Response {
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let mut response = next.run(request).await;
    match response.extensions_mut().remove::<ErrorEnvelope>() {
        Some(envelope) => envelope.with_path(&path).into_response(),
        None => response,
    }
}
