//! Service resource endpoint.

use super::request_context;
use crate::resources::dispatch;
use crate::router::LtiState;
use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, Method},
    response::Response,
};

/// `ANY /services/*path`, dispatched to the resource whose template matches.
pub async fn services_handler(
    State(state): State<LtiState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = request_context(&state, &method, &uri, &headers, &body);
    let request_uri = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());

    let response = dispatch(&state, &ctx, &path, &body).await;
    tracing::debug!(status = response.code(), path = %path, "Service call answered");
    response.into_http(&ctx, &request_uri)
}
