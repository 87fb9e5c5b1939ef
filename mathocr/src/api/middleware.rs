//! Request gating that runs before the handlers.
//!
//! - [`rate_limit_middleware`] counts the request against the client's
//!   sliding windows and answers 429 once any of them is full.
//! - [`payload_too_large_as_json`] rewrites the body-limit layer's plain 413
//!   into the service's JSON error shape.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    RequestExt,
};
use tracing::warn;

use crate::api::state::AppState;
use crate::error::OcrApiError;

/// Key used when the peer address is unknown.
const FALLBACK_CLIENT: &str = "127.0.0.1";

/// Peer IP from `ConnectInfo`, which also honours `MockConnectInfo`.
async fn client_address(request: &mut Request<Body>) -> String {
    match request.extract_parts::<ConnectInfo<SocketAddr>>().await {
        Ok(ConnectInfo(addr)) => addr.ip().to_string(),
        Err(_) => FALLBACK_CLIENT.to_string(),
    }
}

fn whole_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_address(&mut request).await;
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string());

    match state.limiter.check(&client, route.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(exceeded) => {
            warn!(
                client = %client,
                route = route.as_deref().unwrap_or("-"),
                limit = %exceeded.limit,
                "Rate limit exceeded"
            );
            OcrApiError::RateLimited {
                limit: exceeded.limit.to_string(),
                retry_after_secs: whole_seconds(exceeded.retry_after),
            }
            .into_response()
        }
    }
}

pub async fn payload_too_large_as_json(response: Response) -> Response {
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        OcrApiError::PayloadTooLarge.into_response()
    } else {
        response
    }
}
