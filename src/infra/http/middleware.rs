use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{info, warn};

pub(super) async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();

    if status.is_client_error() || status.is_server_error() {
        warn!(
            %method,
            %uri,
            status = status.as_u16(),
            elapsed_ms,
            "request failed"
        );
    } else {
        info!(
            %method,
            %uri,
            status = status.as_u16(),
            elapsed_ms,
            "request completed"
        );
    }

    response
}
