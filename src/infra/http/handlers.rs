use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use metrics::counter;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::ban::{BanScope, FlushSummary, PublishEvent, RequestContext};

use super::HttpState;
use super::error::ApiError;

/// A batch of lifecycle events produced by one CMS action.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub base_url: Option<String>,
    pub events: Vec<PublishEvent>,
}

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    pub url: String,
    #[serde(default)]
    pub recursive: bool,
}

pub(super) async fn health() -> &'static str {
    "ok"
}

/// One request cycle: collect the nodes of every event into a fresh scope,
/// then flush it before responding.
pub(super) async fn publish_events(
    State(state): State<HttpState>,
    Json(request): Json<PublishRequest>,
) -> Result<Json<FlushSummary>, ApiError> {
    let base_url = match request.base_url {
        Some(base_url) => parse_base_url(&base_url)?,
        None => state.default_base_url.clone().ok_or_else(|| {
            ApiError::bad_request(
                "Base URL required",
                Some("set `base_url` in the request or `site.base_url` in configuration".into()),
            )
        })?,
    };
    let context = RequestContext::new(base_url);

    for event in &request.events {
        let deleted = event.deleted_nodes.iter().flatten();
        for node in event.nodes.iter().chain(deleted) {
            node.validate_routes()?;
        }
    }

    let mut scope = BanScope::new();
    for event in request.events {
        counter!("cms_varnish_publish_events_total").increment(1);
        scope.handle_publish(event);
    }
    debug!(scope_id = %scope.id(), pending = scope.pending_len(), "Publish events collected");

    let locales = state.dispatcher.resolver().catalog().locales();
    let summary = scope.flush(&context, &state.dispatcher, &locales).await?;
    Ok(Json(summary))
}

/// Only absolute http(s) URLs with a host are accepted as base URLs.
fn parse_base_url(raw: &str) -> Result<String, ApiError> {
    let invalid = |hint: String| ApiError::bad_request("Invalid base URL", Some(hint));
    let parsed = Url::parse(raw.trim()).map_err(|err| invalid(format!("`{raw}`: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid(format!("`{raw}` must be an absolute http(s) URL")));
    }
    Ok(raw.trim().to_string())
}

pub(super) async fn ban_url(
    State(state): State<HttpState>,
    Json(request): Json<BanRequest>,
) -> Result<StatusCode, ApiError> {
    if request.url.trim().is_empty() {
        return Err(ApiError::bad_request("URL required", None));
    }

    state
        .dispatcher
        .ban_url(&request.url, request.recursive)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
