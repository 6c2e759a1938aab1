//! HTTP client for Varnish servers accepting `BAN` requests.
//!
//! Each ban is one request to the server endpoint. The banned URL travels in
//! two headers the VCL turns into a ban expression:
//!
//! - `x-ban-host`: host (and explicit port) of the banned URL, absent for
//!   relative URLs,
//! - `x-ban-url`: anchored regular expression over path and query.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use tracing::debug;

use crate::ban::{BanError, BanServer};
use crate::config::VarnishSettings;
use crate::domain::route::WILDCARD_SEGMENT;

use super::error::InfraError;

pub const BAN_HOST_HEADER: &str = "x-ban-host";
pub const BAN_URL_HEADER: &str = "x-ban-url";

/// Regex replacing a wildcard segment in ban expressions.
const WILDCARD_PATTERN: &str = "[^/]*";

#[derive(Debug, Clone)]
pub struct HttpBanServer {
    name: String,
    endpoint: Url,
    method: Method,
    client: Client,
}

impl HttpBanServer {
    pub fn new(endpoint: Url, method: &str, timeout: Duration) -> Result<Self, InfraError> {
        let method = Method::from_bytes(method.as_bytes()).map_err(|err| {
            InfraError::configuration(format!("invalid ban method `{method}`: {err}"))
        })?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;

        Ok(Self {
            name: endpoint.as_str().trim_end_matches('/').to_string(),
            endpoint,
            method,
            client,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("cms-varnish/", env!("CARGO_PKG_VERSION"))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl BanServer for HttpBanServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ban_url(&self, url: &str, recursive: bool) -> Result<(), BanError> {
        let (host, path) = ban_target(url)?;
        let expression = ban_expression(&path, recursive);
        debug!(server = %self.name, url, host = ?host, expression = %expression, "Sending ban");

        let mut request = self
            .client
            .request(self.method.clone(), self.endpoint.clone())
            .header(BAN_URL_HEADER, expression);
        if let Some(host) = host {
            request = request.header(BAN_HOST_HEADER, host);
        }

        let response = request
            .send()
            .await
            .map_err(|err| BanError::transport(&self.name, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BanError::rejected(&self.name, url, status.as_u16()));
        }
        Ok(())
    }
}

/// Build one client per configured server, in configuration order.
pub fn build_servers(settings: &VarnishSettings) -> Result<Vec<Arc<dyn BanServer>>, InfraError> {
    settings
        .servers
        .iter()
        .map(|endpoint| {
            HttpBanServer::new(endpoint.clone(), &settings.method, settings.timeout)
                .map(|server| Arc::new(server) as Arc<dyn BanServer>)
        })
        .collect()
}

/// Split a banned URL into host header value and path with query.
///
/// Absolute-path URLs are used as the path unchanged. Anything else without
/// a host cannot match a request and is rejected.
pub fn ban_target(url: &str) -> Result<(Option<String>, String), BanError> {
    if url.starts_with('/') {
        return Ok((None, url.to_string()));
    }
    let parsed = Url::parse(url).map_err(|err| BanError::invalid_request(url, err.to_string()))?;
    let Some(host) = parsed.host_str() else {
        return Err(BanError::invalid_request(url, "URL has no host"));
    };

    let host = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut path = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }

    Ok((Some(host), path))
}

/// Anchored regex for `path`: exact unless `recursive`, in which case it is
/// a prefix match. A path segment consisting of `*` alone matches any one
/// segment; every other character, the query included, matches literally.
pub fn ban_expression(path: &str, recursive: bool) -> String {
    let (path, query) = match path.find('?') {
        Some(index) => path.split_at(index),
        None => (path, ""),
    };

    let mut pattern = path
        .split('/')
        .map(|segment| {
            if segment == WILDCARD_SEGMENT {
                WILDCARD_PATTERN.to_string()
            } else {
                regex::escape(segment)
            }
        })
        .collect::<Vec<_>>()
        .join("/");
    pattern.push_str(&regex::escape(query));

    if recursive {
        format!("^{pattern}")
    } else {
        format!("^{pattern}$")
    }
}
