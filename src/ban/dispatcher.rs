//! Fan-out of bans to the registered cache servers.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, instrument, warn};

use crate::domain::node::Node;

use super::entry::BanSet;
use super::error::BanError;
use super::resolver::UrlResolver;

const METRIC_BAN_TOTAL: &str = "cms_varnish_ban_total";

/// A cache server accepting ban commands.
#[async_trait]
pub trait BanServer: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    async fn ban_url(&self, url: &str, recursive: bool) -> Result<(), BanError>;

    async fn ban_urls(&self, urls: &[String], recursive: bool) -> Result<(), BanError> {
        for url in urls {
            self.ban_url(url, recursive).await?;
        }
        Ok(())
    }
}

/// Sends every ban to all registered servers, in registration order.
///
/// Calls are sequential and failures are not caught: the first error aborts
/// the remaining calls and is returned to the caller.
#[derive(Clone)]
pub struct BanDispatcher {
    resolver: UrlResolver,
    servers: Vec<Arc<dyn BanServer>>,
}

impl BanDispatcher {
    pub fn new(resolver: UrlResolver) -> Self {
        Self {
            resolver,
            servers: Vec::new(),
        }
    }

    pub fn add_server(&mut self, server: Arc<dyn BanServer>) {
        debug!(server = server.name(), "Cache server registered");
        self.servers.push(server);
    }

    pub fn with_server(mut self, server: Arc<dyn BanServer>) -> Self {
        self.add_server(server);
        self
    }

    pub fn servers(&self) -> &[Arc<dyn BanServer>] {
        &self.servers
    }

    pub fn resolver(&self) -> &UrlResolver {
        &self.resolver
    }

    #[instrument(skip(self))]
    pub async fn ban_url(&self, url: &str, recursive: bool) -> Result<(), BanError> {
        for server in &self.servers {
            let result = server.ban_url(url, recursive).await;
            record_outcome(server.name(), &result);
            result?;
        }
        Ok(())
    }

    #[instrument(skip(self, urls), fields(count = urls.len()))]
    pub async fn ban_urls(&self, urls: &[String], recursive: bool) -> Result<(), BanError> {
        for server in &self.servers {
            let result = server.ban_urls(urls, recursive).await;
            record_outcome(server.name(), &result);
            result?;
        }
        Ok(())
    }

    /// Resolve `node` and ban every resulting URL on every server.
    ///
    /// Returns the resolved entries.
    #[instrument(skip(self, node), fields(node_id = %node.id))]
    pub async fn ban_node(
        &self,
        node: &Node,
        base_url: &str,
        locale: Option<&str>,
        recursive: bool,
    ) -> Result<BanSet, BanError> {
        let bans = self.resolver.resolve(node, base_url, locale, recursive);
        debug!(entries = bans.len(), "Resolved node bans");

        for (url, recursive) in bans.iter() {
            self.ban_url(url, recursive).await?;
        }

        Ok(bans)
    }
}

fn record_outcome(server: &str, result: &Result<(), BanError>) {
    match result {
        Ok(()) => counter!(METRIC_BAN_TOTAL, "outcome" => "ok").increment(1),
        Err(err) => {
            warn!(server, error = %err, "Ban failed");
            counter!(METRIC_BAN_TOTAL, "outcome" => "error").increment(1);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Server recording every ban into a shared log as `(server, url, recursive)`.
    pub(crate) struct RecordingServer {
        name: String,
        log: Arc<Mutex<Vec<(String, String, bool)>>>,
        fail_on: Option<String>,
    }

    impl RecordingServer {
        pub(crate) fn new(name: &str, log: Arc<Mutex<Vec<(String, String, bool)>>>) -> Self {
            Self {
                name: name.to_string(),
                log,
                fail_on: None,
            }
        }

        pub(crate) fn failing_on(mut self, url: &str) -> Self {
            self.fail_on = Some(url.to_string());
            self
        }
    }

    #[async_trait]
    impl BanServer for RecordingServer {
        fn name(&self) -> &str {
            &self.name
        }

        async fn ban_url(&self, url: &str, recursive: bool) -> Result<(), BanError> {
            if self.fail_on.as_deref() == Some(url) {
                return Err(BanError::rejected(&self.name, url, 500));
            }
            self.log
                .lock()
                .expect("ban log lock")
                .push((self.name.clone(), url.to_string(), recursive));
            Ok(())
        }
    }
}
