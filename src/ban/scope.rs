//! Per-request accumulation of published nodes.
//!
//! A [`BanScope`] lives for one request cycle. Publish events merge their
//! nodes into it; the pre-response signal flushes it once, so several node
//! changes made by a single action result in one round of bans.

use std::collections::BTreeMap;
use std::time::Instant;

use metrics::histogram;
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::node::{Node, NodeId};

use super::dispatcher::BanDispatcher;
use super::error::BanError;
use super::events::{PublishEvent, RequestContext};

const METRIC_FLUSH_MS: &str = "cms_varnish_flush_ms";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeState {
    Idle,
    PendingBan,
}

/// Outcome of a flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlushSummary {
    pub scope_id: Uuid,
    /// Nodes banned.
    pub nodes: usize,
    /// Resolved entries sent, summed over every (node, locale) pair.
    pub bans: usize,
}

#[derive(Debug)]
pub struct BanScope {
    id: Uuid,
    state: ScopeState,
    pending: BTreeMap<NodeId, Node>,
}

impl BanScope {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ScopeState::Idle,
            pending: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_ids(&self) -> impl Iterator<Item = &str> {
        self.pending.keys().map(String::as_str)
    }

    /// Merge the saved and deleted nodes of a publish event.
    ///
    /// Returns false when the event is not a publish action.
    pub fn handle_publish(&mut self, event: PublishEvent) -> bool {
        if !event.is_publish() {
            debug!(scope_id = %self.id, action = %event.action, "Ignoring non-publish event");
            return false;
        }

        let deleted = event.deleted_nodes.unwrap_or_default();
        for node in event.nodes.into_iter().chain(deleted) {
            self.pending.insert(node.id.clone(), node);
        }

        if !self.pending.is_empty() {
            self.schedule_flush();
        }
        true
    }

    /// Mark the scope for flushing; calling it again changes nothing.
    pub fn schedule_flush(&mut self) {
        if self.state == ScopeState::Idle {
            debug!(scope_id = %self.id, "Ban flush scheduled");
        }
        self.state = ScopeState::PendingBan;
    }

    /// Ban every pending node in every locale, then return to idle.
    ///
    /// A flush while idle does nothing. On error the pending nodes are kept
    /// and the error is returned unchanged.
    #[instrument(skip_all, fields(scope_id = %self.id, base_url = %context.base_url))]
    pub async fn flush(
        &mut self,
        context: &RequestContext,
        dispatcher: &BanDispatcher,
        locales: &[String],
    ) -> Result<FlushSummary, BanError> {
        if self.state == ScopeState::Idle {
            return Ok(FlushSummary {
                scope_id: self.id,
                nodes: 0,
                bans: 0,
            });
        }

        let started_at = Instant::now();
        let mut bans = 0;
        for node in self.pending.values() {
            for locale in locales {
                let entries = dispatcher
                    .ban_node(node, &context.base_url, Some(locale), false)
                    .await?;
                bans += entries.len();
            }
        }

        let nodes = self.pending.len();
        self.pending.clear();
        self.state = ScopeState::Idle;

        histogram!(METRIC_FLUSH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        info!(nodes, bans, "Ban flush complete");

        Ok(FlushSummary {
            scope_id: self.id,
            nodes,
            bans,
        })
    }
}

impl Default for BanScope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::application::catalog::StaticCatalog;
    use crate::ban::dispatcher::testing::RecordingServer;
    use crate::ban::resolver::UrlResolver;
    use crate::domain::theme::Theme;

    type Log = Arc<Mutex<Vec<(String, String, bool)>>>;

    fn dispatcher(log: &Log) -> BanDispatcher {
        let catalog = StaticCatalog::new(["en", "nl"]).with_theme(Theme::new("default", ["content"]));
        BanDispatcher::new(UrlResolver::new(Arc::new(catalog)))
            .with_server(Arc::new(RecordingServer::new("varnish", log.clone())))
    }

    fn page(id: &str) -> Node {
        Node::new(id, "default")
            .with_route("en", format!("/en/{id}"))
            .with_route("nl", format!("/nl/{id}"))
    }

    fn locales() -> Vec<String> {
        vec!["en".to_string(), "nl".to_string()]
    }

    #[test]
    fn non_publish_events_are_ignored() {
        let mut scope = BanScope::new();
        let event = PublishEvent {
            action: "save".to_string(),
            nodes: vec![page("a")],
            deleted_nodes: None,
        };

        assert!(!scope.handle_publish(event));
        assert_eq!(scope.state(), ScopeState::Idle);
        assert_eq!(scope.pending_len(), 0);
    }

    #[test]
    fn republishing_collapses_by_identifier() {
        let mut scope = BanScope::new();
        scope.handle_publish(PublishEvent::publish(vec![page("a"), page("b")]));
        scope.handle_publish(PublishEvent::publish(vec![page("a")]).with_deleted(vec![page("c")]));

        assert_eq!(scope.state(), ScopeState::PendingBan);
        assert_eq!(scope.pending_ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_publish_does_not_schedule() {
        let mut scope = BanScope::new();
        assert!(scope.handle_publish(PublishEvent::publish(Vec::new())));
        assert_eq!(scope.state(), ScopeState::Idle);
    }

    #[test]
    fn schedule_flush_is_idempotent() {
        let mut scope = BanScope::new();
        scope.schedule_flush();
        scope.schedule_flush();
        assert_eq!(scope.state(), ScopeState::PendingBan);
    }

    #[tokio::test]
    async fn flush_bans_each_node_locale_pair_once() {
        let log = Log::default();
        let dispatcher = dispatcher(&log);
        let context = RequestContext::new("http://example.com");
        let mut scope = BanScope::new();

        scope.handle_publish(PublishEvent::publish(vec![page("a")]));
        scope.handle_publish(PublishEvent::publish(vec![page("b"), page("a")]));

        let summary = scope
            .flush(&context, &dispatcher, &locales())
            .await
            .expect("flush");

        assert_eq!(summary.nodes, 2);
        // node URL + query companion per (node, locale)
        assert_eq!(summary.bans, 8);
        let banned: Vec<String> = log
            .lock()
            .expect("ban log lock")
            .iter()
            .map(|(_, url, _)| url.clone())
            .collect();
        assert_eq!(
            banned,
            vec![
                "http://example.com/en/a",
                "http://example.com/en/a?",
                "http://example.com/nl/a",
                "http://example.com/nl/a?",
                "http://example.com/en/b",
                "http://example.com/en/b?",
                "http://example.com/nl/b",
                "http://example.com/nl/b?",
            ]
        );
        assert_eq!(scope.state(), ScopeState::Idle);
        assert_eq!(scope.pending_len(), 0);

        let second = scope
            .flush(&context, &dispatcher, &locales())
            .await
            .expect("second flush");
        assert_eq!(second.nodes, 0);
        assert_eq!(log.lock().expect("ban log lock").len(), 8);
    }

    #[tokio::test]
    async fn failed_flush_keeps_pending_nodes() {
        let log = Log::default();
        let catalog = StaticCatalog::new(["en"]);
        let dispatcher = BanDispatcher::new(UrlResolver::new(Arc::new(catalog))).with_server(
            Arc::new(RecordingServer::new("varnish", log.clone()).failing_on("http://example.com/en/a")),
        );
        let mut scope = BanScope::new();
        scope.handle_publish(PublishEvent::publish(vec![page("a")]));

        let result = scope
            .flush(
                &RequestContext::new("http://example.com"),
                &dispatcher,
                &["en".to_string()],
            )
            .await;

        assert!(result.is_err());
        assert_eq!(scope.state(), ScopeState::PendingBan);
        assert_eq!(scope.pending_len(), 1);
    }
}
