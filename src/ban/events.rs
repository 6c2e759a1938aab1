//! Inbound CMS notifications.

use serde::{Deserialize, Serialize};

use crate::domain::node::Node;

/// Action name of the lifecycle event that triggers bans.
pub const PUBLISH_ACTION: &str = "publish";

/// Lifecycle notification carrying saved and deleted nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishEvent {
    pub action: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub deleted_nodes: Option<Vec<Node>>,
}

impl PublishEvent {
    pub fn publish(nodes: Vec<Node>) -> Self {
        Self {
            action: PUBLISH_ACTION.to_string(),
            nodes,
            deleted_nodes: None,
        }
    }

    pub fn with_deleted(mut self, nodes: Vec<Node>) -> Self {
        self.deleted_nodes = Some(nodes);
        self
    }

    pub fn is_publish(&self) -> bool {
        self.action == PUBLISH_ACTION
    }
}

/// Context handed over with the pre-response signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub base_url: String,
}

impl RequestContext {
    /// Trailing slashes are dropped so node paths can be appended as-is.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}
