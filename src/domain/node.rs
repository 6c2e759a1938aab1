//! Content nodes of the CMS page hierarchy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Identifier of a content node.
pub type NodeId = String;

/// Widget instance properties as stored on the node.
pub type WidgetProperties = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Page,
    /// Topmost node of a site; always banned recursively.
    Site,
}

/// A widget instance bound to a block of a node section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetBinding {
    /// Instance identifier, unique within the node.
    pub id: String,
    /// Type identifier used to look up the widget implementation.
    pub widget: String,
    #[serde(default)]
    pub properties: WidgetProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub layout: Option<String>,
    /// Block identifier to the widgets bound in that block.
    #[serde(default)]
    pub blocks: BTreeMap<String, Vec<WidgetBinding>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub kind: NodeKind,
    pub theme: String,
    /// Locale code to the node path within the site.
    #[serde(default)]
    pub routes: BTreeMap<String, String>,
    /// Region identifier to the sections laid out in that region.
    #[serde(default)]
    pub regions: BTreeMap<String, Vec<Section>>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, theme: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Page,
            theme: theme.into(),
            routes: BTreeMap::new(),
            regions: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn site(id: impl Into<NodeId>, theme: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Site,
            ..Self::new(id, theme)
        }
    }

    pub fn with_route(mut self, locale: impl Into<String>, path: impl Into<String>) -> Self {
        self.routes.insert(locale.into(), path.into());
        self
    }

    pub fn with_section(mut self, region: impl Into<String>, section: Section) -> Self {
        self.regions.entry(region.into()).or_default().push(section);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_site(&self) -> bool {
        self.kind == NodeKind::Site
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Full URL of the node in `locale`, if the node is available there.
    pub fn url(&self, locale: &str, base_url: &str) -> Option<String> {
        self.routes
            .get(locale)
            .map(|path| format!("{base_url}{path}"))
    }

    /// Full URLs of the node for every locale it is available in.
    pub fn urls(&self, base_url: &str) -> BTreeMap<String, String> {
        self.routes
            .iter()
            .map(|(locale, path)| (locale.clone(), format!("{base_url}{path}")))
            .collect()
    }

    /// Sections laid out in `region`; empty when the node does not use it.
    pub fn sections(&self, region: &str) -> &[Section] {
        self.regions.get(region).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Depth-first lookup of this node or one of its descendants.
    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Check that every route of this node and its descendants is an
    /// absolute path.
    pub fn validate_routes(&self) -> Result<(), DomainError> {
        for (locale, path) in &self.routes {
            if !path.starts_with('/') {
                return Err(DomainError::validation(format!(
                    "route `{path}` of node `{}` in locale `{locale}` must start with `/`",
                    self.id
                )));
            }
        }
        self.children.iter().try_for_each(Node::validate_routes)
    }

    /// Visit this node and all descendants, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

impl Section {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            layout: None,
            blocks: BTreeMap::new(),
        }
    }

    pub fn with_widget(mut self, block: impl Into<String>, binding: WidgetBinding) -> Self {
        self.blocks.entry(block.into()).or_default().push(binding);
        self
    }
}

impl WidgetBinding {
    pub fn new(id: impl Into<String>, widget: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            widget: widget.into(),
            properties: WidgetProperties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}
