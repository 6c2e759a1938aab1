//! Read-only content model queries used during URL resolution.

use std::sync::Arc;

use crate::domain::node::Node;
use crate::domain::theme::Theme;
use crate::domain::widget::{Widget, WidgetRegistry};

/// Locale, theme and widget lookups provided by the content model.
///
/// Lookups that miss return `None`; resolution treats them as contributing
/// nothing rather than failing.
pub trait ContentCatalog: Send + Sync {
    /// Every locale known to the CMS.
    fn locales(&self) -> Vec<String>;

    fn theme(&self, id: &str) -> Option<Theme>;

    fn widget(&self, widget_type: &str) -> Option<Arc<dyn Widget>>;

    /// Lookup of a stored node by identifier; catalogs without node storage
    /// return `None`.
    fn node(&self, _id: &str) -> Option<Node> {
        None
    }
}

/// Catalog assembled in memory, used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    locales: Vec<String>,
    themes: Vec<Theme>,
    widgets: WidgetRegistry,
    nodes: Vec<Node>,
}

impl StaticCatalog {
    pub fn new<I, S>(locales: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            locales: locales.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.themes.retain(|existing| existing.id != theme.id);
        self.themes.push(theme);
        self
    }

    pub fn with_widget(mut self, widget_type: impl Into<String>, widget: Arc<dyn Widget>) -> Self {
        self.widgets.register(widget_type, widget);
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }
}

impl ContentCatalog for StaticCatalog {
    fn locales(&self) -> Vec<String> {
        self.locales.clone()
    }

    fn theme(&self, id: &str) -> Option<Theme> {
        self.themes.iter().find(|theme| theme.id == id).cloned()
    }

    fn widget(&self, widget_type: &str) -> Option<Arc<dyn Widget>> {
        self.widgets.get(widget_type)
    }

    fn node(&self, id: &str) -> Option<Node> {
        self.nodes.iter().find_map(|node| node.find(id)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::widget::StaticRoutesWidget;

    #[test]
    fn static_catalog_lookups() {
        let catalog = StaticCatalog::new(["en", "nl"])
            .with_theme(Theme::new("default", ["content"]))
            .with_widget("list", Arc::new(StaticRoutesWidget::default()))
            .with_node(Node::site("site", "default").with_child(Node::new("about", "default")));

        assert_eq!(catalog.locales(), vec!["en", "nl"]);
        assert_eq!(
            catalog.theme("default").map(|t| t.regions),
            Some(vec!["content".to_string()])
        );
        assert!(catalog.theme("missing").is_none());
        assert!(catalog.widget("list").is_some());
        assert!(catalog.widget("missing").is_none());
        assert_eq!(catalog.node("about").map(|n| n.id), Some("about".to_string()));
    }

    #[test]
    fn replacing_a_theme_keeps_one_entry() {
        let catalog = StaticCatalog::new(["en"])
            .with_theme(Theme::new("default", ["a"]))
            .with_theme(Theme::new("default", ["b"]));

        assert_eq!(
            catalog.theme("default").map(|t| t.regions),
            Some(vec!["b".to_string()])
        );
    }
}
