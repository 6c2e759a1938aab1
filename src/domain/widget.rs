//! Widget implementations and the registry resolving them by type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::node::WidgetProperties;
use super::route::RouteTemplate;

/// A widget instance configured for one slot of one node in one locale.
///
/// The configuration decides which routes the widget exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetInstance {
    pub id: String,
    pub region: String,
    pub section: String,
    pub block: String,
    pub properties: WidgetProperties,
    pub locale: String,
}

impl WidgetInstance {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// A sub-route exposed by a widget below the node it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetRoute {
    pub id: String,
    pub path: RouteTemplate,
}

impl WidgetRoute {
    pub fn new(id: impl Into<String>, path: RouteTemplate) -> Self {
        Self {
            id: id.into(),
            path,
        }
    }
}

/// Widget implementation, looked up by type identifier.
pub trait Widget: Send + Sync {
    /// Routes exposed by the widget when configured as `instance`.
    fn routes(&self, instance: &WidgetInstance) -> Vec<WidgetRoute>;
}

/// Mapping from widget type identifier to its implementation.
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    widgets: HashMap<String, Arc<dyn Widget>>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, widget_type: impl Into<String>, widget: Arc<dyn Widget>) {
        self.widgets.insert(widget_type.into(), widget);
    }

    pub fn with(mut self, widget_type: impl Into<String>, widget: Arc<dyn Widget>) -> Self {
        self.register(widget_type, widget);
        self
    }

    /// Returns `None` for unknown types; callers skip those bindings.
    pub fn get(&self, widget_type: &str) -> Option<Arc<dyn Widget>> {
        self.widgets.get(widget_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

impl fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.widgets.keys().collect();
        types.sort();
        f.debug_struct("WidgetRegistry")
            .field("types", &types)
            .finish()
    }
}

/// Widget exposing a fixed set of routes.
///
/// With `enabled_by` set, the routes are only exposed when the instance has
/// that property set to a truthy value (`1`, `true`, `yes`, `on`).
#[derive(Debug, Clone, Default)]
pub struct StaticRoutesWidget {
    routes: Vec<RouteTemplate>,
    enabled_by: Option<String>,
}

impl StaticRoutesWidget {
    pub fn new(routes: Vec<RouteTemplate>) -> Self {
        Self {
            routes,
            enabled_by: None,
        }
    }

    pub fn enabled_by(mut self, property: impl Into<String>) -> Self {
        self.enabled_by = Some(property.into());
        self
    }

    fn is_enabled(&self, instance: &WidgetInstance) -> bool {
        let Some(property) = self.enabled_by.as_deref() else {
            return true;
        };

        matches!(
            instance
                .property(property)
                .map(|value| value.trim().to_ascii_lowercase())
                .as_deref(),
            Some("1" | "true" | "yes" | "on")
        )
    }
}

impl Widget for StaticRoutesWidget {
    fn routes(&self, instance: &WidgetInstance) -> Vec<WidgetRoute> {
        if !self.is_enabled(instance) {
            return Vec::new();
        }

        self.routes
            .iter()
            .enumerate()
            .map(|(index, path)| WidgetRoute::new(format!("{}.{index}", instance.id), path.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(properties: &[(&str, &str)]) -> WidgetInstance {
        WidgetInstance {
            id: "w1".to_string(),
            region: "content".to_string(),
            section: "s1".to_string(),
            block: "b1".to_string(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            locale: "en".to_string(),
        }
    }

    fn template(raw: &str) -> RouteTemplate {
        RouteTemplate::parse(raw).expect("valid template")
    }

    #[test]
    fn registry_returns_none_for_unknown_type() {
        let registry = WidgetRegistry::new().with(
            "list",
            Arc::new(StaticRoutesWidget::new(vec![template("/%id%")])),
        );

        assert!(registry.get("list").is_some());
        assert!(registry.get("removed").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn static_widget_exposes_routes() {
        let widget = StaticRoutesWidget::new(vec![template("/%slug%"), template("/page/%page%")]);
        let routes = widget.routes(&instance(&[]));

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].id, "w1.0");
        assert_eq!(routes[1].path.wildcard_path(), "/page/*");
    }

    #[test]
    fn gated_widget_follows_instance_properties() {
        let widget = StaticRoutesWidget::new(vec![template("/%slug%")]).enabled_by("detail");

        assert!(widget.routes(&instance(&[])).is_empty());
        assert!(widget.routes(&instance(&[("detail", "0")])).is_empty());
        assert_eq!(widget.routes(&instance(&[("detail", "True")])).len(), 1);
    }
}
