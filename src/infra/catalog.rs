//! Content catalog backed by a TOML site definition.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::application::catalog::ContentCatalog;
use crate::domain::error::DomainError;
use crate::domain::node::Node;
use crate::domain::route::RouteTemplate;
use crate::domain::theme::Theme;
use crate::domain::widget::{StaticRoutesWidget, Widget, WidgetRegistry};

use super::error::InfraError;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct SiteDefinition {
    locales: Vec<String>,
    themes: BTreeMap<String, ThemeDefinition>,
    widgets: BTreeMap<String, WidgetDefinition>,
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct ThemeDefinition {
    regions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct WidgetDefinition {
    routes: Vec<RouteTemplate>,
    enabled_by: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FileCatalog {
    locales: Vec<String>,
    themes: BTreeMap<String, Theme>,
    widgets: WidgetRegistry,
    nodes: Vec<Node>,
}

impl FileCatalog {
    pub async fn load(path: &Path) -> Result<Self, InfraError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_toml(&raw).map_err(|err| match err {
            InfraError::Catalog { message, .. } => InfraError::catalog(path, message),
            other => other,
        })?;

        info!(
            path = %path.display(),
            locales = catalog.locales.len(),
            themes = catalog.themes.len(),
            widgets = catalog.widgets.len(),
            "Site definition loaded"
        );
        Ok(catalog)
    }

    pub fn from_toml(raw: &str) -> Result<Self, InfraError> {
        let definition: SiteDefinition =
            toml::from_str(raw).map_err(|err| InfraError::catalog("<inline>", err.to_string()))?;
        Self::from_definition(definition).map_err(InfraError::from)
    }

    fn from_definition(definition: SiteDefinition) -> Result<Self, DomainError> {
        let mut seen = HashSet::new();
        let mut duplicate = None;
        for root in &definition.nodes {
            root.walk(&mut |node| {
                if !seen.insert(node.id.clone()) && duplicate.is_none() {
                    duplicate = Some(node.id.clone());
                }
            });
        }
        if let Some(id) = duplicate {
            return Err(DomainError::duplicate_node(id));
        }

        for root in &definition.nodes {
            root.validate_routes()?;
        }

        let themes = definition
            .themes
            .into_iter()
            .map(|(id, theme)| (id.clone(), Theme::new(id, theme.regions)))
            .collect();

        let mut widgets = WidgetRegistry::new();
        for (widget_type, widget) in definition.widgets {
            let mut implementation = StaticRoutesWidget::new(widget.routes);
            if let Some(property) = widget.enabled_by {
                implementation = implementation.enabled_by(property);
            }
            widgets.register(widget_type, Arc::new(implementation));
        }

        Ok(Self {
            locales: definition.locales,
            themes,
            widgets,
            nodes: definition.nodes,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

impl ContentCatalog for FileCatalog {
    fn locales(&self) -> Vec<String> {
        self.locales.clone()
    }

    fn theme(&self, id: &str) -> Option<Theme> {
        self.themes.get(id).cloned()
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
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const SITE: &str = r#"
locales = ["en", "nl"]

[themes.default]
regions = ["header", "content"]

[widgets.news-list]
routes = ["/%slug%", "/page/%page%"]
enabled_by = "detail"

[widgets.text]

[[nodes]]
id = "site"
kind = "site"
theme = "default"
routes = { en = "/en", nl = "/nl" }

[[nodes.children]]
id = "news"
theme = "default"
routes = { en = "/en/news" }

[[nodes.children.regions.content]]
id = "s1"

[[nodes.children.regions.content.blocks.main]]
id = "w1"
widget = "news-list"
properties = { detail = "1" }
"#;

    #[test]
    fn parses_site_definition() {
        let catalog = FileCatalog::from_toml(SITE).expect("valid site");

        assert_eq!(catalog.locales(), vec!["en", "nl"]);
        assert_eq!(
            catalog.theme("default").map(|t| t.regions),
            Some(vec!["header".to_string(), "content".to_string()])
        );
        assert!(catalog.widget("text").is_some());

        let news = catalog.node("news").expect("news node");
        assert_eq!(news.sections("content").len(), 1);
        assert_eq!(news.sections("content")[0].blocks["main"][0].widget, "news-list");
        assert!(catalog.node("site").expect("site").is_site());
    }

    #[test]
    fn gated_widget_uses_instance_properties() {
        use crate::domain::widget::WidgetInstance;

        let catalog = FileCatalog::from_toml(SITE).expect("valid site");
        let widget = catalog.widget("news-list").expect("widget");
        let mut instance = WidgetInstance {
            id: "w1".to_string(),
            region: "content".to_string(),
            section: "s1".to_string(),
            block: "main".to_string(),
            properties: BTreeMap::new(),
            locale: "en".to_string(),
        };

        assert!(widget.routes(&instance).is_empty());
        instance
            .properties
            .insert("detail".to_string(), "1".to_string());
        assert_eq!(widget.routes(&instance).len(), 2);
    }

    #[test]
    fn rejects_relative_widget_routes() {
        let err = FileCatalog::from_toml("[widgets.list]\nroutes = [\"detail\"]\n")
            .expect_err("relative route");
        assert!(matches!(err, InfraError::Catalog { .. }));
    }

    #[test]
    fn rejects_relative_node_routes() {
        let err = FileCatalog::from_toml(
            "[[nodes]]\nid = \"a\"\ntheme = \"default\"\nroutes = { en = \"en\" }\n",
        )
        .expect_err("relative node route");
        assert!(matches!(
            err,
            InfraError::SiteDefinition(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_node_ids() {
        let raw = r#"
[[nodes]]
id = "a"
theme = "default"

[[nodes.children]]
id = "a"
theme = "default"
"#;
        let err = FileCatalog::from_toml(raw).expect_err("duplicate ids");
        assert!(matches!(
            err,
            InfraError::SiteDefinition(DomainError::DuplicateNode { .. })
        ));
    }

    #[tokio::test]
    async fn loads_from_file() {
        let mut file = NamedTempFile::new().expect("tmp file");
        file.write_all(SITE.as_bytes()).expect("write site");

        let catalog = FileCatalog::load(file.path()).await.expect("load site");
        assert_eq!(catalog.nodes().len(), 1);
    }

    #[tokio::test]
    async fn parse_errors_name_the_file() {
        let mut file = NamedTempFile::new().expect("tmp file");
        file.write_all(b"locales = 3").expect("write site");

        let err = FileCatalog::load(file.path()).await.expect_err("invalid site");
        match err {
            InfraError::Catalog { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
