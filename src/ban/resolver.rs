//! URL resolution for node bans.
//!
//! Turns a node into every URL a cache server may hold for it: the node URL
//! per locale, the dynamic sub-routes exposed by its widgets, and, for
//! recursive bans, the same for all descendants.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::application::catalog::ContentCatalog;
use crate::domain::node::Node;
use crate::domain::widget::WidgetInstance;

use super::entry::BanSet;

#[derive(Clone)]
pub struct UrlResolver {
    catalog: Arc<dyn ContentCatalog>,
}

impl UrlResolver {
    pub fn new(catalog: Arc<dyn ContentCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<dyn ContentCatalog> {
        &self.catalog
    }

    /// Resolve the ban entries for `node`.
    ///
    /// Without a locale every locale the node is routed in is resolved. Site
    /// nodes are always banned recursively and never descend into children:
    /// their own prefix ban already covers the subtree.
    pub fn resolve(
        &self,
        node: &Node,
        base_url: &str,
        locale: Option<&str>,
        recursive: bool,
    ) -> BanSet {
        let mut result = BanSet::new();
        self.collect(node, base_url, locale, recursive, &mut result);
        result
    }

    fn collect(
        &self,
        node: &Node,
        base_url: &str,
        locale: Option<&str>,
        recursive: bool,
        result: &mut BanSet,
    ) {
        let recursive = recursive || node.is_site();

        let urls = match locale {
            None => {
                let node_urls = node.urls(base_url);
                let mut urls: Vec<String> = node_urls.values().cloned().collect();
                for (locale, node_url) in &node_urls {
                    self.widget_urls(&mut urls, node, locale, node_url);
                }
                urls
            }
            Some(locale) => match node.url(locale, base_url) {
                Some(node_url) => {
                    let mut urls = vec![node_url.clone()];
                    self.widget_urls(&mut urls, node, locale, &node_url);
                    urls
                }
                None => {
                    trace!(node_id = %node.id, locale, "Node has no route for locale");
                    Vec::new()
                }
            },
        };

        for url in &urls {
            result.insert_with_query_variants(url, recursive);
        }

        if !recursive || node.is_site() {
            return;
        }

        for child in &node.children {
            self.collect(child, base_url, locale, true, result);
        }
    }

    /// Append `node_url` + wildcard path for every route exposed by the
    /// widgets bound to `node` in `locale`.
    pub fn widget_urls(&self, urls: &mut Vec<String>, node: &Node, locale: &str, node_url: &str) {
        let Some(theme) = self.catalog.theme(&node.theme) else {
            debug!(node_id = %node.id, theme = %node.theme, "Theme not found, skipping widget routes");
            return;
        };

        for region in &theme.regions {
            for section in node.sections(region) {
                for (block, bindings) in &section.blocks {
                    for binding in bindings {
                        let Some(widget) = self.catalog.widget(&binding.widget) else {
                            debug!(
                                node_id = %node.id,
                                widget_id = %binding.id,
                                widget_type = %binding.widget,
                                "Widget type not registered, skipping"
                            );
                            continue;
                        };

                        let instance = WidgetInstance {
                            id: binding.id.clone(),
                            region: region.clone(),
                            section: section.id.clone(),
                            block: block.clone(),
                            properties: binding.properties.clone(),
                            locale: locale.to_string(),
                        };

                        for route in widget.routes(&instance) {
                            urls.push(format!("{node_url}{}", route.path.wildcard_path()));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::catalog::StaticCatalog;
    use crate::domain::node::{Section, WidgetBinding};
    use crate::domain::route::RouteTemplate;
    use crate::domain::theme::Theme;
    use crate::domain::widget::StaticRoutesWidget;

    const BASE: &str = "http://example.com";

    fn template(raw: &str) -> RouteTemplate {
        RouteTemplate::parse(raw).expect("valid template")
    }

    fn resolver() -> UrlResolver {
        let catalog = StaticCatalog::new(["en", "nl"])
            .with_theme(Theme::new("default", ["header", "content"]))
            .with_widget(
                "detail-list",
                Arc::new(StaticRoutesWidget::new(vec![template("/foo/%id%/bar")])),
            )
            .with_widget("text", Arc::new(StaticRoutesWidget::default()));
        UrlResolver::new(Arc::new(catalog))
    }

    fn page(id: &str) -> Node {
        Node::new(id, "default")
            .with_route("en", format!("/en/{id}"))
            .with_route("nl", format!("/nl/{id}"))
    }

    #[test]
    fn non_recursive_node_yields_url_and_query_companion() {
        let bans = resolver().resolve(&page("about"), BASE, Some("en"), false);

        assert_eq!(bans.len(), 2);
        assert_eq!(bans.get("http://example.com/en/about"), Some(false));
        assert_eq!(bans.get("http://example.com/en/about?"), Some(true));
    }

    #[test]
    fn non_recursive_node_does_not_descend() {
        let node = page("news").with_child(page("item"));
        let bans = resolver().resolve(&node, BASE, Some("en"), false);

        assert!(!bans.contains("http://example.com/en/item"));
    }

    #[test]
    fn recursive_node_descends_into_children() {
        let node = page("news").with_child(page("item").with_child(page("deep")));
        let bans = resolver().resolve(&node, BASE, Some("en"), true);

        assert_eq!(bans.get("http://example.com/en/news"), Some(true));
        assert_eq!(bans.get("http://example.com/en/item"), Some(true));
        assert_eq!(bans.get("http://example.com/en/deep"), Some(true));
        assert!(!bans.contains("http://example.com/en/news?"));
        assert_eq!(bans.len(), 3);
    }

    #[test]
    fn site_node_forces_recursive_and_stops() {
        let site = Node::site("site", "default")
            .with_route("en", "/en")
            .with_child(page("about"));
        let bans = resolver().resolve(&site, BASE, Some("en"), false);

        assert_eq!(bans.len(), 1);
        assert_eq!(bans.get("http://example.com/en"), Some(true));
        assert!(!bans.contains("http://example.com/en/about"));
    }

    #[test]
    fn omitted_locale_is_union_of_every_locale() {
        let resolver = resolver();
        let node = page("news")
            .with_section(
                "content",
                Section::new("s1").with_widget("b1", WidgetBinding::new("w1", "detail-list")),
            )
            .with_child(page("item"));

        let all = resolver.resolve(&node, BASE, None, true);

        let mut union = resolver.resolve(&node, BASE, Some("en"), true);
        union.merge(resolver.resolve(&node, BASE, Some("nl"), true));

        assert_eq!(all, union);
        assert!(all.contains("http://example.com/nl/news/foo/*/bar"));
        assert!(all.contains("http://example.com/en/item"));
    }

    #[test]
    fn widget_route_placeholders_become_wildcards() {
        let node = page("news").with_section(
            "content",
            Section::new("s1").with_widget("b1", WidgetBinding::new("w1", "detail-list")),
        );
        let bans = resolver().resolve(&node, BASE, Some("en"), false);

        assert_eq!(bans.get("http://example.com/en/news/foo/*/bar"), Some(false));
        assert_eq!(bans.get("http://example.com/en/news/foo/*/bar?"), Some(true));
        assert_eq!(bans.len(), 4);
    }

    #[test]
    fn widgets_without_routes_or_type_contribute_nothing() {
        let node = page("news").with_section(
            "content",
            Section::new("s1")
                .with_widget("b1", WidgetBinding::new("w1", "text"))
                .with_widget("b2", WidgetBinding::new("w2", "removed-widget")),
        );

        let mut urls = Vec::new();
        resolver().widget_urls(&mut urls, &node, "en", "http://example.com/en/news");
        assert!(urls.is_empty());

        let bans = resolver().resolve(&node, BASE, Some("en"), false);
        assert_eq!(bans.len(), 2);
    }

    #[test]
    fn regions_outside_the_theme_are_ignored() {
        let node = page("news").with_section(
            "sidebar",
            Section::new("s1").with_widget("b1", WidgetBinding::new("w1", "detail-list")),
        );

        let mut urls = Vec::new();
        resolver().widget_urls(&mut urls, &node, "en", "http://example.com/en/news");
        assert!(urls.is_empty());
    }

    #[test]
    fn missing_theme_contributes_no_widget_urls() {
        let mut node = page("news").with_section(
            "content",
            Section::new("s1").with_widget("b1", WidgetBinding::new("w1", "detail-list")),
        );
        node.theme = "retired".to_string();

        let bans = resolver().resolve(&node, BASE, Some("en"), false);
        assert_eq!(bans.len(), 2);
    }

    #[test]
    fn unrouted_locale_contributes_nothing() {
        let node = Node::new("en-only", "default").with_route("en", "/en/only");
        let bans = resolver().resolve(&node, BASE, Some("nl"), false);

        assert!(bans.is_empty());
    }

    #[test]
    fn widget_instance_receives_slot_and_locale() {
        struct LocaleWidget;

        impl crate::domain::widget::Widget for LocaleWidget {
            fn routes(&self, instance: &WidgetInstance) -> Vec<crate::domain::widget::WidgetRoute> {
                let path = format!(
                    "/{}/{}/{}/{}/%x%",
                    instance.locale, instance.region, instance.section, instance.block
                );
                vec![crate::domain::widget::WidgetRoute::new(
                    instance.id.clone(),
                    RouteTemplate::parse(&path).expect("valid template"),
                )]
            }
        }

        let catalog = StaticCatalog::new(["en"])
            .with_theme(Theme::new("default", ["content"]))
            .with_widget("probe", Arc::new(LocaleWidget));
        let resolver = UrlResolver::new(Arc::new(catalog));
        let node = page("p").with_section(
            "content",
            Section::new("s9").with_widget("b3", WidgetBinding::new("w1", "probe")),
        );

        let mut urls = Vec::new();
        resolver.widget_urls(&mut urls, &node, "nl", "http://example.com/nl/p");
        assert_eq!(urls, vec!["http://example.com/nl/p/nl/content/s9/b3/*"]);
    }
}
