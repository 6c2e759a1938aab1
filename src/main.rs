use std::{path::Path, process, sync::Arc};

use cms_varnish::{
    application::{
        catalog::{ContentCatalog, StaticCatalog},
        error::AppError,
    },
    ban::{BanDispatcher, BanSet, UrlResolver},
    config::{self, BanUrlArgs, NodeArgs},
    domain::node::Node,
    infra::{
        catalog::FileCatalog,
        http::{self, HttpState},
        telemetry, varnish,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Resolve(args) => run_resolve(settings, args).await,
        config::Command::BanNode(args) => run_ban_node(settings, args).await,
        config::Command::BanUrl(args) => run_ban_url(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let catalog = load_catalog(&settings.site.catalog).await?;
    let dispatcher = build_dispatcher(&settings, catalog)?;
    if dispatcher.servers().is_empty() {
        warn!("No cache servers configured; publish events will only be resolved");
    }

    let state = HttpState {
        dispatcher: Arc::new(dispatcher),
        default_base_url: settings.site.base_url.clone(),
    };

    http::serve(
        settings.server.addr,
        state,
        settings.server.graceful_shutdown,
    )
    .await
    .map_err(AppError::from)
}

async fn run_resolve(settings: config::Settings, args: NodeArgs) -> Result<(), AppError> {
    let catalog = load_catalog(&settings.site.catalog).await?;
    let node = find_node(catalog.as_ref(), &args.node)?;
    let base_url = require_base_url(&settings)?;

    let resolver = UrlResolver::new(catalog);
    let bans = resolver.resolve(&node, base_url, args.locale.as_deref(), args.recursive);
    print_bans(&bans)
}

async fn run_ban_node(settings: config::Settings, args: NodeArgs) -> Result<(), AppError> {
    let catalog = load_catalog(&settings.site.catalog).await?;
    let node = find_node(catalog.as_ref(), &args.node)?;
    let base_url = require_base_url(&settings)?.to_string();
    let dispatcher = build_dispatcher(&settings, catalog)?;

    let bans = dispatcher
        .ban_node(&node, &base_url, args.locale.as_deref(), args.recursive)
        .await?;
    info!(
        node_id = %node.id,
        entries = bans.len(),
        servers = dispatcher.servers().len(),
        "Node banned"
    );
    print_bans(&bans)
}

async fn run_ban_url(settings: config::Settings, args: BanUrlArgs) -> Result<(), AppError> {
    if args.url.trim().is_empty() {
        return Err(AppError::validation("URL must not be empty"));
    }

    let catalog = Arc::new(StaticCatalog::default());
    let dispatcher = build_dispatcher(&settings, catalog)?;
    dispatcher.ban_url(&args.url, args.recursive).await?;
    info!(
        url = %args.url,
        recursive = args.recursive,
        servers = dispatcher.servers().len(),
        "URL banned"
    );
    Ok(())
}

async fn load_catalog(path: &Path) -> Result<Arc<dyn ContentCatalog>, AppError> {
    let catalog = FileCatalog::load(path).await?;
    info!(
        path = %path.display(),
        nodes = catalog.nodes().len(),
        "Site catalog loaded"
    );
    Ok(Arc::new(catalog))
}

fn build_dispatcher(
    settings: &config::Settings,
    catalog: Arc<dyn ContentCatalog>,
) -> Result<BanDispatcher, AppError> {
    let mut dispatcher = BanDispatcher::new(UrlResolver::new(catalog));
    for server in varnish::build_servers(&settings.varnish)? {
        dispatcher.add_server(server);
    }
    Ok(dispatcher)
}

fn find_node(catalog: &dyn ContentCatalog, id: &str) -> Result<Node, AppError> {
    catalog
        .node(id)
        .ok_or_else(|| AppError::NodeNotFound(id.to_string()))
}

fn require_base_url(settings: &config::Settings) -> Result<&str, AppError> {
    settings
        .site
        .base_url
        .as_deref()
        .ok_or_else(|| AppError::validation("a base URL is required (`--base-url` or `site.base_url`)"))
}

fn print_bans(bans: &BanSet) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(&bans.to_entries())
        .map_err(|err| AppError::unexpected(format!("failed to render bans: {err}")))?;
    println!("{rendered}");
    Ok(())
}
