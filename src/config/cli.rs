use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the cms-varnish binary.
#[derive(Debug, Parser)]
#[command(
    name = "cms-varnish",
    version,
    about = "Varnish cache invalidation for CMS publish events"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "CMS_VARNISH_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the publish event ingest service.
    Serve(Box<ServeArgs>),
    /// Print the ban entries of a node without contacting any server.
    Resolve(NodeArgs),
    /// Resolve a node and ban its URLs on every configured server.
    #[command(name = "ban-node")]
    BanNode(NodeArgs),
    /// Ban a single URL on every configured server.
    #[command(name = "ban-url")]
    BanUrl(BanUrlArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct VarnishOverrides {
    /// Replace the configured cache servers; repeat for several servers.
    #[arg(long = "varnish-server", value_name = "URL")]
    pub varnish_servers: Vec<String>,

    /// Override the HTTP method used for ban requests.
    #[arg(long = "varnish-method", value_name = "METHOD")]
    pub varnish_method: Option<String>,

    /// Override the per-request timeout towards cache servers.
    #[arg(long = "varnish-timeout-seconds", value_name = "SECONDS")]
    pub varnish_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SiteOverrides {
    /// Override the site definition file.
    #[arg(long = "site-catalog", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub site_catalog: Option<PathBuf>,

    /// Override the base URL prepended to node routes.
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub varnish: VarnishOverrides,

    #[command(flatten)]
    pub site: SiteOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct NodeArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub varnish: VarnishOverrides,

    #[command(flatten)]
    pub site: SiteOverrides,

    /// Identifier of the node in the site definition.
    #[arg(long = "node", value_name = "ID")]
    pub node: String,

    /// Resolve a single locale; every routed locale when omitted.
    #[arg(long = "locale", value_name = "LOCALE")]
    pub locale: Option<String>,

    /// Also ban everything below the node.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub recursive: bool,
}

#[derive(Debug, Args, Clone)]
pub struct BanUrlArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub varnish: VarnishOverrides,

    /// URL to ban.
    #[arg(value_name = "URL")]
    pub url: String,

    /// Ban every URL starting with the given one.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub recursive: bool,
}
