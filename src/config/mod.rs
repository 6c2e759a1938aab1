//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{
    BanUrlArgs, CliArgs, Command, LoggingOverrides, NodeArgs, ServeArgs, ServeOverrides,
    SiteOverrides, VarnishOverrides,
};

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "cms-varnish";
const ENV_PREFIX: &str = "CMS_VARNISH";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_BAN_METHOD: &str = "BAN";
const DEFAULT_VARNISH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SITE_CATALOG: &str = "site.toml";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub varnish: VarnishSettings,
    pub site: SiteSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct VarnishSettings {
    /// Cache server endpoints, in ban order.
    pub servers: Vec<Url>,
    pub method: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub catalog: PathBuf,
    pub base_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("varnish.servers")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_command_overrides(cli.command.as_ref());

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    varnish: RawVarnishSettings,
    site: RawSiteSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawVarnishSettings {
    servers: Option<Vec<String>>,
    method: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    catalog: Option<PathBuf>,
    base_url: Option<String>,
}

impl RawSettings {
    fn apply_command_overrides(&mut self, command: Option<&Command>) {
        match command {
            Some(Command::Serve(args)) => self.apply_serve_overrides(&args.overrides),
            Some(Command::Resolve(args)) | Some(Command::BanNode(args)) => {
                self.apply_logging_overrides(&args.logging);
                self.apply_varnish_overrides(&args.varnish);
                self.apply_site_overrides(&args.site);
            }
            Some(Command::BanUrl(args)) => {
                self.apply_logging_overrides(&args.logging);
                self.apply_varnish_overrides(&args.varnish);
            }
            None => self.apply_serve_overrides(&ServeOverrides::default()),
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }

        self.apply_logging_overrides(&overrides.logging);
        self.apply_varnish_overrides(&overrides.varnish);
        self.apply_site_overrides(&overrides.site);
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_varnish_overrides(&mut self, overrides: &VarnishOverrides) {
        if !overrides.varnish_servers.is_empty() {
            self.varnish.servers = Some(overrides.varnish_servers.clone());
        }
        if let Some(method) = overrides.varnish_method.as_ref() {
            self.varnish.method = Some(method.clone());
        }
        if let Some(seconds) = overrides.varnish_timeout_seconds {
            self.varnish.timeout_seconds = Some(seconds);
        }
    }

    fn apply_site_overrides(&mut self, overrides: &SiteOverrides) {
        if let Some(path) = overrides.site_catalog.as_ref() {
            self.site.catalog = Some(path.clone());
        }
        if let Some(base_url) = overrides.base_url.as_ref() {
            self.site.base_url = Some(base_url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            varnish,
            site,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            varnish: build_varnish_settings(varnish)?,
            site: build_site_settings(site)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_varnish_settings(varnish: RawVarnishSettings) -> Result<VarnishSettings, LoadError> {
    let servers = varnish
        .servers
        .unwrap_or_default()
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(parse_server_url)
        .collect::<Result<Vec<_>, _>>()?;

    let method = varnish
        .method
        .map(|value| value.trim().to_ascii_uppercase())
        .unwrap_or_else(|| DEFAULT_BAN_METHOD.to_string());
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(LoadError::invalid(
            "varnish.method",
            format!("`{method}` is not a valid HTTP method name"),
        ));
    }

    let timeout_secs = varnish
        .timeout_seconds
        .unwrap_or(DEFAULT_VARNISH_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "varnish.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(VarnishSettings {
        servers,
        method,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let catalog = site
        .catalog
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SITE_CATALOG));
    if catalog.as_os_str().is_empty() {
        return Err(LoadError::invalid("site.catalog", "path must not be empty"));
    }

    let base_url = match site.base_url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => {
            Url::parse(value)
                .map_err(|err| LoadError::invalid("site.base_url", format!("`{value}`: {err}")))?;
            Some(value.trim_end_matches('/').to_string())
        }
    };

    Ok(SiteSettings { catalog, base_url })
}

fn parse_server_url(value: &str) -> Result<Url, LoadError> {
    let url = Url::parse(value)
        .map_err(|err| LoadError::invalid("varnish.servers", format!("`{value}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "varnish.servers",
            format!("`{value}` must use http or https"),
        ));
    }
    Ok(url)
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}
