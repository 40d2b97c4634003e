//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use chrono_tz::Tz;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    BuildArgs, CliArgs, Command, ContentOverrides, ListArgs, LoggingOverrides, PathsArgs,
    ServeArgs, ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "spacetraveling";
const ENV_PREFIX: &str = "SPACETRAVELING";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_REVALIDATE_SECS: u64 = 1800;
const DEFAULT_CACHE_MAX_PAGES: u64 = 1024;
const DEFAULT_DOCUMENT_TYPE: &str = "posts";
const DEFAULT_LISTING_PAGE_SIZE: u64 = 5;
const DEFAULT_PATHS_PAGE_SIZE: u64 = 100;
const MAX_PAGE_SIZE: u32 = 100;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SITE_TITLE: &str = "spacetraveling";
const DEFAULT_SITE_DESCRIPTION: &str = "Histórias e tutoriais sobre desenvolvimento.";
const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
const DEFAULT_INITIAL_PAGES: u64 = 1;
const DEFAULT_OUTPUT_DIRECTORY: &str = "out";
const DEFAULT_BUILD_CONCURRENCY: u64 = 4;

#[derive(Debug, Clone)]
pub struct Settings {
    pub content: ContentSettings,
    pub site: SiteSettings,
    pub server: ServerSettings,
    pub build: BuildSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub endpoint: Url,
    pub access_token: Option<String>,
    pub document_type: String,
    pub listing_page_size: NonZeroU32,
    pub paths_page_size: NonZeroU32,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub title: String,
    pub description: String,
    pub timezone: Tz,
    pub public_url: Option<Url>,
    /// Listing pages folded into the index before "load more" takes over.
    pub initial_pages: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub graceful_shutdown: Duration,
    pub revalidate: Duration,
    /// Upper bound on rendered pages kept in memory; least recently used go first.
    pub cache_max_pages: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub output_directory: PathBuf,
    pub concurrency: NonZeroU32,
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

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command_or_default() {
        Command::Serve(args) => raw.apply_serve_overrides(&args.overrides),
        Command::Build(args) => raw.apply_build_overrides(&args),
        Command::Paths(args) => {
            raw.apply_content_overrides(&args.content);
            raw.apply_logging_overrides(&args.logging);
        }
        Command::List(args) => {
            raw.apply_content_overrides(&args.content);
            raw.apply_logging_overrides(&args.logging);
        }
    }

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
    content: RawContentSettings,
    site: RawSiteSettings,
    server: RawServerSettings,
    build: RawBuildSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        self.apply_content_overrides(&overrides.content);
        self.apply_logging_overrides(&overrides.logging);

        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.revalidate_seconds {
            self.server.revalidate_seconds = Some(seconds);
        }
    }

    fn apply_build_overrides(&mut self, args: &BuildArgs) {
        self.apply_content_overrides(&args.content);
        self.apply_logging_overrides(&args.logging);

        if let Some(directory) = args.output_dir.as_ref() {
            self.build.output_directory = Some(directory.clone());
        }
        if let Some(concurrency) = args.concurrency {
            self.build.concurrency = Some(u64::from(concurrency));
        }
    }

    fn apply_content_overrides(&mut self, overrides: &ContentOverrides) {
        if let Some(endpoint) = overrides.endpoint.as_ref() {
            self.content.endpoint = Some(endpoint.clone());
        }
        if let Some(token) = overrides.access_token.as_ref() {
            self.content.access_token = Some(token.clone());
        }
        if let Some(doc_type) = overrides.document_type.as_ref() {
            self.content.document_type = Some(doc_type.clone());
        }
        if let Some(seconds) = overrides.request_timeout_seconds {
            self.content.request_timeout_seconds = Some(seconds);
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            content,
            site,
            server,
            build,
            logging,
        } = raw;

        let content = build_content_settings(content)?;
        let site = build_site_settings(site)?;
        let server = build_server_settings(server)?;
        let build = build_build_settings(build)?;
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            content,
            site,
            server,
            build,
            logging,
        })
    }
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let endpoint = non_empty(content.endpoint)
        .ok_or_else(|| LoadError::invalid("content.endpoint", "must be set"))?;
    let endpoint = Url::parse(&endpoint)
        .map_err(|err| LoadError::invalid("content.endpoint", format!("invalid URL: {err}")))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "content.endpoint",
            "scheme must be http or https",
        ));
    }

    let document_type =
        non_empty(content.document_type).unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string());
    if !document_type
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(LoadError::invalid(
            "content.document_type",
            "may only contain ASCII letters, digits, `_` and `-`",
        ));
    }

    let listing_page_size = page_size(
        content
            .listing_page_size
            .unwrap_or(DEFAULT_LISTING_PAGE_SIZE),
        "content.listing_page_size",
    )?;
    let paths_page_size = page_size(
        content.paths_page_size.unwrap_or(DEFAULT_PATHS_PAGE_SIZE),
        "content.paths_page_size",
    )?;

    let timeout_secs = content
        .request_timeout_seconds
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "content.request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ContentSettings {
        endpoint,
        access_token: non_empty(content.access_token),
        document_type,
        listing_page_size,
        paths_page_size,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let timezone = non_empty(site.timezone).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let timezone = Tz::from_str(&timezone).map_err(|err| {
        LoadError::invalid("site.timezone", format!("unknown timezone `{timezone}`: {err}"))
    })?;

    let public_url = non_empty(site.public_url)
        .map(|value| Url::parse(&value))
        .transpose()
        .map_err(|err| LoadError::invalid("site.public_url", format!("invalid URL: {err}")))?;

    let initial_pages = non_zero_u32(
        site.initial_pages.unwrap_or(DEFAULT_INITIAL_PAGES),
        "site.initial_pages",
    )?;

    Ok(SiteSettings {
        title: non_empty(site.title).unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
        description: non_empty(site.description)
            .unwrap_or_else(|| DEFAULT_SITE_DESCRIPTION.to_string()),
        timezone,
        public_url,
        initial_pages,
    })
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

    let public_addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    let revalidate_secs = server
        .revalidate_seconds
        .unwrap_or(DEFAULT_REVALIDATE_SECS);
    if revalidate_secs == 0 {
        return Err(LoadError::invalid(
            "server.revalidate_seconds",
            "must be greater than zero",
        ));
    }

    let cache_max_pages = non_zero_usize(
        server.cache_max_pages.unwrap_or(DEFAULT_CACHE_MAX_PAGES),
        "server.cache_max_pages",
    )?;

    Ok(ServerSettings {
        public_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        revalidate: Duration::from_secs(revalidate_secs),
        cache_max_pages,
    })
}

fn build_build_settings(build: RawBuildSettings) -> Result<BuildSettings, LoadError> {
    let output_directory = build
        .output_directory
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIRECTORY));

    let concurrency = non_zero_u32(
        build.concurrency.unwrap_or(DEFAULT_BUILD_CONCURRENCY),
        "build.concurrency",
    )?;

    Ok(BuildSettings {
        output_directory,
        concurrency,
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

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    endpoint: Option<String>,
    access_token: Option<String>,
    document_type: Option<String>,
    listing_page_size: Option<u64>,
    paths_page_size: Option<u64>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    title: Option<String>,
    description: Option<String>,
    timezone: Option<String>,
    public_url: Option<String>,
    initial_pages: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    revalidate_seconds: Option<u64>,
    cache_max_pages: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBuildSettings {
    output_directory: Option<PathBuf>,
    concurrency: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn page_size(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    let size = non_zero_u32(value, key)?;
    if size.get() > MAX_PAGE_SIZE {
        return Err(LoadError::invalid(
            key,
            format!("must not exceed {MAX_PAGE_SIZE}"),
        ));
    }
    Ok(size)
}
