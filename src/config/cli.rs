use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the spacetraveling binary.
#[derive(Debug, Parser)]
#[command(
    name = "spacetraveling",
    version,
    about = "Blog front-end for a headless content API"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "SPACETRAVELING_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    /// The selected command; `serve` when none was given.
    pub fn command_or_default(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Serve(Box::<ServeArgs>::default()))
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the blog over HTTP with fallback rendering and revalidation.
    Serve(Box<ServeArgs>),
    /// Generate the static site into the output directory.
    Build(BuildArgs),
    /// Print every known article uid, newest first.
    Paths(PathsArgs),
    /// Print the listing, following pagination cursors.
    List(ListArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverrides {
    /// Override the content API endpoint.
    #[arg(long = "content-endpoint", value_name = "URL", value_hint = ValueHint::Url)]
    pub endpoint: Option<String>,

    /// Override the content API access token.
    #[arg(long = "content-access-token", value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// Override the tracked document type.
    #[arg(long = "content-document-type", value_name = "TYPE")]
    pub document_type: Option<String>,

    /// Override the content API request timeout.
    #[arg(long = "content-timeout-seconds", value_name = "SECONDS")]
    pub request_timeout_seconds: Option<u64>,
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
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override how long a rendered article stays fresh.
    #[arg(long = "revalidate-seconds", value_name = "SECONDS")]
    pub revalidate_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Directory receiving the generated site.
    #[arg(long = "output-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of articles rendered concurrently.
    #[arg(long, value_name = "COUNT")]
    pub concurrency: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PathsArgs {
    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Stop after this many listing pages; all pages when omitted.
    #[arg(long, value_name = "COUNT")]
    pub pages: Option<usize>,
}
