use std::{future::IntoFuture, io::Write, process, sync::Arc, time::Instant};

use spacetraveling::{
    application::{content::ContentApi, error::AppError, listing::Feed, site::SiteGenerator},
    config::{self, Command, ListArgs},
    infra::{
        cache::PageCache,
        error::InfraError,
        http::{self, HttpState},
        output::OutputDir,
        prismic::PrismicClient,
        telemetry,
    },
};
use tokio::{signal, sync::oneshot};
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

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    let content: Arc<dyn ContentApi> = Arc::new(PrismicClient::new(&settings.content)?);
    let site = Arc::new(SiteGenerator::from_settings(content, &settings));

    match cli_args.command_or_default() {
        Command::Serve(_) => run_serve(&settings, site).await,
        Command::Build(_) => run_build(&settings, &site).await,
        Command::Paths(_) => run_paths(&site).await,
        Command::List(args) => run_list(&site, &args).await,
    }
}

async fn run_serve(settings: &config::Settings, site: Arc<SiteGenerator>) -> Result<(), AppError> {
    let cache = PageCache::new(settings.server.revalidate, settings.server.cache_max_pages);
    let revalidate = cache.max_age();
    let state = HttpState::new(site, cache);

    let started = Instant::now();
    let pages = http::prerender(&state, settings.build.concurrency).await?;
    info!(
        pages,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Pre-rendered pages"
    );

    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(InfraError::from)?;
    info!(
        addr = %settings.server.public_addr,
        revalidate_seconds = revalidate.as_secs(),
        cache_max_pages = settings.server.cache_max_pages.get(),
        "Listening"
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stop_tx.send(());
        })
        .into_future();

    let drain_deadline = async move {
        if stop_rx.await.is_ok() {
            tokio::time::sleep(grace).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = drain_deadline => {
            warn!(
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}

async fn run_build(settings: &config::Settings, site: &SiteGenerator) -> Result<(), AppError> {
    let started = Instant::now();
    let output = OutputDir::prepare(&settings.build.output_directory).await?;
    let report = site.build(&output, settings.build.concurrency).await?;

    info!(
        articles = report.articles,
        feed_pages = report.feed_pages,
        skipped = report.skipped,
        elapsed_ms = started.elapsed().as_millis() as u64,
        output = %output.root().display(),
        "Build complete"
    );
    Ok(())
}

async fn run_paths(site: &SiteGenerator) -> Result<(), AppError> {
    let uids = site.paths().paths().await?;

    let mut stdout = std::io::stdout().lock();
    for uid in &uids {
        writeln!(stdout, "{uid}").map_err(InfraError::from)?;
    }
    Ok(())
}

async fn run_list(site: &SiteGenerator, args: &ListArgs) -> Result<(), AppError> {
    let listing = site.listing();
    let mut feed = Feed::new(listing.first_page().await?);
    let mut pages = 1;

    while feed.show_load_more() && args.pages.is_none_or(|limit| pages < limit) {
        listing.load_more(&mut feed).await?;
        pages += 1;
    }

    let mut stdout = std::io::stdout().lock();
    for summary in feed.summaries() {
        writeln!(
            stdout,
            "{}\t{}\t{}\t{}",
            summary.published.as_deref().unwrap_or("-"),
            summary.uid.as_deref().unwrap_or("-"),
            summary.title.as_deref().unwrap_or(""),
            summary.author.as_deref().unwrap_or(""),
        )
        .map_err(InfraError::from)?;
    }
    if let Some(next) = feed.next_page() {
        info!(pages, next_page = %next, "More listing pages available");
    }
    Ok(())
}
