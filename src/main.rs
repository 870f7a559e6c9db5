//! Binary entrypoint: wires the gallery pipeline to a line-oriented shell.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use latch::api::UnsplashClient;
use latch::config::Configuration;
use latch::events::{
    FetchOutcome, FetchRequest, GalleryCommand, GalleryStatus, GalleryView,
};
use latch::favorites::Favorites;
use latch::scroll::ViewportMetrics;
use latch::shell::{self, ShellInput};
use latch::store::FileStore;
use latch::tasks;

#[derive(Debug, Parser)]
#[command(
    name = "latch",
    version,
    about = "Infinite-scroll photo feed with search and favorites"
)]
struct Args {
    /// Path to YAML config (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// API access key (overrides the config file and LATCH_ACCESS_KEY)
    #[arg(long, value_name = "KEY")]
    access_key: Option<String>,
    /// Photos requested per page
    #[arg(long, value_name = "N")]
    per_page: Option<u32>,
    /// Directory holding persisted favorites
    #[arg(long, value_name = "DIR")]
    favorites_dir: Option<PathBuf>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(format!("latch={level}").parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper_util=warn".parse()?);
    // stdout carries the gallery views
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
    Ok(())
}

fn load_configuration(args: &Args) -> Result<Configuration> {
    let cfg = match &args.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    let mut cfg = cfg
        .with_env_overrides()
        .with_access_key_override(args.access_key.clone());
    if let Some(per_page) = args.per_page {
        cfg.per_page = per_page;
    }
    if let Some(dir) = &args.favorites_dir {
        cfg.favorites_dir = dir.clone();
    }
    cfg.validated().context("invalid configuration values")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let cfg = load_configuration(&args)?;
    tracing::info!("Loaded configuration:\n{:#?}", cfg);
    tracing::info!(
        per_page = cfg.per_page,
        threshold = cfg.scroll_threshold,
        throttle = %humantime::format_duration(cfg.scroll_throttle),
        "scroll trigger configured"
    );

    let store = FileStore::open(&cfg.favorites_dir).with_context(|| {
        format!(
            "failed to open favorites store at {}",
            cfg.favorites_dir.display()
        )
    })?;
    let favorites = Favorites::load(store).context("failed to load favorites")?;
    let client = UnsplashClient::from_config(&cfg).context("failed to build API client")?;

    // Channels (small/bounded)
    let (cmd_tx, cmd_rx) = mpsc::channel::<GalleryCommand>(32); // Shell/Scroll -> Gallery
    let (fetch_tx, fetch_rx) = mpsc::channel::<FetchRequest>(8); // Gallery -> Fetcher
    let (outcome_tx, outcome_rx) = mpsc::channel::<FetchOutcome>(8); // Fetcher -> Gallery
    let (view_tx, mut view_rx) = mpsc::channel::<GalleryView>(8); // Gallery -> Shell
    let (metrics_tx, metrics_rx) = mpsc::channel::<ViewportMetrics>(64); // Shell -> Scroll
    let (status_tx, status_rx) = watch::channel(GalleryStatus::default()); // Gallery -> Scroll

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Fetcher
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            tasks::fetcher::run(client, fetch_rx, outcome_tx, cancel)
                .await
                .context("fetcher task failed")
        }
    });

    // Gallery
    tasks.spawn({
        let cancel = cancel.clone();
        let per_page = cfg.per_page;
        let ports = tasks::gallery::GalleryPorts {
            commands: cmd_rx,
            outcomes: outcome_rx,
            to_fetcher: fetch_tx,
            to_view: view_tx,
            status: status_tx,
        };
        async move {
            tasks::gallery::run(per_page, favorites, ports, cancel)
                .await
                .context("gallery task failed")
        }
    });

    // Scroll trigger
    tasks.spawn({
        let cancel = cancel.clone();
        let to_gallery = cmd_tx.clone();
        let opts = tasks::scroll::ScrollOptions {
            threshold: cfg.scroll_threshold,
            throttle: cfg.scroll_throttle,
        };
        async move {
            tasks::scroll::run(metrics_rx, status_rx, to_gallery, opts, cancel)
                .await
                .context("scroll task failed")
        }
    });

    // View printer
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    maybe_view = view_rx.recv() => match maybe_view {
                        Some(view) => println!("{}", shell::render(&view)),
                        None => break,
                    },
                }
            }
            Ok(())
        }
    });

    println!("{}", shell::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else {
            tracing::info!("stdin closed; initiating shutdown");
            break;
        };
        match shell::parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ShellInput::Quit)) => break,
            Ok(Some(ShellInput::Help)) => println!("{}", shell::HELP),
            Ok(Some(ShellInput::Scroll(metrics))) => {
                if metrics_tx.send(metrics).await.is_err() {
                    tracing::warn!("scroll listener gone");
                    break;
                }
            }
            Ok(Some(ShellInput::Command(cmd))) => {
                if cmd_tx.send(cmd).await.is_err() {
                    tracing::warn!("gallery task gone");
                    break;
                }
            }
            Err(err) => eprintln!("{err:#}"),
        }
    }

    // Ensure other tasks are asked to stop
    cancel.cancel();

    // Drain JoinSet (wait for other tasks to complete)
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
