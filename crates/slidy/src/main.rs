use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use slidy::config::Configuration;
use slidy::events::ViewerCommand;
use slidy::session::{Session, SessionHandle};
use slidy::tasks;

#[derive(Debug, Parser)]
#[command(
    name = "slidy",
    version,
    about = "Image slideshow with looping, shuffle and autoplay"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Deterministic RNG seed for shuffles (overrides startup-shuffle-seed)
    #[arg(long = "seed", value_name = "SEED")]
    seed: Option<u64>,
    /// Image index to start the slideshow at
    #[arg(long = "start", value_name = "INDEX", default_value_t = 0)]
    start: usize,
    /// Print the images an autoplay run would show, then exit
    #[arg(long = "dry-run", value_name = "ITERATIONS")]
    dry_run: Option<usize>,
    /// Increase log verbosity (repeatable); ignored when RUST_LOG is set
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let fallback = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        seed,
        start,
        dry_run,
        verbose,
    } = Args::parse();
    init_tracing(verbose);

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::debug!("Loaded configuration from {}:\n{:#?}", config.display(), cfg);

    let mut rng = match seed.or(cfg.startup_shuffle_seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let (images, _) = tasks::files::load_collection(&cfg, &mut rng)?;

    let store = cfg.settings_store();
    let settings = store.load_or(&cfg.playback_defaults());
    tracing::info!(
        path = %store.path().display(),
        autoplay = settings.autoplay,
        interval = %settings.describe_interval(),
        "playback settings loaded"
    );

    let stored = settings.clone();
    let mut session = Session::new(images, settings, rng);

    if let Some(iterations) = dry_run {
        let plan = tasks::autoplay::simulate(&mut session, iterations);
        println!("# autoplay dry run\n# iterations: {iterations}\n");
        if plan.is_empty() {
            println!(
                "(no images discovered under {})",
                cfg.photo_library_path.display()
            );
        }
        for (idx, image) in plan.iter().enumerate() {
            println!("  {:>4}: {}", idx + 1, image.name);
        }
        return Ok(());
    }

    if !session.start(Some(start)) {
        tracing::warn!("library is empty; add images with `add PATH...` then `start`");
    }
    let session = SessionHandle::new(session);
    let cancel = CancellationToken::new();

    let (line_tx, line_rx) = mpsc::channel::<String>(16); // stdin -> Console
    let (viewer_tx, viewer_rx) = mpsc::channel::<ViewerCommand>(16); // Console -> Viewer

    // Blocking stdin reader bridged into the async console.
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!("stdin read failed: {err}");
                    break;
                }
            }
        }
    });

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

    // Autoplay
    tasks.spawn({
        let session = session.clone();
        let cancel = cancel.clone();
        async move {
            tasks::autoplay::run(session, cancel)
                .await
                .context("autoplay task failed")
        }
    });

    // Viewer
    tasks.spawn({
        let session = session.clone();
        let cancel = cancel.clone();
        let pointer_timeout = cfg.pointer_inactivity;
        async move {
            tasks::viewer::run(session, viewer_rx, cancel, pointer_timeout)
                .await
                .context("viewer task failed")
        }
    });

    // Settings persistence
    tasks.spawn({
        let session = session.clone();
        let cancel = cancel.clone();
        async move {
            tasks::persist::run(session, store, stored, cancel)
                .await
                .context("settings persistence task failed")
        }
    });

    // Console
    tasks.spawn({
        let session = session.clone();
        let cancel = cancel.clone();
        async move {
            tasks::console::run(line_rx, session, viewer_tx, cancel)
                .await
                .context("console task failed")
        }
    });

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("task error: {e:?}");
                cancel.cancel();
            }
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}
