//! board-attachments: download every uploaded attachment of a board export.
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::Context;
use board_attachments::utils::{default_output_root, expand_tilde};
use board_attachments::{
    AttachmentDownloader, Config, Event, ExistingFileAction, ExportDocument, FailurePolicy,
    FileNaming, run_with_shutdown,
};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Parser, Debug)]
#[command(name = "board-attachments")]
#[command(about = "Download the uploaded attachments of a board export into per-card directories")]
struct Args {
    /// Path to the JSON export
    export: PathBuf,

    /// Output root (default: `attachments` next to the export)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum concurrent downloads
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    jobs: Option<usize>,

    /// Attempt every attachment even after a failure
    #[arg(long)]
    continue_on_error: bool,

    /// Keep files that already exist instead of downloading them again
    #[arg(long)]
    skip_existing: bool,

    /// Percent-decode file names and drop URL query strings from them
    #[arg(long)]
    decode_names: bool,

    /// Retry transient failures up to N times
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Print events as JSON lines on stdout
    #[arg(long)]
    json: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args, export: &std::path::Path) -> anyhow::Result<Config> {
    let default_root = default_output_root(export);
    let mut config = match &args.config {
        Some(path) => {
            let path = expand_tilde(path);
            Config::from_file_with_output_dir(&path, &default_root)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => Config {
            output_dir: default_root,
            ..Default::default()
        },
    };

    if let Some(output) = &args.output {
        config.output_dir = expand_tilde(output);
    }
    if let Some(jobs) = args.jobs {
        config.max_concurrent_downloads = jobs;
    }
    if args.continue_on_error {
        config.failure_policy = FailurePolicy::ContinueOnError;
    }
    if args.skip_existing {
        config.existing_files = ExistingFileAction::Skip;
    }
    if args.decode_names {
        config.file_naming = FileNaming::Decoded;
    }
    if let Some(retries) = args.retries {
        config.retry.max_attempts = retries;
    }
    if let Some(secs) = args.timeout {
        config.request_timeout = Duration::from_secs(secs);
    }

    Ok(config)
}

/// Print events until the run finishes
async fn render_events(mut events: broadcast::Receiver<Event>, json: bool) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(missed = n, "Event printer fell behind");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let finished = matches!(event, Event::RunFinished { .. });

        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Could not serialize event"),
            }
        } else {
            match &event {
                Event::Completed {
                    bytes_written,
                    destination,
                    ..
                } => println!("{} ({bytes_written} bytes)", destination.display()),
                Event::Skipped { destination, .. } => {
                    println!("{} (kept existing)", destination.display())
                }
                Event::RunFinished { summary } => println!(
                    "{} downloaded, {} skipped, {} failed, {} not started",
                    summary.completed, summary.skipped, summary.failed, summary.not_started
                ),
                Event::Started { .. } | Event::Failed { .. } => {}
            }
        }

        if finished {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let export = expand_tilde(&args.export);
    let config = build_config(&args, &export)?;

    let document = ExportDocument::load(&export)?;
    let extraction = document.extract();

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let downloader = AttachmentDownloader::new(config)?;
    let printer = tokio::spawn(render_events(downloader.subscribe(), args.json));

    let result = run_with_shutdown(&downloader, extraction.jobs).await;
    printer.await.ok();

    let summary = result?;
    if !extraction.warnings.is_empty() {
        tracing::warn!(
            count = extraction.warnings.len(),
            "Some export entries were skipped"
        );
    }
    tracing::info!(
        completed = summary.completed,
        bytes = summary.bytes_written,
        "Done"
    );
    Ok(())
}
