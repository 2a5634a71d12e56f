use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use focuskit::{
    init_logging, load_config, parse_event_line, AutomationRuntime, Automator, CalibrationTable,
    JsonSurfaceStore, LoggingMotionLink, LoggingPlayer,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Replay a recorded controller session through FocusKit
#[derive(Parser, Debug)]
#[command(name = "focuskit", version, about)]
struct Args {
    /// Configuration file (.toml or .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Event stream, one JSON event per line ("-" for stdin)
    #[arg(long, default_value = "-")]
    events: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_json)?;

    let config = load_config(args.config.as_deref())?;
    let table_path = &config.calibration.table_path;
    let table = CalibrationTable::load_from_file(table_path)
        .with_context(|| format!("Failed to load calibration table {}", table_path.display()))?;

    let automator = Automator::new(&config, table);
    let (runtime, handle) = AutomationRuntime::new(
        automator,
        Box::new(LoggingMotionLink::new()),
        Box::new(LoggingPlayer::new()),
        Box::new(JsonSurfaceStore::new(&config.scan.surface_path)),
    );
    let status = runtime.status();
    let task = tokio::spawn(runtime.run());

    let input: Box<dyn AsyncBufRead + Unpin + Send> = if args.events == "-" {
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        let file = tokio::fs::File::open(&args.events)
            .await
            .with_context(|| format!("Failed to open {}", args.events))?;
        Box::new(BufReader::new(file))
    };

    let mut lines = input.lines();
    let mut sent = 0usize;
    let mut skipped = 0usize;
    while let Some(line) = lines.next_line().await? {
        match parse_event_line(&line) {
            Ok(Some(event)) => {
                handle.send(event)?;
                sent += 1;
            }
            Ok(None) => {}
            Err(e) => {
                warn!("{:#}", e);
                skipped += 1;
            }
        }
    }
    drop(handle);

    info!("Replayed {} events ({} skipped)", sent, skipped);
    task.await.context("Automation runtime panicked")?;

    let report = serde_json::to_string_pretty(&*status.read())?;
    println!("{}", report);
    Ok(())
}
