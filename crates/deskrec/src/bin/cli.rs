//! deskrec - record and replay desktop sessions
//!
//! Results go to stdout as JSON, logs go to stderr (`RUST_LOG` controls them).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use deskrec::prelude::*;

#[derive(Parser)]
#[command(name = "deskrec")]
#[command(about = "Record desktop clicks and typing with screenshot anchors, replay them later")]
#[command(version)]
struct Cli {
    /// Where sessions are stored (default: $DESKREC_RECORDINGS_DIR or ~/.deskrec/recordings)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record until Ctrl+C, then save the session
    Record {
        #[arg(short, long)]
        label: Option<String>,
        /// Idle gap in ms that ends a typed run
        #[arg(long, default_value = "700")]
        key_timeout: u64,
        /// Side of the anchor square in pixels
        #[arg(long, default_value = "120")]
        anchor_size: u32,
    },
    /// Run a single action given as `{"type": ..., "data": {...}}`
    Run {
        /// Inline JSON payload
        payload: Option<String>,
        /// Read the payload from a file instead
        #[arg(short, long, conflicts_with = "payload")]
        file: Option<PathBuf>,
        #[command(flatten)]
        timing: Timing,
    },
    /// Replay a saved session
    Replay {
        session: String,
        /// Seconds to wait before the first action
        #[arg(long, default_value = "2")]
        delay: u64,
        #[command(flatten)]
        timing: Timing,
    },
    /// List saved sessions
    List,
    /// Show a saved session
    Show {
        session: String,
        /// Print every action
        #[arg(long)]
        all: bool,
    },
    /// Delete a saved session and its anchors
    Delete { session: String },
}

#[derive(clap::Args)]
struct Timing {
    /// Pause between typed characters in ms
    #[arg(long, default_value = "10")]
    type_interval: u64,
    /// Pause between screen polls in ms
    #[arg(long, default_value = "250")]
    poll_interval: u64,
    /// Wait timeout in ms for waits that carry none
    #[arg(long, default_value = "10000")]
    wait_timeout: u64,
}

impl Timing {
    fn config(&self) -> PlaybackConfig {
        PlaybackConfig::default()
            .type_interval(Duration::from_millis(self.type_interval))
            .poll_interval(Duration::from_millis(self.poll_interval))
            .default_wait_timeout(Duration::from_millis(self.wait_timeout))
    }
}

#[derive(Serialize)]
struct Output<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> Output<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
    fn err(e: impl std::fmt::Display) -> Output<()> {
        Output { success: false, data: None, error: Some(e.to_string()) }
    }
}

fn print_json<T: Serialize>(output: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let storage = || match &cli.dir {
        Some(dir) => SessionStorage::with_dir(dir),
        None => SessionStorage::new(),
    };

    let result = match &cli.command {
        Commands::Record { label, key_timeout, anchor_size } => {
            record(cli.dir.clone(), label.clone(), *key_timeout, *anchor_size)
        }
        Commands::Run { payload, file, timing } => run(payload.as_deref(), file.as_deref(), timing),
        Commands::Replay { session, delay, timing } => {
            storage().and_then(|s| replay(&s, session, *delay, timing))
        }
        Commands::List => storage().and_then(|s| list(&s)),
        Commands::Show { session, all } => storage().and_then(|s| show(&s, session, *all)),
        Commands::Delete { session } => storage().and_then(|s| delete(&s, session)),
    };

    if let Err(e) = result {
        let _ = print_json(&Output::<()>::err(format!("{e:#}")));
        std::process::exit(1);
    }
}

fn record(dir: Option<PathBuf>, label: Option<String>, key_timeout: u64, anchor_size: u32) -> Result<()> {
    let mut config = RecorderConfig::default()
        .key_group_timeout(Duration::from_millis(key_timeout))
        .anchor_size(anchor_size);
    if let Some(dir) = dir {
        config = config.recordings_dir(dir);
    }
    let storage = SessionStorage::with_dir(&config.recordings_dir)?;

    let recorder = Recorder::new(config, Arc::new(XcapScreen::new()), Box::new(RdevCapture::new()));
    let status = recorder.start(label)?;
    eprintln!("Recording (Ctrl+C to stop)");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))?;

    let mut count = 0;
    while running.load(Ordering::SeqCst) {
        let now = recorder.status().events;
        if now != count {
            count = now;
            info!(events = count, "recording");
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    let session = recorder.stop()?;
    let path = storage.save(&session)?;
    info!(path = %path.display(), dir = ?status.dir, "session saved");

    #[derive(Serialize)]
    struct Saved {
        path: PathBuf,
        events: usize,
    }
    print_json(&Output::ok(Saved { path, events: session.events.len() }))
}

fn player(timing: &Timing) -> Player {
    Player::new(
        Arc::new(XcapScreen::new()),
        Arc::new(RdevInput::new()),
        timing.config(),
    )
}

fn run(payload: Option<&str>, file: Option<&std::path::Path>, timing: &Timing) -> Result<()> {
    let text = match (payload, file) {
        (Some(inline), _) => inline.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("pass a JSON payload or --file"),
    };
    let payload: RunPayload = serde_json::from_str(&text).context("payload is not valid JSON")?;

    let outcome = player(timing).run_payload(&payload);
    let ok = outcome.ok;
    print_json(&outcome)?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn replay(storage: &SessionStorage, id: &str, delay: u64, timing: &Timing) -> Result<()> {
    let session = storage.load(id)?;
    eprintln!("Replaying {} actions, starting in {}s...", session.events.len(), delay);
    std::thread::sleep(Duration::from_secs(delay));

    let stats = player(timing).play(&session.events);
    let ok = stats.failed.is_none();
    print_json(&Output::ok(&stats))?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn list(storage: &SessionStorage) -> Result<()> {
    print_json(&Output::ok(storage.list()?))
}

fn show(storage: &SessionStorage, id: &str, all: bool) -> Result<()> {
    let session = storage.load(id)?;
    let (mut clicks, mut anchored, mut text, mut waits) = (0, 0, 0, 0);
    for action in &session.events {
        match action {
            Action::Click { .. } => clicks += 1,
            Action::ClickImage { image_path, .. } => {
                clicks += 1;
                if image_path.is_some() {
                    anchored += 1;
                }
            }
            Action::TypeText { .. } => text += 1,
            Action::WaitForImage { .. } => waits += 1,
        }
    }

    #[derive(Serialize)]
    struct Summary<'a> {
        label: Option<&'a str>,
        dir: &'a std::path::Path,
        started_at: String,
        events: usize,
        clicks: usize,
        anchored_clicks: usize,
        text_runs: usize,
        waits: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        actions: Option<&'a [Action]>,
    }
    print_json(&Output::ok(Summary {
        label: session.label.as_deref(),
        dir: &session.dir,
        started_at: session.started_at.to_rfc3339(),
        events: session.events.len(),
        clicks,
        anchored_clicks: anchored,
        text_runs: text,
        waits,
        actions: all.then_some(session.events.as_slice()),
    }))
}

fn delete(storage: &SessionStorage, id: &str) -> Result<()> {
    storage.delete(id)?;
    print_json(&Output::ok(serde_json::json!({ "deleted": id })))
}
