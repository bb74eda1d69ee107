//! Troupe console binary.
//!
//! Reads `!!plb` lines from stdin and runs them against a simulated server
//! that prints each command and brings spawned actors online after a delay.

mod host;
mod source;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use troupe_plugin::{CONFIG_FILE, CommandSource, Dispatch, PlayerBatch, PluginConfig};

use crate::host::{JoinNotice, SimulatedHost};
use crate::source::ConsoleSource;

/// Console command line arguments.
#[derive(Parser, Debug)]
#[command(name = "troupe")]
#[command(about = "Run !!plb batch commands against a simulated server")]
#[command(version)]
struct Args {
	/// Configuration file, created with defaults if missing
	#[arg(short, long, value_name = "PATH", default_value = CONFIG_FILE)]
	config: PathBuf,

	/// Send commands as this player instead of the server console
	#[arg(short, long, value_name = "NAME")]
	player: Option<String>,

	/// Permission level of the sender
	#[arg(long, default_value_t = 4)]
	level: u32,

	/// Delay before a spawned actor comes online; without it actors never do
	#[arg(long, value_name = "MS")]
	join_delay_ms: Option<u64>,

	/// Do not announce joins; leave readiness to the poll loop
	#[arg(long)]
	poll_only: bool,

	/// Seconds to wait for running batches on exit
	#[arg(long, value_name = "SECS", default_value_t = 5)]
	shutdown_secs: u64,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let config = PluginConfig::load_or_default(&args.config);
	info!(path = %args.config.display(), base = %config.base_name, "console.config");

	let notice = if args.poll_only { JoinNotice::PollOnly } else { JoinNotice::Push };
	let (joins_tx, mut joins) = mpsc::unbounded_channel();
	let host = Arc::new(SimulatedHost::new(joins_tx, args.join_delay_ms.map(Duration::from_millis), notice));
	let plugin = PlayerBatch::new(config, host);
	let source: Arc<dyn CommandSource> = Arc::new(ConsoleSource::new(args.player, args.level));

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		tokio::select! {
			line = lines.next_line() => match line? {
				Some(line) if line.trim().is_empty() => {}
				Some(line) => {
					if let Dispatch::Ignored = plugin.handle(&source, &line) {
						eprintln!("not a batch command, type !!plb for help");
					}
				}
				None => break,
			},
			Some(name) = joins.recv() => {
				plugin.on_player_joined(&name);
			}
			_ = tokio::signal::ctrl_c() => break,
		}
	}

	let report = plugin.shutdown(Duration::from_secs(args.shutdown_secs)).await;
	if !report.completed() {
		anyhow::bail!("{} batch tasks did not finish before shutdown", report.abandoned());
	}
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_env("TROUPE_LOG").or_else(|_| EnvFilter::try_from_default_env()).unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("troupe_batch=trace,troupe_plugin=debug,troupe_worker=debug,info")
			} else {
				EnvFilter::new("warn")
			}
		})
	};

	// TROUPE_LOG_DIR keeps the terminal free for replies
	if let Some(log_dir) = std::env::var("TROUPE_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("troupe.{}.log", std::process::id()));
		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer().with_writer(file).with_ansi(false).with_target(true);
			tracing_subscriber::registry().with(filter()).with(file_layer).init();
			tracing::info!(path = ?log_path, "console tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt().with_env_filter(filter()).with_writer(std::io::stderr).init();
}
