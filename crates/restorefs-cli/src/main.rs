use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use restorefs_core::{RestoreConfig, RestoreStage, Restorer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
	name = "restorefs",
	version,
	about = "Rebuild the file tree of a device backup from its Manifest.db"
)]
struct Cli {
	/// Backup source directory (contains Manifest.db and the bucketed files)
	#[arg(long, default_value = "src")]
	src: PathBuf,
	/// Destination directory for the resolved tree
	#[arg(long, default_value = "dst")]
	dst: PathBuf,
}

fn main() {
	// Initialize tracing
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let cli = Cli::parse();
	if let Err(e) = run(cli) {
		tracing::error!("{:#}", e);
		std::process::exit(1);
	}

	tracing::info!("Done!");
}

fn run(cli: Cli) -> Result<()> {
	let config = RestoreConfig::new(&cli.src, &cli.dst);
	let mut restorer = Restorer::new(config);

	if std::io::stderr().is_terminal() {
		let bar = ProgressBar::new(0);
		bar.set_style(
			ProgressStyle::with_template("{prefix:>20} [{bar:40}] {pos}/{len} {wide_msg}")
				.context("Invalid progress bar template")?
				.progress_chars("=> "),
		);
		let handle = bar.clone();
		restorer.set_progress_callback(move |progress| {
			handle.set_prefix(progress.stage.to_string());
			match progress.current {
				Some(ref current) => handle.set_message(current.display().to_string()),
				None => handle.set_message(""),
			}
			handle.set_length(progress.total);
			handle.set_position(progress.completed);
			if progress.stage == RestoreStage::Done {
				handle.finish_and_clear();
			}
		});
	}

	let report = restorer.run().with_context(|| {
		format!(
			"Failed to restore {} into {}",
			cli.src.display(),
			cli.dst.display()
		)
	})?;

	tracing::info!(
		"Restored {} files ({} bytes) into {} directories, skipped {} non-file entries",
		report.files_copied,
		report.bytes_copied,
		report.directories_created,
		report.resolve.skipped_non_file
	);
	if report.resolve.collisions > 0 {
		tracing::warn!(
			"{} manifest entries shared a destination with an earlier entry and replaced it",
			report.resolve.collisions
		);
	}

	Ok(())
}
