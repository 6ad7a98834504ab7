//! Process wide `tracing` setup

use crate::config::AppConfig;

use std::fs::{self, OpenOptions};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_FILE_NAME: &str = "marmolada.log";

/// `RUST_LOG` wins over the configured level. Calling this twice is an error, the first
/// subscriber stays installed.
pub fn init(config: &AppConfig) -> Result<()> {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(format!("{},marmolada_core=debug", config.log_level)))
		.unwrap_or_else(|_| EnvFilter::new("info,marmolada_core=debug"));

	let console_layer = fmt::layer()
		.with_writer(std::io::stderr)
		.with_target(false);

	let file_layer = if config.log_to_file {
		let logs_dir = config.logs_dir();
		fs::create_dir_all(&logs_dir)
			.with_context(|| format!("failed to create {}", logs_dir.display()))?;

		let log_file = logs_dir.join(LOG_FILE_NAME);
		let file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&log_file)
			.with_context(|| format!("failed to open {}", log_file.display()))?;

		Some(
			fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_target(true)
				.with_thread_ids(true)
				.with_line_number(true),
		)
	} else {
		None
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(console_layer)
		.with(file_layer)
		.try_init()
		.context("a global tracing subscriber is already set")?;

	info!(data_dir = %config.data_dir.display(), "Logging initialized");

	Ok(())
}
