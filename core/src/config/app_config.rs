//! Application configuration

use super::{overlay_env, Migrate};

use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use marmolada_utils::json::merge_objects;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "marmolada.json";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
	/// Config schema version
	#[serde(default)]
	pub version: u32,

	/// Data directory path
	#[serde(default = "default_data_dir")]
	pub data_dir: PathBuf,

	/// Logging level, overridden by `RUST_LOG`
	#[serde(default = "default_log_level")]
	pub log_level: String,

	/// Also write logs to `<data_dir>/logs`
	#[serde(default)]
	pub log_to_file: bool,

	#[serde(default)]
	pub artifacts: ArtifactsConfig,

	#[serde(default)]
	pub database: DatabaseConfig,

	#[serde(default)]
	pub tasks: TasksConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsConfig {
	/// Payload storage root, `<data_dir>/artifacts` if unset
	#[serde(default)]
	pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
	/// Database url, a SQLite file in the data directory if unset
	#[serde(default)]
	pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
	/// Jobs processed concurrently by one worker
	pub max_jobs: usize,
	/// Per job, unlimited if unset
	pub job_timeout_secs: Option<u64>,
	pub queue_capacity: usize,
}

impl Default for TasksConfig {
	fn default() -> Self {
		Self {
			max_jobs: 4,
			job_timeout_secs: Some(600),
			queue_capacity: 1024,
		}
	}
}

fn default_data_dir() -> PathBuf {
	PathBuf::from(".")
}

fn default_log_level() -> String {
	"info".to_string()
}

impl AppConfig {
	/// Load configuration from a specific data directory, creating a default one if there is none.
	/// Environment overrides are applied on top but never saved.
	pub fn load_from(data_dir: impl AsRef<Path>) -> Result<Self> {
		let data_dir = data_dir.as_ref();
		let config_path = data_dir.join(CONFIG_FILE_NAME);

		let config = if config_path.exists() {
			info!("Loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)
				.with_context(|| format!("failed to read {}", config_path.display()))?;
			let mut config: Self = serde_json::from_str(&json)
				.with_context(|| format!("invalid config file {}", config_path.display()))?;

			// The file lives in the data dir, whatever it says
			config.data_dir = data_dir.to_path_buf();

			if config.needs_migration() {
				info!(
					"Migrating config from v{} to v{}",
					config.version,
					Self::target_version()
				);
				config.migrate()?;
				config.save()?;
			}

			config
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			config
		};

		config.with_env(std::env::vars())
	}

	/// Loads and deep-merges several JSON config files, later files winning. A directory stands for
	/// all `*.json` files in it, in file name order.
	pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
		let mut docs = Vec::new();

		for path in expand_config_paths(paths)? {
			let json = fs::read_to_string(&path)
				.with_context(|| format!("failed to read {}", path.display()))?;
			let doc = serde_json::from_str::<Value>(&json)
				.with_context(|| format!("invalid config file {}", path.display()))?;
			docs.push(doc);
		}

		if docs.is_empty() {
			return Err(anyhow!("no configuration files found"));
		}

		let mut merged = merge_objects(&docs)?;
		overlay_env(&mut merged, std::env::vars());

		let mut config: Self = serde_json::from_value(merged)?;
		if config.needs_migration() {
			config.migrate()?;
		}

		Ok(config)
	}

	/// Applies `MARMOLADA_*` overrides from `vars`
	pub fn with_env(self, vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
		let mut doc = serde_json::to_value(&self)?;

		if overlay_env(&mut doc, vars) == 0 {
			return Ok(self);
		}

		serde_json::from_value(doc).context("invalid configuration override in environment")
	}

	/// Create default configuration with specific data directory
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::target_version(),
			data_dir,
			log_level: default_log_level(),
			log_to_file: false,
			artifacts: ArtifactsConfig::default(),
			database: DatabaseConfig::default(),
			tasks: TasksConfig::default(),
		}
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.data_dir.join(CONFIG_FILE_NAME);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}

	pub fn artifacts_root(&self) -> PathBuf {
		self.artifacts
			.root
			.clone()
			.unwrap_or_else(|| self.data_dir.join("artifacts"))
	}

	pub fn database_url(&self) -> String {
		self.database.url.clone().unwrap_or_else(|| {
			format!(
				"sqlite://{}?mode=rwc",
				self.data_dir.join("marmolada.db").display()
			)
		})
	}

	/// Ensure all required directories exist
	pub fn ensure_directories(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;
		fs::create_dir_all(self.artifacts_root())?;
		if self.log_to_file {
			fs::create_dir_all(self.logs_dir())?;
		}
		Ok(())
	}
}

impl Default for AppConfig {
	fn default() -> Self {
		Self::default_with_dir(default_data_dir())
	}
}

impl Migrate for AppConfig {
	fn current_version(&self) -> u32 {
		self.version
	}

	fn target_version() -> u32 {
		1 // Current schema version
	}

	fn migrate(&mut self) -> Result<()> {
		match self.version {
			0 => {
				// Unversioned files predate the tasks section, its defaults apply
				self.version = 1;
				Ok(())
			}
			1 => Ok(()),
			v => Err(anyhow!("Unknown config version: {}", v)),
		}
	}
}

fn expand_config_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>> {
	let mut expanded = Vec::new();

	for path in paths {
		let path = path.as_ref();

		if path.is_dir() {
			let mut files = fs::read_dir(path)
				.with_context(|| format!("failed to read directory {}", path.display()))?
				.map(|entry| entry.map(|entry| entry.path()))
				.collect::<Result<Vec<_>, _>>()?
				.into_iter()
				.filter(|file| file.is_file() && file.extension().is_some_and(|ext| ext == "json"))
				.collect::<Vec<_>>();
			files.sort();
			expanded.extend(files);
		} else {
			expanded.push(path.to_path_buf());
		}
	}

	Ok(expanded)
}
