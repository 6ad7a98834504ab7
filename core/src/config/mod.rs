//! Configuration

mod app_config;
mod env;
mod migration;

pub use app_config::{AppConfig, ArtifactsConfig, DatabaseConfig, TasksConfig, CONFIG_FILE_NAME};
pub use env::{overlay_env, ENV_PREFIX};
pub use migration::Migrate;
