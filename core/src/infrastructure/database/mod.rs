//! Database infrastructure using SeaORM

use std::{path::Path, time::Duration};

use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

pub mod entities;
pub mod migration;

/// Database wrapper for the media-object store
#[derive(Debug, Clone)]
pub struct Database {
	conn: DatabaseConnection,
}

impl Database {
	/// Create (or reuse) a SQLite database file at the specified path
	pub async fn create(path: &Path) -> Result<Self, DbErr> {
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent)
				.await
				.map_err(|e| DbErr::Custom(format!("Failed to create directory: {e}")))?;
		}

		let db = Self::connect(&format!("sqlite://{}?mode=rwc", path.display())).await?;

		info!(?path, "Created new database");

		Ok(db)
	}

	/// Open an existing SQLite database file
	pub async fn open(path: &Path) -> Result<Self, DbErr> {
		if !path.exists() {
			return Err(DbErr::Custom(format!(
				"Database does not exist: {}",
				path.display()
			)));
		}

		let db = Self::connect(&format!("sqlite://{}", path.display())).await?;

		info!(?path, "Opened database");

		Ok(db)
	}

	/// Connect using a full database url, e.g. `sqlite://data/marmolada.db?mode=rwc`
	pub async fn connect(url: &str) -> Result<Self, DbErr> {
		let mut opt = ConnectOptions::new(url);
		opt.max_connections(10)
			.min_connections(1)
			.connect_timeout(Duration::from_secs(8))
			.idle_timeout(Duration::from_secs(60))
			.sqlx_logging(false); // We use tracing instead

		let conn = SeaDatabase::connect(opt).await?;

		debug!(%url, "Connected to database");

		Ok(Self { conn })
	}

	/// Run migrations
	pub async fn migrate(&self) -> Result<(), DbErr> {
		migration::Migrator::up(&self.conn, None).await?;
		info!("Database migrations completed successfully");
		Ok(())
	}

	/// Get the database connection
	pub fn conn(&self) -> &DatabaseConnection {
		&self.conn
	}
}
