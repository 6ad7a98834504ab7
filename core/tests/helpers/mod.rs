//! Shared setup for the integration tests: a migrated SQLite database and an artifacts root,
//! both inside one temporary directory

#![allow(dead_code)]

use marmolada_core::{
	infrastructure::database::{entities::artifact, Database},
	operations::{
		artifacts::{ArtifactFileStore, NewArtifact},
		imports::ImportStore,
	},
};

use sea_orm::DatabaseConnection;
use tempfile::TempDir;
use uuid::Uuid;

pub struct TestStore {
	// Keeps the directory alive for as long as the test runs
	pub dir: TempDir,
	pub db: Database,
	pub files: ArtifactFileStore,
}

impl TestStore {
	pub async fn new() -> Self {
		let dir = TempDir::new().unwrap();

		let db = Database::create(&dir.path().join("marmolada.db"))
			.await
			.unwrap();
		db.migrate().await.unwrap();

		let files = ArtifactFileStore::new(dir.path().join("artifacts"));

		Self { dir, db, files }
	}

	pub fn conn(&self) -> &DatabaseConnection {
		self.db.conn()
	}

	/// A fresh incomplete import
	pub async fn import(&self) -> Uuid {
		ImportStore::new(self.conn())
			.create(None)
			.await
			.unwrap()
			.uuid
	}

	/// An artifact of a fresh import, committed without payload
	pub async fn artifact(&self, file_name: Option<&str>) -> artifact::Model {
		let import = self.import().await;

		let tx = self.files.begin(self.conn()).await.unwrap();
		let artifact = self
			.files
			.create_artifact(
				&tx,
				import,
				NewArtifact {
					file_name: file_name.map(ToOwned::to_owned),
					..Default::default()
				},
			)
			.await
			.unwrap();
		tx.commit().await.unwrap();

		artifact
	}

	/// An artifact with `data` as its committed payload
	pub async fn artifact_with_payload(
		&self,
		file_name: Option<&str>,
		data: &[u8],
	) -> artifact::Model {
		let artifact = self.artifact(file_name).await;

		let mut tx = self.files.begin(self.conn()).await.unwrap();
		let artifact = self.files.write(&mut tx, artifact.uuid, data).await.unwrap();
		tx.commit().await.unwrap();

		artifact
	}
}
