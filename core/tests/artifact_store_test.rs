//! Artifact payloads and their transactional bookkeeping

mod helpers;

use std::fs;

use helpers::TestStore;
use marmolada_core::{
	infrastructure::database::entities::{artifact, Artifact},
	operations::{
		artifacts::{ArtifactError, NewArtifact},
		imports::{Completion, ImportError, ImportStore},
	},
};
use pretty_assertions::assert_eq;
use sea_orm::{EntityTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_write_read_delete() {
	let test = TestStore::new().await;
	let artifact = test.artifact(None).await;

	let mut tx = test.files.begin(test.conn()).await.unwrap();

	let written = test
		.files
		.write(&mut tx, artifact.uuid, b"Hello!\n")
		.await
		.unwrap();
	assert_eq!(written.content_type, "text/plain");
	assert_eq!(
		test.files.read(&tx, artifact.uuid).await.unwrap(),
		b"Hello!\n"
	);

	// Payloads are written exactly once
	assert!(matches!(
		test.files.write(&mut tx, artifact.uuid, b"again").await,
		Err(ArtifactError::AlreadyExists(_))
	));

	tx.commit().await.unwrap();

	let full_path = test.files.full_path(&written);
	assert_eq!(fs::read(&full_path).unwrap(), b"Hello!\n");

	let mut tx = test.files.begin(test.conn()).await.unwrap();
	test.files.delete(&mut tx, artifact.uuid).await.unwrap();

	assert!(matches!(
		test.files.read(&tx, artifact.uuid).await,
		Err(ArtifactError::PayloadNotFound(uuid)) if uuid == artifact.uuid
	));
	// Only logically deleted until commit
	assert!(full_path.exists());

	tx.commit().await.unwrap();
	assert!(!full_path.exists());
}

#[tokio::test]
async fn test_rollback_removes_written_payload() {
	let test = TestStore::new().await;
	let artifact = test.artifact(Some("notes.txt")).await;
	let full_path = test.files.full_path(&artifact);

	let mut tx = test.files.begin(test.conn()).await.unwrap();
	test.files
		.write(&mut tx, artifact.uuid, b"draft")
		.await
		.unwrap();
	assert!(full_path.exists());
	tx.rollback().await.unwrap();

	assert!(!full_path.exists());

	// Dropping an unfinished transaction behaves the same
	let mut tx = test.files.begin(test.conn()).await.unwrap();
	test.files
		.write(&mut tx, artifact.uuid, b"draft")
		.await
		.unwrap();
	assert!(full_path.exists());
	drop(tx);

	assert!(!full_path.exists());
}

#[tokio::test]
async fn test_rollback_keeps_deleted_payload() {
	let test = TestStore::new().await;
	let artifact = test.artifact_with_payload(None, b"keep me").await;
	let full_path = test.files.full_path(&artifact);

	let mut tx = test.files.begin(test.conn()).await.unwrap();
	test.files.delete(&mut tx, artifact.uuid).await.unwrap();
	tx.rollback().await.unwrap();

	assert_eq!(fs::read(&full_path).unwrap(), b"keep me");
}

#[cfg(unix)]
#[tokio::test]
async fn test_move_keeps_both_paths_until_commit() {
	use std::os::unix::fs::MetadataExt;

	let test = TestStore::new().await;
	let artifact = test.artifact_with_payload(None, b"Hello!\n").await;
	let old_path = test.files.full_path(&artifact);

	let mut tx = test.files.begin(test.conn()).await.unwrap();
	let moved = test
		.files
		.move_to(&mut tx, artifact.uuid, "sorted/hello.txt")
		.await
		.unwrap();
	let new_path = test.files.full_path(&moved);

	assert_eq!(moved.path, "sorted/hello.txt");
	assert_eq!(fs::read(&old_path).unwrap(), b"Hello!\n");
	assert_eq!(fs::read(&new_path).unwrap(), b"Hello!\n");
	// Same filesystem, so the payload got hardlinked
	assert_eq!(fs::metadata(&new_path).unwrap().nlink(), 2);
	assert_eq!(
		test.files.read(&tx, artifact.uuid).await.unwrap(),
		b"Hello!\n"
	);

	tx.commit().await.unwrap();

	assert!(!old_path.exists());
	assert_eq!(fs::read(&new_path).unwrap(), b"Hello!\n");
	assert_eq!(fs::metadata(&new_path).unwrap().nlink(), 1);
}

#[tokio::test]
async fn test_move_rollback_keeps_old_path() {
	let test = TestStore::new().await;
	let artifact = test.artifact_with_payload(None, b"Hello!\n").await;
	let old_path = test.files.full_path(&artifact);

	let mut tx = test.files.begin(test.conn()).await.unwrap();
	let moved = test
		.files
		.move_to(&mut tx, artifact.uuid, "sorted/hello.txt/")
		.await
		.unwrap();
	let new_path = test.files.full_path(&moved);
	assert!(new_path.exists());

	tx.rollback().await.unwrap();

	assert!(!new_path.exists());
	assert_eq!(fs::read(&old_path).unwrap(), b"Hello!\n");

	let tx = test.files.begin(test.conn()).await.unwrap();
	assert_eq!(test.files.get(&tx, artifact.uuid).await.unwrap().path, artifact.path);
}

#[tokio::test]
async fn test_move_rejects_escaping_paths() {
	let test = TestStore::new().await;
	let artifact = test.artifact(None).await;

	let mut tx = test.files.begin(test.conn()).await.unwrap();
	let err = test
		.files
		.move_to(&mut tx, artifact.uuid, "../outside")
		.await
		.unwrap_err();

	assert!(matches!(err, ArtifactError::InvalidPath(_)));
	assert!(err.is_validation());
}

#[tokio::test]
async fn test_create_artifact() {
	let test = TestStore::new().await;
	let import = test.import().await;

	let tx = test.files.begin(test.conn()).await.unwrap();

	let artifact = test
		.files
		.create_artifact(
			&tx,
			import,
			NewArtifact {
				source_uri: Some("https://example.org/cat.jpg".to_owned()),
				file_name: Some("cat.jpg".to_owned()),
				..Default::default()
			},
		)
		.await
		.unwrap();

	assert_eq!(artifact.content_type, "application/octet-stream");
	assert!(artifact.path.starts_with("incoming/import-"));
	assert!(artifact.path.ends_with(&format!("-artifact-{}-cat.jpg", artifact.uuid)));

	let err = test
		.files
		.create_artifact(&tx, Uuid::new_v4(), NewArtifact::default())
		.await
		.unwrap_err();
	assert!(matches!(err, ArtifactError::ImportNotFound(_)));
	assert!(err.is_validation());

	tx.commit().await.unwrap();

	let artifacts = ImportStore::new(test.conn()).artifacts_of(import).await.unwrap();
	assert_eq!(artifacts.len(), 1);
	assert_eq!(artifacts[0].uuid, artifact.uuid);
}

#[tokio::test]
async fn test_file_names_cannot_leave_the_store_root() {
	let test = TestStore::new().await;

	let artifact = test.artifact(Some("../../../../escaped.bin")).await;
	assert!(artifact.path.starts_with("incoming/import-"));
	assert!(artifact
		.path
		.ends_with(&format!("-artifact-{}-escaped.bin", artifact.uuid)));
	// The original name is kept, just not in the path
	assert_eq!(artifact.file_name.as_deref(), Some("../../../../escaped.bin"));

	let mut tx = test.files.begin(test.conn()).await.unwrap();
	let written = test
		.files
		.write(&mut tx, artifact.uuid, b"inside")
		.await
		.unwrap();
	tx.commit().await.unwrap();

	let full_path = test.files.full_path(&written);
	assert_eq!(full_path.parent(), Some(test.files.root().join("incoming").as_path()));
	assert_eq!(fs::read(&full_path).unwrap(), b"inside");
	assert!(!test.dir.path().join("escaped.bin").exists());

	let nested = test.artifact(Some("a/b.txt")).await;
	assert_eq!(nested.path.matches('/').count(), 1);
	assert!(nested.path.ends_with("-b.txt"));
}

#[tokio::test]
async fn test_failed_move_keeps_payload() {
	let test = TestStore::new().await;
	let artifact = test.artifact_with_payload(None, b"Hello!\n").await;
	let taken = test.artifact(None).await;

	let old_path = test.files.full_path(&artifact);
	let taken_path = test.files.full_path(&taken);

	let mut tx = test.files.begin(test.conn()).await.unwrap();

	// Another artifact already claims that path
	assert!(matches!(
		test.files.move_to(&mut tx, artifact.uuid, &taken.path).await,
		Err(ArtifactError::Database(_))
	));
	assert!(!taken_path.exists());
	assert!(!tx.ledger().is_removed(&old_path));

	// The transaction is still good for committing
	tx.commit().await.unwrap();

	assert_eq!(fs::read(&old_path).unwrap(), b"Hello!\n");

	let owner = Artifact::find()
		.filter(artifact::path_is(&taken.path))
		.one(test.conn())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(owner.uuid, taken.uuid);

	let tx = test.files.begin(test.conn()).await.unwrap();
	assert_eq!(
		test.files.get(&tx, artifact.uuid).await.unwrap().path,
		artifact.path
	);
	assert_eq!(
		test.files.read(&tx, artifact.uuid).await.unwrap(),
		b"Hello!\n"
	);
}

#[tokio::test]
async fn test_write_after_delete_survives_commit() {
	let test = TestStore::new().await;
	let artifact = test.artifact(None).await;

	let mut tx = test.files.begin(test.conn()).await.unwrap();
	test.files.delete(&mut tx, artifact.uuid).await.unwrap();
	test.files
		.write(&mut tx, artifact.uuid, b"second try")
		.await
		.unwrap();
	assert_eq!(
		test.files.read(&tx, artifact.uuid).await.unwrap(),
		b"second try"
	);
	tx.commit().await.unwrap();

	assert_eq!(
		fs::read(test.files.full_path(&artifact)).unwrap(),
		b"second try"
	);
}

#[tokio::test]
async fn test_link_local_file() {
	let test = TestStore::new().await;
	let artifact = test.artifact(Some("page.html")).await;

	let source = test.dir.path().join("upload.bin");
	fs::write(&source, b"<html></html>").unwrap();

	let mut tx = test.files.begin(test.conn()).await.unwrap();

	assert!(matches!(
		test.files
			.link_local_file(&mut tx, artifact.uuid, &test.dir.path().join("missing"))
			.await,
		Err(ArtifactError::NotALocalFile(_))
	));

	let linked = test
		.files
		.link_local_file(&mut tx, artifact.uuid, &source)
		.await
		.unwrap();
	tx.commit().await.unwrap();

	assert_eq!(fs::read(test.files.full_path(&linked)).unwrap(), b"<html></html>");
	// The source is left alone
	assert!(source.exists());
}

#[tokio::test]
async fn test_remove_artifact() {
	let test = TestStore::new().await;
	let artifact = test.artifact_with_payload(None, b"bye").await;
	let full_path = test.files.full_path(&artifact);

	let mut tx = test.files.begin(test.conn()).await.unwrap();
	test.files.remove_artifact(&mut tx, artifact.uuid).await.unwrap();
	assert!(full_path.exists());
	tx.commit().await.unwrap();

	assert!(!full_path.exists());

	let tx = test.files.begin(test.conn()).await.unwrap();
	assert!(matches!(
		test.files.get(&tx, artifact.uuid).await,
		Err(ArtifactError::ArtifactNotFound(_))
	));
}

#[tokio::test]
async fn test_import_completion_is_monotonic() {
	let test = TestStore::new().await;
	let imports = ImportStore::new(test.conn());

	assert!(matches!(
		imports.create(Some(json!(["not", "an", "object"]))).await,
		Err(ImportError::InvalidMeta(_))
	));

	let import = imports
		.create(Some(json!({"source": "camera"})))
		.await
		.unwrap();
	assert!(!import.complete);
	assert_eq!(import.meta, json!({"source": "camera"}));

	assert_eq!(
		imports.set_complete(import.uuid, false).await.unwrap(),
		Completion::Unchanged
	);
	assert_eq!(
		imports.set_complete(import.uuid, true).await.unwrap(),
		Completion::Completed
	);
	assert_eq!(
		imports.set_complete(import.uuid, true).await.unwrap(),
		Completion::AlreadyComplete
	);
	assert!(matches!(
		imports.set_complete(import.uuid, false).await,
		Err(ImportError::CompleteIsMonotonic(_))
	));

	assert_eq!(imports.list(Some(true)).await.unwrap().len(), 1);
	assert!(imports.list(Some(false)).await.unwrap().is_empty());
	assert!(matches!(
		imports.get(Uuid::new_v4()).await,
		Err(ImportError::ImportNotFound(_))
	));
}
