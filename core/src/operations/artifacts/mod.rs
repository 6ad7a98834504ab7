//! Artifact payload storage
//!
//! The filesystem has no transactions, so every change to a payload is recorded in the
//! [`FileLedger`] of the [`StoreTransaction`] it was made under and finalized together with the
//! database transaction: files written under a rolled back transaction are removed again, files
//! deleted under a committed one are only unlinked after the commit.

pub mod content_type;
mod error;
mod ledger;
mod store;

pub use error::ArtifactError;
pub use ledger::FileLedger;
pub use store::{ArtifactFileStore, NewArtifact, StoreTransaction};
