//! Hierarchical tag vocabulary
//!
//! Tags form a directed acyclic graph through `tags_relations`. Every edge mutation checks the
//! transitive closure first and is rejected as a whole if any candidate would close a cycle.
//!
//! The check-then-insert sequence is only race free when the surrounding transaction runs with
//! serializable isolation (SQLite write transactions are serialized, other backends must be
//! configured accordingly).

mod error;
mod graph;
mod labels;
pub mod language;
mod path;

pub use error::TagError;
pub use graph::TagGraphStore;
pub use labels::{normalize_label, Label};
pub use language::{language_by_iso_code, IsoCode};
