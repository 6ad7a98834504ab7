//! Sea-ORM entity definitions
//!
//! These map the tag vocabulary, imports, artifacts and task records to database tables.

pub mod artifact;
pub mod artifact_task;
pub mod import;
pub mod import_task;
pub mod language;
pub mod tag;
pub mod tag_label;
pub mod tag_label_language;
pub mod tag_relation;

// Re-export all entities
pub use artifact::Entity as Artifact;
pub use artifact_task::Entity as ArtifactTask;
pub use import::Entity as Import;
pub use import_task::Entity as ImportTask;
pub use language::Entity as Language;
pub use tag::Entity as Tag;
pub use tag_label::Entity as TagLabel;
pub use tag_label_language::Entity as TagLabelLanguage;
pub use tag_relation::Entity as TagRelation;

// Re-export active models for easy access
pub use artifact::ActiveModel as ArtifactActive;
pub use artifact_task::ActiveModel as ArtifactTaskActive;
pub use import::ActiveModel as ImportActive;
pub use import_task::ActiveModel as ImportTaskActive;
pub use language::ActiveModel as LanguageActive;
pub use tag::ActiveModel as TagActive;
pub use tag_label::ActiveModel as TagLabelActive;
pub use tag_label_language::ActiveModel as TagLabelLanguageActive;
pub use tag_relation::ActiveModel as TagRelationActive;
