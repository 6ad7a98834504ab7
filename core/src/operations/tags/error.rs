use sea_orm::DbErr;

#[derive(thiserror::Error, Debug)]
pub enum TagError {
	#[error("relations would make the tag graph cyclic: <tag_id={tag}>, offending: {offending:?}")]
	CyclicGraph { tag: i32, offending: Vec<i32> },
	#[error("tag not found: <tag_id={0}>")]
	TagNotFound(i32),
	#[error("no tag at label path {0:?}")]
	LabelPathNotFound(Vec<String>),
	#[error("label path {path:?} is ambiguous at {label:?}")]
	AmbiguousLabelPath { path: Vec<String>, label: String },
	#[error("label path is empty")]
	EmptyLabelPath,
	#[error("invalid label: {0:?}")]
	InvalidLabel(String),
	#[error("<tag_id={tag}> already has the label {label:?}")]
	DuplicateLabel { tag: i32, label: String },
	#[error("invalid iso code {0:?}, expected lang[_TERRITORY] such as 'de' or 'de_DE'")]
	InvalidIsoCode(String),

	// Internal errors
	#[error("database error: {0}")]
	Database(#[from] DbErr),
}
