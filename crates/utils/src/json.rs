use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MergeError {
	#[error("nothing to merge")]
	Empty,
	#[error("only JSON objects can be merged")]
	NotAnObject,
	#[error("can't merge object and non-object values at key '{0}'")]
	Conflict(String),
}

/// Deep merge several JSON objects, later documents winning on scalar conflicts.
///
/// Nested objects are merged recursively; replacing an object with a non-object value
/// (or the other way around) is an error, as the documents are expected to share a shape.
pub fn merge_objects<'a>(docs: impl IntoIterator<Item = &'a Value>) -> Result<Value, MergeError> {
	let mut docs = docs.into_iter().peekable();
	if docs.peek().is_none() {
		return Err(MergeError::Empty);
	}

	let mut merged = Map::new();
	for doc in docs {
		let Value::Object(doc) = doc else {
			return Err(MergeError::NotAnObject);
		};
		merge_into(&mut merged, doc)?;
	}

	Ok(Value::Object(merged))
}

fn merge_into(target: &mut Map<String, Value>, source: &Map<String, Value>) -> Result<(), MergeError> {
	for (key, value) in source {
		match (target.get_mut(key), value) {
			(Some(Value::Object(existing)), Value::Object(incoming)) => {
				merge_into(existing, incoming)?;
			}
			(Some(Value::Object(_)), _) | (Some(_), Value::Object(_)) => {
				return Err(MergeError::Conflict(key.clone()));
			}
			_ => {
				target.insert(key.clone(), value.clone());
			}
		}
	}

	Ok(())
}
