//! Environment overrides: `MARMOLADA_DATABASE__URL=...` sets `database.url`

use serde_json::{Map, Value};
use tracing::debug;

pub const ENV_PREFIX: &str = "MARMOLADA_";

const NESTING: &str = "__";

/// Applies every `MARMOLADA_*` variable of `vars` to `doc`, returning how many were applied.
///
/// Keys are lower-cased and split at `__`. Values that parse as JSON (numbers, booleans, ...) are
/// used as such, anything else as a string.
pub fn overlay_env(doc: &mut Value, vars: impl IntoIterator<Item = (String, String)>) -> usize {
	let mut applied = 0;

	for (key, raw) in vars {
		let Some(path) = key.strip_prefix(ENV_PREFIX) else {
			continue;
		};

		let path = path
			.split(NESTING)
			.map(str::to_lowercase)
			.collect::<Vec<_>>();
		if path.iter().any(String::is_empty) {
			continue;
		}

		let value = serde_json::from_str::<Value>(&raw).unwrap_or_else(|_| Value::String(raw));

		debug!(%key, "Applying configuration override from environment");
		set_path(doc, &path, value);
		applied += 1;
	}

	applied
}

fn set_path(doc: &mut Value, path: &[String], value: Value) {
	let Some((last, parents)) = path.split_last() else {
		return;
	};

	let mut current = doc;
	for key in parents {
		if !current.is_object() {
			*current = Value::Object(Map::new());
		}
		let Value::Object(map) = current else {
			return;
		};
		current = map
			.entry(key.clone())
			.or_insert_with(|| Value::Object(Map::new()));
	}

	if !current.is_object() {
		*current = Value::Object(Map::new());
	}
	if let Value::Object(map) = current {
		map.insert(last.clone(), value);
	}
}
