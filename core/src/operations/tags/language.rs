//! Languages attached to tag labels, addressed by `lang[_TERRITORY]` codes

use crate::infrastructure::database::entities::{language, Language};

use std::{fmt, str::FromStr};

use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TagError;

/// A validated iso code: two lowercase letters, optionally followed by `_` and two uppercase
/// letters for the territory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IsoCode {
	lang: String,
	territory: Option<String>,
}

impl IsoCode {
	pub fn parse(code: &str) -> Result<Self, TagError> {
		let invalid = || TagError::InvalidIsoCode(code.to_owned());

		let (lang, territory) = match code.split_once('_') {
			Some((lang, territory)) => (lang, Some(territory)),
			None => (code, None),
		};

		if !is_two_of(lang, |c| c.is_ascii_lowercase()) {
			return Err(invalid());
		}

		if let Some(territory) = territory {
			if !is_two_of(territory, |c| c.is_ascii_uppercase()) {
				return Err(invalid());
			}
		}

		Ok(Self {
			lang: lang.to_owned(),
			territory: territory.map(ToOwned::to_owned),
		})
	}

	#[must_use]
	pub fn lang(&self) -> &str {
		&self.lang
	}

	#[must_use]
	pub fn territory(&self) -> Option<&str> {
		self.territory.as_deref()
	}
}

fn is_two_of(part: &str, allowed: impl Fn(char) -> bool) -> bool {
	part.chars().count() == 2 && part.chars().all(allowed)
}

impl fmt::Display for IsoCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.territory {
			Some(territory) => write!(f, "{}_{territory}", self.lang),
			None => f.write_str(&self.lang),
		}
	}
}

impl FromStr for IsoCode {
	type Err = TagError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<String> for IsoCode {
	type Error = TagError;

	fn try_from(code: String) -> Result<Self, Self::Error> {
		Self::parse(&code)
	}
}

impl From<IsoCode> for String {
	fn from(code: IsoCode) -> Self {
		code.to_string()
	}
}

/// Returns the language row for `code`, creating it on first use
pub async fn language_by_iso_code(
	db: &impl ConnectionTrait,
	code: &IsoCode,
) -> Result<language::Model, DbErr> {
	if let Some(existing) = Language::find()
		.filter(language::iso_code_is(code))
		.one(db)
		.await?
	{
		return Ok(existing);
	}

	let created = language::ActiveModel {
		lang: Set(code.lang.clone()),
		territory: Set(code.territory.clone()),
		..Default::default()
	}
	.insert(db)
	.await?;

	debug!(%code, language_id = created.id, "Created language");

	Ok(created)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_lang_and_lang_territory() {
		let de = IsoCode::parse("de").unwrap();
		assert_eq!(de.lang(), "de");
		assert_eq!(de.territory(), None);

		let de_de = IsoCode::parse("de_DE").unwrap();
		assert_eq!(de_de.lang(), "de");
		assert_eq!(de_de.territory(), Some("DE"));
		assert_eq!(de_de.to_string(), "de_DE");
	}

	#[test]
	fn rejects_malformed_codes() {
		for code in ["DE", "de_de", "deu", "d", "", "de_", "de_DEU", "de-DE", "dé"] {
			assert!(
				matches!(IsoCode::parse(code), Err(TagError::InvalidIsoCode(_))),
				"{code:?} should be rejected"
			);
		}
	}

	#[test]
	fn deserializes_from_string() {
		let code: IsoCode = serde_json::from_str("\"en_GB\"").unwrap();
		assert_eq!(code.to_string(), "en_GB");
		assert!(serde_json::from_str::<IsoCode>("\"EN\"").is_err());
	}
}
