//! Engine-dependent settings for query compilation
//!
//! The maximum identifier length differs per database engine, so it is a
//! setting rather than a constant. Settings are constructed explicitly and
//! handed to the [`QueryCompiler`](super::compiler::QueryCompiler).

use super::errors::Result;
use serde::{Deserialize, Serialize};

/// Database backend the compiled statements are rendered for
///
/// Raw fragment placeholders and SQL rendering follow the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbBackend {
	#[default]
	Postgres,
	Mysql,
	Sqlite,
}

/// Settings consulted while resolving joins and allocating aliases
///
/// # Examples
///
/// ```
/// use tabula_db::orm::QuerySettings;
///
/// let settings = QuerySettings::from_toml_str("max_identifier_length = 30").unwrap();
/// assert_eq!(settings.max_identifier_length, 30);
/// assert!(settings.pluralize_table_names);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
	/// Backend the statements are rendered for
	pub backend: DbBackend,

	/// Longest identifier the engine accepts; aliases are truncated to fit
	pub max_identifier_length: usize,

	/// Pluralize association names when synthesizing aliases
	pub pluralize_table_names: bool,

	/// Primary key column used when an entity does not declare one
	pub default_primary_key: String,

	/// Discriminator column used when an entity does not declare one
	pub inheritance_column: String,
}

impl Default for QuerySettings {
	fn default() -> Self {
		Self {
			backend: DbBackend::Postgres,
			// PostgreSQL NAMEDATALEN - 1
			max_identifier_length: 63,
			pluralize_table_names: true,
			default_primary_key: "id".to_string(),
			inheritance_column: "type".to_string(),
		}
	}
}

impl QuerySettings {
	/// Parse settings from a TOML document; missing keys take their defaults
	pub fn from_toml_str(source: &str) -> Result<Self> {
		let settings: Self = toml::from_str(source)?;
		tracing::debug!(
			backend = ?settings.backend,
			max_identifier_length = settings.max_identifier_length,
			pluralize_table_names = settings.pluralize_table_names,
			"Loaded query settings"
		);
		Ok(settings)
	}

	/// Override the maximum identifier length
	pub fn with_max_identifier_length(mut self, length: usize) -> Self {
		self.max_identifier_length = length;
		self
	}

	/// Render for another backend
	pub fn with_backend(mut self, backend: DbBackend) -> Self {
		self.backend = backend;
		self
	}

	/// Toggle pluralization of synthesized alias prefixes
	pub fn with_pluralize_table_names(mut self, pluralize: bool) -> Self {
		self.pluralize_table_names = pluralize;
		self
	}
}
