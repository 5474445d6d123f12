//! The schema header written as line 1 of every table file.

use serde::{Deserialize, Serialize};

use error::{ErrorKind, Result};

/// Current schema header format version.
pub const SCHEMA_VERSION: &str = "1.0";

/// Closed set of column type tags. Schema derivation is descriptive only;
/// it is never consulted to reject a record at append/modify time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
	Text,
	Number,
	Bool,
	Date,
	Blob,
	BlobRef,
	Jsonb,
}

/// A single column descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
	pub name: String,
	#[serde(rename = "type")]
	pub type_tag: ColumnType,
	#[serde(default, skip_serializing_if = "is_false")]
	pub required: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}

fn is_false(b: &bool) -> bool {
	!b
}

impl Column {
	/// Shorthand for a column with no `required`/`description` metadata.
	pub fn new<S: Into<String>>(name: S, type_tag: ColumnType) -> Column {
		Column { name: name.into(), type_tag, required: false, description: None }
	}

	pub fn required(mut self) -> Column {
		self.required = true;
		self
	}

	pub fn described<S: Into<String>>(mut self, description: S) -> Column {
		self.description = Some(description.into());
		self
	}
}

/// The schema header persisted as line 1 of a table file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
	pub version: String,
	pub columns: Vec<Column>,
}

impl Schema {
	/// The schema written for a record type with no descriptive columns.
	pub fn empty() -> Schema {
		Schema { version: SCHEMA_VERSION.to_owned(), columns: Vec::new() }
	}

	/// Builds a schema from an explicit column list.
	pub fn new(columns: Vec<Column>) -> Schema {
		Schema { version: SCHEMA_VERSION.to_owned(), columns }
	}

	/// Validates the header read back from disk: non-empty version, and
	/// every column has a non-empty name and type. Returns `SchemaInvalid`
	/// on failure; `path` is only used to annotate the error.
	pub fn validate(&self, path: &::std::path::Path) -> Result<()> {
		if self.version.is_empty() {
			bail!(ErrorKind::SchemaInvalid(path.to_owned(), "version must not be empty".into()));
		}

		for column in &self.columns {
			if column.name.is_empty() {
				bail!(ErrorKind::SchemaInvalid(path.to_owned(), "column name must not be empty".into()));
			}
		}

		Ok(())
	}
}

/// Record types that want descriptive schema metadata implement this to
/// return their columns in declaration order. Types that don't care fall
/// back to `Schema::empty()` via the default implementation.
pub trait Describe {
	fn columns() -> Vec<Column> {
		Vec::new()
	}
}
