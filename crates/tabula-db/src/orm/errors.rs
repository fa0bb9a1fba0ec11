//! Error types for query construction and compilation
//!
//! Configuration errors (unknown associations, ambiguous polymorphic joins,
//! unsupported join kinds) and type errors are raised synchronously while the
//! join graph is resolved or the statement is assembled, so a partially built
//! statement never reaches an executor.

use super::execution::ExecutionError;

/// Errors raised by the query layer
#[derive(Debug, thiserror::Error)]
pub enum OrmError {
	/// The entity is not registered
	#[error("Unknown entity '{0}'")]
	UnknownEntity(String),

	/// The association is not declared on the entity
	#[error("Association named '{association}' was not found on {entity}; perhaps you misspelled it?")]
	UnknownAssociation { entity: String, association: String },

	/// A polymorphic association has no single target table to join against
	#[error("Cannot eagerly join the polymorphic association '{association}' on {entity}")]
	EagerLoadPolymorphic { entity: String, association: String },

	/// The association cannot be expressed as a join
	#[error("Unsupported join for association '{association}': {reason}")]
	UnsupportedJoinKind { association: String, reason: String },

	/// Registering the entity would make it its own ancestor
	#[error("{entity} cannot inherit from {parent}: {parent} already descends from {entity}")]
	InheritanceCycle { entity: String, parent: String },

	/// A record of the wrong entity was assigned into an association slot
	#[error("{expected} expected, got {actual}")]
	AssociationTypeMismatch { expected: String, actual: String },

	/// The settings document could not be parsed
	#[error("Invalid query settings: {0}")]
	Settings(#[from] toml::de::Error),

	/// The executor failed
	#[error(transparent)]
	Execution(#[from] ExecutionError),
}

impl OrmError {
	/// Whether this error is a configuration error (fatal, never retried)
	pub fn is_configuration_error(&self) -> bool {
		matches!(
			self,
			Self::UnknownEntity(_)
				| Self::UnknownAssociation { .. }
				| Self::EagerLoadPolymorphic { .. }
				| Self::UnsupportedJoinKind { .. }
				| Self::InheritanceCycle { .. }
				| Self::Settings(_)
		)
	}
}

/// Result alias used throughout the query layer
pub type Result<T> = std::result::Result<T, OrmError>;
