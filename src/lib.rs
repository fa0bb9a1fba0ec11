//! # Tabula
//!
//! An immutable relational query builder with association joins.
//!
//! Tabula describes SELECT queries as values. Clause methods on a
//! [`QuerySpec`] return new specifications and never mutate their receiver,
//! so a base query can be shared and refined freely. Association joins are
//! resolved through model reflections into aliased joins with the right
//! ON-conditions, including through associations, polymorphic interfaces and
//! single-table inheritance.
//!
//! ## Feature Flags
//!
//! - `database` (default): query specification and compilation
//!
//! ## Quick Example
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! let mut registry = ModelRegistry::new();
//! registry
//!     .register(EntityDescriptor::new("Author").with_reflection(Reflection::has_many("posts")))
//!     .unwrap()
//!     .register(EntityDescriptor::new("Post"))
//!     .unwrap();
//!
//! let settings = QuerySettings::default();
//! let recent = QuerySpec::for_entity(&registry, "Author")
//!     .unwrap()
//!     .order("authors.created_at DESC")
//!     .limit(10);
//! let with_posts = recent.joins("posts");
//!
//! // The base specification is untouched
//! assert!(recent.joins_values().is_empty());
//!
//! let compiled = QueryCompiler::new(&registry, &settings).compile(&with_posts).unwrap();
//! assert!(compiled.readonly);
//! ```

#[cfg(feature = "database")]
pub mod db;

// Re-export ORM
#[cfg(feature = "database")]
pub use tabula_db::orm::{
	CompiledQuery, DbBackend, ModelRegistry, OrmError, QueryCompiler, QuerySettings, QuerySpec,
};

pub mod prelude {
	#[cfg(feature = "database")]
	pub use tabula_db::orm::{
		AssociationRef, Attributes, CompiledQuery, DbBackend, EntityDescriptor, FilterValue,
		JoinRef, LockMode, ModelRegistry, OrderExpr, OrmError, Predicate, QueryCompiler,
		QueryExecutor, QuerySettings, QuerySpec, RawJoin, Reflection, ReflectionRegistry,
	};
}
