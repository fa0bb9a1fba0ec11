//! # Tabula Database
//!
//! Relational query construction for Tabula.
//!
//! This crate builds SELECT statements from immutable query specifications:
//! - **Query specifications**: chainable clause accumulation with value semantics
//! - **Association joins**: named joins resolved through model reflections
//! - **Alias allocation**: deterministic, length-bounded table aliases
//! - **Single-table inheritance**: type-column filters for subclass targets
//!
//! Statements are produced as sea-query ASTs. Running them is delegated to a
//! [`orm::QueryExecutor`] supplied by the caller.
//!
//! ## Quick Start
//!
//! ```rust
//! use tabula_db::prelude::*;
//!
//! let mut registry = ModelRegistry::new();
//! registry
//!     .register(EntityDescriptor::new("Author").with_reflection(Reflection::has_many("posts")))
//!     .unwrap()
//!     .register(EntityDescriptor::new("Post"))
//!     .unwrap();
//!
//! let settings = QuerySettings::default();
//! let spec = QuerySpec::for_entity(&registry, "Author").unwrap().joins("posts");
//! let compiled = QueryCompiler::new(&registry, &settings).compile(&spec).unwrap();
//! assert!(compiled.to_sql().starts_with(r#"SELECT "authors".* FROM "authors""#));
//! ```
//!
//! ## Feature Flags
//!
//! - `orm` (default): query construction

pub mod orm;

/// Prelude module for convenient imports
pub mod prelude {
	#[cfg(feature = "orm")]
	pub use crate::orm::*;
}

pub use orm::{OrmError, QueryCompiler, QuerySpec};
