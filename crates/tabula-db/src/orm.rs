//! # Relational query construction
//!
//! Immutable query specifications and the compiler that turns them into
//! SELECT statements with association joins.
//!
//! - [`QuerySpec`]: chainable, value-semantics description of a query.
//!   Every clause method returns a new spec; blank arguments are no-ops.
//! - [`ModelRegistry`]: entities, their tables and association
//!   [`Reflection`]s, including single-table inheritance hierarchies.
//! - [`JoinGraph`]: named association joins resolved into a tree of nodes
//!   with collision-free table aliases.
//! - [`QueryCompiler`]: assembles a sea-query [`SelectStatement`] from a spec
//!   and its join graph, folding WHERE predicates and inferring read-only
//!   results.
//!
//! ## Example
//!
//! ```
//! use tabula_db::orm::{
//!     EntityDescriptor, ModelRegistry, QueryCompiler, QuerySettings, QuerySpec, Reflection,
//! };
//!
//! let mut registry = ModelRegistry::new();
//! registry
//!     .register(
//!         EntityDescriptor::new("Author")
//!             .with_reflection(Reflection::has_many("posts"))
//!             .with_reflection(Reflection::has_many("comments").through("posts")),
//!     )
//!     .unwrap()
//!     .register(EntityDescriptor::new("Post").with_reflection(Reflection::has_many("comments")))
//!     .unwrap()
//!     .register(EntityDescriptor::new("Comment"))
//!     .unwrap();
//!
//! let settings = QuerySettings::default();
//! let spec = QuerySpec::for_entity(&registry, "Author")
//!     .unwrap()
//!     .joins("comments")
//!     .filter([("name", "David")])
//!     .order("authors.id DESC")
//!     .limit(5);
//!
//! let compiled = QueryCompiler::new(&registry, &settings).compile(&spec).unwrap();
//! let sql = compiled.to_sql();
//! assert!(sql.contains(r#"INNER JOIN "posts" ON "authors"."id" = "posts"."author_id""#));
//! assert!(sql.contains(r#"INNER JOIN "comments" ON "comments"."post_id" = "posts"."id""#));
//! assert!(compiled.readonly);
//! ```
//!
//! [`SelectStatement`]: sea_query::SelectStatement

pub mod alias;
pub mod associations;
pub mod compiler;
pub mod errors;
pub mod execution;
pub mod inflector;
pub mod join_condition;
pub mod join_graph;
pub mod predicate;
pub mod query;
pub mod reflection;
pub mod registry;
pub mod sanitizer;
pub mod settings;

pub use alias::AliasTracker;
pub use associations::ensure_assignable;
pub use compiler::{CompiledQuery, QueryCompiler};
pub use errors::{OrmError, Result};
pub use execution::{ExecutionError, Loaded, QueryExecutor, Row};
pub use join_condition::{JoinConditionCompiler, JoinStep};
pub use join_graph::{AssociationRef, JoinGraph, JoinNode, JoinRef, JoinType, RawJoin};
pub use predicate::{
	AttributeValue, Attributes, Column, FilterValue, Predicate, PredicateBuilder, Relation,
	SqlFragment, WhereInput,
};
pub use query::{Clause, FromSource, LockMode, NullsOrder, OrderDirection, OrderExpr, QuerySpec};
pub use reflection::{AssociationMacro, JoinKind, Reflection, ScopeConditions};
pub use registry::{Entity, EntityDescriptor, ModelRegistry, ReflectionRegistry};
pub use sanitizer::{BindSanitizer, Sanitizer};
pub use settings::{DbBackend, QuerySettings};
