//! Database query construction
//!
//! Re-exports the query specification builder and the association join
//! compiler.

pub use tabula_db::orm;
pub use tabula_db::orm::{
	CompiledQuery, ModelRegistry, OrmError, QueryCompiler, QueryExecutor, QuerySettings, QuerySpec,
	ReflectionRegistry,
};
