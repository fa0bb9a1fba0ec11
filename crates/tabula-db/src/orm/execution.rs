//! # Query Execution
//!
//! The executor seam. Compilation is synchronous and does no I/O; running the
//! compiled statement is delegated to a [`QueryExecutor`], which owns
//! connections, retries and timeouts.

use super::compiler::{CompiledQuery, QueryCompiler};
use super::errors::Result;
use super::predicate::FilterValue;
use super::query::QuerySpec;
use indexmap::IndexMap;

/// One loaded row, keyed by column name in select order
pub type Row = IndexMap<String, FilterValue>;

/// Errors raised by an executor
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
	/// The database rejected the statement
	#[error("Database error: {0}")]
	Database(String),

	/// No connection could be obtained
	#[error("Connection unavailable: {0}")]
	Connection(String),

	/// A row could not be decoded
	#[error("Failed to decode row: {0}")]
	Decode(String),
}

/// Runs compiled statements
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
	async fn execute(&self, query: &CompiledQuery) -> std::result::Result<Vec<Row>, ExecutionError>;
}

/// Rows returned by [`QueryCompiler::load`]
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
	pub rows: Vec<Row>,
	/// Rows came from a join without an explicit projection, or were marked
	/// read-only explicitly
	pub readonly: bool,
}

impl QueryCompiler<'_> {
	/// Compile `spec` and run it on `executor`
	///
	/// Compilation errors are returned before the executor is called.
	pub async fn load<E>(&self, spec: &QuerySpec, executor: &E) -> Result<Loaded>
	where
		E: QueryExecutor + ?Sized,
	{
		let compiled = self.compile(spec)?;
		tracing::debug!(entity = spec.entity(), readonly = compiled.readonly, "Executing query");
		let rows = executor.execute(&compiled).await?;
		Ok(Loaded {
			rows,
			readonly: compiled.readonly,
		})
	}
}
