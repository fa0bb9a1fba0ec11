//! Sanitization of opaque SQL fragments
//!
//! Fragments are never parsed. The sanitizer only turns positional `?`
//! placeholders and their bind values into a parameterized expression; value
//! substitution itself happens when sea-query renders the statement.
//!
//! sea-query recognizes a different placeholder per backend (`$N` for
//! PostgreSQL, `?` otherwise), so the rewritten fragment is backend specific.
//! Quoted regions are copied verbatim and never hold placeholders.

use super::predicate::{FilterValue, SqlFragment};
use super::settings::DbBackend;
use sea_query::{Expr, SimpleExpr, Value};

/// Converts raw fragments into parameterizable expressions
///
/// `table` is the table or alias the fragment is evaluated against. For a
/// join's scope conditions that is the node's own alias.
pub trait Sanitizer: Send + Sync {
	fn sanitize(&self, fragment: &SqlFragment, table: &str) -> SimpleExpr;
}

/// Default sanitizer
///
/// Expands a list bind into one placeholder per element:
/// `id IN (?)` with `[1, 2]` becomes `id IN ($1, $2)` on PostgreSQL and
/// `id IN (?, ?)` elsewhere. Grouping under `AND` is left to sea-query.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindSanitizer {
	backend: DbBackend,
}

impl BindSanitizer {
	pub fn new(backend: DbBackend) -> Self {
		Self { backend }
	}

	pub fn backend(&self) -> DbBackend {
		self.backend
	}

	fn push_placeholder(&self, sql: &mut String, values: &mut Vec<Value>, value: &FilterValue) {
		values.push(value.to_value());
		match self.backend {
			DbBackend::Postgres => {
				sql.push('$');
				sql.push_str(&values.len().to_string());
			}
			DbBackend::Mysql | DbBackend::Sqlite => sql.push('?'),
		}
	}

	/// Text that renders as a literal `ch` inside a custom expression
	fn push_literal(&self, sql: &mut String, ch: char, in_word: bool) {
		match (self.backend, ch) {
			(DbBackend::Postgres, '$') if !in_word => sql.push_str("$$"),
			(DbBackend::Mysql | DbBackend::Sqlite, '?') => sql.push_str("??"),
			_ => sql.push(ch),
		}
	}
}

impl Sanitizer for BindSanitizer {
	fn sanitize(&self, fragment: &SqlFragment, _table: &str) -> SimpleExpr {
		let source = fragment.sql.trim();
		if fragment.binds.is_empty() {
			return Expr::cust(source);
		}

		let mut binds = fragment.binds.iter();
		let mut sql = String::with_capacity(source.len() + 8);
		let mut values: Vec<Value> = Vec::with_capacity(fragment.binds.len());
		let mut quote: Option<char> = None;
		let mut escaped = false;
		let mut in_word = false;
		for ch in source.chars() {
			if let Some(close) = quote {
				sql.push(ch);
				if escaped {
					escaped = false;
				} else if ch == '\\' {
					escaped = true;
				} else if ch == close {
					quote = None;
				}
				continue;
			}
			match ch {
				'\'' | '"' | '`' => {
					quote = Some(ch);
					sql.push(ch);
				}
				'[' => {
					quote = Some(']');
					sql.push(ch);
				}
				'?' => match binds.next() {
					Some(value @ FilterValue::List(_)) => {
						let flattened = value.flatten();
						if flattened.is_empty() {
							sql.push_str("NULL");
						}
						for (index, element) in flattened.iter().enumerate() {
							if index > 0 {
								sql.push_str(", ");
							}
							self.push_placeholder(&mut sql, &mut values, element);
						}
					}
					Some(value) => self.push_placeholder(&mut sql, &mut values, value),
					None => {
						tracing::warn!(sql = %fragment.sql, "More placeholders than bind values");
						self.push_literal(&mut sql, ch, in_word);
					}
				},
				_ => self.push_literal(&mut sql, ch, in_word),
			}
			in_word = ch.is_alphanumeric() || (in_word && matches!(ch, '_' | '$'));
		}

		if binds.next().is_some() {
			tracing::warn!(sql = %fragment.sql, "Unused bind values in fragment");
		}

		Expr::cust_with_values(sql, values)
	}
}
