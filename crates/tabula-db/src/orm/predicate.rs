//! Predicate construction
//!
//! Filter inputs arrive in several shapes: raw SQL fragments with positional
//! binds, attribute maps (possibly nested by association name) and
//! pre-built predicate nodes. [`PredicateBuilder`] normalizes all of them into
//! a flat list of [`Predicate`] nodes against one table.

use super::errors::Result;
use super::sanitizer::Sanitizer;
use indexmap::IndexMap;
use sea_query::{Alias, Cond, Condition, Expr, Value};
use serde::{Deserialize, Serialize};

/// A literal value used in a predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
	Null,
	Boolean(bool),
	Integer(i64),
	Float(f64),
	String(String),
	/// Multi-valued; compiles to `IN (...)`
	List(Vec<FilterValue>),
}

impl FilterValue {
	/// Convert a scalar into a bindable sea-query value
	///
	/// Lists are flattened by callers before binding; a list reaching this
	/// point binds as `NULL`.
	pub fn to_value(&self) -> Value {
		match self {
			Self::Boolean(v) => Value::from(*v),
			Self::Integer(v) => Value::from(*v),
			Self::Float(v) => Value::from(*v),
			Self::String(v) => Value::from(v.clone()),
			Self::Null | Self::List(_) => Value::String(None),
		}
	}

	/// Flatten nested lists into scalar values, preserving order
	pub fn flatten(&self) -> Vec<FilterValue> {
		match self {
			Self::List(items) => items.iter().flat_map(FilterValue::flatten).collect(),
			other => vec![other.clone()],
		}
	}
}

impl From<String> for FilterValue {
	fn from(s: String) -> Self {
		FilterValue::String(s)
	}
}

impl From<&str> for FilterValue {
	fn from(s: &str) -> Self {
		FilterValue::String(s.to_string())
	}
}

impl From<i64> for FilterValue {
	fn from(i: i64) -> Self {
		FilterValue::Integer(i)
	}
}

impl From<i32> for FilterValue {
	fn from(i: i32) -> Self {
		FilterValue::Integer(i as i64)
	}
}

impl From<f64> for FilterValue {
	fn from(f: f64) -> Self {
		FilterValue::Float(f)
	}
}

impl From<bool> for FilterValue {
	fn from(b: bool) -> Self {
		FilterValue::Boolean(b)
	}
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
	fn from(items: Vec<T>) -> Self {
		FilterValue::List(items.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(FilterValue::Null)
	}
}

/// An opaque SQL fragment with positional `?` binds
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
	pub sql: String,
	pub binds: Vec<FilterValue>,
}

impl SqlFragment {
	pub fn new(sql: impl Into<String>) -> Self {
		Self {
			sql: sql.into(),
			binds: Vec::new(),
		}
	}

	/// Attach positional bind values
	pub fn bind<I, V>(mut self, values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<FilterValue>,
	{
		self.binds.extend(values.into_iter().map(Into::into));
		self
	}

	pub fn is_blank(&self) -> bool {
		self.sql.trim().is_empty()
	}
}

/// The relation a column belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Relation {
	/// A table or alias referenced by name
	Table(String),
	/// The target of an association path from the base entity; resolved to
	/// the join graph's alias at compile time
	Association(Vec<String>),
}

/// A column qualified by its relation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
	pub relation: Relation,
	pub name: String,
}

impl Column {
	pub fn new(relation: Relation, name: impl Into<String>) -> Self {
		Self {
			relation,
			name: name.into(),
		}
	}

	/// Column on a named table
	pub fn of(table: impl Into<String>, name: impl Into<String>) -> Self {
		Self::new(Relation::Table(table.into()), name)
	}
}

/// A predicate node
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
	/// `column = value` (`IS NULL` for [`FilterValue::Null`])
	Equality { column: Column, value: FilterValue },
	/// `column IN (values)`
	In {
		column: Column,
		values: Vec<FilterValue>,
	},
	/// Opaque fragment, sanitized at compile time
	Sql(SqlFragment),
	And(Vec<Predicate>),
	Or(Vec<Predicate>),
	Not(Box<Predicate>),
}

impl Predicate {
	pub fn eq(column: Column, value: impl Into<FilterValue>) -> Self {
		Self::Equality {
			column,
			value: value.into(),
		}
	}

	pub fn sql(sql: impl Into<String>) -> Self {
		Self::Sql(SqlFragment::new(sql))
	}

	pub fn is_blank(&self) -> bool {
		match self {
			Self::Sql(fragment) => fragment.is_blank(),
			Self::And(items) | Self::Or(items) => items.iter().all(Predicate::is_blank),
			Self::Not(inner) => inner.is_blank(),
			Self::Equality { .. } | Self::In { .. } => false,
		}
	}

	/// Convert into a sea-query condition
	pub fn to_condition(&self, ctx: &ExprContext<'_>) -> Result<Condition> {
		let condition = match self {
			Self::Equality {
				column,
				value: FilterValue::Null,
			} => Cond::all().add(ctx.column(column)?.is_null()),
			Self::Equality {
				column,
				value: FilterValue::List(values),
			}
			| Self::In { column, values } => {
				let flattened: Vec<Value> = values
					.iter()
					.flat_map(FilterValue::flatten)
					.map(|v| v.to_value())
					.collect();
				Cond::all().add(ctx.column(column)?.is_in(flattened))
			}
			Self::Equality { column, value } => {
				Cond::all().add(ctx.column(column)?.eq(value.to_value()))
			}
			Self::Sql(fragment) => Cond::all().add(ctx.sanitizer.sanitize(fragment, ctx.table)),
			Self::And(items) => {
				let mut cond = Cond::all();
				for item in items.iter().filter(|p| !p.is_blank()) {
					cond = cond.add(item.to_condition(ctx)?);
				}
				cond
			}
			Self::Or(items) => {
				let mut cond = Cond::any();
				for item in items.iter().filter(|p| !p.is_blank()) {
					cond = cond.add(item.to_condition(ctx)?);
				}
				cond
			}
			Self::Not(inner) => inner.to_condition(ctx)?.not(),
		};
		Ok(condition)
	}
}

/// What a predicate needs to become an expression: the table raw fragments
/// are sanitized against, a resolver from [`Relation`] to the emitted table
/// name or alias, and the sanitizer
pub struct ExprContext<'a> {
	pub table: &'a str,
	pub resolve: &'a dyn Fn(&Relation) -> Result<String>,
	pub sanitizer: &'a dyn Sanitizer,
}

impl ExprContext<'_> {
	fn column(&self, column: &Column) -> Result<Expr> {
		let table = (self.resolve)(&column.relation)?;
		Ok(Expr::col((Alias::new(table), Alias::new(&column.name))))
	}
}

/// A value in an attribute map: a literal, or a nested map keyed by
/// association name
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
	Value(FilterValue),
	Nested(Attributes),
}

impl AttributeValue {
	/// The literal value, if this is not a nested map
	pub fn as_value(&self) -> Option<&FilterValue> {
		match self {
			Self::Value(value) => Some(value),
			Self::Nested(_) => None,
		}
	}
}

/// Ordered attribute map used for filters and `create_with` defaults
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes(IndexMap<String, AttributeValue>);

impl Attributes {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add `key = value`
	///
	/// A dotted key (`"posts.title"`) targets the named table directly.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
		self.0.insert(key.into(), AttributeValue::Value(value.into()));
		self
	}

	/// Add conditions on the target of the named association
	pub fn nested(mut self, association: impl Into<String>, attributes: Attributes) -> Self {
		self.0
			.insert(association.into(), AttributeValue::Nested(attributes));
		self
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn get(&self, key: &str) -> Option<&AttributeValue> {
		self.0.get(key)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
		self.0.iter()
	}

	/// Overlay `other` onto `self`; keys in `other` win
	pub fn merge(mut self, other: &Attributes) -> Self {
		for (key, value) in other.iter() {
			self.0.insert(key.clone(), value.clone());
		}
		self
	}
}

impl<K, V, const N: usize> From<[(K, V); N]> for Attributes
where
	K: Into<String>,
	V: Into<FilterValue>,
{
	fn from(pairs: [(K, V); N]) -> Self {
		pairs
			.into_iter()
			.fold(Attributes::new(), |attrs, (k, v)| attrs.with(k, v))
	}
}

/// Input accepted by `filter` and `having`
#[derive(Debug, Clone, PartialEq)]
pub enum WhereInput {
	Sql(SqlFragment),
	Attributes(Attributes),
	Predicates(Vec<Predicate>),
}

impl From<&str> for WhereInput {
	fn from(sql: &str) -> Self {
		WhereInput::Sql(SqlFragment::new(sql))
	}
}

impl From<String> for WhereInput {
	fn from(sql: String) -> Self {
		WhereInput::Sql(SqlFragment::new(sql))
	}
}

impl From<SqlFragment> for WhereInput {
	fn from(fragment: SqlFragment) -> Self {
		WhereInput::Sql(fragment)
	}
}

impl From<Attributes> for WhereInput {
	fn from(attributes: Attributes) -> Self {
		WhereInput::Attributes(attributes)
	}
}

impl<K, V, const N: usize> From<[(K, V); N]> for WhereInput
where
	K: Into<String>,
	V: Into<FilterValue>,
{
	fn from(pairs: [(K, V); N]) -> Self {
		WhereInput::Attributes(pairs.into())
	}
}

impl From<Predicate> for WhereInput {
	fn from(predicate: Predicate) -> Self {
		WhereInput::Predicates(vec![predicate])
	}
}

impl From<Vec<Predicate>> for WhereInput {
	fn from(predicates: Vec<Predicate>) -> Self {
		WhereInput::Predicates(predicates)
	}
}

impl<T: Into<WhereInput>> From<Option<T>> for WhereInput {
	fn from(input: Option<T>) -> Self {
		input
			.map(Into::into)
			.unwrap_or(WhereInput::Predicates(Vec::new()))
	}
}

/// Normalizes filter inputs into predicates against one table
pub struct PredicateBuilder<'a> {
	table: &'a str,
}

impl<'a> PredicateBuilder<'a> {
	pub fn new(table: &'a str) -> Self {
		Self { table }
	}

	/// Build predicates; blank input yields an empty list
	pub fn build(&self, input: WhereInput) -> Vec<Predicate> {
		match input {
			WhereInput::Sql(fragment) if fragment.is_blank() => Vec::new(),
			WhereInput::Sql(fragment) => vec![Predicate::Sql(fragment)],
			WhereInput::Attributes(attributes) => {
				let mut predicates = Vec::with_capacity(attributes.len());
				self.build_from_attributes(
					&attributes,
					&Relation::Table(self.table.to_string()),
					&mut predicates,
				);
				predicates
			}
			WhereInput::Predicates(predicates) => predicates
				.into_iter()
				.filter(|p| !p.is_blank())
				.collect(),
		}
	}

	fn build_from_attributes(
		&self,
		attributes: &Attributes,
		relation: &Relation,
		out: &mut Vec<Predicate>,
	) {
		for (key, value) in attributes.iter() {
			match value {
				AttributeValue::Value(value) => {
					let column = match key.split_once('.') {
						Some((table, name)) => Column::of(table, name),
						None => Column::new(relation.clone(), key.as_str()),
					};
					out.push(match value {
						FilterValue::List(values) => Predicate::In {
							column,
							values: values.clone(),
						},
						other => Predicate::Equality {
							column,
							value: other.clone(),
						},
					});
				}
				AttributeValue::Nested(inner) => {
					let path = match relation {
						Relation::Association(path) => {
							let mut path = path.clone();
							path.push(key.clone());
							path
						}
						Relation::Table(_) => vec![key.clone()],
					};
					self.build_from_attributes(inner, &Relation::Association(path), out);
				}
			}
		}
	}
}

/// Top-level predicates split for folding
///
/// Equalities are grouped by their column in first-seen order; every other
/// predicate stays in `others`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FoldedPredicates {
	pub equality_groups: Vec<(Column, Vec<Predicate>)>,
	pub others: Vec<Predicate>,
}

/// Group top-level equality predicates by column
///
/// Within a group the predicates are alternatives (OR); groups and the
/// remaining predicates are conjuncts (AND).
pub fn fold_predicates(predicates: &[Predicate]) -> FoldedPredicates {
	let mut groups: IndexMap<Column, Vec<Predicate>> = IndexMap::new();
	let mut others = Vec::new();
	for predicate in predicates {
		match predicate {
			Predicate::Equality { column, .. } => {
				groups
					.entry(column.clone())
					.or_default()
					.push(predicate.clone());
			}
			other => others.push(other.clone()),
		}
	}
	FoldedPredicates {
		equality_groups: groups.into_iter().collect(),
		others,
	}
}
