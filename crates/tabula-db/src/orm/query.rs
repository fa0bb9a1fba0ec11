//! Chainable query specification
//!
//! A [`QuerySpec`] accumulates clauses for one entity. Every clause method
//! takes `&self` and returns a new specification; the receiver is never
//! changed, so a specification can be kept around and reused as a template:
//!
//! ```
//! use tabula_db::orm::QuerySpec;
//!
//! let authors = QuerySpec::new("Author", "authors", "id");
//! let davids = authors.filter([("name", "David")]);
//! let recent = davids.order("created_at DESC").limit(10);
//!
//! assert!(authors.where_values().is_empty());
//! assert_eq!(davids.where_values().len(), 1);
//! assert_eq!(recent.limit_value(), Some(10));
//! assert_eq!(davids.limit_value(), None);
//! ```
//!
//! List clauses share their storage between specifications until one of
//! them appends to it.

use super::errors::Result;
use super::join_graph::{AssociationRef, JoinNode, JoinRef, RawJoin};
use super::predicate::{
	Attributes, Column, FilterValue, Predicate, PredicateBuilder, Relation, WhereInput,
};
use super::registry::ReflectionRegistry;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Sort direction of an order clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
	Asc,
	Desc,
}

impl OrderDirection {
	pub fn reverse(self) -> Self {
		match self {
			Self::Asc => Self::Desc,
			Self::Desc => Self::Asc,
		}
	}
}

/// Placement of NULLs within an order clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
	First,
	Last,
}

impl NullsOrder {
	pub fn reverse(self) -> Self {
		match self {
			Self::First => Self::Last,
			Self::Last => Self::First,
		}
	}
}

/// One order clause: an opaque expression, an optional direction and an
/// optional NULLs placement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderExpr {
	pub expr: String,
	pub direction: Option<OrderDirection>,
	pub nulls: Option<NullsOrder>,
}

impl OrderExpr {
	pub fn new(expr: impl Into<String>, direction: Option<OrderDirection>) -> Self {
		Self {
			expr: expr.into(),
			direction,
			nulls: None,
		}
	}

	pub fn with_nulls(mut self, nulls: NullsOrder) -> Self {
		self.nulls = Some(nulls);
		self
	}

	/// Split an order string into clauses at top-level commas
	///
	/// Commas inside parentheses or quotes stay in their clause. A trailing
	/// `NULLS FIRST`/`NULLS LAST` and then a trailing `ASC`/`DESC` (any case)
	/// are lifted out; everything else is kept verbatim.
	pub fn parse(text: &str) -> Vec<OrderExpr> {
		split_top_level(text)
			.into_iter()
			.map(str::trim)
			.filter(|part| !part.is_empty())
			.map(OrderExpr::parse_clause)
			.collect()
	}

	fn parse_clause(part: &str) -> OrderExpr {
		let mut rest = part;
		let mut nulls = None;
		if let Some((head, placement)) = split_last_word(rest) {
			let placement = if placement.eq_ignore_ascii_case("first") {
				Some(NullsOrder::First)
			} else if placement.eq_ignore_ascii_case("last") {
				Some(NullsOrder::Last)
			} else {
				None
			};
			if let (Some(placement), Some((head, keyword))) = (placement, split_last_word(head)) {
				if keyword.eq_ignore_ascii_case("nulls") && !head.is_empty() {
					nulls = Some(placement);
					rest = head;
				}
			}
		}

		let mut direction = None;
		if let Some((head, token)) = split_last_word(rest) {
			if !head.is_empty() {
				if token.eq_ignore_ascii_case("asc") {
					direction = Some(OrderDirection::Asc);
					rest = head;
				} else if token.eq_ignore_ascii_case("desc") {
					direction = Some(OrderDirection::Desc);
					rest = head;
				}
			}
		}

		OrderExpr {
			expr: rest.to_string(),
			direction,
			nulls,
		}
	}

	/// Flip the direction and the NULLs placement; a clause without a
	/// direction becomes descending
	pub fn reversed(&self) -> Self {
		Self {
			expr: self.expr.clone(),
			direction: Some(
				self.direction
					.map(OrderDirection::reverse)
					.unwrap_or(OrderDirection::Desc),
			),
			nulls: self.nulls.map(NullsOrder::reverse),
		}
	}
}

impl fmt::Display for OrderExpr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.expr)?;
		match self.direction {
			Some(OrderDirection::Asc) => f.write_str(" ASC")?,
			Some(OrderDirection::Desc) => f.write_str(" DESC")?,
			None => {}
		}
		match self.nulls {
			Some(NullsOrder::First) => f.write_str(" NULLS FIRST"),
			Some(NullsOrder::Last) => f.write_str(" NULLS LAST"),
			None => Ok(()),
		}
	}
}

/// Split at commas outside parentheses and quoted text
fn split_top_level(text: &str) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut depth = 0usize;
	let mut quote: Option<char> = None;
	let mut start = 0;
	for (index, ch) in text.char_indices() {
		match quote {
			Some(close) if ch == close => quote = None,
			Some(_) => {}
			None => match ch {
				'\'' | '"' | '`' => quote = Some(ch),
				'(' => depth += 1,
				')' => depth = depth.saturating_sub(1),
				',' if depth == 0 => {
					parts.push(&text[start..index]);
					start = index + 1;
				}
				_ => {}
			},
		}
	}
	parts.push(&text[start..]);
	parts
}

/// `("a b", "c")` for `"a b c"`; the head is trimmed
fn split_last_word(text: &str) -> Option<(&str, &str)> {
	text.trim_end()
		.rsplit_once(char::is_whitespace)
		.map(|(head, word)| (head.trim_end(), word))
}

/// Row lock requested with the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockMode {
	/// `FOR UPDATE`
	Update,
	/// `FOR NO KEY UPDATE`
	NoKeyUpdate,
	/// `FOR SHARE`
	Share,
	/// `FOR KEY SHARE`
	KeyShare,
}

/// Replacement for the base table in the FROM clause
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FromSource {
	pub table: String,
	pub alias: Option<String>,
}

impl From<&str> for FromSource {
	fn from(table: &str) -> Self {
		Self {
			table: table.to_string(),
			alias: None,
		}
	}
}

impl From<(&str, &str)> for FromSource {
	fn from((table, alias): (&str, &str)) -> Self {
		Self {
			table: table.to_string(),
			alias: Some(alias.to_string()),
		}
	}
}

/// Clause names accepted by [`QuerySpec::except`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clause {
	Select,
	Group,
	Order,
	Joins,
	Where,
	Having,
	Bind,
	Limit,
	Offset,
	Lock,
	Readonly,
	CreateWith,
	From,
	Includes,
	EagerLoad,
	Preload,
}

/// Arguments accepted by list clauses
///
/// Blank strings, `None` and empty collections produce no items.
pub trait IntoClauseList<T> {
	fn into_clause_list(self) -> Vec<T>;
}

impl IntoClauseList<String> for &str {
	fn into_clause_list(self) -> Vec<String> {
		let trimmed = self.trim();
		if trimmed.is_empty() {
			Vec::new()
		} else {
			vec![trimmed.to_string()]
		}
	}
}

impl IntoClauseList<String> for String {
	fn into_clause_list(self) -> Vec<String> {
		self.as_str().into_clause_list()
	}
}

impl IntoClauseList<OrderExpr> for &str {
	fn into_clause_list(self) -> Vec<OrderExpr> {
		OrderExpr::parse(self)
	}
}

impl IntoClauseList<OrderExpr> for String {
	fn into_clause_list(self) -> Vec<OrderExpr> {
		OrderExpr::parse(&self)
	}
}

impl IntoClauseList<OrderExpr> for OrderExpr {
	fn into_clause_list(self) -> Vec<OrderExpr> {
		if self.expr.trim().is_empty() {
			Vec::new()
		} else {
			vec![self]
		}
	}
}

impl IntoClauseList<AssociationRef> for &str {
	fn into_clause_list(self) -> Vec<AssociationRef> {
		AssociationRef::new(self.trim()).into_clause_list()
	}
}

impl IntoClauseList<AssociationRef> for String {
	fn into_clause_list(self) -> Vec<AssociationRef> {
		self.as_str().into_clause_list()
	}
}

impl IntoClauseList<AssociationRef> for AssociationRef {
	fn into_clause_list(self) -> Vec<AssociationRef> {
		if self.is_blank() { Vec::new() } else { vec![self] }
	}
}

impl IntoClauseList<JoinRef> for &str {
	fn into_clause_list(self) -> Vec<JoinRef> {
		AssociationRef::new(self.trim()).into_clause_list()
	}
}

impl IntoClauseList<JoinRef> for String {
	fn into_clause_list(self) -> Vec<JoinRef> {
		self.as_str().into_clause_list()
	}
}

impl IntoClauseList<JoinRef> for JoinRef {
	fn into_clause_list(self) -> Vec<JoinRef> {
		if self.is_blank() { Vec::new() } else { vec![self] }
	}
}

impl IntoClauseList<JoinRef> for AssociationRef {
	fn into_clause_list(self) -> Vec<JoinRef> {
		JoinRef::Association(self).into_clause_list()
	}
}

impl IntoClauseList<JoinRef> for RawJoin {
	fn into_clause_list(self) -> Vec<JoinRef> {
		JoinRef::Raw(self).into_clause_list()
	}
}

impl IntoClauseList<JoinRef> for JoinNode {
	fn into_clause_list(self) -> Vec<JoinRef> {
		JoinRef::Resolved(self).into_clause_list()
	}
}

impl<T, U: IntoClauseList<T>> IntoClauseList<T> for Option<U> {
	fn into_clause_list(self) -> Vec<T> {
		self.map(IntoClauseList::into_clause_list).unwrap_or_default()
	}
}

impl<T, U: IntoClauseList<T>> IntoClauseList<T> for Vec<U> {
	fn into_clause_list(self) -> Vec<T> {
		self.into_iter().flat_map(IntoClauseList::into_clause_list).collect()
	}
}

impl<T, U: IntoClauseList<T>, const N: usize> IntoClauseList<T> for [U; N] {
	fn into_clause_list(self) -> Vec<T> {
		self.into_iter().flat_map(IntoClauseList::into_clause_list).collect()
	}
}

type PredicateList = SmallVec<[Predicate; 4]>;

/// Immutable, chainable query specification for one entity
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
	entity: String,
	table: String,
	primary_key: String,
	select_values: Arc<Vec<String>>,
	group_values: Arc<Vec<String>>,
	order_values: Arc<Vec<OrderExpr>>,
	joins_values: Arc<Vec<JoinRef>>,
	includes_values: Arc<Vec<AssociationRef>>,
	eager_load_values: Arc<Vec<AssociationRef>>,
	preload_values: Arc<Vec<AssociationRef>>,
	where_values: Arc<PredicateList>,
	having_values: Arc<PredicateList>,
	bind_values: Arc<Vec<FilterValue>>,
	limit_value: Option<u64>,
	offset_value: Option<u64>,
	lock_value: Option<LockMode>,
	readonly_value: Option<bool>,
	create_with_value: Option<Attributes>,
	from_value: Option<FromSource>,
}

impl QuerySpec {
	/// An unfiltered specification over `table`
	pub fn new(
		entity: impl Into<String>,
		table: impl Into<String>,
		primary_key: impl Into<String>,
	) -> Self {
		Self {
			entity: entity.into(),
			table: table.into(),
			primary_key: primary_key.into(),
			select_values: Arc::default(),
			group_values: Arc::default(),
			order_values: Arc::default(),
			joins_values: Arc::default(),
			includes_values: Arc::default(),
			eager_load_values: Arc::default(),
			preload_values: Arc::default(),
			where_values: Arc::default(),
			having_values: Arc::default(),
			bind_values: Arc::default(),
			limit_value: None,
			offset_value: None,
			lock_value: None,
			readonly_value: None,
			create_with_value: None,
			from_value: None,
		}
	}

	/// The base scope of a registered entity
	///
	/// A single-table-inheritance subclass is restricted to its own type and
	/// the types of its descendants.
	pub fn for_entity(registry: &dyn ReflectionRegistry, class_name: &str) -> Result<Self> {
		let entity = registry.entity(class_name)?;
		let spec = Self::new(entity.class_name(), entity.table_name(), entity.primary_key());
		if registry.descends_from_base(class_name)? {
			return Ok(spec);
		}

		let mut types = vec![FilterValue::from(entity.sti_name())];
		types.extend(
			registry
				.subclasses_of(class_name)?
				.into_iter()
				.map(|subclass| FilterValue::from(subclass.sti_name())),
		);
		Ok(spec.filter(Predicate::In {
			column: Column::of(entity.table_name(), registry.inheritance_column_name(class_name)?),
			values: types,
		}))
	}

	/// Add WHERE predicates; blank input is a no-op
	///
	/// Named `filter` because `where` is a keyword.
	pub fn filter(&self, condition: impl Into<WhereInput>) -> Self {
		let predicates = PredicateBuilder::new(&self.table).build(condition.into());
		if predicates.is_empty() {
			return self.clone();
		}
		let mut spec = self.clone();
		Arc::make_mut(&mut spec.where_values).extend(predicates);
		spec
	}

	/// Add HAVING predicates; blank input is a no-op
	pub fn having(&self, condition: impl Into<WhereInput>) -> Self {
		let predicates = PredicateBuilder::new(&self.table).build(condition.into());
		if predicates.is_empty() {
			return self.clone();
		}
		let mut spec = self.clone();
		Arc::make_mut(&mut spec.having_values).extend(predicates);
		spec
	}

	pub fn select(&self, columns: impl IntoClauseList<String>) -> Self {
		let mut spec = self.clone();
		append_unique(&mut spec.select_values, columns.into_clause_list());
		spec
	}

	pub fn group(&self, columns: impl IntoClauseList<String>) -> Self {
		let mut spec = self.clone();
		append_unique(&mut spec.group_values, columns.into_clause_list());
		spec
	}

	pub fn order(&self, orders: impl IntoClauseList<OrderExpr>) -> Self {
		let mut spec = self.clone();
		append_unique(&mut spec.order_values, orders.into_clause_list());
		spec
	}

	/// Add joins: association names, nested [`AssociationRef`]s, raw joins or
	/// nodes resolved in another graph
	pub fn joins(&self, joins: impl IntoClauseList<JoinRef>) -> Self {
		let mut spec = self.clone();
		append_unique(&mut spec.joins_values, joins.into_clause_list());
		spec
	}

	/// Load associations along with the records
	///
	/// Included associations are eager loaded through outer joins when the
	/// query references tables it does not join; otherwise they are
	/// preloaded. Repeats are dropped.
	pub fn includes(&self, associations: impl IntoClauseList<AssociationRef>) -> Self {
		let mut spec = self.clone();
		append_unique(&mut spec.includes_values, associations.into_clause_list());
		spec
	}

	/// Load associations through `LEFT OUTER JOIN`s of this query
	pub fn eager_load(&self, associations: impl IntoClauseList<AssociationRef>) -> Self {
		let associations = associations.into_clause_list();
		if associations.is_empty() {
			return self.clone();
		}
		let mut spec = self.clone();
		Arc::make_mut(&mut spec.eager_load_values).extend(associations);
		spec
	}

	/// Load associations with separate queries after this one
	pub fn preload(&self, associations: impl IntoClauseList<AssociationRef>) -> Self {
		let associations = associations.into_clause_list();
		if associations.is_empty() {
			return self.clone();
		}
		let mut spec = self.clone();
		Arc::make_mut(&mut spec.preload_values).extend(associations);
		spec
	}

	/// Append a positional bind value for the executor
	pub fn bind(&self, value: impl Into<FilterValue>) -> Self {
		let mut spec = self.clone();
		Arc::make_mut(&mut spec.bind_values).push(value.into());
		spec
	}

	pub fn limit(&self, limit: u64) -> Self {
		Self {
			limit_value: Some(limit),
			..self.clone()
		}
	}

	pub fn offset(&self, offset: u64) -> Self {
		Self {
			offset_value: Some(offset),
			..self.clone()
		}
	}

	/// Request a row lock; `None` clears it
	pub fn lock(&self, mode: impl Into<Option<LockMode>>) -> Self {
		Self {
			lock_value: mode.into(),
			..self.clone()
		}
	}

	/// Force the readonly flag of loaded rows, overriding inference
	pub fn readonly(&self, readonly: bool) -> Self {
		Self {
			readonly_value: Some(readonly),
			..self.clone()
		}
	}

	/// Default attributes for records built from this scope
	pub fn create_with(&self, attributes: impl Into<Attributes>) -> Self {
		Self {
			create_with_value: Some(attributes.into()),
			..self.clone()
		}
	}

	/// Read from another table instead of the base table
	pub fn from(&self, source: impl Into<FromSource>) -> Self {
		Self {
			from_value: Some(source.into()),
			..self.clone()
		}
	}

	/// Reset the named clauses
	pub fn except(&self, clauses: &[Clause]) -> Self {
		let mut spec = self.clone();
		for clause in clauses {
			match clause {
				Clause::Select => spec.select_values = Arc::default(),
				Clause::Group => spec.group_values = Arc::default(),
				Clause::Order => spec.order_values = Arc::default(),
				Clause::Joins => spec.joins_values = Arc::default(),
				Clause::Where => spec.where_values = Arc::default(),
				Clause::Having => spec.having_values = Arc::default(),
				Clause::Bind => spec.bind_values = Arc::default(),
				Clause::Limit => spec.limit_value = None,
				Clause::Offset => spec.offset_value = None,
				Clause::Lock => spec.lock_value = None,
				Clause::Readonly => spec.readonly_value = None,
				Clause::CreateWith => spec.create_with_value = None,
				Clause::From => spec.from_value = None,
				Clause::Includes => spec.includes_values = Arc::default(),
				Clause::EagerLoad => spec.eager_load_values = Arc::default(),
				Clause::Preload => spec.preload_values = Arc::default(),
			}
		}
		spec
	}

	/// Reverse the ordering
	///
	/// Without order clauses this orders by the primary key, descending.
	pub fn reverse_order(&self) -> Self {
		let orders = if self.order_values.is_empty() {
			vec![OrderExpr::new(
				format!("{}.{}", self.table, self.primary_key),
				Some(OrderDirection::Desc),
			)]
		} else {
			self.order_values.iter().map(OrderExpr::reversed).collect()
		};
		let mut spec = self.except(&[Clause::Order]);
		spec.order_values = Arc::new(orders);
		spec
	}

	/// Attributes for records created through this scope
	///
	/// Equalities on the base table's columns, overlaid with the
	/// `create_with` attributes.
	pub fn scope_for_create(&self) -> Attributes {
		let base = Relation::Table(self.table.clone());
		let scoped = self
			.where_values
			.iter()
			.filter_map(|predicate| match predicate {
				Predicate::Equality { column, value } if column.relation == base => {
					Some((column.name.clone(), value.clone()))
				}
				_ => None,
			})
			.fold(Attributes::new(), |attrs, (name, value)| attrs.with(name, value));
		match &self.create_with_value {
			Some(defaults) => scoped.merge(defaults),
			None => scoped,
		}
	}

	pub fn entity(&self) -> &str {
		&self.entity
	}

	pub fn table(&self) -> &str {
		&self.table
	}

	pub fn primary_key(&self) -> &str {
		&self.primary_key
	}

	pub fn select_values(&self) -> &[String] {
		&self.select_values
	}

	pub fn group_values(&self) -> &[String] {
		&self.group_values
	}

	pub fn order_values(&self) -> &[OrderExpr] {
		&self.order_values
	}

	pub fn joins_values(&self) -> &[JoinRef] {
		&self.joins_values
	}

	pub fn includes_values(&self) -> &[AssociationRef] {
		&self.includes_values
	}

	pub fn eager_load_values(&self) -> &[AssociationRef] {
		&self.eager_load_values
	}

	pub fn preload_values(&self) -> &[AssociationRef] {
		&self.preload_values
	}

	/// Whether associations are loaded through joins of this query
	pub fn eager_loading(&self) -> bool {
		!self.eager_load_values.is_empty()
			|| (!self.includes_values.is_empty() && self.references_eager_loaded_tables())
	}

	/// Associations joined for eager loading, all as outer joins
	pub fn eager_load_joins(&self) -> Vec<JoinRef> {
		if !self.eager_loading() {
			return Vec::new();
		}
		self.eager_load_values
			.iter()
			.chain(self.includes_values.iter())
			.map(|association| JoinRef::Association(association.outer_tree()))
			.collect()
	}

	/// Associations loaded with follow-up queries
	pub fn preloads(&self) -> Vec<AssociationRef> {
		let mut preloads = self.preload_values.to_vec();
		if !self.eager_loading() {
			preloads.extend(self.includes_values.iter().cloned());
		}
		preloads
	}

	/// Predicates or order clauses name a table that is neither the base
	/// table nor joined
	fn references_eager_loaded_tables(&self) -> bool {
		let mut joined: Vec<String> = vec![self.table.to_lowercase()];
		if let Some(source) = &self.from_value {
			joined.push(source.table.to_lowercase());
			joined.extend(source.alias.as_ref().map(|alias| alias.to_lowercase()));
		}
		for join in self.joins_values.iter() {
			match join {
				JoinRef::Raw(raw) => joined.push(raw.reference_name().to_lowercase()),
				JoinRef::Association(association) => joined.push(association.name().to_lowercase()),
				JoinRef::Resolved(node) => joined.push(node.alias.to_lowercase()),
			}
		}

		let mut referenced = Vec::new();
		for predicate in self.where_values.iter().chain(self.having_values.iter()) {
			collect_predicate_tables(predicate, &mut referenced);
		}
		for order in self.order_values.iter() {
			referenced.extend(tables_in_sql(&order.expr));
		}
		referenced
			.iter()
			.any(|table| !joined.contains(&table.to_lowercase()))
	}

	pub fn where_values(&self) -> &[Predicate] {
		&self.where_values
	}

	pub fn having_values(&self) -> &[Predicate] {
		&self.having_values
	}

	pub fn bind_values(&self) -> &[FilterValue] {
		&self.bind_values
	}

	pub fn limit_value(&self) -> Option<u64> {
		self.limit_value
	}

	pub fn offset_value(&self) -> Option<u64> {
		self.offset_value
	}

	pub fn lock_value(&self) -> Option<LockMode> {
		self.lock_value
	}

	pub fn readonly_value(&self) -> Option<bool> {
		self.readonly_value
	}

	pub fn create_with_value(&self) -> Option<&Attributes> {
		self.create_with_value.as_ref()
	}

	pub fn from_value(&self) -> Option<&FromSource> {
		self.from_value.as_ref()
	}
}

fn collect_predicate_tables(predicate: &Predicate, tables: &mut Vec<String>) {
	match predicate {
		Predicate::Equality { column, .. } | Predicate::In { column, .. } => match &column.relation {
			Relation::Table(table) => tables.push(table.clone()),
			Relation::Association(path) => tables.extend(path.first().cloned()),
		},
		Predicate::Sql(fragment) => tables.extend(tables_in_sql(&fragment.sql)),
		Predicate::And(items) | Predicate::Or(items) => {
			for item in items {
				collect_predicate_tables(item, tables);
			}
		}
		Predicate::Not(inner) => collect_predicate_tables(inner, tables),
	}
}

/// Qualifiers of `qualifier.column` references in opaque SQL
fn tables_in_sql(sql: &str) -> Vec<String> {
	let mut tables = Vec::new();
	let mut word = String::new();
	let mut quote: Option<char> = None;
	for ch in sql.chars() {
		if let Some(close) = quote {
			if ch == close {
				quote = None;
			}
			continue;
		}
		match ch {
			'\'' => {
				quote = Some(ch);
				word.clear();
			}
			'.' if !word.is_empty() => {
				if !word.starts_with(|c: char| c.is_ascii_digit()) {
					tables.push(std::mem::take(&mut word));
				}
				word.clear();
			}
			c if c.is_alphanumeric() || c == '_' => word.push(c),
			'"' | '`' => {}
			_ => word.clear(),
		}
	}
	tables
}

fn append_unique<T: Clone + PartialEq>(list: &mut Arc<Vec<T>>, items: Vec<T>) {
	if items.is_empty() {
		return;
	}
	let values = Arc::make_mut(list);
	for item in items {
		if !values.contains(&item) {
			values.push(item);
		}
	}
}
