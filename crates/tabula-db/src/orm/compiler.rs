//! Statement assembly
//!
//! [`QueryCompiler`] turns a [`QuerySpec`] into a sea-query
//! [`SelectStatement`]. It resolves the join graph, compiles each join's
//! ON-condition, folds WHERE predicates and infers the readonly flag. SQL
//! text is only produced on request through [`CompiledQuery::to_sql`].

use super::errors::{OrmError, Result};
use super::join_condition::{JoinConditionCompiler, compile_all};
use super::join_graph::{AssociationRef, JoinGraph, RawJoin};
use super::predicate::{ExprContext, FilterValue, Predicate, Relation, fold_predicates};
use super::query::{LockMode, NullsOrder, OrderDirection, QuerySpec};
use super::registry::ReflectionRegistry;
use super::sanitizer::{BindSanitizer, Sanitizer};
use super::settings::{DbBackend, QuerySettings};
use sea_query::{
	Alias, Asterisk, Cond, Condition, Expr, LockType, MysqlQueryBuilder, NullOrdering, Order,
	PostgresQueryBuilder, Query, QueryStatementWriter, SelectStatement, SqliteQueryBuilder, Values,
};

/// A compiled statement plus what the executor needs alongside it
#[derive(Debug, Clone)]
pub struct CompiledQuery {
	pub statement: SelectStatement,
	/// Whether loaded rows must be treated as read-only
	pub readonly: bool,
	/// Positional values appended with [`QuerySpec::bind`]
	pub binds: Vec<FilterValue>,
	/// Backend the statement was compiled for
	pub backend: DbBackend,
	/// Associations the executor loads with follow-up queries
	pub preloads: Vec<AssociationRef>,
}

impl CompiledQuery {
	/// Render with inlined values
	pub fn to_sql(&self) -> String {
		match self.backend {
			DbBackend::Postgres => self.statement.to_string(PostgresQueryBuilder),
			DbBackend::Mysql => self.statement.to_string(MysqlQueryBuilder),
			DbBackend::Sqlite => self.statement.to_string(SqliteQueryBuilder),
		}
	}

	/// Render with placeholders and the collected values
	pub fn build(&self) -> (String, Values) {
		match self.backend {
			DbBackend::Postgres => self.statement.build(PostgresQueryBuilder),
			DbBackend::Mysql => self.statement.build(MysqlQueryBuilder),
			DbBackend::Sqlite => self.statement.build(SqliteQueryBuilder),
		}
	}
}

/// Compiles query specifications against a registry
///
/// # Examples
///
/// ```
/// use tabula_db::orm::reflection::Reflection;
/// use tabula_db::orm::registry::{EntityDescriptor, ModelRegistry};
/// use tabula_db::orm::{QueryCompiler, QuerySettings, QuerySpec};
///
/// let mut registry = ModelRegistry::new();
/// registry
///     .register(EntityDescriptor::new("Author").with_reflection(Reflection::has_many("posts")))
///     .unwrap()
///     .register(EntityDescriptor::new("Post"))
///     .unwrap();
///
/// let settings = QuerySettings::default();
/// let compiler = QueryCompiler::new(&registry, &settings);
/// let spec = QuerySpec::for_entity(&registry, "Author").unwrap().joins("posts");
/// let compiled = compiler.compile(&spec).unwrap();
///
/// assert_eq!(
///     compiled.to_sql(),
///     r#"SELECT "authors".* FROM "authors" INNER JOIN "posts" ON "posts"."author_id" = "authors"."id""#
/// );
/// assert!(compiled.readonly);
/// ```
pub struct QueryCompiler<'a> {
	registry: &'a dyn ReflectionRegistry,
	settings: &'a QuerySettings,
	sanitizer: Option<&'a dyn Sanitizer>,
	bind_sanitizer: BindSanitizer,
}

impl<'a> QueryCompiler<'a> {
	pub fn new(registry: &'a dyn ReflectionRegistry, settings: &'a QuerySettings) -> Self {
		Self {
			registry,
			settings,
			sanitizer: None,
			bind_sanitizer: BindSanitizer::new(settings.backend),
		}
	}

	/// Use another sanitizer for raw fragments
	pub fn with_sanitizer(mut self, sanitizer: &'a dyn Sanitizer) -> Self {
		self.sanitizer = Some(sanitizer);
		self
	}

	fn sanitizer(&self) -> &dyn Sanitizer {
		match self.sanitizer {
			Some(sanitizer) => sanitizer,
			None => &self.bind_sanitizer,
		}
	}

	pub fn settings(&self) -> &QuerySettings {
		self.settings
	}

	/// Resolve and assemble in one step
	pub fn compile(&self, spec: &QuerySpec) -> Result<CompiledQuery> {
		let graph = self.resolve_joins(spec)?;
		self.build(spec, &graph)
	}

	/// Resolve the specification's join references into a graph
	///
	/// Eager loaded associations follow the explicit joins as outer joins, so
	/// an association that is also joined keeps its inner join.
	pub fn resolve_joins(&self, spec: &QuerySpec) -> Result<JoinGraph> {
		let eager = spec.eager_load_joins();
		if eager.is_empty() {
			return JoinGraph::resolve(self.registry, self.settings, spec.entity(), spec.joins_values());
		}
		let mut join_refs = spec.joins_values().to_vec();
		join_refs.extend(eager);
		JoinGraph::resolve(self.registry, self.settings, spec.entity(), &join_refs)
	}

	/// Assemble the statement for `spec` using an already resolved graph
	pub fn build(&self, spec: &QuerySpec, graph: &JoinGraph) -> Result<CompiledQuery> {
		let mut stmt = Query::select();

		match spec.from_value() {
			Some(source) => match &source.alias {
				Some(alias) => stmt.from_as(Alias::new(&source.table), Alias::new(alias)),
				None => stmt.from(Alias::new(&source.table)),
			},
			None => stmt.from(Alias::new(spec.table())),
		};

		for raw in graph.raw_joins() {
			apply_raw_join(&mut stmt, raw);
		}
		let join_compiler = JoinConditionCompiler::new(self.registry, self.sanitizer());
		for step in compile_all(&join_compiler, graph.nodes())? {
			if step.table == step.alias {
				stmt.join(step.join_type.into(), Alias::new(&step.table), step.on);
			} else {
				stmt.join_as(
					step.join_type.into(),
					Alias::new(&step.table),
					Alias::new(&step.alias),
					step.on,
				);
			}
		}

		let resolve = |relation: &Relation| self.resolve_relation(spec, graph, relation);
		let ctx = ExprContext {
			table: spec.table(),
			resolve: &resolve,
			sanitizer: self.sanitizer(),
		};

		let wheres = unique_predicates(spec.where_values());
		if !wheres.is_empty() {
			stmt.cond_where(self.fold_where(&wheres, &ctx)?);
		}
		let havings = unique_predicates(spec.having_values());
		if !havings.is_empty() {
			let mut having = Cond::all();
			for predicate in &havings {
				having = having.add(predicate.to_condition(&ctx)?);
			}
			stmt.cond_having(having);
		}

		if let Some(limit) = spec.limit_value() {
			stmt.limit(limit);
		}
		if let Some(offset) = spec.offset_value() {
			stmt.offset(offset);
		}
		if !spec.group_values().is_empty() {
			stmt.add_group_by(spec.group_values().iter().map(|group| Expr::cust(group.as_str())));
		}
		for order in spec.order_values() {
			// A clause without a direction sorts ascending, which sea-query spells out
			let direction = match order.direction {
				Some(OrderDirection::Desc) => Order::Desc,
				Some(OrderDirection::Asc) | None => Order::Asc,
			};
			let expr = Expr::cust(order.expr.as_str());
			match order.nulls {
				Some(NullsOrder::First) => stmt.order_by_expr_with_nulls(expr, direction, NullOrdering::First),
				Some(NullsOrder::Last) => stmt.order_by_expr_with_nulls(expr, direction, NullOrdering::Last),
				None => stmt.order_by_expr(expr, direction),
			};
		}

		if spec.select_values().is_empty() {
			let star_table = spec
				.from_value()
				.and_then(|source| source.alias.as_deref())
				.unwrap_or(spec.table());
			stmt.column((Alias::new(star_table), Asterisk));
		} else {
			for column in spec.select_values() {
				stmt.expr(Expr::cust(column.as_str()));
			}
		}

		if let Some(lock) = spec.lock_value() {
			stmt.lock(match lock {
				LockMode::Update => LockType::Update,
				LockMode::NoKeyUpdate => LockType::NoKeyUpdate,
				LockMode::Share => LockType::Share,
				LockMode::KeyShare => LockType::KeyShare,
			});
		}

		// Outer joins added for eager loading alone do not make rows read-only
		let implicit_readonly = spec.select_values().is_empty() && !spec.joins_values().is_empty();
		let readonly = spec.readonly_value().unwrap_or(implicit_readonly);
		tracing::debug!(
			entity = spec.entity(),
			joins = graph.nodes().len() + graph.raw_joins().len(),
			wheres = wheres.len(),
			implicit_readonly,
			readonly,
			"Assembled select statement"
		);

		Ok(CompiledQuery {
			statement: stmt,
			readonly,
			binds: spec.bind_values().to_vec(),
			backend: self.settings.backend,
			preloads: spec.preloads(),
		})
	}

	/// Equalities on the same column become alternatives; everything else is
	/// a conjunct
	fn fold_where(&self, predicates: &[Predicate], ctx: &ExprContext<'_>) -> Result<Condition> {
		let folded = fold_predicates(predicates);
		let mut condition = Cond::all();
		for (column, group) in &folded.equality_groups {
			if group.len() > 1 {
				tracing::trace!(column = %column.name, alternatives = group.len(), "Folded equality predicates");
			}
			let mut alternatives = Cond::any();
			for predicate in group {
				alternatives = alternatives.add(predicate.to_condition(ctx)?);
			}
			condition = condition.add(alternatives);
		}
		for predicate in &folded.others {
			condition = condition.add(predicate.to_condition(ctx)?);
		}
		Ok(condition)
	}

	/// Table or alias a predicate column refers to
	///
	/// An association path resolves to the alias of the joined node; when the
	/// association is not joined, to its target table.
	fn resolve_relation(&self, spec: &QuerySpec, graph: &JoinGraph, relation: &Relation) -> Result<String> {
		let path = match relation {
			Relation::Table(table) => return Ok(table.clone()),
			Relation::Association(path) => path,
		};
		if let Some(node) = graph.node_for_path(path) {
			return Ok(node.alias.clone());
		}

		let mut entity = spec.entity().to_string();
		for name in path {
			let reflection = self.registry.reflection_for(&entity, name)?;
			if reflection.is_polymorphic() {
				return Err(OrmError::EagerLoadPolymorphic {
					entity,
					association: name.clone(),
				});
			}
			entity = reflection
				.declared_class_name()
				.or(reflection.source_type())
				.map(str::to_string)
				.unwrap_or_else(|| reflection.class_name());
		}
		Ok(self.registry.entity(&entity)?.table_name().to_string())
	}
}

fn apply_raw_join(stmt: &mut SelectStatement, raw: &RawJoin) {
	let on = Expr::cust(raw.on.trim());
	match &raw.alias {
		Some(alias) => stmt.join_as(raw.join_type.into(), Alias::new(&raw.table), Alias::new(alias), on),
		None => stmt.join(raw.join_type.into(), Alias::new(&raw.table), on),
	};
}

/// Drop blank predicates and repeats, keeping first occurrences
fn unique_predicates(predicates: &[Predicate]) -> Vec<Predicate> {
	let mut unique: Vec<Predicate> = Vec::with_capacity(predicates.len());
	for predicate in predicates.iter().filter(|p| !p.is_blank()) {
		if !unique.contains(predicate) {
			unique.push(predicate.clone());
		}
	}
	unique
}
