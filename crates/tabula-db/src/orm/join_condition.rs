//! ON-conditions for association joins
//!
//! Every [`JoinNode`] compiles to one join step, or two when the association
//! goes through an intermediate table (the intermediate table first, then the
//! target). The join kind is matched exhaustively; a new kind will not
//! compile until it has a condition here.

use super::errors::{OrmError, Result};
use super::inflector;
use super::join_graph::{JoinNode, JoinType, ThroughChain};
use super::predicate::{ExprContext, PredicateBuilder, Relation, WhereInput};
use super::reflection::{AssociationMacro, JoinKind, ScopeConditions};
use super::registry::ReflectionRegistry;
use super::sanitizer::Sanitizer;
use sea_query::{Alias, Cond, Condition, Expr};
use smallvec::{SmallVec, smallvec};

/// One emitted join: `<join_type> JOIN <table> AS <alias> ON <on>`
#[derive(Debug, Clone)]
pub struct JoinStep {
	pub join_type: JoinType,
	pub table: String,
	pub alias: String,
	pub on: Condition,
}

/// The join steps of one node, in emission order
pub type JoinSteps = SmallVec<[JoinStep; 2]>;

/// Compiles join nodes into join steps
pub struct JoinConditionCompiler<'a> {
	registry: &'a dyn ReflectionRegistry,
	sanitizer: &'a dyn Sanitizer,
}

impl<'a> JoinConditionCompiler<'a> {
	pub fn new(registry: &'a dyn ReflectionRegistry, sanitizer: &'a dyn Sanitizer) -> Self {
		Self {
			registry,
			sanitizer,
		}
	}

	pub fn compile(&self, node: &JoinNode) -> Result<JoinSteps> {
		let reflection = &node.reflection;
		let parent = self.registry.entity(&node.parent_entity)?;
		let parent_pk = reflection.primary_key().unwrap_or(parent.primary_key());
		let target_pk = self.registry.entity(&node.entity)?.primary_key().to_string();

		let mut steps: JoinSteps = match node.kind {
			JoinKind::HasMany | JoinKind::HasOne => smallvec![self.step(
				node,
				Cond::all().add(column(&node.alias, &reflection.foreign_key()).equals(qualified(
					&node.parent_alias,
					parent_pk
				))),
			)],
			JoinKind::BelongsTo => {
				let target_key = reflection.primary_key().unwrap_or(target_pk.as_str());
				smallvec![self.step(
					node,
					Cond::all().add(column(&node.alias, target_key).equals(qualified(
						&node.parent_alias,
						&reflection.foreign_key()
					))),
				)]
			}
			JoinKind::HasManyPolymorphic => {
				let Some(as_name) = reflection.as_name() else {
					return Err(missing(node, "polymorphic interface name"));
				};
				let owner_type = self.registry.base_class_of(&node.parent_entity)?;
				smallvec![self.step(
					node,
					Cond::all()
						.add(column(&node.alias, &format!("{as_name}_id")).equals(qualified(
							&node.parent_alias,
							parent_pk
						)))
						.add(column(&node.alias, &format!("{as_name}_type")).eq(owner_type.class_name())),
				)]
			}
			JoinKind::HasAndBelongsToMany => {
				let (join_table, join_alias) = intermediate(node)?;
				let parent_key = parent.primary_key();
				smallvec![
					JoinStep {
						join_type: node.join_type,
						table: join_table.to_string(),
						alias: join_alias.to_string(),
						on: Cond::all().add(
							column(join_alias, &reflection.foreign_key())
								.equals(qualified(&node.parent_alias, parent_key))
						),
					},
					self.step(
						node,
						Cond::all().add(column(&node.alias, &target_pk).equals(qualified(
							join_alias,
							&reflection.association_foreign_key()
						))),
					),
				]
			}
			JoinKind::HasManyThrough => {
				let Some(chain) = node.through.as_ref() else {
					return Err(missing(node, "through association"));
				};
				self.through_steps(node, chain, &target_pk)?
			}
		};

		let target = steps.len() - 1;
		if let Some(sti) = self.sti_condition(&node.alias, &node.entity)? {
			steps[target].on = steps[target].on.clone().add(sti);
		}
		if let Some(conditions) = reflection.conditions() {
			let scope = self.scope_condition(conditions, &node.alias, reflection.name())?;
			steps[target].on = steps[target].on.clone().add(scope);
		}

		tracing::trace!(
			association = reflection.name(),
			alias = %node.alias,
			steps = steps.len(),
			"Compiled join conditions"
		);
		Ok(steps)
	}

	fn step(&self, node: &JoinNode, on: Condition) -> JoinStep {
		JoinStep {
			join_type: node.join_type,
			table: node.table.clone(),
			alias: node.alias.clone(),
			on,
		}
	}

	fn through_steps(&self, node: &JoinNode, chain: &ThroughChain, target_pk: &str) -> Result<JoinSteps> {
		let (join_table, join_alias) = intermediate(node)?;
		let ThroughChain {
			through,
			source,
			through_entity,
		} = chain;
		let parent = self.registry.entity(&node.parent_entity)?;
		let intermediate_pk = self.registry.entity(through_entity)?.primary_key();

		let mut join_on = match (through.macro_kind(), through.as_name()) {
			(AssociationMacro::BelongsTo, _) => Cond::all().add(
				column(join_alias, through.primary_key().unwrap_or(intermediate_pk))
					.equals(qualified(&node.parent_alias, &through.foreign_key())),
			),
			(_, Some(as_name)) => {
				let owner_type = self.registry.base_class_of(&node.parent_entity)?;
				Cond::all()
					.add(
						column(&node.parent_alias, parent.primary_key())
							.equals(qualified(join_alias, &format!("{as_name}_id"))),
					)
					.add(column(join_alias, &format!("{as_name}_type")).eq(owner_type.class_name()))
			}
			(_, None) => Cond::all().add(
				column(&node.parent_alias, through.primary_key().unwrap_or(parent.primary_key()))
					.equals(qualified(join_alias, &through.foreign_key())),
			),
		};

		let mut target_on = Cond::all();
		match source.macro_kind() {
			AssociationMacro::HasMany | AssociationMacro::HasOne => {
				let intermediate_base = self.registry.base_class_of(through_entity)?;
				let first_key = match (source.as_name(), source.declared_foreign_key()) {
					(Some(as_name), _) => format!("{as_name}_id"),
					(None, Some(key)) => key.to_string(),
					(None, None) => inflector::foreign_key(intermediate_base.class_name()),
				};
				let second_key = node
					.reflection
					.declared_foreign_key()
					.unwrap_or(intermediate_pk);
				target_on = target_on.add(column(&node.alias, &first_key).equals(qualified(join_alias, second_key)));
				if let Some(as_name) = source.as_name() {
					target_on = target_on.add(
						column(&node.alias, &format!("{as_name}_type")).eq(intermediate_base.class_name()),
					);
				}
				if let Some(sti) = self.sti_condition(join_alias, through_entity)? {
					join_on = join_on.add(sti);
				}
			}
			AssociationMacro::BelongsTo => {
				let first_key = source.primary_key().unwrap_or(target_pk);
				target_on = target_on.add(column(&node.alias, first_key).equals(qualified(join_alias, &source.foreign_key())));
				if let Some(source_type) = node.reflection.source_type() {
					join_on = join_on.add(column(join_alias, &source.foreign_type()).eq(source_type));
				}
			}
			AssociationMacro::HasAndBelongsToMany => {
				return Err(OrmError::UnsupportedJoinKind {
					association: node.reflection.name().to_string(),
					reason: format!("source association '{}' is has_and_belongs_to_many", source.name()),
				});
			}
		}

		if let Some(conditions) = through.conditions() {
			join_on = join_on.add(self.scope_condition(conditions, join_alias, through.name())?);
		}

		Ok(smallvec![
			JoinStep {
				join_type: node.join_type,
				table: join_table.to_string(),
				alias: join_alias.to_string(),
				on: join_on,
			},
			self.step(node, target_on),
		])
	}

	/// `<alias>.<type> = 'Class' OR <alias>.<type> = 'Subclass' ...` when
	/// `entity` is not the root of its hierarchy
	fn sti_condition(&self, alias: &str, entity: &str) -> Result<Option<Condition>> {
		if self.registry.descends_from_base(entity)? {
			return Ok(None);
		}
		let target = self.registry.entity(entity)?;
		let type_column = self.registry.inheritance_column_name(entity)?;
		let condition = self
			.registry
			.subclasses_of(entity)?
			.into_iter()
			.fold(
				Cond::any().add(column(alias, type_column).eq(target.sti_name())),
				|cond, subclass| cond.add(column(alias, type_column).eq(subclass.sti_name())),
			);
		Ok(Some(condition))
	}

	/// Scope conditions of a reflection, evaluated against `alias`
	fn scope_condition(&self, conditions: &ScopeConditions, alias: &str, association: &str) -> Result<Condition> {
		let input = match conditions {
			ScopeConditions::Sql(fragment) => WhereInput::Sql(fragment.clone()),
			ScopeConditions::Attributes(attributes) => WhereInput::Attributes(attributes.clone()),
		};
		let resolve = |relation: &Relation| match relation {
			Relation::Table(table) => Ok(table.clone()),
			Relation::Association(path) => Err(OrmError::UnsupportedJoinKind {
				association: association.to_string(),
				reason: format!("scope conditions cannot reference association '{}'", path.join(".")),
			}),
		};
		let ctx = ExprContext {
			table: alias,
			resolve: &resolve,
			sanitizer: self.sanitizer,
		};
		let mut condition = Cond::all();
		for predicate in PredicateBuilder::new(alias).build(input) {
			condition = condition.add(predicate.to_condition(&ctx)?);
		}
		Ok(condition)
	}
}

fn intermediate(node: &JoinNode) -> Result<(&str, &str)> {
	match (node.join_table.as_deref(), node.join_table_alias.as_deref()) {
		(Some(table), Some(alias)) => Ok((table, alias)),
		_ => Err(missing(node, "join table")),
	}
}

fn missing(node: &JoinNode, what: &str) -> OrmError {
	OrmError::UnsupportedJoinKind {
		association: node.reflection.name().to_string(),
		reason: format!("{:?} join without a resolved {what}", node.kind),
	}
}

fn column(table: &str, name: &str) -> Expr {
	Expr::col((Alias::new(table), Alias::new(name)))
}

fn qualified(table: &str, name: &str) -> (Alias, Alias) {
	(Alias::new(table), Alias::new(name))
}

/// Join steps for every node of a graph, in emission order
pub fn compile_all<'n>(
	compiler: &JoinConditionCompiler<'_>,
	nodes: impl IntoIterator<Item = &'n JoinNode>,
) -> Result<Vec<JoinStep>> {
	let mut steps = Vec::new();
	for node in nodes {
		steps.extend(compiler.compile(node)?);
	}
	Ok(steps)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::orm::join_graph::{AssociationRef, JoinGraph, JoinRef};
	use crate::orm::reflection::Reflection;
	use crate::orm::registry::{Entity, EntityDescriptor, ModelRegistry};
	use crate::orm::sanitizer::BindSanitizer;
	use crate::orm::settings::QuerySettings;
	use rstest::{fixture, rstest};
	use sea_query::{PostgresQueryBuilder, Query, QueryStatementWriter};

	#[fixture]
	fn registry() -> ModelRegistry {
		let mut registry = ModelRegistry::new();
		registry
			.register(
				EntityDescriptor::new("Club")
					.with_reflection(
						Reflection::has_many("memberships").with_conditions("memberships.active = true"),
					)
					.with_reflection(Reflection::has_many("members").through("memberships"))
					.with_reflection(Reflection::has_many("tags").through("memberships")),
			)
			.unwrap()
			.register(
				EntityDescriptor::new("Membership")
					.with_reflection(Reflection::belongs_to("member"))
					.with_reflection(Reflection::has_and_belongs_to_many("tags")),
			)
			.unwrap()
			.register(EntityDescriptor::new("Member"))
			.unwrap()
			.register(EntityDescriptor::new("Tag"))
			.unwrap();
		registry
	}

	fn steps(registry: &ModelRegistry, association: &str) -> Result<Vec<JoinStep>> {
		let graph = JoinGraph::resolve(
			registry,
			&QuerySettings::default(),
			"Club",
			&[JoinRef::Association(AssociationRef::new(association))],
		)?;
		compile_all(&JoinConditionCompiler::new(registry, &BindSanitizer::default()), graph.nodes())
	}

	fn render(on: &Condition) -> String {
		Query::select()
			.expr(Expr::cust("1"))
			.cond_where(on.clone())
			.to_string(PostgresQueryBuilder)
	}

	#[rstest]
	fn test_through_emits_join_table_first(registry: ModelRegistry) {
		let steps = steps(&registry, "members").unwrap();

		assert_eq!(steps.len(), 2);
		assert_eq!(steps[0].table, "memberships");
		assert_eq!(steps[1].table, "members");
		assert!(
			render(&steps[1].on).ends_with(r#""members"."id" = "memberships"."member_id""#),
			"{}",
			render(&steps[1].on)
		);
	}

	#[rstest]
	fn test_through_scope_conditions_apply_to_join_table(registry: ModelRegistry) {
		let steps = steps(&registry, "members").unwrap();

		let join_table = render(&steps[0].on);
		assert!(join_table.contains(r#""clubs"."id" = "memberships"."club_id""#), "{join_table}");
		assert!(join_table.contains("memberships.active = true"), "{join_table}");
		assert!(!render(&steps[1].on).contains("active"));
	}

	#[rstest]
	fn test_many_to_many_source_is_unsupported(registry: ModelRegistry) {
		let err = steps(&registry, "tags").unwrap_err();

		assert!(matches!(err, OrmError::UnsupportedJoinKind { .. }), "{err}");
	}

	struct KindColumnRegistry(ModelRegistry);

	impl ReflectionRegistry for KindColumnRegistry {
		fn entity(&self, class_name: &str) -> Result<&Entity> {
			self.0.entity(class_name)
		}

		fn subclasses_of(&self, class_name: &str) -> Result<Vec<&Entity>> {
			self.0.subclasses_of(class_name)
		}

		fn inheritance_column_name(&self, _class_name: &str) -> Result<&str> {
			Ok("kind")
		}
	}

	#[rstest]
	fn test_type_filter_uses_registry_inheritance_column(mut registry: ModelRegistry) {
		registry
			.register(
				EntityDescriptor::new("Club")
					.with_reflection(Reflection::has_many("captains").with_class_name("Captain")),
			)
			.unwrap()
			.register(EntityDescriptor::new("Captain").inherits("Member"))
			.unwrap();
		let registry = KindColumnRegistry(registry);
		let graph = JoinGraph::resolve(
			&registry,
			&QuerySettings::default(),
			"Club",
			&[JoinRef::Association(AssociationRef::new("captains"))],
		)
		.unwrap();

		let steps = compile_all(&JoinConditionCompiler::new(&registry, &BindSanitizer::default()), graph.nodes()).unwrap();

		let on = render(&steps[0].on);
		assert!(on.contains(r#""members"."kind" = 'Captain'"#), "{on}");
		assert!(!on.contains(r#""type""#), "{on}");
	}
}
