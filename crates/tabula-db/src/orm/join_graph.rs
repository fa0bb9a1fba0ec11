//! Join graph resolution
//!
//! A [`JoinGraph`] is built once per compilation from a query's join
//! references. Its root is the base entity's table; every other node is an
//! association joined from its parent and carries a unique alias. Nodes are
//! kept in traversal order (parent before child, siblings in request order),
//! which is also the order the joins are emitted in.

use super::alias::AliasTracker;
use super::errors::{OrmError, Result};
use super::reflection::{AssociationMacro, JoinKind, Reflection};
use super::registry::ReflectionRegistry;
use super::settings::QuerySettings;
use sea_query::JoinType as SeaJoinType;
use serde::{Deserialize, Serialize};

/// Join flavor of a raw or association join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JoinType {
	#[default]
	Inner,
	/// `LEFT OUTER JOIN`
	Outer,
}

impl From<JoinType> for SeaJoinType {
	fn from(join_type: JoinType) -> Self {
		match join_type {
			JoinType::Inner => SeaJoinType::InnerJoin,
			JoinType::Outer => SeaJoinType::LeftJoin,
		}
	}
}

/// A hand-written join
///
/// The ON text is opaque and emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawJoin {
	pub join_type: JoinType,
	pub table: String,
	pub alias: Option<String>,
	pub on: String,
}

impl RawJoin {
	pub fn inner(table: impl Into<String>, on: impl Into<String>) -> Self {
		Self {
			join_type: JoinType::Inner,
			table: table.into(),
			alias: None,
			on: on.into(),
		}
	}

	pub fn outer(table: impl Into<String>, on: impl Into<String>) -> Self {
		Self {
			join_type: JoinType::Outer,
			..Self::inner(table, on)
		}
	}

	pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
		self.alias = Some(alias.into());
		self
	}

	/// Name the joined table is referenced by
	pub fn reference_name(&self) -> &str {
		self.alias.as_deref().unwrap_or(&self.table)
	}

	pub fn is_blank(&self) -> bool {
		self.table.trim().is_empty() || self.on.trim().is_empty()
	}
}

/// A request to join an association, optionally with nested associations
/// joined from its target
///
/// # Examples
///
/// ```
/// use tabula_db::orm::join_graph::AssociationRef;
///
/// // posts, then comments and tags of each post
/// let reference = AssociationRef::new("posts")
///     .nest(AssociationRef::new("comments"))
///     .nest(AssociationRef::outer("tags"));
/// assert_eq!(reference.children().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssociationRef {
	name: String,
	join_type: JoinType,
	children: Vec<AssociationRef>,
}

impl AssociationRef {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			join_type: JoinType::Inner,
			children: Vec::new(),
		}
	}

	/// Request a `LEFT OUTER JOIN`
	pub fn outer(name: impl Into<String>) -> Self {
		Self {
			join_type: JoinType::Outer,
			..Self::new(name)
		}
	}

	/// Join `child` from this association's target
	pub fn nest(mut self, child: impl Into<AssociationRef>) -> Self {
		self.children.push(child.into());
		self
	}

	/// This reference and all nested ones as outer joins
	pub fn outer_tree(&self) -> Self {
		Self {
			name: self.name.clone(),
			join_type: JoinType::Outer,
			children: self.children.iter().map(AssociationRef::outer_tree).collect(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn join_type(&self) -> JoinType {
		self.join_type
	}

	pub fn children(&self) -> &[AssociationRef] {
		&self.children
	}

	pub fn is_blank(&self) -> bool {
		self.name.trim().is_empty()
	}
}

impl From<&str> for AssociationRef {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for AssociationRef {
	fn from(name: String) -> Self {
		Self::new(name)
	}
}

/// One entry of a query's join list
#[derive(Debug, Clone, PartialEq)]
pub enum JoinRef {
	Raw(RawJoin),
	Association(AssociationRef),
	/// A node resolved in another graph; re-resolved by its path
	Resolved(JoinNode),
}

impl JoinRef {
	pub fn is_blank(&self) -> bool {
		match self {
			Self::Raw(raw) => raw.is_blank(),
			Self::Association(association) => association.is_blank(),
			Self::Resolved(node) => node.path.is_empty(),
		}
	}
}

/// Where a node hangs in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinParent {
	Base,
	/// Index into [`JoinGraph::nodes`]
	Node(usize),
}

/// Through-association metadata resolved for a node
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughChain {
	/// Association of the owner that leads to the intermediate entity
	pub through: Reflection,
	/// Association of the intermediate entity that leads to the target
	pub source: Reflection,
	/// Class of the intermediate entity
	pub through_entity: String,
}

/// A resolved association join
#[derive(Debug, Clone, PartialEq)]
pub struct JoinNode {
	pub parent: JoinParent,
	/// Association names from the base entity to this node
	pub path: Vec<String>,
	pub reflection: Reflection,
	pub kind: JoinKind,
	pub join_type: JoinType,
	/// Class of the entity the parent row belongs to
	pub parent_entity: String,
	/// Table or alias the parent row is read from
	pub parent_alias: String,
	/// Class of the joined entity
	pub entity: String,
	pub table: String,
	pub alias: String,
	/// Intermediate table of a many-to-many or through join
	pub join_table: Option<String>,
	pub join_table_alias: Option<String>,
	pub through: Option<ThroughChain>,
}

impl JoinNode {
	pub fn name(&self) -> &str {
		self.reflection.name()
	}
}

/// The resolved join tree of one compilation
#[derive(Debug, Clone, PartialEq)]
pub struct JoinGraph {
	base_entity: String,
	base_table: String,
	raw_joins: Vec<RawJoin>,
	nodes: Vec<JoinNode>,
}

impl JoinGraph {
	/// Resolve `join_refs` against the reflections of `base_entity`
	///
	/// Raw joins are collected first and seed the alias counts, then
	/// association references are walked depth first, then resolved nodes
	/// from other graphs are grafted by path.
	pub fn resolve(
		registry: &dyn ReflectionRegistry,
		settings: &QuerySettings,
		base_entity: &str,
		join_refs: &[JoinRef],
	) -> Result<Self> {
		let base = registry.entity(base_entity)?;
		let mut builder = GraphBuilder {
			registry,
			aliases: AliasTracker::new(settings),
			graph: JoinGraph {
				base_entity: base.class_name().to_string(),
				base_table: base.table_name().to_string(),
				raw_joins: Vec::new(),
				nodes: Vec::new(),
			},
		};
		builder.aliases.seed(base.table_name());

		for join_ref in join_refs.iter().filter(|j| !j.is_blank()) {
			if let JoinRef::Raw(raw) = join_ref {
				builder.aliases.seed(raw.reference_name());
				builder.graph.raw_joins.push(raw.clone());
			}
		}
		for join_ref in join_refs.iter().filter(|j| !j.is_blank()) {
			if let JoinRef::Association(association) = join_ref {
				builder.build_association(JoinParent::Base, association)?;
			}
		}
		for join_ref in join_refs.iter().filter(|j| !j.is_blank()) {
			if let JoinRef::Resolved(node) = join_ref {
				builder.graft(node)?;
			}
		}

		tracing::debug!(
			base = %builder.graph.base_table,
			raw_joins = builder.graph.raw_joins.len(),
			association_joins = builder.graph.nodes.len(),
			"Resolved join graph"
		);
		Ok(builder.graph)
	}

	pub fn base_entity(&self) -> &str {
		&self.base_entity
	}

	pub fn base_table(&self) -> &str {
		&self.base_table
	}

	pub fn raw_joins(&self) -> &[RawJoin] {
		&self.raw_joins
	}

	/// Association nodes in emission order
	pub fn nodes(&self) -> &[JoinNode] {
		&self.nodes
	}

	pub fn is_empty(&self) -> bool {
		self.raw_joins.is_empty() && self.nodes.is_empty()
	}

	/// First node reached by `path` from the base entity
	pub fn node_for_path(&self, path: &[String]) -> Option<&JoinNode> {
		self.nodes.iter().find(|node| node.path == path)
	}

	/// Table or alias a parent reference is read from
	pub fn alias_of(&self, parent: JoinParent) -> &str {
		match parent {
			JoinParent::Base => &self.base_table,
			JoinParent::Node(index) => &self.nodes[index].alias,
		}
	}
}

struct GraphBuilder<'a> {
	registry: &'a dyn ReflectionRegistry,
	aliases: AliasTracker,
	graph: JoinGraph,
}

impl GraphBuilder<'_> {
	fn build_association(&mut self, parent: JoinParent, association: &AssociationRef) -> Result<()> {
		let index = self.find_or_build(parent, association.name(), association.join_type())?;
		for child in association.children().iter().filter(|c| !c.is_blank()) {
			self.build_association(JoinParent::Node(index), child)?;
		}
		Ok(())
	}

	fn graft(&mut self, node: &JoinNode) -> Result<()> {
		let mut parent = JoinParent::Base;
		for (depth, name) in node.path.iter().enumerate() {
			let join_type = if depth + 1 == node.path.len() {
				node.join_type
			} else {
				JoinType::Inner
			};
			parent = JoinParent::Node(self.find_or_build(parent, name, join_type)?);
		}
		Ok(())
	}

	/// Reuse the node for `name` under `parent` or build it
	///
	/// A reused node keeps the stricter join type: an inner request upgrades
	/// an outer node, an outer request never downgrades an inner one.
	fn find_or_build(&mut self, parent: JoinParent, name: &str, join_type: JoinType) -> Result<usize> {
		if let Some(index) = self
			.graph
			.nodes
			.iter()
			.position(|node| node.parent == parent && node.name() == name)
		{
			let node = &mut self.graph.nodes[index];
			if join_type == JoinType::Inner && node.join_type == JoinType::Outer {
				tracing::trace!(association = name, "Upgraded outer join to inner");
				node.join_type = JoinType::Inner;
			}
			return Ok(index);
		}
		let node = self.build_node(parent, name, join_type)?;
		self.graph.nodes.push(node);
		Ok(self.graph.nodes.len() - 1)
	}

	fn build_node(&mut self, parent: JoinParent, name: &str, join_type: JoinType) -> Result<JoinNode> {
		let (parent_entity, mut path) = match parent {
			JoinParent::Base => (self.graph.base_entity.clone(), Vec::new()),
			JoinParent::Node(index) => {
				let node = &self.graph.nodes[index];
				(node.entity.clone(), node.path.clone())
			}
		};
		path.push(name.to_string());

		let registry = self.registry;
		let parent_table = registry.entity(&parent_entity)?.table_name().to_string();
		let reflection = registry.reflection_for(&parent_entity, name)?.clone();
		let kind = reflection.join_kind()?;

		let through = match kind {
			JoinKind::HasManyThrough => Some(self.resolve_through(&parent_entity, &reflection)?),
			_ => None,
		};
		let entity = match &through {
			Some(chain) => target_of_through(&parent_entity, &reflection, chain)?,
			None if reflection.is_polymorphic() => {
				return Err(OrmError::EagerLoadPolymorphic {
					entity: parent_entity,
					association: name.to_string(),
				});
			}
			None => reflection.class_name(),
		};
		let table = registry.entity(&entity)?.table_name().to_string();

		let alias = self.aliases.allocate(&table, name, &parent_table, "");
		let join_table = match (&through, kind) {
			(Some(chain), _) => Some(registry.entity(&chain.through_entity)?.table_name().to_string()),
			(None, JoinKind::HasAndBelongsToMany) => Some(reflection.join_table(&parent_table, &table)),
			_ => None,
		};
		let join_table_alias = join_table
			.as_deref()
			.map(|jt| self.aliases.allocate(jt, name, &parent_table, "_join"));

		tracing::debug!(
			association = name,
			kind = ?kind,
			table = %table,
			alias = %alias,
			join_table_alias = ?join_table_alias,
			"Resolved association join"
		);

		Ok(JoinNode {
			parent,
			path,
			reflection,
			kind,
			join_type,
			parent_alias: self.graph.alias_of(parent).to_string(),
			parent_entity,
			entity,
			table,
			alias,
			join_table,
			join_table_alias,
			through,
		})
	}

	fn resolve_through(&self, owner: &str, reflection: &Reflection) -> Result<ThroughChain> {
		let unsupported = |reason: String| OrmError::UnsupportedJoinKind {
			association: reflection.name().to_string(),
			reason,
		};
		let through_name = reflection.through_name().unwrap_or_default();
		let through = self.registry.reflection_for(owner, through_name)?.clone();
		match through.join_kind()? {
			JoinKind::HasManyThrough | JoinKind::HasAndBelongsToMany => {
				return Err(unsupported(format!(
					"through association '{through_name}' must be a direct association"
				)));
			}
			JoinKind::BelongsTo if through.is_polymorphic() => {
				return Err(OrmError::EagerLoadPolymorphic {
					entity: owner.to_string(),
					association: through_name.to_string(),
				});
			}
			JoinKind::BelongsTo | JoinKind::HasOne | JoinKind::HasMany | JoinKind::HasManyPolymorphic => {}
		}

		let through_entity = through.class_name();
		let intermediate = self.registry.entity(&through_entity)?;
		let source = reflection
			.source_candidates()
			.iter()
			.find_map(|candidate| intermediate.reflection(candidate))
			.cloned()
			.ok_or_else(|| {
				unsupported(format!(
					"could not find the source association {:?} on {through_entity}",
					reflection.source_candidates()
				))
			})?;
		match source.join_kind()? {
			JoinKind::HasManyThrough | JoinKind::HasAndBelongsToMany => {
				return Err(unsupported(format!(
					"source association '{}' must be a direct has_many, has_one or belongs_to",
					source.name()
				)));
			}
			JoinKind::BelongsTo | JoinKind::HasOne | JoinKind::HasMany | JoinKind::HasManyPolymorphic => {}
		}

		Ok(ThroughChain {
			through,
			source,
			through_entity,
		})
	}
}

fn target_of_through(owner: &str, reflection: &Reflection, chain: &ThroughChain) -> Result<String> {
	if let Some(class_name) = reflection.declared_class_name() {
		return Ok(class_name.to_string());
	}
	if let Some(source_type) = reflection.source_type() {
		return Ok(source_type.to_string());
	}
	if chain.source.macro_kind() == AssociationMacro::BelongsTo && chain.source.is_polymorphic() {
		return Err(OrmError::EagerLoadPolymorphic {
			entity: owner.to_string(),
			association: reflection.name().to_string(),
		});
	}
	Ok(chain.source.class_name())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::orm::registry::{EntityDescriptor, ModelRegistry};
	use rstest::{fixture, rstest};

	#[fixture]
	fn registry() -> ModelRegistry {
		let mut registry = ModelRegistry::new();
		registry
			.register(
				EntityDescriptor::new("Author")
					.with_reflection(Reflection::has_many("posts"))
					.with_reflection(
						Reflection::has_many("thinking_posts")
							.with_class_name("Post")
							.with_conditions("title = 'So I was thinking'"),
					)
					.with_reflection(Reflection::has_many("comments").through("posts")),
			)
			.unwrap()
			.register(
				EntityDescriptor::new("Post")
					.with_reflection(Reflection::belongs_to("author"))
					.with_reflection(Reflection::has_many("comments"))
					.with_reflection(Reflection::has_and_belongs_to_many("categories"))
					.with_reflection(Reflection::belongs_to("attachable").polymorphic()),
			)
			.unwrap()
			.register(EntityDescriptor::new("Comment").with_reflection(Reflection::belongs_to("post")))
			.unwrap()
			.register(EntityDescriptor::new("Category"))
			.unwrap();
		registry
	}

	fn resolve(registry: &ModelRegistry, refs: Vec<JoinRef>) -> Result<JoinGraph> {
		JoinGraph::resolve(registry, &QuerySettings::default(), "Author", &refs)
	}

	fn aliases(graph: &JoinGraph) -> Vec<&str> {
		graph.nodes().iter().map(|n| n.alias.as_str()).collect()
	}

	#[rstest]
	fn test_nested_references_resolve_in_traversal_order(registry: ModelRegistry) {
		let graph = resolve(
			&registry,
			vec![JoinRef::Association(
				AssociationRef::new("posts")
					.nest("comments")
					.nest("categories"),
			)],
		)
		.unwrap();

		assert_eq!(aliases(&graph), vec!["posts", "comments", "categories"]);
		let categories = &graph.nodes()[2];
		assert_eq!(categories.parent, JoinParent::Node(0));
		assert_eq!(categories.parent_alias, "posts");
		assert_eq!(categories.join_table.as_deref(), Some("categories_posts"));
		assert_eq!(categories.join_table_alias.as_deref(), Some("categories_posts"));
		assert_eq!(categories.path, vec!["posts", "categories"]);
	}

	#[rstest]
	fn test_same_table_twice_gets_distinct_aliases(registry: ModelRegistry) {
		let graph = resolve(
			&registry,
			vec![
				JoinRef::Association("posts".into()),
				JoinRef::Association("thinking_posts".into()),
			],
		)
		.unwrap();
		assert_eq!(aliases(&graph), vec!["posts", "thinking_posts_authors"]);
	}

	#[rstest]
	fn test_repeated_reference_reuses_node(registry: ModelRegistry) {
		let graph = resolve(
			&registry,
			vec![
				JoinRef::Association("posts".into()),
				JoinRef::Association(AssociationRef::new("posts").nest("comments")),
			],
		)
		.unwrap();
		assert_eq!(aliases(&graph), vec!["posts", "comments"]);
	}

	#[rstest]
	#[case(AssociationRef::new("posts"), AssociationRef::outer("posts"))]
	#[case(AssociationRef::outer("posts"), AssociationRef::new("posts"))]
	fn test_reused_node_keeps_inner_join(
		registry: ModelRegistry,
		#[case] first: AssociationRef,
		#[case] second: AssociationRef,
	) {
		let graph = resolve(
			&registry,
			vec![JoinRef::Association(first), JoinRef::Association(second)],
		)
		.unwrap();
		assert_eq!(graph.nodes().len(), 1);
		assert_eq!(graph.nodes()[0].join_type, JoinType::Inner);
	}

	#[rstest]
	fn test_repeated_outer_reference_stays_outer(registry: ModelRegistry) {
		let graph = resolve(
			&registry,
			vec![
				JoinRef::Association(AssociationRef::outer("posts")),
				JoinRef::Association(AssociationRef::outer("posts").nest("comments")),
			],
		)
		.unwrap();
		assert_eq!(graph.nodes()[0].join_type, JoinType::Outer);
		assert_eq!(graph.nodes()[1].join_type, JoinType::Inner);
	}

	#[rstest]
	fn test_through_allocates_join_table_alias(registry: ModelRegistry) {
		let graph = resolve(&registry, vec![JoinRef::Association("comments".into())]).unwrap();
		let node = &graph.nodes()[0];
		assert_eq!(node.kind, JoinKind::HasManyThrough);
		assert_eq!(node.alias, "comments");
		assert_eq!(node.join_table.as_deref(), Some("posts"));
		assert_eq!(node.join_table_alias.as_deref(), Some("posts"));
		let chain = node.through.as_ref().unwrap();
		assert_eq!(chain.through.name(), "posts");
		assert_eq!(chain.source.name(), "comments");
	}

	#[rstest]
	fn test_raw_join_seeds_alias_counts(registry: ModelRegistry) {
		let graph = resolve(
			&registry,
			vec![
				JoinRef::Association("posts".into()),
				JoinRef::Raw(RawJoin::inner("posts", "posts.author_id = authors.id")),
			],
		)
		.unwrap();
		assert_eq!(graph.raw_joins().len(), 1);
		assert_eq!(aliases(&graph), vec!["posts_authors"]);
	}

	#[rstest]
	fn test_graft_rebuilds_missing_prefix(registry: ModelRegistry) {
		let donor = resolve(
			&registry,
			vec![JoinRef::Association(
				AssociationRef::new("posts").nest(AssociationRef::outer("comments")),
			)],
		)
		.unwrap();
		let comments = donor.nodes()[1].clone();

		let graph = resolve(&registry, vec![JoinRef::Resolved(comments)]).unwrap();

		assert_eq!(aliases(&graph), vec!["posts", "comments"]);
		assert_eq!(graph.nodes()[0].join_type, JoinType::Inner);
		assert_eq!(graph.nodes()[1].join_type, JoinType::Outer);
		assert!(graph.node_for_path(&["posts".into(), "comments".into()]).is_some());
	}

	#[rstest]
	fn test_unknown_association_fails(registry: ModelRegistry) {
		let err = resolve(&registry, vec![JoinRef::Association("postz".into())]).unwrap_err();
		assert!(matches!(
			err,
			OrmError::UnknownAssociation { ref entity, ref association }
				if entity == "Author" && association == "postz"
		));
	}

	#[rstest]
	fn test_polymorphic_belongs_to_cannot_be_joined(registry: ModelRegistry) {
		let err = resolve(
			&registry,
			vec![JoinRef::Association(
				AssociationRef::new("posts").nest("attachable"),
			)],
		)
		.unwrap_err();
		assert!(matches!(err, OrmError::EagerLoadPolymorphic { .. }));
	}
}
