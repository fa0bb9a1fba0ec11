//! Entity and reflection registry
//!
//! The query layer reads association and inheritance metadata through the
//! [`ReflectionRegistry`] trait. [`ModelRegistry`] is the in-memory
//! implementation: it is constructed explicitly, filled once, and then only
//! read while queries compile.
//!
//! Single-table inheritance is modeled by registering a subclass with a
//! parent. The subclass shares the parent's table, primary key and
//! inheritance column, and inherits the reflections declared so far.

use super::errors::{OrmError, Result};
use super::inflector;
use super::reflection::Reflection;
use super::settings::QuerySettings;
use indexmap::IndexMap;

/// Declaration of an entity, consumed by [`ModelRegistry::register`]
///
/// # Examples
///
/// ```
/// use tabula_db::orm::reflection::Reflection;
/// use tabula_db::orm::registry::{EntityDescriptor, ModelRegistry, ReflectionRegistry};
///
/// let mut registry = ModelRegistry::new();
/// registry
///     .register(EntityDescriptor::new("Author").with_reflection(Reflection::has_many("posts")))
///     .unwrap();
/// registry.register(EntityDescriptor::new("Post")).unwrap();
///
/// let posts = registry.reflection_for("Author", "posts").unwrap();
/// assert_eq!(posts.foreign_key(), "author_id");
/// assert_eq!(registry.entity("Post").unwrap().table_name(), "posts");
/// ```
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
	class_name: String,
	table_name: Option<String>,
	primary_key: Option<String>,
	parent: Option<String>,
	inheritance_column: Option<String>,
	reflections: Vec<Reflection>,
}

impl EntityDescriptor {
	pub fn new(class_name: impl Into<String>) -> Self {
		Self {
			class_name: class_name.into(),
			table_name: None,
			primary_key: None,
			parent: None,
			inheritance_column: None,
			reflections: Vec::new(),
		}
	}

	pub fn with_table(mut self, table_name: impl Into<String>) -> Self {
		self.table_name = Some(table_name.into());
		self
	}

	pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
		self.primary_key = Some(primary_key.into());
		self
	}

	/// Declare this entity a single-table-inheritance subclass of `parent`
	pub fn inherits(mut self, parent: impl Into<String>) -> Self {
		self.parent = Some(parent.into());
		self
	}

	pub fn with_inheritance_column(mut self, column: impl Into<String>) -> Self {
		self.inheritance_column = Some(column.into());
		self
	}

	pub fn with_reflection(mut self, reflection: Reflection) -> Self {
		self.reflections.push(reflection);
		self
	}
}

/// A registered entity with its inherited settings resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
	class_name: String,
	table_name: String,
	primary_key: String,
	parent: Option<String>,
	inheritance_column: String,
	reflections: IndexMap<String, Reflection>,
}

impl Entity {
	pub fn class_name(&self) -> &str {
		&self.class_name
	}

	pub fn table_name(&self) -> &str {
		&self.table_name
	}

	pub fn primary_key(&self) -> &str {
		&self.primary_key
	}

	pub fn parent(&self) -> Option<&str> {
		self.parent.as_deref()
	}

	pub fn inheritance_column(&self) -> &str {
		&self.inheritance_column
	}

	/// Value stored in the inheritance column for this entity
	pub fn sti_name(&self) -> &str {
		&self.class_name
	}

	pub fn reflection(&self, name: &str) -> Option<&Reflection> {
		self.reflections.get(name)
	}

	pub fn reflections(&self) -> impl Iterator<Item = &Reflection> {
		self.reflections.values()
	}
}

/// Read-only access to association and inheritance metadata
pub trait ReflectionRegistry: Send + Sync {
	/// Look up an entity by class name
	fn entity(&self, class_name: &str) -> Result<&Entity>;

	/// All registered descendants of `class_name`, transitively, in
	/// registration order
	fn subclasses_of(&self, class_name: &str) -> Result<Vec<&Entity>>;

	/// Look up a reflection, failing with [`OrmError::UnknownAssociation`]
	fn reflection_for(&self, class_name: &str, association: &str) -> Result<&Reflection> {
		self.entity(class_name)?
			.reflection(association)
			.ok_or_else(|| OrmError::UnknownAssociation {
				entity: class_name.to_string(),
				association: association.to_string(),
			})
	}

	fn inheritance_column_name(&self, class_name: &str) -> Result<&str> {
		Ok(self.entity(class_name)?.inheritance_column())
	}

	/// Root of the inheritance hierarchy containing `class_name`
	fn base_class_of(&self, class_name: &str) -> Result<&Entity> {
		let mut entity = self.entity(class_name)?;
		while let Some(parent) = entity.parent() {
			entity = self.entity(parent)?;
		}
		Ok(entity)
	}

	/// Whether `class_name` is the root of its hierarchy
	fn descends_from_base(&self, class_name: &str) -> Result<bool> {
		Ok(self.entity(class_name)?.parent().is_none())
	}

	/// Whether `class_name` is `ancestor` or one of its descendants
	fn is_a(&self, class_name: &str, ancestor: &str) -> Result<bool> {
		let mut entity = self.entity(class_name)?;
		loop {
			if entity.class_name() == ancestor {
				return Ok(true);
			}
			match entity.parent() {
				Some(parent) => entity = self.entity(parent)?,
				None => return Ok(false),
			}
		}
	}
}

/// In-memory registry of entities
#[derive(Debug, Clone)]
pub struct ModelRegistry {
	entities: IndexMap<String, Entity>,
	default_primary_key: String,
	default_inheritance_column: String,
}

impl ModelRegistry {
	/// Create an empty registry using the default settings
	pub fn new() -> Self {
		Self::with_settings(&QuerySettings::default())
	}

	/// Create an empty registry whose entity defaults come from `settings`
	pub fn with_settings(settings: &QuerySettings) -> Self {
		Self {
			entities: IndexMap::new(),
			default_primary_key: settings.default_primary_key.clone(),
			default_inheritance_column: settings.inheritance_column.clone(),
		}
	}

	/// Register an entity
	///
	/// A subclass must be registered after its parent. Re-registering a class
	/// replaces the previous declaration; a parent that descends from the
	/// class is rejected.
	pub fn register(&mut self, descriptor: EntityDescriptor) -> Result<&mut Self> {
		let EntityDescriptor {
			class_name,
			table_name,
			primary_key,
			parent,
			inheritance_column,
			reflections: declared,
		} = descriptor;

		if let Some(parent) = &parent {
			if self.is_ancestry_of(parent, &class_name) {
				return Err(OrmError::InheritanceCycle {
					entity: class_name,
					parent: parent.clone(),
				});
			}
		}

		let inherited = match &parent {
			Some(parent) => Some(
				self.entities
					.get(parent)
					.ok_or_else(|| OrmError::UnknownEntity(parent.clone()))?,
			),
			None => None,
		};

		let table_name = table_name
			.or_else(|| inherited.map(|p| p.table_name.clone()))
			.unwrap_or_else(|| inflector::tableize(&class_name));
		let primary_key = primary_key
			.or_else(|| inherited.map(|p| p.primary_key.clone()))
			.unwrap_or_else(|| self.default_primary_key.clone());
		let inheritance_column = inheritance_column
			.or_else(|| inherited.map(|p| p.inheritance_column.clone()))
			.unwrap_or_else(|| self.default_inheritance_column.clone());

		let mut reflections = inherited
			.map(|p| p.reflections.clone())
			.unwrap_or_default();
		for reflection in declared {
			let reflection = reflection.with_owner(class_name.as_str());
			reflections.insert(reflection.name().to_string(), reflection);
		}

		tracing::debug!(
			entity = %class_name,
			table = %table_name,
			parent = ?parent,
			reflections = reflections.len(),
			"Registered entity"
		);

		self.entities.insert(
			class_name.clone(),
			Entity {
				class_name,
				table_name,
				primary_key,
				parent,
				inheritance_column,
				reflections,
			},
		);
		Ok(self)
	}

	/// Whether `class_name` is `entity` or one of its registered ancestors
	fn is_ancestry_of(&self, entity: &str, class_name: &str) -> bool {
		let mut current = Some(entity);
		while let Some(name) = current {
			if name == class_name {
				return true;
			}
			current = self.entities.get(name).and_then(Entity::parent);
		}
		false
	}

	pub fn len(&self) -> usize {
		self.entities.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entities.is_empty()
	}
}

impl Default for ModelRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl ReflectionRegistry for ModelRegistry {
	fn entity(&self, class_name: &str) -> Result<&Entity> {
		self.entities
			.get(class_name)
			.ok_or_else(|| OrmError::UnknownEntity(class_name.to_string()))
	}

	fn subclasses_of(&self, class_name: &str) -> Result<Vec<&Entity>> {
		self.entity(class_name)?;
		Ok(self
			.entities
			.values()
			.filter(|entity| {
				entity.class_name != class_name
					&& self.is_a(&entity.class_name, class_name).unwrap_or(false)
			})
			.collect())
	}
}
