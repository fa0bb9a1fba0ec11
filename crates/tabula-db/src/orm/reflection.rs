//! Association metadata
//!
//! A [`Reflection`] describes one declared association. Unset options are
//! derived from naming conventions when they are read, so a reflection can be
//! declared with only a macro and a name:
//!
//! ```
//! use tabula_db::orm::reflection::{AssociationMacro, Reflection};
//!
//! let posts = Reflection::has_many("posts").with_owner("Author");
//! assert_eq!(posts.macro_kind(), AssociationMacro::HasMany);
//! assert_eq!(posts.class_name(), "Post");
//! assert_eq!(posts.foreign_key(), "author_id");
//! ```

use super::errors::{OrmError, Result};
use super::inflector;
use super::predicate::{Attributes, SqlFragment};
use serde::{Deserialize, Serialize};

/// The declaring macro of an association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationMacro {
	BelongsTo,
	HasOne,
	HasMany,
	HasAndBelongsToMany,
}

/// How an association is joined
///
/// Derived from the macro and its modifiers by [`Reflection::join_kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
	BelongsTo,
	HasOne,
	HasMany,
	/// `has_many`/`has_one` declared with `as`
	HasManyPolymorphic,
	/// `has_many`/`has_one` declared with `through`
	HasManyThrough,
	HasAndBelongsToMany,
}

impl JoinKind {
	/// Whether the join goes through an intermediate table
	pub fn uses_join_table(self) -> bool {
		matches!(self, Self::HasManyThrough | Self::HasAndBelongsToMany)
	}
}

/// Static scope conditions attached to an association
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeConditions {
	Sql(SqlFragment),
	Attributes(Attributes),
}

impl From<&str> for ScopeConditions {
	fn from(sql: &str) -> Self {
		Self::Sql(SqlFragment::new(sql))
	}
}

impl From<SqlFragment> for ScopeConditions {
	fn from(fragment: SqlFragment) -> Self {
		Self::Sql(fragment)
	}
}

impl From<Attributes> for ScopeConditions {
	fn from(attributes: Attributes) -> Self {
		Self::Attributes(attributes)
	}
}

/// Metadata for one declared association
#[derive(Debug, Clone, PartialEq)]
pub struct Reflection {
	macro_kind: AssociationMacro,
	name: String,
	owner: String,
	class_name: Option<String>,
	foreign_key: Option<String>,
	primary_key: Option<String>,
	association_foreign_key: Option<String>,
	join_table: Option<String>,
	through: Option<String>,
	source: Option<String>,
	source_type: Option<String>,
	as_name: Option<String>,
	polymorphic: bool,
	foreign_type: Option<String>,
	conditions: Option<ScopeConditions>,
}

impl Reflection {
	/// Create a reflection with every option unset
	pub fn new(macro_kind: AssociationMacro, name: impl Into<String>) -> Self {
		Self {
			macro_kind,
			name: name.into(),
			owner: String::new(),
			class_name: None,
			foreign_key: None,
			primary_key: None,
			association_foreign_key: None,
			join_table: None,
			through: None,
			source: None,
			source_type: None,
			as_name: None,
			polymorphic: false,
			foreign_type: None,
			conditions: None,
		}
	}

	pub fn belongs_to(name: impl Into<String>) -> Self {
		Self::new(AssociationMacro::BelongsTo, name)
	}

	pub fn has_one(name: impl Into<String>) -> Self {
		Self::new(AssociationMacro::HasOne, name)
	}

	pub fn has_many(name: impl Into<String>) -> Self {
		Self::new(AssociationMacro::HasMany, name)
	}

	pub fn has_and_belongs_to_many(name: impl Into<String>) -> Self {
		Self::new(AssociationMacro::HasAndBelongsToMany, name)
	}

	/// Set the declaring entity; done by the registry on registration
	pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
		self.owner = owner.into();
		self
	}

	pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
		self.class_name = Some(class_name.into());
		self
	}

	pub fn with_foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
		self.foreign_key = Some(foreign_key.into());
		self
	}

	pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
		self.primary_key = Some(primary_key.into());
		self
	}

	pub fn with_association_foreign_key(mut self, key: impl Into<String>) -> Self {
		self.association_foreign_key = Some(key.into());
		self
	}

	pub fn with_join_table(mut self, join_table: impl Into<String>) -> Self {
		self.join_table = Some(join_table.into());
		self
	}

	/// Reach the target through another association of the owner
	pub fn through(mut self, association: impl Into<String>) -> Self {
		self.through = Some(association.into());
		self
	}

	/// Name of the association on the through target that leads to the target
	pub fn with_source(mut self, source: impl Into<String>) -> Self {
		self.source = Some(source.into());
		self
	}

	/// Concrete target type when the source is a polymorphic `belongs_to`
	pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
		self.source_type = Some(source_type.into());
		self
	}

	/// The target refers back to the owner through the polymorphic
	/// interface `name` (`<name>_id`, `<name>_type`)
	pub fn with_as(mut self, name: impl Into<String>) -> Self {
		self.as_name = Some(name.into());
		self
	}

	/// Mark a `belongs_to` as polymorphic; its target is stored as data
	pub fn polymorphic(mut self) -> Self {
		self.polymorphic = true;
		self
	}

	pub fn with_foreign_type(mut self, foreign_type: impl Into<String>) -> Self {
		self.foreign_type = Some(foreign_type.into());
		self
	}

	pub fn with_conditions(mut self, conditions: impl Into<ScopeConditions>) -> Self {
		self.conditions = Some(conditions.into());
		self
	}

	pub fn macro_kind(&self) -> AssociationMacro {
		self.macro_kind
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The entity that declared this association
	pub fn owner(&self) -> &str {
		&self.owner
	}

	pub fn through_name(&self) -> Option<&str> {
		self.through.as_deref()
	}

	pub fn source(&self) -> Option<&str> {
		self.source.as_deref()
	}

	pub fn source_type(&self) -> Option<&str> {
		self.source_type.as_deref()
	}

	pub fn as_name(&self) -> Option<&str> {
		self.as_name.as_deref()
	}

	pub fn is_polymorphic(&self) -> bool {
		self.polymorphic
	}

	pub fn conditions(&self) -> Option<&ScopeConditions> {
		self.conditions.as_ref()
	}

	/// Explicit primary key option, if any
	pub fn primary_key(&self) -> Option<&str> {
		self.primary_key.as_deref()
	}

	/// Target class as declared, without the naming default
	pub fn declared_class_name(&self) -> Option<&str> {
		self.class_name.as_deref()
	}

	/// Target class; defaults to the camelized singular of the name
	pub fn class_name(&self) -> String {
		self.class_name
			.clone()
			.unwrap_or_else(|| inflector::classify(&self.name))
	}

	/// Foreign key as declared, without the naming default
	pub fn declared_foreign_key(&self) -> Option<&str> {
		self.foreign_key.as_deref()
	}

	/// Foreign key column
	///
	/// `belongs_to` keeps the key on the owner (`<name>_id`); the other
	/// macros keep it on the target (`<as>_id` or `<owner>_id`).
	pub fn foreign_key(&self) -> String {
		if let Some(key) = &self.foreign_key {
			return key.clone();
		}
		match (self.macro_kind, &self.as_name) {
			(AssociationMacro::BelongsTo, _) => format!("{}_id", self.name),
			(_, Some(as_name)) => format!("{as_name}_id"),
			_ => inflector::foreign_key(&self.owner),
		}
	}

	/// Key on a many-to-many join table referencing the target
	pub fn association_foreign_key(&self) -> String {
		self.association_foreign_key
			.clone()
			.unwrap_or_else(|| inflector::foreign_key(&self.class_name()))
	}

	/// Type column of a polymorphic `belongs_to`
	pub fn foreign_type(&self) -> String {
		self.foreign_type
			.clone()
			.unwrap_or_else(|| format!("{}_type", self.name))
	}

	/// Join table of a many-to-many association
	pub fn join_table(&self, owner_table: &str, target_table: &str) -> String {
		self.join_table
			.clone()
			.unwrap_or_else(|| inflector::join_table_name(owner_table, target_table))
	}

	/// Derive how this association is joined
	pub fn join_kind(&self) -> Result<JoinKind> {
		let unsupported = |reason: &str| OrmError::UnsupportedJoinKind {
			association: self.name.clone(),
			reason: reason.to_string(),
		};
		match self.macro_kind {
			AssociationMacro::BelongsTo if self.through.is_some() => {
				Err(unsupported("belongs_to cannot be declared with through"))
			}
			AssociationMacro::HasAndBelongsToMany if self.through.is_some() => Err(unsupported(
				"has_and_belongs_to_many cannot be declared with through",
			)),
			AssociationMacro::BelongsTo => Ok(JoinKind::BelongsTo),
			AssociationMacro::HasAndBelongsToMany => Ok(JoinKind::HasAndBelongsToMany),
			AssociationMacro::HasOne | AssociationMacro::HasMany if self.through.is_some() => {
				Ok(JoinKind::HasManyThrough)
			}
			AssociationMacro::HasOne | AssociationMacro::HasMany if self.as_name.is_some() => {
				Ok(JoinKind::HasManyPolymorphic)
			}
			AssociationMacro::HasOne => Ok(JoinKind::HasOne),
			AssociationMacro::HasMany => Ok(JoinKind::HasMany),
		}
	}

	/// Candidate names of the source association on the through target
	pub(crate) fn source_candidates(&self) -> Vec<String> {
		match &self.source {
			Some(source) => vec![source.clone()],
			None => {
				let singular = inflector::singularize(&self.name);
				if singular == self.name {
					vec![singular]
				} else {
					vec![singular, self.name.clone()]
				}
			}
		}
	}
}
