//! Association assignment checks

use super::errors::{OrmError, Result};
use super::registry::ReflectionRegistry;

/// Check that a record of `record_entity` may be assigned into the
/// `association` slot of `owner`
///
/// The record must be the declared target entity or one of its registered
/// subclasses. Polymorphic `belongs_to` slots accept any entity.
///
/// # Examples
///
/// ```
/// use tabula_db::orm::associations::ensure_assignable;
/// use tabula_db::orm::reflection::Reflection;
/// use tabula_db::orm::registry::{EntityDescriptor, ModelRegistry};
///
/// let mut registry = ModelRegistry::new();
/// registry
///     .register(EntityDescriptor::new("Post").with_reflection(Reflection::belongs_to("author")))
///     .unwrap()
///     .register(EntityDescriptor::new("Author"))
///     .unwrap()
///     .register(EntityDescriptor::new("Comment"))
///     .unwrap();
///
/// assert!(ensure_assignable(&registry, "Post", "author", "Author").is_ok());
/// assert!(ensure_assignable(&registry, "Post", "author", "Comment").is_err());
/// ```
pub fn ensure_assignable(
	registry: &dyn ReflectionRegistry,
	owner: &str,
	association: &str,
	record_entity: &str,
) -> Result<()> {
	let reflection = registry.reflection_for(owner, association)?;
	if reflection.is_polymorphic() {
		return Ok(());
	}

	let expected = reflection.class_name();
	if registry.is_a(record_entity, &expected)? {
		return Ok(());
	}

	tracing::warn!(
		owner,
		association,
		expected = %expected,
		actual = record_entity,
		"Rejected association assignment"
	);
	Err(OrmError::AssociationTypeMismatch {
		expected,
		actual: record_entity.to_string(),
	})
}
