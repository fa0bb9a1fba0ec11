//! Shared blog model registry for integration tests

#![allow(dead_code)]

use rstest::fixture;
use tabula_db::orm::{
	Attributes, CompiledQuery, EntityDescriptor, ModelRegistry, QueryCompiler, QuerySettings, QuerySpec,
	Reflection,
};

/// Authors, posts, comments with an inheritance chain, categories through a
/// join table and through a model, and polymorphic taggings
pub fn blog_registry() -> ModelRegistry {
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
				.with_reflection(
					Reflection::has_many("welcome_posts")
						.with_class_name("Post")
						.with_conditions(Attributes::new().with("title", "Welcome")),
				)
				.with_reflection(Reflection::has_many("comments").through("posts"))
				.with_reflection(Reflection::has_many("categorizations"))
				.with_reflection(Reflection::has_many("categories").through("categorizations")),
		)
		.unwrap()
		.register(
			EntityDescriptor::new("Post")
				.with_reflection(Reflection::belongs_to("author"))
				.with_reflection(Reflection::has_many("comments"))
				.with_reflection(Reflection::has_many("special_comments"))
				.with_reflection(Reflection::has_and_belongs_to_many("categories"))
				.with_reflection(Reflection::has_many("taggings").with_as("taggable"))
				.with_reflection(Reflection::has_many("tags").through("taggings"))
				.with_reflection(Reflection::belongs_to("attachable").polymorphic()),
		)
		.unwrap()
		.register(EntityDescriptor::new("Comment").with_reflection(Reflection::belongs_to("post")))
		.unwrap()
		.register(EntityDescriptor::new("SpecialComment").inherits("Comment"))
		.unwrap()
		.register(EntityDescriptor::new("SubSpecialComment").inherits("SpecialComment"))
		.unwrap()
		.register(EntityDescriptor::new("VerySpecialComment").inherits("SpecialComment"))
		.unwrap()
		.register(
			EntityDescriptor::new("Category")
				.with_reflection(Reflection::has_and_belongs_to_many("posts"))
				.with_reflection(Reflection::has_many("categorizations")),
		)
		.unwrap()
		.register(
			EntityDescriptor::new("Categorization")
				.with_reflection(Reflection::belongs_to("author"))
				.with_reflection(Reflection::belongs_to("category")),
		)
		.unwrap()
		.register(
			EntityDescriptor::new("Tagging")
				.with_reflection(Reflection::belongs_to("tag"))
				.with_reflection(Reflection::belongs_to("taggable").polymorphic()),
		)
		.unwrap()
		.register(
			EntityDescriptor::new("Tag")
				.with_reflection(Reflection::has_many("taggings"))
				.with_reflection(
					Reflection::has_many("tagged_posts")
						.through("taggings")
						.with_source("taggable")
						.with_source_type("Post"),
				),
		)
		.unwrap();
	registry
}

#[fixture]
pub fn registry() -> ModelRegistry {
	blog_registry()
}

pub fn spec(registry: &ModelRegistry, class_name: &str) -> QuerySpec {
	QuerySpec::for_entity(registry, class_name).unwrap()
}

pub fn compile(registry: &ModelRegistry, spec: &QuerySpec) -> CompiledQuery {
	compile_with(registry, &QuerySettings::default(), spec)
}

pub fn compile_with(
	registry: &ModelRegistry,
	settings: &QuerySettings,
	spec: &QuerySpec,
) -> CompiledQuery {
	QueryCompiler::new(registry, settings).compile(spec).unwrap()
}
