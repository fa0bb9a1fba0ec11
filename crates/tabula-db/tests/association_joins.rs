//! Association join compilation against the blog registry

mod common;

use common::{compile, compile_with, registry, spec};
use rstest::rstest;
use std::collections::HashSet;
use tabula_db::orm::{
	AssociationRef, ModelRegistry, OrmError, QueryCompiler, QuerySettings, RawJoin,
	ensure_assignable,
};

#[rstest]
fn test_has_many_join(registry: ModelRegistry) {
	let compiled = compile(&registry, &spec(&registry, "Author").joins("posts"));

	assert_eq!(
		compiled.to_sql(),
		r#"SELECT "authors".* FROM "authors" INNER JOIN "posts" ON "posts"."author_id" = "authors"."id""#
	);
	assert!(compiled.readonly);
}

#[rstest]
fn test_belongs_to_join(registry: ModelRegistry) {
	let sql = compile(&registry, &spec(&registry, "Post").joins("author")).to_sql();

	assert_eq!(
		sql,
		r#"SELECT "posts".* FROM "posts" INNER JOIN "authors" ON "authors"."id" = "posts"."author_id""#
	);
}

#[rstest]
fn test_has_many_through_emits_both_hops(registry: ModelRegistry) {
	let sql = compile(&registry, &spec(&registry, "Author").joins("comments")).to_sql();

	assert_eq!(
		sql,
		concat!(
			r#"SELECT "authors".* FROM "authors" "#,
			r#"INNER JOIN "posts" ON "authors"."id" = "posts"."author_id" "#,
			r#"INNER JOIN "comments" ON "comments"."post_id" = "posts"."id""#,
		)
	);
}

#[rstest]
fn test_through_with_belongs_to_source(registry: ModelRegistry) {
	let sql = compile(&registry, &spec(&registry, "Author").joins("categories")).to_sql();

	assert!(
		sql.contains(r#"INNER JOIN "categorizations" ON "authors"."id" = "categorizations"."author_id""#),
		"{sql}"
	);
	assert!(
		sql.contains(r#"INNER JOIN "categories" ON "categories"."id" = "categorizations"."category_id""#),
		"{sql}"
	);
}

#[rstest]
fn test_has_and_belongs_to_many_uses_join_table(registry: ModelRegistry) {
	let sql = compile(&registry, &spec(&registry, "Post").joins("categories")).to_sql();

	assert_eq!(
		sql,
		concat!(
			r#"SELECT "posts".* FROM "posts" "#,
			r#"INNER JOIN "categories_posts" ON "categories_posts"."post_id" = "posts"."id" "#,
			r#"INNER JOIN "categories" ON "categories"."id" = "categories_posts"."category_id""#,
		)
	);
}

#[rstest]
fn test_polymorphic_has_many_filters_owner_type(registry: ModelRegistry) {
	let sql = compile(&registry, &spec(&registry, "Post").joins("taggings")).to_sql();

	assert!(
		sql.ends_with(
			r#"INNER JOIN "taggings" ON "taggings"."taggable_id" = "posts"."id" AND "taggings"."taggable_type" = 'Post'"#
		),
		"{sql}"
	);
}

#[rstest]
fn test_through_polymorphic_interface(registry: ModelRegistry) {
	let sql = compile(&registry, &spec(&registry, "Post").joins("tags")).to_sql();

	assert!(
		sql.contains(
			r#"INNER JOIN "taggings" ON "posts"."id" = "taggings"."taggable_id" AND "taggings"."taggable_type" = 'Post'"#
		),
		"{sql}"
	);
	assert!(
		sql.ends_with(r#"INNER JOIN "tags" ON "tags"."id" = "taggings"."tag_id""#),
		"{sql}"
	);
}

#[rstest]
fn test_source_type_restricts_polymorphic_source(registry: ModelRegistry) {
	let sql = compile(&registry, &spec(&registry, "Tag").joins("tagged_posts")).to_sql();

	assert!(
		sql.contains(
			r#"INNER JOIN "taggings" ON "tags"."id" = "taggings"."tag_id" AND "taggings"."taggable_type" = 'Post'"#
		),
		"{sql}"
	);
	assert!(
		sql.ends_with(r#"INNER JOIN "posts" ON "posts"."id" = "taggings"."taggable_id""#),
		"{sql}"
	);
}

#[rstest]
fn test_inheritance_subclass_target_filters_type_chain(registry: ModelRegistry) {
	let sql = compile(&registry, &spec(&registry, "Post").joins("special_comments")).to_sql();

	assert!(sql.contains(r#""comments"."post_id" = "posts"."id""#), "{sql}");
	assert!(
		sql.contains(concat!(
			r#""comments"."type" = 'SpecialComment' OR "comments"."type" = 'SubSpecialComment' "#,
			r#"OR "comments"."type" = 'VerySpecialComment'"#,
		)),
		"{sql}"
	);
}

#[rstest]
fn test_inheritance_base_scope(registry: ModelRegistry) {
	let sql = compile(&registry, &spec(&registry, "SpecialComment")).to_sql();
	assert_eq!(
		sql,
		r#"SELECT "comments".* FROM "comments" WHERE "comments"."type" IN ('SpecialComment', 'SubSpecialComment', 'VerySpecialComment')"#
	);

	let sql = compile(&registry, &spec(&registry, "SubSpecialComment")).to_sql();
	assert!(sql.ends_with(r#"WHERE "comments"."type" IN ('SubSpecialComment')"#), "{sql}");

	let sql = compile(&registry, &spec(&registry, "Comment")).to_sql();
	assert_eq!(sql, r#"SELECT "comments".* FROM "comments""#);
}

#[rstest]
fn test_same_table_twice_gets_synthesized_alias(registry: ModelRegistry) {
	let spec = spec(&registry, "Post").joins(["comments", "special_comments"]);
	let sql = compile(&registry, &spec).to_sql();

	assert!(sql.contains(r#"INNER JOIN "comments" ON"#), "{sql}");
	assert!(
		sql.contains(
			r#"INNER JOIN "comments" AS "special_comments_posts" ON "special_comments_posts"."post_id" = "posts"."id""#
		),
		"{sql}"
	);
}

#[rstest]
fn test_aliases_are_unique_and_bounded(registry: ModelRegistry) {
	let settings = QuerySettings::default().with_max_identifier_length(20);
	let spec = spec(&registry, "Author")
		.joins(AssociationRef::new("posts").nest("comments").nest("special_comments"))
		.joins(["thinking_posts", "comments"]);

	let graph = QueryCompiler::new(&registry, &settings)
		.resolve_joins(&spec)
		.unwrap();

	let mut seen = HashSet::from(["authors".to_string()]);
	for node in graph.nodes() {
		assert!(node.alias.chars().count() <= 20, "{}", node.alias);
		assert!(seen.insert(node.alias.clone()), "duplicate alias {}", node.alias);
		if let Some(alias) = &node.join_table_alias {
			assert!(alias.chars().count() <= 20, "{alias}");
			assert!(seen.insert(alias.clone()), "duplicate alias {alias}");
		}
	}
	let thinking = graph
		.node_for_path(&["thinking_posts".to_string()])
		.unwrap();
	assert_eq!(thinking.alias, "thinking_posts_autho");
}

#[rstest]
fn test_scope_conditions_join_the_on_clause(registry: ModelRegistry) {
	let sql = compile(&registry, &spec(&registry, "Author").joins("thinking_posts")).to_sql();

	assert!(sql.contains(r#"INNER JOIN "posts" ON "posts"."author_id" = "authors"."id" AND"#), "{sql}");
	assert!(sql.contains("title = 'So I was thinking'"), "{sql}");
}

#[rstest]
fn test_scope_conditions_use_the_node_alias(registry: ModelRegistry) {
	let spec = spec(&registry, "Author").joins(["posts", "welcome_posts"]);
	let sql = compile(&registry, &spec).to_sql();

	assert!(
		sql.contains(r#"INNER JOIN "posts" AS "welcome_posts_authors" ON "welcome_posts_authors"."author_id" = "authors"."id""#),
		"{sql}"
	);
	assert!(
		sql.ends_with(r#"AND "welcome_posts_authors"."title" = 'Welcome'"#),
		"{sql}"
	);
	assert!(!sql.contains(r#""posts"."title""#), "{sql}");
}

#[rstest]
fn test_nested_join_reads_from_parent_alias(registry: ModelRegistry) {
	let spec = spec(&registry, "Author").joins(AssociationRef::new("posts").nest("comments"));
	let sql = compile(&registry, &spec).to_sql();

	assert!(
		sql.ends_with(r#"INNER JOIN "comments" ON "comments"."post_id" = "posts"."id""#),
		"{sql}"
	);
}

#[rstest]
fn test_resolved_nodes_graft_by_path(registry: ModelRegistry) {
	let settings = QuerySettings::default();
	let compiler = QueryCompiler::new(&registry, &settings);
	let source = spec(&registry, "Author").joins(AssociationRef::new("posts").nest("comments"));
	let graph = compiler.resolve_joins(&source).unwrap();
	let comments = graph.nodes()[1].clone();

	let grafted = spec(&registry, "Author").joins(comments);
	let sql = compile_with(&registry, &settings, &grafted).to_sql();

	assert_eq!(sql, compile(&registry, &source).to_sql());
}

#[rstest]
fn test_raw_join_seeds_aliases(registry: ModelRegistry) {
	let spec = spec(&registry, "Author")
		.joins(RawJoin::inner("posts", "posts.author_id = authors.id"))
		.joins("posts");
	let sql = compile(&registry, &spec).to_sql();

	assert!(sql.contains(r#"INNER JOIN "posts" ON posts.author_id = authors.id"#), "{sql}");
	assert!(
		sql.contains(r#"INNER JOIN "posts" AS "posts_authors" ON "posts_authors"."author_id" = "authors"."id""#),
		"{sql}"
	);
}

#[rstest]
#[case("Post", "attachable")]
fn test_polymorphic_belongs_to_cannot_be_joined(
	registry: ModelRegistry,
	#[case] entity: &str,
	#[case] association: &str,
) {
	let settings = QuerySettings::default();
	let err = QueryCompiler::new(&registry, &settings)
		.compile(&spec(&registry, entity).joins(association))
		.unwrap_err();

	assert!(matches!(err, OrmError::EagerLoadPolymorphic { .. }), "{err}");
	assert!(err.is_configuration_error());
}

#[rstest]
fn test_eager_load_joins_outer(registry: ModelRegistry) {
	let compiled = compile(
		&registry,
		&spec(&registry, "Author").eager_load(AssociationRef::new("posts").nest("comments")),
	);

	assert_eq!(
		compiled.to_sql(),
		r#"SELECT "authors".* FROM "authors" LEFT JOIN "posts" ON "posts"."author_id" = "authors"."id" LEFT JOIN "comments" ON "comments"."post_id" = "posts"."id""#
	);
	assert!(!compiled.readonly);
	assert!(compiled.preloads.is_empty());
}

#[rstest]
fn test_eager_load_reuses_explicit_inner_join(registry: ModelRegistry) {
	let spec = spec(&registry, "Author").joins("posts").eager_load("posts");
	let compiled = compile(&registry, &spec);
	let sql = compiled.to_sql();

	assert_eq!(sql.matches("JOIN").count(), 1, "{sql}");
	assert!(sql.contains(r#"INNER JOIN "posts""#), "{sql}");
	assert!(compiled.readonly);
}

#[rstest]
fn test_includes_referenced_in_where_become_outer_joins(registry: ModelRegistry) {
	let referenced = spec(&registry, "Author")
		.includes("posts")
		.filter("posts.title = 'Welcome'");
	let compiled = compile(&registry, &referenced);
	assert!(
		compiled.to_sql().contains(r#"LEFT JOIN "posts" ON "posts"."author_id" = "authors"."id""#),
		"{}",
		compiled.to_sql()
	);
	assert!(compiled.preloads.is_empty());

	let unreferenced = spec(&registry, "Author").includes("posts");
	let compiled = compile(&registry, &unreferenced);
	assert_eq!(compiled.to_sql(), r#"SELECT "authors".* FROM "authors""#);
	assert_eq!(compiled.preloads, vec![AssociationRef::new("posts")]);
}

#[rstest]
fn test_eager_load_of_polymorphic_association_fails(registry: ModelRegistry) {
	let settings = QuerySettings::default();
	let err = QueryCompiler::new(&registry, &settings)
		.compile(&spec(&registry, "Post").eager_load("attachable"))
		.unwrap_err();

	assert!(matches!(err, OrmError::EagerLoadPolymorphic { .. }), "{err}");
}

#[rstest]
fn test_unknown_association_is_reported(registry: ModelRegistry) {
	let settings = QuerySettings::default();
	let err = QueryCompiler::new(&registry, &settings)
		.compile(&spec(&registry, "Author").joins("postz"))
		.unwrap_err();

	assert_eq!(
		err.to_string(),
		"Association named 'postz' was not found on Author; perhaps you misspelled it?"
	);
}

#[rstest]
#[case("Post", "comments", "SubSpecialComment", true)]
#[case("Post", "special_comments", "VerySpecialComment", true)]
#[case("Post", "special_comments", "Comment", false)]
#[case("Post", "author", "Comment", false)]
#[case("Post", "attachable", "Comment", true)]
fn test_assignment_type_check(
	registry: ModelRegistry,
	#[case] owner: &str,
	#[case] association: &str,
	#[case] record: &str,
	#[case] accepted: bool,
) {
	assert_eq!(
		ensure_assignable(&registry, owner, association, record).is_ok(),
		accepted
	);
}
