//! Query specification behaviour through compilation

mod common;

use common::{compile, registry, spec};
use rstest::rstest;
use tabula_db::orm::{
	Attributes, Clause, FilterValue, LockMode, ModelRegistry, OrderExpr, QuerySettings, QuerySpec,
	SqlFragment,
};

#[rstest]
fn test_refinements_leave_the_base_untouched(registry: ModelRegistry) {
	let base = spec(&registry, "Author").filter([("name", "David")]);
	let before = base.clone();

	let refined = base
		.joins("posts")
		.order("authors.id")
		.limit(3)
		.lock(LockMode::Update)
		.readonly(true);

	assert_eq!(base, before);
	assert_ne!(refined, base);
	assert_eq!(
		compile(&registry, &base).to_sql(),
		r#"SELECT "authors".* FROM "authors" WHERE "authors"."name" = 'David'"#
	);
}

#[rstest]
fn test_blank_arguments_do_not_change_the_query(registry: ModelRegistry) {
	let base = spec(&registry, "Author");
	let none: Option<&str> = None;

	let unchanged = base
		.filter("")
		.filter("   ")
		.filter(Attributes::new())
		.filter(SqlFragment::new(""))
		.select(none)
		.select(Vec::<String>::new())
		.group("")
		.order("")
		.joins("")
		.joins(Vec::<String>::new())
		.having("");

	assert_eq!(unchanged, base);
	assert_eq!(compile(&registry, &unchanged).to_sql(), compile(&registry, &base).to_sql());
}

#[rstest]
fn test_where_folding(registry: ModelRegistry) {
	let spec = spec(&registry, "Post")
		.filter([("author_id", 1)])
		.filter([("author_id", 2)])
		.filter([("title", "Welcome")])
		.filter("comments_count > 0");

	let sql = compile(&registry, &spec).to_sql();

	assert!(
		sql.contains(r#""posts"."author_id" = 1 OR "posts"."author_id" = 2"#),
		"{sql}"
	);
	assert!(sql.contains(r#" AND "posts"."title" = 'Welcome' AND "#), "{sql}");
	assert!(sql.ends_with(" AND (comments_count > 0)"), "{sql}");
	assert!(!sql.contains("(("), "{sql}");
}

#[rstest]
fn test_duplicate_clauses_are_emitted_once(registry: ModelRegistry) {
	let spec = spec(&registry, "Post")
		.joins("author")
		.joins("author")
		.select("posts.id")
		.select("posts.id")
		.filter("posts.id > 1")
		.filter("posts.id > 1");

	assert_eq!(spec.joins_values().len(), 1);
	assert_eq!(spec.select_values(), ["posts.id"]);
	let sql = compile(&registry, &spec).to_sql();
	assert_eq!(sql.matches("INNER JOIN").count(), 1, "{sql}");
	assert_eq!(sql.matches("posts.id > 1").count(), 1, "{sql}");
}

#[rstest]
#[case(None, "authors.id DESC")]
#[case(Some("name"), "name DESC")]
#[case(Some("name ASC, created_at desc"), "name DESC, created_at ASC")]
fn test_reverse_order(registry: ModelRegistry, #[case] order: Option<&str>, #[case] expected: &str) {
	let spec = spec(&registry, "Author").order(order).reverse_order();

	let rendered: Vec<String> = spec.order_values().iter().map(OrderExpr::to_string).collect();
	assert_eq!(rendered.join(", "), expected);
	assert!(compile(&registry, &spec).to_sql().ends_with(&format!("ORDER BY {expected}")));
}

#[rstest]
fn test_except_resets_clauses(registry: ModelRegistry) {
	let spec = spec(&registry, "Author")
		.joins("posts")
		.order("authors.id")
		.limit(5)
		.offset(10);

	let bare = spec.except(&[Clause::Joins, Clause::Order, Clause::Limit, Clause::Offset]);

	assert_eq!(bare, QuerySpec::for_entity(&registry, "Author").unwrap());
	assert!(!compile(&registry, &bare).readonly);
}

#[rstest]
fn test_scope_for_create(registry: ModelRegistry) {
	let spec = spec(&registry, "Post")
		.filter([("author_id", 1)])
		.filter("comments_count > 0")
		.create_with([("title", "Draft")]);

	let attributes = spec.scope_for_create();

	assert_eq!(attributes.len(), 2);
	assert_eq!(
		attributes.get("author_id").and_then(|v| v.as_value()),
		Some(&FilterValue::Integer(1))
	);
	assert_eq!(
		attributes.get("title").and_then(|v| v.as_value()),
		Some(&FilterValue::from("Draft"))
	);
}

#[rstest]
fn test_settings_from_toml() {
	let settings = QuerySettings::from_toml_str(
		r#"
max_identifier_length = 30
pluralize_table_names = false
"#,
	)
	.unwrap();

	assert_eq!(settings.max_identifier_length, 30);
	assert!(!settings.pluralize_table_names);
	assert_eq!(settings.default_primary_key, "id");
}
