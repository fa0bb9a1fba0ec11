//! Naming conventions used to derive default keys, classes and aliases

use heck::{ToSnakeCase, ToUpperCamelCase};

const UNCOUNTABLE: &[&str] = &["equipment", "information", "rice", "money", "species", "series", "fish", "sheep"];

/// Pluralize a snake_case word
///
/// Only the trailing word segment is inflected, so `special_comment` becomes
/// `special_comments`.
pub fn pluralize(word: &str) -> String {
	if word.is_empty() || UNCOUNTABLE.contains(&last_segment(word)) {
		return word.to_string();
	}
	if word.ends_with("ies") || (word.ends_with('s') && !word.ends_with("ss")) {
		return word.to_string();
	}
	if let Some(stem) = word.strip_suffix('y') {
		if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
			return format!("{stem}ies");
		}
	}
	if word.ends_with("ss") || word.ends_with('x') || word.ends_with("ch") || word.ends_with("sh") {
		return format!("{word}es");
	}
	format!("{word}s")
}

/// Singularize a snake_case word
pub fn singularize(word: &str) -> String {
	if UNCOUNTABLE.contains(&last_segment(word)) {
		return word.to_string();
	}
	if let Some(stem) = word.strip_suffix("ies") {
		return format!("{stem}y");
	}
	for suffix in ["sses", "xes", "ches", "shes"] {
		if word.ends_with(suffix) {
			return word[..word.len() - 2].to_string();
		}
	}
	if word.ends_with("ss") {
		return word.to_string();
	}
	word.strip_suffix('s').unwrap_or(word).to_string()
}

/// Class name for an association name: `special_comments` -> `SpecialComment`
pub fn classify(name: &str) -> String {
	singularize(&name.to_snake_case()).to_upper_camel_case()
}

/// Foreign key column referencing a class: `SpecialComment` -> `special_comment_id`
pub fn foreign_key(class_name: &str) -> String {
	format!("{}_id", demodulize(class_name).to_snake_case())
}

/// Table name for a class: `SpecialComment` -> `special_comments`
pub fn tableize(class_name: &str) -> String {
	pluralize(&demodulize(class_name).to_snake_case())
}

/// Default join table of a many-to-many association
///
/// Both table names are sorted lexically and joined with an underscore.
pub fn join_table_name(left: &str, right: &str) -> String {
	let (first, second) = if left <= right { (left, right) } else { (right, left) };
	format!("{first}_{second}")
}

fn demodulize(class_name: &str) -> &str {
	class_name.rsplit("::").next().unwrap_or(class_name)
}

fn last_segment(word: &str) -> &str {
	word.rsplit('_').next().unwrap_or(word)
}
