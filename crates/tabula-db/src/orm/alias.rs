//! Table alias allocation for one join graph
//!
//! The first use of a table keeps its bare name. Later uses get an alias
//! synthesized from the association and parent table,
//! `<pluralized association>_<parent table><suffix>`, cut to the engine's
//! identifier limit. When that alias has been issued before, it is cut
//! further and numbered `_2`, `_3`, ...

use super::inflector;
use super::settings::QuerySettings;
use std::collections::{HashMap, HashSet};

/// Usage counts per table name and per synthesized alias
#[derive(Debug, Clone)]
pub struct AliasTracker {
	counts: HashMap<String, usize>,
	issued: HashSet<String>,
	max_length: usize,
	pluralize: bool,
}

impl AliasTracker {
	pub fn new(settings: &QuerySettings) -> Self {
		Self {
			counts: HashMap::new(),
			issued: HashSet::new(),
			max_length: settings.max_identifier_length.max(4),
			pluralize: settings.pluralize_table_names,
		}
	}

	/// Record a name already present in the statement (the base table, a raw
	/// join's table or alias)
	pub fn seed(&mut self, name: &str) {
		*self.counts.entry(name.to_string()).or_default() += 1;
		self.issued.insert(name.to_string());
	}

	/// How many times `name` has been requested or seeded
	pub fn count(&self, name: &str) -> usize {
		self.counts.get(name).copied().unwrap_or(0)
	}

	/// Allocate an alias for `table`, joined through `association` from a
	/// parent stored in `parent_table`
	///
	/// `suffix` distinguishes a join table from the target of the same
	/// association (`"_join"`).
	pub fn allocate(
		&mut self,
		table: &str,
		association: &str,
		parent_table: &str,
		suffix: &str,
	) -> String {
		let used = self.count(table);
		*self.counts.entry(table.to_string()).or_default() += 1;
		if used == 0 && !self.issued.contains(table) {
			self.issued.insert(table.to_string());
			return table.to_string();
		}

		let prefix = if self.pluralize {
			inflector::pluralize(association)
		} else {
			association.to_string()
		};
		let synthesized = self.table_alias_for(&format!("{prefix}_{parent_table}{suffix}"));

		let mut alias = synthesized.clone();
		loop {
			let index = self.count(&synthesized);
			*self.counts.entry(synthesized.clone()).or_default() += 1;
			if index > 0 {
				let number = format!("_{}", index + 1);
				let keep = self.max_length.saturating_sub(number.len());
				alias = format!("{}{number}", truncate(&synthesized, keep));
			}
			if !self.issued.contains(&alias) {
				break;
			}
		}

		tracing::trace!(table, alias = %alias, "Allocated synthesized table alias");
		self.issued.insert(alias.clone());
		alias
	}

	fn table_alias_for(&self, name: &str) -> String {
		truncate(name, self.max_length).replace('.', "_")
	}
}

fn truncate(name: &str, max_chars: usize) -> &str {
	match name.char_indices().nth(max_chars) {
		Some((index, _)) => &name[..index],
		None => name,
	}
}
