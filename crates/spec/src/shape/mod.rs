//! Turns declared methods into the lookup-ready [`SchemaSpec`].
//!
//! Declarations arrive in source order. Finalizing validates them, sorts every key table by
//! name, numbers keys, builds first-byte jump tables, computes the node and key-slot capacities
//! a fully populated compiled tree needs, and renders each method's base default string.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::{JUMP_LEN, KeySpec, KeyTable, KeyType, MAX_KEY_POSITIONS, MethodSpec, SchemaSpec};

#[cfg(test)]
mod tests;

/// Characters that cannot appear in a bare key name or an unquoted default.
const SEPARATORS: &[char] = &[',', '=', ':', '(', ')', '[', ']', '"'];

/// A key as written in the schema source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDecl {
	pub name: String,
	pub key_type: KeyType,
	pub default: Option<String>,
	pub choices: Vec<String>,
	pub sub: Vec<KeyDecl>,
}

impl KeyDecl {
	pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
		Self {
			name: name.into(),
			key_type,
			default: None,
			choices: Vec::new(),
			sub: Vec::new(),
		}
	}

	pub fn with_default(mut self, default: impl Into<String>) -> Self {
		self.default = Some(default.into());
		self
	}

	pub fn with_choices<I, S>(mut self, choices: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.choices = choices.into_iter().map(Into::into).collect();
		self
	}

	pub fn with_sub(mut self, sub: Vec<KeyDecl>) -> Self {
		self.sub = sub;
		self
	}
}

/// A method as written in the schema source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
	pub name: String,
	pub compilable: bool,
	pub keys: Vec<KeyDecl>,
}

/// Malformed schema source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
	#[error("duplicate method '{0}'")]
	DuplicateMethod(String),
	#[error("{context}: duplicate key '{key}'")]
	DuplicateKey { context: String, key: String },
	#[error("{context}: invalid key name '{key}'")]
	InvalidKeyName { context: String, key: String },
	#[error("{context}: {key_type} key '{key}' cannot have {what}")]
	Unsupported {
		context: String,
		key: String,
		key_type: KeyType,
		what: &'static str,
	},
	#[error("{context}: category '{key}' declares no sub-keys")]
	EmptyCategory { context: String, key: String },
	#[error("{context}: invalid default '{value}' for {key_type} key '{key}'")]
	InvalidDefault {
		context: String,
		key: String,
		key_type: KeyType,
		value: String,
	},
	#[error("method '{method}' needs {needed} key slots, more than {MAX_KEY_POSITIONS}")]
	TooManyKeys { method: String, needed: u32 },
	#[error("schema declares {0} distinct keys, more than a key id can hold")]
	TooManyKeyIds(usize),
}

/// Validates and lays out declared methods.
///
/// Methods keep their declared order; keys are sorted by name at every level.
pub fn finalize(methods: Vec<MethodDecl>) -> Result<SchemaSpec, SpecError> {
	let mut seen = HashSet::new();
	for method in &methods {
		if !seen.insert(method.name.as_str()) {
			return Err(SpecError::DuplicateMethod(method.name.clone()));
		}
		validate_keys(&method.keys, &format!("method '{}'", method.name))?;
	}

	let mut names = BTreeSet::new();
	for method in &methods {
		collect_ids(&method.keys, &mut names);
	}
	if names.len() > usize::from(u16::MAX) {
		return Err(SpecError::TooManyKeyIds(names.len()));
	}
	let ids: BTreeMap<(String, KeyType), u16> =
		names.into_iter().enumerate().map(|(id, name)| (name, id as u16)).collect();

	let mut out = Vec::with_capacity(methods.len());
	for method in methods {
		let keys = build_table(method.keys, &ids);
		let (node_capacity, key_capacity) = capacities(&keys);
		if key_capacity > MAX_KEY_POSITIONS {
			return Err(SpecError::TooManyKeys {
				method: method.name,
				needed: key_capacity,
			});
		}
		out.push(MethodSpec {
			base: render_table(&keys),
			name: method.name,
			compilable: method.compilable,
			keys,
			node_capacity,
			key_capacity,
		});
	}

	Ok(SchemaSpec {
		methods: out,
		key_id_count: ids.len() as u16,
	})
}

fn validate_keys(keys: &[KeyDecl], context: &str) -> Result<(), SpecError> {
	let mut seen = HashSet::new();
	for key in keys {
		let bad_name = key.name.is_empty()
			|| !key.name.is_ascii()
			|| key.name.chars().any(|c| c.is_whitespace() || SEPARATORS.contains(&c));
		if bad_name {
			return Err(SpecError::InvalidKeyName {
				context: context.to_string(),
				key: key.name.clone(),
			});
		}
		if !seen.insert(key.name.as_str()) {
			return Err(SpecError::DuplicateKey {
				context: context.to_string(),
				key: key.name.clone(),
			});
		}
		validate_key(key, context)?;
		if !key.sub.is_empty() {
			validate_keys(&key.sub, &format!("{context} key '{}'", key.name))?;
		}
	}
	Ok(())
}

fn validate_key(key: &KeyDecl, context: &str) -> Result<(), SpecError> {
	let unsupported = |what| SpecError::Unsupported {
		context: context.to_string(),
		key: key.name.clone(),
		key_type: key.key_type,
		what,
	};
	let invalid_default = |value: &str| SpecError::InvalidDefault {
		context: context.to_string(),
		key: key.name.clone(),
		key_type: key.key_type,
		value: value.to_string(),
	};

	if !key.choices.is_empty() && matches!(key.key_type, KeyType::Int | KeyType::Boolean) {
		return Err(unsupported("choices"));
	}
	if !key.sub.is_empty() && !key.key_type.is_struct() {
		return Err(unsupported("sub-keys"));
	}
	if !key.sub.is_empty() && !key.choices.is_empty() {
		return Err(unsupported("both choices and sub-keys"));
	}
	if key.key_type == KeyType::Category && key.sub.is_empty() {
		return Err(SpecError::EmptyCategory {
			context: context.to_string(),
			key: key.name.clone(),
		});
	}
	if !key.sub.is_empty() && key.default.is_some() {
		return Err(unsupported("a default"));
	}

	match (key.key_type, key.default.as_deref()) {
		(KeyType::Int, None) => Err(invalid_default("")),
		(KeyType::Int, Some(value)) => confc_parser::parse_int(value)
			.map(|_| ())
			.map_err(|_| invalid_default(value)),
		(KeyType::Boolean, Some(value)) if !matches!(value, "true" | "false" | "0" | "1") => {
			Err(invalid_default(value))
		}
		(_, Some(value))
			if !key.choices.is_empty()
				&& !value.is_empty()
				&& !value.starts_with(['(', '['])
				&& !key.choices.iter().any(|choice| choice == value) =>
		{
			Err(invalid_default(value))
		}
		_ => Ok(()),
	}
}

fn collect_ids(keys: &[KeyDecl], out: &mut BTreeSet<(String, KeyType)>) {
	for key in keys {
		out.insert((key.name.clone(), key.key_type));
		collect_ids(&key.sub, out);
	}
}

fn build_table(mut decls: Vec<KeyDecl>, ids: &BTreeMap<(String, KeyType), u16>) -> KeyTable {
	decls.sort_by(|a, b| a.name.cmp(&b.name));
	let keys: Vec<KeySpec> = decls
		.into_iter()
		.map(|decl| {
			let key_id = ids[&(decl.name.clone(), decl.key_type)];
			let sub = (!decl.sub.is_empty()).then(|| build_table(decl.sub, ids));
			KeySpec {
				name: decl.name,
				key_type: decl.key_type,
				key_id,
				default: decl.default,
				choices: decl.choices,
				sub,
			}
		})
		.collect();
	let jump = jump_table(&keys);
	KeyTable { keys, jump }
}

/// `jump[b]` counts the keys whose first byte sorts before `b`.
pub fn jump_table(keys: &[KeySpec]) -> Vec<u16> {
	(0..JUMP_LEN)
		.map(|byte| keys.iter().filter(|key| usize::from(key.name.as_bytes()[0]) < byte).count() as u16)
		.collect()
}

/// Returns `(nodes, key slots)` for a fully populated compiled tree of `table`.
///
/// A node counts itself plus its nested nodes; its key slots include every nested slot.
pub fn capacities(table: &KeyTable) -> (u32, u32) {
	let mut nodes = 1;
	let mut keys = table.keys.len() as u32;
	for sub in table.keys.iter().filter_map(|key| key.sub.as_ref()) {
		let (sub_nodes, sub_keys) = capacities(sub);
		nodes += sub_nodes;
		keys += sub_keys;
	}
	(nodes, keys)
}

fn render_table(table: &KeyTable) -> String {
	table
		.keys
		.iter()
		.map(|key| format!("{}={}", key.name, render_default(key)))
		.collect::<Vec<_>>()
		.join(",")
}

fn render_default(key: &KeySpec) -> String {
	if let Some(sub) = &key.sub {
		return format!("({})", render_table(sub));
	}
	match (key.default.as_deref(), key.key_type) {
		(Some(value), _) => quote_if_needed(value),
		(None, KeyType::Boolean) => "false".to_string(),
		(None, _) => String::new(),
	}
}

fn quote_if_needed(value: &str) -> String {
	let plain = value.starts_with(['(', '['])
		|| !value.chars().any(|c| c.is_whitespace() || SEPARATORS.contains(&c));
	if plain {
		value.to_string()
	} else {
		format!("\"{}\"", value.replace('"', "\\\""))
	}
}
