//! Compile engine: walks configuration text against a method's key tables and writes values,
//! nested nodes and placeholder descriptors into a [`ConfTree`].
//!
//! Strings are compiled in order. Values from default strings land as [`ConfKey::Default`] and
//! set the node's default bit; values from the user string land as [`ConfKey::Override`] and
//! clear it. Within one string the last occurrence of a key wins.

use std::borrow::Cow;
use std::ops::Range;

use confc_parser::{ConfigItem, ConfigParser, ItemType};
use confc_spec::{KeySpec, KeyTable, KeyType};
use tracing::trace;

use crate::error::{ConfError, Result};
use crate::layout::{BindDesc, BindKind, ConfItem, ConfKey, ConfTree, NodeIdx, TextSpan};
use crate::schema::{MethodId, Schema};


/// Whether a configuration string supplies defaults or caller overrides.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Origin {
	Default,
	Override,
}

/// Value kind a declared key type expects from the tokenizer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ItemKind {
	Num,
	Bool,
	String,
	Struct,
}

impl ItemKind {
	fn of(key_type: KeyType) -> Self {
		match key_type {
			KeyType::Int => ItemKind::Num,
			KeyType::Boolean => ItemKind::Bool,
			KeyType::Format | KeyType::String => ItemKind::String,
			KeyType::Category | KeyType::List => ItemKind::Struct,
		}
	}
}

/// Settings shared by every node compiled from one source string.
struct Pass<'a> {
	method: &'a str,
	text: &'a str,
	source: u32,
	bind_allowed: bool,
	is_default: bool,
}

/// Compiles the method's base defaults plus an optional user string into a fresh tree.
///
/// Placeholders are allowed in `user`.
pub fn compile<'s>(schema: &'s Schema, method: MethodId, user: Option<&'s str>) -> Result<ConfTree<'s>> {
	let mut tree = ConfTree::new(schema, method);
	let base = Cow::Borrowed(tree.method().base.as_str());
	let sources = std::iter::once((base, Origin::Default)).chain(user.map(|text| (Cow::Borrowed(text), Origin::Override)));
	compile_into(&mut tree, sources, true)?;
	Ok(tree)
}

/// Compiles `sources` in order on top of whatever `tree` already holds.
///
/// Each source is retained by the tree, even when compiling it fails, so spans written before
/// the error stay addressable.
pub fn compile_into<'s, I>(tree: &mut ConfTree<'s>, sources: I, bind_allowed: bool) -> Result<()>
where
	I: IntoIterator<Item = (Cow<'s, str>, Origin)>,
{
	let method = tree.method();
	for (text, origin) in sources {
		let pass = Pass {
			method: &method.name,
			text: &text,
			source: tree.source_count(),
			bind_allowed,
			is_default: origin == Origin::Default,
		};
		let result = compile_node(tree, NodeIdx::ROOT, &method.keys, &pass, 0..text.len());
		tree.push_source(text);
		result?;
	}
	Ok(())
}

fn compile_node<'s>(
	tree: &mut ConfTree<'s>,
	node: NodeIdx,
	table: &'s KeyTable,
	pass: &Pass<'_>,
	range: Range<usize>,
) -> Result<()> {
	for pair in ConfigParser::within(pass.text, range) {
		let (key, value) = pair?;
		let Some(spec) = table.lookup(key.text) else {
			return Err(ConfError::UnknownKey {
				config: pass.text.to_string(),
				key: key.text.to_string(),
				method: pass.method.to_string(),
			});
		};
		trace!(domain = "conf", method = pass.method, key = key.text, value = value.text, "compiling key");

		let kind = ItemKind::of(spec.key_type);
		if value.text.starts_with('%') {
			compile_placeholder(tree, node, spec, kind, value, pass)?;
		} else if kind == ItemKind::Struct {
			compile_struct(tree, node, spec, key, value, pass)?;
		} else {
			let item = compile_value(spec, kind, key, value, pass)?;
			store(tree, node, spec, key, item, pass)?;
		}
	}
	Ok(())
}

fn compile_placeholder<'s>(
	tree: &mut ConfTree<'s>,
	node: NodeIdx,
	spec: &'s KeySpec,
	kind: ItemKind,
	value: ConfigItem<'_>,
	pass: &Pass<'_>,
) -> Result<()> {
	if !pass.bind_allowed {
		return Err(ConfError::PlaceholderNotAllowed(value.text.to_string()));
	}
	let bind_kind = match (value.text, kind) {
		("%d", ItemKind::Num) => BindKind::Num,
		("%d", ItemKind::Bool) => BindKind::Bool,
		("%s", ItemKind::String) => BindKind::Str,
		("%s", ItemKind::Struct) if spec.choices().is_some() => BindKind::Str,
		("%d" | "%s", _) => {
			return Err(ConfError::PlaceholderType {
				value: value.text.to_string(),
				key_type: spec.key_type,
			});
		}
		_ => return Err(ConfError::PlaceholderFormat(value.text.to_string())),
	};
	if let Some(slot) = tree.find_slot(node, spec.key_id)
		&& matches!(tree.key(slot), ConfKey::Bind(_))
	{
		return Err(ConfError::DuplicatePlaceholder(value.text.to_string()));
	}

	let desc = BindDesc {
		kind: bind_kind,
		choices: &spec.choices,
		ordinal: tree.binding_count(),
	};
	let (slot, _) = tree.slot_for(node, spec.key_id, ConfKey::Bind(desc));
	tree.push_binding(slot);
	tree.set_default(node, spec.key_id, pass.is_default);
	Ok(())
}

/// Type-checks a scalar literal.
fn compile_value<'s>(
	spec: &'s KeySpec,
	kind: ItemKind,
	key: ConfigItem<'_>,
	value: ConfigItem<'_>,
	pass: &Pass<'_>,
) -> Result<ConfItem<'s>> {
	match kind {
		ItemKind::Num => match value.item_type {
			ItemType::Num => Ok(ConfItem::Num(value.val)),
			_ => Err(ConfError::ExpectedInt(value.text.to_string())),
		},
		ItemKind::Bool => match value.item_type {
			ItemType::Bool => Ok(ConfItem::Bool(value.val != 0)),
			ItemType::Num if matches!(value.val, 0 | 1) => Ok(ConfItem::Bool(value.val == 1)),
			_ => Err(ConfError::ExpectedBool(value.text.to_string())),
		},
		ItemKind::String => string_item(spec, key, value, pass),
		ItemKind::Struct => unreachable!("struct values compile as nested configurations"),
	}
}

/// Any literal is a string; with a choice set it must match one exactly.
fn string_item<'s>(
	spec: &'s KeySpec,
	key: ConfigItem<'_>,
	value: ConfigItem<'_>,
	pass: &Pass<'_>,
) -> Result<ConfItem<'s>> {
	let is_empty_value = value.item_type == ItemType::String && value.is_empty();
	match spec.choices() {
		Some(choices) if !is_empty_value => match_choice(choices, value.text)
			.map(ConfItem::Choice)
			.ok_or_else(|| bad_choice(key, value)),
		_ => Ok(ConfItem::Str(span(pass, value.span()))),
	}
}

fn compile_struct<'s>(
	tree: &mut ConfTree<'s>,
	node: NodeIdx,
	spec: &'s KeySpec,
	key: ConfigItem<'_>,
	value: ConfigItem<'_>,
	pass: &Pass<'_>,
) -> Result<()> {
	// A single value on a key with choices is that choice, not a nested configuration.
	if spec.choices().is_some() && matches!(value.item_type, ItemType::String | ItemType::Id) {
		let item = string_item(spec, key, value, pass)?;
		return store(tree, node, spec, key, item, pass);
	}

	let Some(sub) = &spec.sub else {
		let item = list_item(spec, key, value, pass)?;
		return store(tree, node, spec, key, item, pass);
	};

	let inner = match value.item_type {
		ItemType::Struct => strip_delimiters(value)?,
		ItemType::Id => value.span(),
		ItemType::String if value.is_empty() => value.span(),
		_ => return Err(expected_category(key, value)),
	};

	let child = match tree.find_slot(node, spec.key_id).map(|slot| *tree.key(slot)) {
		Some(ConfKey::Sub(child)) => child,
		Some(_) => return Err(ConfError::ShapeConflict(key.text.to_string())),
		None => {
			let child = tree.next_child(node);
			tree.slot_for(node, spec.key_id, ConfKey::Sub(child));
			let allocated = tree.alloc_child(node);
			debug_assert_eq!(allocated, child);
			child
		}
	};

	let before = tree.counts(child);
	compile_node(tree, child, sub, pass, inner)?;
	tree.absorb(node, child, before);
	Ok(())
}

/// A list without nested keys keeps its element text, each element checked against choices.
fn list_item<'s>(
	spec: &'s KeySpec,
	key: ConfigItem<'_>,
	value: ConfigItem<'_>,
	pass: &Pass<'_>,
) -> Result<ConfItem<'s>> {
	match value.item_type {
		ItemType::Struct => {
			let inner = strip_delimiters(value)?;
			if let Some(choices) = spec.choices() {
				for pair in ConfigParser::within(pass.text, inner.clone()) {
					let (element, rest) = pair?;
					if !rest.is_empty() || match_choice(choices, element.text).is_none() {
						return Err(bad_choice(key, element));
					}
				}
			}
			Ok(ConfItem::Str(span(pass, inner)))
		}
		ItemType::String | ItemType::Id => Ok(ConfItem::Str(span(pass, value.span()))),
		ItemType::Num | ItemType::Bool => Err(expected_category(key, value)),
	}
}

/// A bare key has no value text of its own, so the key names the offending entry.
fn expected_category(key: ConfigItem<'_>, value: ConfigItem<'_>) -> ConfError {
	let text = if value.text.is_empty() { key.text } else { value.text };
	ConfError::ExpectedCategory(text.to_string())
}

/// Writes a resolved value and updates the node's default bit.
fn store<'s>(
	tree: &mut ConfTree<'s>,
	node: NodeIdx,
	spec: &'s KeySpec,
	key: ConfigItem<'_>,
	item: ConfItem<'s>,
	pass: &Pass<'_>,
) -> Result<()> {
	if let Some(slot) = tree.find_slot(node, spec.key_id)
		&& matches!(tree.key(slot), ConfKey::Bind(_))
	{
		return Err(ConfError::PlaceholderOverride(key.text.to_string()));
	}
	let slot = if pass.is_default {
		ConfKey::Default(item)
	} else {
		ConfKey::Override(item)
	};
	tree.slot_for(node, spec.key_id, slot);
	tree.set_default(node, spec.key_id, pass.is_default);
	Ok(())
}

/// Strips one matching pair of enclosing delimiters, returning the inner range.
fn strip_delimiters(value: ConfigItem<'_>) -> Result<Range<usize>> {
	let text = value.text;
	let closes = |close: u8| text.len() >= 2 && text.as_bytes()[text.len() - 1] == close;
	match text.as_bytes().first() {
		Some(b'(') if closes(b')') => {}
		Some(b'(') => return Err(ConfError::NonMatchingParens(text.to_string())),
		Some(b'[') if closes(b']') => {}
		Some(b'[') => return Err(ConfError::NonMatchingBrackets(text.to_string())),
		_ => return Err(ConfError::ExpectedStruct(text.to_string())),
	}
	Ok(value.start + 1..value.start + text.len() - 1)
}

/// Finds the canonical copy of `text` among `choices`; case sensitive, exact length.
pub(crate) fn match_choice<'s>(choices: &'s [String], text: &str) -> Option<&'s str> {
	choices.iter().find(|choice| choice.as_str() == text).map(String::as_str)
}

fn bad_choice(key: ConfigItem<'_>, value: ConfigItem<'_>) -> ConfError {
	ConfError::BadChoice {
		value: value.text.to_string(),
		key: key.text.to_string(),
	}
}

fn span(pass: &Pass<'_>, range: Range<usize>) -> TextSpan {
	TextSpan {
		source: pass.source,
		start: range.start as u32,
		len: range.len() as u32,
	}
}
