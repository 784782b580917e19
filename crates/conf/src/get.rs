//! Reading resolved values back out of a compiled tree by dotted key path.

use confc_spec::{KeySpec, KeyTable};

use crate::bind::{BoundItem, BoundValues};
use crate::layout::{ConfItem, ConfKey, ConfTree, NodeIdx};

/// A value as seen by an API implementation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfValue<'t> {
	Num(i64),
	Bool(bool),
	Str(&'t str),
	Choice(&'t str),
	Sub(NodeIdx),
	/// Placeholder awaiting a bound value, by ordinal.
	Bound(u32),
}

impl<'t> From<BoundItem<'t>> for ConfValue<'t> {
	fn from(item: BoundItem<'t>) -> Self {
		match item {
			BoundItem::Num(n) => ConfValue::Num(n),
			BoundItem::Bool(b) => ConfValue::Bool(b),
			BoundItem::Str(s) => ConfValue::Str(s),
			BoundItem::Choice(c) => ConfValue::Choice(c),
		}
	}
}

impl<'s> ConfTree<'s> {
	/// Resolves a path such as `roundup_timestamps.read`.
	pub fn get(&self, path: &str) -> Option<ConfValue<'_>> {
		let (_, _, slot) = self.locate(path)?;
		Some(self.value_at(slot))
	}

	/// Like [`get`](Self::get), with placeholders replaced by their bound values.
	pub fn get_bound<'a>(&'a self, path: &str, bound: &'a BoundValues<'_>) -> Option<ConfValue<'a>> {
		match self.get(path)? {
			ConfValue::Bound(ordinal) => bound.get(ordinal).map(|value| value.item.into()),
			value => Some(value),
		}
	}

	/// Whether the key at `path` holds a value from a default string.
	pub fn is_default(&self, path: &str) -> Option<bool> {
		let (node, spec, _) = self.locate(path)?;
		Some(self.node(node).is_default(spec.key_id))
	}

	/// Every leaf value as `(dotted path, value)`, keys in schema order.
	pub fn resolved(&self) -> Vec<(String, ConfValue<'_>)> {
		let mut out = Vec::new();
		self.collect(NodeIdx::ROOT, &self.method().keys, "", &mut out);
		out
	}

	fn collect<'a>(&'a self, node: NodeIdx, table: &'s KeyTable, prefix: &str, out: &mut Vec<(String, ConfValue<'a>)>) {
		for spec in &table.keys {
			let Some(slot) = self.find_slot(node, spec.key_id) else {
				continue;
			};
			let path = format!("{prefix}{}", spec.name);
			match (self.value_at(slot), &spec.sub) {
				(ConfValue::Sub(child), Some(sub)) => self.collect(child, sub, &format!("{path}."), out),
				(value, _) => out.push((path, value)),
			}
		}
	}

	fn locate(&self, path: &str) -> Option<(NodeIdx, &'s KeySpec, u32)> {
		let mut node = NodeIdx::ROOT;
		let mut table = &self.method().keys;
		let mut segments = path.split('.').peekable();
		loop {
			let spec = table.lookup(segments.next()?)?;
			let slot = self.find_slot(node, spec.key_id)?;
			if segments.peek().is_none() {
				return Some((node, spec, slot));
			}
			match self.key(slot) {
				ConfKey::Sub(child) => {
					node = *child;
					table = spec.sub.as_ref()?;
				}
				_ => return None,
			}
		}
	}

	fn value_at(&self, slot: u32) -> ConfValue<'_> {
		match *self.key(slot) {
			ConfKey::Default(item) | ConfKey::Override(item) => match item {
				ConfItem::Num(n) => ConfValue::Num(n),
				ConfItem::Bool(b) => ConfValue::Bool(b),
				ConfItem::Str(span) => ConfValue::Str(self.text(span)),
				ConfItem::Choice(choice) => ConfValue::Choice(choice),
			},
			ConfKey::Sub(child) => ConfValue::Sub(child),
			ConfKey::Bind(desc) => ConfValue::Bound(desc.ordinal),
		}
	}
}
