//! Fixed-capacity arena holding a compiled configuration tree.
//!
//! A [`ConfTree`] owns `node_capacity` node headers and `key_capacity` key slots for one method.
//! Nodes and slots are addressed by index, so cloning a template into a scratch tree is a plain
//! structural copy. Capacities come from the schema and never grow; exceeding them is an
//! internal invariant violation and panics.

use std::borrow::Cow;

use confc_spec::{MAX_KEY_POSITIONS, MethodSpec};

use crate::schema::{MethodId, Schema};

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod tests;

/// Per-method arena capacities.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MethodLayout {
	pub node_capacity: u32,
	pub key_capacity: u32,
	/// Width of every node's key map and default bitmap.
	pub key_id_count: u16,
}

impl MethodLayout {
	pub fn of(method: &MethodSpec, key_id_count: u16) -> Self {
		Self {
			node_capacity: method.node_capacity,
			key_capacity: method.key_capacity,
			key_id_count,
		}
	}

	fn bitmap_words(&self) -> usize {
		usize::from(self.key_id_count).div_ceil(64)
	}

	/// Bytes held by a fully populated tree of this layout.
	pub fn footprint(&self) -> usize {
		let node = size_of::<ConfNode>() + usize::from(self.key_id_count) + self.bitmap_words() * size_of::<u64>();
		self.node_capacity as usize * node + self.key_capacity as usize * size_of::<ConfKey<'static>>()
	}
}

/// Index of a node within its tree. The root is node 0.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeIdx(pub u32);

impl NodeIdx {
	pub const ROOT: Self = Self(0);

	#[inline]
	pub fn as_usize(self) -> usize {
		self.0 as usize
	}
}

/// Location of string text inside one of a tree's source strings.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TextSpan {
	pub source: u32,
	pub start: u32,
	pub len: u32,
}

/// A resolved value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfItem<'s> {
	Num(i64),
	Bool(bool),
	Str(TextSpan),
	/// The schema's canonical copy of a permitted choice.
	Choice(&'s str),
}

/// Value kind a placeholder accepts at bind time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BindKind {
	Num,
	Bool,
	Str,
}

impl BindKind {
	pub fn as_str(self) -> &'static str {
		match self {
			BindKind::Num => "an integer",
			BindKind::Bool => "a boolean",
			BindKind::Str => "a string",
		}
	}
}

/// A `%d`/`%s` placeholder recorded at compile time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BindDesc<'s> {
	pub kind: BindKind,
	pub choices: &'s [String],
	/// Zero-based position among all placeholders of the tree.
	pub ordinal: u32,
}

impl<'s> BindDesc<'s> {
	pub fn choices(&self) -> Option<&'s [String]> {
		(!self.choices.is_empty()).then_some(self.choices)
	}
}

/// One key slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfKey<'s> {
	/// Value from the method's built-in defaults.
	Default(ConfItem<'s>),
	/// Value from a later, non-default configuration string.
	Override(ConfItem<'s>),
	/// Nested configuration.
	Sub(NodeIdx),
	Bind(BindDesc<'s>),
}

/// Header of one compiled scope.
#[derive(Debug, PartialEq, Eq)]
pub struct ConfNode {
	pub(crate) key_offset: u32,
	pub(crate) key_count: u32,
	pub(crate) key_capacity: u32,
	/// Nodes reachable from this one, itself included.
	pub(crate) node_count: u32,
	pub(crate) node_capacity: u32,
	/// Key id to one-based position in this node's slot region; 0 is absent.
	pub(crate) key_map: Vec<u8>,
	pub(crate) defaults: Vec<u64>,
}

impl ConfNode {
	fn empty(layout: &MethodLayout) -> Self {
		Self {
			key_offset: 0,
			key_count: 0,
			key_capacity: 0,
			node_count: 1,
			node_capacity: 0,
			key_map: vec![0; usize::from(layout.key_id_count)],
			defaults: vec![0; layout.bitmap_words()],
		}
	}

	pub fn key_count(&self) -> u32 {
		self.key_count
	}

	pub fn key_capacity(&self) -> u32 {
		self.key_capacity
	}

	pub fn node_count(&self) -> u32 {
		self.node_count
	}

	pub fn node_capacity(&self) -> u32 {
		self.node_capacity
	}

	/// Whether the value under `key_id` came from a default string.
	pub fn is_default(&self, key_id: u16) -> bool {
		let id = usize::from(key_id);
		self.defaults[id / 64] & (1 << (id % 64)) != 0
	}

	fn set_default(&mut self, key_id: u16, is_default: bool) {
		let id = usize::from(key_id);
		let bit = 1 << (id % 64);
		if is_default {
			self.defaults[id / 64] |= bit;
		} else {
			self.defaults[id / 64] &= !bit;
		}
	}
}

impl Clone for ConfNode {
	fn clone(&self) -> Self {
		Self {
			key_offset: self.key_offset,
			key_count: self.key_count,
			key_capacity: self.key_capacity,
			node_count: self.node_count,
			node_capacity: self.node_capacity,
			key_map: self.key_map.clone(),
			defaults: self.defaults.clone(),
		}
	}

	fn clone_from(&mut self, source: &Self) {
		self.key_offset = source.key_offset;
		self.key_count = source.key_count;
		self.key_capacity = source.key_capacity;
		self.node_count = source.node_count;
		self.node_capacity = source.node_capacity;
		self.key_map.clone_from(&source.key_map);
		self.defaults.clone_from(&source.defaults);
	}
}

/// A compiled configuration for one method.
///
/// String values are spans into `sources`, which hold every configuration string compiled into
/// the tree in order: borrowed schema defaults, borrowed per-call text, or an owned copy for
/// precompiled entries.
#[derive(Debug)]
pub struct ConfTree<'s> {
	method: &'s MethodSpec,
	id: MethodId,
	layout: MethodLayout,
	nodes: Vec<ConfNode>,
	keys: Vec<ConfKey<'s>>,
	/// Slot index of each placeholder, by ordinal.
	bindings: Vec<u32>,
	sources: Vec<Cow<'s, str>>,
}

impl<'s> ConfTree<'s> {
	/// An empty arena for `method`; see [`alloc_root`](Self::alloc_root).
	pub fn with_layout(method: &'s MethodSpec, id: MethodId, layout: MethodLayout) -> Self {
		Self {
			method,
			id,
			layout,
			nodes: Vec::with_capacity(layout.node_capacity as usize),
			keys: Vec::with_capacity(layout.key_capacity as usize),
			bindings: Vec::new(),
			sources: Vec::new(),
		}
	}

	/// A tree with its root node allocated.
	pub fn new(schema: &'s Schema, id: MethodId) -> Self {
		let mut tree = Self::with_layout(schema.get(id), id, schema.layout(id));
		tree.alloc_root();
		tree
	}

	/// Initialises node 0 with the method's full capacities.
	pub fn alloc_root(&mut self) {
		assert!(self.nodes.is_empty(), "conf: root already allocated");
		let mut root = ConfNode::empty(&self.layout);
		root.key_capacity = self.layout.key_capacity;
		root.node_capacity = self.layout.node_capacity;
		self.nodes.push(root);
	}

	pub fn method(&self) -> &'s MethodSpec {
		self.method
	}

	pub fn method_id(&self) -> MethodId {
		self.id
	}

	pub fn layout(&self) -> MethodLayout {
		self.layout
	}

	pub fn node(&self, idx: NodeIdx) -> &ConfNode {
		&self.nodes[idx.as_usize()]
	}

	pub fn nodes(&self) -> &[ConfNode] {
		&self.nodes
	}

	pub fn keys(&self) -> &[ConfKey<'s>] {
		&self.keys
	}

	pub fn key(&self, slot: u32) -> &ConfKey<'s> {
		&self.keys[slot as usize]
	}

	/// Absolute slot index holding `key_id` in `node`, if present.
	pub fn find_slot(&self, node: NodeIdx, key_id: u16) -> Option<u32> {
		let n = self.node(node);
		match n.key_map[usize::from(key_id)] {
			0 => None,
			pos => Some(n.key_offset + u32::from(pos) - 1),
		}
	}

	/// Writes `key` into the slot for `key_id`, allocating the next position on first use.
	///
	/// Returns the absolute slot index and whether the slot already existed.
	pub fn slot_for(&mut self, node: NodeIdx, key_id: u16, key: ConfKey<'s>) -> (u32, bool) {
		if let Some(slot) = self.find_slot(node, key_id) {
			self.keys[slot as usize] = key;
			return (slot, true);
		}

		let n = &mut self.nodes[node.as_usize()];
		assert!(n.key_count < n.key_capacity, "conf: key count overflow");
		let pos = n.key_count;
		assert!(pos < MAX_KEY_POSITIONS, "conf: key position {pos} does not fit the key map");
		let slot = n.key_offset + pos;
		assert_eq!(slot as usize, self.keys.len(), "conf: key slots allocated out of order");
		n.key_count += 1;
		n.key_map[usize::from(key_id)] = (pos + 1) as u8;
		self.keys.push(key);
		(slot, false)
	}

	/// Index the next child of `parent` will receive.
	pub fn next_child(&self, parent: NodeIdx) -> NodeIdx {
		NodeIdx(parent.0 + self.node(parent).node_count)
	}

	/// Allocates a child node whose key region starts after the parent's current keys.
	///
	/// The child's capacities are whatever the parent has left, not what the child's own
	/// schema needs: an early large child may consume room later siblings expected.
	pub fn alloc_child(&mut self, parent: NodeIdx) -> NodeIdx {
		let child = self.next_child(parent);
		let p = &self.nodes[parent.as_usize()];
		assert!(p.node_count < p.node_capacity, "conf: sub-configuration overflow");
		assert_eq!(child.as_usize(), self.nodes.len(), "conf: nodes allocated out of order");

		let mut node = ConfNode::empty(&self.layout);
		node.key_offset = p.key_offset + p.key_count;
		node.key_capacity = p.key_capacity - p.key_count;
		node.node_capacity = p.node_capacity - p.node_count;

		self.nodes[parent.as_usize()].node_count += 1;
		self.nodes.push(node);
		child
	}

	/// `(key_count, node_count)` of `node`, for use with [`absorb`](Self::absorb).
	pub fn counts(&self, node: NodeIdx) -> (u32, u32) {
		let n = self.node(node);
		(n.key_count, n.node_count)
	}

	/// Folds a child's growth since `before` into its parent.
	pub fn absorb(&mut self, parent: NodeIdx, child: NodeIdx, before: (u32, u32)) {
		let (keys, nodes) = self.counts(child);
		let p = &mut self.nodes[parent.as_usize()];
		p.key_count += keys - before.0;
		p.node_count += nodes - before.1;
		assert!(p.key_count <= p.key_capacity, "conf: key count overflow");
		assert!(p.node_count <= p.node_capacity, "conf: sub-configuration overflow");
	}

	pub fn set_default(&mut self, node: NodeIdx, key_id: u16, is_default: bool) {
		self.nodes[node.as_usize()].set_default(key_id, is_default);
	}

	/// Records the slot of the next placeholder and returns its ordinal.
	pub(crate) fn push_binding(&mut self, slot: u32) -> u32 {
		let ordinal = self.binding_count();
		self.bindings.push(slot);
		ordinal
	}

	pub fn binding_count(&self) -> u32 {
		self.bindings.len() as u32
	}

	/// Placeholders in ordinal order.
	pub fn bindings(&self) -> impl Iterator<Item = &BindDesc<'s>> {
		self.bindings.iter().map(|&slot| match &self.keys[slot as usize] {
			ConfKey::Bind(desc) => desc,
			other => unreachable!("binding slot {slot} holds {other:?}"),
		})
	}

	pub(crate) fn push_source(&mut self, text: Cow<'s, str>) -> u32 {
		self.sources.push(text);
		(self.sources.len() - 1) as u32
	}

	pub(crate) fn source_count(&self) -> u32 {
		self.sources.len() as u32
	}

	pub fn sources(&self) -> impl Iterator<Item = &str> {
		self.sources.iter().map(|s| s.as_ref())
	}

	pub fn text(&self, span: TextSpan) -> &str {
		let start = span.start as usize;
		&self.sources[span.source as usize][start..start + span.len as usize]
	}

	/// Replaces this tree's contents with `template`, reusing allocations.
	///
	/// # Panics
	///
	/// Panics unless both trees share the same method layout.
	pub fn reset_from(&mut self, template: &ConfTree<'s>) {
		assert_eq!(self.id, template.id, "conf: template is for another method");
		assert_eq!(
			self.layout, template.layout,
			"conf: total size does not equal calculated size"
		);
		self.nodes.clone_from(&template.nodes);
		self.keys.clone_from(&template.keys);
		self.bindings.clone_from(&template.bindings);
		self.sources.clone_from(&template.sources);
	}
}

impl Clone for ConfTree<'_> {
	fn clone(&self) -> Self {
		Self {
			method: self.method,
			id: self.id,
			layout: self.layout,
			nodes: self.nodes.clone(),
			keys: self.keys.clone(),
			bindings: self.bindings.clone(),
			sources: self.sources.clone(),
		}
	}

	fn clone_from(&mut self, source: &Self) {
		self.method = source.method;
		self.id = source.id;
		self.layout = source.layout;
		self.nodes.clone_from(&source.nodes);
		self.keys.clone_from(&source.keys);
		self.bindings.clone_from(&source.bindings);
		self.sources.clone_from(&source.sources);
	}
}
