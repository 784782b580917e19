use pretty_assertions::assert_eq;

use super::invariants;
use super::*;
use crate::testing::{FIXED, demo_id, demo_schema};

#[test]
fn test_key_regions_nest() {
	invariants::inv_key_regions_nest();
}

#[test]
fn test_child_takes_parent_remainder() {
	invariants::inv_child_takes_parent_remainder();
}

#[test]
fn test_reset_reproduces_template() {
	invariants::inv_reset_reproduces_template();
}

#[test]
fn test_default_bit_tracks_origin() {
	invariants::inv_default_bit_tracks_origin();
}

fn tiny_tree(schema: &Schema, node_capacity: u32, key_capacity: u32) -> ConfTree<'_> {
	let id = demo_id(schema);
	let layout = MethodLayout {
		node_capacity,
		key_capacity,
		key_id_count: schema.key_id_count(),
	};
	let mut tree = ConfTree::with_layout(schema.get(id), id, layout);
	tree.alloc_root();
	tree
}

#[test]
fn slot_for_reuses_existing_slot() {
	let schema = demo_schema();
	let mut tree = tiny_tree(&schema, 1, 2);
	let item = |n| ConfKey::Override(ConfItem::Num(n));

	assert_eq!(tree.slot_for(NodeIdx::ROOT, 3, item(1)), (0, false));
	assert_eq!(tree.slot_for(NodeIdx::ROOT, 5, item(2)), (1, false));
	assert_eq!(tree.slot_for(NodeIdx::ROOT, 3, item(7)), (0, true));
	assert_eq!(tree.find_slot(NodeIdx::ROOT, 3), Some(0));
	assert_eq!(tree.find_slot(NodeIdx::ROOT, 4), None);
	assert_eq!(*tree.key(0), item(7));
	assert_eq!(tree.node(NodeIdx::ROOT).key_count(), 2);
}

#[test]
#[should_panic(expected = "conf: key count overflow")]
fn key_overflow_panics() {
	let schema = demo_schema();
	let mut tree = tiny_tree(&schema, 1, 1);
	tree.slot_for(NodeIdx::ROOT, 0, ConfKey::Override(ConfItem::Bool(true)));
	tree.slot_for(NodeIdx::ROOT, 1, ConfKey::Override(ConfItem::Bool(true)));
}

#[test]
#[should_panic(expected = "conf: sub-configuration overflow")]
fn node_overflow_panics() {
	let schema = demo_schema();
	let mut tree = tiny_tree(&schema, 1, 4);
	tree.alloc_child(NodeIdx::ROOT);
}

#[test]
#[should_panic(expected = "conf: template is for another method")]
fn reset_from_other_method_panics() {
	let schema = demo_schema();
	let mut scratch = ConfTree::new(&schema, demo_id(&schema));
	let other = ConfTree::new(&schema, schema.find(FIXED).unwrap());
	scratch.reset_from(&other);
}

#[test]
fn absorb_folds_child_growth() {
	let schema = demo_schema();
	let mut tree = tiny_tree(&schema, 2, 3);
	let child = tree.next_child(NodeIdx::ROOT);
	tree.slot_for(NodeIdx::ROOT, 0, ConfKey::Sub(child));
	tree.alloc_child(NodeIdx::ROOT);

	let before = tree.counts(child);
	assert_eq!(before, (0, 1));
	tree.slot_for(child, 1, ConfKey::Override(ConfItem::Num(1)));
	tree.slot_for(child, 2, ConfKey::Override(ConfItem::Num(2)));
	tree.absorb(NodeIdx::ROOT, child, before);

	assert_eq!(tree.counts(NodeIdx::ROOT), (3, 2));
	assert_eq!(tree.find_slot(child, 2), Some(2));
}

#[test]
fn default_bitmap_spans_words() {
	let layout = MethodLayout {
		node_capacity: 1,
		key_capacity: 1,
		key_id_count: 130,
	};
	let mut node = ConfNode::empty(&layout);
	assert_eq!(node.defaults.len(), 3);
	node.set_default(129, true);
	node.set_default(64, true);
	node.set_default(64, false);
	assert!(node.is_default(129));
	assert!(!node.is_default(64));
	assert!(!node.is_default(0));
}

#[test]
fn clone_from_reuses_node_buffers() {
	let schema = demo_schema();
	let template = crate::compile::compile(&schema, demo_id(&schema), None).unwrap();
	let mut copy = ConfTree::new(&schema, demo_id(&schema));
	copy.clone_from(&template);
	assert_eq!(copy.nodes(), template.nodes());
	assert_eq!(copy.get("mode"), template.get("mode"));
}
