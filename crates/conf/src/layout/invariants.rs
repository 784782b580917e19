use std::borrow::Cow;

use pretty_assertions::assert_eq;

use super::*;
use crate::compile::{self, Origin};
use crate::testing::{demo_id, demo_schema};

fn key_id(tree: &ConfTree<'_>, name: &str) -> u16 {
	tree.method().keys.lookup(name).unwrap().key_id
}

/// Invariant: A node's slots occupy one contiguous region, and every nested node's region lies
/// inside its parent's.
///
/// A fully populated tree uses exactly the method's key and node capacities.
pub(crate) fn inv_key_regions_nest() {
	let schema = demo_schema();
	let tree = compile::compile(&schema, demo_id(&schema), None).unwrap();
	let layout = tree.layout();

	assert_eq!(tree.keys().len() as u32, layout.key_capacity);
	assert_eq!(tree.nodes().len() as u32, layout.node_capacity);
	assert_eq!(tree.node(NodeIdx::ROOT).key_count(), layout.key_capacity);
	assert_eq!(tree.node(NodeIdx::ROOT).node_count(), layout.node_capacity);

	for (i, node) in tree.nodes().iter().enumerate() {
		let region = node.key_offset..node.key_offset + node.key_count;
		assert!(region.end <= layout.key_capacity, "node {i} region {region:?}");
		for &pos in node.key_map.iter().filter(|&&pos| pos != 0) {
			assert!(region.contains(&(node.key_offset + u32::from(pos) - 1)));
		}
		for key in &tree.keys()[region.start as usize..region.end as usize] {
			if let ConfKey::Sub(child) = key {
				assert!(child.as_usize() > i);
				let c = tree.node(*child);
				assert!(c.key_offset >= region.start && c.key_offset + c.key_count <= region.end);
			}
		}
	}
}

/// Invariant: A child node receives its parent's remaining capacities at allocation time, not
/// what its own key table needs.
///
/// The first category compiled can therefore claim every slot later siblings expected; the
/// parent recovers the unused room only when the child's growth is absorbed.
pub(crate) fn inv_child_takes_parent_remainder() {
	let schema = demo_schema();
	let mut tree = ConfTree::new(&schema, demo_id(&schema));
	let c = key_id(&tree, "c");

	let child = tree.next_child(NodeIdx::ROOT);
	tree.slot_for(NodeIdx::ROOT, c, ConfKey::Sub(child));
	assert_eq!(tree.alloc_child(NodeIdx::ROOT), child);

	let node = tree.node(child);
	assert_eq!(node.key_offset, 1);
	assert_eq!(node.key_capacity(), tree.layout().key_capacity - 1);
	assert_eq!(node.node_capacity(), tree.layout().node_capacity - 1);
	assert_eq!(tree.node(NodeIdx::ROOT).node_count(), 2);
}

/// Invariant: Resetting a scratch tree from a template reproduces the template exactly, whatever
/// the scratch held before.
pub(crate) fn inv_reset_reproduces_template() {
	let schema = demo_schema();
	let id = demo_id(&schema);
	let template = compile::compile(&schema, id, None).unwrap();

	let mut scratch = compile::compile(&schema, id, Some("nested=(tag=t),level=%d")).unwrap();
	scratch.reset_from(&template);

	assert_eq!(scratch.nodes(), template.nodes());
	assert_eq!(scratch.keys(), template.keys());
	assert_eq!(scratch.binding_count(), 0);
	assert_eq!(scratch.resolved(), template.resolved());
}

/// Invariant: A key's default bit is set exactly when its current value came from a default
/// string.
pub(crate) fn inv_default_bit_tracks_origin() {
	let schema = demo_schema();
	let mut tree = ConfTree::new(&schema, demo_id(&schema));
	let base = tree.method().base.as_str();
	compile::compile_into(&mut tree, [(Cow::Borrowed(base), Origin::Default)], false).unwrap();

	let level = key_id(&tree, "level");
	let mode = key_id(&tree, "mode");
	assert!(tree.node(NodeIdx::ROOT).is_default(level));

	compile::compile_into(&mut tree, [(Cow::Borrowed("level=3"), Origin::Override)], false).unwrap();
	assert!(!tree.node(NodeIdx::ROOT).is_default(level));
	assert!(tree.node(NodeIdx::ROOT).is_default(mode));

	compile::compile_into(&mut tree, [(Cow::Borrowed("level=4"), Origin::Default)], false).unwrap();
	assert!(tree.node(NodeIdx::ROOT).is_default(level));
	assert_eq!(tree.keys().len() as u32, tree.layout().key_capacity);
}
