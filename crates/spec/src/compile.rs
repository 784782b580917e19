//! Build-time infrastructure for compiling the KDL method schema into a binary blob.
//!
//! Gated behind the `compile` feature. The consuming crate's build script calls [`build`].

use std::fs;
use std::path::{Path, PathBuf};

use kdl::{KdlDocument, KdlNode, KdlValue};

use crate::{KeyDecl, KeyType, MAGIC, MethodDecl, SCHEMA_VERSION, finalize};

/// Compiles the calling crate's `assets/methods.kdl` into `$OUT_DIR/methods.bin`.
pub fn build() {
	let path = env_dir("CARGO_MANIFEST_DIR").join("assets").join("methods.kdl");
	println!("cargo:rerun-if-changed={}", path.display());

	let kdl = fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
	let spec = finalize(parse_methods(&kdl)).unwrap_or_else(|e| panic!("invalid methods.kdl: {e}"));
	let bin = postcard::to_stdvec(&spec).expect("failed to serialize method schema");
	write_blob(&env_dir("OUT_DIR").join("methods.bin"), &bin);
}

fn env_dir(var: &str) -> PathBuf {
	std::env::var_os(var)
		.map(PathBuf::from)
		.unwrap_or_else(|| panic!("{var} unset"))
}

/// Writes `data` behind the magic and version header the runtime loader checks.
fn write_blob(path: &Path, data: &[u8]) {
	let mut blob = Vec::with_capacity(MAGIC.len() + size_of::<u32>() + data.len());
	blob.extend_from_slice(MAGIC);
	blob.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
	blob.extend_from_slice(data);
	fs::write(path, blob).unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
}

/// Parses `method` nodes into declarations, panicking on malformed input.
pub fn parse_methods(kdl: &str) -> Vec<MethodDecl> {
	let doc: KdlDocument = kdl.parse().expect("failed to parse methods.kdl");

	doc.nodes()
		.iter()
		.map(|node| {
			assert_eq!(
				node.name().value(),
				"method",
				"unexpected top-level node '{}' in methods.kdl",
				node.name().value()
			);
			let name = node_name_arg(node, "method");
			let context = format!("method '{name}'");
			let compilable = node.get("compilable").and_then(KdlValue::as_bool).unwrap_or(false);
			let keys = parse_keys(node, &context);
			MethodDecl { name, compilable, keys }
		})
		.collect()
}

fn parse_keys(parent: &KdlNode, context: &str) -> Vec<KeyDecl> {
	let Some(children) = parent.children() else {
		return Vec::new();
	};
	children
		.nodes()
		.iter()
		.filter(|node| node.name().value() == "key")
		.map(|node| parse_key(node, context))
		.collect()
}

fn parse_key(node: &KdlNode, context: &str) -> KeyDecl {
	let name = node_name_arg(node, "key");
	let context = format!("{context} key '{name}'");

	let type_name = node
		.get("type")
		.and_then(KdlValue::as_string)
		.unwrap_or_else(|| panic!("{context} missing 'type' attribute"));
	let key_type = KeyType::from_name(type_name).unwrap_or_else(|| panic!("{context}: unknown type '{type_name}'"));

	let default = node.get("default").map(|value| scalar_text(value, &context));

	let mut choices = Vec::new();
	if let Some(children) = node.children() {
		for child in children.nodes() {
			match child.name().value() {
				"key" => {}
				"choices" => choices.extend(
					child
						.entries()
						.iter()
						.filter(|e| e.name().is_none())
						.map(|e| scalar_text(e.value(), &context)),
				),
				other => panic!("{context}: unexpected child node '{other}'"),
			}
		}
	}

	KeyDecl {
		sub: parse_keys(node, &context),
		name,
		key_type,
		default,
		choices,
	}
}

/// Defaults may be written as KDL strings, integers or booleans.
fn scalar_text(value: &KdlValue, context: &str) -> String {
	if let Some(s) = value.as_string() {
		s.to_string()
	} else if let Some(i) = value.as_integer() {
		i.to_string()
	} else if let Some(b) = value.as_bool() {
		b.to_string()
	} else {
		panic!("{context}: unsupported value {value}")
	}
}

/// Extracts the first positional string argument from a KDL node.
fn node_name_arg(node: &KdlNode, domain: &str) -> String {
	node.entry(0)
		.and_then(|e| {
			if e.name().is_none() {
				e.value().as_string().map(String::from)
			} else {
				None
			}
		})
		.unwrap_or_else(|| panic!("{domain} node missing name argument"))
}
