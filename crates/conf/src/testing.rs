//! Small hand-declared schemas for unit tests.

use confc_spec::{KeyDecl, KeyType, MethodDecl, finalize};

use crate::schema::{MethodId, Schema};

pub(crate) const DEMO: &str = "demo";
pub(crate) const FIXED: &str = "fixed";

/// `demo` is compilable with two nesting levels; `fixed` is not compilable.
///
/// Sorted root keys: `c`, `flag`, `level`, `mode`, `name`, `nested`, `opts`.
pub(crate) fn demo_schema() -> Schema {
	let demo = MethodDecl {
		name: DEMO.into(),
		compilable: true,
		keys: vec![
			KeyDecl::new("opts", KeyType::List).with_choices(["x", "y", "z"]),
			KeyDecl::new("c", KeyType::Category).with_sub(vec![
				KeyDecl::new("b", KeyType::Int).with_default("0"),
				KeyDecl::new("a", KeyType::Int).with_default("0"),
			]),
			KeyDecl::new("flag", KeyType::Boolean),
			KeyDecl::new("level", KeyType::Int).with_default("1"),
			KeyDecl::new("mode", KeyType::String)
				.with_default("fast")
				.with_choices(["fast", "slow"]),
			KeyDecl::new("name", KeyType::String),
			KeyDecl::new("nested", KeyType::Category).with_sub(vec![
				KeyDecl::new("inner", KeyType::Category)
					.with_sub(vec![KeyDecl::new("deep", KeyType::Boolean).with_default("false")]),
				KeyDecl::new("tag", KeyType::String),
			]),
		],
	};
	let fixed = MethodDecl {
		name: FIXED.into(),
		compilable: false,
		keys: vec![KeyDecl::new("size", KeyType::Int).with_default("4KB")],
	};
	let spec = finalize(vec![demo, fixed]).unwrap_or_else(|e| panic!("demo schema: {e}"));
	Schema::from_spec(spec)
}

pub(crate) fn demo_id(schema: &Schema) -> MethodId {
	schema.find(DEMO).unwrap()
}
