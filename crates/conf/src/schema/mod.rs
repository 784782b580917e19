//! Read-only method schema: key tables, jump tables and layout capacities per API method.
//!
//! The built-in schema is compiled from `assets/methods.kdl` by the build script and embedded
//! as a postcard blob framed by [`MAGIC`] and [`SCHEMA_VERSION`].

use std::sync::LazyLock;

use confc_spec::{MAGIC, MethodSpec, SCHEMA_VERSION, SchemaSpec};
use rustc_hash::FxHashMap;

use crate::layout::MethodLayout;


/// Dense index of a method within a [`Schema`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u16);

impl MethodId {
	#[inline]
	pub fn as_usize(self) -> usize {
		self.0 as usize
	}
}

impl std::fmt::Display for MethodId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "MethodId({})", self.0)
	}
}

/// Errors from decoding a schema blob.
#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
	#[error("schema blob is truncated")]
	Truncated,
	#[error("schema blob has bad magic")]
	BadMagic,
	#[error("schema blob version {found}, expected {expected}")]
	Version { found: u32, expected: u32 },
	#[error("schema blob is corrupt: {0}")]
	Decode(#[from] postcard::Error),
}

pub struct Schema {
	spec: SchemaSpec,
	by_name: FxHashMap<Box<str>, MethodId>,
}

impl Schema {
	pub fn from_spec(spec: SchemaSpec) -> Self {
		let by_name = spec
			.methods
			.iter()
			.enumerate()
			.map(|(i, method)| (method.name.as_str().into(), MethodId(i as u16)))
			.collect();
		Self { spec, by_name }
	}

	/// Decodes a blob written by the build-time schema compiler.
	pub fn from_blob(bytes: &[u8]) -> Result<Self, SchemaLoadError> {
		let header = MAGIC.len() + size_of::<u32>();
		if bytes.len() < header {
			return Err(SchemaLoadError::Truncated);
		}
		let (magic, rest) = bytes.split_at(MAGIC.len());
		if magic != MAGIC {
			return Err(SchemaLoadError::BadMagic);
		}
		let (version, data) = rest.split_at(size_of::<u32>());
		let found = u32::from_le_bytes([version[0], version[1], version[2], version[3]]);
		if found != SCHEMA_VERSION {
			return Err(SchemaLoadError::Version {
				found,
				expected: SCHEMA_VERSION,
			});
		}
		Ok(Self::from_spec(postcard::from_bytes(data)?))
	}

	/// The schema embedded at build time.
	pub fn builtin() -> &'static Schema {
		static BUILTIN: LazyLock<Schema> = LazyLock::new(|| {
			const BYTES: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/methods.bin"));
			Schema::from_blob(BYTES).unwrap_or_else(|e| panic!("embedded method schema: {e}"))
		});
		&BUILTIN
	}

	pub fn find(&self, name: &str) -> Option<MethodId> {
		self.by_name.get(name).copied()
	}

	/// # Panics
	///
	/// Panics if `id` did not come from this schema.
	pub fn get(&self, id: MethodId) -> &MethodSpec {
		&self.spec.methods[id.as_usize()]
	}

	pub fn layout(&self, id: MethodId) -> MethodLayout {
		MethodLayout::of(self.get(id), self.spec.key_id_count)
	}

	pub fn key_id_count(&self) -> u16 {
		self.spec.key_id_count
	}

	pub fn len(&self) -> usize {
		self.spec.methods.len()
	}

	pub fn is_empty(&self) -> bool {
		self.spec.methods.is_empty()
	}

	pub fn methods(&self) -> impl Iterator<Item = (MethodId, &MethodSpec)> {
		self.spec
			.methods
			.iter()
			.enumerate()
			.map(|(i, method)| (MethodId(i as u16), method))
	}
}

impl std::fmt::Debug for Schema {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Schema")
			.field("methods", &self.spec.methods.len())
			.field("key_id_count", &self.spec.key_id_count)
			.finish()
	}
}
