//! Method schema specs shared by the build-time schema compiler and the runtime loader.
//!
//! A schema describes, per API method, which configuration keys are recognized, their declared
//! types, permitted choices and nested sub-keys. The `compile` feature turns the KDL asset into
//! a postcard blob; the runtime crate deserializes the same types from that blob.

#[cfg(feature = "compile")]
pub mod compile;
pub mod shape;

use serde::{Deserialize, Serialize};

pub use shape::{KeyDecl, MethodDecl, SpecError, finalize};

/// Magic bytes identifying a precompiled method schema blob.
pub const MAGIC: &[u8; 8] = b"CONFCSCH";

/// Schema version for blob format compatibility.
pub const SCHEMA_VERSION: u32 = 1;

/// Number of first-byte jump table entries: one per ASCII byte plus the end sentinel.
pub const JUMP_LEN: usize = 129;

/// Key slot positions are stored one-based in a byte.
pub const MAX_KEY_POSITIONS: u32 = 255;

/// Declared type of a configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyType {
	Int,
	Boolean,
	Format,
	String,
	Category,
	List,
}

impl KeyType {
	pub const ALL: [KeyType; 6] = [
		KeyType::Int,
		KeyType::Boolean,
		KeyType::Format,
		KeyType::String,
		KeyType::Category,
		KeyType::List,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			KeyType::Int => "int",
			KeyType::Boolean => "boolean",
			KeyType::Format => "format",
			KeyType::String => "string",
			KeyType::Category => "category",
			KeyType::List => "list",
		}
	}

	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|ty| ty.as_str() == name)
	}

	/// Category and list keys hold structured values.
	pub fn is_struct(self) -> bool {
		matches!(self, KeyType::Category | KeyType::List)
	}
}

impl std::fmt::Display for KeyType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One recognized key within a method or a nested key table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySpec {
	pub name: String,
	pub key_type: KeyType,
	/// Unique per `(name, type)` across the whole schema; indexes per-node key maps.
	pub key_id: u16,
	pub default: Option<String>,
	#[serde(default)]
	pub choices: Vec<String>,
	pub sub: Option<KeyTable>,
}

impl KeySpec {
	/// Permitted values, if the key restricts them.
	pub fn choices(&self) -> Option<&[String]> {
		(!self.choices.is_empty()).then_some(self.choices.as_slice())
	}
}

/// Name-sorted key descriptors plus a first-byte jump table.
///
/// Keys whose name starts with byte `b` live in `keys[jump[b]..jump[b + 1]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyTable {
	pub keys: Vec<KeySpec>,
	pub jump: Vec<u16>,
}

impl KeyTable {
	/// Finds a key by exact name: jump table narrowing, then binary search.
	pub fn lookup(&self, name: &str) -> Option<&KeySpec> {
		let first = *name.as_bytes().first()? as usize;
		if first + 1 >= JUMP_LEN {
			return None;
		}
		let candidates = &self.keys[self.jump[first] as usize..self.jump[first + 1] as usize];
		candidates
			.binary_search_by(|key| key.name.as_str().cmp(name))
			.ok()
			.map(|i| &candidates[i])
	}

	pub fn len(&self) -> usize {
		self.keys.len()
	}

	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}
}

/// A single API method's compiled schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
	pub name: String,
	pub compilable: bool,
	/// Every key with its default, rendered as a configuration string.
	pub base: String,
	pub keys: KeyTable,
	/// Nodes in a fully populated compiled tree, root included.
	pub node_capacity: u32,
	/// Key slots in a fully populated compiled tree, nested slots included.
	pub key_capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
	pub methods: Vec<MethodSpec>,
	/// Number of distinct key ids; the size of every node's key map.
	pub key_id_count: u16,
}
