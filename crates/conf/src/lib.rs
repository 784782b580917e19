//! Configuration compiler for engine API calls.
//!
//! API methods accept `key=value` configuration strings. This crate checks them against a
//! per-method schema and compiles them into a [`ConfTree`]: a fixed-capacity, index-addressed
//! arena of nodes and key slots that API implementations read without re-parsing text.
//!
//! # Modules
//!
//! - [`schema`] - embedded method schema and lookup
//! - [`layout`] - the compiled tree arena
//! - [`compile`] - recursive compile engine
//! - [`bind`] - positional values for `%d`/`%s` placeholders
//! - [`registry`] - connection context with templates and precompiled entries
//!
//! # Example
//!
//! ```ignore
//! let ctx = ConfContext::open(Schema::builtin(), ConnSettings::default())?;
//! let handle = ctx.compile("WT_SESSION.begin_transaction", "isolation=%s,priority=%d")?;
//! let bound = ctx.bind(handle, &["read-committed".into(), 5_i64.into()])?;
//! ```

pub mod bind;
pub mod compile;
mod error;
mod get;
pub mod layout;
pub mod registry;
pub mod schema;
mod settings;
#[cfg(test)]
mod testing;

pub use bind::{BindArg, BoundItem, BoundValue, BoundValues};
pub use compile::Origin;
pub use error::{ConfError, ErrorKind, Result};
pub use get::ConfValue;
pub use layout::{ConfItem, ConfKey, ConfNode, ConfTree, MethodLayout, NodeIdx};
pub use registry::{CompiledConf, CompiledHandle, ConfContext, ConfigArg};
pub use schema::{MethodId, Schema, SchemaLoadError};
pub use settings::ConnSettings;
