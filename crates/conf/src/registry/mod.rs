//! Connection-scoped compiled-configuration registry.
//!
//! A [`ConfContext`] owns one template per compilable method (its defaults, compiled once at
//! open) and a fixed-capacity array of precompiled entries. Precompiling reserves a slot with a
//! single atomic increment and publishes the entry through that slot's `OnceLock`, so concurrent
//! sessions never contend on a lock. Entries live until [`ConfContext::discard`].

use std::borrow::Cow;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, warn};

use crate::bind::{self, BindArg, BoundValues};
use crate::compile::{self, Origin};
use crate::error::{ConfError, Result};
use crate::layout::ConfTree;
use crate::schema::{MethodId, Schema};
use crate::settings::ConnSettings;


static NEXT_CONTEXT: AtomicU32 = AtomicU32::new(1);

/// Opaque identity of a precompiled configuration.
///
/// Handles are only meaningful to the context that issued them.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CompiledHandle {
	context: u32,
	slot: u32,
}

impl CompiledHandle {
	pub fn slot(&self) -> u32 {
		self.slot
	}
}

impl std::fmt::Display for CompiledHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}.{}", self.context, self.slot)
	}
}

/// The configuration argument of an API call.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ConfigArg<'c> {
	#[default]
	None,
	Text(&'c str),
	Compiled(CompiledHandle),
}

impl<'c> From<&'c str> for ConfigArg<'c> {
	fn from(text: &'c str) -> Self {
		ConfigArg::Text(text)
	}
}

impl<'c> From<Option<&'c str>> for ConfigArg<'c> {
	fn from(text: Option<&'c str>) -> Self {
		text.map_or(ConfigArg::None, ConfigArg::Text)
	}
}

impl From<CompiledHandle> for ConfigArg<'_> {
	fn from(handle: CompiledHandle) -> Self {
		ConfigArg::Compiled(handle)
	}
}

/// A precompiled entry: the tree plus the owned copy of its format string.
#[derive(Debug)]
pub struct CompiledConf<'s> {
	tree: ConfTree<'s>,
}

impl<'s> CompiledConf<'s> {
	pub fn method(&self) -> MethodId {
		self.tree.method_id()
	}

	pub fn tree(&self) -> &ConfTree<'s> {
		&self.tree
	}

	/// The format string as it was compiled.
	pub fn text(&self) -> &str {
		self.tree.sources().last().unwrap_or_default()
	}
}

pub struct ConfContext<'s> {
	id: u32,
	schema: &'s Schema,
	settings: ConnSettings,
	templates: Vec<Option<ConfTree<'s>>>,
	slots: Box<[OnceLock<CompiledConf<'s>>]>,
	next_slot: AtomicU32,
	open: bool,
}

impl<'s> ConfContext<'s> {
	/// Validates `settings` and compiles every compilable method's defaults into a template.
	pub fn open(schema: &'s Schema, settings: ConnSettings) -> Result<Self> {
		settings.validate()?;

		let templates = schema
			.methods()
			.map(|(id, method)| {
				method
					.compilable
					.then(|| {
						let mut tree = ConfTree::new(schema, id);
						compile::compile_into(&mut tree, [(Cow::Borrowed(method.base.as_str()), Origin::Default)], false)
							.map(|()| tree)
					})
					.transpose()
			})
			.collect::<Result<Vec<_>>>()?;

		let capacity = settings.compile_configuration_count;
		let id = NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed);
		debug!(
			domain = "conf",
			context = id,
			templates = templates.iter().flatten().count(),
			capacity,
			"compiled method templates"
		);

		Ok(Self {
			id,
			schema,
			settings,
			templates,
			slots: (0..capacity).map(|_| OnceLock::new()).collect(),
			next_slot: AtomicU32::new(0),
			open: true,
		})
	}

	pub fn schema(&self) -> &'s Schema {
		self.schema
	}

	pub fn settings(&self) -> &ConnSettings {
		&self.settings
	}

	/// Number of precompiled entries.
	pub fn len(&self) -> usize {
		self.next_slot.load(Ordering::Acquire) as usize
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.slots.len()
	}

	fn method_id(&self, method: &str) -> Result<MethodId> {
		self.schema
			.find(method)
			.ok_or_else(|| ConfError::UnknownMethod(method.to_string()))
	}

	fn ensure_open(&self) -> Result<()> {
		if self.open { Ok(()) } else { Err(ConfError::ContextClosed) }
	}

	/// Precompiles `format` for `method` into a reusable entry. Placeholders are allowed.
	pub fn compile(&self, method: &str, format: &str) -> Result<CompiledHandle> {
		self.ensure_open()?;
		let id = self.method_id(method)?;
		let spec = self.schema.get(id);
		if !spec.compilable {
			return Err(ConfError::NotCompilable(spec.name.clone()));
		}

		let mut tree = ConfTree::new(self.schema, id);
		let sources = [
			(Cow::Borrowed(spec.base.as_str()), Origin::Default),
			(Cow::Owned(format.to_string()), Origin::Override),
		];
		compile::compile_into(&mut tree, sources, true)?;
		let bindings = tree.binding_count();

		let max = self.slots.len() as u32;
		let slot = self
			.next_slot
			.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
			.map_err(|_| {
				warn!(domain = "conf", method, max, "compiled configuration slots exhausted");
				ConfError::RegistryFull {
					config: format.to_string(),
					max,
				}
			})?;
		if self.slots[slot as usize].set(CompiledConf { tree }).is_err() {
			unreachable!("compile slot {slot} reserved twice");
		}

		debug!(domain = "conf", method, slot, bindings, "precompiled configuration");
		Ok(CompiledHandle { context: self.id, slot })
	}

	pub fn get_compiled(&self, handle: CompiledHandle) -> Result<&CompiledConf<'s>> {
		self.ensure_open()?;
		if handle.context != self.id {
			return Err(ConfError::UnknownHandle(handle));
		}
		self.slots
			.get(handle.slot as usize)
			.and_then(OnceLock::get)
			.ok_or(ConfError::UnknownHandle(handle))
	}

	/// An empty tree with `method`'s exact layout, for [`compile_api_call`](Self::compile_api_call).
	pub fn scratch(&self, method: MethodId) -> ConfTree<'s> {
		ConfTree::new(self.schema, method)
	}

	/// Compiles one API call's configuration.
	///
	/// A precompiled handle returns its tree unchanged. Otherwise the method's template is copied
	/// into `scratch` and the optional text compiled on top; placeholders are rejected.
	///
	/// # Panics
	///
	/// Panics if `scratch` was not created for `method`.
	pub fn compile_api_call<'t, 'r>(
		&'r self,
		method: MethodId,
		config: ConfigArg<'t>,
		scratch: &'r mut ConfTree<'t>,
	) -> Result<&'r ConfTree<'t>>
	where
		's: 't,
	{
		self.ensure_open()?;
		let spec = self.schema.get(method);
		if !spec.compilable {
			return Err(ConfError::NotCompilable(spec.name.clone()));
		}
		assert_eq!(
			scratch.layout(),
			self.schema.layout(method),
			"conf: total size does not equal calculated size"
		);

		let text = match config {
			ConfigArg::Compiled(handle) => {
				let compiled = self.get_compiled(handle)?;
				if compiled.method() != method {
					return Err(ConfError::HandleMethod {
						handle,
						compiled_for: self.schema.get(compiled.method()).name.clone(),
						method: spec.name.clone(),
					});
				}
				return Ok(compiled.tree());
			}
			ConfigArg::Text(text) => Some(text),
			ConfigArg::None => None,
		};

		let Some(template) = &self.templates[method.as_usize()] else {
			unreachable!("compilable method '{}' has no template", spec.name);
		};
		scratch.reset_from(template);
		if let Some(text) = text {
			compile::compile_into(scratch, [(Cow::Borrowed(text), Origin::Override)], false)?;
		}
		Ok(scratch)
	}

	/// Resolves `args` against a precompiled entry's placeholders.
	pub fn bind<'a>(&'a self, handle: CompiledHandle, args: &[BindArg<'a>]) -> Result<BoundValues<'a>> {
		let compiled = self.get_compiled(handle)?;
		bind::bind(compiled.tree(), args)
	}

	/// Drops every precompiled entry and template. Outstanding handles become unknown.
	pub fn discard(&mut self) {
		let entries = self.len();
		self.slots = Box::new([]);
		self.templates.clear();
		self.next_slot.store(0, Ordering::Release);
		self.open = false;
		debug!(domain = "conf", context = self.id, entries, "discarded compiled configurations");
	}
}

impl std::fmt::Debug for ConfContext<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConfContext")
			.field("id", &self.id)
			.field("entries", &self.len())
			.field("capacity", &self.capacity())
			.field("open", &self.open)
			.finish()
	}
}
