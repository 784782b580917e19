//! `confc` command-line front end.
//!
//! Runs configuration strings through the embedded method schema the same way API calls do,
//! so malformed configurations can be diagnosed without an engine.

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use cli::{Cli, Command};
use confc::layout::BindKind;
use confc::{BindArg, BoundValues, ConfContext, ConfTree, ConfValue, ConnSettings, MethodId, Schema};
use tracing::debug;

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let settings = match &cli.settings {
		Some(path) => {
			let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
			ConnSettings::from_toml(&text)?
		}
		None => ConnSettings::default(),
	};
	let schema = Schema::builtin();
	let ctx = ConfContext::open(schema, settings)?;
	debug!(methods = schema.len(), capacity = ctx.capacity(), "opened configuration context");

	match cli.command {
		Command::Methods => {
			for (id, method) in schema.methods() {
				let layout = schema.layout(id);
				println!(
					"{:<36} {:<10} nodes={:<3} keys={}",
					method.name,
					if method.compilable { "compilable" } else { "-" },
					layout.node_capacity,
					layout.key_capacity
				);
			}
		}
		Command::Defaults { method } => {
			let id = find(schema, &method)?;
			println!("{}", schema.get(id).base);
		}
		Command::Compile { method, config } => {
			let id = find(schema, &method)?;
			let mut scratch = ctx.scratch(id);
			let tree = ctx.compile_api_call(id, config.as_deref().into(), &mut scratch)?;
			print_tree(tree, None);
		}
		Command::Bind { method, format, values } => {
			let handle = ctx.compile(&method, &format)?;
			let tree = ctx.get_compiled(handle)?.tree();
			let args = bind_args(tree, &values)?;
			let bound = ctx.bind(handle, &args)?;
			debug!(%handle, values = bound.len(), "bound precompiled configuration");
			print_tree(tree, Some(&bound));
		}
	}
	Ok(())
}

fn find(schema: &Schema, method: &str) -> anyhow::Result<MethodId> {
	schema.find(method).with_context(|| format!("unknown method '{method}'"))
}

/// Reads each value as the type its placeholder expects.
fn bind_args<'v>(tree: &ConfTree<'_>, values: &'v [String]) -> anyhow::Result<Vec<BindArg<'v>>> {
	let kinds: Vec<_> = tree.bindings().map(|desc| desc.kind).collect();
	if kinds.len() != values.len() {
		bail!("format has {} placeholders, got {} values", kinds.len(), values.len());
	}
	kinds
		.into_iter()
		.zip(values)
		.map(|(kind, value)| {
			Ok(match (kind, value.as_str()) {
				(BindKind::Bool, "true") => BindArg::from(true),
				(BindKind::Bool, "false") => BindArg::from(false),
				(BindKind::Num | BindKind::Bool, text) => BindArg::Int(confc_parser::parse_int(text)?),
				(BindKind::Str, text) => BindArg::Str(text),
			})
		})
		.collect()
}

fn print_tree(tree: &ConfTree<'_>, bound: Option<&BoundValues<'_>>) {
	for (path, value) in tree.resolved() {
		let value = match (value, bound) {
			(ConfValue::Bound(_), Some(bound)) => tree.get_bound(&path, bound).unwrap_or(value),
			_ => value,
		};
		let origin = if tree.is_default(&path) == Some(true) { "  (default)" } else { "" };
		println!("{path}={}{origin}", render(value));
	}
}

fn render(value: ConfValue<'_>) -> String {
	match value {
		ConfValue::Num(n) => n.to_string(),
		ConfValue::Bool(b) => b.to_string(),
		ConfValue::Str(s) if s.contains([',', '=', ':', '(', ')', '[', ']', ' ']) => format!("\"{s}\""),
		ConfValue::Str(s) | ConfValue::Choice(s) => s.to_string(),
		ConfValue::Sub(_) => "(...)".to_string(),
		ConfValue::Bound(ordinal) => format!("<unbound %{ordinal}>"),
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("confc=trace,debug")
		} else {
			EnvFilter::new("warn")
		}
	});
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
