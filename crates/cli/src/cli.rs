use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "confc")]
#[command(about = "Check, compile and bind API method configuration strings")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Connection settings file (TOML)
	#[arg(long, short = 's', value_name = "PATH")]
	pub settings: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// List known methods with their layout capacities
	Methods,
	/// Print a method's built-in default string
	Defaults {
		/// Method name, e.g. WT_SESSION.begin_transaction
		method: String,
	},
	/// Compile a configuration as an API call would and print every resolved key
	Compile {
		/// Method name
		method: String,
		/// Configuration string; defaults only when omitted
		config: Option<String>,
	},
	/// Precompile a format with placeholders, bind values and print every resolved key
	Bind {
		/// Method name
		method: String,
		/// Format string containing %d and %s placeholders
		format: String,
		/// One value per placeholder, in order
		values: Vec<String>,
	},
}
