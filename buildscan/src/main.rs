mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true,
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[command(flatten)]
	verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Run the detection HTTP server
	Serve(tools::serve::Subcommand),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.filter_module("reqwest", log::LevelFilter::Warn)
		.filter_module("tower_http", log::LevelFilter::Warn)
		.format_timestamp(None)
		.init();

	run(cli)
}

fn run(cli: Cli) -> Result<()> {
	match &cli.command {
		Commands::Serve(arguments) => tools::serve::run(arguments),
	}
}

#[cfg(test)]
mod tests {
	use crate::Cli;
	use anyhow::Result;
	use clap::Parser;

	fn run_command(arg_vec: Vec<&str>) -> Result<String> {
		let cli = Cli::try_parse_from(arg_vec)?;
		let msg = format!("{cli:?}");
		Ok(msg)
	}

	#[test]
	fn help() {
		let err = Cli::try_parse_from(vec!["buildscan"]).unwrap_err().to_string();
		assert!(err.contains("Usage: buildscan"));
	}

	#[test]
	fn version() {
		let err = Cli::try_parse_from(vec!["buildscan", "-V"]).unwrap_err().to_string();
		assert!(err.starts_with("buildscan "));
	}

	#[test]
	fn serve_subcommand_parses() {
		let msg = run_command(vec!["buildscan", "serve"]).unwrap();
		assert!(msg.contains("Serve"));
	}

	use rstest::rstest;

	#[rstest]
	#[case(vec!["buildscan", "serve"], log::LevelFilter::Info)]
	#[case(vec!["buildscan", "-v", "serve"], log::LevelFilter::Debug)]
	#[case(vec!["buildscan", "-q", "serve"], log::LevelFilter::Warn)]
	#[case(vec!["buildscan", "-qq", "serve"], log::LevelFilter::Error)]
	fn verbosity_flags_set_the_log_level(#[case] arg_vec: Vec<&str>, #[case] expected: log::LevelFilter) {
		let cli = Cli::try_parse_from(arg_vec).unwrap();
		assert_eq!(cli.verbose.log_level_filter(), expected);
	}
}
