//! Navkeep CLI: inspect session records and query frame-tree fixtures
//!
//! ## Usage
//!
//! ```bash
//! navkeep inspect session.json --format json   # Show a stored record
//! navkeep query page.yaml "iframe ul" --frames # Frame-qualified query
//! navkeep selector page.yaml "div.results"     # Derive a global selector
//! navkeep descriptor                           # Print the descriptor tree
//! ```

use clap::Parser;
use navkeep_cli::{
    handlers, logging, render_matches, render_record, Cli, CliConfig, CliResult, Commands,
    OutputFormat, Reporter, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init_logging(&config);
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());

    match run(cli.command, &reporter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}

fn run(command: Commands, reporter: &Reporter) -> CliResult<()> {
    match command {
        Commands::Inspect(args) => {
            let record = handlers::inspect(&args.record, &args.key)?;
            print!("{}", render_record(&record, args.format.into())?);
            Ok(())
        }
        Commands::Query(args) => {
            let format: OutputFormat = args.format.into();
            let rows = handlers::query(&args.fixture, &args.selector, args.frames)?;
            if rows.is_empty() && format == OutputFormat::Text {
                reporter.warning(&format!("no element matches `{}`", args.selector));
                return Ok(());
            }
            print!("{}", render_matches(&rows, format)?);
            if format == OutputFormat::Json {
                println!();
            }
            Ok(())
        }
        Commands::Selector(args) => {
            println!("{}", handlers::selector(&args.fixture, &args.selector)?);
            Ok(())
        }
        Commands::Descriptor => {
            print!("{}", handlers::descriptor());
            Ok(())
        }
    }
}
