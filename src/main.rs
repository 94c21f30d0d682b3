//! Contract Docs - Command-line tool for generating OpenAPI documentation from service contracts.
//!
//! This binary reads a contract manifest (operations, data types, inline documentation
//! and registered examples), merges it with per-assembly documentation files and emits
//! an OpenAPI 3.0 document plus optional request, response and error samples.
//!
//! # Usage
//!
//! ```bash
//! contract-docs [OPTIONS] <MANIFEST>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! contract-docs ./orders.yaml -o openapi.yaml
//! ```
//!
//! Generate JSON documentation with documentation files and samples:
//! ```bash
//! contract-docs ./orders.yaml -f json -o openapi.json --docs-dir ./docs --samples-dir ./samples
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! contract-docs ./orders.yaml -v
//! ```

use anyhow::Result;
use clap::Parser;
use contract_docs::cli;
use log::info;

fn main() -> Result<()> {
    // Parse once to read the verbose flag before the logger exists
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Contract Docs starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("Contract documentation generation completed successfully");

    Ok(())
}
