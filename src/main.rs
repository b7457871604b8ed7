//! openapi-from-routes - Command-line tool for generating OpenAPI documentation.
//!
//! Reads the route table and handler metadata a web application exports as snapshot files,
//! and writes an OpenAPI 3.0.0 document describing its documented endpoints.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-routes generate --metadata <PATH> [OPTIONS]
//! ```
//!
//! # Examples
//!
//! Generate JSON documentation to stdout:
//! ```bash
//! openapi-from-routes generate -m storage/api-metadata
//! ```
//!
//! Generate YAML with a configuration file:
//! ```bash
//! openapi-from-routes generate -m metadata.yaml -c docs.yaml -f yaml -o public/openapi.yaml
//! ```

use anyhow::Result;
use log::info;
use openapi_from_routes::cli;

fn main() -> Result<()> {
    let args = cli::parse_args();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("openapi-from-routes starting...");

    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
