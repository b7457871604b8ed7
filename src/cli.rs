use crate::config::{GeneratorConfig, ServerConfig};
use crate::loader::SnapshotLoader;
use crate::openapi_builder::assemble;
use crate::resolver::RouteResolver;
use crate::scanner::FileScanner;
use crate::serializer::{serialize, write_to_file, OutputFormat};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Generate OpenAPI 3.0 documentation from a web application's exported route metadata
#[derive(Parser, Debug)]
#[command(name = "openapi-from-routes")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the OpenAPI document
    Generate(GenerateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Metadata snapshot file, or a directory scanned for .json/.yaml/.yml snapshots
    #[arg(short = 'm', long = "metadata", value_name = "PATH")]
    pub metadata: PathBuf,

    /// Configuration file (.json, .yaml or .yml)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format: json, yaml or yml
    #[arg(short = 'f', long = "format", default_value = "json")]
    pub format: String,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// API title
    #[arg(long)]
    pub title: Option<String>,

    /// API description
    #[arg(long)]
    pub description: Option<String>,

    /// API version
    #[arg(long = "api-version")]
    pub api_version: Option<String>,

    /// Base URL of the API server
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Enable bearer token authentication
    #[arg(long)]
    pub bearer: bool,

    /// Enable OAuth2 authentication
    #[arg(long)]
    pub oauth2: bool,

    /// Enable API key authentication
    #[arg(long = "api-key")]
    pub api_key: bool,

    /// Require the bearer scheme on every operation
    #[arg(long = "always-bearer")]
    pub always_bearer: bool,
}

impl GenerateArgs {
    /// Load the configuration file (or defaults) and apply command-line overrides
    pub fn resolve_config(&self) -> Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
            None => GeneratorConfig::default(),
        };

        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if let Some(description) = &self.description {
            config.description = Some(description.clone());
        }
        if let Some(version) = &self.api_version {
            config.version = version.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.servers.push(ServerConfig {
                url: base_url.trim_end_matches('/').to_string(),
                description: Some("API Server".to_string()),
            });
        }
        if self.bearer {
            config.security.bearer.enabled = true;
        }
        if self.oauth2 {
            config.security.oauth2.enabled = true;
        }
        if self.api_key {
            config.security.api_key.enabled = true;
        }
        if self.always_bearer {
            config.always_require_bearer = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse command line arguments
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Run the parsed command
pub fn run(args: CliArgs) -> Result<()> {
    debug!("Parsed arguments: {:?}", args);
    match args.command {
        Command::Generate(generate) => run_generate(&generate),
    }
}

/// Run the generate workflow and return the rendered document
pub fn generate_document(args: &GenerateArgs) -> Result<String> {
    let format: OutputFormat = args.format.parse()?;
    let config = args.resolve_config()?;

    // Step 1: Locate snapshot files
    info!("Scanning metadata: {}", args.metadata.display());
    let scan_result = FileScanner::new(args.metadata.clone()).scan()?;
    for warning in &scan_result.warnings {
        warn!("{}", warning);
    }
    if scan_result.files.is_empty() {
        anyhow::bail!(
            "No metadata snapshots found in {}",
            args.metadata.display()
        );
    }
    info!("Found {} snapshot files", scan_result.files.len());

    // Step 2: Load and merge snapshots
    let loaded: Vec<_> = SnapshotLoader::load_files(&scan_result.files)
        .into_iter()
        .filter_map(|result| result.ok())
        .collect();
    if loaded.is_empty() {
        anyhow::bail!("No metadata snapshots could be loaded");
    }
    let loaded_count = loaded.len();
    let snapshot = SnapshotLoader::merge(loaded);
    info!(
        "Loaded {} routes, {} handlers and {} types",
        snapshot.routes.len(),
        snapshot.handlers.len(),
        snapshot.types.len()
    );

    // Step 3: Resolve documented operations
    let mut resolver = RouteResolver::new(&snapshot, &config);
    let operations = resolver.resolve_all(&snapshot.routes);
    if operations.is_empty() {
        warn!("No documented routes found");
    }

    // Step 4: Assemble and serialize
    let document = assemble(&operations, resolver.into_schemas(), &config);
    info!("Serializing to {} format...", format);
    let content = serialize(&document, format)?;

    info!("Summary:");
    info!("  - Snapshots loaded: {}", loaded_count);
    info!("  - Routes scanned: {}", snapshot.routes.len());
    info!("  - Operations documented: {}", operations.len());
    info!(
        "  - Named schemas: {}",
        document
            .components
            .as_ref()
            .map_or(0, |components| components.schemas.len())
    );

    Ok(content)
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    info!("Starting OpenAPI document generation...");
    let content = generate_document(args)?;

    if let Some(output_path) = &args.output {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    Ok(())
}
