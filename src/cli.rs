use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// Contract Docs - Generate OpenAPI documentation and JSON samples from a service contract manifest
#[derive(Parser, Debug)]
#[command(name = "contract-docs")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the contract manifest (YAML or JSON)
    #[arg(value_name = "MANIFEST")]
    pub manifest_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Directory holding per-assembly documentation files
    #[arg(long = "docs-dir", value_name = "DIR")]
    pub docs_dir: Option<PathBuf>,

    /// Directory to write request, response and error samples into
    #[arg(long = "samples-dir", value_name = "DIR")]
    pub samples_dir: Option<PathBuf>,

    /// Server URL added to the document
    #[arg(long = "server-url", value_name = "URL")]
    pub server_url: Option<String>,

    /// Document title (defaults to the contract summary)
    #[arg(long = "title")]
    pub title: Option<String>,

    /// Treat undocumented parameters and properties as required
    #[arg(long = "default-required")]
    pub default_required: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.manifest_path.is_file() {
        anyhow::bail!(
            "Manifest file does not exist: {}",
            args.manifest_path.display()
        );
    }

    if let Some(ref docs_dir) = args.docs_dir {
        if !docs_dir.is_dir() {
            anyhow::bail!(
                "Documentation path is not a directory: {}",
                docs_dir.display()
            );
        }
    }

    info!("Manifest: {}", args.manifest_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }
    if let Some(ref samples) = args.samples_dir {
        info!("Samples directory: {}", samples.display());
    }

    Ok(args)
}

impl CliArgs {
    fn settings(&self) -> crate::model::GeneratorSettings {
        crate::model::GeneratorSettings {
            default_required: self.default_required,
            title: self.title.clone(),
            server_url: self.server_url.clone(),
            ..Default::default()
        }
    }
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    use crate::contract::manifest::ContractManifest;
    use crate::doc_comments::{ChainedDocumentation, DirectoryDocumentation};
    use crate::model::ContractModel;
    use crate::openapi_builder::generate_document;
    use crate::scanner::DocFileScanner;
    use crate::serializer::{serialize_json, serialize_yaml, write_samples, write_to_file};

    info!("Starting contract documentation generation...");
    let settings = args.settings();

    // Step 1: Load the contract manifest
    let manifest = ContractManifest::from_path(&args.manifest_path)
        .with_context(|| format!("Failed to load manifest {}", args.manifest_path.display()))?;
    info!(
        "Loaded contract {} with {} operations and {} types",
        manifest.contract().name,
        manifest.contract().operations.len(),
        manifest.type_count()
    );

    // Step 2: Collect documentation sources, files first then inline entries
    let mut documentation = ChainedDocumentation::new();
    let mut doc_files = 0;
    if let Some(docs_dir) = &args.docs_dir {
        info!("Scanning documentation directory...");
        let scan_result = DocFileScanner::new(docs_dir.clone()).scan()?;
        for warning in &scan_result.warnings {
            warn!("{}", warning);
        }
        doc_files = scan_result.doc_files.len();
        info!("Found {} documentation files", doc_files);
        documentation = documentation.with(DirectoryDocumentation::from_scan(&scan_result));
    }
    documentation = documentation.with(manifest.documentation().clone());

    // Step 3: Build the documentation model
    info!("Building documentation model...");
    let model = ContractModel::build(
        manifest.contract(),
        &manifest,
        &documentation,
        manifest.examples(),
        &settings,
    )?;

    if model.operations.is_empty() {
        warn!("Contract {} declares no operations", model.name);
    }

    // Step 4: Build OpenAPI document
    info!("Building OpenAPI document...");
    let document = generate_document(&model, &manifest, &settings)?;
    info!("OpenAPI document built successfully");

    // Step 5: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&document)?,
        OutputFormat::Json => serialize_json(&document)?,
    };

    // Step 6: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    // Step 7: Write samples
    let mut sample_files = 0;
    if let Some(samples_dir) = &args.samples_dir {
        info!("Writing samples to: {}", samples_dir.display());
        sample_files = write_samples(&model, samples_dir)?.len();
    }

    // Step 8: Display summary
    info!("Generation complete!");
    info!("Summary:");
    info!("  - Documentation files: {}", doc_files);
    info!("  - Documented assemblies: {:?}", model.documented_assemblies);
    info!("  - Operations: {}", model.operations.len());
    info!("  - Paths: {}", document.paths.len());
    info!("  - Sample files: {}", sample_files);

    Ok(())
}
