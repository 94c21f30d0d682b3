//! Serialization of OpenAPI documents and JSON samples.
//!
//! The OpenAPI document is written as YAML or pretty-printed JSON. Operation
//! samples are written one file per operation and sample kind.

use crate::model::ContractModel;
use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Serializes an OpenAPI document to YAML format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// Creates the file if it doesn't exist, or overwrites it if it does.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Writes the samples of every operation into `dir` as
/// `<Operation>.request.json`, `<Operation>.response.json` and
/// `<Operation>.error.json`. Operations without a sample of a kind get no file.
///
/// Returns the written paths.
pub fn write_samples(model: &ContractModel, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for operation in &model.operations {
        let samples = [
            ("request", &operation.request_sample),
            ("response", &operation.response_sample),
            ("error", &operation.error_sample),
        ];
        for (kind, sample) in samples {
            let Some(sample) = sample else {
                continue;
            };
            let path = dir.join(format!("{}.{}.json", operation.name, kind));
            write_to_file(sample, &path)?;
            written.push(path);
        }
    }
    debug!("Wrote {} sample files to {}", written.len(), dir.display());
    Ok(written)
}
