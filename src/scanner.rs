use crate::error::Result;
use log::{debug, warn};
use std::path::PathBuf;
use walkdir::WalkDir;

const DOC_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Scanner for per-assembly documentation files.
///
/// The `DocFileScanner` recursively walks a documentation directory and collects every
/// `<assembly>.json`, `<assembly>.yaml` or `<assembly>.yml` file. Hidden directories
/// (those starting with `.`) are skipped.
///
/// # Example
///
/// ```no_run
/// use contract_docs::scanner::DocFileScanner;
/// use std::path::PathBuf;
///
/// let scanner = DocFileScanner::new(PathBuf::from("./docs"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} documentation files", result.doc_files.len());
/// ```
pub struct DocFileScanner {
    root_path: PathBuf,
}

/// Result of a directory scan.
pub struct ScanResult {
    /// Paths of all discovered documentation files, sorted
    pub doc_files: Vec<PathBuf>,
    /// Warning messages for paths that could not be read
    pub warnings: Vec<String>,
}

impl DocFileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Walks the directory tree and collects documentation files.
    ///
    /// Inaccessible entries are logged and reported as warnings; scanning continues.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut doc_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }
                !e.file_name().to_string_lossy().starts_with('.')
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let is_doc = path
                        .extension()
                        .and_then(|s| s.to_str())
                        .map(|ext| DOC_EXTENSIONS.contains(&ext))
                        .unwrap_or(false);
                    if path.is_file() && is_doc {
                        doc_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        debug!(
            "Found {} documentation files under {}",
            doc_files.len(),
            self.root_path.display()
        );

        Ok(ScanResult {
            doc_files,
            warnings,
        })
    }
}
