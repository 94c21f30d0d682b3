//! Error types for contract introspection and schema synthesis.
//!
//! Every error is fatal for the generation pass that raised it. Missing
//! documentation is never reported here; it simply yields empty text.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building the documentation model
#[derive(Debug, Error)]
pub enum Error {
    /// A documentation record carried a required flag that is not a boolean.
    #[error("Cannot parse documentation value '{value}' as a boolean")]
    DocumentationParse {
        /// The raw text found in the documentation source.
        value: String,
    },

    /// Two unrelated declaring types contribute the same wire name.
    #[error("Duplicate property '{property}' on type '{type_name}'")]
    DuplicateProperty {
        /// The type whose schema was being built.
        type_name: String,
        /// The colliding wire name.
        property: String,
    },

    /// A value with no mapping in the output model (HTTP method, placement).
    #[error("Not supported {kind}: {value}")]
    Unsupported {
        /// What was being mapped.
        kind: &'static str,
        /// The unmapped value.
        value: String,
    },

    /// A contract manifest or documentation file could not be parsed.
    #[error("Failed to parse {}: {message}", file.display())]
    Parse {
        /// File being parsed.
        file: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Registering a second example for the same kind and type.
    #[error("Example already registered for {key}")]
    DuplicateExample {
        /// The `{kind}-{type}` registry key.
        key: String,
    },

    /// IO error when reading documentation or manifest files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn unsupported(kind: &'static str, value: impl Into<String>) -> Self {
        Error::Unsupported {
            kind,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documentation_parse_error_names_value() {
        let err = Error::DocumentationParse {
            value: "maybe".to_string(),
        };
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_duplicate_property_error() {
        let err = Error::DuplicateProperty {
            type_name: "Shop.Order".to_string(),
            property: "id".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("Shop.Order"));
        assert!(text.contains("'id'"));
    }

    #[test]
    fn test_unsupported_error() {
        let err = Error::unsupported("method", "TRACE");
        assert_eq!(err.to_string(), "Not supported method: TRACE");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: Error = serde_json::from_str::<String>("{").unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
