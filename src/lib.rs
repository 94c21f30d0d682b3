//! Contract Docs - OpenAPI documentation and JSON samples from service contracts.
//!
//! This library turns the metadata of an RPC-style service contract (operations, their
//! HTTP bindings, parameter and return types, declared faults) together with per-member
//! documentation comments into an OpenAPI 3.0 document and example request, response
//! and error payloads.
//!
//! # Architecture
//!
//! The library is organized into several modules that work together:
//!
//! 1. [`contract`] - Contract metadata and the [`contract::TypeMetadataProvider`] seam,
//!    with a YAML/JSON [`contract::manifest`] implementation
//! 2. [`scanner`] / [`doc_comments`] - Locate and index per-assembly documentation
//! 3. [`type_descriptor`] - Cached, cycle-safe descriptions of data types
//! 4. [`operation`] / [`responses`] - Per-operation models and error response merging
//! 5. [`samples`] - Example registry and JSON sample synthesis
//! 6. [`model`] - One generation pass over a whole contract
//! 7. [`schema_generator`] - Converts type descriptions to OpenAPI schemas
//! 8. [`openapi_builder`] - Constructs the complete OpenAPI document
//! 9. [`serializer`] - Serializes the document to YAML or JSON and writes samples
//!
//! # Example Usage
//!
//! ```no_run
//! use contract_docs::{
//!     contract::manifest::ContractManifest,
//!     model::{ContractModel, GeneratorSettings},
//!     openapi_builder::generate_document,
//!     serializer::serialize_yaml,
//! };
//! use std::path::Path;
//!
//! let manifest = ContractManifest::from_path(Path::new("./orders.yaml")).unwrap();
//! let settings = GeneratorSettings::default();
//!
//! // Describe every operation of the contract
//! let model = ContractModel::build(
//!     manifest.contract(),
//!     &manifest,
//!     manifest.documentation(),
//!     manifest.examples(),
//!     &settings,
//! )
//! .unwrap();
//!
//! // Build and serialize the OpenAPI document
//! let document = generate_document(&model, &manifest, &settings).unwrap();
//! println!("{}", serialize_yaml(&document).unwrap());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cli;
pub mod contract;
pub mod doc_comments;
pub mod error;
pub mod model;
pub mod openapi_builder;
pub mod operation;
pub mod responses;
pub mod samples;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod type_descriptor;
