//! Response descriptors and the error-response merge.

use crate::contract::{ExampleKind, TypeName};
use crate::operation::ParameterDescriptor;
use log::debug;

/// A documented response of an operation.
#[derive(Debug, Clone)]
pub struct ResponseDescriptor {
    /// HTTP status code
    pub code: u16,
    pub description: String,
    /// Example payload text
    pub example: Option<String>,
    /// Payload type
    pub type_name: Option<TypeName>,
    pub example_kind: ExampleKind,
    pub disabled: bool,
    /// Payload type described as an unnamed parameter
    pub parameter: Option<ParameterDescriptor>,
}

/// Merges contract-level and operation-level error responses.
///
/// For each contract-level code an operation-level entry with the same code
/// takes its place; operation-only codes are appended. Disabled entries are
/// dropped, so an operation can switch off an inherited response by
/// redeclaring it disabled. The result is ordered by status code.
pub fn merge_error_responses(
    contract_level: &[ResponseDescriptor],
    operation_level: &[ResponseDescriptor],
) -> Vec<ResponseDescriptor> {
    let mut merged: Vec<ResponseDescriptor> = Vec::new();

    for inherited in contract_level {
        match operation_level.iter().find(|r| r.code == inherited.code) {
            Some(own) => {
                if own.disabled {
                    debug!("Response {} disabled by the operation", own.code);
                } else {
                    merged.push(own.clone());
                }
            }
            None if !inherited.disabled => merged.push(inherited.clone()),
            None => {}
        }
    }

    merged.extend(
        operation_level
            .iter()
            .filter(|own| !own.disabled)
            .filter(|own| !contract_level.iter().any(|r| r.code == own.code))
            .cloned(),
    );

    merged.sort_by_key(|r| r.code);
    merged
}
