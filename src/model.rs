//! Contract documentation model.
//!
//! [`ContractModel::build`] runs one generation pass over a contract: it
//! collects the referenced assemblies, loads their documentation, describes
//! the contract type and builds every operation descriptor. The result is
//! the input of the OpenAPI builder and the sample writers.

use crate::contract::{ApiInfo, ContractDescription, TypeMetadataProvider, TypeName};
use crate::doc_comments::{referenced_assemblies, DocCommentStore, DocumentationSource};
use crate::error::Result;
use crate::operation::{OperationDescriptor, OperationModelBuilder};
use crate::samples::ExampleSource;
use crate::type_descriptor::{DescriptorCache, TypeDescriptor, TypeDescriptorBuilder};
use log::{debug, info};
use std::sync::Arc;

/// OpenAPI version emitted by default
pub const OPENAPI_VERSION: &str = "3.0.1";

/// Settings of a generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    /// Required-ness of anything the documentation does not mark
    pub default_required: bool,
    /// Replaces the contract summary as document title
    pub title: Option<String>,
    pub server_url: Option<String>,
    pub openapi_version: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            default_required: false,
            title: None,
            server_url: None,
            openapi_version: OPENAPI_VERSION.to_string(),
        }
    }
}

/// Documentation model of a whole contract.
pub struct ContractModel {
    pub name: String,
    pub contract_type: TypeName,
    /// Documented summary of the contract type
    pub summary: String,
    pub api_info: Option<ApiInfo>,
    pub operations: Vec<OperationDescriptor>,
    /// Assemblies whose documentation was found
    pub documented_assemblies: Vec<String>,
    contract_descriptor: Option<Arc<TypeDescriptor>>,
    /// Owns every descriptor the operations point at
    cache: Arc<DescriptorCache>,
}

impl ContractModel {
    /// Builds the model with a fresh descriptor cache.
    pub fn build(
        contract: &ContractDescription,
        provider: &dyn TypeMetadataProvider,
        documentation: &dyn DocumentationSource,
        examples: &dyn ExampleSource,
        settings: &GeneratorSettings,
    ) -> Result<Self> {
        Self::build_with_cache(
            contract,
            provider,
            documentation,
            examples,
            settings,
            Arc::new(DescriptorCache::new()),
        )
    }

    /// Builds the model on a descriptor cache shared with other builds.
    pub fn build_with_cache(
        contract: &ContractDescription,
        provider: &dyn TypeMetadataProvider,
        documentation: &dyn DocumentationSource,
        examples: &dyn ExampleSource,
        settings: &GeneratorSettings,
        cache: Arc<DescriptorCache>,
    ) -> Result<Self> {
        info!("Building documentation model for contract {}", contract.name);

        let assemblies = referenced_assemblies(contract, provider);
        debug!("Referenced assemblies: {:?}", assemblies);
        let docs = DocCommentStore::load(&assemblies, documentation, settings.default_required)?;

        let mut types = TypeDescriptorBuilder::new(&cache, provider, &docs, examples);
        let contract_descriptor = types.describe(&contract.contract_type);
        let contract_responses = contract_descriptor
            .as_ref()
            .map(|d| d.error_responses().to_vec())
            .unwrap_or_default();

        let mut operations = Vec::with_capacity(contract.operations.len());
        let mut builder = OperationModelBuilder::new(&mut types, contract);
        for operation in &contract.operations {
            operations.push(builder.build(operation, &contract_responses)?);
        }
        info!("Built {} operations", operations.len());

        Ok(Self {
            name: contract.name.clone(),
            contract_type: contract.contract_type.clone(),
            summary: contract_descriptor
                .as_ref()
                .map(|d| d.summary.clone())
                .unwrap_or_default(),
            api_info: contract.api_info.clone(),
            operations,
            documented_assemblies: docs
                .loaded_assemblies()
                .into_iter()
                .map(str::to_string)
                .collect(),
            contract_descriptor,
            cache,
        })
    }

    /// Descriptor of the contract type itself.
    pub fn contract_descriptor(&self) -> Option<&Arc<TypeDescriptor>> {
        self.contract_descriptor.as_ref()
    }

    pub fn cache(&self) -> &Arc<DescriptorCache> {
        &self.cache
    }

    pub fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|op| op.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::manifest::ContractManifest;
    use crate::contract::AuthorizationKind;
    use crate::operation::{HttpMethod, ParamPlace};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    const MANIFEST: &str = r#"
contract:
  name: Orders
  type: Shop.IOrders
  assembly: Shop
  authorization: [basic]
  faults:
    - { code: 400, description: Bad request, detail_type: Shop.Fault }
    - { code: 500, description: Server error }
operations:
  - name: GetOrder
    get: { uri_template: "orders/{id}?expand={expand}" }
    headers:
      - { name: X-Tenant, required: true, description: Tenant id }
    parameters:
      - { name: id, type: System.Int32, required: false }
      - { name: expand, type: System.Boolean }
    returns: Shop.Order
    authorization: [bearer]
    faults:
      - { code: 400, description: Invalid id, detail_type: Shop.Fault }
      - { code: 404, description: Not found, detail_type: Shop.Fault }
  - name: Search
    get: {}
    parameters:
      - { name: text, type: System.String }
      - { name: limit, type: System.Int32 }
    returns: "Shop.Order[]"
  - name: Save
    invoke: { method: PUT, uri_template: "orders/{id}" }
    parameters:
      - { name: id, type: System.Int32 }
      - { name: order, type: Shop.Order }
    faults:
      - { code: 500, description: Server error, disabled: true }
  - name: Merge
    invoke: { method: "" }
    body_style: wrapped_request
    parameters:
      - { name: left, type: Shop.Order }
      - { name: right, type: Shop.Order }
    returns: Shop.Order
    returns_example: custom
types:
  - name: Shop.Order
    assembly: Shop
    members:
      - { name: Id, type: System.Int32, wire_name: id }
      - { name: Total, type: System.Decimal }
  - name: Shop.Fault
    assembly: Shop
    members:
      - { name: Message, type: System.String }
documentation:
  Shop:
    - name: "T:Shop.IOrders"
      summary: Order management
    - name: "M:Shop.IOrders.GetOrder(System.Int32,System.Boolean)"
      summary: Reads an order
      returns: The order
      params:
        - { name: expand, description: Include lines, required: "true" }
examples:
  - kind: custom
    type: Shop.Order
    value: { id: 42 }
  - kind: output
    type: Shop.Fault
    value: { Message: boom }
"#;

    fn model() -> ContractModel {
        let manifest = ContractManifest::from_yaml_str(MANIFEST).unwrap();
        ContractModel::build(
            manifest.contract(),
            &manifest,
            manifest.documentation(),
            manifest.examples(),
            &GeneratorSettings::default(),
        )
        .unwrap()
    }

    fn parse(sample: &Option<String>) -> Value {
        serde_json::from_str(sample.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn test_contract_summary_and_assemblies() {
        let model = model();
        assert_eq!(model.summary, "Order management");
        assert_eq!(model.documented_assemblies, vec!["Shop".to_string()]);
        assert!(model.contract_descriptor().is_some());
    }

    #[test]
    fn test_get_operation_parameters() {
        let model = model();
        let op = model.operation("GetOrder").unwrap();
        assert_eq!(op.method, HttpMethod::Get);
        assert_eq!(op.summary, "Reads an order");
        assert_eq!(op.description, "Reads an order");
        assert_eq!(op.authorization, AuthorizationKind::BEARER);

        let places: Vec<_> = op.parameters.iter().map(|p| (p.name.as_str(), p.place)).collect();
        assert_eq!(
            places,
            vec![
                ("X-Tenant", ParamPlace::Header),
                ("id", ParamPlace::Path),
                ("expand", ParamPlace::Query),
            ]
        );
        assert!(op.parameters[0].type_descriptor.is_none());
        assert_eq!(op.parameters[0].summary.as_deref(), Some("Tenant id"));
        // Path parameters are required even when declared optional.
        assert!(op.parameters[1].is_required);
        assert!(op.parameters[2].is_required);
        assert_eq!(op.parameters[2].summary.as_deref(), Some("Include lines"));
        assert!(op.request_sample.is_none());
    }

    #[test]
    fn test_success_and_error_responses() {
        let model = model();
        let op = model.operation("GetOrder").unwrap();
        assert_eq!(op.success_response.code, 200);
        assert_eq!(op.success_response.description, "The order");
        assert_eq!(
            parse(&op.response_sample),
            json!({ "id": 123, "Total": 123.4567 })
        );

        let codes: Vec<_> = op
            .error_responses
            .iter()
            .map(|r| (r.code, r.description.as_str()))
            .collect();
        assert_eq!(
            codes,
            vec![(400, "Invalid id"), (404, "Not found"), (500, "Server error")]
        );
        assert_eq!(
            serde_json::from_str::<Value>(op.error_responses[0].example.as_deref().unwrap())
                .unwrap(),
            json!({ "Message": "boom" })
        );
        assert_eq!(parse(&op.error_sample), json!({ "Message": "boom" }));
    }

    #[test]
    fn test_synthesized_get_template() {
        let model = model();
        let op = model.operation("Search").unwrap();
        assert_eq!(op.uri_template, "Search?text={text}&limit={limit}");
        assert!(op.parameters.iter().all(|p| p.place == ParamPlace::Query));
        assert_eq!(op.authorization, AuthorizationKind::BASIC);
        assert_eq!(op.success_response.description, "Successful operation");
        assert_eq!(parse(&op.response_sample), json!([{ "id": 123, "Total": 123.4567 }]));
    }

    #[test]
    fn test_disabled_fault_removes_inherited_code() {
        let model = model();
        let op = model.operation("Save").unwrap();
        assert_eq!(op.method, HttpMethod::Put);
        let codes: Vec<_> = op.error_responses.iter().map(|r| r.code).collect();
        assert_eq!(codes, vec![400]);
        assert!(op.output.is_none());
        assert!(op.response_sample.is_none());
        assert_eq!(
            parse(&op.request_sample),
            json!({ "id": 123, "Total": 123.4567 })
        );
    }

    #[test]
    fn test_wrapped_request_and_custom_response() {
        let model = model();
        let op = model.operation("Merge").unwrap();
        assert_eq!(op.method, HttpMethod::Post);
        assert_eq!(op.uri_template, "Merge");
        assert_eq!(op.body_parameters().count(), 2);
        assert_eq!(
            parse(&op.request_sample),
            json!({
                "left": { "id": 123, "Total": 123.4567 },
                "right": { "id": 123, "Total": 123.4567 }
            })
        );
        assert_eq!(parse(&op.response_sample), json!({ "id": 42 }));
    }

    #[test]
    fn test_shared_cache_is_reused() {
        let manifest = ContractManifest::from_yaml_str(MANIFEST).unwrap();
        let cache = Arc::new(DescriptorCache::new());
        let settings = GeneratorSettings::default();
        let first = ContractModel::build_with_cache(
            manifest.contract(),
            &manifest,
            manifest.documentation(),
            manifest.examples(),
            &settings,
            Arc::clone(&cache),
        )
        .unwrap();
        let entries = cache.len();
        let second = ContractModel::build_with_cache(
            manifest.contract(),
            &manifest,
            manifest.documentation(),
            manifest.examples(),
            &settings,
            Arc::clone(&cache),
        )
        .unwrap();
        assert_eq!(cache.len(), entries);
        assert!(Arc::ptr_eq(first.cache(), second.cache()));
    }

    fn samples(model: &ContractModel) -> Vec<(String, Option<String>, Option<String>, Option<String>)> {
        model
            .operations
            .iter()
            .map(|op| {
                (
                    op.name.clone(),
                    op.request_sample.clone(),
                    op.response_sample.clone(),
                    op.error_sample.clone(),
                )
            })
            .collect()
    }

    #[test]
    fn test_concurrent_builds_share_one_cache() {
        let manifest = ContractManifest::from_yaml_str(MANIFEST).unwrap();
        let settings = GeneratorSettings::default();
        let reference = model();
        let cache = Arc::new(DescriptorCache::new());

        let models: Vec<ContractModel> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let manifest = &manifest;
                    let settings = &settings;
                    scope.spawn(move || {
                        (0..10)
                            .map(|_| {
                                ContractModel::build_with_cache(
                                    manifest.contract(),
                                    manifest,
                                    manifest.documentation(),
                                    manifest.examples(),
                                    settings,
                                    Arc::clone(&cache),
                                )
                                .unwrap()
                            })
                            .last()
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.len(), reference.cache().len());
        let order = cache.get(&TypeName::new("Shop.Order")).unwrap();
        assert!(order.is_complete());
        for built in &models {
            assert_eq!(samples(built), samples(&reference));
            let output = built
                .operation("GetOrder")
                .and_then(|op| op.output.as_ref())
                .and_then(|output| output.descriptor())
                .unwrap();
            assert!(Arc::ptr_eq(&output, &order));
        }

        // A later build finds everything cached.
        let entries = cache.len();
        ContractModel::build_with_cache(
            manifest.contract(),
            &manifest,
            manifest.documentation(),
            manifest.examples(),
            &settings,
            Arc::clone(&cache),
        )
        .unwrap();
        assert_eq!(cache.len(), entries);
    }
}
