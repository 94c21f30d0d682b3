//! Contract manifests.
//!
//! A manifest is a YAML or JSON file that carries everything reflection would
//! otherwise provide: the contract and its operations, the declared types,
//! inline documentation and canned examples.
//!
//! ```yaml
//! contract:
//!   name: Shop
//!   type: Shop.IShopService
//!   assembly: Shop.Contracts
//!   authorization: [bearer]
//! operations:
//!   - name: GetOrder
//!     get: { uri_template: "orders/{id}" }
//!     parameters:
//!       - { name: id, type: System.Int32 }
//!     returns: Shop.Order
//! types:
//!   - name: Shop.Order
//!     assembly: Shop.Contracts
//!     members:
//!       - { name: Id, type: System.Int32, wire_name: id }
//! ```

use super::{
    ApiInfo, AuthorizationKind, BodyStyle, ContractDescription, EnumVariant, ExampleKind,
    FaultDeclaration, GetBinding, HeaderDeclaration, InvokeBinding, MemberAnnotations, MemberInfo,
    OperationContract, ParameterContract, TypeDef, TypeKind, TypeMetadataProvider, TypeName,
};
use crate::doc_comments::{InMemoryDocumentation, RawMemberDoc};
use crate::error::{Error, Result};
use crate::samples::ExampleRegistry;
use indexmap::IndexMap;
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct RawManifest {
    contract: RawContract,
    #[serde(default)]
    operations: Vec<RawOperation>,
    #[serde(default)]
    types: Vec<RawType>,
    #[serde(default)]
    documentation: IndexMap<String, Vec<RawMemberDoc>>,
    #[serde(default)]
    examples: Vec<RawExample>,
}

#[derive(Debug, Deserialize)]
struct RawContract {
    name: String,
    #[serde(rename = "type")]
    contract_type: TypeName,
    #[serde(default)]
    assembly: Option<String>,
    #[serde(default)]
    api: Option<ApiInfo>,
    #[serde(default)]
    authorization: Option<Vec<String>>,
    #[serde(default)]
    faults: Vec<FaultDeclaration>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBinding {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    uri_template: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOperation {
    name: String,
    #[serde(default)]
    get: Option<RawBinding>,
    #[serde(default)]
    invoke: Option<RawBinding>,
    #[serde(default)]
    body_style: BodyStyle,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Vec<RawParameter>,
    #[serde(default)]
    returns: Option<TypeName>,
    #[serde(default)]
    returns_example: Option<ExampleKind>,
    #[serde(default)]
    headers: Vec<HeaderDeclaration>,
    #[serde(default)]
    authorization: Option<Vec<String>>,
    #[serde(default)]
    faults: Vec<FaultDeclaration>,
    #[serde(default)]
    fault_contract: Option<TypeName>,
}

#[derive(Debug, Deserialize)]
struct RawParameter {
    name: String,
    #[serde(rename = "type")]
    type_name: TypeName,
    #[serde(default)]
    required: Option<bool>,
    #[serde(default)]
    example: Option<ExampleKind>,
}

#[derive(Debug, Deserialize)]
struct RawType {
    name: TypeName,
    #[serde(default)]
    assembly: Option<String>,
    #[serde(default)]
    contract_name: Option<String>,
    #[serde(default)]
    base: Option<TypeName>,
    #[serde(default)]
    interfaces: Vec<TypeName>,
    #[serde(default)]
    interface: bool,
    #[serde(default)]
    faults: Vec<FaultDeclaration>,
    #[serde(default)]
    members: Vec<RawMember>,
    #[serde(default, rename = "enum")]
    enumeration: Option<RawEnum>,
    #[serde(default)]
    sequence_of: Option<TypeName>,
    #[serde(default)]
    dictionary: Option<RawDictionary>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    name: String,
    #[serde(rename = "type")]
    type_name: TypeName,
    #[serde(default = "default_true")]
    data_member: bool,
    #[serde(default)]
    ignore: bool,
    #[serde(default)]
    wire_name: Option<String>,
    #[serde(default)]
    required: Option<bool>,
    /// Declaring type when the member is redeclared from a base or interface
    #[serde(default)]
    declared_by: Option<TypeName>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawEnum {
    #[serde(default)]
    flags: bool,
    #[serde(default)]
    variants: Vec<RawVariant>,
}

#[derive(Debug, Deserialize)]
struct RawVariant {
    name: String,
    value: i64,
}

#[derive(Debug, Deserialize)]
struct RawDictionary {
    key: TypeName,
    value: TypeName,
}

#[derive(Debug, Deserialize)]
struct RawExample {
    kind: ExampleKind,
    #[serde(rename = "type")]
    type_name: TypeName,
    value: serde_json::Value,
}

/// A parsed contract manifest.
#[derive(Debug, Clone)]
pub struct ContractManifest {
    contract: ContractDescription,
    types: IndexMap<TypeName, TypeDef>,
    documentation: InMemoryDocumentation,
    examples: ExampleRegistry,
}

impl ContractManifest {
    /// Reads a manifest file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        info!("Loading contract manifest {}", path.display());
        let content = fs::read_to_string(path)?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let raw = if is_json {
            serde_json::from_str(&content).map_err(|e| parse_error(path, e))?
        } else {
            serde_yaml::from_str(&content).map_err(|e| parse_error(path, e))?
        };
        Self::from_raw(raw, path)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let source = Path::new("<yaml>");
        let raw = serde_yaml::from_str(content).map_err(|e| parse_error(source, e))?;
        Self::from_raw(raw, source)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let source = Path::new("<json>");
        let raw = serde_json::from_str(content).map_err(|e| parse_error(source, e))?;
        Self::from_raw(raw, source)
    }

    pub fn contract(&self) -> &ContractDescription {
        &self.contract
    }

    /// Documentation declared inline in the manifest.
    pub fn documentation(&self) -> &InMemoryDocumentation {
        &self.documentation
    }

    pub fn examples(&self) -> &ExampleRegistry {
        &self.examples
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    fn from_raw(raw: RawManifest, source: &Path) -> Result<Self> {
        let mut types = IndexMap::new();
        for raw_type in raw.types {
            let def = type_def(raw_type, source)?;
            if types.contains_key(&def.name) {
                return Err(parse_error(source, format!("type {} declared twice", def.name)));
            }
            types.insert(def.name.clone(), def);
        }

        let contract_type = raw.contract.contract_type.clone();
        match types.get_mut(&contract_type) {
            Some(def) => {
                def.faults.extend(raw.contract.faults.iter().cloned());
                if def.assembly.is_none() {
                    def.assembly = raw.contract.assembly.clone();
                }
            }
            None => {
                let mut def = TypeDef::object(contract_type.clone(), Vec::new());
                def.is_interface = true;
                def.assembly = raw.contract.assembly.clone();
                def.faults = raw.contract.faults.clone();
                types.insert(contract_type.clone(), def);
            }
        }

        let operations = raw
            .operations
            .into_iter()
            .map(|op| operation(op, source))
            .collect::<Result<Vec<_>>>()?;

        let contract = ContractDescription {
            name: raw.contract.name,
            contract_type,
            api_info: raw.contract.api,
            authorization: authorization(raw.contract.authorization.as_deref(), source)?,
            operations,
        };

        let mut documentation = InMemoryDocumentation::new();
        for (assembly, members) in raw.documentation {
            documentation.insert(assembly, members);
        }

        let mut examples = ExampleRegistry::new();
        for example in raw.examples {
            let text = serde_json::to_string_pretty(&example.value)?;
            examples.register(example.kind, &example.type_name, text)?;
        }

        debug!(
            "Manifest for {} has {} operations, {} types, {} examples",
            contract.name,
            contract.operations.len(),
            types.len(),
            examples.len()
        );

        Ok(Self {
            contract,
            types,
            documentation,
            examples,
        })
    }
}

impl TypeMetadataProvider for ContractManifest {
    fn lookup(&self, name: &TypeName) -> Option<&TypeDef> {
        self.types.get(name)
    }
}

fn parse_error(source: &Path, message: impl ToString) -> Error {
    Error::Parse {
        file: PathBuf::from(source),
        message: message.to_string(),
    }
}

fn authorization(names: Option<&[String]>, source: &Path) -> Result<Option<AuthorizationKind>> {
    match names {
        None => Ok(None),
        Some(names) => AuthorizationKind::from_names(names)
            .map(Some)
            .ok_or_else(|| parse_error(source, format!("unknown authorization in {:?}", names))),
    }
}

fn operation(raw: RawOperation, source: &Path) -> Result<OperationContract> {
    let parameters = raw
        .parameters
        .into_iter()
        .map(|p| ParameterContract {
            name: p.name,
            type_name: p.type_name,
            required: p.required,
            example_kind: p.example,
        })
        .collect();

    Ok(OperationContract {
        invoke: raw.invoke.map(|b| InvokeBinding {
            method: b.method,
            uri_template: b.uri_template,
        }),
        get: raw.get.map(|b| GetBinding {
            uri_template: b.uri_template,
        }),
        body_style: raw.body_style,
        description: raw.description,
        parameters,
        return_type: raw.returns.unwrap_or_default(),
        return_example_kind: raw.returns_example,
        headers: raw.headers,
        authorization: authorization(raw.authorization.as_deref(), source)?,
        faults: raw.faults,
        fault_contract: raw.fault_contract,
        name: raw.name,
    })
}

fn type_def(raw: RawType, source: &Path) -> Result<TypeDef> {
    let declared_shapes = [
        raw.enumeration.is_some(),
        raw.sequence_of.is_some(),
        raw.dictionary.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if declared_shapes > 1 || (declared_shapes == 1 && !raw.members.is_empty()) {
        return Err(parse_error(
            source,
            format!("type {} declares more than one shape", raw.name),
        ));
    }

    let kind = if let Some(enumeration) = raw.enumeration {
        TypeKind::Enum {
            variants: enumeration
                .variants
                .into_iter()
                .map(|v| EnumVariant {
                    name: v.name,
                    value: v.value,
                })
                .collect(),
            flags: enumeration.flags,
        }
    } else if let Some(element) = raw.sequence_of {
        TypeKind::Sequence { element }
    } else if let Some(dictionary) = raw.dictionary {
        TypeKind::Dictionary {
            key: dictionary.key,
            value: dictionary.value,
        }
    } else {
        let owner = &raw.name;
        TypeKind::Object {
            members: raw
                .members
                .into_iter()
                .map(|m| MemberInfo {
                    name: m.name,
                    declared_type: m.type_name,
                    declaring_type: m.declared_by.unwrap_or_else(|| owner.clone()),
                    annotations: MemberAnnotations {
                        serialize: m.data_member,
                        ignore: m.ignore,
                        wire_name: m.wire_name,
                        required: m.required,
                    },
                })
                .collect(),
        }
    };

    Ok(TypeDef {
        name: raw.name,
        assembly: raw.assembly,
        kind,
        contract_name: raw.contract_name,
        base: raw.base,
        interfaces: raw.interfaces,
        is_interface: raw.interface,
        faults: raw.faults,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::TypeShape;
    use crate::samples::ExampleSource;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::Builder;

    const MANIFEST: &str = r#"
contract:
  name: Shop
  type: Shop.IShop
  assembly: Shop.Contracts
  authorization: [basic]
  api: { license_title: MIT, license_url: "https://opensource.org/licenses/MIT" }
  faults:
    - { code: 500, description: Server error, detail_type: Shop.Fault }
operations:
  - name: GetOrder
    get: { uri_template: "orders/{id}" }
    parameters:
      - { name: id, type: System.Int32 }
    returns: Shop.Order
    authorization: [bearer]
  - name: Save
    invoke: { method: PUT }
    parameters:
      - { name: order, type: Shop.Order, example: custom }
types:
  - name: Shop.Order
    assembly: Shop.Contracts
    base: Shop.Entity
    members:
      - { name: Total, type: System.Decimal }
      - { name: Note, type: System.String, data_member: false }
  - name: Shop.Entity
    assembly: Shop.Contracts
    members:
      - { name: Id, type: System.Int32, wire_name: id }
  - name: Shop.Fault
    members:
      - { name: Message, type: System.String }
  - name: Shop.Lines
    sequence_of: Shop.Order
  - name: Shop.Status
    enum:
      flags: true
      variants:
        - { name: None, value: 0 }
        - { name: Paid, value: 1 }
documentation:
  Shop.Contracts:
    - { name: "T:Shop.Order", summary: An order }
examples:
  - kind: output
    type: Shop.Order
    value: { id: 1, Total: 9.5 }
"#;

    #[test]
    fn test_parse_contract_and_operations() {
        let manifest = ContractManifest::from_yaml_str(MANIFEST).unwrap();
        let contract = manifest.contract();
        assert_eq!(contract.name, "Shop");
        assert_eq!(contract.authorization, Some(AuthorizationKind::BASIC));
        assert_eq!(
            contract.api_info.as_ref().and_then(|a| a.license_title.as_deref()),
            Some("MIT")
        );

        let get = &contract.operations[0];
        assert_eq!(
            get.get.as_ref().and_then(|g| g.uri_template.as_deref()),
            Some("orders/{id}")
        );
        assert_eq!(get.return_type.as_str(), "Shop.Order");
        assert_eq!(get.authorization, Some(AuthorizationKind::BEARER));

        let save = &contract.operations[1];
        assert!(save.return_type.is_void());
        assert_eq!(save.parameters[0].example_kind, Some(ExampleKind::Custom));
        assert_eq!(
            save.invoke.as_ref().and_then(|i| i.method.as_deref()),
            Some("PUT")
        );
    }

    #[test]
    fn test_contract_type_carries_faults() {
        let manifest = ContractManifest::from_yaml_str(MANIFEST).unwrap();
        let def = manifest.lookup(&TypeName::new("Shop.IShop")).unwrap();
        assert!(def.is_interface);
        assert_eq!(def.assembly.as_deref(), Some("Shop.Contracts"));
        assert_eq!(def.faults.len(), 1);
        assert_eq!(def.faults[0].example_kind, ExampleKind::Output);
    }

    #[test]
    fn test_members_and_shapes() {
        let manifest = ContractManifest::from_yaml_str(MANIFEST).unwrap();
        let members = manifest.members(&TypeName::new("Shop.Order"));
        let names: Vec<_> = members.iter().map(|m| m.wire_name()).collect();
        assert_eq!(names, vec!["Total", "Note", "id"]);
        assert!(!members[1].annotations.is_serialized());
        assert_eq!(members[2].declaring_type.as_str(), "Shop.Entity");

        assert!(matches!(
            manifest.shape(&TypeName::new("Shop.Lines")),
            TypeShape::Sequence(element) if element.as_str() == "Shop.Order"
        ));
        assert!(matches!(
            manifest.shape(&TypeName::new("Shop.Status")),
            TypeShape::Enum(def) if matches!(def.kind, TypeKind::Enum { flags: true, .. })
        ));
    }

    #[test]
    fn test_examples_are_registered() {
        let manifest = ContractManifest::from_yaml_str(MANIFEST).unwrap();
        let text = manifest
            .examples()
            .example(ExampleKind::Output, &TypeName::new("Shop.Order"))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["id"], 1);
        assert!(manifest
            .examples()
            .example(ExampleKind::Input, &TypeName::new("Shop.Order"))
            .is_none());
    }

    #[test]
    fn test_unknown_authorization_is_rejected() {
        let err = ContractManifest::from_yaml_str(
            "contract: { name: X, type: X.I, authorization: [digest] }",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_conflicting_shapes_are_rejected() {
        let err = ContractManifest::from_yaml_str(
            r#"
contract: { name: X, type: X.I }
types:
  - name: X.Bad
    sequence_of: System.Int32
    dictionary: { key: System.String, value: System.Int32 }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("X.Bad"));
    }

    #[test]
    fn test_from_path_reads_json() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"contract": {{"name": "X", "type": "X.I"}}, "operations": [{{"name": "Ping"}}]}}"#
        )
        .unwrap();

        let manifest = ContractManifest::from_path(file.path()).unwrap();
        assert_eq!(manifest.contract().operations.len(), 1);
        assert_eq!(manifest.type_count(), 1);
    }

    #[test]
    fn test_malformed_yaml_reports_parse_error() {
        let err = ContractManifest::from_yaml_str("contract: [").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
