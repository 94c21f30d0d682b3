//! Doc-comment store.
//!
//! Free-text documentation is produced per assembly as a list of member
//! records keyed by a stable signature string:
//!
//! - `T:Ns.Type` for types
//! - `M:Ns.Type.Method(Ns.Arg1,Ns.Arg2)` for methods (`M:Ns.Type.Method` without parameters)
//! - `P:Ns.Type.Property` for properties
//!
//! The [`DocCommentStore`] loads the records of every assembly the contract
//! references and answers lookups by exact key, first match in assembly
//! order. An assembly without documentation simply contributes nothing.

use crate::contract::{
    type_names, ContractDescription, ExampleKind, TypeMetadataProvider, TypeName, WellKnown,
};
use crate::error::{Error, Result};
use crate::scanner::ScanResult;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Member record as written in a documentation file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMemberDoc {
    /// Member signature key
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub returns: String,
    /// Raw required flag, parsed as a boolean when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<RawParamDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<RawResponseDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawParamDoc {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponseDoc {
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_kind: Option<ExampleKind>,
    #[serde(default)]
    pub description: String,
}

/// Parsed documentation of one member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDoc {
    pub name: String,
    pub summary: String,
    pub example: String,
    pub returns: String,
    /// `None` when the record does not say
    pub required: Option<bool>,
    pub params: Vec<ParamDoc>,
    pub responses: Vec<ResponseDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamDoc {
    pub name: String,
    pub description: String,
    pub required: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDoc {
    pub code: u16,
    pub example_kind: Option<ExampleKind>,
    pub description: String,
}

impl MemberDoc {
    pub fn from_raw(raw: RawMemberDoc) -> Result<Self> {
        let required = parse_required(raw.required.as_deref())?;
        let params = raw
            .params
            .into_iter()
            .map(|p| {
                Ok(ParamDoc {
                    required: parse_required(p.required.as_deref())?,
                    name: p.name,
                    description: p.description,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let responses = raw
            .responses
            .into_iter()
            .map(|r| ResponseDoc {
                code: r.code,
                example_kind: r.example_kind,
                description: r.description,
            })
            .collect();

        Ok(Self {
            name: raw.name,
            summary: raw.summary.trim().to_string(),
            example: raw.example,
            returns: raw.returns.trim().to_string(),
            required,
            params,
            responses,
        })
    }

    /// Documentation of a method parameter by exact name.
    pub fn param(&self, name: &str) -> Option<&ParamDoc> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Parses a raw required flag. Empty or absent text means "not stated".
pub fn parse_required(raw: Option<&str>) -> Result<Option<bool>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.eq_ignore_ascii_case("true") {
        Ok(Some(true))
    } else if value.eq_ignore_ascii_case("false") {
        Ok(Some(false))
    } else {
        Err(Error::DocumentationParse {
            value: raw.to_string(),
        })
    }
}

/// Key of a type record.
pub fn type_key(name: &TypeName) -> String {
    format!("T:{}", name)
}

/// Key of a property record.
pub fn property_key(declaring_type: &TypeName, property: &str) -> String {
    format!("P:{}.{}", declaring_type, property)
}

/// Key of a method record.
pub fn method_key(declaring_type: &TypeName, method: &str, params: &[TypeName]) -> String {
    if params.is_empty() {
        return format!("M:{}.{}", declaring_type, method);
    }
    let joined = params
        .iter()
        .map(TypeName::as_str)
        .collect::<Vec<_>>()
        .join(",");
    format!("M:{}.{}({})", declaring_type, method, joined)
}

/// Provides the raw documentation records of an assembly.
pub trait DocumentationSource {
    /// Returns `Ok(None)` when the assembly has no documentation.
    fn load(&self, assembly: &str) -> Result<Option<Vec<RawMemberDoc>>>;
}

/// Documentation held in memory, e.g. inline in a contract manifest.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentation {
    assemblies: HashMap<String, Vec<RawMemberDoc>>,
}

impl InMemoryDocumentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, assembly: impl Into<String>, members: Vec<RawMemberDoc>) {
        self.assemblies
            .entry(assembly.into())
            .or_default()
            .extend(members);
    }

    pub fn is_empty(&self) -> bool {
        self.assemblies.is_empty()
    }
}

impl DocumentationSource for InMemoryDocumentation {
    fn load(&self, assembly: &str) -> Result<Option<Vec<RawMemberDoc>>> {
        Ok(self.assemblies.get(assembly).cloned())
    }
}

/// Documentation files found in a directory, one `<assembly>.{json,yaml,yml}` per assembly.
#[derive(Debug, Clone, Default)]
pub struct DirectoryDocumentation {
    files: HashMap<String, PathBuf>,
}

impl DirectoryDocumentation {
    /// Indexes scanned documentation files by file stem.
    pub fn from_scan(scan: &ScanResult) -> Self {
        let mut files = HashMap::new();
        for path in &scan.doc_files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(previous) = files.insert(stem.to_string(), path.clone()) {
                warn!(
                    "Documentation for {} found twice, using {} over {}",
                    stem,
                    path.display(),
                    previous.display()
                );
            }
        }
        debug!("Indexed {} documentation files", files.len());
        Self { files }
    }

    fn read_file(path: &Path) -> Result<Vec<RawMemberDoc>> {
        let content = fs::read_to_string(path)?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| Error::Parse {
            file: path.to_path_buf(),
            message,
        })
    }
}

impl DocumentationSource for DirectoryDocumentation {
    fn load(&self, assembly: &str) -> Result<Option<Vec<RawMemberDoc>>> {
        match self.files.get(assembly) {
            Some(path) => {
                debug!("Loading documentation for {} from {}", assembly, path.display());
                Self::read_file(path).map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Several sources consulted in order; the first one that knows the assembly wins.
#[derive(Default)]
pub struct ChainedDocumentation {
    sources: Vec<Box<dyn DocumentationSource>>,
}

impl ChainedDocumentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl DocumentationSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl DocumentationSource for ChainedDocumentation {
    fn load(&self, assembly: &str) -> Result<Option<Vec<RawMemberDoc>>> {
        for source in &self.sources {
            if let Some(members) = source.load(assembly)? {
                return Ok(Some(members));
            }
        }
        Ok(None)
    }
}

struct AssemblyDocs {
    name: String,
    members: HashMap<String, MemberDoc>,
}

/// Signature-keyed documentation for a set of assemblies.
pub struct DocCommentStore {
    assemblies: Vec<AssemblyDocs>,
    default_required: bool,
}

impl DocCommentStore {
    /// Loads documentation for `assemblies` in the given order.
    pub fn load(
        assemblies: &[String],
        source: &dyn DocumentationSource,
        default_required: bool,
    ) -> Result<Self> {
        let mut loaded = Vec::new();
        for assembly in assemblies {
            if assembly.trim().is_empty() {
                continue;
            }
            let Some(raw_members) = source.load(assembly)? else {
                debug!("No documentation for assembly {}", assembly);
                continue;
            };

            let mut members = HashMap::with_capacity(raw_members.len());
            for raw in raw_members {
                let doc = MemberDoc::from_raw(raw)?;
                if members.contains_key(&doc.name) {
                    debug!("Ignoring repeated documentation for {}", doc.name);
                    continue;
                }
                members.insert(doc.name.clone(), doc);
            }
            debug!("Loaded {} members for assembly {}", members.len(), assembly);
            loaded.push(AssemblyDocs {
                name: assembly.clone(),
                members,
            });
        }

        Ok(Self {
            assemblies: loaded,
            default_required,
        })
    }

    /// A store with no documentation at all.
    pub fn empty(default_required: bool) -> Self {
        Self {
            assemblies: Vec::new(),
            default_required,
        }
    }

    /// First record with this exact key across assemblies, in load order.
    pub fn lookup(&self, key: &str) -> Option<&MemberDoc> {
        self.assemblies
            .iter()
            .find_map(|assembly| assembly.members.get(key))
    }

    pub fn default_required(&self) -> bool {
        self.default_required
    }

    /// Names of the assemblies that actually had documentation.
    pub fn loaded_assemblies(&self) -> Vec<&str> {
        self.assemblies.iter().map(|a| a.name.as_str()).collect()
    }
}

/// Assemblies referenced by a contract, de-duplicated in first-seen order:
/// per operation the parameter types then the fault type, finally the contract type.
pub fn referenced_assemblies(
    contract: &ContractDescription,
    provider: &dyn TypeMetadataProvider,
) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    let mut push = |name: &TypeName| {
        if let Some(assembly) = assembly_of(name, provider) {
            if !result.iter().any(|a| a == assembly) {
                result.push(assembly.to_string());
            }
        }
    };

    for operation in &contract.operations {
        for parameter in &operation.parameters {
            push(&parameter.type_name);
        }
        if let Some(fault) = operation.fault_type() {
            push(fault);
        }
    }
    push(&contract.contract_type);
    result
}

/// Assembly of a type, looking through framework wrappers to the wrapped type.
fn assembly_of<'a>(name: &TypeName, provider: &'a dyn TypeMetadataProvider) -> Option<&'a str> {
    let mut current = name.clone();
    for _ in 0..16 {
        if provider.lookup(&current).is_some() {
            return provider.assembly_of(&current);
        }
        current = match type_names::classify(&current)? {
            WellKnown::Nullable(inner) | WellKnown::Sequence(inner) => inner,
            WellKnown::Dictionary { value, .. } => value,
            WellKnown::Void | WellKnown::Scalar(_) => return None,
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{OperationContract, ParameterContract, TypeDef};
    use crate::scanner::DocFileScanner;
    use std::collections::HashMap as Map;
    use tempfile::TempDir;

    fn raw(name: &str, summary: &str, required: Option<&str>) -> RawMemberDoc {
        RawMemberDoc {
            name: name.to_string(),
            summary: summary.to_string(),
            required: required.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_required_values() {
        assert_eq!(parse_required(None).unwrap(), None);
        assert_eq!(parse_required(Some("")).unwrap(), None);
        assert_eq!(parse_required(Some("  ")).unwrap(), None);
        assert_eq!(parse_required(Some("TRUE")).unwrap(), Some(true));
        assert_eq!(parse_required(Some("False")).unwrap(), Some(false));
    }

    #[test]
    fn test_parse_required_rejects_garbage() {
        let err = parse_required(Some("yes")).unwrap_err();
        assert!(matches!(err, Error::DocumentationParse { ref value } if value == "yes"));
    }

    #[test]
    fn test_key_builders() {
        let ty = TypeName::new("Shop.IOrders");
        assert_eq!(type_key(&ty), "T:Shop.IOrders");
        assert_eq!(property_key(&ty, "Id"), "P:Shop.IOrders.Id");
        assert_eq!(method_key(&ty, "List", &[]), "M:Shop.IOrders.List");
        assert_eq!(
            method_key(
                &ty,
                "Get",
                &[TypeName::new("System.Int32"), TypeName::new("System.String")]
            ),
            "M:Shop.IOrders.Get(System.Int32,System.String)"
        );
    }

    #[test]
    fn test_lookup_first_match_wins() {
        let mut docs = InMemoryDocumentation::new();
        docs.insert("First", vec![raw("T:Shop.Order", "from first", None)]);
        docs.insert("Second", vec![raw("T:Shop.Order", "from second", None)]);

        let store = DocCommentStore::load(
            &["Second".to_string(), "First".to_string()],
            &docs,
            false,
        )
        .unwrap();
        assert_eq!(store.lookup("T:Shop.Order").unwrap().summary, "from second");
        assert!(store.lookup("T:Shop.Missing").is_none());
    }

    #[test]
    fn test_missing_assembly_is_not_an_error() {
        let docs = InMemoryDocumentation::new();
        let store = DocCommentStore::load(&["Nowhere".to_string()], &docs, true).unwrap();
        assert!(store.lookup("T:Anything").is_none());
        assert!(store.default_required());
        assert!(store.loaded_assemblies().is_empty());
    }

    #[test]
    fn test_bad_required_fails_load() {
        let mut docs = InMemoryDocumentation::new();
        docs.insert("Shop", vec![raw("P:Shop.Order.Id", "", Some("sometimes"))]);
        let result = DocCommentStore::load(&["Shop".to_string()], &docs, false);
        assert!(matches!(result, Err(Error::DocumentationParse { .. })));
    }

    #[test]
    fn test_directory_documentation_reads_yaml_and_json() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("Shop.Contracts.yaml"),
            "- name: T:Shop.Order\n  summary: An order\n  required: 'true'\n",
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("Shop.Faults.json"),
            r#"[{"name": "T:Shop.Fault", "summary": "A fault"}]"#,
        )
        .unwrap();

        let scan = DocFileScanner::new(temp_dir.path().to_path_buf())
            .scan()
            .unwrap();
        let docs = DirectoryDocumentation::from_scan(&scan);
        let store = DocCommentStore::load(
            &["Shop.Contracts".to_string(), "Shop.Faults".to_string()],
            &docs,
            false,
        )
        .unwrap();

        let order = store.lookup("T:Shop.Order").unwrap();
        assert_eq!(order.summary, "An order");
        assert_eq!(order.required, Some(true));
        assert_eq!(store.lookup("T:Shop.Fault").unwrap().summary, "A fault");
    }

    #[test]
    fn test_chained_documentation_prefers_earlier_source() {
        let mut inline = InMemoryDocumentation::new();
        inline.insert("Shop", vec![raw("T:Shop.Order", "inline", None)]);
        let mut fallback = InMemoryDocumentation::new();
        fallback.insert("Shop", vec![raw("T:Shop.Order", "fallback", None)]);
        fallback.insert("Other", vec![raw("T:Other.Thing", "other", None)]);

        let chained = ChainedDocumentation::new().with(inline).with(fallback);
        let store =
            DocCommentStore::load(&["Shop".to_string(), "Other".to_string()], &chained, false)
                .unwrap();
        assert_eq!(store.lookup("T:Shop.Order").unwrap().summary, "inline");
        assert_eq!(store.lookup("T:Other.Thing").unwrap().summary, "other");
    }

    struct Types(Map<TypeName, TypeDef>);

    impl TypeMetadataProvider for Types {
        fn lookup(&self, name: &TypeName) -> Option<&TypeDef> {
            self.0.get(name)
        }
    }

    fn def(name: &str, assembly: &str) -> (TypeName, TypeDef) {
        let mut def = TypeDef::object(name, Vec::new());
        def.assembly = Some(assembly.to_string());
        (def.name.clone(), def)
    }

    #[test]
    fn test_referenced_assemblies_order() {
        let types = Types(
            [
                def("Shop.Order", "Shop.Model"),
                def("Shop.Fault", "Shop.Faults"),
                def("Shop.IOrders", "Shop.Contracts"),
            ]
            .into_iter()
            .collect(),
        );
        let contract = ContractDescription {
            name: "Orders".to_string(),
            contract_type: TypeName::new("Shop.IOrders"),
            operations: vec![OperationContract {
                name: "Save".to_string(),
                parameters: vec![
                    ParameterContract {
                        name: "orders".to_string(),
                        type_name: TypeName::new("System.Collections.Generic.List`1[Shop.Order]"),
                        required: None,
                        example_kind: None,
                    },
                    ParameterContract {
                        name: "count".to_string(),
                        type_name: TypeName::new("System.Int32"),
                        required: None,
                        example_kind: None,
                    },
                ],
                fault_contract: Some(TypeName::new("Shop.Fault")),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(
            referenced_assemblies(&contract, &types),
            vec!["Shop.Model", "Shop.Faults", "Shop.Contracts"]
        );
    }
}
