//! Type descriptor builder.
//!
//! Reflects a type into a documentation node ([`TypeDescriptor`]): display
//! name, JSON classification, flags, properties and declared faults.
//!
//! Descriptors are memoized per type name in a [`DescriptorCache`] shared by
//! every build that uses it. A descriptor is inserted as a shell before its
//! properties are computed, so a self-referencing type finds its own shell
//! instead of recursing forever; the shell is completed once the recursion
//! unwinds. Graph edges between descriptors are [`DescriptorRef`] handles that
//! do not own their target; the cache owns every descriptor.

use crate::contract::{
    type_names, FaultDeclaration, ScalarKind, TypeKind, TypeMetadataProvider, TypeName,
    TypeShape,
};
use crate::doc_comments::{property_key, type_key, DocCommentStore};
use crate::operation::ParameterDescriptor;
use crate::responses::ResponseDescriptor;
use crate::samples::ExampleSource;
use dashmap::DashMap;
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

/// Placeholder string used in samples
pub const SAMPLE_STRING: &str = "string";
/// Placeholder date used in samples
pub const SAMPLE_DATE: &str = "2000-01-01T00:00:00Z";
/// Placeholder identifier used in samples
pub const SAMPLE_GUID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

/// JSON primitive classification of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    String,
    Number,
    Boolean,
    Date,
    Object,
}

impl JsonKind {
    fn of_scalar(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::String | ScalarKind::Char | ScalarKind::Guid | ScalarKind::Uri => {
                JsonKind::String
            }
            ScalarKind::DateTime | ScalarKind::DateTimeOffset | ScalarKind::TimeSpan => {
                JsonKind::Date
            }
            ScalarKind::Boolean => JsonKind::Boolean,
            ScalarKind::Byte
            | ScalarKind::SByte
            | ScalarKind::Int16
            | ScalarKind::UInt16
            | ScalarKind::Int32
            | ScalarKind::UInt32
            | ScalarKind::Int64
            | ScalarKind::UInt64
            | ScalarKind::Single
            | ScalarKind::Double
            | ScalarKind::Decimal => JsonKind::Number,
            ScalarKind::Object => JsonKind::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonKind::String => "string",
            JsonKind::Number => "number",
            JsonKind::Boolean => "boolean",
            JsonKind::Date => "date",
            JsonKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// Fixed sample value for a scalar type.
pub fn scalar_constant(kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::String | ScalarKind::Char | ScalarKind::Uri => Value::from(SAMPLE_STRING),
        ScalarKind::Int32 | ScalarKind::Int16 | ScalarKind::UInt16 => Value::from(123),
        ScalarKind::Byte | ScalarKind::SByte => Value::from(123),
        ScalarKind::UInt32 | ScalarKind::Int64 | ScalarKind::UInt64 => Value::from(123456),
        ScalarKind::Single | ScalarKind::Double | ScalarKind::Decimal => Value::from(123.4567),
        ScalarKind::Boolean => Value::Bool(true),
        ScalarKind::DateTime | ScalarKind::DateTimeOffset => Value::from(SAMPLE_DATE),
        ScalarKind::TimeSpan => Value::from("00:00:00"),
        ScalarKind::Guid => Value::from(SAMPLE_GUID),
        ScalarKind::Object => Value::Null,
    }
}

/// Non-owning handle to a cached descriptor.
#[derive(Clone)]
pub struct DescriptorRef(Weak<TypeDescriptor>);

impl DescriptorRef {
    pub fn new(descriptor: &Arc<TypeDescriptor>) -> Self {
        Self(Arc::downgrade(descriptor))
    }

    /// The target, as long as its cache is alive.
    pub fn get(&self) -> Option<Arc<TypeDescriptor>> {
        self.0.upgrade()
    }
}

impl fmt::Debug for DescriptorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(target) => write!(f, "DescriptorRef({})", target.type_name),
            None => f.write_str("DescriptorRef(<dropped>)"),
        }
    }
}

/// One property of a described object.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    /// Reflected member name
    pub member_name: String,
    pub declaring_type: TypeName,
    pub declared_type: TypeName,
    /// Name used on the wire
    pub wire_name: String,
    pub summary: String,
    pub is_required: bool,
    /// Takes part in wire serialization
    pub is_data_member: bool,
    /// Explicitly excluded from JSON
    pub is_ignored: bool,
    pub type_descriptor: Option<DescriptorRef>,
}

impl PropertyDescriptor {
    pub fn descriptor(&self) -> Option<Arc<TypeDescriptor>> {
        self.type_descriptor.as_ref().and_then(DescriptorRef::get)
    }
}

/// Contents filled in once the recursion for a type unwinds
#[derive(Debug, Clone)]
pub enum DescriptorBody {
    /// Property list; dictionaries carry exactly `key` and `value`
    Properties(Vec<PropertyDescriptor>),
    /// Collections and nullables point at the unwrapped type
    Element(DescriptorRef),
}

#[derive(Debug)]
struct Completion {
    body: DescriptorBody,
    error_responses: Vec<ResponseDescriptor>,
}

/// Documentation node for one type.
#[derive(Debug)]
pub struct TypeDescriptor {
    /// The type as requested
    pub type_name: TypeName,
    /// The type after unwrapping one collection or nullable level
    pub real_type: TypeName,
    pub name: String,
    pub summary: String,
    pub json_kind: JsonKind,
    /// Data-contract name override
    pub contract_name: Option<String>,
    pub is_collection: bool,
    pub is_nullable: bool,
    pub is_dictionary: bool,
    pub is_system: bool,
    pub is_enum: bool,
    pub is_required: bool,
    /// Scalar placeholder used in samples
    pub constant: Value,
    completion: OnceLock<Completion>,
}

impl TypeDescriptor {
    /// False while the descriptor is a shell waiting for its properties.
    pub fn is_complete(&self) -> bool {
        self.completion.get().is_some()
    }

    pub fn body(&self) -> Option<&DescriptorBody> {
        self.completion.get().map(|c| &c.body)
    }

    /// Own property list; empty for collections, nullables and shells.
    pub fn properties(&self) -> &[PropertyDescriptor] {
        match self.body() {
            Some(DescriptorBody::Properties(properties)) => properties,
            _ => &[],
        }
    }

    /// Unwrapped descriptor of a collection or nullable.
    pub fn element(&self) -> Option<Arc<TypeDescriptor>> {
        match self.body() {
            Some(DescriptorBody::Element(element)) => element.get(),
            _ => None,
        }
    }

    /// Faults declared on the type.
    pub fn error_responses(&self) -> &[ResponseDescriptor] {
        self.completion
            .get()
            .map(|c| c.error_responses.as_slice())
            .unwrap_or(&[])
    }

    /// Human readable name such as `Array of object (Shop.Order[])`.
    pub fn full_name(&self) -> String {
        if self.is_dictionary {
            return "Dictionary".to_string();
        }
        let contract = self
            .contract_name
            .as_deref()
            .unwrap_or_else(|| self.real_type.as_str());
        if self.is_collection {
            format!("Array of {} ({}[])", self.json_kind, contract)
        } else {
            format!("{} ({})", self.json_kind, contract)
        }
    }
}

/// Memo of descriptors keyed by type name, safe to share between builds.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: DashMap<TypeName, Arc<TypeDescriptor>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &TypeName) -> Option<Arc<TypeDescriptor>> {
        self.entries.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Atomically returns the existing entry or inserts the one built by `create`.
    fn get_or_insert_with(
        &self,
        name: &TypeName,
        create: impl FnOnce() -> TypeDescriptor,
    ) -> Arc<TypeDescriptor> {
        let entry = self
            .entries
            .entry(name.clone())
            .or_insert_with(|| Arc::new(create()));
        Arc::clone(entry.value())
    }
}

/// Builds descriptors for one generation pass.
pub struct TypeDescriptorBuilder<'a> {
    cache: &'a DescriptorCache,
    provider: &'a dyn TypeMetadataProvider,
    docs: &'a DocCommentStore,
    examples: &'a dyn ExampleSource,
    /// Types whose completion is in progress in this build
    resolving: HashSet<TypeName>,
}

impl<'a> TypeDescriptorBuilder<'a> {
    pub fn new(
        cache: &'a DescriptorCache,
        provider: &'a dyn TypeMetadataProvider,
        docs: &'a DocCommentStore,
        examples: &'a dyn ExampleSource,
    ) -> Self {
        Self {
            cache,
            provider,
            docs,
            examples,
            resolving: HashSet::new(),
        }
    }

    pub fn docs(&self) -> &'a DocCommentStore {
        self.docs
    }

    pub fn provider(&self) -> &'a dyn TypeMetadataProvider {
        self.provider
    }

    pub fn examples(&self) -> &'a dyn ExampleSource {
        self.examples
    }

    /// Describes a type. `void` has no descriptor.
    pub fn describe(&mut self, name: &TypeName) -> Option<Arc<TypeDescriptor>> {
        if name.is_void() {
            return None;
        }

        let descriptor = self
            .cache
            .get_or_insert_with(name, || self.header(name));

        if descriptor.is_complete() {
            return Some(descriptor);
        }
        if self.resolving.contains(name) {
            debug!("Type {} is being described, returning its shell", name);
            return Some(descriptor);
        }

        self.resolving.insert(name.clone());
        let completion = self.complete(&descriptor);
        self.resolving.remove(name);

        if descriptor.completion.set(completion).is_err() {
            debug!("Type {} was completed concurrently", name);
        }
        Some(descriptor)
    }

    /// Response descriptors for fault declarations, in declaration order.
    pub fn fault_responses(&mut self, faults: &[FaultDeclaration]) -> Vec<ResponseDescriptor> {
        faults
            .iter()
            .map(|fault| {
                let parameter = fault.detail_type.as_ref().map(|detail| {
                    let descriptor = self.describe(detail);
                    ParameterDescriptor::payload(
                        detail.clone(),
                        descriptor.as_ref(),
                        self.docs.default_required(),
                    )
                });
                let example = fault
                    .detail_type
                    .as_ref()
                    .and_then(|detail| self.examples.example(fault.example_kind, detail));

                ResponseDescriptor {
                    code: fault.code,
                    description: fault.description.clone(),
                    example,
                    type_name: fault.detail_type.clone(),
                    example_kind: fault.example_kind,
                    disabled: fault.disabled,
                    parameter,
                }
            })
            .collect()
    }

    /// Header fields of a fresh shell.
    fn header(&self, name: &TypeName) -> TypeDescriptor {
        let shape = self.provider.shape(name);
        let (real_type, is_collection, is_nullable, is_dictionary) = match &shape {
            TypeShape::Dictionary { .. } => (name.clone(), true, false, true),
            TypeShape::Sequence(element) => (element.clone(), true, false, false),
            TypeShape::Nullable(inner) => (inner.clone(), false, true, false),
            _ => (name.clone(), false, false, false),
        };

        let real_shape = if real_type == *name {
            shape
        } else {
            self.provider.shape(&real_type)
        };

        let declared = self.provider.lookup(&real_type);
        let is_system = declared.is_none() && type_names::classify(&real_type).is_some();
        let (json_kind, constant, is_enum) = match &real_shape {
            TypeShape::Scalar(kind) => (JsonKind::of_scalar(*kind), scalar_constant(*kind), false),
            TypeShape::Enum(def) => {
                let first = match &def.kind {
                    TypeKind::Enum { variants, .. } => variants.first().map(|v| v.value),
                    _ => None,
                };
                (JsonKind::Number, first.map(Value::from).unwrap_or(Value::Null), true)
            }
            TypeShape::Unknown => {
                warn!("Type {} is not described by the contract, treating it as an object", real_type);
                (JsonKind::Object, Value::Null, false)
            }
            _ => (JsonKind::Object, Value::Null, false),
        };

        let doc = self.docs.lookup(&type_key(&real_type));
        let display_name = doc
            .map(|d| d.name.trim_start_matches("T:").to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| real_type.to_string());

        debug!("Created descriptor shell for {}", name);
        TypeDescriptor {
            type_name: name.clone(),
            name: display_name,
            summary: doc.map(|d| d.summary.clone()).unwrap_or_default(),
            json_kind,
            contract_name: declared.and_then(|d| d.contract_name.clone()),
            is_collection,
            is_nullable,
            is_dictionary,
            is_system,
            is_enum,
            is_required: doc
                .and_then(|d| d.required)
                .unwrap_or(self.docs.default_required()),
            constant,
            real_type,
            completion: OnceLock::new(),
        }
    }

    fn complete(&mut self, descriptor: &TypeDescriptor) -> Completion {
        let body = if descriptor.is_dictionary {
            self.dictionary_body(&descriptor.type_name)
        } else if descriptor.is_collection || descriptor.is_nullable {
            match self.describe(&descriptor.real_type) {
                Some(element) => DescriptorBody::Element(DescriptorRef::new(&element)),
                None => DescriptorBody::Properties(Vec::new()),
            }
        } else if descriptor.is_system || descriptor.is_enum {
            DescriptorBody::Properties(Vec::new())
        } else {
            DescriptorBody::Properties(self.properties(&descriptor.real_type))
        };

        let faults = self
            .provider
            .lookup(&descriptor.type_name)
            .map(|def| def.faults.clone())
            .unwrap_or_default();
        let error_responses = self.fault_responses(&faults);

        Completion {
            body,
            error_responses,
        }
    }

    fn dictionary_body(&mut self, name: &TypeName) -> DescriptorBody {
        let (key, value) = match self.provider.shape(name) {
            TypeShape::Dictionary { key, value } => (key, value),
            _ => return DescriptorBody::Properties(Vec::new()),
        };

        let entries = [("key", key), ("value", value)]
            .into_iter()
            .map(|(wire_name, entry_type)| {
                let descriptor = self.describe(&entry_type);
                PropertyDescriptor {
                    member_name: wire_name.to_string(),
                    declaring_type: name.clone(),
                    wire_name: wire_name.to_string(),
                    summary: descriptor
                        .as_ref()
                        .map(|d| d.summary.clone())
                        .unwrap_or_default(),
                    is_required: true,
                    is_data_member: true,
                    is_ignored: false,
                    type_descriptor: descriptor.as_ref().map(DescriptorRef::new),
                    declared_type: entry_type,
                }
            })
            .collect();
        DescriptorBody::Properties(entries)
    }

    fn properties(&mut self, owner: &TypeName) -> Vec<PropertyDescriptor> {
        let members = self.provider.members(owner);
        debug!("Describing {} members of {}", members.len(), owner);

        members
            .into_iter()
            .map(|member| {
                let doc = self
                    .docs
                    .lookup(&property_key(&member.declaring_type, &member.name));
                let is_required = member
                    .annotations
                    .required
                    .or_else(|| doc.and_then(|d| d.required))
                    .unwrap_or(self.docs.default_required());
                let descriptor = self.describe(&member.declared_type);

                PropertyDescriptor {
                    wire_name: member.wire_name().to_string(),
                    summary: doc.map(|d| d.summary.clone()).unwrap_or_default(),
                    is_required,
                    is_data_member: member.annotations.is_serialized(),
                    is_ignored: member.annotations.ignore,
                    type_descriptor: descriptor.as_ref().map(DescriptorRef::new),
                    member_name: member.name,
                    declaring_type: member.declaring_type,
                    declared_type: member.declared_type,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::manifest::ContractManifest;
    use crate::doc_comments::DocCommentStore;
    use crate::samples::NoExamples;

    const MANIFEST: &str = r#"
contract:
  name: Shop
  type: Shop.IShop
  assembly: Shop
operations: []
types:
  - name: Shop.Node
    assembly: Shop
    members:
      - { name: Value, type: System.Int32 }
      - { name: Next, type: Shop.Node }
  - name: Shop.Order
    assembly: Shop
    contract_name: order
    faults:
      - { code: 409, description: Conflict, detail_type: Shop.Fault }
    members:
      - { name: Id, type: System.Int32, wire_name: id, required: true }
      - { name: Lines, type: "System.Collections.Generic.List`1[Shop.Line]" }
      - { name: Secret, type: System.String, ignore: true }
      - { name: Tags, type: "System.Collections.Generic.Dictionary`2[System.String,System.Int32]" }
  - name: Shop.Line
    assembly: Shop
    members:
      - { name: Sku, type: System.String }
  - name: Shop.Fault
    assembly: Shop
    members:
      - { name: Message, type: System.String }
  - name: Shop.Status
    assembly: Shop
    enum:
      variants:
        - { name: Open, value: 1 }
        - { name: Closed, value: 2 }
documentation:
  Shop:
    - name: T:Shop.Order
      summary: An order
      required: "true"
    - name: P:Shop.Line.Sku
      summary: Stock keeping unit
      required: "true"
"#;

    fn manifest() -> ContractManifest {
        ContractManifest::from_yaml_str(MANIFEST).unwrap()
    }

    fn docs(manifest: &ContractManifest) -> DocCommentStore {
        DocCommentStore::load(&["Shop".to_string()], manifest.documentation(), false).unwrap()
    }

    #[test]
    fn test_describe_is_memoized() {
        let manifest = manifest();
        let docs = docs(&manifest);
        let cache = DescriptorCache::new();
        let mut builder = TypeDescriptorBuilder::new(&cache, &manifest, &docs, &NoExamples);

        let name = TypeName::new("Shop.Order");
        let first = builder.describe(&name).unwrap();
        let second = builder.describe(&name).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_memo_is_shared_between_builds() {
        let manifest = manifest();
        let docs = docs(&manifest);
        let cache = DescriptorCache::new();
        let name = TypeName::new("Shop.Line");

        let first = TypeDescriptorBuilder::new(&cache, &manifest, &docs, &NoExamples)
            .describe(&name)
            .unwrap();
        let second = TypeDescriptorBuilder::new(&cache, &manifest, &docs, &NoExamples)
            .describe(&name)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_void_has_no_descriptor() {
        let manifest = manifest();
        let docs = docs(&manifest);
        let cache = DescriptorCache::new();
        let mut builder = TypeDescriptorBuilder::new(&cache, &manifest, &docs, &NoExamples);
        assert!(builder.describe(&TypeName::void()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_self_reference_completes() {
        let manifest = manifest();
        let docs = docs(&manifest);
        let cache = DescriptorCache::new();
        let mut builder = TypeDescriptorBuilder::new(&cache, &manifest, &docs, &NoExamples);

        let node = builder.describe(&TypeName::new("Shop.Node")).unwrap();
        assert!(node.is_complete());
        let next = node
            .properties()
            .iter()
            .find(|p| p.member_name == "Next")
            .unwrap();
        let target = next.descriptor().unwrap();
        assert!(Arc::ptr_eq(&node, &target));
    }

    #[test]
    fn test_object_properties() {
        let manifest = manifest();
        let docs = docs(&manifest);
        let cache = DescriptorCache::new();
        let mut builder = TypeDescriptorBuilder::new(&cache, &manifest, &docs, &NoExamples);

        let order = builder.describe(&TypeName::new("Shop.Order")).unwrap();
        assert_eq!(order.summary, "An order");
        assert!(order.is_required);
        assert_eq!(order.contract_name.as_deref(), Some("order"));
        assert_eq!(order.json_kind, JsonKind::Object);
        assert_eq!(order.full_name(), "object (order)");

        let props = order.properties();
        assert_eq!(props.len(), 4);
        assert_eq!(props[0].wire_name, "id");
        assert!(props[0].is_required);
        assert!(props[0].is_data_member);
        assert!(!props[2].is_data_member);
        assert!(props[2].is_ignored);

        let lines = props[1].descriptor().unwrap();
        assert!(lines.is_collection);
        assert_eq!(lines.real_type.as_str(), "Shop.Line");
        let line = lines.element().unwrap();
        assert_eq!(line.properties()[0].summary, "Stock keeping unit");
        assert!(line.properties()[0].is_required);
    }

    #[test]
    fn test_dictionary_has_key_and_value() {
        let manifest = manifest();
        let docs = docs(&manifest);
        let cache = DescriptorCache::new();
        let mut builder = TypeDescriptorBuilder::new(&cache, &manifest, &docs, &NoExamples);

        let dict = builder
            .describe(&TypeName::new(
                "System.Collections.Generic.Dictionary`2[System.String,System.Int32]",
            ))
            .unwrap();
        assert!(dict.is_dictionary);
        assert!(dict.is_collection);
        assert_eq!(dict.full_name(), "Dictionary");
        let names: Vec<_> = dict.properties().iter().map(|p| p.wire_name.as_str()).collect();
        assert_eq!(names, vec!["key", "value"]);
        assert!(dict.properties().iter().all(|p| p.is_required));
    }

    #[test]
    fn test_scalar_and_enum_classification() {
        let manifest = manifest();
        let docs = docs(&manifest);
        let cache = DescriptorCache::new();
        let mut builder = TypeDescriptorBuilder::new(&cache, &manifest, &docs, &NoExamples);

        let int = builder.describe(&TypeName::new("System.Int32")).unwrap();
        assert!(int.is_system);
        assert_eq!(int.json_kind, JsonKind::Number);
        assert!(int.properties().is_empty());

        let date = builder
            .describe(&TypeName::new("System.Nullable`1[System.DateTime]"))
            .unwrap();
        assert!(date.is_nullable);
        assert_eq!(date.json_kind, JsonKind::Date);

        let status = builder.describe(&TypeName::new("Shop.Status")).unwrap();
        assert!(status.is_enum);
        assert_eq!(status.json_kind, JsonKind::Number);
        assert_eq!(status.constant, Value::from(1));
    }

    #[test]
    fn test_unknown_type_is_plain_object() {
        let manifest = manifest();
        let docs = docs(&manifest);
        let cache = DescriptorCache::new();
        let mut builder = TypeDescriptorBuilder::new(&cache, &manifest, &docs, &NoExamples);

        let unknown = builder.describe(&TypeName::new("Vendor.Blob")).unwrap();
        assert_eq!(unknown.json_kind, JsonKind::Object);
        assert!(!unknown.is_system);
        assert!(unknown.properties().is_empty());
    }

    #[test]
    fn test_type_faults_become_responses() {
        let manifest = manifest();
        let docs = docs(&manifest);
        let cache = DescriptorCache::new();
        let mut builder = TypeDescriptorBuilder::new(&cache, &manifest, &docs, &NoExamples);

        let order = builder.describe(&TypeName::new("Shop.Order")).unwrap();
        let responses = order.error_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].code, 409);
        assert_eq!(responses[0].description, "Conflict");
        assert!(responses[0].example.is_none());
        let payload = responses[0].parameter.as_ref().unwrap();
        assert_eq!(payload.type_name.as_str(), "Shop.Fault");
    }
}
