//! JSON sample payloads.
//!
//! Samples come from an [`ExampleSource`] when it has a canned example for the
//! (example kind, type) pair, and are otherwise synthesized from the type
//! descriptor tree: objects filled recursively, scalars with fixed constants,
//! collections as one-element arrays. A type that is already being expanded
//! higher up the tree is cut short with its scalar placeholder (`null` for
//! objects), so self-referencing types still produce a finite sample.

use crate::contract::{ExampleKind, TypeName};
use crate::error::{Error, Result};
use crate::operation::ParameterDescriptor;
use crate::type_descriptor::TypeDescriptor;
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Provides canned JSON examples.
pub trait ExampleSource {
    /// Example JSON text for a type, if one is registered for this kind.
    fn example(&self, kind: ExampleKind, type_name: &TypeName) -> Option<String>;
}

/// An example source that never has anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExamples;

impl ExampleSource for NoExamples {
    fn example(&self, _kind: ExampleKind, _type_name: &TypeName) -> Option<String> {
        None
    }
}

/// In-memory example registry keyed by `{kind}-{type}`.
#[derive(Debug, Clone, Default)]
pub struct ExampleRegistry {
    examples: HashMap<String, String>,
}

impl ExampleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: ExampleKind, type_name: &TypeName) -> String {
        format!("{}-{}", kind, type_name)
    }

    /// Registers raw example text. A second example for the same kind and type is an error.
    pub fn register(
        &mut self,
        kind: ExampleKind,
        type_name: &TypeName,
        json: impl Into<String>,
    ) -> Result<()> {
        let key = Self::key(kind, type_name);
        if self.examples.contains_key(&key) {
            return Err(Error::DuplicateExample { key });
        }
        debug!("Registered example {}", key);
        self.examples.insert(key, json.into());
        Ok(())
    }

    /// Registers a serializable entity as an indented example, leaving out null fields.
    pub fn register_entity<T: Serialize>(
        &mut self,
        kind: ExampleKind,
        type_name: &TypeName,
        entity: &T,
    ) -> Result<()> {
        let value = strip_nulls(serde_json::to_value(entity)?);
        self.register(kind, type_name, serde_json::to_string_pretty(&value)?)
    }

    /// Registers every example of one type.
    pub fn register_all<I>(&mut self, type_name: &TypeName, examples: I) -> Result<()>
    where
        I: IntoIterator<Item = (ExampleKind, String)>,
    {
        for (kind, json) in examples {
            self.register(kind, type_name, json)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

impl ExampleSource for ExampleRegistry {
    fn example(&self, kind: ExampleKind, type_name: &TypeName) -> Option<String> {
        self.examples.get(&Self::key(kind, type_name)).cloned()
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

/// Synthesizes a sample value for a descriptor.
pub fn sample_value(descriptor: &TypeDescriptor) -> Value {
    let mut visiting = Vec::new();
    value_of(descriptor, &mut visiting)
}

fn value_of(descriptor: &TypeDescriptor, visiting: &mut Vec<TypeName>) -> Value {
    if descriptor.is_dictionary {
        return dictionary_value(descriptor, visiting);
    }

    if descriptor.is_collection || descriptor.is_nullable {
        let item = match descriptor.element() {
            Some(element) => value_of(&element, visiting),
            None => descriptor.constant.clone(),
        };
        return if descriptor.is_collection {
            Value::Array(vec![item])
        } else {
            item
        };
    }

    let properties = descriptor.properties();
    if properties.is_empty() {
        return descriptor.constant.clone();
    }
    if visiting.contains(&descriptor.real_type) {
        return descriptor.constant.clone();
    }

    visiting.push(descriptor.real_type.clone());
    let mut object = Map::new();
    for property in properties.iter().filter(|p| p.is_data_member) {
        let value = property
            .descriptor()
            .map(|d| value_of(&d, visiting))
            .unwrap_or(Value::Null);
        object.insert(property.wire_name.clone(), value);
    }
    visiting.pop();
    Value::Object(object)
}

fn dictionary_value(descriptor: &TypeDescriptor, visiting: &mut Vec<TypeName>) -> Value {
    let properties = descriptor.properties();
    let sample_of = |index: usize, visiting: &mut Vec<TypeName>| {
        properties
            .get(index)
            .and_then(|p| p.descriptor())
            .map(|d| value_of(&d, visiting))
            .unwrap_or(Value::Null)
    };

    let key = match sample_of(0, visiting) {
        Value::String(text) => text,
        Value::Null => "key".to_string(),
        other => other.to_string(),
    };
    let value = sample_of(1, visiting);

    let mut object = Map::new();
    object.insert(key, value);
    Value::Object(object)
}

/// Parses provider text, falling back to a synthesized sample of the parameter.
pub fn parameter_value(
    parameter: &ParameterDescriptor,
    kind: ExampleKind,
    examples: &dyn ExampleSource,
) -> Result<Option<Value>> {
    if let Some(text) = examples.example(kind, &parameter.type_name) {
        if !text.trim().is_empty() {
            debug!("Using {} example for {}", kind, parameter.type_name);
            return Ok(Some(serde_json::from_str(&text)?));
        }
    }
    Ok(parameter.descriptor().map(|d| sample_value(&d)))
}

/// Renders named sample values: a single unwrapped value is emitted as is,
/// anything else as an object keyed by name.
pub fn render_payload(values: Vec<(String, Value)>, wrapped: bool) -> Result<Option<String>> {
    if values.is_empty() {
        return Ok(None);
    }
    let value = if values.len() == 1 && !wrapped {
        values.into_iter().map(|(_, v)| v).next().unwrap_or(Value::Null)
    } else {
        Value::Object(values.into_iter().collect())
    };
    Ok(Some(serde_json::to_string_pretty(&value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::manifest::ContractManifest;
    use crate::doc_comments::DocCommentStore;
    use crate::type_descriptor::{DescriptorCache, TypeDescriptorBuilder, SAMPLE_GUID};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const MANIFEST: &str = r#"
contract: { name: Samples, type: Demo.ISamples }
types:
  - name: Demo.Node
    members:
      - { name: Value, type: System.Int32 }
      - { name: Next, type: Demo.Node }
  - name: Demo.Item
    members:
      - { name: Id, type: System.Guid, wire_name: id }
      - { name: Price, type: System.Decimal }
      - { name: Active, type: System.Boolean }
      - { name: Hidden, type: System.String, data_member: false }
      - { name: Tags, type: "System.Collections.Generic.List`1[System.String]" }
      - { name: Counts, type: "System.Collections.Generic.Dictionary`2[System.String,System.Int64]" }
      - { name: Maybe, type: "System.Nullable`1[System.Int32]" }
"#;

    fn describe(manifest: &ContractManifest, cache: &DescriptorCache, name: &str) -> Value {
        let docs = DocCommentStore::empty(false);
        let mut builder = TypeDescriptorBuilder::new(cache, manifest, &docs, &NoExamples);
        let descriptor = builder.describe(&TypeName::new(name)).unwrap();
        sample_value(&descriptor)
    }

    #[test]
    fn test_self_reference_sample_is_finite() {
        let manifest = ContractManifest::from_yaml_str(MANIFEST).unwrap();
        let cache = DescriptorCache::new();
        let sample = describe(&manifest, &cache, "Demo.Node");
        assert_eq!(sample, json!({ "Value": 123, "Next": null }));
    }

    #[test]
    fn test_object_sample_uses_constants() {
        let manifest = ContractManifest::from_yaml_str(MANIFEST).unwrap();
        let cache = DescriptorCache::new();
        let sample = describe(&manifest, &cache, "Demo.Item");
        assert_eq!(
            sample,
            json!({
                "id": SAMPLE_GUID,
                "Price": 123.4567,
                "Active": true,
                "Tags": ["string"],
                "Counts": { "string": 123456 },
                "Maybe": 123
            })
        );
    }

    #[test]
    fn test_collection_of_objects() {
        let manifest = ContractManifest::from_yaml_str(MANIFEST).unwrap();
        let cache = DescriptorCache::new();
        let sample = describe(&manifest, &cache, "Demo.Node[]");
        assert_eq!(sample, json!([{ "Value": 123, "Next": null }]));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut registry = ExampleRegistry::new();
        let ty = TypeName::new("Demo.Item");
        registry.register(ExampleKind::Output, &ty, "{}").unwrap();
        registry.register(ExampleKind::Input, &ty, "{}").unwrap();
        let err = registry.register(ExampleKind::Output, &ty, "[]").unwrap_err();
        assert!(matches!(err, Error::DuplicateExample { ref key } if key == "Output-Demo.Item"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_entity_drops_nulls() {
        #[derive(Serialize)]
        struct Item {
            id: u32,
            note: Option<String>,
        }

        let mut registry = ExampleRegistry::new();
        let ty = TypeName::new("Demo.Item");
        registry
            .register_entity(ExampleKind::Output, &ty, &Item { id: 7, note: None })
            .unwrap();
        let text = registry.example(ExampleKind::Output, &ty).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({ "id": 7 }));
    }

    #[test]
    fn test_render_payload_shapes() {
        assert_eq!(render_payload(Vec::new(), false).unwrap(), None);

        let single = render_payload(vec![("id".to_string(), json!(1))], false)
            .unwrap()
            .unwrap();
        assert_eq!(single, "1");

        let wrapped = render_payload(vec![("id".to_string(), json!(1))], true)
            .unwrap()
            .unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&wrapped).unwrap(),
            json!({ "id": 1 })
        );
    }
}
