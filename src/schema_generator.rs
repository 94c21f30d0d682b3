use crate::contract::{ScalarKind, TypeDef, TypeKind, TypeMetadataProvider, TypeName, TypeShape};
use crate::error::{Error, Result};
use crate::type_descriptor::TypeDescriptor;
use indexmap::{IndexMap, IndexSet};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

/// Prefix of component schema references
pub const REFERENCE_PREFIX: &str = "#/components/schemas/";

static GENERIC_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[0-9]+").expect("valid regex"));
static NON_COMPLIANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9.\-_]").expect("valid regex"));

const NIL_GUID: &str = "00000000-0000-0000-0000-000000000000";

/// Schema generator - projects type descriptors into OpenAPI schemas
///
/// Scalars, enums, arrays and dictionaries are emitted inline. Object types
/// are registered once in a reference table keyed by their sanitized name and
/// referenced from everywhere else, so self-referencing types terminate.
pub struct SchemaGenerator<'a> {
    /// Metadata used for enum values and declaring-type relations
    provider: &'a dyn TypeMetadataProvider,
    /// Component schemas by sanitized key
    references: IndexMap<String, Schema>,
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format for primitive types (e.g., "int32", "int64", "float", "double")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Properties for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required property names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Value schema for dictionaries
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl Schema {
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Default::default()
        }
    }

    fn formatted(schema_type: &str, format: &str) -> Self {
        Self {
            format: Some(format.to_string()),
            ..Self::typed(schema_type)
        }
    }

    fn nullable(mut self, nullable: bool) -> Self {
        self.nullable |= nullable;
        self
    }

    /// Reference to a component schema. Object references keep `type: object`.
    pub fn reference_to(key: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", REFERENCE_PREFIX, key)),
            ..Self::typed("object")
        }
    }

    fn is_object_or_reference(&self) -> bool {
        self.reference.is_some()
            || self
                .schema_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("object"))
    }
}

/// Sanitizes a type name into a component key matching `^[a-zA-Z0-9.\-_]+$`.
pub fn sanitize_key(type_name: &str) -> String {
    let value = type_name.replace('+', ".");
    let value = GENERIC_MARKERS.replace_all(&value, "");
    let value = value.replace(',', "-");
    NON_COMPLIANT.replace_all(&value, "_").into_owned()
}

/// Fixed schema for a scalar type.
pub fn scalar_schema(kind: ScalarKind, nullable: bool) -> Schema {
    let schema = match kind {
        ScalarKind::Boolean => Schema::typed("boolean"),
        ScalarKind::Byte => Schema::formatted("string", "byte"),
        ScalarKind::SByte
        | ScalarKind::Int16
        | ScalarKind::UInt16
        | ScalarKind::Int32
        | ScalarKind::UInt32 => Schema::formatted("integer", "int32"),
        ScalarKind::Int64 | ScalarKind::UInt64 => Schema::formatted("integer", "int64"),
        ScalarKind::Single => Schema::formatted("number", "float"),
        ScalarKind::Double | ScalarKind::Decimal => Schema::formatted("number", "double"),
        ScalarKind::DateTime | ScalarKind::DateTimeOffset => {
            Schema::formatted("string", "date-time")
        }
        ScalarKind::Guid => Schema {
            example: Some(Value::from(NIL_GUID)),
            ..Schema::formatted("string", "uuid")
        },
        ScalarKind::Char => Schema {
            min_length: Some(1),
            max_length: Some(1),
            ..Schema::typed("string")
        },
        ScalarKind::TimeSpan => Schema::typed("string"),
        ScalarKind::Uri | ScalarKind::String => Schema::typed("string").nullable(true),
        ScalarKind::Object => Schema::typed("object").nullable(true),
    };
    schema.nullable(nullable)
}

fn enum_schema(def: &TypeDef, nullable: bool) -> Schema {
    let (variants, flags) = match &def.kind {
        TypeKind::Enum { variants, flags } => (variants.as_slice(), *flags),
        _ => (&[][..], false),
    };
    let title = if flags {
        "Bitmask enumeration"
    } else {
        "Enumeration"
    };
    let mut lines = vec![format!("### {}", title)];
    lines.extend(variants.iter().map(|v| format!("- {}={}", v.name, v.value)));

    Schema {
        description: Some(lines.join("\n")),
        ..Schema::typed("integer")
    }
    .nullable(nullable)
}

impl<'a> SchemaGenerator<'a> {
    pub fn new(provider: &'a dyn TypeMetadataProvider) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            provider,
            references: IndexMap::new(),
        }
    }

    /// Resolves the schema of a type.
    ///
    /// The descriptor supplies summaries, wire names and required flags of
    /// object properties; without one an object schema has no properties.
    pub fn resolve(
        &mut self,
        type_name: &TypeName,
        descriptor: Option<&TypeDescriptor>,
    ) -> Result<Schema> {
        match self.provider.shape(type_name) {
            TypeShape::Void => Ok(Schema::default()),
            TypeShape::Scalar(kind) => Ok(scalar_schema(kind, false)),
            TypeShape::Enum(def) => Ok(enum_schema(def, false)),
            TypeShape::Nullable(inner) => self.resolve_nullable(&inner, descriptor),
            TypeShape::Dictionary { value, .. } => {
                let value_descriptor = descriptor
                    .and_then(|d| d.properties().iter().find(|p| p.wire_name == "value"))
                    .and_then(|p| p.descriptor());
                let additional = self.resolve(&value, value_descriptor.as_deref())?;
                Ok(Schema {
                    additional_properties: Some(Box::new(additional)),
                    ..Schema::typed("object").nullable(true)
                })
            }
            TypeShape::Sequence(element) => {
                if matches!(
                    self.provider.shape(&element),
                    TypeShape::Scalar(ScalarKind::Byte)
                ) {
                    return Ok(Schema::formatted("string", "byte").nullable(true));
                }
                let element_descriptor = descriptor.and_then(|d| d.element());
                let items = self.resolve(&element, element_descriptor.as_deref())?;
                Ok(Schema {
                    items: Some(Box::new(items)),
                    ..Schema::typed("array").nullable(true)
                })
            }
            TypeShape::Object(_) | TypeShape::Unknown => self.resolve_object(type_name, descriptor),
        }
    }

    fn resolve_nullable(
        &mut self,
        inner: &TypeName,
        descriptor: Option<&TypeDescriptor>,
    ) -> Result<Schema> {
        match self.provider.shape(inner) {
            TypeShape::Scalar(kind) => Ok(scalar_schema(kind, true)),
            TypeShape::Enum(def) => Ok(enum_schema(def, true)),
            _ => {
                let element = descriptor.and_then(|d| d.element());
                Ok(self.resolve(inner, element.as_deref())?.nullable(true))
            }
        }
    }

    fn resolve_object(
        &mut self,
        type_name: &TypeName,
        descriptor: Option<&TypeDescriptor>,
    ) -> Result<Schema> {
        let key = sanitize_key(type_name.as_str());
        if self.references.contains_key(&key) {
            debug!("Schema for {} already exists", key);
            return Ok(Schema::reference_to(&key));
        }

        debug!("Generating object schema for: {}", key);
        let checkpoint = self.references.len();
        // Placeholder so that self references resolve to the key.
        self.references
            .insert(key.clone(), Schema::typed("object").nullable(true));

        match self.object_schema(type_name, descriptor) {
            Ok(schema) => {
                self.references.insert(key.clone(), schema);
                Ok(Schema::reference_to(&key))
            }
            Err(e) => {
                // Entries registered below this one may reference it.
                debug!(
                    "Removing partial schema {} and {} nested entries",
                    key,
                    self.references.len().saturating_sub(checkpoint + 1)
                );
                self.references.truncate(checkpoint);
                Err(e)
            }
        }
    }

    fn object_schema(
        &mut self,
        type_name: &TypeName,
        descriptor: Option<&TypeDescriptor>,
    ) -> Result<Schema> {
        let mut properties: IndexMap<String, Schema> = IndexMap::new();
        let mut required: IndexSet<String> = IndexSet::new();
        let mut declared_by: IndexMap<String, TypeName> = IndexMap::new();

        let property_list = descriptor.map(|d| d.properties()).unwrap_or(&[]);
        for property in property_list {
            if property.is_ignored || !property.is_data_member {
                continue;
            }

            let wire_name = &property.wire_name;
            if let Some(existing) = declared_by.get(wire_name) {
                if self.hides(&property.declaring_type, existing) {
                    debug!(
                        "Property {} of {} hides the one of {}",
                        wire_name, property.declaring_type, existing
                    );
                } else if self.hides(existing, &property.declaring_type) {
                    continue;
                } else {
                    return Err(Error::DuplicateProperty {
                        type_name: type_name.to_string(),
                        property: wire_name.clone(),
                    });
                }
            }

            let inner = self.resolve(&property.declared_type, property.descriptor().as_deref())?;
            let mut schema = if inner.is_object_or_reference() {
                Schema {
                    nullable: true,
                    one_of: Some(vec![inner]),
                    ..Default::default()
                }
            } else {
                inner
            };
            if !property.summary.is_empty() {
                schema.title = Some(property.summary.clone());
            }

            properties.insert(wire_name.clone(), schema);
            if property.is_required {
                required.insert(wire_name.clone());
            } else {
                required.shift_remove(wire_name);
            }
            declared_by.insert(wire_name.clone(), property.declaring_type.clone());
        }

        Ok(Schema {
            description: descriptor
                .map(|d| d.summary.clone())
                .filter(|s| !s.is_empty()),
            properties: Some(properties),
            required: (!required.is_empty()).then(|| required.into_iter().collect()),
            ..Schema::typed("object").nullable(true)
        })
    }

    /// True when a member declared on `derived` hides one declared on `base`.
    fn hides(&self, derived: &TypeName, base: &TypeName) -> bool {
        self.provider.is_subclass_of(derived, base)
            || (self.provider.is_interface(base) && self.provider.implements(derived, base))
    }

    /// Get all generated component schemas
    pub fn references(&self) -> &IndexMap<String, Schema> {
        &self.references
    }

    pub fn into_references(self) -> IndexMap<String, Schema> {
        self.references
    }
}
