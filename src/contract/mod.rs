//! Contract metadata model.
//!
//! This module describes an RPC contract the way reflection would see it:
//! the contract itself, its operations with their binding declarations, and
//! the type definitions reachable from operation signatures. The rest of the
//! crate never inspects a concrete metadata source directly; it goes through
//! the [`TypeMetadataProvider`] trait.
//!
//! Well-known framework types (scalars, arrays, generic lists, nullables and
//! dictionaries) are recognised from their names by [`type_names`], so a
//! provider only has to declare the contract's own types.

pub mod manifest;
pub mod type_names;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use type_names::WellKnown;

/// Fully qualified type name, e.g. `Shop.Contracts.Order` or
/// ``System.Collections.Generic.List`1[Shop.Contracts.Order]``.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub const VOID: &'static str = "System.Void";
    pub const STRING: &'static str = "System.String";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn void() -> Self {
        Self::new(Self::VOID)
    }

    pub fn string() -> Self {
        Self::new(Self::STRING)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_void(&self) -> bool {
        self.0 == Self::VOID || self.0 == "void" || self.0.is_empty()
    }
}

impl Default for TypeName {
    fn default() -> Self {
        Self::void()
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Scalar types with a fixed JSON and schema representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Boolean,
    Byte,
    SByte,
    Char,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    DateTime,
    DateTimeOffset,
    TimeSpan,
    Guid,
    Uri,
    String,
    Object,
}

bitflags! {
    /// Authentication schemes an operation requires.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AuthorizationKind: u8 {
        /// HTTP basic authentication.
        const BASIC  = 0b0000_0001;
        /// HTTP bearer token (JWT).
        const BEARER = 0b0000_0010;
    }
}

impl AuthorizationKind {
    /// No authentication required.
    pub const NONE: Self = Self::empty();

    /// Parses a list of scheme names (`basic`, `bearer`, `none`).
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        let mut kind = Self::NONE;
        for name in names {
            match name.as_ref().to_ascii_lowercase().as_str() {
                "basic" => kind |= Self::BASIC,
                "bearer" => kind |= Self::BEARER,
                "none" => {}
                _ => return None,
            }
        }
        Some(kind)
    }
}

/// Selects which canned example is used for a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleKind {
    #[default]
    Default,
    Input,
    Output,
    Custom,
    #[serde(rename = "failure_400")]
    FailureHttp400,
    #[serde(rename = "failure_401")]
    FailureHttp401,
    #[serde(rename = "failure_403")]
    FailureHttp403,
    #[serde(rename = "failure_409")]
    FailureHttp409,
    #[serde(rename = "failure_500")]
    FailureHttp500,
}

impl ExampleKind {
    pub fn code(self) -> u16 {
        match self {
            ExampleKind::Default => 0,
            ExampleKind::Input => 1,
            ExampleKind::Output => 2,
            ExampleKind::Custom => 100,
            ExampleKind::FailureHttp400 => 101,
            ExampleKind::FailureHttp401 => 102,
            ExampleKind::FailureHttp403 => 103,
            ExampleKind::FailureHttp409 => 104,
            ExampleKind::FailureHttp500 => 105,
        }
    }
}

impl fmt::Display for ExampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExampleKind::Default => "Default",
            ExampleKind::Input => "Input",
            ExampleKind::Output => "Output",
            ExampleKind::Custom => "Custom",
            ExampleKind::FailureHttp400 => "FailureHttp400",
            ExampleKind::FailureHttp401 => "FailureHttp401",
            ExampleKind::FailureHttp403 => "FailureHttp403",
            ExampleKind::FailureHttp409 => "FailureHttp409",
            ExampleKind::FailureHttp500 => "FailureHttp500",
        };
        f.write_str(name)
    }
}

/// Request/response wrapping declared on an operation binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyStyle {
    #[default]
    Bare,
    Wrapped,
    WrappedRequest,
    WrappedResponse,
}

impl BodyStyle {
    pub fn is_request_wrapped(self) -> bool {
        matches!(self, BodyStyle::Wrapped | BodyStyle::WrappedRequest)
    }

    pub fn is_response_wrapped(self) -> bool {
        matches!(self, BodyStyle::Wrapped | BodyStyle::WrappedResponse)
    }
}

/// A fault response declared on a type or an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultDeclaration {
    /// HTTP status code
    pub code: u16,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Payload type carried by the fault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<TypeName>,
    /// Which example to show for the payload
    #[serde(default = "output_example_kind")]
    pub example_kind: ExampleKind,
    /// Suppresses an inherited declaration with the same code
    #[serde(default)]
    pub disabled: bool,
}

fn output_example_kind() -> ExampleKind {
    ExampleKind::Output
}

/// Serialization annotations on a member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberAnnotations {
    /// Member is marked as a data member
    pub serialize: bool,
    /// Member is excluded from JSON serialization
    pub ignore: bool,
    /// Explicit wire-name declaration. Its presence alone makes the member serializable.
    pub wire_name: Option<String>,
    /// Explicit required override
    pub required: Option<bool>,
}

impl MemberAnnotations {
    pub fn is_serialized(&self) -> bool {
        (self.serialize && !self.ignore) || self.wire_name.is_some()
    }
}

/// A property of an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: String,
    pub declared_type: TypeName,
    /// Type that declares the member. Differs from the owner for inherited members.
    pub declaring_type: TypeName,
    pub annotations: MemberAnnotations,
}

impl MemberInfo {
    /// Name used on the wire: explicit declaration, else the member name.
    pub fn wire_name(&self) -> &str {
        match self.annotations.wire_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

/// Shape of a declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Object { members: Vec<MemberInfo> },
    Enum { variants: Vec<EnumVariant>, flags: bool },
    /// A declared collection type, e.g. a class deriving from a generic list
    Sequence { element: TypeName },
    /// A declared dictionary type
    Dictionary { key: TypeName, value: TypeName },
}

/// A type declared by the contract's metadata source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: TypeName,
    /// Assembly (documentation unit) the type lives in
    pub assembly: Option<String>,
    pub kind: TypeKind,
    /// Data-contract name override
    pub contract_name: Option<String>,
    pub base: Option<TypeName>,
    pub interfaces: Vec<TypeName>,
    pub is_interface: bool,
    /// Faults attached to the type itself
    pub faults: Vec<FaultDeclaration>,
}

impl TypeDef {
    pub fn object(name: impl Into<TypeName>, members: Vec<MemberInfo>) -> Self {
        Self {
            name: name.into(),
            assembly: None,
            kind: TypeKind::Object { members },
            contract_name: None,
            base: None,
            interfaces: Vec::new(),
            is_interface: false,
            faults: Vec::new(),
        }
    }
}

/// Classification of a type name against the provider.
#[derive(Debug, Clone)]
pub enum TypeShape<'a> {
    Void,
    Scalar(ScalarKind),
    Nullable(TypeName),
    Sequence(TypeName),
    Dictionary { key: TypeName, value: TypeName },
    Enum(&'a TypeDef),
    Object(&'a TypeDef),
    /// Name known to neither the provider nor the well-known table
    Unknown,
}

/// Source of type metadata for a contract.
pub trait TypeMetadataProvider {
    /// Looks up a type declared by the contract.
    fn lookup(&self, name: &TypeName) -> Option<&TypeDef>;

    /// Classifies a type name. Declared types take precedence over well-known names.
    fn shape(&self, name: &TypeName) -> TypeShape<'_> {
        if name.is_void() {
            return TypeShape::Void;
        }
        if let Some(def) = self.lookup(name) {
            return match &def.kind {
                TypeKind::Object { .. } => TypeShape::Object(def),
                TypeKind::Enum { .. } => TypeShape::Enum(def),
                TypeKind::Sequence { element } => TypeShape::Sequence(element.clone()),
                TypeKind::Dictionary { key, value } => TypeShape::Dictionary {
                    key: key.clone(),
                    value: value.clone(),
                },
            };
        }
        match type_names::classify(name) {
            Some(WellKnown::Void) => TypeShape::Void,
            Some(WellKnown::Scalar(kind)) => TypeShape::Scalar(kind),
            Some(WellKnown::Nullable(inner)) => TypeShape::Nullable(inner),
            Some(WellKnown::Sequence(element)) => TypeShape::Sequence(element),
            Some(WellKnown::Dictionary { key, value }) => TypeShape::Dictionary { key, value },
            None => TypeShape::Unknown,
        }
    }

    /// Assembly a type belongs to. Framework types have none.
    fn assembly_of(&self, name: &TypeName) -> Option<&str> {
        self.lookup(name).and_then(|def| def.assembly.as_deref())
    }

    /// All members of an object type: its own first, then each base in turn.
    fn members(&self, name: &TypeName) -> Vec<MemberInfo> {
        let mut members = Vec::new();
        let mut current = self.lookup(name);
        let mut seen = std::collections::HashSet::new();
        while let Some(def) = current {
            if !seen.insert(def.name.clone()) {
                break;
            }
            if let TypeKind::Object { members: own } = &def.kind {
                members.extend(own.iter().cloned());
            }
            current = def.base.as_ref().and_then(|base| self.lookup(base));
        }
        members
    }

    /// True when `derived` has `base` somewhere in its base chain.
    fn is_subclass_of(&self, derived: &TypeName, base: &TypeName) -> bool {
        let mut current = self.lookup(derived).and_then(|def| def.base.as_ref());
        let mut depth = 0;
        while let Some(name) = current {
            if name == base {
                return true;
            }
            depth += 1;
            if depth > 64 {
                return false;
            }
            current = self.lookup(name).and_then(|def| def.base.as_ref());
        }
        false
    }

    /// True when `ty` or one of its bases implements `interface`, directly or
    /// through an inherited interface.
    fn implements(&self, ty: &TypeName, interface: &TypeName) -> bool {
        let mut stack = vec![ty.clone()];
        let mut seen = std::collections::HashSet::new();
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(def) = self.lookup(&name) else {
                continue;
            };
            for candidate in &def.interfaces {
                if candidate == interface {
                    return true;
                }
                stack.push(candidate.clone());
            }
            if let Some(base) = &def.base {
                stack.push(base.clone());
            }
        }
        false
    }

    fn is_interface(&self, name: &TypeName) -> bool {
        self.lookup(name).map(|def| def.is_interface).unwrap_or(false)
    }
}

/// API-level information attached to the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub license_title: Option<String>,
    #[serde(default)]
    pub license_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

/// A header the operation expects, declared on the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderDeclaration {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Explicit "invoke" binding: any HTTP method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeBinding {
    pub method: Option<String>,
    pub uri_template: Option<String>,
}

/// Explicit "get" binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetBinding {
    pub uri_template: Option<String>,
}

/// A formal parameter of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterContract {
    pub name: String,
    pub type_name: TypeName,
    /// Explicit required override
    pub required: Option<bool>,
    /// Example kind override for request samples
    pub example_kind: Option<ExampleKind>,
}

/// One operation of a contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationContract {
    pub name: String,
    pub invoke: Option<InvokeBinding>,
    pub get: Option<GetBinding>,
    pub body_style: BodyStyle,
    /// Explicit description declaration
    pub description: Option<String>,
    pub parameters: Vec<ParameterContract>,
    pub return_type: TypeName,
    /// Example kind override for the response sample
    pub return_example_kind: Option<ExampleKind>,
    pub headers: Vec<HeaderDeclaration>,
    pub authorization: Option<AuthorizationKind>,
    /// Fault responses declared on the operation
    pub faults: Vec<FaultDeclaration>,
    /// Plain fault contract detail type, used when no fault declaration names one
    pub fault_contract: Option<TypeName>,
}

impl OperationContract {
    /// Payload type for error samples: first fault declaration's detail type,
    /// else the plain fault contract.
    pub fn fault_type(&self) -> Option<&TypeName> {
        match self.faults.first() {
            Some(fault) => fault.detail_type.as_ref(),
            None => self.fault_contract.as_ref(),
        }
    }
}

/// A whole RPC contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractDescription {
    pub name: String,
    /// Interface type that declares the operations
    pub contract_type: TypeName,
    pub api_info: Option<ApiInfo>,
    pub authorization: Option<AuthorizationKind>,
    pub operations: Vec<OperationContract>,
}
