//! Recognition of well-known framework type names.
//!
//! Type names follow the reflection `ToString` format: generic arguments are
//! listed in square brackets after an arity marker
//! (``System.Nullable`1[System.Int32]``) and arrays carry a `[]` suffix.

use super::{ScalarKind, TypeName};

/// Shape of a framework type recognised from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WellKnown {
    Void,
    Scalar(ScalarKind),
    Nullable(TypeName),
    Sequence(TypeName),
    Dictionary { key: TypeName, value: TypeName },
}

const SCALARS: &[(&str, ScalarKind)] = &[
    ("System.Boolean", ScalarKind::Boolean),
    ("System.Byte", ScalarKind::Byte),
    ("System.SByte", ScalarKind::SByte),
    ("System.Char", ScalarKind::Char),
    ("System.Int16", ScalarKind::Int16),
    ("System.UInt16", ScalarKind::UInt16),
    ("System.Int32", ScalarKind::Int32),
    ("System.UInt32", ScalarKind::UInt32),
    ("System.Int64", ScalarKind::Int64),
    ("System.UInt64", ScalarKind::UInt64),
    ("System.Single", ScalarKind::Single),
    ("System.Double", ScalarKind::Double),
    ("System.Decimal", ScalarKind::Decimal),
    ("System.DateTime", ScalarKind::DateTime),
    ("System.DateTimeOffset", ScalarKind::DateTimeOffset),
    ("System.TimeSpan", ScalarKind::TimeSpan),
    ("System.Guid", ScalarKind::Guid),
    ("System.Uri", ScalarKind::Uri),
    ("System.String", ScalarKind::String),
    ("System.Object", ScalarKind::Object),
];

const SEQUENCES: &[&str] = &[
    "System.Collections.Generic.List`1",
    "System.Collections.Generic.IList`1",
    "System.Collections.Generic.ICollection`1",
    "System.Collections.Generic.IEnumerable`1",
    "System.Collections.Generic.IReadOnlyList`1",
    "System.Collections.Generic.IReadOnlyCollection`1",
    "System.Collections.Generic.HashSet`1",
    "System.Collections.Generic.ISet`1",
    "System.Collections.ObjectModel.Collection`1",
    "System.Collections.ObjectModel.ReadOnlyCollection`1",
];

const DICTIONARIES: &[&str] = &[
    "System.Collections.Generic.Dictionary`2",
    "System.Collections.Generic.IDictionary`2",
    "System.Collections.Generic.IReadOnlyDictionary`2",
    "System.Collections.Generic.SortedDictionary`2",
    "System.Collections.Generic.KeyValuePair`2",
];

const NULLABLE: &str = "System.Nullable`1";

/// Classifies a framework type name. Returns `None` for anything else.
pub fn classify(name: &TypeName) -> Option<WellKnown> {
    let raw = name.as_str().trim();

    if name.is_void() {
        return Some(WellKnown::Void);
    }

    if let Some(element) = raw.strip_suffix("[]") {
        return Some(WellKnown::Sequence(TypeName::new(element)));
    }

    if let Some(kind) = scalar_kind(raw) {
        return Some(WellKnown::Scalar(kind));
    }

    let (base, args) = split_generic(raw)?;
    match args.as_slice() {
        [inner] if base == NULLABLE => Some(WellKnown::Nullable(TypeName::new(*inner))),
        [element] if SEQUENCES.contains(&base) => {
            Some(WellKnown::Sequence(TypeName::new(*element)))
        }
        [key, value] if DICTIONARIES.contains(&base) => Some(WellKnown::Dictionary {
            key: TypeName::new(*key),
            value: TypeName::new(*value),
        }),
        _ => None,
    }
}

/// Maps a scalar type name to its kind.
pub fn scalar_kind(name: &str) -> Option<ScalarKind> {
    SCALARS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, kind)| *kind)
}

/// Splits ``Base`N[A,B]`` into the base name and its top-level arguments.
pub fn split_generic(name: &str) -> Option<(&str, Vec<&str>)> {
    let open = name.find('[')?;
    if !name.ends_with(']') || open == 0 {
        return None;
    }
    let base = &name[..open];
    let inner = &name[open + 1..name.len() - 1];

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (index, ch) in inner.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                args.push(strip_assembly_brackets(&inner[start..index]));
                start = index + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    args.push(strip_assembly_brackets(&inner[start..]));

    if args.iter().any(|arg| arg.is_empty()) {
        return None;
    }
    Some((base, args))
}

/// Argument lists in assembly-qualified form wrap each argument in brackets.
fn strip_assembly_brackets(arg: &str) -> &str {
    let arg = arg.trim();
    match arg.strip_prefix('[').and_then(|a| a.strip_suffix(']')) {
        Some(inner) => inner.trim(),
        None => arg,
    }
}
