//! Type descriptors for program inputs, decoded from engine ABI JSON.
//!
//! The engine emits each input type as a node `{ "type": tag, "components": ... }`:
//!
//! ```json
//! { "name": "p", "public": true, "type": "struct",
//!   "components": { "name": "Point", "generics": [],
//!                   "members": [ { "name": "x", "type": "field" },
//!                                { "name": "y", "type": "u32" } ] } }
//! ```
//!
//! Arrays carry their element inline in `components` next to `size`
//! (`{"size": 2, "type": "field"}`), tuples list `components.elements`.
//! Decoding is strict: an unknown tag aborts the whole ABI with
//! [`SchemaError::UnrecognizedType`].

use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Map, Value};

use crate::SchemaError;

// ──────────────────────────────────────────────
// Descriptor model
// ──────────────────────────────────────────────

/// Bit width of an unsigned integer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UintWidth {
    U8,
    U16,
    U32,
    U64,
}

impl UintWidth {
    pub fn bits(self) -> u32 {
        match self {
            UintWidth::U8 => 8,
            UintWidth::U16 => 16,
            UintWidth::U32 => 32,
            UintWidth::U64 => 64,
        }
    }

    /// Longest hex literal (after `0x`) that fits in this width.
    pub fn max_hex_digits(self) -> u32 {
        self.bits() / 4
    }

    pub fn tag(self) -> &'static str {
        match self {
            UintWidth::U8 => "u8",
            UintWidth::U16 => "u16",
            UintWidth::U32 => "u32",
            UintWidth::U64 => "u64",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "u8" => Some(UintWidth::U8),
            "u16" => Some(UintWidth::U16),
            "u32" => Some(UintWidth::U32),
            "u64" => Some(UintWidth::U64),
            _ => None,
        }
    }
}

/// The declared type of one program input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// Unbounded non-negative integer, carried as decimal text.
    Field,
    Uint(UintWidth),
    Bool,
    Tuple(Vec<TypeDescriptor>),
    Array {
        element: Box<TypeDescriptor>,
        size: usize,
    },
    Struct {
        name: Option<String>,
        members: Vec<StructMember>,
    },
}

/// A named member of a struct descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructMember {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl TypeDescriptor {
    /// The ABI tag of this node (`field`, `u32`, `array`, ...).
    pub fn tag(&self) -> &'static str {
        match self {
            TypeDescriptor::Field => "field",
            TypeDescriptor::Uint(width) => width.tag(),
            TypeDescriptor::Bool => "bool",
            TypeDescriptor::Tuple(_) => "tuple",
            TypeDescriptor::Array { .. } => "array",
            TypeDescriptor::Struct { .. } => "struct",
        }
    }

    /// True for leaves whose values must stay text end to end.
    ///
    /// Field elements run up to ~254 bits; parsing them into a machine
    /// number would corrupt large literals.
    pub fn is_numeric_text(&self) -> bool {
        matches!(self, TypeDescriptor::Field | TypeDescriptor::Uint(_))
    }

    /// Decode a descriptor node from ABI JSON.
    pub fn from_json(node: &Value) -> Result<Self, SchemaError> {
        decode(node, "$")
    }

    /// Encode back into the ABI node shape.
    pub fn to_json(&self) -> Value {
        Value::Object(encode(self))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Field | TypeDescriptor::Uint(_) | TypeDescriptor::Bool => {
                f.write_str(self.tag())
            }
            TypeDescriptor::Array { element, size } => write!(f, "{}[{}]", element, size),
            TypeDescriptor::Tuple(elements) => {
                f.write_str("(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                if elements.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            TypeDescriptor::Struct {
                name: Some(name), ..
            } => f.write_str(name),
            TypeDescriptor::Struct {
                name: None,
                members,
            } => {
                f.write_str("struct {")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {}: {}", member.name, member.ty)?;
                }
                f.write_str(" }")
            }
        }
    }
}

// ──────────────────────────────────────────────
// ABI
// ──────────────────────────────────────────────

/// One top-level program input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiInput {
    pub name: String,
    pub public: bool,
    pub ty: TypeDescriptor,
}

/// The ordered, named, typed inputs of a compiled program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Abi {
    pub inputs: Vec<AbiInput>,
    pub output: Option<TypeDescriptor>,
}

impl Abi {
    /// Decode an ABI document. Input order is preserved.
    pub fn from_json(abi: &Value) -> Result<Self, SchemaError> {
        let obj = abi.as_object().ok_or_else(|| malformed("$", "expected an object"))?;
        let raw_inputs = obj
            .get("inputs")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("$", "missing array field 'inputs'"))?;

        let mut seen = BTreeSet::new();
        let mut inputs = Vec::with_capacity(raw_inputs.len());
        for (i, raw) in raw_inputs.iter().enumerate() {
            let path = format!("$.inputs[{}]", i);
            let node = raw
                .as_object()
                .ok_or_else(|| malformed(&path, "expected an object"))?;
            let name = get_str(node, "name", &path)?.to_string();
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateInput { name });
            }
            let public = node.get("public").and_then(Value::as_bool).unwrap_or(false);
            let ty = decode_node(node, &path)?;
            inputs.push(AbiInput { name, public, ty });
        }

        let output = match obj.get("output") {
            None | Some(Value::Null) => None,
            Some(node) => Some(decode(node, "$.output")?),
        };

        Ok(Abi { inputs, output })
    }

    pub fn to_json(&self) -> Value {
        let inputs: Vec<Value> = self
            .inputs
            .iter()
            .map(|input| {
                let mut node = Map::new();
                node.insert("name".to_string(), Value::String(input.name.clone()));
                node.insert("public".to_string(), Value::Bool(input.public));
                node.extend(encode(&input.ty));
                Value::Object(node)
            })
            .collect();
        let mut obj = Map::new();
        obj.insert("inputs".to_string(), Value::Array(inputs));
        if let Some(output) = &self.output {
            obj.insert("output".to_string(), output.to_json());
        }
        Value::Object(obj)
    }

    pub fn input(&self, name: &str) -> Option<&AbiInput> {
        self.inputs.iter().find(|input| input.name == name)
    }
}

// ──────────────────────────────────────────────
// Decoding
// ──────────────────────────────────────────────

fn decode(node: &Value, path: &str) -> Result<TypeDescriptor, SchemaError> {
    let obj = node
        .as_object()
        .ok_or_else(|| malformed(path, "expected an object"))?;
    decode_node(obj, path)
}

fn decode_node(obj: &Map<String, Value>, path: &str) -> Result<TypeDescriptor, SchemaError> {
    let tag = get_str(obj, "type", path)?;
    if let Some(width) = UintWidth::from_tag(tag) {
        return Ok(TypeDescriptor::Uint(width));
    }
    match tag {
        "field" => Ok(TypeDescriptor::Field),
        "bool" => Ok(TypeDescriptor::Bool),
        "array" => {
            let cpath = format!("{}.components", path);
            let components = get_components(obj, path)?;
            let size = components
                .get("size")
                .and_then(Value::as_u64)
                .ok_or_else(|| malformed(&cpath, "missing integer field 'size'"))?;
            let size = usize::try_from(size)
                .map_err(|_| malformed(&cpath, "array size does not fit in memory"))?;
            // The element descriptor lives in the components object itself.
            let element = decode_node(components, &cpath)?;
            Ok(TypeDescriptor::Array {
                element: Box::new(element),
                size,
            })
        }
        "struct" => {
            let cpath = format!("{}.components", path);
            let components = get_components(obj, path)?;
            let name = components
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty())
                .map(str::to_string);
            let raw_members = components
                .get("members")
                .and_then(Value::as_array)
                .ok_or_else(|| malformed(&cpath, "missing array field 'members'"))?;

            let mut seen = BTreeSet::new();
            let mut members = Vec::with_capacity(raw_members.len());
            for (i, raw) in raw_members.iter().enumerate() {
                let mpath = format!("{}.members[{}]", cpath, i);
                let member = raw
                    .as_object()
                    .ok_or_else(|| malformed(&mpath, "expected an object"))?;
                let member_name = get_str(member, "name", &mpath)?.to_string();
                if !seen.insert(member_name.clone()) {
                    return Err(SchemaError::DuplicateMember {
                        path: cpath,
                        member: member_name,
                    });
                }
                let ty = decode_node(member, &mpath)?;
                members.push(StructMember {
                    name: member_name,
                    ty,
                });
            }
            Ok(TypeDescriptor::Struct { name, members })
        }
        "tuple" => {
            let cpath = format!("{}.components", path);
            let components = get_components(obj, path)?;
            let raw_elements = components
                .get("elements")
                .and_then(Value::as_array)
                .ok_or_else(|| malformed(&cpath, "missing array field 'elements'"))?;
            let elements = raw_elements
                .iter()
                .enumerate()
                .map(|(i, e)| decode(e, &format!("{}.elements[{}]", cpath, i)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TypeDescriptor::Tuple(elements))
        }
        other => Err(SchemaError::UnrecognizedType {
            tag: other.to_string(),
        }),
    }
}

fn get_str<'a>(obj: &'a Map<String, Value>, field: &str, path: &str) -> Result<&'a str, SchemaError> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(path, &format!("missing string field '{}'", field)))
}

fn get_components<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
) -> Result<&'a Map<String, Value>, SchemaError> {
    obj.get("components")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(path, "missing object field 'components'"))
}

fn malformed(path: &str, message: &str) -> SchemaError {
    SchemaError::MalformedAbi {
        path: path.to_string(),
        message: message.to_string(),
    }
}

// ──────────────────────────────────────────────
// Encoding
// ──────────────────────────────────────────────

fn encode(ty: &TypeDescriptor) -> Map<String, Value> {
    let mut node = Map::new();
    node.insert("type".to_string(), Value::String(ty.tag().to_string()));
    match ty {
        TypeDescriptor::Field | TypeDescriptor::Uint(_) | TypeDescriptor::Bool => {}
        TypeDescriptor::Array { element, size } => {
            let mut components = Map::new();
            components.insert("size".to_string(), Value::from(*size));
            components.extend(encode(element));
            node.insert("components".to_string(), Value::Object(components));
        }
        TypeDescriptor::Struct { name, members } => {
            let members: Vec<Value> = members
                .iter()
                .map(|member| {
                    let mut m = Map::new();
                    m.insert("name".to_string(), Value::String(member.name.clone()));
                    m.extend(encode(&member.ty));
                    Value::Object(m)
                })
                .collect();
            let mut components = Map::new();
            components.insert(
                "name".to_string(),
                Value::String(name.clone().unwrap_or_default()),
            );
            components.insert("generics".to_string(), Value::Array(vec![]));
            components.insert("members".to_string(), Value::Array(members));
            node.insert("components".to_string(), Value::Object(components));
        }
        TypeDescriptor::Tuple(elements) => {
            let elements: Vec<Value> = elements.iter().map(TypeDescriptor::to_json).collect();
            let mut components = Map::new();
            components.insert("elements".to_string(), Value::Array(elements));
            node.insert("components".to_string(), Value::Object(components));
        }
    }
    node
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_leaf_tags() {
        assert_eq!(
            TypeDescriptor::from_json(&json!({"type": "field"})).unwrap(),
            TypeDescriptor::Field
        );
        assert_eq!(
            TypeDescriptor::from_json(&json!({"type": "bool"})).unwrap(),
            TypeDescriptor::Bool
        );
        assert_eq!(
            TypeDescriptor::from_json(&json!({"type": "u16"})).unwrap(),
            TypeDescriptor::Uint(UintWidth::U16)
        );
    }

    #[test]
    fn decode_nested_array() {
        let node = json!({
            "type": "array",
            "components": {
                "size": 2,
                "type": "array",
                "components": { "size": 3, "type": "u8" }
            }
        });
        let ty = TypeDescriptor::from_json(&node).unwrap();
        assert_eq!(
            ty,
            TypeDescriptor::Array {
                element: Box::new(TypeDescriptor::Array {
                    element: Box::new(TypeDescriptor::Uint(UintWidth::U8)),
                    size: 3,
                }),
                size: 2,
            }
        );
        assert_eq!(ty.to_string(), "u8[3][2]");
    }

    #[test]
    fn decode_struct_and_tuple() {
        let node = json!({
            "type": "struct",
            "components": {
                "name": "Point",
                "generics": [],
                "members": [
                    { "name": "x", "type": "field" },
                    { "name": "flags", "type": "tuple",
                      "components": { "elements": [ { "type": "bool" }, { "type": "u64" } ] } }
                ]
            }
        });
        let ty = TypeDescriptor::from_json(&node).unwrap();
        match &ty {
            TypeDescriptor::Struct { name, members } => {
                assert_eq!(name.as_deref(), Some("Point"));
                assert_eq!(members.len(), 2);
                assert_eq!(members[0].name, "x");
                assert_eq!(
                    members[1].ty,
                    TypeDescriptor::Tuple(vec![
                        TypeDescriptor::Bool,
                        TypeDescriptor::Uint(UintWidth::U64)
                    ])
                );
            }
            other => panic!("expected struct, got {:?}", other),
        }
        assert_eq!(ty.to_string(), "Point");
        assert_eq!(TypeDescriptor::from_json(&ty.to_json()).unwrap(), ty);
    }

    #[test]
    fn anonymous_struct_display_lists_members() {
        let ty = TypeDescriptor::Struct {
            name: None,
            members: vec![
                StructMember {
                    name: "a".to_string(),
                    ty: TypeDescriptor::Field,
                },
                StructMember {
                    name: "b".to_string(),
                    ty: TypeDescriptor::Tuple(vec![TypeDescriptor::Bool]),
                },
            ],
        };
        assert_eq!(ty.to_string(), "struct { a: field, b: (bool,) }");
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = TypeDescriptor::from_json(&json!({"type": "u128"})).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnrecognizedType {
                tag: "u128".to_string()
            }
        );
    }

    #[test]
    fn unknown_tag_deep_inside_aborts_whole_abi() {
        let abi = json!({
            "inputs": [
                { "name": "a", "public": true, "type": "field" },
                { "name": "b", "public": false, "type": "array",
                  "components": { "size": 2, "type": "string" } }
            ]
        });
        let err = Abi::from_json(&abi).unwrap_err();
        assert!(matches!(err, SchemaError::UnrecognizedType { ref tag } if tag == "string"));
    }

    #[test]
    fn array_without_size_is_malformed() {
        let err = TypeDescriptor::from_json(&json!({
            "type": "array",
            "components": { "type": "field" }
        }))
        .unwrap_err();
        match err {
            SchemaError::MalformedAbi { path, message } => {
                assert_eq!(path, "$.components");
                assert!(message.contains("size"), "got: {}", message);
            }
            other => panic!("expected MalformedAbi, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_struct_member_rejected() {
        let err = TypeDescriptor::from_json(&json!({
            "type": "struct",
            "components": {
                "name": "S",
                "members": [ { "name": "x", "type": "field" }, { "name": "x", "type": "bool" } ]
            }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateMember { ref member, .. } if member == "x"));
    }

    #[test]
    fn abi_preserves_input_order() {
        let abi = Abi::from_json(&json!({
            "inputs": [
                { "name": "z", "public": true, "type": "bool" },
                { "name": "a", "public": false, "type": "field" },
                { "name": "m", "type": "u32" }
            ],
            "output": { "type": "field" }
        }))
        .unwrap();
        let names: Vec<&str> = abi.inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
        assert!(abi.inputs[0].public);
        assert!(!abi.inputs[2].public);
        assert_eq!(abi.output, Some(TypeDescriptor::Field));
        assert_eq!(abi.input("m").map(|i| &i.ty), Some(&TypeDescriptor::Uint(UintWidth::U32)));
    }

    #[test]
    fn abi_rejects_duplicate_input_names() {
        let err = Abi::from_json(&json!({
            "inputs": [
                { "name": "a", "type": "bool" },
                { "name": "a", "type": "field" }
            ]
        }))
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateInput {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn numeric_text_leaves() {
        assert!(TypeDescriptor::Field.is_numeric_text());
        assert!(TypeDescriptor::Uint(UintWidth::U8).is_numeric_text());
        assert!(!TypeDescriptor::Bool.is_numeric_text());
        assert!(!TypeDescriptor::Tuple(vec![TypeDescriptor::Field]).is_numeric_text());
    }
}
