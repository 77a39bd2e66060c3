//! Type descriptors for the typed value model.
//!
//! A closed recursive sum type; every typed value carries one. Descriptors
//! compare structurally, and `Object` attribute order does not participate in
//! equality (`IndexMap` equality is order-insensitive), while the declared
//! order is kept for deterministic output.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    String,
    Bool,
    /// Arbitrary-precision number; integers and floats share this type.
    Number,
    /// Wildcard: matches any concrete value, carries no static shape.
    Dynamic,
    List(Box<Type>),
    Tuple(Vec<Type>),
    Set(Box<Type>),
    Map(Box<Type>),
    Object(IndexMap<String, Type>),
}

impl Type {
    pub fn list(elem: Type) -> Self { Type::List(Box::new(elem)) }
    pub fn set(elem: Type) -> Self { Type::Set(Box::new(elem)) }
    pub fn map(elem: Type) -> Self { Type::Map(Box::new(elem)) }
    pub fn tuple(elems: impl IntoIterator<Item = Type>) -> Self {
        Type::Tuple(elems.into_iter().collect())
    }
    pub fn object<K: Into<String>>(attrs: impl IntoIterator<Item = (K, Type)>) -> Self {
        Type::Object(attrs.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    pub fn is_dynamic(&self) -> bool { matches!(self, Type::Dynamic) }

    /// Short name of the outermost shape, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Type::String => "string",
            Type::Bool => "bool",
            Type::Number => "number",
            Type::Dynamic => "dynamic",
            Type::List(_) => "list",
            Type::Tuple(_) => "tuple",
            Type::Set(_) => "set",
            Type::Map(_) => "map",
            Type::Object(_) => "object",
        }
    }

    /// Element type of a homogeneous collection (`List`, `Set`, `Map`).
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::List(t) | Type::Set(t) | Type::Map(t) => Some(t),
            _ => None,
        }
    }

    pub fn attribute_type(&self, name: &str) -> Option<&Type> {
        match self {
            Type::Object(attrs) => attrs.get(name),
            _ => None,
        }
    }

    /// True if `Dynamic` appears anywhere in this descriptor.
    pub fn has_dynamic(&self) -> bool {
        match self {
            Type::Dynamic => true,
            Type::String | Type::Bool | Type::Number => false,
            Type::List(t) | Type::Set(t) | Type::Map(t) => t.has_dynamic(),
            Type::Tuple(elems) => elems.iter().any(Type::has_dynamic),
            Type::Object(attrs) => attrs.values().any(Type::has_dynamic),
        }
    }

    /// Subsumption: does `self` (a declared shape) admit values of `concrete`?
    ///
    /// `Dynamic` admits everything; collections and structural types admit
    /// component-wise, with tuple arity and object attribute sets fixed.
    pub fn accepts(&self, concrete: &Type) -> bool {
        match (self, concrete) {
            (Type::Dynamic, _) => true,
            (Type::String, Type::String)
            | (Type::Bool, Type::Bool)
            | (Type::Number, Type::Number) => true,
            (Type::List(a), Type::List(b))
            | (Type::Set(a), Type::Set(b))
            | (Type::Map(a), Type::Map(b)) => a.accepts(b),
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.accepts(y))
            }
            (Type::Object(a), Type::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, x)| b.get(k).is_some_and(|y| x.accepts(y)))
            }
            _ => false,
        }
    }

    /// JSON type encoding: `"string"`, `["list", "number"]`,
    /// `["object", {"a": "string"}]`, ...
    pub fn to_json(&self) -> Value {
        match self {
            Type::String => json!("string"),
            Type::Bool => json!("bool"),
            Type::Number => json!("number"),
            Type::Dynamic => json!("dynamic"),
            Type::List(t) => json!(["list", t.to_json()]),
            Type::Set(t) => json!(["set", t.to_json()]),
            Type::Map(t) => json!(["map", t.to_json()]),
            Type::Tuple(elems) => {
                json!(["tuple", elems.iter().map(Type::to_json).collect::<Vec<_>>()])
            }
            Type::Object(attrs) => {
                let attrs: serde_json::Map<String, Value> =
                    attrs.iter().map(|(k, t)| (k.clone(), t.to_json())).collect();
                json!(["object", attrs])
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::List(t) => write!(f, "list({t})"),
            Type::Set(t) => write!(f, "set({t})"),
            Type::Map(t) => write!(f, "map({t})"),
            Type::Tuple(elems) => {
                f.write_str("tuple([")?;
                for (i, t) in elems.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{t}")?;
                }
                f.write_str("])")
            }
            Type::Object(attrs) => {
                f.write_str("object({")?;
                for (i, (k, t)) in attrs.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{k}={t}")?;
                }
                f.write_str("})")
            }
            other => f.write_str(other.kind_name()),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
