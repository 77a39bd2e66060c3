//! Typed values: a type descriptor, plus a known/unknown/null state.

use std::fmt;

use indexmap::IndexMap;

use crate::number::Number;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    ty: Type,
    state: ValueState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueState {
    Known(Payload),
    /// Not yet resolved; cannot be serialized outward.
    Unknown,
    Null,
}

#[derive(Debug, Clone)]
pub enum Payload {
    String(String),
    Bool(bool),
    Number(Number),
    List(Vec<TypedValue>),
    Tuple(Vec<TypedValue>),
    /// Unordered; no de-duplication is performed.
    Set(Vec<TypedValue>),
    Map(IndexMap<String, TypedValue>),
    Object(IndexMap<String, TypedValue>),
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Payload::String(a), Payload::String(b)) => a == b,
            (Payload::Bool(a), Payload::Bool(b)) => a == b,
            (Payload::Number(a), Payload::Number(b)) => a == b,
            (Payload::List(a), Payload::List(b)) | (Payload::Tuple(a), Payload::Tuple(b)) => a == b,
            (Payload::Set(a), Payload::Set(b)) => same_multiset(a, b),
            (Payload::Map(a), Payload::Map(b)) | (Payload::Object(a), Payload::Object(b)) => a == b,
            _ => false,
        }
    }
}

fn same_multiset(a: &[TypedValue], b: &[TypedValue]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut taken = vec![false; b.len()];
    a.iter().all(|x| {
        let hit = b.iter().enumerate().position(|(i, y)| !taken[i] && x == y);
        if let Some(i) = hit { taken[i] = true; }
        hit.is_some()
    })
}

// ---------------------------- Construction -------------------------------- //

impl TypedValue {
    fn known(ty: Type, payload: Payload) -> Self {
        Self { ty, state: ValueState::Known(payload) }
    }

    pub fn string(s: impl Into<String>) -> Self { Self::known(Type::String, Payload::String(s.into())) }
    pub fn bool(b: bool) -> Self { Self::known(Type::Bool, Payload::Bool(b)) }
    pub fn number(n: impl Into<Number>) -> Self { Self::known(Type::Number, Payload::Number(n.into())) }

    pub fn list(elem: Type, elems: Vec<TypedValue>) -> Self {
        Self::known(Type::list(elem), Payload::List(elems))
    }

    pub fn set(elem: Type, elems: Vec<TypedValue>) -> Self {
        Self::known(Type::set(elem), Payload::Set(elems))
    }

    pub fn map(elem: Type, entries: IndexMap<String, TypedValue>) -> Self {
        Self::known(Type::map(elem), Payload::Map(entries))
    }

    /// Tuple whose slot types are taken from the elements.
    pub fn tuple(elems: Vec<TypedValue>) -> Self {
        let ty = Type::tuple(elems.iter().map(|e| e.ty.clone()));
        Self::known(ty, Payload::Tuple(elems))
    }

    /// Object whose attribute types are taken from the attribute values.
    pub fn object(attrs: IndexMap<String, TypedValue>) -> Self {
        let ty = Type::Object(attrs.iter().map(|(k, v)| (k.clone(), v.ty.clone())).collect());
        Self::known(ty, Payload::Object(attrs))
    }

    pub fn null(ty: Type) -> Self { Self { ty, state: ValueState::Null } }

    pub fn unknown(ty: Type) -> Self { Self { ty, state: ValueState::Unknown } }

    /// Re-type a null placeholder once the concrete sibling type is known.
    pub(crate) fn with_null_type(self, ty: &Type) -> Self {
        match self.state {
            ValueState::Null => Self::null(ty.clone()),
            _ => self,
        }
    }
}

// ------------------------------ Accessors --------------------------------- //

impl TypedValue {
    pub fn ty(&self) -> &Type { &self.ty }
    pub fn state(&self) -> &ValueState { &self.state }
    pub fn into_parts(self) -> (Type, ValueState) { (self.ty, self.state) }

    pub fn is_known(&self) -> bool { matches!(self.state, ValueState::Known(_)) }
    pub fn is_null(&self) -> bool { matches!(self.state, ValueState::Null) }
    pub fn is_unknown(&self) -> bool { matches!(self.state, ValueState::Unknown) }

    pub fn payload(&self) -> Option<&Payload> {
        match &self.state {
            ValueState::Known(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.payload()? { Payload::String(s) => Some(s), _ => None }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.payload()? { Payload::Bool(b) => Some(*b), _ => None }
    }

    pub fn as_number(&self) -> Option<&Number> {
        match self.payload()? { Payload::Number(n) => Some(n), _ => None }
    }

    /// Elements of a list, tuple or set.
    pub fn elements(&self) -> Option<&[TypedValue]> {
        match self.payload()? {
            Payload::List(xs) | Payload::Tuple(xs) | Payload::Set(xs) => Some(xs),
            _ => None,
        }
    }

    /// Entries of a map or attributes of an object.
    pub fn entries(&self) -> Option<&IndexMap<String, TypedValue>> {
        match self.payload()? {
            Payload::Map(m) | Payload::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&TypedValue> {
        self.entries()?.get(attribute)
    }

    /// Shape invariant: a known payload structurally matches the descriptor,
    /// recursively.
    pub fn conforms(&self) -> bool {
        let Some(payload) = self.payload() else { return true };
        let fits = |want: &Type, v: &TypedValue| want.accepts(&v.ty) && v.conforms();
        match (&self.ty, payload) {
            (Type::String, Payload::String(_))
            | (Type::Bool, Payload::Bool(_))
            | (Type::Number, Payload::Number(_)) => true,
            (Type::List(t), Payload::List(xs)) | (Type::Set(t), Payload::Set(xs)) => {
                xs.iter().all(|x| fits(t.as_ref(), x))
            }
            (Type::Map(t), Payload::Map(m)) => m.values().all(|x| fits(t.as_ref(), x)),
            (Type::Tuple(ts), Payload::Tuple(xs)) => {
                ts.len() == xs.len() && ts.iter().zip(xs).all(|(t, x)| fits(t, x))
            }
            (Type::Object(attrs), Payload::Object(m)) => {
                attrs.len() == m.len()
                    && attrs.iter().all(|(k, t)| m.get(k).is_some_and(|x| fits(t, x)))
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = match &self.state {
            ValueState::Null => return f.write_str("null"),
            ValueState::Unknown => return f.write_str("(unknown)"),
            ValueState::Known(p) => p,
        };
        match payload {
            Payload::String(s) => write!(f, "{s:?}"),
            Payload::Bool(b) => write!(f, "{b}"),
            Payload::Number(n) => write!(f, "{n}"),
            Payload::List(xs) | Payload::Tuple(xs) | Payload::Set(xs) => {
                f.write_str("[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{x}")?;
                }
                f.write_str("]")
            }
            Payload::Map(m) | Payload::Object(m) => {
                f.write_str("{")?;
                for (i, (k, x)) in m.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{k} = {x}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
