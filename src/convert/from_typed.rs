//! Typed → generic.
//!
//! Null values become absent (`None`) rather than explicit JSON nulls, and
//! absent elements/entries are dropped from their parent. A non-empty
//! collection whose members were all dropped is itself absent.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::convert::under_set_element;
use crate::error::ConvertError;
use crate::number::Number;
use crate::path::AttributePath;
use crate::value::{Payload, TypedValue, ValueState};

pub fn from_typed(value: &TypedValue, path: &AttributePath) -> Result<Option<Value>, ConvertError> {
    let payload = match value.state() {
        ValueState::Unknown => return Err(ConvertError::UnknownValue { path: path.clone() }),
        ValueState::Null => return Ok(None),
        ValueState::Known(payload) => payload,
    };
    match payload {
        Payload::String(s) => Ok(Some(Value::String(s.clone()))),
        Payload::Bool(b) => Ok(Some(Value::Bool(*b))),
        Payload::Number(n) => number_to_json(n, path).map(|n| Some(Value::Number(n))),
        Payload::List(xs) | Payload::Tuple(xs) => {
            let out = xs
                .iter()
                .enumerate()
                .map(|(i, x)| from_typed(x, &path.with_index(i)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keep_sequence(out))
        }
        Payload::Set(xs) => {
            let out = xs
                .iter()
                .map(|x| from_typed(x, path).map_err(under_set_element(path, x)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keep_sequence(out))
        }
        Payload::Map(m) => mapping(m, |k| path.with_key(k)),
        Payload::Object(m) => mapping(m, |k| path.with_attribute(k)),
    }
}

/// Integers go out as `i64`, everything else as `f64`; either conversion
/// must be exact.
pub(crate) fn number_to_json(n: &Number, path: &AttributePath) -> Result<serde_json::Number, ConvertError> {
    let inexact = || ConvertError::InexactNumber { path: path.clone() };
    if n.is_integer() {
        return n.to_i64_exact().map(serde_json::Number::from).ok_or_else(inexact);
    }
    n.to_f64_exact().and_then(serde_json::Number::from_f64).ok_or_else(inexact)
}

fn keep_sequence(elems: Vec<Option<Value>>) -> Option<Value> {
    let total = elems.len();
    let kept: Vec<Value> = elems.into_iter().flatten().collect();
    collapse(total, kept.len()).then_some(Value::Array(kept))
}

fn mapping(
    m: &IndexMap<String, TypedValue>,
    at: impl Fn(&str) -> AttributePath,
) -> Result<Option<Value>, ConvertError> {
    let mut out = Map::with_capacity(m.len());
    for (k, x) in m {
        if let Some(v) = from_typed(x, &at(k.as_str()))? {
            out.insert(k.clone(), v);
        }
    }
    let kept = out.len();
    Ok(collapse(m.len(), kept).then_some(Value::Object(out)))
}

/// Keep the collection unless every one of its members was dropped.
fn collapse(total: usize, kept: usize) -> bool { total == 0 || kept > 0 }

// ------------------------------- Tests ------------------------------------ //
