//! JSON wire encoding of typed values.
//!
//! A value goes out as `{"type": <type json>, "value": <value json>}`. Unlike
//! [`crate::convert::from_typed`], null members are kept in place as JSON
//! `null` so tuple positions and declared object attributes survive.

use serde_json::{json, Map, Value};

use crate::convert::from_typed::number_to_json;
use crate::convert::under_set_element;
use crate::error::ConvertError;
use crate::path::AttributePath;
use crate::value::{Payload, TypedValue, ValueState};

pub fn encode(value: &TypedValue) -> Result<Value, ConvertError> {
    Ok(json!({
        "type": value.ty().to_json(),
        "value": encode_value(value, &AttributePath::root())?,
    }))
}

fn encode_value(value: &TypedValue, path: &AttributePath) -> Result<Value, ConvertError> {
    let payload = match value.state() {
        ValueState::Unknown => return Err(ConvertError::UnknownValue { path: path.clone() }),
        ValueState::Null => return Ok(Value::Null),
        ValueState::Known(payload) => payload,
    };
    Ok(match payload {
        Payload::String(s) => Value::String(s.clone()),
        Payload::Bool(b) => Value::Bool(*b),
        Payload::Number(n) => Value::Number(number_to_json(n, path)?),
        Payload::List(xs) | Payload::Tuple(xs) => Value::Array(
            xs.iter()
                .enumerate()
                .map(|(i, x)| encode_value(x, &path.with_index(i)))
                .collect::<Result<Vec<_>, ConvertError>>()?,
        ),
        Payload::Set(xs) => Value::Array(
            xs.iter()
                .map(|x| encode_value(x, path).map_err(under_set_element(path, x)))
                .collect::<Result<Vec<_>, ConvertError>>()?,
        ),
        Payload::Map(m) => Value::Object(
            m.iter()
                .map(|(k, x)| encode_value(x, &path.with_key(k.as_str())).map(|v| (k.clone(), v)))
                .collect::<Result<Map<_, _>, ConvertError>>()?,
        ),
        Payload::Object(m) => Value::Object(
            m.iter()
                .map(|(k, x)| encode_value(x, &path.with_attribute(k.as_str())).map(|v| (k.clone(), v)))
                .collect::<Result<Map<_, _>, ConvertError>>()?,
        ),
    })
}

// ------------------------------- Tests ------------------------------------ //
