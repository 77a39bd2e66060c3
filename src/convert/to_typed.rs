//! Generic → typed.
//!
//! Dispatch is on the runtime kind of the generic value; the target shape is
//! then checked for compatibility. Where the target leaves element types open
//! (`Dynamic`), the concrete type is inferred from the elements themselves.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::ConvertError;
use crate::number::Number;
use crate::path::AttributePath;
use crate::types::Type;
use crate::value::TypedValue;

pub fn to_typed(value: &Value, shape: &Type, path: &AttributePath) -> Result<TypedValue, ConvertError> {
    match value {
        Value::Null => Ok(TypedValue::null(shape.clone())),
        Value::String(s) => match shape {
            Type::String | Type::Dynamic => Ok(TypedValue::string(s.as_str())),
            // some APIs encode numbers as strings
            Type::Number => s
                .parse::<Number>()
                .map(TypedValue::number)
                .map_err(|_| ConvertError::InvalidNumber { path: path.clone(), text: s.clone() }),
            _ => Err(mismatch(value, shape, path)),
        },
        Value::Bool(b) => match shape {
            Type::Bool | Type::Dynamic => Ok(TypedValue::bool(*b)),
            _ => Err(mismatch(value, shape, path)),
        },
        Value::Number(n) => match shape {
            Type::Number | Type::Dynamic => Number::from_json(n)
                .map(TypedValue::number)
                .ok_or_else(|| ConvertError::InexactNumber { path: path.clone() }),
            _ => Err(mismatch(value, shape, path)),
        },
        Value::Array(xs) => sequence_to_typed(value, xs, shape, path),
        Value::Object(m) => mapping_to_typed(value, m, shape, path),
    }
}

// ------------------------------ Sequences --------------------------------- //

fn sequence_to_typed(
    value: &Value,
    xs: &[Value],
    shape: &Type,
    path: &AttributePath,
) -> Result<TypedValue, ConvertError> {
    match shape {
        Type::List(elem) => {
            let elems = convert_elements(xs, |_| elem.as_ref(), path)?;
            let concrete = unify(elem, elems.iter(), |i| path.with_index(i))?;
            Ok(TypedValue::list(concrete.clone(), retype_nulls(elems, &concrete)))
        }
        Type::Set(elem) => {
            let elems = convert_elements(xs, |_| elem.as_ref(), path)?;
            let concrete = unify(elem, elems.iter(), |i| path.with_index(i))?;
            Ok(TypedValue::set(concrete.clone(), retype_nulls(elems, &concrete)))
        }
        Type::Tuple(slots) => {
            // a one-slot tuple stands for an open-ended homogeneous sequence
            let broadcast = slots.len() == 1 && xs.len() != 1;
            if !broadcast && slots.len() != xs.len() {
                return Err(ConvertError::TypeMismatch {
                    path: path.clone(),
                    got: format!("sequence of {} elements", xs.len()),
                    want: shape.to_string(),
                });
            }
            let elems = convert_elements(xs, |i| if broadcast { &slots[0] } else { &slots[i] }, path)?;
            Ok(TypedValue::tuple(elems))
        }
        Type::Dynamic => {
            let elems = convert_elements(xs, |_| &Type::Dynamic, path)?;
            Ok(infer_sequence(elems))
        }
        _ => Err(mismatch(value, shape, path)),
    }
}

fn convert_elements<'t>(
    xs: &[Value],
    slot: impl Fn(usize) -> &'t Type,
    path: &AttributePath,
) -> Result<Vec<TypedValue>, ConvertError> {
    xs.iter()
        .enumerate()
        .map(|(i, x)| to_typed(x, slot(i), &path.with_index(i)))
        .collect()
}

/// Tightest shape for an untyped sequence: a list when every non-null
/// element agrees on one type, a tuple otherwise.
fn infer_sequence(elems: Vec<TypedValue>) -> TypedValue {
    let mut known = elems.iter().filter(|e| !e.is_null()).map(TypedValue::ty);
    let homogeneous = match known.next() {
        Some(first) => known.all(|t| t == first).then(|| first.clone()),
        None => None,
    };
    match homogeneous {
        Some(elem) => TypedValue::list(elem.clone(), retype_nulls(elems, &elem)),
        None => TypedValue::tuple(elems),
    }
}

// ------------------------------- Mappings --------------------------------- //

fn mapping_to_typed(
    value: &Value,
    m: &Map<String, Value>,
    shape: &Type,
    path: &AttributePath,
) -> Result<TypedValue, ConvertError> {
    match shape {
        Type::Object(attrs) => {
            let mut out = IndexMap::with_capacity(attrs.len());
            for (name, v) in m {
                let at = path.with_attribute(name.as_str());
                let Some(ty) = attrs.get(name) else {
                    return Err(ConvertError::UnexpectedAttribute { path: at });
                };
                out.insert(name.clone(), to_typed(v, ty, &at)?);
            }
            // every declared attribute is present; missing ones are null
            for (name, ty) in attrs {
                if !out.contains_key(name) {
                    out.insert(name.clone(), TypedValue::null(ty.clone()));
                }
            }
            Ok(TypedValue::object(out))
        }
        Type::Map(elem) => {
            let mut entries = IndexMap::with_capacity(m.len());
            for (key, v) in m {
                entries.insert(key.clone(), to_typed(v, elem, &path.with_key(key.as_str()))?);
            }
            let concrete = unify(elem, entries.values(), |i| {
                entries.get_index(i).map_or_else(|| path.clone(), |(k, _)| path.with_key(k.as_str()))
            })?;
            let entries = entries
                .into_iter()
                .map(|(k, v)| (k, v.with_null_type(&concrete)))
                .collect();
            Ok(TypedValue::map(concrete, entries))
        }
        Type::Dynamic => {
            let mut attrs = IndexMap::with_capacity(m.len());
            for (name, v) in m {
                attrs.insert(name.clone(), to_typed(v, &Type::Dynamic, &path.with_attribute(name.as_str()))?);
            }
            Ok(TypedValue::object(attrs))
        }
        _ => Err(mismatch(value, shape, path)),
    }
}

// ------------------------------- Helpers ---------------------------------- //

/// Element type of a converted collection.
///
/// A bare `Dynamic` element type becomes the concrete type shared by every
/// non-null element (or stays `Dynamic` when there is none). Any other
/// declared type is kept as is; each element was already checked against it
/// and may differ from its siblings inside nested `Dynamic` slots.
fn unify<'a>(
    declared: &Type,
    elems: impl Iterator<Item = &'a TypedValue>,
    at: impl Fn(usize) -> AttributePath,
) -> Result<Type, ConvertError> {
    if !declared.is_dynamic() {
        return Ok(declared.clone());
    }
    let mut concrete: Option<&'a Type> = None;
    for (i, e) in elems.enumerate() {
        if e.is_null() {
            continue;
        }
        match concrete {
            None => concrete = Some(e.ty()),
            Some(t) if t == e.ty() => {}
            Some(_) => return Err(ConvertError::InconsistentElementType { path: at(i) }),
        }
    }
    Ok(concrete.cloned().unwrap_or_else(|| declared.clone()))
}

fn retype_nulls(elems: Vec<TypedValue>, ty: &Type) -> Vec<TypedValue> {
    elems.into_iter().map(|e| e.with_null_type(ty)).collect()
}

fn generic_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn mismatch(value: &Value, shape: &Type, path: &AttributePath) -> ConvertError {
    ConvertError::TypeMismatch {
        path: path.clone(),
        got: generic_kind(value).to_owned(),
        want: shape.to_string(),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathStep;
    use serde_json::json;

    fn root() -> AttributePath { AttributePath::root() }

    #[test]
    fn scalars_against_compatible_targets() {
        assert_eq!(to_typed(&json!("x"), &Type::String, &root()), Ok(TypedValue::string("x")));
        assert_eq!(to_typed(&json!("x"), &Type::Dynamic, &root()), Ok(TypedValue::string("x")));
        assert_eq!(to_typed(&json!(true), &Type::Dynamic, &root()), Ok(TypedValue::bool(true)));
        assert_eq!(to_typed(&json!(3), &Type::Number, &root()), Ok(TypedValue::number(3i64)));
        assert_eq!(
            to_typed(&json!("2.50"), &Type::Number, &root()),
            Ok(TypedValue::number("2.5".parse::<Number>().unwrap()))
        );
        assert_eq!(to_typed(&json!(null), &Type::list(Type::Bool), &root()), Ok(TypedValue::null(Type::list(Type::Bool))));
    }

    #[test]
    fn scalars_against_incompatible_targets() {
        let err = to_typed(&json!(1), &Type::String, &root()).unwrap_err();
        assert_eq!(
            err,
            ConvertError::TypeMismatch { path: root(), got: "number".into(), want: "string".into() }
        );
        assert!(matches!(to_typed(&json!("yes"), &Type::Bool, &root()), Err(ConvertError::TypeMismatch { .. })));
        assert!(matches!(to_typed(&json!(true), &Type::Number, &root()), Err(ConvertError::TypeMismatch { .. })));
        assert!(matches!(
            to_typed(&json!("12abc"), &Type::Number, &root()),
            Err(ConvertError::InvalidNumber { text, .. }) if text == "12abc"
        ));
        assert!(matches!(to_typed(&json!([]), &Type::String, &root()), Err(ConvertError::TypeMismatch { .. })));
        assert!(matches!(to_typed(&json!({}), &Type::list(Type::String), &root()), Err(ConvertError::TypeMismatch { .. })));
    }

    #[test]
    fn numeric_strings_with_extreme_exponents_are_rejected_or_kept() {
        assert!(matches!(
            to_typed(&json!("10e9223372036854775807"), &Type::Number, &root()),
            Err(ConvertError::InvalidNumber { .. })
        ));
        let huge = to_typed(&json!("1e9223372036854775807"), &Type::Number, &root()).unwrap();
        assert_eq!(huge.as_number().map(Number::is_integer), Some(true));
    }

    #[test]
    fn object_missing_attributes_become_null() {
        let shape = Type::object([("a", Type::String), ("b", Type::Number)]);
        let v = to_typed(&json!({"a": "x"}), &shape, &root()).unwrap();
        assert_eq!(v.ty(), &shape);
        assert_eq!(v.get("a"), Some(&TypedValue::string("x")));
        assert_eq!(v.get("b"), Some(&TypedValue::null(Type::Number)));
        assert!(v.conforms());
    }

    #[test]
    fn object_rejects_undeclared_attributes() {
        let shape = Type::object([("a", Type::String)]);
        let err = to_typed(&json!({"a": "x", "z": 1}), &shape, &root()).unwrap_err();
        assert!(matches!(err, ConvertError::UnexpectedAttribute { .. }));
        assert_eq!(err.path().steps(), vec![&PathStep::Attribute("z".into())]);
        assert_eq!(err.path().to_string(), "z");
    }

    #[test]
    fn nested_errors_carry_the_full_path() {
        let shape = Type::object([(
            "spec",
            Type::object([(
                "containers",
                Type::list(Type::object([("name", Type::String), ("ports", Type::list(Type::Number))])),
            )]),
        )]);
        let doc = json!({"spec": {"containers": [
            {"name": "web", "ports": [80, 443]},
            {"name": "sidecar", "ports": [9090, "metrics"]}
        ]}});
        let err = to_typed(&doc, &shape, &root()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidNumber { .. }));
        assert_eq!(err.path().to_string(), "spec.containers[1].ports[1]");
    }

    #[test]
    fn one_slot_tuple_broadcasts_over_the_sequence() {
        let shape = Type::tuple([Type::String]);
        let v = to_typed(&json!(["a", "b", "c"]), &shape, &root()).unwrap();
        assert_eq!(v.ty(), &Type::tuple([Type::String, Type::String, Type::String]));
        assert_eq!(v.elements().map(<[_]>::len), Some(3));

        let err = to_typed(&json!(["a", "b", 3]), &shape, &root()).unwrap_err();
        assert!(matches!(err, ConvertError::TypeMismatch { .. }));
        assert_eq!(err.path(), &root().with_index(2));

        let single = to_typed(&json!(["a"]), &shape, &root()).unwrap();
        assert_eq!(single.ty(), &shape);
    }

    #[test]
    fn one_slot_tuple_accepts_an_empty_sequence() {
        let v = to_typed(&json!([]), &Type::tuple([Type::Number]), &root()).unwrap();
        assert_eq!(v, TypedValue::tuple(vec![]));
        assert_eq!(v.ty(), &Type::Tuple(vec![]));
    }

    #[test]
    fn nested_dynamic_slots_may_differ_between_elements() {
        // ports[].targetPort resolves through IntOrString
        let port = Type::object([("port", Type::Number), ("targetPort", Type::Dynamic)]);
        let shape = Type::list(port.clone());
        let doc = json!([{"port": 80, "targetPort": 8080}, {"port": 443, "targetPort": "https"}]);
        let v = to_typed(&doc, &shape, &root()).unwrap();
        assert_eq!(v.ty(), &shape);
        let elems = v.elements().unwrap();
        assert_eq!(elems[0].get("targetPort"), Some(&TypedValue::number(8080i64)));
        assert_eq!(elems[1].get("targetPort"), Some(&TypedValue::string("https")));
        assert!(v.conforms());

        let sparse = to_typed(&json!([{"targetPort": null}, {"targetPort": 1}]), &shape, &root()).unwrap();
        assert!(sparse.elements().unwrap()[0].get("targetPort").unwrap().is_null());
        assert_eq!(sparse.elements().unwrap()[1].get("targetPort"), Some(&TypedValue::number(1i64)));

        let by_name = to_typed(&json!({"http": {"port": 80, "targetPort": 80}, "tls": {"port": 443, "targetPort": "tls"}}), &Type::map(port), &root()).unwrap();
        assert_eq!(by_name.entries().map(IndexMap::len), Some(2));
    }

    #[test]
    fn tuple_arity_is_enforced_without_broadcast() {
        let shape = Type::tuple([Type::String, Type::Number]);
        let v = to_typed(&json!(["a", 1]), &shape, &root()).unwrap();
        assert_eq!(v.ty(), &shape);
        assert!(matches!(to_typed(&json!(["a"]), &shape, &root()), Err(ConvertError::TypeMismatch { .. })));
        assert!(matches!(to_typed(&json!([]), &shape, &root()), Err(ConvertError::TypeMismatch { .. })));
    }

    #[test]
    fn dynamic_lists_infer_one_element_type() {
        let v = to_typed(&json!(["a", null, "b"]), &Type::list(Type::Dynamic), &root()).unwrap();
        assert_eq!(v.ty(), &Type::list(Type::String));
        assert_eq!(v.elements().unwrap()[1], TypedValue::null(Type::String));

        let err = to_typed(&json!(["a", "b", true]), &Type::list(Type::Dynamic), &root()).unwrap_err();
        assert_eq!(err, ConvertError::InconsistentElementType { path: root().with_index(2) });

        let empty = to_typed(&json!([]), &Type::list(Type::Dynamic), &root()).unwrap();
        assert_eq!(empty.ty(), &Type::list(Type::Dynamic));
    }

    #[test]
    fn sets_convert_like_lists() {
        let v = to_typed(&json!(["x", "y"]), &Type::set(Type::String), &root()).unwrap();
        assert_eq!(v.ty(), &Type::set(Type::String));
        let other = TypedValue::set(Type::String, vec![TypedValue::string("y"), TypedValue::string("x")]);
        assert_eq!(v, other);
    }

    #[test]
    fn dynamic_maps_infer_and_check_values() {
        let v = to_typed(&json!({"a": 1, "b": 2}), &Type::map(Type::Dynamic), &root()).unwrap();
        assert_eq!(v.ty(), &Type::map(Type::Number));

        let err = to_typed(&json!({"a": 1, "b": "two"}), &Type::map(Type::Dynamic), &root()).unwrap_err();
        assert_eq!(err, ConvertError::InconsistentElementType { path: root().with_key("b") });

        let err = to_typed(&json!({"a": 1, "b": "two"}), &Type::map(Type::Number), &root()).unwrap_err();
        assert_eq!(err.path().to_string(), r#"["b"]"#);
    }

    #[test]
    fn dynamic_target_infers_structure() {
        let v = to_typed(&json!({"name": "x", "ports": [1, 2], "mixed": ["a", 1]}), &Type::Dynamic, &root()).unwrap();
        assert_eq!(
            v.ty(),
            &Type::object([
                ("name", Type::String),
                ("ports", Type::list(Type::Number)),
                ("mixed", Type::tuple([Type::String, Type::Number])),
            ])
        );
        assert!(v.conforms());
    }
}
