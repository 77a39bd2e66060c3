//! Fixed substitutions for well-known Kubernetes definitions whose published
//! schema cannot be mapped by the generic rules.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::document::SchemaNode;

pub enum Override {
    /// Replace the referenced definition with a hand-written node.
    Shape(fn() -> SchemaNode),
    /// Rewrite the referenced definition before resolving it.
    Rewrite(fn(&SchemaNode) -> SchemaNode),
}

const INT_OR_STRING: &str = "io.k8s.apimachinery.pkg.util.intstr.IntOrString";
const QUANTITY: &str = "io.k8s.apimachinery.pkg.api.resource.Quantity";
const TIME: &str = "io.k8s.apimachinery.pkg.apis.meta.v1.Time";
const MICRO_TIME: &str = "io.k8s.apimachinery.pkg.apis.meta.v1.MicroTime";
const RAW_EXTENSION: &str = "io.k8s.apimachinery.pkg.runtime.RawExtension";
const EXT_JSON: &str = "io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSON";
const JSON_SCHEMA_PROPS: &str = "io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaProps";
const JSON_SCHEMA_PROPS_OR_ARRAY: &str =
    "io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaPropsOrArray";
const JSON_SCHEMA_PROPS_OR_BOOL: &str =
    "io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaPropsOrBool";
const JSON_SCHEMA_PROPS_OR_STRING_ARRAY: &str =
    "io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaPropsOrStringArray";

fn any() -> SchemaNode { SchemaNode::default() }
fn string() -> SchemaNode { SchemaNode::of_type("string") }

static OVERRIDES: Lazy<IndexMap<&'static str, Override>> = Lazy::new(|| {
    IndexMap::from([
        (INT_OR_STRING, Override::Shape(any)),
        (RAW_EXTENSION, Override::Shape(any)),
        (EXT_JSON, Override::Shape(any)),
        // self-referential through properties/items/not; shape is per-instance
        (JSON_SCHEMA_PROPS, Override::Shape(any)),
        (JSON_SCHEMA_PROPS_OR_ARRAY, Override::Shape(any)),
        (JSON_SCHEMA_PROPS_OR_BOOL, Override::Shape(any)),
        (QUANTITY, Override::Shape(string)),
        (TIME, Override::Shape(string)),
        (MICRO_TIME, Override::Shape(string)),
        (JSON_SCHEMA_PROPS_OR_STRING_ARRAY, Override::Rewrite(items_as_map_value)),
    ])
});

pub fn lookup(id: &str) -> Option<&'static Override> { OVERRIDES.get(id) }

/// `Property` is published as a list of names, and its item schema is the
/// value schema of the sibling `Schema` map.
fn items_as_map_value(definition: &SchemaNode) -> SchemaNode {
    let mut out = definition.clone();
    if out.declared_kind().is_none() {
        out.kind = Some("object".to_owned());
    }
    let item = definition
        .properties
        .get("Property")
        .and_then(|p| p.items.as_deref())
        .cloned();
    if let (Some(item), Some(target)) = (item, out.properties.get_mut("Schema")) {
        *target = SchemaNode::of_type("object").with_additional_properties(item);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shape_overrides_cover_known_ids() {
        assert!(matches!(lookup(INT_OR_STRING), Some(Override::Shape(_))));
        assert!(matches!(lookup(QUANTITY), Some(Override::Shape(f)) if f() == SchemaNode::of_type("string")));
        assert!(lookup("io.k8s.api.core.v1.Pod").is_none());
    }

    #[test]
    fn string_array_rewrite_moves_item_schema_to_sibling_map() {
        let def: SchemaNode = serde_json::from_value(json!({
            "properties": {
                "Property": { "type": "array", "items": { "type": "string" } },
                "Schema": { "$ref": "#/definitions/io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaProps" }
            }
        }))
        .unwrap();
        let Some(Override::Rewrite(rewrite)) = lookup(JSON_SCHEMA_PROPS_OR_STRING_ARRAY) else {
            panic!("expected a rewrite override");
        };
        let out = rewrite(&def);
        assert_eq!(out.declared_kind(), Some("object"));
        assert_eq!(out.properties["Property"], def.properties["Property"]);
        assert_eq!(
            out.properties["Schema"].additional_properties_schema(),
            Some(&SchemaNode::of_type("string"))
        );
    }
}
