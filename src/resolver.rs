//! Schema resolver: schema document nodes → type descriptors.
//!
//! - `$ref` nodes are looked up in the definitions table, with a fixed
//!   override table intercepting a handful of well-known identifiers.
//! - Every recursive step spends one unit of a depth budget; schema documents
//!   may be self-referential, descriptors cannot.
//! - Results are memoized in an injected [`TypeCache`] keyed by the node's
//!   structural content hash.
pub mod hash;
mod overrides;

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::cache::TypeCache;
use crate::document::{reference_id, SchemaDocument, SchemaNode};
use crate::error::SchemaError;
use crate::path::AttributePath;
use crate::types::Type;

use overrides::Override;

pub use hash::content_hash;

pub const DEFAULT_DEPTH_BUDGET: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    pub depth_budget: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self { Self { depth_budget: DEFAULT_DEPTH_BUDGET } }
}

// ------------------------------- Front API -------------------------------- //

/// Resolves schema nodes against one document's definitions, sharing a
/// type cache with every other resolver handed the same cache.
///
/// The cache key is the node content alone, so a cache should not be shared
/// between unrelated schema documents.
#[derive(Debug, Clone)]
pub struct Resolver {
    cache: Arc<TypeCache>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(cache: Arc<TypeCache>, config: ResolverConfig) -> Self { Self { cache, config } }

    pub fn cache(&self) -> &Arc<TypeCache> { &self.cache }

    pub fn config(&self) -> ResolverConfig { self.config }

    pub fn resolve_node(&self, doc: &SchemaDocument, node: &SchemaNode) -> Result<Arc<Type>, SchemaError> {
        let key = content_hash(node);
        if let Some(hit) = self.cache.get(key) {
            return Ok(hit);
        }
        let ty = resolve(node, doc.definitions(), self.config.depth_budget, &self.cache)?;
        Ok(self.cache.insert(key, ty))
    }

    /// Resolve the named definition (overrides apply to it as to any `$ref`).
    pub fn resolve_definition(&self, doc: &SchemaDocument, id: &str) -> Result<Arc<Type>, SchemaError> {
        self.resolve_node(doc, &SchemaNode::reference_to(id))
    }

    /// Resolve the definition tagged with `x-kubernetes-group-version-kind`.
    pub fn resolve_kind(
        &self,
        doc: &SchemaDocument,
        group: &str,
        version: &str,
        kind: &str,
    ) -> Result<Arc<Type>, SchemaError> {
        let id = doc.definition_for_kind(group, version, kind).ok_or_else(|| {
            SchemaError::UnknownReference {
                path: AttributePath::root(),
                reference: format!("{group}/{version}/{kind}"),
            }
        })?;
        debug!(group, version, kind, id, "resolving resource kind");
        self.resolve_definition(doc, id)
    }
}

/// Resolve `node` against `definitions`, spending at most `depth_budget`
/// recursive steps.
pub fn resolve(
    node: &SchemaNode,
    definitions: &IndexMap<String, SchemaNode>,
    depth_budget: usize,
    cache: &TypeCache,
) -> Result<Type, SchemaError> {
    Walk { definitions, cache }.resolve(node, depth_budget, &AttributePath::root())
}

// ------------------------------- Walk ------------------------------------ //

struct Walk<'a> {
    definitions: &'a IndexMap<String, SchemaNode>,
    cache: &'a TypeCache,
}

impl Walk<'_> {
    fn resolve(&self, node: &SchemaNode, budget: usize, path: &AttributePath) -> Result<Type, SchemaError> {
        if budget == 0 {
            return Err(SchemaError::RecursionOverrun { path: path.clone() });
        }
        let key = content_hash(node);
        if let Some(hit) = self.cache.get(key) {
            trace!(key, %path, "type cache hit");
            return Ok(Type::clone(&hit));
        }
        let ty = self.resolve_uncached(node, budget - 1, path)?;
        trace!(key, %path, "type cache store");
        Ok(Type::clone(&self.cache.insert(key, ty)))
    }

    fn resolve_uncached(&self, node: &SchemaNode, budget: usize, path: &AttributePath) -> Result<Type, SchemaError> {
        if let Some(reference) = &node.reference {
            return self.resolve_reference(reference, budget, path);
        }
        if !node.all_of.is_empty() {
            return match node.all_of.as_slice() {
                [only] => self.resolve(only, budget, path),
                members => Err(unsupported(path, format!("allOf with {} members", members.len()))),
            };
        }
        if node.int_or_string {
            return Ok(Type::Dynamic);
        }

        match node.declared_kind() {
            None => Ok(Type::Dynamic),
            Some("string") => Ok(Type::String),
            Some("boolean") => Ok(Type::Bool),
            Some("number" | "integer") => Ok(Type::Number),
            Some("array") => self.resolve_array(node, budget, path),
            Some("object") => self.resolve_object(node, budget, path),
            Some(other) => Err(unsupported(path, format!("unknown type {other:?}"))),
        }
    }

    fn resolve_reference(&self, reference: &str, budget: usize, path: &AttributePath) -> Result<Type, SchemaError> {
        let id = reference_id(reference);
        match overrides::lookup(&id) {
            Some(Override::Shape(shape)) => {
                debug!(id = %id, "schema override: fixed shape");
                self.resolve(&shape(), budget, path)
            }
            Some(Override::Rewrite(rewrite)) => {
                debug!(id = %id, "schema override: rewrite");
                let definition = self.definition(&id, reference, path)?;
                self.resolve(&rewrite(definition), budget, path)
            }
            None => {
                trace!(id = %id, %path, "following reference");
                let definition = self.definition(&id, reference, path)?;
                self.resolve(definition, budget, path)
            }
        }
    }

    fn definition(&self, id: &str, reference: &str, path: &AttributePath) -> Result<&SchemaNode, SchemaError> {
        self.definitions.get(id).ok_or_else(|| SchemaError::UnknownReference {
            path: path.clone(),
            reference: reference.to_owned(),
        })
    }

    fn resolve_array(&self, node: &SchemaNode, budget: usize, path: &AttributePath) -> Result<Type, SchemaError> {
        match (&node.items, &node.additional_items) {
            (Some(items), None) => {
                let elem = self.resolve(items, budget, &path.with_attribute("items"))?;
                Ok(Type::list(elem))
            }
            // open-ended homogeneous sequence, encoded as a one-slot tuple
            (None, Some(items)) => {
                let elem = self.resolve(items, budget, &path.with_attribute("additionalItems"))?;
                Ok(Type::tuple([elem]))
            }
            (Some(_), Some(_)) => Err(unsupported(path, "array declares both items and additionalItems")),
            (None, None) => Err(unsupported(path, "array declares neither items nor additionalItems")),
        }
    }

    fn resolve_object(&self, node: &SchemaNode, budget: usize, path: &AttributePath) -> Result<Type, SchemaError> {
        if node.preserve_unknown_fields {
            return Ok(Type::Dynamic);
        }
        match (node.properties.is_empty(), node.additional_properties_schema()) {
            (false, None) => {
                let mut attrs = IndexMap::with_capacity(node.properties.len());
                for (name, prop) in &node.properties {
                    let ty = self.resolve(prop, budget, &path.with_attribute(name.as_str()))?;
                    attrs.insert(name.clone(), ty);
                }
                Ok(Type::Object(attrs))
            }
            (true, Some(values)) => {
                let elem = self.resolve(values, budget, &path.with_attribute("additionalProperties"))?;
                Ok(Type::map(elem))
            }
            // shape only known per instance
            (true, None) => Ok(Type::Dynamic),
            (false, Some(_)) => Err(unsupported(path, "object declares both properties and additionalProperties")),
        }
    }
}

fn unsupported(path: &AttributePath, reason: impl Into<String>) -> SchemaError {
    SchemaError::UnsupportedShape { path: path.clone(), reason: reason.into() }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> SchemaDocument { SchemaDocument::from_value(v).unwrap() }

    fn node(v: serde_json::Value) -> SchemaNode { serde_json::from_value(v).unwrap() }

    fn resolve_cold(n: &SchemaNode, d: &SchemaDocument) -> Result<Type, SchemaError> {
        resolve(n, d.definitions(), DEFAULT_DEPTH_BUDGET, &TypeCache::new())
    }

    fn empty_doc() -> SchemaDocument { doc(json!({ "definitions": {} })) }

    #[test]
    fn primitive_kinds() {
        let d = empty_doc();
        assert_eq!(resolve_cold(&node(json!({"type": "string"})), &d), Ok(Type::String));
        assert_eq!(resolve_cold(&node(json!({"type": "boolean"})), &d), Ok(Type::Bool));
        assert_eq!(resolve_cold(&node(json!({"type": "integer"})), &d), Ok(Type::Number));
        assert_eq!(resolve_cold(&node(json!({"type": "number"})), &d), Ok(Type::Number));
        assert_eq!(resolve_cold(&node(json!({})), &d), Ok(Type::Dynamic));
        assert_eq!(resolve_cold(&node(json!({"type": ""})), &d), Ok(Type::Dynamic));
        assert!(matches!(
            resolve_cold(&node(json!({"type": "null"})), &d),
            Err(SchemaError::UnsupportedShape { .. })
        ));
    }

    #[test]
    fn arrays_resolve_to_lists_or_one_slot_tuples() {
        let d = empty_doc();
        let list = node(json!({"type": "array", "items": {"type": "string"}}));
        let open = node(json!({"type": "array", "additionalItems": {"type": "integer"}}));
        assert_eq!(resolve_cold(&list, &d), Ok(Type::list(Type::String)));
        assert_eq!(resolve_cold(&open, &d), Ok(Type::tuple([Type::Number])));

        let both = node(json!({"type": "array", "items": {}, "additionalItems": {}}));
        let neither = node(json!({"type": "array"}));
        assert!(matches!(resolve_cold(&both, &d), Err(SchemaError::UnsupportedShape { .. })));
        assert!(matches!(resolve_cold(&neither, &d), Err(SchemaError::UnsupportedShape { .. })));
    }

    #[test]
    fn objects_resolve_to_objects_maps_or_dynamic() {
        let d = empty_doc();
        let obj = node(json!({"type": "object", "properties": {
            "name": {"type": "string"},
            "labels": {"type": "object", "additionalProperties": {"type": "string"}}
        }}));
        assert_eq!(
            resolve_cold(&obj, &d),
            Ok(Type::object([("name", Type::String), ("labels", Type::map(Type::String))]))
        );
        assert_eq!(resolve_cold(&node(json!({"type": "object"})), &d), Ok(Type::Dynamic));
        assert_eq!(
            resolve_cold(&node(json!({"type": "object", "additionalProperties": true})), &d),
            Ok(Type::map(Type::Dynamic))
        );
        assert_eq!(
            resolve_cold(&node(json!({"type": "object", "x-kubernetes-preserve-unknown-fields": true,
                                      "properties": {"a": {"type": "string"}}})), &d),
            Ok(Type::Dynamic)
        );

        let both = node(json!({"type": "object", "properties": {"a": {}}, "additionalProperties": {}}));
        let err = resolve_cold(&both, &d).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedShape { .. }));
    }

    #[test]
    fn references_follow_definitions_and_report_missing_ones() {
        let d = doc(json!({ "definitions": {
            "Port": {"type": "object", "properties": {"containerPort": {"type": "integer"}}},
            "Container": {"type": "object", "properties": {
                "ports": {"type": "array", "items": {"$ref": "#/definitions/Port"}},
                "env": {"type": "array", "items": {"$ref": "#/definitions/EnvVar"}}
            }}
        }}));
        let ports = node(json!({"type": "array", "items": {"$ref": "#/definitions/Port"}}));
        assert_eq!(
            resolve_cold(&ports, &d),
            Ok(Type::list(Type::object([("containerPort", Type::Number)])))
        );

        let err = resolve_cold(&SchemaNode::reference_to("Container"), &d).unwrap_err();
        match err {
            SchemaError::UnknownReference { path, reference } => {
                assert_eq!(reference, "#/definitions/EnvVar");
                assert_eq!(path.to_string(), "env.items");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn overrides_substitute_well_known_definitions() {
        let d = doc(json!({ "definitions": {
            "io.k8s.apimachinery.pkg.util.intstr.IntOrString": {"type": "string", "format": "int-or-string"},
            "io.k8s.apimachinery.pkg.api.resource.Quantity": {"type": "object"},
            "Probe": {"type": "object", "properties": {
                "port": {"$ref": "#/definitions/io.k8s.apimachinery.pkg.util.intstr.IntOrString"},
                "memory": {"$ref": "#/definitions/io.k8s.apimachinery.pkg.api.resource.Quantity"},
                "raw": {"$ref": "#/definitions/io.k8s.apimachinery.pkg.runtime.RawExtension"}
            }}
        }}));
        assert_eq!(
            resolve_cold(&SchemaNode::reference_to("Probe"), &d),
            Ok(Type::object([("port", Type::Dynamic), ("memory", Type::String), ("raw", Type::Dynamic)]))
        );
    }

    #[test]
    fn string_array_override_rewrites_sibling_map() {
        let id = "io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaPropsOrStringArray";
        let d = doc(json!({ "definitions": {
            id: {"properties": {
                "Property": {"type": "array", "items": {"type": "string"}},
                "Schema": {"$ref": "#/definitions/io.k8s.apiextensions-apiserver.pkg.apis.apiextensions.v1.JSONSchemaProps"}
            }}
        }}));
        assert_eq!(
            resolve_cold(&SchemaNode::reference_to(id), &d),
            Ok(Type::object([("Property", Type::list(Type::String)), ("Schema", Type::map(Type::String))]))
        );
    }

    #[test]
    fn kubernetes_extensions() {
        let d = empty_doc();
        assert_eq!(
            resolve_cold(&node(json!({"x-kubernetes-int-or-string": true, "anyOf": [{"type": "integer"}, {"type": "string"}]})), &d),
            Ok(Type::Dynamic)
        );
        let wrapped = doc(json!({ "definitions": { "A": {"type": "boolean"} } }));
        assert_eq!(resolve_cold(&node(json!({"allOf": [{"$ref": "#/definitions/A"}]})), &wrapped), Ok(Type::Bool));
        assert!(matches!(
            resolve_cold(&node(json!({"allOf": [{"type": "string"}, {"type": "string"}]})), &d),
            Err(SchemaError::UnsupportedShape { .. })
        ));
    }

    #[test]
    fn self_reference_overruns_the_depth_budget() {
        let d = doc(json!({ "definitions": {
            "Node": {"type": "object", "properties": {
                "value": {"type": "string"},
                "next": {"$ref": "#/definitions/Node"}
            }},
            "Ping": {"type": "object", "properties": {"pong": {"$ref": "#/definitions/Pong"}}},
            "Pong": {"type": "object", "properties": {"ping": {"$ref": "#/definitions/Ping"}}}
        }}));
        for id in ["Node", "Ping"] {
            let err = resolve_cold(&SchemaNode::reference_to(id), &d).unwrap_err();
            assert!(matches!(err, SchemaError::RecursionOverrun { .. }), "{id}: {err}");
        }
        // a tiny budget fails even on acyclic input
        let shallow = node(json!({"type": "array", "items": {"type": "array", "items": {"type": "string"}}}));
        let err = resolve(&shallow, d.definitions(), 2, &TypeCache::new()).unwrap_err();
        assert!(matches!(err, SchemaError::RecursionOverrun { .. }));
        assert!(resolve(&shallow, d.definitions(), 3, &TypeCache::new()).is_ok());
    }

    #[test]
    fn warm_cache_yields_equal_descriptors() {
        let d = doc(json!({ "definitions": {
            "Pod": {
                "type": "object",
                "properties": {
                    "metadata": {"type": "object", "properties": {
                        "name": {"type": "string"},
                        "labels": {"type": "object", "additionalProperties": {"type": "string"}}
                    }},
                    "spec": {"type": "object", "properties": {
                        "containers": {"type": "array", "items": {"type": "object", "properties": {
                            "name": {"type": "string"},
                            "args": {"type": "array", "items": {"type": "string"}}
                        }}}
                    }}
                },
                "x-kubernetes-group-version-kind": [{"group": "", "version": "v1", "kind": "Pod"}]
            }
        }}));
        let resolver = Resolver::new(Arc::new(TypeCache::new()), ResolverConfig::default());
        let cold = resolver.resolve_kind(&d, "", "v1", "Pod").unwrap();
        let stored = resolver.cache().len();
        assert!(stored > 0);
        let warm = resolver.resolve_kind(&d, "", "v1", "Pod").unwrap();
        assert_eq!(cold, warm);
        assert_eq!(resolver.cache().len(), stored);

        let fresh = Resolver::new(Arc::new(TypeCache::new()), ResolverConfig::default());
        assert_eq!(*fresh.resolve_definition(&d, "Pod").unwrap(), *cold);

        assert!(matches!(
            resolver.resolve_kind(&d, "apps", "v1", "Deployment"),
            Err(SchemaError::UnknownReference { .. })
        ));
    }

    #[test]
    fn failures_are_not_cached() {
        let d = doc(json!({ "definitions": {} }));
        let cache = TypeCache::new();
        let missing = SchemaNode::reference_to("Gone");
        assert!(resolve(&missing, d.definitions(), 8, &cache).is_err());
        assert!(cache.get(content_hash(&missing)).is_none());
    }
}
