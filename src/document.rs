//! Schema documents as served by an OpenAPI/Swagger endpoint.
//!
//! Only the fields that influence the derived type descriptor are modeled;
//! everything else in a node (descriptions, validation keywords, ...) is
//! ignored on load.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::DocumentError;

// ------------------------------- Nodes ----------------------------------- //

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<Box<SchemaNode>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaNode>,
    #[serde(rename = "x-kubernetes-int-or-string", default, skip_serializing_if = "is_false")]
    pub int_or_string: bool,
    #[serde(rename = "x-kubernetes-preserve-unknown-fields", default, skip_serializing_if = "is_false")]
    pub preserve_unknown_fields: bool,
    #[serde(rename = "x-kubernetes-group-version-kind", default, skip_serializing_if = "Vec::is_empty")]
    pub group_version_kinds: Vec<GroupVersionKind>,
}

/// `additionalProperties` is either a schema or a boolean switch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

fn is_false(b: &bool) -> bool { !*b }

static ANY_SCHEMA: Lazy<SchemaNode> = Lazy::new(SchemaNode::default);

impl SchemaNode {
    pub fn of_type(kind: &str) -> Self {
        Self { kind: Some(kind.to_owned()), ..Self::default() }
    }

    pub fn reference_to(id: &str) -> Self {
        Self { reference: Some(format!("#/definitions/{id}")), ..Self::default() }
    }

    pub fn with_items(mut self, items: SchemaNode) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    pub fn with_additional_items(mut self, items: SchemaNode) -> Self {
        self.additional_items = Some(Box::new(items));
        self
    }

    pub fn with_property(mut self, name: &str, node: SchemaNode) -> Self {
        self.properties.insert(name.to_owned(), node);
        self
    }

    pub fn with_additional_properties(mut self, node: SchemaNode) -> Self {
        self.additional_properties = Some(AdditionalProperties::Schema(Box::new(node)));
        self
    }

    /// Declared map value schema; `true` means "any value", `false` means none.
    pub fn additional_properties_schema(&self) -> Option<&SchemaNode> {
        match self.additional_properties.as_ref()? {
            AdditionalProperties::Allowed(true) => Some(&ANY_SCHEMA),
            AdditionalProperties::Allowed(false) => None,
            AdditionalProperties::Schema(node) => Some(node),
        }
    }

    /// Kind string with empty treated as absent.
    pub fn declared_kind(&self) -> Option<&str> {
        self.kind.as_deref().filter(|k| !k.is_empty())
    }
}

static REF_POINTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#/(?:definitions|components/schemas)/(.+)$").expect("valid regex")
});

/// Definition identifier named by a `$ref` pointer.
///
/// `#/definitions/<id>` and `#/components/schemas/<id>` yield `<id>` (with
/// JSON pointer escapes undone); anything else yields its last segment.
pub fn reference_id(reference: &str) -> String {
    match REF_POINTER.captures(reference).and_then(|c| c.get(1)) {
        Some(id) => id.as_str().replace("~1", "/").replace("~0", "~"),
        None => reference.rsplit('/').next().unwrap_or(reference).to_owned(),
    }
}

// ------------------------------ Document --------------------------------- //

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDocument {
    definitions: IndexMap<String, SchemaNode>,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    definitions: Option<IndexMap<String, SchemaNode>>,
    #[serde(default)]
    components: Option<RawComponents>,
}

#[derive(Deserialize)]
struct RawComponents {
    #[serde(default)]
    schemas: Option<IndexMap<String, SchemaNode>>,
}

impl SchemaDocument {
    pub fn new(definitions: IndexMap<String, SchemaNode>) -> Self { Self { definitions } }

    pub fn from_str(src: &str) -> Result<Self, DocumentError> {
        let de = &mut serde_json::Deserializer::from_str(src);
        Self::from_raw(deserialize_with_path(de)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, DocumentError> {
        let de = &mut serde_json::Deserializer::from_slice(bytes);
        Self::from_raw(deserialize_with_path(de)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, DocumentError> {
        Self::from_raw(deserialize_with_path(value)?)
    }

    fn from_raw(raw: RawDocument) -> Result<Self, DocumentError> {
        let definitions = raw
            .definitions
            .or_else(|| raw.components.and_then(|c| c.schemas))
            .ok_or(DocumentError::MissingDefinitions)?;
        Ok(Self { definitions })
    }

    pub fn definitions(&self) -> &IndexMap<String, SchemaNode> { &self.definitions }

    pub fn definition(&self, id: &str) -> Option<&SchemaNode> { self.definitions.get(id) }

    /// Identifier of the definition tagged with the given group/version/kind.
    pub fn definition_for_kind(&self, group: &str, version: &str, kind: &str) -> Option<&str> {
        self.definitions
            .iter()
            .find(|(_, node)| {
                node.group_version_kinds
                    .iter()
                    .any(|gvk| gvk.group == group && gvk.version == version && gvk.kind == kind)
            })
            .map(|(id, _)| id.as_str())
    }
}

/// Deserialize with JSON-path context in error messages.
fn deserialize_with_path<'de, D, T>(de: D) -> Result<T, DocumentError>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned,
{
    serde_path_to_error::deserialize(de).map_err(|err| DocumentError::Parse {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

// ------------------------------- Sources --------------------------------- //

/// Supplier of the raw schema document for a provider instance.
pub trait SchemaSource {
    fn load(&self) -> Result<SchemaDocument, DocumentError>;
}

/// Reads a Swagger 2 / OpenAPI 3 JSON document from disk.
#[derive(Debug, Clone)]
pub struct FileSchemaSource {
    path: PathBuf,
}

impl FileSchemaSource {
    pub fn new(path: impl AsRef<Path>) -> Self { Self { path: path.as_ref().to_path_buf() } }
}

impl SchemaSource for FileSchemaSource {
    fn load(&self) -> Result<SchemaDocument, DocumentError> {
        let bytes = std::fs::read(&self.path)?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "loaded schema document");
        SchemaDocument::from_slice(&bytes)
    }
}

impl<F> SchemaSource for F
where
    F: Fn() -> Result<SchemaDocument, DocumentError>,
{
    fn load(&self) -> Result<SchemaDocument, DocumentError> { self() }
}

// ------------------------------- Tests ------------------------------------ //
