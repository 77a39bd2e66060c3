//! Value converter between the generic document tree (`serde_json::Value`)
//! and the typed value model.
//!
//! Both directions are pure single-pass recursive descents; the attribute
//! path threaded through the recursion is the only state, and the first
//! failure in depth-first order is returned.
pub mod from_typed;
pub mod to_typed;

pub use from_typed::from_typed;
pub use to_typed::to_typed;

use serde_json::Value;

use crate::error::ConvertError;
use crate::path::{AttributePath, PathStep};
use crate::types::Type;
use crate::value::TypedValue;

/// `to_typed` from the document root.
pub fn document_to_typed(doc: &Value, shape: &Type) -> Result<TypedValue, ConvertError> {
    to_typed(doc, shape, &AttributePath::root())
}

/// `from_typed` from the value root.
pub fn typed_to_document(value: &TypedValue) -> Result<Option<Value>, ConvertError> {
    from_typed(value, &AttributePath::root())
}

/// Set elements are addressed by their own value. The element recursion runs
/// under the set's path, and the value step is spliced into the error path
/// only when it fails.
pub(crate) fn under_set_element<'a>(
    parent: &'a AttributePath,
    elem: &'a TypedValue,
) -> impl FnOnce(ConvertError) -> ConvertError + 'a {
    move |err| err.map_path(|at| at.inserted_at(parent.len(), PathStep::Value(elem.clone())))
}

// ------------------------------- Tests ------------------------------------ //
