//! Resolve Kubernetes-style OpenAPI schema documents into type descriptors
//! and convert generic JSON documents into and out of a typed value model.
pub mod cache;
pub mod cli;
pub mod convert;
pub mod document;
pub mod error;
pub mod jq_exec;
pub mod number;
pub mod path;
pub mod resolver;
pub mod types;
pub mod value;
pub mod wire;

pub use cache::TypeCache;
pub use convert::{from_typed, to_typed};
pub use document::{FileSchemaSource, SchemaDocument, SchemaNode, SchemaSource};
pub use error::{ConvertError, DocumentError, SchemaError};
pub use number::Number;
pub use path::{AttributePath, PathStep};
pub use resolver::{resolve, Resolver, ResolverConfig, DEFAULT_DEPTH_BUDGET};
pub use types::Type;
pub use value::{Payload, TypedValue, ValueState};
