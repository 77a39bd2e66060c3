//! Structural content hash of schema nodes, used as the type cache key.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::document::{AdditionalProperties, SchemaNode};

// field tags keep e.g. `items: X` and `additionalItems: X` apart
const TAG_REF: u8 = 1;
const TAG_KIND: u8 = 2;
const TAG_ITEMS: u8 = 3;
const TAG_ADDITIONAL_ITEMS: u8 = 4;
const TAG_PROPERTY: u8 = 5;
const TAG_ADDITIONAL_PROPERTIES: u8 = 6;
const TAG_ALL_OF: u8 = 7;
const TAG_FLAGS: u8 = 8;
const END: u8 = 0xFF;

/// Hash of the shape-relevant content of `node`. Property order does not
/// contribute; descriptions and other annotations are not part of the model.
pub fn content_hash(node: &SchemaNode) -> u64 {
    let mut h = DefaultHasher::new();
    feed(node, &mut h);
    h.finish()
}

fn feed(node: &SchemaNode, h: &mut DefaultHasher) {
    if let Some(r) = &node.reference {
        TAG_REF.hash(h);
        r.hash(h);
    }
    if let Some(kind) = node.declared_kind() {
        TAG_KIND.hash(h);
        kind.hash(h);
    }
    if let Some(items) = &node.items {
        TAG_ITEMS.hash(h);
        feed(items, h);
    }
    if let Some(items) = &node.additional_items {
        TAG_ADDITIONAL_ITEMS.hash(h);
        feed(items, h);
    }

    let mut names: Vec<&String> = node.properties.keys().collect();
    names.sort_unstable();
    for name in names {
        TAG_PROPERTY.hash(h);
        name.hash(h);
        feed(&node.properties[name], h);
    }

    match &node.additional_properties {
        Some(AdditionalProperties::Allowed(allowed)) => {
            TAG_ADDITIONAL_PROPERTIES.hash(h);
            allowed.hash(h);
        }
        Some(AdditionalProperties::Schema(schema)) => {
            TAG_ADDITIONAL_PROPERTIES.hash(h);
            feed(schema, h);
        }
        None => {}
    }
    for member in &node.all_of {
        TAG_ALL_OF.hash(h);
        feed(member, h);
    }
    TAG_FLAGS.hash(h);
    (node.int_or_string, node.preserve_unknown_fields).hash(h);
    END.hash(h);
}
