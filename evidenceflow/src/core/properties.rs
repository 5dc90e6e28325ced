//! Open property metadata maps.

use indexmap::IndexMap;
use serde_json::Value;

/// Open metadata for a single declared property.
///
/// Field names are free-form; `type` is the conventional minimum. Values
/// are arbitrary JSON, but only string values participate in metadata
/// indexing.
pub type PropertyMeta = IndexMap<String, Value>;

/// A stage's declared properties and their metadata, in declaration order.
///
/// The order is preserved so that anything derived from a walk over the
/// properties (such as aggregated response headers) is deterministic.
pub type PropertyMap = IndexMap<String, PropertyMeta>;

/// Builds metadata carrying only a `type` field.
#[must_use]
pub fn meta_of_type(type_tag: &str) -> PropertyMeta {
    let mut meta = PropertyMeta::new();
    meta.insert("type".to_owned(), Value::String(type_tag.to_owned()));
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_of_type() {
        let meta = meta_of_type("int");
        assert_eq!(meta.get("type"), Some(&Value::String("int".to_owned())));
        assert_eq!(meta.len(), 1);
    }

    #[test]
    fn test_property_map_keeps_declaration_order() {
        let mut properties = PropertyMap::new();
        properties.insert("zulu".to_owned(), meta_of_type("string"));
        properties.insert("alpha".to_owned(), meta_of_type("string"));

        let names: Vec<&String> = properties.keys().collect();
        assert_eq!(names, ["zulu", "alpha"]);
    }
}
