//! Tag-type schema lookup
//!
//! The extraction and reference classification logic never hard-codes
//! attribute names; it asks a schema which attribute of a tag type carries
//! the display id and which attributes reference other tags.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Capability interface consulted by the tag processor and tag manager.
///
/// A tag type absent from the schema is silently skipped during extraction.
pub trait SchemaLookup {
    /// Name of the attribute that carries the tag's display id (e.g. "tid")
    fn id_name(&self, tag_type: &str) -> Option<&str>;

    /// Names of the IDREF attributes of this type (the id attribute excluded)
    fn ref_names(&self, tag_type: &str) -> &[String];

    /// Alphabetic prefix for freshly assigned ids (e.g. "t" for "t1")
    fn id_prefix(&self, tag_type: &str) -> Option<&str>;

    /// Whether the attribute is ID-typed or IDREF-typed for this tag type
    fn is_id_like(&self, tag_type: &str, attribute: &str) -> bool {
        self.id_name(tag_type) == Some(attribute)
            || self.ref_names(tag_type).iter().any(|r| r == attribute)
    }
}

/// Schema definition for one tag type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagTypeDef {
    /// Attribute holding the display id
    pub id_attribute: String,

    /// Attributes whose values reference other tags' ids
    #[serde(default)]
    pub ref_attributes: Vec<String>,

    /// Prefix prepended to sequential ids
    #[serde(default)]
    pub id_prefix: Option<String>,
}

/// Concrete schema backed by the project configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagSchema {
    #[serde(flatten)]
    types: IndexMap<String, TagTypeDef>,
}

impl TagSchema {
    pub fn new(types: IndexMap<String, TagTypeDef>) -> Self {
        TagSchema { types }
    }

    pub fn insert(&mut self, tag_type: &str, def: TagTypeDef) {
        self.types.insert(tag_type.to_string(), def);
    }

    pub fn tag_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Default TimeML-flavored schema written by `tagmerge init`
    pub fn timeml_default() -> Self {
        let mut schema = TagSchema::default();
        schema.insert(
            "TIMEX3",
            TagTypeDef {
                id_attribute: "tid".to_string(),
                ref_attributes: vec!["anchorTimeID".to_string(), "beginPoint".to_string()],
                id_prefix: Some("t".to_string()),
            },
        );
        schema.insert(
            "EVENT",
            TagTypeDef {
                id_attribute: "eid".to_string(),
                ref_attributes: vec![],
                id_prefix: Some("e".to_string()),
            },
        );
        schema.insert(
            "SIGNAL",
            TagTypeDef {
                id_attribute: "sid".to_string(),
                ref_attributes: vec![],
                id_prefix: Some("s".to_string()),
            },
        );
        schema
    }
}

impl SchemaLookup for TagSchema {
    fn id_name(&self, tag_type: &str) -> Option<&str> {
        self.types.get(tag_type).map(|def| def.id_attribute.as_str())
    }

    fn ref_names(&self, tag_type: &str) -> &[String] {
        self.types
            .get(tag_type)
            .map(|def| def.ref_attributes.as_slice())
            .unwrap_or(&[])
    }

    fn id_prefix(&self, tag_type: &str) -> Option<&str> {
        self.types
            .get(tag_type)
            .and_then(|def| def.id_prefix.as_deref())
    }
}
