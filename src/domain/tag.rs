//! Tag model
//!
//! A `Tag` is one inline annotation span: a type, an ordered attribute map
//! (with a canonical `id` key), a byte position in the owning document's
//! current text, the enclosed span text, and references to other tags.
//! A tag is exclusively owned by one document; equivalence across annotator
//! copies during merge is tracked via uuid lists, never by sharing.

use crate::error::{Result, TagmergeError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A reference attribute's resolution state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagRef {
    /// Raw display id string, not yet resolved against the owning document
    Raw(String),

    /// Resolved to a sibling tag in the same document
    Resolved(Uuid),

    /// Points at a tag of a different document with no equivalent here yet
    Pending(ForeignRef),
}

/// Identity of a foreign tag an unresolved reference points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignRef {
    pub uuid: Uuid,
    pub equivalent_uuids: Vec<Uuid>,
}

/// One inline annotation span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    uuid: Uuid,
    tag_type: String,
    attributes: IndexMap<String, String>,
    id_name: String,
    position: usize,
    text: String,
    references: IndexMap<String, TagRef>,
    #[serde(default)]
    equivalent_uuids: Vec<Uuid>,
    #[serde(default)]
    incoming_refs: u32,
    /// Offset of the inner text inside the plain (markup-free) text, used by
    /// the separated storage schema. Computed on demand, not kept current.
    #[serde(default)]
    plain_position: Option<usize>,
}

impl Tag {
    /// Create a tag with a freshly assigned uuid
    pub fn new(
        tag_type: impl Into<String>,
        attributes: IndexMap<String, String>,
        position: usize,
        text: impl Into<String>,
        id_name: impl Into<String>,
        references: IndexMap<String, TagRef>,
    ) -> Self {
        Tag {
            uuid: Uuid::new_v4(),
            tag_type: tag_type.into(),
            attributes,
            id_name: id_name.into(),
            position,
            text: text.into(),
            references,
            equivalent_uuids: Vec::new(),
            incoming_refs: 0,
            plain_position: None,
        }
    }

    pub fn plain_position(&self) -> Option<usize> {
        self.plain_position
    }

    pub fn set_plain_position(&mut self, plain_position: Option<usize>) {
        self.plain_position = plain_position;
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Replace the uuid. Used when re-creating a tag that must keep its
    /// identity through an edit (delete-then-add).
    pub fn set_uuid(&mut self, uuid: Uuid) {
        self.uuid = uuid;
    }

    pub fn tag_type(&self) -> &str {
        &self.tag_type
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn id_name(&self) -> &str {
        &self.id_name
    }

    /// Display-local id from the canonical `id` attribute, empty if unset
    pub fn id(&self) -> &str {
        self.attributes.get("id").map(String::as_str).unwrap_or("")
    }

    pub fn set_id(&mut self, new_id: impl Into<String>) {
        self.attributes.insert("id".to_string(), new_id.into());
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Shift the position by a signed byte offset
    pub fn shift_position(&mut self, offset: isize) {
        self.position = (self.position as isize + offset) as usize;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn references(&self) -> &IndexMap<String, TagRef> {
        &self.references
    }

    pub fn set_references(&mut self, references: IndexMap<String, TagRef>) {
        self.references = references;
    }

    pub fn equivalent_uuids(&self) -> &[Uuid] {
        &self.equivalent_uuids
    }

    /// Store equivalent uuids, dropping duplicates while preserving order
    pub fn set_equivalent_uuids(&mut self, uuids: Vec<Uuid>) {
        let mut unique = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            if !unique.contains(&uuid) {
                unique.push(uuid);
            }
        }
        self.equivalent_uuids = unique;
    }

    pub fn incoming_refs(&self) -> u32 {
        self.incoming_refs
    }

    /// Called when another tag resolves a reference to this tag
    pub fn increment_reference_count(&mut self) {
        self.incoming_refs += 1;
    }

    /// Called when a referencing tag is deleted
    pub fn decrement_reference_count(&mut self) -> Result<()> {
        if self.incoming_refs == 0 {
            return Err(TagmergeError::DanglingReference(self.uuid.to_string()));
        }
        self.incoming_refs -= 1;
        Ok(())
    }

    /// A tag with incoming references must not be deleted by user action
    pub fn is_deletion_prohibited(&self) -> bool {
        self.incoming_refs > 0
    }

    /// Byte length of the rendered markup
    pub fn rendered_len(&self) -> usize {
        self.to_string().len()
    }
}

impl fmt::Display for Tag {
    /// Renders the tag as it appears in the text: the id attribute first,
    /// under its schema-defined name, then the remaining attributes in map
    /// order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attributes_str = String::new();
        if let Some(id) = self.attributes.get("id") {
            attributes_str.push_str(&format!("{}=\"{}\"", self.id_name, id));
            for (key, value) in &self.attributes {
                if key != "id" {
                    attributes_str.push_str(&format!(" {}=\"{}\"", key, value));
                }
            }
        } else {
            let mut first = true;
            for (key, value) in &self.attributes {
                if !first {
                    attributes_str.push(' ');
                }
                attributes_str.push_str(&format!("{}=\"{}\"", key, value));
                first = false;
            }
        }

        write!(
            f,
            "<{} {}>{}</{}>",
            self.tag_type, attributes_str, self.text, self.tag_type
        )
    }
}
