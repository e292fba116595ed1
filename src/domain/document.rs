//! Document model
//!
//! Holds a document's text (with tags inlined as markup) and its tag list,
//! ordered by position. Only the tag manager is supposed to mutate the tag
//! list; the document just enforces sortedness and offers lookups.

use crate::domain::tag::{ForeignRef, Tag};
use crate::error::{Result, TagmergeError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Annotation,
    Comparison,
    Extraction,
}

/// A cross-document reference waiting for reconciliation.
///
/// Queued when a tag adopted from another document references a tag that has
/// no equivalent in this document yet. Resolution is a deliberate follow-up
/// step; the queue only records what is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReference {
    /// The referencing tag in this document
    pub tag_uuid: Uuid,

    /// The reference attribute's name
    pub attribute: String,

    /// The foreign tag the reference still points at
    pub foreign: ForeignRef,
}

/// A text document with inline annotation tags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    document_type: DocumentType,
    file_name: String,
    file_path: String,
    #[serde(default)]
    meta_tags: IndexMap<String, Vec<Tag>>,
    text: String,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    pending_references: Vec<PendingReference>,
}

impl Document {
    pub fn new(
        document_type: DocumentType,
        file_name: impl Into<String>,
        file_path: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Document {
            document_type,
            file_name: file_name.into(),
            file_path: file_path.into(),
            meta_tags: IndexMap::new(),
            text: text.into(),
            tags: Vec::new(),
            pending_references: Vec::new(),
        }
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut Vec<Tag> {
        &mut self.tags
    }

    /// Replace the tag list, restoring the sorted-by-position invariant
    pub fn set_tags(&mut self, mut tags: Vec<Tag>) {
        tags.sort_by_key(Tag::position);
        self.tags = tags;
    }

    pub fn tag_by_uuid(&self, uuid: Uuid) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.uuid() == uuid)
    }

    pub fn tag_by_uuid_mut(&mut self, uuid: Uuid) -> Option<&mut Tag> {
        self.tags.iter_mut().find(|tag| tag.uuid() == uuid)
    }

    /// Uuid of the tag with the given display id
    pub fn uuid_from_id(&self, tag_id: &str) -> Result<Uuid> {
        self.tags
            .iter()
            .find(|tag| tag.id() == tag_id)
            .map(Tag::uuid)
            .ok_or_else(|| TagmergeError::UnknownTag(tag_id.to_string()))
    }

    pub fn meta_tags(&self) -> &IndexMap<String, Vec<Tag>> {
        &self.meta_tags
    }

    pub fn set_meta_tags(&mut self, meta_tags: IndexMap<String, Vec<Tag>>) {
        self.meta_tags = meta_tags;
    }

    /// `(tag_type, start, end)` spans over the current text, end exclusive
    pub fn highlight_spans(&self) -> Vec<(String, usize, usize)> {
        self.tags
            .iter()
            .map(|tag| {
                let start = tag.position();
                (tag.tag_type().to_string(), start, start + tag.rendered_len())
            })
            .collect()
    }

    pub fn pending_references(&self) -> &[PendingReference] {
        &self.pending_references
    }

    pub fn push_pending_reference(&mut self, pending: PendingReference) {
        self.pending_references.push(pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn tag_at(position: usize, id: &str) -> Tag {
        let mut attributes = IndexMap::new();
        attributes.insert("id".to_string(), id.to_string());
        Tag::new("TIMEX3", attributes, position, "x", "tid", IndexMap::new())
    }

    #[test]
    fn test_set_tags_sorts_by_position() {
        let mut document = Document::new(DocumentType::Annotation, "a.json", "", "text");
        document.set_tags(vec![tag_at(20, "t2"), tag_at(5, "t1")]);
        let positions: Vec<usize> = document.tags().iter().map(Tag::position).collect();
        assert_eq!(positions, [5, 20]);
    }

    #[test]
    fn test_uuid_from_id() {
        let mut document = Document::new(DocumentType::Annotation, "a.json", "", "text");
        let tag = tag_at(0, "t1");
        let uuid = tag.uuid();
        document.set_tags(vec![tag]);
        assert_eq!(document.uuid_from_id("t1").unwrap(), uuid);
        assert!(matches!(
            document.uuid_from_id("t9"),
            Err(TagmergeError::UnknownTag(_))
        ));
    }

    #[test]
    fn test_highlight_spans_use_rendered_length() {
        let mut document = Document::new(DocumentType::Annotation, "a.json", "", "text");
        let tag = tag_at(3, "t1");
        let rendered = tag.rendered_len();
        document.set_tags(vec![tag]);
        assert_eq!(
            document.highlight_spans(),
            vec![("TIMEX3".to_string(), 3, 3 + rendered)]
        );
    }
}
