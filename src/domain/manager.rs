//! Tag manager
//!
//! The only component permitted to mutate a document's tag list. Every
//! structural change (add, edit, delete) keeps positions, sequential
//! per-type display ids, and the reference graph consistent with the text.

use crate::domain::document::{Document, PendingReference};
use crate::domain::processor::TagProcessor;
use crate::domain::schema::SchemaLookup;
use crate::domain::tag::{ForeignRef, Tag, TagRef};
use crate::error::{Result, TagmergeError};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

/// Regex splitting a display id into alphabetic prefix and number
fn id_prefix_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^([a-zA-Z]+)(\d+)").unwrap())
}

/// Manages tags for a document: adding, editing, retrieving and deleting,
/// with id renumbering and reference bookkeeping after every change.
pub struct TagManager<'s> {
    schema: &'s dyn SchemaLookup,
    processor: TagProcessor<'s>,
}

impl<'s> TagManager<'s> {
    pub fn new(schema: &'s dyn SchemaLookup) -> Self {
        TagManager {
            schema,
            processor: TagProcessor::new(schema),
        }
    }

    pub fn processor(&self) -> &TagProcessor<'s> {
        &self.processor
    }

    /// Extract tags from the document's text and install them, sorted by
    /// position. Used on document load (schema v1) and for comparison panels.
    pub fn extract_into_document(&self, document: &mut Document) {
        let tags = self.processor.extract_tags(document.text());
        document.set_tags(tags);
    }

    /// Add a new tag to the document and update the model accordingly.
    ///
    /// Resolves the tag's references against the document, inserts the tag
    /// into the position-sorted list and its markup into the text, shifts
    /// subsequent tag positions by the markup growth, and renumbers ids.
    /// Returns the tag's uuid.
    pub fn add_tag(&self, mut tag: Tag, document: &mut Document) -> Result<Uuid> {
        let uuid = tag.uuid();
        let references = self.resolve_references(tag.references().clone(), uuid, document);
        tag.set_references(references);

        let updated_text = self.processor.insert_tag_into_text(document.text(), &tag)?;
        let offset = tag.rendered_len() as isize - tag.text().len() as isize;
        let position = tag.position();
        let tag_type = tag.tag_type().to_string();

        let tags = document.tags_mut();
        let index = tags
            .iter()
            .position(|existing| position < existing.position())
            .unwrap_or(tags.len());
        tags.insert(index, tag);

        self.update_positions(position, offset, document);
        let updated_text = self.renumber_ids(&tag_type, document, updated_text)?;
        document.set_text(updated_text);

        Ok(uuid)
    }

    /// Replace an existing tag with new data.
    ///
    /// Implemented as atomic delete-then-add with the uuid preserved, which
    /// re-triggers full id renumbering and reference re-resolution.
    pub fn edit_tag(&self, tag_uuid: Uuid, mut tag: Tag, document: &mut Document) -> Result<()> {
        tag.set_uuid(tag_uuid);
        self.delete_tag(tag_uuid, document)?;
        self.add_tag(tag, document)?;
        Ok(())
    }

    /// Remove a tag from the document and update the model.
    ///
    /// Decrements the reference count of every tag the removed tag points
    /// at, replaces the markup with the bare inner text, shifts subsequent
    /// positions back, and renumbers ids.
    pub fn delete_tag(&self, tag_uuid: Uuid, document: &mut Document) -> Result<()> {
        let index = document
            .tags()
            .iter()
            .position(|tag| tag.uuid() == tag_uuid)
            .ok_or_else(|| TagmergeError::UnknownTag(tag_uuid.to_string()))?;

        let referenced: Vec<Uuid> = document.tags()[index]
            .references()
            .values()
            .filter_map(|reference| match reference {
                TagRef::Resolved(uuid) => Some(*uuid),
                _ => None,
            })
            .collect();
        for uuid in referenced {
            if let Some(target) = document.tag_by_uuid_mut(uuid) {
                target.decrement_reference_count()?;
            }
        }

        let tag = document.tags_mut().remove(index);
        let updated_text = self.processor.delete_tag_from_text(&tag, document.text())?;
        let offset = tag.text().len() as isize - tag.rendered_len() as isize;

        self.update_positions(tag.position(), offset, document);
        let updated_text = self.renumber_ids(tag.tag_type(), document, updated_text)?;
        document.set_text(updated_text);

        Ok(())
    }

    /// Whether the tag is protected from deletion by incoming references.
    ///
    /// Callers must check this before any user-facing delete; `delete_tag`
    /// itself does not enforce it, so that internal delete-then-add edits of
    /// referenced tags stay possible.
    pub fn is_deletion_prohibited(&self, tag_uuid: Uuid, document: &Document) -> Result<bool> {
        document
            .tag_by_uuid(tag_uuid)
            .map(Tag::is_deletion_prohibited)
            .ok_or_else(|| TagmergeError::UnknownTag(tag_uuid.to_string()))
    }

    /// Build meta tags from rendered tag strings, one list per tag type
    pub fn set_meta_tags(
        &self,
        tag_strings: &IndexMap<String, Vec<String>>,
        document: &mut Document,
    ) {
        let mut meta_tags = IndexMap::new();
        for (tag_type, rendered) in tag_strings {
            let mut tags = Vec::new();
            for string in rendered {
                tags.extend(self.processor.extract_tags(string));
            }
            meta_tags.insert(tag_type.clone(), tags);
        }
        document.set_meta_tags(meta_tags);
    }

    /// Renumber display ids sequentially and keep the text in sync.
    ///
    /// First pass: all tags of `tag_type` get ids 1..k in position order,
    /// keeping the alphabetic prefix of their previous id (schema prefix for
    /// tags that never had one); a running byte offset from id-length deltas
    /// is applied to every subsequent tag's position and markup. Second
    /// pass: reference attribute values are rewritten to the referenced
    /// tags' current ids, again tracking the length offset.
    fn renumber_ids(
        &self,
        tag_type: &str,
        document: &mut Document,
        mut text: String,
    ) -> Result<String> {
        let mut current_id = 1;
        let mut offset: isize = 0;
        for index in 0..document.tags().len() {
            {
                let tag = &mut document.tags_mut()[index];
                tag.shift_position(offset);
                if tag.tag_type() != tag_type {
                    continue;
                }

                let old_id = if tag.id().is_empty() {
                    "0".to_string()
                } else {
                    tag.id().to_string()
                };
                let mut new_id = current_id.to_string();
                if let Some(captures) = id_prefix_regex().captures(&old_id) {
                    new_id = format!("{}{}", &captures[1], new_id);
                } else if old_id == "0" {
                    if let Some(prefix) = self.schema.id_prefix(tag_type) {
                        new_id = format!("{}{}", prefix, new_id);
                    }
                }
                tag.set_id(new_id.clone());

                offset += new_id.len() as isize - old_id.len() as isize;
                current_id += 1;
            }
            text = self.processor.update_tag(&text, &document.tags()[index])?;
        }

        let mut offset: isize = 0;
        for index in 0..document.tags().len() {
            document.tags_mut()[index].shift_position(offset);
            if document.tags()[index].references().is_empty() {
                continue;
            }

            let rewrites: Vec<(String, String)> = document.tags()[index]
                .references()
                .iter()
                .filter_map(|(attribute, reference)| match reference {
                    TagRef::Resolved(uuid) => document
                        .tag_by_uuid(*uuid)
                        .map(|target| (attribute.clone(), target.id().to_string())),
                    _ => None,
                })
                .collect();

            {
                let tag = &mut document.tags_mut()[index];
                for (attribute, new_ref_id) in rewrites {
                    if let Some(old_ref_id) = tag.attributes().get(&attribute) {
                        offset += new_ref_id.len() as isize - old_ref_id.len() as isize;
                        tag.set_attribute(&attribute, new_ref_id);
                    }
                }
            }
            text = self.processor.update_tag(&text, &document.tags()[index])?;
        }

        Ok(text)
    }

    /// Shift every tag positioned after `start_position` by `offset` bytes
    fn update_positions(&self, start_position: usize, offset: isize, document: &mut Document) {
        for tag in document.tags_mut() {
            if tag.position() > start_position {
                tag.shift_position(offset);
            }
        }
    }

    /// Resolve reference entries against the document's current tags.
    ///
    /// Raw id strings are matched by display id; entries with no match are
    /// dropped. References carried over from another document are matched by
    /// equivalent uuid; with no equivalent present they stay pending and are
    /// queued on the document for later reconciliation. Every successful
    /// resolution increments the target tag's incoming reference count.
    fn resolve_references(
        &self,
        references: IndexMap<String, TagRef>,
        referencing_uuid: Uuid,
        document: &mut Document,
    ) -> IndexMap<String, TagRef> {
        let mut resolved = IndexMap::new();
        for (attribute, reference) in references {
            match reference {
                TagRef::Raw(ref id) => {
                    let target = document.tags().iter().find(|tag| tag.id() == *id).map(Tag::uuid);
                    if let Some(uuid) = target {
                        if let Some(tag) = document.tag_by_uuid_mut(uuid) {
                            tag.increment_reference_count();
                        }
                        resolved.insert(attribute, TagRef::Resolved(uuid));
                    }
                }
                TagRef::Resolved(uuid) => {
                    if document.tag_by_uuid(uuid).is_some() {
                        if let Some(tag) = document.tag_by_uuid_mut(uuid) {
                            tag.increment_reference_count();
                        }
                        resolved.insert(attribute, TagRef::Resolved(uuid));
                    } else {
                        // A resolved reference from a foreign document; keep
                        // it pending with the source uuid as its only lead.
                        let foreign = ForeignRef {
                            uuid,
                            equivalent_uuids: vec![uuid],
                        };
                        document.push_pending_reference(PendingReference {
                            tag_uuid: referencing_uuid,
                            attribute: attribute.clone(),
                            foreign: foreign.clone(),
                        });
                        resolved.insert(attribute, TagRef::Pending(foreign));
                    }
                }
                TagRef::Pending(foreign) => {
                    let equivalent = document
                        .tags()
                        .iter()
                        .find(|tag| foreign.equivalent_uuids.contains(&tag.uuid()))
                        .map(Tag::uuid);
                    if let Some(uuid) = equivalent {
                        if let Some(tag) = document.tag_by_uuid_mut(uuid) {
                            tag.increment_reference_count();
                        }
                        resolved.insert(attribute, TagRef::Resolved(uuid));
                    } else {
                        document.push_pending_reference(PendingReference {
                            tag_uuid: referencing_uuid,
                            attribute: attribute.clone(),
                            foreign: foreign.clone(),
                        });
                        resolved.insert(attribute, TagRef::Pending(foreign));
                    }
                }
            }
        }
        resolved
    }
}
