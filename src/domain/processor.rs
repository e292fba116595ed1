//! Tag text processor
//!
//! Bidirectional transform between "tags inlined in text" and "tag records
//! plus plain text", and the in-place text edits that keep the two views
//! consistent. Tags are XML-like, non-nested spans:
//! `<TYPE attr="v" ...>content</TYPE>`.
//!
//! The `regex` crate has no backreferences, so a closing tag is located by
//! searching for the literal `</TYPE>` after the opening match; with nesting
//! disallowed the first occurrence is always the right one.

use crate::domain::schema::SchemaLookup;
use crate::domain::tag::{Tag, TagRef};
use crate::error::{Result, TagmergeError};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

/// Regex for an opening tag: type and raw attribute run
fn open_tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"<(\w+)\s*([^>]*)>"#).unwrap())
}

/// Regex for one attribute inside a tag's attribute run
fn attribute_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(\w+)="([^"]*)""#).unwrap())
}

/// Lazy tag-shaped pattern used to locate an existing tag for replacement
fn tag_shape_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"(?s)<\w+[^>]*>.*?</\w+>"#).unwrap())
}

/// A matched tag span in raw text
struct TagSpan<'t> {
    tag_type: &'t str,
    attributes_raw: &'t str,
    content: &'t str,
    /// Byte offset of the opening `<`
    start: usize,
    /// Byte offset one past the closing `>`
    end: usize,
    /// Byte offset of the first content byte
    content_start: usize,
}

/// Iterate well-formed tag spans in order, skipping unmatched opening tags
fn tag_spans(text: &str) -> Vec<TagSpan<'_>> {
    let mut spans = Vec::new();
    let mut cursor = 0;
    for captures in open_tag_regex().captures_iter(text) {
        let whole = captures.get(0).unwrap();
        if whole.start() < cursor {
            continue;
        }
        let tag_type = captures.get(1).unwrap().as_str();
        let closing = format!("</{}>", tag_type);
        let content_start = whole.end();
        let Some(relative) = text[content_start..].find(&closing) else {
            continue;
        };
        let content_end = content_start + relative;
        let end = content_end + closing.len();
        spans.push(TagSpan {
            tag_type,
            attributes_raw: captures.get(2).unwrap().as_str(),
            content: &text[content_start..content_end],
            start: whole.start(),
            end,
            content_start,
        });
        cursor = end;
    }
    spans
}

/// Plain text and its extracted tags, as produced by the split operation
#[derive(Debug, Clone)]
pub struct PlainTextAndTags {
    pub plain_text: String,
    pub tags: Vec<Tag>,
}

/// Handles the transformation of tags to strings and vice versa, and
/// performs the string operations on document text.
pub struct TagProcessor<'s> {
    schema: &'s dyn SchemaLookup,
}

impl<'s> TagProcessor<'s> {
    pub fn new(schema: &'s dyn SchemaLookup) -> Self {
        TagProcessor { schema }
    }

    /// Extract all schema-recognized tags from the text.
    ///
    /// Tag types absent from the schema are silently skipped. The schema's id
    /// attribute is renamed to the canonical `id` key; IDREF attributes are
    /// collected into the tag's reference map as raw id strings, resolved to
    /// sibling tags later by the tag manager.
    pub fn extract_tags(&self, text: &str) -> Vec<Tag> {
        let mut tags = Vec::new();
        for span in tag_spans(text) {
            let Some(id_name) = self.schema.id_name(span.tag_type) else {
                continue;
            };

            let mut attributes: IndexMap<String, String> = IndexMap::new();
            for captures in attribute_regex().captures_iter(span.attributes_raw) {
                attributes.insert(captures[1].to_string(), captures[2].to_string());
            }
            if let Some(id_value) = attributes.shift_remove(id_name) {
                attributes.insert("id".to_string(), id_value);
            }

            let ref_names = self.schema.ref_names(span.tag_type);
            let references: IndexMap<String, TagRef> = attributes
                .iter()
                .filter(|(key, _)| ref_names.iter().any(|name| name == *key))
                .map(|(key, value)| (key.clone(), TagRef::Raw(value.clone())))
                .collect();

            tags.push(Tag::new(
                span.tag_type,
                attributes,
                span.start,
                span.content.trim(),
                id_name,
                references,
            ));
        }
        tags
    }

    /// Insert a single tag's markup into the text at its position.
    ///
    /// The text at `tag.position()` must equal the tag's inner text; the span
    /// is replaced by the full markup rendering.
    pub fn insert_tag_into_text(&self, text: &str, tag: &Tag) -> Result<String> {
        let position = tag.position();
        let inner = tag.text();
        if text.get(position..position + inner.len()) != Some(inner) {
            return Err(TagmergeError::TextMismatch { position });
        }

        let mut updated = String::with_capacity(text.len() + tag.rendered_len());
        updated.push_str(&text[..position]);
        updated.push_str(&tag.to_string());
        updated.push_str(&text[position + inner.len()..]);
        Ok(updated)
    }

    /// Inverse of insertion: the rendered markup at `tag.position()` is
    /// replaced by the bare inner text.
    pub fn delete_tag_from_text(&self, tag: &Tag, text: &str) -> Result<String> {
        let rendered = tag.to_string();
        let position = tag.position();
        if text.get(position..position + rendered.len()) != Some(rendered.as_str()) {
            return Err(TagmergeError::NoTagAtPosition(position));
        }

        let mut updated = String::with_capacity(text.len());
        updated.push_str(&text[..position]);
        updated.push_str(tag.text());
        updated.push_str(&text[position + rendered.len()..]);
        Ok(updated)
    }

    /// Replace the tag-shaped span found at or after `tag.position()` with
    /// the tag's current rendering.
    pub fn update_tag(&self, text: &str, tag: &Tag) -> Result<String> {
        let position = tag.position();
        let tail = text
            .get(position..)
            .ok_or(TagmergeError::NoTagAtPosition(position))?;
        let matched = tag_shape_regex()
            .find(tail)
            .ok_or(TagmergeError::NoTagAtPosition(position))?;

        let start = position + matched.start();
        let end = position + matched.end();
        let mut updated = String::with_capacity(text.len());
        updated.push_str(&text[..start]);
        updated.push_str(&tag.to_string());
        updated.push_str(&text[end..]);
        Ok(updated)
    }

    /// Strip every tag, keeping the inner content: the plain-text view
    pub fn delete_all_tags_from_text(&self, text: &str) -> String {
        let mut plain = String::with_capacity(text.len());
        let mut cursor = 0;
        for span in tag_spans(text) {
            plain.push_str(&text[cursor..span.start]);
            plain.push_str(span.content);
            cursor = span.end;
        }
        plain.push_str(&text[cursor..]);
        plain
    }

    /// Strip ID and IDREF attributes from every tag span, used to compare
    /// annotator versions independent of id numbering.
    pub fn remove_ids_from_tags(&self, text: &str) -> String {
        let mut cleaned = String::with_capacity(text.len());
        let mut cursor = 0;
        for span in tag_spans(text) {
            cleaned.push_str(&text[cursor..span.start]);

            let kept: Vec<String> = attribute_regex()
                .captures_iter(span.attributes_raw)
                .filter(|captures| !self.schema.is_id_like(span.tag_type, &captures[1]))
                .map(|captures| format!("{}=\"{}\"", &captures[1], &captures[2]))
                .collect();
            cleaned.push_str(&format!(
                "<{} {}>{}</{}>",
                span.tag_type,
                kept.join(" "),
                span.content,
                span.tag_type
            ));
            cursor = span.end;
        }
        cleaned.push_str(&text[cursor..]);
        cleaned
    }

    /// Split inline text into plain text plus tags carrying `plain_position`
    pub fn plain_text_and_tags(&self, text: &str) -> PlainTextAndTags {
        let plain_text = self.delete_all_tags_from_text(text);
        let mut tags = self.extract_tags(text);
        self.assign_plain_positions(&mut tags, text);
        PlainTextAndTags { plain_text, tags }
    }

    /// Compute each tag's `plain_position`: the offset of its first
    /// non-whitespace content byte within the plain text.
    pub fn assign_plain_positions(&self, tags: &mut [Tag], original_text: &str) {
        let mapping = build_index_mapping(original_text);
        for tag in tags.iter_mut() {
            tag.set_plain_position(None);
            let position = tag.position();
            if position >= original_text.len() {
                continue;
            }
            let Some(relative_gt) = original_text[position..].find('>') else {
                continue;
            };
            let content_start = position + relative_gt + 1;
            let closing = format!("</{}>", tag.tag_type());
            let Some(relative_close) = original_text
                .get(content_start..)
                .and_then(|tail| tail.find(&closing))
            else {
                continue;
            };
            let raw_content = &original_text[content_start..content_start + relative_close];
            let leading_ws = raw_content.len() - raw_content.trim_start().len();
            let adjusted = content_start + leading_ws;
            tag.set_plain_position(mapping.get(adjusted).copied().flatten());
        }
    }

    /// Re-insert tags into plain text, in descending `plain_position` order
    /// so earlier insertions never shift not-yet-inserted offsets.
    pub fn merge_plain_text_and_tags(&self, plain_text: &str, tags: &[Tag]) -> Result<String> {
        let mut sorted: Vec<&Tag> = tags.iter().collect();
        sorted.sort_by_key(|tag| std::cmp::Reverse(tag.plain_position().unwrap_or(0)));

        let mut merged = plain_text.to_string();
        for tag in sorted {
            merged = self.insert_tag_into_plain_text(&merged, tag)?;
        }
        Ok(merged)
    }

    fn insert_tag_into_plain_text(&self, plain_text: &str, tag: &Tag) -> Result<String> {
        let plain_position = tag
            .plain_position()
            .ok_or(TagmergeError::TextMismatch { position: 0 })?;
        let span_end = plain_position + tag.text().len();
        if plain_text.get(plain_position..span_end).is_none() {
            return Err(TagmergeError::TextMismatch {
                position: plain_position,
            });
        }

        let mut updated = String::with_capacity(plain_text.len() + tag.rendered_len());
        updated.push_str(&plain_text[..plain_position]);
        updated.push_str(&tag.to_string());
        updated.push_str(&plain_text[span_end..]);
        Ok(updated)
    }

    /// True iff the sentence contains any tag that references other tags.
    /// Such sentences cannot be adopted yet: cross-reference resolution
    /// during merge is a deliberate follow-up step.
    pub fn is_sentence_unmergeable(&self, sentence: &str) -> bool {
        self.extract_tags(sentence)
            .iter()
            .any(|tag| !tag.references().is_empty())
    }
}

/// Mapping from inline-text byte index to plain-text byte index, `None` for
/// bytes that are part of markup.
fn build_index_mapping(original_text: &str) -> Vec<Option<usize>> {
    let bytes = original_text.as_bytes();
    let mut mapping = vec![None; bytes.len()];
    let mut plain_index = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            match original_text[i..].find('>') {
                Some(relative) => i += relative + 1,
                // Malformed, skip the byte
                None => i += 1,
            }
        } else {
            mapping[i] = Some(plain_index);
            plain_index += 1;
            i += 1;
        }
    }
    mapping
}
