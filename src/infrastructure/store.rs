//! JSON document store
//!
//! Persists annotation documents and comparison sessions as JSON records.
//! Two record schemas are read: v1 carries the text with tags inlined, v2
//! carries plain text plus tag records with `plain_position`. Saving always
//! writes v2. Tag identity is session-scoped: loading re-extracts the tags
//! from the reassembled text, so uuids are fresh every run.

use crate::domain::comparison::ComparisonModel;
use crate::domain::document::{Document, DocumentType};
use crate::domain::manager::TagManager;
use crate::domain::tag::Tag;
use crate::error::{Result, TagmergeError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One sentence split into its plain text and tags
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SentenceRecord {
    plain_text: String,
    #[serde(default)]
    tags: Vec<Tag>,
}

/// On-disk shape of a document or comparison record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentRecord {
    document_type: DocumentType,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    file_path: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    meta_tags: IndexMap<String, Vec<String>>,

    /// Schema v1: tags inlined in the text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// Schema v2: plain text plus positioned tag records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plain_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<Tag>,

    // Comparison records only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    source_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    source_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comparison_sentences: Option<Vec<Vec<SentenceRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    adopted_flags: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    differing_to_global: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_sentence_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    merged_document: Option<Box<DocumentRecord>>,
}

/// Loads and saves documents through the tag manager, so that every loaded
/// document comes back with a consistent tag list.
pub struct DocumentStore<'m, 's> {
    manager: &'m TagManager<'s>,
}

impl<'m, 's> DocumentStore<'m, 's> {
    pub fn new(manager: &'m TagManager<'s>) -> Self {
        DocumentStore { manager }
    }

    /// Load an annotation document, upgrading v1 records on the fly
    pub fn load_document(&self, path: &Path) -> Result<Document> {
        let contents = fs::read_to_string(path)?;
        let record: DocumentRecord = serde_json::from_str(&contents)?;
        self.document_from_record(record, path)
    }

    /// Save a document as a v2 record (plain text + positioned tags)
    pub fn save_document(&self, document: &Document, path: &Path) -> Result<()> {
        let record = self.record_from_document(document);
        fs::write(path, serde_json::to_string_pretty(&record)?)?;
        Ok(())
    }

    /// Load a comparison record and rebuild the session model
    pub fn load_comparison(&self, path: &Path) -> Result<ComparisonModel> {
        let contents = fs::read_to_string(path)?;
        let record: DocumentRecord = serde_json::from_str(&contents)?;
        if record.document_type != DocumentType::Comparison {
            return Err(TagmergeError::NotComparisonDocument(
                path.display().to_string(),
            ));
        }

        let merged_record = record.merged_document.ok_or_else(|| {
            TagmergeError::NotComparisonDocument(path.display().to_string())
        })?;
        let merged = self.document_from_record(*merged_record, path)?;

        let comparison_sentences = record
            .comparison_sentences
            .unwrap_or_default()
            .into_iter()
            .map(|column| {
                column
                    .into_iter()
                    .map(|sentence| {
                        self.manager
                            .processor()
                            .merge_plain_text_and_tags(&sentence.plain_text, &sentence.tags)
                    })
                    .collect::<Result<Vec<String>>>()
            })
            .collect::<Result<Vec<Vec<String>>>>()?;

        let unit_count = comparison_sentences.first().map(Vec::len).unwrap_or(0);
        let adopted_flags = record
            .adopted_flags
            .unwrap_or_else(|| vec![false; unit_count]);

        let mut model = ComparisonModel::restore(
            record.file_name,
            record.source_names,
            record.source_paths,
            merged,
            comparison_sentences,
            adopted_flags,
            record.differing_to_global.unwrap_or_default(),
            record.current_sentence_index.unwrap_or(0),
        );
        model.update_panels(self.manager);
        Ok(model)
    }

    /// Save a comparison session, nesting the merged document's record
    pub fn save_comparison(&self, model: &ComparisonModel, path: &Path) -> Result<()> {
        let merged = model.merged_document().ok_or_else(|| {
            TagmergeError::NotComparisonDocument("no merged document loaded".to_string())
        })?;

        let comparison_sentences: Vec<Vec<SentenceRecord>> = model
            .comparison_sentences()
            .iter()
            .map(|column| {
                column
                    .iter()
                    .map(|sentence| {
                        let split = self.manager.processor().plain_text_and_tags(sentence);
                        SentenceRecord {
                            plain_text: split.plain_text,
                            tags: split.tags,
                        }
                    })
                    .collect()
            })
            .collect();

        let record = DocumentRecord {
            document_type: DocumentType::Comparison,
            file_name: model.file_name().to_string(),
            file_path: path.display().to_string(),
            meta_tags: IndexMap::new(),
            text: None,
            plain_text: None,
            tags: Vec::new(),
            source_names: model.source_names().to_vec(),
            source_paths: model.source_paths().to_vec(),
            comparison_sentences: Some(comparison_sentences),
            adopted_flags: Some(model.adopted_flags().to_vec()),
            differing_to_global: Some(model.differing_to_global().to_vec()),
            current_sentence_index: Some(model.current_index()),
            merged_document: Some(Box::new(self.record_from_document(merged))),
        };
        fs::write(path, serde_json::to_string_pretty(&record)?)?;
        Ok(())
    }

    fn document_from_record(&self, record: DocumentRecord, path: &Path) -> Result<Document> {
        let text = match (record.plain_text, record.text) {
            // v2: reassemble the inline form from plain text and tags
            (Some(plain_text), _) => self
                .manager
                .processor()
                .merge_plain_text_and_tags(&plain_text, &record.tags)?,
            // v1: the text already carries the tags
            (None, Some(text)) => text,
            (None, None) => String::new(),
        };

        let file_name = if record.file_name.is_empty() {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            record.file_name
        };

        let mut document = Document::new(
            record.document_type,
            file_name,
            path.display().to_string(),
            text,
        );
        self.manager.extract_into_document(&mut document);
        self.manager.set_meta_tags(&record.meta_tags, &mut document);
        Ok(document)
    }

    fn record_from_document(&self, document: &Document) -> DocumentRecord {
        let split = self.manager.processor().plain_text_and_tags(document.text());
        let meta_tags: IndexMap<String, Vec<String>> = document
            .meta_tags()
            .iter()
            .map(|(tag_type, tags)| {
                (
                    tag_type.clone(),
                    tags.iter().map(Tag::to_string).collect(),
                )
            })
            .collect();

        DocumentRecord {
            document_type: document.document_type(),
            file_name: document.file_name().to_string(),
            file_path: document.file_path().to_string(),
            meta_tags,
            text: None,
            plain_text: Some(split.plain_text),
            tags: split.tags,
            source_names: Vec::new(),
            source_paths: Vec::new(),
            comparison_sentences: None,
            adopted_flags: None,
            differing_to_global: None,
            current_sentence_index: None,
            merged_document: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::compare::CompareService;
    use crate::domain::alignment::AlignPolicy;
    use crate::domain::schema::TagSchema;
    use tempfile::TempDir;

    const TAGGED_TEXT: &str = "On <TIMEX3 tid=\"t1\" type=\"DATE\">Friday</TIMEX3> it rained.";

    #[test]
    fn test_load_v1_record_extracts_tags() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.json");
        fs::write(
            &path,
            serde_json::json!({
                "document_type": "annotation",
                "file_name": "doc.json",
                "file_path": "",
                "text": TAGGED_TEXT,
            })
            .to_string(),
        )
        .unwrap();

        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
        let store = DocumentStore::new(&manager);

        let document = store.load_document(&path).unwrap();
        assert_eq!(document.text(), TAGGED_TEXT);
        assert_eq!(document.tags().len(), 1);
        assert_eq!(document.tags()[0].id(), "t1");
        assert_eq!(document.tags()[0].position(), 3);
    }

    #[test]
    fn test_save_writes_v2_and_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.json");

        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
        let store = DocumentStore::new(&manager);

        let mut document =
            Document::new(DocumentType::Annotation, "doc.json", "", TAGGED_TEXT);
        manager.extract_into_document(&mut document);
        store.save_document(&document, &path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["plain_text"], "On Friday it rained.");
        assert!(value.get("text").is_none());
        assert_eq!(value["tags"].as_array().unwrap().len(), 1);

        let loaded = store.load_document(&path).unwrap();
        assert_eq!(loaded.text(), TAGGED_TEXT);
        assert_eq!(loaded.tags().len(), 1);
    }

    #[test]
    fn test_meta_tags_survive_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.json");
        fs::write(
            &path,
            serde_json::json!({
                "document_type": "annotation",
                "file_name": "doc.json",
                "file_path": "",
                "text": "plain",
                "meta_tags": {
                    "TIMEX3": ["<TIMEX3 tid=\"t0\" type=\"DATE\">2024-01-01</TIMEX3>"]
                },
            })
            .to_string(),
        )
        .unwrap();

        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
        let store = DocumentStore::new(&manager);

        let document = store.load_document(&path).unwrap();
        assert_eq!(document.meta_tags()["TIMEX3"].len(), 1);
        assert_eq!(document.meta_tags()["TIMEX3"][0].text(), "2024-01-01");

        let out = temp.path().join("out.json");
        store.save_document(&document, &out).unwrap();
        let reloaded = store.load_document(&out).unwrap();
        assert_eq!(reloaded.meta_tags()["TIMEX3"][0].id(), "t0");
    }

    #[test]
    fn test_comparison_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("merged.json");

        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
        let store = DocumentStore::new(&manager);
        let service = CompareService::new(&manager, AlignPolicy::Union);

        let documents = [
            Document::new(
                DocumentType::Annotation,
                "a.json",
                "/tmp/a.json",
                "The cat sat.\n\nThe dog <EVENT eid=\"e1\">ran</EVENT>.",
            ),
            Document::new(
                DocumentType::Annotation,
                "b.json",
                "/tmp/b.json",
                "The cat sat.\n\nThe <EVENT eid=\"e1\">dog ran</EVENT>.",
            ),
        ];
        let mut model = service.compare("merged.json", &documents).unwrap();
        model.mark_sentence_as_adopted(None);
        store.save_comparison(&model, &path).unwrap();

        let restored = store.load_comparison(&path).unwrap();
        assert_eq!(restored.unit_count(), 1);
        assert_eq!(restored.adopted_flags(), [true]);
        assert_eq!(restored.differing_to_global(), [1]);
        assert_eq!(restored.source_names(), ["a.json", "b.json"]);
        assert_eq!(
            restored.merged_document().unwrap().text(),
            "The cat sat.\n\nThe dog ran."
        );
        assert_eq!(
            restored.comparison_sentences()[1],
            ["The dog <EVENT eid=\"e1\">ran</EVENT>."]
        );
        // Panels are rebuilt for the persisted cursor position
        assert_eq!(restored.panels()[2].tags().len(), 1);
    }

    #[test]
    fn test_load_comparison_rejects_annotation_record() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doc.json");
        fs::write(
            &path,
            serde_json::json!({
                "document_type": "annotation",
                "text": "plain",
            })
            .to_string(),
        )
        .unwrap();

        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
        let store = DocumentStore::new(&manager);

        assert!(matches!(
            store.load_comparison(&path),
            Err(TagmergeError::NotComparisonDocument(_))
        ));
    }
}
