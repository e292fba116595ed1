//! Comparison model
//!
//! Holds the state of a comparison session: the merged output document, the
//! differing sentence units with one column per annotator, adoption flags,
//! and the cursor over the units. Navigation wraps around; the per-column
//! panel documents mirror the unit under the cursor so that callers can
//! inspect its tags without re-parsing.

use crate::domain::alignment::ComparisonData;
use crate::domain::document::{Document, DocumentType};
use crate::domain::manager::TagManager;
use crate::domain::tag::Tag;
use crate::error::{Result, TagmergeError};

/// Shown in the raw panel when no differing units remain
pub const NO_MORE_SENTENCES: &str = "NO MORE DIFFERING SENTENCES.";

/// Everything the adopt command needs about the unit under the cursor
#[derive(Debug, Clone)]
pub struct AdoptionData {
    /// Tags of the chosen annotator's version of the sentence
    pub sentence_tags: Vec<Tag>,

    /// The chosen annotator's tagged sentence
    pub sentence: String,

    /// Whether this unit was already adopted
    pub is_adopted: bool,
}

/// State of one comparison/merge session
#[derive(Debug, Clone, Default)]
pub struct ComparisonModel {
    file_name: String,
    source_names: Vec<String>,
    source_paths: Vec<String>,
    panels: Vec<Document>,
    merged_document: Option<Document>,
    comparison_sentences: Vec<Vec<String>>,
    adopted_flags: Vec<bool>,
    differing_to_global: Vec<usize>,
    current_index: usize,
}

impl ComparisonModel {
    pub fn new() -> Self {
        ComparisonModel::default()
    }

    /// Install a fresh comparison result.
    ///
    /// Builds one panel per column (raw first, then one per source
    /// document), clears the adoption flags, and points the cursor at the
    /// first unit.
    pub fn set_comparison_data(
        &mut self,
        file_name: impl Into<String>,
        data: ComparisonData,
        sources: &[Document],
    ) {
        self.file_name = file_name.into();
        self.source_names = sources
            .iter()
            .map(|document| document.file_name().to_string())
            .collect();
        self.source_paths = sources
            .iter()
            .map(|document| document.file_path().to_string())
            .collect();

        self.panels = Vec::with_capacity(sources.len() + 1);
        self.panels
            .push(Document::new(DocumentType::Comparison, "", "", ""));
        for source in sources {
            self.panels.push(Document::new(
                DocumentType::Annotation,
                source.file_name(),
                source.file_path(),
                "",
            ));
        }

        self.adopted_flags = vec![false; data.comparison_sentences[0].len()];
        self.comparison_sentences = data.comparison_sentences;
        self.differing_to_global = data.differing_to_global;
        self.merged_document = Some(data.merged_document);
        self.current_index = 0;
    }

    /// Rebuild a model from persisted state
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        file_name: String,
        source_names: Vec<String>,
        source_paths: Vec<String>,
        merged_document: Document,
        comparison_sentences: Vec<Vec<String>>,
        adopted_flags: Vec<bool>,
        differing_to_global: Vec<usize>,
        current_index: usize,
    ) -> Self {
        let mut panels = Vec::with_capacity(comparison_sentences.len());
        panels.push(Document::new(DocumentType::Comparison, "", "", ""));
        for (name, path) in source_names.iter().zip(&source_paths) {
            panels.push(Document::new(DocumentType::Annotation, name, path, ""));
        }
        ComparisonModel {
            file_name,
            source_names,
            source_paths,
            panels,
            merged_document: Some(merged_document),
            comparison_sentences,
            adopted_flags,
            differing_to_global,
            current_index,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source_names(&self) -> &[String] {
        &self.source_names
    }

    pub fn source_paths(&self) -> &[String] {
        &self.source_paths
    }

    pub fn merged_document(&self) -> Option<&Document> {
        self.merged_document.as_ref()
    }

    pub fn merged_document_mut(&mut self) -> Option<&mut Document> {
        self.merged_document.as_mut()
    }

    pub fn comparison_sentences(&self) -> &[Vec<String>] {
        &self.comparison_sentences
    }

    pub fn adopted_flags(&self) -> &[bool] {
        &self.adopted_flags
    }

    pub fn differing_to_global(&self) -> &[usize] {
        &self.differing_to_global
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn set_current_index(&mut self, index: usize) -> Result<()> {
        if index >= self.unit_count() {
            return Err(TagmergeError::IndexOutOfRange {
                index,
                len: self.unit_count(),
            });
        }
        self.current_index = index;
        Ok(())
    }

    /// Number of differing units
    pub fn unit_count(&self) -> usize {
        self.comparison_sentences
            .first()
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// The sentence of every column at the current unit
    pub fn current_sentences(&self) -> Vec<String> {
        self.comparison_sentences
            .iter()
            .map(|sentences| sentences[self.current_index].clone())
            .collect()
    }

    /// Advance the cursor, wrapping past the last unit
    pub fn next_sentences(&mut self) -> Vec<String> {
        if self.unit_count() == 0 {
            return Vec::new();
        }
        self.current_index = (self.current_index + 1) % self.unit_count();
        self.current_sentences()
    }

    /// Move the cursor back, wrapping before the first unit
    pub fn previous_sentences(&mut self) -> Vec<String> {
        if self.unit_count() == 0 {
            return Vec::new();
        }
        self.current_index = (self.current_index + self.unit_count() - 1) % self.unit_count();
        self.current_sentences()
    }

    /// Refresh the panel documents to mirror the unit under the cursor
    pub fn update_panels(&mut self, manager: &TagManager) {
        if self.unit_count() == 0 {
            if let Some(first) = self.panels.first_mut() {
                first.set_text(NO_MORE_SENTENCES);
                first.set_tags(Vec::new());
            }
            for panel in self.panels.iter_mut().skip(1) {
                panel.set_text("");
                panel.set_tags(Vec::new());
            }
            return;
        }

        for (panel, sentences) in self.panels.iter_mut().zip(&self.comparison_sentences) {
            panel.set_text(sentences[self.current_index].clone());
            manager.extract_into_document(panel);
        }
    }

    pub fn panels(&self) -> &[Document] {
        &self.panels
    }

    /// Mark a unit (the current one by default) as adopted.
    ///
    /// Returns the marked index, or `None` when there are no units.
    pub fn mark_sentence_as_adopted(&mut self, index: Option<usize>) -> Option<usize> {
        let index = index.unwrap_or(self.current_index);
        if index >= self.adopted_flags.len() {
            return None;
        }
        self.adopted_flags[index] = true;
        Some(index)
    }

    /// Clear the adopted flag of a unit
    pub fn unmark_sentence_as_adopted(&mut self, index: usize) -> Result<()> {
        if index >= self.adopted_flags.len() {
            return Err(TagmergeError::IndexOutOfRange {
                index,
                len: self.adopted_flags.len(),
            });
        }
        self.adopted_flags[index] = false;
        Ok(())
    }

    /// Collect the current unit's data for the given annotator column.
    ///
    /// Column 1 is the first annotator; column 0 is the raw text and cannot
    /// be adopted from.
    pub fn get_adoption_data(&self, adoption_index: usize) -> Result<AdoptionData> {
        if adoption_index == 0 || adoption_index >= self.comparison_sentences.len() {
            return Err(TagmergeError::IndexOutOfRange {
                index: adoption_index,
                len: self.comparison_sentences.len(),
            });
        }
        // A comparison with no differing units has columns but no rows
        if self.current_index >= self.unit_count() {
            return Err(TagmergeError::IndexOutOfRange {
                index: self.current_index,
                len: self.unit_count(),
            });
        }
        Ok(AdoptionData {
            sentence_tags: self.panels[adoption_index].tags().to_vec(),
            sentence: self.comparison_sentences[adoption_index][self.current_index].clone(),
            is_adopted: self.adopted_flags[self.current_index],
        })
    }

    /// Byte offset of the current unit's sentence in the merged text.
    ///
    /// Sums the lengths of all preceding sentences plus their blank-line
    /// separators.
    pub fn get_sentence_offset(&self) -> Result<usize> {
        if self.current_index >= self.differing_to_global.len() {
            return Err(TagmergeError::IndexOutOfRange {
                index: self.current_index,
                len: self.differing_to_global.len(),
            });
        }
        let global_index = self.differing_to_global[self.current_index];
        let merged_text = self
            .merged_document
            .as_ref()
            .map(Document::text)
            .unwrap_or_default();

        let separator_len = "\n\n".len();
        let offset = merged_text
            .split("\n\n")
            .take(global_index)
            .map(|sentence| sentence.len() + separator_len)
            .sum();
        Ok(offset)
    }
}
