//! Sentence alignment across annotated renditions
//!
//! Several annotators tag the same underlying text independently; their
//! copies may drift apart by a few inserted or removed sentences. The
//! alignment engine lines the renditions up sentence by sentence on their
//! markup-free form, then singles out the sentences whose annotations
//! genuinely differ once display ids are ignored.

use crate::domain::document::{Document, DocumentType};
use crate::domain::processor::TagProcessor;
use crate::error::{Result, TagmergeError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// How to treat sentences missing from some renditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignPolicy {
    /// Keep every sentence from every rendition, in relative order
    #[default]
    Union,

    /// Keep only sentences present in all renditions
    Intersection,
}

fn whitespace_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Outcome of a comparison run, ready to install into a comparison model
#[derive(Debug, Clone)]
pub struct ComparisonData {
    /// Parallel sentence lists: index 0 holds the raw differing sentences,
    /// index i+1 holds annotator i's tagged version of each.
    pub comparison_sentences: Vec<Vec<String>>,

    /// Maps each differing-unit index to its sentence index in the merged text
    pub differing_to_global: Vec<usize>,

    /// Merged output document, raw sentences joined by blank lines, no tags
    pub merged_document: Document,
}

/// Aligns annotated renditions and extracts their differing sentences.
pub struct AlignmentEngine<'s> {
    processor: &'s TagProcessor<'s>,
    policy: AlignPolicy,
    similarity_threshold: f64,
    max_lookahead: usize,
}

impl<'s> AlignmentEngine<'s> {
    pub fn new(processor: &'s TagProcessor<'s>, policy: AlignPolicy) -> Self {
        AlignmentEngine {
            processor,
            policy,
            similarity_threshold: 0.90,
            max_lookahead: 10,
        }
    }

    /// Run the full comparison pipeline over the renditions.
    ///
    /// Splits each text into normalized sentences, aligns them under the
    /// configured policy, and collects the sentences whose annotations
    /// differ once id and reference attributes are stripped. The merged
    /// document starts from the aligned raw text with no tags.
    pub fn extract_comparison_data(&self, documents: &[Document]) -> Result<ComparisonData> {
        let tagged_texts: Vec<Vec<String>> = documents
            .iter()
            .map(|document| self.prepare_text(document.text()))
            .collect();
        let clean_texts: Vec<Vec<String>> = tagged_texts
            .iter()
            .map(|sentences| {
                sentences
                    .iter()
                    .map(|sentence| self.processor.delete_all_tags_from_text(sentence))
                    .collect()
            })
            .collect();

        let (aligned_tagged, aligned_clean) = self.align_texts(&tagged_texts, &clean_texts)?;
        let raw_text = &aligned_clean[0];

        let mut comparison_sentences = vec![Vec::new(); aligned_tagged.len() + 1];
        let mut differing_to_global = Vec::new();

        for global_index in 0..aligned_tagged[0].len() {
            let stripped: Vec<String> = aligned_tagged
                .iter()
                .map(|sentences| self.processor.remove_ids_from_tags(&sentences[global_index]))
                .collect();

            if stripped.iter().any(|sentence| *sentence != stripped[0]) {
                comparison_sentences[0].push(raw_text[global_index].clone());
                for (list, sentences) in comparison_sentences[1..].iter_mut().zip(&aligned_tagged) {
                    list.push(sentences[global_index].clone());
                }
                differing_to_global.push(global_index);
            }
        }

        let merged_document =
            Document::new(DocumentType::Comparison, "", "", raw_text.join("\n\n"));

        Ok(ComparisonData {
            comparison_sentences,
            differing_to_global,
            merged_document,
        })
    }

    /// Split text into sentences on blank lines, collapsing inner whitespace
    pub fn prepare_text(&self, text: &str) -> Vec<String> {
        text.split("\n\n")
            .map(|sentence| {
                whitespace_regex()
                    .replace_all(sentence.trim(), " ")
                    .into_owned()
            })
            .collect()
    }

    /// Align the renditions sentence by sentence on their clean form.
    ///
    /// Fully identical renditions pass through untouched. Otherwise each
    /// rendition must share at least the similarity threshold of its
    /// sentence set with the others. Alignment then walks all renditions in
    /// lock step: matching rows are emitted directly, and on a mismatch the
    /// sentences are searched for within a bounded lookahead window of the
    /// other renditions. A sentence the others never catch up to is emitted
    /// for all columns (union) or skipped (intersection). When every
    /// current sentence appears later somewhere, union falls back to the
    /// first rendition's sentence, while intersection reports the alignment
    /// as ambiguous.
    pub fn align_texts(
        &self,
        texts: &[Vec<String>],
        clean_texts: &[Vec<String>],
    ) -> Result<(Vec<Vec<String>>, Vec<Vec<String>>)> {
        let clean_sets: Vec<HashSet<&String>> = clean_texts
            .iter()
            .map(|sentences| sentences.iter().collect())
            .collect();
        let mut common: HashSet<&String> = clean_sets[0].clone();
        for set in &clean_sets[1..] {
            common.retain(|sentence| set.contains(*sentence));
        }

        if clean_sets.iter().all(|set| *set == common) {
            return Ok((texts.to_vec(), clean_texts.to_vec()));
        }

        let ratios = clean_sets
            .iter()
            .map(|set| common.len() as f64 / set.len() as f64);
        if let Some(min_ratio) = ratios
            .filter(|ratio| *ratio < self.similarity_threshold)
            .min_by(f64::total_cmp)
        {
            return Err(TagmergeError::SimilarityTooLow {
                ratio: min_ratio,
                threshold: self.similarity_threshold,
            });
        }

        let mut aligned_texts: Vec<Vec<String>> = vec![Vec::new(); texts.len()];
        let mut aligned_clean: Vec<Vec<String>> = vec![Vec::new(); clean_texts.len()];
        let mut indices = vec![0usize; clean_texts.len()];

        let current_elements = |indices: &[usize]| -> Vec<String> {
            clean_texts
                .iter()
                .zip(indices)
                .map(|(clean, &index)| clean.get(index).cloned().unwrap_or_default())
                .collect()
        };
        let all_equal =
            |sentences: &[&String]| sentences[1..].iter().all(|sentence| **sentence == *sentences[0]);

        while indices
            .iter()
            .zip(clean_texts)
            .any(|(&index, clean)| index < clean.len())
        {
            let elements = current_elements(&indices);
            if all_equal(&elements.iter().collect::<Vec<_>>()) {
                for column in 0..texts.len() {
                    let index = indices[column];
                    aligned_texts[column]
                        .push(texts[column].get(index).cloned().unwrap_or_default());
                    aligned_clean[column]
                        .push(clean_texts[column].get(index).cloned().unwrap_or_default());
                }
                for index in indices.iter_mut() {
                    *index += 1;
                }
                continue;
            }

            // A sentence that no other rendition has coming up within the
            // lookahead window must be unique to its column.
            let buffers: Vec<&[String]> = clean_texts
                .iter()
                .zip(&indices)
                .map(|(clean, &index)| {
                    let start = (index + 1).min(clean.len());
                    let end = (index + self.max_lookahead).min(clean.len());
                    &clean[start..end]
                })
                .collect();

            // Exhausted columns cannot contribute candidates
            let mut candidates: Vec<(String, usize)> = elements
                .iter()
                .enumerate()
                .filter(|(column, sentence)| {
                    indices[*column] < clean_texts[*column].len()
                        && buffers.iter().all(|buffer| !buffer.contains(sentence))
                })
                .map(|(column, sentence)| (sentence.clone(), column))
                .collect();

            if candidates.is_empty() {
                // Every current sentence appears again later somewhere, so
                // the renditions are reordered or hold mismatched duplicates.
                match self.policy {
                    AlignPolicy::Intersection => {
                        return Err(TagmergeError::AmbiguousAlignment);
                    }
                    AlignPolicy::Union => {
                        let column = indices
                            .iter()
                            .zip(clean_texts)
                            .position(|(&index, clean)| index < clean.len())
                            .unwrap_or(0);
                        candidates = vec![(elements[column].clone(), column)];
                    }
                }
            }

            if self.policy == AlignPolicy::Intersection {
                for (_, column) in &candidates {
                    indices[*column] += 1;
                }
                continue;
            }

            if !all_equal(&candidates.iter().map(|(s, _)| s).collect::<Vec<_>>()) {
                // Several distinct unique sentences compete; emit the most
                // frequent one first (earliest column wins ties).
                let mut counts: Vec<(&String, usize)> = Vec::new();
                for (sentence, _) in &candidates {
                    match counts.iter_mut().find(|(seen, _)| *seen == sentence) {
                        Some((_, count)) => *count += 1,
                        None => counts.push((sentence, 1)),
                    }
                }
                let mut most_frequent = String::new();
                let mut best_count = 0;
                for (sentence, count) in &counts {
                    if *count > best_count {
                        most_frequent = (*sentence).clone();
                        best_count = *count;
                    }
                }
                candidates.retain(|(sentence, _)| *sentence == most_frequent);
            }

            let chosen_column = candidates[0].1;
            let chosen_index = indices[chosen_column];
            let chosen_text = texts[chosen_column]
                .get(chosen_index)
                .cloned()
                .unwrap_or_default();
            let chosen_clean = clean_texts[chosen_column]
                .get(chosen_index)
                .cloned()
                .unwrap_or_default();
            for column in 0..texts.len() {
                aligned_texts[column].push(chosen_text.clone());
                aligned_clean[column].push(chosen_clean.clone());
            }

            for (_, column) in &candidates {
                indices[*column] += 1;
            }
        }

        Ok((aligned_texts, aligned_clean))
    }
}
