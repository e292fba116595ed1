//! Compare service
//!
//! Runs the alignment engine over a set of loaded annotation documents and
//! returns a fully initialized comparison model.

use crate::domain::alignment::{AlignPolicy, AlignmentEngine};
use crate::domain::comparison::ComparisonModel;
use crate::domain::document::Document;
use crate::domain::manager::TagManager;
use crate::error::Result;

pub struct CompareService<'m, 's> {
    manager: &'m TagManager<'s>,
    policy: AlignPolicy,
}

impl<'m, 's> CompareService<'m, 's> {
    pub fn new(manager: &'m TagManager<'s>, policy: AlignPolicy) -> Self {
        CompareService { manager, policy }
    }

    /// Align the documents and build the comparison session.
    ///
    /// The returned model carries the merged document, the differing units
    /// with the cursor on the first one, and panels holding that unit's
    /// sentences and tags.
    pub fn compare(
        &self,
        file_name: &str,
        documents: &[Document],
    ) -> Result<ComparisonModel> {
        let engine = AlignmentEngine::new(self.manager.processor(), self.policy);
        let data = engine.extract_comparison_data(documents)?;

        let mut model = ComparisonModel::new();
        model.set_comparison_data(file_name, data, documents);
        model.update_panels(self.manager);
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::DocumentType;
    use crate::domain::schema::TagSchema;

    #[test]
    fn test_compare_initializes_model() {
        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
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

        let model = service.compare("merged.json", &documents).unwrap();
        assert_eq!(model.unit_count(), 1);
        assert_eq!(model.current_index(), 0);
        assert_eq!(model.source_names(), ["a.json", "b.json"]);
        assert_eq!(
            model.merged_document().unwrap().text(),
            "The cat sat.\n\nThe dog ran."
        );

        // Panels mirror the first differing unit
        assert_eq!(model.panels()[0].text(), "The dog ran.");
        assert_eq!(model.panels()[1].tags().len(), 1);
        assert_eq!(model.panels()[1].tags()[0].text(), "ran");
    }

    #[test]
    fn test_identical_documents_have_no_units() {
        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
        let service = CompareService::new(&manager, AlignPolicy::Union);

        let text = "Same <EVENT eid=\"e1\">thing</EVENT>.";
        let documents = [
            Document::new(DocumentType::Annotation, "a.json", "", text),
            Document::new(DocumentType::Annotation, "b.json", "", text),
        ];

        let model = service.compare("merged.json", &documents).unwrap();
        assert_eq!(model.unit_count(), 0);
        assert_eq!(model.merged_document().unwrap().text(), "Same thing.");
    }
}
