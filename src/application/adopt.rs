//! Sentence adoption
//!
//! Adopting takes one annotator's version of the unit under the cursor and
//! copies its tags into the merged document at the sentence's offset. The
//! operation is a command: undo removes exactly the inserted tags and redo
//! repeats the insertion. Situations where adoption must not happen are
//! refusals reported as values, not errors.

use crate::application::command::{Command, CommandContext};
use crate::domain::comparison::ComparisonModel;
use crate::domain::manager::TagManager;
use crate::domain::tag::Tag;
use crate::error::{Result, TagmergeError};
use std::fmt;
use uuid::Uuid;

/// Why an adoption request was declined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalReason {
    /// The current unit has already been adopted
    AlreadyAdopted,

    /// The sentence's tags reference other tags; those links cannot be
    /// carried into the merged document yet
    UnresolvedReferences,
}

impl fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefusalReason::AlreadyAdopted => {
                write!(f, "this sentence has already been adopted")
            }
            RefusalReason::UnresolvedReferences => {
                write!(
                    f,
                    "the sentence contains tags with references to other tags"
                )
            }
        }
    }
}

/// Result of the pre-adoption checks
pub enum AdoptionOutcome {
    Ready(AdoptCommand),
    Refused(RefusalReason),
}

/// Check refusal conditions and build the command for one adoption.
///
/// `annotator_column` indexes the comparison columns, where column 1 is the
/// first annotator. The model's panels must be up to date for the current
/// unit.
pub fn prepare_adoption(
    model: &ComparisonModel,
    manager: &TagManager,
    annotator_column: usize,
) -> Result<AdoptionOutcome> {
    let data = model.get_adoption_data(annotator_column)?;
    if data.is_adopted {
        return Ok(AdoptionOutcome::Refused(RefusalReason::AlreadyAdopted));
    }
    if manager.processor().is_sentence_unmergeable(&data.sentence) {
        return Ok(AdoptionOutcome::Refused(
            RefusalReason::UnresolvedReferences,
        ));
    }
    Ok(AdoptionOutcome::Ready(AdoptCommand::new(data.sentence_tags)))
}

/// Adopts a list of tags into the merged document.
///
/// The stored source tags keep sentence-local positions until execute shifts
/// them by the unit's offset in the merged text; undo shifts them back, so
/// the command can be replayed. Inserted tags always get fresh uuids.
pub struct AdoptCommand {
    tags: Vec<Tag>,
    inserted_uuids: Vec<Uuid>,
    sentence_offset: usize,
    marked_index: Option<usize>,
    executed: bool,
    undone: bool,
    redone: bool,
}

impl AdoptCommand {
    pub fn new(tags: Vec<Tag>) -> Self {
        AdoptCommand {
            tags,
            inserted_uuids: Vec::new(),
            sentence_offset: 0,
            marked_index: None,
            executed: false,
            undone: true,
            redone: true,
        }
    }

    pub fn inserted_uuids(&self) -> &[Uuid] {
        &self.inserted_uuids
    }

    fn insert_tags(&mut self, ctx: &mut CommandContext) -> Result<()> {
        let CommandContext { model, manager } = ctx;
        let offset = self.sentence_offset as isize;
        for tag in &mut self.tags {
            tag.shift_position(offset);
        }

        let merged = model.merged_document_mut().ok_or_else(|| {
            TagmergeError::NotComparisonDocument("no merged document loaded".to_string())
        })?;
        for tag in &self.tags {
            let mut adopted = tag.clone();
            adopted.set_uuid(Uuid::new_v4());
            self.inserted_uuids.push(manager.add_tag(adopted, merged)?);
        }
        Ok(())
    }
}

impl Command for AdoptCommand {
    fn execute(&mut self, ctx: &mut CommandContext) -> Result<()> {
        if self.executed {
            return Ok(());
        }

        self.sentence_offset = ctx.model.get_sentence_offset()?;
        self.insert_tags(ctx)?;
        self.marked_index = ctx.model.mark_sentence_as_adopted(None);

        self.executed = true;
        self.undone = false;
        Ok(())
    }

    fn undo(&mut self, ctx: &mut CommandContext) -> Result<()> {
        if self.undone {
            return Ok(());
        }

        let CommandContext { model, manager } = ctx;
        let merged = model.merged_document_mut().ok_or_else(|| {
            TagmergeError::NotComparisonDocument("no merged document loaded".to_string())
        })?;
        for uuid in self.inserted_uuids.drain(..) {
            manager.delete_tag(uuid, merged)?;
        }

        let offset = -(self.sentence_offset as isize);
        for tag in &mut self.tags {
            tag.shift_position(offset);
        }

        if let Some(index) = self.marked_index {
            model.unmark_sentence_as_adopted(index)?;
        }

        self.undone = true;
        self.redone = false;
        Ok(())
    }

    fn redo(&mut self, ctx: &mut CommandContext) -> Result<()> {
        if self.redone {
            return Ok(());
        }

        self.insert_tags(ctx)?;
        self.marked_index = ctx.model.mark_sentence_as_adopted(self.marked_index);

        self.redone = true;
        self.undone = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::compare::CompareService;
    use crate::domain::alignment::{AlignPolicy, ComparisonData};
    use crate::domain::document::{Document, DocumentType};
    use crate::domain::schema::TagSchema;

    // Two annotators disagree on the third sentence; the differing unit
    // starts at byte offset 14 of the merged text.
    fn cat_model(manager: &TagManager) -> ComparisonModel {
        let merged = Document::new(
            DocumentType::Comparison,
            "",
            "",
            "The cat sat.\n\nThe dog ran.",
        );
        let data = ComparisonData {
            comparison_sentences: vec![
                vec!["The dog ran.".to_string()],
                vec!["The dog <EVENT eid=\"e1\">ran</EVENT>.".to_string()],
                vec!["The <EVENT eid=\"e1\">dog ran</EVENT>.".to_string()],
            ],
            differing_to_global: vec![1],
            merged_document: merged,
        };
        let sources = [
            Document::new(DocumentType::Annotation, "a.json", "/tmp/a.json", ""),
            Document::new(DocumentType::Annotation, "b.json", "/tmp/b.json", ""),
        ];
        let mut model = ComparisonModel::new();
        model.set_comparison_data("merged.json", data, &sources);
        model.update_panels(manager);
        model
    }

    #[test]
    fn test_execute_inserts_at_sentence_offset() {
        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
        let mut model = cat_model(&manager);

        let AdoptionOutcome::Ready(mut command) = prepare_adoption(&model, &manager, 1).unwrap()
        else {
            panic!("expected ready adoption");
        };
        let mut ctx = CommandContext {
            model: &mut model,
            manager: &manager,
        };
        command.execute(&mut ctx).unwrap();

        let merged = model.merged_document().unwrap();
        assert_eq!(
            merged.text(),
            "The cat sat.\n\nThe dog <EVENT eid=\"e1\">ran</EVENT>."
        );
        assert_eq!(merged.tags().len(), 1);
        assert_eq!(merged.tags()[0].position(), 14 + 8);
        assert_eq!(model.adopted_flags(), [true]);
    }

    #[test]
    fn test_undo_restores_merged_text_exactly() {
        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
        let mut model = cat_model(&manager);
        let original = model.merged_document().unwrap().text().to_string();

        let AdoptionOutcome::Ready(mut command) = prepare_adoption(&model, &manager, 2).unwrap()
        else {
            panic!("expected ready adoption");
        };
        let mut ctx = CommandContext {
            model: &mut model,
            manager: &manager,
        };
        command.execute(&mut ctx).unwrap();
        let mut ctx = CommandContext {
            model: &mut model,
            manager: &manager,
        };
        command.undo(&mut ctx).unwrap();

        let merged = model.merged_document().unwrap();
        assert_eq!(merged.text(), original);
        assert!(merged.tags().is_empty());
        assert_eq!(model.adopted_flags(), [false]);
    }

    #[test]
    fn test_redo_reinserts_with_fresh_uuids() {
        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
        let mut model = cat_model(&manager);

        let AdoptionOutcome::Ready(mut command) = prepare_adoption(&model, &manager, 1).unwrap()
        else {
            panic!("expected ready adoption");
        };
        let mut ctx = CommandContext {
            model: &mut model,
            manager: &manager,
        };
        command.execute(&mut ctx).unwrap();
        let first_uuids = command.inserted_uuids().to_vec();
        let after_execute = model.merged_document().unwrap().text().to_string();

        let mut ctx = CommandContext {
            model: &mut model,
            manager: &manager,
        };
        command.undo(&mut ctx).unwrap();
        let mut ctx = CommandContext {
            model: &mut model,
            manager: &manager,
        };
        command.redo(&mut ctx).unwrap();

        assert_eq!(model.merged_document().unwrap().text(), after_execute);
        assert_eq!(model.adopted_flags(), [true]);
        assert_ne!(command.inserted_uuids(), first_uuids.as_slice());
    }

    #[test]
    fn test_execute_twice_is_noop() {
        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
        let mut model = cat_model(&manager);

        let AdoptionOutcome::Ready(mut command) = prepare_adoption(&model, &manager, 1).unwrap()
        else {
            panic!("expected ready adoption");
        };
        let mut ctx = CommandContext {
            model: &mut model,
            manager: &manager,
        };
        command.execute(&mut ctx).unwrap();
        let after_first = model.merged_document().unwrap().text().to_string();

        let mut ctx = CommandContext {
            model: &mut model,
            manager: &manager,
        };
        command.execute(&mut ctx).unwrap();
        assert_eq!(model.merged_document().unwrap().text(), after_first);
        assert_eq!(model.merged_document().unwrap().tags().len(), 1);
    }

    #[test]
    fn test_adoption_after_identical_documents_is_an_error() {
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

        // Nothing to adopt from; an error, never a panic
        assert!(matches!(
            prepare_adoption(&model, &manager, 1),
            Err(TagmergeError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_already_adopted_is_refused() {
        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);
        let mut model = cat_model(&manager);
        model.mark_sentence_as_adopted(None);

        match prepare_adoption(&model, &manager, 1).unwrap() {
            AdoptionOutcome::Refused(reason) => {
                assert_eq!(reason, RefusalReason::AlreadyAdopted);
            }
            AdoptionOutcome::Ready(_) => panic!("expected refusal"),
        }
    }

    #[test]
    fn test_sentence_with_references_is_refused() {
        let schema = TagSchema::timeml_default();
        let manager = TagManager::new(&schema);

        let merged = Document::new(DocumentType::Comparison, "", "", "Due later.");
        let data = ComparisonData {
            comparison_sentences: vec![
                vec!["Due later.".to_string()],
                vec![
                    "Due <TIMEX3 tid=\"t2\" anchorTimeID=\"t1\">later</TIMEX3>.".to_string(),
                ],
            ],
            differing_to_global: vec![0],
            merged_document: merged,
        };
        let sources = [Document::new(DocumentType::Annotation, "a.json", "", "")];
        let mut model = ComparisonModel::new();
        model.set_comparison_data("merged.json", data, &sources);
        model.update_panels(&manager);

        match prepare_adoption(&model, &manager, 1).unwrap() {
            AdoptionOutcome::Refused(reason) => {
                assert_eq!(reason, RefusalReason::UnresolvedReferences);
            }
            AdoptionOutcome::Ready(_) => panic!("expected refusal"),
        }
    }
}
