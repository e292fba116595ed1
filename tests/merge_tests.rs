//! End-to-end merge workflow tests against the library API

use tagmerge::application::{
    prepare_adoption, AdoptionOutcome, CommandContext, CommandDispatcher, CompareService,
};
use tagmerge::domain::alignment::AlignPolicy;
use tagmerge::domain::{Document, DocumentType, TagManager, TagSchema};
use tagmerge::TagmergeError;

fn annotation(name: &str, text: &str) -> Document {
    Document::new(DocumentType::Annotation, name, "", text)
}

#[test]
fn test_adopt_undo_redo_through_dispatcher() {
    let schema = TagSchema::timeml_default();
    let manager = TagManager::new(&schema);
    let service = CompareService::new(&manager, AlignPolicy::Union);

    let documents = [
        annotation(
            "a.json",
            "The cat sat.\n\nThe dog <EVENT eid=\"e1\">ran</EVENT>.",
        ),
        annotation(
            "b.json",
            "The cat sat.\n\nThe <EVENT eid=\"e1\">dog ran</EVENT>.",
        ),
    ];
    let mut model = service.compare("merged.json", &documents).unwrap();
    let pristine = model.merged_document().unwrap().text().to_string();

    let AdoptionOutcome::Ready(command) = prepare_adoption(&model, &manager, 1).unwrap() else {
        panic!("expected ready adoption");
    };

    let mut dispatcher = CommandDispatcher::new();
    let mut ctx = CommandContext {
        model: &mut model,
        manager: &manager,
    };
    dispatcher.execute(Box::new(command), &mut ctx).unwrap();

    let adopted_text = model.merged_document().unwrap().text().to_string();
    assert_eq!(
        adopted_text,
        "The cat sat.\n\nThe dog <EVENT eid=\"e1\">ran</EVENT>."
    );
    assert_eq!(model.adopted_flags(), [true]);

    // Undo restores the merged document byte for byte
    let mut ctx = CommandContext {
        model: &mut model,
        manager: &manager,
    };
    assert!(dispatcher.undo(&mut ctx).unwrap());
    assert_eq!(model.merged_document().unwrap().text(), pristine);
    assert!(model.merged_document().unwrap().tags().is_empty());
    assert_eq!(model.adopted_flags(), [false]);

    // Redo reproduces the adopted state
    let mut ctx = CommandContext {
        model: &mut model,
        manager: &manager,
    };
    assert!(dispatcher.redo(&mut ctx).unwrap());
    assert_eq!(model.merged_document().unwrap().text(), adopted_text);
    assert_eq!(model.adopted_flags(), [true]);
}

#[test]
fn test_adopting_both_annotators_across_units() {
    let schema = TagSchema::timeml_default();
    let manager = TagManager::new(&schema);
    let service = CompareService::new(&manager, AlignPolicy::Union);

    let documents = [
        annotation(
            "a.json",
            "On <TIMEX3 tid=\"t1\">Friday</TIMEX3> it rained.\n\nThe dog <EVENT eid=\"e1\">ran</EVENT>.",
        ),
        annotation(
            "b.json",
            "On <TIMEX3 tid=\"t1\" type=\"DATE\">Friday</TIMEX3> it rained.\n\nThe <EVENT eid=\"e1\">dog ran</EVENT>.",
        ),
    ];
    let mut model = service.compare("merged.json", &documents).unwrap();
    assert_eq!(model.unit_count(), 2);

    // Unit 0: take annotator 2's version
    let AdoptionOutcome::Ready(command) = prepare_adoption(&model, &manager, 2).unwrap() else {
        panic!("expected ready adoption");
    };
    let mut dispatcher = CommandDispatcher::new();
    let mut ctx = CommandContext {
        model: &mut model,
        manager: &manager,
    };
    dispatcher.execute(Box::new(command), &mut ctx).unwrap();

    // Unit 1: take annotator 1's version
    model.next_sentences();
    model.update_panels(&manager);
    let AdoptionOutcome::Ready(command) = prepare_adoption(&model, &manager, 1).unwrap() else {
        panic!("expected ready adoption");
    };
    let mut ctx = CommandContext {
        model: &mut model,
        manager: &manager,
    };
    dispatcher.execute(Box::new(command), &mut ctx).unwrap();

    let merged = model.merged_document().unwrap();
    assert_eq!(
        merged.text(),
        "On <TIMEX3 tid=\"t1\" type=\"DATE\">Friday</TIMEX3> it rained.\n\n\
         The dog <EVENT eid=\"e1\">ran</EVENT>."
    );
    assert_eq!(model.adopted_flags(), [true, true]);
    assert_eq!(merged.tags().len(), 2);
}

#[test]
fn test_similarity_exactly_at_threshold_passes() {
    let schema = TagSchema::timeml_default();
    let manager = TagManager::new(&schema);
    let service = CompareService::new(&manager, AlignPolicy::Union);

    // 18 of 20 sentences shared: overlap ratio exactly 0.90 for both
    let a: Vec<String> = (0..20).map(|i| format!("Shared sentence {i}.")).collect();
    let mut b = a.clone();
    b[18] = "Replacement one.".to_string();
    b[19] = "Replacement two.".to_string();

    let documents = [
        annotation("a.json", &a.join("\n\n")),
        annotation("b.json", &b.join("\n\n")),
    ];
    let model = service.compare("merged.json", &documents).unwrap();
    // All sentences survive under union: 18 shared + 2 per side
    assert_eq!(
        model.merged_document().unwrap().text().split("\n\n").count(),
        22
    );
}

#[test]
fn test_similarity_below_threshold_fails() {
    let schema = TagSchema::timeml_default();
    let manager = TagManager::new(&schema);
    let service = CompareService::new(&manager, AlignPolicy::Union);

    // 17 of 20 shared: 0.85 is under the threshold
    let a: Vec<String> = (0..20).map(|i| format!("Shared sentence {i}.")).collect();
    let mut b = a.clone();
    b[17] = "Replacement one.".to_string();
    b[18] = "Replacement two.".to_string();
    b[19] = "Replacement three.".to_string();

    let documents = [
        annotation("a.json", &a.join("\n\n")),
        annotation("b.json", &b.join("\n\n")),
    ];
    let error = service.compare("merged.json", &documents).unwrap_err();
    assert!(matches!(
        error,
        TagmergeError::SimilarityTooLow { .. }
    ));
}

#[test]
fn test_intersection_policy_drops_disputed_sentences() {
    let schema = TagSchema::timeml_default();
    let manager = TagManager::new(&schema);
    let service = CompareService::new(&manager, AlignPolicy::Intersection);

    let shared: Vec<String> = (0..20).map(|i| format!("Shared sentence {i}.")).collect();
    let mut a = shared.clone();
    a.insert(5, "Only annotator one saw this.".to_string());

    let documents = [
        annotation("a.json", &a.join("\n\n")),
        annotation("b.json", &shared.join("\n\n")),
    ];
    let model = service.compare("merged.json", &documents).unwrap();
    let merged = model.merged_document().unwrap().text().to_string();
    assert!(!merged.contains("Only annotator one saw this."));
    assert_eq!(merged.split("\n\n").count(), 20);
}
