//! Integration tests for execflow

use execflow::{
    AnswerValue, CaptureOutcome, ChoiceOption, ChoiceQuestion, Direction, FlowEditor, FlowRepository,
    FlowSimulator, ImageFile, ImageUploadQuestion, InMemoryFlowStore, InventoryItem,
    InventoryKind, InventoryStatus, OptionPatch, Question, QuestionKind, QuestionPatch,
    QuestionType, RecordingPreviews, Rejection, SequentialIds, StaticInventory,
    StockControlQuestion, StockSeed, StepPatch, TextQuestion, flow_with_steps, wire,
};
use rust_decimal::Decimal;

fn text(id: &str) -> Question {
    Question::new(id, 0).with_title(id)
}

fn yes_no_question() -> Question {
    Question::new("q1", 1)
        .with_title("Did the client approve?")
        .with_kind(QuestionKind::SingleSelect(ChoiceQuestion::new(vec![
            ChoiceOption::with_value("opt-yes", "Yes", "yes").with_extra_answer(Some(10)),
            ChoiceOption::with_value("opt-no", "No", "no"),
        ])))
}

fn photo_question(max_images: Option<usize>) -> Question {
    Question::new("photos", 1)
        .with_title("Before photos")
        .with_kind(QuestionKind::ImageUpload(ImageUploadQuestion {
            max_images,
            accepted_image_types: vec!["image/jpeg".into()],
        }))
}

fn stock_question(inventory: InventoryKind, seeds: Vec<StockSeed>) -> Question {
    Question::new("stock", 1)
        .with_title("Products used")
        .with_kind(QuestionKind::StockControl(StockControlQuestion {
            inventory,
            default_stock_items: seeds,
        }))
}

fn products() -> Vec<InventoryItem> {
    vec![
        InventoryItem::new("p1", "Shampoo").with_price(Decimal::new(1990, 2)),
        InventoryItem::new("p2", "Conditioner").with_price(Decimal::new(2500, 2)),
    ]
}

fn files(names: &[&str]) -> Vec<ImageFile> {
    names
        .iter()
        .map(|name| ImageFile::new(*name, "image/jpeg"))
        .collect()
}

// ============================================================================
// Editor
// ============================================================================

#[test]
fn test_select_to_text_clears_options_and_back_stays_empty() {
    let mut editor = FlowEditor::new(SequentialIds::new("e"));
    let step = editor.draft().steps[0].id.clone();
    let q = editor.add_question(&step).unwrap();
    editor.update_question(
        &step,
        &q,
        QuestionPatch::new().question_type(QuestionType::SingleSelect),
    );
    let option = editor.add_option(&step, &q).unwrap();
    editor.update_option(
        &step,
        &q,
        &option,
        OptionPatch::new().title("Yes").value("yes"),
    );

    let options = |editor: &FlowEditor<SequentialIds>| {
        editor.draft().steps[0].questions[0].options().len()
    };
    assert_eq!(options(&editor), 1);

    editor.update_question(&step, &q, QuestionPatch::new().question_type(QuestionType::Text));
    assert_eq!(options(&editor), 0);

    editor.update_question(
        &step,
        &q,
        QuestionPatch::new().question_type(QuestionType::SingleSelect),
    );
    assert_eq!(options(&editor), 0);
}

#[test]
fn test_move_first_up_and_last_down_are_noops() {
    let mut editor = FlowEditor::new(SequentialIds::new("e"));
    editor.add_step();
    editor.add_step();
    let before = editor.draft().clone();
    let first = before.steps[0].id.clone();
    let last = before.steps[2].id.clone();

    assert!(!editor.move_step(&first, Direction::Up));
    assert!(!editor.move_step(&last, Direction::Down));
    assert_eq!(editor.draft(), &before);
}

#[tokio::test]
async fn test_save_creates_then_updates() {
    let store = InMemoryFlowStore::new();
    let mut editor = FlowEditor::new(SequentialIds::new("e"));
    editor.set_title("Manicure");
    let step = editor.draft().steps[0].id.clone();
    editor.update_step(&step, StepPatch::new().title("Prep"));

    let err = editor.save(&store).await.unwrap_err();
    assert!(err.report().is_some_and(|r| !r.steps[0].has_questions));
    assert!(store.is_empty());

    let q = editor.add_question(&step).unwrap();
    editor.update_question(&step, &q, QuestionPatch::new().title("Nail shape"));
    let created = editor.save(&store).await.unwrap();
    assert_eq!(editor.flow_id(), Some(created.id.as_str()));

    editor.set_title("Manicure deluxe");
    let updated = editor.save(&store).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(store.len(), 1);

    let fetched = store.get_flow(&created.id).await.unwrap();
    assert_eq!(fetched.title, "Manicure deluxe");
    assert_eq!(fetched.draft(), *editor.draft());
}

#[tokio::test]
async fn test_failed_save_leaves_editor_retryable() {
    let store = InMemoryFlowStore::new();
    let mut editor = FlowEditor::new(SequentialIds::new("e"));
    editor.set_title("Color");
    let step = editor.draft().steps[0].id.clone();
    editor.update_step(&step, StepPatch::new().title("Mix"));
    let q = editor.add_question(&step).unwrap();
    editor.update_question(&step, &q, QuestionPatch::new().title("Tone"));
    let before = editor.draft().clone();

    store.fail_with("backend down");
    let err = editor.save(&store).await.unwrap_err();
    assert!(err.report().is_none());
    assert_eq!(err.to_string(), "failed to save flow: backend down");
    assert_eq!(editor.draft(), &before);
    assert!(editor.flow_id().is_none());

    store.recover();
    assert!(editor.save(&store).await.is_ok());
}

// ============================================================================
// Wire
// ============================================================================

#[test]
fn test_integer_type_three_is_single_select() {
    let flows = wire::deserialize_flows(
        r#"[{
            "id": "f1",
            "title": "Flow",
            "createdAt": "2025-01-10T12:00:00Z",
            "updatedAt": "2025-01-11T12:00:00Z",
            "steps": [{"id": "s1", "title": "S", "stepNumber": 1, "questions": [
                {"id": "q1", "order": 1, "title": "Q", "type": 3, "options": []}
            ]}]
        }]"#,
    )
    .unwrap();
    assert_eq!(
        flows[0].steps[0].questions[0].question_type(),
        QuestionType::SingleSelect
    );
}

#[test]
fn test_zero_limits_from_the_api_do_not_block_answers() {
    let flow = wire::deserialize_flow(
        r#"{"id": "f1", "title": "Flow", "steps": [{"id": "s1", "title": "S", "questions": [
            {"id": "photos", "order": 1, "title": "Photos", "type": 5, "maxImages": 0},
            {"id": "notes", "order": 2, "title": "Notes", "type": 1, "maxLength": 0}
        ]}]}"#,
    )
    .unwrap();
    let previews = RecordingPreviews::new();
    let mut sim = FlowSimulator::new(flow, previews.clone());

    assert!(
        sim.attach_images("photos", &files(&["a.jpg", "b.jpg"]))
            .is_recorded()
    );
    assert_eq!(sim.answers().get_images("photos").unwrap().len(), 2);
    assert!(sim.set_text("notes", "Fringe trimmed").is_recorded());
    assert!(sim.can_submit());
    assert_eq!(previews.acquired_count(), 2);
}

// ============================================================================
// Simulator navigation
// ============================================================================

#[test]
fn test_next_without_answers_stays_on_first_step() {
    let flow = flow_with_steps(vec![vec![text("a")], vec![text("b")], vec![text("c")]]);
    let mut sim = FlowSimulator::new(flow, RecordingPreviews::new());

    assert!(!sim.next());
    assert!(!sim.next());
    assert_eq!(sim.current_index(), 0);
}

#[test]
fn test_previous_is_never_gated() {
    let flow = flow_with_steps(vec![vec![text("a")], vec![text("b")], vec![text("c")]]);
    let mut sim = FlowSimulator::new(flow, RecordingPreviews::new());
    assert!(!sim.previous());

    assert!(sim.set_text("a", "done").is_recorded());
    assert!(sim.next());
    assert_eq!(sim.current_index(), 1);
    assert!(!sim.next());

    assert!(sim.previous());
    assert_eq!(sim.current_index(), 0);
}

#[test]
fn test_full_walk_and_submit() {
    let flow = flow_with_steps(vec![vec![text("a"), text("b")], vec![yes_no_question()]]);
    let mut sim = FlowSimulator::new(flow, RecordingPreviews::new());

    assert!(sim.set_text("a", "one").is_recorded());
    assert!(!sim.can_advance());
    assert_eq!(sim.unanswered_questions().len(), 1);
    assert!(sim.set_text("b", "").is_recorded());
    assert!(!sim.next(), "empty string is not an answer");
    assert!(sim.set_text("b", "two").is_recorded());
    assert!(sim.next());
    assert!(!sim.next(), "cannot advance past the last step");

    assert!(sim.select_option("q1", "no").is_recorded());
    let mut payload = None;
    assert!(sim.submit(|p| payload = Some(p)));

    let json = serde_json::to_value(payload.unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "answers": {"a": "one", "b": "two", "q1": "no"},
            "extraAnswers": {}
        })
    );
}

// ============================================================================
// Extra answers
// ============================================================================

#[test]
fn test_extra_answer_over_limit_is_rejected_and_optional() {
    let flow = flow_with_steps(vec![vec![yes_no_question()]]);
    let mut sim = FlowSimulator::new(flow, RecordingPreviews::new());

    assert_eq!(
        sim.set_extra_answer("q1", "opt-yes", "early"),
        CaptureOutcome::Rejected(Rejection::OptionNotSelected)
    );

    assert!(sim.select_option("q1", "yes").is_recorded());
    let step = sim.current_step().unwrap().clone();
    assert!(sim.is_step_answered(&step));

    assert!(sim.set_extra_answer("q1", "opt-yes", "0123456789").is_recorded());
    assert_eq!(
        sim.set_extra_answer("q1", "opt-yes", "0123456789X"),
        CaptureOutcome::Rejected(Rejection::TooLong { limit: 10 })
    );
    assert_eq!(sim.extra_answers().get("opt-yes"), "0123456789");

    assert_eq!(
        sim.set_extra_answer("q1", "opt-no", "why"),
        CaptureOutcome::Rejected(Rejection::ExtraAnswerDisabled)
    );
    assert!(sim.can_submit());
}

#[test]
fn test_extra_answer_rejected_from_the_start_leaves_it_empty() {
    let flow = flow_with_steps(vec![vec![yes_no_question()]]);
    let mut sim = FlowSimulator::new(flow, RecordingPreviews::new());
    assert!(sim.select_option("q1", "yes").is_recorded());

    assert!(!sim.set_extra_answer("q1", "opt-yes", "elevenchars").is_recorded());
    assert_eq!(sim.extra_answers().get("opt-yes"), "");
    assert!(sim.extra_answers().is_empty());
    assert!(sim.can_submit());
}

#[test]
fn test_multi_select_extra_answers_are_independent() {
    let question = Question::new("q", 1)
        .with_title("Services")
        .with_kind(QuestionKind::MultiSelect(ChoiceQuestion::new(vec![
            ChoiceOption::with_value("o1", "Cut", "cut").with_extra_answer(Some(3)),
            ChoiceOption::with_value("o2", "Wash", "wash").with_extra_answer(None),
        ])));
    let mut sim = FlowSimulator::new(flow_with_steps(vec![vec![question]]), RecordingPreviews::new());

    assert!(sim.toggle_option("q", "cut").is_recorded());
    assert!(sim.toggle_option("q", "wash").is_recorded());
    assert!(!sim.set_extra_answer("q", "o1", "long").is_recorded());
    assert!(sim.set_extra_answer("q", "o1", "top").is_recorded());
    assert!(sim.set_extra_answer("q", "o2", &"x".repeat(500)).is_recorded());
    assert_eq!(sim.extra_answers().len(), 2);
}

// ============================================================================
// Image previews
// ============================================================================

#[test]
fn test_images_capped_and_released_on_removal() {
    let previews = RecordingPreviews::new();
    let flow = flow_with_steps(vec![vec![photo_question(Some(2))]]);
    let mut sim = FlowSimulator::new(flow, previews.clone());

    assert!(sim.attach_images("photos", &files(&["a.jpg", "b.jpg", "c.jpg"])).is_recorded());
    assert_eq!(previews.acquired_count(), 2);
    assert_eq!(sim.answers().get_images("photos").unwrap().len(), 2);

    assert!(sim.remove_image("photos", 0).is_recorded());
    assert_eq!(previews.released_count(), 1);
    assert!(sim.can_submit());

    assert!(sim.remove_image("photos", 0).is_recorded());
    assert_eq!(previews.released_count(), 2);
    assert!(sim.answer("photos").is_none());
    assert!(!sim.can_submit());
    assert_eq!(
        sim.remove_image("photos", 0),
        CaptureOutcome::Rejected(Rejection::UnknownImage)
    );
    assert!(previews.outstanding().is_empty());
}

#[test]
fn test_reselecting_images_releases_previous_selection() {
    let previews = RecordingPreviews::new();
    let flow = flow_with_steps(vec![vec![photo_question(None)]]);
    let mut sim = FlowSimulator::new(flow, previews.clone());

    assert!(sim.attach_images("photos", &files(&["a.jpg", "b.jpg"])).is_recorded());
    assert!(sim.attach_images("photos", &files(&["c.jpg"])).is_recorded());
    assert_eq!(previews.acquired_count(), 3);
    assert_eq!(previews.released_count(), 2);
    assert_eq!(previews.outstanding().len(), 1);

    assert!(sim.clear_answer("photos"));
    assert!(!sim.clear_answer("photos"));
    assert_eq!(previews.released_count(), 3);
    assert!(!previews.has_double_release());
}

#[test]
fn test_close_releases_previews_of_every_step() {
    let previews = RecordingPreviews::new();
    let mut second = photo_question(None);
    second.id = "more-photos".into();
    let flow = flow_with_steps(vec![vec![photo_question(None)], vec![second]]);
    let mut sim = FlowSimulator::new(flow, previews.clone());

    assert!(sim.attach_images("photos", &files(&["a.jpg", "b.jpg"])).is_recorded());
    assert!(sim.next());
    assert!(sim.attach_images("more-photos", &files(&["c.jpg"])).is_recorded());
    assert_eq!(previews.acquired_count(), 3);

    sim.close();
    assert_eq!(previews.released_count(), previews.acquired_count());
    assert!(!previews.has_double_release());
}

#[test]
fn test_drop_after_submit_releases_previews() {
    let previews = RecordingPreviews::new();
    let flow = flow_with_steps(vec![vec![photo_question(Some(5))]]);
    {
        let mut sim = FlowSimulator::new(flow, previews.clone());
        assert!(sim.attach_images("photos", &files(&["a.jpg", "b.jpg", "c.jpg"])).is_recorded());
        assert!(sim.remove_image("photos", 1).is_recorded());
        assert!(sim.submit(|payload| {
            assert_eq!(payload.answers.get_images("photos").unwrap().len(), 2);
        }));
        assert_eq!(previews.released_count(), 1);
    }
    assert_eq!(previews.acquired_count(), 3);
    assert_eq!(previews.released_count(), 3);
    assert!(!previews.has_double_release());
}

// ============================================================================
// Stock control
// ============================================================================

#[tokio::test]
async fn test_stock_loading_seeding_and_total() {
    let inventory = StaticInventory::new().with_items(InventoryKind::Product, products());
    let flow = flow_with_steps(vec![vec![stock_question(
        InventoryKind::Product,
        vec![StockSeed::new("p1", 2)],
    )]]);
    let mut sim = FlowSimulator::new(flow, RecordingPreviews::new());

    assert_eq!(
        sim.inventory_status("stock"),
        Some(&InventoryStatus::NotRequested)
    );
    let requests = sim.take_inventory_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].kind, InventoryKind::Product);
    assert!(sim.inventory_status("stock").unwrap().is_loading());
    assert!(sim.answer("stock").is_none(), "no seeding while loading");
    assert_eq!(
        sim.toggle_stock_item("stock", "p2"),
        CaptureOutcome::Rejected(Rejection::InventoryUnavailable)
    );

    sim.finish_inventory_load("stock", Ok(products()));
    assert_eq!(sim.stock_selection("stock").unwrap().quantity("p1"), Some(2));
    assert_eq!(sim.stock_total("stock"), Some(Decimal::new(3980, 2)));

    assert!(sim.toggle_stock_item("stock", "p2").is_recorded());
    assert_eq!(sim.stock_selection("stock").unwrap().quantity("p2"), Some(0));
    assert!(sim.set_stock_quantity("stock", "p2", 1).is_recorded());
    assert_eq!(sim.stock_total("stock"), Some(Decimal::new(6480, 2)));

    assert!(sim.set_stock_quantity("stock", "p1", 0).is_recorded());
    assert!(!sim.stock_selection("stock").unwrap().contains("p1"));

    // A later load must not reapply defaults over the user's edits.
    sim.load_inventory(&inventory).await;
    assert_eq!(inventory.requests(), 0);
    assert!(!sim.stock_selection("stock").unwrap().contains("p1"));
}

#[test]
fn test_reselecting_stock_item_restarts_at_zero() {
    let flow = flow_with_steps(vec![vec![stock_question(InventoryKind::Product, vec![])]]);
    let mut sim = FlowSimulator::new(flow, RecordingPreviews::new());
    sim.take_inventory_requests();
    sim.finish_inventory_load("stock", Ok(products()));
    assert!(sim.answer("stock").is_none());

    assert!(sim.toggle_stock_item("stock", "p1").is_recorded());
    assert!(sim.set_stock_quantity("stock", "p1", 4).is_recorded());
    assert!(sim.set_stock_quantity("stock", "p1", 0).is_recorded());
    assert_eq!(
        sim.answer("stock"),
        Some(&AnswerValue::Stock(Default::default()))
    );

    assert!(sim.toggle_stock_item("stock", "p1").is_recorded());
    assert_eq!(sim.stock_selection("stock").unwrap().quantity("p1"), Some(0));
    assert!(sim.adjust_stock_quantity("stock", "p1", 3).is_recorded());
    assert_eq!(sim.stock_selection("stock").unwrap().to_json(), r#"{"p1":3}"#);
    assert_eq!(
        sim.toggle_stock_item("stock", "nope"),
        CaptureOutcome::Rejected(Rejection::UnknownItem)
    );
}

#[tokio::test]
async fn test_failed_inventory_is_distinct_and_retryable() {
    let inventory = StaticInventory::new().with_items(
        InventoryKind::Supply,
        vec![InventoryItem::new("s1", "Gloves")],
    );
    inventory.fail_with("inventory offline");
    let flow = flow_with_steps(vec![vec![stock_question(
        InventoryKind::Supply,
        vec![StockSeed::new("s1", 1)],
    )]]);
    let mut sim = FlowSimulator::new(flow, RecordingPreviews::new());

    sim.load_inventory(&inventory).await;
    assert_eq!(
        sim.inventory_status("stock"),
        Some(&InventoryStatus::Failed("inventory offline".into()))
    );
    assert!(sim.answer("stock").is_none());

    inventory.recover();
    sim.load_inventory(&inventory).await;
    assert_eq!(inventory.requests(), 2);
    assert_eq!(sim.stock_selection("stock").unwrap().quantity("s1"), Some(1));
    assert_eq!(sim.stock_total("stock"), None, "supplies have no total");
}

#[tokio::test]
async fn test_empty_inventory_is_ready_not_failed() {
    let inventory = StaticInventory::new().with_items(InventoryKind::Product, vec![]);
    let flow = flow_with_steps(vec![vec![stock_question(InventoryKind::Product, vec![])]]);
    let mut sim = FlowSimulator::new(flow, RecordingPreviews::new());

    sim.load_inventory(&inventory).await;
    assert_eq!(
        sim.inventory_status("stock"),
        Some(&InventoryStatus::Ready(vec![]))
    );
    assert_eq!(sim.stock_total("stock"), Some(Decimal::ZERO));
}

#[test]
fn test_stock_questions_load_only_once_visible() {
    let flow = flow_with_steps(vec![
        vec![text("intro")],
        vec![stock_question(InventoryKind::Product, vec![])],
    ]);
    let mut sim = FlowSimulator::new(flow, RecordingPreviews::new());
    assert!(sim.take_inventory_requests().is_empty());
    assert!(sim.inventory_status("stock").is_none());

    assert!(sim.set_text("intro", "hello").is_recorded());
    assert!(sim.next());
    assert_eq!(sim.take_inventory_requests().len(), 1);
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_simulation_loads_latest_saved_flow() {
    let store = InMemoryFlowStore::new();
    let mut editor = FlowEditor::new(SequentialIds::new("e"));
    editor.set_title("Pedicure");
    let step = editor.draft().steps[0].id.clone();
    editor.update_step(&step, StepPatch::new().title("Soak"));
    let q = editor.add_question(&step).unwrap();
    editor.update_question(
        &step,
        &q,
        QuestionPatch::new()
            .title("Water temperature")
            .question_type(QuestionType::Text)
            .max_length(Some(4)),
    );
    let flow = editor.save(&store).await.unwrap();

    editor.update_question(&step, &q, QuestionPatch::new().max_length(Some(8)));
    editor.save(&store).await.unwrap();

    let mut sim = FlowSimulator::load(&store, &flow.id, RecordingPreviews::new())
        .await
        .unwrap();
    assert_eq!(
        sim.flow().steps[0].questions[0].kind,
        QuestionKind::Text(TextQuestion::with_max_length(8))
    );
    assert!(sim.set_text(&q, "warmish").is_recorded());
    assert!(sim.submit(|_| {}));

    let missing = FlowSimulator::load(&store, "nope", RecordingPreviews::new()).await;
    assert!(missing.unwrap_err().is_not_found());
}
