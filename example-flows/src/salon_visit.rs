use execflow::{
    ChoiceOption, ChoiceQuestion, Flow, FlowDraft, ImageUploadQuestion, InventoryKind, Question,
    QuestionKind, Step, StockControlQuestion, StockSeed, TextQuestion,
};

use crate::persisted;

/// A three-step salon service flow touching every question type.
pub fn salon_visit() -> Flow {
    let arrival = Step {
        subtitle: Some("Greet the client".into()),
        questions: vec![
            Question::new("q-name", 1)
                .with_title("Client name")
                .with_kind(QuestionKind::Text(TextQuestion::with_max_length(60))),
            Question::new("q-first-visit", 2)
                .with_title("First visit?")
                .with_kind(QuestionKind::SingleSelect(ChoiceQuestion::new(vec![
                    ChoiceOption::with_value("opt-first-yes", "Yes", "yes")
                        .with_extra_answer(Some(80)),
                    ChoiceOption::with_value("opt-first-no", "No", "no"),
                ]))),
        ],
        ..Step::new("step-arrival", 1).with_title("Arrival")
    };

    let service = Step {
        questions: vec![
            Question::new("q-services", 1)
                .with_title("Services performed")
                .with_kind(QuestionKind::MultiSelect(ChoiceQuestion::new(vec![
                    ChoiceOption::with_value("opt-cut", "Cut", "cut"),
                    ChoiceOption::with_value("opt-color", "Color", "color")
                        .with_extra_answer(Some(12)),
                    ChoiceOption::with_value("opt-wash", "Wash", "wash"),
                ]))),
            Question::new("q-notes", 2)
                .with_title("Notes")
                .with_kind(QuestionKind::Textarea(TextQuestion::with_max_length(500))),
            Question::new("q-photos", 3)
                .with_title("Before and after photos")
                .with_kind(QuestionKind::ImageUpload(ImageUploadQuestion {
                    max_images: Some(4),
                    accepted_image_types: vec!["image/jpeg".into(), "image/png".into()],
                })),
        ],
        ..Step::new("step-service", 2).with_title("Service")
    };

    let wrap_up = Step {
        description: Some("Record what was used".into()),
        questions: vec![
            Question::new("q-products", 1)
                .with_title("Products sold")
                .with_kind(QuestionKind::StockControl(StockControlQuestion {
                    inventory: InventoryKind::Product,
                    default_stock_items: vec![StockSeed::new("prod-shampoo", 1)],
                })),
            Question::new("q-supplies", 2)
                .with_title("Supplies used")
                .with_kind(QuestionKind::StockControl(StockControlQuestion {
                    inventory: InventoryKind::Supply,
                    default_stock_items: vec![StockSeed::new("sup-gloves", 2)],
                })),
        ],
        ..Step::new("step-wrap-up", 3).with_title("Wrap-up")
    };

    let draft = FlowDraft {
        title: "Salon visit".into(),
        steps: vec![arrival, service, wrap_up],
    };
    persisted("flow-salon-visit", draft)
}
