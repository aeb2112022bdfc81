//! Wire format of the persistence API.
//!
//! The API stores a flow as a title plus an opaque `flow` string holding
//! `{"steps":[...]}`. Reads hand back the tree either inline under `steps` or
//! still packed in that string. Decoding is tolerant: absent strings, arrays
//! and booleans take their empty value, a missing step number falls back to
//! the step's position and a missing question order to zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    ChoiceOption, ChoiceQuestion, Flow, FlowDocument, FlowDraft, ImageUploadQuestion,
    InventoryKind, Question, QuestionKind, QuestionType, StepPatch, Step, StockControlQuestion,
    StockSeed, TextQuestion, UnknownQuestionType,
};

/// Error decoding or encoding the wire format.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed flow JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("question '{question_id}': {source}")]
    UnknownQuestionType {
        question_id: String,
        #[source]
        source: UnknownQuestionType,
    },
}

/// A flow as returned by the persistence API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiFlow {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Option<Vec<ApiStep>>,
    /// The packed step tree, present when `steps` was not expanded.
    #[serde(default)]
    pub flow: Option<String>,
}

impl ApiFlow {
    /// Convert into the model, unpacking the `flow` string if needed.
    pub fn into_flow(self) -> Result<Flow, WireError> {
        let steps = match (self.steps, self.flow) {
            (Some(steps), _) => steps,
            (None, Some(packed)) if !packed.trim().is_empty() => {
                serde_json::from_str::<ApiSteps>(&packed)?.steps
            }
            (None, _) => Vec::new(),
        };

        Ok(Flow {
            id: self.id,
            title: self.title,
            steps: into_steps(steps)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

/// The content of a packed `flow` string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSteps {
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: Vec<ApiStep>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStep {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub step_number: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<ApiQuestion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiQuestion {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub question_type: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<ApiOption>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_images: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_image_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_stock_items: Option<Vec<ApiStockSeed>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_kind: Option<InventoryKind>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOption {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enable_extra_answer: bool,
    #[serde(default)]
    pub extra_answer_max_length: Option<usize>,
}

/// A default stock quantity. Older flows name the item `productId`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStockSeed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supply_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quantity: u32,
}

/// Decode one flow as returned by the API.
pub fn deserialize_flow(json: &str) -> Result<Flow, WireError> {
    serde_json::from_str::<ApiFlow>(json)?.into_flow()
}

/// Decode a list of flows as returned by the API.
pub fn deserialize_flows(json: &str) -> Result<Vec<Flow>, WireError> {
    serde_json::from_str::<Vec<ApiFlow>>(json)?
        .into_iter()
        .map(ApiFlow::into_flow)
        .collect()
}

/// Decode the packed `flow` string of a [`FlowDocument`].
pub fn decode_steps(packed: &str) -> Result<Vec<Step>, WireError> {
    into_steps(serde_json::from_str::<ApiSteps>(packed)?.steps)
}

/// Decode a document back into an editable draft.
pub fn decode_document(document: &FlowDocument) -> Result<FlowDraft, WireError> {
    Ok(FlowDraft {
        title: document.title.clone(),
        steps: decode_steps(&document.flow)?,
    })
}

/// Encode a draft as the create/update payload.
///
/// Validity is not checked here; see [`FlowEditor::submit`](crate::FlowEditor::submit).
pub fn serialize(draft: &FlowDraft) -> Result<FlowDocument, WireError> {
    let packed = ApiSteps {
        steps: draft.steps.iter().map(ApiStep::from).collect(),
    };
    Ok(FlowDocument {
        title: draft.title.clone(),
        flow: serde_json::to_string(&packed)?,
    })
}

fn into_steps(steps: Vec<ApiStep>) -> Result<Vec<Step>, WireError> {
    steps
        .into_iter()
        .enumerate()
        .map(|(index, step)| step.into_step(index))
        .collect()
}

impl ApiStep {
    fn into_step(self, index: usize) -> Result<Step, WireError> {
        let fallback = u32::try_from(index + 1).unwrap_or(u32::MAX);
        let mut step = Step::new(
            self.id,
            self.step_number.filter(|n| *n > 0).unwrap_or(fallback),
        );
        step.apply(
            StepPatch::new()
                .title(self.title)
                .subtitle(self.subtitle.unwrap_or_default())
                .description(self.description.unwrap_or_default()),
        );
        step.questions = self
            .questions
            .into_iter()
            .map(ApiQuestion::into_question)
            .collect::<Result<_, _>>()?;
        Ok(step)
    }
}

impl From<&Step> for ApiStep {
    fn from(step: &Step) -> Self {
        Self {
            id: step.id.clone(),
            title: step.title.clone(),
            subtitle: step.subtitle.clone(),
            description: step.description.clone(),
            step_number: Some(step.step_number),
            questions: step.questions.iter().map(ApiQuestion::from).collect(),
        }
    }
}

impl ApiQuestion {
    fn into_question(self) -> Result<Question, WireError> {
        let question_type = QuestionType::try_from(self.question_type).map_err(|source| {
            WireError::UnknownQuestionType {
                question_id: self.id.clone(),
                source,
            }
        })?;

        let kind = match question_type {
            QuestionType::Text => QuestionKind::Text(TextQuestion {
                max_length: self.max_length,
            }),
            QuestionType::Textarea => QuestionKind::Textarea(TextQuestion {
                max_length: self.max_length,
            }),
            QuestionType::SingleSelect => QuestionKind::SingleSelect(choices(self.options)),
            QuestionType::MultiSelect => QuestionKind::MultiSelect(choices(self.options)),
            QuestionType::ImageUpload => QuestionKind::ImageUpload(ImageUploadQuestion {
                max_images: self.max_images,
                accepted_image_types: self.accepted_image_types.unwrap_or_default(),
            }),
            QuestionType::StockControl => QuestionKind::StockControl(stock_control(
                &self.id,
                self.inventory_kind,
                self.default_stock_items.unwrap_or_default(),
            )),
        };

        Ok(Question {
            id: self.id,
            order: self.order,
            title: self.title,
            subtitle: self.subtitle.filter(|s| !s.is_empty()),
            description: self.description.unwrap_or_default(),
            kind,
        })
    }
}

fn choices(options: Vec<ApiOption>) -> ChoiceQuestion {
    ChoiceQuestion::new(
        options
            .into_iter()
            .map(|o| ChoiceOption {
                id: o.id,
                title: o.title,
                value: o.value,
                enable_extra_answer: o.enable_extra_answer,
                extra_answer_max_length: o.extra_answer_max_length,
            })
            .collect(),
    )
}

fn stock_control(
    question_id: &str,
    inventory: Option<InventoryKind>,
    seeds: Vec<ApiStockSeed>,
) -> StockControlQuestion {
    let inventory = inventory.unwrap_or_else(|| {
        if seeds.iter().any(|s| s.supply_id.is_some()) {
            InventoryKind::Supply
        } else {
            InventoryKind::Product
        }
    });

    let default_stock_items = seeds
        .into_iter()
        .filter_map(|seed| match seed.supply_id.or(seed.product_id) {
            Some(item_id) if !item_id.is_empty() => Some(StockSeed::new(item_id, seed.quantity)),
            _ => {
                tracing::warn!(
                    question_id,
                    quantity = seed.quantity,
                    "dropping default stock item without supplyId or productId"
                );
                None
            }
        })
        .collect();

    StockControlQuestion {
        inventory,
        default_stock_items,
    }
}

impl From<&Question> for ApiQuestion {
    fn from(question: &Question) -> Self {
        let mut api = Self {
            id: question.id.clone(),
            order: question.order,
            title: question.title.clone(),
            subtitle: question.subtitle.clone(),
            description: Some(question.description.clone()).filter(|d| !d.is_empty()),
            question_type: i64::from(question.question_type().code()),
            options: question.options().iter().map(ApiOption::from).collect(),
            required: true,
            ..Self::default()
        };

        match &question.kind {
            QuestionKind::Text(text) | QuestionKind::Textarea(text) => {
                api.max_length = text.max_length;
            }
            QuestionKind::SingleSelect(_) | QuestionKind::MultiSelect(_) => {}
            QuestionKind::ImageUpload(upload) => {
                api.max_images = upload.max_images;
                if !upload.accepted_image_types.is_empty() {
                    api.accepted_image_types = Some(upload.accepted_image_types.clone());
                }
            }
            QuestionKind::StockControl(stock) => {
                api.inventory_kind = Some(stock.inventory);
                if !stock.default_stock_items.is_empty() {
                    api.default_stock_items = Some(
                        stock
                            .default_stock_items
                            .iter()
                            .map(|seed| ApiStockSeed::new(stock.inventory, seed))
                            .collect(),
                    );
                }
            }
        }
        api
    }
}

impl From<&ChoiceOption> for ApiOption {
    fn from(option: &ChoiceOption) -> Self {
        Self {
            id: option.id.clone(),
            title: option.title.clone(),
            value: option.value.clone(),
            enable_extra_answer: option.enable_extra_answer,
            extra_answer_max_length: option.extra_answer_max_length,
        }
    }
}

impl ApiStockSeed {
    fn new(inventory: InventoryKind, seed: &StockSeed) -> Self {
        let item_id = Some(seed.item_id.clone());
        let (supply_id, product_id) = match inventory {
            InventoryKind::Supply => (item_id, None),
            InventoryKind::Product => (None, item_id),
        };
        Self {
            supply_id,
            product_id,
            quantity: seed.quantity,
        }
    }
}

/// Treat an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::{FlowEditor, QuestionPatch, SequentialIds};

    fn packed(document: &FlowDocument) -> Value {
        serde_json::from_str(&document.flow).unwrap()
    }

    #[test]
    fn integer_type_code_becomes_single_select() {
        let flow = deserialize_flow(
            r#"{
                "id": "f1",
                "title": "Visit",
                "createdAt": "2024-05-01T10:00:00Z",
                "updatedAt": "2024-05-01T10:00:00Z",
                "steps": [{
                    "id": "s1",
                    "title": "Start",
                    "stepNumber": 1,
                    "questions": [{
                        "id": "q1",
                        "order": 1,
                        "title": "Happy?",
                        "type": 3,
                        "options": [{"id": "o1", "title": "Yes", "value": "yes"}]
                    }]
                }]
            }"#,
        )
        .unwrap();

        let question = &flow.steps[0].questions[0];
        assert_eq!(question.question_type(), QuestionType::SingleSelect);
        assert_eq!(question.options()[0].value, "yes");
        assert!(!question.options()[0].enable_extra_answer);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let flow = deserialize_flow(
            r#"{
                "id": "f1",
                "title": null,
                "steps": [
                    {"id": "a", "questions": [{"id": "q", "type": 1}]},
                    {"id": "b", "title": "Second", "stepNumber": null, "questions": null}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(flow.title, "");
        assert_eq!(flow.steps[0].title, "");
        assert_eq!(flow.steps[0].subtitle, None);
        assert_eq!(flow.steps[0].step_number, 1);
        assert_eq!(flow.steps[1].step_number, 2);
        assert!(flow.steps[1].questions.is_empty());
        let question = &flow.steps[0].questions[0];
        assert_eq!(question.order, 0);
        assert_eq!(question.description, "");
        assert!(question.options().is_empty());
    }

    #[test]
    fn unknown_type_code_is_an_error() {
        let err = deserialize_flow(
            r#"{"id": "f", "steps": [{"id": "s", "questions": [{"id": "q9", "type": 9}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            WireError::UnknownQuestionType { ref question_id, source: UnknownQuestionType(9) }
                if question_id == "q9"
        ));
    }

    #[test]
    fn packed_flow_string_is_unpacked() {
        let body = json!({
            "id": "f1",
            "title": "Packed",
            "flow": json!({"steps": [{"id": "s1", "title": "Only", "stepNumber": 1, "questions": []}]}).to_string(),
        });
        let flow = deserialize_flow(&body.to_string()).unwrap();
        assert_eq!(flow.steps.len(), 1);
        assert_eq!(flow.steps[0].title, "Only");
    }

    #[test]
    fn stock_seeds_accept_either_id_and_drop_anonymous() {
        let flow = deserialize_flow(
            r#"{"id": "f", "steps": [{"id": "s", "questions": [{
                "id": "q", "type": 6,
                "defaultStockItems": [
                    {"supplyId": "sup-1", "quantity": 2},
                    {"productId": "prod-1", "quantity": 1},
                    {"quantity": 5}
                ]
            }]}]}"#,
        )
        .unwrap();

        let QuestionKind::StockControl(stock) = &flow.steps[0].questions[0].kind else {
            panic!("expected stock control");
        };
        assert_eq!(stock.inventory, InventoryKind::Supply);
        assert_eq!(
            stock.default_stock_items,
            [StockSeed::new("sup-1", 2), StockSeed::new("prod-1", 1)]
        );
    }

    #[test]
    fn serialize_emits_cleaned_shape() {
        let mut editor = FlowEditor::new(SequentialIds::new("id"));
        editor.set_title("Checkout");
        let step = editor.draft().steps[0].id.clone();
        editor.update_step(&step, StepPatch::new().title("Pay"));
        let q = editor.add_question(&step).unwrap();
        editor.update_question(
            &step,
            &q,
            QuestionPatch::new()
                .title("Card?")
                .question_type(QuestionType::MultiSelect),
        );
        editor.add_option(&step, &q);

        let document = serialize(editor.draft()).unwrap();
        assert_eq!(document.title, "Checkout");
        assert_eq!(
            packed(&document),
            json!({"steps": [{
                "id": "id-1",
                "title": "Pay",
                "subtitle": null,
                "description": null,
                "stepNumber": 1,
                "questions": [{
                    "id": "id-2",
                    "order": 1,
                    "title": "Card?",
                    "subtitle": null,
                    "description": null,
                    "type": 4,
                    "options": [{
                        "id": "id-3",
                        "title": "",
                        "value": "",
                        "enableExtraAnswer": false,
                        "extraAnswerMaxLength": null
                    }],
                    "required": true
                }]
            }]})
        );
    }

    #[test]
    fn serialize_emits_constraints_only_when_set() {
        let mut ids = SequentialIds::new("x");
        let mut draft = FlowDraft::new().with_title("Photos");
        let step = draft.insert_step(&mut ids);
        let step = draft.step_mut(&step).unwrap();
        let upload = step.insert_question(&mut ids);
        step.update_question(
            &upload,
            QuestionPatch::new()
                .question_type(QuestionType::ImageUpload)
                .max_images(Some(3)),
        );
        let stock = step.insert_question(&mut ids);
        step.update_question(
            &stock,
            QuestionPatch::new()
                .question_type(QuestionType::StockControl)
                .inventory(InventoryKind::Supply)
                .default_stock_items(vec![StockSeed::new("sup-9", 4)]),
        );

        let value = packed(&serialize(&draft).unwrap());
        let questions = &value["steps"][0]["questions"];
        assert_eq!(questions[0]["maxImages"], json!(3));
        assert!(questions[0].get("acceptedImageTypes").is_none());
        assert!(questions[0].get("maxLength").is_none());
        assert_eq!(questions[1]["inventoryKind"], json!("supply"));
        assert_eq!(
            questions[1]["defaultStockItems"],
            json!([{"supplyId": "sup-9", "quantity": 4}])
        );
    }

    #[test]
    fn document_decodes_back_to_draft() {
        let mut ids = SequentialIds::new("x");
        let mut draft = FlowDraft::new().with_title("Again");
        let step = draft.insert_step(&mut ids);
        draft.update_step(&step, StepPatch::new().title("One").subtitle("sub"));
        let step = draft.step_mut(&step).unwrap();
        let q = step.insert_question(&mut ids);
        step.update_question(
            &q,
            QuestionPatch::new()
                .title("Notes")
                .description("free text")
                .question_type(QuestionType::Textarea)
                .max_length(Some(200)),
        );

        let decoded = decode_document(&serialize(&draft).unwrap()).unwrap();
        assert_eq!(decoded, draft);
    }
}
