use serde::{Deserialize, Serialize};

use crate::{AnswerValue, IdGenerator, InventoryKind, UnknownQuestionType};

/// The answer-capture type of a question, with its integer wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QuestionType {
    Text = 1,
    Textarea = 2,
    SingleSelect = 3,
    MultiSelect = 4,
    ImageUpload = 5,
    StockControl = 6,
}

impl QuestionType {
    /// Every type, in wire-code order.
    pub const ALL: [QuestionType; 6] = [
        Self::Text,
        Self::Textarea,
        Self::SingleSelect,
        Self::MultiSelect,
        Self::ImageUpload,
        Self::StockControl,
    ];

    /// The integer code used by the persistence API.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Textarea => "Text area",
            Self::SingleSelect => "Single choice",
            Self::MultiSelect => "Multiple choice",
            Self::ImageUpload => "Photo upload",
            Self::StockControl => "Stock control",
        }
    }

    /// Whether questions of this type carry options.
    pub fn has_options(self) -> bool {
        matches!(self, Self::SingleSelect | Self::MultiSelect)
    }
}

impl TryFrom<u8> for QuestionType {
    type Error = UnknownQuestionType;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(UnknownQuestionType(i64::from(code)))
    }
}

impl TryFrom<i64> for QuestionType {
    type Error = UnknownQuestionType;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        u8::try_from(code)
            .map_err(|_| UnknownQuestionType(code))
            .and_then(Self::try_from)
    }
}

impl From<QuestionType> for u8 {
    fn from(t: QuestionType) -> Self {
        t.code()
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single prompt within a step.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: String,

    /// 1-based position within the owning step.
    pub order: u32,

    pub title: String,
    pub subtitle: Option<String>,
    pub description: String,

    /// The answer-capture variant and its constraints.
    pub kind: QuestionKind,
}

impl Question {
    /// Create an untitled text question.
    pub fn new(id: impl Into<String>, order: u32) -> Self {
        Self {
            id: id.into(),
            order,
            title: String::new(),
            subtitle: None,
            description: String::new(),
            kind: QuestionKind::default(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the kind.
    pub fn with_kind(mut self, kind: QuestionKind) -> Self {
        self.kind = kind;
        self
    }

    /// The type tag of this question's kind.
    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    /// A question is valid when it has a title and its kind is fully configured.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && self.kind.is_configured()
    }

    /// Whether `answer` counts as a complete answer to this question.
    pub fn is_answered(&self, answer: Option<&AnswerValue>) -> bool {
        self.kind.is_answered(answer)
    }

    /// Options of a select question; empty for every other kind.
    pub fn options(&self) -> &[ChoiceOption] {
        match &self.kind {
            QuestionKind::SingleSelect(choice) | QuestionKind::MultiSelect(choice) => {
                &choice.options
            }
            _ => &[],
        }
    }

    /// Find an option by id.
    pub fn option(&self, option_id: &str) -> Option<&ChoiceOption> {
        self.options().iter().find(|o| o.id == option_id)
    }

    /// Append a blank option. Returns `None` for kinds without options.
    pub fn insert_option(&mut self, ids: &mut impl IdGenerator) -> Option<String> {
        let choice = self.kind.choice_mut()?;
        let id = ids.next_id();
        choice.options.push(ChoiceOption::new(id.clone()));
        Some(id)
    }

    /// Remove an option. Returns `false` if it was not found.
    pub fn remove_option(&mut self, option_id: &str) -> bool {
        let Some(choice) = self.kind.choice_mut() else {
            return false;
        };
        let before = choice.options.len();
        choice.options.retain(|o| o.id != option_id);
        choice.options.len() != before
    }

    /// Merge `patch` into an option. Returns `false` if it was not found.
    pub fn update_option(&mut self, option_id: &str, patch: OptionPatch) -> bool {
        let Some(option) = self
            .kind
            .choice_mut()
            .and_then(|choice| choice.options.iter_mut().find(|o| o.id == option_id))
        else {
            return false;
        };
        patch.apply(option);
        true
    }

    /// Merge `patch` into this question.
    ///
    /// A type change happens before the constraint fields are applied, so a patch
    /// can switch to `Text` and set `max_length` in one go. Constraint fields that
    /// do not belong to the resulting kind are ignored.
    pub fn apply(&mut self, patch: QuestionPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(subtitle) = patch.subtitle {
            self.subtitle = non_empty(subtitle);
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(question_type) = patch.question_type {
            let kind = std::mem::take(&mut self.kind);
            self.kind = kind.convert_to(question_type);
        }

        match &mut self.kind {
            QuestionKind::Text(text) | QuestionKind::Textarea(text) => {
                if let Some(max_length) = patch.max_length {
                    text.max_length = max_length;
                }
            }
            QuestionKind::SingleSelect(_) | QuestionKind::MultiSelect(_) => {}
            QuestionKind::ImageUpload(upload) => {
                if let Some(max_images) = patch.max_images {
                    upload.max_images = max_images;
                }
                if let Some(types) = patch.accepted_image_types {
                    upload.accepted_image_types = types;
                }
            }
            QuestionKind::StockControl(stock) => {
                if let Some(inventory) = patch.inventory {
                    stock.inventory = inventory;
                }
                if let Some(seeds) = patch.default_stock_items {
                    stock.default_stock_items = seeds;
                }
            }
        }
    }
}

/// The closed set of answer-capture variants.
///
/// Each capability (`is_configured`, `admits`, `is_answered`) is one exhaustive
/// match here, so a new variant cannot be forgotten at any consumption site.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    /// Single-line text with an optional length cap.
    Text(TextQuestion),

    /// Multi-line text with an optional length cap.
    Textarea(TextQuestion),

    /// Pick exactly one option.
    SingleSelect(ChoiceQuestion),

    /// Pick any number of options.
    MultiSelect(ChoiceQuestion),

    /// Attach photos.
    ImageUpload(ImageUploadQuestion),

    /// Choose quantities from an external inventory.
    StockControl(StockControlQuestion),
}

impl Default for QuestionKind {
    fn default() -> Self {
        Self::Text(TextQuestion::default())
    }
}

impl QuestionKind {
    /// The type tag for this kind.
    pub fn question_type(&self) -> QuestionType {
        match self {
            Self::Text(_) => QuestionType::Text,
            Self::Textarea(_) => QuestionType::Textarea,
            Self::SingleSelect(_) => QuestionType::SingleSelect,
            Self::MultiSelect(_) => QuestionType::MultiSelect,
            Self::ImageUpload(_) => QuestionType::ImageUpload,
            Self::StockControl(_) => QuestionType::StockControl,
        }
    }

    /// A fresh kind of the given type with default constraints.
    pub fn empty(question_type: QuestionType) -> Self {
        match question_type {
            QuestionType::Text => Self::Text(TextQuestion::default()),
            QuestionType::Textarea => Self::Textarea(TextQuestion::default()),
            QuestionType::SingleSelect => Self::SingleSelect(ChoiceQuestion::default()),
            QuestionType::MultiSelect => Self::MultiSelect(ChoiceQuestion::default()),
            QuestionType::ImageUpload => Self::ImageUpload(ImageUploadQuestion::default()),
            QuestionType::StockControl => Self::StockControl(StockControlQuestion::default()),
        }
    }

    /// Switch to another type.
    ///
    /// Options carry over only between the two select variants, and the length cap
    /// only between the two text variants. Anything else starts from defaults, so
    /// leaving a select type always drops its options.
    pub fn convert_to(self, question_type: QuestionType) -> Self {
        match (self, question_type) {
            (Self::Text(text) | Self::Textarea(text), QuestionType::Text) => Self::Text(text),
            (Self::Text(text) | Self::Textarea(text), QuestionType::Textarea) => {
                Self::Textarea(text)
            }
            (Self::SingleSelect(choice) | Self::MultiSelect(choice), QuestionType::SingleSelect) => {
                Self::SingleSelect(choice)
            }
            (Self::SingleSelect(choice) | Self::MultiSelect(choice), QuestionType::MultiSelect) => {
                Self::MultiSelect(choice)
            }
            (kind, target) if kind.question_type() == target => kind,
            (_, target) => Self::empty(target),
        }
    }

    /// Whether the kind has everything it needs beyond the question title.
    ///
    /// Select questions need at least one option; every other kind is always configured.
    pub fn is_configured(&self) -> bool {
        match self {
            Self::Text(_) | Self::Textarea(_) => true,
            Self::SingleSelect(choice) | Self::MultiSelect(choice) => !choice.options.is_empty(),
            Self::ImageUpload(_) => true,
            Self::StockControl(_) => true,
        }
    }

    /// Whether `answer` has the shape this kind records.
    pub fn admits(&self, answer: &AnswerValue) -> bool {
        match self {
            Self::Text(_) | Self::Textarea(_) => matches!(answer, AnswerValue::Text(_)),
            Self::SingleSelect(_) => matches!(answer, AnswerValue::Choice(_)),
            Self::MultiSelect(_) => matches!(answer, AnswerValue::Choices(_)),
            Self::ImageUpload(_) => matches!(answer, AnswerValue::Images(_)),
            Self::StockControl(_) => matches!(answer, AnswerValue::Stock(_)),
        }
    }

    /// Whether `answer` completes a question of this kind.
    ///
    /// Extra-answer text never takes part in this decision.
    pub fn is_answered(&self, answer: Option<&AnswerValue>) -> bool {
        answer.is_some_and(|a| self.admits(a) && a.is_filled())
    }

    fn choice_mut(&mut self) -> Option<&mut ChoiceQuestion> {
        match self {
            Self::SingleSelect(choice) | Self::MultiSelect(choice) => Some(choice),
            Self::Text(_) | Self::Textarea(_) | Self::ImageUpload(_) | Self::StockControl(_) => {
                None
            }
        }
    }
}

/// Configuration for a text question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextQuestion {
    /// Maximum number of characters; `None` or `0` means unlimited.
    pub max_length: Option<usize>,
}

impl TextQuestion {
    /// Create with a length cap.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length: Some(max_length),
        }
    }

    /// The enforced length cap.
    pub fn limit(&self) -> Option<usize> {
        positive(self.max_length)
    }

    /// Whether `value` fits the length cap.
    pub fn accepts(&self, value: &str) -> bool {
        fits(value, self.max_length)
    }
}

/// Configuration for a single- or multi-select question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceQuestion {
    /// Options in display order.
    pub options: Vec<ChoiceOption>,
}

impl ChoiceQuestion {
    /// Create with the given options.
    pub fn new(options: Vec<ChoiceOption>) -> Self {
        Self { options }
    }

    /// Find the option that stores `value`.
    pub fn option_by_value(&self, value: &str) -> Option<&ChoiceOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

/// A selectable choice of a select question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceOption {
    pub id: String,

    /// Label shown to the user.
    pub title: String,

    /// Token stored in the answer.
    pub value: String,

    /// Whether free text may be attached when this option is selected.
    pub enable_extra_answer: bool,

    /// Cap for the attached free text; only meaningful with `enable_extra_answer`.
    pub extra_answer_max_length: Option<usize>,
}

impl ChoiceOption {
    /// Create a blank option.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Create an option with title and value.
    pub fn with_value(
        id: impl Into<String>,
        title: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Enable extra answers with an optional cap.
    pub fn with_extra_answer(mut self, max_length: Option<usize>) -> Self {
        self.enable_extra_answer = true;
        self.extra_answer_max_length = max_length;
        self
    }

    /// Whether `text` fits the extra-answer cap.
    pub fn accepts_extra_answer(&self, text: &str) -> bool {
        fits(text, self.extra_answer_max_length)
    }

    /// The enforced extra-answer cap.
    pub fn extra_answer_limit(&self) -> Option<usize> {
        positive(self.extra_answer_max_length)
    }
}

/// Configuration for an image upload question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageUploadQuestion {
    /// Maximum number of images kept; `None` or `0` means unlimited.
    pub max_images: Option<usize>,

    /// MIME types offered to the file picker, e.g. `image/png`.
    pub accepted_image_types: Vec<String>,
}

impl ImageUploadQuestion {
    /// How many of `requested` files are kept.
    pub fn cap(&self, requested: usize) -> usize {
        self.limit().map_or(requested, |max| requested.min(max))
    }

    /// The enforced image cap.
    pub fn limit(&self) -> Option<usize> {
        positive(self.max_images)
    }

    /// The `accept` filter for a file picker. Advisory only.
    pub fn accept_filter(&self) -> String {
        if self.accepted_image_types.is_empty() {
            "image/*".to_string()
        } else {
            self.accepted_image_types.join(",")
        }
    }

    /// Whether a picker should allow selecting several files at once.
    pub fn allows_multiple(&self) -> bool {
        self.limit().is_none_or(|max| max > 1)
    }
}

/// Configuration for a stock-control question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockControlQuestion {
    /// Inventory the candidate items come from.
    pub inventory: InventoryKind,

    /// Quantities pre-selected when the question has no answer yet.
    pub default_stock_items: Vec<StockSeed>,
}

/// A default quantity for one inventory item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockSeed {
    pub item_id: String,
    pub quantity: u32,
}

impl StockSeed {
    pub fn new(item_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
        }
    }
}

/// Partial update for a question. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub question_type: Option<QuestionType>,
    pub max_length: Option<Option<usize>>,
    pub max_images: Option<Option<usize>>,
    pub accepted_image_types: Option<Vec<String>>,
    pub inventory: Option<InventoryKind>,
    pub default_stock_items: Option<Vec<StockSeed>>,
}

impl QuestionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the subtitle; an empty string clears it.
    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn question_type(mut self, question_type: QuestionType) -> Self {
        self.question_type = Some(question_type);
        self
    }

    pub fn max_length(mut self, max_length: Option<usize>) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn max_images(mut self, max_images: Option<usize>) -> Self {
        self.max_images = Some(max_images);
        self
    }

    pub fn accepted_image_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_image_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn inventory(mut self, inventory: InventoryKind) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn default_stock_items(mut self, seeds: Vec<StockSeed>) -> Self {
        self.default_stock_items = Some(seeds);
        self
    }
}

/// Partial update for an option. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct OptionPatch {
    pub title: Option<String>,
    pub value: Option<String>,
    pub enable_extra_answer: Option<bool>,
    pub extra_answer_max_length: Option<Option<usize>>,
}

impl OptionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn enable_extra_answer(mut self, enabled: bool) -> Self {
        self.enable_extra_answer = Some(enabled);
        self
    }

    pub fn extra_answer_max_length(mut self, max_length: Option<usize>) -> Self {
        self.extra_answer_max_length = Some(max_length);
        self
    }

    fn apply(self, option: &mut ChoiceOption) {
        if let Some(title) = self.title {
            option.title = title;
        }
        if let Some(value) = self.value {
            option.value = value;
        }
        if let Some(enabled) = self.enable_extra_answer {
            option.enable_extra_answer = enabled;
        }
        if let Some(max_length) = self.extra_answer_max_length {
            option.extra_answer_max_length = max_length;
        }
    }
}

fn fits(value: &str, max_length: Option<usize>) -> bool {
    positive(max_length).is_none_or(|max| value.chars().count() <= max)
}

/// A zero cap is stored by editors that were left blank; it never limits.
fn positive(limit: Option<usize>) -> Option<usize> {
    limit.filter(|max| *max > 0)
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
