//! Core types for the execflow crate.
//!
//! This crate provides the foundational types for defining execution flows:
//! - `Flow`, `FlowDraft` and `Step` - The document tree and its structural edits
//! - `Question` and `QuestionKind` - Individual prompts and their closed set of variants
//! - `AnswerValue`, `Answers` and `StockSelection` - Values captured while simulating a flow
//! - `FlowRepository`, `InventorySource` and `PreviewStore` - Contracts for external collaborators

mod ids;
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};

mod answer_value;
pub use answer_value::AnswerValue;

mod answers;
pub use answers::{AnswerError, Answers, ExtraAnswers};

mod stock;
pub use stock::StockSelection;

mod inventory;
pub use inventory::{InventoryItem, InventoryKind};

mod question;
pub use question::{
    ChoiceOption, ChoiceQuestion, ImageUploadQuestion, OptionPatch, Question, QuestionKind,
    QuestionPatch, QuestionType, StockControlQuestion, StockSeed, TextQuestion,
};

mod step;
pub use step::{Step, StepPatch};

mod flow;
pub use flow::{Direction, Flow, FlowDraft};

mod document;
pub use document::FlowDocument;

mod error;
pub use error::{ServiceError, UnknownQuestionType};

mod traits;
pub use traits::{FlowRepository, ImageFile, InventorySource, PreviewStore};
