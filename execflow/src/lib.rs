//! # execflow
//!
//! Author and simulate step-by-step execution flows. Presentation-agnostic.
//!
//! A flow is a tree of steps, each holding ordered questions; select questions
//! carry options that may accept an extra free-text answer. This crate covers
//! both sides of a flow's life:
//!
//! - **Authoring**: [`FlowEditor`] applies structural edits, reports which
//!   nodes are incomplete and encodes the draft for the persistence API.
//! - **Simulation**: [`FlowSimulator`] walks a persisted flow one step at a
//!   time, only advancing once every question of the current step is answered.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use execflow::{FlowEditor, FlowSimulator, QuestionPatch, QuestionType, StepPatch, UuidGenerator};
//!
//! let mut editor = FlowEditor::new(UuidGenerator);
//! editor.set_title("Haircut");
//! let step = editor.draft().steps[0].id.clone();
//! editor.update_step(&step, StepPatch::new().title("Consultation"));
//! let question = editor.add_question(&step).unwrap();
//! editor.update_question(
//!     &step,
//!     &question,
//!     QuestionPatch::new().title("Desired length").question_type(QuestionType::Text),
//! );
//!
//! let flow = editor.save(&repository).await?;
//!
//! let mut simulator = FlowSimulator::new(flow, previews);
//! simulator.set_text(&question, "Short");
//! simulator.submit(|payload| println!("{}", serde_json::to_string(&payload).unwrap()));
//! ```
//!
//! ## Collaborators
//!
//! The crate performs no I/O itself. Callers provide:
//! - [`FlowRepository`] - list, fetch, create and update flows
//! - [`InventorySource`] - candidate items for stock-control questions
//! - [`PreviewStore`] - preview references for selected images
//!
//! In-memory versions of all three live in the test backend.

// Re-export all types from execflow-types
pub use execflow_types::*;

pub mod editor;
pub use editor::{EditorError, FlowEditor, SaveError, StepStatus, ValidationReport};

pub mod wire;
pub use wire::WireError;

pub mod stock;
pub use stock::{InventoryRequest, InventoryStatus, StockControlState};

pub mod simulator;
pub use simulator::{CaptureOutcome, FlowSimulator, Rejection, SimulationPayload};

// Collaborators for tests and demos without a backend
mod test_backend;
pub use test_backend::{InMemoryFlowStore, RecordingPreviews, StaticInventory, flow_with_steps};
