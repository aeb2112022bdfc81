//! Authoring session over a [`FlowDraft`].

use crate::wire::{self, WireError};
use crate::{
    Direction, Flow, FlowDocument, FlowDraft, FlowRepository, IdGenerator, OptionPatch,
    QuestionPatch, ServiceError, Step, StepPatch,
};

/// Why a draft cannot be submitted yet.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("flow is incomplete")]
    Incomplete(ValidationReport),

    #[error(transparent)]
    Encode(#[from] WireError),
}

/// Failure of [`FlowEditor::save`]. The editor is unchanged and the call may be retried.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("failed to save flow: {0}")]
    Service(#[from] ServiceError),
}

impl SaveError {
    /// The validation report, if the save was refused because the draft is incomplete.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Editor(EditorError::Incomplete(report)) => Some(report),
            _ => None,
        }
    }
}

/// Where a draft falls short of being submittable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub has_title: bool,
    pub has_steps: bool,
    pub steps: Vec<StepStatus>,
}

impl ValidationReport {
    fn of(draft: &FlowDraft) -> Self {
        Self {
            has_title: !draft.title.trim().is_empty(),
            has_steps: !draft.steps.is_empty(),
            steps: draft.steps.iter().map(StepStatus::of).collect(),
        }
    }

    /// Same answer as [`FlowDraft::is_valid`].
    pub fn is_valid(&self) -> bool {
        self.has_title && self.has_steps && self.steps.iter().all(StepStatus::is_valid)
    }

    /// Steps that still need work.
    pub fn incomplete_steps(&self) -> impl Iterator<Item = &StepStatus> {
        self.steps.iter().filter(|s| !s.is_valid())
    }
}

/// Completeness of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepStatus {
    pub step_id: String,
    pub step_number: u32,
    pub has_title: bool,
    pub has_questions: bool,
    pub all_questions_valid: bool,

    /// Ids of the questions that are not valid, in display order.
    pub invalid_questions: Vec<String>,
}

impl StepStatus {
    fn of(step: &Step) -> Self {
        let invalid_questions: Vec<String> = step
            .questions
            .iter()
            .filter(|q| !q.is_valid())
            .map(|q| q.id.clone())
            .collect();
        Self {
            step_id: step.id.clone(),
            step_number: step.step_number,
            has_title: !step.title.trim().is_empty(),
            has_questions: !step.questions.is_empty(),
            all_questions_valid: invalid_questions.is_empty(),
            invalid_questions,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.has_title && self.has_questions && self.all_questions_valid
    }
}

/// An editing session for one flow.
///
/// Owns the draft and the id generator used for every inserted node. Edits
/// addressed to unknown ids change nothing; the return value says whether
/// anything was touched.
#[derive(Debug, Clone)]
pub struct FlowEditor<G: IdGenerator> {
    draft: FlowDraft,
    ids: G,
    flow_id: Option<String>,
}

impl<G: IdGenerator> FlowEditor<G> {
    /// Start a new flow with a single empty step.
    pub fn new(mut ids: G) -> Self {
        let mut draft = FlowDraft::new();
        draft.insert_step(&mut ids);
        Self {
            draft,
            ids,
            flow_id: None,
        }
    }

    /// Re-edit a persisted flow. Saving updates it in place.
    pub fn from_flow(flow: &Flow, ids: G) -> Self {
        Self {
            draft: flow.draft(),
            ids,
            flow_id: Some(flow.id.clone()),
        }
    }

    /// Edit an existing draft that has not been persisted.
    pub fn from_draft(draft: FlowDraft, ids: G) -> Self {
        Self {
            draft,
            ids,
            flow_id: None,
        }
    }

    pub fn draft(&self) -> &FlowDraft {
        &self.draft
    }

    pub fn into_draft(self) -> FlowDraft {
        self.draft
    }

    /// Id of the persisted flow being edited, if any.
    pub fn flow_id(&self) -> Option<&str> {
        self.flow_id.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    // === Steps ===

    pub fn add_step(&mut self) -> String {
        self.draft.insert_step(&mut self.ids)
    }

    pub fn move_step(&mut self, step_id: &str, direction: Direction) -> bool {
        self.draft.move_step(step_id, direction)
    }

    pub fn remove_step(&mut self, step_id: &str) -> bool {
        self.draft.remove_step(step_id)
    }

    pub fn update_step(&mut self, step_id: &str, patch: StepPatch) -> bool {
        self.draft.update_step(step_id, patch)
    }

    // === Questions ===

    /// Append a text question to a step.
    pub fn add_question(&mut self, step_id: &str) -> Option<String> {
        let step = self.draft.step_mut(step_id)?;
        Some(step.insert_question(&mut self.ids))
    }

    pub fn remove_question(&mut self, step_id: &str, question_id: &str) -> bool {
        self.draft
            .step_mut(step_id)
            .is_some_and(|step| step.remove_question(question_id))
    }

    pub fn update_question(
        &mut self,
        step_id: &str,
        question_id: &str,
        patch: QuestionPatch,
    ) -> bool {
        self.draft
            .step_mut(step_id)
            .is_some_and(|step| step.update_question(question_id, patch))
    }

    // === Options ===

    /// Append a blank option. `None` if the question is unknown or not a select question.
    pub fn add_option(&mut self, step_id: &str, question_id: &str) -> Option<String> {
        let question = self.draft.step_mut(step_id)?.question_mut(question_id)?;
        question.insert_option(&mut self.ids)
    }

    pub fn remove_option(&mut self, step_id: &str, question_id: &str, option_id: &str) -> bool {
        self.draft
            .step_mut(step_id)
            .and_then(|step| step.question_mut(question_id))
            .is_some_and(|question| question.remove_option(option_id))
    }

    pub fn update_option(
        &mut self,
        step_id: &str,
        question_id: &str,
        option_id: &str,
        patch: OptionPatch,
    ) -> bool {
        self.draft
            .step_mut(step_id)
            .and_then(|step| step.question_mut(question_id))
            .is_some_and(|question| question.update_option(option_id, patch))
    }

    // === Validation and submission ===

    pub fn is_valid(&self) -> bool {
        self.draft.is_valid()
    }

    /// Per-step breakdown of what is missing.
    pub fn report(&self) -> ValidationReport {
        ValidationReport::of(&self.draft)
    }

    /// Encode the draft regardless of validity.
    pub fn document(&self) -> Result<FlowDocument, WireError> {
        wire::serialize(&self.draft)
    }

    /// Encode the draft if it is complete.
    pub fn submit(&self) -> Result<FlowDocument, EditorError> {
        let report = self.report();
        if !report.is_valid() {
            return Err(EditorError::Incomplete(report));
        }
        Ok(self.document()?)
    }

    /// Submit and persist: create on first save, update afterwards.
    ///
    /// Returns the flow as echoed by the repository. After a successful create
    /// the editor remembers the new id, so later saves update that flow.
    pub async fn save<R>(&mut self, repo: &R) -> Result<Flow, SaveError>
    where
        R: FlowRepository + ?Sized,
    {
        let document = self.submit()?;
        let flow = match &self.flow_id {
            Some(id) => repo.update_flow(id, &document).await?,
            None => repo.create_flow(&document).await?,
        };
        tracing::info!(flow_id = %flow.id, title = %flow.title, "flow saved");
        self.flow_id = Some(flow.id.clone());
        Ok(flow)
    }
}
