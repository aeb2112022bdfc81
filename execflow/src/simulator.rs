//! Step-by-step walker over a persisted flow.
//!
//! The engine holds the answer set of one session. Navigation that violates
//! a guard is a no-op reported as `false`; a capture that violates a
//! constraint is rejected and leaves the previous answer in place.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::stock::{self, InventoryRequest, InventoryStatus, StockControlState};
use crate::{
    AnswerValue, Answers, ExtraAnswers, Flow, FlowRepository, ImageFile, InventoryItem,
    InventorySource, PreviewStore, Question, QuestionKind, QuestionType, ServiceError, Step,
    StockSelection,
};

/// Result of a capture operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum CaptureOutcome {
    Recorded,
    Rejected(Rejection),
}

impl CaptureOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded)
    }

    /// The rejection reason, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Recorded => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

impl From<Rejection> for CaptureOutcome {
    fn from(reason: Rejection) -> Self {
        Self::Rejected(reason)
    }
}

/// Why a capture was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("unknown question")]
    UnknownQuestion,

    #[error("not a valid answer for a {0} question")]
    TypeMismatch(QuestionType),

    #[error("unknown option")]
    UnknownOption,

    #[error("this option does not take an extra answer")]
    ExtraAnswerDisabled,

    #[error("select the option first")]
    OptionNotSelected,

    #[error("at most {limit} characters allowed")]
    TooLong { limit: usize },

    #[error("no image at that position")]
    UnknownImage,

    #[error("inventory is not loaded")]
    InventoryUnavailable,

    #[error("item is not in the inventory")]
    UnknownItem,

    #[error("the simulation was already submitted")]
    Finished,
}

/// The answers handed to the submission sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPayload {
    pub answers: Answers,
    pub extra_answers: ExtraAnswers,
}

/// A simulation session over one flow.
///
/// Owns every preview reference it acquires through `P` and releases each
/// exactly once: when the image is removed, when its answer is replaced or
/// cleared, or when the simulator is closed or dropped.
pub struct FlowSimulator<P: PreviewStore> {
    flow: Flow,
    current: usize,
    answers: Answers,
    extra_answers: ExtraAnswers,
    stock: HashMap<String, StockControlState>,
    previews: P,
    finished: bool,
}

impl<P: PreviewStore> FlowSimulator<P> {
    /// Start at the first step with an empty answer set.
    pub fn new(flow: Flow, previews: P) -> Self {
        let mut simulator = Self {
            flow,
            current: 0,
            answers: Answers::new(),
            extra_answers: ExtraAnswers::new(),
            stock: HashMap::new(),
            previews,
            finished: false,
        };
        simulator.enter_step();
        simulator
    }

    /// Fetch the latest version of a flow and start simulating it.
    pub async fn load<R>(repo: &R, flow_id: &str, previews: P) -> Result<Self, ServiceError>
    where
        R: FlowRepository + ?Sized,
    {
        let flow = repo.get_flow(flow_id).await?;
        tracing::debug!(flow_id, steps = flow.steps.len(), "simulation started");
        Ok(Self::new(flow, previews))
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.flow.steps.get(self.current)
    }

    pub fn step_count(&self) -> usize {
        self.flow.steps.len()
    }

    pub fn is_last_step(&self) -> bool {
        self.current + 1 >= self.flow.steps.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn extra_answers(&self) -> &ExtraAnswers {
        &self.extra_answers
    }

    pub fn answer(&self, question_id: &str) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    pub fn previews(&self) -> &P {
        &self.previews
    }

    // === Gating ===

    /// Whether every question of `step` has a non-empty answer.
    ///
    /// Extra answers never take part, even on options that enable them.
    pub fn is_step_answered(&self, step: &Step) -> bool {
        step.questions
            .iter()
            .all(|q| q.is_answered(self.answers.get(&q.id)))
    }

    /// Questions of the current step that still need an answer.
    pub fn unanswered_questions(&self) -> Vec<&Question> {
        self.current_step()
            .map(|step| {
                step.questions
                    .iter()
                    .filter(|q| !q.is_answered(self.answers.get(&q.id)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn can_advance(&self) -> bool {
        !self.finished
            && !self.is_last_step()
            && self.current_step().is_some_and(|s| self.is_step_answered(s))
    }

    pub fn can_submit(&self) -> bool {
        !self.finished
            && self.is_last_step()
            && self.current_step().is_some_and(|s| self.is_step_answered(s))
    }

    // === Navigation ===

    /// Advance one step if the current step is fully answered.
    pub fn next(&mut self) -> bool {
        if !self.can_advance() {
            tracing::debug!(step = self.current, "next refused");
            return false;
        }
        self.current += 1;
        self.enter_step();
        tracing::debug!(step = self.current, "advanced");
        true
    }

    /// Go back one step. Never gated on answers.
    pub fn previous(&mut self) -> bool {
        if self.finished || self.current == 0 {
            return false;
        }
        self.current -= 1;
        self.enter_step();
        tracing::debug!(step = self.current, "went back");
        true
    }

    /// Hand the answers to `sink` if the last step is fully answered.
    ///
    /// After a successful submit the session is finished and further captures
    /// are rejected. Preview references stay owned by the simulator until it
    /// is closed or dropped.
    pub fn submit<F>(&mut self, sink: F) -> bool
    where
        F: FnOnce(SimulationPayload),
    {
        if !self.can_submit() {
            tracing::debug!(step = self.current, "submit refused");
            return false;
        }
        sink(SimulationPayload {
            answers: self.answers.clone(),
            extra_answers: self.extra_answers.clone(),
        });
        self.finished = true;
        tracing::info!(
            flow_id = %self.flow.id,
            answers = self.answers.len(),
            extra_answers = self.extra_answers.len(),
            "simulation submitted"
        );
        true
    }

    /// End the session, releasing every outstanding preview reference.
    pub fn close(mut self) {
        self.release_all();
    }

    // === Text and choices ===

    /// Record text for a Text or Textarea question.
    pub fn set_text(&mut self, question_id: &str, text: &str) -> CaptureOutcome {
        let text_question = match self.question_kind(question_id) {
            Ok(QuestionKind::Text(text_question) | QuestionKind::Textarea(text_question)) => {
                text_question
            }
            Ok(kind) => return Rejection::TypeMismatch(kind.question_type()).into(),
            Err(reason) => return reason.into(),
        };
        if let Some(limit) = text_question.limit()
            && !text_question.accepts(text)
        {
            return Rejection::TooLong { limit }.into();
        }
        self.record(question_id, AnswerValue::Text(text.to_string()))
    }

    /// Choose the option storing `value` on a single-select question.
    pub fn select_option(&mut self, question_id: &str, value: &str) -> CaptureOutcome {
        let choice = match self.question_kind(question_id) {
            Ok(QuestionKind::SingleSelect(choice)) => choice,
            Ok(kind) => return Rejection::TypeMismatch(kind.question_type()).into(),
            Err(reason) => return reason.into(),
        };
        if choice.option_by_value(value).is_none() {
            return Rejection::UnknownOption.into();
        }
        self.record(question_id, AnswerValue::Choice(value.to_string()))
    }

    /// Add or remove `value` on a multi-select question.
    ///
    /// Deselecting the last value leaves an empty, unanswered selection.
    pub fn toggle_option(&mut self, question_id: &str, value: &str) -> CaptureOutcome {
        let choice = match self.question_kind(question_id) {
            Ok(QuestionKind::MultiSelect(choice)) => choice,
            Ok(kind) => return Rejection::TypeMismatch(kind.question_type()).into(),
            Err(reason) => return reason.into(),
        };
        if choice.option_by_value(value).is_none() {
            return Rejection::UnknownOption.into();
        }

        let mut values = self
            .answers
            .get(question_id)
            .and_then(AnswerValue::as_choices)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        if let Some(position) = values.iter().position(|v| v == value) {
            values.remove(position);
        } else {
            values.push(value.to_string());
        }
        self.record(question_id, AnswerValue::Choices(values))
    }

    /// Record free text against a selected option that enables it.
    pub fn set_extra_answer(
        &mut self,
        question_id: &str,
        option_id: &str,
        text: &str,
    ) -> CaptureOutcome {
        if self.finished {
            return Rejection::Finished.into();
        }
        let Some(question) = find_question(&self.flow, question_id) else {
            return Rejection::UnknownQuestion.into();
        };
        if !question.question_type().has_options() {
            return Rejection::TypeMismatch(question.question_type()).into();
        }
        let Some(option) = question.option(option_id) else {
            return Rejection::UnknownOption.into();
        };
        if !option.enable_extra_answer {
            return Rejection::ExtraAnswerDisabled.into();
        }

        let selected = match self.answers.get(question_id) {
            Some(AnswerValue::Choice(value)) => *value == option.value,
            Some(AnswerValue::Choices(values)) => values.contains(&option.value),
            _ => false,
        };
        if !selected {
            return Rejection::OptionNotSelected.into();
        }
        if let Some(limit) = option.extra_answer_limit()
            && !option.accepts_extra_answer(text)
        {
            return Rejection::TooLong { limit }.into();
        }

        tracing::debug!(question_id, option_id, "extra answer recorded");
        self.extra_answers.set(option_id, text);
        CaptureOutcome::Recorded
    }

    // === Images ===

    /// Replace the image selection of an upload question.
    ///
    /// Files beyond `max_images` are dropped without being acquired. The
    /// previous selection is released first. An empty `files` clears the answer.
    pub fn attach_images(&mut self, question_id: &str, files: &[ImageFile]) -> CaptureOutcome {
        let upload = match self.question_kind(question_id) {
            Ok(QuestionKind::ImageUpload(upload)) => upload,
            Ok(kind) => return Rejection::TypeMismatch(kind.question_type()).into(),
            Err(reason) => return reason.into(),
        };
        let kept = upload.cap(files.len());

        self.release_answer(question_id);
        if kept == 0 {
            tracing::debug!(question_id, "image selection cleared");
            return CaptureOutcome::Recorded;
        }
        let references = files[..kept]
            .iter()
            .map(|file| self.previews.acquire(file))
            .collect();
        self.record(question_id, AnswerValue::Images(references))
    }

    /// Remove one image by position, releasing its reference.
    pub fn remove_image(&mut self, question_id: &str, index: usize) -> CaptureOutcome {
        match self.question_kind(question_id) {
            Ok(QuestionKind::ImageUpload(_)) => {}
            Ok(kind) => return Rejection::TypeMismatch(kind.question_type()).into(),
            Err(reason) => return reason.into(),
        }
        let Some(AnswerValue::Images(references)) = self.answers.get(question_id) else {
            return Rejection::UnknownImage.into();
        };
        if index >= references.len() {
            return Rejection::UnknownImage.into();
        }

        let mut references = references.clone();
        let removed = references.remove(index);
        self.previews.release(&removed);
        if references.is_empty() {
            self.answers.remove(question_id);
            tracing::debug!(question_id, "last image removed");
            CaptureOutcome::Recorded
        } else {
            self.record(question_id, AnswerValue::Images(references))
        }
    }

    /// Drop the answer of any question, releasing its images.
    ///
    /// Returns `false` when there was nothing to clear.
    pub fn clear_answer(&mut self, question_id: &str) -> bool {
        if self.finished {
            return false;
        }
        let cleared = self.release_answer(question_id);
        if cleared {
            tracing::debug!(question_id, "answer cleared");
        }
        cleared
    }

    // === Stock control ===

    /// Select an item at quantity zero, or deselect it.
    pub fn toggle_stock_item(&mut self, question_id: &str, item_id: &str) -> CaptureOutcome {
        self.edit_stock(question_id, item_id, |selection| {
            selection.toggle(item_id);
        })
    }

    /// Set an item's quantity; zero or below removes the item.
    pub fn set_stock_quantity(
        &mut self,
        question_id: &str,
        item_id: &str,
        quantity: i64,
    ) -> CaptureOutcome {
        self.edit_stock(question_id, item_id, |selection| {
            selection.set_quantity(item_id, quantity);
        })
    }

    /// Change an item's quantity by `delta`.
    pub fn adjust_stock_quantity(
        &mut self,
        question_id: &str,
        item_id: &str,
        delta: i64,
    ) -> CaptureOutcome {
        self.edit_stock(question_id, item_id, |selection| {
            selection.adjust(item_id, delta);
        })
    }

    /// The current selection of a stock-control question.
    pub fn stock_selection(&self, question_id: &str) -> Option<&StockSelection> {
        self.answers.get(question_id).and_then(AnswerValue::as_stock)
    }

    /// Lookup status of a stock-control question that has been shown.
    pub fn inventory_status(&self, question_id: &str) -> Option<&InventoryStatus> {
        self.stock.get(question_id).map(StockControlState::status)
    }

    /// Running total of a product selection.
    ///
    /// `None` for supply inventories, which are unpriced, and while the
    /// inventory is not loaded.
    pub fn stock_total(&self, question_id: &str) -> Option<Decimal> {
        let Some(QuestionKind::StockControl(stock)) =
            find_question(&self.flow, question_id).map(|q| &q.kind)
        else {
            return None;
        };
        if !stock.inventory.is_priced() {
            return None;
        }
        let items = self.stock.get(question_id)?.status().items()?;
        let total = self
            .stock_selection(question_id)
            .map(|selection| stock::selection_total(selection, items))
            .unwrap_or_default();
        Some(total)
    }

    /// Lookups due for stock-control questions that have been shown.
    ///
    /// Each returned question moves to `Loading`; report the outcome through
    /// [`finish_inventory_load`](Self::finish_inventory_load).
    pub fn take_inventory_requests(&mut self) -> Vec<InventoryRequest> {
        let mut requests = Vec::new();
        for (question_id, state) in &mut self.stock {
            let Some(QuestionKind::StockControl(stock)) =
                find_question(&self.flow, question_id).map(|q| &q.kind)
            else {
                continue;
            };
            if state.begin_load() {
                requests.push(InventoryRequest {
                    question_id: question_id.clone(),
                    kind: stock.inventory,
                });
            }
        }
        requests.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        requests
    }

    /// Store a lookup outcome and apply the question's defaults if due.
    pub fn finish_inventory_load(
        &mut self,
        question_id: &str,
        result: Result<Vec<InventoryItem>, ServiceError>,
    ) {
        let Some(QuestionKind::StockControl(stock)) =
            find_question(&self.flow, question_id).map(|q| &q.kind)
        else {
            return;
        };
        let Some(state) = self.stock.get_mut(question_id) else {
            return;
        };

        match &result {
            Ok(items) => {
                tracing::debug!(question_id, items = items.len(), "inventory loaded");
            }
            Err(err) => {
                tracing::warn!(question_id, kind = %stock.inventory, "inventory load failed: {err}");
            }
        }
        state.finish_load(result);

        if let Some(seed) = state.take_seed(stock, self.answers.contains(question_id)) {
            tracing::debug!(question_id, items = seed.len(), "stock defaults applied");
            self.answers.insert(question_id, seed);
        }
    }

    /// Perform every due lookup against `source`.
    pub async fn load_inventory<S>(&mut self, source: &S)
    where
        S: InventorySource + ?Sized,
    {
        for request in self.take_inventory_requests() {
            let result = source.list_items(request.kind).await;
            self.finish_inventory_load(&request.question_id, result);
        }
    }

    // === Internals ===

    fn question_kind(&self, question_id: &str) -> Result<&QuestionKind, Rejection> {
        if self.finished {
            return Err(Rejection::Finished);
        }
        find_question(&self.flow, question_id)
            .map(|q| &q.kind)
            .ok_or(Rejection::UnknownQuestion)
    }

    fn record(&mut self, question_id: &str, value: AnswerValue) -> CaptureOutcome {
        tracing::debug!(question_id, kind = value.type_name(), "answer recorded");
        self.answers.insert(question_id, value);
        CaptureOutcome::Recorded
    }

    fn edit_stock<F>(&mut self, question_id: &str, item_id: &str, edit: F) -> CaptureOutcome
    where
        F: FnOnce(&mut StockSelection),
    {
        match self.question_kind(question_id) {
            Ok(QuestionKind::StockControl(_)) => {}
            Ok(kind) => return Rejection::TypeMismatch(kind.question_type()).into(),
            Err(reason) => return reason.into(),
        }
        let Some(status) = self.inventory_status(question_id) else {
            return Rejection::InventoryUnavailable.into();
        };
        if status.items().is_none() {
            return Rejection::InventoryUnavailable.into();
        }
        if status.item(item_id).is_none() {
            return Rejection::UnknownItem.into();
        }

        let mut selection = self.stock_selection(question_id).cloned().unwrap_or_default();
        edit(&mut selection);
        self.record(question_id, AnswerValue::Stock(selection))
    }

    fn enter_step(&mut self) {
        let Some(step) = self.flow.steps.get(self.current) else {
            return;
        };
        for question in &step.questions {
            if matches!(question.kind, QuestionKind::StockControl(_)) {
                self.stock.entry(question.id.clone()).or_default();
            }
        }
    }

    /// Remove an answer, releasing its preview references.
    fn release_answer(&mut self, question_id: &str) -> bool {
        match self.answers.remove(question_id) {
            Some(AnswerValue::Images(references)) => {
                for reference in &references {
                    self.previews.release(reference);
                }
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    fn release_all(&mut self) {
        let image_questions: Vec<String> = self
            .answers
            .iter()
            .filter(|(_, value)| matches!(value, AnswerValue::Images(_)))
            .map(|(question_id, _)| question_id.clone())
            .collect();
        for question_id in image_questions {
            self.release_answer(&question_id);
        }
    }
}

impl<P: PreviewStore> Drop for FlowSimulator<P> {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl<P: PreviewStore> std::fmt::Debug for FlowSimulator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowSimulator")
            .field("flow_id", &self.flow.id)
            .field("current", &self.current)
            .field("answers", &self.answers)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

fn find_question<'a>(flow: &'a Flow, question_id: &str) -> Option<&'a Question> {
    flow.steps
        .iter()
        .flat_map(|step| &step.questions)
        .find(|q| q.id == question_id)
}
