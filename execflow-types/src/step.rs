use crate::question::non_empty;
use crate::{IdGenerator, Question, QuestionPatch};

/// One page of a flow.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,

    /// 1-based position within the flow. Kept in sync by the flow's edits.
    pub step_number: u32,

    /// Questions in display order; `order` mirrors the position.
    pub questions: Vec<Question>,
}

impl Step {
    /// Create an empty, untitled step.
    pub fn new(id: impl Into<String>, step_number: u32) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            subtitle: None,
            description: None,
            step_number,
            questions: Vec::new(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// A step is complete when it is titled, has at least one question and
    /// every question is valid.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.questions.is_empty()
            && self.questions.iter().all(Question::is_valid)
    }

    /// Find a question by id.
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// Find a question by id for editing.
    pub fn question_mut(&mut self, question_id: &str) -> Option<&mut Question> {
        self.questions.iter_mut().find(|q| q.id == question_id)
    }

    /// Append an untitled text question and return its id.
    pub fn insert_question(&mut self, ids: &mut impl IdGenerator) -> String {
        let id = ids.next_id();
        let order = position_number(self.questions.len());
        self.questions.push(Question::new(id.clone(), order));
        id
    }

    /// Remove a question and renumber the rest. Returns `false` if it was not found.
    pub fn remove_question(&mut self, question_id: &str) -> bool {
        let before = self.questions.len();
        self.questions.retain(|q| q.id != question_id);
        if self.questions.len() == before {
            return false;
        }
        self.renumber_questions();
        true
    }

    /// Merge `patch` into a question. Returns `false` if it was not found.
    pub fn update_question(&mut self, question_id: &str, patch: QuestionPatch) -> bool {
        match self.question_mut(question_id) {
            Some(question) => {
                question.apply(patch);
                true
            }
            None => false,
        }
    }

    /// Merge `patch` into this step.
    pub fn apply(&mut self, patch: StepPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(subtitle) = patch.subtitle {
            self.subtitle = non_empty(subtitle);
        }
        if let Some(description) = patch.description {
            self.description = non_empty(description);
        }
    }

    fn renumber_questions(&mut self) {
        for (index, question) in self.questions.iter_mut().enumerate() {
            question.order = position_number(index);
        }
    }
}

/// Partial update for a step. Unset fields are left alone; an empty
/// subtitle or description clears it.
#[derive(Debug, Clone, Default)]
pub struct StepPatch {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
}

impl StepPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// 1-based number for a 0-based position.
pub(crate) fn position_number(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}
