use chrono::{DateTime, Utc};

use crate::step::position_number;
use crate::{IdGenerator, Step, StepPatch};

/// Direction for [`FlowDraft::move_step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the start of the flow.
    Up,
    /// Towards the end of the flow.
    Down,
}

/// The editable part of a flow: its title and steps.
///
/// Every structural edit keeps `step_number` equal to the step's 1-based
/// position. Edits addressed to an unknown id change nothing and report it
/// through their return value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowDraft {
    pub title: String,
    pub steps: Vec<Step>,
}

impl FlowDraft {
    /// Create an untitled draft without steps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// A flow can be saved when it is titled, has at least one step and every
    /// step is complete.
    pub fn is_valid(&self) -> bool {
        is_complete(&self.title, &self.steps)
    }

    /// Find a step by id.
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Find a step by id for editing.
    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == step_id)
    }

    /// Append an empty step and return its id.
    pub fn insert_step(&mut self, ids: &mut impl IdGenerator) -> String {
        let id = ids.next_id();
        let number = position_number(self.steps.len());
        self.steps.push(Step::new(id.clone(), number));
        id
    }

    /// Swap a step with its neighbour.
    ///
    /// Returns `false` when the step is unknown or already at the boundary in
    /// that direction, in which case nothing changes.
    pub fn move_step(&mut self, step_id: &str, direction: Direction) -> bool {
        let Some(index) = self.steps.iter().position(|s| s.id == step_id) else {
            return false;
        };
        let target = match direction {
            Direction::Up if index > 0 => index - 1,
            Direction::Down if index + 1 < self.steps.len() => index + 1,
            _ => return false,
        };
        self.steps.swap(index, target);
        self.renumber_steps();
        true
    }

    /// Remove a step and renumber the rest. Returns `false` if it was not found.
    pub fn remove_step(&mut self, step_id: &str) -> bool {
        let before = self.steps.len();
        self.steps.retain(|s| s.id != step_id);
        if self.steps.len() == before {
            return false;
        }
        self.renumber_steps();
        true
    }

    /// Merge `patch` into a step. Returns `false` if it was not found.
    pub fn update_step(&mut self, step_id: &str, patch: StepPatch) -> bool {
        match self.step_mut(step_id) {
            Some(step) => {
                step.apply(patch);
                true
            }
            None => false,
        }
    }

    fn renumber_steps(&mut self) {
        for (index, step) in self.steps.iter_mut().enumerate() {
            step.step_number = position_number(index);
        }
    }
}

/// A persisted flow as returned by the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub id: String,
    pub title: String,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set when the flow was soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Flow {
    /// Copy the editable part out for a re-edit.
    pub fn draft(&self) -> FlowDraft {
        FlowDraft {
            title: self.title.clone(),
            steps: self.steps.clone(),
        }
    }

    /// Same rule as [`FlowDraft::is_valid`].
    pub fn is_valid(&self) -> bool {
        is_complete(&self.title, &self.steps)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Total number of questions across all steps.
    pub fn question_count(&self) -> usize {
        self.steps.iter().map(|s| s.questions.len()).sum()
    }
}

fn is_complete(title: &str, steps: &[Step]) -> bool {
    !title.trim().is_empty() && !steps.is_empty() && steps.iter().all(Step::is_valid)
}
