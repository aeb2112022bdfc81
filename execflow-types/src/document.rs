use serde::{Deserialize, Serialize};

/// The payload handed to the persistence API when creating or updating a flow.
///
/// `flow` is an opaque JSON string holding the step tree; the API stores it
/// as-is next to the title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDocument {
    pub title: String,
    pub flow: String,
}

impl FlowDocument {
    pub fn new(title: impl Into<String>, flow: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            flow: flow.into(),
        }
    }
}
