use std::collections::HashMap;

use serde::Serialize;

use crate::{AnswerValue, StockSelection};

/// Error type for answer access operations.
#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("Missing answer for question: {0}")]
    Missing(String),

    #[error("Type mismatch for question '{question_id}': expected {expected}, got {actual}")]
    TypeMismatch {
        question_id: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Answers collected during one simulation session, keyed by question id.
///
/// An absent key means "unanswered". The set is created fresh when a simulation
/// starts and is never persisted by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Answers {
    values: HashMap<String, AnswerValue>,
}

impl Answers {
    /// Create a new empty answer set.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Insert an answer for the given question, returning the previous one.
    pub fn insert(
        &mut self,
        question_id: impl Into<String>,
        value: impl Into<AnswerValue>,
    ) -> Option<AnswerValue> {
        self.values.insert(question_id.into(), value.into())
    }

    /// Get the answer for a question.
    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.values.get(question_id)
    }

    /// Check if a question has any answer recorded (filled or not).
    pub fn contains(&self, question_id: &str) -> bool {
        self.values.contains_key(question_id)
    }

    /// Remove the answer for a question.
    pub fn remove(&mut self, question_id: &str) -> Option<AnswerValue> {
        self.values.remove(question_id)
    }

    /// Get an iterator over all question-answer pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.values.iter()
    }

    /// Get the number of recorded answers.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check if a question has a non-empty answer.
    pub fn has_value(&self, question_id: &str) -> bool {
        self.get(question_id).is_some_and(AnswerValue::is_filled)
    }

    // === Convenience accessors ===

    /// Get a text answer.
    pub fn get_text(&self, question_id: &str) -> Result<&str, AnswerError> {
        match self.get(question_id) {
            Some(AnswerValue::Text(s)) => Ok(s),
            Some(other) => Err(mismatch(question_id, "Text", other)),
            None => Err(AnswerError::Missing(question_id.to_string())),
        }
    }

    /// Get a single-select answer.
    pub fn get_choice(&self, question_id: &str) -> Result<&str, AnswerError> {
        match self.get(question_id) {
            Some(AnswerValue::Choice(s)) => Ok(s),
            Some(other) => Err(mismatch(question_id, "Choice", other)),
            None => Err(AnswerError::Missing(question_id.to_string())),
        }
    }

    /// Get a multi-select answer.
    pub fn get_choices(&self, question_id: &str) -> Result<&[String], AnswerError> {
        match self.get(question_id) {
            Some(AnswerValue::Choices(values)) => Ok(values),
            Some(other) => Err(mismatch(question_id, "Choices", other)),
            None => Err(AnswerError::Missing(question_id.to_string())),
        }
    }

    /// Get the image preview references of an upload answer.
    pub fn get_images(&self, question_id: &str) -> Result<&[String], AnswerError> {
        match self.get(question_id) {
            Some(AnswerValue::Images(urls)) => Ok(urls),
            Some(other) => Err(mismatch(question_id, "Images", other)),
            None => Err(AnswerError::Missing(question_id.to_string())),
        }
    }

    /// Get a stock-control selection.
    pub fn get_stock(&self, question_id: &str) -> Result<&StockSelection, AnswerError> {
        match self.get(question_id) {
            Some(AnswerValue::Stock(selection)) => Ok(selection),
            Some(other) => Err(mismatch(question_id, "Stock", other)),
            None => Err(AnswerError::Missing(question_id.to_string())),
        }
    }
}

fn mismatch(question_id: &str, expected: &'static str, actual: &AnswerValue) -> AnswerError {
    AnswerError::TypeMismatch {
        question_id: question_id.to_string(),
        expected,
        actual: actual.type_name(),
    }
}

impl<'a> IntoIterator for &'a Answers {
    type Item = (&'a String, &'a AnswerValue);
    type IntoIter = std::collections::hash_map::Iter<'a, String, AnswerValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Free-text elaborations keyed by option id.
///
/// Lives alongside [`Answers`]; an entry exists once the user typed something
/// against an option that has extra answers enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtraAnswers {
    values: HashMap<String, String>,
}

impl ExtraAnswers {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The text typed for an option, or `""` when nothing was typed.
    pub fn get(&self, option_id: &str) -> &str {
        self.values.get(option_id).map(String::as_str).unwrap_or("")
    }

    /// Record text for an option.
    pub fn set(&mut self, option_id: impl Into<String>, text: impl Into<String>) {
        self.values.insert(option_id.into(), text.into());
    }

    /// Get an iterator over all option-text pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }

    /// Number of recorded extra answers.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut answers = Answers::new();
        answers.insert("q1", "Alice");
        answers.insert("q2", AnswerValue::Choices(vec!["a".into()]));

        assert_eq!(answers.get_text("q1").unwrap(), "Alice");
        assert_eq!(answers.get_choices("q2").unwrap(), ["a".to_string()]);
    }

    #[test]
    fn has_value_ignores_empty_answers() {
        let mut answers = Answers::new();
        answers.insert("q1", "");
        answers.insert("q2", AnswerValue::Images(vec![]));

        assert!(answers.contains("q1"));
        assert!(!answers.has_value("q1"));
        assert!(!answers.has_value("q2"));
        assert!(!answers.has_value("q3"));
    }

    #[test]
    fn type_mismatch_error() {
        let mut answers = Answers::new();
        answers.insert("q1", AnswerValue::Choice("yes".into()));

        let result = answers.get_text("q1");
        assert!(matches!(result, Err(AnswerError::TypeMismatch { .. })));
        assert!(matches!(
            answers.get_stock("missing"),
            Err(AnswerError::Missing(_))
        ));
    }

    #[test]
    fn extra_answers_default_to_empty() {
        let mut extra = ExtraAnswers::new();
        assert_eq!(extra.get("opt"), "");
        extra.set("opt", "details");
        assert_eq!(extra.get("opt"), "details");
        assert_eq!(extra.len(), 1);
    }
}
