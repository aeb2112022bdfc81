use serde::{Serialize, Serializer};

use crate::StockSelection;

/// A single answer captured while simulating a flow.
///
/// The variant is decided by the question's type: text questions store `Text`,
/// single-select stores the chosen option's `value`, multi-select stores the list of
/// chosen values, image upload stores preview references and stock control stores
/// an item-to-quantity selection.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    /// Free text (from Text or Textarea questions).
    Text(String),

    /// The `value` of the chosen option (SingleSelect).
    Choice(String),

    /// The `value`s of all chosen options, in selection order (MultiSelect).
    Choices(Vec<String>),

    /// Preview references, one per accepted image (ImageUpload).
    Images(Vec<String>),

    /// Quantities per inventory item (StockControl).
    Stock(StockSelection),
}

impl AnswerValue {
    /// Whether this value counts as an answer for step gating.
    ///
    /// Lists must be non-empty, strings must be non-empty. A stock selection is
    /// always filled once written, even when every item was deselected.
    pub fn is_filled(&self) -> bool {
        match self {
            Self::Text(s) | Self::Choice(s) => !s.is_empty(),
            Self::Choices(values) | Self::Images(values) => !values.is_empty(),
            Self::Stock(_) => true,
        }
    }

    /// Try to get this value as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a single chosen option value.
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            Self::Choice(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as chosen option values.
    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            Self::Choices(values) => Some(values),
            _ => None,
        }
    }

    /// Try to get this value as image preview references.
    pub fn as_images(&self) -> Option<&[String]> {
        match self {
            Self::Images(urls) => Some(urls),
            _ => None,
        }
    }

    /// Try to get this value as a stock selection.
    pub fn as_stock(&self) -> Option<&StockSelection> {
        match self {
            Self::Stock(selection) => Some(selection),
            _ => None,
        }
    }

    /// Get the type name of this value for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "Text",
            Self::Choice(_) => "Choice",
            Self::Choices(_) => "Choices",
            Self::Images(_) => "Images",
            Self::Stock(_) => "Stock",
        }
    }

    /// The JSON shape handed to the submission sink.
    ///
    /// Scalars become strings, lists become string arrays and a stock selection
    /// becomes a JSON-encoded string of its item-to-quantity map.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Self::Text(s) | Self::Choice(s) => serde_json::Value::String(s.clone()),
            Self::Choices(values) | Self::Images(values) => serde_json::Value::Array(
                values
                    .iter()
                    .cloned()
                    .map(serde_json::Value::String)
                    .collect(),
            ),
            Self::Stock(selection) => serde_json::Value::String(selection.to_json()),
        }
    }
}

impl Serialize for AnswerValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<StockSelection> for AnswerValue {
    fn from(selection: StockSelection) -> Self {
        Self::Stock(selection)
    }
}
