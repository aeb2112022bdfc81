/// A question type code outside `1..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown question type code {0}")]
pub struct UnknownQuestionType(pub i64);

/// Failure reported by an external collaborator (persistence or inventory).
///
/// Always recoverable: the caller's state is left untouched and the triggering
/// action may be retried.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The collaborator was reached but the call failed.
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Wrap a collaborator error with a human-readable message.
    pub fn failed(message: impl Into<String>, err: impl Into<anyhow::Error>) -> Self {
        Self::Failed {
            message: message.into(),
            source: err.into(),
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
