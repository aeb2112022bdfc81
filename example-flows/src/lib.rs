pub mod catalog;
pub mod inspection;
pub mod salon_visit;

pub use catalog::{sample_products, sample_supplies};
pub use inspection::quick_inspection;
pub use salon_visit::salon_visit;

use chrono::Utc;
use execflow::{Flow, FlowDraft};

/// Wrap a finished draft as if it had just been persisted.
pub(crate) fn persisted(id: &str, draft: FlowDraft) -> Flow {
    let now = Utc::now();
    Flow {
        id: id.to_string(),
        title: draft.title,
        steps: draft.steps,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}
