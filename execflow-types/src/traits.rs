use async_trait::async_trait;

use crate::{Flow, FlowDocument, InventoryItem, InventoryKind, ServiceError};

/// Persistence for flow documents.
///
/// Implemented by thin HTTP clients in production. Implementations hand back
/// flows already decoded from the wire's nested-JSON encoding.
#[async_trait]
pub trait FlowRepository: Send + Sync {
    /// List all stored flows.
    async fn list_flows(&self) -> Result<Vec<Flow>, ServiceError>;

    /// Fetch one flow by id.
    async fn get_flow(&self, id: &str) -> Result<Flow, ServiceError>;

    /// Store a new flow and return it as persisted.
    async fn create_flow(&self, document: &FlowDocument) -> Result<Flow, ServiceError>;

    /// Replace an existing flow and return it as persisted.
    async fn update_flow(&self, id: &str, document: &FlowDocument) -> Result<Flow, ServiceError>;
}

/// Lookup of candidate items for stock-control questions.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// List the items of one inventory.
    ///
    /// Product items carry a unit price; supply items do not.
    async fn list_items(&self, kind: InventoryKind) -> Result<Vec<InventoryItem>, ServiceError>;
}

/// Owner of ephemeral preview references for selected image files.
///
/// Every reference returned by [`acquire`](Self::acquire) must be passed to
/// [`release`](Self::release) exactly once.
pub trait PreviewStore {
    /// Create a preview reference for a selected file.
    fn acquire(&mut self, file: &ImageFile) -> String;

    /// Release a reference created by `acquire`.
    fn release(&mut self, reference: &str);
}

/// A file picked for an image-upload question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
        }
    }
}
