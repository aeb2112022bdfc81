//! In-memory collaborators for exercising editors and simulators without a
//! network.
//!
//! # Example
//!
//! ```rust,ignore
//! use execflow::{FlowEditor, FlowSimulator, InMemoryFlowStore, RecordingPreviews, UuidGenerator};
//!
//! let store = InMemoryFlowStore::new();
//! let mut editor = FlowEditor::new(UuidGenerator);
//! // ... edit ...
//! let flow = editor.save(&store).await?;
//!
//! let previews = RecordingPreviews::new();
//! let simulator = FlowSimulator::load(&store, &flow.id, previews.clone()).await?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::wire;
use crate::{
    Flow, FlowDocument, FlowRepository, ImageFile, InventoryItem, InventoryKind, InventorySource,
    PreviewStore, Question, ServiceError, Step,
};

/// A [`FlowRepository`] that keeps flows in memory.
///
/// Documents go through the wire codec on the way in, so a saved flow reads
/// back exactly as a real API would return it.
#[derive(Debug, Default)]
pub struct InMemoryFlowStore {
    flows: Mutex<Vec<Flow>>,
    next_id: AtomicUsize,
    failure: Mutex<Option<String>>,
}

impl InMemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing flow.
    pub fn with_flow(self, flow: Flow) -> Self {
        lock(&self.flows).push(flow);
        self
    }

    /// Make every call fail with `message` until [`recover`](Self::recover).
    pub fn fail_with(&self, message: impl Into<String>) {
        *lock(&self.failure) = Some(message.into());
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    /// Number of stored flows.
    pub fn len(&self) -> usize {
        lock(&self.flows).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), ServiceError> {
        match lock(&self.failure).as_ref() {
            Some(message) => Err(ServiceError::failed(
                message.clone(),
                anyhow::anyhow!("flow store unavailable"),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FlowRepository for InMemoryFlowStore {
    async fn list_flows(&self) -> Result<Vec<Flow>, ServiceError> {
        self.check()?;
        Ok(lock(&self.flows).clone())
    }

    async fn get_flow(&self, id: &str) -> Result<Flow, ServiceError> {
        self.check()?;
        lock(&self.flows)
            .iter()
            .find(|flow| flow.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    async fn create_flow(&self, document: &FlowDocument) -> Result<Flow, ServiceError> {
        self.check()?;
        let steps = decode(document)?;
        let now = Utc::now();
        let number = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let flow = Flow {
            id: format!("flow-{number}"),
            title: document.title.clone(),
            steps,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        lock(&self.flows).push(flow.clone());
        Ok(flow)
    }

    async fn update_flow(&self, id: &str, document: &FlowDocument) -> Result<Flow, ServiceError> {
        self.check()?;
        let steps = decode(document)?;
        let mut flows = lock(&self.flows);
        let flow = flows
            .iter_mut()
            .find(|flow| flow.id == id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        flow.title = document.title.clone();
        flow.steps = steps;
        flow.updated_at = Utc::now();
        Ok(flow.clone())
    }
}

fn decode(document: &FlowDocument) -> Result<Vec<Step>, ServiceError> {
    wire::decode_steps(&document.flow)
        .map_err(|err| ServiceError::failed("invalid flow document", err))
}

/// An [`InventorySource`] with fixed catalogs.
///
/// A kind without a catalog answers `NotFound`.
#[derive(Debug, Default)]
pub struct StaticInventory {
    catalogs: HashMap<InventoryKind, Vec<InventoryItem>>,
    failure: Mutex<Option<String>>,
    requests: AtomicUsize,
}

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the catalog for one inventory kind.
    pub fn with_items(mut self, kind: InventoryKind, items: Vec<InventoryItem>) -> Self {
        self.catalogs.insert(kind, items);
        self
    }

    /// Make every lookup fail with `message` until [`recover`](Self::recover).
    pub fn fail_with(&self, message: impl Into<String>) {
        *lock(&self.failure) = Some(message.into());
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    /// Number of lookups served so far, failed ones included.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl InventorySource for StaticInventory {
    async fn list_items(&self, kind: InventoryKind) -> Result<Vec<InventoryItem>, ServiceError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = lock(&self.failure).as_ref() {
            return Err(ServiceError::failed(
                message.clone(),
                anyhow::anyhow!("{kind} lookup failed"),
            ));
        }
        self.catalogs
            .get(&kind)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("{kind} catalog")))
    }
}

/// A [`PreviewStore`] that records every acquire and release.
///
/// Clones share the same log, so a test can keep one handle while the
/// simulator owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingPreviews {
    log: Arc<Mutex<PreviewLog>>,
}

#[derive(Debug, Default)]
struct PreviewLog {
    acquired: Vec<String>,
    released: Vec<String>,
}

impl RecordingPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired_count(&self) -> usize {
        lock(&self.log).acquired.len()
    }

    pub fn released_count(&self) -> usize {
        lock(&self.log).released.len()
    }

    /// References acquired and not yet released, in acquisition order.
    pub fn outstanding(&self) -> Vec<String> {
        let log = lock(&self.log);
        log.acquired
            .iter()
            .filter(|r| !log.released.contains(r))
            .cloned()
            .collect()
    }

    /// Whether any reference was released more than once.
    pub fn has_double_release(&self) -> bool {
        let log = lock(&self.log);
        log.released
            .iter()
            .enumerate()
            .any(|(i, r)| log.released[..i].contains(r))
    }
}

impl PreviewStore for RecordingPreviews {
    fn acquire(&mut self, file: &ImageFile) -> String {
        let mut log = lock(&self.log);
        let reference = format!("blob:preview/{}/{}", log.acquired.len() + 1, file.name);
        log.acquired.push(reference.clone());
        reference
    }

    fn release(&mut self, reference: &str) {
        lock(&self.log).released.push(reference.to_string());
    }
}

/// Build a persisted flow from per-step question lists.
///
/// Steps are titled `Step n` with ids `step-n`; questions are renumbered in order.
pub fn flow_with_steps(steps: Vec<Vec<Question>>) -> Flow {
    let now = Utc::now();
    Flow {
        id: "flow-test".to_string(),
        title: "Test flow".to_string(),
        steps: steps
            .into_iter()
            .enumerate()
            .map(|(index, questions)| {
                let number = u32::try_from(index + 1).unwrap_or(u32::MAX);
                let mut step =
                    Step::new(format!("step-{number}"), number).with_title(format!("Step {number}"));
                step.questions = questions
                    .into_iter()
                    .zip(1..)
                    .map(|(question, order)| Question { order, ..question })
                    .collect();
                step
            })
            .collect(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
