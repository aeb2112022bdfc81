//! Inventory binding for stock-control questions.
//!
//! Each visible stock-control question owns a [`StockControlState`] that
//! tracks the inventory lookup and whether its defaults were applied.

use rust_decimal::Decimal;

use crate::{InventoryItem, InventoryKind, ServiceError, StockControlQuestion, StockSelection};

/// Progress of the inventory lookup for one question.
///
/// `Ready(vec![])` is an empty inventory, distinct from `Failed` and `Loading`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum InventoryStatus {
    #[default]
    NotRequested,
    Loading,
    Failed(String),
    Ready(Vec<InventoryItem>),
}

impl InventoryStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The loaded items, once available.
    pub fn items(&self) -> Option<&[InventoryItem]> {
        match self {
            Self::Ready(items) => Some(items),
            Self::NotRequested | Self::Loading | Self::Failed(_) => None,
        }
    }

    /// Find a loaded item by id.
    pub fn item(&self, item_id: &str) -> Option<&InventoryItem> {
        self.items()?.iter().find(|item| item.id == item_id)
    }
}

/// A lookup the caller should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRequest {
    pub question_id: String,
    pub kind: InventoryKind,
}

/// Per-question state of the stock-control sub-engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockControlState {
    status: InventoryStatus,
    seeded: bool,
}

impl StockControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &InventoryStatus {
        &self.status
    }

    /// Whether the one-time seeding decision has been made.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Move to `Loading` if a lookup is due. Failed lookups are due again.
    pub fn begin_load(&mut self) -> bool {
        match self.status {
            InventoryStatus::NotRequested | InventoryStatus::Failed(_) => {
                self.status = InventoryStatus::Loading;
                true
            }
            InventoryStatus::Loading | InventoryStatus::Ready(_) => false,
        }
    }

    /// Record the outcome of a lookup.
    pub fn finish_load(&mut self, result: Result<Vec<InventoryItem>, ServiceError>) {
        self.status = match result {
            Ok(items) => InventoryStatus::Ready(items),
            Err(err) => InventoryStatus::Failed(err.to_string()),
        };
    }

    /// Decide the seed for this question, at most once.
    ///
    /// Returns the default selection when the inventory is loaded, the
    /// question has no answer yet and at least one default names a known
    /// item with a positive quantity. Any call after the inventory loaded
    /// consumes the one chance, whatever the outcome.
    pub fn take_seed(
        &mut self,
        question: &StockControlQuestion,
        has_answer: bool,
    ) -> Option<StockSelection> {
        if self.seeded {
            return None;
        }
        let items = self.status.items()?;
        self.seeded = true;
        if has_answer {
            return None;
        }

        let selection: StockSelection = question
            .default_stock_items
            .iter()
            .filter(|seed| items.iter().any(|item| item.id == seed.item_id))
            .map(|seed| (seed.item_id.as_str(), seed.quantity))
            .collect();
        (!selection.is_empty()).then_some(selection)
    }
}

/// Sum of quantity × unit price over the selection.
///
/// Items that are not in `items` or have no price contribute nothing.
pub fn selection_total(selection: &StockSelection, items: &[InventoryItem]) -> Decimal {
    selection
        .iter()
        .filter_map(|(item_id, quantity)| {
            let price = items.iter().find(|item| item.id == item_id)?.unit_price?;
            Some(price * Decimal::from(quantity))
        })
        .sum()
}
