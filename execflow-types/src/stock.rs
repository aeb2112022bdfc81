use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Quantities chosen per inventory item for a stock-control question.
///
/// Keys are inventory item ids, kept in the order they were first selected.
/// Writing a quantity of zero or less removes the item; only [`toggle`](Self::toggle)
/// inserts an item at quantity zero, as the starting point for editing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockSelection {
    items: IndexMap<String, u32>,
}

impl StockSelection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantity for an item, if it is selected.
    pub fn quantity(&self, item_id: &str) -> Option<u32> {
        self.items.get(item_id).copied()
    }

    /// Check if an item is selected.
    pub fn contains(&self, item_id: &str) -> bool {
        self.items.contains_key(item_id)
    }

    /// Select an item at quantity zero, or deselect it if already selected.
    ///
    /// Returns `true` when the item is selected afterwards.
    pub fn toggle(&mut self, item_id: &str) -> bool {
        if self.items.shift_remove(item_id).is_some() {
            false
        } else {
            self.items.insert(item_id.to_string(), 0);
            true
        }
    }

    /// Set an item's quantity; zero or below removes the item.
    pub fn set_quantity(&mut self, item_id: &str, quantity: i64) {
        if quantity <= 0 {
            self.items.shift_remove(item_id);
        } else {
            let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            match self.items.get_mut(item_id) {
                Some(existing) => *existing = quantity,
                None => {
                    self.items.insert(item_id.to_string(), quantity);
                }
            }
        }
    }

    /// Add `delta` to the item's quantity (absent items count as zero).
    pub fn adjust(&mut self, item_id: &str, delta: i64) {
        let current = i64::from(self.quantity(item_id).unwrap_or(0));
        self.set_quantity(item_id, current.saturating_add(delta));
    }

    /// Get an iterator over selected items and their quantities.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(id, qty)| (id.as_str(), *qty))
    }

    /// Number of selected items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if no item is selected.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Encode as the JSON object string stored in the answer payload.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.items).unwrap_or_else(|_| String::from("{}"))
    }

    /// Decode a previously encoded selection.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl<K: Into<String>> FromIterator<(K, u32)> for StockSelection {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        let mut selection = Self::new();
        for (item_id, quantity) in iter {
            selection.set_quantity(&item_id.into(), i64::from(quantity));
        }
        selection
    }
}
