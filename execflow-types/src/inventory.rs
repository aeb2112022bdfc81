use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which external inventory a stock-control question draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryKind {
    /// Sellable products; items carry a unit price.
    #[default]
    Product,
    /// Consumable supplies; items have no price.
    Supply,
}

impl InventoryKind {
    /// Lowercase name used on the wire and in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Supply => "supply",
        }
    }

    /// Whether items of this inventory are priced.
    pub fn is_priced(self) -> bool {
        matches!(self, Self::Product)
    }
}

impl std::fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate item returned by the inventory lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
}

impl InventoryItem {
    /// Create an unpriced item.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            unit_price: None,
        }
    }

    /// Set the unit price.
    pub fn with_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
