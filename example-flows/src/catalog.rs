use execflow::InventoryItem;
use rust_decimal::Decimal;

/// A small priced product catalog.
pub fn sample_products() -> Vec<InventoryItem> {
    vec![
        InventoryItem::new("prod-shampoo", "Repair shampoo")
            .with_description("300 ml")
            .with_price(Decimal::new(4590, 2)),
        InventoryItem::new("prod-mask", "Hydration mask")
            .with_description("250 g")
            .with_price(Decimal::new(6200, 2)),
        InventoryItem::new("prod-oil", "Argan oil").with_price(Decimal::new(3875, 2)),
    ]
}

/// Consumables; supplies carry no price.
pub fn sample_supplies() -> Vec<InventoryItem> {
    vec![
        InventoryItem::new("sup-gloves", "Disposable gloves").with_description("pair"),
        InventoryItem::new("sup-foil", "Highlighting foil"),
        InventoryItem::new("sup-towel", "Paper towel"),
    ]
}
