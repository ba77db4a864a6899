use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InventoryItemId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub part_name: String,
    pub part_number: String,
    #[serde(default)]
    pub category: String,
    pub current_stock: u32,
    pub minimum_stock: u32,
    pub maximum_stock: u32,
    pub unit_cost: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, with = "crate::domain::dates::lenient_timestamp")]
    pub last_restocked: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl InventoryItem {
    pub fn stock_value(&self) -> Decimal {
        self.unit_cost * Decimal::from(self.current_stock)
    }
}
