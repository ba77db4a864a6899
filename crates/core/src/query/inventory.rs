use rust_decimal::Decimal;
use serde::Serialize;

use crate::derived::{stock_percentage, stock_status_color, StockStatus, StockThresholds};
use crate::domain::InventoryItem;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InventoryFilter {
    pub search_text: Option<String>,
    pub category: Option<String>,
}

impl InventoryFilter {
    pub fn matches(&self, item: &InventoryItem) -> bool {
        if let Some(category) = self.category.as_deref() {
            if item.category != category {
                return false;
            }
        }

        match self.search_text.as_deref().filter(|text| !text.is_empty()) {
            Some(text) => {
                let needle = text.to_lowercase();
                item.part_name.to_lowercase().contains(&needle)
                    || item.part_number.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

pub fn filter_inventory<'a>(
    items: &'a [InventoryItem],
    filter: &InventoryFilter,
) -> Vec<&'a InventoryItem> {
    items.iter().filter(|item| filter.matches(item)).collect()
}

/// Distinct categories in first-seen order.
pub fn inventory_categories(items: &[InventoryItem]) -> Vec<&str> {
    let mut categories: Vec<&str> = Vec::new();
    for item in items {
        if !categories.contains(&item.category.as_str()) {
            categories.push(&item.category);
        }
    }
    categories
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StockRow<'a> {
    #[serde(flatten)]
    pub item: &'a InventoryItem,
    pub stock_status: StockStatus,
    pub stock_percentage: f64,
    pub status_color: &'static str,
    pub stock_value: Decimal,
}

impl<'a> StockRow<'a> {
    pub fn new(item: &'a InventoryItem, thresholds: &StockThresholds) -> Self {
        let stock_status =
            thresholds.classify(item.current_stock, item.minimum_stock, item.maximum_stock);
        Self {
            item,
            stock_status,
            stock_percentage: stock_percentage(item.current_stock, item.maximum_stock),
            status_color: stock_status_color(stock_status),
            stock_value: item.stock_value(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub total_items: usize,
    pub total_value: Decimal,
    pub needs_restock: usize,
    pub critical: usize,
    pub categories: usize,
}

impl InventorySummary {
    pub fn compute(items: &[InventoryItem], thresholds: &StockThresholds) -> Self {
        let statuses: Vec<StockStatus> = items
            .iter()
            .map(|item| {
                thresholds.classify(item.current_stock, item.minimum_stock, item.maximum_stock)
            })
            .collect();

        Self {
            total_items: items.len(),
            total_value: items.iter().map(InventoryItem::stock_value).sum(),
            needs_restock: statuses.iter().filter(|status| status.needs_restock()).count(),
            critical: statuses.iter().filter(|status| **status == StockStatus::Critical).count(),
            categories: inventory_categories(items).len(),
        }
    }
}
