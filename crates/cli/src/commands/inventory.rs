use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use partsdesk_core::query::{
    filter_inventory, inventory_categories, InventoryFilter, InventorySummary, StockRow,
};
use partsdesk_core::{InventoryItem, PortalConfig, PortalStore};
use serde::Serialize;

use crate::commands::CommandResult;

const COMMAND: &str = "inventory";

#[derive(Clone, Debug, Default)]
pub struct InventoryQuery {
    pub file: PathBuf,
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
struct InventoryView<'a> {
    summary: InventorySummary,
    categories: Vec<&'a str>,
    items: Vec<StockRow<'a>>,
}

/// The backend has no inventory endpoint, so stock levels come from an exported JSON file.
pub fn run(config: &PortalConfig, query: InventoryQuery) -> CommandResult {
    let items = match read_inventory(&query.file) {
        Ok(items) => items,
        Err(error) => {
            return CommandResult::failure(COMMAND, "input_file", format!("{error:#}"), 6);
        }
    };

    let mut store = PortalStore::default();
    store.replace_inventory(items);

    let thresholds = config.thresholds.stock();
    let filter = InventoryFilter { search_text: query.search, category: query.category };
    let view = InventoryView {
        summary: InventorySummary::compute(store.inventory(), &thresholds),
        categories: inventory_categories(store.inventory()),
        items: filter_inventory(store.inventory(), &filter)
            .into_iter()
            .map(|item| StockRow::new(item, &thresholds))
            .collect(),
    };

    let message = format!(
        "{} of {} items shown, {} need restocking ({} critical)",
        view.items.len(),
        view.summary.total_items,
        view.summary.needs_restock,
        view.summary.critical
    );
    CommandResult::success_with(COMMAND, message, Some(&view))
}

fn read_inventory(path: &Path) -> Result<Vec<InventoryItem>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read inventory file `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("inventory file `{}` is not a JSON item list", path.display()))
}
