//! Filtering, sorting and grouping over the in-memory snapshot. Nothing here allocates
//! more than the result it returns, and empty input always yields empty output.

pub mod aggregates;
pub mod dashboard;
pub mod directory;
pub mod inventory;
pub mod requests;

pub use aggregates::{
    approval_rate, group_by_part_name, group_by_workshop, group_requests_by, priority_distribution,
    top_parts, GroupStats, PriorityCount, WorkshopPerformance,
};
pub use dashboard::{recent_approvals, AnalyticsReport, ApprovalQueue, DashboardStats, QueueEntry};
pub use directory::{count_by_role, filter_users, RoleCounts, UserFilter};
pub use inventory::{
    filter_inventory, inventory_categories, InventoryFilter, InventorySummary, StockRow,
};
pub use requests::{
    compare_requests, filter_requests, recent_requests, sort_requests, urgent_requests,
    RequestFilter, SortContext, SortDirection, SortField, SortState,
};
