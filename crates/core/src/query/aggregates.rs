use std::collections::HashMap;
use std::hash::Hash;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::domain::{PartRequest, Priority, RequestStatus, Workshop, WorkshopId};

/// Percentage of approved requests, one decimal place. Zero when there is nothing to rate.
pub fn approval_rate(approved: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }

    (Decimal::from(approved as u64) * Decimal::ONE_HUNDRED / Decimal::from(total as u64))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GroupStats<K> {
    pub key: K,
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total_value: Decimal,
    pub approval_rate: Decimal,
}

impl<K> GroupStats<K> {
    pub fn empty(key: K) -> Self {
        Self {
            key,
            total: 0,
            pending: 0,
            approved: 0,
            rejected: 0,
            total_value: Decimal::ZERO,
            approval_rate: Decimal::ZERO,
        }
    }

    pub fn record(&mut self, request: &PartRequest) {
        self.total += 1;
        match request.status {
            RequestStatus::Pending => self.pending += 1,
            RequestStatus::Approved => self.approved += 1,
            RequestStatus::Rejected => self.rejected += 1,
        }
        self.total_value += request.estimated_cost_or_zero();
        self.approval_rate = approval_rate(self.approved, self.total);
    }
}

/// Accumulates per-key stats, keeping keys in first-seen order.
pub fn group_requests_by<'a, K, I, F>(requests: I, key_of: F) -> Vec<GroupStats<K>>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = &'a PartRequest>,
    F: Fn(&PartRequest) -> K,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<GroupStats<K>> = Vec::new();

    for request in requests {
        let key = key_of(request);
        let index = *positions.entry(key.clone()).or_insert_with(|| {
            groups.push(GroupStats::empty(key));
            groups.len() - 1
        });
        groups[index].record(request);
    }

    groups
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkshopPerformance {
    pub name: String,
    #[serde(flatten)]
    pub stats: GroupStats<WorkshopId>,
}

/// One row per known workshop (including idle ones), then any workshop ids that only
/// appear on requests.
pub fn group_by_workshop(
    requests: &[PartRequest],
    workshops: &[Workshop],
) -> Vec<WorkshopPerformance> {
    let mut grouped: HashMap<WorkshopId, GroupStats<WorkshopId>> =
        group_requests_by(requests, |request| request.workshop_id)
            .into_iter()
            .map(|stats| (stats.key, stats))
            .collect();

    let mut rows: Vec<WorkshopPerformance> = workshops
        .iter()
        .map(|workshop| WorkshopPerformance {
            name: workshop.name.clone(),
            stats: grouped.remove(&workshop.id).unwrap_or_else(|| GroupStats::empty(workshop.id)),
        })
        .collect();

    let mut orphans: Vec<GroupStats<WorkshopId>> = grouped.into_values().collect();
    orphans.sort_by_key(|stats| stats.key);
    rows.extend(orphans.into_iter().map(|stats| WorkshopPerformance {
        name: format!("Unknown workshop #{}", stats.key),
        stats,
    }));

    rows
}

/// Part names by request count, most requested first.
pub fn group_by_part_name(requests: &[PartRequest]) -> Vec<GroupStats<String>> {
    let mut groups = group_requests_by(requests, |request| request.part_name.clone());
    groups.sort_by(|left, right| right.total.cmp(&left.total));
    groups
}

pub fn top_parts(requests: &[PartRequest], limit: usize) -> Vec<GroupStats<String>> {
    let mut groups = group_by_part_name(requests);
    groups.truncate(limit);
    groups
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: usize,
}

/// Count per priority, highest priority first, zero counts included.
pub fn priority_distribution(requests: &[PartRequest]) -> Vec<PriorityCount> {
    Priority::ALL
        .into_iter()
        .map(|priority| PriorityCount {
            priority,
            count: requests.iter().filter(|request| request.priority == priority).count(),
        })
        .collect()
}

pub fn total_estimated_value<'a>(requests: impl IntoIterator<Item = &'a PartRequest>) -> Decimal {
    requests.into_iter().map(PartRequest::estimated_cost_or_zero).sum()
}
