use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::derived::{RequestInsight, UrgencyThresholds};
use crate::domain::{Approval, PartRequest, Priority, RequestStatus, User, Workshop};
use crate::query::aggregates::{
    approval_rate, group_by_workshop, priority_distribution, top_parts, total_estimated_value,
    GroupStats, PriorityCount, WorkshopPerformance,
};
use crate::query::requests::{filter_requests, RequestFilter, SortState};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_requests: usize,
    pub pending_approvals: usize,
    pub approved_requests: usize,
    pub rejected_requests: usize,
    pub critical_requests: usize,
    pub total_workshops: usize,
    pub active_workshops: usize,
    pub total_users: usize,
}

impl DashboardStats {
    pub fn compute(requests: &[PartRequest], workshops: &[Workshop], users: &[User]) -> Self {
        let with_status = |status: RequestStatus| {
            requests.iter().filter(|request| request.status == status).count()
        };

        Self {
            total_requests: requests.len(),
            pending_approvals: with_status(RequestStatus::Pending),
            approved_requests: with_status(RequestStatus::Approved),
            rejected_requests: with_status(RequestStatus::Rejected),
            critical_requests: requests
                .iter()
                .filter(|request| request.priority == Priority::Critical)
                .count(),
            total_workshops: workshops.len(),
            active_workshops: workshops.iter().filter(|workshop| workshop.is_active()).count(),
            total_users: users.len(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalyticsReport {
    pub total_requests: usize,
    pub pending_requests: usize,
    pub approved_requests: usize,
    pub rejected_requests: usize,
    pub approval_rate: Decimal,
    pub total_value: Decimal,
    pub priority_distribution: Vec<PriorityCount>,
    pub workshop_performance: Vec<WorkshopPerformance>,
    pub top_parts: Vec<GroupStats<String>>,
}

impl AnalyticsReport {
    pub const TOP_PARTS: usize = 5;

    pub fn compute(requests: &[PartRequest], workshops: &[Workshop]) -> Self {
        let count = |status: RequestStatus| {
            requests.iter().filter(|request| request.status == status).count()
        };
        let approved = count(RequestStatus::Approved);

        Self {
            total_requests: requests.len(),
            pending_requests: count(RequestStatus::Pending),
            approved_requests: approved,
            rejected_requests: count(RequestStatus::Rejected),
            approval_rate: approval_rate(approved, requests.len()),
            total_value: total_estimated_value(requests),
            priority_distribution: priority_distribution(requests),
            workshop_performance: group_by_workshop(requests, workshops),
            top_parts: top_parts(requests, Self::TOP_PARTS),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueueEntry<'a> {
    #[serde(flatten)]
    pub request: &'a PartRequest,
    pub insight: RequestInsight,
}

/// Pending requests awaiting review, filtered and ordered for the approval screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApprovalQueue<'a> {
    pub sort: SortState,
    pub entries: Vec<QueueEntry<'a>>,
    pub critical_count: usize,
    pub urgent_count: usize,
}

impl<'a> ApprovalQueue<'a> {
    pub fn build(
        requests: &'a [PartRequest],
        priority: Option<Priority>,
        sort: SortState,
        now: DateTime<Utc>,
        thresholds: &UrgencyThresholds,
    ) -> Self {
        let mut pending =
            filter_requests(requests, &RequestFilter::pending().with_priority(priority));
        sort.apply(&mut pending);

        let entries: Vec<QueueEntry<'a>> = pending
            .into_iter()
            .map(|request| QueueEntry {
                request,
                insight: RequestInsight::compute(request, now, thresholds),
            })
            .collect();

        let critical_count =
            entries.iter().filter(|entry| entry.request.priority == Priority::Critical).count();
        let urgent_count =
            entries.iter().filter(|entry| entry.insight.urgency.is_pressing()).count();

        Self { sort, entries, critical_count, urgent_count }
    }
}

/// Most recent decisions first; undated approvals sink to the end.
pub fn recent_approvals(approvals: &[Approval], limit: usize) -> Vec<&Approval> {
    let mut recent: Vec<&Approval> = approvals.iter().collect();
    recent.sort_by(|left, right| right.approval_date.cmp(&left.approval_date));
    recent.truncate(limit);
    recent
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::derived::UrgencyLevel;
    use crate::domain::part_request::fixtures::request;
    use crate::domain::{ApprovalId, Decision, PartRequestId, UserId, WorkshopId};
    use crate::query::requests::{SortDirection, SortField};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn requests() -> Vec<PartRequest> {
        let mut overdue = request(1, Priority::Medium, RequestStatus::Pending);
        overdue.required_date = Some(now() - Duration::days(1));
        let mut soon = request(2, Priority::Critical, RequestStatus::Pending);
        soon.required_date = Some(now() + Duration::days(5));
        let mut later = request(3, Priority::Critical, RequestStatus::Pending);
        later.required_date = Some(now() + Duration::days(30));
        let approved = request(4, Priority::Critical, RequestStatus::Approved);
        vec![overdue, soon, later, approved]
    }

    #[test]
    fn queue_holds_only_pending_and_counts_pressure() {
        let requests = requests();
        let queue = ApprovalQueue::build(
            &requests,
            None,
            SortState { field: SortField::Priority, direction: SortDirection::Desc },
            now(),
            &UrgencyThresholds::default(),
        );

        let ids: Vec<i64> = queue.entries.iter().map(|entry| entry.request.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(queue.critical_count, 2);
        assert_eq!(queue.urgent_count, 1);
        assert_eq!(queue.entries[2].insight.urgency, UrgencyLevel::Immediate);
        assert_eq!(queue.entries[0].insight.urgency, UrgencyLevel::Soon);
    }

    #[test]
    fn queue_priority_filter() {
        let requests = requests();
        let queue = ApprovalQueue::build(
            &requests,
            Some(Priority::Medium),
            SortState::default(),
            now(),
            &UrgencyThresholds::default(),
        );
        assert_eq!(queue.entries.len(), 1);
        assert_eq!(queue.critical_count, 0);
    }

    #[test]
    fn dashboard_and_report_totals() {
        let requests = requests();
        let workshops = vec![Workshop {
            id: WorkshopId(1),
            name: "Base Workshop Alpha".to_string(),
            location: "North Sector".to_string(),
            capacity: Some(40),
            status: Some("Active".to_string()),
        }];

        let stats = DashboardStats::compute(&requests, &workshops, &[]);
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.pending_approvals, 3);
        assert_eq!(stats.critical_requests, 3);
        assert_eq!(stats.active_workshops, 1);

        let report = AnalyticsReport::compute(&requests, &workshops);
        assert_eq!(report.approval_rate, Decimal::new(250, 1));
        assert_eq!(report.workshop_performance[0].stats.total, 4);

        let empty = AnalyticsReport::compute(&[], &[]);
        assert_eq!(empty.approval_rate, Decimal::ZERO);
        assert!(empty.top_parts.is_empty());
    }

    #[test]
    fn recent_approvals_newest_first() {
        let approval = |id: i64, day: u32| Approval {
            id: ApprovalId(id),
            part_request_id: PartRequestId(id),
            approver_id: UserId(1),
            approver_name: "col_sharma".to_string(),
            status: Decision::Approved,
            comments: None,
            approval_date: (day > 0).then(|| Utc.with_ymd_and_hms(2026, 4, day, 8, 0, 0).unwrap()),
        };
        let approvals = vec![approval(1, 3), approval(2, 0), approval(3, 9), approval(4, 5)];

        let ids: Vec<i64> = recent_approvals(&approvals, 3).iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![3, 4, 1]);
    }
}
