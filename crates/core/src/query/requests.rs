use std::borrow::Borrow;
use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{PartRequest, Priority, RequestStatus, WorkshopId};
use crate::errors::DomainError;

/// AND-combined request predicates. `None` means "any".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub priority: Option<Priority>,
    pub workshop_id: Option<WorkshopId>,
    pub search_text: Option<String>,
}

impl RequestFilter {
    pub fn pending() -> Self {
        Self { status: Some(RequestStatus::Pending), ..Self::default() }
    }

    pub fn with_priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = priority;
        self
    }

    pub fn matches(&self, request: &PartRequest) -> bool {
        if self.status.is_some_and(|status| status != request.status) {
            return false;
        }
        if self.priority.is_some_and(|priority| priority != request.priority) {
            return false;
        }
        if self.workshop_id.is_some_and(|workshop_id| workshop_id != request.workshop_id) {
            return false;
        }

        match self.search_needle() {
            Some(needle) => [&request.part_name, &request.part_number, &request.description]
                .into_iter()
                .any(|haystack| haystack.to_lowercase().contains(&needle)),
            None => true,
        }
    }

    /// Only an absent or empty search is "any"; anything else, whitespace included, is a
    /// literal substring.
    fn search_needle(&self) -> Option<String> {
        self.search_text.as_deref().filter(|text| !text.is_empty()).map(str::to_lowercase)
    }
}

pub fn filter_requests<'a>(
    requests: &'a [PartRequest],
    filter: &RequestFilter,
) -> Vec<&'a PartRequest> {
    requests.iter().filter(|request| filter.matches(request)).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Id,
    PartName,
    Quantity,
    Priority,
    Status,
    RequestDate,
    RequiredDate,
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "id" => Ok(Self::Id),
            "partname" => Ok(Self::PartName),
            "quantity" => Ok(Self::Quantity),
            "priority" => Ok(Self::Priority),
            "status" => Ok(Self::Status),
            "requestdate" => Ok(Self::RequestDate),
            "requireddate" => Ok(Self::RequiredDate),
            _ => Err(DomainError::validation("sort", format!("unknown sort field `{value}`"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => {
                Err(DomainError::validation("direction", format!("unknown direction `{other}`")))
            }
        }
    }
}

/// Where a sortable list lives. Decides the direction applied when a new column is picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortContext {
    ApprovalQueue,
    RequestList,
}

impl SortContext {
    pub fn fresh_direction(self) -> SortDirection {
        match self {
            Self::ApprovalQueue => SortDirection::Desc,
            Self::RequestList => SortDirection::Asc,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self { field: SortField::RequestDate, direction: SortDirection::Desc }
    }
}

impl SortState {
    /// Column-header click: flips direction on the active field, otherwise switches to
    /// `field` with the caller's `fresh_direction`.
    pub fn select(self, field: SortField, fresh_direction: SortDirection) -> Self {
        if self.field == field {
            Self { field, direction: self.direction.reversed() }
        } else {
            Self { field, direction: fresh_direction }
        }
    }

    pub fn apply<R: Borrow<PartRequest>>(&self, requests: &mut [R]) {
        sort_requests(requests, self.field, self.direction);
    }
}

pub fn compare_requests(left: &PartRequest, right: &PartRequest, field: SortField) -> Ordering {
    match field {
        SortField::Id => left.id.cmp(&right.id),
        SortField::PartName => left.part_name.cmp(&right.part_name),
        SortField::Quantity => left.quantity.cmp(&right.quantity),
        SortField::Priority => left.priority.rank().cmp(&right.priority.rank()),
        SortField::Status => left.status.as_str().cmp(right.status.as_str()),
        SortField::RequestDate => left.request_date.cmp(&right.request_date),
        SortField::RequiredDate => left.required_date.cmp(&right.required_date),
    }
}

/// Stable in both directions: ties keep their input order.
pub fn sort_requests<R: Borrow<PartRequest>>(
    requests: &mut [R],
    field: SortField,
    direction: SortDirection,
) {
    requests.sort_by(|left, right| {
        let ordering = compare_requests(left.borrow(), right.borrow(), field);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Newest submissions first.
pub fn recent_requests(requests: &[PartRequest], limit: usize) -> Vec<&PartRequest> {
    let mut recent: Vec<&PartRequest> = requests.iter().collect();
    sort_requests(&mut recent, SortField::RequestDate, SortDirection::Desc);
    recent.truncate(limit);
    recent
}

pub fn urgent_requests(requests: &[PartRequest]) -> Vec<&PartRequest> {
    requests
        .iter()
        .filter(|request| matches!(request.priority, Priority::High | Priority::Critical))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::part_request::fixtures::{at, request};

    fn sample() -> Vec<PartRequest> {
        let mut pump = request(1, Priority::Critical, RequestStatus::Pending);
        pump.part_name = "Hydraulic Pump".to_string();
        pump.part_number = "HP-2024-003".to_string();
        pump.request_date = Some(at("2025-09-12"));

        let mut filter = request(2, Priority::Low, RequestStatus::Approved);
        filter.part_name = "Engine Oil Filter".to_string();
        filter.part_number = "EOF-2024-001".to_string();
        filter.description = "Routine service for convoy trucks".to_string();
        filter.request_date = Some(at("2025-09-15"));
        filter.workshop_id = WorkshopId(2);

        let mut antenna = request(3, Priority::High, RequestStatus::Pending);
        antenna.part_name = "Radio Antenna".to_string();
        antenna.part_number = "RA-2024-002".to_string();
        antenna.request_date = Some(at("2025-09-10"));

        let mut pads = request(4, Priority::Critical, RequestStatus::Rejected);
        pads.part_name = "Brake Pads".to_string();
        pads.request_date = None;

        vec![pump, filter, antenna, pads]
    }

    fn ids(requests: &[&PartRequest]) -> Vec<i64> {
        requests.iter().map(|request| request.id.0).collect()
    }

    #[test]
    fn empty_filter_returns_input_unchanged() {
        let requests = sample();
        let filtered = filter_requests(&requests, &RequestFilter::default());
        assert_eq!(filtered.into_iter().cloned().collect::<Vec<_>>(), requests);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let filtered = filter_requests(&[], &RequestFilter::pending());
        assert!(filtered.is_empty());

        let mut nothing: Vec<PartRequest> = Vec::new();
        sort_requests(&mut nothing, SortField::Priority, SortDirection::Desc);
        assert!(nothing.is_empty());
    }

    #[test]
    fn predicates_are_and_combined() {
        let requests = sample();
        let filter = RequestFilter {
            status: Some(RequestStatus::Pending),
            priority: Some(Priority::Critical),
            ..RequestFilter::default()
        };
        assert_eq!(ids(&filter_requests(&requests, &filter)), vec![1]);

        let filter = RequestFilter { workshop_id: Some(WorkshopId(2)), ..RequestFilter::default() };
        assert_eq!(ids(&filter_requests(&requests, &filter)), vec![2]);
    }

    #[test]
    fn search_is_case_insensitive_over_name_number_and_description() {
        let requests = sample();
        let search = |text: &str| {
            let filter =
                RequestFilter { search_text: Some(text.to_string()), ..RequestFilter::default() };
            ids(&filter_requests(&requests, &filter))
        };

        assert_eq!(search("PUMP"), vec![1]);
        assert_eq!(search("ra-2024"), vec![3]);
        assert_eq!(search("convoy"), vec![2]);
        assert_eq!(search(""), vec![1, 2, 3, 4]);
        assert!(search("turbine").is_empty());
    }

    #[test]
    fn whitespace_search_is_matched_literally() {
        let requests = sample();
        let search = |text: &str| {
            let filter =
                RequestFilter { search_text: Some(text.to_string()), ..RequestFilter::default() };
            ids(&filter_requests(&requests, &filter))
        };

        assert!(search("   ").is_empty());
        assert_eq!(search(" "), vec![1, 2, 3, 4]);
        assert_eq!(search("oil filter"), vec![2]);
        assert!(search("oil  filter").is_empty());
    }

    #[test]
    fn priority_sort_uses_rank_and_is_stable() {
        let requests = sample();
        let mut sorted: Vec<&PartRequest> = requests.iter().collect();
        sort_requests(&mut sorted, SortField::Priority, SortDirection::Desc);
        assert_eq!(ids(&sorted), vec![1, 4, 3, 2]);

        sort_requests(&mut sorted, SortField::Priority, SortDirection::Asc);
        // Ties (1 and 4) keep the order they had going in.
        assert_eq!(ids(&sorted), vec![2, 3, 1, 4]);
    }

    #[test]
    fn date_sort_compares_timestamps() {
        let mut requests = sample();
        sort_requests(&mut requests, SortField::RequestDate, SortDirection::Desc);
        let order: Vec<i64> = requests.iter().map(|request| request.id.0).collect();
        assert_eq!(order, vec![2, 1, 3, 4]);
    }

    #[test]
    fn selecting_sort_columns() {
        let state = SortState::default();
        let same = state.select(SortField::RequestDate, SortDirection::Desc);
        assert_eq!(same.direction, SortDirection::Asc);

        let queue = state.select(SortField::Priority, SortContext::ApprovalQueue.fresh_direction());
        assert_eq!(queue, SortState { field: SortField::Priority, direction: SortDirection::Desc });

        let list = state.select(SortField::Priority, SortContext::RequestList.fresh_direction());
        assert_eq!(list.direction, SortDirection::Asc);
    }

    #[test]
    fn recent_and_high_priority_views() {
        let requests = sample();
        assert_eq!(ids(&recent_requests(&requests, 2)), vec![2, 1]);
        assert_eq!(ids(&urgent_requests(&requests)), vec![1, 3, 4]);
    }

    #[test]
    fn sort_field_names_parse_in_any_casing() {
        assert_eq!("requiredDate".parse::<SortField>().ok(), Some(SortField::RequiredDate));
        assert_eq!("part_name".parse::<SortField>().ok(), Some(SortField::PartName));
        assert!("cost".parse::<SortField>().is_err());
    }
}
