use std::sync::Arc;

use chrono::Utc;
use partsdesk_core::query::{filter_requests, RequestFilter, SortDirection, SortField, SortState};
use partsdesk_core::{
    Capability, NoopAuditSink, PartRequest, PortalConfig, Priority, RequestInsight, RequestStatus,
    WorkshopId,
};
use partsdesk_gateway::BackendGateway;
use serde::Serialize;

use crate::commands::{block_on, new_correlation_id, open_session, CommandResult};

const COMMAND: &str = "requests";

#[derive(Debug, Serialize)]
struct RequestRow<'a> {
    #[serde(flatten)]
    request: &'a PartRequest,
    workshop_name: Option<&'a str>,
    insight: RequestInsight,
}

/// Filters for the request list. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct RequestsQuery {
    pub status: Option<RequestStatus>,
    pub priority: Option<Priority>,
    pub workshop_id: Option<i64>,
    pub search: Option<String>,
    pub sort: Option<SortField>,
    pub direction: Option<SortDirection>,
}

impl RequestsQuery {
    fn filter(&self) -> RequestFilter {
        RequestFilter {
            status: self.status,
            priority: self.priority,
            workshop_id: self.workshop_id.map(WorkshopId),
            search_text: self.search.clone(),
        }
    }

    /// The list view opens newest-first; picking a column without a direction sorts ascending.
    fn sort(&self) -> SortState {
        match (self.sort, self.direction) {
            (None, None) => SortState::default(),
            (None, Some(direction)) => SortState { direction, ..SortState::default() },
            (Some(field), direction) => {
                SortState { field, direction: direction.unwrap_or(SortDirection::Asc) }
            }
        }
    }
}

pub fn run<G: BackendGateway>(
    gateway: G,
    config: &PortalConfig,
    query: RequestsQuery,
) -> CommandResult {
    block_on(COMMAND, async {
        let correlation_id = new_correlation_id();
        let service =
            match open_session(COMMAND, gateway, config, Arc::new(NoopAuditSink), &correlation_id)
                .await
            {
                Ok(service) => service,
                Err(result) => return result,
            };
        if let Err(error) = service.principal().require(Capability::ViewDashboard) {
            return CommandResult::from_application(COMMAND, error.into(), &correlation_id);
        }

        let store = service.store().await;
        let mut matching = filter_requests(store.part_requests(), &query.filter());
        let sort = query.sort();
        sort.apply(&mut matching);

        let now = Utc::now();
        let thresholds = config.thresholds.urgency();
        let rows: Vec<RequestRow<'_>> = matching
            .into_iter()
            .map(|request| RequestRow {
                request,
                workshop_name: store
                    .workshop(request.workshop_id)
                    .map(|workshop| workshop.name.as_str()),
                insight: RequestInsight::compute(request, now, &thresholds),
            })
            .collect();

        let message = format!(
            "{} of {} requests match, sorted by {:?} {:?}",
            rows.len(),
            store.part_requests().len(),
            sort.field,
            sort.direction
        );
        CommandResult::success_with(COMMAND, message, Some(&rows))
    })
}
