use std::sync::Arc;

use chrono::Utc;
use partsdesk_core::query::{ApprovalQueue, SortContext, SortField, SortState};
use partsdesk_core::{Capability, NoopAuditSink, PortalConfig, Priority};
use partsdesk_gateway::BackendGateway;

use crate::commands::{block_on, new_correlation_id, open_session, CommandResult};

const COMMAND: &str = "queue";

#[derive(Clone, Debug, Default)]
pub struct QueueQuery {
    pub priority: Option<Priority>,
    pub sort: Option<SortField>,
    /// Flips the direction of the selected column, like a second header click.
    pub toggle: bool,
}

impl QueueQuery {
    fn sort(&self) -> SortState {
        let fresh = SortContext::ApprovalQueue.fresh_direction();
        let state = self
            .sort
            .map_or_else(SortState::default, |field| SortState { field, direction: fresh });
        if self.toggle {
            state.select(state.field, fresh)
        } else {
            state
        }
    }
}

pub fn run<G: BackendGateway>(
    gateway: G,
    config: &PortalConfig,
    query: QueueQuery,
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
        if let Err(error) = service.principal().require(Capability::ViewApprovals) {
            return CommandResult::from_application(COMMAND, error.into(), &correlation_id);
        }

        let store = service.store().await;
        let queue = ApprovalQueue::build(
            store.part_requests(),
            query.priority,
            query.sort(),
            Utc::now(),
            &config.thresholds.urgency(),
        );

        let message = format!(
            "{} pending, {} critical, {} due within the urgent window",
            queue.entries.len(),
            queue.critical_count,
            queue.urgent_count
        );
        CommandResult::success_with(COMMAND, message, Some(&queue))
    })
}
