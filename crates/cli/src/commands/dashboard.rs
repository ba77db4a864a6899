use std::sync::Arc;

use partsdesk_core::query::{recent_approvals, recent_requests, DashboardStats};
use partsdesk_core::{Approval, Capability, NoopAuditSink, PartRequest, PortalConfig};
use partsdesk_gateway::BackendGateway;
use serde::Serialize;
use tracing::info;

use crate::commands::{block_on, new_correlation_id, open_session, CommandResult};

const COMMAND: &str = "dashboard";
pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
struct DashboardView<'a> {
    stats: DashboardStats,
    recent_requests: Vec<&'a PartRequest>,
    recent_approvals: Vec<&'a Approval>,
}

pub fn run<G: BackendGateway>(gateway: G, config: &PortalConfig) -> CommandResult {
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
        let view = DashboardView {
            stats: DashboardStats::compute(store.part_requests(), store.workshops(), store.users()),
            recent_requests: recent_requests(store.part_requests(), RECENT_LIMIT),
            recent_approvals: recent_approvals(store.approvals(), RECENT_LIMIT),
        };
        info!(
            event_name = "cli.dashboard.rendered",
            correlation_id = %correlation_id,
            total_requests = view.stats.total_requests,
            pending_approvals = view.stats.pending_approvals,
            "dashboard computed"
        );

        let message = format!(
            "{} requests, {} awaiting approval, {} critical",
            view.stats.total_requests, view.stats.pending_approvals, view.stats.critical_requests
        );
        CommandResult::success_with(COMMAND, message, Some(&view))
    })
}
