use std::sync::Arc;

use partsdesk_core::query::AnalyticsReport;
use partsdesk_core::{Capability, NoopAuditSink, PortalConfig};
use partsdesk_gateway::BackendGateway;

use crate::commands::{block_on, new_correlation_id, open_session, CommandResult};

const COMMAND: &str = "report";

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
        if let Err(error) = service.principal().require(Capability::ViewReports) {
            return CommandResult::from_application(COMMAND, error.into(), &correlation_id);
        }

        let report = {
            let store = service.store().await;
            AnalyticsReport::compute(store.part_requests(), store.workshops())
        };
        let integrity = service.integrity_report(&correlation_id).await;

        let mut message = format!(
            "approval rate {}% across {} requests, estimated value {}",
            report.approval_rate, report.total_requests, report.total_value
        );
        if !integrity.is_empty() {
            message.push_str(&format!(", {} integrity issue(s) logged", integrity.len()));
        }
        CommandResult::success_with(COMMAND, message, Some(&report))
    })
}
