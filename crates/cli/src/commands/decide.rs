use std::sync::Arc;

use partsdesk_core::{
    Approval, AuditEvent, Decision, DecisionRequest, InMemoryAuditSink, PartRequestId,
    PortalConfig,
};
use partsdesk_gateway::BackendGateway;
use serde::Serialize;
use tracing::info;

use crate::commands::{block_on, new_correlation_id, open_session, CommandResult};

const COMMAND: &str = "decide";

#[derive(Debug, Serialize)]
struct DecisionView {
    approval: Approval,
    audit: Vec<AuditEvent>,
}

pub fn run<G: BackendGateway>(
    gateway: G,
    config: &PortalConfig,
    request_id: i64,
    decision: Decision,
    comments: Option<String>,
) -> CommandResult {
    block_on(COMMAND, async {
        let correlation_id = new_correlation_id();
        let audit = InMemoryAuditSink::default();
        let service =
            match open_session(COMMAND, gateway, config, Arc::new(audit.clone()), &correlation_id)
                .await
            {
                Ok(service) => service,
                Err(result) => return result,
            };

        let request =
            DecisionRequest::new(PartRequestId(request_id), decision, comments.as_deref());
        match service.decide(request, &correlation_id).await {
            Ok(approval) => {
                info!(
                    event_name = "cli.decide.completed",
                    correlation_id = %correlation_id,
                    request_id,
                    decision = %approval.status,
                    "decision recorded"
                );
                let message =
                    format!("part request {} {}", approval.part_request_id, approval.status);
                let view = DecisionView { approval, audit: audit.events() };
                CommandResult::success_with(COMMAND, message, Some(&view))
            }
            Err(error) => CommandResult::from_application(COMMAND, error, &correlation_id),
        }
    })
}
