use std::sync::Arc;

use partsdesk_core::{ApprovalHistory, Capability, NoopAuditSink, PartRequestId, PortalConfig};
use partsdesk_gateway::BackendGateway;

use crate::commands::{block_on, new_correlation_id, open_session, CommandResult};

const COMMAND: &str = "history";

pub fn run<G: BackendGateway>(
    gateway: G,
    config: &PortalConfig,
    request_id: i64,
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

        let request_id = PartRequestId(request_id);
        let history = match service.approval_history(request_id).await {
            Ok(history) => history,
            Err(error) => {
                return CommandResult::from_application(COMMAND, error, &correlation_id);
            }
        };

        let message = match &history {
            ApprovalHistory::Pending => format!("part request {request_id} is awaiting a decision"),
            ApprovalHistory::Decided(approval) => format!(
                "part request {request_id} {} by {}",
                approval.status, approval.approver_name
            ),
            ApprovalHistory::MissingRecord => {
                format!("part request {request_id} is decided but no approval record exists")
            }
        };
        CommandResult::success_with(COMMAND, message, Some(&history))
    })
}
