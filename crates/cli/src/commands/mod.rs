pub mod config;
pub mod dashboard;
pub mod decide;
pub mod history;
pub mod inventory;
pub mod queue;
pub mod report;
pub mod requests;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use partsdesk_core::audit::AuditSink;
use partsdesk_core::errors::{ApplicationError, InterfaceError};
use partsdesk_core::{PortalConfig, Principal};
use partsdesk_gateway::{BackendGateway, PortalService};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success_with(
        command: &str,
        message: impl Into<String>,
        data: Option<impl Serialize>,
    ) -> Self {
        let data = match data.map(serde_json::to_value).transpose() {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 3);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            correlation_id: None,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id: None,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps a portal failure onto the operator-facing taxonomy: 2 config, 3 internal,
    /// 4 backend unreachable, 5 workflow or validation.
    pub fn from_application(command: &str, error: ApplicationError, correlation_id: &str) -> Self {
        if let ApplicationError::Configuration(message) = &error {
            return Self::failure(command, "config_validation", message.clone(), 2);
        }

        let detail = error.to_string();
        let interface = error.into_interface(correlation_id);
        let (error_class, exit_code) = match &interface {
            InterfaceError::BadRequest { .. } => ("validation", 5),
            InterfaceError::Conflict { .. } => ("conflict", 5),
            InterfaceError::Forbidden { .. } => ("permission", 5),
            InterfaceError::ServiceUnavailable { .. } => ("network", 4),
            InterfaceError::Internal { .. } => ("internal", 3),
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: format!("{} ({detail})", interface.user_message()),
            correlation_id: Some(interface.correlation_id().to_string()),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Drives one command to completion on a fresh single-threaded runtime.
pub(crate) fn block_on<F>(command: &str, future: F) -> CommandResult
where
    F: Future<Output = CommandResult>,
{
    match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime.block_on(future),
        Err(error) => CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        ),
    }
}

/// Resolves the configured acting user against the backend and loads the portal snapshot.
pub(crate) async fn open_session<G: BackendGateway>(
    command: &str,
    gateway: G,
    config: &PortalConfig,
    audit: Arc<dyn AuditSink>,
    correlation_id: &str,
) -> Result<PortalService<G>, CommandResult> {
    let acting_user_id = config.gateway.acting_user_id;
    let user = match gateway.find_user(acting_user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Err(CommandResult::failure(
                command,
                "config_validation",
                format!("acting user {acting_user_id} does not exist on the backend"),
                2,
            ));
        }
        Err(error) => {
            return Err(CommandResult::from_application(
                command,
                error.into(),
                correlation_id,
            ));
        }
    };

    let deadline = Duration::from_secs(config.gateway.timeout_secs);
    let service = PortalService::new(gateway, Principal::from_user(&user), audit, deadline);
    service
        .refresh(correlation_id)
        .await
        .map_err(|error| CommandResult::from_application(command, error, correlation_id))?;
    Ok(service)
}
