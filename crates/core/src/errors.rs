use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::{PartRequestId, RequestStatus, UserRole};
use crate::permissions::Capability;

/// A single form-field problem, reported inline next to the offending input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed for `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("form has {} invalid field(s): {}", .0.len(), join_fields(.0))]
    InvalidForm(Vec<FieldError>),
    #[error("part request {request_id} is already {status}; refresh and try again")]
    InvalidState { request_id: PartRequestId, status: RequestStatus },
    #[error("role `{role}` lacks capability {capability:?}")]
    PermissionDenied { role: UserRole, capability: Capability },
    #[error("part request {0} is not in the current snapshot")]
    UnknownRequest(PartRequestId),
    #[error("part request {0} already has an approval record")]
    DuplicateApproval(PartRequestId),
    #[error("data integrity violation: {0}")]
    IntegrityViolation(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::Validation { field, message } => vec![FieldError::new(field, message)],
            Self::InvalidForm(errors) => errors.clone(),
            _ => Vec::new(),
        }
    }
}

fn join_fields(errors: &[FieldError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("network failure{}: {message}", .status.map(|code| format!(" (HTTP {code})")).unwrap_or_default())]
    Network { status: Option<u16>, message: String },
    #[error("backend did not respond before the configured timeout")]
    Timeout,
    #[error("backend denied the operation (HTTP {status}): {message}")]
    BackendDenied { status: u16, message: String },
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, field_errors: Vec<FieldError>, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "Some fields need attention. Correct them and submit again.",
            Self::Conflict { .. } => {
                "This request was already decided elsewhere. Refresh to see the latest state."
            }
            Self::Forbidden { .. } => "You do not have permission to perform this action.",
            Self::ServiceUnavailable { .. } => {
                "The parts service is unreachable right now. Nothing was changed; please retry."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Domain(
                error @ (DomainError::Validation { .. } | DomainError::InvalidForm(_)),
            ) => Self::BadRequest {
                message: error.to_string(),
                field_errors: error.field_errors(),
                correlation_id: unassigned(),
            },
            ApplicationError::Domain(
                error @ (DomainError::InvalidState { .. }
                | DomainError::DuplicateApproval(_)
                | DomainError::UnknownRequest(_)),
            ) => Self::Conflict { message: error.to_string(), correlation_id: unassigned() },
            ApplicationError::Domain(error @ DomainError::PermissionDenied { .. }) => {
                Self::Forbidden { message: error.to_string(), correlation_id: unassigned() }
            }
            error @ ApplicationError::BackendDenied { .. } => {
                Self::Forbidden { message: error.to_string(), correlation_id: unassigned() }
            }
            error @ (ApplicationError::Network { .. } | ApplicationError::Timeout) => {
                Self::ServiceUnavailable {
                    message: error.to_string(),
                    correlation_id: unassigned(),
                }
            }
            ApplicationError::Domain(error @ DomainError::IntegrityViolation(_)) => {
                Self::Internal { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{PartRequestId, RequestStatus, UserRole};
    use crate::errors::{ApplicationError, DomainError, FieldError, InterfaceError};
    use crate::permissions::Capability;

    #[test]
    fn form_errors_map_to_bad_request_with_fields() {
        let interface = ApplicationError::from(DomainError::InvalidForm(vec![
            FieldError::new("partName", "Part name is required"),
            FieldError::new("quantity", "Quantity must be at least 1"),
        ]))
        .into_interface("req-1");

        match interface {
            InterfaceError::BadRequest { ref field_errors, ref correlation_id, .. } => {
                assert_eq!(correlation_id, "req-1");
                assert_eq!(field_errors.len(), 2);
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn invalid_state_recommends_refresh() {
        let interface = ApplicationError::from(DomainError::InvalidState {
            request_id: PartRequestId(4),
            status: RequestStatus::Approved,
        })
        .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::Conflict { .. }));
        assert!(interface.user_message().contains("Refresh"));
    }

    #[test]
    fn local_and_backend_denials_are_both_forbidden() {
        let local = ApplicationError::from(DomainError::PermissionDenied {
            role: UserRole::User,
            capability: Capability::ApproveRequests,
        })
        .into_interface("req-3");
        let remote = ApplicationError::BackendDenied { status: 403, message: "nope".to_owned() }
            .into_interface("req-4");

        assert!(matches!(local, InterfaceError::Forbidden { .. }));
        assert!(matches!(remote, InterfaceError::Forbidden { .. }));
        assert_eq!(remote.correlation_id(), "req-4");
    }

    #[test]
    fn network_failures_are_service_unavailable() {
        let interface = ApplicationError::Network {
            status: Some(502),
            message: "bad gateway".to_owned(),
        }
        .into_interface("req-5");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert!(interface.to_string().contains("HTTP 502"));
        assert!(interface.user_message().contains("Nothing was changed"));
    }
}
