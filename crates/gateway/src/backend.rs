//! The backend is the system of record; this trait is the portal's only way to reach it.

use async_trait::async_trait;
use thiserror::Error;

use partsdesk_core::errors::ApplicationError;
use partsdesk_core::forms::{NewPartRequest, NewRole, NewUser, NewWorkshop};
use partsdesk_core::{
    Approval, ApprovalId, PartRequest, PartRequestId, RequestStatus, Role, RoleId, User, UserId,
    Workshop, WorkshopId,
};

use crate::wire::DecisionBody;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("backend request timed out")]
    Timeout,
    #[error("could not decode backend response: {0}")]
    Decode(String),
    #[error("invalid backend url: {0}")]
    Url(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

impl From<GatewayError> for ApplicationError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Status { status: status @ (401 | 403), body } => {
                Self::BackendDenied { status, message: body }
            }
            GatewayError::Status { status, body } => {
                Self::Network { status: Some(status), message: body }
            }
            GatewayError::Transport(message) => Self::Network { status: None, message },
            GatewayError::Timeout => Self::Timeout,
            GatewayError::Decode(message) => {
                Self::Network { status: None, message: format!("undecodable response: {message}") }
            }
            GatewayError::Url(message) => Self::Configuration(message),
        }
    }
}

/// Lookups by id return `Ok(None)` when the backend answers 404.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, GatewayError>;
    async fn find_user(&self, id: UserId) -> Result<Option<User>, GatewayError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, GatewayError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, GatewayError>;
    async fn create_user(&self, user: &NewUser) -> Result<User, GatewayError>;

    async fn list_workshops(&self) -> Result<Vec<Workshop>, GatewayError>;
    async fn find_workshop(&self, id: WorkshopId) -> Result<Option<Workshop>, GatewayError>;
    async fn find_workshop_by_name(&self, name: &str) -> Result<Option<Workshop>, GatewayError>;
    async fn create_workshop(&self, workshop: &NewWorkshop) -> Result<Workshop, GatewayError>;

    async fn list_part_requests(&self) -> Result<Vec<PartRequest>, GatewayError>;
    async fn find_part_request(
        &self,
        id: PartRequestId,
    ) -> Result<Option<PartRequest>, GatewayError>;
    async fn part_requests_by_user(&self, id: UserId) -> Result<Vec<PartRequest>, GatewayError>;
    async fn part_requests_by_workshop(
        &self,
        id: WorkshopId,
    ) -> Result<Vec<PartRequest>, GatewayError>;
    async fn part_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<PartRequest>, GatewayError>;
    async fn create_part_request(
        &self,
        request: &NewPartRequest,
        acting_user: UserId,
    ) -> Result<PartRequest, GatewayError>;

    async fn submit_decision(
        &self,
        request_id: PartRequestId,
        body: &DecisionBody,
        approver: UserId,
    ) -> Result<Approval, GatewayError>;
    /// Every approval the backend is willing to list; may legitimately be empty.
    async fn list_approvals(&self) -> Result<Vec<Approval>, GatewayError>;
    async fn find_approval(&self, id: ApprovalId) -> Result<Option<Approval>, GatewayError>;
    async fn approvals_by_approver(&self, id: UserId) -> Result<Vec<Approval>, GatewayError>;
    async fn approvals_for_request(
        &self,
        id: PartRequestId,
    ) -> Result<Vec<Approval>, GatewayError>;

    async fn list_roles(&self) -> Result<Vec<Role>, GatewayError>;
    async fn find_role(&self, id: RoleId) -> Result<Option<Role>, GatewayError>;
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, GatewayError>;
    async fn create_role(&self, role: &NewRole) -> Result<Role, GatewayError>;
}
