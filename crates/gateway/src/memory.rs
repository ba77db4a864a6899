use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use partsdesk_core::forms::{NewPartRequest, NewRole, NewUser, NewWorkshop};
use partsdesk_core::{
    Approval, ApprovalId, PartRequest, PartRequestId, PortalSnapshot, RequestStatus, Role, RoleId,
    User, UserId, Workshop, WorkshopId,
};

use crate::backend::{BackendGateway, GatewayError};
use crate::wire::DecisionBody;

#[derive(Debug, Default)]
struct MemoryState {
    data: PortalSnapshot,
    failures: Vec<GatewayError>,
    calls: usize,
}

/// Backend stand-in holding every collection in memory. Queued failures are returned,
/// one per call, before any real work happens. Clones share the same state.
#[derive(Clone, Debug, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryGateway {
    pub fn new(data: PortalSnapshot) -> Self {
        Self { state: Arc::new(RwLock::new(MemoryState { data, ..MemoryState::default() })) }
    }

    pub async fn fail_next(&self, error: GatewayError) {
        self.state.write().await.failures.push(error);
    }

    pub async fn calls(&self) -> usize {
        self.state.read().await.calls
    }

    pub async fn data(&self) -> PortalSnapshot {
        self.state.read().await.data.clone()
    }

    async fn begin(&self) -> Result<tokio::sync::RwLockWriteGuard<'_, MemoryState>, GatewayError> {
        let mut state = self.state.write().await;
        state.calls += 1;
        if !state.failures.is_empty() {
            return Err(state.failures.remove(0));
        }
        Ok(state)
    }
}

fn not_found(what: &str) -> GatewayError {
    GatewayError::Status { status: 404, body: format!("{what} not found") }
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

#[async_trait]
impl BackendGateway for InMemoryGateway {
    async fn list_users(&self) -> Result<Vec<User>, GatewayError> {
        Ok(self.begin().await?.data.users.clone())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, GatewayError> {
        Ok(self.begin().await?.data.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, GatewayError> {
        let state = self.begin().await?;
        Ok(state.data.users.iter().find(|user| user.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, GatewayError> {
        let state = self.begin().await?;
        Ok(state.data.users.iter().find(|user| user.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, GatewayError> {
        let mut state = self.begin().await?;
        if state.data.users.iter().any(|existing| existing.username == user.username) {
            return Err(GatewayError::Status {
                status: 409,
                body: format!("username {} is taken", user.username),
            });
        }

        let created = User {
            id: UserId(next_id(state.data.users.iter().map(|user| user.id.0))),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            rank: user.rank.clone(),
            department: user.department.clone(),
            first_name: Some(user.first_name.clone()),
            last_name: Some(user.last_name.clone()).filter(|name| !name.is_empty()),
            phone_number: user.phone_number.clone(),
        };
        state.data.users.push(created.clone());
        Ok(created)
    }

    async fn list_workshops(&self) -> Result<Vec<Workshop>, GatewayError> {
        Ok(self.begin().await?.data.workshops.clone())
    }

    async fn find_workshop(&self, id: WorkshopId) -> Result<Option<Workshop>, GatewayError> {
        let state = self.begin().await?;
        Ok(state.data.workshops.iter().find(|workshop| workshop.id == id).cloned())
    }

    async fn find_workshop_by_name(&self, name: &str) -> Result<Option<Workshop>, GatewayError> {
        let state = self.begin().await?;
        Ok(state.data.workshops.iter().find(|workshop| workshop.name == name).cloned())
    }

    async fn create_workshop(&self, workshop: &NewWorkshop) -> Result<Workshop, GatewayError> {
        let mut state = self.begin().await?;
        let created = Workshop {
            id: WorkshopId(next_id(state.data.workshops.iter().map(|workshop| workshop.id.0))),
            name: workshop.name.clone(),
            location: workshop.location.clone(),
            capacity: None,
            status: Some("Active".to_owned()),
        };
        state.data.workshops.push(created.clone());
        Ok(created)
    }

    async fn list_part_requests(&self) -> Result<Vec<PartRequest>, GatewayError> {
        Ok(self.begin().await?.data.part_requests.clone())
    }

    async fn find_part_request(
        &self,
        id: PartRequestId,
    ) -> Result<Option<PartRequest>, GatewayError> {
        let state = self.begin().await?;
        Ok(state.data.part_requests.iter().find(|request| request.id == id).cloned())
    }

    async fn part_requests_by_user(&self, id: UserId) -> Result<Vec<PartRequest>, GatewayError> {
        let state = self.begin().await?;
        Ok(state
            .data
            .part_requests
            .iter()
            .filter(|request| request.user_id == id)
            .cloned()
            .collect())
    }

    async fn part_requests_by_workshop(
        &self,
        id: WorkshopId,
    ) -> Result<Vec<PartRequest>, GatewayError> {
        let state = self.begin().await?;
        Ok(state
            .data
            .part_requests
            .iter()
            .filter(|request| request.workshop_id == id)
            .cloned()
            .collect())
    }

    async fn part_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<PartRequest>, GatewayError> {
        let state = self.begin().await?;
        Ok(state
            .data
            .part_requests
            .iter()
            .filter(|request| request.status == status)
            .cloned()
            .collect())
    }

    async fn create_part_request(
        &self,
        request: &NewPartRequest,
        acting_user: UserId,
    ) -> Result<PartRequest, GatewayError> {
        let mut state = self.begin().await?;
        let created = PartRequest {
            id: PartRequestId(next_id(state.data.part_requests.iter().map(|request| request.id.0))),
            part_name: request.part_name.clone(),
            part_number: request.part_number.clone(),
            quantity: request.quantity,
            priority: request.priority,
            status: RequestStatus::Pending,
            workshop_id: request.workshop_id,
            user_id: acting_user,
            request_date: Some(Utc::now()),
            required_date: Some(request.required_date),
            estimated_cost: request.estimated_cost,
            description: request.description.clone(),
            justification: None,
            specifications: None,
            supplier: None,
        };
        state.data.part_requests.push(created.clone());
        Ok(created)
    }

    async fn submit_decision(
        &self,
        request_id: PartRequestId,
        body: &DecisionBody,
        approver: UserId,
    ) -> Result<Approval, GatewayError> {
        let mut state = self.begin().await?;
        let approver_name = state
            .data
            .users
            .iter()
            .find(|user| user.id == approver)
            .map(User::display_name)
            .unwrap_or_else(|| format!("user #{approver}"));
        let approval_id =
            ApprovalId(next_id(state.data.approvals.iter().map(|approval| approval.id.0)));

        let request = state
            .data
            .part_requests
            .iter_mut()
            .find(|request| request.id == request_id)
            .ok_or_else(|| not_found("part request"))?;
        if !request.is_pending() {
            return Err(GatewayError::Status {
                status: 409,
                body: format!("part request {request_id} is already {}", request.status),
            });
        }
        request.status = RequestStatus::from(body.status);

        let approval = Approval {
            id: approval_id,
            part_request_id: request_id,
            approver_id: approver,
            approver_name,
            status: body.status,
            comments: body.comments.clone(),
            approval_date: Some(Utc::now()),
        };
        state.data.approvals.push(approval.clone());
        Ok(approval)
    }

    async fn list_approvals(&self) -> Result<Vec<Approval>, GatewayError> {
        Ok(self.begin().await?.data.approvals.clone())
    }

    async fn find_approval(&self, id: ApprovalId) -> Result<Option<Approval>, GatewayError> {
        let state = self.begin().await?;
        Ok(state.data.approvals.iter().find(|approval| approval.id == id).cloned())
    }

    async fn approvals_by_approver(&self, id: UserId) -> Result<Vec<Approval>, GatewayError> {
        let state = self.begin().await?;
        Ok(state
            .data
            .approvals
            .iter()
            .filter(|approval| approval.approver_id == id)
            .cloned()
            .collect())
    }

    async fn approvals_for_request(
        &self,
        id: PartRequestId,
    ) -> Result<Vec<Approval>, GatewayError> {
        let state = self.begin().await?;
        Ok(state
            .data
            .approvals
            .iter()
            .filter(|approval| approval.part_request_id == id)
            .cloned()
            .collect())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, GatewayError> {
        Ok(self.begin().await?.data.roles.clone())
    }

    async fn find_role(&self, id: RoleId) -> Result<Option<Role>, GatewayError> {
        Ok(self.begin().await?.data.roles.iter().find(|role| role.id == id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, GatewayError> {
        let state = self.begin().await?;
        Ok(state.data.roles.iter().find(|role| role.name.eq_ignore_ascii_case(name)).cloned())
    }

    async fn create_role(&self, role: &NewRole) -> Result<Role, GatewayError> {
        let mut state = self.begin().await?;
        let created = Role {
            id: RoleId(next_id(state.data.roles.iter().map(|role| role.id.0))),
            name: role.name.clone(),
            description: role.description.clone(),
            permissions: role.permissions.iter().cloned().collect::<BTreeSet<_>>(),
        };
        state.data.roles.push(created.clone());
        Ok(created)
    }
}
