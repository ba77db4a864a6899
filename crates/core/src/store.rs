//! The portal's in-memory cache of backend collections.
//!
//! Refreshed wholesale from a [`PortalSnapshot`] and patched through named operations only;
//! every patch validates first and mutates second.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::approvals::{validate_decision, ValidatedDecision};
use crate::domain::{
    Approval, ApprovalId, Decision, InventoryItem, PartRequest, PartRequestId, RequestStatus,
    Role, User, UserId, Workshop, WorkshopId,
};
use crate::errors::DomainError;
use crate::permissions::Principal;

/// The five collections fetched together on load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalSnapshot {
    pub users: Vec<User>,
    pub workshops: Vec<Workshop>,
    pub part_requests: Vec<PartRequest>,
    pub approvals: Vec<Approval>,
    pub roles: Vec<Role>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "approval", rename_all = "snake_case")]
pub enum ApprovalHistory {
    Pending,
    Decided(Approval),
    /// The request is decided but no approval record came back from the backend.
    MissingRecord,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    MissingApproval { request_id: PartRequestId, status: RequestStatus },
    DuplicateApprovals { request_id: PartRequestId, count: usize },
    ApprovalOnPendingRequest { request_id: PartRequestId, approval_id: ApprovalId },
}

impl IntegrityIssue {
    pub fn request_id(&self) -> PartRequestId {
        match self {
            Self::MissingApproval { request_id, .. }
            | Self::DuplicateApprovals { request_id, .. }
            | Self::ApprovalOnPendingRequest { request_id, .. } => *request_id,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PortalStore {
    snapshot: PortalSnapshot,
    inventory: Vec<InventoryItem>,
}

impl PortalStore {
    pub fn new(snapshot: PortalSnapshot) -> Self {
        Self { snapshot, inventory: Vec::new() }
    }

    pub fn replace_snapshot(&mut self, snapshot: PortalSnapshot) {
        self.snapshot = snapshot;
    }

    pub fn replace_inventory(&mut self, inventory: Vec<InventoryItem>) {
        self.inventory = inventory;
    }

    pub fn snapshot(&self) -> &PortalSnapshot {
        &self.snapshot
    }

    pub fn users(&self) -> &[User] {
        &self.snapshot.users
    }

    pub fn workshops(&self) -> &[Workshop] {
        &self.snapshot.workshops
    }

    pub fn part_requests(&self) -> &[PartRequest] {
        &self.snapshot.part_requests
    }

    pub fn approvals(&self) -> &[Approval] {
        &self.snapshot.approvals
    }

    pub fn roles(&self) -> &[Role] {
        &self.snapshot.roles
    }

    pub fn inventory(&self) -> &[InventoryItem] {
        &self.inventory
    }

    pub fn request(&self, id: PartRequestId) -> Option<&PartRequest> {
        self.snapshot.part_requests.iter().find(|request| request.id == id)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.snapshot.users.iter().find(|user| user.id == id)
    }

    pub fn workshop(&self, id: WorkshopId) -> Option<&Workshop> {
        self.snapshot.workshops.iter().find(|workshop| workshop.id == id)
    }

    pub fn approval_for(&self, id: PartRequestId) -> Option<&Approval> {
        self.snapshot.approvals.iter().find(|approval| approval.part_request_id == id)
    }

    /// Runs every decision precondition against the cached request without touching it.
    pub fn validate_decision(
        &self,
        principal: &Principal,
        request_id: PartRequestId,
        decision: Decision,
        comments: Option<&str>,
    ) -> Result<ValidatedDecision, DomainError> {
        let request = self.request(request_id).ok_or(DomainError::UnknownRequest(request_id))?;
        let validated = validate_decision(principal, request, decision, comments)?;
        if self.approval_for(request_id).is_some() {
            return Err(DomainError::DuplicateApproval(request_id));
        }
        Ok(validated)
    }

    /// Records `approval` and moves its request to the matching status, or changes nothing.
    pub fn apply_approval_decision(&mut self, approval: Approval) -> Result<(), DomainError> {
        let request_id = approval.part_request_id;
        if self.approval_for(request_id).is_some() {
            return Err(DomainError::DuplicateApproval(request_id));
        }

        let request = self
            .snapshot
            .part_requests
            .iter_mut()
            .find(|request| request.id == request_id)
            .ok_or(DomainError::UnknownRequest(request_id))?;
        request.transition_to(RequestStatus::from(approval.status))?;

        self.snapshot.approvals.push(approval);
        Ok(())
    }

    /// Caches an approval fetched after the fact for a request that is already decided.
    pub fn record_existing_approval(&mut self, approval: Approval) -> Result<(), DomainError> {
        let request_id = approval.part_request_id;
        let request = self.request(request_id).ok_or(DomainError::UnknownRequest(request_id))?;
        if request.status != RequestStatus::from(approval.status) {
            return Err(DomainError::IntegrityViolation(format!(
                "approval {} says {} but part request {request_id} is {}",
                approval.id, approval.status, request.status
            )));
        }
        if self.approval_for(request_id).is_some() {
            return Err(DomainError::DuplicateApproval(request_id));
        }

        self.snapshot.approvals.push(approval);
        Ok(())
    }

    /// Local decision with a store-assigned approval id.
    pub fn decide(
        &mut self,
        principal: &Principal,
        request_id: PartRequestId,
        decision: Decision,
        comments: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Approval, DomainError> {
        let validated = self.validate_decision(principal, request_id, decision, comments)?;
        let approval = validated.into_approval(self.next_approval_id(), now);
        self.apply_approval_decision(approval.clone())?;
        Ok(approval)
    }

    pub fn next_approval_id(&self) -> ApprovalId {
        let max = self.snapshot.approvals.iter().map(|approval| approval.id.0).max().unwrap_or(0);
        ApprovalId(max + 1)
    }

    /// New requests always enter the cache as `PENDING`.
    pub fn insert_part_request(&mut self, request: PartRequest) -> Result<(), DomainError> {
        if !request.is_pending() {
            return Err(DomainError::InvalidState {
                request_id: request.id,
                status: request.status,
            });
        }
        if self.request(request.id).is_some() {
            return Err(DomainError::IntegrityViolation(format!(
                "part request {} is already cached",
                request.id
            )));
        }
        self.snapshot.part_requests.push(request);
        Ok(())
    }

    pub fn upsert_user(&mut self, user: User) {
        upsert(&mut self.snapshot.users, user, |existing, new| existing.id == new.id);
    }

    pub fn upsert_workshop(&mut self, workshop: Workshop) {
        upsert(&mut self.snapshot.workshops, workshop, |existing, new| existing.id == new.id);
    }

    pub fn upsert_role(&mut self, role: Role) {
        upsert(&mut self.snapshot.roles, role, |existing, new| existing.id == new.id);
    }

    pub fn approval_history(&self, id: PartRequestId) -> Result<ApprovalHistory, DomainError> {
        let request = self.request(id).ok_or(DomainError::UnknownRequest(id))?;
        if request.is_pending() {
            return Ok(ApprovalHistory::Pending);
        }

        match self.approval_for(id) {
            Some(approval) => Ok(ApprovalHistory::Decided(approval.clone())),
            None => {
                warn!(
                    event_name = "portal.integrity.missing_approval",
                    request_id = %id,
                    status = %request.status,
                    "decided part request has no approval record"
                );
                Ok(ApprovalHistory::MissingRecord)
            }
        }
    }

    /// Decided requests with no cached approval, in cache order. Logs nothing.
    pub fn unrecorded_decisions(&self) -> Vec<PartRequestId> {
        self.snapshot
            .part_requests
            .iter()
            .filter(|request| !request.is_pending() && self.approval_for(request.id).is_none())
            .map(|request| request.id)
            .collect()
    }

    pub fn integrity_report(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();
        for request in &self.snapshot.part_requests {
            let mut matching = self
                .snapshot
                .approvals
                .iter()
                .filter(|approval| approval.part_request_id == request.id);
            let first = matching.next();
            let extra = matching.count();

            match (request.status, first) {
                (RequestStatus::Pending, Some(approval)) => {
                    issues.push(IntegrityIssue::ApprovalOnPendingRequest {
                        request_id: request.id,
                        approval_id: approval.id,
                    });
                }
                (RequestStatus::Pending, None) => {}
                (status, None) => {
                    issues.push(IntegrityIssue::MissingApproval { request_id: request.id, status });
                }
                (_, Some(_)) if extra > 0 => {
                    issues.push(IntegrityIssue::DuplicateApprovals {
                        request_id: request.id,
                        count: extra + 1,
                    });
                }
                (_, Some(_)) => {}
            }
        }

        for issue in &issues {
            warn!(
                event_name = "portal.integrity.issue",
                request_id = %issue.request_id(),
                issue = ?issue,
                "snapshot integrity issue"
            );
        }
        issues
    }
}

fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    match items.iter_mut().find(|existing| same(existing, &item)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}
