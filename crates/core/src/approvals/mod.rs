//! Approval workflow controller.
//!
//! A part request leaves `PENDING` exactly once. Every precondition is checked before any
//! mutation, so a failed decision leaves both the request and the approval list untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Approval, ApprovalId, Decision, PartRequest, PartRequestId, RequestStatus, UserId,
};
use crate::errors::DomainError;
use crate::permissions::{Capability, Principal};

/// What a reviewer asked for, before any check has run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub request_id: PartRequestId,
    pub decision: Decision,
    pub comments: Option<String>,
}

impl DecisionRequest {
    pub fn new(request_id: PartRequestId, decision: Decision, comments: Option<&str>) -> Self {
        Self { request_id, decision, comments: comments.map(str::to_owned) }
    }
}

/// A decision that passed the role gate, the state check and the comment rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedDecision {
    pub request_id: PartRequestId,
    pub decision: Decision,
    pub comments: Option<String>,
    pub approver_id: UserId,
    pub approver_name: String,
}

impl ValidatedDecision {
    pub fn next_status(&self) -> RequestStatus {
        RequestStatus::from(self.decision)
    }

    pub fn into_approval(self, id: ApprovalId, approval_date: DateTime<Utc>) -> Approval {
        Approval {
            id,
            part_request_id: self.request_id,
            approver_id: self.approver_id,
            approver_name: self.approver_name,
            status: self.decision,
            comments: self.comments,
            approval_date: Some(approval_date),
        }
    }
}

/// Trimmed comments; whitespace-only input counts as absent.
pub fn normalize_comments(comments: Option<&str>) -> Option<String> {
    comments.map(str::trim).filter(|text| !text.is_empty()).map(str::to_owned)
}

pub fn validate_decision(
    principal: &Principal,
    request: &PartRequest,
    decision: Decision,
    comments: Option<&str>,
) -> Result<ValidatedDecision, DomainError> {
    principal.require(Capability::ApproveRequests)?;

    let next = RequestStatus::from(decision);
    if !request.can_transition_to(next) {
        return Err(DomainError::InvalidState { request_id: request.id, status: request.status });
    }

    let comments = normalize_comments(comments);
    if decision == Decision::Rejected && comments.is_none() {
        return Err(DomainError::validation(
            "comments",
            "comments are required when rejecting a request",
        ));
    }

    Ok(ValidatedDecision {
        request_id: request.id,
        decision,
        comments,
        approver_id: principal.user_id,
        approver_name: principal.display_name.clone(),
    })
}

/// Decide a single request in place, returning the approval record it produced.
pub fn decide(
    request: &mut PartRequest,
    decision: Decision,
    comments: Option<&str>,
    principal: &Principal,
    approval_id: ApprovalId,
    now: DateTime<Utc>,
) -> Result<Approval, DomainError> {
    let validated = validate_decision(principal, request, decision, comments)?;
    request.transition_to(validated.next_status())?;
    Ok(validated.into_approval(approval_id, now))
}
