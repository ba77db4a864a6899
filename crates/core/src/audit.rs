use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Approval, ApprovalId, Decision, PartRequestId, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Approval,
    Request,
    Directory,
    Snapshot,
    Integrity,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

/// One portal action as seen by the acting user. Decision events carry the decision and, once
/// the backend answered, the approver and approval id it recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub correlation_id: String,
    pub event_type: String,
    pub category: AuditCategory,
    pub actor: UserId,
    pub outcome: AuditOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<PartRequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<ApprovalId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        correlation_id: impl Into<String>,
        event_type: impl Into<String>,
        category: AuditCategory,
        actor: UserId,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            correlation_id: correlation_id.into(),
            event_type: event_type.into(),
            category,
            actor,
            outcome,
            request_id: None,
            decision: None,
            approver: None,
            approval_id: None,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn for_request(mut self, request_id: PartRequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// The decision that was asked for, before the backend has recorded anything.
    pub fn with_decision(mut self, decision: Decision) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Takes request, decision, approver and id from the approval the backend returned.
    pub fn with_approval(mut self, approval: &Approval) -> Self {
        self.request_id = Some(approval.part_request_id);
        self.decision = Some(approval.status);
        self.approver = Some(approval.approver_id);
        self.approval_id = Some(approval.id);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// True when the recorded approver is someone other than the user who acted.
    pub fn approver_differs_from_actor(&self) -> bool {
        self.approver.is_some_and(|approver| approver != self.actor)
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Drops every event; for callers that have nowhere to send them.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn decisions_for(&self, request_id: PartRequestId) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|event| {
                event.category == AuditCategory::Approval && event.request_id == Some(request_id)
            })
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
    use crate::domain::{Approval, ApprovalId, Decision, PartRequestId, UserId};

    fn approval() -> Approval {
        Approval {
            id: ApprovalId(7),
            part_request_id: PartRequestId(42),
            approver_id: UserId(2),
            approver_name: "Maj. Rao".to_owned(),
            status: Decision::Rejected,
            comments: Some("over budget".to_owned()),
            approval_date: None,
        }
    }

    #[test]
    fn applied_decisions_carry_the_backend_record() {
        let sink = InMemoryAuditSink::default();
        sink.emit(
            AuditEvent::new(
                "req-123",
                "approval.decision_applied",
                AuditCategory::Approval,
                UserId(2),
                AuditOutcome::Success,
            )
            .with_approval(&approval()),
        );
        sink.emit(AuditEvent::new(
            "req-123",
            "snapshot.loaded",
            AuditCategory::Snapshot,
            UserId(2),
            AuditOutcome::Success,
        ));

        let decisions = sink.decisions_for(PartRequestId(42));
        assert_eq!(decisions.len(), 1);
        let event = &decisions[0];
        assert_eq!(event.correlation_id, "req-123");
        assert_eq!(event.decision, Some(Decision::Rejected));
        assert_eq!(event.approver, Some(UserId(2)));
        assert_eq!(event.approval_id, Some(ApprovalId(7)));
        assert!(!event.approver_differs_from_actor());
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn refused_decisions_keep_the_requested_decision_only() {
        let event = AuditEvent::new(
            "req-9",
            "approval.decision_refused",
            AuditCategory::Approval,
            UserId(3),
            AuditOutcome::Rejected,
        )
        .for_request(PartRequestId(5))
        .with_decision(Decision::Approved)
        .with_metadata("error", "role User lacks ApproveRequests");

        assert_eq!(event.request_id, Some(PartRequestId(5)));
        assert_eq!(event.decision, Some(Decision::Approved));
        assert_eq!(event.approver, None);
        assert_eq!(event.approval_id, None);

        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["decision"], "APPROVED");
        assert_eq!(json["outcome"], "rejected");
        assert!(json.get("approver").is_none());
    }

    #[test]
    fn backend_recorded_approver_can_differ_from_actor() {
        let event = AuditEvent::new(
            "req-1",
            "approval.decision_applied",
            AuditCategory::Approval,
            UserId(9),
            AuditOutcome::Success,
        )
        .with_approval(&approval());
        assert!(event.approver_differs_from_actor());
    }
}
