//! Portal operations: local validation, then the backend, then the cached store.
//!
//! The store is only patched after the backend accepted a mutation, and every failure path
//! leaves it exactly as it was.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{info, warn};

use partsdesk_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use partsdesk_core::errors::{ApplicationError, DomainError};
use partsdesk_core::forms::{CreatePartRequest, CreateRole, CreateUser, CreateWorkshop};
use partsdesk_core::permissions::{Capability, Principal};
use partsdesk_core::{
    Approval, ApprovalHistory, DecisionRequest, IntegrityIssue, PartRequest, PartRequestId,
    PortalStore, Role, User, Workshop,
};

use crate::backend::{BackendGateway, GatewayError};
use crate::guard::{SubmissionGuard, SubmissionKey, SubmissionTicket};
use crate::snapshot::load_snapshot;
use crate::wire::DecisionBody;

pub struct PortalService<G> {
    gateway: G,
    store: RwLock<PortalStore>,
    principal: Principal,
    guard: SubmissionGuard,
    audit: Arc<dyn AuditSink>,
    load_deadline: Duration,
}

impl<G: BackendGateway> PortalService<G> {
    pub fn new(
        gateway: G,
        principal: Principal,
        audit: Arc<dyn AuditSink>,
        load_deadline: Duration,
    ) -> Self {
        Self {
            gateway,
            store: RwLock::new(PortalStore::default()),
            principal,
            guard: SubmissionGuard::default(),
            audit,
            load_deadline,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn guard(&self) -> &SubmissionGuard {
        &self.guard
    }

    pub async fn store(&self) -> RwLockReadGuard<'_, PortalStore> {
        self.store.read().await
    }

    fn ticket(&self, key: SubmissionKey) -> Result<SubmissionTicket, ApplicationError> {
        self.guard.try_acquire(key).ok_or_else(|| {
            let message = match key {
                SubmissionKey::Decision(_) => "decision already in flight",
                _ => "submission already in flight",
            };
            DomainError::validation("submission", message).into()
        })
    }

    /// Replaces the cached collections wholesale; the previous snapshot survives a failure.
    pub async fn refresh(&self, correlation_id: &str) -> Result<(), ApplicationError> {
        let snapshot = match load_snapshot(&self.gateway, self.load_deadline).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                self.audit.emit(
                    self.event(correlation_id, "snapshot.load_failed", AuditCategory::Snapshot)
                        .with_outcome(AuditOutcome::Failed)
                        .with_metadata("error", error.to_string()),
                );
                return Err(error);
            }
        };

        let part_requests = snapshot.part_requests.len();
        self.store.write().await.replace_snapshot(snapshot);
        self.audit.emit(
            self.event(correlation_id, "snapshot.loaded", AuditCategory::Snapshot)
                .with_metadata("part_requests", part_requests.to_string()),
        );
        Ok(())
    }

    pub async fn decide(
        &self,
        request: DecisionRequest,
        correlation_id: &str,
    ) -> Result<Approval, ApplicationError> {
        let request_id = request.request_id;
        let _ticket = self.ticket(SubmissionKey::Decision(request_id))?;

        let validated = {
            let store = self.store.read().await;
            store.validate_decision(
                &self.principal,
                request_id,
                request.decision,
                request.comments.as_deref(),
            )
        };
        let validated = match validated {
            Ok(validated) => validated,
            Err(error) => {
                self.audit_refusal(&request, correlation_id, AuditOutcome::Rejected, &error);
                return Err(error.into());
            }
        };

        let body = DecisionBody::from(&validated);
        let mut approval = match self
            .gateway
            .submit_decision(request_id, &body, self.principal.user_id)
            .await
        {
            Ok(approval) => approval,
            Err(error) => {
                let error = decision_error(request_id, error);
                self.audit_refusal(&request, correlation_id, AuditOutcome::Failed, &error);
                warn!(
                    event_name = "portal.approval.backend_failed",
                    correlation_id,
                    request_id = %request_id,
                    error = %error,
                    "backend refused or failed the decision; cache left unchanged"
                );
                return Err(error);
            }
        };

        if approval.approver_name.trim().is_empty() {
            approval.approver_name = validated.approver_name.clone();
        }
        if approval.part_request_id != request_id || approval.status != validated.decision {
            let error = DomainError::IntegrityViolation(format!(
                "backend answered decision on {request_id} with approval {} for {} ({})",
                approval.id, approval.part_request_id, approval.status
            ));
            self.audit_refusal(&request, correlation_id, AuditOutcome::Failed, &error);
            return Err(error.into());
        }

        self.store.write().await.apply_approval_decision(approval.clone())?;

        info!(
            event_name = "portal.approval.applied",
            correlation_id,
            request_id = %request_id,
            approval_id = %approval.id,
            decision = %approval.status,
            "approval decision applied"
        );
        self.audit.emit(
            self.event(correlation_id, "approval.decision_applied", AuditCategory::Approval)
                .with_approval(&approval),
        );
        Ok(approval)
    }

    fn event(&self, correlation_id: &str, event_type: &str, category: AuditCategory) -> AuditEvent {
        AuditEvent::new(
            correlation_id,
            event_type,
            category,
            self.principal.user_id,
            AuditOutcome::Success,
        )
    }

    fn audit_refusal(
        &self,
        request: &DecisionRequest,
        correlation_id: &str,
        outcome: AuditOutcome,
        error: &dyn std::fmt::Display,
    ) {
        self.audit.emit(
            self.event(correlation_id, "approval.decision_refused", AuditCategory::Approval)
                .with_outcome(outcome)
                .for_request(request.request_id)
                .with_decision(request.decision)
                .with_metadata("error", error.to_string()),
        );
    }

    pub async fn create_part_request(
        &self,
        form: &CreatePartRequest,
        today: NaiveDate,
        correlation_id: &str,
    ) -> Result<PartRequest, ApplicationError> {
        self.principal.require(Capability::CreateRequest)?;
        let draft = form.validate(today)?;
        let _ticket = self.ticket(SubmissionKey::NewPartRequest)?;

        let created = self
            .gateway
            .create_part_request(&draft, self.principal.user_id)
            .await
            .map_err(ApplicationError::from)?;
        self.store.write().await.insert_part_request(created.clone())?;

        info!(
            event_name = "portal.request.created",
            correlation_id,
            request_id = %created.id,
            priority = %created.priority,
            "part request created"
        );
        self.audit.emit(
            self.event(correlation_id, "request.created", AuditCategory::Request)
                .for_request(created.id)
                .with_metadata("part_number", created.part_number.clone())
                .with_metadata("priority", created.priority.to_string()),
        );
        Ok(created)
    }

    pub async fn create_user(
        &self,
        form: &CreateUser,
        correlation_id: &str,
    ) -> Result<User, ApplicationError> {
        self.principal.require(Capability::ManageUsers)?;
        let draft = form.validate()?;
        let _ticket = self.ticket(SubmissionKey::NewUser)?;

        let created = self.gateway.create_user(&draft).await.map_err(ApplicationError::from)?;
        self.store.write().await.upsert_user(created.clone());
        self.audit_directory("directory.user_created", correlation_id, created.username.clone());
        Ok(created)
    }

    pub async fn create_workshop(
        &self,
        form: &CreateWorkshop,
        correlation_id: &str,
    ) -> Result<Workshop, ApplicationError> {
        self.principal.require(Capability::ManageWorkshops)?;
        let draft = form.validate()?;
        let _ticket = self.ticket(SubmissionKey::NewWorkshop)?;

        let created =
            self.gateway.create_workshop(&draft).await.map_err(ApplicationError::from)?;
        self.store.write().await.upsert_workshop(created.clone());
        self.audit_directory("directory.workshop_created", correlation_id, created.name.clone());
        Ok(created)
    }

    pub async fn create_role(
        &self,
        form: &CreateRole,
        correlation_id: &str,
    ) -> Result<Role, ApplicationError> {
        self.principal.require(Capability::ManageRoles)?;
        let draft = form.validate()?;
        let _ticket = self.ticket(SubmissionKey::NewRole)?;

        let created = self.gateway.create_role(&draft).await.map_err(ApplicationError::from)?;
        self.store.write().await.upsert_role(created.clone());
        self.audit_directory("directory.role_created", correlation_id, created.name.clone());
        Ok(created)
    }

    fn audit_directory(&self, event_type: &str, correlation_id: &str, name: String) {
        self.audit.emit(
            self.event(correlation_id, event_type, AuditCategory::Directory)
                .with_metadata("name", name),
        );
    }

    /// Cached history first; a decided request without a cached record is looked up on the
    /// backend once before being reported as missing.
    pub async fn approval_history(
        &self,
        request_id: PartRequestId,
    ) -> Result<ApprovalHistory, ApplicationError> {
        let cached = self.store.read().await.approval_history(request_id)?;
        if cached != ApprovalHistory::MissingRecord {
            return Ok(cached);
        }

        Ok(match self.reconcile_approval(request_id).await? {
            Some(approval) => ApprovalHistory::Decided(approval),
            None => ApprovalHistory::MissingRecord,
        })
    }

    async fn reconcile_approval(
        &self,
        request_id: PartRequestId,
    ) -> Result<Option<Approval>, ApplicationError> {
        let fetched = self
            .gateway
            .approvals_for_request(request_id)
            .await
            .map_err(ApplicationError::from)?;
        let Some(approval) = fetched.into_iter().next() else {
            return Ok(None);
        };

        self.store.write().await.record_existing_approval(approval.clone())?;
        Ok(Some(approval))
    }

    /// Decided requests missing a cached approval are looked up on the backend first; only
    /// records the backend cannot produce are reported.
    pub async fn integrity_report(&self, correlation_id: &str) -> Vec<IntegrityIssue> {
        let unrecorded = self.store.read().await.unrecorded_decisions();
        let mut reconciled = 0usize;
        for request_id in unrecorded {
            match self.reconcile_approval(request_id).await {
                Ok(Some(_)) => reconciled += 1,
                Ok(None) => {}
                Err(error) => warn!(
                    event_name = "portal.integrity.lookup_failed",
                    correlation_id,
                    request_id = %request_id,
                    error = %error,
                    "approval lookup failed; request stays unreconciled"
                ),
            }
        }
        if reconciled > 0 {
            info!(
                event_name = "portal.integrity.reconciled",
                correlation_id,
                reconciled,
                "approval records fetched from the backend"
            );
        }

        let issues = self.store.read().await.integrity_report();
        if !issues.is_empty() {
            self.audit.emit(
                self.event(correlation_id, "integrity.issues_found", AuditCategory::Integrity)
                    .with_outcome(AuditOutcome::Failed)
                    .with_metadata("count", issues.len().to_string())
                    .with_metadata("reconciled", reconciled.to_string()),
            );
        }
        issues
    }
}

/// A 409 on a decision means someone else decided first.
fn decision_error(request_id: PartRequestId, error: GatewayError) -> ApplicationError {
    if error.is_conflict() {
        DomainError::DuplicateApproval(request_id).into()
    } else {
        error.into()
    }
}
