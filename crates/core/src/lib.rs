pub mod approvals;
pub mod audit;
pub mod config;
pub mod derived;
pub mod domain;
pub mod errors;
pub mod forms;
pub mod permissions;
pub mod query;
pub mod store;

pub use approvals::{DecisionRequest, ValidatedDecision};
pub use audit::{
    AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink, NoopAuditSink,
};
pub use config::{LoadOptions, PortalConfig};
pub use derived::{RequestInsight, StockStatus, StockThresholds, UrgencyLevel, UrgencyThresholds};
pub use domain::{
    Approval, ApprovalId, Decision, InventoryItem, PartRequest, PartRequestId, Priority,
    RequestStatus, Role, RoleId, User, UserId, UserRole, Workshop, WorkshopId,
};
pub use errors::{ApplicationError, DomainError, FieldError, InterfaceError};
pub use permissions::{Capability, CapabilitySet, Principal};
pub use store::{ApprovalHistory, IntegrityIssue, PortalSnapshot, PortalStore};
