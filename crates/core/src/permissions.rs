//! Capability lookup resolved once per session from the signed-in user's role.
//!
//! This gates what the portal offers; the backend still has the final say.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{User, UserId, UserRole};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewDashboard,
    CreateRequest,
    ViewApprovals,
    ApproveRequests,
    ManageWorkshops,
    ViewInventory,
    ViewReports,
    ManageUsers,
    ManageRoles,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Capability::ViewDashboard,
        Capability::CreateRequest,
        Capability::ViewApprovals,
        Capability::ApproveRequests,
        Capability::ManageWorkshops,
        Capability::ViewInventory,
        Capability::ViewReports,
        Capability::ManageUsers,
        Capability::ManageRoles,
    ];
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    role: UserRole,
    granted: BTreeSet<Capability>,
}

impl CapabilitySet {
    pub fn for_role(role: UserRole) -> Self {
        use Capability::*;

        let granted: BTreeSet<Capability> = match role {
            UserRole::Admin => Capability::ALL.into_iter().collect(),
            UserRole::Manager => Capability::ALL
                .into_iter()
                .filter(|capability| !matches!(capability, ManageUsers | ManageRoles))
                .collect(),
            UserRole::User => [ViewDashboard, CreateRequest, ViewInventory].into_iter().collect(),
        };

        Self { role, granted }
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> Result<(), DomainError> {
        if self.allows(capability) {
            return Ok(());
        }
        Err(DomainError::PermissionDenied { role: self.role, capability })
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.granted.iter().copied()
    }
}

/// The acting user for a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub display_name: String,
    pub capabilities: CapabilitySet,
}

impl Principal {
    pub fn new(user_id: UserId, display_name: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            capabilities: CapabilitySet::for_role(role),
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self::new(user.id, user.display_name(), user.role)
    }

    pub fn role(&self) -> UserRole {
        self.capabilities.role()
    }

    pub fn require(&self, capability: Capability) -> Result<(), DomainError> {
        self.capabilities.require(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::{Capability, CapabilitySet, Principal};
    use crate::domain::{UserId, UserRole};
    use crate::errors::DomainError;

    #[test]
    fn only_admins_and_managers_approve() {
        assert!(CapabilitySet::for_role(UserRole::Admin).allows(Capability::ApproveRequests));
        assert!(CapabilitySet::for_role(UserRole::Manager).allows(Capability::ApproveRequests));
        assert!(!CapabilitySet::for_role(UserRole::User).allows(Capability::ApproveRequests));
    }

    #[test]
    fn administration_is_admin_only() {
        let manager = CapabilitySet::for_role(UserRole::Manager);
        assert!(!manager.allows(Capability::ManageUsers));
        assert!(!manager.allows(Capability::ManageRoles));
        assert!(manager.allows(Capability::ViewReports));
        assert_eq!(CapabilitySet::for_role(UserRole::Admin).iter().count(), Capability::ALL.len());
    }

    #[test]
    fn require_reports_role_and_capability() {
        let principal = Principal::new(UserId(9), "cpl_singh", UserRole::User);
        let error =
            principal.require(Capability::ViewReports).expect_err("users cannot view reports");
        assert_eq!(
            error,
            DomainError::PermissionDenied {
                role: UserRole::User,
                capability: Capability::ViewReports,
            }
        );
        assert!(principal.require(Capability::CreateRequest).is_ok());
    }
}
