pub mod approval;
pub mod dates;
pub mod inventory;
pub mod part_request;
pub mod role;
pub mod user;
pub mod workshop;

pub use approval::{Approval, ApprovalId, Decision};
pub use inventory::{InventoryItem, InventoryItemId};
pub use part_request::{PartRequest, PartRequestId, Priority, RequestStatus};
pub use role::{Role, RoleId};
pub use user::{User, UserId, UserRole};
pub use workshop::{Workshop, WorkshopId};
