pub mod backend;
pub mod guard;
pub mod http;
pub mod memory;
pub mod service;
pub mod snapshot;
pub mod wire;

pub use backend::{BackendGateway, GatewayError};
pub use guard::{SubmissionGuard, SubmissionKey, SubmissionTicket};
pub use http::HttpGateway;
pub use memory::InMemoryGateway;
pub use service::PortalService;
pub use snapshot::load_snapshot;
pub use wire::DecisionBody;
