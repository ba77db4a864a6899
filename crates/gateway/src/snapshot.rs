use std::time::Duration;

use tracing::{info, warn};

use partsdesk_core::errors::ApplicationError;
use partsdesk_core::PortalSnapshot;

use crate::backend::BackendGateway;

/// Fetches the five collections concurrently. Any failure or an expired deadline fails the
/// whole load, so callers never see a partial snapshot.
pub async fn load_snapshot<G>(
    gateway: &G,
    deadline: Duration,
) -> Result<PortalSnapshot, ApplicationError>
where
    G: BackendGateway + ?Sized,
{
    let reads = async {
        tokio::try_join!(
            gateway.list_users(),
            gateway.list_workshops(),
            gateway.list_part_requests(),
            gateway.list_approvals(),
            gateway.list_roles(),
        )
    };

    let (users, workshops, part_requests, approvals, roles) =
        match tokio::time::timeout(deadline, reads).await {
            Ok(Ok(collections)) => collections,
            Ok(Err(error)) => {
                warn!(
                    event_name = "portal.snapshot.failed",
                    error = %error,
                    "snapshot load failed"
                );
                return Err(error.into());
            }
            Err(_) => {
                warn!(
                    event_name = "portal.snapshot.timeout",
                    deadline_ms = deadline.as_millis() as u64,
                    "snapshot load exceeded its deadline"
                );
                return Err(ApplicationError::Timeout);
            }
        };

    info!(
        event_name = "portal.snapshot.loaded",
        users = users.len(),
        workshops = workshops.len(),
        part_requests = part_requests.len(),
        approvals = approvals.len(),
        roles = roles.len(),
        "snapshot loaded"
    );
    Ok(PortalSnapshot { users, workshops, part_requests, approvals, roles })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use partsdesk_core::errors::ApplicationError;
    use partsdesk_core::{PortalSnapshot, Workshop, WorkshopId};

    use super::load_snapshot;
    use crate::backend::GatewayError;
    use crate::memory::InMemoryGateway;

    #[tokio::test]
    async fn loads_every_collection() {
        let gateway = InMemoryGateway::new(PortalSnapshot {
            workshops: vec![Workshop {
                id: WorkshopId(1),
                name: "Base Workshop Alpha".to_owned(),
                location: "North Sector".to_owned(),
                capacity: Some(40),
                status: Some("Active".to_owned()),
            }],
            ..PortalSnapshot::default()
        });

        let snapshot = load_snapshot(&gateway, Duration::from_secs(1)).await.expect("snapshot");
        assert_eq!(snapshot.workshops.len(), 1);
        assert_eq!(gateway.calls().await, 5);
    }

    #[tokio::test]
    async fn one_failed_read_fails_the_load() {
        let gateway = InMemoryGateway::new(PortalSnapshot::default());
        gateway
            .fail_next(GatewayError::Status { status: 503, body: "maintenance".to_owned() })
            .await;

        let error = load_snapshot(&gateway, Duration::from_secs(1)).await.expect_err("failed read");
        assert_eq!(
            error,
            ApplicationError::Network { status: Some(503), message: "maintenance".to_owned() }
        );
    }
}
