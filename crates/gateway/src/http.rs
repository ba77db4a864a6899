use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use partsdesk_core::config::GatewayConfig;
use partsdesk_core::forms::{NewPartRequest, NewRole, NewUser, NewWorkshop};
use partsdesk_core::{
    Approval, ApprovalId, PartRequest, PartRequestId, RequestStatus, Role, RoleId, User, UserId,
    Workshop, WorkshopId,
};

use crate::backend::{BackendGateway, GatewayError};
use crate::wire::{DecisionBody, ACTING_USER_HEADER};

/// REST client for the parts backend. Every call is bounded by the configured timeout.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|error| GatewayError::Url(format!("{}: {error}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Url(format!("{} cannot carry a path", config.base_url)));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends percent-encoded path segments to the base url.
    fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| GatewayError::Url(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, GatewayError> {
        let url = self.url(segments)?;
        debug!(method = "GET", url = %url, "backend call");
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        read_json(response).await
    }

    async fn find_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<Option<T>, GatewayError> {
        match self.get_json(segments).await {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn post_json<B, T>(
        &self,
        segments: &[&str],
        body: &B,
        acting_user: Option<UserId>,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(segments)?;
        debug!(method = "POST", url = %url, "backend call");
        let mut request = self.client.post(url).json(body);
        if let Some(user) = acting_user {
            request = request.header(ACTING_USER_HEADER, user.0.to_string());
        }
        let response = request.send().await.map_err(transport_error)?;
        read_json(response).await
    }
}

fn transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::Timeout
    } else if error.is_decode() {
        GatewayError::Decode(error.to_string())
    } else {
        GatewayError::Transport(error.to_string())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Status { status: status.as_u16(), body });
    }

    response.json::<T>().await.map_err(|error| {
        if error.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Decode(error.to_string())
        }
    })
}

#[async_trait]
impl BackendGateway for HttpGateway {
    async fn list_users(&self) -> Result<Vec<User>, GatewayError> {
        self.get_json(&["users"]).await
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, GatewayError> {
        self.find_json(&["users", &id.to_string()]).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, GatewayError> {
        self.find_json(&["users", "username", username]).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, GatewayError> {
        self.find_json(&["users", "email", email]).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, GatewayError> {
        self.post_json(&["users"], user, None).await
    }

    async fn list_workshops(&self) -> Result<Vec<Workshop>, GatewayError> {
        self.get_json(&["workshops"]).await
    }

    async fn find_workshop(&self, id: WorkshopId) -> Result<Option<Workshop>, GatewayError> {
        self.find_json(&["workshops", &id.to_string()]).await
    }

    async fn find_workshop_by_name(&self, name: &str) -> Result<Option<Workshop>, GatewayError> {
        self.find_json(&["workshops", "name", name]).await
    }

    async fn create_workshop(&self, workshop: &NewWorkshop) -> Result<Workshop, GatewayError> {
        self.post_json(&["workshops"], workshop, None).await
    }

    async fn list_part_requests(&self) -> Result<Vec<PartRequest>, GatewayError> {
        self.get_json(&["part-requests"]).await
    }

    async fn find_part_request(
        &self,
        id: PartRequestId,
    ) -> Result<Option<PartRequest>, GatewayError> {
        self.find_json(&["part-requests", &id.to_string()]).await
    }

    async fn part_requests_by_user(&self, id: UserId) -> Result<Vec<PartRequest>, GatewayError> {
        self.get_json(&["part-requests", "user", &id.to_string()]).await
    }

    async fn part_requests_by_workshop(
        &self,
        id: WorkshopId,
    ) -> Result<Vec<PartRequest>, GatewayError> {
        self.get_json(&["part-requests", "workshop", &id.to_string()]).await
    }

    async fn part_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<PartRequest>, GatewayError> {
        self.get_json(&["part-requests", "status", status.as_str()]).await
    }

    async fn create_part_request(
        &self,
        request: &NewPartRequest,
        acting_user: UserId,
    ) -> Result<PartRequest, GatewayError> {
        self.post_json(&["part-requests"], request, Some(acting_user)).await
    }

    async fn submit_decision(
        &self,
        request_id: PartRequestId,
        body: &DecisionBody,
        approver: UserId,
    ) -> Result<Approval, GatewayError> {
        let id = request_id.to_string();
        self.post_json(&["approvals", "part-request", &id], body, Some(approver)).await
    }

    async fn list_approvals(&self) -> Result<Vec<Approval>, GatewayError> {
        warn!(
            event_name = "gateway.approvals.no_list_endpoint",
            "backend has no endpoint listing all approvals; starting with none cached"
        );
        Ok(Vec::new())
    }

    async fn find_approval(&self, id: ApprovalId) -> Result<Option<Approval>, GatewayError> {
        self.find_json(&["approvals", &id.to_string()]).await
    }

    async fn approvals_by_approver(&self, id: UserId) -> Result<Vec<Approval>, GatewayError> {
        self.get_json(&["approvals", "approver", &id.to_string()]).await
    }

    async fn approvals_for_request(
        &self,
        id: PartRequestId,
    ) -> Result<Vec<Approval>, GatewayError> {
        self.get_json(&["approvals", "part-request", &id.to_string()]).await
    }

    async fn list_roles(&self) -> Result<Vec<Role>, GatewayError> {
        self.get_json(&["roles"]).await
    }

    async fn find_role(&self, id: RoleId) -> Result<Option<Role>, GatewayError> {
        self.find_json(&["roles", &id.0.to_string()]).await
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, GatewayError> {
        self.find_json(&["roles", "name", name]).await
    }

    async fn create_role(&self, role: &NewRole) -> Result<Role, GatewayError> {
        self.post_json(&["roles"], role, None).await
    }
}
