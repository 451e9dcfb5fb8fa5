//! Typed endpoint groups over [`ApiClient`]. Each service is a cheap handle
//! that borrows nothing; build them on demand with `ApiClient::auth()` and friends.

use serde::Deserialize;
use serde_json::Value;

use crate::api::client::ApiClient;
use crate::api::error::ClientError;
use crate::api::types::{
    Anomaly, EventQuery, EventsResponse, InviteData, LoginResponse, NewOrganization,
    Organization, OrganizationSettings, RegisterData, SettingsUpdate, SystemHealth, TeamMember,
    User,
};

/// Credential exchange and account endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// OAuth2 password flow: the email goes in the `username` field.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        self.client
            .post_form(
                "/auth/login/access-token",
                &[("username", email), ("password", password)],
            )
            .await
    }

    pub async fn me(&self) -> Result<User, ClientError> {
        self.client.get("/users/me").await
    }

    pub async fn register(&self, data: &RegisterData) -> Result<User, ClientError> {
        self.client.post_json("/auth/register", data).await
    }

    pub async fn create_organization(&self, name: &str) -> Result<Organization, ClientError> {
        let body = NewOrganization {
            name,
            is_active: true,
        };
        self.client.post_json("/organizations/", &body).await
    }
}

#[derive(Debug, Clone)]
pub struct MonitoringApi {
    client: ApiClient,
}

impl MonitoringApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn health(&self) -> Result<SystemHealth, ClientError> {
        self.client.get("/monitoring/health").await
    }

    /// Free-form metrics document.
    pub async fn metrics(&self) -> Result<Value, ClientError> {
        self.client.get("/monitoring/metrics").await
    }
}

/// `/anomalies` answers either `{"anomalies": [...]}` or a bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnomalyList {
    Wrapped { anomalies: Vec<Anomaly> },
    Bare(Vec<Anomaly>),
}

#[derive(Debug, Clone)]
pub struct SecurityApi {
    client: ApiClient,
}

impl SecurityApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn anomalies(&self) -> Result<Vec<Anomaly>, ClientError> {
        let list: AnomalyList = self.client.get("/anomalies").await?;
        Ok(match list {
            AnomalyList::Wrapped { anomalies } => anomalies,
            AnomalyList::Bare(anomalies) => anomalies,
        })
    }

    pub async fn current_traffic(&self) -> Result<Value, ClientError> {
        self.client.get("/traffic/current").await
    }

    pub async fn events(&self, query: &EventQuery) -> Result<EventsResponse, ClientError> {
        self.client.get_with_query("/events", &query.to_pairs()).await
    }
}

#[derive(Debug, Clone)]
pub struct TeamApi {
    client: ApiClient,
}

impl TeamApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn members(&self) -> Result<Vec<TeamMember>, ClientError> {
        self.client.get("/users/organization-members").await
    }

    pub async fn invite(&self, invite: &InviteData) -> Result<Value, ClientError> {
        self.client.post_json("/users/invite", invite).await
    }

    pub async fn update(&self, member: &TeamMember) -> Result<TeamMember, ClientError> {
        let path = format!("/users/{}", member.id);
        self.client.put_json(&path, member).await
    }

    pub async fn remove(&self, id: &str) -> Result<(), ClientError> {
        self.client.delete(&format!("/users/{}", id)).await
    }
}

#[derive(Debug, Clone)]
pub struct SettingsApi {
    client: ApiClient,
}

impl SettingsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, organization_id: &str) -> Result<OrganizationSettings, ClientError> {
        let path = format!("/organizations/{}/settings", organization_id);
        self.client.get(&path).await
    }

    pub async fn update(
        &self,
        organization_id: &str,
        update: &SettingsUpdate,
    ) -> Result<OrganizationSettings, ClientError> {
        let path = format!("/organizations/{}/settings", organization_id);
        self.client.put_json(&path, update).await
    }
}

impl ApiClient {
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    pub fn monitoring(&self) -> MonitoringApi {
        MonitoringApi::new(self.clone())
    }

    pub fn security(&self) -> SecurityApi {
        SecurityApi::new(self.clone())
    }

    pub fn team(&self) -> TeamApi {
        TeamApi::new(self.clone())
    }

    pub fn settings(&self) -> SettingsApi {
        SettingsApi::new(self.clone())
    }
}
