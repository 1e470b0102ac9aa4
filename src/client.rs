use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dotenv::dotenv;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, info};

use crate::auth::ProviderAuth;
use crate::errors::ServiceError;
use crate::models::meeting::RecurrenceRule;

// Provider-side meeting create/update request
#[derive(Debug, Clone, Serialize)]
pub struct ProviderMeetingRequest {
    pub topic: String,
    pub start_time: DateTime<Utc>,
    pub duration: u32,
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMeeting {
    pub provider_meeting_id: String,
    pub join_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderRegistrantRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRegistrant {
    pub provider_registrant_id: String,
    pub join_url: String,
}

#[derive(Debug, Deserialize)]
struct JoinLinkResponse {
    join_url: String,
}

/// Narrow interface to the conferencing provider's scheduling API.
///
/// Only the client-driven scheduling path calls this; webhook
/// reconciliation never does.
#[async_trait]
pub trait ConferencingProvider: Send + Sync {
    async fn create_meeting(
        &self,
        request: &ProviderMeetingRequest,
    ) -> Result<ProviderMeeting, ServiceError>;

    async fn update_meeting(
        &self,
        provider_meeting_id: &str,
        request: &ProviderMeetingRequest,
    ) -> Result<(), ServiceError>;

    async fn delete_meeting(&self, provider_meeting_id: &str) -> Result<(), ServiceError>;

    async fn create_registrant(
        &self,
        provider_meeting_id: &str,
        request: &ProviderRegistrantRequest,
    ) -> Result<ProviderRegistrant, ServiceError>;

    async fn update_registrant(
        &self,
        provider_meeting_id: &str,
        provider_registrant_id: &str,
        request: &ProviderRegistrantRequest,
    ) -> Result<(), ServiceError>;

    async fn delete_registrant(
        &self,
        provider_meeting_id: &str,
        provider_registrant_id: &str,
    ) -> Result<(), ServiceError>;

    async fn get_join_link(&self, provider_meeting_id: &str) -> Result<String, ServiceError>;
}

/// HTTP client for the conferencing provider API
pub struct ProviderHttpClient {
    client: Client,
    api_key: String,
    api_secret: String,
    endpoint: String,
}

impl ProviderHttpClient {
    /// Create a new provider client from environment variables
    pub fn new() -> Self {
        dotenv().ok();

        Self {
            client: Client::new(),
            api_key: env::var("PROVIDER_API_KEY")
                .expect("PROVIDER_API_KEY must be set in environment"),
            api_secret: env::var("PROVIDER_API_SECRET")
                .expect("PROVIDER_API_SECRET must be set in environment"),
            endpoint: env::var("PROVIDER_API_ENDPOINT")
                .unwrap_or_else(|_| "https://api.conferencing.example.com".to_string()),
        }
    }

    fn signed_request(
        &self,
        method: reqwest::Method,
        uri: &str,
        body: &str,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.endpoint, uri);
        let timestamp = ProviderAuth::get_timestamp();
        let nonce = ProviderAuth::generate_nonce();
        let signature = ProviderAuth::generate_signature(
            &self.api_key,
            &self.api_secret,
            method.as_str(),
            uri,
            timestamp,
            &nonce,
            body,
        );

        debug!("Provider API request: {} {}", method, url);

        self.client
            .request(method, &url)
            .header("Content-Type", "application/json")
            .header("X-Provider-Key", &self.api_key)
            .header("X-Provider-Timestamp", timestamp.to_string())
            .header("X-Provider-Nonce", nonce)
            .header("X-Provider-Signature", signature)
    }
}

impl Default for ProviderHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConferencingProvider for ProviderHttpClient {
    async fn create_meeting(
        &self,
        request: &ProviderMeetingRequest,
    ) -> Result<ProviderMeeting, ServiceError> {
        let body = serde_json::to_string(request)
            .map_err(|e| ServiceError::Transient(e.to_string()))?;

        info!("Creating provider meeting: {}", request.topic);

        let res = self
            .signed_request(reqwest::Method::POST, "/v1/meetings", &body)
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(res.json::<ProviderMeeting>().await?)
    }

    async fn update_meeting(
        &self,
        provider_meeting_id: &str,
        request: &ProviderMeetingRequest,
    ) -> Result<(), ServiceError> {
        let uri = format!("/v1/meetings/{}", provider_meeting_id);
        let body = serde_json::to_string(request)
            .map_err(|e| ServiceError::Transient(e.to_string()))?;

        self.signed_request(reqwest::Method::PATCH, &uri, &body)
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_meeting(&self, provider_meeting_id: &str) -> Result<(), ServiceError> {
        let uri = format!("/v1/meetings/{}", provider_meeting_id);

        self.signed_request(reqwest::Method::DELETE, &uri, "")
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn create_registrant(
        &self,
        provider_meeting_id: &str,
        request: &ProviderRegistrantRequest,
    ) -> Result<ProviderRegistrant, ServiceError> {
        let uri = format!("/v1/meetings/{}/registrants", provider_meeting_id);
        let body = serde_json::to_string(request)
            .map_err(|e| ServiceError::Transient(e.to_string()))?;

        let res = self
            .signed_request(reqwest::Method::POST, &uri, &body)
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(res.json::<ProviderRegistrant>().await?)
    }

    async fn update_registrant(
        &self,
        provider_meeting_id: &str,
        provider_registrant_id: &str,
        request: &ProviderRegistrantRequest,
    ) -> Result<(), ServiceError> {
        let uri = format!(
            "/v1/meetings/{}/registrants/{}",
            provider_meeting_id, provider_registrant_id
        );
        let body = serde_json::to_string(request)
            .map_err(|e| ServiceError::Transient(e.to_string()))?;

        self.signed_request(reqwest::Method::PATCH, &uri, &body)
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_registrant(
        &self,
        provider_meeting_id: &str,
        provider_registrant_id: &str,
    ) -> Result<(), ServiceError> {
        let uri = format!(
            "/v1/meetings/{}/registrants/{}",
            provider_meeting_id, provider_registrant_id
        );

        self.signed_request(reqwest::Method::DELETE, &uri, "")
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn get_join_link(&self, provider_meeting_id: &str) -> Result<String, ServiceError> {
        let uri = format!("/v1/meetings/{}/join_link", provider_meeting_id);

        let res = self
            .signed_request(reqwest::Method::GET, &uri, "")
            .send()
            .await?
            .error_for_status()?;

        Ok(res.json::<JoinLinkResponse>().await?.join_url)
    }
}
