//! Request/response calls against the record store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use roadhelp_core::config::ApiConfig;
use roadhelp_core::error::{AppError, ErrorKind};
use roadhelp_core::geo::Coordinate;
use roadhelp_core::model::{Acceptance, HelpRequest, HelperCandidate, HelperStatus, Identity};
use roadhelp_core::result::AppResult;
use roadhelp_core::types::id::{HelpRequestId, UserId};

/// Body of the create-help-request call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHelpRequest {
    /// Requester latitude.
    pub latitude: f64,
    /// Requester longitude.
    pub longitude: f64,
    /// Who is asking.
    pub requester_id: UserId,
    /// What went wrong.
    pub issue: String,
}

impl NewHelpRequest {
    /// Builds the body for a requester at `position`.
    pub fn new(requester_id: UserId, position: Coordinate, issue: impl Into<String>) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
            requester_id,
            issue: issue.into(),
        }
    }

    /// The requester position carried by this body.
    pub fn position(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Body of the accept-help-request call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptHelpBody {
    /// Helper taking the request.
    pub helper_id: UserId,
    /// Helper display name.
    pub helper_name: String,
    /// Helper position at acceptance.
    pub location: Coordinate,
}

/// `{ "helpRequest": { "id": ..., "createdAt": ... } }`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedHelpRequest {
    help_request: HelpRequestRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HelpRequestRecord {
    id: HelpRequestId,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// `{ "drivers": [ { "id", "name", "latitude", "longitude", "status" } ] }`
#[derive(Debug, Deserialize)]
struct DriverList {
    drivers: Vec<DriverRecord>,
}

#[derive(Debug, Deserialize)]
struct DriverRecord {
    id: UserId,
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    status: String,
}

impl DriverRecord {
    fn into_candidate(self) -> AppResult<HelperCandidate> {
        let position = Coordinate::new(self.latitude, self.longitude)?;
        Ok(HelperCandidate {
            identity: Identity::new(self.id, self.name),
            position,
            status: HelperStatus::from_str_or_offline(&self.status),
        })
    }
}

/// `{ "acceptance": { ... } }`
#[derive(Debug, Deserialize)]
struct AcceptedHelpRequest {
    acceptance: Acceptance,
}

/// The record store's request/response surface.
#[async_trait]
pub trait DispatchApi: Send + Sync + std::fmt::Debug + 'static {
    /// Creates the durable help-request record.
    async fn create_help_request(&self, request: &NewHelpRequest) -> AppResult<HelpRequest>;

    /// Lists every known driver with its last position.
    async fn list_drivers(&self) -> AppResult<Vec<HelperCandidate>>;

    /// Marks a help request as accepted by a helper.
    async fn accept_help_request(
        &self,
        request_id: &HelpRequestId,
        body: &AcceptHelpBody,
    ) -> AppResult<Acceptance>;
}

/// [`DispatchApi`] over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpDispatchApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDispatchApi {
    /// Builds a client with the configured timeout.
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Failed to build HTTP client", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::transport(format!(
                "Record store answered {status}: {body}"
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Serialization, "Malformed record store response", e))
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    AppError::with_source(ErrorKind::Transport, format!("Record store unreachable: {e}"), e)
}

#[async_trait]
impl DispatchApi for HttpDispatchApi {
    async fn create_help_request(&self, request: &NewHelpRequest) -> AppResult<HelpRequest> {
        let response = self
            .client
            .post(self.url("/request/help-request"))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let created: CreatedHelpRequest = Self::read_json(response).await?;
        debug!(request_id = %created.help_request.id, "Help request record created");

        Ok(HelpRequest {
            id: created.help_request.id,
            requester_id: request.requester_id.clone(),
            requester_position: request.position(),
            issue_description: request.issue.clone(),
            created_at: created.help_request.created_at.unwrap_or_else(Utc::now),
        })
    }

    async fn list_drivers(&self) -> AppResult<Vec<HelperCandidate>> {
        let response = self
            .client
            .get(self.url("/drivers"))
            .send()
            .await
            .map_err(transport_error)?;

        let list: DriverList = Self::read_json(response).await?;
        let candidates = list
            .drivers
            .into_iter()
            .filter_map(|record| {
                let id = record.id.clone();
                record
                    .into_candidate()
                    .inspect_err(|e| warn!(driver_id = %id, error = %e, "Skipping driver"))
                    .ok()
            })
            .collect();

        Ok(candidates)
    }

    async fn accept_help_request(
        &self,
        request_id: &HelpRequestId,
        body: &AcceptHelpBody,
    ) -> AppResult<Acceptance> {
        let response = self
            .client
            .post(self.url(&format!("/request/help-request/{request_id}/accept")))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let accepted: AcceptedHelpRequest = Self::read_json(response).await?;
        Ok(accepted.acceptance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_help_request_body_shape() {
        let body = NewHelpRequest::new(
            UserId::new("7"),
            Coordinate {
                latitude: 10.0,
                longitude: 10.0,
            },
            "engine smoke",
        );
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "latitude": 10.0,
                "longitude": 10.0,
                "requesterId": "7",
                "issue": "engine smoke"
            })
        );
    }

    #[test]
    fn test_created_response_reads_id_only() {
        let created: CreatedHelpRequest =
            serde_json::from_str(r#"{"helpRequest":{"id":42,"status":"open"}}"#).expect("parse");
        assert_eq!(created.help_request.id.as_str(), "42");
        assert!(created.help_request.created_at.is_none());
    }

    #[test]
    fn test_driver_record_maps_status_and_rejects_bad_position() {
        let list: DriverList = serde_json::from_str(
            r#"{"drivers":[
                {"id":1,"name":"Ravi","latitude":0.0,"longitude":0.05,"status":"available"},
                {"id":2,"name":"Lena","latitude":95.0,"longitude":0.0,"status":"busy"},
                {"id":3,"name":"Kofi","latitude":0.0,"longitude":0.1}
            ]}"#,
        )
        .expect("parse");

        let results: Vec<_> = list.drivers.into_iter().map(DriverRecord::into_candidate).collect();
        assert_eq!(
            results[0].as_ref().map(|c| c.status).ok(),
            Some(HelperStatus::Available)
        );
        assert!(results[1].is_err());
        assert_eq!(
            results[2].as_ref().map(|c| c.status).ok(),
            Some(HelperStatus::Offline)
        );
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let api = HttpDispatchApi::new(&ApiConfig {
            base_url: "http://records.local/api/".to_string(),
            request_timeout_seconds: 5,
        })
        .expect("client");
        assert_eq!(api.url("/drivers"), "http://records.local/api/drivers");
    }
}
