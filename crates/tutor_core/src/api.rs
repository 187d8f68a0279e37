//! Client for the agency's course API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::class_requests::{ClassRequest, TutorClass};
use crate::credentials::{Authorized, Credential};
use crate::error::ApiError;
use crate::id::{AnnouncementId, OptionId, TutorId};

/// A finalized response on its way to the system of record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
    #[serde(skip)]
    pub announcement_id: AnnouncementId,
    pub tutor_id: TutorId,
    pub selected_option_ids: Vec<OptionId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardStatus {
    Accepted,
    /// Someone else got the slot first
    Taken,
    CredentialExpired,
    ServerError,
}

impl ForwardStatus {
    pub fn from_status(status: u16) -> Self {
        match status {
            200 | 201 => Self::Accepted,
            409 | 410 => Self::Taken,
            401 => Self::CredentialExpired,
            _ => Self::ServerError,
        }
    }
}

/// A message the agency wants delivered to one tutor
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrivateMessage {
    #[serde(rename = "discordID")]
    pub discord_id: TutorId,
    pub message: String,
}

#[derive(Deserialize)]
struct ResultList<T> {
    result: Vec<T>,
}

#[async_trait]
pub trait CourseApi: Send + Sync + fmt::Debug {
    async fn forward_response(
        &self,
        forward: &ForwardRequest,
        credential: &Credential,
    ) -> Result<ForwardStatus, ApiError>;

    /// Raw entries of `/new_course_requests`, left undecoded so one bad
    /// entry can't fail the whole list
    async fn fetch_course_requests(
        &self,
        credential: &Credential,
    ) -> Result<Authorized<Vec<serde_json::Value>>, ApiError>;

    async fn fetch_private_messages(
        &self,
        credential: &Credential,
    ) -> Result<Authorized<Vec<PrivateMessage>>, ApiError>;

    async fn fetch_tutor_classes(
        &self,
        tutor_id: &TutorId,
        credential: &Credential,
    ) -> Result<Authorized<Vec<TutorClass>>, ApiError>;

    /// Post a class request, returning the raw status for anything but 401
    async fn submit_class_request(
        &self,
        request: &ClassRequest,
        credential: &Credential,
    ) -> Result<Authorized<u16>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpCourseApi {
    client: reqwest::Client,
    prefix: String,
}

impl HttpCourseApi {
    pub fn new(client: reqwest::Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client with the request timeout every call shares
    pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|cause| ApiError::RequestFailed {
                endpoint: "client".to_string(),
                cause,
            })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }

    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
        credential: &Credential,
    ) -> Result<reqwest::Response, ApiError> {
        request
            .header(reqwest::header::AUTHORIZATION, credential.header_value())
            .send()
            .await
            .map_err(|cause| ApiError::RequestFailed {
                endpoint: endpoint.to_string(),
                cause,
            })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        credential: &Credential,
    ) -> Result<Authorized<T>, ApiError> {
        let response = self
            .send(endpoint, self.client.get(self.url(endpoint)), credential)
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Ok(Authorized::Expired),
            StatusCode::OK => {
                let value = response
                    .json()
                    .await
                    .map_err(|cause| ApiError::DecodeFailed {
                        endpoint: endpoint.to_string(),
                        cause,
                    })?;
                Ok(Authorized::Done(value))
            }
            status => Err(ApiError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl CourseApi for HttpCourseApi {
    async fn forward_response(
        &self,
        forward: &ForwardRequest,
        credential: &Credential,
    ) -> Result<ForwardStatus, ApiError> {
        let endpoint = format!("/tutor_demand/{}", forward.announcement_id);
        let response = self
            .send(
                &endpoint,
                self.client.post(self.url(&endpoint)).json(forward),
                credential,
            )
            .await?;

        let status = response.status().as_u16();
        debug!("{} answered {}", endpoint, status);
        Ok(ForwardStatus::from_status(status))
    }

    async fn fetch_course_requests(
        &self,
        credential: &Credential,
    ) -> Result<Authorized<Vec<serde_json::Value>>, ApiError> {
        let list: Authorized<ResultList<serde_json::Value>> =
            self.get_json("/new_course_requests", credential).await?;
        Ok(match list {
            Authorized::Done(list) => Authorized::Done(list.result),
            Authorized::Expired => Authorized::Expired,
        })
    }

    async fn fetch_private_messages(
        &self,
        credential: &Credential,
    ) -> Result<Authorized<Vec<PrivateMessage>>, ApiError> {
        let list: Authorized<ResultList<PrivateMessage>> =
            self.get_json("/private_messages", credential).await?;
        Ok(match list {
            Authorized::Done(list) => Authorized::Done(list.result),
            Authorized::Expired => Authorized::Expired,
        })
    }

    async fn fetch_tutor_classes(
        &self,
        tutor_id: &TutorId,
        credential: &Credential,
    ) -> Result<Authorized<Vec<TutorClass>>, ApiError> {
        self.get_json(&format!("/tutor_classes/{}", tutor_id), credential)
            .await
    }

    async fn submit_class_request(
        &self,
        request: &ClassRequest,
        credential: &Credential,
    ) -> Result<Authorized<u16>, ApiError> {
        let endpoint = request.endpoint();
        let response = self
            .send(
                endpoint,
                self.client.post(self.url(endpoint)).json(&request.body()),
                credential,
            )
            .await?;

        Ok(match response.status().as_u16() {
            401 => Authorized::Expired,
            status => Authorized::Done(status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_forward_status_mapping() {
        assert_eq!(ForwardStatus::from_status(200), ForwardStatus::Accepted);
        assert_eq!(ForwardStatus::from_status(201), ForwardStatus::Accepted);
        assert_eq!(ForwardStatus::from_status(409), ForwardStatus::Taken);
        assert_eq!(ForwardStatus::from_status(410), ForwardStatus::Taken);
        assert_eq!(
            ForwardStatus::from_status(401),
            ForwardStatus::CredentialExpired
        );
        assert_eq!(ForwardStatus::from_status(500), ForwardStatus::ServerError);
        assert_eq!(ForwardStatus::from_status(404), ForwardStatus::ServerError);
    }

    #[test]
    fn test_forward_body_leaves_announcement_in_path() {
        let forward = ForwardRequest {
            announcement_id: AnnouncementId::new("A7"),
            tutor_id: TutorId::new("U1"),
            selected_option_ids: vec![OptionId::new("optB")],
        };
        assert_eq!(
            serde_json::to_value(&forward).unwrap(),
            serde_json::json!({"tutorId": "U1", "selectedOptionIds": ["optB"]})
        );
    }

    #[test]
    fn test_private_messages_decode() {
        let list: ResultList<PrivateMessage> = serde_json::from_value(serde_json::json!({
            "result": [{"discordID": "123", "message": "Your class moved"}]
        }))
        .unwrap();
        assert_eq!(list.result[0].discord_id.as_str(), "123");
    }

    #[test]
    fn test_prefix_trailing_slash_is_dropped() {
        let api = HttpCourseApi::new(reqwest::Client::new(), "https://api.example.org/v1/");
        assert_eq!(
            api.url("/login"),
            "https://api.example.org/v1/login"
        );
    }
}
