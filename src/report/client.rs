//! Client for the remote assessment persistence collaborator.
//!
//! The collaborator keys records by the authenticated user identity, which
//! it reads from an `x-user-email` header on every request.

use serde::Deserialize;
use serde_json::json;

use crate::error::{ServiceError, ServiceKind};
use crate::report::record::AssessmentRecord;

const USER_HEADER: &str = "x-user-email";

/// A record envelope as returned by the persistence collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredAssessment {
    #[serde(alias = "_id")]
    pub id: String,
    /// The serialized [`AssessmentRecord`].
    pub data: String,
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    assessment: StoredAssessment,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    assessment: StoredAssessment,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    assessments: Vec<StoredAssessment>,
}

pub struct AssessmentClient {
    client: reqwest::Client,
    base_url: String,
    email: String,
}

impl AssessmentClient {
    pub fn new(base_url: &str, email: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
        }
    }

    fn err(&self, message: impl Into<String>) -> ServiceError {
        ServiceError::new(ServiceKind::Persistence, message)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(body);
        Err(self.err(format!("request rejected (status {status}): {detail}")))
    }

    /// Saves a record and returns its stored identifier.
    pub async fn save(&self, record: &AssessmentRecord) -> Result<String, ServiceError> {
        let data = record
            .to_json()
            .map_err(|e| self.err(format!("could not serialize the assessment: {e}")))?;

        let response = self
            .client
            .post(format!("{}/assessments/save", self.base_url))
            .header(USER_HEADER, &self.email)
            .json(&json!({ "assessmentData": data }))
            .send()
            .await
            .map_err(|e| self.err(format!("could not reach the persistence service: {e}")))?;
        let response = self.check(response).await?;

        let saved: SaveResponse = response
            .json()
            .await
            .map_err(|e| self.err(format!("unexpected save response: {e}")))?;
        tracing::info!("Assessment saved with id {}", saved.assessment.id);
        Ok(saved.assessment.id)
    }

    /// Fetches every stored assessment for the configured user.
    pub async fn list(&self) -> Result<Vec<StoredAssessment>, ServiceError> {
        let response = self
            .client
            .get(format!("{}/assessments/get/all", self.base_url))
            .header(USER_HEADER, &self.email)
            .send()
            .await
            .map_err(|e| self.err(format!("could not reach the persistence service: {e}")))?;
        let response = self.check(response).await?;

        let listed: ListResponse = response
            .json()
            .await
            .map_err(|e| self.err(format!("unexpected list response: {e}")))?;
        Ok(listed.assessments)
    }

    /// Fetches one stored assessment by identifier.
    pub async fn fetch(&self, id: &str) -> Result<StoredAssessment, ServiceError> {
        let response = self
            .client
            .get(format!("{}/assessments/get/{}", self.base_url, id))
            .header(USER_HEADER, &self.email)
            .send()
            .await
            .map_err(|e| self.err(format!("could not reach the persistence service: {e}")))?;
        let response = self.check(response).await?;

        let fetched: FetchResponse = response
            .json()
            .await
            .map_err(|e| self.err(format!("unexpected fetch response: {e}")))?;
        Ok(fetched.assessment)
    }

    /// Deletes one stored assessment by identifier.
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let response = self
            .client
            .delete(format!("{}/assessments/delete/{}", self.base_url, id))
            .header(USER_HEADER, &self.email)
            .send()
            .await
            .map_err(|e| self.err(format!("could not reach the persistence service: {e}")))?;
        self.check(response).await?;
        tracing::info!("Assessment {} deleted", id);
        Ok(())
    }
}
