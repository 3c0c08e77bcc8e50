use std::time::Duration;

use quikthread_core::JobStatus;
use quikthread_logging::qt_debug;
use url::Url;

use crate::{ApiError, ApiFailureKind};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base of the REST API, e.g. `http://localhost:8000/api`.
    pub base_url: String,
    pub auth_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            auth_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Read access to the backend's job records.
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    async fn get_job(&self, job_id: &str) -> Result<JobStatus, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestJobApi {
    base_url: Url,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl ReqwestJobApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(ApiFailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::new(
                ApiFailureKind::InvalidUrl,
                format!("{base_url} cannot be used as a base url"),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(ApiFailureKind::Network, err.to_string()))?;
        Ok(Self {
            base_url,
            auth_token: settings.auth_token,
            client,
        })
    }

    fn job_url(&self, job_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("jobs").push(job_id);
        }
        url
    }
}

#[async_trait::async_trait]
impl JobApi for ReqwestJobApi {
    async fn get_job(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let url = self.job_url(job_id);
        qt_debug!(job = job_id; "GET {}", url);

        let mut request = self.client.get(url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(ApiError::new(
                ApiFailureKind::HttpStatus(status.as_u16()),
                error_message(&body).unwrap_or_else(|| status.to_string()),
            ));
        }

        serde_json::from_slice(&body)
            .map_err(|err| ApiError::new(ApiFailureKind::Decode, err.to_string()))
    }
}

/// Pulls `message` or `detail` out of an error body, when it has one.
fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["message", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(ToOwned::to_owned)
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(ApiFailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(ApiFailureKind::Decode, err.to_string());
    }
    ApiError::new(ApiFailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> ReqwestJobApi {
        ReqwestJobApi::new(ApiSettings {
            base_url: base.to_string(),
            ..ApiSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn job_url_appends_escaped_segments() {
        assert_eq!(
            api("http://localhost:8000/api").job_url("abc").as_str(),
            "http://localhost:8000/api/jobs/abc"
        );
        assert_eq!(
            api("http://localhost:8000/api/").job_url("a b/c").as_str(),
            "http://localhost:8000/api/jobs/a%20b%2Fc"
        );
    }

    #[test]
    fn rejects_non_base_url() {
        let err = ReqwestJobApi::new(ApiSettings {
            base_url: "mailto:someone@example.com".to_string(),
            ..ApiSettings::default()
        })
        .unwrap_err();
        assert_eq!(err.kind, ApiFailureKind::InvalidUrl);
    }

    #[test]
    fn error_body_message_is_preferred() {
        assert_eq!(
            error_message(br#"{"detail":"Job not found"}"#).as_deref(),
            Some("Job not found")
        );
        assert_eq!(error_message(b"<html>"), None);
    }
}
