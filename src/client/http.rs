//! HTTP transport for the session endpoints.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::api::{RefreshReply, SessionApi, TransportError, ValidateReply};
use super::config::{ClientConfig, ConfigError};

const VALIDATE_PATH: &str = "api/session/validate";
const REFRESH_PATH: &str = "api/session/refresh";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateBody {
    valid: bool,
    subject_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    token: String,
    expires_at: i64,
}

/// `SessionApi` over reqwest with a bounded per-request timeout.
#[derive(Clone)]
pub struct HttpSessionApi {
    http: reqwest::Client,
    validate_url: Url,
    refresh_url: Url,
}

impl HttpSessionApi {
    /// Build a client for the authority at `base_url`.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, ConfigError> {
        // Url::join replaces the last segment unless the base ends with '/'
        let mut base = base_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ConfigError::Http)?;

        Ok(Self {
            http,
            validate_url: base.join(VALIDATE_PATH).map_err(ConfigError::InvalidUrl)?,
            refresh_url: base.join(REFRESH_PATH).map_err(ConfigError::InvalidUrl)?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Self::new(&config.base_url()?, config.request_timeout())
    }

    pub fn validate_url(&self) -> &Url {
        &self.validate_url
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }
}

fn transport_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_decode() {
        TransportError::Malformed(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

impl SessionApi for HttpSessionApi {
    async fn validate(&self, token: &str) -> Result<ValidateReply, TransportError> {
        tracing::debug!("Session validate {}", self.validate_url);

        let resp = self
            .http
            .get(self.validate_url.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        match resp.status() {
            StatusCode::OK => {
                let body: ValidateBody = resp.json().await.map_err(transport_error)?;
                match (body.valid, body.subject_id) {
                    (true, Some(subject_id)) => Ok(ValidateReply::Valid { subject_id }),
                    (true, None) => Err(TransportError::Malformed(
                        "valid response without subjectId".to_string(),
                    )),
                    (false, _) => Ok(ValidateReply::Rejected),
                }
            }
            StatusCode::UNAUTHORIZED => Ok(ValidateReply::Rejected),
            status => Err(TransportError::Status(status.as_u16())),
        }
    }

    async fn refresh(&self, token: &str) -> Result<RefreshReply, TransportError> {
        tracing::debug!("Session refresh {}", self.refresh_url);

        let resp = self
            .http
            .post(self.refresh_url.clone())
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status.is_success() {
            let body: RefreshBody = resp.json().await.map_err(transport_error)?;
            if body.token.is_empty() {
                return Err(TransportError::Malformed("empty token".to_string()));
            }
            return Ok(RefreshReply::Issued {
                token: body.token,
                expires_at: body.expires_at,
            });
        }

        match status {
            // The authority's documented refusals
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(RefreshReply::Rejected {
                status: status.as_u16(),
            }),
            _ => Err(TransportError::Status(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let base = Url::parse("http://localhost:7300").unwrap();
        let api = HttpSessionApi::new(&base, Duration::from_secs(1)).unwrap();
        assert_eq!(
            api.validate_url().as_str(),
            "http://localhost:7300/api/session/validate"
        );
        assert_eq!(
            api.refresh_url().as_str(),
            "http://localhost:7300/api/session/refresh"
        );
    }

    #[test]
    fn test_endpoint_urls_with_prefix() {
        let base = Url::parse("https://example.com/functions/v1").unwrap();
        let api = HttpSessionApi::new(&base, Duration::from_secs(1)).unwrap();
        assert_eq!(
            api.validate_url().as_str(),
            "https://example.com/functions/v1/api/session/validate"
        );
    }
}
