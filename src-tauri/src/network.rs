use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResourceResponse {
    pub(crate) url: String,
    pub(crate) status: u16,
    pub(crate) content_type: Option<String>,
    pub(crate) body: Vec<u8>,
}

impl ResourceResponse {
    pub(crate) fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure. HTTP error statuses are responses, not errors.
#[derive(Debug, Error)]
#[error("network request to {url} failed: {reason}")]
pub(crate) struct FetchError {
    pub(crate) url: String,
    pub(crate) reason: String,
}

impl FetchError {
    pub(crate) fn new(url: &Url, reason: impl ToString) -> Self {
        Self {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
pub(crate) trait Network: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<ResourceResponse, FetchError>;
}

pub(crate) struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    pub(crate) fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub(crate) fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, url: &Url) -> Result<ResourceResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|error| FetchError::new(url, error))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|error| FetchError::new(url, error))?;

        Ok(ResourceResponse {
            url: url.to_string(),
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}
