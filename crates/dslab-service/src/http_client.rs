use std::time::Duration;

use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, Instrument};

use crate::{ServiceError, TxService};

/// Talks to the transaction service over HTTP with a bounded wait on every request.
#[derive(Debug, Clone)]
pub struct HttpTxService {
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl HttpTxService {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: impl Into<String>) -> Result<Self, ServiceError> {
        Self::with_timeout(base_url, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            timeout,
            client,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_error(&self, error: reqwest::Error) -> ServiceError {
        if error.is_timeout() {
            ServiceError::Timeout(self.timeout)
        } else {
            ServiceError::Http(error)
        }
    }

    async fn decode<R>(&self, response: Response) -> Result<R, ServiceError>
    where
        R: DeserializeOwned,
    {
        let status = response.status();
        let body = response.text().await.map_err(|error| self.map_error(error))?;

        // Failing endpoints still answer with `{ error }`, sometimes under a 4xx or 5xx.
        serde_json::from_str(&body).map_err(|error| {
            if status.is_success() {
                ServiceError::Malformed(error.to_string())
            } else {
                ServiceError::Status {
                    status: status.as_u16(),
                    body,
                }
            }
        })
    }
}

impl TxService for HttpTxService {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn make_get_request<R>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<R, ServiceError>
    where
        R: DeserializeOwned + Send,
    {
        let url = format!("{}/{}", self.base_url(), endpoint);
        let span = tracing::debug_span!("get", %url);

        async {
            let response = self
                .client
                .get(&url)
                .query(query)
                .send()
                .await
                .map_err(|error| self.map_error(error))?;
            debug!(status = %response.status(), "response");
            self.decode(response).await
        }
        .instrument(span)
        .await
    }

    async fn make_post_request<R, B>(&self, endpoint: &str, body: B) -> Result<R, ServiceError>
    where
        B: Serialize + Send,
        R: DeserializeOwned + Send,
    {
        let url = format!("{}/{}", self.base_url(), endpoint);
        let span = tracing::debug_span!("post", %url);

        async {
            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|error| self.map_error(error))?;
            debug!(status = %response.status(), "response");
            self.decode(response).await
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() -> anyhow::Result<()> {
        let client = HttpTxService::new("https://lab.example.com/")?;
        assert_eq!(client.base_url(), "https://lab.example.com");
        assert_eq!(client.timeout(), HttpTxService::DEFAULT_TIMEOUT);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreachable_service_is_service_error() -> anyhow::Result<()> {
        let client = HttpTxService::with_timeout("http://127.0.0.1:9", Duration::from_secs(2))?;
        let error = client
            .generate_identity(dslab_types::Network::Testnet)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), dslab_types::ErrorKind::Service);
        Ok(())
    }
}
