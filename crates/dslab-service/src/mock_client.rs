use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{ServiceError, TxService};

#[derive(Debug, Clone)]
enum MockResponse {
    Body(String),
    Delayed(Duration, String),
    Timeout,
}

/// An in-memory [`TxService`] that answers with canned bodies and records every request.
///
/// Responses queued for the same URL are used in order. The last one is reused once the
/// queue is down to a single entry.
#[derive(Debug)]
pub struct MockTxService {
    base_url: String,
    requests: Mutex<Vec<(String, Value)>>,
    responses: Mutex<HashMap<String, VecDeque<MockResponse>>>,
}

impl MockTxService {
    pub fn new() -> Self {
        Self::with_base_url("http://api.example.com")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(HashMap::new()),
        }
    }

    pub fn mock_response(&self, url: &str, response: &str) {
        self.push(url, MockResponse::Body(response.to_string()));
    }

    /// Answers after `delay`, for exercising timeouts in callers.
    pub fn mock_delayed_response(&self, url: &str, delay: Duration, response: &str) {
        self.push(url, MockResponse::Delayed(delay, response.to_string()));
    }

    pub fn mock_timeout(&self, url: &str) {
        self.push(url, MockResponse::Timeout);
    }

    /// Forgets every response queued for `url`.
    pub fn clear_responses(&self, url: &str) {
        self.responses.lock().remove(url);
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<Value> {
        self.requests
            .lock()
            .iter()
            .filter(|(request_url, _)| request_url == url)
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn push(&self, url: &str, response: MockResponse) {
        self.responses
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let mut responses = self.responses.lock();
        let queue = responses.get_mut(url)?;

        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    async fn respond<R>(&self, url: String, request: Value) -> Result<R, ServiceError>
    where
        R: DeserializeOwned,
    {
        self.requests.lock().push((url.clone(), request));

        let body = match self.next_response(&url) {
            Some(MockResponse::Body(body)) => body,
            Some(MockResponse::Delayed(delay, body)) => {
                tokio::time::sleep(delay).await;
                body
            }
            Some(MockResponse::Timeout) => {
                return Err(ServiceError::Timeout(Duration::from_secs(30)));
            }
            None => {
                return Err(ServiceError::Malformed(format!(
                    "no mock response configured for {url}"
                )));
            }
        };

        serde_json::from_str(&body).map_err(|error| ServiceError::Malformed(error.to_string()))
    }
}

impl Default for MockTxService {
    fn default() -> Self {
        Self::new()
    }
}

impl TxService for MockTxService {
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
        let query: Map<String, Value> = query
            .iter()
            .map(|(key, value)| ((*key).to_string(), Value::String((*value).to_string())))
            .collect();

        self.respond(format!("{}/{}", self.base_url(), endpoint), Value::Object(query))
            .await
    }

    async fn make_post_request<R, B>(&self, endpoint: &str, body: B) -> Result<R, ServiceError>
    where
        B: Serialize + Send,
        R: DeserializeOwned + Send,
    {
        let body = serde_json::to_value(&body)
            .map_err(|error| ServiceError::Malformed(error.to_string()))?;

        self.respond(format!("{}/{}", self.base_url(), endpoint), body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_responses_are_used_in_order() -> anyhow::Result<()> {
        let client = MockTxService::new();
        client.mock_response("http://api.example.com/ping", r#"{"n": 1}"#);
        client.mock_response("http://api.example.com/ping", r#"{"n": 2}"#);

        let first: Value = client.make_post_request("ping", json!({})).await?;
        let second: Value = client.make_post_request("ping", json!({})).await?;
        let third: Value = client.make_post_request("ping", json!({})).await?;

        assert_eq!(first["n"], 1);
        assert_eq!(second["n"], 2);
        assert_eq!(third["n"], 2);
        assert_eq!(client.requests_to("http://api.example.com/ping").len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_unconfigured_url() {
        let client = MockTxService::new();
        let result: Result<Value, _> = client.make_get_request("missing", &[]).await;
        assert!(matches!(result, Err(ServiceError::Malformed(..))));
    }
}
