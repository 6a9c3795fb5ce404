//! HTTP transport for the agent: `POST {base_url}/call_agent` with a JSON body.

use async_trait::async_trait;
use std::time::Duration;

use super::protocol::{CallAgentRequest, CallAgentResponse};
use super::{AgentError, AgentTransport};

/// Client for the remote agent's HTTP API.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout_secs: Option<u64>) -> Result<Self, AgentError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    async fn call_agent(&self, request: &CallAgentRequest) -> Result<CallAgentResponse, AgentError> {
        let url = format!("{}/call_agent", self.base_url);
        let res = self.client.post(&url).json(request).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }
        // Read as text first so a bad body is reported as protocol, not transport.
        let body = res.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
