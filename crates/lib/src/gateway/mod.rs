//! Agent gateway: one request/response exchange with the remote personality agent,
//! with a deterministic local stand-in when the agent cannot be reached.

pub mod fallback;
mod http;
pub mod protocol;

pub use http::HttpTransport;

use async_trait::async_trait;

use crate::config::{self, Config};
use crate::profile::PersonalityProfile;
use crate::session::{SessionId, TurnMessage};
use protocol::{CallAgentRequest, CallAgentResponse};

/// Whether a round-trip ended the test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Pending,
    Complete(PersonalityProfile),
}

/// Where a round-trip's answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The remote agent answered.
    Live,
    /// Degraded mode: the local demo responder answered after the agent failed this way.
    Fallback(FailureKind),
}

/// Coarse classification of a failed exchange, for logs and the degraded-mode badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection, DNS, timeout or IO failure.
    Transport,
    /// The agent answered with a non-success HTTP status.
    Status,
    /// The body was not a valid `call_agent` response.
    Protocol,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Status => "status",
            FailureKind::Protocol => "protocol",
        }
    }
}

/// Outcome of one gateway invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTrip {
    /// Authoritative conversation log, oldest first.
    pub log: Vec<TurnMessage>,
    pub completion: Completion,
    pub source: Source,
}

impl RoundTrip {
    pub fn is_complete(&self) -> bool {
        matches!(self.completion, Completion::Complete(_))
    }

    pub fn profile(&self) -> Option<&PersonalityProfile> {
        match &self.completion {
            Completion::Complete(p) => Some(p),
            Completion::Pending => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.source, Source::Fallback(_))
    }

    /// Last agent line in the log, if any.
    pub fn last_reply(&self) -> Option<&str> {
        self.log
            .iter()
            .rev()
            .find(|m| !m.is_user())
            .map(|m| m.text.as_str())
    }

    /// Convert a wire response. The agent's log always wins; `is_complete` without profile
    /// data stays pending, since only the agent can classify.
    pub fn from_response(res: CallAgentResponse) -> Self {
        let completion = match (res.is_complete, res.personality_type_data) {
            (true, Some(data)) => Completion::Complete(data.into()),
            (true, None) => {
                log::warn!("agent reported completion without personality_type_data; staying pending");
                Completion::Pending
            }
            (false, _) => Completion::Pending,
        };
        Self {
            log: res.messages.into_iter().map(TurnMessage::from).collect(),
            completion,
            source: Source::Live,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("agent returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("agent response malformed: {0}")]
    Protocol(String),
}

impl AgentError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AgentError::Transport(_) => FailureKind::Transport,
            AgentError::Status { .. } => FailureKind::Status,
            AgentError::Protocol(_) => FailureKind::Protocol,
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::Protocol(e.to_string())
    }
}

/// A single `call_agent` exchange. Implemented over HTTP; replaced in tests.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn call_agent(&self, request: &CallAgentRequest) -> Result<CallAgentResponse, AgentError>;
}

/// Sends `(text, session)` to the agent and returns the round-trip.
///
/// With fallback enabled (the default) this never fails: any error is logged and
/// answered by [`fallback::respond`]. No retries are attempted.
pub struct AgentGateway<T = HttpTransport> {
    transport: T,
    fallback: bool,
}

impl AgentGateway<HttpTransport> {
    /// HTTP gateway from config (base URL resolved with env override, optional timeout).
    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        let base_url = config::resolve_agent_base_url(config);
        let transport = HttpTransport::new(&base_url, config.agent.timeout_secs)?;
        Ok(Self::new(transport, config.agent.fallback))
    }
}

impl<T: AgentTransport> AgentGateway<T> {
    pub fn new(transport: T, fallback: bool) -> Self {
        Self {
            transport,
            fallback,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn send(&self, text: &str, session_id: &SessionId) -> Result<RoundTrip, AgentError> {
        let request = CallAgentRequest {
            prompt: text.to_string(),
            user_id: session_id.to_string(),
        };
        log::debug!("call_agent session={} prompt_len={}", session_id, text.len());
        let result = self
            .transport
            .call_agent(&request)
            .await
            .map(RoundTrip::from_response);
        match result {
            Ok(round_trip) => {
                log::info!(
                    "agent replied session={} messages={} complete={}",
                    session_id,
                    round_trip.log.len(),
                    round_trip.is_complete()
                );
                Ok(round_trip)
            }
            Err(e) if self.fallback => {
                let kind = e.kind();
                log::warn!(
                    "agent unavailable ({} failure: {}); answering from local demo responder",
                    kind.as_str(),
                    e
                );
                let mut round_trip = fallback::respond(text);
                round_trip.source = Source::Fallback(kind);
                Ok(round_trip)
            }
            Err(e) => {
                log::error!("agent call failed ({}): {}", e.kind().as_str(), e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::protocol::{PersonalityTypeData, WireMessage};
    use super::*;
    use crate::session::Speaker;
    use std::sync::Mutex;

    struct Scripted {
        result: Mutex<Option<Result<CallAgentResponse, AgentError>>>,
        seen: Mutex<Vec<CallAgentRequest>>,
    }

    impl Scripted {
        fn new(result: Result<CallAgentResponse, AgentError>) -> Self {
            Self {
                result: Mutex::new(Some(result)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AgentTransport for Scripted {
        async fn call_agent(
            &self,
            request: &CallAgentRequest,
        ) -> Result<CallAgentResponse, AgentError> {
            self.seen.lock().unwrap().push(request.clone());
            self.result
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(AgentError::Protocol("script exhausted".to_string())))
        }
    }

    fn reply(content: &str) -> CallAgentResponse {
        CallAgentResponse {
            messages: vec![
                WireMessage {
                    role: Speaker::User,
                    content: "hello".to_string(),
                },
                WireMessage {
                    role: Speaker::Agent,
                    content: content.to_string(),
                },
            ],
            is_complete: false,
            personality_type_data: None,
        }
    }

    #[tokio::test]
    async fn live_reply_is_passed_through() {
        let gateway = AgentGateway::new(Scripted::new(Ok(reply("live answer"))), true);
        let sid = SessionId::from("s-1");
        let rt = gateway.send("hello", &sid).await.unwrap();
        assert_eq!(rt.source, Source::Live);
        assert_eq!(rt.last_reply(), Some("live answer"));
        let seen = gateway.transport().seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![CallAgentRequest {
                prompt: "hello".to_string(),
                user_id: "s-1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn status_failure_falls_back() {
        let err = AgentError::Status {
            status: 503,
            body: "busy".to_string(),
        };
        let gateway = AgentGateway::new(Scripted::new(Err(err)), true);
        let rt = gateway.send("hi", &SessionId::from("s")).await.unwrap();
        assert_eq!(rt.source, Source::Fallback(FailureKind::Status));
        assert!(!rt.is_complete());
        assert!(rt.last_reply().unwrap().contains("Are you ready to begin?"));
    }

    #[tokio::test]
    async fn fallback_disabled_returns_error() {
        let gateway = AgentGateway::new(
            Scripted::new(Err(AgentError::Protocol("bad".to_string()))),
            false,
        );
        let err = gateway.send("hi", &SessionId::from("s")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Protocol);
    }

    #[tokio::test]
    async fn completion_without_profile_keeps_live_log() {
        let mut res = reply("Thank you! Click 'Complete Analysis' to see your results.");
        res.messages.insert(
            0,
            WireMessage {
                role: Speaker::Agent,
                content: "Welcome".to_string(),
            },
        );
        res.is_complete = true;
        let gateway = AgentGateway::new(Scripted::new(Ok(res)), true);
        let rt = gateway
            .send("I keep my options open", &SessionId::from("s"))
            .await
            .unwrap();
        assert_eq!(rt.source, Source::Live);
        assert!(!rt.is_complete());
        assert!(rt.profile().is_none());
        assert_eq!(rt.log.len(), 3);
        assert_eq!(rt.log[0].text, "Welcome");
    }

    #[test]
    fn completion_carries_profile() {
        let mut res = reply("done");
        res.is_complete = true;
        res.personality_type_data = Some(PersonalityTypeData {
            typ: "istj".to_string(),
            nickname: "The Logistician".to_string(),
            characteristics: vec![],
            famous_examples: vec![],
            strengths: vec![],
            weaknesses: vec![],
            images: None,
        });
        let rt = RoundTrip::from_response(res);
        assert_eq!(rt.profile().map(|p| p.type_code.as_str()), Some("istj"));
    }
}
