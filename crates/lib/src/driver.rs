//! Conversation driver: the turn-by-turn state machine behind the chat screen.
//!
//! ```text
//! [pending, idle] --submit--> [pending, awaiting] --ok(pending)--> [pending, idle]
//! [pending, awaiting] --ok(complete)--> [complete, idle]
//! [pending, awaiting] --err--> [pending, idle]   (optimistic user turn stays)
//! [complete, idle] --confirm--> Handoff
//! ```
//!
//! The driver does no I/O itself. [`ConversationDriver::submit`] returns a [`Dispatch`] for
//! the caller to run through an [`AgentGateway`], and the outcome comes back through
//! [`ConversationDriver::resolve`]. This lets the desktop run the round-trip on a worker
//! thread while the CLI simply awaits [`ConversationDriver::run_turn`].

use crate::gateway::{AgentError, AgentGateway, AgentTransport, Completion, RoundTrip};
use crate::profile::PersonalityProfile;
use crate::session::{SessionId, TurnMessage};

/// Canned input the bootstrapper opens every session with.
pub const GREETING_PROMPT: &str = "hi";

const GREETING_FAILED: &str = "Failed to initialize the chat. Please refresh and try again.";
const TURN_FAILED: &str = "Failed to get a response. Please try again.";

/// Conversation status. The profile lives inside `Complete`, so one exists iff the test is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Pending,
    Complete(PersonalityProfile),
}

/// What started a round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    /// Synthetic opening turn sent by the bootstrapper; not echoed locally.
    Greeting,
    /// A message the user typed.
    User,
}

/// A round-trip the caller must send: `(text, session_id)` to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub kind: TurnKind,
    pub text: String,
    pub session_id: SessionId,
}

/// A round-trip that did not produce an answer.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    /// The worker running the round-trip went away without reporting back.
    #[error("round-trip interrupted before it reported a result")]
    Interrupted,
}

/// Profile handed from the chat screen to the results screen. Navigation state only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub profile: PersonalityProfile,
}

/// User-visible notification (a toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    fn error(description: &str) -> Self {
        Self {
            title: "Error".to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ConversationDriver {
    session_id: SessionId,
    log: Vec<TurnMessage>,
    status: Status,
    /// Some while a round-trip is outstanding; blocks further submits.
    in_flight: Option<TurnKind>,
    input: String,
    notice: Option<Notice>,
    /// True when the last answer came from the local demo responder.
    degraded: bool,
}

impl ConversationDriver {
    /// Idle driver with an empty log.
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            log: Vec::new(),
            status: Status::Pending,
            in_flight: None,
            input: String::new(),
            notice: None,
            degraded: false,
        }
    }

    /// Session bootstrapper: fresh session id, already awaiting the greeting round-trip.
    pub fn bootstrap() -> (Self, Dispatch) {
        let mut driver = Self::new(SessionId::generate());
        driver.in_flight = Some(TurnKind::Greeting);
        let dispatch = Dispatch {
            kind: TurnKind::Greeting,
            text: GREETING_PROMPT.to_string(),
            session_id: driver.session_id.clone(),
        };
        log::debug!("chat session {} started", driver.session_id);
        (driver, dispatch)
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn log(&self) -> &[TurnMessage] {
        &self.log
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.status, Status::Complete(_))
    }

    pub fn profile(&self) -> Option<&PersonalityProfile> {
        match &self.status {
            Status::Complete(p) => Some(p),
            Status::Pending => None,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Input accepts typing only while the conversation can still move forward.
    pub fn input_enabled(&self) -> bool {
        !self.is_awaiting() && !self.is_complete()
    }

    pub fn can_submit(&self) -> bool {
        self.input_enabled() && !self.input.trim().is_empty()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Submit the input buffer. `None` (and no state change) unless [`Self::can_submit`].
    pub fn submit(&mut self) -> Option<Dispatch> {
        if !self.can_submit() {
            return None;
        }
        let text = std::mem::take(&mut self.input);
        self.begin_user_turn(text.trim().to_string())
    }

    /// Submit explicit text, bypassing the input buffer. Same preconditions as [`Self::submit`].
    pub fn submit_text(&mut self, text: &str) -> Option<Dispatch> {
        let text = text.trim();
        if text.is_empty() || !self.input_enabled() {
            return None;
        }
        self.input.clear();
        self.begin_user_turn(text.to_string())
    }

    fn begin_user_turn(&mut self, text: String) -> Option<Dispatch> {
        self.notice = None;
        self.log.push(TurnMessage::user(text.clone()));
        self.in_flight = Some(TurnKind::User);
        Some(Dispatch {
            kind: TurnKind::User,
            text,
            session_id: self.session_id.clone(),
        })
    }

    /// Apply the outcome of the outstanding round-trip and release the guard.
    pub fn resolve(&mut self, outcome: Result<RoundTrip, TurnError>) {
        let Some(kind) = self.in_flight.take() else {
            log::warn!(
                "session {}: dropping round-trip result with nothing in flight",
                self.session_id
            );
            return;
        };
        match outcome {
            Ok(round_trip) => {
                self.degraded = round_trip.is_degraded();
                self.log = round_trip.log;
                if let Completion::Complete(profile) = round_trip.completion {
                    if self.is_complete() {
                        log::warn!("session {}: ignoring second completion", self.session_id);
                    } else {
                        log::info!(
                            "session {} complete: {}",
                            self.session_id,
                            profile.type_code
                        );
                        self.status = Status::Complete(profile);
                    }
                }
            }
            Err(e) => {
                log::warn!("session {}: round-trip failed: {}", self.session_id, e);
                self.notice = Some(Notice::error(match kind {
                    TurnKind::Greeting => GREETING_FAILED,
                    TurnKind::User => TURN_FAILED,
                }));
            }
        }
    }

    /// Send `dispatch` through `gateway` and resolve the outcome.
    pub async fn run_turn<T: AgentTransport>(
        &mut self,
        gateway: &AgentGateway<T>,
        dispatch: Dispatch,
    ) {
        let outcome = gateway
            .send(&dispatch.text, &dispatch.session_id)
            .await
            .map_err(TurnError::from);
        self.resolve(outcome);
    }

    /// "Complete analysis": ends the driver and hands the profile on. Returns the driver
    /// unchanged when the test is not complete.
    pub fn confirm(self) -> Result<Handoff, Self> {
        match self.status {
            Status::Complete(profile) => Ok(Handoff { profile }),
            Status::Pending => Err(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fallback;
    use crate::gateway::protocol::{CallAgentRequest, CallAgentResponse, WireMessage};
    use crate::gateway::Source;
    use crate::session::Speaker;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Transport that replays scripted results and counts calls.
    #[derive(Default)]
    struct Scripted {
        results: Mutex<VecDeque<Result<CallAgentResponse, AgentError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn push(self, r: Result<CallAgentResponse, AgentError>) -> Self {
            self.results.lock().unwrap().push_back(r);
            self
        }
    }

    #[async_trait]
    impl AgentTransport for Scripted {
        async fn call_agent(&self, _: &CallAgentRequest) -> Result<CallAgentResponse, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AgentError::Protocol("no script".to_string())))
        }
    }

    fn wire(pairs: &[(Speaker, &str)]) -> CallAgentResponse {
        CallAgentResponse {
            messages: pairs
                .iter()
                .map(|(role, content)| WireMessage {
                    role: *role,
                    content: content.to_string(),
                })
                .collect(),
            is_complete: false,
            personality_type_data: None,
        }
    }

    fn live(log: Vec<TurnMessage>) -> RoundTrip {
        RoundTrip {
            log,
            completion: Completion::Pending,
            source: Source::Live,
        }
    }

    fn idle_driver() -> ConversationDriver {
        ConversationDriver::new(SessionId::from("sess-test"))
    }

    #[test]
    fn bootstrap_awaits_greeting_without_echo() {
        let (driver, dispatch) = ConversationDriver::bootstrap();
        assert!(driver.is_awaiting());
        assert!(driver.log().is_empty());
        assert_eq!(dispatch.kind, TurnKind::Greeting);
        assert_eq!(dispatch.text, GREETING_PROMPT);
        assert_eq!(&dispatch.session_id, driver.session_id());
    }

    #[test]
    fn bootstrap_sessions_are_unique() {
        let (a, _) = ConversationDriver::bootstrap();
        let (b, _) = ConversationDriver::bootstrap();
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn submit_clears_input_and_appends_optimistically() {
        let mut d = idle_driver();
        d.input_mut().push_str("  I love large groups  ");
        let dispatch = d.submit().expect("dispatch");
        assert_eq!(dispatch.text, "I love large groups");
        assert_eq!(dispatch.kind, TurnKind::User);
        assert!(d.input().is_empty());
        assert!(d.is_awaiting());
        assert_eq!(d.log(), &[TurnMessage::user("I love large groups")]);
    }

    #[test]
    fn blank_input_is_rejected() {
        let mut d = idle_driver();
        d.input_mut().push_str("   \t ");
        assert!(!d.can_submit());
        assert!(d.submit().is_none());
        assert!(d.submit_text("").is_none());
        assert!(!d.is_awaiting());
        assert!(d.log().is_empty());
        assert_eq!(d.input(), "   \t ");
    }

    #[test]
    fn second_submit_while_awaiting_is_a_no_op() {
        let mut d = idle_driver();
        assert!(d.submit_text("first").is_some());
        d.input_mut().push_str("second");
        assert!(d.submit().is_none());
        assert!(d.submit_text("third").is_none());
        assert_eq!(d.log().len(), 1);
        assert_eq!(d.input(), "second");
    }

    #[test]
    fn success_replaces_log_wholesale() {
        let mut d = idle_driver();
        d.submit_text("yes").unwrap();
        let server_log = vec![
            TurnMessage::agent("Welcome"),
            TurnMessage::user("YES (normalized)"),
            TurnMessage::agent("First question"),
        ];
        d.resolve(Ok(live(server_log.clone())));
        assert_eq!(d.log(), server_log.as_slice());
        assert!(!d.is_awaiting());
        assert!(!d.is_complete());
        assert!(d.notice().is_none());
    }

    #[test]
    fn failure_keeps_optimistic_turn_and_notifies() {
        let mut d = idle_driver();
        d.submit_text("hello?").unwrap();
        d.resolve(Err(TurnError::Interrupted));
        assert_eq!(d.log(), &[TurnMessage::user("hello?")]);
        assert!(!d.is_awaiting());
        let notice = d.take_notice().expect("notice");
        assert_eq!(notice.description, TURN_FAILED);
        assert!(d.submit_text("retry").is_some());
    }

    #[test]
    fn greeting_failure_uses_init_notice() {
        let (mut d, _) = ConversationDriver::bootstrap();
        d.resolve(Err(TurnError::Interrupted));
        assert_eq!(d.notice().map(|n| n.description.as_str()), Some(GREETING_FAILED));
        assert!(d.log().is_empty());
        d.input_mut().push_str("hi");
        assert!(d.can_submit());
    }

    #[test]
    fn completion_is_terminal_and_idempotent() {
        let mut d = idle_driver();
        d.submit_text("adapt").unwrap();
        d.resolve(Ok(fallback::respond("adapt")));
        assert!(matches!(d.status(), Status::Complete(_)));
        let before = d.profile().cloned();
        assert!(before.is_some());

        d.input_mut().push_str("more");
        assert!(!d.input_enabled());
        assert!(d.submit().is_none());
        assert!(d.submit_text("more").is_none());
        assert_eq!(d.profile().cloned(), before);
    }

    #[test]
    fn stale_resolve_is_ignored() {
        let mut d = idle_driver();
        d.resolve(Ok(live(vec![TurnMessage::agent("unexpected")])));
        assert!(d.log().is_empty());
    }

    #[test]
    fn confirm_before_completion_returns_driver() {
        let mut d = idle_driver();
        d.submit_text("hi").unwrap();
        d.resolve(Ok(fallback::respond("hi")));
        let d = d.confirm().expect_err("not complete");
        assert_eq!(d.log().len(), 2);
    }

    #[test]
    fn confirm_hands_off_profile() {
        let mut d = idle_driver();
        d.submit_text("open").unwrap();
        d.resolve(Ok(fallback::respond("open")));
        let handoff = d.confirm().expect("handoff");
        assert_eq!(handoff.profile, fallback::demo_profile());
    }

    #[tokio::test]
    async fn run_turn_dispatches_once_and_reconciles() {
        let transport = Scripted::default().push(Ok(wire(&[
            (Speaker::User, "hi"),
            (Speaker::Agent, "Ready?"),
        ])));
        let gateway = AgentGateway::new(transport, true);
        let (mut d, dispatch) = ConversationDriver::bootstrap();
        d.run_turn(&gateway, dispatch).await;
        assert_eq!(gateway.transport().calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            d.log(),
            &[TurnMessage::user("hi"), TurnMessage::agent("Ready?")]
        );
        assert!(!d.is_degraded());
    }

    #[tokio::test]
    async fn fallback_answer_marks_driver_degraded() {
        let transport = Scripted::default().push(Err(AgentError::Status {
            status: 502,
            body: String::new(),
        }));
        let gateway = AgentGateway::new(transport, true);
        let mut d = idle_driver();
        let dispatch = d.submit_text("hi").unwrap();
        d.run_turn(&gateway, dispatch).await;
        assert!(d.is_degraded());
        assert!(d.notice().is_none());
        assert_eq!(d.log().len(), 2);
    }

    #[tokio::test]
    async fn fallback_disabled_surfaces_failure() {
        let transport = Scripted::default().push(Err(AgentError::Protocol("bad".into())));
        let gateway = AgentGateway::new(transport, false);
        let mut d = idle_driver();
        let dispatch = d.submit_text("anything").unwrap();
        d.run_turn(&gateway, dispatch).await;
        assert_eq!(d.log(), &[TurnMessage::user("anything")]);
        assert!(d.notice().is_some());
        assert!(!d.is_awaiting());
    }

    #[tokio::test]
    async fn live_completion_without_profile_keeps_server_log() {
        let mut res = wire(&[
            (Speaker::Agent, "Welcome"),
            (Speaker::User, "yes"),
            (Speaker::Agent, "How do you recharge?"),
            (Speaker::User, "I keep my options open"),
            (Speaker::Agent, "Thank you for your responses!"),
        ]);
        res.is_complete = true;
        let gateway = AgentGateway::new(Scripted::default().push(Ok(res)), true);
        let mut d = idle_driver();
        let dispatch = d.submit_text("I keep my options open").unwrap();
        d.run_turn(&gateway, dispatch).await;

        assert_eq!(d.log().len(), 5);
        assert_eq!(d.log()[4].text, "Thank you for your responses!");
        assert!(!d.is_degraded());
        assert_eq!(d.status(), &Status::Pending);
        assert!(d.profile().is_none());
        assert!(d.confirm().is_err());
    }

    #[tokio::test]
    async fn full_demo_conversation_offline() {
        let gateway = AgentGateway::new(Scripted::default(), true);
        let (mut d, dispatch) = ConversationDriver::bootstrap();
        d.run_turn(&gateway, dispatch).await;
        assert!(d.log()[1].text.contains("Are you ready"));

        for text in ["yes", "large groups", "logic and facts"] {
            let dispatch = d.submit_text(text).unwrap();
            d.run_turn(&gateway, dispatch).await;
            assert!(!d.is_complete());
        }
        let dispatch = d.submit_text("I like to stay flexible and adapt").unwrap();
        d.run_turn(&gateway, dispatch).await;

        assert_eq!(gateway.transport().calls.load(Ordering::SeqCst), 5);
        assert!(d.is_degraded());
        let profile = d.profile().unwrap();
        assert_eq!(profile.type_code, "entp");
        assert_eq!(profile.nickname, "The Debater");
        assert_eq!(profile.characteristics.len(), 4);
        assert_eq!(profile.famous_examples.len(), 3);
    }
}
