//! Degraded-mode responder used when the remote agent is unreachable.
//!
//! A pure function of the user's text: an ordered list of keyword rules, first match wins,
//! matched as case-insensitive substrings. It keeps the app demonstrable offline and is
//! not a substitute for the agent's classification. The profile it finishes with is a
//! fixed demo profile regardless of what was said.

use super::{Completion, RoundTrip, Source};
use crate::profile::PersonalityProfile;
use crate::session::TurnMessage;

/// Which rule answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Greeting,
    FirstQuestion,
    SecondQuestion,
    ThirdQuestion,
    Finish,
    Clarify,
}

const RULES: &[(Rule, &[&str])] = &[
    (Rule::Greeting, &["hi", "hello", "start"]),
    (Rule::FirstQuestion, &["yes", "ready", "sure"]),
    (Rule::SecondQuestion, &["large", "group", "people"]),
    (Rule::ThirdQuestion, &["logic", "facts", "analysis"]),
    (Rule::Finish, &["adapt", "open", "flexible"]),
];

const GREETING: &str = "Hello! I'm PersonaAgent, an AI designed to analyze your personality type. I'll ask you a few questions to determine your personality profile. Are you ready to begin?";
const FIRST_QUESTION: &str = "Great! Let's start with the first question: Do you prefer spending time with large groups of people, or do you enjoy solitude and smaller gatherings? (This helps determine if you're more extroverted or introverted)";
const SECOND_QUESTION: &str = "I see you're more social and energized by groups. Next question: When making important decisions, do you rely more on logical analysis and facts, or do you consider people's feelings and personal values?";
const THIRD_QUESTION: &str = "You seem to prioritize logical thinking in your decisions. Final question: Do you prefer having a structured plan with clear deadlines, or do you prefer keeping your options open and adapting as you go?";
const FINISH: &str = "Thank you for your responses! I have enough information to determine your personality type now. Click 'Complete Analysis' to view your results.";
const CLARIFY: &str = "I'm still learning to understand different responses. Could you please elaborate or try phrasing your answer differently?";

/// First matching rule for `text`.
pub fn classify(text: &str) -> Rule {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(rule, _)| *rule)
        .unwrap_or(Rule::Clarify)
}

/// Answer `text` locally. The log holds just this exchange: the user's text and the reply.
/// `source` is `Live` here; the gateway tags it with the failure that caused the fallback.
pub fn respond(text: &str) -> RoundTrip {
    let rule = classify(text);
    let (reply, completion) = match rule {
        Rule::Greeting => (GREETING, Completion::Pending),
        Rule::FirstQuestion => (FIRST_QUESTION, Completion::Pending),
        Rule::SecondQuestion => (SECOND_QUESTION, Completion::Pending),
        Rule::ThirdQuestion => (THIRD_QUESTION, Completion::Pending),
        Rule::Finish => (FINISH, Completion::Complete(demo_profile())),
        Rule::Clarify => (CLARIFY, Completion::Pending),
    };
    RoundTrip {
        log: vec![TurnMessage::user(text), TurnMessage::agent(reply)],
        completion,
        source: Source::Live,
    }
}

/// Fixed profile the demo responder completes with.
pub fn demo_profile() -> PersonalityProfile {
    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }
    PersonalityProfile {
        type_code: "entp".to_string(),
        nickname: "The Debater".to_string(),
        characteristics: strings(&["Inventive", "Witty", "Argumentative", "Resourceful"]),
        strengths: strings(&["Quick-witted", "Innovative", "Charismatic", "Debate-savvy"]),
        growth_areas: strings(&[
            "Argumentative",
            "Insensitive",
            "Can be unfocused",
            "Dislikes routine",
        ]),
        famous_examples: strings(&["Thomas Edison", "Sacha Baron Cohen", "Tom Hanks"]),
        example_images: Default::default(),
    }
}
