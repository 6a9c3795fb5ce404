//! Wire types for the remote agent's `POST /call_agent` endpoint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::profile::PersonalityProfile;
use crate::session::{Speaker, TurnMessage};

/// Request body: `{ "prompt", "user_id" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAgentRequest {
    pub prompt: String,
    pub user_id: String,
}

/// Response body: `{ "messages", "is_complete", "personality_type_data"? }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAgentResponse {
    pub messages: Vec<WireMessage>,
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality_type_data: Option<PersonalityTypeData>,
}

/// One message in the agent's authoritative history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Speaker,
    pub content: String,
}

/// Profile payload as the agent sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalityTypeData {
    #[serde(rename = "type")]
    pub typ: String,
    pub nickname: String,
    pub characteristics: Vec<String>,
    pub famous_examples: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    /// Person name -> image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<BTreeMap<String, String>>,
}

impl From<WireMessage> for TurnMessage {
    fn from(m: WireMessage) -> Self {
        TurnMessage {
            speaker: m.role,
            text: m.content,
        }
    }
}

impl From<PersonalityTypeData> for PersonalityProfile {
    fn from(d: PersonalityTypeData) -> Self {
        PersonalityProfile {
            type_code: d.typ,
            nickname: d.nickname,
            characteristics: d.characteristics,
            strengths: d.strengths,
            growth_areas: d.weaknesses,
            famous_examples: d.famous_examples,
            example_images: d.images.unwrap_or_default(),
        }
    }
}
