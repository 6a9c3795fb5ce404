//! Personality profile: the terminal artifact of a completed conversation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classification result returned by the agent on the turn that completes the test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityProfile {
    /// Four-letter type code as sent by the agent (e.g. "entp").
    pub type_code: String,
    pub nickname: String,
    pub characteristics: Vec<String>,
    pub strengths: Vec<String>,
    /// Weaknesses, shown to the user as growth areas.
    pub growth_areas: Vec<String>,
    pub famous_examples: Vec<String>,
    /// Example name -> image URL. Not every famous example has an entry.
    #[serde(default)]
    pub example_images: BTreeMap<String, String>,
}

impl PersonalityProfile {
    /// Image URL for a famous example, if the agent sent one.
    pub fn image_for(&self, example: &str) -> Option<&str> {
        self.example_images.get(example).map(String::as_str)
    }
}
