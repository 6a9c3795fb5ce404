//! Results view model: what the results screen shows for a profile.
//!
//! Both front ends render from this, so headings and ordering stay the same everywhere.

use crate::profile::PersonalityProfile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: &'static str,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamousExample {
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsView {
    /// "Your Personality Type: ENTP"
    pub title: String,
    /// Nickname in quotes.
    pub subtitle: String,
    pub characteristics: Section,
    pub strengths: Section,
    pub growth_areas: Section,
    pub famous_heading: &'static str,
    pub famous_examples: Vec<FamousExample>,
}

impl ResultsView {
    pub fn from_profile(profile: &PersonalityProfile) -> Self {
        Self {
            title: format!("Your Personality Type: {}", profile.type_code.to_uppercase()),
            subtitle: format!("\"{}\"", profile.nickname),
            characteristics: Section {
                heading: "Key Characteristics",
                items: profile.characteristics.clone(),
            },
            strengths: Section {
                heading: "Your Strengths",
                items: profile.strengths.clone(),
            },
            growth_areas: Section {
                heading: "Growth Opportunities",
                items: profile.growth_areas.clone(),
            },
            famous_heading: "Famous People With Your Personality Type",
            famous_examples: profile
                .famous_examples
                .iter()
                .map(|name| FamousExample {
                    name: name.clone(),
                    image_url: profile.image_for(name).map(String::from),
                })
                .collect(),
        }
    }

    /// Plain-text rendering for terminals.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        out.push_str(&self.subtitle);
        out.push_str("\n\n");
        out.push_str(self.characteristics.heading);
        out.push('\n');
        out.push_str(&format!("  {}\n\n", self.characteristics.items.join(" · ")));
        for section in [&self.strengths, &self.growth_areas] {
            out.push_str(section.heading);
            out.push('\n');
            for item in &section.items {
                out.push_str(&format!("  • {}\n", item));
            }
            out.push('\n');
        }
        out.push_str(self.famous_heading);
        out.push('\n');
        for example in &self.famous_examples {
            match &example.image_url {
                Some(url) => out.push_str(&format!("  • {} ({})\n", example.name, url)),
                None => out.push_str(&format!("  • {}\n", example.name)),
            }
        }
        out
    }
}
