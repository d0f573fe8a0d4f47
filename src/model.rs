use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_SHOT_SIZE: &str = "MS";
pub const DEFAULT_REASON: &str = "Suggested to improve coverage of the scene";

/// Every field of a shot except its identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShotDraft {
    pub scene: String,
    pub shot: String,
    pub shot_size: String,
    pub description: String,
    pub people: String,
    pub action: String,
    pub dialogue: String,
    pub location: String,
    pub camera_angle: String,
    pub camera_movement: String,
    pub notes: String,
}

impl ShotDraft {
    pub fn new(scene: impl Into<String>, shot: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            scene: scene.into(),
            shot: shot.into(),
            description: description.into(),
            shot_size: DEFAULT_SHOT_SIZE.to_string(),
            ..Self::default()
        }
    }

    /// Fill the optional fields that came back blank.
    pub fn apply_defaults(&mut self) {
        if self.shot_size.trim().is_empty() {
            self.shot_size = DEFAULT_SHOT_SIZE.to_string();
        }
        if self.action.trim().is_empty() {
            self.action = self.description.clone();
        }
    }

    pub fn has_required_fields(&self) -> bool {
        !self.scene.trim().is_empty()
            && !self.shot.trim().is_empty()
            && !self.description.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shot {
    pub id: String,
    #[serde(flatten)]
    pub draft: ShotDraft,
}

impl Shot {
    pub fn label(&self) -> String {
        format!("Scene {}, Shot {}", self.draft.scene, self.draft.shot)
    }
}

/// A shot proposed by generation, waiting for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedShot {
    #[serde(flatten)]
    pub draft: ShotDraft,
    pub reason: String,
}

impl SuggestedShot {
    pub fn new(draft: ShotDraft, reason: Option<String>) -> Self {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REASON.to_string());
        Self { draft, reason }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectCategory {
    People,
    Places,
    Props,
}

impl SubjectCategory {
    pub const ALL: [SubjectCategory; 3] = [Self::People, Self::Places, Self::Props];

    /// Accepts the canonical names plus the synonyms models tend to use.
    pub fn parse_lenient(input: &str) -> Option<Self> {
        let key = input
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        match key.as_str() {
            "people" | "person" | "persons" | "character" | "characters" | "cast" => {
                Some(Self::People)
            }
            "places" | "place" | "location" | "locations" | "setting" | "settings" => {
                Some(Self::Places)
            }
            "props" | "prop" | "object" | "objects" | "item" | "items" => Some(Self::Props),
            _ => None,
        }
    }
}

impl fmt::Display for SubjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::People => "People",
            Self::Places => "Places",
            Self::Props => "Props",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDraft {
    pub name: String,
    pub category: SubjectCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

fn default_active() -> bool {
    true
}

impl SubjectDraft {
    pub fn new(name: impl Into<String>, category: SubjectCategory) -> Self {
        Self {
            name: name.into(),
            category,
            description: String::new(),
            alias: String::new(),
            active: true,
            trigger: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Lower-cased name, the identity key for dedup. Whitespace is significant.
    pub fn name_key(&self) -> String {
        self.name.to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    #[serde(flatten)]
    pub draft: SubjectDraft,
}

/// Hands out ids that are never repeated for the lifetime of the generator.
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), n)
    }

    /// Like [`IdGenerator::next_id`], skipping anything already in `taken`.
    pub fn next_unused(&self, prefix: &str, taken: &HashSet<String>) -> String {
        loop {
            let id = self.next_id(prefix);
            if !taken.contains(&id) {
                return id;
            }
        }
    }
}
