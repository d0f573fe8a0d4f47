use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::labels::excerpt;
use super::{SkipReason, Strategy};
use crate::model::{ShotDraft, SuggestedShot};

/// Innermost `{ ... }` spans, i.e. braces with no brace inside.
pub(crate) fn flat_objects(text: &str) -> Vec<&str> {
    if !text.contains('{') || !text.contains('}') {
        return Vec::new();
    }
    let Some(re) = flat_object_regex() else {
        return Vec::new();
    };
    re.find_iter(text).map(|m| m.as_str()).collect()
}

fn flat_object_regex() -> Option<&'static Regex> {
    static OBJECT_RE: OnceCell<Regex> = OnceCell::new();
    OBJECT_RE.get_or_try_init(|| Regex::new(r"\{[^{}]*\}")).ok()
}

/// Accept a JSON scalar or list where a string is expected.
pub(crate) fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| value_to_text(&v)))
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_to_text).collect();
            Some(parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// A shot-like JSON object with every field optional and leniently typed.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ShotObject {
    #[serde(alias = "sceneNumber", alias = "scene_number", deserialize_with = "loose_string")]
    scene: Option<String>,
    #[serde(alias = "shotNumber", alias = "shot_number", deserialize_with = "loose_string")]
    shot: Option<String>,
    #[serde(alias = "shotDescription", alias = "shot_description", deserialize_with = "loose_string")]
    description: Option<String>,
    #[serde(alias = "shotSize", alias = "size", deserialize_with = "loose_string")]
    shot_size: Option<String>,
    #[serde(alias = "characters", deserialize_with = "loose_string")]
    people: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    action: Option<String>,
    #[serde(alias = "dialog", deserialize_with = "loose_string")]
    dialogue: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    location: Option<String>,
    #[serde(alias = "cameraAngle", deserialize_with = "loose_string")]
    camera_angle: Option<String>,
    #[serde(alias = "cameraMovement", deserialize_with = "loose_string")]
    camera_movement: Option<String>,
    #[serde(alias = "directorsNotes", alias = "directorNotes", deserialize_with = "loose_string")]
    notes: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    reason: Option<String>,
}

impl ShotObject {
    pub(crate) fn missing_required(&self) -> Option<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        if blank(&self.scene) {
            Some("scene")
        } else if blank(&self.shot) {
            Some("shot")
        } else if blank(&self.description) {
            Some("description")
        } else {
            None
        }
    }

    pub(crate) fn into_suggestion(self) -> SuggestedShot {
        let mut draft = ShotDraft {
            scene: self.scene.unwrap_or_default(),
            shot: self.shot.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            shot_size: self.shot_size.unwrap_or_default(),
            people: self.people.unwrap_or_default(),
            action: self.action.unwrap_or_default(),
            dialogue: self.dialogue.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            camera_angle: self.camera_angle.unwrap_or_default(),
            camera_movement: self.camera_movement.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
        };
        draft.apply_defaults();
        SuggestedShot::new(draft, self.reason)
    }
}

/// Parse each flat `{...}` span on its own as a shot object.
pub(crate) fn extract(text: &str, skipped: &mut Vec<SkipReason>) -> Vec<SuggestedShot> {
    let mut out = Vec::new();

    for candidate in flat_objects(text) {
        let object: ShotObject = match serde_json::from_str(candidate) {
            Ok(object) => object,
            Err(err) => {
                skipped.push(SkipReason::Unparseable {
                    strategy: Strategy::EmbeddedObject,
                    excerpt: excerpt(candidate),
                    error: err.to_string(),
                });
                continue;
            }
        };

        if let Some(field) = object.missing_required() {
            skipped.push(SkipReason::MissingField {
                strategy: Strategy::EmbeddedObject,
                field,
                excerpt: excerpt(candidate),
            });
            continue;
        }

        out.push(object.into_suggestion());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objects_inside_prose() {
        let text = r#"Here are two ideas:
[
  {"scene": 2, "shot": "1.5", "description": "Reaction shot", "shotSize": "CU", "reason": "sell the moment"},
  {"scene": "3", "shotNumber": 4, "description": "Street at night", "characters": ["Mara", "Joss"]}
]
Hope that helps."#;
        let mut skipped = Vec::new();
        let shots = extract(text, &mut skipped);

        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].draft.scene, "2");
        assert_eq!(shots[0].draft.shot, "1.5");
        assert_eq!(shots[0].draft.shot_size, "CU");
        assert_eq!(shots[0].reason, "sell the moment");
        assert_eq!(shots[1].draft.shot, "4");
        assert_eq!(shots[1].draft.people, "Mara, Joss");
        assert_eq!(shots[1].draft.shot_size, "MS");
        assert_eq!(shots[1].draft.action, "Street at night");
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_bad_and_incomplete_objects_are_skipped() {
        let text = r#"{"scene": 1, "shot": 1} {not json} {"scene": 1, "shot": 2, "description": "Ok"}"#;
        let mut skipped = Vec::new();
        let shots = extract(text, &mut skipped);

        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].draft.description, "Ok");
        assert_eq!(skipped.len(), 2);
        assert!(matches!(
            skipped[0],
            SkipReason::MissingField { field: "description", .. }
        ));
        assert!(matches!(skipped[1], SkipReason::Unparseable { .. }));
    }

    #[test]
    fn test_nested_outer_object_only_yields_inner() {
        let text = r#"{"shots": {"scene": 1, "shot": 1, "description": "Inner"}}"#;
        let shots = extract(text, &mut Vec::new());
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].draft.description, "Inner");
    }

    #[test]
    fn test_needs_both_braces() {
        assert!(flat_objects("only { an opening").is_empty());
        assert!(flat_objects("only } a closing").is_empty());
    }
}
