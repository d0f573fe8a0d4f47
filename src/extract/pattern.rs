use std::collections::HashSet;

use super::labels::{ShotField, excerpt, find_headers, match_label};
use super::{SkipReason, Strategy};
use crate::model::{ShotDraft, SuggestedShot};

/// Header-driven extraction.
///
/// Each `Scene n, Shot m: description` header opens a record; labeled lines
/// between it and the next header fill in the attributes.
pub(crate) fn extract(text: &str, skipped: &mut Vec<SkipReason>) -> Vec<SuggestedShot> {
    let headers = find_headers(text);
    let mut out = Vec::with_capacity(headers.len());

    for (idx, header) in headers.iter().enumerate() {
        if header.description.is_empty() {
            skipped.push(SkipReason::MissingField {
                strategy: Strategy::Pattern,
                field: "description",
                excerpt: excerpt(&text[header.start..header.end]),
            });
            continue;
        }

        let region_end = headers.get(idx + 1).map(|h| h.start).unwrap_or(text.len());
        let region = &text[header.end..region_end];

        let mut draft = ShotDraft {
            scene: header.scene.clone(),
            shot: header.shot.clone(),
            description: header.description.clone(),
            ..ShotDraft::default()
        };
        let mut reason = None;
        let mut filled = HashSet::new();

        for line in region.lines() {
            let Some((field, value)) = match_label(line) else {
                continue;
            };
            if !field.is_attribute() || value.is_empty() || !filled.insert(field) {
                continue;
            }
            if field == ShotField::Reason {
                reason = Some(value);
            } else {
                field.assign(&mut draft, &value);
            }
        }

        draft.apply_defaults();
        out.push(SuggestedShot::new(draft, reason));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_REASON;

    #[test]
    fn test_attributes_stay_with_their_header() {
        let text = "Scene 1, Shot 1: Wide shot of house\nShot Size: WS\nLocation: Exterior\n\nScene 1, Shot 2: Close on door\nReason: establish entry";
        let mut skipped = Vec::new();
        let shots = extract(text, &mut skipped);

        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].draft.shot_size, "WS");
        assert_eq!(shots[0].draft.location, "Exterior");
        assert_eq!(shots[0].draft.action, "Wide shot of house");
        assert_eq!(shots[0].reason, DEFAULT_REASON);
        assert_eq!(shots[1].draft.shot_size, "MS");
        assert_eq!(shots[1].draft.location, "");
        assert_eq!(shots[1].reason, "establish entry");
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_first_label_occurrence_wins() {
        let text = "Scene 2, Shot 1: Crowd gathers\nPeople: Mara\nPeople: Joss";
        let shots = extract(text, &mut Vec::new());
        assert_eq!(shots[0].draft.people, "Mara");
    }

    #[test]
    fn test_header_without_description_is_dropped() {
        let text = "Scene 1, Shot 1:\nShot Size: WS\nScene 1, Shot 2: Door";
        let mut skipped = Vec::new();
        let shots = extract(text, &mut skipped);
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].draft.shot, "2");
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_decimal_shot_and_action_label() {
        let text = "Scene 3, Shot 2.1: Insert of the letter\nAction: Hand trembles\nDialogue: \"Not again.\"";
        let shots = extract(text, &mut Vec::new());
        assert_eq!(shots[0].draft.shot, "2.1");
        assert_eq!(shots[0].draft.action, "Hand trembles");
        assert_eq!(shots[0].draft.dialogue, "\"Not again.\"");
    }

    #[test]
    fn test_numbered_and_prefixed_replies() {
        let numbered = "1. Scene 1, Shot 2: Close on door\nShot Size: CU\n2. Scene 2, Shot 1: Wide of harbor\nReason: geography";
        let shots = extract(numbered, &mut Vec::new());
        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].draft.shot_size, "CU");
        assert_eq!(shots[1].draft.scene, "2");
        assert_eq!(shots[1].reason, "geography");

        let prefixed = "Suggestion 1 - Scene 1, Shot 2: Close on door\nSuggestion 2 - Scene 2, Shot 1: Wide of harbor";
        let shots = extract(prefixed, &mut Vec::new());
        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].draft.description, "Close on door");
    }

    #[test]
    fn test_prose_under_header_is_not_an_attribute() {
        let text = "Scene 4, Shot 1: Street at night\nPeople rush past the camera as rain falls.";
        let shots = extract(text, &mut Vec::new());
        assert_eq!(shots[0].draft.people, "");
    }

    #[test]
    fn test_no_headers_no_records() {
        assert!(extract("Just a paragraph about the film.", &mut Vec::new()).is_empty());
    }
}
