use super::labels::{ShotField, excerpt, match_label, parse_header_line};
use super::{SkipReason, Strategy};
use crate::model::{ShotDraft, SuggestedShot};

/// The record currently being assembled by the line scanner.
#[derive(Debug, Default)]
struct Accumulator {
    draft: ShotDraft,
    reason: Option<String>,
    touched: bool,
    first_line: String,
}

impl Accumulator {
    fn starting_at(line: &str) -> Self {
        Self {
            touched: true,
            first_line: line.to_string(),
            ..Self::default()
        }
    }

    fn set(&mut self, field: ShotField, value: String, line: &str) {
        if !self.touched {
            self.first_line = line.to_string();
        }
        self.touched = true;
        if field == ShotField::Reason {
            self.reason = Some(value);
        } else {
            field.assign(&mut self.draft, &value);
        }
    }

    /// Whether `field` already holds a value, meaning a repeat starts a new record.
    fn has(&self, field: ShotField) -> bool {
        match field {
            ShotField::Scene => !self.draft.scene.is_empty(),
            ShotField::Shot => !self.draft.shot.is_empty(),
            _ => false,
        }
    }

    fn flush(self, out: &mut Vec<SuggestedShot>, skipped: &mut Vec<SkipReason>) {
        if !self.touched {
            return;
        }

        let missing = if self.draft.scene.trim().is_empty() {
            Some("scene")
        } else if self.draft.shot.trim().is_empty() {
            Some("shot")
        } else if self.draft.description.trim().is_empty() {
            Some("description")
        } else {
            None
        };

        if let Some(field) = missing {
            skipped.push(SkipReason::MissingField {
                strategy: Strategy::LineScan,
                field,
                excerpt: excerpt(&self.first_line),
            });
            return;
        }

        let mut draft = self.draft;
        draft.apply_defaults();
        out.push(SuggestedShot::new(draft, self.reason));
    }
}

/// Line-at-a-time state machine over `text`.
///
/// Header lines flush the accumulator and open a new one. `Scene:`/`Shot:`
/// labels that would overwrite a value already held do the same, carrying the
/// scene over when only the shot number changes. Everything else updates the
/// open record.
pub(crate) fn extract(text: &str, skipped: &mut Vec<SkipReason>) -> Vec<SuggestedShot> {
    let mut out = Vec::new();
    let mut current = Accumulator::default();

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(header) = parse_header_line(line) {
            std::mem::take(&mut current).flush(&mut out, skipped);
            current = Accumulator::starting_at(line);
            current.draft.scene = header.scene;
            current.draft.shot = header.shot;
            current.draft.description = header.description;
            continue;
        }

        let Some((field, value)) = match_label(line) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        if current.has(field) {
            let carried_scene = (field == ShotField::Shot).then(|| current.draft.scene.clone());
            std::mem::take(&mut current).flush(&mut out, skipped);
            current = Accumulator::starting_at(line);
            if let Some(scene) = carried_scene {
                current.draft.scene = scene;
            }
        }

        current.set(field, value, line);
    }

    current.flush(&mut out, skipped);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_without_inline_description() {
        let text = "Scene 1, Shot 1\nDescription: Dawn over the bay\nShot Size: EWS\nScene 1, Shot 2\nDescription: Gulls scatter";
        let mut skipped = Vec::new();
        let shots = extract(text, &mut skipped);

        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].draft.description, "Dawn over the bay");
        assert_eq!(shots[0].draft.shot_size, "EWS");
        assert_eq!(shots[1].draft.shot, "2");
        assert_eq!(shots[1].draft.shot_size, "MS");
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_fully_labeled_records() {
        let text = "Scene: 4\nShot: 1\nDescription: Empty hallway\nShot: 2\nDescription: Footsteps approach\nReason: build tension\nScene: 5\nShot: 1\nDescription: Rooftop";
        let shots = extract(text, &mut Vec::new());

        assert_eq!(shots.len(), 3);
        assert_eq!(shots[1].draft.scene, "4");
        assert_eq!(shots[1].draft.shot, "2");
        assert_eq!(shots[1].reason, "build tension");
        assert_eq!(shots[2].draft.scene, "5");
        assert_eq!(shots[2].draft.description, "Rooftop");
    }

    #[test]
    fn test_incomplete_record_dropped_not_defaulted() {
        let text = "Scene 2, Shot 1\nShot Size: CU\nScene 2, Shot 2\nDescription: Eyes open";
        let mut skipped = Vec::new();
        let shots = extract(text, &mut skipped);

        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].draft.shot, "2");
        assert!(matches!(
            skipped.as_slice(),
            [SkipReason::MissingField { field: "description", .. }]
        ));
    }

    #[test]
    fn test_numbered_labels_and_headers() {
        let text = "1. Scene: 6\n2. Shot: 1\n3. Description: Harbor at dawn\n4) Scene 6, Shot 2\nDescription: Boat leaves";
        let mut skipped = Vec::new();
        let shots = extract(text, &mut skipped);

        assert_eq!(shots.len(), 2);
        assert_eq!(shots[0].draft.scene, "6");
        assert_eq!(shots[0].draft.description, "Harbor at dawn");
        assert_eq!(shots[1].draft.shot, "2");
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_final_accumulator_flushed() {
        let shots = extract("Scene 9, Shot 9\nDescription: Last frame", &mut Vec::new());
        assert_eq!(shots.len(), 1);
    }

    #[test]
    fn test_unlabeled_text_yields_nothing() {
        let mut skipped = Vec::new();
        assert!(extract("Some thoughts.\nMore thoughts.", &mut skipped).is_empty());
        assert!(skipped.is_empty());
    }
}
