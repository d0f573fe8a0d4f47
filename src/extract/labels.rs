//! `Label: value` recognition shared by the shot strategies.

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

use crate::model::ShotDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ShotField {
    Scene,
    Shot,
    Description,
    ShotSize,
    People,
    Location,
    Action,
    Dialogue,
    Reason,
    CameraAngle,
    CameraMovement,
    Notes,
}

impl ShotField {
    /// Fields that only ever arrive as attribute lines under a header.
    pub(crate) fn is_attribute(self) -> bool {
        !matches!(self, Self::Scene | Self::Shot | Self::Description)
    }

    /// Write `value` into the matching slot. `Reason` lives outside the draft.
    pub(crate) fn assign(self, draft: &mut ShotDraft, value: &str) {
        let value = value.to_string();
        match self {
            Self::Scene => draft.scene = value,
            Self::Shot => draft.shot = value,
            Self::Description => draft.description = value,
            Self::ShotSize => draft.shot_size = value,
            Self::People => draft.people = value,
            Self::Location => draft.location = value,
            Self::Action => draft.action = value,
            Self::Dialogue => draft.dialogue = value,
            Self::CameraAngle => draft.camera_angle = value,
            Self::CameraMovement => draft.camera_movement = value,
            Self::Notes => draft.notes = value,
            Self::Reason => {}
        }
    }
}

const ALIASES: &[(&str, ShotField)] = &[
    ("scene number", ShotField::Scene),
    ("scene", ShotField::Scene),
    ("shot number", ShotField::Shot),
    ("shot #", ShotField::Shot),
    ("shot", ShotField::Shot),
    ("shot description", ShotField::Description),
    ("description", ShotField::Description),
    ("desc", ShotField::Description),
    ("shot size", ShotField::ShotSize),
    ("shot type", ShotField::ShotSize),
    ("framing", ShotField::ShotSize),
    ("size", ShotField::ShotSize),
    ("people", ShotField::People),
    ("characters", ShotField::People),
    ("cast", ShotField::People),
    ("location", ShotField::Location),
    ("setting", ShotField::Location),
    ("action", ShotField::Action),
    ("dialogue", ShotField::Dialogue),
    ("dialog", ShotField::Dialogue),
    ("reason", ShotField::Reason),
    ("rationale", ShotField::Reason),
    ("camera angle", ShotField::CameraAngle),
    ("angle", ShotField::CameraAngle),
    ("camera movement", ShotField::CameraMovement),
    ("camera move", ShotField::CameraMovement),
    ("movement", ShotField::CameraMovement),
    ("director's notes", ShotField::Notes),
    ("directors notes", ShotField::Notes),
    ("director notes", ShotField::Notes),
    ("notes", ShotField::Notes),
    ("note", ShotField::Notes),
];

// Longest first so "shot size" wins over "shot".
static SORTED_ALIASES: Lazy<Vec<(&'static str, ShotField)>> = Lazy::new(|| {
    let mut aliases = ALIASES.to_vec();
    aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    aliases
});

/// Strip list bullets, numbering, quote markers and markdown emphasis around a line.
pub(crate) fn clean_line(line: &str) -> String {
    let without_bold = line.replace("**", "").replace("__", "");
    let unbulleted = without_bold
        .trim()
        .trim_start_matches(['-', '*', '•', '>', '#'])
        .trim();
    strip_list_marker(unbulleted).to_string()
}

/// Drop a `1.` or `2)` numbering prefix. "1.5 seconds" and "3 Musketeers" are left alone.
pub(crate) fn strip_list_marker(line: &str) -> &str {
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return line;
    }
    match line[digits..].strip_prefix(['.', ')']) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => line,
    }
}

/// Recognize `Label: value`, `Label - value` or `Label value`.
///
/// The label is matched case-insensitively; the returned value is trimmed and
/// may be empty. Without a separator the value must be a single token, so
/// prose that happens to open with a label word is not taken as one.
pub(crate) fn match_label(line: &str) -> Option<(ShotField, String)> {
    let cleaned = clean_line(line);

    for (alias, field) in SORTED_ALIASES.iter() {
        let Some(prefix) = cleaned.get(..alias.len()) else {
            continue;
        };
        if !prefix.eq_ignore_ascii_case(alias) {
            continue;
        }

        let rest = &cleaned[alias.len()..];
        let value = if let Some(after) = rest.trim_start().strip_prefix(':') {
            after
        } else if let Some(after) = rest.trim_start().strip_prefix(['-', '–', '—']) {
            after
        } else if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            if rest.split_whitespace().count() > 1 {
                continue;
            }
            rest
        } else {
            // "Shots", "Scenery": the alias is only a prefix of a longer word.
            continue;
        };

        return Some((*field, value.trim().to_string()));
    }

    None
}

/// A `Scene <n>, Shot <m>[: description]` header found in the text.
#[derive(Debug, Clone)]
pub(crate) struct Header {
    pub start: usize,
    pub end: usize,
    pub scene: String,
    pub shot: String,
    pub description: String,
}

fn header_regex() -> Option<&'static Regex> {
    static HEADER_RE: OnceCell<Regex> = OnceCell::new();
    HEADER_RE
        .get_or_try_init(|| {
            Regex::new(
                r"(?im)^[^\n:]*?\bscene\s*#?\s*(\d+)[*_ \t]*[,;:/|\-–—]?[*_ \t]*shot\s*#?\s*(\d+(?:\.\d+)?)[*_ \t]*[:\-–—.)]?[*_ \t]*(.*)$",
            )
        })
        .ok()
}

pub(crate) fn find_headers(text: &str) -> Vec<Header> {
    let Some(re) = header_regex() else {
        return Vec::new();
    };

    re.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Header {
                start: whole.start(),
                end: whole.end(),
                scene: caps.get(1)?.as_str().to_string(),
                shot: caps.get(2)?.as_str().to_string(),
                description: caps
                    .get(3)
                    .map(|m| clean_line(m.as_str()))
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Parse a single line as a header.
pub(crate) fn parse_header_line(line: &str) -> Option<Header> {
    find_headers(line.trim_end()).into_iter().next()
}

/// Cut `text` down to a short single-line preview for diagnostics.
pub(crate) fn excerpt(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out: String = flat.chars().take(80).collect();
    if flat.chars().count() > 80 {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_case_and_colon_tolerance() {
        assert_eq!(
            match_label("  SHOT SIZE:  WS "),
            Some((ShotField::ShotSize, "WS".to_string()))
        );
        assert_eq!(
            match_label("location Exterior"),
            Some((ShotField::Location, "Exterior".to_string()))
        );
        assert_eq!(
            match_label("- **Reason:** establish entry"),
            Some((ShotField::Reason, "establish entry".to_string()))
        );
        assert_eq!(
            match_label("Dialogue - \"Who's there?\""),
            Some((ShotField::Dialogue, "\"Who's there?\"".to_string()))
        );
    }

    #[test]
    fn test_longest_alias_wins() {
        assert_eq!(match_label("Shot Size: CU").map(|(f, _)| f), Some(ShotField::ShotSize));
        assert_eq!(match_label("Shot: 3").map(|(f, _)| f), Some(ShotField::Shot));
        assert_eq!(
            match_label("Camera Angle: low").map(|(f, _)| f),
            Some(ShotField::CameraAngle)
        );
    }

    #[test]
    fn test_word_prefix_is_not_a_label() {
        assert_eq!(match_label("Scenery glows at dusk"), None);
        assert_eq!(match_label("Shots overlap here"), None);
        assert_eq!(match_label("A plain sentence"), None);
    }

    #[test]
    fn test_header_variants() {
        let text = "Scene 1, Shot 1: Wide shot of house\n**Scene 2 - Shot 3.5** - Close on hands\n- scene 4 shot 2. Pan left";
        let headers = find_headers(text);
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[0].description, "Wide shot of house");
        assert_eq!(headers[1].scene, "2");
        assert_eq!(headers[1].shot, "3.5");
        assert_eq!(headers[1].description, "Close on hands");
        assert_eq!(headers[2].shot, "2");
        assert_eq!(headers[2].description, "Pan left");
    }

    #[test]
    fn test_header_without_description() {
        let header = parse_header_line("Scene 3, Shot 2").unwrap();
        assert_eq!(header.scene, "3");
        assert_eq!(header.shot, "2");
        assert!(header.description.is_empty());
    }

    #[test]
    fn test_shot_size_line_is_not_a_header() {
        assert!(find_headers("Shot Size: WS").is_empty());
        assert!(find_headers("Reason: bridges scene 2, shot 3").is_empty());
    }

    #[test]
    fn test_numbered_and_prefixed_headers() {
        let text = "1. Scene 1, Shot 2: Close on door\nSuggestion 2 - Scene 2, Shot 1: Wide of harbor\n3) **Scene 3, Shot 4** - Gulls";
        let headers = find_headers(text);
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[0].shot, "2");
        assert_eq!(headers[0].description, "Close on door");
        assert_eq!(headers[1].scene, "2");
        assert_eq!(headers[1].description, "Wide of harbor");
        assert_eq!(headers[2].description, "Gulls");
    }

    #[test]
    fn test_list_marker_needs_trailing_space() {
        assert_eq!(strip_list_marker("2) Harbor"), "Harbor");
        assert_eq!(strip_list_marker("12. Shot Size: CU"), "Shot Size: CU");
        assert_eq!(strip_list_marker("1.5 seconds"), "1.5 seconds");
        assert_eq!(strip_list_marker("3 Musketeers"), "3 Musketeers");
        assert_eq!(
            match_label("2. Location: Pier"),
            Some((ShotField::Location, "Pier".to_string()))
        );
    }

    #[test]
    fn test_prose_is_not_a_bare_label() {
        assert_eq!(match_label("People rush past the camera as rain falls."), None);
        assert_eq!(match_label("Action happens off screen"), None);
        assert_eq!(
            match_label("People - rush past"),
            Some((ShotField::People, "rush past".to_string()))
        );
    }
}
