//! Subject (people, places, props) extraction from free text.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use super::embedded::{flat_objects, loose_string};
use super::labels::{clean_line, excerpt};
use super::{SkipReason, Strategy};
use crate::model::{SubjectCategory, SubjectDraft};

const MAX_NAME_CHARS: usize = 60;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubjectObject {
    #[serde(alias = "subject", alias = "title", deserialize_with = "loose_string")]
    name: Option<String>,
    #[serde(alias = "type", alias = "kind", deserialize_with = "loose_string")]
    category: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    description: Option<String>,
    #[serde(alias = "aliases", deserialize_with = "loose_string")]
    alias: Option<String>,
    #[serde(alias = "triggerWord", alias = "trigger_word", deserialize_with = "loose_string")]
    trigger: Option<String>,
}

pub(crate) fn extract_objects(text: &str, skipped: &mut Vec<SkipReason>) -> Vec<SubjectDraft> {
    let mut out = Vec::new();

    for candidate in flat_objects(text) {
        let object: SubjectObject = match serde_json::from_str(candidate) {
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

        let name = object.name.unwrap_or_default();
        if name.is_empty() {
            skipped.push(SkipReason::MissingField {
                strategy: Strategy::EmbeddedObject,
                field: "name",
                excerpt: excerpt(candidate),
            });
            continue;
        }

        let raw_category = object.category.unwrap_or_default();
        let Some(category) = SubjectCategory::parse_lenient(&raw_category) else {
            skipped.push(SkipReason::UnknownCategory {
                name,
                category: raw_category,
            });
            continue;
        };

        let mut draft = SubjectDraft::new(name, category)
            .with_description(object.description.unwrap_or_default())
            .with_alias(object.alias.unwrap_or_default());
        draft.trigger = object.trigger.filter(|t| !t.is_empty());
        out.push(draft);
    }

    out
}

fn inline_regex() -> Option<&'static Regex> {
    static INLINE_RE: OnceCell<Regex> = OnceCell::new();
    INLINE_RE
        .get_or_try_init(|| {
            Regex::new(r"^([^()\[\]:]+?)\s*[(\[]\s*([A-Za-z ]+?)\s*[)\]]\s*(?:[:\-–—]\s*(.*))?$")
        })
        .ok()
}

/// `Name (Category): description` on one line.
fn parse_inline(line: &str) -> Option<(String, String, String)> {
    let caps = inline_regex()?.captures(line)?;
    Some((
        caps.get(1)?.as_str().trim().to_string(),
        caps.get(2)?.as_str().trim().to_string(),
        caps.get(3).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
    ))
}

/// `Name: description` or `Name - description` under a category heading.
fn parse_bullet(line: &str) -> Option<(String, String)> {
    let (name, description) = match line.split_once(':') {
        Some(pair) => pair,
        None => line
            .split_once(" - ")
            .or_else(|| line.split_once(" – "))
            .or_else(|| line.split_once(" — "))
            .unwrap_or((line, "")),
    };
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return None;
    }
    Some((name.to_string(), description.trim().to_string()))
}

/// A line that is nothing but a category name, like `## People` or `Props:`.
fn parse_heading(line: &str) -> Option<SubjectCategory> {
    let bare = line.trim_end_matches(':').trim();
    if bare.split_whitespace().count() > 2 {
        return None;
    }
    SubjectCategory::parse_lenient(bare)
}

/// Line-oriented subject scanner.
///
/// Understands category headings followed by bulleted `Name: description`
/// entries, inline `Name (Category): description` entries, and `Alias:` /
/// `Description:` follow-up lines that attach to the previous subject.
pub(crate) fn extract_lines(text: &str, skipped: &mut Vec<SkipReason>) -> Vec<SubjectDraft> {
    let mut out: Vec<SubjectDraft> = Vec::new();
    let mut heading: Option<SubjectCategory> = None;

    for raw in text.lines() {
        let line = clean_line(raw);
        if line.is_empty() {
            continue;
        }

        if let Some(category) = parse_heading(&line) {
            heading = Some(category);
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if let Some(last) = out.last_mut() {
                if key.eq_ignore_ascii_case("alias") || key.eq_ignore_ascii_case("aliases") {
                    last.alias = value.trim().to_string();
                    continue;
                }
                if key.eq_ignore_ascii_case("description") {
                    last.description = value.trim().to_string();
                    continue;
                }
                if key.eq_ignore_ascii_case("trigger") {
                    last.trigger = Some(value.trim().to_string()).filter(|t| !t.is_empty());
                    continue;
                }
            }
        }

        if let Some((name, raw_category, description)) = parse_inline(&line) {
            match SubjectCategory::parse_lenient(&raw_category) {
                Some(category) => {
                    out.push(SubjectDraft::new(name, category).with_description(description));
                }
                None => skipped.push(SkipReason::UnknownCategory {
                    name,
                    category: raw_category,
                }),
            }
            continue;
        }

        let Some(category) = heading else {
            continue;
        };
        if let Some((name, description)) = parse_bullet(&line) {
            out.push(SubjectDraft::new(name, category).with_description(description));
        } else {
            skipped.push(SkipReason::MissingField {
                strategy: Strategy::LineScan,
                field: "name",
                excerpt: excerpt(&line),
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_subjects() {
        let text = r#"[{"name": "Mara", "category": "character", "description": "Lighthouse keeper"},
                       {"name": "The Bay", "type": "Places"},
                       {"name": "Storm", "category": "weather"},
                       {"category": "Props"}]"#;
        let mut skipped = Vec::new();
        let subjects = extract_objects(text, &mut skipped);

        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].category, SubjectCategory::People);
        assert_eq!(subjects[0].description, "Lighthouse keeper");
        assert_eq!(subjects[1].category, SubjectCategory::Places);
        assert_eq!(skipped.len(), 2);
    }

    #[test]
    fn test_heading_sections() {
        let text = "## People\n- Mara: Lighthouse keeper\n- Joss - her brother\nAlias: J\n\nProps:\n1. Brass lantern: Never goes out";
        let subjects = extract_lines(text, &mut Vec::new());

        assert_eq!(subjects.len(), 3);
        assert_eq!(subjects[0].name, "Mara");
        assert_eq!(subjects[1].name, "Joss");
        assert_eq!(subjects[1].description, "her brother");
        assert_eq!(subjects[1].alias, "J");
        assert_eq!(subjects[2].name, "Brass lantern");
        assert_eq!(subjects[2].category, SubjectCategory::Props);
    }

    #[test]
    fn test_inline_categories() {
        let text = "Mara (People): keeper of the light\nOld Pier [Location] - rotting boards\nFog (Mood): thick";
        let mut skipped = Vec::new();
        let subjects = extract_lines(text, &mut skipped);

        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[1].name, "Old Pier");
        assert_eq!(subjects[1].category, SubjectCategory::Places);
        assert_eq!(subjects[1].description, "rotting boards");
        assert!(matches!(skipped.as_slice(), [SkipReason::UnknownCategory { .. }]));
    }

    #[test]
    fn test_numbered_entries_under_heading() {
        let subjects = extract_lines("Places:\n2) Harbor: fog\n3 Musketeers Inn: tavern", &mut Vec::new());
        assert_eq!(subjects[0].name, "Harbor");
        assert_eq!(subjects[1].name, "3 Musketeers Inn");
    }

    #[test]
    fn test_lines_outside_sections_ignored() {
        assert!(extract_lines("Here is what I found in the script.", &mut Vec::new()).is_empty());
    }
}
