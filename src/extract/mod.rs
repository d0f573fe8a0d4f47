//! Recovering shots and subjects from generation output.
//!
//! Responses are parsed by a chain of strategies, strictest first:
//! 1. [`Strategy::Pattern`]: `Scene n, Shot m: description` headers with
//!    labeled attribute lines beneath them.
//! 2. [`Strategy::EmbeddedObject`]: flat JSON objects anywhere in the text.
//! 3. [`Strategy::LineScan`]: a line-by-line state machine over labels.
//!
//! The first strategy that yields at least one record wins and later ones are
//! never run. Extraction never fails: unusable input produces an empty
//! result, and every dropped candidate is recorded as a [`SkipReason`].

mod embedded;
mod labels;
mod lines;
mod pattern;
mod subjects;

use std::fmt;

use crate::model::{SubjectDraft, SuggestedShot};
use crate::normalize::normalize_response;

pub(crate) use embedded::{ShotObject, loose_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Pattern,
    EmbeddedObject,
    LineScan,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pattern => "pattern",
            Self::EmbeddedObject => "embedded-object",
            Self::LineScan => "line-scan",
        };
        f.write_str(name)
    }
}

/// Why a candidate did not make it into a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingField {
        strategy: Strategy,
        field: &'static str,
        excerpt: String,
    },
    Unparseable {
        strategy: Strategy,
        excerpt: String,
        error: String,
    },
    UnknownCategory {
        name: String,
        category: String,
    },
    DuplicateName {
        name: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField {
                strategy,
                field,
                excerpt,
            } => write!(f, "{strategy}: missing {field} in \"{excerpt}\""),
            Self::Unparseable {
                strategy,
                excerpt,
                error,
            } => write!(f, "{strategy}: could not parse \"{excerpt}\" ({error})"),
            Self::UnknownCategory { name, category } => {
                write!(f, "unknown category '{category}' for '{name}'")
            }
            Self::DuplicateName { name } => write!(f, "'{name}' already exists"),
        }
    }
}

/// Records from one extraction run along with how they were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction<T> {
    pub records: Vec<T>,
    /// The strategy that produced `records`; `None` when nothing was found.
    pub strategy: Option<Strategy>,
    pub skipped: Vec<SkipReason>,
}

impl<T> Extraction<T> {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            strategy: None,
            skipped: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

type StrategyFn<T> = fn(&str, &mut Vec<SkipReason>) -> Vec<T>;

const SHOT_STRATEGIES: [(Strategy, StrategyFn<SuggestedShot>); 3] = [
    (Strategy::Pattern, pattern::extract),
    (Strategy::EmbeddedObject, embedded::extract),
    (Strategy::LineScan, lines::extract),
];

const SUBJECT_STRATEGIES: [(Strategy, StrategyFn<SubjectDraft>); 2] = [
    (Strategy::EmbeddedObject, subjects::extract_objects),
    (Strategy::LineScan, subjects::extract_lines),
];

fn run_chain<T>(raw: &str, strategies: &[(Strategy, StrategyFn<T>)]) -> Extraction<T> {
    let mut extraction = Extraction::empty();
    let Ok(text) = normalize_response(raw) else {
        return extraction;
    };

    for (strategy, run) in strategies {
        let records = run(&text, &mut extraction.skipped);
        if !records.is_empty() {
            tracing::debug!(%strategy, count = records.len(), "extraction strategy matched");
            extraction.records = records;
            extraction.strategy = Some(*strategy);
            return extraction;
        }
    }

    tracing::debug!(
        length = text.len(),
        skipped = extraction.skipped.len(),
        "no extraction strategy matched"
    );
    extraction
}

/// Suggested shots found in `raw`, or none.
pub fn extract_shots(raw: &str) -> Vec<SuggestedShot> {
    extract_shots_with_report(raw).records
}

pub fn extract_shots_with_report(raw: &str) -> Extraction<SuggestedShot> {
    run_chain(raw, &SHOT_STRATEGIES)
}

/// Candidate subjects found in `raw`, or none.
pub fn extract_subjects(raw: &str) -> Vec<SubjectDraft> {
    extract_subjects_with_report(raw).records
}

pub fn extract_subjects_with_report(raw: &str) -> Extraction<SubjectDraft> {
    run_chain(raw, &SUBJECT_STRATEGIES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_wins_over_later_strategies() {
        // The JSON object and the labeled block would each produce a
        // different shot if their strategies ran.
        let text = "Scene 1, Shot 1: Opening\n{\"scene\": 7, \"shot\": 7, \"description\": \"From JSON\"}\nScene: 8\nShot: 8\nDescription: From lines";
        let extraction = extract_shots_with_report(text);

        assert_eq!(extraction.strategy, Some(Strategy::Pattern));
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].draft.description, "Opening");
    }

    #[test]
    fn test_falls_through_to_embedded() {
        let text = "Sure!\n{\"scene\": 7, \"shot\": 7, \"description\": \"From JSON\"}\nScene: 8\nShot: 8\nDescription: From lines";
        let extraction = extract_shots_with_report(text);

        assert_eq!(extraction.strategy, Some(Strategy::EmbeddedObject));
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].draft.scene, "7");
    }

    #[test]
    fn test_falls_through_to_line_scan() {
        let text = "Scene: 8\nShot: 8\nDescription: From lines\n{broken json}";
        let extraction = extract_shots_with_report(text);

        assert_eq!(extraction.strategy, Some(Strategy::LineScan));
        assert_eq!(extraction.records[0].draft.description, "From lines");
        assert!(
            extraction
                .skipped
                .iter()
                .any(|s| matches!(s, SkipReason::Unparseable { .. }))
        );
    }

    #[test]
    fn test_garbage_gives_empty_result() {
        for input in ["", "   ", "}{", "{{{{", "Scene", "Shot Size: WS", "\u{0}\u{1}", "Scene 1, Shot"] {
            let extraction = extract_shots_with_report(input);
            assert!(extraction.is_empty(), "input {input:?}");
            assert_eq!(extraction.strategy, None);
        }
    }

    #[test]
    fn test_subject_chain_prefers_json() {
        let text = "People:\n- Ada: engineer\n{\"name\": \"Lab\", \"category\": \"place\"}";
        let extraction = extract_subjects_with_report(text);
        assert_eq!(extraction.strategy, Some(Strategy::EmbeddedObject));
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].name, "Lab");
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::MissingField {
            strategy: Strategy::LineScan,
            field: "shot",
            excerpt: "Scene: 2".into(),
        };
        assert_eq!(reason.to_string(), "line-scan: missing shot in \"Scene: 2\"");
    }
}
