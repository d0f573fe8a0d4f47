//! The boundary to text-generation providers.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, ScriptVisionError};
use crate::prompts;

/// Anything that turns a task description plus context into text.
///
/// Implementations report provider failures as
/// [`ScriptVisionError::Generation`]; callers pass those through unchanged.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, task: &str, context: &str) -> Result<String>;
}

/// Outcome of a structured generation call.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredReply<T> {
    /// The reply held JSON that deserialized into `T`.
    Parsed(T),
    /// The reply did not validate. Carries the raw text for a looser parse.
    Unparsed(String),
}

/// Render a template, call the generator, and validate the reply as `T`.
///
/// `T`'s `Deserialize` impl is the validation schema. Generation failures are
/// returned as errors; a reply that does not validate is not an error.
pub async fn generate_structured<T>(
    generator: &dyn TextGenerator,
    phase: &str,
    template: &str,
    vars: &Value,
    context: &Value,
) -> Result<StructuredReply<T>>
where
    T: DeserializeOwned,
{
    let task = prompts::render(phase, template, vars)?;
    let raw = generator.generate(&task, &prompts::render_context(context)).await?;
    Ok(parse_structured(raw))
}

pub fn parse_structured<T>(raw: String) -> StructuredReply<T>
where
    T: DeserializeOwned,
{
    let Some(payload) = json_payload(&raw) else {
        return StructuredReply::Unparsed(raw);
    };
    match serde_json::from_str::<T>(payload) {
        Ok(value) => StructuredReply::Parsed(value),
        Err(err) => {
            tracing::debug!(error = %err, "structured reply did not validate");
            StructuredReply::Unparsed(raw)
        }
    }
}

/// The JSON document inside a reply: a fenced block, or the first balanced
/// object/array.
pub fn json_payload(response: &str) -> Option<&str> {
    if let Some(block) = fenced_block(response) {
        let block = block.trim();
        if block.starts_with(['{', '[']) {
            return Some(block);
        }
    }

    let start = response.find(['{', '['])?;
    let open = response[start..].chars().next()?;
    let close = if open == '{' { '}' } else { ']' };
    balanced(&response[start..], open, close)
}

fn fenced_block(response: &str) -> Option<&str> {
    let start = response.find("```")?;
    let after = &response[start + 3..];
    let body_start = after.find('\n').map(|n| n + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find("```").unwrap_or(body.len());
    Some(&body[..end])
}

fn balanced(text: &str, open: char, close: char) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Plays back canned replies in order; used for replaying saved responses
/// and for tests.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new([Ok(text.into())])
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new([Err(ScriptVisionError::Generation(message.into()))])
    }

    /// Every `(task, context)` pair received so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, task: &str, context: &str) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((task.to_string(), context.to_string()));
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front());
        next.unwrap_or_else(|| {
            Err(ScriptVisionError::Generation(
                "no scripted reply left".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: i32,
    }

    #[test]
    fn test_payload_from_fence() {
        let raw = "Here you go:\n```json\n[{\"id\": 1}]\n```\nEnjoy";
        assert_eq!(json_payload(raw), Some("[{\"id\": 1}]"));
    }

    #[test]
    fn test_payload_balanced_with_strings() {
        let raw = r#"Result: {"text": "a } in \"quotes\"", "n": {"m": 1}} trailing"#;
        assert_eq!(
            json_payload(raw),
            Some(r#"{"text": "a } in \"quotes\"", "n": {"m": 1}}"#)
        );
    }

    #[test]
    fn test_payload_missing() {
        assert_eq!(json_payload("no json here"), None);
        assert_eq!(json_payload("{ unterminated"), None);
    }

    #[test]
    fn test_parse_structured_validates() {
        let ok: StructuredReply<Vec<Item>> = parse_structured("[{\"id\": 4}]".to_string());
        assert_eq!(ok, StructuredReply::Parsed(vec![Item { id: 4 }]));

        let bad: StructuredReply<Vec<Item>> = parse_structured("[{\"id\": \"x\"}]".to_string());
        assert!(matches!(bad, StructuredReply::Unparsed(_)));
    }

    #[tokio::test]
    async fn test_generate_structured_passes_context() {
        let generator = ScriptedGenerator::replying("{\"id\": 9}");
        let reply: StructuredReply<Item> = generate_structured(
            &generator,
            prompts::PHASE_SUBJECTS,
            prompts::TEMPLATE_EXTRACT,
            &json!({"known_subjects": "none"}),
            &json!({"script": "EXT. BEACH - DAY"}),
        )
        .await
        .unwrap();

        assert_eq!(reply, StructuredReply::Parsed(Item { id: 9 }));
        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("Skip anything already in: none"));
        assert!(calls[0].1.contains("EXT. BEACH - DAY"));
    }

    #[tokio::test]
    async fn test_scripted_generator_runs_dry() {
        let generator = ScriptedGenerator::new([]);
        let err = generator.generate("t", "c").await.unwrap_err();
        assert!(err.is_generation_failure());
    }
}
