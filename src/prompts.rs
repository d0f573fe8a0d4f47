//! Prompt templates, keyed by workflow phase and template name.

use serde_json::Value;

use crate::error::{Result, ScriptVisionError};

pub const PHASE_SHOTS: &str = "shots";
pub const PHASE_SUBJECTS: &str = "subjects";

pub const TEMPLATE_SUGGEST: &str = "suggest";
pub const TEMPLATE_GENERATE: &str = "generate";
pub const TEMPLATE_EXTRACT: &str = "extract";

const TEMPLATES: &[(&str, &str, &str)] = &[
    (
        PHASE_SHOTS,
        TEMPLATE_SUGGEST,
        "You are a film director reviewing a shot list against its script.\n\
         Suggest up to {max_suggestions} additional shots that would improve coverage.\n\
         Write each suggestion exactly like this:\n\
         Scene <number>, Shot <number>: <description>\n\
         Shot Size: <ECU|CU|MCU|MS|MWS|WS|EWS>\n\
         People: <who is in frame>\n\
         Location: <where>\n\
         Action: <what happens>\n\
         Dialogue: <spoken lines, if any>\n\
         Reason: <why this shot helps>\n\
         Use a decimal shot number (for example 2.1) to place a shot between existing ones.",
    ),
    (
        PHASE_SHOTS,
        TEMPLATE_GENERATE,
        "You are a film director breaking a script into a shot list.\n\
         Return STRICT JSON with this shape ONLY:\n\
         {\"shots\":[{\"scene\":\"1\",\"shot\":\"1\",\"shotSize\":\"WS\",\"description\":\"...\",\
         \"people\":\"...\",\"action\":\"...\",\"dialogue\":\"...\",\"location\":\"...\",\
         \"cameraAngle\":\"...\",\"cameraMovement\":\"...\",\"notes\":\"...\"}]}\n\
         Number scenes and shots as strings, in script order. Aim for {shots_per_scene} shots per scene.",
    ),
    (
        PHASE_SUBJECTS,
        TEMPLATE_EXTRACT,
        "List the recurring visual subjects of the script: the people, the places and the props.\n\
         Return STRICT JSON with this shape ONLY:\n\
         {\"subjects\":[{\"name\":\"...\",\"category\":\"People|Places|Props\",\"description\":\"...\",\"alias\":\"...\"}]}\n\
         Describe each subject visually in one or two sentences. Skip anything already in: {known_subjects}.",
    ),
];

pub fn template(phase: &str, name: &str) -> Result<&'static str> {
    TEMPLATES
        .iter()
        .find(|(p, t, _)| *p == phase && *t == name)
        .map(|(_, _, body)| *body)
        .ok_or_else(|| ScriptVisionError::UnknownTemplate {
            phase: phase.to_string(),
            template: name.to_string(),
        })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Fill `{key}` placeholders from the string-keyed `vars` object.
///
/// Placeholders with no matching key are left as they are.
pub fn render(phase: &str, name: &str, vars: &Value) -> Result<String> {
    let mut text = template(phase, name)?.to_string();
    if let Some(map) = vars.as_object() {
        for (key, value) in map {
            text = text.replace(&format!("{{{key}}}"), &value_text(value));
        }
    }
    Ok(text)
}

/// Lay out named context blocks as `KEY:` sections for the user message.
pub fn render_context(context: &Value) -> String {
    let Some(map) = context.as_object() else {
        return value_text(context);
    };

    let mut out = String::new();
    for (key, value) in map {
        let text = value_text(value);
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&key.to_uppercase());
        out.push_str(":\n");
        out.push_str(&text);
    }
    out
}
