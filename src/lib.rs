use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod generation;
pub mod init;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod prompts;
pub mod review;
pub mod store;
pub mod workspace;

pub use error::{Result, ScriptVisionError};
pub use extract::{
    Extraction, SkipReason, Strategy, extract_shots, extract_shots_with_report, extract_subjects,
    extract_subjects_with_report,
};
pub use merge::{merge_shots, merge_subjects, merge_subjects_with_report};
pub use model::{IdGenerator, Shot, ShotDraft, Subject, SubjectCategory, SuggestedShot};
pub use review::ReviewBatch;
pub use workspace::Workspace;

/// Receives every formatted log line, e.g. for a host UI log panel.
pub type LogHook = Arc<Mutex<dyn Fn(&str) + Send + Sync + 'static>>;

static LOG_HOOK: Lazy<Mutex<Option<LogHook>>> = Lazy::new(|| Mutex::new(None));

pub fn set_log_hook(hook: Option<LogHook>) {
    if let Ok(mut guard) = LOG_HOOK.lock() {
        *guard = hook;
    }
}

pub(crate) fn logv(tag: &str, message: &str) {
    match tag {
        "WARN" => tracing::warn!("{}", message),
        _ => tracing::info!(tag = tag, "{}", message),
    }

    if let Ok(guard) = LOG_HOOK.lock() {
        if let Some(hook) = guard.as_ref() {
            if let Ok(callback) = hook.lock() {
                let line = format!("[{}] {}", tag, message);
                callback(&line);
            }
        }
    }
}

pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_hook_receives_tagged_lines() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook: LogHook = Arc::new(Mutex::new(move |line: &str| {
            if let Ok(mut lines) = sink.lock() {
                lines.push(line.to_string());
            }
        }));

        set_log_hook(Some(hook));
        logw("hook check");
        set_log_hook(None);
        logw("after removal");

        let lines = seen.lock().unwrap();
        assert!(lines.iter().any(|l| l == "[WARN] hook check"));
        assert!(!lines.iter().any(|l| l.contains("after removal")));
    }
}
