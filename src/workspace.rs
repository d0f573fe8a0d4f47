//! Application state for one open project and the pipeline operations on it.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::error::{Result, ScriptVisionError};
use crate::extract::{
    ShotObject, SkipReason, Strategy, extract_shots_with_report, extract_subjects_with_report,
    loose_string,
};
use crate::generation::{StructuredReply, TextGenerator, generate_structured};
use crate::merge::{merge_shots, merge_subjects_with_report, sort_shots};
use crate::model::{IdGenerator, Shot, ShotDraft, Subject, SubjectDraft, SuggestedShot};
use crate::normalize::normalize_response;
use crate::prompts::{self, PHASE_SHOTS, PHASE_SUBJECTS, TEMPLATE_EXTRACT, TEMPLATE_GENERATE, TEMPLATE_SUGGEST};
use crate::review::ReviewBatch;
use crate::store::{ProjectMeta, ProjectSnapshot};
use crate::{logi, logok, logw};

const DEFAULT_MAX_SUGGESTIONS: u32 = 8;
const SHOTS_PER_SCENE: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionOutcome {
    /// This many candidates are waiting for review.
    Suggested(usize),
    /// The reply held nothing recognizable. Not a failure.
    NoSuggestions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(usize),
    NothingParsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotListOutcome {
    /// The canonical list was replaced. `strategy` is `None` when the reply
    /// validated as structured JSON.
    Replaced {
        count: usize,
        strategy: Option<Strategy>,
    },
    NothingParsed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub skipped: Vec<SkipReason>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ShotListReply {
    Wrapped { shots: Vec<ShotDraft> },
    Bare(Vec<ShotDraft>),
}

impl ShotListReply {
    fn into_drafts(self) -> Vec<ShotDraft> {
        match self {
            Self::Wrapped { shots } | Self::Bare(shots) => shots,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubjectListReply {
    Wrapped { subjects: Vec<SubjectDraft> },
    Bare(Vec<SubjectDraft>),
}

impl SubjectListReply {
    fn into_drafts(self) -> Vec<SubjectDraft> {
        match self {
            Self::Wrapped { subjects } | Self::Bare(subjects) => subjects,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImportedShot {
    #[serde(default, deserialize_with = "loose_string")]
    id: Option<String>,
    #[serde(flatten)]
    shot: ShotObject,
}

/// One open project: canonical shots and subjects, plus the batches of
/// generated candidates waiting for review.
///
/// Canonical collections sit behind `Arc` and are copied on write, so a
/// snapshot from [`Workspace::shots`] never changes under its holder.
#[derive(Debug)]
pub struct Workspace {
    meta: ProjectMeta,
    shots: Arc<Vec<Shot>>,
    subjects: Arc<Vec<Subject>>,
    suggested_shots: ReviewBatch<SuggestedShot>,
    proposed_subjects: ReviewBatch<SubjectDraft>,
    ids: IdGenerator,
    max_suggestions: u32,
}

impl Workspace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: ProjectMeta::new(name),
            shots: Arc::new(Vec::new()),
            subjects: Arc::new(Vec::new()),
            suggested_shots: ReviewBatch::default(),
            proposed_subjects: ReviewBatch::default(),
            ids: IdGenerator::new(),
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
        }
    }

    pub fn from_snapshot(snapshot: ProjectSnapshot) -> Self {
        let mut shots = snapshot.shots;
        sort_shots(&mut shots);
        Self {
            meta: snapshot.meta,
            shots: Arc::new(shots),
            subjects: Arc::new(snapshot.subjects),
            ..Self::new(String::new())
        }
    }

    pub fn with_max_suggestions(mut self, max: u32) -> Self {
        self.max_suggestions = max.max(1);
        self
    }

    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            meta: self.meta.clone(),
            shots: self.shots.to_vec(),
            subjects: self.subjects.to_vec(),
        }
    }

    pub fn meta(&self) -> &ProjectMeta {
        &self.meta
    }

    pub fn shots(&self) -> Arc<Vec<Shot>> {
        Arc::clone(&self.shots)
    }

    pub fn subjects(&self) -> Arc<Vec<Subject>> {
        Arc::clone(&self.subjects)
    }

    pub fn suggested_shots(&self) -> &ReviewBatch<SuggestedShot> {
        &self.suggested_shots
    }

    pub fn suggested_shots_mut(&mut self) -> &mut ReviewBatch<SuggestedShot> {
        &mut self.suggested_shots
    }

    pub fn proposed_subjects(&self) -> &ReviewBatch<SubjectDraft> {
        &self.proposed_subjects
    }

    pub fn proposed_subjects_mut(&mut self) -> &mut ReviewBatch<SubjectDraft> {
        &mut self.proposed_subjects
    }

    fn touch(&mut self) {
        self.meta.updated_at = chrono::Utc::now();
    }

    fn replace_shots(&mut self, shots: Vec<Shot>) {
        self.shots = Arc::new(shots);
        self.touch();
    }

    fn replace_subjects(&mut self, subjects: Vec<Subject>) {
        self.subjects = Arc::new(subjects);
        self.touch();
    }

    fn shot_list_text(&self) -> String {
        self.shots
            .iter()
            .map(|s| format!("{}: {} ({})", s.label(), s.draft.description, s.draft.shot_size))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Ask the generator for extra shots and queue them for review.
    ///
    /// Generation errors are returned unchanged. A reply with nothing
    /// recognizable leaves the current batch alone and reports
    /// [`SuggestionOutcome::NoSuggestions`].
    pub async fn suggest_shots(
        &mut self,
        generator: &dyn TextGenerator,
        script: &str,
    ) -> Result<SuggestionOutcome> {
        if script.trim().is_empty() {
            return Err(ScriptVisionError::EmptyInput("script".to_string()));
        }

        let task = prompts::render(
            PHASE_SHOTS,
            TEMPLATE_SUGGEST,
            &json!({"max_suggestions": self.max_suggestions}),
        )?;
        let context = prompts::render_context(&json!({
            "script": script,
            "current shot list": self.shot_list_text(),
        }));

        logi(format!("Requesting shot suggestions ({} shots in list)...", self.shots.len()));
        let raw = generator.generate(&task, &context).await?;
        let text = normalize_response(&raw)?;

        let extraction = extract_shots_with_report(&text);
        log_skipped(&extraction.skipped);
        let Some(strategy) = extraction.strategy else {
            logw("No shot suggestions found in the reply.");
            return Ok(SuggestionOutcome::NoSuggestions);
        };

        let count = extraction.records.len();
        self.suggested_shots = ReviewBatch::new(extraction.records, false);
        logok(format!("Parsed {} shot suggestions ({})", count, strategy));
        Ok(SuggestionOutcome::Suggested(count))
    }

    /// Merge the selected suggestions into the shot list and clear the batch.
    pub fn commit_suggested_shots(&mut self) -> usize {
        let accepted = self.suggested_shots.commit();
        let count = accepted.len();
        if count > 0 {
            let merged = merge_shots(
                &self.shots,
                accepted.into_iter().map(|s| s.draft),
                &self.ids,
            );
            self.replace_shots(merged);
            logok(format!("Added {} suggested shots", count));
        }
        count
    }

    /// Build a whole new shot list from `script`.
    ///
    /// Asks for strict JSON; if the reply does not validate, the same text
    /// goes through the free-text extractor. The current list is only
    /// replaced when something was recovered.
    pub async fn generate_shot_list(
        &mut self,
        generator: &dyn TextGenerator,
        script: &str,
    ) -> Result<ShotListOutcome> {
        if script.trim().is_empty() {
            return Err(ScriptVisionError::EmptyInput("script".to_string()));
        }

        logi("Requesting shot list...");
        let reply = generate_structured::<ShotListReply>(
            generator,
            PHASE_SHOTS,
            TEMPLATE_GENERATE,
            &json!({"shots_per_scene": SHOTS_PER_SCENE}),
            &json!({"script": script}),
        )
        .await?;

        let (drafts, strategy) = match reply {
            StructuredReply::Parsed(reply) => {
                let drafts: Vec<ShotDraft> = reply
                    .into_drafts()
                    .into_iter()
                    .filter(ShotDraft::has_required_fields)
                    .map(|mut d| {
                        d.apply_defaults();
                        d
                    })
                    .collect();
                (drafts, None)
            }
            StructuredReply::Unparsed(raw) => {
                logw("Shot list reply was not valid JSON; falling back to text extraction.");
                let text = normalize_response(&raw)?;
                let extraction = extract_shots_with_report(&text);
                log_skipped(&extraction.skipped);
                let drafts = extraction.records.into_iter().map(|s| s.draft).collect();
                (drafts, extraction.strategy)
            }
        };

        if drafts.is_empty() {
            logw("No shots recovered from the reply.");
            return Ok(ShotListOutcome::NothingParsed);
        }

        let count = drafts.len();
        let shots = merge_shots(&[], drafts, &self.ids);
        self.replace_shots(shots);
        logok(format!("Shot list generated: {} shots", count));
        Ok(ShotListOutcome::Replaced { count, strategy })
    }

    /// Find people, places and props in `script` and queue them for review.
    pub async fn extract_subjects(
        &mut self,
        generator: &dyn TextGenerator,
        script: &str,
    ) -> Result<SuggestionOutcome> {
        if script.trim().is_empty() {
            return Err(ScriptVisionError::EmptyInput("script".to_string()));
        }

        let known: Vec<&str> = self.subjects.iter().map(|s| s.draft.name.as_str()).collect();
        let known = if known.is_empty() { "none".to_string() } else { known.join(", ") };

        logi("Requesting subject extraction...");
        let reply = generate_structured::<SubjectListReply>(
            generator,
            PHASE_SUBJECTS,
            TEMPLATE_EXTRACT,
            &json!({"known_subjects": known}),
            &json!({"script": script}),
        )
        .await?;

        let drafts: Vec<SubjectDraft> = match reply {
            StructuredReply::Parsed(reply) => reply
                .into_drafts()
                .into_iter()
                .filter(|d| !d.name.trim().is_empty())
                .collect(),
            StructuredReply::Unparsed(raw) => {
                logw("Subject reply was not valid JSON; falling back to text extraction.");
                let text = normalize_response(&raw)?;
                let extraction = extract_subjects_with_report(&text);
                log_skipped(&extraction.skipped);
                extraction.records
            }
        };

        if drafts.is_empty() {
            logw("No subjects found in the reply.");
            return Ok(SuggestionOutcome::NoSuggestions);
        }

        let count = drafts.len();
        self.proposed_subjects = ReviewBatch::new(drafts, true);
        logok(format!("Proposed {} subjects", count));
        Ok(SuggestionOutcome::Suggested(count))
    }

    /// Merge the selected proposals into the subject list and clear the batch.
    ///
    /// Proposals whose name matches an existing subject, ignoring case, are
    /// dropped and listed in the report.
    pub fn merge_proposed_subjects(&mut self) -> MergeReport {
        let accepted = self.proposed_subjects.commit();
        if accepted.is_empty() {
            return MergeReport::default();
        }

        let before = self.subjects.len();
        let (merged, skipped) = merge_subjects_with_report(&self.subjects, accepted, &self.ids);
        let added = merged.len() - before;
        self.replace_subjects(merged);
        log_skipped(&skipped);
        logok(format!("Added {} subjects ({} duplicates dropped)", added, skipped.len()));
        MergeReport { added, skipped }
    }

    /// Manual import of shots from pasted text.
    ///
    /// A JSON array of shot objects is taken element by element, keeping any
    /// id that is not already in use. Scalar fields may be strings or numbers.
    /// Anything else goes through the free-text extractor.
    pub fn import_shots(&mut self, text: &str) -> ImportOutcome {
        let trimmed = text.trim();

        if trimmed.starts_with('[') {
            match serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
                Ok(elements) => return self.import_records(elements),
                Err(err) => {
                    logw(format!("Import is not a shot array ({err}); trying text extraction."));
                }
            }
        }

        let extraction = extract_shots_with_report(trimmed);
        log_skipped(&extraction.skipped);
        if extraction.is_empty() {
            logw("Nothing to import.");
            return ImportOutcome::NothingParsed;
        }

        let count = extraction.records.len();
        let merged = merge_shots(
            &self.shots,
            extraction.records.into_iter().map(|s| s.draft),
            &self.ids,
        );
        self.replace_shots(merged);
        logok(format!("Imported {} shots", count));
        ImportOutcome::Imported(count)
    }

    fn import_records(&mut self, elements: Vec<serde_json::Value>) -> ImportOutcome {
        let mut taken: HashSet<String> = self.shots.iter().map(|s| s.id.clone()).collect();
        let mut merged = self.shots.to_vec();
        let mut count = 0;

        for (index, element) in elements.into_iter().enumerate() {
            let record: ImportedShot = match serde_json::from_value(element) {
                Ok(record) => record,
                Err(err) => {
                    tracing::debug!(index, error = %err, "import element is not a shot object");
                    continue;
                }
            };
            if let Some(field) = record.shot.missing_required() {
                tracing::debug!(index, field, "import element missing required field");
                continue;
            }
            let draft = record.shot.into_suggestion().draft;

            let id = record
                .id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty() && !taken.contains(id))
                .unwrap_or_else(|| self.ids.next_unused("shot", &taken));
            taken.insert(id.clone());
            merged.push(Shot { id, draft });
            count += 1;
        }

        if count == 0 {
            logw("Nothing to import.");
            return ImportOutcome::NothingParsed;
        }

        sort_shots(&mut merged);
        self.replace_shots(merged);
        logok(format!("Imported {} shots", count));
        ImportOutcome::Imported(count)
    }

    pub fn add_shot(&mut self, mut draft: ShotDraft) -> Result<String> {
        require_shot_fields(&draft)?;
        draft.apply_defaults();
        let merged = merge_shots(&self.shots, [draft], &self.ids);
        let known: HashSet<&str> = self.shots.iter().map(|s| s.id.as_str()).collect();
        let id = merged
            .iter()
            .map(|s| s.id.clone())
            .find(|id| !known.contains(id.as_str()))
            .unwrap_or_default();
        self.replace_shots(merged);
        Ok(id)
    }

    pub fn update_shot(&mut self, id: &str, mut draft: ShotDraft) -> Result<()> {
        require_shot_fields(&draft)?;
        draft.apply_defaults();
        let shots = Arc::make_mut(&mut self.shots);
        let shot = shots
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ScriptVisionError::not_found("shot", id))?;
        shot.draft = draft;
        sort_shots(shots);
        self.touch();
        Ok(())
    }

    pub fn delete_shot(&mut self, id: &str) -> Result<()> {
        if !self.shots.iter().any(|s| s.id == id) {
            return Err(ScriptVisionError::not_found("shot", id));
        }
        Arc::make_mut(&mut self.shots).retain(|s| s.id != id);
        self.touch();
        Ok(())
    }

    /// Add a subject by hand. Names must stay unique ignoring case.
    pub fn add_subject(&mut self, draft: SubjectDraft) -> Result<String> {
        if draft.name.trim().is_empty() {
            return Err(ScriptVisionError::EmptyInput("subject name".to_string()));
        }
        if self.subjects.iter().any(|s| s.draft.name_key() == draft.name_key()) {
            return Err(ScriptVisionError::DuplicateSubject(draft.name));
        }

        let taken: HashSet<String> = self.subjects.iter().map(|s| s.id.clone()).collect();
        let id = self.ids.next_unused("subject", &taken);
        Arc::make_mut(&mut self.subjects).push(Subject {
            id: id.clone(),
            draft,
        });
        self.touch();
        Ok(id)
    }

    pub fn update_subject(&mut self, id: &str, draft: SubjectDraft) -> Result<()> {
        if draft.name.trim().is_empty() {
            return Err(ScriptVisionError::EmptyInput("subject name".to_string()));
        }
        if self
            .subjects
            .iter()
            .any(|s| s.id != id && s.draft.name_key() == draft.name_key())
        {
            return Err(ScriptVisionError::DuplicateSubject(draft.name));
        }

        let subjects = Arc::make_mut(&mut self.subjects);
        let subject = subjects
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ScriptVisionError::not_found("subject", id))?;
        subject.draft = draft;
        self.touch();
        Ok(())
    }

    pub fn set_subject_active(&mut self, id: &str, active: bool) -> Result<()> {
        let subjects = Arc::make_mut(&mut self.subjects);
        let subject = subjects
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ScriptVisionError::not_found("subject", id))?;
        subject.draft.active = active;
        self.touch();
        Ok(())
    }

    /// Flip whether a subject is in use. Returns the new state.
    pub fn toggle_subject_active(&mut self, id: &str) -> Result<bool> {
        let active = self
            .subjects
            .iter()
            .find(|s| s.id == id)
            .map(|s| !s.draft.active)
            .ok_or_else(|| ScriptVisionError::not_found("subject", id))?;
        self.set_subject_active(id, active)?;
        Ok(active)
    }

    pub fn delete_subject(&mut self, id: &str) -> Result<()> {
        if !self.subjects.iter().any(|s| s.id == id) {
            return Err(ScriptVisionError::not_found("subject", id));
        }
        Arc::make_mut(&mut self.subjects).retain(|s| s.id != id);
        self.touch();
        Ok(())
    }
}

fn require_shot_fields(draft: &ShotDraft) -> Result<()> {
    if draft.has_required_fields() {
        Ok(())
    } else {
        Err(ScriptVisionError::EmptyInput(
            "scene, shot and description".to_string(),
        ))
    }
}

fn log_skipped(skipped: &[SkipReason]) {
    for reason in skipped {
        tracing::debug!(%reason, "candidate skipped");
    }
    if !skipped.is_empty() {
        logw(format!("{} candidates skipped", skipped.len()));
    }
}
