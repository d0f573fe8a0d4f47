//! JSON blob persistence for project state.
//!
//! Each blob is one file, `<root>/<namespace>/<name>.json`. The namespace
//! string versions the layout: bumping it starts a fresh store.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, ScriptVisionError};
use crate::model::{Shot, Subject};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectMeta {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Everything about a project that outlives a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub meta: ProjectMeta,
    #[serde(default)]
    pub shots: Vec<Shot>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(storage_dir: impl AsRef<Path>, namespace: &str) -> Self {
        Self {
            root: storage_dir.as_ref().join(blob_slug(namespace)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", blob_slug(name)))
    }

    /// Write `value` under `name`, replacing any previous blob whole.
    pub async fn save_blob<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.root).await?;
        let path = self.blob_path(name);
        let tmp = path.with_extension("json.tmp");

        let data = serde_json::to_vec_pretty(value)?;
        let mut out = fs::File::create(&tmp).await?;
        out.write_all(&data).await?;
        out.flush().await?;
        drop(out);

        fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    /// `None` when no blob by that name exists.
    pub async fn load_blob<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.blob_path(name);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    pub async fn delete_blob(&self, name: &str) -> Result<bool> {
        match fs::remove_file(self.blob_path(name)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Names of stored blobs, sorted.
    pub async fn list_blobs(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn save_project(&self, snapshot: &ProjectSnapshot) -> Result<PathBuf> {
        if snapshot.meta.name.trim().is_empty() {
            return Err(ScriptVisionError::EmptyInput("project name".to_string()));
        }
        self.save_blob(&snapshot.meta.name, snapshot).await
    }

    pub async fn load_project(&self, name: &str) -> Result<Option<ProjectSnapshot>> {
        self.load_blob(name).await
    }
}

/// File-name-safe form of a blob or namespace name.
pub fn blob_slug(name: &str) -> String {
    let mut out = String::new();
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() {
            out.push('-');
        }
    }
    let out = out.trim_matches('.').to_string();
    if out.is_empty() { "untitled".to_string() } else { out }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ShotDraft, SubjectCategory, SubjectDraft};

    fn sample() -> ProjectSnapshot {
        ProjectSnapshot {
            meta: ProjectMeta::new("Night Harbor"),
            shots: vec![Shot {
                id: "shot-1".into(),
                draft: ShotDraft::new("1", "1", "Fog rolls in"),
            }],
            subjects: vec![Subject {
                id: "subject-1".into(),
                draft: SubjectDraft::new("Mara", SubjectCategory::People),
            }],
        }
    }

    #[test]
    fn test_slug() {
        assert_eq!(blob_slug("Night Harbor"), "night-harbor");
        assert_eq!(blob_slug("../etc/passwd"), "etcpasswd");
        assert_eq!(blob_slug("  "), "untitled");
    }

    #[tokio::test]
    async fn test_project_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path(), "scriptvision-v1");
        let snapshot = sample();

        let path = store.save_project(&snapshot).await.unwrap();
        assert!(path.ends_with("scriptvision-v1/night-harbor.json"));

        let loaded = store.load_project("Night Harbor").await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(store.list_blobs().await.unwrap(), vec!["night-harbor"]);
    }

    #[tokio::test]
    async fn test_missing_blob_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path(), "v1");
        assert!(store.load_project("ghost").await.unwrap().is_none());
        assert!(!store.delete_blob("ghost").await.unwrap());
        assert!(store.list_blobs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let v1 = ProjectStore::new(dir.path(), "v1");
        let v2 = ProjectStore::new(dir.path(), "v2");
        v1.save_project(&sample()).await.unwrap();
        assert!(v2.load_project("Night Harbor").await.unwrap().is_none());
    }
}
