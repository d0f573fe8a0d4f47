use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;

use crate::config::Config;
use crate::logi;
use crate::store::ProjectStore;

/// Create the storage tree for `cfg` if missing and return the store.
pub async fn ensure_storage(cfg: &Config) -> Result<ProjectStore> {
    let store = ProjectStore::new(&cfg.storage_dir, &cfg.storage_namespace);
    let root: PathBuf = store.root().to_path_buf();
    if fs::metadata(&root).await.is_err() {
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create storage dir {}", root.display()))?;
        logi(format!("Created directory: {}", root.display()));
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_namespaced_root() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            storage_dir: dir.path().join("projects"),
            ..Config::default()
        };
        let store = ensure_storage(&cfg).await.unwrap();
        assert!(store.root().is_dir());
        assert!(store.root().ends_with("projects/scriptvision-v1"));
    }
}
