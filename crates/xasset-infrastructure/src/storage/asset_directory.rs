//! Batch migration of every asset under a directory.

use super::asset_file::AssetFile;
use crate::migration::{AssetKind, MigrationReport, UpgraderRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::task;
use xasset_core::{AssetError, Result};

/// Outcome of migrating one file in a batch.
#[derive(Debug)]
pub struct AssetUpgrade {
    pub path: PathBuf,
    pub kind: AssetKind,
    pub result: Result<MigrationReport>,
}

/// Async batch migration over a directory tree.
///
/// Directory structure:
/// ```text
/// root/
/// ├── fonts/
/// │   ├── Title.xkfnt
/// │   └── Legacy.pdxfnt
/// └── Body.xkfnt
/// ```
///
/// Files whose extension belongs to no [`AssetKind`] are skipped. Each file is
/// migrated on the blocking pool; a failure is reported for that file and
/// does not abort the batch.
#[derive(Debug, Clone)]
pub struct AsyncAssetDirectory {
    root: PathBuf,
    registry: Arc<UpgraderRegistry>,
}

impl AsyncAssetDirectory {
    pub fn new(root: impl Into<PathBuf>, registry: Arc<UpgraderRegistry>) -> Self {
        Self {
            root: root.into(),
            registry,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists asset files under the root, recursively, sorted by path.
    ///
    /// A missing root yields an empty list.
    pub async fn list_assets(&self) -> Result<Vec<(PathBuf, AssetKind)>> {
        if !fs::try_exists(&self.root).await? {
            return Ok(Vec::new());
        }

        let mut assets = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(|e| {
                AssetError::io(format!(
                    "Failed to read asset directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(kind) = AssetKind::from_path(&path) {
                    assets.push((path, kind));
                }
            }
        }

        assets.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(assets)
    }

    /// Migrates every asset under the root to its kind's current version.
    ///
    /// # Errors
    ///
    /// Only directory scanning errors fail the whole call; per-file errors are
    /// returned in [`AssetUpgrade::result`].
    pub async fn upgrade_all(&self) -> Result<Vec<AssetUpgrade>> {
        let assets = self.list_assets().await?;

        let tasks = assets.into_iter().map(|(path, kind)| {
            let registry = Arc::clone(&self.registry);
            async move {
                let file_path = path.clone();
                let result = task::spawn_blocking(move || {
                    AssetFile::new(file_path)?.upgrade(&registry, kind.schema())
                })
                .await
                .map_err(|e| AssetError::io(format!("Failed to spawn blocking task: {}", e)))
                .and_then(|result| result);

                AssetUpgrade { path, kind, result }
            }
        });

        let results = futures::future::join_all(tasks).await;

        let upgraded = results
            .iter()
            .filter(|r| r.result.as_ref().is_ok_and(|report| !report.is_noop()))
            .count();
        let failed = results.iter().filter(|r| r.result.is_err()).count();
        tracing::info!(
            "Scanned {} assets in '{}': {} upgraded, {} failed",
            results.len(),
            self.root.display(),
            upgraded,
            failed
        );

        Ok(results)
    }
}
