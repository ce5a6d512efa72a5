//! Atomic single-file asset migration.
//!
//! Provides a thin layer for migrating one asset file in place without ever
//! leaving a half-written document on disk.

use crate::codec::{self, DocumentFormat};
use crate::migration::{MigrationReport, MigrationRunner, UpgraderRegistry};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use xasset_core::{AssetError, Node, Result};

/// A handle to an asset file on disk.
///
/// Writes provide:
/// - **Atomicity**: tmp file + atomic rename, readers see the old or the new
///   document, never a mix
/// - **Isolation**: an exclusive lock serializes concurrent upgrades of the
///   same file
/// - **Durability**: explicit fsync before rename
#[derive(Debug, Clone)]
pub struct AssetFile {
    path: PathBuf,
    format: DocumentFormat,
}

impl AssetFile {
    /// Creates a handle, picking the text format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InvalidDocument`] if the extension is neither a
    /// known text format nor a registered asset extension.
    pub fn new(path: PathBuf) -> Result<Self> {
        let format = DocumentFormat::from_path(&path).ok_or_else(|| {
            AssetError::invalid_document(path.display().to_string(), "unrecognized file extension")
        })?;
        Ok(Self::with_format(path, format))
    }

    pub fn with_format(path: PathBuf, format: DocumentFormat) -> Self {
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Loads and parses the file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Node))`: Successfully loaded and parsed
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read or parse the file
    pub fn load(&self) -> Result<Option<Node>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        codec::parse_document(&content, self.format).map(Some)
    }

    /// Renders `document` and replaces the file atomically.
    pub fn save(&self, document: &Node) -> Result<()> {
        let text = codec::render_document(document, self.format)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.sibling_path("tmp")?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(text.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        Ok(())
    }

    /// Migrates the file to the current version of `schema`.
    ///
    /// The file is rewritten only when at least one upgrader ran; a current
    /// document is left byte-for-byte untouched. A failed migration never
    /// writes, so the file keeps its original content.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InvalidDocument`] for a missing or empty file,
    /// plus every error the codec or [`MigrationRunner`] can return.
    pub fn upgrade(&self, registry: &UpgraderRegistry, schema: &str) -> Result<MigrationReport> {
        let _lock = FileLock::acquire(&self.sibling_path("lock")?)?;
        let file = self.path.display().to_string();

        let mut document = self
            .load()?
            .ok_or_else(|| AssetError::invalid_document(&file, "file is missing or empty"))?;

        let report =
            MigrationRunner::new(registry).migrate_to_current(&mut document, schema, Some(&file))?;

        if !report.is_noop() {
            self.save(&document)?;
            tracing::info!(
                "Saved upgraded asset '{}' ({} -> {})",
                file,
                report.stamped,
                report.target
            );
        }

        Ok(report)
    }

    /// `dir/.name.<suffix>`, next to the asset so rename stays on one
    /// filesystem.
    fn sibling_path(&self, suffix: &str) -> Result<PathBuf> {
        let file_name = self.path.file_name().ok_or_else(|| {
            AssetError::io(format!("Path '{}' has no file name", self.path.display()))
        })?;
        let name = format!(".{}.{}", file_name.to_string_lossy(), suffix);

        Ok(match self.path.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        })
    }
}

/// An exclusive lock held for as long as the guard lives.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(lock_path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)?;

        file.lock_exclusive().map_err(|e| {
            AssetError::io(format!(
                "Failed to acquire lock '{}': {}",
                lock_path.display(),
                e
            ))
        })?;

        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // The lock file stays: a waiting process may already hold a handle to it.
        let _ = self.file.unlock();
    }
}
