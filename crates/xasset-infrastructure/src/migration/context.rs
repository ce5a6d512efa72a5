//! Per-run migration context handed to every upgrader.

use std::fmt;
use xasset_core::{AssetError, FormatVersion};

/// File identity used when a document did not come from a file.
pub const IN_MEMORY_FILE: &str = "<memory>";

/// Immutable description of one migration run.
///
/// Carries the asset's logical path, the schema, and the stamped/target
/// version pair so that upgraders and the runner can report errors a human can
/// act on. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationContext {
    file: Option<String>,
    schema: String,
    stamped: FormatVersion,
    target: FormatVersion,
}

impl MigrationContext {
    pub fn new(
        file: Option<&str>,
        schema: impl Into<String>,
        stamped: FormatVersion,
        target: FormatVersion,
    ) -> Self {
        Self {
            file: file.map(str::to_string),
            schema: schema.into(),
            stamped,
            target,
        }
    }

    /// The asset's logical path, or [`IN_MEMORY_FILE`].
    pub fn file(&self) -> &str {
        self.file.as_deref().unwrap_or(IN_MEMORY_FILE)
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Version the document was stamped with when the run started.
    pub fn stamped_version(&self) -> &FormatVersion {
        &self.stamped
    }

    pub fn target_version(&self) -> &FormatVersion {
        &self.target
    }

    /// Emits a warning tagged with this run's file and schema.
    pub fn warn(&self, message: impl fmt::Display) {
        tracing::warn!(file = self.file(), schema = %self.schema, "{}", message);
    }

    /// Builds the error an upgrader returns for an uninterpretable field.
    pub fn transform_failed(&self, field: &str, reason: impl Into<String>) -> AssetError {
        AssetError::TransformFailed {
            schema: self.schema.clone(),
            file: self.file().to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn future_version(&self, stamped: &FormatVersion) -> AssetError {
        AssetError::FutureVersion {
            schema: self.schema.clone(),
            file: self.file().to_string(),
            stamped: stamped.clone(),
            target: self.target.clone(),
        }
    }

    pub(crate) fn no_upgrade_path(&self, stamped: &FormatVersion) -> AssetError {
        AssetError::NoUpgradePath {
            schema: self.schema.clone(),
            file: self.file().to_string(),
            stamped: stamped.clone(),
            target: self.target.clone(),
        }
    }

    pub(crate) fn loop_detected(&self, iterations: usize) -> AssetError {
        AssetError::MigrationLoopDetected {
            schema: self.schema.clone(),
            file: self.file().to_string(),
            iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_defaults_to_memory() {
        let context = MigrationContext::new(
            None,
            "SpriteFont",
            FormatVersion::ZERO,
            FormatVersion::new(1, 0, 0),
        );
        assert_eq!(context.file(), IN_MEMORY_FILE);
    }

    #[test]
    fn test_transform_failed_carries_identity() {
        let context = MigrationContext::new(
            Some("fonts/Title.xkfnt"),
            "SpriteFont",
            FormatVersion::ZERO,
            FormatVersion::new(1, 0, 0),
        );

        match context.transform_failed("IsDynamic", "expected a boolean") {
            AssetError::TransformFailed {
                schema,
                file,
                field,
                reason,
            } => {
                assert_eq!(schema, "SpriteFont");
                assert_eq!(file, "fonts/Title.xkfnt");
                assert_eq!(field, "IsDynamic");
                assert_eq!(reason, "expected a boolean");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
