//! Error types shared by every xasset crate.

use crate::version::FormatVersion;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for asset loading and migration.
///
/// Variants carry the schema name, the file identity and both versions so the
/// caller can tell a too-old tool (`FutureVersion`) apart from a corrupt or
/// unsupported asset (`NoUpgradePath`).
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssetError {
    /// The stamped version text is not `MAJOR.MINOR.PATCH[-PRERELEASE]`.
    #[error("Malformed version '{text}': {reason}")]
    MalformedVersion { text: String, reason: String },

    /// The document was written by a newer tool than this one understands.
    #[error(
        "Asset '{file}' ({schema}) is stamped {stamped}, newer than the supported version {target}"
    )]
    FutureVersion {
        schema: String,
        file: String,
        stamped: FormatVersion,
        target: FormatVersion,
    },

    /// No registered upgrader covers the stamped version.
    #[error("No upgrade path for asset '{file}' ({schema}) from {stamped} to {target}")]
    NoUpgradePath {
        schema: String,
        file: String,
        stamped: FormatVersion,
        target: FormatVersion,
    },

    /// The upgrade chain did not converge within its iteration bound.
    #[error("Migration loop detected for asset '{file}' ({schema}) after {iterations} steps")]
    MigrationLoopDetected {
        schema: String,
        file: String,
        iterations: usize,
    },

    /// An upgrader could not interpret a legacy field.
    #[error("Upgrade of asset '{file}' ({schema}) failed on field '{field}': {reason}")]
    TransformFailed {
        schema: String,
        file: String,
        field: String,
        reason: String,
    },

    /// An upgrader was registered for a schema that was never declared.
    #[error("Unknown schema: {0}")]
    UnknownSchema(String),

    /// A schema was declared twice.
    #[error("Schema already declared: {0}")]
    DuplicateSchema(String),

    /// An upgrader range is empty or reversed.
    #[error("Invalid upgrader range for {schema}: [{from}, {to})")]
    InvalidRange {
        schema: String,
        from: FormatVersion,
        to: FormatVersion,
    },

    /// An upgrader range ends past the schema's current version.
    #[error("Upgrader range for {schema} ends at {to}, past the current version {target}")]
    RangeExceedsTarget {
        schema: String,
        to: FormatVersion,
        target: FormatVersion,
    },

    /// Two upgrader ranges of one schema intersect.
    #[error("Overlapping upgrader ranges for {schema}: [{existing_from}, {existing_to}) and [{from}, {to})")]
    OverlappingRange {
        schema: String,
        existing_from: FormatVersion,
        existing_to: FormatVersion,
        from: FormatVersion,
        to: FormatVersion,
    },

    /// Consecutive upgrader ranges of one schema leave versions uncovered.
    #[error("Gap in upgrader ranges for {schema}: nothing covers [{from}, {to})")]
    RangeGap {
        schema: String,
        from: FormatVersion,
        to: FormatVersion,
    },

    /// The document does not have the shape migration expects.
    #[error("Invalid document '{file}': {message}")]
    InvalidDocument { file: String, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "YAML", "JSON", "TOML"
        message: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },
}

impl AssetError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a MalformedVersion error
    pub fn malformed_version(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedVersion {
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// Creates an InvalidDocument error
    pub fn invalid_document(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Creates a Serialization error
    pub fn serialization(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialization {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a MalformedVersion error
    pub fn is_malformed_version(&self) -> bool {
        matches!(self, Self::MalformedVersion { .. })
    }

    /// Check if this is a FutureVersion error
    pub fn is_future_version(&self) -> bool {
        matches!(self, Self::FutureVersion { .. })
    }

    /// Check if this is a NoUpgradePath error
    pub fn is_no_upgrade_path(&self) -> bool {
        matches!(self, Self::NoUpgradePath { .. })
    }

    /// Check if this is a TransformFailed error
    pub fn is_transform_failed(&self) -> bool {
        matches!(self, Self::TransformFailed { .. })
    }

    /// Check if this error comes from registering upgraders.
    ///
    /// These indicate a programming error in the schema owner's setup rather
    /// than a problem with any particular asset.
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            Self::UnknownSchema(_)
                | Self::DuplicateSchema(_)
                | Self::InvalidRange { .. }
                | Self::RangeExceedsTarget { .. }
                | Self::OverlappingRange { .. }
                | Self::RangeGap { .. }
        )
    }

    /// Check if this error aborts the migration of a single document.
    pub fn is_migration(&self) -> bool {
        matches!(
            self,
            Self::MalformedVersion { .. }
                | Self::FutureVersion { .. }
                | Self::NoUpgradePath { .. }
                | Self::MigrationLoopDetected { .. }
                | Self::TransformFailed { .. }
                | Self::InvalidDocument { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for AssetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for AssetError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("JSON", err.to_string())
    }
}

impl From<serde_yaml::Error> for AssetError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization("YAML", err.to_string())
    }
}

impl From<toml::de::Error> for AssetError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization("TOML", err.to_string())
    }
}

impl From<toml::ser::Error> for AssetError {
    fn from(err: toml::ser::Error) -> Self {
        Self::serialization("TOML", err.to_string())
    }
}

/// A type alias for `Result<T, AssetError>`.
pub type Result<T> = std::result::Result<T, AssetError>;
