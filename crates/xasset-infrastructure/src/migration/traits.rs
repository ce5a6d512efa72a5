//! Core traits for the upgrade framework.

use super::context::MigrationContext;
use std::fmt;
use xasset_core::{FormatVersion, Mapping, Result};

/// A transformation that advances a document through one version range.
///
/// The range is half-open: an upgrader applies to every stamped version `v`
/// with `from_version() <= v < to_version()`, and leaves the document at
/// `to_version()`.
///
/// Implementations edit the document in place and must be deterministic. They
/// must not perform I/O or keep references to the document after returning.
pub trait Upgrader: Send + Sync + fmt::Debug {
    /// Name of the schema this upgrader belongs to.
    fn schema_name(&self) -> &str;

    /// First version this upgrader applies to (inclusive).
    fn from_version(&self) -> FormatVersion;

    /// Version the document is stamped with afterwards (exclusive bound of the range).
    fn to_version(&self) -> FormatVersion;

    /// Checks if this upgrader applies to a document stamped `version`.
    fn contains(&self, version: &FormatVersion) -> bool {
        &self.from_version() <= version && version < &self.to_version()
    }

    /// Returns a human-readable description of this upgrader.
    ///
    /// Used for logging and migration reports.
    fn description(&self) -> &str;

    /// Rewrites the document's root mapping.
    ///
    /// # Errors
    ///
    /// Returns [`xasset_core::AssetError::TransformFailed`] (usually built with
    /// [`MigrationContext::transform_failed`]) when a legacy field holds a
    /// value the upgrader cannot interpret.
    fn upgrade(&self, asset: &mut Mapping, context: &MigrationContext) -> Result<()>;
}

type TransformFn = dyn Fn(&mut Mapping, &MigrationContext) -> Result<()> + Send + Sync;

/// An [`Upgrader`] backed by a plain function or closure.
///
/// Lets schema owners register a transform without declaring a type for it.
pub struct FnUpgrader {
    schema: String,
    from: FormatVersion,
    to: FormatVersion,
    description: String,
    transform: Box<TransformFn>,
}

impl FnUpgrader {
    pub fn new<F>(
        schema: impl Into<String>,
        from: FormatVersion,
        to: FormatVersion,
        description: impl Into<String>,
        transform: F,
    ) -> Self
    where
        F: Fn(&mut Mapping, &MigrationContext) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            schema: schema.into(),
            from,
            to,
            description: description.into(),
            transform: Box::new(transform),
        }
    }
}

impl fmt::Debug for FnUpgrader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnUpgrader")
            .field("schema", &self.schema)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Upgrader for FnUpgrader {
    fn schema_name(&self) -> &str {
        &self.schema
    }

    fn from_version(&self) -> FormatVersion {
        self.from.clone()
    }

    fn to_version(&self) -> FormatVersion {
        self.to.clone()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn upgrade(&self, asset: &mut Mapping, context: &MigrationContext) -> Result<()> {
        (self.transform)(asset, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> FormatVersion {
        FormatVersion::parse(text).unwrap()
    }

    #[test]
    fn test_contains_is_half_open() {
        let upgrader = FnUpgrader::new("Model", v("1.0.0"), v("2.0.0"), "noop", |_, _| Ok(()));

        assert!(upgrader.contains(&v("1.0.0")));
        assert!(upgrader.contains(&v("1.9.9")));
        assert!(upgrader.contains(&v("2.0.0-rc1")));
        assert!(!upgrader.contains(&v("2.0.0")));
        assert!(!upgrader.contains(&v("1.0.0-alpha1")));
    }

    #[test]
    fn test_fn_upgrader_runs_transform() {
        let upgrader = FnUpgrader::new("Model", v("1.0.0"), v("2.0.0"), "add scale", |asset, _| {
            asset.insert("Scale", 1.0);
            Ok(())
        });
        let context = MigrationContext::new(None, "Model", v("1.0.0"), v("2.0.0"));

        let mut asset = Mapping::new();
        upgrader.upgrade(&mut asset, &context).unwrap();

        assert_eq!(asset.get("Scale").and_then(|n| n.as_scalar()?.as_f64()), Some(1.0));
        assert!(format!("{upgrader:?}").contains("add scale"));
    }
}
