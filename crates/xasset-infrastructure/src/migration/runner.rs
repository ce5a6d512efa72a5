//! Drives a document through its schema's upgrade chain.
//!
//! A run is a small state machine:
//!
//! ```text
//! Start ──► Upgrading ──► ... ──► Done
//!   │           │
//!   └───────────┴──────────────► Failed
//! ```
//!
//! Each [`MigrationRun::step`] either applies one upgrader and re-stamps the
//! document, or settles the run in `Done` or `Failed`. A failed document is
//! left in whatever state it reached and must not be used or persisted.

use super::context::MigrationContext;
use super::registry::UpgraderRegistry;
use xasset_core::{AssetError, FormatVersion, Mapping, Node, Result};

/// Reserved root field holding one stamped version per schema:
///
/// ```yaml
/// SerializedVersion:
///     Xenko: 1.7.0-beta02
/// ```
pub const STAMP_FIELD: &str = "SerializedVersion";

/// State of a [`MigrationRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// Stamp read, nothing applied yet.
    Start,
    /// At least one upgrader applied, target not reached yet.
    Upgrading,
    /// The document is at the target version.
    Done,
    /// The run was aborted; the document is unusable.
    Failed,
}

/// One upgrader application recorded in a [`MigrationReport`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedStep {
    pub from: FormatVersion,
    pub to: FormatVersion,
    pub description: String,
}

/// Outcome of a successful migration.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport {
    pub schema: String,
    pub file: String,
    /// Version the document was stamped with before migration.
    pub stamped: FormatVersion,
    /// Version the document is stamped with now.
    pub target: FormatVersion,
    pub steps: Vec<AppliedStep>,
}

impl MigrationReport {
    /// True if the document was already current and was not touched.
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Reads the version stamped for `schema`; a missing stamp reads as `0.0.0`.
///
/// # Errors
///
/// - [`AssetError::InvalidDocument`] if the stamp field is not a mapping
/// - [`AssetError::MalformedVersion`] if the stamp is not a version string
pub fn read_stamp(asset: &Mapping, schema: &str, file: &str) -> Result<FormatVersion> {
    let Some(stamps) = asset.present(STAMP_FIELD) else {
        return Ok(FormatVersion::ZERO);
    };

    let stamps = stamps.as_mapping().ok_or_else(|| {
        AssetError::invalid_document(
            file,
            format!("'{}' must be a mapping, found {}", STAMP_FIELD, stamps.kind()),
        )
    })?;

    match stamps.present(schema) {
        None => Ok(FormatVersion::ZERO),
        Some(node) => match node.as_str() {
            Some(text) => FormatVersion::parse(text),
            None => Err(AssetError::malformed_version(
                format!("<{}>", node.kind()),
                format!("stamp for {} must be a version string", schema),
            )),
        },
    }
}

/// Stamps `version` for `schema`, creating the stamp field if needed.
pub fn write_stamp(
    asset: &mut Mapping,
    schema: &str,
    version: &FormatVersion,
    file: &str,
) -> Result<()> {
    let stamps = asset.mapping_entry(STAMP_FIELD).ok_or_else(|| {
        AssetError::invalid_document(file, format!("'{}' must be a mapping", STAMP_FIELD))
    })?;
    stamps.insert(schema, version.to_string());
    Ok(())
}

/// Entry point for migrating documents against a registry.
#[derive(Debug, Clone, Copy)]
pub struct MigrationRunner<'r> {
    registry: &'r UpgraderRegistry,
}

impl<'r> MigrationRunner<'r> {
    pub fn new(registry: &'r UpgraderRegistry) -> Self {
        Self { registry }
    }

    /// Starts a run that upgrades `document` to `target`.
    ///
    /// Nothing is mutated until [`MigrationRun::step`] is called.
    ///
    /// # Errors
    ///
    /// Fails before migration starts if the document root is not a mapping or
    /// its stamp is malformed.
    pub fn begin<'d>(
        &self,
        document: &'d mut Node,
        schema: &str,
        target: &FormatVersion,
        file: Option<&str>,
    ) -> Result<MigrationRun<'r, 'd>> {
        let kind = document.kind();
        let file_name = file.unwrap_or(super::context::IN_MEMORY_FILE);
        let asset = document.as_mapping_mut().ok_or_else(|| {
            AssetError::invalid_document(
                file_name,
                format!("expected a mapping at the document root, found {}", kind),
            )
        })?;

        let stamped = read_stamp(asset, schema, file_name)?;
        let context = MigrationContext::new(file, schema, stamped.clone(), target.clone());

        Ok(MigrationRun {
            registry: self.registry,
            asset,
            max_steps: self.registry.upgraders(schema).len() + 1,
            current: stamped,
            state: MigrationState::Start,
            steps: Vec::new(),
            failure: None,
            context,
        })
    }

    /// Upgrades `document` to `target`, running every step.
    pub fn migrate(
        &self,
        document: &mut Node,
        schema: &str,
        target: &FormatVersion,
        file: Option<&str>,
    ) -> Result<MigrationReport> {
        self.begin(document, schema, target, file)?.finish()
    }

    /// Upgrades `document` to the schema's declared current version.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::UnknownSchema`] if the schema was never declared,
    /// plus every error [`migrate()`](Self::migrate) can return.
    pub fn migrate_to_current(
        &self,
        document: &mut Node,
        schema: &str,
        file: Option<&str>,
    ) -> Result<MigrationReport> {
        let target = self
            .registry
            .current_version(schema)
            .ok_or_else(|| AssetError::UnknownSchema(schema.to_string()))?
            .clone();
        self.migrate(document, schema, &target, file)
    }
}

/// A single document's migration in progress.
#[derive(Debug)]
pub struct MigrationRun<'r, 'd> {
    registry: &'r UpgraderRegistry,
    asset: &'d mut Mapping,
    context: MigrationContext,
    current: FormatVersion,
    state: MigrationState,
    steps: Vec<AppliedStep>,
    /// Bound on applied steps; a valid chain never needs more.
    max_steps: usize,
    failure: Option<AssetError>,
}

impl MigrationRun<'_, '_> {
    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Version the document is stamped with right now.
    pub fn current_version(&self) -> &FormatVersion {
        &self.current
    }

    pub fn context(&self) -> &MigrationContext {
        &self.context
    }

    pub fn steps(&self) -> &[AppliedStep] {
        &self.steps
    }

    /// Performs one transition and returns the new state.
    ///
    /// Calling `step` on a `Done` run is a no-op; calling it on a `Failed` run
    /// returns the original error again.
    pub fn step(&mut self) -> Result<MigrationState> {
        match self.state {
            MigrationState::Done => Ok(MigrationState::Done),
            MigrationState::Failed => Err(self
                .failure
                .clone()
                .unwrap_or_else(|| self.context.loop_detected(self.steps.len()))),
            MigrationState::Start | MigrationState::Upgrading => match self.advance() {
                Ok(next) => {
                    self.state = next;
                    Ok(next)
                }
                Err(err) => {
                    tracing::warn!(
                        file = self.context.file(),
                        schema = self.context.schema(),
                        "Migration failed at {}: {}",
                        self.current,
                        err
                    );
                    self.state = MigrationState::Failed;
                    self.failure = Some(err.clone());
                    Err(err)
                }
            },
        }
    }

    /// Steps until the run is `Done` and returns its report.
    pub fn finish(mut self) -> Result<MigrationReport> {
        while self.step()? != MigrationState::Done {}

        if self.steps.is_empty() {
            tracing::debug!(
                "Asset '{}' is already at the latest {} version ({}), no migration needed",
                self.context.file(),
                self.context.schema(),
                self.current
            );
        } else {
            tracing::info!(
                "Migration completed successfully: {} {} -> {} ({})",
                self.context.schema(),
                self.context.stamped_version(),
                self.current,
                self.context.file()
            );
        }

        Ok(MigrationReport {
            schema: self.context.schema().to_string(),
            file: self.context.file().to_string(),
            stamped: self.context.stamped_version().clone(),
            target: self.current,
            steps: self.steps,
        })
    }

    fn advance(&mut self) -> Result<MigrationState> {
        let target = self.context.target_version();
        let schema = self.context.schema();

        if &self.current == target {
            return Ok(MigrationState::Done);
        }

        if &self.current > target {
            return Err(self.context.future_version(&self.current));
        }

        if self.steps.len() >= self.max_steps {
            return Err(self.context.loop_detected(self.steps.len()));
        }

        let upgrader = self
            .registry
            .find_upgrader(schema, &self.current)
            .ok_or_else(|| self.context.no_upgrade_path(&self.current))?;

        let to = upgrader.to_version();
        if &to > target {
            // The chain steps over the requested target.
            return Err(self.context.no_upgrade_path(&self.current));
        }
        if to <= self.current {
            return Err(self.context.loop_detected(self.steps.len() + 1));
        }

        tracing::info!(
            "Migration step {}: {} -> {} ({})",
            self.steps.len() + 1,
            self.current,
            to,
            upgrader.description()
        );

        upgrader.upgrade(self.asset, &self.context)?;
        write_stamp(self.asset, schema, &to, self.context.file())?;

        self.steps.push(AppliedStep {
            from: self.current.clone(),
            to: to.clone(),
            description: upgrader.description().to_string(),
        });
        self.current = to;

        Ok(MigrationState::Upgrading)
    }
}
