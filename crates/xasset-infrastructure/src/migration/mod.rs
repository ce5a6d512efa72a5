//! Asset format migration framework.
//!
//! Stored assets are stamped with the format version of each schema they
//! implement. Before an asset is bound to its typed schema, its untyped
//! document tree is walked through a chain of upgraders until the stamp equals
//! the schema's current version. The framework ensures that:
//!
//! - Upgraders apply in version order, one half-open range at a time
//! - Each schema's ranges are contiguous and non-overlapping, checked when the
//!   registry is built rather than when a document is migrated
//! - Documents that are already current are never touched
//! - Documents from a newer tool are rejected instead of silently truncated
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    UpgraderRegistry                         │
//! │  (Built once at start up, read-only afterwards)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  - Xenko (SpriteFont)                                       │
//! │      [0.0.0, 1.5.0-alpha09) → [.., 1.7.0-beta02)            │
//! │  - [Future asset kinds...]                                  │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            V
//!                     MigrationRunner
//!          (Start → Upgrading → ... → Done | Failed)
//!                            │
//!                            V
//!          Upgrader::upgrade(&mut Mapping, &MigrationContext)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use xasset_infrastructure::migration;
//!
//! let registry = migration::build_upgrader_registry()?;
//! let mut document = codec::parse_document(&text, DocumentFormat::Yaml)?;
//! let report = MigrationRunner::new(&registry)
//!     .migrate_to_current(&mut document, "Xenko", Some("fonts/Title.xkfnt"))?;
//! ```
//!
//! # Adding a New Asset Kind
//!
//! 1. **Add to `AssetKind` enum** (`asset_kind.rs`) and fill in its match arms
//! 2. **Create the upgraders** in a module of their own (see `sprite_font.rs`)
//!    - Implement `Upgrader` for each version range
//!    - Provide a `register(builder)` function declaring the schema
//! 3. **Wire `AssetKind::register_upgraders()`** to that function
//!
//! The compiler will guide you through these steps with errors.

mod asset_kind;
mod context;
mod registry;
mod runner;
pub mod sprite_font;
mod traits;

// Public API
pub use asset_kind::AssetKind;
pub use context::{IN_MEMORY_FILE, MigrationContext};
pub use registry::{UpgraderRegistry, UpgraderRegistryBuilder};
pub use runner::{
    AppliedStep, MigrationReport, MigrationRun, MigrationRunner, MigrationState, STAMP_FIELD,
    read_stamp, write_stamp,
};
pub use traits::{FnUpgrader, Upgrader};

// Re-export specific upgraders for advanced use cases
pub use sprite_font::{FontTypeUpgrader, PremultiplyUpgrader, SpriteFontType};

use xasset_core::Result;

/// Builds an `UpgraderRegistry` holding the upgrade chains of every built-in
/// asset kind.
///
/// This is the primary entry point for setting up migrations. Call it once
/// during initialization and share the result (e.g. in an `Arc`) with every
/// loader.
///
/// # Errors
///
/// Returns an error if any registration conflicts (overlapping ranges, gaps,
/// duplicate schemas).
pub fn build_upgrader_registry() -> Result<UpgraderRegistry> {
    let builder = AssetKind::all()
        .iter()
        .try_fold(UpgraderRegistry::builder(), |builder, kind| {
            kind.register_upgraders(builder)
        })?;

    builder.build()
}
