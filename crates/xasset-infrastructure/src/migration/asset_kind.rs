//! Built-in asset kinds and their upgrade chains.
//!
//! When adding a new asset kind:
//! 1. Add a variant to `AssetKind`
//! 2. Add it to `AssetKind::all()`
//! 3. Add match arms to `name()`, `schema()`, `current_version()`,
//!    `file_extensions()` and `register_upgraders()`
//!
//! The compiler will ensure all steps are completed through exhaustive matching.

use super::registry::UpgraderRegistryBuilder;
use super::sprite_font;
use std::path::Path;
use xasset_core::{FormatVersion, Result};

/// All asset kinds with a registered upgrade chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AssetKind {
    /// Sprite font description (`.xkfnt`, legacy `.pdxfnt`)
    SpriteFont,
}

impl AssetKind {
    /// Returns all asset kinds.
    ///
    /// When adding a new kind, you must add it here, or its upgraders won't
    /// be registered by `build_upgrader_registry()`.
    pub const fn all() -> &'static [AssetKind] {
        &[AssetKind::SpriteFont]
    }

    /// Returns the kind's display name.
    pub const fn name(&self) -> &'static str {
        match self {
            AssetKind::SpriteFont => "SpriteFont",
        }
    }

    /// Returns the schema the kind's upgraders are registered under, which is
    /// also its key in the version stamp.
    pub const fn schema(&self) -> &'static str {
        match self {
            AssetKind::SpriteFont => sprite_font::SCHEMA_NAME,
        }
    }

    /// Returns the version documents of this kind are upgraded to.
    pub fn current_version(&self) -> FormatVersion {
        match self {
            AssetKind::SpriteFont => sprite_font::current_version(),
        }
    }

    /// File extensions, current first.
    pub const fn file_extensions(&self) -> &'static [&'static str] {
        match self {
            AssetKind::SpriteFont => &[".xkfnt", ".pdxfnt"],
        }
    }

    /// Finds the kind owning a file extension (with or without the dot,
    /// case-insensitive).
    pub fn from_extension(extension: &str) -> Option<AssetKind> {
        let wanted = extension.trim_start_matches('.').to_ascii_lowercase();
        Self::all().iter().copied().find(|kind| {
            kind.file_extensions()
                .iter()
                .any(|ext| ext.trim_start_matches('.') == wanted)
        })
    }

    pub fn from_path(path: &Path) -> Option<AssetKind> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Declares this kind's schema and registers its upgraders.
    pub fn register_upgraders(
        &self,
        builder: UpgraderRegistryBuilder,
    ) -> Result<UpgraderRegistryBuilder> {
        match self {
            AssetKind::SpriteFont => sprite_font::register(builder),
        }
    }
}
