//! SpriteFont asset upgraders.
//!
//! | range | upgrader | change |
//! |---|---|---|
//! | `[0.0.0, 1.5.0-alpha09)` | [`PremultiplyUpgrader`] | `NoPremultiply` / `IsNotPremultiply` → `IsPremultiplied` (inverted) |
//! | `[1.5.0-alpha09, 1.7.0-beta02)` | [`FontTypeUpgrader`] | `IsDynamic` → `FontType` enum |

use super::context::MigrationContext;
use super::registry::UpgraderRegistryBuilder;
use super::traits::Upgrader;
use std::sync::Arc;
use xasset_core::{FormatVersion, Mapping, Node, Result};

/// Package the SpriteFont chain is stamped under
/// (`SerializedVersion: {Xenko: ...}`).
pub const SCHEMA_NAME: &str = "Xenko";

/// Current SpriteFont format version.
pub const CURRENT_VERSION: &str = "1.7.0-beta02";

/// Version at which premultiplication became a positive `IsPremultiplied` flag.
pub const PREMULTIPLY_VERSION: &str = "1.5.0-alpha09";

/// Returns the current SpriteFont format version.
pub fn current_version() -> FormatVersion {
    FormatVersion::parse(CURRENT_VERSION).expect("Invalid CURRENT_VERSION")
}

fn premultiply_version() -> FormatVersion {
    FormatVersion::parse(PREMULTIPLY_VERSION).expect("Invalid PREMULTIPLY_VERSION")
}

/// How the glyphs of a sprite font are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteFontType {
    /// Pre-generated at a fixed size.
    Static,
    /// Generated at run time at any size.
    Dynamic,
    /// Pre-generated signed distance field, scalable at run time. Has no
    /// legacy equivalent, so no upgrader produces it.
    SignedDistanceField,
}

impl SpriteFontType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SpriteFontType::Static => "Static",
            SpriteFontType::Dynamic => "Dynamic",
            SpriteFontType::SignedDistanceField => "SignedDistanceField",
        }
    }
}

/// Reads a legacy boolean field, treating blanked and null fields as absent.
fn legacy_bool(asset: &Mapping, field: &str, context: &MigrationContext) -> Result<Option<bool>> {
    match asset.present(field) {
        None => Ok(None),
        Some(node) => node.as_bool().map(Some).ok_or_else(|| {
            context.transform_failed(field, format!("expected a boolean, found {}", node.kind()))
        }),
    }
}

/// Upgrade from the negative premultiply flags to `IsPremultiplied`.
///
/// Changes:
/// - `IsPremultiplied` = `!NoPremultiply` or `!IsNotPremultiply`
/// - the legacy field is blanked, not removed, so it keeps its place in
///   hand-edited files
///
/// Both aliases are checked in turn; if a document carries both, the last one
/// wins.
#[derive(Debug)]
pub struct PremultiplyUpgrader;

impl PremultiplyUpgrader {
    const LEGACY_FIELDS: [&'static str; 2] = ["NoPremultiply", "IsNotPremultiply"];
    const FIELD: &'static str = "IsPremultiplied";
}

impl Upgrader for PremultiplyUpgrader {
    fn schema_name(&self) -> &str {
        SCHEMA_NAME
    }

    fn from_version(&self) -> FormatVersion {
        FormatVersion::ZERO
    }

    fn to_version(&self) -> FormatVersion {
        premultiply_version()
    }

    fn description(&self) -> &str {
        "Invert NoPremultiply/IsNotPremultiply into IsPremultiplied"
    }

    fn upgrade(&self, asset: &mut Mapping, context: &MigrationContext) -> Result<()> {
        for legacy_field in Self::LEGACY_FIELDS {
            if let Some(legacy) = legacy_bool(asset, legacy_field, context)? {
                asset.insert(Self::FIELD, !legacy);
                asset.blank(legacy_field);
                tracing::debug!(
                    "{}: {} = {} -> {} = {}",
                    context.file(),
                    legacy_field,
                    legacy,
                    Self::FIELD,
                    !legacy
                );
            }
        }
        Ok(())
    }
}

/// Upgrade from the `IsDynamic` flag to the `FontType` enum.
///
/// Changes:
/// - `FontType` = `Dynamic` if `IsDynamic` else `Static`
/// - `IsDynamic` is removed entirely
#[derive(Debug)]
pub struct FontTypeUpgrader;

impl FontTypeUpgrader {
    const LEGACY_FIELD: &'static str = "IsDynamic";
    const FIELD: &'static str = "FontType";
}

impl Upgrader for FontTypeUpgrader {
    fn schema_name(&self) -> &str {
        SCHEMA_NAME
    }

    fn from_version(&self) -> FormatVersion {
        premultiply_version()
    }

    fn to_version(&self) -> FormatVersion {
        current_version()
    }

    fn description(&self) -> &str {
        "Replace IsDynamic with the FontType enum"
    }

    fn upgrade(&self, asset: &mut Mapping, context: &MigrationContext) -> Result<()> {
        if let Some(is_dynamic) = legacy_bool(asset, Self::LEGACY_FIELD, context)? {
            let font_type = if is_dynamic {
                SpriteFontType::Dynamic
            } else {
                SpriteFontType::Static
            };

            if asset.contains_key(Self::FIELD) {
                context.warn(format!(
                    "{} already present, overwritten from {}",
                    Self::FIELD,
                    Self::LEGACY_FIELD
                ));
            }
            asset.insert(Self::FIELD, Node::from(font_type.as_str()));
            asset.remove(Self::LEGACY_FIELD);
        }
        Ok(())
    }
}

/// Declares the SpriteFont package schema and registers its upgraders.
pub fn register(builder: UpgraderRegistryBuilder) -> Result<UpgraderRegistryBuilder> {
    builder
        .declare_schema(SCHEMA_NAME, current_version())?
        .register(Arc::new(PremultiplyUpgrader))?
        .register(Arc::new(FontTypeUpgrader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::UpgraderRegistry;
    use xasset_core::{AssetError, Scalar};

    fn context(from: FormatVersion, to: FormatVersion) -> MigrationContext {
        MigrationContext::new(Some("fonts/Title.xkfnt"), SCHEMA_NAME, from, to)
    }

    fn font(fields: &[(&str, Node)]) -> Mapping {
        fields.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_versions_are_valid() {
        assert!(current_version() > premultiply_version());
        assert!(premultiply_version() > FormatVersion::ZERO);
    }

    #[test]
    fn test_no_premultiply_is_inverted_and_blanked() {
        let mut asset = font(&[("Size", Node::from(16.0)), ("NoPremultiply", Node::from(true))]);

        PremultiplyUpgrader
            .upgrade(&mut asset, &context(FormatVersion::ZERO, premultiply_version()))
            .unwrap();

        assert_eq!(asset.get("IsPremultiplied").and_then(Node::as_bool), Some(false));
        assert_eq!(asset.get("NoPremultiply"), Some(&Node::Empty));
        assert_eq!(
            asset.keys().collect::<Vec<_>>(),
            vec!["Size", "NoPremultiply", "IsPremultiplied"]
        );
    }

    #[test]
    fn test_is_not_premultiply_false() {
        let mut asset = font(&[("IsNotPremultiply", Node::from(false))]);

        PremultiplyUpgrader
            .upgrade(&mut asset, &context(FormatVersion::ZERO, premultiply_version()))
            .unwrap();

        assert_eq!(asset.get("IsPremultiplied").and_then(Node::as_bool), Some(true));
        assert!(asset.get("IsNotPremultiply").unwrap().is_empty_marker());
    }

    #[test]
    fn test_last_alias_wins() {
        let mut asset = font(&[
            ("NoPremultiply", Node::from(true)),
            ("IsNotPremultiply", Node::from(false)),
        ]);

        PremultiplyUpgrader
            .upgrade(&mut asset, &context(FormatVersion::ZERO, premultiply_version()))
            .unwrap();

        assert_eq!(asset.get("IsPremultiplied").and_then(Node::as_bool), Some(true));
        assert!(asset.get("NoPremultiply").unwrap().is_empty_marker());
        assert!(asset.get("IsNotPremultiply").unwrap().is_empty_marker());
    }

    #[test]
    fn test_premultiply_without_legacy_fields_is_noop() {
        let mut asset = font(&[("IsPremultiplied", Node::from(false))]);
        let before = asset.clone();

        PremultiplyUpgrader
            .upgrade(&mut asset, &context(FormatVersion::ZERO, premultiply_version()))
            .unwrap();

        assert_eq!(asset, before);
    }

    #[test]
    fn test_blanked_alias_is_not_read_again() {
        let mut asset = font(&[
            ("NoPremultiply", Node::Empty),
            ("IsPremultiplied", Node::from(true)),
        ]);
        let before = asset.clone();

        PremultiplyUpgrader
            .upgrade(&mut asset, &context(FormatVersion::ZERO, premultiply_version()))
            .unwrap();

        assert_eq!(asset, before);
    }

    #[test]
    fn test_non_boolean_alias_fails() {
        let mut asset = font(&[("NoPremultiply", Node::from("yes"))]);

        let err = PremultiplyUpgrader
            .upgrade(&mut asset, &context(FormatVersion::ZERO, premultiply_version()))
            .unwrap_err();

        match err {
            AssetError::TransformFailed { field, schema, .. } => {
                assert_eq!(field, "NoPremultiply");
                assert_eq!(schema, SCHEMA_NAME);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_is_dynamic_true_becomes_dynamic() {
        let mut asset = font(&[("IsDynamic", Node::from(true)), ("Size", Node::from(20.0))]);

        FontTypeUpgrader
            .upgrade(&mut asset, &context(premultiply_version(), current_version()))
            .unwrap();

        assert_eq!(asset.get("FontType").and_then(Node::as_str), Some("Dynamic"));
        assert!(!asset.contains_key("IsDynamic"));
        assert_eq!(asset.keys().collect::<Vec<_>>(), vec!["Size", "FontType"]);
    }

    #[test]
    fn test_is_dynamic_false_becomes_static() {
        let mut asset = font(&[("IsDynamic", Node::from(false))]);

        FontTypeUpgrader
            .upgrade(&mut asset, &context(premultiply_version(), current_version()))
            .unwrap();

        assert_eq!(asset.get("FontType").and_then(Node::as_str), Some("Static"));
        assert!(asset.get("IsDynamic").is_none());
    }

    #[test]
    fn test_font_type_without_is_dynamic_is_noop() {
        let mut asset = font(&[("Size", Node::from(16.0))]);

        FontTypeUpgrader
            .upgrade(&mut asset, &context(premultiply_version(), current_version()))
            .unwrap();

        assert!(asset.get("FontType").is_none());
    }

    #[test]
    fn test_non_boolean_is_dynamic_fails() {
        let mut asset = font(&[("IsDynamic", Node::Scalar(Scalar::Integer(1)))]);

        let err = FontTypeUpgrader
            .upgrade(&mut asset, &context(premultiply_version(), current_version()))
            .unwrap_err();

        assert!(err.is_transform_failed());
        assert!(err.to_string().contains("IsDynamic"));
    }

    #[test]
    fn test_font_type_labels() {
        assert_eq!(SpriteFontType::Static.as_str(), "Static");
        assert_eq!(SpriteFontType::Dynamic.as_str(), "Dynamic");
        assert_eq!(
            SpriteFontType::SignedDistanceField.as_str(),
            "SignedDistanceField"
        );
    }

    #[test]
    fn test_register_builds_contiguous_chain() {
        let registry = register(UpgraderRegistry::builder())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.current_version(SCHEMA_NAME), Some(&current_version()));
    }
}
