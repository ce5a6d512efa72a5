//! Upgrader registry: per-schema chains of contiguous version ranges.
//!
//! Registries are assembled once with [`UpgraderRegistryBuilder`] during start
//! up and are immutable afterwards, so a single registry can be shared across
//! threads (behind an `Arc`) without locking.

use super::context::MigrationContext;
use super::traits::{FnUpgrader, Upgrader};
use std::collections::BTreeMap;
use std::sync::Arc;
use xasset_core::{AssetError, FormatVersion, Mapping, Result};

/// Upgraders of one schema, sorted by `from_version` once built.
#[derive(Debug)]
struct SchemaChain {
    current_version: FormatVersion,
    upgraders: Vec<Arc<dyn Upgrader>>,
}

/// Immutable lookup table from `(schema, stamped version)` to the upgrader
/// that applies.
///
/// For every schema the registered ranges are contiguous and end exactly at
/// the schema's current version:
///
/// ```text
/// [0.0.0, 1.5.0-alpha09) → [1.5.0-alpha09, 1.7.0-beta02) → current 1.7.0-beta02
/// ```
///
/// The chain may start above `0.0.0`; documents older than its first range
/// have no upgrade path.
#[derive(Debug, Default)]
pub struct UpgraderRegistry {
    schemas: BTreeMap<String, SchemaChain>,
}

impl UpgraderRegistry {
    /// Creates a new builder for constructing an `UpgraderRegistry`.
    pub fn builder() -> UpgraderRegistryBuilder {
        UpgraderRegistryBuilder::new()
    }

    /// Finds the upgrader whose range contains `version`.
    ///
    /// Returns `None` if the schema is unknown, if `version` is already at or
    /// past the schema's current version, or if `version` falls outside every
    /// registered range.
    pub fn find_upgrader(
        &self,
        schema: &str,
        version: &FormatVersion,
    ) -> Option<&Arc<dyn Upgrader>> {
        let chain = self.schemas.get(schema)?;
        if version >= &chain.current_version {
            return None;
        }

        // Ranges are sorted and disjoint: only the last one starting at or
        // below `version` can contain it.
        let idx = chain
            .upgraders
            .partition_point(|u| &u.from_version() <= version);
        idx.checked_sub(1)
            .map(|i| &chain.upgraders[i])
            .filter(|u| u.contains(version))
    }

    /// Returns the declared current version of a schema.
    pub fn current_version(&self, schema: &str) -> Option<&FormatVersion> {
        self.schemas.get(schema).map(|c| &c.current_version)
    }

    pub fn contains_schema(&self, schema: &str) -> bool {
        self.schemas.contains_key(schema)
    }

    /// Declared schema names, in sorted order.
    pub fn schemas(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Upgraders of a schema in chain order; empty for unknown schemas.
    pub fn upgraders(&self, schema: &str) -> &[Arc<dyn Upgrader>] {
        self.schemas
            .get(schema)
            .map(|c| c.upgraders.as_slice())
            .unwrap_or(&[])
    }

    /// Returns the number of registered upgraders across all schemas.
    pub fn len(&self) -> usize {
        self.schemas.values().map(|c| c.upgraders.len()).sum()
    }

    /// Returns true if no upgraders are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Versions a document stamped `from` would pass through, starting with
    /// `from` itself and ending at the current version.
    ///
    /// Returns an empty vector when no complete path exists. Used for
    /// diagnostics only.
    pub fn available_path(&self, schema: &str, from: &FormatVersion) -> Vec<FormatVersion> {
        let Some(current) = self.current_version(schema) else {
            return Vec::new();
        };

        let mut path = vec![from.clone()];
        let mut version = from.clone();
        while &version < current {
            match self.find_upgrader(schema, &version) {
                Some(upgrader) => {
                    version = upgrader.to_version();
                    path.push(version.clone());
                }
                None => return Vec::new(),
            }
        }

        if &version == current { path } else { Vec::new() }
    }
}

/// Builder for constructing an [`UpgraderRegistry`].
///
/// Range conflicts that can be detected from a single registration (empty or
/// reversed ranges, overlaps, ranges past the current version) are rejected
/// immediately. Gaps can only be judged once every range is known, so they
/// are rejected by [`build()`](Self::build). Either way no document is
/// migrated against an inconsistent chain.
///
/// # Example
///
/// ```ignore
/// let registry = UpgraderRegistry::builder()
///     .declare_schema("SpriteFont", FormatVersion::parse("1.7.0-beta02")?)?
///     .register(Arc::new(PremultiplyUpgrader))?
///     .register(Arc::new(FontTypeUpgrader))?
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct UpgraderRegistryBuilder {
    schemas: BTreeMap<String, SchemaChain>,
}

impl UpgraderRegistryBuilder {
    /// Creates a new builder with no schemas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a schema and the version its documents must be upgraded to.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::DuplicateSchema`] if the schema was already declared.
    pub fn declare_schema(
        mut self,
        schema: impl Into<String>,
        current_version: FormatVersion,
    ) -> Result<Self> {
        let schema = schema.into();
        if self.schemas.contains_key(&schema) {
            return Err(AssetError::DuplicateSchema(schema));
        }

        self.schemas.insert(
            schema,
            SchemaChain {
                current_version,
                upgraders: Vec::new(),
            },
        );
        Ok(self)
    }

    /// Registers a single upgrader. Registration order does not matter.
    ///
    /// # Errors
    ///
    /// - [`AssetError::UnknownSchema`] if its schema was not declared
    /// - [`AssetError::InvalidRange`] if `from_version >= to_version`
    /// - [`AssetError::RangeExceedsTarget`] if the range ends past the current version
    /// - [`AssetError::OverlappingRange`] if it intersects an already registered range
    pub fn register(mut self, upgrader: Arc<dyn Upgrader>) -> Result<Self> {
        let schema = upgrader.schema_name().to_string();
        let chain = self
            .schemas
            .get_mut(&schema)
            .ok_or_else(|| AssetError::UnknownSchema(schema.clone()))?;

        let (from, to) = (upgrader.from_version(), upgrader.to_version());
        if from >= to {
            return Err(AssetError::InvalidRange { schema, from, to });
        }

        if to > chain.current_version {
            return Err(AssetError::RangeExceedsTarget {
                schema,
                to,
                target: chain.current_version.clone(),
            });
        }

        if let Some(existing) = chain
            .upgraders
            .iter()
            .find(|e| from < e.to_version() && e.from_version() < to)
        {
            return Err(AssetError::OverlappingRange {
                schema,
                existing_from: existing.from_version(),
                existing_to: existing.to_version(),
                from,
                to,
            });
        }

        tracing::debug!(
            "Registered upgrader for {}: [{}, {}) ({})",
            schema,
            from,
            to,
            upgrader.description()
        );
        chain.upgraders.push(upgrader);
        Ok(self)
    }

    /// Registers multiple upgraders at once.
    pub fn register_all(self, upgraders: Vec<Arc<dyn Upgrader>>) -> Result<Self> {
        upgraders
            .into_iter()
            .try_fold(self, |builder, upgrader| builder.register(upgrader))
    }

    /// Registers a plain function as the upgrader for `[from, to)`.
    pub fn register_upgrader<F>(
        self,
        schema: impl Into<String>,
        from: FormatVersion,
        to: FormatVersion,
        description: impl Into<String>,
        transform: F,
    ) -> Result<Self>
    where
        F: Fn(&mut Mapping, &MigrationContext) -> Result<()> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnUpgrader::new(
            schema,
            from,
            to,
            description,
            transform,
        )))
    }

    /// Builds the registry, checking that every schema's chain is contiguous.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::RangeGap`] if two consecutive ranges do not meet,
    /// or if the last range does not end at the schema's current version.
    pub fn build(mut self) -> Result<UpgraderRegistry> {
        for (schema, chain) in self.schemas.iter_mut() {
            chain.upgraders.sort_by_key(|u| u.from_version());

            for pair in chain.upgraders.windows(2) {
                let (prev_to, next_from) = (pair[0].to_version(), pair[1].from_version());
                if prev_to != next_from {
                    return Err(AssetError::RangeGap {
                        schema: schema.clone(),
                        from: prev_to,
                        to: next_from,
                    });
                }
            }

            if let Some(last) = chain.upgraders.last() {
                let end = last.to_version();
                if end != chain.current_version {
                    return Err(AssetError::RangeGap {
                        schema: schema.clone(),
                        from: end,
                        to: chain.current_version.clone(),
                    });
                }
            }

            if chain.upgraders.is_empty() {
                tracing::debug!(
                    "{} registry: no upgraders, current version {}",
                    schema,
                    chain.current_version
                );
            } else {
                tracing::debug!(
                    "{} registry: {} upgraders registered, current version {}",
                    schema,
                    chain.upgraders.len(),
                    chain.current_version
                );
            }
        }

        Ok(UpgraderRegistry {
            schemas: self.schemas,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> FormatVersion {
        FormatVersion::parse(text).unwrap()
    }

    fn step(schema: &str, from: &str, to: &str) -> Arc<dyn Upgrader> {
        let desc = format!("{from} -> {to}");
        Arc::new(FnUpgrader::new(schema, v(from), v(to), desc, |_, _| Ok(())))
    }

    fn font_registry() -> UpgraderRegistry {
        UpgraderRegistry::builder()
            .declare_schema("SpriteFont", v("1.7.0-beta02"))
            .unwrap()
            .register(step("SpriteFont", "1.5.0-alpha09", "1.7.0-beta02"))
            .unwrap()
            .register(step("SpriteFont", "0.0.0", "1.5.0-alpha09"))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_registry() {
        let registry = UpgraderRegistry::builder()
            .declare_schema("Model", v("1.0.0"))
            .unwrap()
            .build()
            .unwrap();

        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.find_upgrader("Model", &FormatVersion::ZERO).is_none());
        assert_eq!(registry.current_version("Model"), Some(&v("1.0.0")));
    }

    #[test]
    fn test_out_of_order_registration_is_sorted() {
        let registry = font_registry();

        let froms: Vec<_> = registry
            .upgraders("SpriteFont")
            .iter()
            .map(|u| u.from_version())
            .collect();
        assert_eq!(froms, vec![v("0.0.0"), v("1.5.0-alpha09")]);
    }

    #[test]
    fn test_find_upgrader_by_containment() {
        let registry = font_registry();

        let first = registry.find_upgrader("SpriteFont", &v("0.0.0")).unwrap();
        assert_eq!(first.to_version(), v("1.5.0-alpha09"));

        let mid = registry.find_upgrader("SpriteFont", &v("1.4.2")).unwrap();
        assert_eq!(mid.to_version(), v("1.5.0-alpha09"));

        let second = registry
            .find_upgrader("SpriteFont", &v("1.5.0-alpha09"))
            .unwrap();
        assert_eq!(second.to_version(), v("1.7.0-beta02"));

        let late = registry.find_upgrader("SpriteFont", &v("1.7.0-alpha01")).unwrap();
        assert_eq!(late.to_version(), v("1.7.0-beta02"));
    }

    #[test]
    fn test_find_upgrader_none_at_or_past_current() {
        let registry = font_registry();
        assert!(registry.find_upgrader("SpriteFont", &v("1.7.0-beta02")).is_none());
        assert!(registry.find_upgrader("SpriteFont", &v("2.0.0")).is_none());
        assert!(registry.find_upgrader("Unknown", &v("0.0.0")).is_none());
    }

    #[test]
    fn test_find_upgrader_none_below_first_range() {
        let registry = UpgraderRegistry::builder()
            .declare_schema("Model", v("2.0.0"))
            .unwrap()
            .register(step("Model", "1.0.0", "2.0.0"))
            .unwrap()
            .build()
            .unwrap();

        assert!(registry.find_upgrader("Model", &v("0.9.0")).is_none());
        assert!(registry.find_upgrader("Model", &v("1.0.0")).is_some());
    }

    #[test]
    fn test_register_unknown_schema() {
        let err = UpgraderRegistry::builder()
            .register(step("Model", "1.0.0", "2.0.0"))
            .unwrap_err();
        assert_eq!(err, AssetError::UnknownSchema("Model".to_string()));
    }

    #[test]
    fn test_declare_schema_twice() {
        let err = UpgraderRegistry::builder()
            .declare_schema("Model", v("1.0.0"))
            .unwrap()
            .declare_schema("Model", v("2.0.0"))
            .unwrap_err();
        assert_eq!(err, AssetError::DuplicateSchema("Model".to_string()));
    }

    #[test]
    fn test_register_reversed_range() {
        let err = UpgraderRegistry::builder()
            .declare_schema("Model", v("2.0.0"))
            .unwrap()
            .register(step("Model", "1.5.0", "1.5.0"))
            .unwrap_err();
        assert!(matches!(err, AssetError::InvalidRange { .. }));
    }

    #[test]
    fn test_register_past_current_version() {
        let err = UpgraderRegistry::builder()
            .declare_schema("Model", v("2.0.0"))
            .unwrap()
            .register(step("Model", "1.0.0", "3.0.0"))
            .unwrap_err();
        assert!(matches!(err, AssetError::RangeExceedsTarget { .. }));
    }

    #[test]
    fn test_register_overlapping_range() {
        let err = UpgraderRegistry::builder()
            .declare_schema("Model", v("3.0.0"))
            .unwrap()
            .register(step("Model", "1.0.0", "2.0.0"))
            .unwrap()
            .register(step("Model", "1.5.0", "3.0.0"))
            .unwrap_err();

        match err {
            AssetError::OverlappingRange {
                existing_from,
                existing_to,
                from,
                ..
            } => {
                assert_eq!(existing_from, v("1.0.0"));
                assert_eq!(existing_to, v("2.0.0"));
                assert_eq!(from, v("1.5.0"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_build_rejects_gap_between_ranges() {
        let err = UpgraderRegistry::builder()
            .declare_schema("Model", v("3.0.0"))
            .unwrap()
            .register(step("Model", "1.0.0", "1.1.0"))
            .unwrap()
            .register(step("Model", "1.5.0", "3.0.0"))
            .unwrap()
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            AssetError::RangeGap {
                schema: "Model".to_string(),
                from: v("1.1.0"),
                to: v("1.5.0"),
            }
        );
    }

    #[test]
    fn test_build_rejects_chain_ending_before_current() {
        let err = UpgraderRegistry::builder()
            .declare_schema("Model", v("3.0.0"))
            .unwrap()
            .register(step("Model", "1.0.0", "2.0.0"))
            .unwrap()
            .build()
            .unwrap_err();

        assert!(matches!(err, AssetError::RangeGap { ref to, .. } if *to == v("3.0.0")));
    }

    #[test]
    fn test_register_upgrader_with_closure() {
        let registry = UpgraderRegistry::builder()
            .declare_schema("Model", v("2.0.0"))
            .unwrap()
            .register_upgrader("Model", v("1.0.0"), v("2.0.0"), "rename", |asset, _| {
                if let Some(old) = asset.remove("Old") {
                    asset.insert("New", old);
                }
                Ok(())
            })
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry
                .find_upgrader("Model", &v("1.0.0"))
                .map(|u| u.description().to_string()),
            Some("rename".to_string())
        );
    }

    #[test]
    fn test_available_path() {
        let registry = font_registry();

        assert_eq!(
            registry.available_path("SpriteFont", &v("1.0.0")),
            vec![v("1.0.0"), v("1.5.0-alpha09"), v("1.7.0-beta02")]
        );
        assert_eq!(
            registry.available_path("SpriteFont", &v("1.7.0-beta02")),
            vec![v("1.7.0-beta02")]
        );
        assert!(registry.available_path("SpriteFont", &v("9.0.0")).is_empty());
    }

    #[test]
    fn test_schemas_are_listed_in_order() {
        let registry = UpgraderRegistry::builder()
            .declare_schema("Texture", v("1.0.0"))
            .unwrap()
            .declare_schema("Model", v("1.0.0"))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(registry.schemas().collect::<Vec<_>>(), vec!["Model", "Texture"]);
        assert!(registry.contains_schema("Model"));
        assert!(registry.upgraders("Missing").is_empty());
    }
}
