pub mod codec;
pub mod migration;
pub mod storage;

pub use crate::codec::{DocumentFormat, parse_document, render_document};
pub use crate::migration::{
    AssetKind, MigrationReport, MigrationRunner, UpgraderRegistry, build_upgrader_registry,
};
pub use crate::storage::{AssetFile, AssetUpgrade, AsyncAssetDirectory};
