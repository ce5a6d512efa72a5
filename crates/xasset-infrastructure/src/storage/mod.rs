//! Storage layer for atomic asset file migration.

mod asset_directory;
mod asset_file;

pub use asset_directory::{AssetUpgrade, AsyncAssetDirectory};
pub use asset_file::AssetFile;
