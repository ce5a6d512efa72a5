//! Domain types for versioned asset documents.
//!
//! This crate holds the pure data model: the [`FormatVersion`] stamped on a
//! stored asset, the untyped [`Node`] tree an asset is parsed into before it is
//! bound to a schema, and the shared [`AssetError`]. It performs no I/O.

pub mod document;
pub mod error;
pub mod version;

pub use document::{Mapping, Node, Scalar};
pub use error::{AssetError, Result};
pub use version::FormatVersion;
