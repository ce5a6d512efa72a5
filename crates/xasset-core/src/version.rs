//! Format versions stamped on stored asset documents.
//!
//! A [`FormatVersion`] is `MAJOR.MINOR.PATCH[-PRERELEASE]`. The numeric triple
//! is validated with `semver`; the prerelease is split into a label and a
//! trailing number so that `alpha9 < alpha10` holds, which plain semver
//! identifier comparison would get wrong.

use crate::error::{AssetError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Prerelease part of a [`FormatVersion`], e.g. `alpha09`.
#[derive(Debug, Clone)]
struct Prerelease {
    label: String,
    number: Option<u64>,
    /// Digit count as written, so `alpha09` renders back as `alpha09`.
    width: usize,
}

impl Prerelease {
    fn split(text: &str) -> Self {
        let label = text.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &text[label.len()..];

        match digits.parse::<u64>() {
            Ok(number) if !digits.is_empty() => Self {
                label: label.to_string(),
                number: Some(number),
                width: digits.len(),
            },
            // No trailing digits, or too many to fit: the whole text is the label.
            _ => Self {
                label: text.to_string(),
                number: None,
                width: 0,
            },
        }
    }

    fn cmp_key(&self) -> (&str, Option<u64>) {
        (self.label.as_str(), self.number)
    }
}

/// A semantic version with total ordering, associated with a named schema.
///
/// A release sorts after every prerelease of the same `major.minor.patch`.
/// Prereleases compare by label, then by trailing number (a missing number
/// sorts first).
///
/// # Example
///
/// ```
/// use xasset_core::FormatVersion;
///
/// let alpha = FormatVersion::parse("1.5.0-alpha09").unwrap();
/// let beta = FormatVersion::parse("1.7.0-beta02").unwrap();
/// assert!(FormatVersion::ZERO < alpha);
/// assert!(alpha < beta);
/// assert!(beta < FormatVersion::new(1, 7, 0));
/// assert_eq!(alpha.to_string(), "1.5.0-alpha09");
/// ```
#[derive(Debug, Clone)]
pub struct FormatVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pre: Option<Prerelease>,
}

impl FormatVersion {
    /// The oldest known version; assumed for documents without a stamp.
    pub const ZERO: FormatVersion = FormatVersion::new(0, 0, 0);

    /// Creates a release version.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Parses `MAJOR.MINOR.PATCH[-PRERELEASE]`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::MalformedVersion`] if the text is not a version
    /// of that shape. Build metadata (`+...`) is rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let parsed = semver::Version::parse(text)
            .map_err(|e| AssetError::malformed_version(text, e.to_string()))?;

        if !parsed.build.is_empty() {
            return Err(AssetError::malformed_version(
                text,
                "build metadata is not allowed in a format version",
            ));
        }

        let pre = (!parsed.pre.is_empty()).then(|| Prerelease::split(parsed.pre.as_str()));

        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            pre,
        })
    }

    /// Returns true if this version carries a prerelease part.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// The prerelease label without its trailing number (`alpha` for `alpha09`).
    pub fn prerelease_label(&self) -> Option<&str> {
        self.pre.as_ref().map(|p| p.label.as_str())
    }

    /// The trailing prerelease number (`9` for `alpha09`).
    pub fn prerelease_number(&self) -> Option<u64> {
        self.pre.as_ref().and_then(|p| p.number)
    }
}

impl Ord for FormatVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp_key().cmp(&b.cmp_key()),
            })
    }
}

impl PartialOrd for FormatVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FormatVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FormatVersion {}

impl Hash for FormatVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.major, self.minor, self.patch).hash(state);
        self.pre.as_ref().map(Prerelease::cmp_key).hash(state);
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre.label)?;
            if let Some(number) = pre.number {
                write!(f, "{:0width$}", number, width = pre.width)?;
            }
        }
        Ok(())
    }
}

impl FromStr for FormatVersion {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for FormatVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FormatVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
