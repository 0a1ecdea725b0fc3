//! Loose semantic version parsing and comparison
//!
//! Controller firmware reports versions like "0.2.4", "0.4.0rc1" or
//! "1.5.0-beta". These are not always valid strict semver, so this module
//! uses a lenient rule: three numeric components compared first, then the
//! trailing suffix text (lexicographic, with the empty suffix ordered first).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// A lenient `major.minor.patch<suffix>` version.
///
/// The default value is the sentinel `0.0.0`, meaning "not yet determined".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// Trailing qualifier text after the numeric components (e.g. "rc1").
    pub suffix: String,
}

impl Version {
    /// Parse a version string of the form `digits.digits.digits<anything>`.
    ///
    /// Each of the first three dot-separated components contributes its
    /// leading numeric run; everything after the third numeric component
    /// (including further dot components) becomes the suffix. Strings not
    /// matching the pattern yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (major, rest) = split_numeric(s)?;
        let rest = rest.strip_prefix('.')?;
        let (minor, rest) = split_numeric(rest)?;
        let rest = rest.strip_prefix('.')?;
        let (patch, suffix) = split_numeric(rest)?;
        Some(Self {
            major,
            minor,
            patch,
            suffix: suffix.to_string(),
        })
    }

    /// Whether this is the sentinel `0.0.0` ("version unknown").
    pub fn is_sentinel(&self) -> bool {
        *self == Self::default()
    }
}

/// Split the leading decimal run off `s`. `None` when `s` does not start
/// with a digit or the run overflows.
fn split_numeric(s: &str) -> Option<(u32, &str)> {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| self.suffix.cmp(&other.suffix))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}{}",
            self.major, self.minor, self.patch, self.suffix
        )
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| D::Error::custom(format!("invalid version string {s:?}")))
    }
}
