//! Package versions.
//!
//! A version is a dot-separated list of numeric segments with an optional
//! `-suffix` made of ASCII letters and digits: `1`, `1.0.3`, `2.1-SNAPSHOT`,
//! `7.0-r10000`. Missing trailing segments count as zero, so `1`, `1.0` and
//! `1.0.0` are the same version.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::PackageError;

const SNAPSHOT_SUFFIX: &str = "SNAPSHOT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    raw: String,
    segments: Vec<u64>,
    suffix: Option<String>,
}

impl Version {
    pub fn parse(input: &str) -> Result<Self, PackageError> {
        let (numeric, suffix) = match input.split_once('-') {
            Some((numeric, suffix)) => (numeric, Some(suffix)),
            None => (input, None),
        };

        let invalid = |reason: String| PackageError::InvalidVersion {
            input: input.to_string(),
            reason,
        };

        if numeric.is_empty() {
            return Err(invalid("version must start with a number".into()));
        }

        let mut segments = Vec::new();
        for segment in numeric.split('.') {
            if segment.is_empty() {
                return Err(invalid("empty version segment".into()));
            }
            if !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(format!("segment '{}' is not numeric", segment)));
            }
            let value = segment
                .parse::<u64>()
                .map_err(|_| invalid(format!("segment '{}' is too large", segment)))?;
            segments.push(value);
        }

        if let Some(suffix) = suffix {
            if suffix.is_empty() {
                return Err(invalid("empty suffix after '-'".into()));
            }
            if !suffix.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(invalid(format!(
                    "suffix '{}' may only contain letters and digits",
                    suffix
                )));
            }
        }

        Ok(Self {
            raw: input.to_string(),
            segments,
            suffix: suffix.map(str::to_string),
        })
    }

    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Human-readable reason `input` is not a valid version, or `None` if it is.
    pub fn invalid_reason(input: &str) -> Option<String> {
        Self::parse(input).err().map(|e| e.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// True for versions carrying the mutable `-SNAPSHOT` suffix.
    pub fn is_snapshot(&self) -> bool {
        self.suffix
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(SNAPSHOT_SUFFIX))
    }

    /// True if the first `pattern.segments().len()` segments of `self`
    /// (zero-padded) equal the pattern's.
    ///
    /// A pattern carrying a suffix only accepts versions equal to it.
    pub fn is_compatible_with(&self, pattern: &Version) -> bool {
        if pattern.suffix.is_some() {
            return self == pattern;
        }
        (0..pattern.segments.len()).all(|i| self.segment(i) == pattern.segment(i))
    }

    fn segment(&self, index: usize) -> u64 {
        self.segments.get(index).copied().unwrap_or(0)
    }

    fn significant_segments(&self) -> &[u64] {
        let len = self
            .segments
            .iter()
            .rposition(|&s| s != 0)
            .map_or(0, |i| i + 1);
        &self.segments[..len]
    }

    // Snapshots sort below every other suffix of the same numeric version,
    // releases sort as the empty suffix.
    fn suffix_key(&self) -> (u8, &str) {
        match self.suffix.as_deref() {
            _ if self.is_snapshot() => (0, ""),
            Some(suffix) => (1, suffix),
            None => (1, ""),
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            match self.segment(i).cmp(&other.segment(i)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        self.suffix_key().cmp(&other.suffix_key())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_segments().hash(state);
        self.suffix_key().hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Version {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = PackageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_valid_versions() {
        for s in ["1", "1.0", "1.0.0", "10.20.30", "1.0-SNAPSHOT", "7.0-r10000"] {
            assert!(Version::is_valid(s), "{} should be valid", s);
        }
    }

    #[test]
    fn test_parse_invalid_versions() {
        for s in ["", "a", "1.", ".1", "1..0", "1.0-", "1.0-rc.1", "1.0-rc-1", "v1.0", " 1.0"] {
            assert!(!Version::is_valid(s), "{:?} should be invalid", s);
        }
    }

    #[test]
    fn test_invalid_reason_cites_input() {
        let reason = Version::invalid_reason("1.x").unwrap();
        assert!(reason.contains("1.x"));
        assert!(reason.contains("'x' is not numeric"));
        assert_eq!(Version::invalid_reason("1.2"), None);
    }

    #[test]
    fn test_zero_padding() {
        assert_eq!(v("1").cmp(&v("1.0")), Ordering::Equal);
        assert_eq!(v("1.0").cmp(&v("1.0.0")), Ordering::Equal);
        assert_eq!(v("1"), v("1.0.0"));
        assert!(v("1.0") < v("1.0.1"));
    }

    #[test]
    fn test_numeric_not_lexical() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("10") > v("9.9.9"));
    }

    #[test]
    fn test_release_beats_snapshot() {
        assert!(v("1.0") > v("1.0-SNAPSHOT"));
        assert!(v("1.0.0") > v("1.0-snapshot"));
        assert!(v("1.0.1-SNAPSHOT") > v("1.0"));
    }

    #[test]
    fn test_suffixes_compare_lexically() {
        assert!(v("1.0-r2") > v("1.0-r10"));
        assert!(v("1.0-b") > v("1.0-a"));
        assert!(v("1.0-a") > v("1.0"));
        assert!(v("1.0-a") > v("1.0-SNAPSHOT"));
    }

    #[test]
    fn test_compare_is_antisymmetric_and_reflexive() {
        let samples = [
            "1", "1.0", "1.0.0", "1.0.1", "1.0-SNAPSHOT", "1.0-r1", "2", "0.9.9", "1.0-a",
        ];
        for a in samples {
            assert_eq!(v(a).cmp(&v(a)), Ordering::Equal);
            for b in samples {
                assert_eq!(v(a).cmp(&v(b)), v(b).cmp(&v(a)).reverse(), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_hash_agrees_with_eq() {
        let set: HashSet<Version> = ["1", "1.0", "1.0.0", "1.0-SNAPSHOT", "1.0-snapshot"]
            .into_iter()
            .map(v)
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_snapshot_detection() {
        assert!(v("1.0-SNAPSHOT").is_snapshot());
        assert!(v("1.0-Snapshot").is_snapshot());
        assert!(!v("1.0-r100").is_snapshot());
        assert!(!v("1.0").is_snapshot());
    }

    #[test]
    fn test_compatible() {
        let pattern = v("1.0");
        for candidate in ["1", "1.0", "1.0.0", "1.0.1", "1.0.1-SNAPSHOT"] {
            assert!(v(candidate).is_compatible_with(&pattern), "{}", candidate);
        }
        for candidate in ["1.1", "2.0", "0.9"] {
            assert!(!v(candidate).is_compatible_with(&pattern), "{}", candidate);
        }
        assert!(v("1.0-r1").is_compatible_with(&v("1.0-r1")));
        assert!(!v("1.0").is_compatible_with(&v("1.0-r1")));
    }

    #[test]
    fn test_display_keeps_original_text() {
        assert_eq!(v("1.0.0").to_string(), "1.0.0");
        assert_eq!(v("2-SNAPSHOT").to_string(), "2-SNAPSHOT");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("1.2-r3")).unwrap();
        assert_eq!(json, "\"1.2-r3\"");
        let parsed: Version = serde_json::from_str("\"3.4\"").unwrap();
        assert_eq!(parsed, v("3.4.0"));
        assert!(serde_json::from_str::<Version>("\"3.x\"").is_err());
    }
}
