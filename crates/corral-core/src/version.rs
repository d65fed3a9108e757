//! Numeric server version tuples.
//!
//! Versions gate optional bootstrap behavior. Components are compared as
//! integers: `3.10` is newer than `3.9`, which a lexical comparison gets wrong.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered sequence of numeric version components (major, minor, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTuple(Vec<u64>);

impl VersionTuple {
    /// Creates a version from its components.
    #[must_use]
    pub fn new(components: impl Into<Vec<u64>>) -> Self {
        Self(components.into())
    }

    /// Parses a dotted version string leniently.
    ///
    /// Each component contributes its leading digits (`"0-rc1"` yields `0`).
    /// Parsing stops at the first component without leading digits, so an
    /// unparseable string yields an empty version.
    #[must_use]
    pub fn parse_lenient(input: &str) -> Self {
        let mut components = Vec::new();
        for part in input.trim().split('.') {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            match digits.parse::<u64>() {
                Ok(value) => components.push(value),
                Err(_) => break,
            }
        }
        Self(components)
    }

    /// Returns the components.
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.0
    }

    /// Returns true when no component is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if this version satisfies `threshold`.
    ///
    /// Components are compared left to right. At the first position where
    /// they differ the live component must be numerically greater. A position
    /// the live version does not have counts as unsatisfied. Equal components
    /// through the whole threshold satisfy it.
    #[must_use]
    pub fn at_least(&self, threshold: &Self) -> bool {
        for (position, wanted) in threshold.0.iter().enumerate() {
            let Some(live) = self.0.get(position) else {
                return false;
            };
            if live != wanted {
                return live > wanted;
            }
        }
        true
    }
}

impl fmt::Display for VersionTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "unknown");
        }
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl From<&[u64]> for VersionTuple {
    fn from(components: &[u64]) -> Self {
        Self(components.to_vec())
    }
}

/// Free-function form of [`VersionTuple::at_least`].
#[must_use]
pub fn version_at_least(version: &VersionTuple, threshold: &VersionTuple) -> bool {
    version.at_least(threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(components: &[u64]) -> VersionTuple {
        VersionTuple::from(components)
    }

    #[test]
    fn test_equal_versions_satisfy() {
        assert!(version_at_least(&v(&[3, 4]), &v(&[3, 4])));
    }

    #[test]
    fn test_comparison_is_numeric_not_lexical() {
        assert!(version_at_least(&v(&[3, 10]), &v(&[3, 9])));
        assert!(!version_at_least(&v(&[3, 9]), &v(&[3, 10])));
    }

    #[test]
    fn test_older_minor_does_not_satisfy() {
        assert!(!version_at_least(&v(&[3, 2]), &v(&[3, 4])));
    }

    #[test]
    fn test_first_differing_component_decides() {
        assert!(version_at_least(&v(&[4, 0]), &v(&[3, 4])));
        assert!(!version_at_least(&v(&[2, 9, 9]), &v(&[3, 0])));
    }

    #[test]
    fn test_extra_live_components_are_ignored() {
        assert!(version_at_least(&v(&[3, 4, 17]), &v(&[3, 4])));
    }

    #[test]
    fn test_missing_live_component_is_negative() {
        assert!(!version_at_least(&v(&[3]), &v(&[3, 4])));
        assert!(!version_at_least(&VersionTuple::default(), &v(&[3, 4])));
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(VersionTuple::parse_lenient("3.6.2"), v(&[3, 6, 2]));
        assert_eq!(VersionTuple::parse_lenient("4.0.0-rc1"), v(&[4, 0, 0]));
        assert_eq!(VersionTuple::parse_lenient("3.10.x"), v(&[3, 10]));
        assert!(VersionTuple::parse_lenient("garbage").is_empty());
        assert_eq!(VersionTuple::parse_lenient("3.6.2").to_string(), "3.6.2");
        assert_eq!(VersionTuple::default().to_string(), "unknown");
    }

    proptest! {
        #[test]
        fn prop_at_least_matches_numeric_ordering(
            live in prop::collection::vec(0u64..40, 2),
            wanted in prop::collection::vec(0u64..40, 2),
        ) {
            let expected = live >= wanted;
            prop_assert_eq!(v(&live).at_least(&v(&wanted)), expected);
        }

        #[test]
        fn prop_every_version_satisfies_itself(components in prop::collection::vec(any::<u64>(), 0..5)) {
            prop_assert!(v(&components).at_least(&v(&components)));
        }
    }
}
