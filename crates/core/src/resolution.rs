//! Operator decisions for imported hosts at commit time.

use serde::{Deserialize, Serialize};

/// Suffix appended to the domain of a host imported with [`Resolution::Rename`].
pub const RENAME_SUFFIX: &str = "-imported";

/// What to do with one candidate host when a session is committed.
///
/// A candidate with no resolution is created as a new host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Leave any existing host alone and do not import this candidate.
    Skip,
    /// Same as [`Resolution::Skip`]; kept as the operator-facing "keep existing".
    Keep,
    /// Replace the existing host's fields, preserving its identity.
    Overwrite,
    /// Import as a new host under `<domain>-imported`.
    Rename,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Keep => "keep",
            Self::Overwrite => "overwrite",
            Self::Rename => "rename",
        }
    }

    /// `true` when the candidate must not touch the store.
    pub fn is_skip(self) -> bool {
        matches!(self, Self::Skip | Self::Keep)
    }
}

/// The domain a renamed import is created under.
pub fn renamed_domain(domain_names: &str) -> String {
    format!("{domain_names}{RENAME_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_and_keep_are_both_skips() {
        assert!(Resolution::Skip.is_skip());
        assert!(Resolution::Keep.is_skip());
        assert!(!Resolution::Overwrite.is_skip());
        assert!(!Resolution::Rename.is_skip());
    }

    #[test]
    fn deserializes_lowercase_actions() {
        let r: Resolution = serde_json::from_str("\"overwrite\"").unwrap();
        assert_eq!(r, Resolution::Overwrite);
        assert!(serde_json::from_str::<Resolution>("\"merge\"").is_err());
    }

    #[test]
    fn rename_appends_fixed_suffix() {
        assert_eq!(renamed_domain("example.com"), "example.com-imported");
    }
}
