use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrepancy severity with total ordering.
///
/// Severities are ordered from least to most severe. When a verdict is
/// summarized, the most severe issue determines the headline outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Severity {
    /// Informational note, not a discrepancy
    Info = 0,
    /// Minor discrepancy, typically waivable
    Minor = 1,
    /// Major discrepancy, requires applicant waiver
    Major = 2,
    /// Critical discrepancy, document set must be rejected
    Critical = 3,
}

impl Severity {
    /// Returns the more severe of two severities.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        std::cmp::max(self, other)
    }

    /// Returns true if this severity blocks acceptance outright.
    #[inline]
    pub fn is_blocking(&self) -> bool {
        *self == Severity::Critical
    }

    /// Returns the severity rank (0-3).
    #[inline]
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Parse from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INFO" => Some(Severity::Info),
            "MINOR" => Some(Severity::Minor),
            "MAJOR" => Some(Severity::Major),
            "CRITICAL" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Minor
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Minor => write!(f, "MINOR"),
            Severity::Major => write!(f, "MAJOR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}
