//! Merge policies for parallel edges.

use std::fmt;
use std::str::FromStr;

use packgraph_common::utils::error::Error;
use serde::{Deserialize, Serialize};

/// How parallel edges between the same node pair are merged.
///
/// One policy is configured per property column. The first column's policy
/// also decides whether duplicate targets collapse at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregation {
    /// Unspecified; resolves to [`Aggregation::None`].
    #[default]
    Default,
    /// Keep every parallel edge.
    None,
    /// Keep one edge per target, the one with the smallest property values.
    Single,
    /// Keep the smallest property value.
    Min,
    /// Keep the largest property value.
    Max,
    /// Sum property values.
    Sum,
    /// Count parallel edges. Values must be normalised to `1.0` upstream.
    Count,
}

impl Aggregation {
    /// Resolves [`Aggregation::Default`] to a concrete policy.
    #[must_use]
    pub fn resolve(self) -> Self {
        match self {
            Self::Default => Self::None,
            other => other,
        }
    }

    /// Returns whether duplicate targets are collapsed under this policy.
    #[must_use]
    pub fn deduplicates(self) -> bool {
        !matches!(self.resolve(), Self::None)
    }

    /// Merges `value` into the already kept `current` value.
    #[inline]
    #[must_use]
    pub fn merge(self, current: f64, value: f64) -> f64 {
        match self {
            Self::Default | Self::None | Self::Single => current,
            Self::Min => current.min(value),
            Self::Max => current.max(value),
            Self::Sum | Self::Count => current + value,
        }
    }

    /// Maps an incoming property value to what gets stored.
    ///
    /// `Count` ignores the value and counts every edge as one.
    #[inline]
    #[must_use]
    pub fn normalize(self, value: f64) -> f64 {
        match self {
            Self::Count => 1.0,
            _ => value,
        }
    }

    /// Returns a human-readable name for the policy.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::None => "NONE",
            Self::Single => "SINGLE",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Sum => "SUM",
            Self::Count => "COUNT",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEFAULT" => Ok(Self::Default),
            "NONE" => Ok(Self::None),
            "SINGLE" => Ok(Self::Single),
            "MIN" => Ok(Self::Min),
            "MAX" => Ok(Self::Max),
            "SUM" => Ok(Self::Sum),
            "COUNT" => Ok(Self::Count),
            other => Err(Error::configuration(format!(
                "unknown aggregation '{other}'"
            ))),
        }
    }
}
