use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A priority name other than critical, high, medium or low
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown priority '{name}'")]
pub struct UnknownPriorityError {
    pub name: String,
}

/// Section priority. Variants are declared highest first, so the derived
/// `Ord` sorts `Critical` before `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// True when `self` ranks at or above `floor`
    pub fn is_at_least(self, floor: Priority) -> bool {
        self <= floor
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = UnknownPriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(UnknownPriorityError {
                name: other.to_string(),
            }),
        }
    }
}

/// Why a unit is a candidate for loading. Declared strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Explicit,
    Required,
    Recommended,
    Enhancement,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Explicit => "explicit",
            Origin::Required => "required",
            Origin::Recommended => "recommended",
            Origin::Enhancement => "enhancement",
        }
    }

    /// Whether `self` should replace `other` when both reach the same unit
    pub fn outranks(self, other: Origin) -> bool {
        self < other
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
