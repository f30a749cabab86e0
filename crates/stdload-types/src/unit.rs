use serde::{Deserialize, Serialize};
use std::fmt;

use crate::priority::{Origin, Priority};

/// Identifies one loadable piece of content: a section of a standard
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId {
    pub code: String,
    pub section: String,
}

impl UnitId {
    pub fn new(code: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            section: section.into(),
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.code, self.section)
    }
}

/// Why a candidate unit was left out of the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    OverBudget,
    Conflict,
    Duplicate,
    MissingContent,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::OverBudget => "over_budget",
            SkipReason::Conflict => "conflict",
            SkipReason::Duplicate => "duplicate",
            SkipReason::MissingContent => "missing_content",
        })
    }
}

/// A candidate produced by the resolver.
///
/// `included` and `skip_reason` always agree: a unit is included exactly
/// when it has no skip reason. Only [`ResolvedUnit::skip`] changes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedUnit {
    #[serde(flatten)]
    pub id: UnitId,
    pub origin: Origin,
    pub priority: Priority,
    pub tokens: u64,
    /// Position of the section in the catalog (standards in manifest order,
    /// then sections in declaration order)
    #[serde(skip)]
    pub catalog_index: usize,
    included: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_reason: Option<SkipReason>,
}

impl ResolvedUnit {
    pub fn new(
        id: UnitId,
        origin: Origin,
        priority: Priority,
        tokens: u64,
        catalog_index: usize,
    ) -> Self {
        Self {
            id,
            origin,
            priority,
            tokens,
            catalog_index,
            included: true,
            skip_reason: None,
        }
    }

    pub fn included(&self) -> bool {
        self.included
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.skip_reason
    }

    pub fn skip(&mut self, reason: SkipReason) {
        self.included = false;
        self.skip_reason = Some(reason);
    }
}
