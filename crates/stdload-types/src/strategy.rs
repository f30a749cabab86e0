use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::priority::Priority;

/// A name that is not one of the built-in strategies
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy '{name}'")]
pub struct UnknownStrategyError {
    pub name: String,
}

/// Built-in loading strategies
///
/// | strategy | recommends | enhances | wildcard floor |
/// |---|---|---|---|
/// | minimal | no | no | critical |
/// | standard | yes | no | none |
/// | comprehensive | yes | yes | none |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Minimal,
    #[default]
    Standard,
    Comprehensive,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Minimal,
        StrategyKind::Standard,
        StrategyKind::Comprehensive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Minimal => "minimal",
            StrategyKind::Standard => "standard",
            StrategyKind::Comprehensive => "comprehensive",
        }
    }

    pub fn follows_recommends(self) -> bool {
        !matches!(self, StrategyKind::Minimal)
    }

    pub fn follows_enhances(self) -> bool {
        matches!(self, StrategyKind::Comprehensive)
    }

    /// Lowest priority a wildcard expansion keeps, `None` keeps everything
    pub fn wildcard_floor(self) -> Option<Priority> {
        match self {
            StrategyKind::Minimal => Some(Priority::Critical),
            StrategyKind::Standard | StrategyKind::Comprehensive => None,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = UnknownStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownStrategyError {
                name: s.to_string(),
            })
    }
}
