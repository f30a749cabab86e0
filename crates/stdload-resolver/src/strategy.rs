//! Loading strategy resolved from a strategy or profile name

use stdload_catalog::{EdgeKind, ProductTable, Profile};
use stdload_types::{AtomSpec, Priority, StrategyKind};

use crate::error::{ParseError, Result};

/// Everything the resolver needs to know about how far to expand a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingStrategy {
    /// Name the caller used: a built-in strategy or a profile
    pub name: String,
    /// Built-in behaviour underneath
    pub kind: StrategyKind,
    /// Lowest priority kept by wildcard expansion
    pub wildcard_floor: Option<Priority>,
    /// Atoms prepended to the request
    pub base: Vec<AtomSpec>,
    /// Budget used when the caller passes none
    pub default_budget: Option<u64>,
}

impl LoadingStrategy {
    /// A built-in strategy with no profile on top
    #[must_use]
    pub fn builtin(kind: StrategyKind) -> Self {
        Self {
            name: kind.as_str().to_string(),
            kind,
            wildcard_floor: kind.wildcard_floor(),
            base: Vec::new(),
            default_budget: None,
        }
    }

    /// A profile; its `min_priority` overrides the base strategy's floor
    #[must_use]
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            kind: profile.strategy,
            wildcard_floor: profile.min_priority.or(profile.strategy.wildcard_floor()),
            base: profile.base.clone(),
            default_budget: profile.budget,
        }
    }

    /// Resolve a name: built-in strategies first, then profiles
    pub fn lookup(name: &str, products: &ProductTable) -> Result<Self> {
        if let Ok(kind) = name.parse::<StrategyKind>() {
            return Ok(Self::builtin(kind));
        }
        products
            .profile(name)
            .map(Self::from_profile)
            .ok_or_else(|| ParseError::UnknownStrategy {
                name: name.to_string(),
            })
    }

    /// Whether the resolver walks edges of this kind
    #[must_use]
    pub fn follows(&self, kind: EdgeKind) -> bool {
        match kind {
            EdgeKind::Requires => true,
            EdgeKind::Recommends => self.kind.follows_recommends(),
            EdgeKind::Enhances => self.kind.follows_enhances(),
        }
    }

    /// Whether a wildcard expansion keeps a section of this priority
    #[must_use]
    pub fn keeps(&self, priority: Priority) -> bool {
        self.wildcard_floor
            .map_or(true, |floor| priority.is_at_least(floor))
    }
}

impl Default for LoadingStrategy {
    fn default() -> Self {
        Self::builtin(StrategyKind::default())
    }
}
