//! Request parsing
//!
//! Accepted shapes, all equivalent up to atom order:
//!
//! ```text
//! @load [CS:api + SEC:api]
//! [CS:api, SEC:api]
//! CS:api + SEC:api
//! product:api
//! ```
//!
//! Parsing looks atoms up in the catalog and product table, so a
//! [`LoadRequest`] only ever names units that exist.

use stdload_catalog::{Catalog, ProductTable};
use stdload_types::{AtomSpec, SectionSelector, UnitId};
use tracing::debug;

use crate::error::{ParseError, Result};
use crate::strategy::LoadingStrategy;

const DIRECTIVE: &str = "@load";

/// A standard atom that is known to exist in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    /// Standard code
    pub code: String,
    /// Requested sections
    pub selector: SectionSelector,
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.selector {
            SectionSelector::All => write!(f, "{}:*", self.code),
            SectionSelector::Named(section) => write!(f, "{}:{}", self.code, section),
        }
    }
}

/// A parsed, validated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    atoms: Vec<Atom>,
    budget_tokens: Option<u64>,
    strategy: LoadingStrategy,
}

impl LoadRequest {
    /// Atoms in request order, profile base atoms first, duplicates removed
    #[must_use]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Effective budget: the caller's, else the profile default
    #[must_use]
    pub fn budget_tokens(&self) -> Option<u64> {
        self.budget_tokens
    }

    /// Strategy the request resolves with
    #[must_use]
    pub fn strategy(&self) -> &LoadingStrategy {
        &self.strategy
    }
}

/// Split request text into raw atom strings without looking anything up
pub fn split_request(input: &str) -> Result<Vec<String>> {
    let mut body = input.trim();

    if body.starts_with('@') {
        let rest = body
            .strip_prefix(DIRECTIVE)
            .filter(|rest| {
                rest.is_empty() || rest.starts_with(char::is_whitespace) || rest.starts_with('[')
            })
            .ok_or_else(|| ParseError::Directive {
                input: input.to_string(),
            })?;
        body = rest.trim();
    }

    let opens = body.starts_with('[');
    let closes = body.ends_with(']');
    if opens != closes || (opens && body.len() < 2) {
        return Err(ParseError::UnbalancedBrackets {
            input: input.to_string(),
        });
    }
    if opens {
        body = body[1..body.len() - 1].trim();
    }
    if body.contains(|c: char| c == '[' || c == ']') {
        return Err(ParseError::UnbalancedBrackets {
            input: input.to_string(),
        });
    }

    if body.is_empty() {
        return Ok(Vec::new());
    }

    let mut atoms = Vec::new();
    for piece in body.split(|c: char| c == '+' || c == ',') {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(ParseError::EmptyAtom {
                input: input.to_string(),
            });
        }
        atoms.push(piece.to_string());
    }
    Ok(atoms)
}

/// Turns request text or atom lists into [`LoadRequest`]s
#[derive(Debug, Clone, Copy)]
pub struct QueryParser<'a> {
    catalog: &'a Catalog,
    products: &'a ProductTable,
}

impl<'a> QueryParser<'a> {
    /// Parser over a catalog and its product table
    #[must_use]
    pub fn new(catalog: &'a Catalog, products: &'a ProductTable) -> Self {
        Self { catalog, products }
    }

    /// Parse request text
    pub fn parse(
        &self,
        input: &str,
        budget: Option<u64>,
        strategy: Option<&str>,
    ) -> Result<LoadRequest> {
        let atoms = split_request(input)?;
        self.parse_atoms(&atoms, budget, strategy)
    }

    /// Parse an already split list of atom strings
    pub fn parse_atoms<S: AsRef<str>>(
        &self,
        atoms: &[S],
        budget: Option<u64>,
        strategy: Option<&str>,
    ) -> Result<LoadRequest> {
        let strategy = match strategy {
            Some(name) => LoadingStrategy::lookup(name, self.products)?,
            None => LoadingStrategy::default(),
        };

        let mut specs = strategy.base.clone();
        for raw in atoms {
            let raw = raw.as_ref().trim();
            let spec: AtomSpec = raw.parse().map_err(|source| ParseError::Atom {
                atom: raw.to_string(),
                source,
            })?;
            specs.push(spec);
        }

        let mut resolved: Vec<Atom> = Vec::new();
        for spec in specs {
            for atom in self.expand(spec)? {
                if !resolved.contains(&atom) {
                    resolved.push(atom);
                }
            }
        }

        if resolved.is_empty() {
            return Err(ParseError::Empty);
        }

        debug!(
            "parsed request into {} atoms with strategy {}",
            resolved.len(),
            strategy.name
        );

        Ok(LoadRequest {
            atoms: resolved,
            budget_tokens: budget.or(strategy.default_budget),
            strategy,
        })
    }

    /// Expand one atom: products become their atom lists, standards are checked
    fn expand(&self, spec: AtomSpec) -> Result<Vec<Atom>> {
        match spec {
            AtomSpec::Product(name) => {
                let product = self
                    .products
                    .product(&name)
                    .ok_or_else(|| ParseError::UnknownProduct { name: name.clone() })?;
                let mut atoms = Vec::with_capacity(product.atoms.len());
                for inner in &product.atoms {
                    match inner {
                        AtomSpec::Product(_) => {
                            return Err(ParseError::NestedAlias {
                                product: name,
                                atom: inner.to_string(),
                            })
                        }
                        AtomSpec::Standard { code, selector } => {
                            atoms.push(self.check(code.clone(), selector.clone())?);
                        }
                    }
                }
                Ok(atoms)
            }
            AtomSpec::Standard { code, selector } => Ok(vec![self.check(code, selector)?]),
        }
    }

    fn check(&self, code: String, selector: SectionSelector) -> Result<Atom> {
        if self.catalog.get(&code).is_none() {
            return Err(ParseError::UnknownStandard { code });
        }
        if let SectionSelector::Named(section) = &selector {
            if !self.catalog.contains(&UnitId::new(code.as_str(), section.as_str())) {
                return Err(ParseError::UnknownSection {
                    code,
                    section: section.clone(),
                });
            }
        }
        Ok(Atom { code, selector })
    }
}
