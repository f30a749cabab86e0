//! Product aliases, stack presets and loading profiles
//!
//! The product matrix maps short names to atom lists. A stack preset builds
//! on exactly one product (`uses`) and adds its own atoms; a profile is a
//! request template with a base strategy, optional section floor and
//! default budget.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use stdload_types::atom::is_key;
use stdload_types::{AtomSpec, Priority, SectionSelector, StrategyKind, UnitId};
use tracing::info;

use crate::catalog::Catalog;
use crate::error::ProductTableError;

type Result<T> = std::result::Result<T, ProductTableError>;

#[derive(Debug, Deserialize)]
struct ProductMatrix {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    products: BTreeMap<String, RawProduct>,
    #[serde(default)]
    stack_presets: BTreeMap<String, RawPreset>,
    #[serde(default)]
    profiles: BTreeMap<String, RawProfile>,
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct RawProduct {
    #[serde(default)]
    description: String,
    #[serde(default)]
    standards: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPreset {
    #[serde(default)]
    description: String,
    uses: String,
    #[serde(default)]
    standards: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    #[serde(default)]
    description: String,
    #[serde(default)]
    strategy: StrategyKind,
    #[serde(default)]
    base: Vec<String>,
    #[serde(default)]
    min_priority: Option<Priority>,
    #[serde(default)]
    budget: Option<u64>,
}

/// A product alias or stack preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Alias name, used as `product:NAME`
    pub name: String,
    /// Human description
    pub description: String,
    /// Product a stack preset builds on; `None` for plain products
    pub uses: Option<String>,
    /// Atoms in declaration order, preset atoms after the product's
    pub atoms: Vec<AtomSpec>,
}

impl Product {
    /// True for stack presets
    #[must_use]
    pub fn is_preset(&self) -> bool {
        self.uses.is_some()
    }

    /// Atoms rendered back to request syntax, e.g. `[CS:api + SEC:api]`
    #[must_use]
    pub fn to_request(&self) -> String {
        let atoms: Vec<String> = self.atoms.iter().map(ToString::to_string).collect();
        format!("[{}]", atoms.join(" + "))
    }
}

/// A named request template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Profile name, accepted wherever a strategy name is
    pub name: String,
    /// Human description
    pub description: String,
    /// Strategy the profile builds on
    pub strategy: StrategyKind,
    /// Atoms prepended to every request made with this profile
    pub base: Vec<AtomSpec>,
    /// Lowest priority kept when expanding wildcards
    pub min_priority: Option<Priority>,
    /// Budget used when the caller gives none
    pub budget: Option<u64>,
}

/// Product matrix, validated against a catalog
#[derive(Debug, Default)]
pub struct ProductTable {
    version: u32,
    products: BTreeMap<String, Product>,
    profiles: BTreeMap<String, Profile>,
}

impl ProductTable {
    /// A table with no products and no profiles
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read a product matrix file and validate it against `catalog`
    pub fn from_path(path: impl AsRef<Path>, catalog: &Catalog) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ProductTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_yaml_str(&content, catalog)?;
        info!(
            "Loaded product table {:?}: {} products, {} profiles",
            path,
            table.products.len(),
            table.profiles.len()
        );
        Ok(table)
    }

    /// Parse a product matrix held in memory and validate it against `catalog`
    pub fn from_yaml_str(yaml: &str, catalog: &Catalog) -> Result<Self> {
        let matrix: ProductMatrix = serde_yaml::from_str(yaml)?;

        let mut names = HashSet::new();
        let all_names = matrix
            .products
            .keys()
            .chain(matrix.stack_presets.keys())
            .chain(matrix.profiles.keys());
        for name in all_names {
            if !is_key(name) {
                return Err(ProductTableError::InvalidName { name: name.clone() });
            }
            if !names.insert(name.as_str()) {
                return Err(ProductTableError::DuplicateName { name: name.clone() });
            }
        }

        let mut products = BTreeMap::new();
        for (name, raw) in &matrix.products {
            let atoms = parse_atoms(name, &raw.standards, catalog)?;
            products.insert(
                name.clone(),
                Product {
                    name: name.clone(),
                    description: raw.description.clone(),
                    uses: None,
                    atoms,
                },
            );
        }

        for (name, raw) in &matrix.stack_presets {
            let base = products
                .get(&raw.uses)
                .ok_or_else(|| ProductTableError::UnknownProduct {
                    preset: name.clone(),
                    product: raw.uses.clone(),
                })?;
            let mut atoms = base.atoms.clone();
            for atom in parse_atoms(name, &raw.standards, catalog)? {
                if !atoms.contains(&atom) {
                    atoms.push(atom);
                }
            }
            let preset = Product {
                name: name.clone(),
                description: raw.description.clone(),
                uses: Some(raw.uses.clone()),
                atoms,
            };
            products.insert(name.clone(), preset);
        }

        let mut profiles = BTreeMap::new();
        for (name, raw) in matrix.profiles {
            let base = parse_atoms(&name, &raw.base, catalog)?;
            profiles.insert(
                name.clone(),
                Profile {
                    name,
                    description: raw.description,
                    strategy: raw.strategy,
                    base,
                    min_priority: raw.min_priority,
                    budget: raw.budget,
                },
            );
        }

        Ok(Self {
            version: matrix.version,
            products,
            profiles,
        })
    }

    /// Product matrix schema version
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Look up a product or stack preset
    #[must_use]
    pub fn product(&self, name: &str) -> Option<&Product> {
        self.products.get(name)
    }

    /// Look up a profile
    #[must_use]
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Products and stack presets sorted by name
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Profiles sorted by name
    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }
}

/// Syntax-check atoms and make sure standard atoms exist in the catalog.
/// `product:` atoms are kept as they are; nesting is rejected when a
/// request expands the alias.
fn parse_atoms(owner: &str, raw: &[String], catalog: &Catalog) -> Result<Vec<AtomSpec>> {
    let mut atoms = Vec::with_capacity(raw.len());
    for text in raw {
        let atom: AtomSpec = text.parse().map_err(|source| ProductTableError::InvalidAtom {
            owner: owner.to_string(),
            atom: text.clone(),
            source,
        })?;

        let known = match &atom {
            AtomSpec::Product(_) => true,
            AtomSpec::Standard {
                code,
                selector: SectionSelector::All,
            } => catalog.get(code).is_some(),
            AtomSpec::Standard {
                code,
                selector: SectionSelector::Named(section),
            } => catalog.contains(&UnitId::new(code.clone(), section.clone())),
        };
        if !known {
            return Err(ProductTableError::UnknownReference {
                owner: owner.to_string(),
                atom: text.clone(),
            });
        }

        if !atoms.contains(&atom) {
            atoms.push(atom);
        }
    }
    Ok(atoms)
}
