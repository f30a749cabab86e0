//! stdload Catalog
//!
//! Static registry of standards with progressive disclosure in mind: the
//! catalog holds only metadata (sections, token estimates, priorities and
//! dependency edges); content stays on disk until a resolved unit is emitted.
//!
//! ## Features
//!
//! - YAML manifest with ordered sections per standard
//! - Fatal validation at load time: duplicate codes, dangling references,
//!   missing overviews, self conflicts and cyclic `requires` chains
//! - Dependency graph kept as three labelled adjacency maps plus a
//!   symmetric conflict relation
//! - Product matrix: product aliases, stack presets and loading profiles
//!
//! The catalog is an ordinary value: build it once and pass it by reference.

#![deny(unsafe_code, missing_docs)]

pub mod catalog;
pub mod entry;
pub mod error;
pub mod graph;
pub mod products;

pub use catalog::Catalog;
pub use entry::{Dependencies, SectionMeta, StandardEntry};
pub use error::{CatalogError, ProductTableError};
pub use graph::{DependencyGraph, EdgeKind, EdgeTarget};
pub use products::{Product, ProductTable, Profile};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Catalog, CatalogError, ProductTable, SectionMeta, StandardEntry};
}
