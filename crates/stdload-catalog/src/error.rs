//! Error types for catalog and product table loading
//!
//! Both are load-time errors: a process that hits one must not serve requests.

use std::path::PathBuf;
use stdload_types::AtomSyntaxError;
use thiserror::Error;

/// Catalog validation and loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The manifest file could not be read
    #[error("failed to read catalog {path:?}: {source}")]
    Io {
        /// Manifest path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid YAML or does not match the schema
    #[error("malformed catalog: {0}")]
    Malformed(#[from] serde_yaml::Error),

    /// The manifest declares no standards at all
    #[error("catalog declares no standards")]
    Empty,

    /// Two entries share a code
    #[error("duplicate standard code '{code}'")]
    DuplicateCode {
        /// Offending code
        code: String,
    },

    /// A code does not follow the code syntax
    #[error("invalid standard code '{code}'")]
    InvalidCode {
        /// Offending code
        code: String,
    },

    /// Two sections of one entry share a key
    #[error("standard '{code}' declares section '{section}' twice")]
    DuplicateSection {
        /// Owning standard
        code: String,
        /// Repeated key
        section: String,
    },

    /// A section key does not follow the key syntax
    #[error("standard '{code}' has invalid section key '{section}'")]
    InvalidSection {
        /// Owning standard
        code: String,
        /// Offending key
        section: String,
    },

    /// An entry lacks the mandatory overview section
    #[error("standard '{code}' has no 'overview' section")]
    MissingOverview {
        /// Offending standard
        code: String,
    },

    /// A section declares a zero token estimate
    #[error("section '{code}:{section}' must declare a positive token estimate")]
    ZeroTokens {
        /// Owning standard
        code: String,
        /// Offending section
        section: String,
    },

    /// A content path is absolute or escapes the content root
    #[error("standard '{code}' points at {path:?}, which must be a relative path without '..'")]
    InvalidPath {
        /// Owning standard
        code: String,
        /// Offending path
        path: PathBuf,
    },

    /// A dependency names a standard or section that does not exist
    #[error("'{owner}' {kind} '{target}', which is not in the catalog")]
    DanglingRef {
        /// Declaring standard or section
        owner: String,
        /// Edge label (requires, recommends, ...)
        kind: &'static str,
        /// Unresolvable reference
        target: String,
    },

    /// A standard or section declares a conflict with itself
    #[error("'{owner}' declares a conflict with itself")]
    SelfConflict {
        /// Offending standard or section
        owner: String,
    },

    /// The requires graph has a cycle
    #[error("cyclic requires chain: {cycle}")]
    RequiresCycle {
        /// Units on the cycle, joined with " -> "
        cycle: String,
    },
}

/// Product table loading errors
#[derive(Debug, Error)]
pub enum ProductTableError {
    /// The product table file could not be read
    #[error("failed to read product table {path:?}: {source}")]
    Io {
        /// Table path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The table is not valid YAML or does not match the schema
    #[error("malformed product table: {0}")]
    Malformed(#[from] serde_yaml::Error),

    /// A name is used by more than one product, preset or profile
    #[error("name '{name}' is defined more than once across products, stack presets and profiles")]
    DuplicateName {
        /// Repeated name
        name: String,
    },

    /// A product, preset or profile name does not follow the key syntax
    #[error("'{name}' is not a valid product, preset or profile name")]
    InvalidName {
        /// Offending name
        name: String,
    },

    /// A stack preset builds on a product that does not exist
    #[error("stack preset '{preset}' uses unknown product '{product}'")]
    UnknownProduct {
        /// Offending preset
        preset: String,
        /// Missing product
        product: String,
    },

    /// An atom is syntactically invalid
    #[error("'{owner}' lists invalid atom '{atom}': {source}")]
    InvalidAtom {
        /// Declaring product, preset or profile
        owner: String,
        /// Offending atom text
        atom: String,
        /// Syntax problem
        #[source]
        source: AtomSyntaxError,
    },

    /// An atom names a standard or section that is not in the catalog
    #[error("'{owner}' lists '{atom}', which is not in the catalog")]
    UnknownReference {
        /// Declaring product, preset or profile
        owner: String,
        /// Offending atom
        atom: String,
    },
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, CatalogError>;
