//! Per-request error types
//!
//! Unlike catalog errors these are recoverable: the caller fixes the request
//! and tries again. Unit-level soft failures (budget, missing content) are
//! reported inside the result and never surface here.

use std::path::PathBuf;
use stdload_types::{AtomSyntaxError, UnitId};
use thiserror::Error;

/// The request text or atom list could not be turned into a load request
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing to load
    #[error("empty request")]
    Empty,

    /// A leading `@` directive other than `@load`
    #[error("unknown directive in '{input}', expected '@load'")]
    Directive {
        /// Offending request text
        input: String,
    },

    /// `[` without `]` or the other way round
    #[error("unbalanced brackets in '{input}'")]
    UnbalancedBrackets {
        /// Offending request text
        input: String,
    },

    /// Two separators with nothing between them, or a trailing separator
    #[error("empty atom in '{input}'")]
    EmptyAtom {
        /// Offending request text
        input: String,
    },

    /// An atom that is not `CODE`, `CODE:section`, `CODE:*` or `product:NAME`
    #[error("malformed atom '{atom}': {source}")]
    Atom {
        /// Offending atom
        atom: String,
        /// What is wrong with it
        #[source]
        source: AtomSyntaxError,
    },

    /// No standard with this code
    #[error("unknown standard '{code}'")]
    UnknownStandard {
        /// Requested code
        code: String,
    },

    /// The standard exists but has no such section
    #[error("standard '{code}' has no section '{section}'")]
    UnknownSection {
        /// Requested code
        code: String,
        /// Requested section
        section: String,
    },

    /// No product or stack preset with this name
    #[error("unknown product '{name}'")]
    UnknownProduct {
        /// Requested alias
        name: String,
    },

    /// A product's atom list names another product
    #[error("product '{product}' contains nested alias '{atom}'")]
    NestedAlias {
        /// Product being expanded
        product: String,
        /// The nested `product:` atom
        atom: String,
    },

    /// Neither a built-in strategy nor a profile
    #[error("unknown strategy or profile '{name}'")]
    UnknownStrategy {
        /// Requested name
        name: String,
    },
}

/// Two explicitly requested units exclude each other
#[derive(Debug, Error, PartialEq, Eq)]
#[error("explicitly requested {first} conflicts with explicitly requested {second}; request only one of them")]
pub struct ConflictError {
    /// Earlier unit in candidate order
    pub first: UnitId,
    /// Later unit in candidate order
    pub second: UnitId,
}

/// The only error [`crate::Loader::resolve`] returns
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The request could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The request names two conflicting units
    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

/// A section's content could not be located
#[derive(Debug, Error)]
pub enum ContentError {
    /// The content file does not exist under the content root
    #[error("content file {path:?} not found")]
    NotFound {
        /// Path relative to the content root
        path: PathBuf,
    },

    /// The content file exists but could not be read
    #[error("failed to read content file {path:?}: {source}")]
    Io {
        /// Path relative to the content root
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file has no heading matching the section
    #[error("no heading '{heading}' in {path:?}")]
    HeadingNotFound {
        /// Path relative to the content root
        path: PathBuf,
        /// Heading text or slug looked for
        heading: String,
    },
}

/// Result type for request parsing
pub type Result<T> = std::result::Result<T, ParseError>;
