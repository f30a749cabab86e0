//! stdload Resolver
//!
//! Turns a symbolic request into loaded content:
//!
//! ```text
//! request -> QueryParser -> LoadRequest -> resolve -> select -> emit -> LoadResult
//! ```
//!
//! ## Features
//!
//! - `@load [A + B]`, `A,B`, `CODE:*` and `product:NAME` request syntax
//! - Transitive `requires`, one-hop `recommends`/`enhances` per strategy
//! - Conflict handling: explicit pairs are an error, advisory losers are skipped
//! - Greedy priority packing under a token budget
//! - Markdown section extraction with per-load document caching
//! - Content audit against declared token estimates
//!
//! Everything here is synchronous and keeps its state per call; share the
//! catalog by reference across threads.

#![deny(unsafe_code, missing_docs)]

pub mod audit;
pub mod budget;
pub mod content;
pub mod emitter;
pub mod error;
pub mod loader;
pub mod query;
pub mod resolver;
pub mod strategy;

pub use audit::{audit, AuditReport, MissingSection, TokenDrift, DEFAULT_DRIFT_PERCENT};
pub use content::{estimate_tokens, ContentSource, FsContentSource, HeadingMatch};
pub use emitter::{LoadResult, LoadedUnit, SkippedUnit};
pub use error::{ConflictError, ContentError, LoadError, ParseError};
pub use loader::{Loader, Request};
pub use query::{Atom, LoadRequest, QueryParser};
pub use resolver::Candidates;
pub use strategy::LoadingStrategy;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{FsContentSource, LoadError, LoadResult, Loader, Request};
}
