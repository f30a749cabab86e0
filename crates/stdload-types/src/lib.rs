//! stdload Types - Core types shared by the catalog, resolver and CLI
//!
//! This module defines the data model every other crate speaks: section
//! priorities, unit origins, references between standards, request atoms and
//! the resolved units that flow from the resolver to the emitter.

pub mod atom;
pub mod priority;
pub mod strategy;
pub mod unit;

pub use atom::{AtomSpec, AtomSyntaxError, SectionSelector, StandardRef, PRODUCT_PREFIX};
pub use priority::{Origin, Priority, UnknownPriorityError};
pub use strategy::{StrategyKind, UnknownStrategyError};
pub use unit::{ResolvedUnit, SkipReason, UnitId};

/// Name of the section every standard must declare
pub const OVERVIEW_SECTION: &str = "overview";
