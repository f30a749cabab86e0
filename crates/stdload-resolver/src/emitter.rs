//! Turning selected units into the final load result
//!
//! The emitter only ever downgrades: an included unit whose content cannot
//! be found becomes `missing_content`, one whose content was already emitted
//! becomes `duplicate`. Documents are read at most once per emission.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use stdload_catalog::Catalog;
use stdload_types::{Origin, Priority, ResolvedUnit, SkipReason, UnitId};
use tracing::{debug, warn};

use crate::budget::included_tokens;
use crate::content::{estimate_tokens, extract_section, ContentSource, Extracted, HeadingMatch};
use crate::error::ContentError;

/// One loaded section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedUnit {
    /// Standard code
    pub code: String,
    /// Section key
    pub section: String,
    /// Why the unit was loaded
    pub origin: Origin,
    /// Catalog priority
    pub priority: Priority,
    /// Declared token estimate
    pub tokens: u64,
    /// Tokens measured on the extracted text
    pub measured_tokens: u64,
    /// Document the text came from, relative to the content root
    pub file: PathBuf,
    /// Section text, heading line included
    pub content: String,
}

/// One candidate that was left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedUnit {
    /// Standard code
    pub code: String,
    /// Section key
    pub section: String,
    /// Why the unit was a candidate
    pub origin: Origin,
    /// Declared token estimate
    pub tokens: u64,
    /// Why it was left out
    pub reason: SkipReason,
}

/// Everything a load produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadResult {
    /// Strategy or profile name used
    pub strategy: String,
    /// Effective budget, `None` when unlimited
    pub budget_tokens: Option<u64>,
    /// Declared tokens of the included units
    pub total_tokens: u64,
    /// Loaded sections in resolver order
    pub included: Vec<LoadedUnit>,
    /// Left-out candidates in resolver order
    pub skipped: Vec<SkippedUnit>,
    /// Notes on conflicts, missing content and the like
    pub diagnostics: Vec<String>,
}

impl LoadResult {
    /// Included sections joined into one markdown document
    #[must_use]
    pub fn to_markdown(&self) -> String {
        self.included
            .iter()
            .map(|unit| unit.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Included units as `CODE:section` strings
    #[must_use]
    pub fn included_ids(&self) -> Vec<String> {
        self.included
            .iter()
            .map(|u| format!("{}:{}", u.code, u.section))
            .collect()
    }
}

/// Where a unit's text lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// Document, relative to the content root
    pub file: PathBuf,
    /// Heading that opens the section
    pub heading: HeadingMatch,
}

/// Locate a unit's text in the content tree
#[must_use]
pub fn locate(catalog: &Catalog, unit: &UnitId) -> Option<Location> {
    let (entry, section) = catalog.unit(unit)?;
    let heading = match &section.heading {
        Some(text) => HeadingMatch::Text(text.clone()),
        None => HeadingMatch::Slug(section.key.clone()),
    };
    Some(Location {
        file: entry.content_file(section).to_path_buf(),
        heading,
    })
}

/// Reads every document at most once
pub(crate) struct DocumentCache<'a> {
    source: &'a dyn ContentSource,
    documents: HashMap<PathBuf, Result<String, ContentError>>,
}

impl<'a> DocumentCache<'a> {
    pub(crate) fn new(source: &'a dyn ContentSource) -> Self {
        Self {
            source,
            documents: HashMap::new(),
        }
    }

    /// The section at `location`, or a description of why it is missing
    pub(crate) fn section(&mut self, location: &Location) -> Result<Extracted, String> {
        let source = self.source;
        let document = self
            .documents
            .entry(location.file.clone())
            .or_insert_with(|| {
                debug!("reading {:?}", location.file);
                source.read(&location.file)
            });
        match document {
            Ok(text) => extract_section(text, &location.heading).ok_or_else(|| {
                ContentError::HeadingNotFound {
                    path: location.file.clone(),
                    heading: location.heading.to_string(),
                }
                .to_string()
            }),
            Err(err) => Err(err.to_string()),
        }
    }
}

/// Build the result from selected candidates
pub fn emit(
    catalog: &Catalog,
    source: &dyn ContentSource,
    mut units: Vec<ResolvedUnit>,
    mut diagnostics: Vec<String>,
    strategy: &str,
    budget_tokens: Option<u64>,
) -> LoadResult {
    let mut cache = DocumentCache::new(source);
    // (file, heading line) of every emitted section
    let mut emitted: HashSet<(PathBuf, usize)> = HashSet::new();
    let mut texts: HashMap<usize, (PathBuf, String)> = HashMap::new();

    for (i, unit) in units.iter_mut().enumerate() {
        if !unit.included() {
            continue;
        }
        let Some(location) = locate(catalog, &unit.id) else {
            unit.skip(SkipReason::MissingContent);
            diagnostics.push(format!("{}: not in the catalog", unit.id));
            continue;
        };
        match cache.section(&location) {
            Ok(found) => {
                if !emitted.insert((location.file.clone(), found.line)) {
                    unit.skip(SkipReason::Duplicate);
                    diagnostics.push(format!(
                        "{}: same section as an earlier unit ({:?} line {})",
                        unit.id,
                        location.file,
                        found.line + 1
                    ));
                    continue;
                }
                texts.insert(i, (location.file, found.text));
            }
            Err(err) => {
                warn!("{}: {}", unit.id, err);
                unit.skip(SkipReason::MissingContent);
                diagnostics.push(format!("{}: {}", unit.id, err));
            }
        }
    }

    let total_tokens = included_tokens(&units);
    let mut included = Vec::new();
    let mut skipped = Vec::new();
    for (i, unit) in units.into_iter().enumerate() {
        match (unit.skip_reason(), texts.remove(&i)) {
            (None, Some((file, content))) => included.push(LoadedUnit {
                measured_tokens: estimate_tokens(&content),
                code: unit.id.code,
                section: unit.id.section,
                origin: unit.origin,
                priority: unit.priority,
                tokens: unit.tokens,
                file,
                content,
            }),
            (reason, _) => skipped.push(SkippedUnit {
                reason: reason.unwrap_or(SkipReason::MissingContent),
                code: unit.id.code,
                section: unit.id.section,
                origin: unit.origin,
                tokens: unit.tokens,
            }),
        }
    }

    LoadResult {
        strategy: strategy.to_string(),
        budget_tokens,
        total_tokens,
        included,
        skipped,
        diagnostics,
    }
}
