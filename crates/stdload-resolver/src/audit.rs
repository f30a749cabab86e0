//! Content audit: can every section be found, and do the declared token
//! estimates still match the text?

use serde::Serialize;
use std::path::PathBuf;
use stdload_catalog::Catalog;
use stdload_types::UnitId;
use tracing::{info, warn};

use crate::content::{estimate_tokens, ContentSource};
use crate::emitter::{locate, DocumentCache};

/// Drift above this percentage of the declared estimate is reported
pub const DEFAULT_DRIFT_PERCENT: u64 = 50;

/// A section whose content could not be located
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingSection {
    /// The unit
    #[serde(flatten)]
    pub unit: UnitId,
    /// Document it should live in
    pub file: PathBuf,
    /// What went wrong
    pub reason: String,
}

/// A section whose declared estimate is far from the measured size
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenDrift {
    /// The unit
    #[serde(flatten)]
    pub unit: UnitId,
    /// Estimate from the manifest
    pub declared: u64,
    /// Estimate from the text
    pub measured: u64,
}

impl TokenDrift {
    /// Signed drift as a percentage of the declared estimate
    #[must_use]
    pub fn percent(&self) -> i64 {
        let declared = i64::try_from(self.declared).unwrap_or(i64::MAX).max(1);
        let measured = i64::try_from(self.measured).unwrap_or(i64::MAX);
        (measured - declared).saturating_mul(100) / declared
    }
}

/// Outcome of [`audit`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Number of sections looked at
    pub sections_checked: usize,
    /// Sections that could not be located
    pub missing: Vec<MissingSection>,
    /// Sections over the drift threshold
    pub drift: Vec<TokenDrift>,
}

impl AuditReport {
    /// No section is missing. Drift alone only warrants a warning.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Locate every section of the catalog and compare its declared token
/// estimate with the measured one
pub fn audit(catalog: &Catalog, source: &dyn ContentSource, drift_percent: u64) -> AuditReport {
    let mut cache = DocumentCache::new(source);
    let mut report = AuditReport::default();

    for entry in catalog.entries() {
        for section in &entry.sections {
            let unit = UnitId::new(entry.code.as_str(), section.key.as_str());
            report.sections_checked += 1;

            let Some(location) = locate(catalog, &unit) else {
                continue;
            };
            match cache.section(&location) {
                Ok(found) => {
                    let measured = estimate_tokens(&found.text);
                    let declared = section.tokens;
                    if measured.abs_diff(declared).saturating_mul(100)
                        > declared.saturating_mul(drift_percent)
                    {
                        report.drift.push(TokenDrift {
                            unit,
                            declared,
                            measured,
                        });
                    }
                }
                Err(reason) => {
                    warn!("{}: {}", unit, reason);
                    report.missing.push(MissingSection {
                        unit,
                        file: location.file,
                        reason,
                    });
                }
            }
        }
    }

    info!(
        "Audited {} sections: {} missing, {} drifting",
        report.sections_checked,
        report.missing.len(),
        report.drift.len()
    );
    report
}
