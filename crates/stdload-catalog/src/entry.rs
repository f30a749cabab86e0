//! Standard entry definition and per-entry validation
//!
//! Each standard is one record of the manifest with ordered sections

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use stdload_types::atom::{is_code, is_key};
use stdload_types::{Priority, StandardRef, OVERVIEW_SECTION};

use crate::error::{CatalogError, Result};

/// Dependency declarations of an entry or a section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    /// Loaded transitively alongside the owner
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<StandardRef>,
    /// Loaded one hop away when the strategy follows recommendations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommends: Vec<StandardRef>,
    /// Loaded one hop away by the comprehensive strategy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enhances: Vec<StandardRef>,
    /// Must never be loaded together with the owner
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<StandardRef>,
}

impl Dependencies {
    /// True when no edge of any kind is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requires.is_empty()
            && self.recommends.is_empty()
            && self.enhances.is_empty()
            && self.conflicts.is_empty()
    }

    /// All declared references with their edge label
    pub fn labelled(&self) -> impl Iterator<Item = (&'static str, &StandardRef)> {
        self.requires
            .iter()
            .map(|r| ("requires", r))
            .chain(self.recommends.iter().map(|r| ("recommends", r)))
            .chain(self.enhances.iter().map(|r| ("enhances", r)))
            .chain(self.conflicts.iter().map(|r| ("conflicts", r)))
    }
}

/// Metadata of one section of a standard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMeta {
    /// Key, unique within the entry
    pub key: String,
    /// Estimated size of the section content
    pub tokens: u64,
    /// Selection priority under a budget
    pub priority: Priority,
    /// Short human description
    #[serde(default)]
    pub description: String,
    /// Markdown heading locating the section; defaults to the heading whose slug is `key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    /// Content file override, relative to the content root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Section-level dependencies, on top of the entry's
    #[serde(default, skip_serializing_if = "Dependencies::is_empty")]
    pub dependencies: Dependencies,
}

/// One standard of the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardEntry {
    /// Short unique code, e.g. `CS`
    pub code: String,
    /// Display name
    pub full_name: String,
    /// Content document, relative to the content root
    pub file: PathBuf,
    /// Grouping used by listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Free-form search keywords
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Informational document size in bytes
    #[serde(default)]
    pub size_estimate: u64,
    /// Informational whole-document token estimate
    #[serde(default)]
    pub token_estimate: u64,
    /// Sections in declaration order
    pub sections: Vec<SectionMeta>,
    /// Entry-level dependencies, applying to every section
    #[serde(default, skip_serializing_if = "Dependencies::is_empty")]
    pub dependencies: Dependencies,
}

impl StandardEntry {
    /// Look up a section by key
    #[must_use]
    pub fn section(&self, key: &str) -> Option<&SectionMeta> {
        self.sections.iter().find(|s| s.key == key)
    }

    /// Section keys in declaration order
    pub fn section_keys(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.key.as_str())
    }

    /// Sum of the per-section token estimates
    #[must_use]
    pub fn section_tokens(&self) -> u64 {
        self.sections.iter().map(|s| s.tokens).sum()
    }

    /// File holding the given section's content
    #[must_use]
    pub fn content_file<'a>(&'a self, section: &'a SectionMeta) -> &'a Path {
        section.file.as_deref().unwrap_or(&self.file)
    }

    /// Generate a concise one-line summary
    /// Format: "- {code}: {full_name} ({n} sections)"
    #[must_use]
    pub fn to_summary(&self) -> String {
        format!(
            "- {}: {} ({} sections)",
            self.code,
            self.full_name,
            self.sections.len()
        )
    }

    /// Case-insensitive keyword match over code, name, category, tags and
    /// section descriptions
    #[must_use]
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.to_lowercase();
        let hit = |text: &str| text.to_lowercase().contains(&needle);

        hit(self.code.as_str())
            || hit(self.full_name.as_str())
            || self.category.as_deref().is_some_and(hit)
            || self.tags.iter().any(|t| hit(t.as_str()))
            || self
                .sections
                .iter()
                .any(|s| hit(s.key.as_str()) || hit(s.description.as_str()))
    }

    /// Checks that only need the entry itself: syntax, uniqueness of
    /// sections, the mandatory overview, token estimates and paths.
    pub(crate) fn validate_shape(&self) -> Result<()> {
        if !is_code(&self.code) {
            return Err(CatalogError::InvalidCode {
                code: self.code.clone(),
            });
        }

        check_path(&self.code, &self.file)?;

        let mut seen = HashSet::new();
        for section in &self.sections {
            if !is_key(&section.key) {
                return Err(CatalogError::InvalidSection {
                    code: self.code.clone(),
                    section: section.key.clone(),
                });
            }
            if !seen.insert(section.key.as_str()) {
                return Err(CatalogError::DuplicateSection {
                    code: self.code.clone(),
                    section: section.key.clone(),
                });
            }
            if section.tokens == 0 {
                return Err(CatalogError::ZeroTokens {
                    code: self.code.clone(),
                    section: section.key.clone(),
                });
            }
            if let Some(file) = &section.file {
                check_path(&self.code, file)?;
            }
        }

        if !seen.contains(OVERVIEW_SECTION) {
            return Err(CatalogError::MissingOverview {
                code: self.code.clone(),
            });
        }

        Ok(())
    }
}

fn check_path(code: &str, path: &Path) -> Result<()> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.as_os_str().is_empty() || escapes {
        return Err(CatalogError::InvalidPath {
            code: code.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn entry(yaml: &str) -> StandardEntry {
        serde_yaml::from_str(yaml).expect("valid entry yaml")
    }

    const CS: &str = r#"
code: CS
full_name: Coding Standards
file: docs/CODING_STANDARDS.md
category: development
tags: [style, review]
sections:
  - key: overview
    tokens: 500
    priority: critical
    description: Core principles
  - key: api
    tokens: 1500
    priority: high
    description: API design rules
    dependencies:
      requires: ["CS:overview"]
"#;

    #[test]
    fn test_parse_entry() {
        let cs = entry(CS);
        assert_eq!(cs.code, "CS");
        assert_eq!(cs.section_keys().collect::<Vec<_>>(), vec!["overview", "api"]);
        assert_eq!(cs.section_tokens(), 2000);
        assert_eq!(cs.section("api").unwrap().priority, Priority::High);
        assert_eq!(
            cs.section("api").unwrap().dependencies.requires,
            vec![StandardRef::section("CS", "overview")]
        );
        assert!(cs.dependencies.is_empty());
        assert!(cs.validate_shape().is_ok());
    }

    #[test]
    fn test_missing_overview_rejected() {
        let mut cs = entry(CS);
        cs.sections.remove(0);
        assert!(matches!(
            cs.validate_shape(),
            Err(CatalogError::MissingOverview { .. })
        ));
    }

    #[test]
    fn test_duplicate_section_rejected() {
        let mut cs = entry(CS);
        let copy = cs.sections[1].clone();
        cs.sections.push(copy);
        assert!(matches!(
            cs.validate_shape(),
            Err(CatalogError::DuplicateSection { section, .. }) if section == "api"
        ));
    }

    #[test]
    fn test_zero_tokens_rejected() {
        let mut cs = entry(CS);
        cs.sections[1].tokens = 0;
        assert!(matches!(
            cs.validate_shape(),
            Err(CatalogError::ZeroTokens { .. })
        ));
    }

    #[test]
    fn test_escaping_paths_rejected() {
        let mut cs = entry(CS);
        cs.file = PathBuf::from("../secrets.md");
        assert!(matches!(
            cs.validate_shape(),
            Err(CatalogError::InvalidPath { .. })
        ));

        let mut cs = entry(CS);
        cs.file = PathBuf::from("/etc/passwd");
        assert!(cs.validate_shape().is_err());

        let mut cs = entry(CS);
        cs.sections[0].file = Some(PathBuf::from("docs/../../x.md"));
        assert!(cs.validate_shape().is_err());
    }

    #[test]
    fn test_keyword_matching() {
        let cs = entry(CS);
        assert!(cs.matches_keyword("coding"));
        assert!(cs.matches_keyword("REVIEW"));
        assert!(cs.matches_keyword("api design"));
        assert!(cs.matches_keyword("development"));
        assert!(!cs.matches_keyword("kubernetes"));
    }

    #[test]
    fn test_invalid_reference_syntax_fails_deserialization() {
        let bad = CS.replace("\"CS:overview\"", "\"cs:overview\"");
        assert!(serde_yaml::from_str::<StandardEntry>(&bad).is_err());
    }
}
