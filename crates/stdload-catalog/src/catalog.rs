//! The standards catalog
//!
//! Loaded once from the manifest, validated in full, then read-only. Every
//! lookup the resolver needs goes through here.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use stdload_types::{StandardRef, UnitId};
use tracing::{debug, info};

use crate::entry::{SectionMeta, StandardEntry};
use crate::error::{CatalogError, Result};
use crate::graph::DependencyGraph;

/// Category used by listings for entries that declare none
pub const UNCATEGORIZED: &str = "uncategorized";

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default = "default_version")]
    version: u32,
    standards: Vec<StandardEntry>,
}

fn default_version() -> u32 {
    1
}

/// Validated, immutable registry of standards
#[derive(Debug)]
pub struct Catalog {
    version: u32,
    /// Entries in manifest order
    entries: Vec<StandardEntry>,
    /// Code to position in `entries`
    by_code: HashMap<String, usize>,
    /// Unit to catalog order index
    order: HashMap<UnitId, usize>,
    graph: DependencyGraph,
}

impl Catalog {
    /// Read and validate a manifest file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_yaml_str(&content)?;
        info!(
            "Loaded catalog {:?}: {} standards, {} sections",
            path,
            catalog.len(),
            catalog.section_count()
        );
        Ok(catalog)
    }

    /// Parse and validate a manifest held in memory
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(yaml)?;
        let mut catalog = Self::from_entries(manifest.standards)?;
        catalog.version = manifest.version;
        Ok(catalog)
    }

    /// Validate already-parsed entries and build the graph
    pub fn from_entries(entries: Vec<StandardEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_code = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            entry.validate_shape()?;
            if by_code.insert(entry.code.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateCode {
                    code: entry.code.clone(),
                });
            }
        }

        let mut order = HashMap::new();
        let mut units = Vec::new();
        for entry in &entries {
            for section in &entry.sections {
                let unit = UnitId::new(entry.code.clone(), section.key.clone());
                order.insert(unit.clone(), units.len());
                units.push(unit);
            }
        }

        let mut catalog = Self {
            version: default_version(),
            entries,
            by_code,
            order,
            graph: DependencyGraph::default(),
        };
        catalog.check_references()?;

        catalog.graph = DependencyGraph::build(&catalog.entries);
        catalog.graph.check_acyclic(&units)?;

        debug!("Catalog validated: {} units", units.len());
        Ok(catalog)
    }

    /// Every reference must resolve and nothing may conflict with itself
    fn check_references(&self) -> Result<()> {
        for entry in &self.entries {
            for (kind, target) in entry.dependencies.labelled() {
                self.check_ref(&entry.code, kind, target)?;
            }
            if entry
                .dependencies
                .conflicts
                .iter()
                .any(|r| r.code == entry.code)
            {
                return Err(CatalogError::SelfConflict {
                    owner: entry.code.clone(),
                });
            }

            for section in &entry.sections {
                let owner = UnitId::new(entry.code.clone(), section.key.clone());
                let owner_name = owner.to_string();
                for (kind, target) in section.dependencies.labelled() {
                    self.check_ref(&owner_name, kind, target)?;
                }
                if section.dependencies.conflicts.iter().any(|r| r.matches(&owner)) {
                    return Err(CatalogError::SelfConflict { owner: owner_name });
                }
            }
        }
        Ok(())
    }

    fn check_ref(&self, owner: &str, kind: &'static str, target: &StandardRef) -> Result<()> {
        let resolves = match (&target.section, self.get(&target.code)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(section), Some(entry)) => entry.section(section).is_some(),
        };
        if resolves {
            Ok(())
        } else {
            Err(CatalogError::DanglingRef {
                owner: owner.to_string(),
                kind,
                target: target.to_string(),
            })
        }
    }

    /// Manifest schema version
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Get a standard by code
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&StandardEntry> {
        self.by_code.get(code).map(|&idx| &self.entries[idx])
    }

    /// Get a section by code and key
    #[must_use]
    pub fn section(&self, code: &str, key: &str) -> Option<&SectionMeta> {
        self.get(code).and_then(|entry| entry.section(key))
    }

    /// Get the section a unit points at
    #[must_use]
    pub fn unit(&self, unit: &UnitId) -> Option<(&StandardEntry, &SectionMeta)> {
        let entry = self.get(&unit.code)?;
        let section = entry.section(&unit.section)?;
        Some((entry, section))
    }

    /// True when the unit names an existing section
    #[must_use]
    pub fn contains(&self, unit: &UnitId) -> bool {
        self.order.contains_key(unit)
    }

    /// `CODE:*`: every section of `code` in declaration order
    #[must_use]
    pub fn expand_wildcard(&self, code: &str) -> Option<Vec<UnitId>> {
        self.get(code).map(|entry| {
            entry
                .section_keys()
                .map(|key| UnitId::new(code, key))
                .collect()
        })
    }

    /// Position of a unit in catalog order
    #[must_use]
    pub fn catalog_index(&self, unit: &UnitId) -> Option<usize> {
        self.order.get(unit).copied()
    }

    /// The dependency graph
    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Symmetric conflict test between two units
    #[must_use]
    pub fn conflicts(&self, a: &UnitId, b: &UnitId) -> bool {
        self.graph.conflicts(a, b)
    }

    /// Entries in manifest order
    pub fn entries(&self) -> impl Iterator<Item = &StandardEntry> {
        self.entries.iter()
    }

    /// Get number of standards
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of sections across all standards
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.order.len()
    }

    /// Entries grouped by category, optionally filtered to one category
    #[must_use]
    pub fn by_category(&self, category: Option<&str>) -> BTreeMap<&str, Vec<&StandardEntry>> {
        let mut groups: BTreeMap<&str, Vec<&StandardEntry>> = BTreeMap::new();
        for entry in self.entries.iter().filter(|e| in_category(e, category)) {
            let name = entry.category.as_deref().unwrap_or(UNCATEGORIZED);
            groups.entry(name).or_default().push(entry);
        }
        groups
    }

    /// Standards matching a keyword, sorted by code
    #[must_use]
    pub fn search(&self, keyword: &str) -> Vec<&StandardEntry> {
        let mut hits: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.matches_keyword(keyword))
            .collect();
        hits.sort_by(|a, b| a.code.cmp(&b.code));
        hits
    }

    /// Distinct content files referenced by the catalog, in first-use order
    #[must_use]
    pub fn content_files(&self) -> Vec<&Path> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for entry in &self.entries {
            for section in &entry.sections {
                let file = entry.content_file(section);
                if seen.insert(file) {
                    files.push(file);
                }
            }
        }
        files
    }

    /// Generate the standards list for an assistant prompt, in manifest order
    /// Format:
    /// Available standards (load with CODE, CODE:section or product:NAME):
    /// - CS: Coding Standards (4 sections)
    #[must_use]
    pub fn generate_summary(&self, category: Option<&str>) -> String {
        let mut summary =
            String::from("Available standards (load with CODE, CODE:section or product:NAME):\n");
        for entry in self.entries.iter().filter(|e| in_category(e, category)) {
            summary.push_str(&entry.to_summary());
            summary.push('\n');
        }
        summary
    }
}

/// `None` and `all` match every entry
fn in_category(entry: &StandardEntry, category: Option<&str>) -> bool {
    let name = entry.category.as_deref().unwrap_or(UNCATEGORIZED);
    category.map_or(true, |wanted| wanted == "all" || wanted == name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    const MANIFEST: &str = r#"
version: 2
standards:
  - code: CS
    full_name: Coding Standards
    file: docs/cs.md
    category: development
    sections:
      - { key: overview, tokens: 500, priority: critical, description: Principles }
      - { key: api, tokens: 1500, priority: high, description: API design }
      - { key: validation, tokens: 1000, priority: high, description: Input validation }
  - code: SEC
    full_name: Security Standards
    file: docs/sec.md
    category: security
    tags: [owasp]
    dependencies:
      recommends: [NIST-IG]
    sections:
      - { key: overview, tokens: 600, priority: critical }
      - key: api
        tokens: 1800
        priority: high
        dependencies:
          requires: ["CS:validation"]
  - code: NIST-IG
    full_name: NIST Implementation Guide
    file: docs/nist.md
    sections:
      - { key: overview, tokens: 400, priority: critical }
"#;

    #[test]
    fn test_load_and_lookup() {
        let catalog = Catalog::from_yaml_str(MANIFEST).unwrap();
        assert_eq!(catalog.version(), 2);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.section_count(), 6);
        assert_eq!(
            catalog.entries().map(|e| e.code.as_str()).collect::<Vec<_>>(),
            vec!["CS", "SEC", "NIST-IG"]
        );
        assert_eq!(catalog.section("SEC", "api").unwrap().tokens, 1800);
        assert!(catalog.section("SEC", "validation").is_none());
        assert!(catalog.contains(&UnitId::new("CS", "api")));
        assert!(!catalog.contains(&UnitId::new("cs", "api")));
    }

    #[test]
    fn test_wildcard_keeps_declaration_order() {
        let catalog = Catalog::from_yaml_str(MANIFEST).unwrap();
        assert_eq!(
            catalog.expand_wildcard("CS").unwrap(),
            vec![
                UnitId::new("CS", "overview"),
                UnitId::new("CS", "api"),
                UnitId::new("CS", "validation"),
            ]
        );
        assert!(catalog.expand_wildcard("TS").is_none());
    }

    #[test]
    fn test_catalog_order_index() {
        let catalog = Catalog::from_yaml_str(MANIFEST).unwrap();
        assert_eq!(catalog.catalog_index(&UnitId::new("CS", "overview")), Some(0));
        assert_eq!(catalog.catalog_index(&UnitId::new("SEC", "overview")), Some(3));
        assert_eq!(catalog.catalog_index(&UnitId::new("NIST-IG", "overview")), Some(5));
    }

    #[test]
    fn test_dangling_section_ref_is_fatal() {
        let yaml = MANIFEST.replace("\"CS:validation\"", "\"CS:security\"");
        let err = Catalog::from_yaml_str(&yaml).unwrap_err();
        match err {
            CatalogError::DanglingRef {
                owner,
                kind,
                target,
            } => {
                assert_eq!(owner, "SEC:api");
                assert_eq!(kind, "requires");
                assert_eq!(target, "CS:security");
            }
            other => panic!("expected dangling ref, got {other}"),
        }
    }

    #[test]
    fn test_dangling_code_ref_is_fatal() {
        let yaml = MANIFEST.replace("recommends: [NIST-IG]", "recommends: [GDPR]");
        assert!(matches!(
            Catalog::from_yaml_str(&yaml),
            Err(CatalogError::DanglingRef { .. })
        ));
    }

    #[test]
    fn test_duplicate_code_is_fatal() {
        let yaml = MANIFEST.replace("code: NIST-IG", "code: CS");
        assert!(matches!(
            Catalog::from_yaml_str(&yaml),
            Err(CatalogError::DuplicateCode { code }) if code == "CS"
        ));
    }

    #[test]
    fn test_self_conflict_is_fatal() {
        let yaml = MANIFEST.replace("recommends: [NIST-IG]", "conflicts: [SEC]");
        assert!(matches!(
            Catalog::from_yaml_str(&yaml),
            Err(CatalogError::SelfConflict { owner }) if owner == "SEC"
        ));
    }

    #[test]
    fn test_empty_and_malformed() {
        assert!(matches!(
            Catalog::from_yaml_str("standards: []"),
            Err(CatalogError::Empty)
        ));
        assert!(matches!(
            Catalog::from_yaml_str("standards: {not: a list}"),
            Err(CatalogError::Malformed(_))
        ));
    }

    #[test]
    fn test_grouping_and_search() {
        let catalog = Catalog::from_yaml_str(MANIFEST).unwrap();

        let groups = catalog.by_category(None);
        assert_eq!(
            groups.keys().copied().collect::<Vec<_>>(),
            vec!["development", "security", UNCATEGORIZED]
        );
        let security = catalog.by_category(Some("security"));
        assert_eq!(security.len(), 1);
        assert_eq!(catalog.by_category(Some("all")).len(), 3);

        let hits: Vec<_> = catalog.search("OWASP").iter().map(|e| e.code.as_str()).collect();
        assert_eq!(hits, vec!["SEC"]);
        let hits: Vec<_> = catalog.search("standards").iter().map(|e| e.code.as_str()).collect();
        assert_eq!(hits, vec!["CS", "SEC"]);
    }

    #[test]
    fn test_summary_lists_every_standard() {
        let catalog = Catalog::from_yaml_str(MANIFEST).unwrap();
        let summary = catalog.generate_summary(None);
        assert!(summary.starts_with("Available standards"));
        assert!(summary.contains("- CS: Coding Standards (3 sections)"));
        assert!(summary.contains("- NIST-IG: NIST Implementation Guide (1 sections)"));

        let summary = catalog.generate_summary(Some("security"));
        assert_eq!(summary.lines().count(), 2);
        assert!(summary.ends_with("- SEC: Security Standards (2 sections)\n"));
        assert_eq!(catalog.content_files().len(), 3);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();
        let catalog = Catalog::from_path(file.path()).unwrap();
        assert_eq!(catalog.len(), 3);

        let missing = Catalog::from_path("/definitely/not/here/MANIFEST.yaml");
        assert!(matches!(missing, Err(CatalogError::Io { .. })));
    }
}
