//! Dependency graph over catalog units
//!
//! Three labelled adjacency maps are kept apart so the acyclicity of
//! `requires` can be checked without looking at the advisory edges, which
//! are allowed to form cycles.

use std::collections::HashMap;
use stdload_types::{Origin, StandardRef, UnitId};
use tracing::debug;

use crate::entry::{Dependencies, StandardEntry};
use crate::error::{CatalogError, Result};

/// Label of a loading edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Transitive, mandatory
    Requires,
    /// One hop, advisory
    Recommends,
    /// One hop, advisory, comprehensive strategy only
    Enhances,
}

impl EdgeKind {
    /// Origin given to a unit reached over this edge
    #[must_use]
    pub fn origin(self) -> Origin {
        match self {
            EdgeKind::Requires => Origin::Required,
            EdgeKind::Recommends => Origin::Recommended,
            EdgeKind::Enhances => Origin::Enhancement,
        }
    }
}

/// Where a loading edge lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeTarget {
    /// Target unit
    pub unit: UnitId,
    /// Reached through a bare code, so the strategy's wildcard floor applies
    pub whole_standard: bool,
}

/// Edges between units, built once from validated entries
#[derive(Debug, Default)]
pub struct DependencyGraph {
    requires: HashMap<UnitId, Vec<EdgeTarget>>,
    recommends: HashMap<UnitId, Vec<EdgeTarget>>,
    enhances: HashMap<UnitId, Vec<EdgeTarget>>,
    conflicts: HashMap<UnitId, Vec<StandardRef>>,
}

impl DependencyGraph {
    /// Build the graph. Entry-level edges apply to every section of the
    /// entry; an entry-level edge that lands on the section itself is
    /// dropped, so `requires: [CS:overview]` on `CS` does not loop. A bare
    /// code expands to every section of that standard in catalog order,
    /// minus the owning section.
    pub(crate) fn build(entries: &[StandardEntry]) -> Self {
        let mut graph = Self::default();
        let sections: HashMap<&str, Vec<&str>> = entries
            .iter()
            .map(|e| (e.code.as_str(), e.section_keys().collect()))
            .collect();

        for entry in entries {
            for section in &entry.sections {
                let unit = UnitId::new(entry.code.clone(), section.key.clone());
                let outer = &entry.dependencies;
                let inner = &section.dependencies;

                graph.requires.insert(
                    unit.clone(),
                    edges(&unit, &outer.requires, &inner.requires, &sections),
                );
                graph.recommends.insert(
                    unit.clone(),
                    edges(&unit, &outer.recommends, &inner.recommends, &sections),
                );
                graph.enhances.insert(
                    unit.clone(),
                    edges(&unit, &outer.enhances, &inner.enhances, &sections),
                );

                let declared = conflict_refs(outer, inner);
                if !declared.is_empty() {
                    graph.conflicts.insert(unit, declared);
                }
            }
        }

        graph
    }

    /// Outgoing edges of `unit` with the given label, in declaration order
    #[must_use]
    pub fn targets(&self, unit: &UnitId, kind: EdgeKind) -> &[EdgeTarget] {
        let map = match kind {
            EdgeKind::Requires => &self.requires,
            EdgeKind::Recommends => &self.recommends,
            EdgeKind::Enhances => &self.enhances,
        };
        map.get(unit).map(Vec::as_slice).unwrap_or_default()
    }

    /// Symmetric conflict test: holds if either side declares the other
    #[must_use]
    pub fn conflicts(&self, a: &UnitId, b: &UnitId) -> bool {
        let declares = |owner: &UnitId, other: &UnitId| {
            self.conflicts
                .get(owner)
                .is_some_and(|refs| refs.iter().any(|r| r.matches(other)))
        };
        a != b && (declares(a, b) || declares(b, a))
    }

    /// Depth-first search over `requires` only. `order` fixes the visiting
    /// order so the reported cycle is deterministic.
    pub(crate) fn check_acyclic(&self, order: &[UnitId]) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            graph: &DependencyGraph,
            unit: &UnitId,
            marks: &mut HashMap<UnitId, Mark>,
            path: &mut Vec<UnitId>,
        ) -> Result<()> {
            match marks.get(unit) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|u| u == unit).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(ToString::to_string).collect();
                    cycle.push(unit.to_string());
                    return Err(CatalogError::RequiresCycle {
                        cycle: cycle.join(" -> "),
                    });
                }
                None => {}
            }

            marks.insert(unit.clone(), Mark::Visiting);
            path.push(unit.clone());
            for next in graph.targets(unit, EdgeKind::Requires) {
                visit(graph, &next.unit, marks, path)?;
            }
            path.pop();
            marks.insert(unit.clone(), Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        let mut path = Vec::new();
        for unit in order {
            visit(self, unit, &mut marks, &mut path)?;
        }
        debug!("requires graph over {} units is acyclic", order.len());
        Ok(())
    }
}

fn edges(
    unit: &UnitId,
    outer: &[StandardRef],
    inner: &[StandardRef],
    sections: &HashMap<&str, Vec<&str>>,
) -> Vec<EdgeTarget> {
    let mut out: Vec<EdgeTarget> = Vec::new();
    let declared = outer
        .iter()
        .map(|r| (true, r))
        .chain(inner.iter().map(|r| (false, r)));

    for (entry_level, reference) in declared {
        let targets: Vec<EdgeTarget> = match &reference.section {
            Some(section) => vec![EdgeTarget {
                unit: UnitId::new(reference.code.as_str(), section.as_str()),
                whole_standard: false,
            }],
            None => sections
                .get(reference.code.as_str())
                .into_iter()
                .flatten()
                .map(|key| EdgeTarget {
                    unit: UnitId::new(reference.code.as_str(), *key),
                    whole_standard: true,
                })
                .filter(|target| target.unit != *unit)
                .collect(),
        };

        for target in targets {
            if entry_level && target.unit == *unit {
                continue;
            }
            match out.iter_mut().find(|seen| seen.unit == target.unit) {
                // Once named, a section is never filtered
                Some(seen) => seen.whole_standard &= target.whole_standard,
                None => out.push(target),
            }
        }
    }
    out
}

fn conflict_refs(outer: &Dependencies, inner: &Dependencies) -> Vec<StandardRef> {
    let mut out: Vec<StandardRef> = Vec::new();
    for r in outer.conflicts.iter().chain(&inner.conflicts) {
        if !out.contains(r) {
            out.push(r.clone());
        }
    }
    out
}
