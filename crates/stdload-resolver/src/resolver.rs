//! Expansion of a request into ordered, deduplicated candidates
//!
//! Units are discovered in origin order: explicit atoms first, then the
//! `requires` closure, then one hop of `recommends` and of `enhances`. A
//! unit found twice keeps the origin it was first found with, which is
//! therefore always the strongest one.
//!
//! A dependency on a bare standard code reaches every section of that
//! standard the strategy's wildcard floor keeps. A named section is always
//! reached.

use std::collections::{HashMap, VecDeque};
use stdload_catalog::{Catalog, EdgeKind, EdgeTarget};
use stdload_types::{Origin, Priority, ResolvedUnit, SectionSelector, SkipReason, UnitId};
use tracing::{debug, warn};

use crate::error::ConflictError;
use crate::query::{Atom, LoadRequest};

/// Resolver output: candidates in final order plus notes for the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates {
    /// Every candidate, conflict-skipped ones included
    pub units: Vec<ResolvedUnit>,
    /// Human-readable notes (dropped conflicts, empty wildcards)
    pub diagnostics: Vec<String>,
}

struct Slot {
    unit: ResolvedUnit,
    group: usize,
}

#[derive(Default)]
struct Discovery {
    slots: Vec<Slot>,
    index: HashMap<UnitId, usize>,
}

impl Discovery {
    /// Add a unit unless it is already known. Returns its slot when added.
    fn add(
        &mut self,
        catalog: &Catalog,
        id: &UnitId,
        origin: Origin,
        group: usize,
    ) -> Option<usize> {
        if self.index.contains_key(id) {
            return None;
        }
        let Some((_, section)) = catalog.unit(id) else {
            warn!("dependency target {} is not in the catalog", id);
            return None;
        };
        let catalog_index = catalog.catalog_index(id).unwrap_or(usize::MAX);
        let unit = ResolvedUnit::new(
            id.clone(),
            origin,
            section.priority,
            section.tokens,
            catalog_index,
        );
        let slot = self.slots.len();
        self.slots.push(Slot { unit, group });
        self.index.insert(id.clone(), slot);
        Some(slot)
    }
}

/// Resolve a request against the catalog
pub fn resolve(catalog: &Catalog, request: &LoadRequest) -> Result<Candidates, ConflictError> {
    let strategy = request.strategy();
    let mut found = Discovery::default();
    let mut diagnostics = Vec::new();

    for (group, atom) in request.atoms().iter().enumerate() {
        let units = expand_atom(catalog, atom, |priority| strategy.keeps(priority));
        if units.is_empty() {
            diagnostics.push(format!(
                "{atom} has no sections kept by strategy '{}'",
                strategy.name
            ));
        }
        for id in &units {
            found.add(catalog, id, Origin::Explicit, group);
        }
    }

    let mut queue: VecDeque<usize> = (0..found.slots.len()).collect();
    while let Some(slot) = queue.pop_front() {
        let (from, group) = (found.slots[slot].unit.id.clone(), found.slots[slot].group);
        for target in catalog.graph().targets(&from, EdgeKind::Requires) {
            if !reachable(catalog, target, |priority| strategy.keeps(priority)) {
                continue;
            }
            if let Some(added) = found.add(catalog, &target.unit, Origin::Required, group) {
                debug!("{} requires {}", from, target.unit);
                queue.push_back(added);
            }
        }
    }

    // Advisory edges are followed from explicit and required units only
    let sources = found.slots.len();
    for kind in [EdgeKind::Recommends, EdgeKind::Enhances] {
        if !strategy.follows(kind) {
            continue;
        }
        for slot in 0..sources {
            let (from, group) = (found.slots[slot].unit.id.clone(), found.slots[slot].group);
            for target in catalog.graph().targets(&from, kind) {
                if !reachable(catalog, target, |priority| strategy.keeps(priority)) {
                    continue;
                }
                if found.add(catalog, &target.unit, kind.origin(), group).is_some() {
                    debug!("{} {:?} {}", from, kind, target.unit);
                }
            }
        }
    }

    apply_conflicts(catalog, &mut found.slots, &mut diagnostics)?;

    found
        .slots
        .sort_by_key(|slot| (slot.group, slot.unit.origin, slot.unit.catalog_index));

    Ok(Candidates {
        units: found.slots.into_iter().map(|slot| slot.unit).collect(),
        diagnostics,
    })
}

/// Units an atom names: a named section as is, a wildcard filtered by `keep`
fn expand_atom(catalog: &Catalog, atom: &Atom, keep: impl Fn(Priority) -> bool) -> Vec<UnitId> {
    match &atom.selector {
        SectionSelector::Named(section) => {
            vec![UnitId::new(atom.code.as_str(), section.as_str())]
        }
        SectionSelector::All => catalog
            .expand_wildcard(&atom.code)
            .unwrap_or_default()
            .into_iter()
            .filter(|id| catalog.unit(id).is_some_and(|(_, meta)| keep(meta.priority)))
            .collect(),
    }
}

/// Whether an edge target survives the wildcard floor. Only targets that
/// came from a bare standard code are filtered.
fn reachable(catalog: &Catalog, target: &EdgeTarget, keep: impl Fn(Priority) -> bool) -> bool {
    !target.whole_standard
        || catalog
            .unit(&target.unit)
            .is_some_and(|(_, meta)| keep(meta.priority))
}

/// Explicit pairs are fatal. Otherwise the strongest surviving unit knocks
/// out everything weaker that it conflicts with; a unit that has been
/// knocked out no longer conflicts with anything.
fn apply_conflicts(
    catalog: &Catalog,
    slots: &mut [Slot],
    diagnostics: &mut Vec<String>,
) -> Result<(), ConflictError> {
    for (i, a) in slots.iter().enumerate() {
        if a.unit.origin != Origin::Explicit {
            continue;
        }
        for b in &slots[i + 1..] {
            if b.unit.origin == Origin::Explicit && catalog.conflicts(&a.unit.id, &b.unit.id) {
                return Err(ConflictError {
                    first: a.unit.id.clone(),
                    second: b.unit.id.clone(),
                });
            }
        }
    }

    let mut strength: Vec<usize> = (0..slots.len()).collect();
    strength.sort_by_key(|&i| (slots[i].unit.origin, i));

    for (rank, &winner) in strength.iter().enumerate() {
        if !slots[winner].unit.included() {
            continue;
        }
        for &loser in &strength[rank + 1..] {
            if !slots[loser].unit.included()
                || !catalog.conflicts(&slots[winner].unit.id, &slots[loser].unit.id)
            {
                continue;
            }
            slots[loser].unit.skip(SkipReason::Conflict);
            let note = format!(
                "{} {} skipped: conflicts with {} {}",
                slots[loser].unit.origin,
                slots[loser].unit.id,
                slots[winner].unit.origin,
                slots[winner].unit.id
            );
            warn!("{}", note);
            diagnostics.push(note);
        }
    }
    Ok(())
}
