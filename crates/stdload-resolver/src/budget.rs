//! Greedy selection under a token budget
//!
//! Candidates are packed by importance, not by request order: explicitly
//! requested overviews first, then by priority, origin and catalog position.
//! A unit that does not fit is skipped and packing continues with the next
//! one, so a small low-priority unit may still fit after a large one missed.

use stdload_types::{Origin, Priority, ResolvedUnit, SkipReason, OVERVIEW_SECTION};
use tracing::debug;

fn packing_key(unit: &ResolvedUnit) -> (bool, Priority, Origin, usize) {
    let pinned = unit.origin == Origin::Explicit && unit.id.section == OVERVIEW_SECTION;
    (!pinned, unit.priority, unit.origin, unit.catalog_index)
}

/// Mark units that do not fit as `over_budget`. Conflict-skipped units are
/// left alone. Returns the declared tokens of everything still included.
pub fn select(units: &mut [ResolvedUnit], budget: Option<u64>) -> u64 {
    let Some(budget) = budget else {
        return included_tokens(units);
    };

    let mut running: u64 = 0;
    for i in packing_order(units) {
        let unit = &mut units[i];
        match running.checked_add(unit.tokens) {
            Some(total) if total <= budget => running = total,
            _ => {
                debug!(
                    "{} ({} tokens) does not fit: {} of {} used",
                    unit.id, unit.tokens, running, budget
                );
                unit.skip(SkipReason::OverBudget);
            }
        }
    }
    running
}

/// Indices of the still included units, in the order they are packed
#[must_use]
pub fn packing_order(units: &[ResolvedUnit]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..units.len())
        .filter(|&i| units[i].included())
        .collect();
    order.sort_by_key(|&i| packing_key(&units[i]));
    order
}

/// Sum of the declared tokens of included units
#[must_use]
pub fn included_tokens(units: &[ResolvedUnit]) -> u64 {
    units
        .iter()
        .filter(|u| u.included())
        .map(|u| u.tokens)
        .sum()
}
