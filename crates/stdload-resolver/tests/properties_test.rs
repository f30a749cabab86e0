//! Budget, determinism and dependency closure properties

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use stdload_catalog::{Catalog, EdgeKind, ProductTable};
use stdload_resolver::budget::{packing_order, select};
use stdload_resolver::{FsContentSource, Loader, LoadingStrategy};
use stdload_types::{Origin, Priority, ResolvedUnit, SkipReason, UnitId};

const ATOMS: [&str; 10] = [
    "CS",
    "CS:api",
    "CS:python",
    "SEC:api",
    "SEC:secrets",
    "NIST-IG",
    "TS",
    "PM:overview",
    "PM:retro",
    "product:api",
];

const STRATEGIES: [&str; 4] = ["minimal", "standard", "comprehensive", "audit_prep"];

fn fixtures() -> (Catalog, ProductTable, FsContentSource) {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let catalog = Catalog::from_path(root.join("MANIFEST.yaml")).unwrap();
    let products =
        ProductTable::from_path(root.join("config/product-matrix.yaml"), &catalog).unwrap();
    (catalog, products, FsContentSource::new(root))
}

fn request() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(ATOMS.to_vec()), 1..5)
        .prop_map(|atoms| atoms.into_iter().map(String::from).collect())
}

fn units() -> impl Strategy<Value = Vec<ResolvedUnit>> {
    prop::collection::vec((0..4usize, 0..4usize, 1..400u64, any::<bool>()), 1..12).prop_map(
        |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (priority, origin, tokens, overview))| {
                    let priority = [Priority::Critical, Priority::High, Priority::Medium, Priority::Low]
                        [priority];
                    let origin = [
                        Origin::Explicit,
                        Origin::Required,
                        Origin::Recommended,
                        Origin::Enhancement,
                    ][origin];
                    let section = if overview { "overview" } else { "body" };
                    ResolvedUnit::new(
                        UnitId::new(format!("U{i}"), section),
                        origin,
                        priority,
                        tokens,
                        i,
                    )
                })
                .collect()
        },
    )
}

fn included(units: &[ResolvedUnit]) -> HashSet<UnitId> {
    units
        .iter()
        .filter(|u| u.included())
        .map(|u| u.id.clone())
        .collect()
}

proptest! {
    #[test]
    fn test_selection_never_exceeds_budget(mut units in units(), budget in 0..2000u64) {
        let total = select(&mut units, Some(budget));
        prop_assert!(total <= budget);
        let sum: u64 = units.iter().filter(|u| u.included()).map(|u| u.tokens).sum();
        prop_assert_eq!(sum, total);
    }

    #[test]
    fn test_packed_prefix_survives_larger_budget(
        units in units(),
        budget in 0..2000u64,
        extra in 0..2000u64,
    ) {
        let order = packing_order(&units);
        let mut small = units.clone();
        select(&mut small, Some(budget));

        // Everything packed before the first miss fits at any larger budget
        let prefix: Vec<UnitId> = order
            .iter()
            .take_while(|&&i| small[i].included())
            .map(|&i| small[i].id.clone())
            .collect();

        let mut large = units;
        select(&mut large, Some(budget + extra));
        let kept = included(&large);
        for id in prefix {
            prop_assert!(kept.contains(&id), "{} dropped at a larger budget", id);
        }
    }

    #[test]
    fn test_unlimited_budget_keeps_every_candidate(mut units in units()) {
        let before = units.len();
        select(&mut units, None);
        prop_assert_eq!(included(&units).len(), before);
    }

    #[test]
    fn test_loads_are_deterministic_and_conserve_candidates(
        atoms in request(),
        budget in prop::option::of(0..600u64),
        strategy in prop::sample::select(STRATEGIES.to_vec()),
    ) {
        let (catalog, products, source) = fixtures();
        let loader = Loader::new(&catalog, &products, &source);

        let first = loader.resolve(atoms.clone(), budget, Some(strategy));
        let second = loader.resolve(atoms.clone(), budget, Some(strategy));
        prop_assert_eq!(&first, &second);

        // Explicit conflicts are the only way a valid request can fail
        let Ok(result) = first else {
            return Ok(());
        };

        if let Some(budget) = result.budget_tokens {
            prop_assert!(result.total_tokens <= budget);
        }

        let included: HashSet<String> = result.included_ids().into_iter().collect();
        let skipped: HashSet<String> = result
            .skipped
            .iter()
            .map(|s| format!("{}:{}", s.code, s.section))
            .collect();
        prop_assert_eq!(included.len(), result.included.len());
        prop_assert_eq!(skipped.len(), result.skipped.len());
        prop_assert!(included.is_disjoint(&skipped));

        // The candidate set does not depend on the budget
        let unlimited = loader.resolve(atoms, None, Some(strategy)).unwrap();
        prop_assert_eq!(
            unlimited.included.len() + unlimited.skipped.len(),
            result.included.len() + result.skipped.len()
        );
        prop_assert!(unlimited
            .skipped
            .iter()
            .all(|s| s.reason != SkipReason::OverBudget));
    }

    #[test]
    fn test_requires_closure_is_complete(
        atoms in request(),
        budget in prop::option::of(0..600u64),
        strategy in prop::sample::select(STRATEGIES.to_vec()),
    ) {
        let (catalog, products, source) = fixtures();
        let loader = Loader::new(&catalog, &products, &source);
        let Ok(result) = loader.resolve(atoms, budget, Some(strategy)) else {
            return Ok(());
        };
        let strategy = LoadingStrategy::lookup(&result.strategy, &products).unwrap();

        let candidates: Vec<(UnitId, Origin)> = result
            .included
            .iter()
            .map(|u| (UnitId::new(u.code.as_str(), u.section.as_str()), u.origin))
            .chain(
                result
                    .skipped
                    .iter()
                    .map(|s| (UnitId::new(s.code.as_str(), s.section.as_str()), s.origin)),
            )
            .collect();
        let known: HashSet<&UnitId> = candidates.iter().map(|(id, _)| id).collect();

        for (id, origin) in &candidates {
            if !matches!(origin, Origin::Explicit | Origin::Required) {
                continue;
            }
            for target in catalog.graph().targets(id, EdgeKind::Requires) {
                let (_, meta) = catalog.unit(&target.unit).unwrap();
                if target.whole_standard && !strategy.keeps(meta.priority) {
                    continue;
                }
                prop_assert!(
                    known.contains(&target.unit),
                    "{} requires {} but it is not a candidate",
                    id,
                    target.unit
                );
            }
        }
    }
}
