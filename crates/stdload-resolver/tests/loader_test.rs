//! End-to-end loads against the fixture catalog in `tests/fixtures`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};
use stdload_catalog::{Catalog, ProductTable};
use stdload_resolver::{FsContentSource, LoadError, LoadResult, Loader, ParseError};
use stdload_types::{Origin, SkipReason};

fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixtures() -> (Catalog, ProductTable, FsContentSource) {
    let root = fixture_root();
    let catalog = Catalog::from_path(root.join("MANIFEST.yaml")).expect("fixture catalog");
    let products = ProductTable::from_path(root.join("config/product-matrix.yaml"), &catalog)
        .expect("fixture product table");
    (catalog, products, FsContentSource::new(root))
}

fn skipped(result: &LoadResult) -> Vec<(String, SkipReason)> {
    result
        .skipped
        .iter()
        .map(|s| (format!("{}:{}", s.code, s.section), s.reason))
        .collect()
}

#[test]
fn test_required_and_recommended_edges() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    let result = loader.resolve("@load SEC:api", None, None).unwrap();
    assert_eq!(
        result.included_ids(),
        vec!["SEC:api", "CS:validation", "NIST-IG:overview"]
    );
    let origins: Vec<Origin> = result.included.iter().map(|u| u.origin).collect();
    assert_eq!(
        origins,
        vec![Origin::Explicit, Origin::Required, Origin::Recommended]
    );
    assert_eq!(result.total_tokens, 165);
    assert!(result.skipped.is_empty());
    assert!(result.included[0]
        .content
        .contains("Authenticate every request"));

    // Minimal does not follow recommendations
    let result = loader.resolve("SEC:api", None, Some("minimal")).unwrap();
    assert_eq!(result.included_ids(), vec!["SEC:api", "CS:validation"]);
}

#[test]
fn test_bare_code_dependency_loads_whole_standard() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    // NIST-IG requires SEC; CS:api only recommends SEC:api
    let result = loader.resolve("[CS:api + NIST-IG]", None, None).unwrap();
    assert_eq!(
        result.included_ids(),
        vec![
            "CS:api",
            "NIST-IG:overview",
            "CS:validation",
            "SEC:overview",
            "SEC:api",
            "SEC:secrets",
        ]
    );
    let origins: Vec<Origin> = result.included.iter().map(|u| u.origin).collect();
    assert_eq!(
        origins,
        vec![
            Origin::Explicit,
            Origin::Explicit,
            Origin::Required,
            Origin::Required,
            Origin::Required,
            Origin::Required,
        ]
    );
    assert_eq!(result.total_tokens, 330);

    // The minimal floor applies to sections reached through a bare code
    let result = loader
        .resolve("NIST-IG:overview", None, Some("minimal"))
        .unwrap();
    assert_eq!(result.included_ids(), vec!["NIST-IG:overview", "SEC:overview"]);
}

#[test]
fn test_enhancements_need_comprehensive() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    let result = loader.resolve("PM:overview", None, None).unwrap();
    assert_eq!(result.included_ids(), vec!["PM:overview"]);

    let result = loader
        .resolve("PM:overview", None, Some("comprehensive"))
        .unwrap();
    assert_eq!(result.included_ids(), vec!["PM:overview", "TS:overview"]);
    assert_eq!(result.included[1].origin, Origin::Enhancement);
}

#[test]
fn test_advisory_conflict_is_skipped() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    // Retro recommends waterfall, and nothing conflicts with it yet
    let result = loader.resolve("PM:retro", None, None).unwrap();
    assert_eq!(result.included_ids(), vec!["PM:retro", "PM:waterfall"]);

    let result = loader.resolve("[PM:agile + PM:retro]", None, None).unwrap();
    assert_eq!(result.included_ids(), vec!["PM:agile", "PM:retro"]);
    assert_eq!(
        skipped(&result),
        vec![("PM:waterfall".to_string(), SkipReason::Conflict)]
    );
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.contains("PM:waterfall") && d.contains("PM:agile")));
    // Custom heading override
    assert!(result.included[0].content.starts_with("## Agile Delivery"));
}

#[test]
fn test_explicit_conflict_fails() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    let err = loader
        .resolve("PM:waterfall, PM:agile", None, None)
        .unwrap_err();
    assert!(matches!(err, LoadError::Conflict(_)));
    let message = err.to_string();
    assert!(message.contains("PM:waterfall"));
    assert!(message.contains("PM:agile"));
}

#[test]
fn test_missing_content_does_not_fail_the_load() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    let result = loader.resolve("TS", None, None).unwrap();
    assert_eq!(result.included_ids(), vec!["TS:overview", "TS:integration"]);
    assert_eq!(
        skipped(&result),
        vec![("TS:e2e".to_string(), SkipReason::MissingContent)]
    );
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.contains("E2E_TESTING.md")));
    assert_eq!(result.total_tokens, 95);

    // The minimal wildcard keeps critical sections only
    let result = loader.resolve("TS", None, Some("minimal")).unwrap();
    assert_eq!(result.included_ids(), vec!["TS:overview"]);
}

#[test]
fn test_profile_with_default_budget() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    let result = loader.resolve("CS:api", None, Some("bug_fix")).unwrap();
    assert_eq!(result.strategy, "bug_fix");
    assert_eq!(result.budget_tokens, Some(120));
    assert_eq!(result.included_ids(), vec!["CS:overview"]);
    assert_eq!(
        skipped(&result),
        vec![("CS:api".to_string(), SkipReason::OverBudget)]
    );

    // A caller budget replaces the profile's
    let result = loader.resolve("CS:api", Some(500), Some("bug_fix")).unwrap();
    assert_eq!(result.included_ids(), vec!["CS:overview", "CS:api"]);
}

#[test]
fn test_profile_floor_and_base_atoms() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    let result = loader.resolve("@load", None, Some("audit_prep")).unwrap();
    assert_eq!(
        result.included_ids(),
        vec!["SEC:overview", "SEC:api", "CS:validation", "NIST-IG:overview"]
    );
}

#[test]
fn test_stack_preset_expansion() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    let result = loader.resolve("product:python-api", None, None).unwrap();
    assert_eq!(
        result.included_ids(),
        vec![
            "CS:api",
            "SEC:api",
            "CS:validation",
            "NIST-IG:overview",
            "TS:integration",
            "CS:python",
        ]
    );
}

#[test]
fn test_nested_product_is_a_parse_error() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    let err = loader.resolve("product:broken", None, None).unwrap_err();
    assert_eq!(
        err,
        LoadError::Parse(ParseError::NestedAlias {
            product: "broken".to_string(),
            atom: "product:api".to_string(),
        })
    );
}

#[test]
fn test_atom_list_matches_text_request() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    let from_text = loader.resolve("[CS:api + TS:overview]", None, None).unwrap();
    let from_list = loader
        .resolve(vec!["CS:api".to_string(), "TS:overview".to_string()], None, None)
        .unwrap();
    assert_eq!(from_text, from_list);
}

#[test]
fn test_fenced_heading_stays_in_section() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    let result = loader.resolve("CS:api", None, Some("minimal")).unwrap();
    let api = &result.included[0];
    assert!(api.content.starts_with("## API Design"));
    assert!(api.content.contains("## GET /v1/users is not a heading"));
    assert!(api.content.ends_with("Return problem details on errors."));
    assert!(api.measured_tokens > 0);
    assert_eq!(
        api.file,
        PathBuf::from("docs/standards/CODING_STANDARDS.md")
    );
}

#[test]
fn test_json_output_shape() {
    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);

    let result = loader.resolve("TS", Some(60), None).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["strategy"], "standard");
    assert_eq!(json["budget_tokens"], 60);
    assert_eq!(json["total_tokens"], 45);
    assert_eq!(json["included"][0]["code"], "TS");
    assert_eq!(json["included"][0]["section"], "overview");
    assert_eq!(json["included"][0]["origin"], "explicit");
    assert!(json["included"][0]["content"].is_string());
    let reasons: Vec<&str> = json["skipped"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["reason"].as_str().unwrap())
        .collect();
    assert_eq!(reasons, vec!["over_budget", "over_budget"]);
}

#[test]
fn test_concurrent_loads_share_one_catalog() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Catalog>();
    assert_send_sync::<ProductTable>();
    assert_send_sync::<FsContentSource>();

    let (catalog, products, source) = fixtures();
    let loader = Loader::new(&catalog, &products, &source);
    let expected = loader.resolve("product:api", Some(150), None).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| loader.resolve("product:api", Some(150), None).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
