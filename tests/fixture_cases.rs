//! Runs every merge fixture case under `tests/fixtures/`.

mod common;

use common::{fixture, fixtures_dir};
use trimerge::fixture::{FixtureCase, discover};
use trimerge_core::{MergeOutcome, ResolveOptions};

const CASES: [&str; 9] = [
    "AddRemoveLines",
    "EqualLineConflict",
    "ImportJsUpgradeConflict",
    "ImportsConflict",
    "MoreChangesInOneLine",
    "MultipleConflicts",
    "NoConflicts",
    "NotResolvableConflict",
    "SameLineConflict",
];

fn verify(name: &str) {
    let case = FixtureCase::load(&fixture(name)).expect("failed to load case");
    if let Err(e) = case.verify(&ResolveOptions::builtin()) {
        panic!("{e}");
    }
}

#[test]
fn discover_finds_every_case() {
    let names: Vec<String> = discover(&fixtures_dir())
        .unwrap()
        .iter()
        .map(|case| case.name().to_owned())
        .collect();
    assert_eq!(names, CASES);
}

#[test]
fn add_remove_lines() {
    verify("AddRemoveLines");
}

#[test]
fn equal_line_conflict() {
    verify("EqualLineConflict");
}

#[test]
fn not_resolvable_conflict() {
    verify("NotResolvableConflict");
}

#[test]
fn no_conflicts() {
    verify("NoConflicts");
}

#[test]
fn same_line_conflict() {
    verify("SameLineConflict");
}

#[test]
fn more_changes_in_one_line() {
    verify("MoreChangesInOneLine");
}

#[test]
fn import_js_upgrade_conflict() {
    verify("ImportJsUpgradeConflict");
}

#[test]
fn imports_conflict() {
    verify("ImportsConflict");
}

#[test]
fn multiple_conflicts() {
    verify("MultipleConflicts");
}

#[test]
fn import_fixtures_are_consistent() {
    for name in ["ImportJsUpgradeConflict", "ImportsConflict"] {
        let report = FixtureCase::load(&fixture(name))
            .unwrap()
            .check_consistency()
            .unwrap();
        assert!(report.body_matches, "{name}: body differs");
        assert!(report.nothing_dropped(), "{name}: dropped {:?}", report.missing);
        assert!(report.imports_are_union(), "{name}: extra {:?}", report.extra);
    }
}

#[test]
fn import_upgrade_drops_nothing_either_side_imports() {
    let case = FixtureCase::load(&fixture("ImportJsUpgradeConflict")).unwrap();
    let report = case.check_consistency().unwrap();
    assert!(report.missing.is_empty());
    assert!(case.version_a().contains("CurrencyKeywordUtils"));
    assert!(!case.version_b().contains("CurrencyKeywordUtils"));
    assert!(case.expected().unwrap().contains("CurrencyKeywordUtils"));
}

#[test]
fn import_option_is_what_resolves_the_import_cases() {
    let without_import =
        ResolveOptions::from_names(&["same", "enclosed", "word"], &["js"]).unwrap();
    for name in ["ImportJsUpgradeConflict", "ImportsConflict"] {
        let case = FixtureCase::load(&fixture(name)).unwrap();
        let outcome = case.run(&without_import).unwrap();
        assert!(
            matches!(outcome.merge, MergeOutcome::Conflicting { .. }),
            "{name} resolved without the import option: {}",
            outcome.describe()
        );
    }
}
