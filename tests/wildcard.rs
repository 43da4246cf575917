mod common;

use std::collections::BTreeSet;
use std::path::PathBuf;

use dotnet_reports::error::ReportError;
use dotnet_reports::wildcard::WildcardResolver;

fn names(dir: &tempfile::TempDir, matches: &BTreeSet<PathBuf>) -> Vec<String> {
    matches
        .iter()
        .map(|p| {
            p.strip_prefix(dir.path())
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

#[test]
fn star_matches_within_the_anchor_directory() {
    let dir = common::setup_tree(&["foo.nccov", "bar.txt", "sub/baz.nccov"]);
    let resolver = WildcardResolver::new(dir.path(), "/");

    let matches = resolver.resolve("*.nccov").unwrap();
    assert_eq!(names(&dir, &matches), vec!["foo.nccov"]);
}

#[test]
fn results_are_absolute() {
    let dir = common::setup_tree(&["foo.nccov"]);
    let resolver = WildcardResolver::new(dir.path(), "/");

    let matches = resolver.resolve("*.nccov").unwrap();
    assert!(matches.iter().all(|p| p.is_absolute()));
}

#[test]
fn double_star_matches_zero_or_more_directories() {
    let dir = common::setup_tree(&[
        "sub/x.xml",
        "sub/a/x.xml",
        "sub/a/b/x.xml",
        "sub/a/y.xml",
        "other/x.xml",
    ]);
    let resolver = WildcardResolver::new(dir.path(), "/");

    let matches = resolver.resolve("sub/**/x.xml").unwrap();
    assert_eq!(
        names(&dir, &matches),
        vec!["sub/a/b/x.xml", "sub/a/x.xml", "sub/x.xml"]
    );
}

#[test]
fn question_mark_matches_exactly_one_character() {
    let dir = common::setup_tree(&["run1.trx", "run22.trx", "run.trx"]);
    let resolver = WildcardResolver::new(dir.path(), "/");

    let matches = resolver.resolve("run?.trx").unwrap();
    assert_eq!(names(&dir, &matches), vec!["run1.trx"]);
}

#[test]
fn wildcard_directories_are_matched_too() {
    let dir = common::setup_tree(&["TestResults/a/run.trx", "TestResults/b/run.trx"]);
    let resolver = WildcardResolver::new(dir.path(), "/");

    let matches = resolver.resolve("TestResults/*").unwrap();
    assert_eq!(names(&dir, &matches), vec!["TestResults/a", "TestResults/b"]);

    let matches = resolver.resolve("TestResults/*/run.trx").unwrap();
    assert_eq!(
        names(&dir, &matches),
        vec!["TestResults/a/run.trx", "TestResults/b/run.trx"]
    );
}

#[test]
fn pattern_without_wildcard_names_a_single_file() {
    let dir = common::setup_tree(&["reports/coverage.xml"]);
    let resolver = WildcardResolver::new(dir.path(), "/");

    let matches = resolver.resolve("reports/coverage.xml").unwrap();
    assert_eq!(names(&dir, &matches), vec!["reports/coverage.xml"]);

    assert!(resolver.resolve("reports/missing.xml").unwrap().is_empty());
}

#[test]
fn navigation_before_the_first_wildcard_is_allowed() {
    let dir = common::setup_tree(&["a/report.xml", "b/placeholder"]);
    let resolver = WildcardResolver::new(dir.path().join("b"), "/");

    let matches = resolver.resolve("../a/*.xml").unwrap();
    assert_eq!(names(&dir, &matches), vec!["a/report.xml"]);

    let matches = resolver.resolve("./../a/report.xml").unwrap();
    assert_eq!(names(&dir, &matches), vec!["a/report.xml"]);
}

#[test]
fn navigation_after_a_wildcard_is_rejected() {
    let dir = common::setup_tree(&["a/report.xml"]);
    let resolver = WildcardResolver::new(dir.path(), "/");

    for pattern in ["*/../a/report.xml", "**/./report.xml", "a/?/.."] {
        let err = resolver.resolve(pattern).unwrap_err();
        assert!(matches!(err, ReportError::InvalidPattern(_)), "{pattern}");
        assert!(
            err.to_string()
                .contains("Cannot contain '.' or '..' after the first wildcard"),
            "{err}"
        );
    }
}

#[test]
fn absolute_patterns_ignore_the_base_directory() {
    let dir = common::setup_tree(&["reports/a.xml", "reports/b.xml"]);
    let elsewhere = tempfile::tempdir().unwrap();
    let resolver = WildcardResolver::new(elsewhere.path(), "/");

    let pattern = format!("{}/reports/*.xml", dir.path().display()).replace('\\', "/");
    let matches = resolver.resolve(&pattern).unwrap();
    assert_eq!(names(&dir, &matches), vec!["reports/a.xml", "reports/b.xml"]);
}

#[test]
fn missing_anchor_directory_matches_nothing() {
    let dir = common::setup_tree(&["a.xml"]);
    let resolver = WildcardResolver::new(dir.path(), "/");

    assert!(resolver.resolve("missing/**/*.xml").unwrap().is_empty());
}

#[test]
fn custom_separator() {
    let dir = common::setup_tree(&["sub/a.xml", "sub/b.txt"]);
    let resolver = WildcardResolver::new(dir.path(), "|");

    let matches = resolver.resolve("sub|*.xml").unwrap();
    assert_eq!(names(&dir, &matches), vec!["sub/a.xml"]);
}
