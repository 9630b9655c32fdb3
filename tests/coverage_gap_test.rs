//! Coverage-gap reporting over real projects on disk.

use impactmap::analysis::analyze_project;
use impactmap::config::ImpactConfig;
use impactmap::core::RiskLevel;
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

fn write(root: &Path, name: &str, content: &str) {
    fs::write(root.join(name), content).unwrap();
}

fn builtin_only() -> ImpactConfig {
    let mut config = ImpactConfig::default();
    config.call_graph.external_tools = false;
    config
}

#[test]
fn adding_a_test_raises_coverage() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "pay.go",
        indoc! {r#"
            package pay

            func Charge(amount int) error {
                return validate(amount)
            }

            func validate(amount int) error {
                return nil
            }
        "#},
    );

    let before = analyze_project(dir.path(), &builtin_only()).unwrap();
    assert_eq!(before.coverage.overall_coverage, 0);
    assert_eq!(before.coverage.gaps.len(), 2);

    write(
        dir.path(),
        "pay_test.go",
        indoc! {r#"
            package pay

            import "testing"

            func TestCharge(t *testing.T) {
                Charge(10)
            }
        "#},
    );

    let after = analyze_project(dir.path(), &builtin_only()).unwrap();
    assert_eq!(after.coverage.overall_coverage, 50);
    assert!(after.coverage.overall_coverage > before.coverage.overall_coverage);
    // validate is still a gap; coverage is direct, not transitive.
    let ids: Vec<_> = after
        .coverage
        .gaps
        .iter()
        .map(|g| g.symbol_id.as_str())
        .collect();
    assert_eq!(ids, vec!["pay.validate"]);
}

#[test]
fn exported_symbols_gap_even_under_a_high_risk_floor() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "api.go",
        indoc! {r#"
            package api

            func Public() {}

            func private() {}
        "#},
    );
    write(
        dir.path(),
        "impactmap.toml",
        indoc! {r#"
            [coverage]
            min_gap_risk = "HIGH"
        "#},
    );

    let config = {
        let mut c = ImpactConfig::load(dir.path()).unwrap();
        c.call_graph.external_tools = false;
        c
    };
    let report = analyze_project(dir.path(), &config).unwrap();

    let ids: Vec<_> = report
        .coverage
        .gaps
        .iter()
        .map(|g| g.symbol_id.as_str())
        .collect();
    assert_eq!(ids, vec!["api.Public"]);
}

#[test]
fn risky_untested_functions_rank_first() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "jobs.go",
        indoc! {r#"
            package jobs

            func Dispatch(queue chan int) {
                go func() {
                    for job := range queue {
                        if job < 0 {
                            panic("bad job")
                        }
                        queue <- job
                    }
                }()
            }

            func plain() {}
        "#},
    );

    let report = analyze_project(dir.path(), &builtin_only()).unwrap();
    let first = &report.coverage.gaps[0];
    assert_eq!(first.symbol_id, "jobs.Dispatch");
    assert_eq!(first.risk_level, RiskLevel::High);
    assert!(first.reason.contains("spawns concurrent tasks"));
    assert!(first.reason.contains("can panic"));
}

#[test]
fn gap_callers_come_from_the_resolved_graph() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "flow.go",
        indoc! {r#"
            package flow

            func Enter() {
                inner()
            }

            func inner() {}
        "#},
    );

    let report = analyze_project(dir.path(), &builtin_only()).unwrap();
    let inner = report
        .coverage
        .gaps
        .iter()
        .find(|g| g.symbol_id == "flow.inner")
        .expect("inner should gap");
    assert_eq!(inner.callers, vec!["flow.Enter".to_string()]);
    assert_eq!(inner.callers_count, 1);
    assert!(inner.reason.contains("called by 1 functions"));
}
