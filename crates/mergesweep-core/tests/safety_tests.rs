//! Safety rule table tests

mod common;

use common::{closed_pr, merged_pr};
use mergesweep_core::{Branch, ProtectedBranches, SafetyEvaluator, SafetyReason, SafetyVerdict};

fn evaluator() -> SafetyEvaluator {
    SafetyEvaluator::new(ProtectedBranches::defaults(), "work")
}

#[test]
fn test_rule_table() {
    let eval = evaluator();
    let cases: Vec<(&str, Branch, Option<_>, Option<u32>, SafetyVerdict)> = vec![
        (
            "current branch wins over everything",
            Branch::new("work", "w1"),
            Some(closed_pr(1, "work", "zz")),
            Some(3),
            SafetyVerdict::unsafe_because(SafetyReason::CurrentBranch),
        ),
        (
            "protected default",
            Branch::new("main", "m1"),
            Some(merged_pr(2, "main", "m1")),
            None,
            SafetyVerdict::unsafe_because(SafetyReason::ProtectedBranch),
        ),
        (
            "release glob in defaults",
            Branch::new("release/2.0", "r1"),
            Some(merged_pr(3, "release/2.0", "r1")),
            None,
            SafetyVerdict::unsafe_because(SafetyReason::ProtectedBranch),
        ),
        (
            "sha mismatch before merge state",
            Branch::new("feature/a", "a2"),
            Some(closed_pr(4, "feature/a", "a1")),
            None,
            SafetyVerdict::unsafe_because(SafetyReason::ShaMismatch),
        ),
        (
            "closed without merge",
            Branch::new("feature/b", "b1"),
            Some(closed_pr(5, "feature/b", "b1")),
            None,
            SafetyVerdict::unsafe_because(SafetyReason::NotMerged),
        ),
        (
            "unpushed commits",
            Branch::new("feature/c", "c1"),
            Some(merged_pr(6, "feature/c", "c1")),
            Some(2),
            SafetyVerdict::unsafe_because(SafetyReason::UnpushedCommits(2)),
        ),
        (
            "no upstream is permissive",
            Branch::new("feature/d", "d1"),
            Some(merged_pr(7, "feature/d", "d1")),
            None,
            SafetyVerdict::safe(),
        ),
        (
            "merged and pushed",
            Branch::new("feature/e", "e1"),
            Some(merged_pr(8, "feature/e", "e1")),
            Some(0),
            SafetyVerdict::safe(),
        ),
    ];

    for (label, branch, pr, ahead, expected) in cases {
        assert_eq!(
            eval.evaluate(&branch, pr.as_ref(), ahead),
            expected,
            "case: {}",
            label
        );
    }
}

#[test]
fn test_release_convention_with_custom_list() {
    let eval = SafetyEvaluator::new(ProtectedBranches::from_configured(&["trunk"]).unwrap(), "");
    let branch = Branch::new("hotfix/login", "h1");
    let pr = merged_pr(1, "hotfix/login", "h1");
    assert_eq!(
        eval.evaluate(&branch, Some(&pr), Some(0)),
        SafetyVerdict::unsafe_because(SafetyReason::ReleaseBranch)
    );
}

#[test]
fn test_verdict_has_reason_exactly_when_unsafe() {
    let eval = evaluator();
    let branches = [
        ("work", "w1"),
        ("main", "m1"),
        ("feature/x", "x1"),
        ("feature/y", "y0"),
    ];
    for (name, sha) in branches {
        let branch = Branch::new(name, sha);
        let pr = merged_pr(1, name, "x1");
        for ahead in [None, Some(0), Some(5)] {
            let verdict = eval.evaluate(&branch, Some(&pr), ahead);
            assert_eq!(verdict.safe, verdict.reason.is_none(), "{} {:?}", name, ahead);
        }
    }
}

#[test]
fn test_detached_head_has_no_current_branch() {
    let eval = SafetyEvaluator::new(ProtectedBranches::defaults(), "");
    let branch = Branch::new("feature/z", "z1");
    let pr = merged_pr(1, "feature/z", "z1");
    assert!(eval.evaluate(&branch, Some(&pr), None).safe);
}
