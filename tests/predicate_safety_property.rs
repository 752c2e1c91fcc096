//! Property tests for predicate expression safety.

use proptest::prelude::*;
use std::collections::HashSet;

use specforge::domain::models::{IssueCode, Severity};
use specforge::services::predicate::{FORBIDDEN_TOKENS, SAFE_CALL_WHITELIST};
use specforge::validate_expr;

fn names(list: &[&str]) -> HashSet<String> {
    list.iter().map(ToString::to_string).collect()
}

fn comparison() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["<", "<=", ">", ">=", "==", "!="])
}

proptest! {
    /// Any expression containing a forbidden token is an error, whatever
    /// surrounds it.
    #[test]
    fn prop_forbidden_tokens_always_rejected(
        prefix in "[a-z ()+]{0,12}",
        token in prop::sample::select(FORBIDDEN_TOKENS.to_vec()),
        suffix in "[a-z ()+]{0,12}",
    ) {
        let expr = format!("{prefix}{token}{suffix}");
        let issues = validate_expr(&expr, &names(&["x"]), "pre.P1");
        prop_assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::PredUnsafeNode && i.severity == Severity::Error));
    }

    /// Comparisons over whitelisted calls and known names never error.
    #[test]
    fn prop_whitelisted_comparisons_are_clean(
        call in prop::sample::select(SAFE_CALL_WHITELIST.to_vec()),
        op in comparison(),
        bound in -1000i64..1000,
    ) {
        let expr = format!("{call}(nums) {op} {bound}");
        let issues = validate_expr(&expr, &names(&["nums"]), "post.Q1");
        prop_assert!(issues.iter().all(|i| i.severity != Severity::Error), "{expr}: {issues:?}");
    }

    /// Calling any name outside the whitelist is unsafe.
    #[test]
    fn prop_unknown_calls_are_unsafe(name in "[a-z]{3,10}") {
        prop_assume!(!SAFE_CALL_WHITELIST.contains(&name.as_str()));
        prop_assume!(!is_keyword(&name));
        prop_assume!(name != "exec" && name != "eval");
        let expr = format!("{name}(x) > 0");
        let issues = validate_expr(&expr, &names(&["x"]), "pre.P1");
        let expected_message = format!("Call not allowed: {name}");
        prop_assert!(issues
            .iter()
            .any(|i| i.code == IssueCode::PredUnsafeNode && i.message == expected_message));
    }

    /// Validation is a pure function of its input.
    #[test]
    fn prop_validation_is_deterministic(expr in "[a-z0-9 <>=()+*,.\\[\\]]{0,30}") {
        let known = names(&["x", "y"]);
        prop_assert_eq!(
            validate_expr(&expr, &known, "pre.P1"),
            validate_expr(&expr, &known, "pre.P1")
        );
    }
}

fn is_keyword(word: &str) -> bool {
    [
        "and", "not", "for", "del", "def", "try", "with", "else", "elif", "from", "pass", "while",
        "class", "break", "raise", "yield", "async", "await", "assert", "global", "return",
        "lambda", "import", "except", "finally", "continue", "nonlocal",
    ]
    .contains(&word)
}

