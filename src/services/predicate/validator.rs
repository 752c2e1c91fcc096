//! Safety walk over a parsed predicate.

use std::collections::HashSet;

use super::ast::{Expr, Keyword};
use super::parser::parse_expression;
use super::PredicateParseError;
use crate::domain::models::{IssueCode, ValidationIssue, RESERVED_RESULT_NAMES};

/// Builtins a predicate may call.
pub const SAFE_CALL_WHITELIST: [&str; 7] = ["len", "abs", "min", "max", "sum", "all", "any"];

/// Raw substrings rejected before parsing.
pub const FORBIDDEN_TOKENS: [&str; 5] = [";", "__import__", "import ", "exec(", "eval("];

/// Check one predicate expression.
///
/// Returns every finding; ERROR issues mean the expression must not reach
/// execution. `location` is copied onto each issue.
pub fn validate_expr(
    expr: &str,
    allowed_names: &HashSet<String>,
    location: &str,
) -> Vec<ValidationIssue> {
    if let Some(token) = FORBIDDEN_TOKENS.iter().find(|t| expr.contains(*t)) {
        return vec![ValidationIssue::error(
            IssueCode::PredUnsafeNode,
            location,
            format!("Contains forbidden token '{}'", token.trim_end()),
        )];
    }

    let tree = match parse_expression(expr) {
        Ok(tree) => tree,
        Err(PredicateParseError::ForbiddenSyntax(kind)) => {
            return vec![ValidationIssue::error(
                IssueCode::PredUnsafeNode,
                location,
                format!("Forbidden syntax: {kind}"),
            )];
        }
        Err(err) => {
            return vec![ValidationIssue::error(
                IssueCode::PredExprInvalid,
                location,
                format!("Parse error: {err}"),
            )];
        }
    };

    let mut walker = SafetyWalker {
        allowed_names,
        location,
        scopes: Vec::new(),
        issues: Vec::new(),
    };
    walker.visit(&tree);

    if tree.is_constant() {
        walker.push(ValidationIssue::warning(
            IssueCode::PredTrivial,
            location,
            "Predicate is a constant",
        ));
    }
    walker.issues
}

struct SafetyWalker<'a> {
    allowed_names: &'a HashSet<String>,
    location: &'a str,
    /// Names bound by enclosing comprehensions and lambdas
    scopes: Vec<HashSet<String>>,
    issues: Vec<ValidationIssue>,
}

impl SafetyWalker<'_> {
    fn push(&mut self, issue: ValidationIssue) {
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn check_name(&mut self, name: &str) {
        if self.is_bound(name)
            || self.allowed_names.contains(name)
            || RESERVED_RESULT_NAMES.contains(&name)
        {
            return;
        }
        self.push(ValidationIssue::warning(
            IssueCode::PredNameUnknown,
            self.location,
            format!("Name '{name}' not in params"),
        ));
    }

    fn visit_all(&mut self, exprs: &[Expr]) {
        for expr in exprs {
            self.visit(expr);
        }
    }

    fn visit_keywords(&mut self, keywords: &[Keyword]) {
        for kw in keywords {
            self.visit(&kw.value);
        }
    }

    fn visit_call(&mut self, func: &Expr, args: &[Expr], keywords: &[Keyword]) {
        match func {
            Expr::Name(name) if SAFE_CALL_WHITELIST.contains(&name.as_str()) => {}
            Expr::Name(name) => {
                self.push(ValidationIssue::error(
                    IssueCode::PredUnsafeNode,
                    self.location,
                    format!("Call not allowed: {name}"),
                ));
            }
            other => {
                let callee = other
                    .dotted_name()
                    .unwrap_or_else(|| "<expression>".to_string());
                self.push(ValidationIssue::error(
                    IssueCode::PredUnsafeNode,
                    self.location,
                    format!("Call not allowed: {callee}"),
                ));
                self.visit(other);
            }
        }
        self.visit_all(args);
        self.visit_keywords(keywords);
    }

    fn visit(&mut self, expr: &Expr) {
        match expr {
            Expr::Name(name) => self.check_name(name),
            Expr::Constant(_) => {}
            Expr::BoolOp { values, .. } => self.visit_all(values),
            Expr::UnaryOp { operand, .. } => self.visit(operand),
            Expr::BinOp { left, right, .. } => {
                self.visit(left);
                self.visit(right);
            }
            Expr::Compare {
                left, comparators, ..
            } => {
                self.visit(left);
                self.visit_all(comparators);
            }
            Expr::Call {
                func,
                args,
                keywords,
            } => self.visit_call(func, args, keywords),
            Expr::Attribute { value, .. } | Expr::Starred(value) => self.visit(value),
            Expr::Subscript { value, index } => {
                self.visit(value);
                self.visit(index);
            }
            Expr::Slice { lower, upper, step } => {
                for part in [lower, upper, step].into_iter().flatten() {
                    self.visit(part);
                }
            }
            Expr::Tuple(items) | Expr::List(items) | Expr::Set(items) => self.visit_all(items),
            Expr::Dict(entries) => {
                for (key, value) in entries {
                    if let Some(key) = key {
                        self.visit(key);
                    }
                    self.visit(value);
                }
            }
            Expr::IfExp { test, body, orelse } => {
                self.visit(test);
                self.visit(body);
                self.visit(orelse);
            }
            Expr::Lambda {
                params,
                defaults,
                body,
            } => {
                self.push(ValidationIssue::error(
                    IssueCode::PredUnsafeNode,
                    self.location,
                    "Forbidden syntax: Lambda",
                ));
                self.visit_all(defaults);
                self.scopes.push(params.iter().cloned().collect());
                self.visit(body);
                self.scopes.pop();
            }
            Expr::Comprehension {
                element,
                value,
                generators,
                ..
            } => {
                self.scopes.push(HashSet::new());
                for generator in generators {
                    self.visit(&generator.iter);
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.extend(generator.target.bound_names());
                    }
                    self.visit_all(&generator.ifs);
                }
                self.visit(element);
                if let Some(value) = value {
                    self.visit(value);
                }
                self.scopes.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Severity;

    fn params(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn codes(issues: &[ValidationIssue]) -> Vec<(IssueCode, Severity)> {
        issues.iter().map(|i| (i.code, i.severity)).collect()
    }

    #[test]
    fn test_clean_predicate_has_no_issues() {
        let issues = validate_expr("nums is not None and len(nums) >= 0", &params(&["nums"]), "pre.P1");
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_pathological_nesting_is_an_invalid_expression() {
        let expr = format!("{}x{}", "(".repeat(3_000), ")".repeat(3_000));
        let issues = validate_expr(&expr, &params(&["x"]), "pre.P1");
        assert_eq!(codes(&issues), vec![(IssueCode::PredExprInvalid, Severity::Error)]);

        let expr = format!("{}x{} > 0", "(".repeat(200), ")".repeat(200));
        let issues = validate_expr(&expr, &params(&["x"]), "pre.P1");
        assert_eq!(codes(&issues), vec![(IssueCode::PredExprInvalid, Severity::Error)]);
        assert!(issues[0].message.contains("nested too deeply"));
    }

    #[test]
    fn test_reserved_result_names_are_known() {
        let issues = validate_expr(
            "result >= 0 and len(new_result) == len(original_result)",
            &params(&[]),
            "post.Q1",
        );
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_forbidden_tokens_rejected_before_parsing() {
        for expr in ["x; y", "__import__('os')", "eval(x)", "exec(x)", "import os"] {
            let issues = validate_expr(expr, &params(&["x", "y"]), "pre.P1");
            assert_eq!(codes(&issues), vec![(IssueCode::PredUnsafeNode, Severity::Error)], "{expr}");
            assert!(issues[0].message.starts_with("Contains forbidden token"));
        }
    }

    #[test]
    fn test_non_whitelisted_call() {
        let issues = validate_expr("sorted(nums) == nums", &params(&["nums"]), "post.Q1");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::PredUnsafeNode);
        assert_eq!(issues[0].message, "Call not allowed: sorted");
    }

    #[test]
    fn test_method_call_is_not_whitelisted() {
        let issues = validate_expr("nums.count(1) == 1", &params(&["nums"]), "post.Q1");
        assert_eq!(issues[0].message, "Call not allowed: nums.count");
    }

    #[test]
    fn test_lambda_is_forbidden() {
        let issues = validate_expr("(lambda x: x)(nums)", &params(&["nums"]), "pre.P1");
        assert!(issues.iter().any(|i| i.message == "Forbidden syntax: Lambda"));
        assert!(issues.iter().all(|i| i.code == IssueCode::PredUnsafeNode));
    }

    #[test]
    fn test_statement_kind_reported_as_unsafe() {
        let issues = validate_expr("x with y", &params(&["x", "y"]), "pre.P1");
        assert_eq!(issues[0].code, IssueCode::PredUnsafeNode);
        assert_eq!(issues[0].message, "Forbidden syntax: With");
    }

    #[test]
    fn test_parse_error() {
        let issues = validate_expr("len(nums", &params(&["nums"]), "pre.P1");
        assert_eq!(codes(&issues), vec![(IssueCode::PredExprInvalid, Severity::Error)]);
        assert!(issues[0].message.starts_with("Parse error:"));
    }

    #[test]
    fn test_unknown_name_is_warning_once() {
        let issues = validate_expr("k > 0 and k < 10", &params(&["nums"]), "pre.P1");
        assert_eq!(codes(&issues), vec![(IssueCode::PredNameUnknown, Severity::Warning)]);
        assert_eq!(issues[0].message, "Name 'k' not in params");
    }

    #[test]
    fn test_comprehension_variables_are_bound() {
        let issues = validate_expr(
            "all(x >= 0 for x in nums) and sum([a * b for a, b in pairs]) > 0",
            &params(&["nums", "pairs"]),
            "pre.P1",
        );
        assert!(issues.is_empty(), "{issues:?}");
    }

    #[test]
    fn test_constant_is_trivial_warning() {
        let issues = validate_expr("True", &params(&[]), "pre.P1");
        assert_eq!(codes(&issues), vec![(IssueCode::PredTrivial, Severity::Warning)]);
    }

    #[test]
    fn test_location_is_propagated() {
        let issues = validate_expr("foo(x)", &params(&["x"]), "invariants.I1");
        assert_eq!(issues[0].location, "invariants.I1");
    }
}
