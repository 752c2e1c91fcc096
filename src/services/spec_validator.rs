//! Specification validator
//!
//! Structural and expression-safety checks over a [`Specification`]. Every
//! check runs before the pass/fail decision so a repair prompt can address
//! all problems in one round.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;

use crate::domain::models::{
    partition_issues, ExampleKind, IssueCode, MetamorphicRelation, Predicate, RelationKind,
    Specification, ValidationIssue, SPEC_VERSION,
};
use crate::services::predicate::validate_expr;

/// Structural witness rules a complexity guarantee may cite.
pub const COMPLEXITY_RULES_ALLOWED: [&str; 4] = [
    "no_sort",
    "no_quadratic_nested_loops",
    "no_hash_map",
    "no_recursion",
];

/// Primitives that must never be listed as a forbidden API.
pub const FORBIDDEN_API_INTERNAL: [&str; 3] = ["__import__", "eval", "exec"];

static API_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("forbidden api pattern is valid")
});

static BIG_O: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^O\([^()]+\)$").expect("big-O pattern is valid"));

fn join_issues(issues: &[ValidationIssue], separator: &str) -> String {
    issues
        .iter()
        .map(ValidationIssue::format)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Raised when a specification has at least one ERROR issue.
///
/// Displays as the formatted errors joined by newlines.
#[derive(Debug, Clone, Error)]
#[error("{}", join_issues(.errors, "\n"))]
pub struct SpecValidationError {
    /// Blocking issues
    pub errors: Vec<ValidationIssue>,
    /// Non-blocking issues
    pub warnings: Vec<ValidationIssue>,
}

/// Semantic checks on a specification.
pub struct SpecValidator;

impl SpecValidator {
    /// Validate `spec`, returning its warnings when there are no errors.
    pub fn validate(spec: &Specification) -> Result<Vec<ValidationIssue>, SpecValidationError> {
        let (errors, warnings) = Self::collect(spec);
        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(SpecValidationError { errors, warnings })
        }
    }

    /// Run every check and return `(errors, warnings)` without deciding.
    pub fn collect(spec: &Specification) -> (Vec<ValidationIssue>, Vec<ValidationIssue>) {
        let mut issues = Vec::new();

        Self::check_structure(spec, &mut issues);

        let predicates: Vec<&Predicate> = spec
            .pre
            .iter()
            .chain(&spec.post)
            .chain(&spec.invariants)
            .collect();
        Self::check_predicate_ids(&predicates, "predicates", &mut issues);
        Self::check_example_ids(spec, &mut issues);
        Self::check_relation_ids(&spec.metamorphic_relations, &mut issues);

        let params: HashSet<String> = spec.parameter_names().into_iter().collect();

        for (group, preds) in [
            ("pre", &spec.pre),
            ("post", &spec.post),
            ("invariants", &spec.invariants),
        ] {
            for predicate in preds {
                Self::check_predicate_expr(predicate, group, &params, &mut issues);
            }
        }

        for (idx, exc) in spec.types.exceptions.iter().enumerate() {
            if !exc.predicate.trim().is_empty() {
                issues.extend(validate_expr(
                    &exc.predicate,
                    &params,
                    &format!("types.exceptions[{idx}].predicate"),
                ));
            }
            if exc.exception_type.trim().is_empty() {
                issues.push(ValidationIssue::error(
                    IssueCode::StructureError,
                    format!("types.exceptions[{idx}].type"),
                    "Exception type empty",
                ));
            }
        }

        Self::check_examples(spec, &params, &mut issues);

        for (idx, relation) in spec.metamorphic_relations.iter().enumerate() {
            Self::check_relation(relation, idx, &params, &mut issues);
        }

        Self::check_forbidden_apis(&spec.forbidden_apis, &mut issues);
        Self::check_complexity(spec, &mut issues);
        Self::check_coverage(spec, &mut issues);

        partition_issues(issues)
    }

    fn check_structure(spec: &Specification, issues: &mut Vec<ValidationIssue>) {
        if spec.spec_version != SPEC_VERSION {
            issues.push(ValidationIssue::error(
                IssueCode::StructureError,
                "spec_version",
                format!("spec_version must be {SPEC_VERSION}"),
            ));
        }

        match &spec.main_function {
            Some(main) => {
                if main.name.trim().is_empty() {
                    issues.push(ValidationIssue::error(
                        IssueCode::StructureError,
                        "main_function.name",
                        "Main function name missing",
                    ));
                }
                if main.signature.return_type.trim().is_empty() {
                    issues.push(ValidationIssue::error(
                        IssueCode::StructureError,
                        "main_function.signature.return_type",
                        "Return type missing",
                    ));
                }
            }
            None => issues.push(ValidationIssue::error(
                IssueCode::StructureError,
                "main_function.name",
                "Main function name missing",
            )),
        }
    }

    fn check_predicate_ids(
        predicates: &[&Predicate],
        context: &str,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let mut seen = HashSet::new();
        for predicate in predicates {
            if predicate.id.is_empty() {
                issues.push(ValidationIssue::error(
                    IssueCode::IdConflict,
                    context,
                    "Predicate id empty",
                ));
            } else if !seen.insert(predicate.id.as_str()) {
                issues.push(ValidationIssue::error(
                    IssueCode::IdConflict,
                    format!("{context}.{}", predicate.id),
                    "Duplicate predicate id",
                ));
            }
        }
    }

    fn check_example_ids(spec: &Specification, issues: &mut Vec<ValidationIssue>) {
        let mut seen = HashSet::new();
        for (kind, example) in spec.examples.iter() {
            let group = kind.as_str();
            if example.id.is_empty() {
                issues.push(ValidationIssue::error(
                    IssueCode::IdConflict,
                    format!("examples.{group}"),
                    "Example id empty",
                ));
            } else if !seen.insert(example.id.as_str()) {
                issues.push(ValidationIssue::error(
                    IssueCode::IdConflict,
                    format!("examples.{group}.{}", example.id),
                    "Duplicate example id",
                ));
            }
        }
    }

    fn check_relation_ids(relations: &[MetamorphicRelation], issues: &mut Vec<ValidationIssue>) {
        let mut seen = HashSet::new();
        for relation in relations {
            if relation.id.is_empty() {
                issues.push(ValidationIssue::error(
                    IssueCode::IdConflict,
                    "metamorphic_relations",
                    "Relation id empty",
                ));
            } else if !seen.insert(relation.id.as_str()) {
                issues.push(ValidationIssue::error(
                    IssueCode::IdConflict,
                    format!("metamorphic_relations.{}", relation.id),
                    "Duplicate relation id",
                ));
            }
        }
    }

    fn check_predicate_expr(
        predicate: &Predicate,
        group: &str,
        params: &HashSet<String>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if predicate.expr.trim().is_empty() {
            issues.push(ValidationIssue::error(
                IssueCode::PredExprInvalid,
                format!("{group}.{}", predicate.id),
                "Empty expression",
            ));
            return;
        }
        issues.extend(validate_expr(
            &predicate.expr,
            params,
            &format!("{group}.{}.expr", predicate.id),
        ));
    }

    fn check_examples(
        spec: &Specification,
        params: &HashSet<String>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for (kind, example) in spec.examples.iter() {
            let id = if example.id.is_empty() { "<?>" } else { example.id.as_str() };
            let location = format!("examples.{}.{id}", kind.as_str());

            let Some(inputs) = example.inputs.as_object() else {
                issues.push(ValidationIssue::error(
                    IssueCode::ExampleInvalid,
                    location.clone(),
                    "inputs must be a JSON object mapping parameter names to values",
                ));
                continue;
            };

            match kind {
                ExampleKind::Positive => {
                    if example.expected_exception().is_some() {
                        issues.push(ValidationIssue::error(
                            IssueCode::ExampleInvalid,
                            location.clone(),
                            "Positive example must not set 'raises'",
                        ));
                    }
                    let mut missing: Vec<&str> = params
                        .iter()
                        .map(String::as_str)
                        .filter(|p| !inputs.contains_key(*p))
                        .collect();
                    if !missing.is_empty() {
                        missing.sort_unstable();
                        issues.push(ValidationIssue::warning(
                            IssueCode::ExampleInputMissing,
                            location.clone(),
                            format!("Missing params: {}", missing.join(",")),
                        ));
                    }
                }
                ExampleKind::Negative => {
                    if example.expected_exception().is_none() {
                        issues.push(ValidationIssue::error(
                            IssueCode::ExampleInvalid,
                            location.clone(),
                            "Negative example must have 'raises'",
                        ));
                    }
                    if example.output.is_some() {
                        issues.push(ValidationIssue::error(
                            IssueCode::ExampleInvalid,
                            location.clone(),
                            "Negative example should not define output",
                        ));
                    }
                }
            }
        }
    }

    fn check_relation(
        relation: &MetamorphicRelation,
        idx: usize,
        params: &HashSet<String>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let id = if relation.id.is_empty() { "?" } else { relation.id.as_str() };
        let location = format!("metamorphic_relations[{idx}].{id}");
        let kind = relation.kind();

        if kind.is_none() {
            issues.push(ValidationIssue::error(
                IssueCode::MetaRelationInvalid,
                location.clone(),
                format!("Unknown relation '{}'", relation.relation),
            ));
        }
        if relation.transform_inputs.trim().is_empty() {
            issues.push(ValidationIssue::error(
                IssueCode::MetaRelationInvalid,
                location.clone(),
                "transform_inputs empty",
            ));
        }
        let has_oracle = !relation.oracle_expr.trim().is_empty();
        if kind == Some(RelationKind::Custom) && !has_oracle {
            issues.push(ValidationIssue::error(
                IssueCode::MetaRelationInvalid,
                location.clone(),
                "custom relation requires oracle_expr",
            ));
        }
        if has_oracle {
            let mut names = params.clone();
            names.insert("original_result".to_string());
            names.insert("new_result".to_string());
            issues.extend(validate_expr(
                &relation.oracle_expr,
                &names,
                &format!("{location}.oracle_expr"),
            ));
        }
    }

    fn check_forbidden_apis(apis: &[String], issues: &mut Vec<ValidationIssue>) {
        for (idx, api) in apis.iter().enumerate() {
            let location = format!("forbidden_apis[{idx}]");
            if !API_TOKEN.is_match(api) {
                issues.push(ValidationIssue::error(
                    IssueCode::ForbiddenApiFormat,
                    location.clone(),
                    format!("Invalid api token '{api}'"),
                ));
            }
            if FORBIDDEN_API_INTERNAL.contains(&api.as_str()) {
                issues.push(ValidationIssue::error(
                    IssueCode::ForbiddenApiFormat,
                    location,
                    format!("Internal unsafe api '{api}' not allowed"),
                ));
            }
        }
    }

    fn check_complexity(spec: &Specification, issues: &mut Vec<ValidationIssue>) {
        let Some(guarantee) = &spec.complexity_guarantee else {
            return;
        };
        if !BIG_O.is_match(guarantee.big_o.trim()) {
            issues.push(ValidationIssue::error(
                IssueCode::ComplexityInvalid,
                "complexity_guarantee.big_o",
                "big_o must look like O(n)",
            ));
        }
        for rule in &guarantee.witness_rules {
            if !COMPLEXITY_RULES_ALLOWED.contains(&rule.as_str()) {
                issues.push(ValidationIssue::warning(
                    IssueCode::ComplexityInvalid,
                    "complexity_guarantee.witness_rules",
                    format!("Unknown rule '{rule}'"),
                ));
            }
        }
    }

    fn check_coverage(spec: &Specification, issues: &mut Vec<ValidationIssue>) {
        if spec.pre.is_empty() {
            issues.push(ValidationIssue::error(
                IssueCode::CoverageInsufficient,
                "pre",
                "At least one pre predicate required",
            ));
        }
        if spec.post.is_empty() {
            issues.push(ValidationIssue::error(
                IssueCode::CoverageInsufficient,
                "post",
                "At least one post predicate required",
            ));
        }
        if spec.examples.positive.is_empty() {
            issues.push(ValidationIssue::warning(
                IssueCode::CoverageInsufficient,
                "examples.positive",
                "No positive examples provided",
            ));
        }
        if spec.examples.negative.is_empty() {
            issues.push(ValidationIssue::warning(
                IssueCode::CoverageInsufficient,
                "examples.negative",
                "No negative examples provided",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        ComplexityGuarantee, Example, ExceptionSpec, FunctionSpec, Severity, Signature,
        TypeDescriptor,
    };
    use serde_json::json;

    fn valid_spec() -> Specification {
        let mut spec = Specification {
            main_function: Some(FunctionSpec {
                name: "count_unique".to_string(),
                purpose: "Count distinct values".to_string(),
                signature: Signature {
                    return_type: "int".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }),
            pre: vec![Predicate::new("P1", "nums is not None")],
            post: vec![Predicate::new("Q1", "result >= 0")],
            ..Default::default()
        };
        spec.types.parameters.push(TypeDescriptor {
            name: "nums".to_string(),
            type_name: "list[int]".to_string(),
            ..Default::default()
        });
        spec.examples
            .positive
            .push(Example::positive("E1", json!({"nums": [1, 1, 2]}), json!(2)));
        spec.examples
            .negative
            .push(Example::negative("N1", json!({"nums": null}), "TypeError"));
        spec
    }

    fn has(err: &SpecValidationError, code: IssueCode, location: &str) -> bool {
        err.errors
            .iter()
            .any(|i| i.code == code && i.location == location)
    }

    #[test]
    fn test_valid_spec_passes_without_warnings() {
        let warnings = SpecValidator::validate(&valid_spec()).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_wrong_version_and_missing_main() {
        let mut spec = valid_spec();
        spec.spec_version = 1;
        spec.main_function = None;
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(has(&err, IssueCode::StructureError, "spec_version"));
        assert!(has(&err, IssueCode::StructureError, "main_function.name"));
    }

    #[test]
    fn test_empty_return_type() {
        let mut spec = valid_spec();
        if let Some(main) = spec.main_function.as_mut() {
            main.signature.return_type = String::new();
        }
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(has(&err, IssueCode::StructureError, "main_function.signature.return_type"));
    }

    #[test]
    fn test_predicate_ids_share_one_namespace() {
        let mut spec = valid_spec();
        spec.invariants.push(Predicate::new("P1", "len(nums) >= 0"));
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(has(&err, IssueCode::IdConflict, "predicates.P1"));
    }

    #[test]
    fn test_example_ids_unique_across_groups() {
        let mut spec = valid_spec();
        spec.examples.negative[0].id = "E1".to_string();
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(has(&err, IssueCode::IdConflict, "examples.negative.E1"));
    }

    #[test]
    fn test_empty_expression() {
        let mut spec = valid_spec();
        spec.post.push(Predicate::new("Q2", "  "));
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(has(&err, IssueCode::PredExprInvalid, "post.Q2"));
    }

    #[test]
    fn test_unsafe_predicate_location() {
        let mut spec = valid_spec();
        spec.pre.push(Predicate::new("P2", "eval(nums)"));
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(has(&err, IssueCode::PredUnsafeNode, "pre.P2.expr"));
    }

    #[test]
    fn test_exception_spec_checks() {
        let mut spec = valid_spec();
        spec.types.exceptions.push(ExceptionSpec {
            exception_type: String::new(),
            predicate: "nums is None".to_string(),
            message: String::new(),
        });
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(has(&err, IssueCode::StructureError, "types.exceptions[0].type"));
    }

    #[test]
    fn test_example_polarity() {
        let mut spec = valid_spec();
        spec.examples.positive[0].raises = Some("ValueError".to_string());
        spec.examples.negative[0].output = Some(json!(0));
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(has(&err, IssueCode::ExampleInvalid, "examples.positive.E1"));
        assert!(has(&err, IssueCode::ExampleInvalid, "examples.negative.N1"));
    }

    #[test]
    fn test_non_object_inputs() {
        let mut spec = valid_spec();
        spec.examples.positive[0].inputs = json!([1, 2]);
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(has(&err, IssueCode::ExampleInvalid, "examples.positive.E1"));
    }

    #[test]
    fn test_missing_inputs_is_warning() {
        let mut spec = valid_spec();
        spec.types.parameters.push(TypeDescriptor {
            name: "k".to_string(),
            ..Default::default()
        });
        let warnings = SpecValidator::validate(&spec).unwrap();
        let missing = warnings
            .iter()
            .find(|w| w.code == IssueCode::ExampleInputMissing)
            .unwrap();
        assert_eq!(missing.message, "Missing params: k");
        assert_eq!(missing.severity, Severity::Warning);
    }

    #[test]
    fn test_metamorphic_relation_checks() {
        let mut spec = valid_spec();
        spec.metamorphic_relations.push(MetamorphicRelation {
            id: "M1".to_string(),
            transform_inputs: String::new(),
            relation: "custom".to_string(),
            ..Default::default()
        });
        spec.metamorphic_relations.push(MetamorphicRelation {
            id: "M2".to_string(),
            transform_inputs: "nums reversed".to_string(),
            relation: "bigger".to_string(),
            ..Default::default()
        });
        let err = SpecValidator::validate(&spec).unwrap_err();
        let m1: Vec<_> = err
            .errors
            .iter()
            .filter(|i| i.location == "metamorphic_relations[0].M1")
            .map(|i| i.message.as_str())
            .collect();
        assert_eq!(m1, vec!["transform_inputs empty", "custom relation requires oracle_expr"]);
        assert!(has(&err, IssueCode::MetaRelationInvalid, "metamorphic_relations[1].M2"));
    }

    #[test]
    fn test_oracle_expr_sees_result_names() {
        let mut spec = valid_spec();
        spec.metamorphic_relations.push(MetamorphicRelation {
            id: "M1".to_string(),
            transform_inputs: "nums + nums".to_string(),
            relation: "custom".to_string(),
            oracle_expr: "new_result == original_result".to_string(),
            notes: String::new(),
        });
        assert!(SpecValidator::validate(&spec).unwrap().is_empty());
    }

    #[test]
    fn test_forbidden_api_format() {
        let mut spec = valid_spec();
        spec.forbidden_apis = vec![
            "os.system".to_string(),
            "os system".to_string(),
            "eval".to_string(),
        ];
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(!has(&err, IssueCode::ForbiddenApiFormat, "forbidden_apis[0]"));
        assert!(has(&err, IssueCode::ForbiddenApiFormat, "forbidden_apis[1]"));
        assert!(has(&err, IssueCode::ForbiddenApiFormat, "forbidden_apis[2]"));
    }

    #[test]
    fn test_complexity_checks() {
        let mut spec = valid_spec();
        spec.complexity_guarantee = Some(ComplexityGuarantee {
            big_o: " O(n log n) ".to_string(),
            witness_rules: vec!["no_sort".to_string(), "no_gotos".to_string()],
        });
        let warnings = SpecValidator::validate(&spec).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "Unknown rule 'no_gotos'");

        spec.complexity_guarantee = Some(ComplexityGuarantee {
            big_o: "linear".to_string(),
            witness_rules: vec![],
        });
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(has(&err, IssueCode::ComplexityInvalid, "complexity_guarantee.big_o"));
    }

    #[test]
    fn test_coverage_floor() {
        let mut spec = valid_spec();
        spec.pre.clear();
        spec.post.clear();
        spec.examples.negative.clear();
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert!(has(&err, IssueCode::CoverageInsufficient, "pre"));
        assert!(has(&err, IssueCode::CoverageInsufficient, "post"));
        assert!(err
            .warnings
            .iter()
            .any(|w| w.location == "examples.negative"));
    }

    #[test]
    fn test_error_display_joins_formatted_errors() {
        let mut spec = valid_spec();
        spec.pre.clear();
        spec.post.clear();
        let err = SpecValidator::validate(&spec).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERROR:COVERAGE_INSUFFICIENT::pre::At least one pre predicate required\n\
             ERROR:COVERAGE_INSUFFICIENT::post::At least one post predicate required"
        );
    }
}
