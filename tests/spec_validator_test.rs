//! Specification validation through the public API: schema first, then
//! semantic checks, plus properties over generated specifications.

mod common;

use proptest::prelude::*;
use serde_json::json;

use common::COUNT_UNIQUE_SPEC;
use specforge::domain::models::{Example, IssueCode, Predicate, Severity};
use specforge::services::schema_registry::SPECIFICATION_SCHEMA;
use specforge::{SchemaRegistry, SpecValidator, Specification};

fn fixture() -> Specification {
    Specification::from_json(COUNT_UNIQUE_SPEC).unwrap()
}

const EXPRESSIONS: &[&str] = &[
    "nums is not None",
    "len(nums) >= 0",
    "result >= 0 and result <= len(nums)",
    "all(x > 0 for x in nums)",
    "total > 0",
    "open(nums)",
    "__import__('os')",
    "nums[",
    "True",
    "",
];

fn predicate() -> impl Strategy<Value = Predicate> {
    ("[PQI]?[0-3]", prop::sample::select(EXPRESSIONS))
        .prop_map(|(id, expr)| Predicate::new(id, expr))
}

fn example() -> impl Strategy<Value = Example> {
    (
        "E[0-3]?",
        prop::sample::select(vec![
            json!({"nums": [1, 2]}),
            json!({"other": 1}),
            json!({}),
            json!([1]),
        ]),
        any::<bool>(),
    )
        .prop_map(|(id, inputs, negative)| {
            if negative {
                Example::negative(id, inputs, "TypeError")
            } else {
                Example::positive(id, inputs, json!(1))
            }
        })
}

fn predicate_group(spec: &mut Specification, group: usize) -> &mut Vec<Predicate> {
    match group {
        0 => &mut spec.pre,
        1 => &mut spec.post,
        _ => &mut spec.invariants,
    }
}

#[test]
fn test_fixture_is_schema_and_semantically_valid() {
    let schemas = SchemaRegistry::builtin().unwrap();
    let value: serde_json::Value = serde_json::from_str(COUNT_UNIQUE_SPEC).unwrap();
    assert!(schemas.validate(SPECIFICATION_SCHEMA, &value).unwrap().is_empty());
    assert!(SpecValidator::validate(&fixture()).unwrap().is_empty());
}

#[test]
fn test_schema_rejects_wrongly_typed_fields() {
    let schemas = SchemaRegistry::builtin().unwrap();
    let errors = schemas
        .validate(
            SPECIFICATION_SCHEMA,
            &json!({"pre": [{"id": "P1"}], "examples": {"positive": [{"id": "E1", "inputs": 3}]}}),
        )
        .unwrap();
    assert!(errors.len() >= 2, "{errors:?}");
}

#[test]
fn test_every_problem_is_reported_in_one_pass() {
    let mut spec = fixture();
    spec.pre.push(Predicate::new("P2", "open(nums)"));
    spec.post.push(Predicate::new("P2", "result > 0"));
    spec.forbidden_apis.push("not an api".to_string());

    let err = SpecValidator::validate(&spec).unwrap_err();
    let codes: Vec<IssueCode> = err.errors.iter().map(|i| i.code).collect();
    assert!(codes.contains(&IssueCode::IdConflict));
    assert!(codes.contains(&IssueCode::PredUnsafeNode));
    assert!(codes.contains(&IssueCode::ForbiddenApiFormat));
    assert!(err.errors.iter().all(|i| i.severity == Severity::Error));

    // the display form is what goes into a repair prompt
    let rendered = err.to_string();
    assert_eq!(rendered.lines().count(), err.errors.len());
    assert!(rendered.lines().all(|l| l.starts_with("ERROR:")));
}

#[test]
fn test_yaml_and_json_sources_agree() {
    let yaml = "
spec_version: 2
main_function:
  name: count_unique
  signature:
    return_type: int
types:
  parameters:
    - name: nums
      type: list[int]
pre:
  - id: P1
    expr: nums is not None
post:
  - id: Q1
    expr: result >= 0 and result <= len(nums)
";
    let value: serde_json::Value = serde_yaml::from_str(yaml).unwrap();
    let spec = Specification::from_value(value).unwrap();
    assert_eq!(spec.predicate_ids(), fixture().predicate_ids());
}

proptest! {
    /// Unique example ids never produce an id conflict; reusing one always does.
    #[test]
    fn prop_example_id_uniqueness(count in 1usize..8, dup in any::<bool>()) {
        let mut spec = fixture();
        spec.examples.positive = (0..count)
            .map(|i| Example::positive(format!("E{i}"), json!({"nums": [i]}), json!(1)))
            .collect();
        if dup {
            spec.examples.positive.push(Example::positive("E0", json!({"nums": []}), json!(0)));
        }

        let (errors, _) = SpecValidator::collect(&spec);
        let conflict = errors.iter().any(|i| i.code == IssueCode::IdConflict);
        prop_assert_eq!(conflict, dup);
    }

    /// Validating the same specification twice reports the same issues in the same order.
    #[test]
    fn prop_validation_is_idempotent(
        pre in prop::collection::vec(predicate(), 0..4),
        post in prop::collection::vec(predicate(), 0..4),
        invariants in prop::collection::vec(predicate(), 0..3),
        examples in prop::collection::vec(example(), 0..5),
    ) {
        let mut spec = fixture();
        spec.pre = pre;
        spec.post = post;
        spec.invariants = invariants;
        spec.examples.positive.clear();
        spec.examples.negative.clear();
        for ex in examples {
            if ex.expected_exception().is_some() {
                spec.examples.negative.push(ex);
            } else {
                spec.examples.positive.push(ex);
            }
        }

        let first = SpecValidator::collect(&spec);
        let second = SpecValidator::collect(&spec);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(SpecValidator::validate(&spec).is_ok(), first.0.is_empty());
    }

    /// Predicate ids share one namespace across pre, post and invariants.
    #[test]
    fn prop_duplicate_predicate_id_conflicts_across_groups(
        first_group in 0usize..3,
        second_group in 0usize..3,
        fill in 0usize..4,
        dup in any::<bool>(),
    ) {
        let mut spec = fixture();
        for (group, prefix) in ["P", "Q", "I"].into_iter().enumerate() {
            *predicate_group(&mut spec, group) = (0..fill)
                .map(|i| Predicate::new(format!("{prefix}{i}"), "len(nums) >= 0"))
                .collect();
        }
        predicate_group(&mut spec, first_group).push(Predicate::new("D1", "nums is not None"));
        if dup {
            predicate_group(&mut spec, second_group)
                .push(Predicate::new("D1", "len(nums) >= 0"));
        }

        let (errors, _) = SpecValidator::collect(&spec);
        let conflicts: Vec<_> = errors
            .iter()
            .filter(|i| i.code == IssueCode::IdConflict)
            .collect();
        if dup {
            prop_assert_eq!(conflicts.len(), 1);
            prop_assert_eq!(conflicts[0].location.as_str(), "predicates.D1");
        } else {
            prop_assert!(conflicts.is_empty(), "{:?}", conflicts);
        }
    }

    /// Examples missing some parameters warn but never block.
    #[test]
    fn prop_missing_inputs_only_warn(extra in "[a-z]{1,6}") {
        prop_assume!(extra != "nums");
        let mut spec = fixture();
        let mut inputs = serde_json::Map::new();
        inputs.insert(extra, json!(1));
        spec.examples.positive[0].inputs = serde_json::Value::Object(inputs);

        let (errors, warnings) = SpecValidator::collect(&spec);
        prop_assert!(errors.iter().all(|i| i.code != IssueCode::ExampleInputMissing));
        prop_assert!(warnings.iter().any(|i| i.code == IssueCode::ExampleInputMissing));
    }
}
