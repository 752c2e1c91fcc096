//! Generation-with-repair against both artifact kinds.

mod common;

use std::sync::Arc;

use common::{COUNT_UNIQUE_GRAPH, COUNT_UNIQUE_SPEC};
use specforge::adapters::oracles::MockResponse;
use specforge::domain::ports::NullFailureArchive;
use specforge::services::{GenerationError, SpecificationArtifact, StepGraphArtifact};
use specforge::{FileFailureArchive, MockOracle, RepairDriver, SchemaRegistry, Specification};

fn driver(oracle: Arc<MockOracle>) -> RepairDriver {
    RepairDriver::new(
        oracle,
        Arc::new(SchemaRegistry::builtin().unwrap()),
        Arc::new(NullFailureArchive),
    )
}

#[tokio::test]
async fn test_fenced_specification_is_accepted() {
    let oracle = Arc::new(MockOracle::scripted([format!(
        "Here you go:\n```json\n{COUNT_UNIQUE_SPEC}\n```"
    )]));
    let generated = driver(oracle)
        .generate(&SpecificationArtifact, "count distinct", "system", 3)
        .await
        .unwrap();
    assert_eq!(generated.attempts, 1);
    assert_eq!(generated.artifact.name(), "count_unique");
}

#[tokio::test]
async fn test_schema_then_semantic_repairs() {
    let semantically_broken = COUNT_UNIQUE_SPEC.replace("\"Q1\"", "\"P1\"");
    let oracle = Arc::new(MockOracle::scripted([
        r#"{"pre": "not a list"}"#.to_string(),
        semantically_broken,
        COUNT_UNIQUE_SPEC.to_string(),
    ]));
    let generated = driver(oracle.clone())
        .generate(&SpecificationArtifact, "count distinct", "system", 3)
        .await
        .unwrap();
    assert_eq!(generated.attempts, 3);

    let requests = oracle.requests().await;
    assert!(requests[1]
        .user_prompt
        .contains("does not match the required schema"));
    assert!(requests[2].user_prompt.contains("failed validation"));
    assert!(requests[2].user_prompt.contains("ID_CONFLICT"));
    // system prompt never changes between attempts
    assert!(requests.iter().all(|r| r.system_prompt == "system"));
}

#[tokio::test]
async fn test_step_graph_refs_checked_against_specification() {
    let spec = Specification::from_json(COUNT_UNIQUE_SPEC).unwrap();
    let bad_graph = COUNT_UNIQUE_GRAPH.replace("\"Q1\"", "\"Q7\"");
    let oracle = Arc::new(MockOracle::scripted([bad_graph, COUNT_UNIQUE_GRAPH.to_string()]));

    let generated = driver(oracle.clone())
        .generate(&StepGraphArtifact::for_spec(&spec), "plan", "system", 2)
        .await
        .unwrap();
    assert_eq!(generated.attempts, 2);
    assert_eq!(generated.artifact.order, vec!["S1", "S2"]);

    let requests = oracle.requests().await;
    assert!(requests[1].user_prompt.contains("Step S2 unknown post_ref Q7"));
}

#[tokio::test]
async fn test_exhaustion_archives_last_response() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = Arc::new(MockOracle::with_default_response(MockResponse::failure(
        "script exhausted",
    )));
    oracle.push_response(MockResponse::failure("rate limited")).await;
    oracle
        .push_response(MockResponse::success(
            "still not json, sk-ant-REDACTED",
        ))
        .await;
    let driver = RepairDriver::new(
        oracle.clone(),
        Arc::new(SchemaRegistry::builtin().unwrap()),
        Arc::new(FileFailureArchive::new(dir.path())),
    );

    let err = driver
        .generate(&SpecificationArtifact, "count distinct", "system", 2)
        .await
        .unwrap_err();

    match err {
        GenerationError::Exhausted {
            attempts,
            archived_to,
            last_raw_response,
            ..
        } => {
            assert_eq!(attempts, 2);
            assert!(last_raw_response.starts_with("still not json"));
            let archived = std::fs::read_to_string(archived_to.unwrap()).unwrap();
            assert!(archived.contains("kind: specification"));
            assert!(!archived.contains("sk-ant-REDACTED"));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(oracle.call_count().await, 2);
}
