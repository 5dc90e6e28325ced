//! Tests for the flow context lifecycle and evidence handling.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::context::CORE_ERROR_KEY;
use crate::errors::PipelineError;
use crate::logging::LogLevel;
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::testing::{
    ExampleStage, FailingStage, MemoryLogSink, SecondExampleStage, StopStage,
};

fn example_pipeline() -> Arc<Pipeline> {
    PipelineBuilder::new()
        .add(ExampleStage::new())
        .add(SecondExampleStage::new())
        .response_headers(false)
        .build()
        .unwrap()
}

#[test]
fn test_process_runs_exactly_once() {
    let pipeline = example_pipeline();
    let mut ctx = pipeline.create_context();
    ctx.evidence_mut().set("header.user-agent", json!("test"));
    ctx.process().unwrap();
    assert!(ctx.is_processed());
    let first = ctx.get("example1").unwrap().clone();

    let err = ctx.process().unwrap_err();
    assert!(matches!(err, PipelineError::AlreadyProcessed));

    // The first pass's results and errors are untouched
    assert_eq!(ctx.get("example1").unwrap(), &first);
    assert!(ctx.errors().is_empty());
}

#[test]
fn test_evidence_respects_stage_filters() {
    let pipeline = example_pipeline();
    let mut ctx = pipeline.create_context();
    ctx.evidence_mut().set("header.user-agent", json!("test"));
    ctx.evidence_mut().set("header.host", json!("example.com"));
    ctx.evidence_mut().set("cookie.session", json!("abc"));

    assert_eq!(ctx.evidence().get("header.user-agent"), Some(&json!("test")));
    assert_eq!(ctx.evidence().get("cookie.session"), None);

    let all = ctx.evidence().get_all();
    assert_eq!(all.len(), 2);
    assert!(!all.contains_key("cookie.session"));
}

#[test]
fn test_set_many_gates_each_entry() {
    let pipeline = example_pipeline();
    let mut ctx = pipeline.create_context();
    ctx.evidence_mut().set_many([
        ("header.user-agent".to_owned(), json!("test")),
        ("query.id".to_owned(), json!(9)),
    ]);

    assert_eq!(ctx.evidence().get("header.user-agent"), Some(&json!("test")));
    assert_eq!(ctx.evidence().get("query.id"), None);
}

#[test]
fn test_overwrite_on_same_key() {
    let pipeline = example_pipeline();
    let mut ctx = pipeline.create_context();
    ctx.evidence_mut().set("header.user-agent", json!("first"));
    ctx.evidence_mut().set("header.user-agent", json!("second"));

    assert_eq!(
        ctx.evidence().get("header.user-agent"),
        Some(&json!("second"))
    );
}

#[test]
fn test_json_batch_accepts_objects_only() {
    let pipeline = example_pipeline();
    let mut ctx = pipeline.create_context();

    ctx.add_evidence_json(json!({"header.user-agent": "test"}));
    assert_eq!(ctx.evidence().get("header.user-agent"), Some(&json!("test")));
    assert!(ctx.errors().is_empty());

    ctx.add_evidence_json(json!([1, 2, 3]));
    let err = ctx.errors().get(CORE_ERROR_KEY).unwrap();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::InvalidInput)
    ));
}

#[test]
fn test_result_lookup_distinguishes_absence_modes() {
    let pipeline = example_pipeline();
    let ctx = pipeline.create_context();
    assert!(matches!(
        ctx.get("example1"),
        Err(PipelineError::NoResults { .. })
    ));

    let mut ctx = pipeline.create_context();
    ctx.process().unwrap();
    match ctx.get("device").unwrap_err() {
        PipelineError::NoSuchResult { key, available } => {
            assert_eq!(key, "device");
            assert_eq!(available, ["example1", "example2"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_get_from_stage() {
    let pipeline = example_pipeline();
    let mut ctx = pipeline.create_context();
    ctx.process().unwrap();

    let stage = pipeline.get_stage("example1").unwrap();
    let result = ctx.get_from_stage(stage.as_ref()).unwrap();
    assert_eq!(result.value("integer"), Some(&json!(5)));
}

#[test]
fn test_stop_halts_later_stages() {
    let pipeline = PipelineBuilder::new()
        .add(ExampleStage::new())
        .add(StopStage::new())
        .add(SecondExampleStage::new())
        .response_headers(false)
        .build()
        .unwrap();
    let mut ctx = pipeline.create_context();
    ctx.process().unwrap();

    assert!(ctx.is_stopped());
    assert_eq!(ctx.get("example1").unwrap().value("integer"), Some(&json!(5)));
    assert!(matches!(
        ctx.get("example2"),
        Err(PipelineError::NoSuchResult { .. })
    ));
}

#[test]
fn test_metadata_query_skips_unresolved_entries() {
    let pipeline = PipelineBuilder::new()
        .add(ExampleStage::new())
        .add(FailingStage::new())
        .suppress_process_errors(true)
        .response_headers(false)
        .build()
        .unwrap();
    let mut ctx = pipeline.create_context();
    ctx.process().unwrap();

    // `broken` is declared with type `int` too, but its stage failed
    let ints = ctx.get_by_metadata("type", "int");
    assert_eq!(ints.len(), 1);
    assert_eq!(ints.get("integer"), Some(&json!(5)));
}

#[test]
fn test_metadata_query_skips_valueless_properties() {
    let pipeline = example_pipeline();
    let mut ctx = pipeline.create_context();
    // No user-agent evidence, so example2 tags `message` as NoValue
    ctx.process().unwrap();

    assert!(ctx.get_by_metadata("type", "string").is_empty());
    assert_eq!(ctx.get_by_metadata("type", "int").len(), 1);
}

#[test]
fn test_requested_evidence_unions_stage_filters() {
    let pipeline = example_pipeline();
    let mut ctx = pipeline.create_context();
    ctx.evidence_mut().set("header.user-agent", json!("test"));
    ctx.evidence_mut().set("header.host", json!("example.com"));

    let requested = ctx.requested_evidence();
    assert_eq!(requested.len(), 2);
    assert_eq!(requested.get("header.user-agent"), Some(&json!("test")));
    assert_eq!(requested.get("header.host"), Some(&json!("example.com")));
}

#[test]
fn test_stage_errors_always_logged() {
    let sink = MemoryLogSink::new(LogLevel::Error);
    let pipeline = PipelineBuilder::new()
        .add(FailingStage::new())
        .logger(sink.clone())
        .suppress_process_errors(true)
        .response_headers(false)
        .build()
        .unwrap();
    let mut ctx = pipeline.create_context();
    ctx.process().unwrap();

    assert!(sink.contains("error occurred during processing of 'failing'"));
    assert!(sink.contains("example failure"));
}

#[test]
fn test_contexts_are_independent() {
    let pipeline = example_pipeline();
    let mut first = pipeline.create_context();
    let second = pipeline.create_context();

    assert_ne!(first.id(), second.id());
    first.evidence_mut().set("header.user-agent", json!("test"));
    assert_eq!(second.evidence().get("header.user-agent"), None);
}
