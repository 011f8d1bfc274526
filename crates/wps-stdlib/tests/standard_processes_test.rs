use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use wps_core::{
    AlgorithmRegistry, ComplexData, CoordinatorConfig, DataBinder, EncodedData, ExecuteRequest,
    ExecuteResponse, ExecutionCoordinator, ExecutionHandle, ExecutionMode, Format, JobId,
    JobSnapshot, JobState, LiteralValue, MemoryJobRepository, OutputDefinition, OutputPayload,
    ProcessData, ResponseMode, TracingEventHandler, TypedData, TypedLiteral,
};
use wps_stdlib::factory::{standard_algorithms, standard_formats, STANDARD_PROCESSES};

fn coordinator() -> ExecutionCoordinator {
    let registry = Arc::new(AlgorithmRegistry::new(Arc::new(standard_algorithms())));
    let report = registry.register_all();
    assert!(report.is_complete(), "{:?}", report.failed);

    ExecutionCoordinator::new(
        registry,
        DataBinder::new(Arc::new(standard_formats())),
        Arc::new(MemoryJobRepository::new()),
        Arc::new(TracingEventHandler),
        CoordinatorConfig::default(),
    )
}

async fn run_sync(coordinator: &ExecutionCoordinator, request: ExecuteRequest) -> JobSnapshot {
    match coordinator.submit(request).await.unwrap() {
        ExecutionHandle::Completed(snapshot) => snapshot,
        other => panic!("expected a completed job, got {:?}", other),
    }
}

async fn wait_until<F>(coordinator: &ExecutionCoordinator, job_id: &JobId, done: F) -> JobSnapshot
where
    F: Fn(&JobSnapshot) -> bool,
{
    timeout(Duration::from_secs(10), async {
        loop {
            if let Some(snapshot) = coordinator.poll_status(job_id).await.unwrap() {
                if done(&snapshot) {
                    return snapshot;
                }
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("job did not reach the expected state")
}

#[tokio::test]
async fn test_every_standard_process_is_listed() {
    let coordinator = coordinator();
    let ids: Vec<String> = coordinator
        .registry()
        .list()
        .iter()
        .map(|d| d.id.to_string())
        .collect();
    assert_eq!(ids, STANDARD_PROCESSES.to_vec());
}

#[tokio::test]
async fn test_json_transform_decodes_and_encodes_documents() {
    let coordinator = coordinator();

    let snapshot = run_sync(
        &coordinator,
        ExecuteRequest::builder("json_transform")
            .execution_mode(ExecutionMode::Sync)
            .response_mode(ResponseMode::Raw)
            .input(ProcessData::complex(
                "document",
                ComplexData::bytes(Format::json(), br#"{"items": [{"n": 1}, {"n": 2}]}"#.to_vec()),
            ))
            .input(ProcessData::literal("expression", "items[*].n"))
            .output(OutputDefinition::new("result"))
            .build(),
    )
    .await;

    assert_eq!(snapshot.state, JobState::Succeeded);
    match snapshot.response {
        Some(ExecuteResponse::Raw { output }) => assert_eq!(
            output.payload,
            OutputPayload::Encoded(EncodedData {
                format: Format::json(),
                bytes: b"[1,2]".to_vec(),
            })
        ),
        other => panic!("expected a raw response, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_document_is_rejected_before_execution() {
    let coordinator = coordinator();

    let result = coordinator
        .submit(
            ExecuteRequest::builder("json_transform")
                .input(ProcessData::complex(
                    "document",
                    ComplexData::bytes(Format::json(), b"{oops".to_vec()),
                ))
                .input(ProcessData::literal("expression", "a"))
                .build(),
        )
        .await;

    assert!(matches!(
        result,
        Err(wps_core::DispatchError::Validation(
            wps_core::ValidationError::MalformedContent { .. }
        ))
    ));
}

#[tokio::test]
async fn test_arithmetic_result_by_reference() {
    let coordinator = coordinator();

    let snapshot = run_sync(
        &coordinator,
        ExecuteRequest::builder("arithmetic")
            .input(ProcessData::literal_with_uom("a", 2, "km"))
            .input(ProcessData::literal("b", 500))
            .input(ProcessData::literal("operator", "subtract"))
            .output(OutputDefinition::new("result").by_reference())
            .build(),
    )
    .await;

    assert_eq!(snapshot.state, JobState::Succeeded);
    let body = coordinator
        .fetch_reference(&snapshot.job_id, "result")
        .await
        .unwrap();
    assert_eq!(body.format, Format::text_plain());
    assert_eq!(body.bytes, b"1500".to_vec());
}

#[tokio::test]
async fn test_arithmetic_inline_result_keeps_unit() {
    let coordinator = coordinator();

    let snapshot = run_sync(
        &coordinator,
        ExecuteRequest::builder("arithmetic")
            .input(ProcessData::literal("a", 2))
            .input(ProcessData::literal("b", 3))
            .build(),
    )
    .await;

    let response = snapshot.response.unwrap();
    assert_eq!(
        response.output("result").map(|o| o.payload.clone()),
        Some(OutputPayload::Literal(TypedLiteral {
            value: LiteralValue::Double(5.0),
            uom: Some("m".to_string()),
        }))
    );
}

#[tokio::test]
async fn test_delay_runs_asynchronously_and_reports_progress() {
    let coordinator = coordinator();

    let handle = coordinator
        .submit(
            ExecuteRequest::builder("delay")
                .input(ProcessData::literal("seconds", 0.2))
                .input(ProcessData::literal("steps", 4))
                .build(),
        )
        .await
        .unwrap();
    let job_id = match handle {
        ExecutionHandle::Accepted(job_id) => job_id,
        other => panic!("expected an accepted job, got {:?}", other),
    };

    let snapshot = wait_until(&coordinator, &job_id, |s| s.state == JobState::Succeeded).await;
    assert_eq!(snapshot.progress.percent, 100);
    assert_eq!(
        snapshot.partial_outputs.get("steps"),
        Some(&TypedData::literal(LiteralValue::Integer(4)))
    );
}

#[tokio::test]
async fn test_delay_can_be_cancelled_midway() {
    let coordinator = coordinator();

    let handle = coordinator
        .submit(
            ExecuteRequest::builder("delay")
                .execution_mode(ExecutionMode::Async)
                .input(ProcessData::literal("seconds", 60))
                .input(ProcessData::literal("steps", 100))
                .build(),
        )
        .await
        .unwrap();
    let job_id = handle.job_id().clone();

    wait_until(&coordinator, &job_id, |s| s.state == JobState::Running).await;
    coordinator.cancel(&job_id).await.unwrap();

    let snapshot = wait_until(&coordinator, &job_id, |s| s.state.is_terminal()).await;
    assert_eq!(snapshot.state, JobState::Cancelled);
    assert!(snapshot.progress.percent < 100);
}
