//! Job webhook fixtures driven through the full decision path.

use checks::{
    job_hook_to_decision, CheckRunId, Conclusion, Decision, JobEvent, JobHook, ReconcileError,
    RequestMethod, Status,
};

fn load(name: &str) -> JobHook {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    let raw = std::fs::read_to_string(&path).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn started_then_finished_creates_then_updates() {
    let started = load("buildkite.job.started.json");
    let finished = load("buildkite.job.finished.json");
    assert_eq!(started.event, JobEvent::Started);

    let created = job_hook_to_decision(&started, &[]).unwrap();
    let Decision::Create { repository, run } = &created else {
        panic!("expected create, got {created:?}");
    };
    assert_eq!(repository.to_string(), "octo/widgets");
    assert_eq!(
        run.head_sha.as_ref().unwrap().as_str(),
        "9fceb02d0ae598e95dc970b74767f19372d61af8"
    );
    assert_eq!(run.head_branch.as_ref().unwrap().as_str(), "faster-widgets");
    assert_eq!(run.status, Some(Status::InProgress));
    assert_eq!(run.conclusion, None);
    assert_eq!(
        run.started_at.unwrap().to_string(),
        "2024-05-01T10:30:02Z"
    );

    // GitHub assigns the id when it creates the run.
    let mut published = run.clone();
    published.id = Some(CheckRunId::new(1_234_567));

    let concluded = job_hook_to_decision(&finished, &[published]).unwrap();
    let Decision::Update { id, run, .. } = &concluded else {
        panic!("expected update, got {concluded:?}");
    };
    assert_eq!(*id, CheckRunId::new(1_234_567));
    assert_eq!(
        run.external_id.as_ref().unwrap().as_str(),
        "0183c5a4-5b9e-4c3b-8f7e-2a1b9f4e1c11"
    );
    assert_eq!(run.status, Some(Status::Completed));
    assert_eq!(run.conclusion, Some(Conclusion::Success));
    assert!(run.head_sha.is_none() && run.head_branch.is_none());

    let request = concluded.request().unwrap();
    assert_eq!(request.method, RequestMethod::Patch);
    assert_eq!(request.path, "/repos/octo/widgets/check-runs/1234567");
    assert!(request.body.get("head_sha").is_none());
    assert_eq!(request.body["completed_at"], "2024-05-01T10:34:12Z");
}

#[test]
fn finished_without_prior_run_creates() {
    let finished = load("buildkite.job.finished.json");
    let decision = job_hook_to_decision(&finished, &[]).unwrap();
    assert!(matches!(decision, Decision::Create { .. }));
    assert_eq!(decision.run().conclusion, Some(Conclusion::Success));
}

#[test]
fn unknown_fields_are_ignored_but_required_fields_are_not() {
    let raw = std::fs::read_to_string(format!(
        "{}/tests/fixtures/buildkite.job.started.json",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    value["job"]
        .as_object_mut()
        .unwrap()
        .remove("state");

    assert!(serde_json::from_value::<JobHook>(value).is_err());
}

#[test]
fn unparseable_pipeline_repository_is_rejected() {
    let mut hook = load("buildkite.job.started.json");
    hook.pipeline.repository = "file:///srv/git/widgets".into();

    assert!(matches!(
        job_hook_to_decision(&hook, &[]),
        Err(ReconcileError::InvalidRepositoryUrl(_))
    ));
}
