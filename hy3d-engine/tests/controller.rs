use async_trait::async_trait;
use hy3d_core::{
    ApiError, ClientConfig, GenerationRequest, JobId, QueryResult, RemoteStatus, SubmitResult,
};
use hy3d_engine::session::{NO_MODEL_URL_MESSAGE, SERVER_FAILURE_MESSAGE, SUBMIT_FAILURE_MESSAGE};
use hy3d_engine::{
    ControllerConfig, ControllerEvent, JobApi, JobController, JobSnapshot, ProgressJitter,
    SessionStatus,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};

const INTERVAL: Duration = Duration::from_secs(3);

#[derive(Default)]
struct FakeApi {
    submits: Mutex<VecDeque<Result<SubmitResult, ApiError>>>,
    queries: Mutex<VecDeque<Result<QueryResult, ApiError>>>,
    query_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    queried_ids: Mutex<Vec<JobId>>,
    seen_keys: Mutex<Vec<String>>,
    query_delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    submit_gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
}

impl FakeApi {
    fn submit_ok(self, id: &str) -> Self {
        self.submits.lock().unwrap().push_back(Ok(SubmitResult {
            job_id: JobId::new(id),
        }));
        self
    }

    fn submit_err(self, err: ApiError) -> Self {
        self.submits.lock().unwrap().push_back(Err(err));
        self
    }

    fn status(self, status: &str) -> Self {
        self.query(Ok(QueryResult::with_status(RemoteStatus::normalize(status))))
    }

    fn success(self, url: &str) -> Self {
        let mut q = QueryResult::with_status(RemoteStatus::Success);
        q.model_url = Some(url.into());
        self.query(Ok(q))
    }

    fn query(self, result: Result<QueryResult, ApiError>) -> Self {
        self.queries.lock().unwrap().push_back(result);
        self
    }

    fn calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobApi for FakeApi {
    async fn submit(
        &self,
        cfg: &ClientConfig,
        _request: &GenerationRequest,
    ) -> Result<SubmitResult, ApiError> {
        self.seen_keys.lock().unwrap().push(cfg.api_key.clone());
        if let Some(gate) = &self.submit_gate {
            self.entered.notify_one();
            gate.notified().await;
        }
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Protocol("no scripted submit".into())))
    }

    async fn query(&self, cfg: &ClientConfig, job_id: &JobId) -> Result<QueryResult, ApiError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_keys.lock().unwrap().push(cfg.api_key.clone());
        self.queried_ids.lock().unwrap().push(job_id.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            self.entered.notify_one();
            gate.notified().await;
        }
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResult::with_status(RemoteStatus::Running)))
    }
}

struct FixedJitter(f32);

impl ProgressJitter for FixedJitter {
    fn next_increment(&self) -> f32 {
        self.0
    }
}

fn controller(api: Arc<FakeApi>) -> JobController {
    JobController::new(
        api,
        ControllerConfig::default().with_poll_interval(INTERVAL),
        ClientConfig::new().with_api_key("k1"),
    )
    .with_jitter(Arc::new(FixedJitter(2.0)))
}

fn chair() -> GenerationRequest {
    GenerationRequest::text("a red chair").unwrap()
}

fn drain_states(rx: &mut broadcast::Receiver<ControllerEvent>) -> Vec<JobSnapshot> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if let ControllerEvent::StateChanged(s) = ev {
            out.push(s);
        }
    }
    out
}

fn drain_all(rx: &mut broadcast::Receiver<ControllerEvent>) -> Vec<ControllerEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn submit_moves_through_submitting_into_polling() {
    let api = Arc::new(FakeApi::default().submit_ok("job-1"));
    let ctl = controller(api.clone());
    let mut events = ctl.events();

    let snap = ctl.start(chair()).await;
    assert_eq!(snap.status, SessionStatus::Polling);
    assert_eq!(snap.job_id, Some(JobId::new("job-1")));
    assert_eq!(snap.progress, 10);

    let states = drain_states(&mut events);
    assert_eq!(states.len(), 2);
    assert_eq!(states[0].status, SessionStatus::Submitting);
    assert_eq!(states[0].progress, 5);
    assert!(states[0].job_id.is_none());
    assert_eq!(states[1], snap);

    // No query before the first interval elapses.
    assert_eq!(api.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn submit_failure_is_terminal_without_job_id() {
    let api = Arc::new(FakeApi::default().submit_err(ApiError::Http {
        status: 401,
        message: "API Error: invalid api key".into(),
    }));
    let ctl = controller(api.clone());

    let snap = ctl.start(chair()).await;
    assert_eq!(snap.status, SessionStatus::Failed);
    assert_eq!(snap.error_message.as_deref(), Some("API Error: invalid api key"));
    assert!(snap.job_id.is_none());

    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(api.calls(), 0);
    assert_eq!(ctl.snapshot(), snap);
}

#[tokio::test(start_paused = true)]
async fn submit_failure_without_message_uses_fallback() {
    let api = Arc::new(FakeApi::default().submit_err(ApiError::Backend { message: None }));
    let snap = controller(api).start(chair()).await;
    assert_eq!(snap.status, SessionStatus::Failed);
    assert_eq!(snap.error_message.as_deref(), Some(SUBMIT_FAILURE_MESSAGE));
}

#[tokio::test(start_paused = true)]
async fn polls_until_success() {
    let api = Arc::new(
        FakeApi::default()
            .submit_ok("job-1")
            .status("WAITING")
            .status("running")
            .success("https://x/m.glb"),
    );
    let ctl = controller(api.clone());
    ctl.start(chair()).await;

    let snap = ctl.wait_for_terminal().await;
    assert_eq!(snap.status, SessionStatus::Success);
    assert_eq!(snap.result_url.as_deref(), Some("https://x/m.glb"));
    assert_eq!(snap.progress, 100);
    assert_eq!(snap.job_id, Some(JobId::new("job-1")));
    assert_eq!(api.calls(), 3);

    // Timer stops at a terminal state.
    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(api.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn success_without_model_url_fails() {
    let api = Arc::new(
        FakeApi::default()
            .submit_ok("job-1")
            .query(Ok(QueryResult::with_status(RemoteStatus::Success))),
    );
    let ctl = controller(api);
    ctl.start(chair()).await;

    let snap = ctl.wait_for_terminal().await;
    assert_eq!(snap.status, SessionStatus::Failed);
    assert_eq!(snap.error_message.as_deref(), Some(NO_MODEL_URL_MESSAGE));
    assert!(snap.result_url.is_none());
}

#[tokio::test(start_paused = true)]
async fn backend_error_fails_with_its_message() {
    let api = Arc::new(
        FakeApi::default()
            .submit_ok("job-1")
            .query(Err(ApiError::backend("quota exceeded"))),
    );
    let ctl = controller(api);
    ctl.start(chair()).await;

    let snap = ctl.wait_for_terminal().await;
    assert_eq!(snap.status, SessionStatus::Failed);
    assert_eq!(snap.error_message.as_deref(), Some("quota exceeded"));
    assert_eq!(snap.job_id, Some(JobId::new("job-1")));
}

#[tokio::test(start_paused = true)]
async fn failed_status_without_message_uses_fallback() {
    let api = Arc::new(FakeApi::default().submit_ok("job-1").status("FAILED"));
    let ctl = controller(api);
    ctl.start(chair()).await;

    let snap = ctl.wait_for_terminal().await;
    assert_eq!(snap.error_message.as_deref(), Some(SERVER_FAILURE_MESSAGE));
}

#[tokio::test(start_paused = true)]
async fn protocol_error_while_polling_is_surfaced() {
    let api = Arc::new(
        FakeApi::default()
            .submit_ok("job-1")
            .query(Err(ApiError::Protocol("unexpected payload".into()))),
    );
    let ctl = controller(api.clone());
    ctl.start(chair()).await;

    let snap = ctl.wait_for_terminal().await;
    assert_eq!(snap.status, SessionStatus::Failed);
    assert_eq!(snap.error_message.as_deref(), Some("unexpected payload"));
    assert_eq!(api.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_poll_errors_are_absorbed_and_reported() {
    let api = Arc::new(
        FakeApi::default()
            .submit_ok("job-1")
            .query(Err(ApiError::Network("connection reset".into())))
            .query(Err(ApiError::Http {
                status: 502,
                message: "HTTP Error: 502 Bad Gateway".into(),
            }))
            .query(Err(ApiError::Decode("expected value".into())))
            .success("https://x/m.glb"),
    );
    let ctl = controller(api.clone());
    let mut events = ctl.events();
    ctl.start(chair()).await;

    let snap = ctl.wait_for_terminal().await;
    assert_eq!(snap.status, SessionStatus::Success);
    assert_eq!(api.calls(), 4);

    let events = drain_all(&mut events);
    let failures = events
        .iter()
        .filter(|e| matches!(e, ControllerEvent::PollFailed { job_id, .. } if job_id.as_str() == "job-1"))
        .count();
    assert_eq!(failures, 3);

    // Every state published between the failures was still POLLING with the
    // same job id and no result.
    for ev in &events {
        if let ControllerEvent::StateChanged(s) = ev {
            if s.status == SessionStatus::Polling {
                assert_eq!(s.job_id, Some(JobId::new("job-1")));
                assert!(s.result_url.is_none());
                assert!(s.error_message.is_none());
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn progress_is_monotonic_and_capped_while_polling() {
    let mut api = FakeApi::default().submit_ok("job-1");
    for _ in 0..40 {
        api = api.status("RUNNING");
    }
    let api = Arc::new(api.success("https://x/m.glb"));

    let ctl = JobController::new(
        api,
        ControllerConfig::default().with_poll_interval(INTERVAL),
        ClientConfig::new(),
    )
    .with_jitter(Arc::new(FixedJitter(4.9)));
    let mut events = ctl.events();
    ctl.start(chair()).await;
    let done = ctl.wait_for_terminal().await;

    let states = drain_states(&mut events);
    let polling: Vec<u8> = states
        .iter()
        .filter(|s| s.status == SessionStatus::Polling)
        .map(|s| s.progress)
        .collect();
    assert!(polling.windows(2).all(|w| w[0] <= w[1]), "{polling:?}");
    assert!(polling.iter().all(|p| *p <= 90));
    assert_eq!(polling.last(), Some(&90));
    assert_eq!(done.progress, 100);
}

#[tokio::test(start_paused = true)]
async fn reset_stops_polling_and_clears_session() {
    let api = Arc::new(FakeApi::default().submit_ok("job-1"));
    let ctl = controller(api.clone());
    ctl.start(chair()).await;

    tokio::time::sleep(INTERVAL * 2 + Duration::from_millis(10)).await;
    let calls = api.calls();
    assert_eq!(calls, 2);

    let snap = ctl.reset();
    assert_eq!(
        snap,
        JobSnapshot {
            status: SessionStatus::Idle,
            job_id: None,
            result_url: None,
            error_message: None,
            progress: 0,
        }
    );

    tokio::time::sleep(INTERVAL * 10).await;
    assert_eq!(api.calls(), calls);
    assert_eq!(ctl.snapshot(), snap);

    // Idempotent.
    assert_eq!(ctl.cancel(), snap);
}

#[tokio::test(start_paused = true)]
async fn in_flight_query_is_abandoned_on_reset() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(
        FakeApi {
            gate: Some(gate.clone()),
            ..FakeApi::default()
        }
        .submit_ok("job-1")
        .success("https://x/m.glb"),
    );
    let ctl = controller(api.clone());
    ctl.start(chair()).await;

    api.entered.notified().await;
    ctl.reset();
    gate.notify_one();
    tokio::time::sleep(INTERVAL * 3).await;

    let snap = ctl.snapshot();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert!(snap.result_url.is_none());
    // The query never got to return.
    assert_eq!(api.in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(api.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn submit_resolving_after_reset_is_discarded() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(
        FakeApi {
            submit_gate: Some(gate.clone()),
            ..FakeApi::default()
        }
        .submit_ok("job-1"),
    );
    let ctl = Arc::new(controller(api.clone()));
    let mut events = ctl.events();

    let starter = Arc::clone(&ctl);
    let pending = tokio::spawn(async move { starter.start(chair()).await });

    api.entered.notified().await;
    assert_eq!(ctl.snapshot().status, SessionStatus::Submitting);
    ctl.reset();
    gate.notify_one();

    let snap = pending.await.unwrap();
    assert_eq!(snap.status, SessionStatus::Idle);
    assert!(snap.job_id.is_none());

    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(api.calls(), 0);
    assert!(drain_all(&mut events).iter().any(|e| matches!(
        e,
        ControllerEvent::StaleResultDiscarded { job_id: Some(id) } if id.as_str() == "job-1"
    )));
}

#[tokio::test(start_paused = true)]
async fn slow_queries_never_overlap() {
    let mut api = FakeApi {
        query_delay: Some(INTERVAL * 3 + Duration::from_millis(500)),
        ..FakeApi::default()
    }
    .submit_ok("job-1");
    for _ in 0..3 {
        api = api.status("RUNNING");
    }
    let api = Arc::new(api.success("https://x/m.glb"));
    let ctl = controller(api.clone());
    ctl.start(chair()).await;

    let snap = ctl.wait_for_terminal().await;
    assert_eq!(snap.status, SessionStatus::Success);
    assert_eq!(api.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(api.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn new_start_replaces_running_session() {
    let api = Arc::new(FakeApi::default().submit_ok("job-1").submit_ok("job-2"));
    let ctl = controller(api.clone());

    ctl.start(chair()).await;
    tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
    let snap = ctl.start(chair()).await;
    assert_eq!(snap.job_id, Some(JobId::new("job-2")));
    assert_eq!(snap.progress, 10);

    tokio::time::sleep(INTERVAL * 3 + Duration::from_millis(10)).await;
    let ids = api.queried_ids.lock().unwrap().clone();
    assert_eq!(ids[0].as_str(), "job-1");
    assert!(ids[1..].iter().all(|id| id.as_str() == "job-2"), "{ids:?}");
    assert_eq!(ids.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn dropping_controller_stops_polling() {
    let api = Arc::new(FakeApi::default().submit_ok("job-1"));
    let ctl = controller(api.clone());
    ctl.start(chair()).await;

    tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
    assert_eq!(api.calls(), 1);

    drop(ctl);
    tokio::time::sleep(INTERVAL * 10).await;
    assert_eq!(api.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn client_config_changes_apply_to_next_call() {
    let api = Arc::new(FakeApi::default().submit_ok("job-1"));
    let ctl = controller(api.clone());
    ctl.start(chair()).await;

    ctl.set_client_config(ctl.client_config().with_api_key("k2"));
    assert_eq!(ctl.client_config().api_key, "k2");
    tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;

    let keys = api.seen_keys.lock().unwrap().clone();
    assert_eq!(keys, vec!["k1".to_string(), "k2".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_latest_snapshot() {
    let api = Arc::new(FakeApi::default().submit_ok("job-1").success("https://x/m.glb"));
    let ctl = controller(api);
    let mut rx = ctl.subscribe();
    assert_eq!(rx.borrow().status, SessionStatus::Idle);

    ctl.start(chair()).await;
    rx.wait_for(|s| s.status == SessionStatus::Success)
        .await
        .unwrap();
    assert_eq!(rx.borrow().result_url.as_deref(), Some("https://x/m.glb"));
}

#[tokio::test(start_paused = true)]
async fn zero_poll_interval_is_clamped() {
    let api = Arc::new(FakeApi::default().submit_ok("job-1"));
    let ctl = JobController::new(
        api.clone(),
        ControllerConfig::default().with_poll_interval(Duration::ZERO),
        ClientConfig::new(),
    );
    assert_eq!(ctl.poll_interval(), Duration::from_millis(1));

    ctl.start(chair()).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(api.calls() >= 1);
    ctl.reset();
}

#[tokio::test(start_paused = true)]
async fn abandoning_start_mid_submit_fails_the_session() {
    let api = Arc::new(
        FakeApi {
            submit_gate: Some(Arc::new(Notify::new())),
            ..FakeApi::default()
        }
        .submit_ok("job-1"),
    );
    let ctl = controller(api.clone());

    let timed_out = tokio::time::timeout(INTERVAL, ctl.start(chair())).await;
    assert!(timed_out.is_err());

    let snap = ctl.snapshot();
    assert_eq!(snap.status, SessionStatus::Failed);
    assert_eq!(snap.error_message.as_deref(), Some(SUBMIT_FAILURE_MESSAGE));
    assert!(snap.job_id.is_none());
    assert_eq!(ctl.wait_for_terminal().await, snap);

    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(api.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn abandoned_start_leaves_a_newer_session_alone() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(
        FakeApi {
            submit_gate: Some(gate.clone()),
            ..FakeApi::default()
        }
        .submit_ok("job-1"),
    );
    let ctl = controller(api.clone());

    let mut first = Box::pin(ctl.start(chair()));
    tokio::select! {
        _ = &mut first => panic!("submit should still be pending"),
        _ = api.entered.notified() => {}
    }
    ctl.reset();
    drop(first);

    assert_eq!(ctl.snapshot(), JobSnapshot::idle());
}
