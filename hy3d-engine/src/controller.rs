use crate::poll::PollHandle;
use crate::session::{
    JobSession, JobSnapshot, SERVER_FAILURE_MESSAGE, SUBMIT_FAILURE_MESSAGE, SessionStatus,
};
use crate::traits::{JobApi, ProgressJitter, RandomJitter};
use hy3d_core::{ApiError, ClientConfig, GenerationRequest, JobId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub poll_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ControllerConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    StateChanged(JobSnapshot),
    /// A poll failed transiently; the session stays in `POLLING`.
    PollFailed { job_id: JobId, error: ApiError },
    /// A submit or query resolved after its session was reset or replaced.
    StaleResultDiscarded { job_id: Option<JobId> },
}

struct Inner {
    session: JobSession,
    // Bumped on every start/reset/teardown. Work started under an older
    // value must not touch the session.
    generation: u64,
    client: ClientConfig,
    jitter: Arc<dyn ProgressJitter>,
    poll: PollHandle,
}

struct Shared {
    api: Arc<dyn JobApi>,
    poll_interval: Duration,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<JobSnapshot>,
    events_tx: broadcast::Sender<ControllerEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called with the lock held so observers see transitions in order.
    fn publish(&self, inner: &Inner) {
        let snap = inner.session.snapshot();
        if *self.state_tx.borrow() == snap {
            return;
        }
        log::debug!(
            "session -> {} ({}%, job={})",
            snap.status,
            snap.progress,
            snap.job_id.as_ref().map(JobId::as_str).unwrap_or("-")
        );
        self.state_tx.send_replace(snap.clone());
        self.emit(ControllerEvent::StateChanged(snap));
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }
}

/// Drives one generation job at a time: submit, poll on a fixed interval,
/// stop at SUCCESS or FAILED.
///
/// Starting a new job while one is running discards the old one, including
/// any in-flight request. Dropping the controller stops polling.
pub struct JobController {
    shared: Arc<Shared>,
}

impl JobController {
    pub fn new(api: Arc<dyn JobApi>, cfg: ControllerConfig, client: ClientConfig) -> Self {
        let poll_interval = if cfg.poll_interval < MIN_POLL_INTERVAL {
            log::warn!(
                "poll interval {:?} too small, using {:?}",
                cfg.poll_interval,
                MIN_POLL_INTERVAL
            );
            MIN_POLL_INTERVAL
        } else {
            cfg.poll_interval
        };

        let (state_tx, _) = watch::channel(JobSnapshot::idle());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                api,
                poll_interval,
                inner: Mutex::new(Inner {
                    session: JobSession::idle(),
                    generation: 0,
                    client,
                    jitter: Arc::new(RandomJitter),
                    poll: PollHandle::new(),
                }),
                state_tx,
                events_tx,
            }),
        }
    }

    pub fn with_jitter(self, jitter: Arc<dyn ProgressJitter>) -> Self {
        self.shared.lock().jitter = jitter;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.shared.poll_interval
    }

    pub fn client_config(&self) -> ClientConfig {
        self.shared.lock().client.clone()
    }

    /// Takes effect on the next submit or query.
    pub fn set_client_config(&self, client: ClientConfig) {
        self.shared.lock().client = client;
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.shared.lock().session.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.shared.state_tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Submits `request` and, on success, starts polling in the background.
    ///
    /// `SUBMITTING` is published before the submit call is awaited. Returns
    /// the snapshot once submission resolved, or the current one if the
    /// session was reset or replaced in the meantime.
    ///
    /// Dropping the returned future before submission resolves fails the
    /// session with the generic submit failure; the job id is never known.
    pub async fn start(&self, request: GenerationRequest) -> JobSnapshot {
        let (generation, client) = {
            let mut inner = self.shared.lock();
            inner.poll.cancel();
            inner.generation = inner.generation.wrapping_add(1);
            inner.session = JobSession::submitting();
            self.shared.publish(&inner);
            (inner.generation, inner.client.clone())
        };

        log::info!("starting {:?} generation", request.kind());
        let mut pending = PendingSubmit {
            shared: &self.shared,
            generation,
            armed: true,
        };
        let outcome = self.shared.api.submit(&client, &request).await;
        pending.armed = false;

        let mut inner = self.shared.lock();
        if inner.generation != generation {
            log::debug!("submit resolved for a superseded session; discarding");
            self.shared.emit(ControllerEvent::StaleResultDiscarded {
                job_id: outcome.ok().map(|r| r.job_id),
            });
            return inner.session.snapshot();
        }

        match outcome {
            Ok(submitted) => {
                log::info!("job {} submitted", submitted.job_id);
                inner.session.begin_polling(submitted.job_id.clone());
                self.shared.publish(&inner);
                let task = tokio::spawn(poll_loop(
                    Arc::clone(&self.shared),
                    generation,
                    submitted.job_id,
                ));
                inner.poll.arm(task);
            }
            Err(err) => {
                log::warn!("submit failed: {err}");
                let message = err
                    .user_message()
                    .unwrap_or_else(|| SUBMIT_FAILURE_MESSAGE.to_string());
                inner.session.fail(message);
                self.shared.publish(&inner);
            }
        }
        inner.session.snapshot()
    }

    /// Stops polling and returns to a fresh `IDLE` session. Safe to call at
    /// any time; results still in flight are discarded when they arrive.
    pub fn reset(&self) -> JobSnapshot {
        let mut inner = self.shared.lock();
        if inner.poll.cancel() {
            log::debug!("poll task cancelled");
        }
        inner.generation = inner.generation.wrapping_add(1);
        inner.session = JobSession::idle();
        self.shared.publish(&inner);
        inner.session.snapshot()
    }

    pub fn cancel(&self) -> JobSnapshot {
        self.reset()
    }

    /// Resolves when the current session ends: `SUCCESS`, `FAILED`, or back
    /// to `IDLE` through a reset. Returns immediately if already there.
    pub async fn wait_for_terminal(&self) -> JobSnapshot {
        let mut rx = self.subscribe();
        let done = rx
            .wait_for(|s| s.status.is_terminal() || s.status == SessionStatus::Idle)
            .await
            .map(|s| s.clone());
        match done {
            Ok(snap) => snap,
            Err(_) => self.snapshot(),
        }
    }
}

/// Held across the submit await in `start`.
struct PendingSubmit<'a> {
    shared: &'a Shared,
    generation: u64,
    armed: bool,
}

impl Drop for PendingSubmit<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.shared.lock();
        if inner.generation == self.generation && inner.session.status() == SessionStatus::Submitting
        {
            log::warn!("start was dropped before submit resolved");
            inner.session.fail(SUBMIT_FAILURE_MESSAGE);
            self.shared.publish(&inner);
        }
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.generation = inner.generation.wrapping_add(1);
        if inner.poll.cancel() {
            log::debug!("controller dropped; poll task cancelled");
        }
    }
}

/// Ticks are handled one at a time: the next tick is not awaited until the
/// current query resolved, and ticks missed meanwhile are skipped.
async fn poll_loop(shared: Arc<Shared>, generation: u64, job_id: JobId) {
    let period = shared.poll_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let client = {
            let mut inner = shared.lock();
            if inner.generation != generation {
                return;
            }
            let increment = inner.jitter.next_increment();
            inner.session.advance_progress(increment);
            shared.publish(&inner);
            inner.client.clone()
        };

        let outcome = shared.api.query(&client, &job_id).await;

        let mut inner = shared.lock();
        if inner.generation != generation {
            log::debug!("query for job {job_id} resolved after cancellation; discarding");
            shared.emit(ControllerEvent::StaleResultDiscarded {
                job_id: Some(job_id),
            });
            return;
        }

        match outcome {
            Ok(result) => {
                if inner.session.apply_query(&result) {
                    log::info!("job {job_id} finished with {}", result.status.as_str());
                    shared.publish(&inner);
                    return;
                }
                log::debug!("job {job_id} status {:?}", result.status.as_str());
            }
            Err(err) if err.is_transient() => {
                log::warn!("poll for job {job_id} failed, retrying next tick: {err}");
                shared.emit(ControllerEvent::PollFailed {
                    job_id: job_id.clone(),
                    error: err,
                });
            }
            Err(err) => {
                log::warn!("job {job_id} failed: {err}");
                let message = err
                    .user_message()
                    .unwrap_or_else(|| SERVER_FAILURE_MESSAGE.to_string());
                inner.session.fail(message);
                shared.publish(&inner);
                return;
            }
        }
    }
}
