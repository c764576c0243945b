//! Refresh cycle orchestration
//!
//! Drives session, fetch and normalization on a fixed interval, bounds each
//! cycle with a timeout and publishes the last-known-good snapshot.
//!
//! Cycle states:
//!
//! ```text
//! Idle -> Authenticating -> Fetching -> Normalizing -> Published
//!   ^            |              |             |
//!   +------------+--------------+-------------+   (connectivity / data failure, session kept)
//! IdleReauth <---+--------------+                 (authentication failure, session cleared)
//! ```
//!
//! Only this module decides whether a failure clears the cached session.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::client::{EndpointFetcher, FileSessionStore, HttpTransport, SessionManager, Transport};
use crate::config::Config;
use crate::error::{AppResult, ApplianceError, FailureKind};
use crate::metrics::refresh_metrics;
use crate::normalizer::{MetricSnapshot, Normalizer};

/// Refresh cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// Waiting for the next tick, session (if any) kept
    Idle,
    /// Waiting for the next tick, session cleared; next cycle logs in again
    IdleReauth,
    Authenticating,
    Fetching,
    Normalizing,
    /// Last cycle published a snapshot
    Published,
}

/// Failure reported for the last cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of the most recent refresh cycles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateStatus {
    /// Whether the last cycle published a snapshot
    pub last_update_success: bool,
    /// Cause of the last failure, cleared on success
    pub last_failure: Option<UpdateFailure>,
    pub consecutive_failures: u32,
    /// Unix time of the last published snapshot
    pub last_success_unix: Option<u64>,
}

/// Read-only view of the coordinator for consumers
#[derive(Clone)]
pub struct CoordinatorHandle {
    snapshot: watch::Receiver<Option<Arc<MetricSnapshot>>>,
    status: watch::Receiver<UpdateStatus>,
    refresh: Arc<Notify>,
    interval: Duration,
}

impl CoordinatorHandle {
    /// Last published snapshot, if any cycle has succeeded yet
    pub fn snapshot(&self) -> Option<Arc<MetricSnapshot>> {
        self.snapshot.borrow().clone()
    }

    pub fn status(&self) -> UpdateStatus {
        self.status.borrow().clone()
    }

    /// True when the last cycle succeeded
    pub fn available(&self) -> bool {
        self.status.borrow().last_update_success
    }

    /// Ask the coordinator to run a cycle now instead of waiting for the next tick
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn update_interval(&self) -> Duration {
        self.interval
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<MetricSnapshot>>> {
        self.snapshot.clone()
    }
}

/// Refresh cycle orchestrator
pub struct Coordinator {
    session: SessionManager,
    fetcher: EndpointFetcher,
    normalizer: Normalizer,
    interval: Duration,
    cycle_timeout: Duration,
    state: CycleState,
    snapshot_tx: watch::Sender<Option<Arc<MetricSnapshot>>>,
    status_tx: watch::Sender<UpdateStatus>,
    refresh: Arc<Notify>,
}

impl Coordinator {
    pub fn new(
        session: SessionManager,
        fetcher: EndpointFetcher,
        normalizer: Normalizer,
        interval: Duration,
        cycle_timeout: Duration,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(UpdateStatus::default());

        Self {
            session,
            fetcher,
            normalizer,
            interval,
            cycle_timeout,
            state: CycleState::Idle,
            snapshot_tx,
            status_tx,
            refresh: Arc::new(Notify::new()),
        }
    }

    /// Build the full pipeline from configuration
    ///
    /// # Errors
    /// Returns an error if the appliance URL cannot be used to build an HTTP client
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let appliance = &config.appliance;
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
            &appliance.base_url(),
            appliance.request_timeout_ms,
        )?);

        let mut session = SessionManager::new(
            transport.clone(),
            appliance.api_key.clone().unwrap_or_default(),
            Duration::from_millis(appliance.request_timeout_ms),
        );

        if let Some(ref path) = config.state.session_file {
            let store = FileSessionStore::new(path);
            let persisted = store.load();
            if persisted.is_some() {
                debug!(path = %store.path().display(), "Loaded persisted session");
            }
            session = session.with_token(persisted).with_store(Arc::new(store));
        }

        let fetcher = EndpointFetcher::new(transport, appliance.endpoint_paths());
        let normalizer = Normalizer::new(config.refresh.percent_conventions());

        Ok(Self::new(
            session,
            fetcher,
            normalizer,
            config.refresh.interval(),
            config.refresh.timeout(),
        ))
    }

    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            snapshot: self.snapshot_tx.subscribe(),
            status: self.status_tx.subscribe(),
            refresh: self.refresh.clone(),
            interval: self.interval,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Run one refresh cycle and publish its result
    ///
    /// The previous snapshot stays published when the cycle fails or times out.
    #[instrument(skip(self), name = "refresh_cycle")]
    pub async fn refresh(&mut self) -> Result<Arc<MetricSnapshot>, ApplianceError> {
        let started = Instant::now();
        let cycle_timeout = self.cycle_timeout;

        let outcome = match tokio::time::timeout(cycle_timeout, self.run_cycle()).await {
            Ok(result) => result,
            Err(_) => Err(ApplianceError::Connectivity(format!(
                "refresh cycle timed out after {}ms",
                cycle_timeout.as_millis()
            ))),
        };

        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.snapshot_tx.send_replace(Some(snapshot.clone()));
                self.state = CycleState::Published;
                self.status_tx.send_modify(|status| {
                    status.last_update_success = true;
                    status.last_failure = None;
                    status.consecutive_failures = 0;
                    status.last_success_unix = unix_now();
                });
                refresh_metrics().record_success(elapsed);

                info!(
                    metrics = snapshot.len(),
                    duration_ms = (elapsed * 1000.0) as u64,
                    "Snapshot published"
                );
                Ok(snapshot)
            }
            Err(err) => {
                let kind = err.kind();
                if err.clears_session() {
                    self.session.invalidate();
                    self.state = CycleState::IdleReauth;
                } else {
                    self.state = CycleState::Idle;
                }

                self.status_tx.send_modify(|status| {
                    status.last_update_success = false;
                    status.last_failure = Some(UpdateFailure {
                        kind,
                        message: err.to_string(),
                    });
                    status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                });
                refresh_metrics().record_failure(kind, elapsed);

                warn!(kind = %kind, error = %err, "Refresh cycle failed");
                Err(err)
            }
        }
    }

    async fn run_cycle(&mut self) -> Result<MetricSnapshot, ApplianceError> {
        self.state = CycleState::Authenticating;
        let sid = self.session.ensure_token().await?;

        self.state = CycleState::Fetching;
        let responses = self.fetcher.fetch_all(&sid).await?;

        self.state = CycleState::Normalizing;
        self.normalizer.normalize(&responses)
    }

    /// Refresh on every tick until the future is dropped
    ///
    /// The first cycle runs immediately. A refresh request resets the tick.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let refresh = self.refresh.clone();

        info!(interval_secs = self.interval.as_secs(), "Refresh loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = refresh.notified() => {
                    debug!("Refresh requested");
                    ticker.reset();
                }
            }

            // Failures are already reported through the status channel
            let _ = self.refresh().await;
        }
    }
}

fn unix_now() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}
