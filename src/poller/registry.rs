//! Registry of active pollers, keyed by job.

use crate::audit;
use crate::callback::TracingNotifier;
use crate::core::{
    ArcBackend, ArcNotifier, ArcReportTrigger, CallbackNotifier, PollerError, ReportTrigger,
    ScanBackend, ScanJob,
};
use crate::poller::config::PollerConfig;
use crate::poller::poller::{Poller, PollerContext, PollerExit};
use crate::report::NoOpReportTrigger;
use crate::status::RelaunchPolicy;

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Builder for creating a [`PollerRegistry`].
pub struct PollerRegistryBuilder {
    backend: Option<ArcBackend>,
    notifier: Option<ArcNotifier>,
    report: Option<ArcReportTrigger>,
    config: PollerConfig,
}

impl PollerRegistryBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            backend: None,
            notifier: None,
            report: None,
            config: PollerConfig::default(),
        }
    }

    /// Sets the vendor backend.
    pub fn with_backend<B: ScanBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Sets a vendor backend wrapped in an Arc.
    pub fn with_arc_backend(mut self, backend: ArcBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the callback notifier. Defaults to [`TracingNotifier`].
    pub fn with_notifier<N: CallbackNotifier + 'static>(mut self, notifier: N) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Sets a callback notifier wrapped in an Arc.
    pub fn with_arc_notifier(mut self, notifier: ArcNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the report trigger. Defaults to [`NoOpReportTrigger`].
    pub fn with_report_trigger<R: ReportTrigger + 'static>(mut self, report: R) -> Self {
        self.report = Some(Arc::new(report));
        self
    }

    /// Sets a report trigger wrapped in an Arc.
    pub fn with_arc_report_trigger(mut self, report: ArcReportTrigger) -> Self {
        self.report = Some(report);
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the registry.
    pub fn build(self) -> Result<PollerRegistry, PollerError> {
        let backend = self
            .backend
            .ok_or_else(|| PollerError::configuration("a scan backend is required"))?;
        self.config.validate()?;

        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotifier::new()));
        let report = self
            .report
            .unwrap_or_else(|| Arc::new(NoOpReportTrigger::new()));

        Ok(PollerRegistry {
            context: PollerContext::new(backend, notifier, report, &self.config),
            config: self.config,
            pollers: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        })
    }
}

impl Default for PollerRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct ActivePoller {
    generation: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    done: watch::Receiver<bool>,
}

type PollerMap = Arc<Mutex<HashMap<String, ActivePoller>>>;

/// Tracks at most one active poller per job.
///
/// Each activation runs on its own tokio task. When a scan is relaunched the
/// task keeps polling the successor scan under the same job, so the job stays
/// active until it reaches a terminal status or is deactivated.
#[derive(Debug)]
pub struct PollerRegistry {
    context: PollerContext,
    config: PollerConfig,
    pollers: PollerMap,
    next_generation: AtomicU64,
}

impl PollerRegistry {
    /// Creates a new builder.
    pub fn builder() -> PollerRegistryBuilder {
        PollerRegistryBuilder::new()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Starts polling a job after `initial_delay`, then every `poll_interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn activate(
        &self,
        job: ScanJob,
        initial_delay: Duration,
        poll_interval: Duration,
    ) -> Result<(), PollerError> {
        let poller = Poller::new(job.clone(), &self.context, initial_delay, poll_interval)?;

        let mut pollers = self
            .pollers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pollers.contains_key(&job.job_id) {
            return Err(PollerError::AlreadyActive {
                job_id: job.job_id.clone(),
            });
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(false);

        tracing::info!(
            job_id = %job.job_id,
            scanner_scan_id = ?job.scanner_scan_id,
            initial_delay_ms = initial_delay.as_millis() as u64,
            poll_interval_ms = poll_interval.as_millis() as u64,
            "Activating poller"
        );

        let supervisor = Supervisor {
            context: self.context.clone(),
            pollers: Arc::clone(&self.pollers),
            job_id: job.job_id.clone(),
            generation,
            initial_delay,
            poll_interval,
            cancel: cancel.clone(),
            done: done_tx,
        };
        // The entry is inserted under the same lock, so the task cannot
        // finish and unregister before it is registered.
        let task = tokio::spawn(supervisor.run(poller));

        pollers.insert(
            job.job_id,
            ActivePoller {
                generation,
                cancel,
                task: Some(task),
                done: done_rx,
            },
        );
        Ok(())
    }

    /// Starts polling a job with the configured delays.
    pub fn activate_default(&self, job: ScanJob) -> Result<(), PollerError> {
        self.activate(job, self.config.initial_delay, self.config.poll_interval)
    }

    /// Returns whether a poller is active for the job.
    pub fn is_active(&self, job_id: &str) -> bool {
        self.pollers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(job_id)
    }

    /// Returns the ids of all jobs with an active poller.
    pub fn active_jobs(&self) -> Vec<String> {
        let mut jobs: Vec<String> = self
            .pollers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        jobs.sort();
        jobs
    }

    /// Stops polling a job.
    ///
    /// A cycle already in flight runs to completion before this returns; no
    /// new cycle starts afterwards. Returns `false` if the job had no poller.
    pub async fn deactivate(&self, job_id: &str) -> bool {
        let entry = self
            .pollers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(job_id);

        match entry {
            Some(entry) => {
                tracing::info!(job_id = %job_id, "Deactivating poller");
                stop(entry).await;
                true
            }
            None => false,
        }
    }

    /// Waits until the job's poller has stopped on its own or been deactivated.
    pub async fn wait_until_inactive(&self, job_id: &str) {
        let done = self
            .pollers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(job_id)
            .map(|entry| entry.done.clone());

        if let Some(mut done) = done {
            // A dropped sender means the task is gone as well.
            let _ = done.wait_for(|finished| *finished).await;
        }
    }

    /// Deactivates every poller and waits for all of them to stop.
    pub async fn shutdown(&self) {
        let entries: Vec<ActivePoller> = self
            .pollers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain()
            .map(|(_, entry)| entry)
            .collect();

        tracing::info!(pollers = entries.len(), "Shutting down poller registry");
        join_all(entries.into_iter().map(stop)).await;
    }
}

impl Drop for PollerRegistry {
    fn drop(&mut self) {
        let pollers = self
            .pollers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for entry in pollers.values() {
            entry.cancel.cancel();
        }
    }
}

async fn stop(mut entry: ActivePoller) {
    entry.cancel.cancel();
    if let Some(task) = entry.task.take() {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Poller task failed");
        }
    }
}

/// Initial delay of the poller watching the `attempt`-th relaunched scan.
fn relaunch_delay(initial_delay: Duration, policy: &RelaunchPolicy, attempt: u32) -> Duration {
    initial_delay.saturating_add(policy.delay_for_attempt(attempt))
}

/// Drives one job's pollers across relaunches.
struct Supervisor {
    context: PollerContext,
    pollers: PollerMap,
    job_id: String,
    generation: u64,
    initial_delay: Duration,
    poll_interval: Duration,
    cancel: CancellationToken,
    done: watch::Sender<bool>,
}

impl Supervisor {
    async fn run(self, first: Poller) {
        let mut poller = first;
        let mut delay = self.initial_delay;

        let (job, reason) = loop {
            let job = poller.job().clone();
            audit::emit_poller_activated(&job, delay);

            match poller.run(self.cancel.clone()).await {
                PollerExit::Terminated(status) => {
                    break (job, format!("terminal status {status}"));
                }
                PollerExit::Cancelled => break (job, "deactivated".to_string()),
                PollerExit::Relaunched(next) => {
                    audit::emit_poller_deactivated(&job, "relaunched");
                    delay = relaunch_delay(
                        self.initial_delay,
                        self.context.relaunch_policy(),
                        next.relaunch_count,
                    );

                    poller = match Poller::new(next.clone(), &self.context, delay, self.poll_interval)
                    {
                        Ok(p) => p,
                        Err(e) => {
                            tracing::error!(
                                job_id = %next.job_id,
                                error = %e,
                                "Cannot poll relaunched scan"
                            );
                            break (next, e.to_string());
                        }
                    };
                }
            }
        };

        audit::emit_poller_deactivated(&job, &reason);
        self.unregister();
        let _ = self.done.send(true);
    }

    fn unregister(&self) {
        let mut pollers = self
            .pollers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pollers
            .get(&self.job_id)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            pollers.remove(&self.job_id);
        }
    }
}
