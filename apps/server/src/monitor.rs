//! The monitoring loop: fetch, decide, notify, persist, sleep.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tvl_alerts::Notifier;
use tvl_core::{format_usd, Assessment, ChangeKind, MonitorState, StateStore};
use tvl_feeds::{fetch_with_retry, FetchError, MetricSource, RecipientSource, RetryPolicy};

/// Loop tuning.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub retry: RetryPolicy,
    pub interval: Duration,
    pub max_messages: Option<usize>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            interval: Duration::from_secs(60),
            max_messages: None,
        }
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Significant change; alert email dispatched.
    Alert { change_pct: f64 },
    /// Change below threshold; routine email dispatched.
    Stable { change_pct: f64 },
    /// Fetch failed; error recorded in the message log, nothing sent.
    FetchFailed,
}

/// Orchestrates one metric, one recipient list and one state record.
pub struct Monitor {
    metric: Arc<dyn MetricSource>,
    recipients: Arc<dyn RecipientSource>,
    notifier: Notifier,
    store: Arc<dyn StateStore>,
    settings: MonitorSettings,
}

impl Monitor {
    pub fn new(
        metric: Arc<dyn MetricSource>,
        recipients: Arc<dyn RecipientSource>,
        notifier: Notifier,
        store: Arc<dyn StateStore>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            metric,
            recipients,
            notifier,
            store,
            settings,
        }
    }

    /// Seed `state.tvl` from a fresh fetch. Failure here is fatal to the
    /// process, unlike failures inside a cycle.
    pub async fn seed(&self, state: &mut MonitorState) -> Result<f64, FetchError> {
        let tvl = fetch_with_retry(self.metric.as_ref(), &self.settings.retry).await?;
        state.tvl = tvl;
        info!("Initial TVL retrieved: {}", format_usd(tvl));
        Ok(tvl)
    }

    /// Run one fetch → decide → notify → persist cycle.
    pub async fn run_cycle(&self, state: &mut MonitorState) -> CycleOutcome {
        let current = match fetch_with_retry(self.metric.as_ref(), &self.settings.retry).await {
            Ok(tvl) => tvl,
            Err(e) => {
                let message = format!("Error fetching TVL: {}", e);
                error!("{}", message);
                state.push_message(message, self.settings.max_messages);
                self.persist(state).await;
                return CycleOutcome::FetchFailed;
            }
        };

        let assessment = Assessment::new(state.tvl, current, state.threshold);
        let notification = assessment.notification();
        let outcome = match assessment.kind {
            ChangeKind::Significant(_) => {
                warn!(
                    change_pct = assessment.change_pct,
                    "{}", notification.subject
                );
                CycleOutcome::Alert {
                    change_pct: assessment.change_pct,
                }
            }
            ChangeKind::Stable => {
                info!(
                    change_pct = assessment.change_pct,
                    "{}", notification.subject
                );
                CycleOutcome::Stable {
                    change_pct: assessment.change_pct,
                }
            }
        };

        let recipients = self.recipients.fetch_recipients().await;
        self.notifier
            .send(&recipients, &notification.subject, &notification.body)
            .await;

        state.tvl = current;
        state.push_message(notification.body, self.settings.max_messages);
        state.alert_sent = true;
        self.persist(state).await;

        outcome
    }

    /// Run cycles until `shutdown` resolves. Cancelling mid-cycle is safe:
    /// the last completed save is already durable.
    pub async fn run<F>(&self, state: &mut MonitorState, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.run_cycle(state) => {}
            }

            info!("TVL Monitoring completed. Waiting for the next cycle...");

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        info!("TVL Monitoring stopped by the user.");
    }

    /// Save on the blocking pool; file writes stay off the runtime threads.
    async fn persist(&self, state: &MonitorState) {
        let store = Arc::clone(&self.store);
        let snapshot = state.clone();
        match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Failed to save state: {}", e),
            Err(e) => error!("State save task failed: {}", e),
        }
    }
}
