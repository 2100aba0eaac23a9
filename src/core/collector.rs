//! Process-wide network telemetry.
//!
//! Samples synthetic network metrics on a fixed interval, independent of any
//! single case, and keeps the most recent ones for display and export.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::db::CaseStore;
use crate::models::{CaseStatus, MetricsExport, NetworkMetricsSample};
use crate::telecom::capability::CongestionLevel;
use crate::telecom::RemoteCapabilityClient;
use crate::utils::{RingBuffer, SimRng};

pub const METRICS_HISTORY_CAPACITY: usize = 50;

pub struct NetworkMetricsCollector {
    store: Arc<CaseStore>,
    client: Arc<RemoteCapabilityClient>,
    rng: SimRng,
    history: Mutex<RingBuffer<NetworkMetricsSample>>,
}

impl NetworkMetricsCollector {
    pub fn new(store: Arc<CaseStore>, client: Arc<RemoteCapabilityClient>, rng: SimRng) -> Self {
        Self {
            store,
            client,
            rng,
            history: Mutex::new(RingBuffer::new(METRICS_HISTORY_CAPACITY)),
        }
    }

    /// Take one sample and append it to the history.
    pub fn collect(&self) -> NetworkMetricsSample {
        let active_emergencies = self.store.count_by_status(CaseStatus::Active);
        let last_api = self.client.last_response_time_ms();

        let sample = self.rng.with(|rng| NetworkMetricsSample {
            timestamp: Utc::now(),
            bandwidth: rng.gen_range(45..=60),
            latency: rng.gen_range(15..=25),
            packet_loss: (rng.gen_range(0.0..0.3_f64) * 100.0).round() / 100.0,
            congestion: match rng.gen_range(0..3) {
                0 => CongestionLevel::Low,
                1 => CongestionLevel::Medium,
                _ => CongestionLevel::High,
            },
            connected_devices: rng.gen_range(50..=200),
            network_health: rng.gen_range(85..=98),
            active_emergencies,
            api_response_time: last_api.unwrap_or_else(|| rng.gen_range(50..=200)),
        });

        self.lock().push(sample.clone());
        debug!(active_emergencies, congestion = %sample.congestion, "network metrics sampled");
        sample
    }

    /// Retained samples, oldest first.
    pub fn history(&self) -> Vec<NetworkMetricsSample> {
        self.lock().iter().cloned().collect()
    }

    /// The last `last` samples plus the current case count and client mode.
    pub fn export(&self, last: usize) -> MetricsExport {
        MetricsExport {
            timestamp: Utc::now(),
            network_metrics: self.lock().tail(last),
            active_cases: self.store.count_by_status(CaseStatus::Active),
            api_status: self.client.mode(),
        }
    }

    /// Sample every `period` until `token` is cancelled.
    pub fn spawn(self: Arc<Self>, period: Duration, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_ms = period.as_millis() as u64, "network metrics collector started");

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        self.collect();
                    }
                }
            }
            info!("network metrics collector stopped");
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RingBuffer<NetworkMetricsSample>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelecomConfig;
    use crate::models::ApiMode;

    fn collector() -> NetworkMetricsCollector {
        let client =
            RemoteCapabilityClient::demo(&TelecomConfig::default(), SimRng::seeded(1)).unwrap();
        NetworkMetricsCollector::new(
            Arc::new(CaseStore::new()),
            Arc::new(client),
            SimRng::seeded(2),
        )
    }

    #[test]
    fn samples_stay_in_bands() {
        let collector = collector();
        for _ in 0..100 {
            let s = collector.collect();
            assert!((45..=60).contains(&s.bandwidth));
            assert!((15..=25).contains(&s.latency));
            assert!((0.0..=0.3).contains(&s.packet_loss));
            assert_eq!(s.packet_loss, (s.packet_loss * 100.0).round() / 100.0);
            assert!((50..=200).contains(&s.connected_devices));
            assert!((85..=98).contains(&s.network_health));
            // demo client never records a live latency
            assert!((50..=200).contains(&s.api_response_time));
            assert_eq!(s.active_emergencies, 0);
        }
    }

    #[test]
    fn history_is_capped() {
        let collector = collector();
        for _ in 0..(METRICS_HISTORY_CAPACITY + 10) {
            collector.collect();
        }
        assert_eq!(collector.history().len(), METRICS_HISTORY_CAPACITY);
    }

    #[test]
    fn export_returns_latest_in_order() {
        let collector = collector();
        let mut taken = Vec::new();
        for _ in 0..60 {
            taken.push(collector.collect().timestamp);
        }

        let export = collector.export(10);
        assert_eq!(export.network_metrics.len(), 10);
        assert_eq!(export.api_status, ApiMode::Demo);
        assert_eq!(export.active_cases, 0);
        let exported: Vec<_> = export.network_metrics.iter().map(|s| s.timestamp).collect();
        assert_eq!(exported, taken[50..]);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_collector_samples_until_cancelled() {
        let collector = Arc::new(collector());
        let token = CancellationToken::new();
        let handle = collector.clone().spawn(Duration::from_secs(5), token.clone());

        // first tick fires immediately, then every five seconds
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(collector.history().len(), 3);

        token.cancel();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(collector.history().len(), 3);
    }
}
