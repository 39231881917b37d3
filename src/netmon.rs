//! Synthetic network quality sampler.
//!
//! Stands in for a real probe while the deployment has no network
//! agent: writes one plausible sample per tick and prunes anything
//! older than the retention window. Off unless enabled in config.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::constants::{NETWORK_RETENTION_HOURS, NETWORK_SAMPLE_INTERVAL_SECS};
use crate::db::Store;
use crate::models::NetworkSample;

/// One plausible sample, rounded to a tenth like the dashboard shows
pub fn generate_sample() -> NetworkSample {
    NetworkSample {
        latency: round1(uniform(15.0, 30.0)),
        throughput: round1(uniform(50.0, 65.0)),
        packet_loss: round1(uniform(0.1, 1.0)),
        uptime: round1(uniform(99.5, 100.0)),
    }
}

/// Insert-and-prune loop on its own task
pub fn spawn_sampler(store: Store) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(NETWORK_SAMPLE_INTERVAL_SECS));
        loop {
            ticker.tick().await;

            let sample = generate_sample();
            if let Err(e) = store.insert_network_metric(&sample).await {
                tracing::warn!("Network sample insert failed: {}", e);
                continue;
            }

            match store.prune_network_metrics(NETWORK_RETENTION_HOURS).await {
                Ok(0) => {}
                Ok(n) => tracing::debug!("Pruned {} expired network samples", n),
                Err(e) => tracing::warn!("Network metrics prune failed: {}", e),
            }
        }
    })
}

fn uniform(lo: f64, hi: f64) -> f64 {
    lo + fastrand::f64() * (hi - lo)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
