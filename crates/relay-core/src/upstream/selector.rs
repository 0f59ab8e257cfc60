//! Weighted-random endpoint selection.
//!
//! Each active endpoint gets an effective weight of `priority * performance_factor`, where
//! the performance factor rewards endpoints that have recently answered quickly:
//!
//! | average latency | factor |
//! |-----------------|--------|
//! | no samples      | 1.0    |
//! | 50ms            | 2.0    |
//! | 100ms           | 1.0    |
//! | 1000ms or more  | 0.1 (floor) |
//!
//! A uniform draw in `[0, total)` is then walked down the candidate list, subtracting each
//! weight until the remainder reaches zero. The last candidate absorbs floating-point drift.
//!
//! Latency samples are recorded by the dispatcher after every successful call and live only
//! for the lifetime of the selector instance.

use super::latency_tracker::{LatencyWindow, DEFAULT_WINDOW_SIZE};
use crate::chain::{ChainConfig, Endpoint};
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;

/// Tuning knobs for [`EndpointSelector`].
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Samples kept per endpoint.
    pub window_size: usize,
    /// Latency that maps to a performance factor of exactly 1.0.
    pub reference_latency_ms: f64,
    /// Lower bound on the performance factor.
    pub min_performance_factor: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self { window_size: DEFAULT_WINDOW_SIZE, reference_latency_ms: 100.0, min_performance_factor: 0.1 }
    }
}

/// Chooses an endpoint for each upstream attempt.
///
/// One instance is created by the composition root and shared by every request; tests
/// construct their own so latency state never leaks between them.
#[derive(Debug, Default)]
pub struct EndpointSelector {
    windows: DashMap<String, Arc<LatencyWindow>>,
    config: SelectorConfig,
}

impl EndpointSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: SelectorConfig) -> Self {
        Self { windows: DashMap::new(), config }
    }

    /// Picks an active endpoint, or `None` if the chain has none.
    #[must_use]
    pub fn select<'a>(&self, chain: &'a ChainConfig) -> Option<&'a Endpoint> {
        self.select_with_rng(chain, &[], &mut rand::rng())
    }

    /// Like [`select`](Self::select), never returning `excluded_url`.
    #[must_use]
    pub fn get_failover<'a>(&self, chain: &'a ChainConfig, excluded_url: &str) -> Option<&'a Endpoint> {
        self.select_with_rng(chain, &[excluded_url], &mut rand::rng())
    }

    /// Like [`select`](Self::select), never returning any of `excluded`.
    #[must_use]
    pub fn select_excluding<'a>(&self, chain: &'a ChainConfig, excluded: &[&str]) -> Option<&'a Endpoint> {
        self.select_with_rng(chain, excluded, &mut rand::rng())
    }

    /// Selection with a caller-supplied random source.
    pub fn select_with_rng<'a, R: Rng + ?Sized>(
        &self,
        chain: &'a ChainConfig,
        excluded: &[&str],
        rng: &mut R,
    ) -> Option<&'a Endpoint> {
        let candidates: Vec<(&Endpoint, f64)> = chain
            .active_endpoints()
            .filter(|e| !excluded.contains(&e.url.as_str()))
            .map(|e| (e, self.effective_weight(e)))
            .collect();

        let selected = Self::weighted_pick(&candidates, rng)?;
        tracing::trace!(
            chain = %chain.chain_id,
            upstream = %selected.display_name(),
            candidates = candidates.len(),
            "selected upstream"
        );
        Some(selected)
    }

    fn weighted_pick<'a, R: Rng + ?Sized>(candidates: &[(&'a Endpoint, f64)], rng: &mut R) -> Option<&'a Endpoint> {
        match candidates {
            [] => return None,
            [(only, _)] => return Some(*only),
            _ => {}
        }

        let total: f64 = candidates.iter().map(|(_, w)| w).sum();
        if !total.is_finite() || total <= 0.0 {
            return candidates.first().map(|(e, _)| *e);
        }

        let mut remainder = rng.random_range(0.0..total);
        for (endpoint, weight) in candidates {
            remainder -= weight;
            if remainder <= 0.0 {
                return Some(*endpoint);
            }
        }

        candidates.last().map(|(e, _)| *e)
    }

    /// `priority * performance_factor`.
    #[must_use]
    pub fn effective_weight(&self, endpoint: &Endpoint) -> f64 {
        f64::from(endpoint.priority) * self.performance_factor(&endpoint.url)
    }

    /// Latency multiplier for `url`; 1.0 without samples.
    #[must_use]
    pub fn performance_factor(&self, url: &str) -> f64 {
        match self.average_latency(url) {
            // sub-millisecond averages are treated as 1ms
            Some(avg) => (self.config.reference_latency_ms / avg.max(1.0)).max(self.config.min_performance_factor),
            None => 1.0,
        }
    }

    pub fn record_latency(&self, url: &str, latency_ms: u64) {
        if let Some(window) = self.windows.get(url) {
            window.record(latency_ms);
            return;
        }
        self.windows
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(LatencyWindow::new(self.config.window_size)))
            .record(latency_ms);
    }

    #[must_use]
    pub fn average_latency(&self, url: &str) -> Option<f64> {
        self.windows.get(url).and_then(|w| w.average())
    }

    #[must_use]
    pub fn sample_count(&self, url: &str) -> usize {
        self.windows.get(url).map_or(0, |w| w.sample_count())
    }
}
