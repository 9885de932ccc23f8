//! # Application State Management
//!
//! Shared state accessed by every HTTP request and WebSocket session:
//! runtime-updatable configuration, counters, per-endpoint timings, and
//! the voice-latency histogram. Everything mutable lives behind
//! `Arc<RwLock<_>>` so handlers can clone the state cheaply and readers
//! never block each other.

use crate::config::AppConfig;
use crate::form::Action;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// Upper bucket bounds (milliseconds) for the voice latency histogram.
///
/// A round trip above the last bound lands in the overflow bucket; the
/// product target is to stay under 500ms end to end.
pub const LATENCY_BUCKETS_MS: [u64; 5] = [100, 200, 300, 400, 500];

/// The main application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Operational metrics (updated by middleware and sessions)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,
}

/// Operational metrics collected across all requests and sessions.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Current number of active WebSocket conversations
    pub active_sessions: u32,

    /// Total forms opened by the interpreter
    pub forms_opened: u64,

    /// Total field values captured by the interpreter
    pub fields_captured: u64,

    /// Total forms submitted by the interpreter
    pub forms_submitted: u64,

    /// Detailed metrics per API endpoint ("GET /health" and friends)
    pub endpoint_metrics: HashMap<String, EndpointMetric>,

    /// Command-to-action round trip latency distribution
    pub voice_latency: LatencyHistogram,
}

/// Request metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

/// Fixed-bucket latency histogram, `voice_latency_ms` in the original
/// instrumentation.
///
/// `buckets[i]` counts observations at or under `LATENCY_BUCKETS_MS[i]`
/// (non-cumulative); `overflow` counts everything slower than the last
/// bound.
#[derive(Debug, Default, Clone)]
pub struct LatencyHistogram {
    buckets: [u64; LATENCY_BUCKETS_MS.len()],
    overflow: u64,
    count: u64,
    sum_ms: u64,
}

impl LatencyHistogram {
    /// Record one observation in milliseconds.
    pub fn observe(&mut self, latency_ms: u64) {
        self.count += 1;
        self.sum_ms += latency_ms;

        for (i, bound) in LATENCY_BUCKETS_MS.iter().enumerate() {
            if latency_ms <= *bound {
                self.buckets[i] += 1;
                return;
            }
        }
        self.overflow += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn average_ms(&self) -> f64 {
        if self.count > 0 {
            self.sum_ms as f64 / self.count as f64
        } else {
            0.0
        }
    }

    /// Histogram as a JSON object for the metrics endpoint.
    pub fn to_json(&self) -> serde_json::Value {
        let mut buckets = serde_json::Map::new();
        for (i, bound) in LATENCY_BUCKETS_MS.iter().enumerate() {
            buckets.insert(format!("le_{}", bound), serde_json::json!(self.buckets[i]));
        }
        buckets.insert("overflow".to_string(), serde_json::json!(self.overflow));

        serde_json::json!({
            "count": self.count,
            "sum_ms": self.sum_ms,
            "average_ms": self.average_ms(),
            "buckets": buckets,
        })
    }
}

impl AppState {
    /// Create a new AppState with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately; AppConfig is cheap to
    /// clone.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Replace the configuration after validating it.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write().unwrap() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Increment the total request counter (middleware, every request).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (any 4xx/5xx response).
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record timing for a specific endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// A WebSocket conversation started.
    pub fn increment_active_sessions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_sessions += 1;
    }

    /// A WebSocket conversation ended.
    ///
    /// Guarded against underflow so a double-close cannot wrap the gauge.
    pub fn decrement_active_sessions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_sessions > 0 {
            metrics.active_sessions -= 1;
        }
    }

    /// Count what an interpreted command actually did.
    pub fn record_form_action(&self, action: &Action) {
        let mut metrics = self.metrics.write().unwrap();
        match action {
            Action::OpenForm { .. } => metrics.forms_opened += 1,
            Action::UpdateField { .. } => metrics.fields_captured += 1,
            Action::SubmitForm { .. } => metrics.forms_submitted += 1,
            Action::Noop => {}
        }
    }

    /// Record one command-to-action round trip.
    pub fn observe_voice_latency(&self, latency_ms: u64) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.voice_latency.observe(latency_ms);
    }

    /// Get a snapshot of current metrics (for the metrics endpoints).
    ///
    /// The data is cloned so no lock is held while the HTTP response is
    /// being serialized.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_sessions: metrics.active_sessions,
            forms_opened: metrics.forms_opened,
            fields_captured: metrics.fields_captured,
            forms_submitted: metrics.forms_submitted,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
            voice_latency: metrics.voice_latency.clone(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_buckets() {
        let mut histogram = LatencyHistogram::default();
        histogram.observe(50);
        histogram.observe(100);
        histogram.observe(150);
        histogram.observe(9000);

        assert_eq!(histogram.count(), 4);
        let json = histogram.to_json();
        assert_eq!(json["buckets"]["le_100"], serde_json::json!(2));
        assert_eq!(json["buckets"]["le_200"], serde_json::json!(1));
        assert_eq!(json["buckets"]["overflow"], serde_json::json!(1));
    }

    #[test]
    fn test_form_action_counters() {
        let state = AppState::new(AppConfig::default());

        state.record_form_action(&Action::OpenForm {
            form: "default".to_string(),
        });
        state.record_form_action(&Action::UpdateField {
            field: "name".to_string(),
            value: "john".to_string(),
        });
        state.record_form_action(&Action::Noop);

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.forms_opened, 1);
        assert_eq!(snapshot.fields_captured, 1);
        assert_eq!(snapshot.forms_submitted, 0);
    }

    #[test]
    fn test_session_gauge_does_not_underflow() {
        let state = AppState::new(AppConfig::default());
        state.decrement_active_sessions();
        assert_eq!(state.get_metrics_snapshot().active_sessions, 0);
    }
}
