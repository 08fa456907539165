use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Receives one record per executed pass. Purely observational: a sink never
/// influences the numerics.
pub trait TelemetrySink {
    fn record(&mut self, name: &str, elapsed: Duration);

    /// Counts an event that has no duration of its own.
    fn count(&mut self, name: &str) {
        self.record(name, Duration::ZERO);
    }
}

/// Discards every record.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn record(&mut self, _name: &str, _elapsed: Duration) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEntry {
    pub executions: u64,
    /// Cumulative wall time in milliseconds.
    pub duration: f64,
}

impl TelemetryEntry {
    pub fn mean_ms(&self) -> f64 {
        if self.executions == 0 {
            0.0
        } else {
            self.duration / self.executions as f64
        }
    }
}

/// Aggregates records by pass name. Serializes as
/// `{ "<pass>": { "executions": n, "duration": ms } }`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Telemetry {
    entries: BTreeMap<String, TelemetryEntry>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TelemetryEntry> {
        self.entries.get(name)
    }

    pub fn executions(&self, name: &str) -> u64 {
        self.get(name).map_or(0, |entry| entry.executions)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TelemetryEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl TelemetrySink for Telemetry {
    fn record(&mut self, name: &str, elapsed: Duration) {
        let entry = self.entries.entry(name.to_owned()).or_default();
        entry.executions += 1;
        entry.duration += elapsed.as_secs_f64() * 1e3;
    }
}

/// Runs `f` and records its wall time under `name`.
pub fn measure<T>(sink: &mut dyn TelemetrySink, name: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    sink.record(name, start.elapsed());
    out
}
