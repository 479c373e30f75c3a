use crate::context::TelemetryLabels;

fn labels_of(labels: &TelemetryLabels) -> Vec<metrics::Label> {
    labels
        .tags()
        .into_iter()
        .map(|(key, value)| metrics::Label::new(key, value))
        .collect()
}

/// Increments a counter; a no-op until a `metrics` recorder is installed.
pub fn record_counter(name: &'static str, value: u64, labels: &TelemetryLabels) {
    metrics::counter!(name, labels_of(labels)).increment(value);
}

pub fn record_histogram(name: &'static str, value: f64, labels: &TelemetryLabels) {
    metrics::histogram!(name, labels_of(labels)).record(value);
}
