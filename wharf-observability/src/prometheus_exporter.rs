//! Prometheus text exposition, grounded on the teacher's
//! `ando-observability/src/prometheus_exporter.rs` (the `v2` variant, which
//! renders from a bare `Registry` rather than a collector wrapper).

use prometheus::{Encoder, Registry, TextEncoder};

pub fn render_metrics(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}
