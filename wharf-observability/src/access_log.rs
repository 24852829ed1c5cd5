//! Structured access-log entry shape, grounded on the teacher's
//! `ando-observability/src/access_log.rs`.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AccessLogEntry<'a> {
    pub request_id: &'a str,
    pub method: &'a str,
    pub uri: &'a str,
    pub host: &'a str,
    pub status: Option<u16>,
    pub latency_ms: f64,
    pub error_codes: &'a [String],
}
