use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Nanoseconds since the Unix epoch, the timestamp unit of gNMI.
/// A clock before the epoch reads as 0.
pub(crate) fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Milliseconds elapsed since `start`, as a float for histograms.
pub(crate) fn elapsed_ms(start: std::time::Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
