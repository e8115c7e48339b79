use super::time::*;

#[test]
fn test_now_nanos_is_monotonic_enough() {
    let a = now_nanos();
    let b = now_nanos();
    assert!(a > 1_600_000_000_000_000_000);
    assert!(b >= a);
}

#[test]
fn test_elapsed_ms() {
    let start = std::time::Instant::now();
    assert!(elapsed_ms(start) >= 0.0);
}
