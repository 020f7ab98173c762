use super::*;

fn test_config(threshold: u32, recovery: Duration) -> BreakerConfig {
    BreakerConfig {
        failure_threshold: threshold,
        recovery_timeout: recovery,
        half_open_max_calls: 1,
    }
}

#[test]
fn test_starts_closed_and_available() {
    let breaker = CircuitBreaker::new("test", BreakerConfig::default());

    assert_eq!(breaker.state(), CircuitState::Closed);
    assert!(breaker.is_available());
}

#[test]
fn test_opens_after_exactly_threshold_failures() {
    let breaker = CircuitBreaker::new("test", test_config(3, Duration::from_secs(60)));

    breaker.record_failure();
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Closed);

    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(!breaker.is_available());
}

#[test]
fn test_success_resets_failure_count() {
    let breaker = CircuitBreaker::new("test", test_config(3, Duration::from_secs(60)));

    breaker.record_failure();
    breaker.record_failure();
    breaker.record_success();

    breaker.record_failure();
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Closed);

    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[test]
fn test_half_open_after_recovery_timeout() {
    let breaker = CircuitBreaker::new("test", test_config(1, Duration::from_millis(20)));

    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);

    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

#[test]
fn test_half_open_admits_bounded_probes() {
    let breaker = CircuitBreaker::new("test", test_config(1, Duration::from_millis(20)));

    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(30));

    assert!(breaker.is_available());
    assert!(!breaker.is_available());
    assert!(!breaker.is_available());
}

#[test]
fn test_probe_success_closes_circuit() {
    let breaker = CircuitBreaker::new("test", test_config(1, Duration::from_millis(20)));

    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(30));

    assert!(breaker.is_available());
    breaker.record_success();

    assert_eq!(breaker.state(), CircuitState::Closed);
    assert!(breaker.is_available());
}

#[test]
fn test_probe_failure_reopens_circuit() {
    let breaker = CircuitBreaker::new("test", test_config(1, Duration::from_millis(20)));

    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(30));

    assert!(breaker.is_available());
    breaker.record_failure();

    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(!breaker.is_available());
}

#[test]
fn test_reopened_circuit_waits_full_timeout_again() {
    let breaker = CircuitBreaker::new("test", test_config(1, Duration::from_millis(40)));

    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(50));
    assert!(breaker.is_available());

    // The failed probe refreshes the failure time.
    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(breaker.state(), CircuitState::Open);

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

#[test]
fn test_abandoned_probe_permit_is_reclaimed() {
    let breaker = CircuitBreaker::new("test", test_config(1, Duration::from_millis(20)));

    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(30));

    // Probe admitted but its caller is cancelled: no outcome recorded.
    assert!(breaker.is_available());
    assert!(!breaker.is_available());

    // After another recovery timeout the permit comes back.
    std::thread::sleep(Duration::from_millis(30));
    assert!(breaker.is_available());
}

#[test]
fn test_status_snapshot() {
    let breaker = CircuitBreaker::new("qdrant", test_config(3, Duration::from_secs(10)));

    breaker.record_failure();
    let status = breaker.status();

    assert_eq!(status.name, "qdrant");
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.failure_count, 1);
    assert_eq!(status.failure_threshold, 3);
    assert_eq!(status.recovery_timeout_seconds, 10);
}

#[test]
fn test_concurrent_admission_under_contention() {
    use std::sync::Arc;

    let breaker = Arc::new(CircuitBreaker::new(
        "test",
        test_config(1, Duration::from_millis(10)),
    ));
    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(20));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let breaker = Arc::clone(&breaker);
            std::thread::spawn(move || breaker.is_available())
        })
        .collect();

    let admitted = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .filter(|admitted| *admitted)
        .count();

    // Exactly one probe permit while half-open.
    assert_eq!(admitted, 1);
}
