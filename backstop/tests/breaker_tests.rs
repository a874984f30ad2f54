//! Breaker lifecycle under concurrent callers.

use backstop::{CircuitBreakerConfig, CircuitState, ServiceRegistry, ServiceRoute};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::Barrier;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

fn registry(failure_threshold: u32, reset_timeout: Duration) -> Arc<ServiceRegistry> {
    Arc::new(ServiceRegistry::new(
        vec![ServiceRoute::new("/api/matching", "matching")],
        CircuitBreakerConfig {
            failure_threshold,
            reset_timeout,
            ..CircuitBreakerConfig::default()
        },
    ))
}

#[test]
fn threshold_failures_open_and_cooldown_gates_admission() {
    let registry = registry(5, Duration::from_millis(60));
    let breaker = registry.breaker_for("/api/matching/orders");

    for _ in 0..5 {
        assert!(breaker.admit());
        breaker.record_failure();
    }
    assert_eq!(CircuitState::Open, breaker.state());
    assert!(!breaker.admit(), "rejected before the cooldown elapses");

    thread::sleep(Duration::from_millis(70));
    assert!(breaker.admit(), "cooldown elapsed, probe admitted");
}

#[test]
fn exactly_one_concurrent_caller_wins_the_probe() {
    let registry = registry(1, Duration::from_millis(20));
    let breaker = registry.breaker_for("/api/matching/orders");
    breaker.record_failure();
    assert_eq!(CircuitState::Open, breaker.state());

    thread::sleep(Duration::from_millis(30));

    let admitted = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let breaker = Arc::clone(&breaker);
            let admitted = Arc::clone(&admitted);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                if breaker.admit() {
                    admitted.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("admit thread panicked");
    }

    assert_eq!(1, admitted.load(Ordering::SeqCst));
    assert_eq!(CircuitState::HalfOpen, breaker.state());
}

#[test]
fn probe_failure_restarts_the_cooldown() {
    let registry = registry(1, Duration::from_millis(40));
    let breaker = registry.breaker_for("/api/matching/orders");

    breaker.record_failure();
    thread::sleep(Duration::from_millis(50));
    assert!(breaker.admit());
    breaker.record_failure();

    assert_eq!(CircuitState::Open, breaker.state());
    assert!(!breaker.admit(), "fresh cooldown after the failed probe");
    thread::sleep(Duration::from_millis(50));
    assert!(breaker.admit(), "second probe after the fresh cooldown");
}

#[test]
fn breakers_are_isolated_per_service_key() {
    let registry = Arc::new(ServiceRegistry::new(
        vec![
            ServiceRoute::new("/api/matching", "matching"),
            ServiceRoute::new("/api/upload", "upload"),
        ],
        CircuitBreakerConfig {
            failure_threshold: 1,
            reset_timeout: Duration::from_secs(30),
            ..CircuitBreakerConfig::default()
        },
    ));

    registry.breaker_for("/api/matching/orders").record_failure();
    assert_eq!(
        CircuitState::Open,
        registry.breaker_for("/api/matching/fills").state()
    );
    assert!(
        registry.breaker_for("/api/upload/data").admit(),
        "an open matching breaker must not gate upload"
    );
}

#[test]
fn concurrent_registrations_converge_on_one_breaker() {
    let registry = registry(5, Duration::from_secs(30));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.breaker_for("/api/matching/orders"))
        })
        .collect();
    let breakers: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("registry thread panicked"))
        .collect();

    for breaker in &breakers[1..] {
        assert!(Arc::ptr_eq(&breakers[0], breaker));
    }
}
