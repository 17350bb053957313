// tests/resources.rs

use std::error::Error;
use std::time::Duration;

use genspawn::action::{ResourceBudget, ResourceSet};
use genspawn::errors::GenspawnError;
use genspawn_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const SMALL: ResourceSet = ResourceSet::new(100.0, 0.5, 0.1);

#[test]
fn try_new_rejects_negative_and_non_finite() {
    for (m, c, i) in [
        (-1.0, 1.0, 0.1),
        (1.0, f64::NAN, 0.1),
        (1.0, 1.0, f64::INFINITY),
        (1.0, 1.0, -0.0001),
    ] {
        let err = ResourceSet::try_new(m, c, i).expect_err("invalid values");
        assert!(matches!(err, GenspawnError::InvalidResources(_)), "{err:?}");
    }
}

#[test]
fn try_new_accepts_cpu_above_one() -> TestResult {
    let rs = ResourceSet::try_new(2048.0, 4.0, 1.0)?;
    assert_eq!(rs.memory_mb(), 2048.0);
    assert_eq!(rs.cpu_usage(), 4.0);
    assert_eq!(rs.io_usage(), 1.0);
    Ok(())
}

#[test]
fn fits_within_is_component_wise() {
    let total = ResourceSet::new(1000.0, 2.0, 1.0);
    assert!(SMALL.fits_within(&total));
    assert!(!ResourceSet::new(1.0, 3.0, 0.0).fits_within(&total));
    assert_eq!(
        total.saturating_sub(&ResourceSet::new(2000.0, 0.5, 0.0)),
        ResourceSet::new(0.0, 1.5, 1.0)
    );
}

#[test]
fn budget_defers_requests_that_do_not_fit() {
    let budget = ResourceBudget::new(ResourceSet::new(250.0, 1.0, 1.0));

    let first = budget.try_acquire(&SMALL).expect("fits");
    let second = budget.try_acquire(&SMALL).expect("still fits");
    assert_eq!(budget.active_leases(), 2);
    assert!(budget.try_acquire(&SMALL).is_none(), "memory exhausted");

    drop(first);
    assert_eq!(budget.active_leases(), 1);
    assert_eq!(budget.in_use(), SMALL);
    assert!(budget.try_acquire(&SMALL).is_some());

    drop(second);
}

#[test]
fn oversized_request_runs_alone() {
    let budget = ResourceBudget::new(ResourceSet::new(100.0, 1.0, 1.0));
    let huge = ResourceSet::new(10_000.0, 16.0, 1.0);

    let lease = budget.try_acquire(&huge).expect("admitted when idle");
    assert_eq!(lease.resources(), huge);
    assert!(budget.try_acquire(&ResourceSet::ZERO).is_none());

    drop(lease);
    assert_eq!(budget.in_use(), ResourceSet::ZERO);
    assert_eq!(budget.active_leases(), 0);
}

#[tokio::test]
async fn acquire_waits_for_release() -> TestResult {
    init_tracing();

    let budget = ResourceBudget::new(ResourceSet::new(100.0, 1.0, 1.0));
    let held = budget.try_acquire(&SMALL).expect("fits");

    let waiter = {
        let budget = budget.clone();
        tokio::spawn(async move {
            let lease = budget.acquire(&ResourceSet::new(100.0, 1.0, 1.0)).await;
            lease.resources()
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished(), "must wait while SMALL is held");

    drop(held);
    let granted = with_timeout(waiter).await?;
    assert_eq!(granted, ResourceSet::new(100.0, 1.0, 1.0));
    assert_eq!(budget.active_leases(), 0);
    Ok(())
}
