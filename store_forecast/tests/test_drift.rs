use store_forecast::drift::{DriftConfig, DriftMonitor, DriftState};

fn monitor(baseline: f64) -> DriftMonitor {
    DriftMonitor::new(baseline, DriftConfig::default()).unwrap()
}

#[test]
fn test_transition_fires_exactly_once() {
    let mut m = monitor(10.0);

    // 14 consecutive outcomes with error 1.3x the baseline.
    let mut signals = 0;
    for _ in 0..14 {
        if m.record(50.0, 63.0).is_some() {
            signals += 1;
        }
    }
    assert_eq!(signals, 1);
    assert_eq!(m.state(), DriftState::Drifted);
    assert!(m.is_stale());

    // Further degraded outcomes do not re-trigger while Drifted.
    for _ in 0..20 {
        assert!(m.record(50.0, 70.0).is_none());
    }
    assert_eq!(m.state(), DriftState::Drifted);
}

#[test]
fn test_no_transition_before_window_is_full() {
    let mut m = monitor(10.0);

    for _ in 0..13 {
        assert!(m.record(50.0, 80.0).is_none());
    }
    assert_eq!(m.state(), DriftState::Stable);
}

#[test]
fn test_errors_at_exactly_the_threshold_do_not_fire() {
    let mut m = monitor(10.0);

    // Rolling MAE equal to 1.2x baseline is not strictly above the limit.
    for _ in 0..30 {
        assert!(m.record(50.0, 62.0).is_none());
    }
    assert_eq!(m.state(), DriftState::Stable);

    // Just over the line fires once the window reflects it.
    let mut fired = false;
    for _ in 0..14 {
        if m.record(50.0, 62.1).is_some() {
            fired = true;
        }
    }
    assert!(fired);
}

#[test]
fn test_successful_retrain_resets_the_monitor() {
    let mut m = monitor(10.0);

    for _ in 0..14 {
        m.record(50.0, 65.0);
    }
    assert_eq!(m.state(), DriftState::Drifted);

    m.retrain_succeeded(12.0);
    assert_eq!(m.state(), DriftState::Stable);
    assert!(!m.is_stale());
    assert_eq!(m.baseline_mae(), 12.0);
    assert!(m.rolling_mae().is_none());

    // The monitor can fire again against the new baseline.
    let mut signals = 0;
    for _ in 0..14 {
        if m.record(50.0, 70.0).is_some() {
            signals += 1;
        }
    }
    assert_eq!(signals, 1);
}

#[test]
fn test_failed_retrain_stays_drifted() {
    let mut m = monitor(10.0);
    for _ in 0..14 {
        m.record(50.0, 65.0);
    }

    m.retrain_failed();
    assert_eq!(m.state(), DriftState::Drifted);
    assert!(m.is_stale());
}

#[test]
fn test_signal_reports_degradation_ratio() {
    let mut m = monitor(10.0);

    let mut signal = None;
    for _ in 0..14 {
        if let Some(s) = m.record(50.0, 65.0) {
            signal = Some(s);
        }
    }

    let signal = signal.unwrap();
    assert!((signal.rolling_mae - 15.0).abs() < 1e-9);
    assert!((signal.baseline_mae - 10.0).abs() < 1e-9);
    assert!((signal.degradation - 1.5).abs() < 1e-9);
}

#[test]
fn test_invalid_configuration_is_rejected() {
    assert!(DriftMonitor::new(-1.0, DriftConfig::default()).is_err());
    assert!(DriftMonitor::new(
        10.0,
        DriftConfig {
            window: 0,
            relative_threshold: 0.2
        }
    )
    .is_err());
    assert!(DriftMonitor::new(
        10.0,
        DriftConfig {
            window: 14,
            relative_threshold: 0.0
        }
    )
    .is_err());
}
