use {
    base::RateGate,
    std::time::{Duration, Instant},
};

#[test]
fn test_first_check_opens() {
    let mut gate = RateGate::from_hz(30);
    assert!(gate.ready_at(Instant::now()));
}

#[test]
fn test_closed_within_interval() {
    let mut gate = RateGate::new(Duration::from_millis(33));
    let start = Instant::now();
    assert!(gate.ready_at(start));
    assert!(!gate.ready_at(start + Duration::from_millis(10)));
    assert!(!gate.ready_at(start + Duration::from_millis(32)));
    assert!(gate.ready_at(start + Duration::from_millis(33)));
}

#[test]
fn test_skipped_checks_do_not_move_the_window() {
    let mut gate = RateGate::new(Duration::from_millis(100));
    let start = Instant::now();
    assert!(gate.ready_at(start));
    assert!(!gate.ready_at(start + Duration::from_millis(60)));
    assert!(gate.ready_at(start + Duration::from_millis(100)));
}

#[test]
fn test_from_hz_interval() {
    assert_eq!(RateGate::from_hz(30).interval(), Duration::from_secs(1) / 30);
    assert_eq!(RateGate::from_hz(0).interval(), Duration::ZERO);
}

#[test]
fn test_reset_reopens() {
    let mut gate = RateGate::new(Duration::from_secs(60));
    let start = Instant::now();
    assert!(gate.ready_at(start));
    gate.reset();
    assert!(gate.ready_at(start + Duration::from_millis(1)));
}
