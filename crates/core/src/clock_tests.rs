// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_moves_forward() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    assert!(clock.now() > t1);
}

#[test]
fn fake_clock_only_moves_when_advanced() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    assert_eq!(clock.now(), t1);
    clock.advance(Duration::from_secs(90));
    assert_eq!(clock.now() - t1, Duration::from_secs(90));
}

#[test]
fn fake_clock_shares_state_across_clones() {
    let a = FakeClock::new();
    let b = a.clone();
    let ms = a.epoch_ms();
    b.advance(Duration::from_millis(250));
    assert_eq!(a.epoch_ms(), ms + 250);
}
