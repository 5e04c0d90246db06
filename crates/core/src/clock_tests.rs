// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn system_clock_epoch_ms_is_plausible() {
    let clock = SystemClock;
    let ms = clock.epoch_ms();
    // Any time after 2020-01-01 in epoch millis.
    assert!(ms > 1_577_836_800_000);
}

#[cfg(feature = "test-support")]
#[test]
fn fake_clock_advances_both_instant_and_epoch() {
    let clock = FakeClock::new();
    let start_instant = clock.now();
    let start_epoch = clock.epoch_ms();

    clock.advance(Duration::from_secs(5));

    assert_eq!(clock.now(), start_instant + Duration::from_secs(5));
    assert_eq!(clock.epoch_ms(), start_epoch + 5_000);
}

#[cfg(feature = "test-support")]
#[test]
fn fake_clock_set_epoch_ms_does_not_touch_instant() {
    let clock = FakeClock::new();
    let before = clock.now();
    clock.set_epoch_ms(42);
    assert_eq!(clock.epoch_ms(), 42);
    assert_eq!(clock.now(), before);
}