//! Tests for the notification queue contract
//!
//! Concurrent messages stack, each expires on its own clock, and a reported
//! error always surfaces as exactly one classified message.

use camrec::errors::RecorderError;
use camrec::notify::{NotificationSink, Severity, DEFAULT_DISMISS_MS};
use std::time::Duration;

#[test]
fn default_ttl_matches_toast_policy() {
    assert_eq!(DEFAULT_DISMISS_MS, 3000);
}

#[test]
fn stacked_messages_expire_independently() {
    let sink = NotificationSink::new(Duration::from_millis(120));
    sink.info("early");
    std::thread::sleep(Duration::from_millis(60));
    sink.info("late");

    // Both alive, oldest first.
    let active = sink.active();
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].message, "early");
    assert!(active[0].remaining_ms < active[1].remaining_ms);

    // The early one dies first.
    std::thread::sleep(Duration::from_millis(90));
    let active = sink.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].message, "late");

    std::thread::sleep(Duration::from_millis(60));
    assert!(sink.is_empty());
}

#[test]
fn dismissal_is_targeted_and_tolerant() {
    let sink = NotificationSink::with_default_ttl();
    let a = sink.error("one");
    let b = sink.info("two");

    sink.dismiss(a);
    // Dismissing an unknown id is a no-op.
    sink.dismiss(uuid::Uuid::new_v4());

    let active = sink.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, b);
}

#[test]
fn every_error_class_has_a_distinct_message() {
    let errors = [
        RecorderError::Unsupported("x".into()),
        RecorderError::PermissionDenied("x".into()),
        RecorderError::DeviceUnavailable("x".into()),
        RecorderError::Acquisition("x".into()),
        RecorderError::Recording("x".into()),
        RecorderError::DeviceLost("x".into()),
        RecorderError::Io("x".into()),
    ];

    let sink = NotificationSink::with_default_ttl();
    for err in &errors {
        sink.report(err);
    }
    let active = sink.active();
    assert_eq!(active.len(), errors.len());

    // Raw causes never leak into the user-facing text.
    assert!(active.iter().all(|n| !n.message.contains('x')));

    // Permission denial asks, everything else alarms.
    assert_eq!(active[1].severity, Severity::Info);
    for n in active.iter().enumerate().filter(|(i, _)| *i != 1).map(|(_, n)| n) {
        assert_eq!(n.severity, Severity::Error);
    }
}

#[test]
fn classification_decides_the_message() {
    let sink = NotificationSink::with_default_ttl();
    sink.report(&RecorderError::classify_acquisition(
        "Permission denied by user",
    ));
    sink.report(&RecorderError::classify_acquisition(
        "Device or resource busy",
    ));

    let active = sink.active();
    assert_eq!(active.len(), 2);
    assert!(active[0].message.to_lowercase().contains("allow"));
    assert!(active[1].message.to_lowercase().contains("in use"));
}
