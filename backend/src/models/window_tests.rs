use super::*;
use chrono::TimeZone;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
}

#[test]
fn test_window_new_valid() {
    let window = DeliveryWindow::new(at(10, 0), at(12, 0)).unwrap();
    assert_eq!(window.start(), at(10, 0));
    assert_eq!(window.end(), at(12, 0));
    assert_eq!(window.duration(), TimeDelta::hours(2));
    assert!(!window.is_empty());
}

#[test]
fn test_window_reversed_is_rejected() {
    let result = DeliveryWindow::new(at(12, 0), at(10, 0));
    assert!(matches!(result, Err(DeliveryError::InvalidWindow { .. })));
}

#[test]
fn test_window_empty_is_constructible_but_not_queryable() {
    let window = DeliveryWindow::new(at(10, 0), at(10, 0)).unwrap();
    assert!(window.is_empty());

    let err = window.require_non_empty().unwrap_err();
    assert!(err.is_input_error());
}

#[test]
fn test_window_contains_is_half_open() {
    let window = DeliveryWindow::new(at(10, 0), at(11, 0)).unwrap();
    assert!(window.contains(at(10, 0)));
    assert!(window.contains(at(10, 59)));
    assert!(!window.contains(at(11, 0)));
    assert!(!window.contains(at(9, 59)));
}
