#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};

use ns_insulin::models::{BasalEntry, BasalProfile};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the variables on unwind and serializes access to process-global
/// env vars, since tests run in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Profile with one rate all day.
pub fn flat_profile(effective_from: DateTime<Utc>, rate: f64) -> BasalProfile {
    BasalProfile::new(
        effective_from,
        chrono_tz::UTC,
        vec![BasalEntry::new(NaiveTime::MIN, rate)],
    )
    .unwrap()
}

pub fn profile(effective_from: DateTime<Utc>, tz: Tz, entries: &[(u32, u32, f64)]) -> BasalProfile {
    BasalProfile::new(
        effective_from,
        tz,
        entries
            .iter()
            .map(|&(h, m, rate)| BasalEntry::new(hm(h, m), rate))
            .collect(),
    )
    .unwrap()
}

/// A small New York patient export:
/// - profile since 2023-12-01: 0.5 U/h from midnight, 1.0 U/h from 06:00 local
/// - temp basal 2.0 U/h for 30 min at 11:30Z on 2024-01-15
/// - suspend (default 30 min) at 13:00Z
/// - boluses of 2.0 U at 11:45Z and 3.0 U at 12:10Z, carbs ignored
/// - two glucose readings in the window (9.0 and 5.0 mmol/L)
pub fn new_york_snapshot() -> Value {
    json!({
        "profiles": [{
            "startDate": "2023-12-01T05:00:00.000Z",
            "defaultProfile": "Default",
            "store": {
                "Default": {
                    "timezone": "America/New_York",
                    "basal": [
                        { "time": "00:00", "value": 0.5, "timeAsSeconds": 0 },
                        { "time": "06:00", "value": "1.0", "timeAsSeconds": 21600 }
                    ]
                }
            }
        }],
        "treatments": [
            { "eventType": "Temp Basal", "created_at": "2024-01-15T11:30:00.000Z", "rate": 2.0, "duration": 30 },
            { "eventType": "Suspend Pump", "created_at": "2024-01-15T13:00:00.000Z" },
            { "eventType": "Meal Bolus", "created_at": "2024-01-15T11:45:00.000Z", "insulin": 2.0, "carbs": 30 },
            { "eventType": "Correction Bolus", "created_at": "2024-01-15T12:10:00.000Z", "insulin": "3.0" },
            { "eventType": "Carb Correction", "created_at": "2024-01-15T12:20:00.000Z", "carbs": 15 }
        ],
        "entries": [
            { "type": "sgv", "sgv": 162.144, "date": 1705316400000i64, "dateString": "2024-01-15T11:00:00.000Z" },
            { "type": "sgv", "sgv": 90.08, "dateString": "2024-01-15T12:00:00.000Z" }
        ]
    })
}
