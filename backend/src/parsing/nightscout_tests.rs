#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, TimeDelta, TimeZone, Utc};
    use serde_json::json;

    use crate::models::ProfileError;
    use crate::parsing::{parse_glucose, parse_profiles, parse_timestamp, parse_treatments, ParseError};

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        assert_eq!(parse_timestamp("2024-01-01T10:00:00.000Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T10:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T10:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-01T05:00:00-05:00").unwrap(), expected);
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(ParseError::Timestamp(_))
        ));
    }

    #[test]
    fn test_parse_profile_lowercase_default() {
        let records = vec![json!({
            "startDate": "2024-01-01T00:00:00.000Z",
            "defaultProfile": "default",
            "store": {
                "default": {
                    "timezone": "America/Vancouver",
                    "basal": [
                        { "time": "06:00", "value": 0.8, "timeAsSeconds": 21600 },
                        { "time": "00:00", "value": "0.5", "timeAsSeconds": 0 }
                    ]
                }
            }
        })];

        let profiles = parse_profiles(records).unwrap();
        assert_eq!(profiles.len(), 1);

        let profile = &profiles[0];
        assert_eq!(profile.timezone, chrono_tz::America::Vancouver);
        assert_eq!(
            profile.effective_from,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(profile.entries().len(), 2);
        assert_eq!(profile.entries()[0].time, hm(0, 0));
        assert_eq!(profile.entries()[0].rate, 0.5);
        assert_eq!(profile.entries()[1].rate, 0.8);
    }

    #[test]
    fn test_parse_profile_capitalized_default_ignores_other_variants() {
        let records = vec![json!({
            "startDate": "2024-02-01T12:00:00Z",
            "store": {
                "Default": {
                    "timezone": "UTC",
                    "basal": [{ "time": "00:00", "value": 1.1 }]
                },
                "Exercise": { "basal": "not a schedule" }
            }
        })];

        let profiles = parse_profiles(records).unwrap();
        assert_eq!(profiles[0].entries()[0].rate, 1.1);
    }

    #[test]
    fn test_parse_profile_without_default_fails() {
        let records = vec![json!({
            "startDate": "2024-02-01T12:00:00Z",
            "store": { "Weekday": { "timezone": "UTC", "basal": [] } }
        })];

        match parse_profiles(records) {
            Err(ParseError::AmbiguousDefaultProfile { candidates, .. }) => {
                assert!(candidates.is_empty())
            }
            other => panic!("expected AmbiguousDefaultProfile, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_profile_with_two_defaults_fails() {
        let records = vec![json!({
            "startDate": "2024-02-01T12:00:00Z",
            "store": {
                "Default": { "timezone": "UTC", "basal": [{ "time": "00:00", "value": 1.0 }] },
                "default": { "timezone": "UTC", "basal": [{ "time": "00:00", "value": 2.0 }] }
            }
        })];

        match parse_profiles(records) {
            Err(ParseError::AmbiguousDefaultProfile { candidates, .. }) => {
                assert_eq!(candidates.len(), 2)
            }
            other => panic!("expected AmbiguousDefaultProfile, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_profile_unknown_timezone() {
        let records = vec![json!({
            "startDate": "2024-02-01T12:00:00Z",
            "store": {
                "default": { "timezone": "Mars/Olympus", "basal": [{ "time": "00:00", "value": 1.0 }] }
            }
        })];

        assert!(matches!(
            parse_profiles(records),
            Err(ParseError::UnknownTimezone(name)) if name == "Mars/Olympus"
        ));
    }

    #[test]
    fn test_parse_profile_rejects_negative_rate() {
        let records = vec![json!({
            "startDate": "2024-02-01T12:00:00Z",
            "store": {
                "default": {
                    "timezone": "UTC",
                    "basal": [{ "time": "00:00", "value": 1.0 }, { "time": "08:00", "value": "-0.2" }]
                }
            }
        })];

        assert!(matches!(
            parse_profiles(records),
            Err(ParseError::InvalidProfile(ProfileError::InvalidRate { time, .. })) if time == hm(8, 0)
        ));

        let empty = vec![json!({
            "startDate": "2024-02-01T12:00:00Z",
            "store": { "default": { "timezone": "UTC", "basal": [] } }
        })];
        assert!(matches!(
            parse_profiles(empty),
            Err(ParseError::InvalidProfile(ProfileError::NoEntries { .. }))
        ));
    }

    #[test]
    fn test_parse_treatments_by_event_type() {
        let records = vec![
            json!({ "eventType": "Temp Basal", "created_at": "2024-01-01T10:00:00.000Z", "rate": 1.5, "duration": 30 }),
            json!({ "eventType": "Temp Basal", "created_at": "2024-01-01T11:00:00Z", "absolute": "0.4", "duration": "29.5" }),
            json!({ "eventType": "Suspend Pump", "created_at": "2024-01-01T12:00:00Z" }),
            json!({ "eventType": "Correction Bolus", "created_at": "2024-01-01T13:00:00Z", "insulin": 2.5 }),
            json!({ "eventType": "Meal Bolus", "created_at": "2024-01-01T14:00:00Z", "insulin": "3", "carbs": 40 }),
            json!({ "eventType": "Carb Correction", "created_at": "2024-01-01T15:00:00Z", "insulin": null, "carbs": 15 }),
            json!({ "eventType": "Note", "created_at": "2024-01-01T16:00:00Z" }),
        ];

        let treatments = parse_treatments(records).unwrap();
        assert_eq!(treatments.temp_basals.len(), 3);
        assert_eq!(treatments.boluses.len(), 2);

        let first = treatments.temp_basals[0];
        assert_eq!(first.rate, 1.5);
        assert_eq!(first.duration, TimeDelta::minutes(30));

        let second = treatments.temp_basals[1];
        assert_eq!(second.rate, 0.4);
        assert_eq!(second.duration, TimeDelta::seconds(29 * 60 + 30));

        let suspend = treatments.temp_basals[2];
        assert_eq!(suspend.rate, 0.0);
        assert_eq!(suspend.duration, TimeDelta::minutes(30));

        assert_eq!(treatments.boluses[0].units, 2.5);
        assert_eq!(treatments.boluses[1].units, 3.0);
    }

    #[test]
    fn test_parse_suspend_with_explicit_duration() {
        let records = vec![json!({
            "eventType": "Suspend Pump",
            "created_at": "2024-01-01T12:00:00Z",
            "duration": 90
        })];

        let treatments = parse_treatments(records).unwrap();
        assert_eq!(treatments.temp_basals[0].duration, TimeDelta::minutes(90));
    }

    #[test]
    fn test_parse_treatments_rejects_negative_values() {
        let negative_rate = vec![json!({
            "eventType": "Temp Basal", "created_at": "2024-01-01T10:00:00Z", "rate": -1.0, "duration": 30
        })];
        assert!(matches!(
            parse_treatments(negative_rate),
            Err(ParseError::InvalidRecord(_))
        ));

        let negative_bolus = vec![json!({
            "eventType": "Correction Bolus", "created_at": "2024-01-01T10:00:00Z", "insulin": -2.0
        })];
        assert!(matches!(
            parse_treatments(negative_bolus),
            Err(ParseError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_parse_temp_basal_without_duration_fails() {
        let records = vec![json!({
            "eventType": "Temp Basal", "created_at": "2024-01-01T10:00:00Z", "rate": 1.0
        })];
        assert!(matches!(
            parse_treatments(records),
            Err(ParseError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_parse_glucose_converts_to_mmol() {
        let records = vec![
            json!({ "sgv": 180.16, "date": 1704103200000i64, "dateString": "2024-01-01T10:00:00.000Z", "type": "sgv" }),
            json!({ "sgv": 90.08, "dateString": "2024-01-01T10:05:00Z", "type": "sgv" }),
            json!({ "mbg": 120, "dateString": "2024-01-01T10:10:00Z", "type": "mbg" }),
        ];

        let readings = parse_glucose(records).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].at, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        assert!((readings[0].mmol_per_l - 10.0).abs() < 1e-9);
        assert!((readings[1].mmol_per_l - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_record_reports_kind() {
        let records = vec![json!({ "eventType": "Temp Basal" })];
        match parse_treatments(records) {
            Err(ParseError::Json { kind, .. }) => assert_eq!(kind, "treatment"),
            other => panic!("expected Json error, got {other:?}"),
        }
    }
}
