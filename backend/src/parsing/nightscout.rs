use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use log::{debug, warn};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::{parse_timestamp, ParseError, ParseResult};
use crate::models::{
    BasalEntry, BasalProfile, Bolus, GlucoseReading, TempBasal, Treatments,
    DEFAULT_SUSPEND_MINUTES,
};

/// Nightscout sends numbers either as JSON numbers or as strings.
fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Number(f64),
        String(String),
    }

    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrNumber::Number(n)) => Ok(Some(n)),
        Some(StringOrNumber::String(s)) if s.trim().is_empty() => Ok(None),
        Some(StringOrNumber::String(s)) => s.trim().parse::<f64>().map(Some).map_err(D::Error::custom),
    }
}

/// Raw JSON structure for a profile record
#[derive(Debug, Deserialize)]
struct RawProfileRecord {
    #[serde(rename = "startDate")]
    start_date: String,
    #[serde(default)]
    store: Map<String, Value>,
}

/// Raw JSON structure for one named profile variant
#[derive(Debug, Deserialize)]
struct RawProfileVariant {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    basal: Vec<RawBasalEntry>,
}

/// Raw JSON structure for one basal schedule step
#[derive(Debug, Deserialize)]
struct RawBasalEntry {
    time: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    value: Option<f64>,
    #[serde(rename = "timeAsSeconds", default, deserialize_with = "deserialize_lenient_f64")]
    time_as_seconds: Option<f64>,
}

/// Raw JSON structure for a treatment record
#[derive(Debug, Deserialize)]
struct RawTreatment {
    #[serde(rename = "eventType", default)]
    event_type: Option<String>,
    created_at: String,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    rate: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    absolute: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    duration: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    insulin: Option<f64>,
}

/// Raw JSON structure for a glucose entry
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    sgv: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    date: Option<f64>,
    #[serde(rename = "dateString", default)]
    date_string: Option<String>,
}

/// Parse profile records into basal profiles, one per record.
///
/// Each record's `store` must hold exactly one variant whose name is
/// "default" ignoring case; Loop and AAPS capitalize it, Trio does not.
pub fn parse_profiles(records: Vec<Value>) -> ParseResult<Vec<BasalProfile>> {
    let profiles = records
        .into_iter()
        .map(|record| {
            let raw: RawProfileRecord = serde_json::from_value(record)
                .map_err(|source| ParseError::Json { kind: "profile", source })?;
            profile_from_raw(raw)
        })
        .collect::<ParseResult<Vec<_>>>()?;

    debug!("Parsed {} basal profiles", profiles.len());
    Ok(profiles)
}

fn profile_from_raw(raw: RawProfileRecord) -> ParseResult<BasalProfile> {
    let effective_from = parse_timestamp(&raw.start_date)?;

    let candidates: Vec<&String> = raw
        .store
        .keys()
        .filter(|name| name.eq_ignore_ascii_case("default"))
        .collect();
    let variant = match candidates.as_slice() {
        [name] => &raw.store[name.as_str()],
        _ => {
            return Err(ParseError::AmbiguousDefaultProfile {
                effective_from: raw.start_date.clone(),
                candidates: candidates.into_iter().cloned().collect(),
            })
        }
    };

    let variant: RawProfileVariant = serde_json::from_value(variant.clone())
        .map_err(|source| ParseError::Json { kind: "profile", source })?;

    let tz_name = variant.timezone.as_deref().unwrap_or("UTC");
    let timezone: Tz = tz_name
        .parse()
        .map_err(|_| ParseError::UnknownTimezone(tz_name.to_string()))?;

    let entries = variant
        .basal
        .iter()
        .map(basal_entry_from_raw)
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(BasalProfile::new(effective_from, timezone, entries)?)
}

fn basal_entry_from_raw(raw: &RawBasalEntry) -> ParseResult<BasalEntry> {
    let time = match (raw.time.as_deref(), raw.time_as_seconds) {
        (Some(text), _) => parse_time_of_day(text)?,
        (None, Some(secs)) => NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, 0)
            .ok_or_else(|| ParseError::InvalidRecord(format!("timeAsSeconds {} out of range", secs)))?,
        (None, None) => {
            return Err(ParseError::InvalidRecord(
                "basal entry without a time".to_string(),
            ))
        }
    };
    let rate = raw
        .value
        .ok_or_else(|| ParseError::InvalidRecord(format!("basal entry at {} has no value", time)))?;
    Ok(BasalEntry::new(time, rate))
}

fn parse_time_of_day(text: &str) -> ParseResult<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text.trim(), "%H:%M:%S"))
        .map_err(|_| ParseError::InvalidRecord(format!("invalid time of day '{}'", text)))
}

/// Parse treatment records into temp basals and boluses.
///
/// - "Temp Basal": `rate` (or `absolute`) for `duration` minutes.
/// - "Suspend Pump": zero rate, for `duration` minutes or 30 when absent.
/// - anything else with positive `insulin`: a bolus.
///
/// Other records (carbs, notes, site changes) are skipped.
pub fn parse_treatments(records: Vec<Value>) -> ParseResult<Treatments> {
    let mut treatments = Treatments::default();
    let mut skipped = 0usize;

    for record in records {
        let raw: RawTreatment = serde_json::from_value(record)
            .map_err(|source| ParseError::Json { kind: "treatment", source })?;
        let at = parse_timestamp(&raw.created_at)?;

        match raw.event_type.as_deref() {
            Some("Temp Basal") => {
                let rate = raw.rate.or(raw.absolute).ok_or_else(|| {
                    ParseError::InvalidRecord(format!("temp basal at {} has no rate", at))
                })?;
                let minutes = raw.duration.ok_or_else(|| {
                    ParseError::InvalidRecord(format!("temp basal at {} has no duration", at))
                })?;
                treatments.temp_basals.push(checked_temp_basal(at, rate, minutes)?);
            }
            Some("Suspend Pump") => {
                let minutes = raw.duration.unwrap_or(DEFAULT_SUSPEND_MINUTES);
                treatments.temp_basals.push(checked_temp_basal(at, 0.0, minutes)?);
            }
            _ => match raw.insulin {
                Some(units) if units > 0.0 && units.is_finite() => {
                    treatments.boluses.push(Bolus::new(at, units));
                }
                Some(units) if units < 0.0 || !units.is_finite() => {
                    return Err(ParseError::InvalidRecord(format!(
                        "bolus at {} has invalid amount {}",
                        at, units
                    )));
                }
                _ => skipped += 1,
            },
        }
    }

    if skipped > 0 {
        debug!("Skipped {} treatments without insulin", skipped);
    }
    Ok(treatments)
}

fn checked_temp_basal(at: DateTime<Utc>, rate: f64, minutes: f64) -> ParseResult<TempBasal> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(ParseError::InvalidRecord(format!(
            "temp basal at {} has invalid rate {}",
            at, rate
        )));
    }
    if !minutes.is_finite() || minutes < 0.0 {
        return Err(ParseError::InvalidRecord(format!(
            "temp basal at {} has invalid duration {}",
            at, minutes
        )));
    }
    Ok(TempBasal::from_minutes(at, rate, minutes))
}

/// Parse glucose entries, keeping only sensor readings (`sgv`, mg/dL).
pub fn parse_glucose(records: Vec<Value>) -> ParseResult<Vec<GlucoseReading>> {
    let mut readings = Vec::new();

    for record in records {
        let raw: RawEntry = serde_json::from_value(record)
            .map_err(|source| ParseError::Json { kind: "entry", source })?;
        let Some(sgv) = raw.sgv else {
            continue;
        };

        let at = match (raw.date, raw.date_string.as_deref()) {
            (Some(millis), _) => DateTime::from_timestamp_millis(millis as i64)
                .ok_or_else(|| ParseError::Timestamp(millis.to_string()))?,
            (None, Some(text)) => parse_timestamp(text)?,
            (None, None) => {
                warn!("Skipping glucose entry without a timestamp");
                continue;
            }
        };
        readings.push(GlucoseReading::from_mgdl(at, sgv));
    }

    Ok(readings)
}
