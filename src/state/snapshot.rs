//! Persisted state format.
//!
//! ```json
//! {
//!   "rotation_state": { "group_count": 3, "last_group_index": 1, "last_cycle_started_at": 1700000000 },
//!   "profile_state": {
//!     "Profile 1": { "last_success_at": 1700000000, "consecutive_failures": 0,
//!                    "next_eligible_at": 1700000000, "quarantined": false }
//!   },
//!   "profile_proxies": { "Profile 1": "socks5://10.0.0.1:1080" },
//!   "saved_at": 1700000100
//! }
//! ```
//!
//! Decoding accepts floats, numeric strings and booleans in numeric fields,
//! treats `0`/`null` as an absent `last_success_at`, and understands the
//! legacy key names (`groups`, `last_group`, `failures`, `next_allowed`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::cadence::Timestamp;
use crate::health::HealthRecord;
use crate::rotation::RotationState;

/// Point-in-time copy of everything the engine persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub rotation: RotationState,
    pub records: BTreeMap<String, HealthRecord>,
    pub proxies: BTreeMap<String, String>,
    pub saved_at: Timestamp,
}

impl Snapshot {
    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&SnapshotFile::from(self))
    }

    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        let file: SnapshotFile = serde_json::from_slice(bytes)?;
        Ok(file.into())
    }

    /// Raise the failure count of quarantined records to `threshold`.
    ///
    /// A hand-edited file can mark a record quarantined with fewer failures
    /// than the threshold; quarantine always implies at least that many.
    pub fn normalized(mut self, threshold: u32) -> Self {
        for record in self.records.values_mut().filter(|r| r.quarantined) {
            record.consecutive_failures = record.consecutive_failures.max(threshold);
        }
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct SnapshotFile {
    rotation_state: RotationFile,
    profile_state: BTreeMap<String, RecordFile>,
    #[serde(deserialize_with = "lenient_proxies")]
    profile_proxies: BTreeMap<String, String>,
    #[serde(alias = "ts", deserialize_with = "lenient_u64")]
    saved_at: u64,
}

impl Default for SnapshotFile {
    fn default() -> Self {
        Self {
            rotation_state: RotationFile::default(),
            profile_state: BTreeMap::new(),
            profile_proxies: BTreeMap::new(),
            saved_at: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct RotationFile {
    #[serde(alias = "groups", deserialize_with = "lenient_u32")]
    group_count: u32,
    #[serde(alias = "last_group", deserialize_with = "lenient_i64")]
    last_group_index: i64,
    #[serde(alias = "last_cycle_ts", deserialize_with = "lenient_u64")]
    last_cycle_started_at: u64,
}

impl Default for RotationFile {
    fn default() -> Self {
        let state = RotationState::new(3);
        Self {
            group_count: state.group_count,
            last_group_index: state.last_group_index,
            last_cycle_started_at: state.last_cycle_started_at,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RecordFile {
    #[serde(alias = "last_refresh", deserialize_with = "lenient_optional_ts")]
    last_success_at: Option<u64>,
    #[serde(alias = "failures", deserialize_with = "lenient_u32")]
    consecutive_failures: u32,
    #[serde(alias = "next_allowed", deserialize_with = "lenient_u64")]
    next_eligible_at: u64,
    #[serde(deserialize_with = "lenient_bool")]
    quarantined: bool,
}

impl From<&Snapshot> for SnapshotFile {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            rotation_state: RotationFile {
                group_count: snapshot.rotation.group_count,
                last_group_index: snapshot.rotation.last_group_index,
                last_cycle_started_at: snapshot.rotation.last_cycle_started_at,
            },
            profile_state: snapshot
                .records
                .iter()
                .map(|(id, r)| {
                    (
                        id.clone(),
                        RecordFile {
                            last_success_at: r.last_success_at,
                            consecutive_failures: r.consecutive_failures,
                            next_eligible_at: r.next_eligible_at,
                            quarantined: r.quarantined,
                        },
                    )
                })
                .collect(),
            profile_proxies: snapshot.proxies.clone(),
            saved_at: snapshot.saved_at,
        }
    }
}

impl From<SnapshotFile> for Snapshot {
    fn from(file: SnapshotFile) -> Self {
        let rotation = RotationState {
            group_count: file.rotation_state.group_count,
            last_group_index: file.rotation_state.last_group_index,
            last_cycle_started_at: file.rotation_state.last_cycle_started_at,
        }
        .clamped();

        let records = file
            .profile_state
            .into_iter()
            .map(|(id, r)| {
                (
                    id,
                    HealthRecord {
                        last_success_at: r.last_success_at,
                        consecutive_failures: r.consecutive_failures,
                        next_eligible_at: r.next_eligible_at,
                        quarantined: r.quarantined,
                    },
                )
            })
            .collect();

        Self {
            rotation,
            records,
            proxies: file.profile_proxies,
            saved_at: file.saved_at,
        }
    }
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn coerce_u64(value: &Value) -> Option<u64> {
    if let Value::Number(n) = value {
        if let Some(v) = n.as_u64() {
            return Some(v);
        }
    }
    // `as` saturates: negatives and NaN become 0, huge values u64::MAX.
    coerce_f64(value).map(|f| f as u64)
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_u64(&value).unwrap_or(0))
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_u64(&value).map_or(0, |v| u32::try_from(v).unwrap_or(u32::MAX)))
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        other => coerce_f64(other).map(|f| f as i64),
    };
    Ok(parsed.unwrap_or(-1))
}

fn lenient_optional_ts<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_u64(&value).filter(|ts| *ts > 0))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        other => coerce_f64(&other).is_some_and(|f| f != 0.0),
    })
}

fn lenient_proxies<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let Value::Object(map) = value else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(id, proxy)| match proxy {
            Value::String(s) => Some((id, s)),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_snapshot() -> Snapshot {
        let mut records = BTreeMap::new();
        records.insert(
            "Default".to_string(),
            HealthRecord {
                last_success_at: Some(1_700_000_000),
                consecutive_failures: 0,
                next_eligible_at: 1_700_000_000,
                quarantined: false,
            },
        );
        records.insert(
            "Profile 1".to_string(),
            HealthRecord {
                last_success_at: None,
                consecutive_failures: 1,
                next_eligible_at: 1_700_000_120,
                quarantined: false,
            },
        );
        records.insert(
            "Profile 2".to_string(),
            HealthRecord {
                last_success_at: Some(1_699_000_000),
                consecutive_failures: 3,
                next_eligible_at: 1_700_000_480,
                quarantined: true,
            },
        );
        let mut proxies = BTreeMap::new();
        proxies.insert("Profile 1".to_string(), "http://10.0.0.2:3128".to_string());

        Snapshot {
            rotation: RotationState {
                group_count: 3,
                last_group_index: 2,
                last_cycle_started_at: 1_700_000_050,
            },
            records,
            proxies,
            saved_at: 1_700_000_100,
        }
    }

    #[test]
    fn test_json_round_trip() {
        let snapshot = mixed_snapshot();
        let bytes = snapshot.to_json_pretty().unwrap();
        let decoded = Snapshot::from_json_slice(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_wire_field_names() {
        let bytes = mixed_snapshot().to_json_pretty().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["rotation_state"]["last_group_index"], 2);
        assert_eq!(value["profile_state"]["Profile 1"]["last_success_at"], Value::Null);
        assert_eq!(value["profile_state"]["Profile 2"]["quarantined"], true);
        assert_eq!(value["profile_proxies"]["Profile 1"], "http://10.0.0.2:3128");
        assert_eq!(value["saved_at"], 1_700_000_100u64);
    }

    #[test]
    fn test_hand_edited_values_are_coerced() {
        let raw = br#"{
            "rotation_state": { "group_count": "4", "last_group_index": 2.0, "last_cycle_started_at": 12.9 },
            "profile_state": {
                "p1": { "last_success_at": 0, "consecutive_failures": "2", "next_eligible_at": -5, "quarantined": 1 },
                "p2": {}
            },
            "profile_proxies": { "p1": "socks5://h:1", "p2": 17 }
        }"#;
        let snapshot = Snapshot::from_json_slice(raw).unwrap();
        assert_eq!(snapshot.rotation, RotationState { group_count: 4, last_group_index: 2, last_cycle_started_at: 12 });

        let p1 = snapshot.records["p1"];
        assert_eq!(p1.last_success_at, None);
        assert_eq!(p1.consecutive_failures, 2);
        assert_eq!(p1.next_eligible_at, 0);
        assert!(p1.quarantined);

        assert_eq!(snapshot.records["p2"], HealthRecord::default());
        assert_eq!(snapshot.proxies.len(), 1);
        assert_eq!(snapshot.saved_at, 0);
    }

    #[test]
    fn test_legacy_key_names() {
        let raw = br#"{
            "rotation_state": { "groups": 3, "last_group": 1, "last_cycle_ts": 1700000000.25 },
            "profile_state": {
                "Profile 3": { "last_refresh": 1699999999.5, "failures": 1, "next_allowed": 1700000120.0, "quarantined": false }
            },
            "profile_proxies": {},
            "ts": 1700000001.0
        }"#;
        let snapshot = Snapshot::from_json_slice(raw).unwrap();
        assert_eq!(snapshot.rotation.last_group_index, 1);
        assert_eq!(snapshot.rotation.last_cycle_started_at, 1_700_000_000);
        assert_eq!(snapshot.records["Profile 3"].last_success_at, Some(1_699_999_999));
        assert_eq!(snapshot.records["Profile 3"].next_eligible_at, 1_700_000_120);
        assert_eq!(snapshot.saved_at, 1_700_000_001);
    }

    #[test]
    fn test_out_of_range_cursor_is_clamped() {
        let raw = br#"{ "rotation_state": { "group_count": 0, "last_group_index": 9 } }"#;
        let snapshot = Snapshot::from_json_slice(raw).unwrap();
        assert_eq!(snapshot.rotation.group_count, 1);
        assert_eq!(snapshot.rotation.last_group_index, 0);
    }

    #[test]
    fn test_quarantine_implies_threshold_failures() {
        let raw = br#"{ "profile_state": {
            "a": { "consecutive_failures": 0, "quarantined": true },
            "b": { "consecutive_failures": 5, "quarantined": true },
            "c": { "consecutive_failures": 1, "quarantined": false }
        } }"#;
        let snapshot = Snapshot::from_json_slice(raw).unwrap().normalized(3);
        assert_eq!(snapshot.records["a"].consecutive_failures, 3);
        assert_eq!(snapshot.records["b"].consecutive_failures, 5);
        assert_eq!(snapshot.records["c"].consecutive_failures, 1);
        assert!(!snapshot.records["c"].quarantined);
    }

    #[test]
    fn test_not_json_is_an_error() {
        assert!(Snapshot::from_json_slice(b"not json").is_err());
    }
}
