//! Cycle record model and collaborator-facing input shape.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{Error, Result};

/// Symptom vocabulary offered during a cycle.
pub const SYMPTOMS: [&str; 8] = [
    "cramps",
    "headache",
    "fatigue",
    "bloating",
    "mood swings",
    "breast tenderness",
    "nausea",
    "acne",
];

/// Premenstrual symptom vocabulary (experienced before the cycle).
pub const PRE_SYMPTOMS: [&str; 12] = [
    "irritability",
    "cravings",
    "breast sensitivity",
    "bloating",
    "fatigue",
    "headache",
    "mood swings",
    "sleep trouble",
    "abdominal pain",
    "anxiety",
    "low mood",
    "water retention",
];

/// Tagged record identifier.
///
/// `Local` ids are assigned when a record is created without a confirmed
/// remote write (millisecond unix timestamp); `Remote` ids are opaque strings
/// assigned by the remote store. Eligibility for remote update/delete is a
/// match on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CycleId {
    Local(i64),
    Remote(String),
}

impl CycleId {
    /// True when the record has never been confirmed remotely.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    fn from_raw(raw: &str) -> Self {
        if let Some(rest) = raw.strip_prefix("local-") {
            if let Ok(millis) = rest.parse::<i64>() {
                return Self::Local(millis);
            }
        }
        Self::Remote(raw.to_string())
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(millis) => write!(f, "local-{}", millis),
            Self::Remote(id) => f.write_str(id),
        }
    }
}

impl FromStr for CycleId {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_raw(s))
    }
}

impl Serialize for CycleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CycleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_raw(&raw))
    }
}

/// Flow intensity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Light,
    #[default]
    Normal,
    Heavy,
}

/// One logged cycle, in canonical field names.
///
/// `length` is inclusive of both endpoints and is recomputed from the dates
/// on every write; `pending_sync` is kept in the local snapshot so offline
/// restarts remember which records still await a remote write, but it is
/// never sent to the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleRecord {
    pub id: CycleId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub flow: Flow,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub pre_symptoms: Vec<String>,
    #[serde(default)]
    pub notes: String,
    pub length: i64,
    #[serde(default)]
    pub pending_sync: bool,
}

/// Inclusive day count of a cycle, both endpoints counted.
pub fn cycle_length(start_date: NaiveDate, end_date: NaiveDate) -> i64 {
    (end_date - start_date).num_days() + 1
}

/// Collaborator input for create/update. Dates arrive optional because the
/// calling form may submit empty fields; validation happens before any I/O.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleInput {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub flow: Flow,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub pre_symptoms: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl CycleInput {
    /// Validate the date invariants and return `(start, end)`.
    pub fn validated_dates(&self) -> Result<(NaiveDate, NaiveDate)> {
        let (Some(start), Some(end)) = (self.start_date, self.end_date) else {
            return Err(Error::validation("start and end dates are required"));
        };
        if end < start {
            return Err(Error::validation(
                "end date must be on or after start date",
            ));
        }
        Ok((start, end))
    }

    /// Build a record from validated input. Length is always recomputed from
    /// the dates, never taken from the caller.
    pub fn into_record(self, id: CycleId, pending_sync: bool) -> Result<CycleRecord> {
        let (start_date, end_date) = self.validated_dates()?;
        Ok(CycleRecord {
            id,
            start_date,
            end_date,
            flow: self.flow,
            symptoms: self.symptoms,
            pre_symptoms: self.pre_symptoms,
            notes: self.notes,
            length: cycle_length(start_date, end_date),
            pending_sync,
        })
    }
}
