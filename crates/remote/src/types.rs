//! Wire types for the remote `cycles` schema.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use cycletrack_core::cycles::{cycle_length, CycleId, CycleRecord, Flow};
use cycletrack_core::errors::RemoteStoreError;

/// One row of the remote `cycles` table, snake_case field names.
///
/// Reads are tolerant: nullable columns default, a missing `length` is
/// recomputed from the dates. The id is carried opaquely and accepts both
/// JSON strings and numbers (serial columns arrive as numbers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleRow {
    #[serde(default, skip_serializing)]
    pub id: Option<Value>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub flow: Option<Flow>,
    #[serde(default)]
    pub symptoms: Option<Vec<String>>,
    #[serde(default)]
    pub pre_symptoms: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub length: Option<i64>,
}

impl CycleRow {
    /// Remote payload for a canonical record. The id travels in the URL,
    /// never in the body; `pending_sync` is local-only state.
    pub fn from_record(record: &CycleRecord) -> Self {
        Self {
            id: None,
            start_date: record.start_date,
            end_date: record.end_date,
            flow: Some(record.flow),
            symptoms: Some(record.symptoms.clone()),
            pre_symptoms: Some(record.pre_symptoms.clone()),
            notes: Some(record.notes.clone()),
            length: Some(record.length),
        }
    }

    fn id_string(&self) -> Result<String, RemoteStoreError> {
        match &self.id {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(RemoteStoreError::shape("cycle row is missing an id")),
        }
    }

    /// Canonicalize a fetched row. Rows read from the remote store are by
    /// definition synced.
    pub fn into_record(self) -> Result<CycleRecord, RemoteStoreError> {
        let id = CycleId::Remote(self.id_string()?);
        Ok(CycleRecord {
            id,
            start_date: self.start_date,
            end_date: self.end_date,
            flow: self.flow.unwrap_or_default(),
            symptoms: self.symptoms.unwrap_or_default(),
            pre_symptoms: self.pre_symptoms.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            length: self
                .length
                .unwrap_or_else(|| cycle_length(self.start_date, self.end_date)),
            pending_sync: false,
        })
    }
}
