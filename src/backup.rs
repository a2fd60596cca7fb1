//! Backup file export and import.
//!
//! A backup is one JSON object:
//! `{ "v": 1, "exportedAt": ..., "items": [...], "settings": {...}, "scores": [...], "achievements": [...] }`.
//! Every key is optional on import. Decoding happens in full before anything
//! is applied, so a bad file never leaves a partially restored store.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{ScoreEntry, Settings, SettingsPatch, StudyRecord};

/// Current backup format version
pub const BACKUP_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Backup is not valid JSON: {0}")]
    ParseError(#[source] serde_json::Error),
    #[error("Backup must be a JSON object")]
    NotAnObject,
    #[error("Backup field '{field}' is malformed: {source}")]
    InvalidField {
        field: &'static str,
        source: serde_json::Error,
    },
    #[error("Failed to serialize backup: {0}")]
    SerializeError(#[source] serde_json::Error),
}

/// Full snapshot written by export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub v: u32,
    pub exported_at: DateTime<Utc>,
    pub items: Vec<StudyRecord>,
    pub settings: Settings,
    pub scores: Vec<ScoreEntry>,
    pub achievements: Vec<String>,
}

impl Backup {
    pub fn new(
        items: Vec<StudyRecord>,
        settings: Settings,
        scores: Vec<ScoreEntry>,
        achievements: Vec<String>,
    ) -> Self {
        Self {
            v: BACKUP_VERSION,
            exported_at: Utc::now(),
            items,
            settings,
            scores,
            achievements,
        }
    }

    /// Pretty-printed JSON document
    pub fn to_json(&self) -> Result<String, BackupError> {
        serde_json::to_string_pretty(self).map_err(BackupError::SerializeError)
    }
}

/// Decoded backup contents; `None` marks a key absent from the file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupImport {
    pub version: Option<u64>,
    pub items: Option<Vec<StudyRecord>>,
    pub settings: Option<SettingsPatch>,
    pub scores: Option<Vec<ScoreEntry>>,
    pub achievements: Option<Vec<String>>,
}

impl BackupImport {
    pub fn is_empty(&self) -> bool {
        self.items.is_none()
            && self.settings.is_none()
            && self.scores.is_none()
            && self.achievements.is_none()
    }
}

fn take_field<T: DeserializeOwned>(
    object: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Option<T>, BackupError> {
    match object.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| BackupError::InvalidField { field, source }),
    }
}

/// Decode a backup document without touching any state
pub fn parse(text: &str) -> Result<BackupImport, BackupError> {
    let value: Value = serde_json::from_str(text).map_err(BackupError::ParseError)?;
    let Value::Object(mut object) = value else {
        return Err(BackupError::NotAnObject);
    };

    let version = object.get("v").and_then(Value::as_u64);
    if let Some(v) = version {
        if v > BACKUP_VERSION as u64 {
            tracing::warn!("Backup version {} is newer than supported version {}", v, BACKUP_VERSION);
        }
    }

    Ok(BackupImport {
        version,
        items: take_field(&mut object, "items")?,
        settings: take_field(&mut object, "settings")?,
        scores: take_field(&mut object, "scores")?,
        achievements: take_field(&mut object, "achievements")?,
    })
}

/// Default file name for a backup taken on `date`
pub fn default_file_name(date: chrono::NaiveDate) -> String {
    format!("study-backup-{}.json", date.format("%Y-%m-%d"))
}
