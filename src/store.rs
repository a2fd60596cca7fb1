use chrono::NaiveDate;
use thiserror::Error;

use crate::achievements;
use crate::backup::{self, Backup, BackupError};
use crate::database::{
    self, ACHIEVEMENTS_KEY, Database, DatabaseError, ITEMS_KEY, SCORES_KEY, SETTINGS_KEY,
};
use crate::models::{
    NewStudyInput, RecordPatch, ScoreEntry, Settings, SettingsPatch, Status, StudyRecord,
};
use crate::schedule;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),
    #[error("Backup error: {0}")]
    BackupError(#[from] BackupError),
    #[error("No record matches '{0}'")]
    RecordNotFound(String),
    #[error("'{0}' matches more than one record; use a longer id")]
    AmbiguousId(String),
}

/// Summary of a successful backup import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub items: Option<usize>,
    pub scores: Option<usize>,
    pub settings: bool,
    pub achievements: Option<usize>,
}

/// Owns the four persisted collections and writes each change through to storage
pub struct Store {
    db: Database,
    items: Vec<StudyRecord>,
    settings: Settings,
    scores: Vec<ScoreEntry>,
    achievements: Vec<String>,
}

impl Store {
    /// Load every collection, falling back to defaults for missing or corrupt data
    pub fn open(db: Database) -> Self {
        let items = db.load_or(ITEMS_KEY, Vec::new());
        let settings = db.load_or(SETTINGS_KEY, Settings::default());
        let scores = db.load_or(SCORES_KEY, Vec::new());
        let achievements = db.load_or(ACHIEVEMENTS_KEY, Vec::new());
        let store = Self {
            db,
            items,
            settings,
            scores,
            achievements,
        };
        tracing::debug!(
            items = store.items.len(),
            scores = store.scores.len(),
            achievements = store.achievements.len(),
            "Store loaded"
        );
        store
    }

    pub fn items(&self) -> &[StudyRecord] {
        &self.items
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn scores(&self) -> &[ScoreEntry] {
        &self.scores
    }

    pub fn achievements(&self) -> &[String] {
        &self.achievements
    }

    pub fn get(&self, id: &str) -> Option<&StudyRecord> {
        self.items.iter().find(|r| r.id == id)
    }

    /// Resolve a full id or a unique id prefix to a full id
    pub fn resolve_id(&self, prefix: &str) -> Result<String, StoreError> {
        if let Some(record) = self.get(prefix) {
            return Ok(record.id.clone());
        }
        let mut matches = self.items.iter().filter(|r| !prefix.is_empty() && r.id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(record), None) => Ok(record.id.clone()),
            (Some(_), Some(_)) => Err(StoreError::AmbiguousId(prefix.to_string())),
            (None, _) => Err(StoreError::RecordNotFound(prefix.to_string())),
        }
    }

    fn flush_items(&self) -> Result<(), StoreError> {
        self.db.save(ITEMS_KEY, &self.items)?;
        Ok(())
    }

    fn flush_settings(&self) -> Result<(), StoreError> {
        self.db.save(SETTINGS_KEY, &self.settings)?;
        Ok(())
    }

    fn flush_scores(&self) -> Result<(), StoreError> {
        self.db.save(SCORES_KEY, &self.scores)?;
        Ok(())
    }

    fn flush_achievements(&self) -> Result<(), StoreError> {
        self.db.save(ACHIEVEMENTS_KEY, &self.achievements)?;
        Ok(())
    }

    /// Persist the record list and unlock any achievements it now satisfies
    fn records_changed(&mut self, today: NaiveDate) -> Result<(), StoreError> {
        self.flush_items()?;
        let added = achievements::unlock(&mut self.achievements, &self.items, today);
        if !added.is_empty() {
            tracing::info!("Unlocked achievements: {}", added.join(", "));
            self.flush_achievements()?;
        }
        Ok(())
    }

    /// Log a study session held on `date`, generating its reviews.
    ///
    /// Returns the new records (study first), or an empty list when the input
    /// is incomplete, in which case nothing changes.
    pub fn add_study_session(
        &mut self,
        input: &NewStudyInput,
        date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<StudyRecord>, StoreError> {
        let Some(records) = schedule::new_study_session(input, date) else {
            tracing::debug!("Ignoring incomplete study session input");
            return Ok(Vec::new());
        };
        self.items.extend(records.iter().cloned());
        self.records_changed(today)?;
        Ok(records)
    }

    /// Flip a record between pending and done, returning its new status
    pub fn toggle_status(&mut self, id: &str, today: NaiveDate) -> Result<Status, StoreError> {
        let record = self
            .items
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::RecordNotFound(id.to_string()))?;
        record.status = record.status.toggled();
        let status = record.status;
        self.records_changed(today)?;
        Ok(status)
    }

    /// Edit fields of a record
    pub fn update_record(
        &mut self,
        id: &str,
        patch: &RecordPatch,
        today: NaiveDate,
    ) -> Result<StudyRecord, StoreError> {
        let record = self
            .items
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::RecordNotFound(id.to_string()))?;
        record.apply(patch);
        let updated = record.clone();
        self.records_changed(today)?;
        Ok(updated)
    }

    /// Delete a record and every record whose parent it is; returns how many were removed
    pub fn delete_record(&mut self, id: &str, today: NaiveDate) -> Result<usize, StoreError> {
        if self.get(id).is_none() {
            return Err(StoreError::RecordNotFound(id.to_string()));
        }
        let before = self.items.len();
        self.items
            .retain(|r| r.id != id && r.parent_id.as_deref() != Some(id));
        let removed = before - self.items.len();
        tracing::debug!("Deleted {} record(s) for {}", removed, id);
        self.records_changed(today)?;
        Ok(removed)
    }

    pub fn add_score(&mut self, entry: ScoreEntry) -> Result<(), StoreError> {
        self.scores.push(entry);
        self.flush_scores()
    }

    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<&Settings, StoreError> {
        self.settings.merge(patch);
        self.flush_settings()?;
        Ok(&self.settings)
    }

    /// Snapshot of every collection
    pub fn export_backup(&self) -> Backup {
        Backup::new(
            self.items.clone(),
            self.settings.clone(),
            self.scores.clone(),
            self.achievements.clone(),
        )
    }

    /// Restore from a backup document.
    ///
    /// Present `items`, `scores` and `achievements` replace the current ones
    /// and `settings` is merged over the current settings. When `items` is
    /// present, achievements are then re-evaluated against the new records.
    /// The document is decoded and every changed key written in one
    /// transaction before the store is updated, so on any error the store and
    /// its storage are left exactly as they were.
    pub fn import_backup(&mut self, text: &str, today: NaiveDate) -> Result<ImportSummary, StoreError> {
        let import = backup::parse(text)?;
        if import.is_empty() {
            tracing::warn!("Backup contains no items, settings, scores or achievements");
        }
        let summary = ImportSummary {
            items: import.items.as_ref().map(Vec::len),
            scores: import.scores.as_ref().map(Vec::len),
            settings: import.settings.is_some(),
            achievements: import.achievements.as_ref().map(Vec::len),
        };

        let mut writes: Vec<(&str, String)> = Vec::new();
        let settings = import.settings.map(|patch| {
            let mut settings = self.settings.clone();
            settings.merge(&patch);
            settings
        });
        if let Some(ref settings) = settings {
            writes.push((SETTINGS_KEY, database::encode(SETTINGS_KEY, settings)?));
        }
        if let Some(ref scores) = import.scores {
            writes.push((SCORES_KEY, database::encode(SCORES_KEY, scores)?));
        }
        let achievements_replaced = import.achievements.is_some();
        let mut unlocked = import
            .achievements
            .unwrap_or_else(|| self.achievements.clone());
        let mut added = Vec::new();
        if let Some(ref items) = import.items {
            writes.push((ITEMS_KEY, database::encode(ITEMS_KEY, items)?));
            added = achievements::unlock(&mut unlocked, items, today);
        }
        if achievements_replaced || !added.is_empty() {
            writes.push((ACHIEVEMENTS_KEY, database::encode(ACHIEVEMENTS_KEY, &unlocked)?));
        }

        self.db.save_all(&writes)?;

        if let Some(items) = import.items {
            self.items = items;
        }
        if let Some(settings) = settings {
            self.settings = settings;
        }
        if let Some(scores) = import.scores {
            self.scores = scores;
        }
        self.achievements = unlocked;
        if !added.is_empty() {
            tracing::info!("Unlocked achievements: {}", added.join(", "));
        }

        tracing::info!(?summary, "Backup imported");
        Ok(summary)
    }
}
