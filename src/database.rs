use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use thiserror::Error;

/// Storage key of the record list
pub const ITEMS_KEY: &str = "study-items";
/// Storage key of the user settings
pub const SETTINGS_KEY: &str = "study-settings";
/// Storage key of the score history
pub const SCORES_KEY: &str = "study-scores";
/// Storage key of the unlocked achievement ids
pub const ACHIEVEMENTS_KEY: &str = "study-achievements";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Failed to serialize value for '{key}': {source}")]
    SerializeError {
        key: String,
        source: serde_json::Error,
    },
}

/// Durable key/value storage; each key holds one JSON document
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        tracing::debug!("Opened database at {}", db_path.display());

        let db = Database { conn };
        db.initialize_schema()?;

        Ok(db)
    }

    /// Open a throwaway database that lives only as long as the handle
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS storage (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Raw stored text for a key, if any
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM storage WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Store raw text under a key, replacing any previous value
    pub fn set_raw(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        Self::upsert(&tx, key, value)?;
        tx.commit()?;
        Ok(())
    }

    fn upsert(conn: &Connection, key: &str, value: &str) -> Result<(), DatabaseError> {
        conn.execute(
            "INSERT INTO storage (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![
                key,
                value,
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
            ],
        )?;
        Ok(())
    }

    /// Load and decode a JSON value.
    ///
    /// A missing key, an unreadable row or a document that does not decode all
    /// yield `default`; the failure is logged and never returned.
    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.get_raw(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                tracing::warn!("Failed to read '{}' from storage, using default: {}", key, e);
                return default;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                let side_key = corrupt_key(key);
                match self.set_raw(&side_key, &raw) {
                    Ok(()) => tracing::warn!(
                        "Stored '{}' is corrupt ({}); using default. The next save replaces it, \
                         the unreadable value is kept under '{}'",
                        key,
                        e,
                        side_key
                    ),
                    Err(save_err) => tracing::error!(
                        "Stored '{}' is corrupt ({}) and could not be preserved ({}); \
                         the next save will discard it",
                        key,
                        e,
                        save_err
                    ),
                }
                default
            }
        }
    }

    /// Encode a value as JSON and store it under `key`
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), DatabaseError> {
        self.set_raw(key, &encode(key, value)?)
    }

    /// Store several already-encoded values in one transaction; either all are written or none
    pub fn save_all(&self, entries: &[(&str, String)]) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            Self::upsert(&tx, key, value)?;
        }
        tx.commit()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Encode a value as JSON for storage under `key`
pub fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|source| DatabaseError::SerializeError {
        key: key.to_string(),
        source,
    })
}

/// Side key holding a value that failed to decode
pub fn corrupt_key(key: &str) -> String {
    format!("{}.corrupt", key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_yields_default() {
        let db = Database::open_in_memory().unwrap();
        let items: Vec<String> = db.load_or(ITEMS_KEY, Vec::new());
        assert!(items.is_empty());
    }

    #[test]
    fn save_then_load() {
        let db = Database::open_in_memory().unwrap();
        db.save(ACHIEVEMENTS_KEY, &vec!["first".to_string()]).unwrap();
        db.save(ACHIEVEMENTS_KEY, &vec!["first".to_string(), "streak_3".to_string()])
            .unwrap();
        let ids: Vec<String> = db.load_or(ACHIEVEMENTS_KEY, Vec::new());
        assert_eq!(ids, vec!["first", "streak_3"]);
    }

    #[test]
    fn corrupt_value_yields_default() {
        let db = Database::open_in_memory().unwrap();
        db.set_raw(SCORES_KEY, "{not json").unwrap();
        let scores: Vec<u32> = db.load_or(SCORES_KEY, vec![7]);
        assert_eq!(scores, vec![7]);
    }

    #[test]
    fn corrupt_value_is_kept_under_side_key() {
        let db = Database::open_in_memory().unwrap();
        let raw = r#"[{"id":"a","kind":"study","createdDate":"2024-01-10","status":"done"},{"id":3}]"#;
        db.set_raw(ITEMS_KEY, raw).unwrap();

        let items: Vec<crate::models::StudyRecord> = db.load_or(ITEMS_KEY, Vec::new());
        assert!(items.is_empty());
        assert_eq!(db.get_raw(&corrupt_key(ITEMS_KEY)).unwrap().as_deref(), Some(raw));

        // a later save replaces the main key but leaves the preserved copy alone
        db.save(ITEMS_KEY, &items).unwrap();
        assert_eq!(db.get_raw(ITEMS_KEY).unwrap().as_deref(), Some("[]"));
        assert_eq!(db.get_raw(&corrupt_key(ITEMS_KEY)).unwrap().as_deref(), Some(raw));
    }

    #[test]
    fn save_all_writes_every_entry() {
        let db = Database::open_in_memory().unwrap();
        db.save_all(&[(SCORES_KEY, "[]".to_string()), (ACHIEVEMENTS_KEY, "[\"first\"]".to_string())])
            .unwrap();
        assert_eq!(db.get_raw(SCORES_KEY).unwrap().as_deref(), Some("[]"));
        assert_eq!(db.get_raw(ACHIEVEMENTS_KEY).unwrap().as_deref(), Some("[\"first\"]"));
    }

    #[test]
    fn save_all_is_all_or_nothing() {
        let db = Database::open_in_memory().unwrap();
        db.set_raw(SCORES_KEY, "[1]").unwrap();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_achievements BEFORE INSERT ON storage
                 WHEN NEW.key = 'study-achievements'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let result = db.save_all(&[(SCORES_KEY, "[2]".to_string()), (ACHIEVEMENTS_KEY, "[]".to_string())]);
        assert!(result.is_err());
        assert_eq!(db.get_raw(SCORES_KEY).unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("studylog.db");
        let db = Database::new(path.to_str().unwrap()).unwrap();
        db.set_raw(SETTINGS_KEY, "{}").unwrap();
        assert!(path.exists());
        assert_eq!(db.get_raw(SETTINGS_KEY).unwrap().as_deref(), Some("{}"));
    }
}
