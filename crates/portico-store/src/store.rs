use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, params};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::warn;

use crate::migrations::MIGRATIONS;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create parent dir for {path}")]
    CreateParentDir {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to open key-value db {path}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },
    #[error("failed migration sql: {sql}")]
    Migrate { sql: String, source: rusqlite::Error },
    #[error("failed to serialize value for key {key}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
    #[error("failed to write value for key {key}")]
    Write {
        key: String,
        source: rusqlite::Error,
    },
}

/// Storage namespace derived from the user's stable identity. A missing or
/// blank identity degrades to a shared anonymous namespace instead of
/// failing.
pub fn user_namespace(email: Option<&str>) -> String {
    match email {
        Some(email) if !email.trim().is_empty() => email.trim().to_owned(),
        _ => "anonymous".to_owned(),
    }
}

/// Durable per-user key-value store for conversation data.
///
/// Values are full JSON documents: every [`PorticoStore::save`] overwrites
/// the whole value for its key, there are no partial or merge semantics.
pub struct PorticoStore {
    conn: Mutex<Connection>,
}

impl PorticoStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateParentDir {
                path: path.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;

        for sql in MIGRATIONS {
            conn.execute(sql, []).map_err(|source| StoreError::Migrate {
                sql: (*sql).to_owned(),
                source,
            })?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value_json = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            key: key.to_owned(),
            source,
        })?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv_entries (key, value_json) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
            params![key, value_json],
        )
        .map_err(|source| StoreError::Write {
            key: key.to_owned(),
            source,
        })?;
        Ok(())
    }

    /// Load the value stored under `key`. Absent keys, read failures, and
    /// unparseable payloads all fall back to `default` so that stale or
    /// corrupt local state never takes the caller down.
    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(value_json) = self.read_raw(key) else {
            return default;
        };

        match serde_json::from_str(&value_json) {
            Ok(value) => value,
            Err(error) => {
                warn!(key, %error, "discarding unparseable stored value");
                default
            }
        }
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        let conn = self.conn.lock();
        let mut stmt = match conn.prepare("SELECT value_json FROM kv_entries WHERE key = ?1") {
            Ok(stmt) => stmt,
            Err(error) => {
                warn!(key, %error, "key-value read failed");
                return None;
            }
        };

        match stmt.query_row(params![key], |row| row.get::<_, String>(0)) {
            Ok(value) => Some(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(error) => {
                warn!(key, %error, "key-value read failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_returns_equal_value() {
        let store = PorticoStore::open(":memory:").expect("open store");
        let value = vec!["alpha".to_owned(), "beta".to_owned()];
        store.save("conversations:tester", &value).expect("save");
        let loaded: Vec<String> = store.load_or("conversations:tester", Vec::new());
        assert_eq!(loaded, value);
    }

    #[test]
    fn unknown_key_yields_default() {
        let store = PorticoStore::open(":memory:").expect("open store");
        let loaded: Vec<String> = store.load_or("missing", vec!["fallback".to_owned()]);
        assert_eq!(loaded, vec!["fallback".to_owned()]);
    }

    #[test]
    fn corrupt_value_yields_default() {
        let store = PorticoStore::open(":memory:").expect("open store");
        store.save("conversations:tester", &"not a list").expect("save");
        let loaded: Vec<u32> = store.load_or("conversations:tester", vec![7]);
        assert_eq!(loaded, vec![7]);
    }

    #[test]
    fn save_overwrites_the_full_value() {
        let store = PorticoStore::open(":memory:").expect("open store");
        store.save("k", &vec![1, 2, 3]).expect("first save");
        store.save("k", &vec![9]).expect("second save");
        let loaded: Vec<u32> = store.load_or("k", Vec::new());
        assert_eq!(loaded, vec![9]);
    }

    #[test]
    fn namespace_falls_back_to_anonymous() {
        assert_eq!(user_namespace(Some("sarah@example.com")), "sarah@example.com");
        assert_eq!(user_namespace(Some("  ")), "anonymous");
        assert_eq!(user_namespace(None), "anonymous");
    }
}
