//! In-process store, used by tests and as a scratch backend.

use super::{ensure_id, DataStore, Filter, Query, Row};
use crate::error::{PersistenceError, PersistenceResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Collections held in a `RwLock`ed map; every write is atomic with
/// respect to its guard check.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> PersistenceResult<RwLockReadGuard<'_, HashMap<String, Vec<Row>>>> {
        self.collections
            .read()
            .map_err(|_| PersistenceError::Other("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> PersistenceResult<RwLockWriteGuard<'_, HashMap<String, Vec<Row>>>> {
        self.collections
            .write()
            .map_err(|_| PersistenceError::Other("memory store lock poisoned".to_string()))
    }

    /// Number of rows in `collection`
    pub fn count(&self, collection: &str) -> PersistenceResult<usize> {
        Ok(self.read()?.get(collection).map_or(0, Vec::len))
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, query: &Query) -> PersistenceResult<Vec<Row>> {
        let guard = self.read()?;
        let rows = guard
            .get(&query.collection)
            .map(|rows| rows.to_vec())
            .unwrap_or_default();
        Ok(query.apply(rows))
    }

    async fn insert(&self, collection: &str, mut row: Row) -> PersistenceResult<Row> {
        let id = ensure_id(&mut row);
        let mut guard = self.write()?;
        let rows = guard.entry(collection.to_string()).or_default();

        if rows.iter().any(|r| r.get("id").and_then(|v| v.as_str()) == Some(id.as_str())) {
            return Err(PersistenceError::already_exists(collection, &id));
        }

        rows.push(row.clone());
        Ok(row)
    }

    async fn update_where(
        &self,
        collection: &str,
        id: &str,
        patch: Row,
        guard: &[Filter],
    ) -> PersistenceResult<bool> {
        let mut collections = self.write()?;
        let Some(rows) = collections.get_mut(collection) else {
            return Ok(false);
        };

        let target = rows
            .iter_mut()
            .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id));

        match target {
            Some(row) if guard.iter().all(|f| f.matches(row)) => {
                for (key, value) in patch {
                    row.insert(key, value);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> PersistenceResult<()> {
        let mut collections = self.write()?;
        let rows = collections
            .get_mut(collection)
            .ok_or_else(|| PersistenceError::not_found(collection, id))?;

        let before = rows.len();
        rows.retain(|r| r.get("id").and_then(|v| v.as_str()) != Some(id));
        if rows.len() == before {
            return Err(PersistenceError::not_found(collection, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Expand;
    use serde_json::{json, Value};

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let store = MemoryStore::new();
        let stored = store.insert("clubs", row(json!({"name": "Chess"}))).await.unwrap();

        let id = stored["id"].as_str().unwrap();
        assert!(!id.is_empty());
        assert_eq!(store.get("clubs", id).await.unwrap(), Some(stored.clone()));
        assert_eq!(store.count("clubs").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = MemoryStore::new();
        store.insert("clubs", row(json!({"id": "c-1"}))).await.unwrap();
        let err = store.insert("clubs", row(json!({"id": "c-1"}))).await.unwrap_err();
        assert!(matches!(err, PersistenceError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_update_where_respects_guard() {
        let store = MemoryStore::new();
        store
            .insert("requests", row(json!({"id": "r-1", "club_status": "pending"})))
            .await
            .unwrap();

        let guard = [Filter::eq("club_status", "pending")];
        let first = store
            .update_where("requests", "r-1", row(json!({"club_status": "approved"})), &guard)
            .await
            .unwrap();
        let second = store
            .update_where("requests", "r-1", row(json!({"club_status": "rejected"})), &guard)
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        let stored = store.get("requests", "r-1").await.unwrap().unwrap();
        assert_eq!(stored["club_status"], "approved");
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update("requests", "nope", row(json!({"x": 1})))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.insert("events", row(json!({"id": "e-1"}))).await.unwrap();
        store.delete("events", "e-1").await.unwrap();

        assert!(store.get("events", "e-1").await.unwrap().is_none());
        assert!(store.delete("events", "e-1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_nested_expand() {
        let store = MemoryStore::new();
        store
            .insert("users", row(json!({"id": "u-1", "email": "ana@school.edu"})))
            .await
            .unwrap();
        store
            .insert("students", row(json!({"id": "s-1", "user_id": "u-1"})))
            .await
            .unwrap();
        store
            .insert("requests", row(json!({"id": "r-1", "student_id": "s-1"})))
            .await
            .unwrap();
        store
            .insert("requests", row(json!({"id": "r-2", "student_id": "gone"})))
            .await
            .unwrap();

        let query = Query::new("requests").order_asc("id").expand(
            Expand::new("student", "students", "student_id")
                .with(Expand::new("user", "users", "user_id")),
        );
        let rows = store.query(&query).await.unwrap();

        assert_eq!(rows[0]["student"]["user"]["email"], "ana@school.edu");
        assert_eq!(rows[1]["student"], Value::Null);
    }
}
