//! SQLite document store
//!
//! Every collection lives in one `records` table as JSON bodies; filters and
//! ordering go through `json_extract`, updates through `json_patch`.

use super::{
    ensure_id, parse_timestamp, validate_field, DataStore, Filter, FilterOp, Query, Row,
};
use crate::error::{PersistenceError, PersistenceResult};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

const CREATE_RECORDS: &str = "CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    PRIMARY KEY (collection, id)
)";

const CREATE_RECORDS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_records_collection ON records (collection)";

/// Bound parameter of a generated statement
#[derive(Debug, Clone, PartialEq)]
enum Bind {
    Text(String),
    Int(i64),
    Real(f64),
}

impl Bind {
    fn from_value(value: &Value) -> PersistenceResult<Self> {
        match value {
            Value::String(s) => Ok(Bind::Text(s.clone())),
            Value::Bool(b) => Ok(Bind::Int(i64::from(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Bind::Int(i)),
                None => Ok(Bind::Real(n.as_f64().unwrap_or_default())),
            },
            other => Err(PersistenceError::Other(format!(
                "unsupported filter value: {}",
                other
            ))),
        }
    }
}

/// `json_extract(body, '$.field')`; `field` must already be validated.
fn column(field: &str) -> String {
    format!("json_extract(body, '$.{}')", field)
}

/// Leading shape of an RFC 3339 timestamp
const TIMESTAMP_GLOB: &str = "[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9][Tt ][0-9][0-9]:[0-9][0-9]*";

/// Sort key: timestamp-shaped strings compare as julian days, everything
/// else as itself. `julianday` alone would also read numeric strings as
/// day numbers.
fn sort_key(expr: &str) -> String {
    format!("COALESCE(CASE WHEN {expr} GLOB '{TIMESTAMP_GLOB}' THEN julianday({expr}) END, {expr})")
}

/// WHERE fragments plus their binds, in statement order.
#[derive(Debug, Default)]
struct Conditions {
    clauses: Vec<String>,
    binds: Vec<Bind>,
}

impl Conditions {
    fn push(&mut self, filter: &Filter) -> PersistenceResult<()> {
        validate_field(&filter.field)?;
        let col = column(&filter.field);

        match (&filter.value, filter.op) {
            (Value::Null, FilterOp::Eq) => self.clauses.push(format!("{} IS NULL", col)),
            (Value::Null, FilterOp::Neq) => self.clauses.push(format!("{} IS NOT NULL", col)),
            (Value::Null, _) => self.clauses.push("0".to_string()),
            (value, FilterOp::Eq) => {
                self.clauses.push(format!("{} = ?", col));
                self.binds.push(Bind::from_value(value)?);
            }
            (value, FilterOp::Neq) => {
                self.clauses.push(format!("({col} IS NULL OR {col} != ?)"));
                self.binds.push(Bind::from_value(value)?);
            }
            (Value::String(s), op) if parse_timestamp(s).is_some() => {
                self.clauses
                    .push(format!("{} {} julianday(?)", sort_key(&col), op.as_sql()));
                self.binds.push(Bind::Text(s.clone()));
            }
            (value, op) => {
                self.clauses.push(format!("{} {} ?", col, op.as_sql()));
                self.binds.push(Bind::from_value(value)?);
            }
        }
        Ok(())
    }

    fn from_filters(filters: &[Filter]) -> PersistenceResult<Self> {
        let mut conditions = Self::default();
        for filter in filters {
            conditions.push(filter)?;
        }
        Ok(conditions)
    }

    fn sql(&self) -> String {
        self.clauses
            .iter()
            .map(|c| format!(" AND {}", c))
            .collect()
    }
}

/// Build the SELECT for `query`; returns the statement and its trailing binds.
fn select_sql(query: &Query) -> PersistenceResult<(String, Vec<Bind>)> {
    validate_field(&query.collection)?;
    let conditions = Conditions::from_filters(&query.filters)?;

    let mut sql = format!(
        "SELECT body FROM records WHERE collection = ?{}",
        conditions.sql()
    );

    if !query.order.is_empty() {
        let mut keys = Vec::with_capacity(query.order.len());
        for order in &query.order {
            validate_field(&order.field)?;
            keys.push(format!(
                "{} {}",
                sort_key(&column(&order.field)),
                if order.ascending { "ASC" } else { "DESC" }
            ));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    Ok((sql, conditions.binds))
}

fn parse_body(collection: &str, body: &str) -> PersistenceResult<Row> {
    serde_json::from_str(body).map_err(|e| PersistenceError::invalid_row(collection, e))
}

/// Document store on a `SqlitePool`.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) and initialize the schema.
    ///
    /// # Arguments
    /// * `database_url` - e.g. "sqlite:data/ssg.db?mode=rwc"
    pub async fn connect(database_url: &str) -> PersistenceResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Private in-memory database, one connection so every query sees it.
    pub async fn in_memory() -> PersistenceResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> PersistenceResult<()> {
        sqlx::query(CREATE_RECORDS).execute(&self.pool).await?;
        sqlx::query(CREATE_RECORDS_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    /// Rows per collection, for status output
    pub async fn collection_counts(&self) -> PersistenceResult<Vec<(String, i64)>> {
        let counts = sqlx::query_as::<_, (String, i64)>(
            "SELECT collection, COUNT(*) FROM records GROUP BY collection ORDER BY collection",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch(&self, query: &Query) -> PersistenceResult<Vec<Row>> {
        let (sql, binds) = select_sql(query)?;

        let mut stmt = sqlx::query_scalar::<_, String>(&sql).bind(query.collection.as_str());
        for bind in binds {
            stmt = match bind {
                Bind::Text(s) => stmt.bind(s),
                Bind::Int(i) => stmt.bind(i),
                Bind::Real(f) => stmt.bind(f),
            };
        }

        let bodies = stmt.fetch_all(&self.pool).await?;
        bodies
            .iter()
            .map(|body| parse_body(&query.collection, body))
            .collect()
    }

    async fn insert(&self, collection: &str, mut row: Row) -> PersistenceResult<Row> {
        validate_field(collection)?;
        let id = ensure_id(&mut row);
        let body = serde_json::to_string(&row)?;

        let result = sqlx::query("INSERT INTO records (collection, id, body) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(&id)
            .bind(body)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(row),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(PersistenceError::already_exists(collection, &id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_where(
        &self,
        collection: &str,
        id: &str,
        patch: Row,
        guard: &[Filter],
    ) -> PersistenceResult<bool> {
        validate_field(collection)?;
        for key in patch.keys() {
            validate_field(key)?;
        }
        let conditions = Conditions::from_filters(guard)?;
        let patch = serde_json::to_string(&patch)?;

        let sql = format!(
            "UPDATE records SET body = json_patch(body, ?) WHERE collection = ? AND id = ?{}",
            conditions.sql()
        );

        let mut stmt = sqlx::query(&sql).bind(patch).bind(collection).bind(id);
        for bind in conditions.binds {
            stmt = match bind {
                Bind::Text(s) => stmt.bind(s),
                Bind::Int(i) => stmt.bind(i),
                Bind::Real(f) => stmt.bind(f),
            };
        }

        let result = stmt.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: &str, id: &str) -> PersistenceResult<()> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found(collection, id));
        }
        Ok(())
    }
}
