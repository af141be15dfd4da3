//! Generic collection store
//!
//! The `DataStore` trait is the contract every backend adapter implements:
//! filtered, ordered queries with many-to-one relational expansion, inserts,
//! (conditional) updates and deletes against named collections of JSON rows.

pub mod memory;
pub mod sqlite;

use crate::error::{PersistenceError, PersistenceResult};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::cmp::Ordering;
use std::future::Future;
use std::pin::Pin;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// One stored record: a JSON object keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Neq => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
        }
    }

    fn accepts(&self, ordering: Option<Ordering>) -> bool {
        match self {
            FilterOp::Eq => ordering == Some(Ordering::Equal),
            FilterOp::Neq => ordering != Some(Ordering::Equal),
            FilterOp::Gt => ordering == Some(Ordering::Greater),
            FilterOp::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => ordering == Some(Ordering::Less),
            FilterOp::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

/// `field <op> value`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Missing columns compare as `null`.
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(&self.field).unwrap_or(&Value::Null);
        self.op.accepts(compare_values(actual, &self.value))
    }
}

/// Order `a` against `b`.
///
/// Strings that both parse as RFC 3339 timestamps compare chronologically;
/// values of different kinds do not compare (except `null`, which sorts first).
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(tx), Some(ty)) => Some(tx.cmp(&ty)),
            _ => Some(x.cmp(y)),
        },
        _ => None,
    }
}

fn sort_key_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

/// Sort key of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub ascending: bool,
}

impl OrderBy {
    /// Compare two rows on this key
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let ord = sort_key_cmp(
            a.get(&self.field).unwrap_or(&Value::Null),
            b.get(&self.field).unwrap_or(&Value::Null),
        );
        if self.ascending {
            ord
        } else {
            ord.reverse()
        }
    }
}

/// Many-to-one expansion: `row[alias] = collection[row[foreign_key]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expand {
    pub alias: String,
    pub collection: String,
    pub foreign_key: String,
    pub nested: Vec<Expand>,
}

impl Expand {
    pub fn new(alias: &str, collection: &str, foreign_key: &str) -> Self {
        Self {
            alias: alias.to_string(),
            collection: collection.to_string(),
            foreign_key: foreign_key.to_string(),
            nested: Vec::new(),
        }
    }

    /// Expand the related row further
    pub fn with(mut self, nested: Expand) -> Self {
        self.nested.push(nested);
        self
    }
}

/// A read against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub expand: Vec<Expand>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            expand: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(field, FilterOp::Eq, value))
    }

    pub fn neq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(field, FilterOp::Neq, value))
    }

    pub fn gt(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(field, FilterOp::Gt, value))
    }

    pub fn gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(field, FilterOp::Gte, value))
    }

    pub fn lt(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(field, FilterOp::Lt, value))
    }

    pub fn lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::new(field, FilterOp::Lte, value))
    }

    pub fn order_asc(mut self, field: &str) -> Self {
        self.order.push(OrderBy {
            field: field.to_string(),
            ascending: true,
        });
        self
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        self.order.push(OrderBy {
            field: field.to_string(),
            ascending: false,
        });
        self
    }

    pub fn expand(mut self, expand: Expand) -> Self {
        self.expand.push(expand);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate filters, ordering and limit over in-memory rows
    pub fn apply(&self, rows: impl IntoIterator<Item = Row>) -> Vec<Row> {
        let mut rows: Vec<Row> = rows
            .into_iter()
            .filter(|row| self.filters.iter().all(|f| f.matches(row)))
            .collect();

        if !self.order.is_empty() {
            rows.sort_by(|a, b| {
                self.order
                    .iter()
                    .map(|o| o.compare(a, b))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }
}

/// Column and collection names are spliced into SQL paths, so they are
/// restricted to `[A-Za-z0-9_]`.
pub fn validate_field(name: &str) -> PersistenceResult<()> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(PersistenceError::InvalidField(name.to_string()))
    }
}

/// Fill in `id` when the caller did not supply one.
pub(crate) fn ensure_id(row: &mut Row) -> String {
    match row.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let id = uuid::Uuid::new_v4().to_string();
            row.insert("id".to_string(), Value::String(id.clone()));
            id
        }
    }
}

/// Remote collection store.
///
/// `fetch` / `insert` / `update_where` / `delete` are backend specific;
/// `query` adds relational expansion on top of `fetch`.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Filtered, ordered, limited read without expansion
    async fn fetch(&self, query: &Query) -> PersistenceResult<Vec<Row>>;

    /// Insert a row, assigning `id` when absent. Returns the stored row.
    async fn insert(&self, collection: &str, row: Row) -> PersistenceResult<Row>;

    /// Merge `patch` into row `id` only if every `guard` filter still holds.
    ///
    /// Returns `false` when the row is missing or a guard failed. The check
    /// and the write happen in one step.
    async fn update_where(
        &self,
        collection: &str,
        id: &str,
        patch: Row,
        guard: &[Filter],
    ) -> PersistenceResult<bool>;

    async fn delete(&self, collection: &str, id: &str) -> PersistenceResult<()>;

    async fn query(&self, query: &Query) -> PersistenceResult<Vec<Row>> {
        let mut rows = self.fetch(query).await?;
        if !query.expand.is_empty() {
            expand_rows(self, &mut rows, &query.expand).await?;
        }
        Ok(rows)
    }

    async fn get(&self, collection: &str, id: &str) -> PersistenceResult<Option<Row>> {
        let rows = self.fetch(&Query::new(collection).eq("id", id).limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Unconditional update; a missing row is an error.
    async fn update(&self, collection: &str, id: &str, patch: Row) -> PersistenceResult<()> {
        if self.update_where(collection, id, patch, &[]).await? {
            Ok(())
        } else {
            Err(PersistenceError::not_found(collection, id))
        }
    }
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resolve `expands` for every row, recursing into nested expansions.
/// Dangling references expand to `null`.
pub fn expand_rows<'a, S>(
    store: &'a S,
    rows: &'a mut Vec<Row>,
    expands: &'a [Expand],
) -> BoxFuture<'a, PersistenceResult<()>>
where
    S: DataStore + ?Sized,
{
    Box::pin(async move {
        for expand in expands {
            for row in rows.iter_mut() {
                let related = match row.get(&expand.foreign_key).and_then(Value::as_str) {
                    Some(fk) => store.get(&expand.collection, fk).await?,
                    None => None,
                };

                let value = match related {
                    Some(related) if expand.nested.is_empty() => Value::Object(related),
                    Some(related) => {
                        let mut nested = vec![related];
                        expand_rows(store, &mut nested, &expand.nested).await?;
                        nested.pop().map(Value::Object).unwrap_or(Value::Null)
                    }
                    None => Value::Null,
                };
                row.insert(expand.alias.clone(), value);
            }
        }
        Ok(())
    })
}
