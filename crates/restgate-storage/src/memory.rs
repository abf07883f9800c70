//! In-memory storage backend.
//!
//! Collections of JSON records guarded by an async `RwLock`; queries run
//! against a snapshot taken when the query is opened, so a long
//! execution never observes a half-applied mutation.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use restgate_query::{FilterOperator, Relation, SortDirection};

use crate::traits::{FilterableQuery, StorageError};

/// A process-local record store keyed by collection name.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Value>>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a collection's records wholesale.
    pub async fn seed(&self, collection: &str, records: Vec<Value>) {
        let mut collections = self.collections.write().await;
        collections.insert(collection.to_string(), records);
    }

    /// Inserts a record, assigning a generated `id` when absent, and
    /// returns the stored record.
    pub async fn insert(&self, collection: &str, mut record: Value) -> Value {
        if let Value::Object(object) = &mut record
            && !object.contains_key("id")
        {
            object.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    /// Merges `patch`'s fields into the record with the given id and
    /// returns the updated record, or `None` when the id is unknown.
    pub async fn update(&self, collection: &str, id: &str, patch: &Value) -> Option<Value> {
        let mut collections = self.collections.write().await;
        let records = collections.get_mut(collection)?;
        let record = records.iter_mut().find(|record| record_id(record) == Some(id))?;
        if let (Value::Object(target), Value::Object(fields)) = (&mut *record, patch) {
            for (key, value) in fields {
                if key != "id" {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        Some(record.clone())
    }

    /// Removes the record with the given id; returns whether one existed.
    pub async fn delete(&self, collection: &str, id: &str) -> bool {
        let mut collections = self.collections.write().await;
        let Some(records) = collections.get_mut(collection) else {
            return false;
        };
        let before = records.len();
        records.retain(|record| record_id(record) != Some(id));
        records.len() != before
    }

    pub async fn get(&self, collection: &str, id: &str) -> Option<Value> {
        let collections = self.collections.read().await;
        collections
            .get(collection)?
            .iter()
            .find(|record| record_id(record) == Some(id))
            .cloned()
    }

    /// Opens a query over a snapshot of the collection. An unknown
    /// collection yields an empty snapshot.
    pub async fn query(&self, collection: &str) -> MemoryQuery {
        let collections = self.collections.read().await;
        MemoryQuery::new(collections.get(collection).cloned().unwrap_or_default())
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// A single accumulated predicate.
#[derive(Debug, Clone)]
struct Predicate {
    relation: Relation,
    field: String,
    operator: FilterOperator,
    value: String,
}

impl Predicate {
    fn matches(&self, record: &Value) -> bool {
        record
            .get(&self.field)
            .is_some_and(|actual| compare(actual, self.operator, &self.value))
    }
}

/// Comparison is numeric when both sides parse as numbers,
/// lexicographic otherwise.
fn compare(actual: &Value, operator: FilterOperator, expected: &str) -> bool {
    let actual = match actual {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return false,
    };
    if let (Ok(a), Ok(b)) = (actual.parse::<f64>(), expected.parse::<f64>()) {
        match operator {
            FilterOperator::Eq => a == b,
            FilterOperator::Gt => a > b,
            FilterOperator::Lt => a < b,
        }
    } else {
        match operator {
            FilterOperator::Eq => actual == expected,
            FilterOperator::Gt => actual.as_str() > expected,
            FilterOperator::Lt => actual.as_str() < expected,
        }
    }
}

/// Sort comparison over optional field values: absent sorts first,
/// numbers numerically, everything else by string form.
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => value_string(x).cmp(&value_string(y)),
    }
}

fn value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A filterable query over an in-memory snapshot.
#[derive(Debug)]
pub struct MemoryQuery {
    records: Vec<Value>,
    predicates: Vec<Predicate>,
    order: Option<(String, SortDirection)>,
    offset: usize,
    limit: Option<usize>,
}

impl MemoryQuery {
    fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            predicates: Vec::new(),
            order: None,
            offset: 0,
            limit: None,
        }
    }

    /// Left-to-right fold over the predicates: `and` narrows the
    /// accumulated verdict, `or` widens it.
    fn matches(&self, record: &Value) -> bool {
        let mut verdict = true;
        for (index, predicate) in self.predicates.iter().enumerate() {
            let hit = predicate.matches(record);
            verdict = if index == 0 {
                hit
            } else {
                match predicate.relation {
                    Relation::And => verdict && hit,
                    Relation::Or => verdict || hit,
                }
            };
        }
        verdict
    }

    fn push(&mut self, relation: Relation, field: &str, operator: FilterOperator, value: &str) {
        self.predicates.push(Predicate {
            relation,
            field: field.to_string(),
            operator,
            value: value.to_string(),
        });
    }
}

#[async_trait]
impl FilterableQuery for MemoryQuery {
    fn and_where(&mut self, field: &str, operator: FilterOperator, value: &str) {
        self.push(Relation::And, field, operator, value);
    }

    fn or_where(&mut self, field: &str, operator: FilterOperator, value: &str) {
        self.push(Relation::Or, field, operator, value);
    }

    fn order_by(&mut self, column: &str, direction: SortDirection) {
        self.order = Some((column.to_string(), direction));
    }

    fn offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    fn limit(&mut self, limit: usize) {
        self.limit = Some(limit);
    }

    async fn execute(&mut self) -> Result<Vec<Value>, StorageError> {
        let mut rows: Vec<Value> = self
            .records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect();

        if let Some((column, direction)) = &self.order {
            rows.sort_by(|a, b| {
                let ordering = compare_for_sort(a.get(column), b.get(column));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let rows = rows
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(rows)
    }
}
