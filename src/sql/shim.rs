//! SQL Compatibility Shim
//!
//! Migration aid: call sites written against a row-oriented query interface
//! keep working while the underlying store speaks documents. Exactly four
//! verbs are translated onto the collection accessor; BEGIN/COMMIT/ROLLBACK
//! are accepted as logged no-ops. Everything else is rejected outright.

use super::ast::{Condition, Statement};
use super::parser::parse;
use crate::accessor::Collections;
use crate::error::{Result, StoreError};
use crate::schema::EntityKind;
use crate::store::{Document, Filter, FindOptions};
use serde_json::Value;
use tracing::debug;

/// Row-oriented result shape: `rows` for SELECT/INSERT, `row_count` for
/// UPDATE/DELETE.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<Document>,
    pub row_count: Option<u64>,
}

pub struct SqlShim {
    collections: Collections,
}

impl SqlShim {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    /// Execute one SQL statement with positional parameters.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let statement = parse(sql).map_err(|reason| StoreError::UnparseableStatement {
            statement: sql.to_string(),
            reason,
        })?;

        match statement {
            Statement::Select {
                table,
                filter,
                order_by,
                limit,
            } => {
                let kind = resolve_table(&table)?;
                let filter = bind_filter(sql, &filter, params)?;

                let mut options = FindOptions::default();
                options.sort = order_by;
                options.limit = limit;

                let rows = self
                    .collections
                    .find(kind.collection(), &filter, options)
                    .await?;

                Ok(QueryResult {
                    rows,
                    row_count: None,
                })
            }

            Statement::Insert { table } => {
                let kind = resolve_table(&table)?;

                let payload = params.first().ok_or_else(|| StoreError::MissingParameters {
                    statement: sql.to_string(),
                })?;
                let doc = match payload {
                    Value::Object(map) => map.clone(),
                    _ => {
                        return Err(StoreError::Validation {
                            collection: kind.collection().to_string(),
                            message: "INSERT payload must be a JSON object".to_string(),
                        });
                    }
                };

                let stored = self.collections.insert_one(kind.collection(), doc).await?;

                Ok(QueryResult {
                    rows: vec![stored],
                    row_count: None,
                })
            }

            Statement::Update {
                table,
                assignments,
                filter,
            } => {
                let kind = resolve_table(&table)?;
                let filter = bind_filter(sql, &filter, params)?;

                let mut patch = Document::new();
                for assignment in &assignments {
                    patch.insert(
                        assignment.field.clone(),
                        bind_param(sql, assignment.param, params)?,
                    );
                }

                let modified = self
                    .collections
                    .update_many(kind.collection(), &filter, patch)
                    .await?;

                Ok(QueryResult {
                    rows: Vec::new(),
                    row_count: Some(modified),
                })
            }

            Statement::Delete { table, filter } => {
                let kind = resolve_table(&table)?;
                let filter = bind_filter(sql, &filter, params)?;

                let deleted = self
                    .collections
                    .delete_many(kind.collection(), &filter)
                    .await?;

                Ok(QueryResult {
                    rows: Vec::new(),
                    row_count: Some(deleted),
                })
            }

            Statement::Begin | Statement::Commit | Statement::Rollback => {
                debug!(
                    "{:?} accepted as a no-op; the document store's transaction semantics are not engaged",
                    statement
                );
                Ok(QueryResult::default())
            }
        }
    }
}

/// Title-case the parsed identifier and look it up against registered schema
/// names. No pluralization or snake_case handling.
fn resolve_table(table: &str) -> Result<EntityKind> {
    let name = title_case(table);
    EntityKind::resolve(&name).ok_or(StoreError::SchemaNotFound { name })
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn bind_filter(sql: &str, conditions: &[Condition], params: &[Value]) -> Result<Filter> {
    let mut filter = Filter::new();
    for condition in conditions {
        filter.insert(
            condition.field.clone(),
            bind_param(sql, condition.param, params)?,
        );
    }
    Ok(filter)
}

/// Map a 1-based `$N` reference onto the parameter list. Repeated references
/// to the same index each resolve to the same value.
fn bind_param(sql: &str, index: usize, params: &[Value]) -> Result<Value> {
    params
        .get(index - 1)
        .cloned()
        .ok_or_else(|| StoreError::UnparseableStatement {
            statement: sql.to_string(),
            reason: format!(
                "parameter ${} is out of range ({} parameters supplied)",
                index,
                params.len()
            ),
        })
}
