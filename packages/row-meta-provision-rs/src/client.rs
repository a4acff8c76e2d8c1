use async_trait::async_trait;
use thiserror::Error;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("database error: {0}")]
pub struct DatabaseError(pub String);

/// Minimal asynchronous database surface the provisioner runs against.
/// Catalog lookups are parameterized; DDL statements are literal text.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Vec<String>>, DatabaseError>;

    async fn execute(&self, sql: &str) -> Result<(), DatabaseError>;
}

#[async_trait]
impl DatabaseClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Vec<String>>, DatabaseError> {
        let params = params
            .iter()
            .map(|value| value as &(dyn ToSql + Sync))
            .collect::<Vec<_>>();
        let rows = tokio_postgres::Client::query(self, sql, &params)
            .await
            .map_err(|error| DatabaseError(error.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut values = Vec::with_capacity(row.len());
            for index in 0..row.len() {
                values.push(
                    row.try_get::<_, String>(index)
                        .map_err(|error| DatabaseError(error.to_string()))?,
                );
            }
            out.push(values);
        }
        Ok(out)
    }

    async fn execute(&self, sql: &str) -> Result<(), DatabaseError> {
        self.batch_execute(sql)
            .await
            .map_err(|error| DatabaseError(error.to_string()))
    }
}
