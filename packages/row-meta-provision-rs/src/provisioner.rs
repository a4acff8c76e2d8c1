use crate::client::{DatabaseClient, DatabaseError};
use crate::ddl;
use dashmap::DashMap;
use futures::future::try_join_all;
use pg_query::protobuf;
use row_meta_rewrite_rs::{resolve_statement_tables, MetaColumnConfig, ResolveOptions};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProvisionError {
    #[error("catalog query failed: {0}")]
    Catalog(String),
    #[error("ddl statement failed: {0}")]
    Ddl(String),
}

fn catalog_error(error: DatabaseError) -> ProvisionError {
    ProvisionError::Catalog(error.0)
}

fn ddl_error(error: DatabaseError) -> ProvisionError {
    ProvisionError::Ddl(error.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ObjectKind {
    IdentityColumn,
    RevisionColumn,
    Trigger,
}

// First requester for a key creates the cell and runs the DDL; everyone
// else awaits the same cell. A stored Err stays stored.
type CreationCell = Arc<OnceCell<Result<bool, ProvisionError>>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsuredColumn {
    pub table: String,
    pub column: String,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsuredTrigger {
    pub table: String,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionSummary {
    pub columns: Vec<EnsuredColumn>,
    pub triggers: Vec<EnsuredTrigger>,
}

pub struct SchemaProvisioner {
    config: MetaColumnConfig,
    client: Arc<dyn DatabaseClient>,
    bootstrap: OnceCell<Result<(), ProvisionError>>,
    cache: DashMap<(ObjectKind, String), CreationCell>,
}

impl SchemaProvisioner {
    pub fn new(client: Arc<dyn DatabaseClient>, config: MetaColumnConfig) -> Self {
        Self {
            config,
            client,
            bootstrap: OnceCell::new(),
            cache: DashMap::new(),
        }
    }

    pub fn config(&self) -> &MetaColumnConfig {
        &self.config
    }

    fn column_kind(&self, column: &str) -> ObjectKind {
        if column == self.config.identity_column {
            ObjectKind::IdentityColumn
        } else {
            ObjectKind::RevisionColumn
        }
    }

    fn creation_cell(&self, kind: ObjectKind, key: &str) -> CreationCell {
        self.cache
            .entry((kind, key.to_string()))
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn seed_existing(&self, kind: ObjectKind, key: &str) {
        let cell = self.creation_cell(kind, key);
        let _ = cell.set(Ok(false));
    }

    async fn run_bootstrap(&self) -> Result<(), ProvisionError> {
        debug!("seeding provisioning cache from catalog");
        let columns = self
            .client
            .query(
                ddl::CATALOG_COLUMNS_SQL,
                &[
                    self.config.identity_column.as_str(),
                    self.config.revision_column.as_str(),
                ],
            )
            .await
            .map_err(catalog_error)?;
        for row in &columns {
            let [schema, table, column] = row.as_slice() else {
                continue;
            };
            self.seed_existing(self.column_kind(column), &format!("{schema}.{table}"));
        }

        let trigger_name = self.config.trigger_name();
        let triggers = self
            .client
            .query(ddl::CATALOG_TRIGGERS_SQL, &[trigger_name.as_str()])
            .await
            .map_err(catalog_error)?;
        for row in &triggers {
            let [schema, table] = row.as_slice() else {
                continue;
            };
            self.seed_existing(ObjectKind::Trigger, &format!("{schema}.{table}"));
        }

        self.client
            .execute(&ddl::create_sequence_sql(&self.config))
            .await
            .map_err(ddl_error)?;
        self.client
            .execute(&ddl::create_stamp_function_sql(&self.config))
            .await
            .map_err(ddl_error)?;

        debug!(seeded = self.cache.len(), "schema bootstrap complete");
        Ok(())
    }

    async fn ensure_bootstrap(&self) -> Result<(), ProvisionError> {
        self.bootstrap
            .get_or_init(|| self.run_bootstrap())
            .await
            .clone()
    }

    pub async fn ensure_column(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
    ) -> Result<EnsuredColumn, ProvisionError> {
        self.ensure_bootstrap().await?;

        let schema = schema.unwrap_or(&self.config.default_schema);
        let key = format!("{schema}.{table}");
        let kind = self.column_kind(column);
        let cell = self.creation_cell(kind, &key);
        let created = cell
            .get_or_init(|| async {
                let sql = match kind {
                    ObjectKind::RevisionColumn => {
                        ddl::add_revision_column_sql(schema, table, column, &self.config)
                    }
                    _ => ddl::add_identity_column_sql(schema, table, column),
                };
                info!(table = %key, %column, "adding meta column");
                self.client.execute(&sql).await.map(|_| true).map_err(ddl_error)
            })
            .await
            .clone()?;

        Ok(EnsuredColumn {
            table: key,
            column: column.to_string(),
            created,
        })
    }

    pub async fn ensure_trigger(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> Result<EnsuredTrigger, ProvisionError> {
        self.ensure_bootstrap().await?;

        let schema = schema.unwrap_or(&self.config.default_schema);
        let key = format!("{schema}.{table}");
        let cell = self.creation_cell(ObjectKind::Trigger, &key);
        let created = cell
            .get_or_init(|| async {
                let sql = ddl::create_trigger_sql(schema, table, &self.config);
                info!(table = %key, "adding stamp trigger");
                self.client.execute(&sql).await.map(|_| true).map_err(ddl_error)
            })
            .await
            .clone()?;

        Ok(EnsuredTrigger {
            table: key,
            created,
        })
    }

    /// Resolves every base table at every depth of the statement tree and
    /// joins the column and trigger provisioning for all of them. The
    /// rewritten query is only executable once this completes.
    pub async fn ensure_objects(
        &self,
        tree: &protobuf::ParseResult,
    ) -> Result<ProvisionSummary, ProvisionError> {
        self.ensure_bootstrap().await?;

        let refs = resolve_statement_tables(
            tree,
            ResolveOptions {
                top_level_only: false,
                include_subselects: false,
            },
        );
        let tables = refs.iter().filter(|table| table.is_base()).collect::<Vec<_>>();

        let columns = try_join_all(
            tables
                .iter()
                .map(|table| {
                    self.ensure_column(
                        table.schema.as_deref(),
                        table.table.as_deref().unwrap_or_default(),
                        &self.config.identity_column,
                    )
                })
                .chain(tables.iter().map(|table| {
                    self.ensure_column(
                        table.schema.as_deref(),
                        table.table.as_deref().unwrap_or_default(),
                        &self.config.revision_column,
                    )
                })),
        );
        let triggers = try_join_all(tables.iter().map(|table| {
            self.ensure_trigger(
                table.schema.as_deref(),
                table.table.as_deref().unwrap_or_default(),
            )
        }));

        let (columns, triggers) = tokio::try_join!(columns, triggers)?;
        Ok(ProvisionSummary { columns, triggers })
    }
}
