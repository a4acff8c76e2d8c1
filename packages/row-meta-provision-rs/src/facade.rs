use crate::client::DatabaseClient;
use crate::provisioner::{ProvisionError, SchemaProvisioner};
use row_meta_rewrite_rs::{
    inject_meta_columns, resolve_statement_tables, MetaColumnConfig, ResolveOptions, TableRefs,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RewriteError {
    #[error("sql parse error: {0}")]
    Parse(String),
    #[error("sql deparse error: {0}")]
    Deparse(String),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTable {
    pub key: String,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewriteOutcome {
    pub sql: String,
    pub tables: Vec<ResolvedTable>,
}

pub struct QueryRewriter {
    config: MetaColumnConfig,
    provisioner: SchemaProvisioner,
}

impl QueryRewriter {
    pub fn new(client: Arc<dyn DatabaseClient>, config: MetaColumnConfig) -> Self {
        Self {
            config: config.clone(),
            provisioner: SchemaProvisioner::new(client, config),
        }
    }

    pub fn provisioner(&self) -> &SchemaProvisioner {
        &self.provisioner
    }

    /// Parse, provision, inject, deparse. Provisioning is fully joined
    /// before the rewritten text exists, so returned SQL is executable.
    pub async fn rewrite(&self, sql: &str) -> Result<RewriteOutcome, RewriteError> {
        let parsed =
            pg_query::parse(sql).map_err(|error| RewriteError::Parse(error.to_string()))?;
        let mut tree = parsed.protobuf;

        self.provisioner.ensure_objects(&tree).await?;

        let refs = resolve_statement_tables(
            &tree,
            ResolveOptions {
                top_level_only: true,
                include_subselects: true,
            },
        );
        inject_meta_columns(&mut tree, &self.config);

        let rewritten =
            pg_query::deparse(&tree).map_err(|error| RewriteError::Deparse(error.to_string()))?;

        Ok(RewriteOutcome {
            sql: rewritten,
            tables: resolved_tables(&refs),
        })
    }
}

fn resolved_tables(refs: &TableRefs) -> Vec<ResolvedTable> {
    refs.iter()
        .map(|table| ResolvedTable {
            key: table.key(),
            schema: table.schema.clone(),
            table: table.table.clone(),
            alias: table.alias.clone(),
        })
        .collect()
}
