mod client;
mod ddl;
mod facade;
mod provisioner;

pub use client::{DatabaseClient, DatabaseError};
pub use facade::{QueryRewriter, ResolvedTable, RewriteError, RewriteOutcome};
pub use provisioner::{
    EnsuredColumn, EnsuredTrigger, ProvisionError, ProvisionSummary, SchemaProvisioner,
};
pub use row_meta_rewrite_rs::{MetaColumnConfig, TableRef, TableRefs};
