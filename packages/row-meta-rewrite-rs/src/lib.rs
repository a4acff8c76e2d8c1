use pg_query::protobuf;
use pg_query::protobuf::node::Node as PgNodeEnum;
use serde::{Deserialize, Serialize};

/// Reserved schema placeholder used to key derived-table references.
pub const SUBSELECT_PLACEHOLDER: &str = "__subselect__";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaColumnConfig {
    pub identity_column: String,
    pub revision_column: String,
    pub default_schema: String,
}

impl Default for MetaColumnConfig {
    fn default() -> Self {
        Self {
            identity_column: "__id__".to_string(),
            revision_column: "__rev__".to_string(),
            default_schema: "public".to_string(),
        }
    }
}

impl MetaColumnConfig {
    pub fn sequence_name(&self) -> String {
        format!("{}_seq", self.revision_column)
    }

    pub fn stamp_function_name(&self) -> String {
        format!("{}_stamp", self.revision_column)
    }

    pub fn trigger_name(&self) -> String {
        format!("{}_trg", self.revision_column)
    }
}

include!("rewriter/table_refs.rs");
include!("rewriter/expr_build.rs");
include!("rewriter/inject.rs");

#[cfg(test)]
mod tests {
    use super::*;

    include!("rewriter/tests_internal.rs");
}
