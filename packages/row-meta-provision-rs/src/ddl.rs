use row_meta_rewrite_rs::MetaColumnConfig;

pub(crate) const CATALOG_COLUMNS_SQL: &str = "SELECT table_schema::text, table_name::text, \
     column_name::text FROM information_schema.columns WHERE column_name IN ($1, $2)";

pub(crate) const CATALOG_TRIGGERS_SQL: &str = "SELECT DISTINCT trigger_schema::text, \
     event_object_table::text FROM information_schema.triggers WHERE trigger_name = $1";

// Embedded double quotes double in identifiers; embedded single quotes
// double in string literals. The two never mix.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn qualified_name(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

fn sequence_reference(config: &MetaColumnConfig) -> String {
    quote_literal(&qualified_name(
        &config.default_schema,
        &config.sequence_name(),
    ))
}

pub(crate) fn create_sequence_sql(config: &MetaColumnConfig) -> String {
    format!(
        "CREATE SEQUENCE IF NOT EXISTS {}",
        qualified_name(&config.default_schema, &config.sequence_name())
    )
}

pub(crate) fn create_stamp_function_sql(config: &MetaColumnConfig) -> String {
    format!(
        "CREATE OR REPLACE FUNCTION {}() RETURNS trigger LANGUAGE plpgsql AS $stamp$\n\
         BEGIN\n    NEW.{} := nextval({});\n    RETURN NEW;\nEND;\n$stamp$",
        qualified_name(&config.default_schema, &config.stamp_function_name()),
        quote_ident(&config.revision_column),
        sequence_reference(config),
    )
}

pub(crate) fn add_identity_column_sql(schema: &str, table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} BIGSERIAL",
        qualified_name(schema, table),
        quote_ident(column),
    )
}

pub(crate) fn add_revision_column_sql(
    schema: &str,
    table: &str,
    column: &str,
    config: &MetaColumnConfig,
) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} BIGINT NOT NULL DEFAULT nextval({})",
        qualified_name(schema, table),
        quote_ident(column),
        sequence_reference(config),
    )
}

pub(crate) fn create_trigger_sql(schema: &str, table: &str, config: &MetaColumnConfig) -> String {
    format!(
        "CREATE OR REPLACE TRIGGER {} BEFORE INSERT OR UPDATE ON {} \
         FOR EACH ROW EXECUTE FUNCTION {}()",
        quote_ident(&config.trigger_name()),
        qualified_name(schema, table),
        qualified_name(&config.default_schema, &config.stamp_function_name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    include!("ddl/tests_internal.rs");
}
