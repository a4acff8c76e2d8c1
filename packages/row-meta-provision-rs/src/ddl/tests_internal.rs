#[test]
fn identifier_quoting_doubles_embedded_double_quotes() {
    assert_eq!(quote_ident("plain"), "\"plain\"");
    assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
}

#[test]
fn literal_quoting_doubles_embedded_single_quotes() {
    assert_eq!(quote_literal("plain"), "'plain'");
    assert_eq!(quote_literal("it's"), "'it''s'");
    // Double quotes pass through literals untouched.
    assert_eq!(quote_literal("a\"b"), "'a\"b'");
}

#[test]
fn sequence_ddl_is_create_if_absent() {
    let sql = create_sequence_sql(&MetaColumnConfig::default());
    assert_eq!(
        sql,
        "CREATE SEQUENCE IF NOT EXISTS \"public\".\"__rev___seq\""
    );
}

#[test]
fn stamp_function_assigns_next_revision() {
    let sql = create_stamp_function_sql(&MetaColumnConfig::default());
    assert!(sql.starts_with(
        "CREATE OR REPLACE FUNCTION \"public\".\"__rev___stamp\"() RETURNS trigger"
    ));
    assert!(sql.contains("NEW.\"__rev__\" := nextval('\"public\".\"__rev___seq\"')"));
}

#[test]
fn identity_column_is_auto_incrementing() {
    assert_eq!(
        add_identity_column_sql("public", "users", "__id__"),
        "ALTER TABLE \"public\".\"users\" ADD COLUMN IF NOT EXISTS \"__id__\" BIGSERIAL"
    );
}

#[test]
fn revision_column_defaults_to_shared_sequence() {
    let sql = add_revision_column_sql("public", "users", "__rev__", &MetaColumnConfig::default());
    assert!(sql.contains("\"__rev__\" BIGINT NOT NULL DEFAULT nextval"));
    assert!(sql.contains("'\"public\".\"__rev___seq\"'"));
}

#[test]
fn trigger_fires_before_insert_or_update_per_row() {
    let sql = create_trigger_sql("public", "users", &MetaColumnConfig::default());
    assert!(sql.contains("CREATE OR REPLACE TRIGGER \"__rev___trg\""));
    assert!(sql.contains("BEFORE INSERT OR UPDATE ON \"public\".\"users\""));
    assert!(sql.contains("FOR EACH ROW EXECUTE FUNCTION \"public\".\"__rev___stamp\"()"));
}
