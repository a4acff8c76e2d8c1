use pg_query::protobuf;
use pg_query::protobuf::node::Node as PgNodeEnum;
use row_meta_rewrite_rs::{
    inject_meta_columns, resolve_statement_tables, MetaColumnConfig, ResolveOptions,
};

fn rewrite(sql: &str) -> String {
    rewrite_with(sql, &MetaColumnConfig::default())
}

fn rewrite_with(sql: &str, config: &MetaColumnConfig) -> String {
    let mut tree = pg_query::parse(sql).expect("test SQL must parse").protobuf;
    inject_meta_columns(&mut tree, config);
    pg_query::deparse(&tree).expect("rewritten tree must deparse")
}

fn parsed_target_names(sql: &str) -> Vec<String> {
    let tree = pg_query::parse(sql).expect("rewritten SQL must parse").protobuf;
    let Some(PgNodeEnum::SelectStmt(select)) =
        tree.stmts[0].stmt.as_ref().and_then(|node| node.node.as_ref())
    else {
        panic!("expected SELECT statement");
    };
    select
        .target_list
        .iter()
        .filter_map(|node| match node.node.as_ref() {
            Some(PgNodeEnum::ResTarget(target)) => Some(target.name.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn single_table_select_gains_meta_columns() {
    let rewritten = rewrite("SELECT name FROM users");
    assert_eq!(
        rewritten,
        "SELECT users.__id__ AS __id__, users.__rev__ AS __rev__, name FROM users"
    );
}

#[test]
fn meta_columns_come_first_regardless_of_user_columns() {
    for sql in [
        "SELECT * FROM users",
        "SELECT a, b, c FROM users",
        "SELECT count(*) AS total FROM users GROUP BY kind",
    ] {
        let names = parsed_target_names(&rewrite(sql));
        assert_eq!(&names[..2], ["__id__", "__rev__"], "for input {sql}");
    }
}

#[test]
fn joined_select_concatenates_identities_and_takes_greatest_revision() {
    let rewritten = rewrite("SELECT * FROM t1 JOIN t2 ON t1.id = t2.t1_id");
    assert!(rewritten.contains("t1.__id__"), "got: {rewritten}");
    assert!(rewritten.contains("t2.__id__"), "got: {rewritten}");
    assert!(
        rewritten.contains("GREATEST(t1.__rev__, t2.__rev__)"),
        "got: {rewritten}"
    );
}

#[test]
fn aliases_qualify_the_synthesized_columns() {
    let rewritten = rewrite("SELECT u.name FROM users u");
    assert!(rewritten.contains("u.__id__"), "got: {rewritten}");
    assert!(rewritten.contains("u.__rev__"), "got: {rewritten}");
}

#[test]
fn grouped_select_aggregates_revision_per_table() {
    let rewritten = rewrite("SELECT count(*) FROM orders GROUP BY customer_id");
    assert!(
        rewritten.contains("max(orders.__rev__)"),
        "got: {rewritten}"
    );
    assert!(rewritten.contains("md5(string_agg("), "got: {rewritten}");
    assert!(rewritten.contains("ORDER BY"), "got: {rewritten}");
    assert!(rewritten.contains("GROUP BY customer_id"), "got: {rewritten}");
}

#[test]
fn grouped_join_keeps_aggregate_inside_greatest() {
    let rewritten = rewrite(
        "SELECT count(*) FROM t1 JOIN t2 ON t1.id = t2.t1_id GROUP BY t1.kind",
    );
    assert!(
        rewritten.contains("GREATEST(max(t1.__rev__), max(t2.__rev__))"),
        "got: {rewritten}"
    );
}

#[test]
fn derived_table_outputs_are_reused_by_the_outer_select() {
    let rewritten = rewrite("SELECT * FROM (SELECT * FROM a) AS sub");
    assert!(rewritten.contains("sub.__id__"), "got: {rewritten}");
    assert!(rewritten.contains("sub.__rev__"), "got: {rewritten}");
    assert!(rewritten.contains("a.__id__"), "got: {rewritten}");

    // The outer body reads the derived table's synthesized outputs, never
    // the base table directly.
    let outer = rewritten.split("FROM").next().unwrap();
    assert!(outer.contains("sub.__id__"), "got: {outer}");
    assert!(!outer.contains("a.__id__"), "got: {outer}");
}

#[test]
fn nesting_composes_to_arbitrary_depth() {
    let rewritten =
        rewrite("SELECT * FROM (SELECT * FROM (SELECT * FROM a) AS inner_q) AS outer_q");
    let outer = rewritten.split("FROM").next().unwrap();
    assert!(outer.contains("outer_q.__id__"), "got: {rewritten}");
    assert!(rewritten.contains("inner_q.__id__"), "got: {rewritten}");
    assert!(rewritten.contains("a.__id__"), "got: {rewritten}");
}

#[test]
fn set_operation_arms_are_each_rewritten() {
    let rewritten = rewrite("SELECT id FROM a UNION ALL SELECT id FROM b");
    assert!(rewritten.contains("a.__id__"), "got: {rewritten}");
    assert!(rewritten.contains("b.__id__"), "got: {rewritten}");
}

#[test]
fn expression_subqueries_are_rewritten_at_their_own_depth() {
    let rewritten = rewrite("SELECT name FROM a WHERE id IN (SELECT a_id FROM b)");
    assert!(rewritten.contains("a.__id__"), "got: {rewritten}");
    assert!(rewritten.contains("b.__id__"), "got: {rewritten}");
}

#[test]
fn where_order_and_limit_are_untouched() {
    let rewritten =
        rewrite("SELECT name FROM users WHERE active ORDER BY name LIMIT 10");
    assert!(rewritten.contains("WHERE active"), "got: {rewritten}");
    assert!(rewritten.contains("ORDER BY name"), "got: {rewritten}");
    assert!(rewritten.contains("LIMIT 10"), "got: {rewritten}");
}

#[test]
fn select_without_from_is_untouched() {
    let mut tree = pg_query::parse("SELECT 1").unwrap().protobuf;
    let before = pg_query::deparse(&tree).unwrap();
    inject_meta_columns(&mut tree, &MetaColumnConfig::default());
    assert_eq!(pg_query::deparse(&tree).unwrap(), before);
}

#[test]
fn non_select_statements_are_untouched() {
    let mut tree = pg_query::parse("INSERT INTO t (a) VALUES (1)").unwrap().protobuf;
    let before = pg_query::deparse(&tree).unwrap();
    inject_meta_columns(&mut tree, &MetaColumnConfig::default());
    assert_eq!(pg_query::deparse(&tree).unwrap(), before);
}

#[test]
fn unresolvable_from_sources_are_skipped() {
    let mut tree = pg_query::parse("SELECT * FROM generate_series(1, 10)")
        .unwrap()
        .protobuf;
    let before = pg_query::deparse(&tree).unwrap();
    inject_meta_columns(&mut tree, &MetaColumnConfig::default());
    assert_eq!(pg_query::deparse(&tree).unwrap(), before);
}

#[test]
fn repeated_rewrites_are_byte_identical() {
    let sql = "SELECT u.name, count(*) FROM users u JOIN orders o ON o.user_id = u.id \
               WHERE u.active GROUP BY u.name";
    assert_eq!(rewrite(sql), rewrite(sql));
}

#[test]
fn configured_names_flow_through_the_rewrite() {
    let config = MetaColumnConfig {
        identity_column: "__row_key__".to_string(),
        revision_column: "__version__".to_string(),
        default_schema: "public".to_string(),
    };
    let rewritten = rewrite_with("SELECT name FROM users", &config);
    assert!(rewritten.contains("users.__row_key__"), "got: {rewritten}");
    assert!(rewritten.contains("users.__version__"), "got: {rewritten}");
}

#[test]
fn top_level_resolution_reports_base_and_derived_tables() {
    let tree = pg_query::parse("SELECT * FROM users u, (SELECT * FROM a) AS sub")
        .unwrap()
        .protobuf;
    let refs = resolve_statement_tables(
        &tree,
        ResolveOptions {
            top_level_only: true,
            include_subselects: true,
        },
    );
    let keys = refs.iter().map(|table| table.key()).collect::<Vec<_>>();
    assert_eq!(keys, vec!["users", "__subselect__.sub"]);
}

#[test]
fn provisioning_resolution_reaches_every_depth() {
    let tree = pg_query::parse(
        "SELECT * FROM a JOIN (SELECT * FROM b) AS sub ON sub.id = a.b_id \
         WHERE a.x IN (SELECT y FROM c)",
    )
    .unwrap()
    .protobuf;
    let refs = resolve_statement_tables(&tree, ResolveOptions::default());
    let keys = refs.iter().map(|table| table.key()).collect::<Vec<_>>();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

fn meta_targets_of_first_statement(tree: &protobuf::ParseResult) -> usize {
    let Some(PgNodeEnum::SelectStmt(select)) =
        tree.stmts[0].stmt.as_ref().and_then(|node| node.node.as_ref())
    else {
        return 0;
    };
    select.target_list.len()
}

#[test]
fn injection_is_applied_once_per_call() {
    let mut tree = pg_query::parse("SELECT name FROM users").unwrap().protobuf;
    inject_meta_columns(&mut tree, &MetaColumnConfig::default());
    assert_eq!(meta_targets_of_first_statement(&tree), 3);
}
