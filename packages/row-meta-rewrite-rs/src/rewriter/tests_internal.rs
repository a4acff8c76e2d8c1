const ALL: ResolveOptions = ResolveOptions {
    top_level_only: false,
    include_subselects: false,
};

const TOP_LEVEL: ResolveOptions = ResolveOptions {
    top_level_only: true,
    include_subselects: true,
};

fn parse_tree(sql: &str) -> protobuf::ParseResult {
    pg_query::parse(sql).expect("test SQL must parse").protobuf
}

fn resolve(sql: &str, options: ResolveOptions) -> TableRefs {
    resolve_statement_tables(&parse_tree(sql), options)
}

fn keys(refs: &TableRefs) -> Vec<String> {
    refs.iter().map(TableRef::key).collect()
}

fn first_select(tree: &protobuf::ParseResult) -> &protobuf::SelectStmt {
    match tree.stmts[0].stmt.as_ref().and_then(|node| node.node.as_ref()) {
        Some(PgNodeEnum::SelectStmt(select)) => select,
        other => panic!("expected SELECT statement, got {other:?}"),
    }
}

fn target_names(select: &protobuf::SelectStmt) -> Vec<String> {
    select
        .target_list
        .iter()
        .filter_map(|node| match node.node.as_ref() {
            Some(PgNodeEnum::ResTarget(target)) => Some(target.name.clone()),
            _ => None,
        })
        .collect()
}

fn func_name(node: &protobuf::Node) -> Option<String> {
    match node.node.as_ref() {
        Some(PgNodeEnum::FuncCall(call)) => {
            match call.funcname.first().and_then(|part| part.node.as_ref()) {
                Some(PgNodeEnum::String(value)) => Some(value.sval.clone()),
                _ => None,
            }
        }
        _ => None,
    }
}

#[test]
fn resolves_base_table_with_alias() {
    let refs = resolve("SELECT * FROM users u", TOP_LEVEL);
    assert_eq!(keys(&refs), vec!["users"]);
    let table = refs.get("users").unwrap();
    assert_eq!(table.alias.as_deref(), Some("u"));
    assert!(table.is_base());
}

#[test]
fn resolves_schema_qualified_table() {
    let refs = resolve("SELECT * FROM app.users", TOP_LEVEL);
    assert_eq!(keys(&refs), vec!["app.users"]);
    assert_eq!(refs.get("app.users").unwrap().schema.as_deref(), Some("app"));
}

#[test]
fn collapses_repeated_unaliased_self_reference() {
    // The key has no positional disambiguator, so both references land on
    // the same entry.
    let refs = resolve("SELECT * FROM users, users", TOP_LEVEL);
    assert_eq!(refs.len(), 1);
}

#[test]
fn preserves_discovery_order_across_joins() {
    let refs = resolve(
        "SELECT * FROM a JOIN b ON a.id = b.a_id JOIN c ON b.id = c.b_id",
        TOP_LEVEL,
    );
    assert_eq!(keys(&refs), vec!["a", "b", "c"]);
}

#[test]
fn captures_aliased_subselect_as_placeholder() {
    let refs = resolve("SELECT * FROM (SELECT * FROM a) AS sub", TOP_LEVEL);
    assert_eq!(keys(&refs), vec!["__subselect__.sub"]);
    assert!(!refs.get("__subselect__.sub").unwrap().is_base());
}

#[test]
fn full_resolution_descends_into_subselects() {
    let refs = resolve("SELECT * FROM (SELECT * FROM a) AS sub", ALL);
    assert_eq!(keys(&refs), vec!["a"]);
}

#[test]
fn full_resolution_descends_into_sublinks() {
    let refs = resolve("SELECT * FROM a WHERE id IN (SELECT a_id FROM b)", ALL);
    assert_eq!(keys(&refs), vec!["a", "b"]);
}

#[test]
fn top_level_resolution_stops_at_sublinks() {
    let refs = resolve(
        "SELECT * FROM a WHERE id IN (SELECT a_id FROM b)",
        TOP_LEVEL,
    );
    assert_eq!(keys(&refs), vec!["a"]);
}

#[test]
fn full_resolution_descends_into_cte_bodies() {
    let refs = resolve("WITH x AS (SELECT * FROM inner_t) SELECT * FROM x", ALL);
    assert!(refs.get("inner_t").is_some());
    assert!(refs.get("x").is_some());
}

#[test]
fn unaliased_subselect_is_silently_skipped() {
    let mut refs = TableRefs::new();
    let tree = parse_tree("SELECT * FROM (SELECT * FROM a) AS sub");
    let select = first_select(&tree);
    let mut stripped = select.clone();
    for item in &mut stripped.from_clause {
        if let Some(PgNodeEnum::RangeSubselect(subselect)) = item.node.as_mut() {
            subselect.alias = None;
        }
    }
    resolve_select_tables(&stripped, TOP_LEVEL, &mut refs);
    assert!(refs.is_empty());
}

#[test]
fn identity_for_single_table_is_bare_column_reference() {
    let refs = resolve("SELECT * FROM users", TOP_LEVEL);
    let node = composite_identity(&refs, false, &MetaColumnConfig::default()).unwrap();
    assert!(matches!(node.node.as_ref(), Some(PgNodeEnum::ColumnRef(_))));
}

#[test]
fn identity_for_two_tables_is_concatenation() {
    let refs = resolve("SELECT * FROM a, b", TOP_LEVEL);
    let node = composite_identity(&refs, false, &MetaColumnConfig::default()).unwrap();
    assert!(matches!(node.node.as_ref(), Some(PgNodeEnum::AExpr(_))));
}

#[test]
fn grouped_identity_hashes_an_ordered_fold() {
    let refs = resolve("SELECT * FROM users", TOP_LEVEL);
    let node = composite_identity(&refs, true, &MetaColumnConfig::default()).unwrap();
    assert_eq!(func_name(&node).as_deref(), Some("md5"));
    let Some(PgNodeEnum::FuncCall(md5)) = node.node.as_ref() else {
        panic!("expected function call");
    };
    let fold = &md5.args[0];
    assert_eq!(func_name(fold).as_deref(), Some("string_agg"));
    let Some(PgNodeEnum::FuncCall(agg)) = fold.node.as_ref() else {
        panic!("expected function call");
    };
    assert_eq!(agg.agg_order.len(), 1);
}

#[test]
fn revision_for_single_table_is_bare_column_reference() {
    let refs = resolve("SELECT * FROM users", TOP_LEVEL);
    let node = composite_revision(&refs, false, &MetaColumnConfig::default()).unwrap();
    assert!(matches!(node.node.as_ref(), Some(PgNodeEnum::ColumnRef(_))));
}

#[test]
fn revision_for_joined_tables_uses_greatest() {
    let refs = resolve("SELECT * FROM a, b", TOP_LEVEL);
    let node = composite_revision(&refs, false, &MetaColumnConfig::default()).unwrap();
    let Some(PgNodeEnum::MinMaxExpr(minmax)) = node.node.as_ref() else {
        panic!("expected GREATEST expression");
    };
    assert_eq!(minmax.op, protobuf::MinMaxOp::IsGreatest as i32);
    assert_eq!(minmax.args.len(), 2);
}

#[test]
fn grouped_revision_aggregates_before_greatest() {
    let refs = resolve("SELECT * FROM a, b", TOP_LEVEL);
    let node = composite_revision(&refs, true, &MetaColumnConfig::default()).unwrap();
    let Some(PgNodeEnum::MinMaxExpr(minmax)) = node.node.as_ref() else {
        panic!("expected GREATEST expression");
    };
    for arg in &minmax.args {
        assert_eq!(func_name(arg).as_deref(), Some("max"));
    }
}

#[test]
fn grouped_revision_for_single_table_is_bare_max() {
    let refs = resolve("SELECT * FROM orders", TOP_LEVEL);
    let node = composite_revision(&refs, true, &MetaColumnConfig::default()).unwrap();
    assert_eq!(func_name(&node).as_deref(), Some("max"));
}

#[test]
fn composites_are_empty_for_no_tables() {
    let refs = TableRefs::new();
    assert!(composite_identity(&refs, false, &MetaColumnConfig::default()).is_none());
    assert!(composite_revision(&refs, true, &MetaColumnConfig::default()).is_none());
}

#[test]
fn greatest_collapses_single_argument() {
    let node = greatest(vec![integer_literal(1)]).unwrap();
    assert!(matches!(node.node.as_ref(), Some(PgNodeEnum::AConst(_))));
    assert!(greatest(vec![]).is_none());
}

#[test]
fn typed_literals_carry_their_values() {
    let Some(PgNodeEnum::AConst(value)) = integer_literal(42).node else {
        panic!("expected constant");
    };
    assert_eq!(
        value.val,
        Some(protobuf::a_const::Val::Ival(protobuf::Integer { ival: 42 }))
    );

    let Some(PgNodeEnum::AConst(value)) = float_literal("1.5").node else {
        panic!("expected constant");
    };
    assert_eq!(
        value.val,
        Some(protobuf::a_const::Val::Fval(protobuf::Float {
            fval: "1.5".to_string()
        }))
    );

    let Some(PgNodeEnum::AConst(value)) = string_literal("it's").node else {
        panic!("expected constant");
    };
    assert_eq!(
        value.val,
        Some(protobuf::a_const::Val::Sval(protobuf::String {
            sval: "it's".to_string()
        }))
    );
}

#[test]
fn injector_prepends_identity_then_revision() {
    let mut tree = parse_tree("SELECT name, email FROM users");
    inject_meta_columns(&mut tree, &MetaColumnConfig::default());
    let select = first_select(&tree);
    assert_eq!(select.target_list.len(), 4);
    assert_eq!(target_names(select)[..2], ["__id__", "__rev__"]);
}

#[test]
fn injector_leaves_from_less_select_untouched() {
    let mut tree = parse_tree("SELECT 1");
    inject_meta_columns(&mut tree, &MetaColumnConfig::default());
    assert_eq!(first_select(&tree).target_list.len(), 1);
}

#[test]
fn injector_respects_configured_names() {
    let config = MetaColumnConfig {
        identity_column: "__row_key__".to_string(),
        revision_column: "__version__".to_string(),
        default_schema: "public".to_string(),
    };
    let mut tree = parse_tree("SELECT name FROM users");
    inject_meta_columns(&mut tree, &config);
    let select = first_select(&tree);
    assert_eq!(target_names(select)[..2], ["__row_key__", "__version__"]);
}

#[test]
fn derived_names_follow_revision_column() {
    let config = MetaColumnConfig::default();
    assert_eq!(config.sequence_name(), "__rev___seq");
    assert_eq!(config.stamp_function_name(), "__rev___stamp");
    assert_eq!(config.trigger_name(), "__rev___trg");
}

#[test]
fn table_refs_serialize_for_reporting() {
    let refs = resolve("SELECT * FROM app.users u", TOP_LEVEL);
    let json = serde_json::to_value(refs.iter().collect::<Vec<_>>()).unwrap();
    assert_eq!(json[0]["schema"], "app");
    assert_eq!(json[0]["alias"], "u");
}
