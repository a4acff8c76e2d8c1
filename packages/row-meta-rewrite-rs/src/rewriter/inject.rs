pub fn inject_meta_columns(tree: &mut protobuf::ParseResult, config: &MetaColumnConfig) {
    for raw in &mut tree.stmts {
        if let Some(node) = raw.stmt.as_deref_mut() {
            inject_node(node, config);
        }
    }
}

fn inject_node(node: &mut protobuf::Node, config: &MetaColumnConfig) {
    if let Some(PgNodeEnum::SelectStmt(select)) = node.node.as_mut() {
        inject_select(select, config);
    }
}

fn inject_select(select: &mut protobuf::SelectStmt, config: &MetaColumnConfig) {
    if let Some(larg) = select.larg.as_deref_mut() {
        inject_select(larg, config);
    }
    if let Some(rarg) = select.rarg.as_deref_mut() {
        inject_select(rarg, config);
    }
    if let Some(with) = select.with_clause.as_mut() {
        for cte in &mut with.ctes {
            if let Some(PgNodeEnum::CommonTableExpr(cte)) = cte.node.as_mut() {
                if let Some(query) = cte.ctequery.as_deref_mut() {
                    inject_node(query, config);
                }
            }
        }
    }
    for item in &mut select.from_clause {
        inject_from_item(item, config);
    }
    for target in &mut select.target_list {
        inject_expr(target, config);
    }
    if let Some(where_clause) = select.where_clause.as_deref_mut() {
        inject_expr(where_clause, config);
    }
    if let Some(having) = select.having_clause.as_deref_mut() {
        inject_expr(having, config);
    }

    if select.from_clause.is_empty() {
        return;
    }

    let mut refs = TableRefs::new();
    resolve_select_tables(
        select,
        ResolveOptions {
            top_level_only: true,
            include_subselects: true,
        },
        &mut refs,
    );

    let grouped = !select.group_clause.is_empty();
    let identity = composite_identity(&refs, grouped, config);
    let revision = composite_revision(&refs, grouped, config);
    // Nothing resolvable in this FROM clause: leave the body untouched.
    let (Some(identity), Some(revision)) = (identity, revision) else {
        return;
    };

    select
        .target_list
        .insert(0, output_target(&config.identity_column, identity));
    select
        .target_list
        .insert(1, output_target(&config.revision_column, revision));
}

fn inject_from_item(node: &mut protobuf::Node, config: &MetaColumnConfig) {
    match node.node.as_mut() {
        Some(PgNodeEnum::JoinExpr(join)) => {
            if let Some(larg) = join.larg.as_deref_mut() {
                inject_from_item(larg, config);
            }
            if let Some(rarg) = join.rarg.as_deref_mut() {
                inject_from_item(rarg, config);
            }
            if let Some(quals) = join.quals.as_deref_mut() {
                inject_expr(quals, config);
            }
        }
        Some(PgNodeEnum::RangeSubselect(subselect)) => {
            if let Some(query) = subselect.subquery.as_deref_mut() {
                inject_node(query, config);
            }
        }
        _ => {}
    }
}

fn inject_expr(node: &mut protobuf::Node, config: &MetaColumnConfig) {
    match node.node.as_mut() {
        Some(PgNodeEnum::SubLink(sub_link)) => {
            if let Some(testexpr) = sub_link.testexpr.as_deref_mut() {
                inject_expr(testexpr, config);
            }
            if let Some(subselect) = sub_link.subselect.as_deref_mut() {
                inject_node(subselect, config);
            }
        }
        Some(PgNodeEnum::ResTarget(target)) => {
            if let Some(val) = target.val.as_deref_mut() {
                inject_expr(val, config);
            }
        }
        Some(PgNodeEnum::AExpr(a_expr)) => {
            if let Some(lexpr) = a_expr.lexpr.as_deref_mut() {
                inject_expr(lexpr, config);
            }
            if let Some(rexpr) = a_expr.rexpr.as_deref_mut() {
                inject_expr(rexpr, config);
            }
        }
        Some(PgNodeEnum::BoolExpr(bool_expr)) => {
            for arg in &mut bool_expr.args {
                inject_expr(arg, config);
            }
        }
        Some(PgNodeEnum::FuncCall(func_call)) => {
            for arg in &mut func_call.args {
                inject_expr(arg, config);
            }
            if let Some(filter) = func_call.agg_filter.as_deref_mut() {
                inject_expr(filter, config);
            }
        }
        Some(PgNodeEnum::TypeCast(cast)) => {
            if let Some(arg) = cast.arg.as_deref_mut() {
                inject_expr(arg, config);
            }
        }
        Some(PgNodeEnum::NullTest(null_test)) => {
            if let Some(arg) = null_test.arg.as_deref_mut() {
                inject_expr(arg, config);
            }
        }
        Some(PgNodeEnum::CaseExpr(case_expr)) => {
            if let Some(arg) = case_expr.arg.as_deref_mut() {
                inject_expr(arg, config);
            }
            for when in &mut case_expr.args {
                inject_expr(when, config);
            }
            if let Some(defresult) = case_expr.defresult.as_deref_mut() {
                inject_expr(defresult, config);
            }
        }
        Some(PgNodeEnum::CaseWhen(case_when)) => {
            if let Some(expr) = case_when.expr.as_deref_mut() {
                inject_expr(expr, config);
            }
            if let Some(result) = case_when.result.as_deref_mut() {
                inject_expr(result, config);
            }
        }
        Some(PgNodeEnum::CoalesceExpr(coalesce)) => {
            for arg in &mut coalesce.args {
                inject_expr(arg, config);
            }
        }
        Some(PgNodeEnum::NullIfExpr(null_if)) => {
            for arg in &mut null_if.args {
                inject_expr(arg, config);
            }
        }
        Some(PgNodeEnum::RowExpr(row)) => {
            for arg in &mut row.args {
                inject_expr(arg, config);
            }
        }
        Some(PgNodeEnum::List(list)) => {
            for item in &mut list.items {
                inject_expr(item, config);
            }
        }
        _ => {}
    }
}
