fn make_node(node: PgNodeEnum) -> protobuf::Node {
    protobuf::Node { node: Some(node) }
}

fn string_ident_node(value: &str) -> protobuf::Node {
    make_node(PgNodeEnum::String(protobuf::String {
        sval: value.to_string(),
    }))
}

pub fn column_ref(parts: &[String]) -> protobuf::Node {
    make_node(PgNodeEnum::ColumnRef(Box::new(protobuf::ColumnRef {
        fields: parts.iter().map(|part| string_ident_node(part)).collect(),
        location: -1,
    })))
}

pub fn string_literal(value: &str) -> protobuf::Node {
    make_node(PgNodeEnum::AConst(protobuf::AConst {
        isnull: false,
        val: Some(protobuf::a_const::Val::Sval(protobuf::String {
            sval: value.to_string(),
        })),
        location: -1,
    }))
}

pub fn integer_literal(value: i32) -> protobuf::Node {
    make_node(PgNodeEnum::AConst(protobuf::AConst {
        isnull: false,
        val: Some(protobuf::a_const::Val::Ival(protobuf::Integer {
            ival: value,
        })),
        location: -1,
    }))
}

pub fn float_literal(value: &str) -> protobuf::Node {
    make_node(PgNodeEnum::AConst(protobuf::AConst {
        isnull: false,
        val: Some(protobuf::a_const::Val::Fval(protobuf::Float {
            fval: value.to_string(),
        })),
        location: -1,
    }))
}

pub fn func_call(name: &str, args: Vec<protobuf::Node>) -> protobuf::Node {
    aggregate_call(name, args, None)
}

pub fn aggregate_call(
    name: &str,
    args: Vec<protobuf::Node>,
    order_by: Option<protobuf::Node>,
) -> protobuf::Node {
    let agg_order = order_by
        .map(|expr| vec![sort_by_entry(expr)])
        .unwrap_or_default();
    make_node(PgNodeEnum::FuncCall(Box::new(protobuf::FuncCall {
        funcname: vec![string_ident_node(name)],
        args,
        agg_order,
        agg_filter: None,
        over: None,
        agg_within_group: false,
        agg_star: false,
        agg_distinct: false,
        func_variadic: false,
        funcformat: protobuf::CoercionForm::CoerceExplicitCall as i32,
        location: -1,
    })))
}

fn sort_by_entry(expr: protobuf::Node) -> protobuf::Node {
    make_node(PgNodeEnum::SortBy(Box::new(protobuf::SortBy {
        node: Some(Box::new(expr)),
        sortby_dir: protobuf::SortByDir::SortbyDefault as i32,
        sortby_nulls: protobuf::SortByNulls::SortbyNullsDefault as i32,
        use_op: vec![],
        location: -1,
    })))
}

pub fn concat(left: protobuf::Node, right: protobuf::Node) -> protobuf::Node {
    make_node(PgNodeEnum::AExpr(Box::new(protobuf::AExpr {
        kind: protobuf::AExprKind::AexprOp as i32,
        name: vec![string_ident_node("||")],
        lexpr: Some(Box::new(left)),
        rexpr: Some(Box::new(right)),
        location: -1,
    })))
}

fn concat_separated(values: Vec<protobuf::Node>, separator: &str) -> Option<protobuf::Node> {
    let mut iter = values.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, value| {
        concat(concat(acc, string_literal(separator)), value)
    }))
}

pub fn greatest(args: Vec<protobuf::Node>) -> Option<protobuf::Node> {
    match args.len() {
        0 => None,
        1 => args.into_iter().next(),
        _ => Some(make_node(PgNodeEnum::MinMaxExpr(Box::new(
            protobuf::MinMaxExpr {
                xpr: None,
                minmaxtype: 0,
                op: protobuf::MinMaxOp::IsGreatest as i32,
                minmaxcollid: 0,
                inputcollid: 0,
                args,
                location: -1,
            },
        )))),
    }
}

pub fn text_cast(expr: protobuf::Node) -> protobuf::Node {
    make_node(PgNodeEnum::TypeCast(Box::new(protobuf::TypeCast {
        arg: Some(Box::new(expr)),
        type_name: Some(protobuf::TypeName {
            names: vec![string_ident_node("text")],
            type_oid: 0,
            setof: false,
            pct_type: false,
            typmods: vec![],
            typemod: -1,
            array_bounds: vec![],
            location: -1,
        }),
        location: -1,
    })))
}

pub fn output_target(name: &str, value: protobuf::Node) -> protobuf::Node {
    make_node(PgNodeEnum::ResTarget(Box::new(protobuf::ResTarget {
        name: name.to_string(),
        indirection: vec![],
        val: Some(Box::new(value)),
        location: -1,
    })))
}

fn table_column_parts(table: &TableRef, column: &str) -> Vec<String> {
    let mut parts = Vec::new();
    if let Some(alias) = &table.alias {
        parts.push(alias.clone());
    } else {
        if let Some(schema) = &table.schema {
            parts.push(schema.clone());
        }
        if let Some(name) = &table.table {
            parts.push(name.clone());
        }
    }
    parts.push(column.to_string());
    parts
}

fn table_column_ref(table: &TableRef, column: &str) -> protobuf::Node {
    column_ref(&table_column_parts(table, column))
}

pub fn composite_identity(
    tables: &TableRefs,
    grouped: bool,
    config: &MetaColumnConfig,
) -> Option<protobuf::Node> {
    let values = tables
        .iter()
        .map(|table| {
            let identity = table_column_ref(table, &config.identity_column);
            if grouped {
                // Fold the group's rows into one fingerprint. The inner
                // ORDER BY makes the fold independent of physical row order.
                let folded = aggregate_call(
                    "string_agg",
                    vec![text_cast(identity.clone()), string_literal(",")],
                    Some(identity),
                );
                func_call("md5", vec![folded])
            } else {
                identity
            }
        })
        .collect::<Vec<_>>();

    concat_separated(values, "|")
}

pub fn composite_revision(
    tables: &TableRefs,
    grouped: bool,
    config: &MetaColumnConfig,
) -> Option<protobuf::Node> {
    let values = tables
        .iter()
        .map(|table| {
            let revision = table_column_ref(table, &config.revision_column);
            if grouped {
                // max per table first, GREATEST across tables second;
                // the reverse is wrong for multi-table grouped queries.
                func_call("max", vec![revision])
            } else {
                revision
            }
        })
        .collect::<Vec<_>>();

    greatest(values)
}
