#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn base(schema: Option<String>, table: String, alias: Option<String>) -> Self {
        Self {
            schema,
            table: Some(table),
            alias,
        }
    }

    pub fn subselect(alias: String) -> Self {
        Self {
            schema: None,
            table: None,
            alias: Some(alias),
        }
    }

    pub fn is_base(&self) -> bool {
        self.table.is_some()
    }

    pub fn key(&self) -> String {
        match (&self.schema, &self.table) {
            (Some(schema), Some(table)) => format!("{schema}.{table}"),
            (None, Some(table)) => table.clone(),
            _ => format!(
                "{SUBSELECT_PLACEHOLDER}.{}",
                self.alias.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// Insertion-ordered set of table references. Iteration order is discovery
/// order; a key that is seen again keeps its first entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRefs {
    entries: Vec<TableRef>,
}

impl TableRefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: TableRef) {
        let key = table.key();
        if self.entries.iter().all(|existing| existing.key() != key) {
            self.entries.push(table);
        }
    }

    pub fn get(&self, key: &str) -> Option<&TableRef> {
        self.entries.iter().find(|entry| entry.key() == key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TableRef> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    pub top_level_only: bool,
    pub include_subselects: bool,
}

pub fn resolve_statement_tables(
    tree: &protobuf::ParseResult,
    options: ResolveOptions,
) -> TableRefs {
    let mut refs = TableRefs::new();
    for raw in &tree.stmts {
        if let Some(node) = raw.stmt.as_deref() {
            collect_node_tables(node, options, &mut refs);
        }
    }
    refs
}

fn collect_node_tables(node: &protobuf::Node, options: ResolveOptions, out: &mut TableRefs) {
    if let Some(PgNodeEnum::SelectStmt(select)) = node.node.as_ref() {
        resolve_select_tables(select, options, out);
    }
}

pub fn resolve_select_tables(
    select: &protobuf::SelectStmt,
    options: ResolveOptions,
    out: &mut TableRefs,
) {
    for item in &select.from_clause {
        collect_from_item(item, options, out);
    }

    if options.top_level_only {
        return;
    }

    if let Some(with) = &select.with_clause {
        for cte in &with.ctes {
            if let Some(PgNodeEnum::CommonTableExpr(cte)) = cte.node.as_ref() {
                if let Some(query) = cte.ctequery.as_deref() {
                    collect_node_tables(query, options, out);
                }
            }
        }
    }
    for target in &select.target_list {
        collect_expr_tables(target, options, out);
    }
    if let Some(where_clause) = select.where_clause.as_deref() {
        collect_expr_tables(where_clause, options, out);
    }
    if let Some(having) = select.having_clause.as_deref() {
        collect_expr_tables(having, options, out);
    }
    if let Some(larg) = select.larg.as_deref() {
        resolve_select_tables(larg, options, out);
    }
    if let Some(rarg) = select.rarg.as_deref() {
        resolve_select_tables(rarg, options, out);
    }
}

fn collect_from_item(node: &protobuf::Node, options: ResolveOptions, out: &mut TableRefs) {
    match node.node.as_ref() {
        Some(PgNodeEnum::RangeVar(range)) => {
            let schema = if range.schemaname.is_empty() {
                None
            } else {
                Some(range.schemaname.clone())
            };
            let alias = range
                .alias
                .as_ref()
                .map(|alias| alias.aliasname.clone())
                .filter(|alias| !alias.is_empty());
            out.insert(TableRef::base(schema, range.relname.clone(), alias));
        }
        Some(PgNodeEnum::JoinExpr(join)) => {
            if let Some(larg) = join.larg.as_deref() {
                collect_from_item(larg, options, out);
            }
            if let Some(rarg) = join.rarg.as_deref() {
                collect_from_item(rarg, options, out);
            }
            if !options.top_level_only {
                if let Some(quals) = join.quals.as_deref() {
                    collect_expr_tables(quals, options, out);
                }
            }
        }
        Some(PgNodeEnum::RangeSubselect(subselect)) => {
            let alias = subselect
                .alias
                .as_ref()
                .map(|alias| alias.aliasname.clone())
                .filter(|alias| !alias.is_empty());
            if options.include_subselects {
                if let Some(alias) = alias {
                    out.insert(TableRef::subselect(alias));
                }
            }
            if !options.top_level_only {
                if let Some(query) = subselect.subquery.as_deref() {
                    collect_node_tables(query, options, out);
                }
            }
        }
        _ => {}
    }
}

fn collect_expr_tables(node: &protobuf::Node, options: ResolveOptions, out: &mut TableRefs) {
    match node.node.as_ref() {
        Some(PgNodeEnum::SubLink(sub_link)) => {
            if let Some(testexpr) = sub_link.testexpr.as_deref() {
                collect_expr_tables(testexpr, options, out);
            }
            if let Some(subselect) = sub_link.subselect.as_deref() {
                collect_node_tables(subselect, options, out);
            }
        }
        Some(PgNodeEnum::ResTarget(target)) => {
            if let Some(val) = target.val.as_deref() {
                collect_expr_tables(val, options, out);
            }
        }
        Some(PgNodeEnum::AExpr(a_expr)) => {
            if let Some(lexpr) = a_expr.lexpr.as_deref() {
                collect_expr_tables(lexpr, options, out);
            }
            if let Some(rexpr) = a_expr.rexpr.as_deref() {
                collect_expr_tables(rexpr, options, out);
            }
        }
        Some(PgNodeEnum::BoolExpr(bool_expr)) => {
            for arg in &bool_expr.args {
                collect_expr_tables(arg, options, out);
            }
        }
        Some(PgNodeEnum::FuncCall(func_call)) => {
            for arg in &func_call.args {
                collect_expr_tables(arg, options, out);
            }
            if let Some(filter) = func_call.agg_filter.as_deref() {
                collect_expr_tables(filter, options, out);
            }
        }
        Some(PgNodeEnum::TypeCast(cast)) => {
            if let Some(arg) = cast.arg.as_deref() {
                collect_expr_tables(arg, options, out);
            }
        }
        Some(PgNodeEnum::NullTest(null_test)) => {
            if let Some(arg) = null_test.arg.as_deref() {
                collect_expr_tables(arg, options, out);
            }
        }
        Some(PgNodeEnum::CaseExpr(case_expr)) => {
            if let Some(arg) = case_expr.arg.as_deref() {
                collect_expr_tables(arg, options, out);
            }
            for when in &case_expr.args {
                collect_expr_tables(when, options, out);
            }
            if let Some(defresult) = case_expr.defresult.as_deref() {
                collect_expr_tables(defresult, options, out);
            }
        }
        Some(PgNodeEnum::CaseWhen(case_when)) => {
            if let Some(expr) = case_when.expr.as_deref() {
                collect_expr_tables(expr, options, out);
            }
            if let Some(result) = case_when.result.as_deref() {
                collect_expr_tables(result, options, out);
            }
        }
        Some(PgNodeEnum::CoalesceExpr(coalesce)) => {
            for arg in &coalesce.args {
                collect_expr_tables(arg, options, out);
            }
        }
        Some(PgNodeEnum::NullIfExpr(null_if)) => {
            for arg in &null_if.args {
                collect_expr_tables(arg, options, out);
            }
        }
        Some(PgNodeEnum::RowExpr(row)) => {
            for arg in &row.args {
                collect_expr_tables(arg, options, out);
            }
        }
        Some(PgNodeEnum::List(list)) => {
            for item in &list.items {
                collect_expr_tables(item, options, out);
            }
        }
        _ => {}
    }
}
