//! SQL transpiler.
//!
//! A [`Table`] turns structured requests against one model into SQL text.
//! It holds only the model's [`TableMetadata`] and the table prefix, so a
//! single instance can be shared freely and reused for any number of calls.
//!
//! Dialect notes:
//! - pagination is `SELECT FIRST n SKIP m ...`, never `LIMIT`/`OFFSET`;
//! - dates are written as `'YYYY-MM-DD HH:MM:SS'`;
//! - filter and sort columns are upper-cased, and qualified with the table
//!   name whenever a join is present.

use crate::error::{AvantError, AvantResult};
use crate::query::*;
use crate::schema::{table_name, TableMetadata};
use crate::value::{ToSql, Value};

/// Query compiler for one model.
#[derive(Debug, Clone)]
pub struct Table {
    meta: TableMetadata,
    prefix: String,
}

impl Table {
    /// Create a compiler from a model's metadata and the prefix its relation
    /// keys were built with.
    pub fn new(meta: TableMetadata, prefix: impl Into<String>) -> Self {
        Self {
            meta,
            prefix: prefix.into(),
        }
    }

    /// The table identifier, prefix included.
    pub fn name(&self) -> &str {
        &self.meta.table_name
    }

    pub fn metadata(&self) -> &TableMetadata {
        &self.meta
    }

    /// Compile any request.
    pub fn compile(&self, query: &Query) -> AvantResult<String> {
        match query {
            Query::FindMany(args) => self.find_many(args.as_ref()),
            Query::FindUnique(args) => self.find_unique(args),
            Query::Create(data) => self.create(data),
            Query::CreateMany(rows) => self.create_many(rows),
            Query::Update(args) => self.update(args),
            Query::Delete(args) => self.delete(args),
        }
    }

    /// `SELECT` any number of rows.
    pub fn find_many(&self, args: Option<&FindArgs>) -> AvantResult<String> {
        let sql = match args {
            None => format!("SELECT * FROM {}", self.name()),
            Some(args) => self.to_select_sql(args)?,
        };
        Ok(self.traced("findMany", sql))
    }

    /// `SELECT` filtered on at least one unique column.
    pub fn find_unique(&self, args: &FindArgs) -> AvantResult<String> {
        let unique = args
            .filter
            .as_ref()
            .is_some_and(|filter| filter.keys().any(|k| self.meta.unique_columns.contains(k)));
        if !unique {
            return Err(AvantError::NotUniqueFilter {
                table: self.name().to_string(),
            });
        }
        let sql = self.to_select_sql(args)?;
        Ok(self.traced("findUnique", sql))
    }

    /// `INSERT` one row, filling in defaults for missing columns.
    pub fn create(&self, data: &Record) -> AvantResult<String> {
        let row = self.with_defaults(data);
        if row.is_empty() {
            return Err(self.empty("create"));
        }

        let cols: Vec<&str> = row.keys().map(String::as_str).collect();
        let values: Vec<String> = row.values().map(|v| v.to_sql()).collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            self.name(),
            cols.join(", "),
            values.join(", ")
        );
        Ok(self.traced("create", sql))
    }

    /// `INSERT` several rows in one statement.
    ///
    /// The column list comes from the first row (after defaults); later rows
    /// are written in that column order, with `NULL` for anything missing.
    pub fn create_many(&self, rows: &[Record]) -> AvantResult<String> {
        let Some(first) = rows.first() else {
            return Err(self.empty("createMany"));
        };
        let first = self.with_defaults(first);
        if first.is_empty() {
            return Err(self.empty("createMany"));
        }
        let cols: Vec<&str> = first.keys().map(String::as_str).collect();

        let mut tuples = Vec::with_capacity(rows.len());
        for (i, data) in rows.iter().enumerate() {
            let row = self.with_defaults(data);
            if row.len() != cols.len() || row.keys().any(|k| !first.contains_key(k)) {
                tracing::warn!(
                    "{}: createMany row {} does not match the columns of row 0",
                    self.name(),
                    i
                );
            }
            let values: Vec<String> = cols
                .iter()
                .map(|c| row.get(*c).unwrap_or(&Value::Null).to_sql())
                .collect();
            tuples.push(format!("({})", values.join(", ")));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {};",
            self.name(),
            cols.join(", "),
            tuples.join(", ")
        );
        Ok(self.traced("createMany", sql))
    }

    /// `UPDATE` the rows matching `where`.
    pub fn update(&self, args: &UpdateArgs) -> AvantResult<String> {
        if args.filter.is_empty() {
            return Err(self.missing_filter("update"));
        }
        if args.data.is_empty() {
            return Err(self.empty("update"));
        }

        let set_clauses: Vec<String> = args
            .data
            .iter()
            .map(|(col, value)| format!("{}={}", col, value.to_sql()))
            .collect();

        let mut sql = String::from("UPDATE ");
        sql.push_str(self.name());
        sql.push_str(" SET ");
        sql.push_str(&set_clauses.join(", "));
        sql.push_str(" WHERE ");
        sql.push_str(&self.where_clause(&args.filter, false)?);
        Ok(self.traced("update", sql))
    }

    /// `DELETE` the rows matching `where`.
    pub fn delete(&self, args: &DeleteArgs) -> AvantResult<String> {
        if args.filter.is_empty() {
            return Err(self.missing_filter("delete"));
        }

        let mut sql = String::from("DELETE FROM ");
        sql.push_str(self.name());
        sql.push_str(" WHERE ");
        sql.push_str(&self.where_clause(&args.filter, false)?);
        Ok(self.traced("delete", sql))
    }

    /// Generate SELECT SQL.
    fn to_select_sql(&self, args: &FindArgs) -> AvantResult<String> {
        let joined = args
            .include
            .as_ref()
            .is_some_and(|include| include.values().any(|on| *on));

        let mut sql = String::from("SELECT ");

        // Pagination
        if let Some(n) = args.take {
            sql.push_str(&format!("FIRST {} ", n));
        }
        if let Some(n) = args.skip {
            sql.push_str(&format!("SKIP {} ", n));
        }

        // Columns
        let cols: Vec<String> = args
            .select
            .iter()
            .flatten()
            .filter(|(_, on)| **on)
            .map(|(col, _)| self.column(col, joined))
            .collect();
        if cols.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&cols.join(", "));
        }

        // FROM
        sql.push_str(" FROM ");
        sql.push_str(self.name());

        // JOIN
        if let Some(include) = args.include.as_ref().filter(|_| joined) {
            sql.push(' ');
            sql.push_str(&self.join_clause(include)?);
        }

        // WHERE
        if let Some(filter) = args.filter.as_ref().filter(|f| !f.is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clause(filter, joined)?);
        }

        // ORDER BY
        if let Some(order_by) = args.order_by.as_ref().filter(|o| !o.is_empty()) {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_clause(order_by, joined));
        }

        Ok(sql)
    }

    /// `LEFT JOIN` every included relation.
    fn join_clause(&self, include: &indexmap::IndexMap<String, bool>) -> AvantResult<String> {
        let mut joins = Vec::new();
        for (key, on) in include {
            if !*on {
                continue;
            }
            let target = table_name(&self.prefix, key);
            let rel = self
                .meta
                .relations
                .get(&target)
                .ok_or_else(|| AvantError::UnknownRelation {
                    table: self.name().to_string(),
                    key: key.clone(),
                })?;
            joins.push(format!(
                "LEFT JOIN {} ON {}.{} = {}.{}",
                target,
                self.name(),
                rel.field,
                target,
                rel.references
            ));
        }
        Ok(joins.join(" "))
    }

    /// Conditions for every column, joined with `AND`.
    fn where_clause(&self, filter: &WhereMap, joined: bool) -> AvantResult<String> {
        let mut clauses = Vec::with_capacity(filter.len());
        for (column, expr) in filter {
            let col = self.column(column, joined);
            let conditions = match expr {
                FilterExpr::Scalar(value) => vec![condition(&col, column, FilterOp::Equals, value)?],
                FilterExpr::Operators(ops) => {
                    if ops.is_empty() {
                        return Err(AvantError::filter(column, "no operator given"));
                    }
                    ops.iter()
                        .map(|(op, value)| condition(&col, column, *op, value))
                        .collect::<AvantResult<Vec<_>>>()?
                }
            };
            clauses.push(conditions.join(" AND "));
        }
        Ok(clauses.join(" AND "))
    }

    /// Sort segments; a NULL-placement key always precedes its column.
    fn order_clause(
        &self,
        order_by: &indexmap::IndexMap<String, SortSpec>,
        joined: bool,
    ) -> String {
        let mut segments = Vec::with_capacity(order_by.len());
        for (column, spec) in order_by {
            let col = self.column(column, joined);
            if let Some(nulls) = spec.nulls() {
                let (null_rank, other_rank) = match nulls {
                    NullsOrder::First => (0, 1),
                    NullsOrder::Last => (1, 0),
                };
                segments.push(format!(
                    "CASE WHEN {} IS NULL THEN {} ELSE {} END",
                    col, null_rank, other_rank
                ));
            }
            match spec.sort() {
                Some(order) => segments.push(format!("{} {}", col, order)),
                None => segments.push(col),
            }
        }
        segments.join(", ")
    }

    /// Upper-cased column, qualified with the table when joining.
    fn column(&self, name: &str, joined: bool) -> String {
        let col = name.to_uppercase();
        if joined {
            format!("{}.{}", self.name(), col)
        } else {
            col
        }
    }

    fn with_defaults(&self, data: &Record) -> Record {
        let mut row = data.clone();
        for (col, value) in &self.meta.defaults {
            if !row.contains_key(col) {
                row.insert(col.clone(), value.clone());
            }
        }
        row
    }

    fn empty(&self, operation: &'static str) -> AvantError {
        AvantError::EmptyPayload {
            table: self.name().to_string(),
            operation,
        }
    }

    fn missing_filter(&self, operation: &'static str) -> AvantError {
        AvantError::MissingFilter {
            table: self.name().to_string(),
            operation,
        }
    }

    fn traced(&self, operation: &str, sql: String) -> String {
        tracing::trace!("{} {}: {}", self.name(), operation, sql);
        sql
    }
}

/// One `<col> <op> <value>` condition.
fn condition(col: &str, column: &str, op: FilterOp, value: &Value) -> AvantResult<String> {
    let sql = match (op, value) {
        (FilterOp::In | FilterOp::NotIn, Value::List(items)) if items.is_empty() => {
            return Err(AvantError::filter(column, format!("`{}` expects a non-empty list", op)));
        }
        (FilterOp::In | FilterOp::NotIn, Value::List(items)) => {
            let items: Vec<String> = items
                .iter()
                .map(|v| scalar(column, op, v))
                .collect::<AvantResult<_>>()?;
            let keyword = if op == FilterOp::In { "IN" } else { "NOT IN" };
            format!("{} {} ({})", col, keyword, items.join(", "))
        }
        (FilterOp::In | FilterOp::NotIn, _) => {
            return Err(AvantError::filter(column, format!("`{}` expects a list", op)));
        }
        (FilterOp::Between, Value::List(items)) => match items.as_slice() {
            [low, high] => format!(
                "{} BETWEEN {} AND {}",
                col,
                scalar(column, op, low)?,
                scalar(column, op, high)?
            ),
            _ => {
                return Err(AvantError::filter(
                    column,
                    format!("`between` expects exactly 2 values, got {}", items.len()),
                ));
            }
        },
        (FilterOp::Between, _) => {
            return Err(AvantError::filter(column, "`between` expects a [low, high] pair"));
        }
        (_, Value::List(_)) => {
            return Err(AvantError::filter(column, format!("`{}` expects a single value", op)));
        }
        (FilterOp::Equals, Value::Null) => format!("{} IS NULL", col),
        (FilterOp::Not, Value::Null) => format!("{} IS NOT NULL", col),
        (FilterOp::Contains | FilterOp::StartsWith | FilterOp::EndsWith, Value::Null) => {
            return Err(AvantError::filter(column, format!("`{}` needs a non-null value", op)));
        }
        (FilterOp::Equals, v) => format!("{} = {}", col, v.to_sql()),
        (FilterOp::Not, v) => format!("{} != {}", col, v.to_sql()),
        (FilterOp::Gt, v) => format!("{} > {}", col, v.to_sql()),
        (FilterOp::Gte, v) => format!("{} >= {}", col, v.to_sql()),
        (FilterOp::Lt, v) => format!("{} < {}", col, v.to_sql()),
        (FilterOp::Lte, v) => format!("{} <= {}", col, v.to_sql()),
        (FilterOp::Contains, v) => format!("{} LIKE '%{}%'", col, v.pattern_text()),
        (FilterOp::StartsWith, v) => format!("{} LIKE '{}%'", col, v.pattern_text()),
        (FilterOp::EndsWith, v) => format!("{} LIKE '%{}'", col, v.pattern_text()),
    };
    Ok(sql)
}

/// Element of an `IN` list or `BETWEEN` bound: must not itself be a list.
fn scalar(column: &str, op: FilterOp, value: &Value) -> AvantResult<String> {
    if value.is_list() {
        return Err(AvantError::filter(
            column,
            format!("`{}` operands cannot be nested lists", op),
        ));
    }
    Ok(value.to_sql())
}
