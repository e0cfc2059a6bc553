//! SQL query builder
//!
//! Accumulates joins, predicates, projections, grouping, ordering and paging
//! for a SELECT over one base table, and executes it with numbered `?N`
//! parameters via sqlx.

use serde_json::{Map, Value};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::property::quote_ident;
use super::value::{SqlValue, row_to_map};

#[derive(Debug, Clone)]
pub struct TableQuery {
    table: String,
    selects: Vec<String>,
    joins: Vec<String>,
    where_clauses: Vec<String>,
    values: Vec<SqlValue>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    param_counter: usize,
}

impl TableQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            selects: Vec::new(),
            joins: Vec::new(),
            where_clauses: Vec::new(),
            values: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            param_counter: 0,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Add a SELECT expression. Without any, all columns of the base table are selected.
    pub fn select(&mut self, expr: impl Into<String>) -> &mut Self {
        self.selects.push(expr.into());
        self
    }

    /// Add a raw JOIN clause.
    pub fn join(&mut self, clause: impl Into<String>) -> &mut Self {
        self.joins.push(clause.into());
        self
    }

    /// Add a WHERE condition. Each `?` in `condition` takes the next value.
    pub fn where_clause(&mut self, condition: &str, values: Vec<SqlValue>) -> &mut Self {
        let rewritten = self.rewrite_params(condition);
        self.where_clauses.push(rewritten);
        self.values.extend(values);
        self
    }

    /// Add a negated WHERE condition.
    pub fn not_clause(&mut self, condition: &str, values: Vec<SqlValue>) -> &mut Self {
        let rewritten = self.rewrite_params(condition);
        self.where_clauses.push(format!("NOT ({rewritten})"));
        self.values.extend(values);
        self
    }

    pub fn group_by(&mut self, expr: impl Into<String>) -> &mut Self {
        self.group_by.push(expr.into());
        self
    }

    pub fn order_by(&mut self, expr: impl Into<String>) -> &mut Self {
        self.order_by.push(expr.into());
        self
    }

    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.offset = Some(offset.max(0));
        self
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Rewrite bare `?` placeholders to sequential `?N` indices.
    fn rewrite_params(&mut self, condition: &str) -> String {
        let mut result = String::with_capacity(condition.len() + 4);
        let mut chars = condition.chars().peekable();
        while let Some(c) = chars.next() {
            result.push(c);
            if c == '?' && !chars.peek().is_some_and(|n| n.is_ascii_digit()) {
                self.param_counter += 1;
                result.push_str(&self.param_counter.to_string());
            }
        }
        result
    }

    fn push_from_where(&self, sql: &mut String) {
        sql.push_str(" FROM ");
        sql.push_str(&quote_ident(&self.table));

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
    }

    /// Build the SELECT statement.
    pub fn build_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.selects.is_empty() {
            sql.push_str(&format!("{}.*", quote_ident(&self.table)));
        } else {
            sql.push_str(&self.selects.join(", "));
        }

        self.push_from_where(&mut sql);

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) if offset > 0 => {
                sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
            }
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) if offset > 0 => {
                sql.push_str(&format!(" LIMIT -1 OFFSET {offset}"));
            }
            _ => {}
        }

        sql
    }

    /// Build the COUNT statement. Grouped queries count groups.
    pub fn build_count_sql(&self) -> String {
        let mut inner = String::new();
        self.push_from_where(&mut inner);

        if self.group_by.is_empty() {
            format!("SELECT COUNT(*){inner}")
        } else {
            format!("SELECT COUNT(*) FROM (SELECT 1{inner})")
        }
    }

    fn bound<'q>(
        &'q self,
        sql: &'q str,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        let mut query = sqlx::query(sql);
        for value in &self.values {
            query = value.bind_to_query(query);
        }
        query
    }

    /// Execute the query and return each row as an ordered map.
    pub async fn fetch_rows(&self, pool: &SqlitePool) -> Result<Vec<Map<String, Value>>, sqlx::Error> {
        let sql = self.build_sql();
        tracing::debug!(sql = %sql, "Executing table query");

        let rows = self.bound(&sql).fetch_all(pool).await?;
        rows.iter().map(row_to_map).collect()
    }

    /// Execute the query and decode each row as `T`.
    pub async fn fetch_all<T>(&self, pool: &SqlitePool) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, SqliteRow>,
    {
        let sql = self.build_sql();
        tracing::debug!(sql = %sql, "Executing table query");

        let rows = self.bound(&sql).fetch_all(pool).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Execute a COUNT query.
    pub async fn count(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let sql = self.build_count_sql();
        tracing::debug!(sql = %sql, "Executing count query");

        let row = self.bound(&sql).fetch_one(pool).await?;
        row.try_get(0)
    }
}

/// Execute a statement with positional bind values.
pub async fn execute_with_binds(
    pool: &SqlitePool,
    sql: &str,
    values: &[SqlValue],
) -> Result<u64, sqlx::Error> {
    tracing::debug!(sql = %sql, "Executing statement");

    let mut query = sqlx::query(sql);
    for value in values {
        query = value.bind_to_query(query);
    }
    Ok(query.execute(pool).await?.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bare_select_takes_all_base_columns() {
        let q = TableQuery::new("tags");
        assert_eq!(q.build_sql(), r#"SELECT "tags".* FROM "tags""#);
        assert_eq!(q.build_count_sql(), r#"SELECT COUNT(*) FROM "tags""#);
    }

    #[test]
    fn placeholders_are_numbered_across_clauses() {
        let mut q = TableQuery::new("tags");
        q.where_clause("a = ?", vec![SqlValue::Int(1)])
            .not_clause("b = ? OR c = ?", vec![SqlValue::from("x"), SqlValue::from("y")])
            .where_clause("d = ?7", Vec::new());
        assert_eq!(
            q.build_sql(),
            r#"SELECT "tags".* FROM "tags" WHERE a = ?1 AND NOT (b = ?2 OR c = ?3) AND d = ?7"#
        );
        assert_eq!(q.values().len(), 3);
    }

    #[test]
    fn full_statement_layout() {
        let mut q = TableQuery::new("tags");
        q.select(r#""tags"."tag_name" AS "tag_name""#)
            .join(r#"LEFT JOIN "node_tags" ON "tags"."tag_id" = "node_tags"."tag_id""#)
            .where_clause(r#""tags"."tag_name" = ?"#, vec![SqlValue::from("prod")])
            .group_by(r#""tags"."tag_name""#)
            .order_by(r#""tags"."tag_name" DESC"#)
            .limit(20)
            .offset(40);
        assert_eq!(
            q.build_sql(),
            concat!(
                r#"SELECT "tags"."tag_name" AS "tag_name" FROM "tags" "#,
                r#"LEFT JOIN "node_tags" ON "tags"."tag_id" = "node_tags"."tag_id" "#,
                r#"WHERE "tags"."tag_name" = ?1 GROUP BY "tags"."tag_name" "#,
                r#"ORDER BY "tags"."tag_name" DESC LIMIT 20 OFFSET 40"#
            )
        );
        assert_eq!(
            q.build_count_sql(),
            concat!(
                r#"SELECT COUNT(*) FROM (SELECT 1 FROM "tags" "#,
                r#"LEFT JOIN "node_tags" ON "tags"."tag_id" = "node_tags"."tag_id" "#,
                r#"WHERE "tags"."tag_name" = ?1 GROUP BY "tags"."tag_name")"#
            )
        );
    }

    #[test]
    fn offset_without_limit() {
        let mut q = TableQuery::new("tags");
        q.offset(5);
        assert!(q.build_sql().ends_with("LIMIT -1 OFFSET 5"));

        let mut q = TableQuery::new("tags");
        q.offset(-3).limit(10);
        assert!(q.build_sql().ends_with("LIMIT 10"));
    }
}
