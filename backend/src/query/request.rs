//! Table requests
//!
//! A [`TableRequest`] scopes one HTTP request to one table. It layers, in
//! order, access control, projection with auto-joins, filters, grouping,
//! ordering and paging onto a [`TableQuery`], then either hands the scoped
//! query back to the handler ([`TableRequest::tx`]) or runs it and builds
//! the response envelope ([`TableRequest::make_table_response`]).

use std::collections::HashSet;

use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::acl::{Caller, Identity, Intent};
use super::builder::TableQuery;
use super::error::QueryError;
use super::filter::parse_filter;
use super::joins::JoinedTables;
use super::params::QueryParams;
use super::property::{Property, quote_ident};
use super::registry::{Registry, Table};
use super::response::{TableResponse, TableResponseMeta};
use super::value::SqlValue;

pub struct TableRequest<'r> {
    registry: &'r Registry,
    table: &'r Table,
    query: TableQuery,
    joined: JoinedTables,
    /// Tables present in FROM or JOIN
    present: HashSet<String>,
    acl: bool,
    intent: Intent,
    filters: bool,
    paging: bool,
    valid_filters: usize,
    acl_applied: bool,
    scoped: bool,
}

impl<'r> TableRequest<'r> {
    pub(crate) fn new(registry: &'r Registry, table: &'r Table) -> Self {
        Self {
            registry,
            table,
            query: TableQuery::new(table.name()),
            joined: JoinedTables::default(),
            present: HashSet::from([table.name().to_string()]),
            acl: true,
            intent: Intent::Read,
            filters: true,
            paging: true,
            valid_filters: 0,
            acl_applied: false,
            scoped: false,
        }
    }

    pub fn acl(mut self, enabled: bool) -> Self {
        self.acl = enabled;
        self
    }

    pub fn write_intent(mut self, enabled: bool) -> Self {
        self.intent = if enabled { Intent::Write } else { Intent::Read };
        self
    }

    pub fn filters(mut self, enabled: bool) -> Self {
        self.filters = enabled;
        self
    }

    pub fn paging(mut self, enabled: bool) -> Self {
        self.paging = enabled;
        self
    }

    pub fn table(&self) -> &'r Table {
        self.table
    }

    pub fn query(&self) -> &TableQuery {
        &self.query
    }

    pub fn into_query(self) -> TableQuery {
        self.query
    }

    pub fn where_clause(&mut self, condition: &str, values: Vec<SqlValue>) -> &mut Self {
        self.query.where_clause(condition, values);
        self
    }

    pub fn not_clause(&mut self, condition: &str, values: Vec<SqlValue>) -> &mut Self {
        self.query.not_clause(condition, values);
        self
    }

    /// Join the chain of tables leading to `target`. A missing edge is
    /// logged and leaves the chain incomplete.
    pub fn auto_join(&mut self, target: &str) -> &mut Self {
        if let Err(e) = self.try_auto_join(target) {
            warn!(table = %self.table.name(), target = %target, error = %e, "missing autojoin");
        }
        self
    }

    /// At least one filter string parsed and was applied.
    pub fn has_valid_filters(&self) -> bool {
        self.valid_filters > 0
    }

    pub fn valid_filters_count(&self) -> usize {
        self.valid_filters
    }

    /// Number of join edges materialized so far.
    pub fn joined_count(&self) -> usize {
        self.joined.len()
    }

    fn try_auto_join(&mut self, target: &str) -> Result<(), QueryError> {
        let registry = self.registry;
        let base = self.table.name();
        if target == base {
            return Ok(());
        }

        let mut here = base;
        for there in registry.graph().resolve_path(base, target) {
            self.join_edge(here, there)?;
            here = there;
        }
        Ok(())
    }

    /// Materialize the direct edge between `here` and `there` once. When
    /// `there` is already in the query through another edge, the edge
    /// condition becomes a predicate.
    fn join_edge(&mut self, here: &str, there: &str) -> Result<(), QueryError> {
        let registry = self.registry;
        let edge = registry
            .graph()
            .find_edge(here, there)
            .ok_or_else(|| QueryError::MissingJoin {
                from: here.to_string(),
                to: there.to_string(),
            })?;

        if !self.joined.add(edge) {
            return Ok(());
        }
        if self.present.contains(there) {
            self.query.where_clause(&edge.condition(), Vec::new());
        } else {
            self.query.join(edge.join_sql(there));
            self.present.insert(there.to_string());
        }
        Ok(())
    }

    /// Restrict rows to those the caller may see, or modify under write
    /// intent. Join failures here are errors.
    fn apply_acl(&mut self, identity: &Identity) -> Result<(), QueryError> {
        if !self.acl || self.acl_applied {
            return Ok(());
        }
        self.acl_applied = true;

        if identity.is_manager() {
            debug!(table = %self.table.name(), caller = %identity.name, "acl bypassed for manager");
            return Ok(());
        }

        match &identity.caller {
            Caller::Node { node_id } => {
                debug!(table = %self.table.name(), node_id = %node_id, "acl scoped to node app");
                self.try_auto_join("apps")?;
                self.try_auto_join("nodes")?;
                self.query
                    .where_clause(r#""apps"."app" = "nodes"."app""#, Vec::new())
                    .where_clause(r#""nodes"."node_id" = ?"#, vec![SqlValue::from(node_id)]);
            }
            Caller::User { user_id } => {
                let grants = self.intent.grant_table();
                debug!(table = %self.table.name(), user_id, grants, "acl scoped to user groups");
                self.try_auto_join(grants)?;
                self.join_edge(grants, "auth_membership")?;
                self.query.where_clause(
                    r#""auth_membership"."user_id" = ?"#,
                    vec![SqlValue::Int(*user_id)],
                );
            }
        }
        Ok(())
    }

    /// The property is exposed by a registered table.
    fn is_known(&self, prop: &Property) -> bool {
        self.registry
            .lookup(&prop.table)
            .is_some_and(|t| t.field_of(prop).is_some())
    }

    /// The property is exposed and its table is part of the query.
    fn is_usable(&self, prop: &Property) -> bool {
        self.is_known(prop) && self.present.contains(&prop.table)
    }

    fn apply_props(&mut self, requested: Vec<Property>) -> Vec<Property> {
        let included = self.select_props(requested);
        if !included.is_empty() {
            return included;
        }
        // Nothing usable was asked for. An empty projection would select
        // every column, hidden ones included.
        self.select_props(self.table.props())
    }

    fn select_props(&mut self, requested: Vec<Property>) -> Vec<Property> {
        let base = self.table.name();
        let requested = if requested.is_empty() {
            self.table.props()
        } else {
            requested
        };

        let mut included = Vec::with_capacity(requested.len());
        for prop in requested {
            if !self.is_known(&prop) {
                debug!(prop = %prop, "ignoring unknown property");
                continue;
            }
            if prop.table != base {
                self.auto_join(&prop.table);
                if !self.present.contains(&prop.table) {
                    continue;
                }
            }
            self.query.select(format!(
                "{} AS {}",
                prop.sql(),
                quote_ident(&prop.alias(base))
            ));
            included.push(prop);
        }
        included
    }

    fn apply_filters(&mut self, filters: &[String]) {
        if !self.filters {
            return;
        }
        for s in filters {
            let Some(filter) = parse_filter(s, self.table.name()) else {
                debug!(filter = %s, "ignoring malformed filter");
                continue;
            };
            if !self.is_usable(&filter.column) {
                debug!(filter = %s, "ignoring filter on unavailable property");
                continue;
            }

            let predicate = filter.predicate();
            if predicate.negated {
                self.query.not_clause(&predicate.sql, predicate.values);
            } else {
                self.query.where_clause(&predicate.sql, predicate.values);
            }
            self.valid_filters += 1;
        }
    }

    fn apply_groups(&mut self, groups: Vec<Property>) {
        for prop in groups {
            if self.is_usable(&prop) {
                self.query.group_by(prop.sql());
            }
        }
    }

    fn apply_orders(&mut self, orders: Vec<Property>) {
        for prop in orders {
            if self.is_usable(&prop) {
                self.query.order_by(prop.sql_with_order());
            }
        }
    }

    fn apply_paging(&mut self, offset: i64, limit: i64) {
        if self.paging {
            self.query.offset(offset).limit(limit);
        }
    }

    /// Apply access control, filters, ordering and paging and return the
    /// query for the handler to run.
    pub fn tx(
        &mut self,
        identity: &Identity,
        params: &QueryParams,
    ) -> Result<&mut TableQuery, QueryError> {
        if !self.scoped {
            self.scoped = true;
            let base = self.table.name();
            self.apply_acl(identity)?;
            self.apply_filters(&params.filters);
            self.apply_orders(params.orderby(base));
            self.apply_paging(params.offset(), params.limit());
        }
        Ok(&mut self.query)
    }

    /// Everything up to paging: access control, projection, filters,
    /// grouping and ordering. Returns the included properties.
    pub fn prepare(
        &mut self,
        identity: &Identity,
        params: &QueryParams,
    ) -> Result<Vec<Property>, QueryError> {
        let base = self.table.name();
        self.scoped = true;
        self.apply_acl(identity)?;
        let included = self.apply_props(params.props(base));
        self.apply_filters(&params.filters);
        self.apply_groups(params.groupby(base));
        self.apply_orders(params.orderby(base));
        Ok(included)
    }

    /// Run the full pipeline and assemble the envelope.
    pub async fn make_table_response(
        mut self,
        pool: &SqlitePool,
        identity: &Identity,
        params: &QueryParams,
    ) -> Result<TableResponse, QueryError> {
        let included = self.prepare(identity, params)?;

        let total = if params.meta() {
            Some(self.query.count(pool).await?)
        } else {
            None
        };

        let (offset, limit) = (params.offset().max(0), params.limit());
        self.apply_paging(offset, limit);

        let data = self.query.fetch_rows(pool).await?;

        let base = self.table.name();
        let meta = total.map(|total| TableResponseMeta {
            total,
            offset,
            limit,
            count: data.len(),
            available_props: self
                .registry
                .available_props(&included)
                .iter()
                .map(|p| p.label(base))
                .collect(),
            included_props: included.iter().map(|p| p.label(base)).collect(),
        });

        Ok(TableResponse { data, meta })
    }
}
