//! REST route definitions
//!
//! Every resource handler follows the same shape: authenticate the caller
//! as an [`Identity`], open a [`TableRequest`] on the resource table,
//! narrow it with path parameters, then either let the request engine build
//! the paged envelope or run the scoped query and remap typed rows.

pub mod apps;
pub mod auth;
pub mod groups;
pub mod health;
pub mod nodes;
pub mod services;
pub mod tags;
pub mod users;

use axum::Router;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::sqlite::SqliteRow;

use crate::AppState;
use crate::error::ApiResult;
use crate::query::{Identity, QueryParams, SqlValue, TableRequest, TableResponse};

static RE_HEX_DIGEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{64}$").expect("hex digest regex"));

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(tags::router())
        .merge(nodes::router())
        .merge(services::router())
        .merge(apps::router())
        .merge(groups::router())
        .merge(users::router())
}

/// A JSON body holding either one object or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// How a path id addresses rows of a table: integers match `id`, uuids
/// and hex digests match the `key` column, anything else matches `name`.
#[derive(Debug, Clone, Copy)]
pub struct Lookup {
    pub table: &'static str,
    pub key: Option<&'static str>,
    pub name: &'static str,
}

pub const TAGS: Lookup = Lookup {
    table: "tags",
    key: Some("tag_id"),
    name: "tag_name",
};

pub const NODES: Lookup = Lookup {
    table: "nodes",
    key: Some("node_id"),
    name: "nodename",
};

pub const SERVICES: Lookup = Lookup {
    table: "services",
    key: Some("svc_id"),
    name: "svcname",
};

pub const APPS: Lookup = Lookup {
    table: "apps",
    key: None,
    name: "app",
};

pub const GROUPS: Lookup = Lookup {
    table: "auth_group",
    key: None,
    name: "role",
};

pub const USERS: Lookup = Lookup {
    table: "auth_user",
    key: None,
    name: "username",
};

impl Lookup {
    fn column(&self, id: &str) -> (&'static str, SqlValue) {
        if let Ok(n) = id.parse::<i64>() {
            return ("id", SqlValue::Int(n));
        }
        if let Some(key) = self.key {
            if uuid::Uuid::parse_str(id).is_ok() || RE_HEX_DIGEST.is_match(id) {
                return (key, SqlValue::from(id));
            }
        }
        (self.name, SqlValue::from(id))
    }

    /// Predicate selecting the row addressed by `id`.
    pub fn condition(&self, id: &str) -> (String, SqlValue) {
        let (column, value) = self.column(id);
        (format!("\"{}\".\"{}\" = ?", self.table, column), value)
    }

    /// Narrow `rq` to the row addressed by `id`. The lookup table must
    /// already be part of the request, either as base or joined.
    pub fn narrow(&self, rq: &mut TableRequest<'_>, id: &str) {
        if rq.table().name() != self.table {
            rq.auto_join(self.table);
        }
        let (condition, value) = self.condition(id);
        rq.where_clause(&condition, vec![value]);
    }
}

/// Rows of the request table addressed by `id`, scoped for `identity`.
/// Duplicates produced by access control joins are collapsed.
pub async fn find_by_id<T>(
    state: &AppState,
    rq: TableRequest<'_>,
    identity: &Identity,
    params: &QueryParams,
    lookup: &Lookup,
    id: &str,
) -> ApiResult<Vec<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut rq = rq.paging(false);
    lookup.narrow(&mut rq, id);
    rq.tx(identity, params)?
        .group_by(format!("\"{}\".\"id\"", lookup.table));
    let rows = rq.into_query().fetch_all::<T>(state.db.pool()).await?;
    Ok(rows)
}

/// `{"data": [...]}` envelope of typed rows projected on the requested props.
pub fn detail_response<T: Serialize>(
    state: &AppState,
    table: &str,
    rows: &[T],
    params: &QueryParams,
) -> ApiResult<TableResponse> {
    let table = state.registry.table(table)?;
    let data = table.remap(rows, &params.props(table.name()))?;
    Ok(TableResponse::data(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn path_ids_pick_the_lookup_column() {
        assert_eq!(TAGS.condition("12"), (r#""tags"."id" = ?"#.to_string(), SqlValue::Int(12)));

        let digest = crate::entities::tag_id_for("prod");
        assert_eq!(TAGS.condition(&digest).0, r#""tags"."tag_id" = ?"#);
        assert_eq!(TAGS.condition("prod").0, r#""tags"."tag_name" = ?"#);

        let uuid = "0b7d1c50-3d3e-4b8a-9e5e-2f0c1c4a1b11";
        assert_eq!(NODES.condition(uuid).0, r#""nodes"."node_id" = ?"#);
        assert_eq!(NODES.condition("node1").0, r#""nodes"."nodename" = ?"#);
        assert_eq!(APPS.condition(uuid).0, r#""apps"."app" = ?"#);
    }
}
