//! Join graph and path resolution
//!
//! Direct joins are declared as undirected [`JoinEdge`]s. Tables with no
//! direct edge between them are connected through a [`Route`] listing the
//! intermediate hops. Both lists are static configuration.

use std::collections::HashSet;

use super::property::quote_ident;

/// A direct join between two tables on one or more column equalities.
/// Each pair is `(column of from, column of to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinEdge {
    pub from: &'static str,
    pub to: &'static str,
    pub cols: &'static [(&'static str, &'static str)],
}

impl JoinEdge {
    pub const fn new(
        from: &'static str,
        to: &'static str,
        cols: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { from, to, cols }
    }

    /// Whether the edge connects `a` and `b`, in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    /// Direction independent identity of the edge.
    pub fn key(&self) -> String {
        pair_key(self.from, self.to)
    }

    /// The equality conditions, `"from"."c0" = "to"."c1" AND ...`.
    pub fn condition(&self) -> String {
        self.cols
            .iter()
            .map(|(left, right)| {
                format!(
                    "{}.{} = {}.{}",
                    quote_ident(self.from),
                    quote_ident(left),
                    quote_ident(self.to),
                    quote_ident(right)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// `LEFT JOIN` clause bringing `there` into the query.
    pub fn join_sql(&self, there: &str) -> String {
        format!("LEFT JOIN {} ON {}", quote_ident(there), self.condition())
    }
}

/// A multi-hop path between two tables with no direct edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub from: &'static str,
    pub to: &'static str,
    pub via: &'static [&'static str],
}

impl Route {
    pub const fn new(from: &'static str, to: &'static str, via: &'static [&'static str]) -> Self {
        Self { from, to, via }
    }
}

fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}

#[derive(Debug, Clone, Default)]
pub struct JoinGraph {
    edges: Vec<JoinEdge>,
    routes: Vec<Route>,
}

impl JoinGraph {
    pub fn new(edges: impl Into<Vec<JoinEdge>>, routes: impl Into<Vec<Route>>) -> Self {
        Self {
            edges: edges.into(),
            routes: routes.into(),
        }
    }

    pub fn edges(&self) -> &[JoinEdge] {
        &self.edges
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Direct edge between `a` and `b`, whichever side it was declared from.
    pub fn find_edge(&self, a: &str, b: &str) -> Option<&JoinEdge> {
        self.edges.iter().find(|e| e.connects(a, b))
    }

    /// Ordered hops to walk from `from` to reach `to`, `to` included.
    pub fn resolve_path<'a>(&'a self, from: &str, to: &'a str) -> Vec<&'a str> {
        for route in &self.routes {
            if route.from == from && route.to == to {
                let mut hops: Vec<&str> = route.via.to_vec();
                hops.push(route.to);
                return hops;
            }
            if route.from == to && route.to == from {
                let mut hops: Vec<&str> = route.via.iter().rev().copied().collect();
                hops.push(route.from);
                return hops;
            }
        }
        vec![to]
    }
}

/// Join edges already materialized in one request.
#[derive(Debug, Clone, Default)]
pub struct JoinedTables {
    edges: HashSet<String>,
}

impl JoinedTables {
    pub fn has(&self, edge: &JoinEdge) -> bool {
        self.edges.contains(&edge.key())
    }

    /// Returns false when the edge was already present.
    pub fn add(&mut self, edge: &JoinEdge) -> bool {
        self.edges.insert(edge.key())
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Direct joins of the collector schema.
pub const EDGES: &[JoinEdge] = &[
    JoinEdge::new("tags", "node_tags", &[("tag_id", "tag_id")]),
    JoinEdge::new("tags", "svc_tags", &[("tag_id", "tag_id")]),
    JoinEdge::new("nodes", "node_tags", &[("node_id", "node_id")]),
    JoinEdge::new("nodes", "svcmon", &[("node_id", "node_id")]),
    JoinEdge::new("nodes", "apps", &[("app", "app")]),
    JoinEdge::new("services", "apps", &[("svc_app", "app")]),
    JoinEdge::new("services", "svcmon", &[("svc_id", "svc_id")]),
    JoinEdge::new("services", "svc_tags", &[("svc_id", "svc_id")]),
    JoinEdge::new("svcmon", "svc_tags", &[("svc_id", "svc_id")]),
    JoinEdge::new("auth_user", "auth_membership", &[("id", "user_id")]),
    JoinEdge::new("auth_group", "auth_membership", &[("id", "group_id")]),
    JoinEdge::new("auth_membership", "apps_publications", &[("group_id", "group_id")]),
    JoinEdge::new("auth_membership", "apps_responsibles", &[("group_id", "group_id")]),
    JoinEdge::new("apps", "apps_publications", &[("id", "app_id")]),
    JoinEdge::new("apps", "apps_responsibles", &[("id", "app_id")]),
    JoinEdge::new("auth_node", "nodes", &[("node_id", "node_id")]),
];

/// Multi-hop paths of the collector schema.
pub const ROUTES: &[Route] = &[
    Route::new("tags", "nodes", &["node_tags"]),
    Route::new("tags", "services", &["svc_tags"]),
    Route::new("tags", "apps", &["node_tags", "nodes"]),
    Route::new("tags", "apps_publications", &["node_tags", "nodes", "apps"]),
    Route::new("tags", "apps_responsibles", &["node_tags", "nodes", "apps"]),
    Route::new(
        "tags",
        "auth_membership",
        &["node_tags", "nodes", "apps", "apps_publications"],
    ),
    Route::new("nodes", "apps_publications", &["apps"]),
    Route::new("nodes", "apps_responsibles", &["apps"]),
    Route::new("nodes", "auth_membership", &["apps", "apps_publications"]),
    Route::new("node_tags", "apps", &["nodes"]),
    Route::new("node_tags", "apps_publications", &["nodes", "apps"]),
    Route::new("node_tags", "apps_responsibles", &["nodes", "apps"]),
    Route::new(
        "node_tags",
        "auth_membership",
        &["nodes", "apps", "apps_publications"],
    ),
    Route::new("services", "nodes", &["svcmon"]),
    Route::new("services", "apps_publications", &["apps"]),
    Route::new("services", "apps_responsibles", &["apps"]),
    Route::new("services", "auth_membership", &["apps", "apps_publications"]),
    Route::new("svc_tags", "nodes", &["svcmon"]),
    Route::new("svc_tags", "apps", &["services"]),
    Route::new("svc_tags", "apps_publications", &["services", "apps"]),
    Route::new("svc_tags", "apps_responsibles", &["services", "apps"]),
    Route::new(
        "svc_tags",
        "auth_membership",
        &["services", "apps", "apps_publications"],
    ),
    Route::new("auth_user", "auth_group", &["auth_membership"]),
    Route::new("auth_user", "apps_publications", &["auth_membership"]),
    Route::new("auth_user", "apps_responsibles", &["auth_membership"]),
    Route::new("auth_user", "apps", &["auth_membership", "apps_publications"]),
];

impl JoinGraph {
    /// The static joins and routes of the collector schema.
    pub fn collector() -> Self {
        Self::new(EDGES, ROUTES)
    }
}
