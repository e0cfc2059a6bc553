//! Table definitions of the collector schema

mod apps;
mod nodes;
mod services;
mod tags;
mod users;

pub use apps::{App, AppPublication, AppResponsible};
pub use nodes::{AuthNode, Node};
pub use services::{Service, ServiceInstance};
pub use tags::{NodeTag, ServiceTag, Tag, tag_id_for};
pub use users::{Group, Membership, User};

use crate::query::{JoinGraph, Registry};

/// Registry of every collector table, joined by the collector join graph.
pub fn registry() -> Registry {
    let mut registry = Registry::new(JoinGraph::collector());
    registry
        .register::<App>()
        .register::<AppPublication>()
        .register::<AppResponsible>()
        .register::<Node>()
        .register::<AuthNode>()
        .register::<Service>()
        .register::<ServiceInstance>()
        .register::<Tag>()
        .register::<NodeTag>()
        .register::<ServiceTag>()
        .register::<User>()
        .register::<Group>()
        .register::<Membership>();
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Property, TableEntity};

    #[test]
    fn derived_fields_follow_struct_layout() {
        let fields = Tag::fields();
        assert_eq!(Tag::TABLE_NAME, "tags");
        assert_eq!(fields[0].name, "id");
        assert!(fields[0].primary_key);
        assert_eq!(fields[0].sql_type, "INTEGER");

        let tag_data = fields.iter().find(|f| f.name == "tag_data").unwrap();
        assert!(tag_data.nullable);
        assert_eq!(tag_data.sql_type, "TEXT");

        let privilege = Group::fields().iter().find(|f| f.name == "privilege").unwrap();
        assert_eq!(privilege.sql_type, "BOOLEAN");
    }

    #[test]
    fn hidden_columns_are_not_properties() {
        let registry = registry();
        let users = registry.table("auth_user").unwrap();
        assert!(users.has_column("password"));
        assert!(!users.props().contains(&Property::new("auth_user", "password")));
        assert!(users.props().contains(&Property::new("auth_user", "username")));
    }

    #[test]
    fn every_edge_joins_registered_columns() {
        let registry = registry();
        for edge in registry.graph().edges() {
            let from = registry.table(edge.from).unwrap();
            let to = registry.table(edge.to).unwrap();
            for (left, right) in edge.cols {
                assert!(from.has_column(left), "{}.{left}", edge.from);
                assert!(to.has_column(right), "{}.{right}", edge.to);
            }
        }
    }
}
