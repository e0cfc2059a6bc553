use collector_macros::TableEntity;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "nodes")]
pub struct Node {
    #[column(primary_key)]
    pub id: i64,
    #[column(unique)]
    pub node_id: String,
    pub nodename: String,
    pub app: Option<String>,
    pub cluster_id: Option<String>,
    pub node_env: Option<String>,
    pub status: Option<String>,
    pub os_name: Option<String>,
    pub os_vendor: Option<String>,
    pub os_release: Option<String>,
    pub team_responsible: Option<String>,
    pub fqdn: Option<String>,
    pub updated: Option<String>,
}

/// Credentials of a node agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "auth_node")]
pub struct AuthNode {
    #[column(primary_key)]
    pub id: i64,
    pub nodename: String,
    #[column(unique)]
    pub node_id: String,
    #[column(skip)]
    #[serde(skip_serializing)]
    pub uuid: String,
    pub updated: Option<String>,
}
