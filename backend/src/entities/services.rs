use collector_macros::TableEntity;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "services")]
pub struct Service {
    #[column(primary_key)]
    pub id: i64,
    #[column(unique)]
    pub svc_id: String,
    pub svcname: String,
    pub cluster_id: Option<String>,
    pub svc_app: Option<String>,
    pub svc_env: Option<String>,
    pub svc_status: Option<String>,
    pub svc_availstatus: Option<String>,
    pub svc_topology: Option<String>,
    pub updated: Option<String>,
}

/// Instance of a service on a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "svcmon")]
pub struct ServiceInstance {
    #[column(primary_key)]
    pub id: i64,
    pub svc_id: String,
    pub node_id: String,
    pub mon_vmname: Option<String>,
    pub mon_availstatus: Option<String>,
    pub mon_overallstatus: Option<String>,
    pub mon_updated: Option<String>,
}
