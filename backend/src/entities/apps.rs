//! Applications and the groups they are granted to

use collector_macros::TableEntity;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "apps")]
pub struct App {
    #[column(primary_key)]
    pub id: i64,
    #[column(unique)]
    pub app: String,
    pub app_domain: Option<String>,
    pub app_team_ops: Option<String>,
    pub description: Option<String>,
    pub updated: Option<String>,
}

/// Read access of a group to an app.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "apps_publications")]
pub struct AppPublication {
    #[column(primary_key)]
    pub id: i64,
    pub app_id: i64,
    pub group_id: i64,
}

/// Write access of a group to an app.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "apps_responsibles")]
pub struct AppResponsible {
    #[column(primary_key)]
    pub id: i64,
    pub app_id: i64,
    pub group_id: i64,
}
