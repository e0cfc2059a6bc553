//! Users, groups and memberships

use collector_macros::TableEntity;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "auth_user")]
pub struct User {
    #[column(primary_key)]
    pub id: i64,
    #[column(unique)]
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// bcrypt hash
    #[column(skip)]
    #[serde(skip_serializing)]
    pub password: String,
    pub registration_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "auth_group")]
pub struct Group {
    #[column(primary_key)]
    pub id: i64,
    #[column(unique)]
    pub role: String,
    pub description: Option<String>,
    /// The role name is a privilege granted to members
    pub privilege: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "auth_membership")]
pub struct Membership {
    #[column(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub group_id: i64,
    pub primary_group: bool,
}
