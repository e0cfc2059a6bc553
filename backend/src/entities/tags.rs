//! Tags and their attachments to nodes and services

use collector_macros::TableEntity;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "tags")]
pub struct Tag {
    #[column(primary_key)]
    pub id: i64,
    /// Hex SHA-256 of `tag_name`
    #[column(unique)]
    pub tag_id: String,
    #[column(unique)]
    pub tag_name: String,
    pub tag_exclude: Option<String>,
    pub tag_data: Option<String>,
    pub tag_created: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "node_tags")]
pub struct NodeTag {
    #[column(primary_key)]
    pub id: i64,
    pub node_id: String,
    pub tag_id: String,
    pub tag_attach_data: Option<String>,
    pub created: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, TableEntity)]
#[table(name = "svc_tags")]
pub struct ServiceTag {
    #[column(primary_key)]
    pub id: i64,
    pub svc_id: String,
    pub tag_id: String,
    pub tag_attach_data: Option<String>,
    pub created: Option<String>,
}

/// Stable identifier derived from a tag name.
pub fn tag_id_for(tag_name: &str) -> String {
    Sha256::digest(tag_name.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_ids_are_hex_sha256() {
        let id = tag_id_for("prod");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(id, tag_id_for("prod"));
        assert_ne!(id, tag_id_for("dev"));
    }
}
