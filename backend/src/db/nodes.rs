//! Nodes repository

use anyhow::Result;
use sqlx::SqlitePool;

use crate::entities::{AuthNode, Node};
use crate::query::{SqlValue, execute_with_binds};

pub struct NodesRepository {
    pool: SqlitePool,
}

impl NodesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_node_id(&self, node_id: &str) -> Result<Option<Node>> {
        let node = sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE node_id = ?")
            .bind(node_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(node)
    }

    /// Agent credentials registered for a node name
    pub async fn get_auth_node(&self, nodename: &str) -> Result<Option<AuthNode>> {
        let auth_node = sqlx::query_as::<_, AuthNode>(
            "SELECT * FROM auth_node WHERE nodename = ? ORDER BY id LIMIT 1",
        )
        .bind(nodename)
        .fetch_optional(&self.pool)
        .await?;
        Ok(auth_node)
    }

    /// Set the given columns of a node. Column names must be validated by
    /// the caller.
    pub async fn update(&self, id: i64, changes: &[(String, SqlValue)]) -> Result<u64> {
        if changes.is_empty() {
            return Ok(0);
        }

        let assignments: Vec<String> = changes
            .iter()
            .map(|(column, _)| format!("\"{}\" = ?", column))
            .collect();
        let sql = format!("UPDATE nodes SET {} WHERE id = ?", assignments.join(", "));

        let mut values: Vec<SqlValue> = changes.iter().map(|(_, v)| v.clone()).collect();
        values.push(SqlValue::Int(id));

        Ok(execute_with_binds(&self.pool, &sql, &values).await?)
    }

    /// Delete a node with its tag attachments and service instances
    pub async fn delete(&self, node: &Node) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        for sql in [
            "DELETE FROM node_tags WHERE node_id = ?",
            "DELETE FROM svcmon WHERE node_id = ?",
        ] {
            sqlx::query(sql).bind(&node.node_id).execute(&mut *tx).await?;
        }
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(node.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
