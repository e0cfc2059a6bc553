//! Tags repository

use anyhow::Result;
use serde::Deserialize;
use sqlx::SqlitePool;

use super::sqlite_helpers::{now_iso8601, placeholders};
use crate::entities::{Tag, tag_id_for};

/// Tag fields accepted on create or update
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertTag {
    pub tag_name: String,
    pub tag_exclude: Option<String>,
    pub tag_data: Option<String>,
}

/// Ids bound per DELETE statement, well under SQLite's variable limit.
const DELETE_CHUNK: usize = 500;

pub struct TagsRepository {
    pool: SqlitePool,
}

impl TagsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_name(&self, tag_name: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE tag_name = ?")
            .bind(tag_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    /// Insert a tag, or update the exclusion and data of the existing tag
    /// with the same name
    pub async fn upsert(&self, input: &UpsertTag) -> Result<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (tag_id, tag_name, tag_exclude, tag_data, tag_created)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(tag_name) DO UPDATE SET
                tag_exclude = excluded.tag_exclude,
                tag_data = excluded.tag_data
            RETURNING *
            "#,
        )
        .bind(tag_id_for(&input.tag_name))
        .bind(&input.tag_name)
        .bind(&input.tag_exclude)
        .bind(&input.tag_data)
        .bind(now_iso8601())
        .fetch_one(&self.pool)
        .await?;
        Ok(tag)
    }

    /// Delete tags with their node and service attachments. Runs in one
    /// transaction, binding at most `DELETE_CHUNK` ids per statement.
    pub async fn delete_many(&self, tags: &[Tag]) -> Result<u64> {
        if tags.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut deleted = 0;

        for chunk in tags.chunks(DELETE_CHUNK) {
            let tag_ids = placeholders(chunk.len());

            for table in ["node_tags", "svc_tags"] {
                let sql = format!("DELETE FROM {} WHERE tag_id IN ({})", table, tag_ids);
                let mut query = sqlx::query(&sql);
                for tag in chunk {
                    query = query.bind(&tag.tag_id);
                }
                query.execute(&mut *tx).await?;
            }

            let sql = format!("DELETE FROM tags WHERE id IN ({})", tag_ids);
            let mut query = sqlx::query(&sql);
            for tag in chunk {
                query = query.bind(tag.id);
            }
            deleted += query.execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(deleted)
    }
}
