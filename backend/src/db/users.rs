//! Users repository for authentication and authorization
//!
//! Handles users, groups, memberships and the privileges derived from them.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::entities::{Group, User};

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: String,
}

pub struct UsersRepository {
    pool: SqlitePool,
}

impl UsersRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========================================================================
    // User CRUD
    // ========================================================================

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM auth_user WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Get user by username or email (case-insensitive)
    pub async fn get_by_login(&self, login: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM auth_user WHERE username = ?1 COLLATE NOCASE OR email = ?1 COLLATE NOCASE ORDER BY id LIMIT 1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Create a user and return its id
    pub async fn create(&self, input: CreateUser) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO auth_user (username, first_name, last_name, email, password)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.username)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Delete a user and its memberships
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM auth_membership WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM auth_user WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Groups and privileges
    // ========================================================================

    pub async fn get_group_by_role(&self, role: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>("SELECT * FROM auth_group WHERE role = ?")
            .bind(role)
            .fetch_optional(&self.pool)
            .await?;
        Ok(group)
    }

    /// Create a group if no group holds the role yet. Returns rows inserted.
    pub async fn ensure_group(&self, role: &str, description: &str, privilege: bool) -> Result<u64> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO auth_group (role, description, privilege) VALUES (?, ?, ?)",
        )
        .bind(role)
        .bind(description)
        .bind(privilege)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn add_membership(&self, user_id: i64, group_id: i64, primary_group: bool) -> Result<()> {
        sqlx::query(
            "INSERT INTO auth_membership (user_id, group_id, primary_group) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(group_id)
        .bind(primary_group)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Roles of the privilege groups the user is a member of
    pub async fn privileges(&self, user_id: i64) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT g.role
            FROM auth_group g
            JOIN auth_membership m ON m.group_id = g.id
            WHERE m.user_id = ? AND g.privilege = 1
            ORDER BY g.role
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(role,)| role).collect())
    }
}
