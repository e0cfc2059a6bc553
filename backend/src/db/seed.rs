//! Pre-seed data for initial database setup.
//!
//! Runs after schema sync to insert the privilege groups and, when
//! configured, an administrator account. Existing rows are preserved so
//! re-runs are idempotent.

use tracing::{debug, info, warn};

use super::Database;
use super::users::CreateUser;
use crate::config::Config;
use crate::query::acl::{MANAGER, NODE_MANAGER, TAG_MANAGER, USER_MANAGER};

/// Result of running seed operations.
#[derive(Debug, Default)]
pub struct SeedResult {
    pub tables_seeded: Vec<String>,
    pub errors: Vec<String>,
}

const PRIVILEGE_GROUPS: &[(&str, &str)] = &[
    (MANAGER, "Full access to every object"),
    (TAG_MANAGER, "Create and delete tags"),
    (NODE_MANAGER, "Modify and delete nodes"),
    (USER_MANAGER, "Create and delete users"),
];

async fn seed_privilege_groups(db: &Database) -> anyhow::Result<u64> {
    let users = db.users();
    let mut inserted = 0;
    for (role, description) in PRIVILEGE_GROUPS {
        inserted += users.ensure_group(role, description, true).await?;
    }
    Ok(inserted)
}

/// Create the configured administrator as a member of the Manager group.
async fn seed_admin(db: &Database, config: &Config) -> anyhow::Result<u64> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
    else {
        return Ok(0);
    };

    let users = db.users();
    if users.get_by_login(username).await?.is_some() {
        debug!(username = %username, "Admin user already exists");
        return Ok(0);
    }

    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    let user_id = users
        .create(CreateUser {
            username: username.clone(),
            first_name: None,
            last_name: None,
            email: None,
            password_hash,
        })
        .await?;

    let group = users
        .get_group_by_role(MANAGER)
        .await?
        .ok_or_else(|| anyhow::anyhow!("{} group is missing", MANAGER))?;
    users.add_membership(user_id, group.id, true).await?;

    Ok(1)
}

pub async fn run_seeds(db: &Database, config: &Config) -> SeedResult {
    let mut result = SeedResult::default();

    for (table, count) in [
        ("auth_group", seed_privilege_groups(db).await),
        ("auth_user", seed_admin(db, config).await),
    ] {
        match count {
            Ok(n) => {
                if n > 0 {
                    debug!(table = table, count = n, "Seeded table");
                    result.tables_seeded.push(format!("{} ({} rows)", table, n));
                }
            }
            Err(e) => {
                let msg = format!("Seed {}: {}", table, e);
                warn!("{}", msg);
                result.errors.push(msg);
            }
        }
    }

    if !result.tables_seeded.is_empty() {
        info!(tables = ?result.tables_seeded, "Pre-seed data applied");
    }

    result
}
