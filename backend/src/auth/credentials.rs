//! Basic authentication against stored credentials

use anyhow::Result;

use crate::db::Database;
use crate::query::Identity;

/// Node agents authenticate with their node name and registration uuid.
pub async fn authenticate_node(db: &Database, nodename: &str, uuid: &str) -> Result<Option<Identity>> {
    let Some(auth_node) = db.nodes().get_auth_node(nodename).await? else {
        return Ok(None);
    };
    if auth_node.uuid.is_empty() || auth_node.uuid != uuid {
        return Ok(None);
    }
    Ok(Some(Identity::node(auth_node.node_id, auth_node.nodename)))
}

/// Users authenticate with their username or email and password.
pub async fn authenticate_user(db: &Database, login: &str, password: &str) -> Result<Option<Identity>> {
    let users = db.users();
    let Some(user) = users.get_by_login(login).await? else {
        return Ok(None);
    };
    if !bcrypt::verify(password, &user.password).unwrap_or(false) {
        tracing::debug!(login = %login, "Password mismatch");
        return Ok(None);
    }

    let privileges = users.privileges(user.id).await?;
    Ok(Some(Identity::user(user.id, user.username, privileges)))
}
