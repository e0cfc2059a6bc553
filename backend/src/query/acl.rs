//! Caller identity and access scoping rules

use serde::{Deserialize, Serialize};

/// Full visibility and every other privilege.
pub const MANAGER: &str = "Manager";
pub const TAG_MANAGER: &str = "TagManager";
pub const NODE_MANAGER: &str = "NodeManager";
pub const USER_MANAGER: &str = "UserManager";

/// The kind of principal behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Caller {
    /// A machine, scoped to the app of its own node.
    Node { node_id: String },
    /// A human user, scoped through group membership.
    User { user_id: i64 },
}

/// An authenticated caller and its named privileges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub caller: Caller,
    pub name: String,
    #[serde(default)]
    pub privileges: Vec<String>,
}

impl Identity {
    pub fn node(node_id: impl Into<String>, nodename: impl Into<String>) -> Self {
        Self {
            caller: Caller::Node {
                node_id: node_id.into(),
            },
            name: nodename.into(),
            privileges: Vec::new(),
        }
    }

    pub fn user(user_id: i64, username: impl Into<String>, privileges: Vec<String>) -> Self {
        Self {
            caller: Caller::User { user_id },
            name: username.into(),
            privileges,
        }
    }

    pub fn is_manager(&self) -> bool {
        self.privileges.iter().any(|p| p == MANAGER)
    }

    /// True when the caller holds `privilege` or is a manager.
    pub fn has_privilege(&self, privilege: &str) -> bool {
        self.is_manager() || self.privileges.iter().any(|p| p == privilege)
    }

    pub fn user_id(&self) -> Option<i64> {
        match self.caller {
            Caller::User { user_id } => Some(user_id),
            Caller::Node { .. } => None,
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        match &self.caller {
            Caller::Node { node_id } => Some(node_id),
            Caller::User { .. } => None,
        }
    }
}

/// What the caller intends to do with the selected rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Intent {
    #[default]
    Read,
    Write,
}

impl Intent {
    /// Table granting apps to groups for this intent.
    pub fn grant_table(self) -> &'static str {
        match self {
            Intent::Read => "apps_publications",
            Intent::Write => "apps_responsibles",
        }
    }
}
