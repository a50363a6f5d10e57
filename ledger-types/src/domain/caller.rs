//! Resolved caller identity and the read scope it grants.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::account::UserId;

/// Capability of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    /// Back-office staff: sees every account and payment, approves payments.
    #[serde(rename = "back_office")]
    Privileged,
    /// Client: sees and pays from their own accounts only.
    #[serde(rename = "client")]
    Restricted,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Privileged => "back_office",
            Role::Restricted => "client",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "back_office" => Some(Role::Privileged),
            "client" => Some(Role::Restricted),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter applied to every read of accounts and payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Only rows reachable through accounts owned by this user.
    Owner(UserId),
}

/// Identity and role resolved by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn scope(&self) -> Scope {
        match self.role {
            Role::Privileged => Scope::All,
            Role::Restricted => Scope::Owner(self.user_id),
        }
    }

    pub fn is_privileged(&self) -> bool {
        self.role == Role::Privileged
    }
}
