use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of roles a bearer credential can carry.
///
/// Roles are mutually exclusive and not hierarchical: every permission is
/// enumerated per role in [`crate::policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Kasir,
    Pembeli,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Kasir, Role::Pembeli];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Kasir => "KASIR",
            Role::Pembeli => "PEMBELI",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who the current bearer credential says the caller is.
///
/// Derived from token claims and never persisted on its own. It lives exactly
/// as long as the credential it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub name: Option<String>,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    /// True once `now` has reached the expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
