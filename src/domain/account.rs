use crate::domain::Role;

/// A login account known to the Auth API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub name: String,
    pub role: Role,
}

/// Payload for creating an account.
///
/// The role is not part of the payload: the endpoint decides it
/// (self-registration yields a customer, admin creation yields a cashier).
#[derive(Clone)]
pub struct AccountCreate {
    pub username: String,
    pub name: String,
    pub password: String,
}

impl std::fmt::Debug for AccountCreate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCreate")
            .field("username", &self.username)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl AccountCreate {
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            name: name.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("Username must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("Name must not be empty".to_string());
        }
        if self.password.len() < 8 {
            return Err("Password must be at least 8 characters".to_string());
        }
        Ok(())
    }
}
