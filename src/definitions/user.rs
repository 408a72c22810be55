//! People referenced by team definitions

use serde::{Deserialize, Serialize};

/// Governance role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Organization admin
    Admin,
    /// Maintainer of a team
    Maintainer,
    /// Reviewer of a team
    Reviewer,
    /// Regular member
    Member,
}

/// A person listed in a team definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Display name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Email address
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    /// GitHub login; required
    #[serde(default)]
    pub github: String,
    /// Discord handle
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub discord: String,
    /// Role, when stated explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

impl User {
    /// Create a user known only by GitHub login
    pub fn with_github(login: impl Into<String>) -> Self {
        Self {
            github: login.into(),
            ..Self::default()
        }
    }

    /// Whether this user is `login` (GitHub logins are case-insensitive)
    pub fn is(&self, login: &str) -> bool {
        self.github.eq_ignore_ascii_case(login)
    }
}
