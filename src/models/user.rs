//! User model
//!
//! Users sign in to the dashboard. What they may do there is decided by
//! their [`UserRole`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered dashboard user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email address (unique, used to log in)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// User role
    pub role: UserRole,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// The password must already be hashed with
    /// `services::password::hash_password()`.
    pub fn new(name: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            name,
            email,
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Check if the user is an editor (or higher)
    pub fn is_editor(&self) -> bool {
        self.role.at_least(UserRole::Editor)
    }
}

/// Dashboard role, ordered from least to most privileged.
///
/// - Reader: read-only dashboard access
/// - Contributor: writes drafts and uploads images, cannot publish
/// - Editor: publishes, moderates and manages site content
/// - Admin: everything, including user management
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Reader,
    Contributor,
    Editor,
    Admin,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::Reader,
        UserRole::Contributor,
        UserRole::Editor,
        UserRole::Admin,
    ];

    /// Whether this role grants at least the privileges of `required`
    pub fn at_least(self, required: UserRole) -> bool {
        self >= required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Reader => "reader",
            UserRole::Contributor => "contributor",
            UserRole::Editor => "editor",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reader" => Ok(UserRole::Reader),
            "contributor" => Ok(UserRole::Contributor),
            "editor" => Ok(UserRole::Editor),
            "admin" => Ok(UserRole::Admin),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Input for creating a new user (before password hashing)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    /// Role to assign; self-registration ignores this
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "hashed_password".to_string(),
            UserRole::Contributor,
        );

        assert_eq!(user.id, 0);
        assert_eq!(user.name, "Ada");
        assert_eq!(user.role, UserRole::Contributor);
        assert!(!user.is_admin());
        assert!(!user.is_editor());
    }

    #[test]
    fn test_role_ordering() {
        assert!(UserRole::Reader < UserRole::Contributor);
        assert!(UserRole::Contributor < UserRole::Editor);
        assert!(UserRole::Editor < UserRole::Admin);

        assert!(UserRole::Admin.at_least(UserRole::Editor));
        assert!(UserRole::Editor.at_least(UserRole::Editor));
        assert!(!UserRole::Contributor.at_least(UserRole::Editor));
        assert!(UserRole::Reader.at_least(UserRole::Reader));
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("Editor".parse::<UserRole>().unwrap(), UserRole::Editor);
        assert_eq!(" contributor ".parse::<UserRole>().unwrap(), UserRole::Contributor);
        assert!("author".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("A".into(), "a@example.com".into(), "secret".into(), UserRole::Admin);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "admin");
    }

    fn any_role() -> impl Strategy<Value = UserRole> {
        prop::sample::select(UserRole::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_role_display_roundtrip(role in any_role()) {
            prop_assert_eq!(role.to_string().parse::<UserRole>().unwrap(), role);
        }

        #[test]
        fn prop_at_least_is_transitive(a in any_role(), b in any_role(), c in any_role()) {
            if a.at_least(b) && b.at_least(c) {
                prop_assert!(a.at_least(c));
            }
        }
    }
}
