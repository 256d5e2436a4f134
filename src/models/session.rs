use std::fmt;

use serde::{Deserialize, Serialize};

/// An authenticated user on this device.
///
/// Created by a successful login and destroyed by logout. Every call to the
/// proxy borrows one; there is no ambient token lookup.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub full_name: String,
}

impl Session {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Name to greet the user with.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Result of looking up a Google account email on the Moodle side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub email: String,
    pub username: String,
}
