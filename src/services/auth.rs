use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::client::MoodleApi;
use crate::db::repository;
use crate::error::AppError;
use crate::models::{LinkedAccount, Session};

/// Owns the session lifecycle: login creates and persists it, logout
/// removes every trace of it.
pub struct AuthService {
    db: SqlitePool,
    api: Arc<dyn MoodleApi>,
}

impl AuthService {
    pub fn new(db: SqlitePool, api: Arc<dyn MoodleApi>) -> Self {
        Self { db, api }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AppError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }

        let session = self.api.login(username, password).await?;
        repository::save_session(&self.db, &session).await?;
        info!("logged in as {} (user {})", session.username, session.user_id);
        Ok(session)
    }

    /// Look up the Moodle username registered for a Google email.
    pub async fn google_link(&self, email: &str) -> Result<LinkedAccount, AppError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::InvalidInput(format!("not an email address: {}", email)));
        }
        self.api.google_link(email).await
    }

    pub async fn restore(&self) -> Result<Session, AppError> {
        repository::load_session(&self.db)
            .await?
            .ok_or_else(|| AppError::Auth("not logged in".to_string()))
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        let removed = repository::clear_session(&self.db).await?;
        info!("logged out ({} session keys removed)", removed);
        Ok(())
    }
}
