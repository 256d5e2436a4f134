use std::sync::Arc;

use sqlx::SqlitePool;

use crate::client::{HttpMoodleApi, MoodleApi};
use crate::config::ClientConfig;
use crate::db;
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: ClientConfig,
    pub db: SqlitePool,
    pub api: Arc<dyn MoodleApi>,
}

impl AppState {
    pub async fn connect(config: ClientConfig) -> Result<Self, AppError> {
        let db = db::connect(&config.session_db_url).await?;
        let api = Arc::new(HttpMoodleApi::new(config.clone())?);
        Ok(Self { config, db, api })
    }
}
