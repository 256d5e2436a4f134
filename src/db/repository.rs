use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::Session;

const KEY_TOKEN: &str = "userToken";
const KEY_USER_ID: &str = "userId";
const KEY_USER_NAME: &str = "userName";
const KEY_FULL_NAME: &str = "fullName";

pub async fn save_session(db: &SqlitePool, session: &Session) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let user_id = session.user_id.to_string();
    let pairs = [
        (KEY_TOKEN, session.token.as_str()),
        (KEY_USER_ID, user_id.as_str()),
        (KEY_USER_NAME, session.username.as_str()),
        (KEY_FULL_NAME, session.full_name.as_str()),
    ];

    let mut tx = db.begin().await?;
    for (key, value) in pairs {
        sqlx::query(
            r#"
            INSERT INTO session_kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

/// `None` when no token is stored.
pub async fn load_session(db: &SqlitePool) -> Result<Option<Session>, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM session_kv")
        .fetch_all(db)
        .await?;
    let mut values: HashMap<String, String> = rows.into_iter().collect();

    let token = match values.remove(KEY_TOKEN).filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => return Ok(None),
    };
    let user_id = values
        .remove(KEY_USER_ID)
        .unwrap_or_default()
        .parse::<i64>()
        .map_err(|e| sqlx::Error::Decode(format!("stored userId is not a number: {}", e).into()))?;

    Ok(Some(Session {
        token,
        user_id,
        username: values.remove(KEY_USER_NAME).unwrap_or_default(),
        full_name: values.remove(KEY_FULL_NAME).unwrap_or_default(),
    }))
}

/// Remove every session key. Returns how many rows went away.
pub async fn clear_session(db: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM session_kv").execute(db).await?;
    Ok(result.rows_affected())
}
