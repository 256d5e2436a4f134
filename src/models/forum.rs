use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forum {
    pub id: i64,
    pub cmid: Option<i64>,
    pub name: String,
    pub due_date: Option<DateTime<Utc>>,
    pub cutoff_date: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// A row of a forum's discussion list. `discussion_id` is what the post
/// endpoint expects, `id` is the first post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: i64,
    pub discussion_id: i64,
    pub subject: String,
    pub author: String,
    pub message: String,
    pub created: Option<DateTime<Utc>>,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub subject: String,
    pub author: String,
    pub message: String,
    pub created: Option<DateTime<Utc>>,
}

/// Body of `POST /forum/reply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyRequest {
    pub postid: i64,
    pub subject: String,
    pub message: String,
}
