#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use aula::client::MoodleApi;
use aula::error::AppError;
use aula::models::*;
use aula::services::Sleeper;

pub fn session() -> Session {
    Session {
        token: "tok-1".to_string(),
        user_id: 5,
        username: "estudiante1".to_string(),
        full_name: "Estudiante Uno".to_string(),
    }
}

pub fn text_status(text: &str, status: SubmissionStatus) -> AssignStatus {
    AssignStatus {
        status,
        plugins: vec![SubmissionPlugin {
            kind: PluginKind::OnlineText,
            saved_text: Some(text.to_string()),
            saved_files: Vec::new(),
        }],
    }
}

pub fn transient() -> AppError {
    AppError::TransientServer {
        status: 500,
        message: "error en Moodle".to_string(),
    }
}

pub fn staged_file() -> StagedFile {
    StagedFile {
        name: "informe.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.4 test".to_vec(),
    }
}

/// In-memory stand-in for the proxy. Status answers are scripted in order;
/// writes are recorded.
#[derive(Default)]
pub struct ScriptedApi {
    pub status_script: Mutex<VecDeque<Result<AssignStatus, AppError>>>,
    pub status_calls: Mutex<usize>,
    pub saved_texts: Mutex<Vec<(i64, String)>>,
    pub saved_files: Mutex<Vec<(i64, String)>>,
    pub submitted: Mutex<Vec<i64>>,
    pub replies: Mutex<Vec<ReplyRequest>>,
    pub save_text_error: Mutex<Option<AppError>>,
    pub save_file_error: Mutex<Option<AppError>>,
    pub posts: Vec<Post>,
    pub login_result: Mutex<Option<Result<Session, AppError>>>,
}

impl ScriptedApi {
    pub fn with_statuses(statuses: Vec<Result<AssignStatus, AppError>>) -> Self {
        Self {
            status_script: Mutex::new(statuses.into()),
            ..Default::default()
        }
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }
}

fn ack() -> Ack {
    Ack {
        message: None,
        payload: serde_json::json!({"ok": true}),
    }
}

#[async_trait]
impl MoodleApi for ScriptedApi {
    async fn login(&self, username: &str, _password: &str) -> Result<Session, AppError> {
        match self.login_result.lock().unwrap().take() {
            Some(result) => result,
            None => Ok(Session {
                username: username.to_string(),
                ..session()
            }),
        }
    }

    async fn google_link(&self, email: &str) -> Result<LinkedAccount, AppError> {
        Ok(LinkedAccount {
            email: email.to_string(),
            username: "estudiante1".to_string(),
        })
    }

    async fn fetch_courses(&self, _session: &Session) -> Result<Vec<Course>, AppError> {
        Ok(Vec::new())
    }

    async fn fetch_course_contents(
        &self,
        _session: &Session,
        _course_id: i64,
    ) -> Result<Vec<CourseSection>, AppError> {
        Ok(Vec::new())
    }

    async fn fetch_assignments(
        &self,
        _session: &Session,
        _course_id: i64,
    ) -> Result<Vec<Assignment>, AppError> {
        Ok(Vec::new())
    }

    async fn fetch_forums(&self, _session: &Session, _course_id: i64) -> Result<Vec<Forum>, AppError> {
        Ok(Vec::new())
    }

    async fn fetch_grades(&self, _session: &Session, _course_id: i64) -> Result<Vec<GradeItem>, AppError> {
        Ok(Vec::new())
    }

    async fn fetch_assign_status(
        &self,
        _session: &Session,
        _assign_id: i64,
    ) -> Result<AssignStatus, AppError> {
        *self.status_calls.lock().unwrap() += 1;
        self.status_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(AssignStatus::default()))
    }

    async fn save_text(&self, _session: &Session, assign_id: i64, text: &str) -> Result<Ack, AppError> {
        if let Some(e) = self.save_text_error.lock().unwrap().take() {
            return Err(e);
        }
        self.saved_texts.lock().unwrap().push((assign_id, text.to_string()));
        Ok(ack())
    }

    async fn save_file(&self, _session: &Session, assign_id: i64, file: &StagedFile) -> Result<Ack, AppError> {
        if let Some(e) = self.save_file_error.lock().unwrap().take() {
            return Err(e);
        }
        self.saved_files.lock().unwrap().push((assign_id, file.name.clone()));
        Ok(ack())
    }

    async fn submit(&self, _session: &Session, assign_id: i64) -> Result<Ack, AppError> {
        self.submitted.lock().unwrap().push(assign_id);
        Ok(ack())
    }

    async fn fetch_discussions(&self, _session: &Session, _forum_id: i64) -> Result<Vec<Discussion>, AppError> {
        Ok(Vec::new())
    }

    async fn fetch_posts(&self, _session: &Session, _discussion_id: i64) -> Result<Vec<Post>, AppError> {
        Ok(self.posts.clone())
    }

    async fn reply(&self, _session: &Session, request: &ReplyRequest) -> Result<Ack, AppError> {
        self.replies.lock().unwrap().push(request.clone());
        Ok(ack())
    }

    async fn download(&self, _session: &Session, file_url: &str) -> Result<Vec<u8>, AppError> {
        Ok(file_url.as_bytes().to_vec())
    }
}

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    pub delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}
