pub mod dto;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::AppError;
use crate::models::{
    Ack, AssignStatus, Assignment, Course, CourseSection, Discussion, Forum, GradeItem,
    LinkedAccount, Post, ReplyRequest, Session, StagedFile,
};

/// The proxy's HTTP contract. Every call except the auth lookups takes the
/// session whose token is sent as a bearer header.
#[async_trait]
pub trait MoodleApi: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<Session, AppError>;
    async fn google_link(&self, email: &str) -> Result<LinkedAccount, AppError>;

    async fn fetch_courses(&self, session: &Session) -> Result<Vec<Course>, AppError>;
    async fn fetch_course_contents(
        &self,
        session: &Session,
        course_id: i64,
    ) -> Result<Vec<CourseSection>, AppError>;
    async fn fetch_assignments(
        &self,
        session: &Session,
        course_id: i64,
    ) -> Result<Vec<Assignment>, AppError>;
    async fn fetch_forums(&self, session: &Session, course_id: i64)
    -> Result<Vec<Forum>, AppError>;
    async fn fetch_grades(
        &self,
        session: &Session,
        course_id: i64,
    ) -> Result<Vec<GradeItem>, AppError>;

    async fn fetch_assign_status(
        &self,
        session: &Session,
        assign_id: i64,
    ) -> Result<AssignStatus, AppError>;
    async fn save_text(&self, session: &Session, assign_id: i64, text: &str)
    -> Result<Ack, AppError>;
    async fn save_file(
        &self,
        session: &Session,
        assign_id: i64,
        file: &StagedFile,
    ) -> Result<Ack, AppError>;
    async fn submit(&self, session: &Session, assign_id: i64) -> Result<Ack, AppError>;

    async fn fetch_discussions(
        &self,
        session: &Session,
        forum_id: i64,
    ) -> Result<Vec<Discussion>, AppError>;
    async fn fetch_posts(&self, session: &Session, discussion_id: i64)
    -> Result<Vec<Post>, AppError>;
    async fn reply(&self, session: &Session, request: &ReplyRequest) -> Result<Ack, AppError>;

    async fn download(&self, session: &Session, file_url: &str) -> Result<Vec<u8>, AppError>;
}

pub struct HttpMoodleApi {
    client: Client,
    config: ClientConfig,
}

impl HttpMoodleApi {
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn get(&self, session: &Session, path: &str) -> RequestBuilder {
        debug!("GET {}", path);
        self.client
            .get(self.config.endpoint(path))
            .header(AUTHORIZATION, session.bearer())
    }

    fn post(&self, session: Option<&Session>, path: &str) -> RequestBuilder {
        debug!("POST {}", path);
        let request = self.client.post(self.config.endpoint(path));
        match session {
            Some(session) => request.header(AUTHORIZATION, session.bearer()),
            None => request,
        }
    }

    async fn send(request: RequestBuilder) -> Result<Response, AppError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<dto::ErrorBody>(&body)
            .ok()
            .and_then(dto::ErrorBody::into_message)
            .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()));
        warn!("proxy answered {}: {}", status, message.as_deref().unwrap_or(""));
        Err(AppError::from_status(status, message))
    }

    async fn read_json<T: DeserializeOwned>(request: RequestBuilder, path: &str) -> Result<T, AppError> {
        let response = Self::send(request).await?;
        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| {
            warn!("failed to decode {}: {}", path, e);
            AppError::MalformedResponse(format!("{}: {}", path, e))
        })
    }

    async fn read_ack(request: RequestBuilder, path: &str, fallback: &str) -> Result<Ack, AppError> {
        Self::read_json::<dto::AckResponse>(request, path)
            .await?
            .into_ack(fallback)
    }
}

#[async_trait]
impl MoodleApi for HttpMoodleApi {
    async fn login(&self, username: &str, password: &str) -> Result<Session, AppError> {
        let path = "/auth/login";
        let request = self
            .post(None, path)
            .json(&dto::LoginRequest { username, password });

        // A wrong password comes back as 401 with an `ok:false` body; that is
        // a rejected login, not an expired session.
        match Self::read_json::<dto::LoginResponse>(request, path).await {
            Ok(body) => body.into_session(username),
            Err(AppError::Auth(message)) => Err(AppError::Rejected(message)),
            Err(e) => Err(e),
        }
    }

    async fn google_link(&self, email: &str) -> Result<LinkedAccount, AppError> {
        let path = "/auth/google-link";
        let request = self.post(None, path).json(&dto::GoogleLinkRequest { email });
        match Self::read_json::<dto::GoogleLinkResponse>(request, path).await {
            Ok(body) => body.into_account(email),
            Err(AppError::Auth(message)) => Err(AppError::Rejected(message)),
            Err(e) => Err(e),
        }
    }

    async fn fetch_courses(&self, session: &Session) -> Result<Vec<Course>, AppError> {
        let path = "/courses";
        let body: dto::CoursesResponse = Self::read_json(self.get(session, path), path).await?;
        Ok(body.courses.into_iter().map(Course::from).collect())
    }

    async fn fetch_course_contents(
        &self,
        session: &Session,
        course_id: i64,
    ) -> Result<Vec<CourseSection>, AppError> {
        let path = format!("/course/{}/contents", course_id);
        let body: dto::ContentsResponse = Self::read_json(self.get(session, &path), &path).await?;
        Ok(body.contents.into_iter().map(CourseSection::from).collect())
    }

    async fn fetch_assignments(
        &self,
        session: &Session,
        course_id: i64,
    ) -> Result<Vec<Assignment>, AppError> {
        let path = format!("/course/{}/assignments", course_id);
        let body: dto::AssignmentsResponse =
            Self::read_json(self.get(session, &path), &path).await?;
        Ok(body.assignments.into_iter().map(Assignment::from).collect())
    }

    async fn fetch_forums(
        &self,
        session: &Session,
        course_id: i64,
    ) -> Result<Vec<Forum>, AppError> {
        let path = format!("/course/{}/forums", course_id);
        let body: dto::ForumsResponse = Self::read_json(self.get(session, &path), &path).await?;
        Ok(body.forums.into_iter().map(Forum::from).collect())
    }

    async fn fetch_grades(
        &self,
        session: &Session,
        course_id: i64,
    ) -> Result<Vec<GradeItem>, AppError> {
        let path = format!("/course/{}/grades", course_id);
        let body: dto::GradesResponse = Self::read_json(self.get(session, &path), &path).await?;
        Ok(crate::services::grades::project_rows(body.grades))
    }

    async fn fetch_assign_status(
        &self,
        session: &Session,
        assign_id: i64,
    ) -> Result<AssignStatus, AppError> {
        let path = format!("/assign/{}/status", assign_id);
        let body: dto::StatusResponse = Self::read_json(self.get(session, &path), &path).await?;
        Ok(AssignStatus::from(body.status))
    }

    async fn save_text(
        &self,
        session: &Session,
        assign_id: i64,
        text: &str,
    ) -> Result<Ack, AppError> {
        let path = format!("/assign/{}/save-text", assign_id);
        let request = self
            .post(Some(session), &path)
            .json(&dto::SaveTextRequest { text });
        Self::read_ack(request, &path, "could not save the submission").await
    }

    async fn save_file(
        &self,
        session: &Session,
        assign_id: i64,
        file: &StagedFile,
    ) -> Result<Ack, AppError> {
        let path = format!("/assign/{}/save-file", assign_id);
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| AppError::InvalidInput(format!("invalid mime type {}: {}", file.mime_type, e)))?;
        let form = Form::new().part("file", part);
        let request = self.post(Some(session), &path).multipart(form);
        Self::read_ack(request, &path, "could not upload the file").await
    }

    async fn submit(&self, session: &Session, assign_id: i64) -> Result<Ack, AppError> {
        let path = format!("/assign/{}/submit", assign_id);
        Self::read_ack(self.post(Some(session), &path), &path, "could not submit").await
    }

    async fn fetch_discussions(
        &self,
        session: &Session,
        forum_id: i64,
    ) -> Result<Vec<Discussion>, AppError> {
        let path = format!("/forum/{}/discussions", forum_id);
        let body: dto::DiscussionsResponse =
            Self::read_json(self.get(session, &path), &path).await?;
        Ok(body.into_vec().into_iter().map(Discussion::from).collect())
    }

    async fn fetch_posts(
        &self,
        session: &Session,
        discussion_id: i64,
    ) -> Result<Vec<Post>, AppError> {
        let path = format!("/discussion/{}/posts", discussion_id);
        let body: dto::PostsResponse = Self::read_json(self.get(session, &path), &path).await?;
        Ok(body.into_vec().into_iter().map(Post::from).collect())
    }

    async fn reply(&self, session: &Session, request: &ReplyRequest) -> Result<Ack, AppError> {
        let path = "/forum/reply";
        let builder = self.post(Some(session), path).json(request);
        Self::read_ack(builder, path, "could not post the reply").await
    }

    async fn download(&self, session: &Session, file_url: &str) -> Result<Vec<u8>, AppError> {
        let mut url = Url::parse(&self.config.endpoint("/file"))
            .map_err(|e| AppError::Config(format!("invalid API base URL: {}", e)))?;
        url.query_pairs_mut().append_pair("u", file_url);

        debug!("GET /file");
        let request = self
            .client
            .get(url)
            .header(AUTHORIZATION, session.bearer());
        let response = Self::send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
