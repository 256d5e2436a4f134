//! Wire shapes of the proxy's JSON responses, one per endpoint, and the
//! conversion into domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::models::{
    Ack, AssignStatus, Assignment, Course, CourseModule, CourseSection, Discussion, Forum,
    LinkedAccount, ModuleContent, PluginKind, Post, Session, SubmissionPlugin, SubmissionStatus,
    SubmittedFile,
};
use crate::services::html::strip_html;

/// Moodle timestamps are unix seconds with 0 meaning "not set".
pub fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    DateTime::from_timestamp(secs, 0)
}

/// Ids arrive as numbers from Moodle but sometimes as strings from the proxy.
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(i64),
        Str(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Num(n) => Ok(n),
        Repr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Grade cells carry strings, numbers or nothing.
fn de_loose_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|m| !m.trim().is_empty())
    }
}

// ---- auth ----

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub ok: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "userId", deserialize_with = "de_opt_id")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, rename = "fullName")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "de_id")] i64);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(id)| id))
}

impl LoginResponse {
    pub fn into_session(self, requested_username: &str) -> Result<Session, AppError> {
        if !self.ok {
            return Err(AppError::Rejected(
                self.error
                    .unwrap_or_else(|| "invalid credentials".to_string()),
            ));
        }
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::MalformedResponse("login response has no token".to_string()))?;
        let user_id = self
            .user_id
            .ok_or_else(|| AppError::MalformedResponse("login response has no userId".to_string()))?;

        Ok(Session {
            token,
            user_id,
            username: self
                .username
                .unwrap_or_else(|| requested_username.to_string()),
            full_name: self.full_name.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct GoogleLinkRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GoogleLinkResponse {
    pub ok: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GoogleLinkResponse {
    pub fn into_account(self, email: &str) -> Result<LinkedAccount, AppError> {
        if !self.ok {
            return Err(AppError::Rejected(self.error.unwrap_or_else(|| {
                format!("{} is not registered in Moodle", email)
            })));
        }
        let username = self.username.filter(|u| !u.is_empty()).ok_or_else(|| {
            AppError::MalformedResponse("google-link response has no username".to_string())
        })?;
        Ok(LinkedAccount {
            email: email.to_string(),
            username,
        })
    }
}

// ---- courses ----

#[derive(Debug, Deserialize)]
pub struct CoursesResponse {
    pub courses: Vec<CourseDto>,
}

#[derive(Debug, Deserialize)]
pub struct CourseDto {
    pub id: i64,
    pub fullname: String,
    #[serde(default)]
    pub shortname: Option<String>,
    #[serde(default)]
    pub courseimage: Option<String>,
}

impl From<CourseDto> for Course {
    fn from(dto: CourseDto) -> Self {
        Course {
            id: dto.id,
            fullname: dto.fullname,
            shortname: dto.shortname.unwrap_or_default(),
            image_url: dto.courseimage.filter(|u| !u.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ContentsResponse {
    pub contents: Vec<SectionDto>,
}

#[derive(Debug, Deserialize)]
pub struct SectionDto {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleDto>,
}

#[derive(Debug, Deserialize)]
pub struct ModuleDto {
    pub id: i64,
    pub modname: String,
    #[serde(default)]
    pub instance: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub added: Option<i64>,
    #[serde(default)]
    pub contents: Vec<ContentDto>,
}

#[derive(Debug, Deserialize)]
pub struct ContentDto {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub fileurl: Option<String>,
    #[serde(default)]
    pub timecreated: Option<i64>,
    #[serde(default)]
    pub timemodified: Option<i64>,
}

impl From<SectionDto> for CourseSection {
    fn from(dto: SectionDto) -> Self {
        CourseSection {
            id: dto.id,
            name: dto.name.unwrap_or_default(),
            modules: dto.modules.into_iter().map(CourseModule::from).collect(),
        }
    }
}

impl From<ModuleDto> for CourseModule {
    fn from(dto: ModuleDto) -> Self {
        CourseModule {
            id: dto.id,
            modname: dto.modname,
            instance: dto.instance,
            name: dto.name,
            added: dto.added.and_then(timestamp),
            contents: dto
                .contents
                .into_iter()
                .map(|c| ModuleContent {
                    filename: c.filename,
                    fileurl: c.fileurl,
                    created: c.timecreated.and_then(timestamp),
                    modified: c.timemodified.and_then(timestamp),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignmentsResponse {
    pub assignments: Vec<AssignmentDto>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentDto {
    pub id: i64,
    #[serde(default)]
    pub cmid: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub duedate: i64,
    #[serde(default)]
    pub cutoffdate: i64,
}

impl From<AssignmentDto> for Assignment {
    fn from(dto: AssignmentDto) -> Self {
        Assignment {
            id: dto.id,
            cmid: dto.cmid,
            name: dto.name,
            due_date: timestamp(dto.duedate),
            cutoff_date: timestamp(dto.cutoffdate),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ForumsResponse {
    pub forums: Vec<ForumDto>,
}

#[derive(Debug, Deserialize)]
pub struct ForumDto {
    pub id: i64,
    #[serde(default)]
    pub cmid: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub duedate: i64,
    #[serde(default)]
    pub cutoffdate: i64,
    #[serde(default)]
    pub timemodified: i64,
}

impl From<ForumDto> for Forum {
    fn from(dto: ForumDto) -> Self {
        Forum {
            id: dto.id,
            cmid: dto.cmid,
            name: dto.name,
            due_date: timestamp(dto.duedate),
            cutoff_date: timestamp(dto.cutoffdate),
            modified: timestamp(dto.timemodified),
        }
    }
}

// ---- grades ----

#[derive(Debug, Deserialize)]
pub struct GradesResponse {
    pub grades: Vec<GradeRowDto>,
}

/// A `tabledata` row of Moodle's user grade report. Layout rows come
/// without `itemname`.
#[derive(Debug, Default, Deserialize)]
pub struct GradeRowDto {
    #[serde(default)]
    pub itemname: Option<GradeCellDto>,
    #[serde(default)]
    pub grade: Option<GradeCellDto>,
    #[serde(default)]
    pub feedback: Option<GradeCellDto>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GradeCellDto {
    #[serde(default, deserialize_with = "de_loose_text")]
    pub content: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
}

impl GradeCellDto {
    pub fn text(&self) -> String {
        self.content.as_deref().map(strip_html).unwrap_or_default()
    }
}

// ---- assignment status ----

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub status: StatusDto,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusDto {
    #[serde(default)]
    pub lastattempt: Option<LastAttemptDto>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LastAttemptDto {
    #[serde(default)]
    pub submission: Option<SubmissionDto>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmissionDto {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plugins: Vec<PluginDto>,
}

#[derive(Debug, Deserialize)]
pub struct PluginDto {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub editorfields: Vec<EditorFieldDto>,
    #[serde(default)]
    pub fileareas: Vec<FileAreaDto>,
}

#[derive(Debug, Deserialize)]
pub struct EditorFieldDto {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FileAreaDto {
    #[serde(default)]
    pub files: Vec<FileDto>,
}

#[derive(Debug, Deserialize)]
pub struct FileDto {
    pub filename: String,
    #[serde(default)]
    pub fileurl: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub mimetype: Option<String>,
}

impl From<StatusDto> for AssignStatus {
    fn from(dto: StatusDto) -> Self {
        let submission = dto
            .lastattempt
            .and_then(|a| a.submission)
            .unwrap_or_default();

        AssignStatus {
            status: SubmissionStatus::from_moodle(submission.status.as_deref()),
            plugins: submission
                .plugins
                .into_iter()
                .map(|p| SubmissionPlugin {
                    kind: PluginKind::from_type(&p.kind),
                    saved_text: p.editorfields.into_iter().find_map(|f| f.text),
                    saved_files: p
                        .fileareas
                        .into_iter()
                        .flat_map(|area| area.files)
                        .map(|f| SubmittedFile {
                            filename: f.filename,
                            fileurl: f.fileurl,
                            filesize: f.filesize,
                            mimetype: f.mimetype,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveTextRequest<'a> {
    pub text: &'a str,
}

/// `{ok, error?, ...}` returned by every write endpoint.
#[derive(Debug, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl AckResponse {
    pub fn into_ack(self, fallback: &str) -> Result<Ack, AppError> {
        if !self.ok {
            return Err(AppError::Rejected(
                self.error
                    .or(self.message)
                    .unwrap_or_else(|| fallback.to_string()),
            ));
        }
        Ok(Ack {
            message: self.message,
            payload: serde_json::Value::Object(self.rest),
        })
    }
}

// ---- forums ----

/// The proxy forwards Moodle's envelope as-is on some versions and unwraps
/// it on others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DiscussionListing {
    Nested { discussions: Vec<DiscussionDto> },
    Flat(Vec<DiscussionDto>),
}

#[derive(Debug, Deserialize)]
pub struct DiscussionsResponse {
    pub discussions: DiscussionListing,
}

impl DiscussionsResponse {
    pub fn into_vec(self) -> Vec<DiscussionDto> {
        match self.discussions {
            DiscussionListing::Nested { discussions } => discussions,
            DiscussionListing::Flat(discussions) => discussions,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiscussionDto {
    pub id: i64,
    pub discussion: i64,
    pub subject: String,
    #[serde(default)]
    pub userfullname: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub pinned: bool,
}

impl From<DiscussionDto> for Discussion {
    fn from(dto: DiscussionDto) -> Self {
        Discussion {
            id: dto.id,
            discussion_id: dto.discussion,
            subject: dto.subject,
            author: dto.userfullname.unwrap_or_default(),
            message: dto.message.unwrap_or_default(),
            created: timestamp(dto.created),
            pinned: dto.pinned,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PostListing {
    Nested { posts: Vec<PostDto> },
    Flat(Vec<PostDto>),
}

#[derive(Debug, Deserialize)]
pub struct PostsResponse {
    pub posts: PostListing,
}

impl PostsResponse {
    pub fn into_vec(self) -> Vec<PostDto> {
        match self.posts {
            PostListing::Nested { posts } => posts,
            PostListing::Flat(posts) => posts,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PostDto {
    pub id: i64,
    #[serde(default)]
    pub parentid: Option<i64>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timecreated: i64,
    #[serde(default)]
    pub author: Option<AuthorDto>,
    #[serde(default)]
    pub userfullname: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorDto {
    #[serde(default)]
    pub fullname: Option<String>,
}

impl From<PostDto> for Post {
    fn from(dto: PostDto) -> Self {
        Post {
            id: dto.id,
            parent_id: dto.parentid.filter(|p| *p > 0),
            subject: dto.subject,
            author: dto
                .author
                .and_then(|a| a.fullname)
                .or(dto.userfullname)
                .unwrap_or_default(),
            message: dto.message,
            created: timestamp(dto.timecreated),
        }
    }
}
