use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub fullname: String,
    pub shortname: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSection {
    pub id: Option<i64>,
    pub name: String,
    pub modules: Vec<CourseModule>,
}

/// One entry of a course section. `instance` points at the type-specific
/// record (assignment id, forum id) and is joined against those lists by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseModule {
    pub id: i64,
    pub modname: String,
    pub instance: Option<i64>,
    pub name: String,
    pub added: Option<DateTime<Utc>>,
    pub contents: Vec<ModuleContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleContent {
    pub filename: Option<String>,
    pub fileurl: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// The module types a student can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleKind {
    Assignment,
    Forum,
    Resource,
    Link,
}

impl ModuleKind {
    pub fn from_modname(modname: &str) -> Option<Self> {
        match modname {
            "assign" => Some(ModuleKind::Assignment),
            "forum" => Some(ModuleKind::Forum),
            "resource" => Some(ModuleKind::Resource),
            "url" => Some(ModuleKind::Link),
            _ => None,
        }
    }

    pub fn modname(&self) -> &'static str {
        match self {
            ModuleKind::Assignment => "assign",
            ModuleKind::Forum => "forum",
            ModuleKind::Resource => "resource",
            ModuleKind::Link => "url",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ModuleKind::Assignment => "📌",
            ModuleKind::Forum => "💬",
            ModuleKind::Resource => "📄",
            ModuleKind::Link => "🔗",
        }
    }
}

/// Where selecting a module leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleTarget {
    Assignment { id: i64, name: String },
    Forum { id: i64, name: String },
    Link(String),
    /// Download routed through the proxy so the Moodle token never leaves it.
    ProxiedFile(String),
}

impl CourseModule {
    pub fn kind(&self) -> Option<ModuleKind> {
        ModuleKind::from_modname(&self.modname)
    }

    pub fn first_file_url(&self) -> Option<&str> {
        self.contents
            .first()
            .and_then(|c| c.fileurl.as_deref())
            .filter(|u| !u.is_empty())
    }

    fn instance_id(&self) -> Result<i64, AppError> {
        self.instance
            .filter(|i| *i > 0)
            .ok_or_else(|| AppError::InvalidInput(format!("module {} has no instance id", self.id)))
    }

    pub fn target(&self, api_base_url: &str) -> Result<ModuleTarget, AppError> {
        let kind = self.kind().ok_or_else(|| {
            AppError::InvalidInput(format!("module type '{}' is not supported", self.modname))
        })?;

        match kind {
            ModuleKind::Assignment => Ok(ModuleTarget::Assignment {
                id: self.instance_id()?,
                name: self.name.clone(),
            }),
            ModuleKind::Forum => Ok(ModuleTarget::Forum {
                id: self.instance_id()?,
                name: self.name.clone(),
            }),
            ModuleKind::Link => self
                .first_file_url()
                .map(|u| ModuleTarget::Link(u.to_string()))
                .ok_or_else(|| AppError::InvalidInput("link not found".to_string())),
            ModuleKind::Resource => {
                let fileurl = self
                    .first_file_url()
                    .ok_or_else(|| AppError::InvalidInput("file not found".to_string()))?;
                proxied_file_url(api_base_url, fileurl).map(ModuleTarget::ProxiedFile)
            }
        }
    }
}

/// `{base}/file?u={fileurl}` with the Moodle URL query-encoded.
pub fn proxied_file_url(api_base_url: &str, fileurl: &str) -> Result<String, AppError> {
    let base = format!("{}/file", api_base_url.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .map_err(|e| AppError::Config(format!("invalid API base URL {}: {}", api_base_url, e)))?;
    url.query_pairs_mut().append_pair("u", fileurl);
    Ok(url.to_string())
}
