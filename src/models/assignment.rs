use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub cmid: Option<i64>,
    pub name: String,
    pub due_date: Option<DateTime<Utc>>,
    pub cutoff_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Submitted,
}

impl SubmissionStatus {
    /// Moodle reports `new`, `draft`, `reopened`, `submitted`; only the last
    /// one counts as handed in.
    pub fn from_moodle(status: Option<&str>) -> Self {
        match status {
            Some("submitted") => SubmissionStatus::Submitted,
            _ => SubmissionStatus::Pending,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Submitted => "submitted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginKind {
    OnlineText,
    File,
    Other(String),
}

impl PluginKind {
    pub fn from_type(kind: &str) -> Self {
        match kind {
            "onlinetext" => PluginKind::OnlineText,
            "file" => PluginKind::File,
            other => PluginKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPlugin {
    pub kind: PluginKind,
    pub saved_text: Option<String>,
    pub saved_files: Vec<SubmittedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedFile {
    pub filename: String,
    pub fileurl: Option<String>,
    pub filesize: Option<u64>,
    pub mimetype: Option<String>,
}

/// Server-side state of the user's latest attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssignStatus {
    pub status: SubmissionStatus,
    pub plugins: Vec<SubmissionPlugin>,
}

/// Submission formats an assignment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub text: bool,
    pub file: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        text: false,
        file: false,
    };
    pub const TEXT: Capabilities = Capabilities {
        text: true,
        file: false,
    };
    pub const FILE: Capabilities = Capabilities {
        text: false,
        file: true,
    };
    pub const BOTH: Capabilities = Capabilities {
        text: true,
        file: true,
    };

    pub fn from_plugins(plugins: &[SubmissionPlugin]) -> Self {
        Capabilities {
            text: plugins.iter().any(|p| p.kind == PluginKind::OnlineText),
            file: plugins.iter().any(|p| p.kind == PluginKind::File),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.text && !self.file
    }

    pub fn label(&self) -> &'static str {
        match (self.text, self.file) {
            (true, true) => "text + file",
            (false, true) => "file",
            (true, false) => "text",
            (false, false) => "not detected",
        }
    }
}

/// A file picked locally and not yet uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// What the proxy echoed back after a write.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ack {
    pub message: Option<String>,
    pub payload: serde_json::Value,
}
