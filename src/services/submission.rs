use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::client::MoodleApi;
use crate::error::AppError;
use crate::models::{Ack, Capabilities, Session, StagedFile};

/// Local, unsaved edits for one assignment. Only a successful save clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionDraft {
    text: String,
    file: Option<StagedFile>,
}

impl SubmissionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Stage a file, or unstage with `None`.
    pub fn set_file(&mut self, file: Option<StagedFile>) {
        self.file = file;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file(&self) -> Option<&StagedFile> {
        self.file.as_ref()
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_text() && self.file.is_none()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.file = None;
    }
}

/// Exactly what will be sent to the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPlan {
    Text(String),
    File(StagedFile),
    Both { text: String, file: StagedFile },
}

/// Decide what to send for `draft` given what the assignment accepts.
pub fn plan_submission(
    capabilities: Capabilities,
    draft: &SubmissionDraft,
) -> Result<SubmissionPlan, AppError> {
    match (capabilities.text, capabilities.file) {
        (true, false) => {
            if !draft.has_text() {
                return Err(AppError::Validation(
                    "write your submission before sending".to_string(),
                ));
            }
            Ok(SubmissionPlan::Text(draft.text.clone()))
        }
        (false, true) => draft
            .file
            .clone()
            .map(SubmissionPlan::File)
            .ok_or_else(|| AppError::Validation("select a file to submit".to_string())),
        (true, true) => match (draft.has_text(), draft.file.clone()) {
            (true, Some(file)) => Ok(SubmissionPlan::Both {
                text: draft.text.clone(),
                file,
            }),
            (true, None) => Ok(SubmissionPlan::Text(draft.text.clone())),
            (false, Some(file)) => Ok(SubmissionPlan::File(file)),
            (false, None) => Err(AppError::Validation(
                "write a text or select a file before sending".to_string(),
            )),
        },
        (false, false) => Err(AppError::Validation(
            "this assignment does not accept any submission type".to_string(),
        )),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmissionOutcome {
    pub text_ack: Option<Ack>,
    pub file_ack: Option<Ack>,
}

pub struct SubmissionService {
    api: Arc<dyn MoodleApi>,
}

impl SubmissionService {
    pub fn new(api: Arc<dyn MoodleApi>) -> Self {
        Self { api }
    }

    /// Plan and send `draft`. The draft is cleared only once every part of
    /// the plan was accepted; on any error it is left untouched.
    pub async fn submit(
        &self,
        session: &Session,
        assign_id: i64,
        capabilities: Capabilities,
        draft: &mut SubmissionDraft,
    ) -> Result<SubmissionOutcome, AppError> {
        if assign_id <= 0 {
            return Err(AppError::InvalidInput(format!(
                "assignment id must be positive, got {}",
                assign_id
            )));
        }

        let plan = plan_submission(capabilities, draft)?;
        let mut outcome = SubmissionOutcome::default();

        match plan {
            SubmissionPlan::Text(text) => {
                outcome.text_ack = Some(self.api.save_text(session, assign_id, &text).await?);
            }
            SubmissionPlan::File(file) => {
                outcome.file_ack = Some(self.api.save_file(session, assign_id, &file).await?);
            }
            SubmissionPlan::Both { text, file } => {
                outcome.text_ack = Some(self.api.save_text(session, assign_id, &text).await?);
                outcome.file_ack = Some(self.api.save_file(session, assign_id, &file).await?);
            }
        }

        info!(
            "saved submission for assignment {} (text: {}, file: {})",
            assign_id,
            outcome.text_ack.is_some(),
            outcome.file_ack.is_some()
        );
        draft.clear();
        Ok(outcome)
    }

    /// Mark the saved attempt as submitted for grading.
    pub async fn finalize(&self, session: &Session, assign_id: i64) -> Result<Ack, AppError> {
        if assign_id <= 0 {
            return Err(AppError::InvalidInput(format!(
                "assignment id must be positive, got {}",
                assign_id
            )));
        }
        let ack = self.api.submit(session, assign_id).await?;
        info!("assignment {} submitted for grading", assign_id);
        Ok(ack)
    }
}

/// Read a file from disk into a `StagedFile`, guessing its mime type.
pub async fn stage_file(path: &Path) -> Result<StagedFile, AppError> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::InvalidInput(format!("not a file path: {}", path.display())))?
        .to_string();
    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok(StagedFile {
        name,
        mime_type,
        bytes,
    })
}
