use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::MoodleApi;
use crate::error::AppError;
use crate::models::{AssignStatus, Capabilities, PluginKind, Session, SubmissionStatus, SubmittedFile};

/// Waits between status attempts. Swapped out in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(700),
        }
    }
}

/// What the server knows about the user's submission for one assignment.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StatusReport {
    pub capabilities: Capabilities,
    pub last_text: String,
    pub files: Vec<SubmittedFile>,
    pub status: SubmissionStatus,
}

impl From<&AssignStatus> for StatusReport {
    fn from(status: &AssignStatus) -> Self {
        let last_text = status
            .plugins
            .iter()
            .find(|p| p.kind == PluginKind::OnlineText)
            .and_then(|p| p.saved_text.clone())
            .unwrap_or_default();
        let files = status
            .plugins
            .iter()
            .filter(|p| p.kind == PluginKind::File)
            .flat_map(|p| p.saved_files.iter().cloned())
            .collect();

        StatusReport {
            capabilities: Capabilities::from_plugins(&status.plugins),
            last_text,
            files,
            status: status.status,
        }
    }
}

/// Polls `/assign/:id/status` until it reports a submission type.
///
/// Moodle sometimes answers the first status call of a fresh attempt with no
/// plugins, and the proxy in front of it throws the odd 500. Both are retried
/// up to `policy.max_attempts`; any other error ends the loop at once.
pub struct StatusReconciler {
    api: Arc<dyn MoodleApi>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl StatusReconciler {
    pub fn new(api: Arc<dyn MoodleApi>) -> Self {
        Self {
            api,
            sleeper: Arc::new(TokioSleeper),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn reconcile(&self, session: &Session, assign_id: i64) -> Result<StatusReport, AppError> {
        if assign_id <= 0 {
            return Err(AppError::InvalidInput(format!(
                "assignment id must be positive, got {}",
                assign_id
            )));
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut report = StatusReport::default();
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=max_attempts {
            match self.api.fetch_assign_status(session, assign_id).await {
                Ok(status) => {
                    report = StatusReport::from(&status);
                    last_error = None;
                    if !report.capabilities.is_empty() {
                        info!(
                            "assignment {} accepts {} (attempt {})",
                            assign_id,
                            report.capabilities.label(),
                            attempt
                        );
                        return Ok(report);
                    }
                    debug!("assignment {} reported no submission type yet", assign_id);
                }
                Err(e) if e.is_transient() => {
                    warn!("transient status error on attempt {}: {}", attempt, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if attempt < max_attempts {
                self.sleeper.sleep(self.policy.delay).await;
            }
        }

        if let Some(e) = last_error {
            warn!("status for assignment {} failed after {} attempts: {}", assign_id, max_attempts, e);
        } else {
            warn!("no submission type detected for assignment {}", assign_id);
        }
        Ok(report)
    }
}
