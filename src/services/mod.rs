pub mod auth;
pub mod forum;
pub mod grades;
pub mod html;
pub mod reconciler;
pub mod submission;
pub mod timeline;

pub use auth::AuthService;
pub use forum::{ForumService, Thread};
pub use reconciler::{RetryPolicy, Sleeper, StatusReconciler, StatusReport, TokioSleeper};
pub use submission::{SubmissionDraft, SubmissionOutcome, SubmissionPlan, SubmissionService};
pub use timeline::{TimeWindow, TimelineEntry, TimelineItem};
