pub mod assignment;
pub mod course;
pub mod forum;
pub mod grade;
pub mod session;

pub use assignment::{
    Ack, AssignStatus, Assignment, Capabilities, PluginKind, StagedFile, SubmissionPlugin,
    SubmissionStatus, SubmittedFile,
};
pub use course::{Course, CourseModule, CourseSection, ModuleContent, ModuleKind, ModuleTarget};
pub use forum::{Discussion, Forum, Post, ReplyRequest};
pub use grade::GradeItem;
pub use session::{LinkedAccount, Session};
