use serde::{Deserialize, Serialize};

/// One named row of the user's grade report, HTML already stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeItem {
    pub name: String,
    pub grade_text: String,
    pub feedback_text: String,
    pub is_course_total: bool,
}
