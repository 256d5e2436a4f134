use std::str::FromStr;

use crate::client::dto::GradeRowDto;
use crate::error::AppError;
use crate::models::GradeItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradeFilter {
    #[default]
    All,
    Graded,
    Ungraded,
}

impl FromStr for GradeFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(GradeFilter::All),
            "graded" => Ok(GradeFilter::Graded),
            "ungraded" => Ok(GradeFilter::Ungraded),
            other => Err(AppError::InvalidInput(format!("unknown grade filter: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GradeSummary {
    pub total_items: usize,
    pub graded_items: usize,
    pub course_total: Option<String>,
}

/// Keep the named rows of a grade report, HTML stripped.
pub fn project_rows(rows: Vec<GradeRowDto>) -> Vec<GradeItem> {
    rows.into_iter()
        .filter_map(|row| {
            let itemname = row.itemname?;
            let name = itemname.text();
            if name.is_empty() {
                return None;
            }
            Some(GradeItem {
                name,
                grade_text: row.grade.map(|g| g.text()).unwrap_or_default(),
                feedback_text: row.feedback.map(|f| f.text()).unwrap_or_default(),
                is_course_total: itemname
                    .class
                    .as_deref()
                    .is_some_and(|class| class.contains("total")),
            })
        })
        .collect()
}

pub fn is_graded(item: &GradeItem) -> bool {
    let grade = item.grade_text.trim().to_lowercase();
    !(grade.is_empty()
        || grade == "-"
        || grade.contains("sin calificar")
        || grade.contains("not graded"))
}

pub fn filter_grades(items: &[GradeItem], filter: GradeFilter) -> Vec<&GradeItem> {
    items
        .iter()
        .filter(|item| match filter {
            GradeFilter::All => true,
            GradeFilter::Graded => is_graded(item),
            GradeFilter::Ungraded => !is_graded(item),
        })
        .collect()
}

pub fn summarize(items: &[GradeItem]) -> GradeSummary {
    GradeSummary {
        total_items: items.len(),
        graded_items: items.iter().filter(|i| is_graded(i)).count(),
        course_total: items
            .iter()
            .find(|i| i.is_course_total)
            .map(|i| i.grade_text.clone())
            .filter(|t| !t.is_empty()),
    }
}
