use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::models::{Assignment, CourseModule, CourseSection, Forum, ModuleKind};

/// Which timestamp an item's display date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateSource {
    Due,
    Cutoff,
    Added,
    Modified,
    Created,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineItem {
    pub kind: ModuleKind,
    pub module: CourseModule,
    pub display_date: Option<DateTime<Utc>>,
    pub date_source: Option<DateSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TimelineEntry {
    Header(NaiveDate),
    Item(TimelineItem),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    All,
    Overdue,
    /// `[now, now + n days]`, both ends included.
    NextDays(u32),
}

impl FromStr for TimeWindow {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TimeWindow::All),
            "overdue" => Ok(TimeWindow::Overdue),
            other => other
                .strip_suffix("days")
                .and_then(|n| n.parse::<u32>().ok())
                .map(TimeWindow::NextDays)
                .ok_or_else(|| AppError::InvalidInput(format!("unknown time window: {}", other))),
        }
    }
}

impl TimeWindow {
    pub fn contains(&self, date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match (self, date) {
            (TimeWindow::All, _) => true,
            (_, None) => false,
            (TimeWindow::Overdue, Some(date)) => date < now,
            // A window reaching past chrono's range has no upper bound.
            (TimeWindow::NextDays(days), Some(date)) => {
                date >= now
                    && now
                        .checked_add_signed(Duration::days(i64::from(*days)))
                        .is_none_or(|end| date <= end)
            }
        }
    }
}

fn module_fallback(module: &CourseModule) -> Option<(DateTime<Utc>, DateSource)> {
    let first = module.contents.first();
    module
        .added
        .map(|d| (d, DateSource::Added))
        .or_else(|| first.and_then(|c| c.modified).map(|d| (d, DateSource::Modified)))
        .or_else(|| first.and_then(|c| c.created).map(|d| (d, DateSource::Created)))
}

/// Pick the one timestamp that represents `module` on the timeline.
///
/// Assignments use their due date, forums their due or cutoff date; anything
/// else (or a deadline-less assignment/forum) falls back to when the module
/// was added, then when its first file was modified or created.
pub fn resolve_display_date(
    module: &CourseModule,
    kind: ModuleKind,
    assignments: &[Assignment],
    forums: &[Forum],
) -> Option<(DateTime<Utc>, DateSource)> {
    let deadline = match (kind, module.instance) {
        (ModuleKind::Assignment, Some(instance)) => assignments
            .iter()
            .find(|a| a.id == instance)
            .and_then(|a| a.due_date)
            .map(|d| (d, DateSource::Due)),
        (ModuleKind::Forum, Some(instance)) => {
            forums.iter().find(|f| f.id == instance).and_then(|f| {
                f.due_date
                    .map(|d| (d, DateSource::Due))
                    .or_else(|| f.cutoff_date.map(|d| (d, DateSource::Cutoff)))
            })
        }
        _ => None,
    };

    deadline.or_else(|| module_fallback(module)).or_else(|| match (kind, module.instance) {
        (ModuleKind::Forum, Some(instance)) => forums
            .iter()
            .find(|f| f.id == instance)
            .and_then(|f| f.modified)
            .map(|d| (d, DateSource::Modified)),
        _ => None,
    })
}

/// Flatten the sections, keep the actionable modules, and attach their
/// display dates.
pub fn classify(
    sections: &[CourseSection],
    assignments: &[Assignment],
    forums: &[Forum],
) -> Vec<TimelineItem> {
    sections
        .iter()
        .flat_map(|s| s.modules.iter())
        .filter_map(|module| {
            let kind = module.kind()?;
            let resolved = resolve_display_date(module, kind, assignments, forums);
            Some(TimelineItem {
                kind,
                module: module.clone(),
                display_date: resolved.map(|(d, _)| d),
                date_source: resolved.map(|(_, s)| s),
            })
        })
        .collect()
}

pub fn filter_items(
    items: Vec<TimelineItem>,
    window: TimeWindow,
    now: DateTime<Utc>,
) -> Vec<TimelineItem> {
    items
        .into_iter()
        .filter(|item| window.contains(item.display_date, now))
        .collect()
}

/// Dateless items first in input order, then one header per calendar day
/// (in `tz`) in ascending order, each followed by that day's items sorted
/// by time.
pub fn group_by_day<Tz: TimeZone>(items: Vec<TimelineItem>, tz: &Tz) -> Vec<TimelineEntry> {
    let mut dateless = Vec::new();
    let mut days: BTreeMap<NaiveDate, Vec<TimelineItem>> = BTreeMap::new();

    for item in items {
        match item.display_date {
            Some(date) => {
                let day = date.with_timezone(tz).date_naive();
                days.entry(day).or_default().push(item);
            }
            None => dateless.push(item),
        }
    }

    let mut entries: Vec<TimelineEntry> = dateless.into_iter().map(TimelineEntry::Item).collect();
    for (day, mut bucket) in days {
        bucket.sort_by_key(|item| item.display_date);
        entries.push(TimelineEntry::Header(day));
        entries.extend(bucket.into_iter().map(TimelineEntry::Item));
    }
    entries
}

pub fn build_timeline<Tz: TimeZone>(
    sections: &[CourseSection],
    assignments: &[Assignment],
    forums: &[Forum],
    window: TimeWindow,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<TimelineEntry> {
    let items = classify(sections, assignments, forums);
    group_by_day(filter_items(items, window, now), tz)
}
