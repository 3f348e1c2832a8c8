//! Local evaluation of list queries.
//!
//! The remote API filters, sorts and pages when it is given the query
//! parameters; this module reproduces those semantics for data that never
//! went through the server (the in-memory backend, cached lists).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use taskdeck_shared::{SortKey, SortOrder, TaskDto, TasksListArgs, TasksListResult};
use tracing::trace;

use crate::datetime::parse_date;

/// Case-insensitive match over title, description and skill tags. Blank
/// queries match everything.
pub fn matches_search(task: &TaskDto, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }

    task.title.to_lowercase().contains(&q)
        || task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&q))
        || task.skills.iter().any(|s| s.to_lowercase().contains(&q))
}

/// Dates that are missing or unparseable sort after every real date in
/// both directions. Ties fall back to the task id.
pub fn compare_tasks(a: &TaskDto, b: &TaskDto, key: SortKey, order: SortOrder) -> Ordering {
    let primary = match key {
        SortKey::DueDate => compare_dates(
            parse_date(&a.due_date),
            parse_date(&b.due_date),
            order,
        ),
        SortKey::CreatedAt => compare_dates(
            parse_date(&a.created_at),
            parse_date(&b.created_at),
            order,
        ),
        SortKey::UpdatedAt => compare_dates(
            parse_date(&a.updated_at),
            parse_date(&b.updated_at),
            order,
        ),
        SortKey::Priority => directed(a.priority.rank().cmp(&b.priority.rank()), order),
        SortKey::Title => directed(
            a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            order,
        ),
    };

    primary.then_with(|| a.id.cmp(&b.id))
}

pub fn sort_tasks(tasks: &mut [&TaskDto], key: SortKey, order: SortOrder) {
    tasks.sort_by(|a, b| compare_tasks(a, b, key, order));
}

/// 1-based page; a zero page or limit is clamped to 1.
pub fn paginate<T>(items: Vec<T>, page: u32, limit: u32) -> Vec<T> {
    let limit = limit.max(1) as usize;
    let skip = (page.max(1) as usize - 1).saturating_mul(limit);
    items.into_iter().skip(skip).take(limit).collect()
}

/// Full server-side evaluation: scope by project and area, filter, sort,
/// then page. `total` counts matches before paging.
#[tracing::instrument(skip(tasks), fields(candidates = tasks.len()))]
pub fn run_query(tasks: &[TaskDto], args: &TasksListArgs) -> TasksListResult {
    let mut matched: Vec<&TaskDto> = tasks
        .iter()
        .filter(|task| task.project_id == args.project_id)
        .filter(|task| match args.project_area_id.as_deref() {
            Some(area) => task.project_area_id.as_deref() == Some(area),
            None => true,
        })
        .filter(|task| args.status.is_none_or(|s| task.status == s))
        .filter(|task| {
            args.search
                .as_deref()
                .is_none_or(|q| matches_search(task, q))
        })
        .collect();

    sort_tasks(&mut matched, args.sort_by, args.sort_order);
    let total = matched.len();
    let data: Vec<TaskDto> = paginate(matched, args.page, args.limit)
        .into_iter()
        .cloned()
        .collect();

    trace!(total, returned = data.len(), "evaluated task query");
    TasksListResult { data, total }
}

fn directed(ord: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

fn compare_dates(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
    order: SortOrder,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b), order),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
