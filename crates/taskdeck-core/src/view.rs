//! Derivation of display-ready task collections.
//!
//! Everything here is a pure function of the fetched task slice and the
//! configured status tabs: per-status buckets for the tab strip and the
//! aggregate statistics shown above the list.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde::ser::{SerializeMap, SerializeStruct};
use taskdeck_shared::{ParseEnumError, TaskDto, TaskStatus};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTab {
    All,
    Status(TaskStatus),
}

impl StatusTab {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTab::All => "all",
            StatusTab::Status(status) => status.as_str(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusTab::All => "All",
            StatusTab::Status(status) => status.label(),
        }
    }

    /// The server-side status filter this tab implies.
    pub fn status(self) -> Option<TaskStatus> {
        match self {
            StatusTab::All => None,
            StatusTab::Status(status) => Some(status),
        }
    }
}

impl fmt::Display for StatusTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusTab {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusTab::All);
        }
        s.parse::<TaskStatus>().map(StatusTab::Status)
    }
}

impl Serialize for StatusTab {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Input-ordered buckets. A status missing from the tab list gets no
/// bucket; its tasks only show up under `All`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskBuckets<'a> {
    all: Vec<&'a TaskDto>,
    by_status: Vec<(TaskStatus, Vec<&'a TaskDto>)>,
}

impl<'a> TaskBuckets<'a> {
    pub fn get(&self, tab: StatusTab) -> &[&'a TaskDto] {
        match tab {
            StatusTab::All => &self.all,
            StatusTab::Status(status) => self
                .by_status
                .iter()
                .find(|(s, _)| *s == status)
                .map(|(_, tasks)| tasks.as_slice())
                .unwrap_or(&[]),
        }
    }

    pub fn tabs(&self) -> impl Iterator<Item = StatusTab> + '_ {
        std::iter::once(StatusTab::All)
            .chain(self.by_status.iter().map(|(s, _)| StatusTab::Status(*s)))
    }

    /// Tab counts in display order, `All` first.
    pub fn counts(&self) -> Vec<(StatusTab, usize)> {
        self.tabs().map(|tab| (tab, self.get(tab).len())).collect()
    }
}

/// `{"all": [...], "byStatus": {"<status>": [...]}}`, keys in tab order.
impl Serialize for TaskBuckets<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        struct ByStatus<'b, 'a>(&'b [(TaskStatus, Vec<&'a TaskDto>)]);

        impl Serialize for ByStatus<'_, '_> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (status, tasks) in self.0 {
                    map.serialize_entry(status.as_str(), tasks)?;
                }
                map.end()
            }
        }

        let mut state = serializer.serialize_struct("TaskBuckets", 2)?;
        state.serialize_field("all", &self.all)?;
        state.serialize_field("byStatus", &ByStatus(&self.by_status))?;
        state.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub overdue: usize,
    pub blocked: usize,
    pub completion_rate: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView<'a> {
    pub buckets: TaskBuckets<'a>,
    pub stats: TaskStats,
}

pub fn group_by_status<'a>(tasks: &'a [TaskDto], tabs: &[TaskStatus]) -> TaskBuckets<'a> {
    let mut by_status: Vec<(TaskStatus, Vec<&'a TaskDto>)> = Vec::with_capacity(tabs.len());
    for status in tabs {
        if !by_status.iter().any(|(s, _)| s == status) {
            by_status.push((*status, Vec::new()));
        }
    }

    for task in tasks {
        if let Some((_, bucket)) = by_status.iter_mut().find(|(s, _)| *s == task.status) {
            bucket.push(task);
        }
    }

    TaskBuckets {
        all: tasks.iter().collect(),
        by_status,
    }
}

/// Percentage rounded half up; zero when there is nothing to complete.
pub fn completion_rate(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    let rate = (completed * 200 + total) / (2 * total);
    u8::try_from(rate).unwrap_or(100)
}

pub fn task_stats(tasks: &[TaskDto]) -> TaskStats {
    let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
    let total = tasks.len();
    let completed = count(TaskStatus::Completed);

    TaskStats {
        total,
        completed,
        in_progress: count(TaskStatus::InProgress),
        overdue: count(TaskStatus::Overdue),
        blocked: count(TaskStatus::Blocked),
        completion_rate: completion_rate(completed, total),
    }
}

#[tracing::instrument(skip(tasks), fields(tasks = tasks.len()))]
pub fn derive_view<'a>(tasks: &'a [TaskDto], tabs: &[TaskStatus]) -> TaskView<'a> {
    let buckets = group_by_status(tasks, tabs);
    let stats = task_stats(tasks);
    trace!(?stats, "derived task view");
    TaskView { buckets, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::task;

    fn sample() -> Vec<TaskDto> {
        vec![
            task("1", TaskStatus::Todo),
            task("2", TaskStatus::Completed),
            task("3", TaskStatus::Completed),
            task("4", TaskStatus::Blocked),
        ]
    }

    #[test]
    fn groups_and_aggregates_mixed_statuses() {
        let tasks = sample();
        let view = derive_view(&tasks, &TaskStatus::ALL);

        assert_eq!(
            view.stats,
            TaskStats {
                total: 4,
                completed: 2,
                in_progress: 0,
                overdue: 0,
                blocked: 1,
                completion_rate: 50,
            }
        );
        let completed: Vec<&str> = view
            .buckets
            .get(StatusTab::Status(TaskStatus::Completed))
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(completed, ["2", "3"]);
        assert_eq!(view.buckets.get(StatusTab::All).len(), 4);
    }

    #[test]
    fn every_tabbed_task_lands_in_exactly_one_bucket() {
        let tasks = sample();
        let tabs = [TaskStatus::Todo, TaskStatus::Completed];
        let buckets = group_by_status(&tasks, &tabs);

        let bucketed: usize = tabs
            .iter()
            .map(|s| buckets.get(StatusTab::Status(*s)).len())
            .sum();
        let eligible = tasks.iter().filter(|t| tabs.contains(&t.status)).count();
        assert_eq!(bucketed, eligible);
        assert_eq!(buckets.get(StatusTab::All).len(), tasks.len());
    }

    #[test]
    fn status_outside_tabs_only_shows_under_all() {
        let tasks = sample();
        let buckets = group_by_status(&tasks, &[TaskStatus::Todo]);

        assert!(buckets.get(StatusTab::Status(TaskStatus::Blocked)).is_empty());
        assert!(buckets.get(StatusTab::All).iter().any(|t| t.id == "4"));
        let tabs: Vec<StatusTab> = buckets.tabs().collect();
        assert_eq!(tabs, [StatusTab::All, StatusTab::Status(TaskStatus::Todo)]);
    }

    #[test]
    fn duplicate_tabs_collapse_to_one_bucket() {
        let tasks = sample();
        let buckets = group_by_status(&tasks, &[TaskStatus::Completed, TaskStatus::Completed]);
        assert_eq!(buckets.counts().len(), 2);
        assert_eq!(buckets.get(StatusTab::Status(TaskStatus::Completed)).len(), 2);
    }

    #[test]
    fn empty_input_yields_zero_stats() {
        let view = derive_view(&[], &TaskStatus::ALL);
        assert_eq!(view.stats, TaskStats::default());
        assert!(view.buckets.counts().iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn completion_rate_rounds_half_up_within_bounds() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
        assert_eq!(completion_rate(5, 5), 100);
        for total in 1..40 {
            for done in 0..=total {
                assert!(completion_rate(done, total) <= 100);
            }
        }
    }

    #[test]
    fn derivation_is_repeatable() {
        let tasks = sample();
        let first = serde_json::to_vec(&derive_view(&tasks, &TaskStatus::ALL)).unwrap();
        let second = serde_json::to_vec(&derive_view(&tasks, &TaskStatus::ALL)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn json_keys_buckets_by_status_name() {
        let tasks = sample();
        let tabs = [TaskStatus::Todo, TaskStatus::Completed];
        let value = serde_json::to_value(derive_view(&tasks, &tabs)).unwrap();

        let by_status = value["buckets"]["byStatus"].as_object().unwrap();
        let keys: Vec<&str> = by_status.keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(by_status["completed"].as_array().unwrap().len(), 2);
        assert_eq!(by_status["todo"][0]["id"], "1");
        assert_eq!(value["buckets"]["all"].as_array().unwrap().len(), 4);
        assert!(value["buckets"].get("by_status").is_none());
        assert_eq!(value["stats"]["completionRate"], 50);
    }

    #[test]
    fn tabs_parse_from_wire_names() {
        assert_eq!("all".parse::<StatusTab>().unwrap(), StatusTab::All);
        assert_eq!(
            "overdue".parse::<StatusTab>().unwrap(),
            StatusTab::Status(TaskStatus::Overdue)
        );
        assert!("archived".parse::<StatusTab>().is_err());
    }
}
