//! Read-only projection of one task plus its action triggers.

use chrono::NaiveDate;
use taskdeck_shared::{MemberDto, ProjectAreaDto, ResourceDto, TaskDto, TaskStatus};
use tracing::{debug, instrument, warn};

use crate::actions::TaskActions;
use crate::api::TaskApi;
use crate::datetime::{calendar_date, days_between};
use crate::notice::Notice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueIn {
    Remaining(i64),
    Today,
    Overdue(i64),
    /// Due date missing or unparseable.
    Unknown,
}

impl DueIn {
    pub fn describe(self) -> String {
        match self {
            DueIn::Remaining(1) => "1 day remaining".to_string(),
            DueIn::Remaining(n) => format!("{n} days remaining"),
            DueIn::Today => "Due today".to_string(),
            DueIn::Overdue(1) => "1 day overdue".to_string(),
            DueIn::Overdue(n) => format!("{n} days overdue"),
            DueIn::Unknown => "No due date".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneeDisplay {
    pub name: String,
    pub initials: String,
}

impl AssigneeDisplay {
    fn unassigned() -> Self {
        Self {
            name: "Unassigned".to_string(),
            initials: "?".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceAction {
    /// Client-side navigation.
    Open(String),
    /// Handed to the caller's download hook by resource id.
    Download(String),
}

/// First letters of the first two words, uppercased.
pub fn initials_of(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .take(2)
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect();
    if initials.is_empty() {
        "?".to_string()
    } else {
        initials
    }
}

#[derive(Debug, Clone)]
pub struct TaskDetail {
    task: TaskDto,
}

impl TaskDetail {
    pub fn new(task: TaskDto) -> Self {
        Self { task }
    }

    pub fn task(&self) -> &TaskDto {
        &self.task
    }

    pub fn due_in(&self, today: NaiveDate) -> DueIn {
        let Some(due) = calendar_date(&self.task.due_date) else {
            return DueIn::Unknown;
        };
        match days_between(today, due) {
            0 => DueIn::Today,
            n if n > 0 => DueIn::Remaining(n),
            n => DueIn::Overdue(-n),
        }
    }

    pub fn assignee(&self, members: &[MemberDto]) -> AssigneeDisplay {
        let Some(id) = self.task.assignee_id.as_deref() else {
            return AssigneeDisplay::unassigned();
        };
        match members.iter().find(|m| m.id == id) {
            Some(member) => AssigneeDisplay {
                name: member.name.clone(),
                initials: member
                    .initials
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map_or_else(|| initials_of(&member.name), str::to_string),
            },
            None => AssigneeDisplay {
                name: id.to_string(),
                initials: "?".to_string(),
            },
        }
    }

    pub fn area_name<'a>(&self, areas: &'a [ProjectAreaDto]) -> Option<&'a str> {
        let id = self.task.project_area_id.as_deref()?;
        areas.iter().find(|a| a.id == id).map(|a| a.name.as_str())
    }

    pub fn can_mark_complete(&self) -> bool {
        self.task.status != TaskStatus::Completed
    }

    /// Shows the task as completed straight away and puts the previous
    /// status back if the server rejects the change.
    #[instrument(skip(self, actions), fields(task_id = %self.task.id))]
    pub async fn complete<A: TaskApi>(&mut self, actions: &TaskActions<'_, A>) -> Notice {
        if !self.can_mark_complete() {
            return Notice::info(
                "Already completed",
                format!("\"{}\" is already completed.", self.task.title),
            );
        }

        let previous = self.task.status;
        self.task.status = TaskStatus::Completed;
        match actions.mark_complete(&self.task.id).await {
            Ok(done) => {
                self.task = done.value;
                done.notice
            }
            Err(err) => {
                warn!(previous = previous.as_str(), "reverting optimistic completion");
                self.task.status = previous;
                err.notice
            }
        }
    }

    pub fn resource_action(&self, resource: &ResourceDto) -> ResourceAction {
        let action = match resource.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => ResourceAction::Open(url.to_string()),
            _ => ResourceAction::Download(resource.id.clone()),
        };
        debug!(resource_id = %resource.id, ?action, "resource action");
        action
    }
}

#[cfg(test)]
mod tests {
    use taskdeck_shared::{AreaStatus, ResourceKind};

    use super::*;
    use crate::memory::{ApiOp, MemoryTaskApi};
    use crate::notice::NoticeLevel;
    use crate::testing::task;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 29).unwrap()
    }

    fn member(id: &str, name: &str, initials: Option<&str>) -> MemberDto {
        MemberDto {
            id: id.to_string(),
            name: name.to_string(),
            role: "member".to_string(),
            avatar: None,
            initials: initials.map(str::to_string),
        }
    }

    #[test]
    fn due_in_counts_calendar_days() {
        let mut t = task("t1", TaskStatus::Todo);
        let detail = TaskDetail::new(t.clone());
        assert_eq!(detail.due_in(today()), DueIn::Remaining(3));

        t.due_date = "2026-10-29T18:00:00.000Z".to_string();
        assert_eq!(TaskDetail::new(t.clone()).due_in(today()), DueIn::Today);

        t.due_date = "2026-10-27".to_string();
        assert_eq!(TaskDetail::new(t.clone()).due_in(today()), DueIn::Overdue(2));

        t.due_date = "soon".to_string();
        assert_eq!(TaskDetail::new(t).due_in(today()), DueIn::Unknown);
        assert_eq!(DueIn::Overdue(1).describe(), "1 day overdue");
    }

    #[test]
    fn assignee_falls_back_through_initials() {
        let members = vec![
            member("m1", "Ada Lovelace", Some("AL")),
            member("m2", "grace brewster hopper", None),
        ];
        let mut t = task("t1", TaskStatus::Todo);
        assert_eq!(TaskDetail::new(t.clone()).assignee(&members).name, "Unassigned");

        t.assignee_id = Some("m1".to_string());
        assert_eq!(TaskDetail::new(t.clone()).assignee(&members).initials, "AL");

        t.assignee_id = Some("m2".to_string());
        let shown = TaskDetail::new(t.clone()).assignee(&members);
        assert_eq!(shown.name, "grace brewster hopper");
        assert_eq!(shown.initials, "GB");

        t.assignee_id = Some("gone".to_string());
        assert_eq!(TaskDetail::new(t).assignee(&members).initials, "?");
        assert_eq!(initials_of("   "), "?");
    }

    #[test]
    fn area_name_resolves_from_local_list() {
        let areas = vec![ProjectAreaDto {
            id: "a1".to_string(),
            project_id: "p1".to_string(),
            name: "Frontend".to_string(),
            description: None,
            status: AreaStatus::Planned,
            progress: 0,
            task_count: None,
            completed_task_count: None,
        }];
        let mut t = task("t1", TaskStatus::Todo);
        assert_eq!(TaskDetail::new(t.clone()).area_name(&areas), None);
        t.project_area_id = Some("a1".to_string());
        assert_eq!(TaskDetail::new(t).area_name(&areas), Some("Frontend"));
    }

    #[test]
    fn resources_open_or_download() {
        let detail = TaskDetail::new(task("t1", TaskStatus::Todo));
        let mut resource = ResourceDto {
            id: "r1".to_string(),
            title: "Brief".to_string(),
            kind: ResourceKind::Document,
            url: Some("https://example.test/brief".to_string()),
            description: None,
        };
        assert_eq!(
            detail.resource_action(&resource),
            ResourceAction::Open("https://example.test/brief".to_string())
        );
        resource.url = Some(" ".to_string());
        assert_eq!(
            detail.resource_action(&resource),
            ResourceAction::Download("r1".to_string())
        );
    }

    #[tokio::test]
    async fn complete_applies_server_copy() {
        let api = MemoryTaskApi::with_tasks(vec![task("t1", TaskStatus::InProgress)]);
        let actions = TaskActions::new(&api, "p1");
        let mut detail = TaskDetail::new(api.tasks()[0].clone());

        let notice = detail.complete(&actions).await;
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(detail.task().status, TaskStatus::Completed);
        assert!(!detail.can_mark_complete());
    }

    #[tokio::test]
    async fn rejected_completion_reverts_status() {
        let api = MemoryTaskApi::with_tasks(vec![task("t1", TaskStatus::InProgress)]);
        api.fail_next(ApiOp::UpdateStatus);
        let actions = TaskActions::new(&api, "p1");
        let mut detail = TaskDetail::new(api.tasks()[0].clone());

        let notice = detail.complete(&actions).await;
        assert!(notice.is_error());
        assert_eq!(detail.task().status, TaskStatus::InProgress);
        assert_eq!(api.tasks()[0].status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn completed_task_makes_no_call() {
        let api = MemoryTaskApi::with_tasks(vec![task("t1", TaskStatus::Completed)]);
        let actions = TaskActions::new(&api, "p1");
        let mut detail = TaskDetail::new(api.tasks()[0].clone());

        let notice = detail.complete(&actions).await;
        assert_eq!(notice.level, NoticeLevel::Info);
        assert!(api.calls().is_empty());
    }
}
