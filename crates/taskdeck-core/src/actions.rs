//! User intents turned into API calls.
//!
//! Every operation returns its [`Notice`] as a value. Failures also carry
//! the underlying error so a caller holding optimistic state can revert.

use std::fmt;

use taskdeck_shared::{
    ProjectAreaDto, ProjectAreaPatch, TaskCreate, TaskDto, TaskPatch, TaskPriority, TaskStatus,
    TasksListArgs, TasksListResult,
};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::api::TaskApi;
use crate::form::{EditSession, FormErrors};
use crate::notice::Notice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ChangeStatus,
    ChangePriority,
    ChangeAssignee,
    SaveTask,
    DeleteTask,
    CreateTask,
    UpdateArea,
    DeleteArea,
    RecalculateArea,
}

impl Action {
    fn failure_notice(self) -> Notice {
        let (title, message) = match self {
            Action::ChangeStatus => (
                "Status not updated",
                "Failed to update the task status. Please try again.",
            ),
            Action::ChangePriority => (
                "Priority not updated",
                "Failed to update the task priority. Please try again.",
            ),
            Action::ChangeAssignee => (
                "Assignee not updated",
                "Failed to update the task assignee. Please try again.",
            ),
            Action::SaveTask => (
                "Task not saved",
                "Failed to save your changes. Please try again.",
            ),
            Action::DeleteTask => (
                "Task not deleted",
                "Failed to delete the task. Please try again.",
            ),
            Action::CreateTask => (
                "Task not created",
                "Failed to create the task. Please try again.",
            ),
            Action::UpdateArea => (
                "Area not updated",
                "Failed to update the project area. Please try again.",
            ),
            Action::DeleteArea => (
                "Area not deleted",
                "Failed to delete the project area. Please try again.",
            ),
            Action::RecalculateArea => (
                "Progress not recalculated",
                "Failed to recalculate area progress. Please try again.",
            ),
        };
        Notice::error(title, message)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Action::ChangeStatus => "change task status",
            Action::ChangePriority => "change task priority",
            Action::ChangeAssignee => "change task assignee",
            Action::SaveTask => "save task",
            Action::DeleteTask => "delete task",
            Action::CreateTask => "create task",
            Action::UpdateArea => "update project area",
            Action::DeleteArea => "delete project area",
            Action::RecalculateArea => "recalculate area progress",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
#[error("failed to {action}: {source}")]
pub struct MutationError {
    pub action: Action,
    pub notice: Notice,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

/// A successful mutation: the server's copy plus what to tell the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutated<T> {
    pub value: T,
    pub notice: Notice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Never sent; the inline errors say why.
    Invalid(FormErrors),
    Saved(Mutated<TaskDto>),
    /// Sent and rejected; the edit surface stays open.
    Failed(Notice),
}

/// Outcome of a read, handed to list renderers.
#[derive(Debug, Clone, PartialEq)]
pub enum ListState<T> {
    Ready(T),
    Failed(Notice),
}

/// Mutations scoped to one project.
pub struct TaskActions<'a, A> {
    api: &'a A,
    project_id: String,
}

impl<'a, A: TaskApi> TaskActions<'a, A> {
    pub fn new(api: &'a A, project_id: impl Into<String>) -> Self {
        Self {
            api,
            project_id: project_id.into(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn fail(&self, action: Action, err: anyhow::Error) -> MutationError {
        error!(
            project_id = %self.project_id,
            action = %action,
            error = ?err,
            "mutation failed"
        );
        MutationError {
            action,
            notice: action.failure_notice(),
            source: err.into(),
        }
    }

    #[instrument(skip(self), fields(project_id = %self.project_id))]
    pub async fn list_tasks(&self, mut args: TasksListArgs) -> ListState<TasksListResult> {
        args.project_id = self.project_id.clone();
        match self.api.list_tasks(&args).await {
            Ok(result) => ListState::Ready(result),
            Err(err) => {
                error!(error = ?err, "task list failed");
                ListState::Failed(Notice::error(
                    "Tasks unavailable",
                    "Failed to load tasks. Please refresh to try again.",
                ))
            }
        }
    }

    #[instrument(skip(self), fields(project_id = %self.project_id))]
    pub async fn change_status(
        &self,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Mutated<TaskDto>, MutationError> {
        let task = self
            .api
            .update_task_status(task_id, &self.project_id, status)
            .await
            .map_err(|err| self.fail(Action::ChangeStatus, err))?;
        info!(task_id, status = status.as_str(), "task status updated");
        let notice = Notice::success(
            "Status updated",
            format!("\"{}\" is now {}.", task.title, status.label()),
        );
        Ok(Mutated {
            value: task,
            notice,
        })
    }

    pub async fn mark_complete(&self, task_id: &str) -> Result<Mutated<TaskDto>, MutationError> {
        self.change_status(task_id, TaskStatus::Completed).await
    }

    #[instrument(skip(self), fields(project_id = %self.project_id))]
    pub async fn change_priority(
        &self,
        task_id: &str,
        priority: TaskPriority,
    ) -> Result<Mutated<TaskDto>, MutationError> {
        let patch = TaskPatch {
            priority: Some(priority),
            ..TaskPatch::default()
        };
        let task = self
            .api
            .update_task(task_id, &self.project_id, &patch)
            .await
            .map_err(|err| self.fail(Action::ChangePriority, err))?;
        info!(task_id, priority = priority.as_str(), "task priority updated");
        let notice = Notice::success(
            "Priority updated",
            format!("\"{}\" is now {} priority.", task.title, priority.label()),
        );
        Ok(Mutated {
            value: task,
            notice,
        })
    }

    /// `None` unassigns the task.
    #[instrument(skip(self), fields(project_id = %self.project_id))]
    pub async fn change_assignee(
        &self,
        task_id: &str,
        assignee_id: Option<&str>,
    ) -> Result<Mutated<TaskDto>, MutationError> {
        let task = self
            .api
            .assign_task(task_id, &self.project_id, assignee_id)
            .await
            .map_err(|err| self.fail(Action::ChangeAssignee, err))?;
        info!(task_id, assignee_id, "task assignee updated");
        let message = match assignee_id {
            Some(_) => format!("\"{}\" has been reassigned.", task.title),
            None => format!("\"{}\" is now unassigned.", task.title),
        };
        Ok(Mutated {
            value: task,
            notice: Notice::success("Assignee updated", message),
        })
    }

    /// Validates locally, then sends the whole buffer. On success the
    /// session adopts the saved copy as its new baseline.
    #[instrument(skip(self, session), fields(project_id = %self.project_id, task_id = session.task_id()))]
    pub async fn save_edit(&self, session: &mut EditSession) -> SaveOutcome {
        let patch = match session.prepare() {
            Ok(patch) => patch,
            Err(errors) => return SaveOutcome::Invalid(errors),
        };

        match self
            .api
            .update_task(session.task_id(), &self.project_id, &patch)
            .await
        {
            Ok(task) => {
                info!(task_id = %task.id, "task saved");
                session.commit(&task);
                let notice =
                    Notice::success("Task updated", format!("\"{}\" has been saved.", task.title));
                SaveOutcome::Saved(Mutated {
                    value: task,
                    notice,
                })
            }
            Err(err) => SaveOutcome::Failed(self.fail(Action::SaveTask, err).notice),
        }
    }

    /// No local removal happens here; the list is expected to be refetched.
    #[instrument(skip(self, task), fields(project_id = %self.project_id, task_id = %task.id))]
    pub async fn delete_task(&self, task: &TaskDto) -> Result<Mutated<()>, MutationError> {
        self.api
            .delete_task(&task.id, &self.project_id, task.project_area_id.as_deref())
            .await
            .map_err(|err| self.fail(Action::DeleteTask, err))?;
        info!("task deleted");
        Ok(Mutated {
            value: (),
            notice: Notice::success("Task deleted", format!("\"{}\" was deleted.", task.title)),
        })
    }

    #[instrument(skip(self, payload), fields(project_id = %self.project_id))]
    pub async fn create_task(&self, payload: &TaskCreate) -> Result<Mutated<TaskDto>, MutationError> {
        let task = self
            .api
            .create_task(payload)
            .await
            .map_err(|err| self.fail(Action::CreateTask, err))?;
        info!(task_id = %task.id, "task created");
        let notice = Notice::success("Task created", format!("\"{}\" was created.", task.title));
        Ok(Mutated {
            value: task,
            notice,
        })
    }

    #[instrument(skip(self, patch), fields(project_id = %self.project_id))]
    pub async fn update_area(
        &self,
        area_id: &str,
        patch: &ProjectAreaPatch,
    ) -> Result<Mutated<ProjectAreaDto>, MutationError> {
        let area = self
            .api
            .update_project_area(&self.project_id, area_id, patch)
            .await
            .map_err(|err| self.fail(Action::UpdateArea, err))?;
        info!(area_id, "project area updated");
        let notice = Notice::success("Area updated", format!("\"{}\" has been saved.", area.name));
        Ok(Mutated {
            value: area,
            notice,
        })
    }

    #[instrument(skip(self, area), fields(project_id = %self.project_id, area_id = %area.id))]
    pub async fn delete_area(&self, area: &ProjectAreaDto) -> Result<Mutated<()>, MutationError> {
        self.api
            .delete_project_area(&self.project_id, &area.id)
            .await
            .map_err(|err| self.fail(Action::DeleteArea, err))?;
        info!("project area deleted");
        Ok(Mutated {
            value: (),
            notice: Notice::success("Area deleted", format!("\"{}\" was deleted.", area.name)),
        })
    }

    #[instrument(skip(self), fields(project_id = %self.project_id))]
    pub async fn recalculate_area_progress(
        &self,
        area_id: &str,
    ) -> Result<Mutated<ProjectAreaDto>, MutationError> {
        let area = self
            .api
            .recalculate_area_progress(&self.project_id, area_id)
            .await
            .map_err(|err| self.fail(Action::RecalculateArea, err))?;
        info!(area_id, progress = area.progress, "area progress recalculated");
        let notice = Notice::success(
            "Progress recalculated",
            format!("\"{}\" is {}% complete.", area.name, area.progress),
        );
        Ok(Mutated {
            value: area,
            notice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FormField, TITLE_REQUIRED};
    use crate::memory::{ApiOp, MemoryTaskApi};
    use crate::notice::NoticeLevel;
    use crate::testing::task;

    #[tokio::test]
    async fn status_change_notifies_with_task_title() {
        let api = MemoryTaskApi::with_tasks(vec![task("t1", TaskStatus::Todo)]);
        let actions = TaskActions::new(&api, "p1");

        let done = actions
            .change_status("t1", TaskStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(done.value.status, TaskStatus::InProgress);
        assert_eq!(done.notice.level, NoticeLevel::Success);
        assert!(done.notice.message.contains("Task t1"));
    }

    #[tokio::test]
    async fn failures_surface_generic_notice_and_source() {
        let api = MemoryTaskApi::with_tasks(vec![task("t1", TaskStatus::Todo)]);
        api.fail_next(ApiOp::UpdateStatus);
        let actions = TaskActions::new(&api, "p1");

        let err = actions
            .change_status("t1", TaskStatus::Completed)
            .await
            .unwrap_err();
        assert_eq!(err.action, Action::ChangeStatus);
        assert!(err.notice.is_error());
        assert!(!err.notice.message.contains("simulated"));
        assert!(err.to_string().contains("simulated"));
        assert_eq!(api.tasks()[0].status, TaskStatus::Todo);
    }

    #[tokio::test]
    async fn assignee_can_be_cleared() {
        let mut t = task("t1", TaskStatus::Todo);
        t.assignee_id = Some("m1".to_string());
        let api = MemoryTaskApi::with_tasks(vec![t]);
        let actions = TaskActions::new(&api, "p1");

        let updated = actions.change_assignee("t1", None).await.unwrap();
        assert_eq!(updated.value.assignee_id, None);
        assert!(updated.notice.message.contains("unassigned"));
    }

    #[tokio::test]
    async fn priority_change_only_touches_priority() {
        let api = MemoryTaskApi::with_tasks(vec![task("t1", TaskStatus::Todo)]);
        let actions = TaskActions::new(&api, "p1");
        let updated = actions
            .change_priority("t1", TaskPriority::Critical)
            .await
            .unwrap();
        assert_eq!(updated.value.priority, TaskPriority::Critical);
        assert_eq!(updated.value.title, "Task t1");
    }

    #[tokio::test]
    async fn invalid_edit_never_reaches_the_api() {
        let api = MemoryTaskApi::with_tasks(vec![task("t1", TaskStatus::Todo)]);
        let actions = TaskActions::new(&api, "p1");
        let mut session = EditSession::new(&api.tasks()[0]);
        session.edit(FormField::Title, |f| f.basic.title = "  ".to_string());

        match actions.save_edit(&mut session).await {
            SaveOutcome::Invalid(errors) => {
                assert_eq!(errors.get(FormField::Title), Some(TITLE_REQUIRED));
            }
            other => panic!("expected invalid outcome, got {other:?}"),
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_session_dirty() {
        let api = MemoryTaskApi::with_tasks(vec![task("t1", TaskStatus::Todo)]);
        api.fail_next(ApiOp::UpdateTask);
        let actions = TaskActions::new(&api, "p1");
        let mut session = EditSession::new(&api.tasks()[0]);
        session.edit(FormField::Title, |f| f.basic.title = "Renamed".to_string());

        let outcome = actions.save_edit(&mut session).await;
        assert!(matches!(outcome, SaveOutcome::Failed(ref n) if n.is_error()));
        assert!(session.is_dirty());

        let outcome = actions.save_edit(&mut session).await;
        assert!(matches!(outcome, SaveOutcome::Saved(_)));
        assert!(!session.is_dirty());
        assert_eq!(api.tasks()[0].title, "Renamed");
    }

    #[tokio::test]
    async fn delete_passes_owning_area() {
        let mut t = task("t1", TaskStatus::Todo);
        t.project_area_id = Some("a1".to_string());
        let api = MemoryTaskApi::with_tasks(vec![t.clone()]);
        let actions = TaskActions::new(&api, "p1");

        let deleted = actions.delete_task(&t).await.unwrap();
        assert!(deleted.notice.message.contains("Task t1"));
        assert!(api.tasks().is_empty());
    }

    #[tokio::test]
    async fn list_failure_becomes_error_state() {
        let api = MemoryTaskApi::new();
        api.fail_next(ApiOp::ListTasks);
        let actions = TaskActions::new(&api, "p1");
        let state = actions.list_tasks(TasksListArgs::for_project("ignored")).await;
        assert!(matches!(state, ListState::Failed(ref n) if n.is_error()));
    }
}
