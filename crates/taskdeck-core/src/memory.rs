use std::collections::BTreeSet;

use anyhow::{anyhow, bail};
use chrono::Utc;
use parking_lot::Mutex;
use taskdeck_shared::{
    AreasListResult, MemberDto, MembersListResult, ProjectAreaDto, ProjectAreaPatch, TaskCreate,
    TaskDto, TaskPatch, TaskStatus, TasksListArgs, TasksListResult,
};
use tracing::{debug, instrument};

use crate::api::TaskApi;
use crate::datetime::format_wire;
use crate::query::run_query;
use crate::view::completion_rate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ApiOp {
    ListTasks,
    GetTask,
    ListMembers,
    ListAreas,
    CreateTask,
    UpdateTask,
    UpdateStatus,
    AssignTask,
    DeleteTask,
    UpdateArea,
    DeleteArea,
    RecalculateArea,
}

#[derive(Debug, Default)]
struct Inner {
    tasks: Vec<TaskDto>,
    members: Vec<(String, MemberDto)>,
    areas: Vec<ProjectAreaDto>,
    next_id: u64,
    failing: BTreeSet<ApiOp>,
    calls: Vec<ApiOp>,
    limit_cap: Option<u32>,
}

/// In-process stand-in for the remote service. Applies the same list
/// semantics the server does and can be told to reject the next call of a
/// given kind.
#[derive(Debug, Default)]
pub struct MemoryTaskApi {
    inner: Mutex<Inner>,
}

impl MemoryTaskApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<TaskDto>) -> Self {
        let api = Self::new();
        api.inner.lock().tasks = tasks;
        api
    }

    pub fn insert_task(&self, task: TaskDto) {
        self.inner.lock().tasks.push(task);
    }

    pub fn insert_member(&self, project_id: &str, member: MemberDto) {
        self.inner
            .lock()
            .members
            .push((project_id.to_string(), member));
    }

    pub fn insert_area(&self, area: ProjectAreaDto) {
        self.inner.lock().areas.push(area);
    }

    pub fn tasks(&self) -> Vec<TaskDto> {
        self.inner.lock().tasks.clone()
    }

    pub fn areas(&self) -> Vec<ProjectAreaDto> {
        self.inner.lock().areas.clone()
    }

    /// Makes the next call of `op` fail once.
    pub fn fail_next(&self, op: ApiOp) {
        self.inner.lock().failing.insert(op);
    }

    /// Serves at most `cap` tasks per list page whatever limit is asked for.
    pub fn cap_limit(&self, cap: u32) {
        self.inner.lock().limit_cap = Some(cap.max(1));
    }

    pub fn calls(&self) -> Vec<ApiOp> {
        self.inner.lock().calls.clone()
    }

    fn begin(&self, op: ApiOp) -> anyhow::Result<parking_lot::MutexGuard<'_, Inner>> {
        let mut inner = self.inner.lock();
        inner.calls.push(op);
        if inner.failing.remove(&op) {
            debug!(?op, "injected failure");
            bail!("simulated {op:?} failure");
        }
        Ok(inner)
    }
}

fn now_wire() -> String {
    format_wire(Utc::now())
}

fn find_task<'a>(
    tasks: &'a mut [TaskDto],
    id: &str,
    project_id: &str,
) -> anyhow::Result<&'a mut TaskDto> {
    tasks
        .iter_mut()
        .find(|t| t.id == id && t.project_id == project_id)
        .ok_or_else(|| anyhow!("task {id} not found in project {project_id}"))
}

fn find_area<'a>(
    areas: &'a mut [ProjectAreaDto],
    project_id: &str,
    area_id: &str,
) -> anyhow::Result<&'a mut ProjectAreaDto> {
    areas
        .iter_mut()
        .find(|a| a.id == area_id && a.project_id == project_id)
        .ok_or_else(|| anyhow!("area {area_id} not found in project {project_id}"))
}

fn apply_patch(task: &mut TaskDto, patch: &TaskPatch) {
    let p = patch.clone();
    if let Some(v) = p.title {
        task.title = v;
    }
    if let Some(v) = p.description {
        task.description = v;
    }
    if let Some(v) = p.status {
        task.status = v;
    }
    if let Some(v) = p.priority {
        task.priority = v;
    }
    if let Some(v) = p.project_area_id {
        task.project_area_id = v;
    }
    if let Some(v) = p.assignee_id {
        task.assignee_id = v;
    }
    if let Some(v) = p.collaborator_ids {
        task.collaborator_ids = v;
    }
    if let Some(v) = p.due_date {
        task.due_date = v;
    }
    if let Some(v) = p.start_date {
        task.start_date = v;
    }
    if let Some(v) = p.estimated_hours {
        task.estimated_hours = v;
    }
    if let Some(v) = p.actual_hours {
        task.actual_hours = v;
    }
    if let Some(v) = p.week {
        task.week = v;
    }
    if let Some(v) = p.weight {
        task.weight = v;
    }
    if let Some(v) = p.max_grade {
        task.max_grade = v;
    }
    if let Some(v) = p.grade {
        task.grade = v;
    }
    if let Some(v) = p.skills {
        task.skills = v;
    }
    if let Some(v) = p.learning_objectives {
        task.learning_objectives = v;
    }
    if let Some(v) = p.visibility {
        task.visibility = v;
    }
    if let Some(v) = p.resources {
        task.resources = v;
    }
}

impl TaskApi for MemoryTaskApi {
    #[instrument(skip(self))]
    async fn list_tasks(&self, args: &TasksListArgs) -> anyhow::Result<TasksListResult> {
        let inner = self.begin(ApiOp::ListTasks)?;
        match inner.limit_cap {
            Some(cap) if args.limit > cap => {
                debug!(asked = args.limit, cap, "capping list limit");
                let capped = TasksListArgs {
                    limit: cap,
                    ..args.clone()
                };
                Ok(run_query(&inner.tasks, &capped))
            }
            _ => Ok(run_query(&inner.tasks, args)),
        }
    }

    async fn get_task(&self, id: &str, project_id: &str) -> anyhow::Result<TaskDto> {
        let mut inner = self.begin(ApiOp::GetTask)?;
        find_task(&mut inner.tasks, id, project_id).map(|t| t.clone())
    }

    async fn get_project_members(&self, project_id: &str) -> anyhow::Result<MembersListResult> {
        let inner = self.begin(ApiOp::ListMembers)?;
        let data = inner
            .members
            .iter()
            .filter(|(p, _)| p == project_id)
            .map(|(_, m)| m.clone())
            .collect();
        Ok(MembersListResult { data })
    }

    async fn list_project_areas(&self, project_id: &str) -> anyhow::Result<AreasListResult> {
        let inner = self.begin(ApiOp::ListAreas)?;
        let data = inner
            .areas
            .iter()
            .filter(|a| a.project_id == project_id)
            .cloned()
            .collect();
        Ok(AreasListResult { data })
    }

    #[instrument(skip(self, payload), fields(project_id = %payload.project_id))]
    async fn create_task(&self, payload: &TaskCreate) -> anyhow::Result<TaskDto> {
        let mut inner = self.begin(ApiOp::CreateTask)?;
        inner.next_id += 1;
        let now = now_wire();
        let p = payload.clone();
        let task = TaskDto {
            id: format!("task-{}", inner.next_id),
            project_id: p.project_id,
            project_area_id: p.project_area_id,
            title: p.title,
            description: p.description,
            status: p.status,
            priority: p.priority,
            assignee_id: p.assignee_id,
            collaborator_ids: p.collaborator_ids.unwrap_or_default(),
            due_date: p.due_date,
            start_date: p.start_date,
            estimated_hours: p.estimated_hours,
            actual_hours: None,
            week: p.week,
            weight: p.weight,
            max_grade: p.max_grade,
            grade: None,
            skills: p.skills.unwrap_or_default(),
            learning_objectives: p.learning_objectives.unwrap_or_default(),
            visibility: p.visibility,
            resources: p.resources,
            created_at: now.clone(),
            updated_at: now,
        };
        inner.tasks.push(task.clone());
        Ok(task)
    }

    #[instrument(skip(self, patch))]
    async fn update_task(
        &self,
        id: &str,
        project_id: &str,
        patch: &TaskPatch,
    ) -> anyhow::Result<TaskDto> {
        let mut inner = self.begin(ApiOp::UpdateTask)?;
        let task = find_task(&mut inner.tasks, id, project_id)?;
        apply_patch(task, patch);
        task.updated_at = now_wire();
        Ok(task.clone())
    }

    #[instrument(skip(self))]
    async fn update_task_status(
        &self,
        id: &str,
        project_id: &str,
        status: TaskStatus,
    ) -> anyhow::Result<TaskDto> {
        let mut inner = self.begin(ApiOp::UpdateStatus)?;
        let task = find_task(&mut inner.tasks, id, project_id)?;
        task.status = status;
        task.updated_at = now_wire();
        Ok(task.clone())
    }

    #[instrument(skip(self))]
    async fn assign_task(
        &self,
        id: &str,
        project_id: &str,
        assignee_id: Option<&str>,
    ) -> anyhow::Result<TaskDto> {
        let mut inner = self.begin(ApiOp::AssignTask)?;
        let task = find_task(&mut inner.tasks, id, project_id)?;
        task.assignee_id = assignee_id.map(str::to_string);
        task.updated_at = now_wire();
        Ok(task.clone())
    }

    #[instrument(skip(self))]
    async fn delete_task(
        &self,
        id: &str,
        project_id: &str,
        project_area_id: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut inner = self.begin(ApiOp::DeleteTask)?;
        let before = inner.tasks.len();
        inner.tasks.retain(|t| {
            !(t.id == id
                && t.project_id == project_id
                && project_area_id.is_none_or(|a| t.project_area_id.as_deref() == Some(a)))
        });
        if inner.tasks.len() == before {
            bail!("task {id} not found in project {project_id}");
        }
        Ok(())
    }

    #[instrument(skip(self, patch))]
    async fn update_project_area(
        &self,
        project_id: &str,
        area_id: &str,
        patch: &ProjectAreaPatch,
    ) -> anyhow::Result<ProjectAreaDto> {
        let mut inner = self.begin(ApiOp::UpdateArea)?;
        let area = find_area(&mut inner.areas, project_id, area_id)?;
        let p = patch.clone();
        if let Some(name) = p.name {
            area.name = name;
        }
        if let Some(description) = p.description {
            area.description = description;
        }
        if let Some(status) = p.status {
            area.status = status;
        }
        if let Some(progress) = p.progress {
            area.progress = progress.min(100);
        }
        Ok(area.clone())
    }

    #[instrument(skip(self))]
    async fn delete_project_area(&self, project_id: &str, area_id: &str) -> anyhow::Result<()> {
        let mut inner = self.begin(ApiOp::DeleteArea)?;
        let before = inner.areas.len();
        inner
            .areas
            .retain(|a| !(a.id == area_id && a.project_id == project_id));
        if inner.areas.len() == before {
            bail!("area {area_id} not found in project {project_id}");
        }
        for task in inner
            .tasks
            .iter_mut()
            .filter(|t| t.project_id == project_id)
        {
            if task.project_area_id.as_deref() == Some(area_id) {
                task.project_area_id = None;
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recalculate_area_progress(
        &self,
        project_id: &str,
        area_id: &str,
    ) -> anyhow::Result<ProjectAreaDto> {
        let mut inner = self.begin(ApiOp::RecalculateArea)?;
        let (total, completed) = inner
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id && t.project_area_id.as_deref() == Some(area_id))
            .fold((0usize, 0usize), |(total, done), t| {
                (total + 1, done + usize::from(t.status == TaskStatus::Completed))
            });

        let area = find_area(&mut inner.areas, project_id, area_id)?;
        area.progress = completion_rate(completed, total);
        area.task_count = u32::try_from(total).ok();
        area.completed_task_count = u32::try_from(completed).ok();
        debug!(total, completed, progress = area.progress, "recalculated area progress");
        Ok(area.clone())
    }
}
