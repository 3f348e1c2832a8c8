//! The remote task/project/member API as seen from the dashboard.
//!
//! Persistence lives behind this trait. [`crate::http::HttpTaskApi`] talks
//! to the real service; [`crate::memory::MemoryTaskApi`] keeps everything in
//! process for tests and offline demos.

use anyhow::Result;
use taskdeck_shared::{
    AreasListResult, MembersListResult, ProjectAreaDto, ProjectAreaPatch, TaskCreate, TaskDto,
    TaskPatch, TaskStatus, TasksListArgs, TasksListResult,
};

#[allow(async_fn_in_trait)]
pub trait TaskApi {
    /// Server-side filtered, sorted and paged task list.
    async fn list_tasks(&self, args: &TasksListArgs) -> Result<TasksListResult>;

    async fn get_task(&self, id: &str, project_id: &str) -> Result<TaskDto>;

    async fn get_project_members(&self, project_id: &str) -> Result<MembersListResult>;

    async fn list_project_areas(&self, project_id: &str) -> Result<AreasListResult>;

    async fn create_task(&self, payload: &TaskCreate) -> Result<TaskDto>;

    async fn update_task(&self, id: &str, project_id: &str, patch: &TaskPatch) -> Result<TaskDto>;

    async fn update_task_status(
        &self,
        id: &str,
        project_id: &str,
        status: TaskStatus,
    ) -> Result<TaskDto>;

    /// `None` unassigns.
    async fn assign_task(
        &self,
        id: &str,
        project_id: &str,
        assignee_id: Option<&str>,
    ) -> Result<TaskDto>;

    async fn delete_task(
        &self,
        id: &str,
        project_id: &str,
        project_area_id: Option<&str>,
    ) -> Result<()>;

    async fn update_project_area(
        &self,
        project_id: &str,
        area_id: &str,
        patch: &ProjectAreaPatch,
    ) -> Result<ProjectAreaDto>;

    async fn delete_project_area(&self, project_id: &str, area_id: &str) -> Result<()>;

    async fn recalculate_area_progress(
        &self,
        project_id: &str,
        area_id: &str,
    ) -> Result<ProjectAreaDto>;
}
