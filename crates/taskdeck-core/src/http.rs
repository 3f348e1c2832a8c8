use anyhow::{Context, anyhow, bail};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use taskdeck_shared::{
    AreasListResult, MembersListResult, ProjectAreaDto, ProjectAreaPatch, TaskAssign, TaskCreate,
    TaskDto, TaskPatch, TaskStatus, TaskStatusUpdate, TasksListArgs, TasksListResult,
};
use tracing::{debug, instrument};

use crate::api::TaskApi;
use crate::config::Config;

const ERROR_BODY_LIMIT: usize = 200;

/// REST client for the task service. Routes hang off
/// `{base}/projects/{projectId}`.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpTaskApi {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("invalid api.url: {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("api.url must be an http(s) base url, got {base_url}");
        }
        debug!(base = %base, has_token = token.is_some(), "initialized http task api");
        Ok(Self {
            client: Client::new(),
            base,
            token,
        })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Self::new(&cfg.api_url()?, cfg.api_token())
    }

    fn url(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("api.url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn project_url(&self, project_id: &str, rest: &[&str]) -> anyhow::Result<Url> {
        let mut segments = vec!["projects", project_id];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> anyhow::Result<reqwest::Response> {
        let request = builder.build().context("failed to build request")?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending api request");

        let response = self
            .client
            .execute(request)
            .await
            .with_context(|| format!("{method} {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => error_excerpt(&body),
                Err(err) => {
                    debug!(error = %err, %url, "failed to read error body");
                    "<unreadable body>".to_string()
                }
            };
            bail!("{method} {url} returned {status}: {body}");
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> anyhow::Result<T> {
        let response = self.send(builder).await?;
        let url = response.url().clone();
        response
            .json::<T>()
            .await
            .with_context(|| format!("invalid response body from {url}"))
    }
}

fn error_excerpt(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "<empty body>".to_string();
    }
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

fn list_url(mut url: Url, args: &TasksListArgs) -> Url {
    {
        let mut query = url.query_pairs_mut();
        if let Some(area) = args.project_area_id.as_deref() {
            query.append_pair("projectAreaId", area);
        }
        if let Some(status) = args.status {
            query.append_pair("status", status.as_str());
        }
        if let Some(search) = args.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            query.append_pair("search", search);
        }
        query
            .append_pair("sortBy", args.sort_by.as_str())
            .append_pair("sortOrder", args.sort_order.as_str())
            .append_pair("page", &args.page.to_string())
            .append_pair("limit", &args.limit.to_string());
    }
    url
}

impl TaskApi for HttpTaskApi {
    #[instrument(skip(self), fields(project_id = %args.project_id))]
    async fn list_tasks(&self, args: &TasksListArgs) -> anyhow::Result<TasksListResult> {
        let url = list_url(self.project_url(&args.project_id, &["tasks"])?, args);
        self.send_json(self.request(Method::GET, url)).await
    }

    #[instrument(skip(self))]
    async fn get_task(&self, id: &str, project_id: &str) -> anyhow::Result<TaskDto> {
        let url = self.project_url(project_id, &["tasks", id])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    #[instrument(skip(self))]
    async fn get_project_members(&self, project_id: &str) -> anyhow::Result<MembersListResult> {
        let url = self.project_url(project_id, &["members"])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    #[instrument(skip(self))]
    async fn list_project_areas(&self, project_id: &str) -> anyhow::Result<AreasListResult> {
        let url = self.project_url(project_id, &["areas"])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    #[instrument(skip(self, payload), fields(project_id = %payload.project_id))]
    async fn create_task(&self, payload: &TaskCreate) -> anyhow::Result<TaskDto> {
        let url = self.project_url(&payload.project_id, &["tasks"])?;
        self.send_json(self.request(Method::POST, url).json(payload))
            .await
    }

    #[instrument(skip(self, patch))]
    async fn update_task(
        &self,
        id: &str,
        project_id: &str,
        patch: &TaskPatch,
    ) -> anyhow::Result<TaskDto> {
        let url = self.project_url(project_id, &["tasks", id])?;
        self.send_json(self.request(Method::PATCH, url).json(patch))
            .await
    }

    #[instrument(skip(self))]
    async fn update_task_status(
        &self,
        id: &str,
        project_id: &str,
        status: TaskStatus,
    ) -> anyhow::Result<TaskDto> {
        let url = self.project_url(project_id, &["tasks", id, "status"])?;
        let body = TaskStatusUpdate { status };
        self.send_json(self.request(Method::PATCH, url).json(&body))
            .await
    }

    #[instrument(skip(self))]
    async fn assign_task(
        &self,
        id: &str,
        project_id: &str,
        assignee_id: Option<&str>,
    ) -> anyhow::Result<TaskDto> {
        let url = self.project_url(project_id, &["tasks", id, "assign"])?;
        let body = TaskAssign {
            assignee_id: assignee_id.map(str::to_string),
        };
        self.send_json(self.request(Method::PATCH, url).json(&body))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_task(
        &self,
        id: &str,
        project_id: &str,
        project_area_id: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut url = self.project_url(project_id, &["tasks", id])?;
        if let Some(area) = project_area_id {
            url.query_pairs_mut().append_pair("projectAreaId", area);
        }
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    #[instrument(skip(self, patch))]
    async fn update_project_area(
        &self,
        project_id: &str,
        area_id: &str,
        patch: &ProjectAreaPatch,
    ) -> anyhow::Result<ProjectAreaDto> {
        let url = self.project_url(project_id, &["areas", area_id])?;
        self.send_json(self.request(Method::PATCH, url).json(patch))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_project_area(&self, project_id: &str, area_id: &str) -> anyhow::Result<()> {
        let url = self.project_url(project_id, &["areas", area_id])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recalculate_area_progress(
        &self,
        project_id: &str,
        area_id: &str,
    ) -> anyhow::Result<ProjectAreaDto> {
        let url = self.project_url(project_id, &["areas", area_id, "recalculate-progress"])?;
        self.send_json(self.request(Method::POST, url)).await
    }
}

#[cfg(test)]
mod tests {
    use taskdeck_shared::SortKey;

    use super::*;

    #[test]
    fn error_excerpt_marks_empty_bodies_and_truncates() {
        assert_eq!(error_excerpt("  \n"), "<empty body>");
        assert_eq!(error_excerpt(" not found "), "not found");
        let long = "é".repeat(ERROR_BODY_LIMIT + 10);
        assert_eq!(error_excerpt(&long).chars().count(), ERROR_BODY_LIMIT);
    }

    #[test]
    fn builds_escaped_project_routes() {
        let api = HttpTaskApi::new("https://api.example.test/v1/", None).unwrap();
        let url = api.project_url("p 1", &["tasks", "t/2"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.test/v1/projects/p%201/tasks/t%2F2"
        );
    }

    #[test]
    fn list_query_carries_only_present_filters() {
        let api = HttpTaskApi::new("https://api.example.test", None).unwrap();
        let mut args = TasksListArgs::for_project("p1");
        args.status = Some(TaskStatus::InProgress);
        args.search = Some("  ".to_string());
        args.sort_by = SortKey::Priority;

        let url = list_url(api.project_url("p1", &["tasks"]).unwrap(), &args);
        assert_eq!(
            url.query(),
            Some("status=in-progress&sortBy=priority&sortOrder=asc&page=1&limit=50")
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(HttpTaskApi::new("mailto:ops@example.test", None).is_err());
        assert!(HttpTaskApi::new("not a url", None).is_err());
    }
}
