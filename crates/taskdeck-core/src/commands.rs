use anyhow::{Context, anyhow, bail};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use taskdeck_shared::{TaskDto, TaskStatus, TasksListArgs};
use tracing::{debug, info, warn};

use crate::actions::{ListState, MutationError, SaveOutcome, TaskActions};
use crate::api::TaskApi;
use crate::cli::{Command, CreateArgs, EditArgs, ListArgs};
use crate::config::Config;
use crate::detail::TaskDetail;
use crate::form::{EditSession, FormField};
use crate::http::HttpTaskApi;
use crate::notice::Notice;
use crate::query::run_query;
use crate::render::Renderer;
use crate::surface::SurfaceConfig;
use crate::view::{StatusTab, TaskView, derive_view};
use crate::wizard::{CreateWizard, SubmitOutcome};

/// Everything a command needs besides the backend.
pub struct CommandContext<'a> {
    pub cfg: &'a Config,
    pub renderer: &'a Renderer,
    pub surface: SurfaceConfig,
    pub today: NaiveDate,
}

#[tracing::instrument(skip_all)]
pub fn dispatch(cfg: &Config, renderer: &Renderer, command: Command) -> anyhow::Result<()> {
    let api = HttpTaskApi::from_config(cfg)?;
    let ctx = CommandContext {
        cfg,
        renderer,
        surface: SurfaceConfig::for_surface(cfg.surface()?),
        today: Utc::now().date_naive(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(execute(&api, &ctx, command))
}

pub async fn execute<A: TaskApi>(api: &A, ctx: &CommandContext<'_>, command: Command) -> anyhow::Result<()> {
    debug!(?command, surface = ?ctx.surface.surface, "dispatching command");
    match command {
        Command::List(args) => cmd_list(api, ctx, args).await,
        Command::Show { project, task } => cmd_show(api, ctx, &project, &task).await,
        Command::Create(args) => cmd_create(api, ctx, args).await,
        Command::Edit(args) => cmd_edit(api, ctx, args).await,
        Command::Status {
            project,
            task,
            status,
        } => {
            let actions = TaskActions::new(api, project);
            report(ctx, actions.change_status(&task, status).await.map(|m| m.notice))
        }
        Command::Priority {
            project,
            task,
            priority,
        } => {
            let actions = TaskActions::new(api, project);
            report(ctx, actions.change_priority(&task, priority).await.map(|m| m.notice))
        }
        Command::Assign {
            project,
            task,
            member,
        } => {
            require(ctx.surface.can_assign, "assigning tasks")?;
            let actions = TaskActions::new(api, project);
            let result = actions.change_assignee(&task, member.as_deref()).await;
            report(ctx, result.map(|m| m.notice))
        }
        Command::Complete { project, task } => cmd_complete(api, ctx, &project, &task).await,
        Command::Delete {
            project,
            task,
            area,
        } => {
            require(ctx.surface.can_delete, "deleting tasks")?;
            let mut target = api
                .get_task(&task, &project)
                .await
                .with_context(|| format!("failed to load task {task}"))?;
            if area.is_some() {
                target.project_area_id = area;
            }
            let actions = TaskActions::new(api, project);
            report(ctx, actions.delete_task(&target).await.map(|m| m.notice))
        }
        Command::Areas { project } => {
            let areas = api
                .list_project_areas(&project)
                .await
                .with_context(|| format!("failed to list areas of project {project}"))?;
            for area in &areas.data {
                ctx.renderer.print_area(area)?;
            }
            Ok(())
        }
        Command::AreaRecalc { project, area } => {
            require(ctx.surface.can_manage_areas, "managing areas")?;
            let actions = TaskActions::new(api, project);
            match actions.recalculate_area_progress(&area).await {
                Ok(done) => {
                    ctx.renderer.print_area(&done.value)?;
                    report(ctx, Ok(done.notice))
                }
                Err(err) => report(ctx, Err(err)),
            }
        }
    }
}

fn require(allowed: bool, what: &str) -> anyhow::Result<()> {
    if !allowed {
        bail!("{what} is not available on this surface; set surface=admin");
    }
    Ok(())
}

/// Prints the notice either way; a failure also fails the command.
fn report(ctx: &CommandContext<'_>, result: Result<Notice, MutationError>) -> anyhow::Result<()> {
    match result {
        Ok(notice) => ctx.renderer.print_notice(&notice),
        Err(err) => {
            ctx.renderer.print_notice(&err.notice)?;
            Err(err.into())
        }
    }
}

/// Page size used when walking every page of a scope.
const SCOPE_PAGE_SIZE: u32 = 100;

/// One page of the requested tab, plus the status-less scope its tab
/// counts and statistics come from.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskListing {
    pub tab: StatusTab,
    pub page: u32,
    /// Matches for the tab before paging.
    pub total: usize,
    pub tasks: Vec<TaskDto>,
    pub scope: Vec<TaskDto>,
    /// Tasks the backend reported for the scope but never returned.
    pub missing: usize,
}

impl TaskListing {
    pub fn view(&self, tabs: &[TaskStatus]) -> TaskView<'_> {
        derive_view(&self.scope, tabs)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListJson<'a> {
    tab: StatusTab,
    page: u32,
    total: usize,
    tasks: &'a [TaskDto],
    view: TaskView<'a>,
}

fn list_query(ctx: &CommandContext<'_>, args: &ListArgs) -> anyhow::Result<TasksListArgs> {
    let limit = match args.limit {
        Some(limit) if limit > 0 => limit,
        Some(_) => bail!("--limit must be at least 1"),
        None => ctx.cfg.list_limit()?,
    };
    let sort_by = match args.sort {
        Some(sort) => sort,
        None => ctx.cfg.list_sort()?,
    };
    let sort_order = match args.order {
        Some(order) => order,
        None => ctx.cfg.list_order()?,
    };

    let mut query = TasksListArgs::for_project(args.project.clone());
    query.project_area_id = args.area.clone();
    query.status = args.status.status();
    query.search = args.search.clone();
    query.sort_by = sort_by;
    query.sort_order = sort_order;
    query.page = args.page.max(1);
    query.limit = limit;
    Ok(query)
}

/// Walks every page of `args` without a status filter. Returns the tasks
/// received and the total the backend reported.
async fn fetch_scope<A: TaskApi>(
    actions: &TaskActions<'_, A>,
    mut args: TasksListArgs,
) -> ListState<(Vec<TaskDto>, usize)> {
    args.status = None;
    args.page = 1;
    args.limit = SCOPE_PAGE_SIZE;

    let mut tasks = Vec::new();
    loop {
        let page = match actions.list_tasks(args.clone()).await {
            ListState::Ready(page) => page,
            ListState::Failed(notice) => return ListState::Failed(notice),
        };
        let total = page.total;
        let received = page.data.len();
        tasks.extend(page.data);
        if received == 0 || tasks.len() >= total {
            debug!(pages = args.page, fetched = tasks.len(), total, "fetched task scope");
            return ListState::Ready((tasks, total));
        }
        args.page = args.page.saturating_add(1);
    }
}

/// Loads the requested tab page and its scope. With `--local` the backend is
/// only asked for the area scope; status, search, sort and paging run here.
#[tracing::instrument(skip(api, ctx, args), fields(project = %args.project, tab = %args.status))]
pub async fn load_listing<A: TaskApi>(
    api: &A,
    ctx: &CommandContext<'_>,
    args: &ListArgs,
) -> anyhow::Result<ListState<TaskListing>> {
    if let Some(status) = args.status.status().filter(|s| !ctx.surface.tabs.contains(s)) {
        bail!(
            "status {} has no tab on the {} surface; use --status all",
            status.as_str(),
            ctx.surface.surface.as_str()
        );
    }
    let query = list_query(ctx, args)?;
    let actions = TaskActions::new(api, args.project.clone());

    let mut scope_args = query.clone();
    if args.local {
        scope_args.search = None;
    }
    let (fetched, reported) = match fetch_scope(&actions, scope_args).await {
        ListState::Ready(scope) => scope,
        ListState::Failed(notice) => return Ok(ListState::Failed(notice)),
    };
    let missing = reported.saturating_sub(fetched.len());
    if missing > 0 {
        warn!(fetched = fetched.len(), reported, "backend returned fewer tasks than it reported");
    }

    let (page, scope) = if args.local {
        let page = run_query(&fetched, &query);
        let unpaged = TasksListArgs {
            status: None,
            page: 1,
            limit: u32::MAX,
            ..query.clone()
        };
        let scope = run_query(&fetched, &unpaged).data;
        (page, scope)
    } else {
        match actions.list_tasks(query.clone()).await {
            ListState::Ready(page) => (page, fetched),
            ListState::Failed(notice) => return Ok(ListState::Failed(notice)),
        }
    };

    Ok(ListState::Ready(TaskListing {
        tab: args.status,
        page: query.page,
        total: page.total,
        tasks: page.data,
        scope,
        missing,
    }))
}

async fn cmd_list<A: TaskApi>(api: &A, ctx: &CommandContext<'_>, args: ListArgs) -> anyhow::Result<()> {
    let listing = match load_listing(api, ctx, &args).await? {
        ListState::Ready(listing) => listing,
        ListState::Failed(notice) => {
            ctx.renderer.print_notice(&notice)?;
            return Err(anyhow!("task list unavailable for project {}", args.project));
        }
    };
    let view = listing.view(&ctx.surface.tabs);

    if args.json {
        let out = ListJson {
            tab: listing.tab,
            page: listing.page,
            total: listing.total,
            tasks: &listing.tasks,
            view,
        };
        let text = serde_json::to_string_pretty(&out).context("failed to encode task list")?;
        println!("{text}");
        return Ok(());
    }

    ctx.renderer.print_tab_counts(&view.buckets.counts(), listing.tab)?;
    let rows: Vec<&TaskDto> = listing.tasks.iter().collect();
    ctx.renderer.print_task_table(&rows, ctx.today)?;
    ctx.renderer.print_stats(&view.stats)?;
    if listing.total > listing.tasks.len() {
        ctx.renderer.print_notice(&Notice::info(
            format!("Page {}", listing.page),
            format!("showing {} of {} tasks", listing.tasks.len(), listing.total),
        ))?;
    }
    if listing.missing > 0 {
        ctx.renderer.print_notice(&Notice::info(
            "Partial counts",
            format!("{} tasks were reported but not returned by the server.", listing.missing),
        ))?;
    }
    info!(total = listing.total, shown = listing.tasks.len(), "listed tasks");
    Ok(())
}

async fn cmd_show<A: TaskApi>(
    api: &A,
    ctx: &CommandContext<'_>,
    project: &str,
    task: &str,
) -> anyhow::Result<()> {
    let task = api
        .get_task(task, project)
        .await
        .with_context(|| format!("failed to load task {task}"))?;

    let members = match api.get_project_members(project).await {
        Ok(members) => members.data,
        Err(err) => {
            warn!(error = ?err, "members unavailable; showing ids");
            vec![]
        }
    };
    let areas = match api.list_project_areas(project).await {
        Ok(areas) => areas.data,
        Err(err) => {
            warn!(error = ?err, "areas unavailable");
            vec![]
        }
    };

    let detail = TaskDetail::new(task);
    ctx.renderer
        .print_task_detail(&detail, &members, &areas, ctx.today)
}

async fn cmd_complete<A: TaskApi>(
    api: &A,
    ctx: &CommandContext<'_>,
    project: &str,
    task: &str,
) -> anyhow::Result<()> {
    let task = api
        .get_task(task, project)
        .await
        .with_context(|| format!("failed to load task {task}"))?;
    let mut detail = TaskDetail::new(task);
    let actions = TaskActions::new(api, project);
    let notice = detail.complete(&actions).await;
    ctx.renderer.print_notice(&notice)?;
    if notice.is_error() {
        bail!("task {} was not completed", detail.task().id);
    }
    Ok(())
}

#[tracing::instrument(skip(api, ctx, args), fields(project = %args.project))]
async fn cmd_create<A: TaskApi>(api: &A, ctx: &CommandContext<'_>, args: CreateArgs) -> anyhow::Result<()> {
    let mut wizard = match args.area {
        Some(area) => CreateWizard::in_area(args.project.clone(), area),
        None => CreateWizard::new(args.project.clone()),
    };

    let basic = wizard.basic_mut();
    basic.title = args.title;
    basic.due_date = args.due;
    basic.description = args.description.unwrap_or_default();
    if let Some(priority) = args.priority {
        basic.priority = priority;
    }
    wizard.next();
    if !wizard.errors().is_empty() {
        ctx.renderer.print_form_errors(wizard.errors())?;
        bail!("task details are incomplete");
    }

    wizard.assignment_mut().assignee_id = args.assignee;
    wizard.assignment_mut().start_date = args.start.unwrap_or_default();
    wizard.assignment_mut().week = args.week;
    for collaborator in &args.collaborators {
        wizard.form_mut().add_collaborator(collaborator);
    }
    wizard.next();

    for skill in &args.skills {
        wizard.form_mut().add_skill(skill);
    }
    for objective in &args.objectives {
        wizard.form_mut().add_objective(objective);
    }
    wizard.next();

    if let Some(visibility) = args.visibility {
        wizard.settings_mut().visibility = visibility;
    }

    let actions = TaskActions::new(api, args.project);
    match wizard.submit(&actions).await {
        SubmitOutcome::Created(created) => {
            ctx.renderer.print_notice(&created.notice)?;
            println!("{}", created.value.id);
            Ok(())
        }
        SubmitOutcome::Invalid(notice) => {
            ctx.renderer.print_notice(&notice)?;
            ctx.renderer.print_form_errors(wizard.errors())?;
            bail!("task was not created");
        }
        SubmitOutcome::Failed(notice) => {
            ctx.renderer.print_notice(&notice)?;
            bail!("task was not created");
        }
    }
}

fn apply_edits(session: &mut EditSession, args: EditArgs) {
    if let Some(title) = args.title {
        session.edit(FormField::Title, |f| f.basic.title = title);
    }
    if let Some(due) = args.due {
        session.edit(FormField::DueDate, |f| f.basic.due_date = due);
    }
    if let Some(description) = args.description {
        session.edit(FormField::Description, |f| f.basic.description = description);
    }
    if let Some(priority) = args.priority {
        session.edit(FormField::Priority, |f| f.basic.priority = priority);
    }
    if let Some(status) = args.status {
        session.edit(FormField::Status, |f| f.basic.status = status);
    }
    if !args.skills.is_empty() {
        session.edit(FormField::Skills, |f| {
            for skill in &args.skills {
                f.add_skill(skill);
            }
        });
    }
}

#[tracing::instrument(skip(api, ctx, args), fields(project = %args.project, task = %args.task))]
async fn cmd_edit<A: TaskApi>(api: &A, ctx: &CommandContext<'_>, args: EditArgs) -> anyhow::Result<()> {
    let task: TaskDto = api
        .get_task(&args.task, &args.project)
        .await
        .with_context(|| format!("failed to load task {}", args.task))?;
    let actions = TaskActions::new(api, args.project.clone());

    let mut session = EditSession::new(&task);
    apply_edits(&mut session, args);
    if !session.is_dirty() {
        return ctx
            .renderer
            .print_notice(&Notice::info("No changes", "Nothing to save."));
    }

    match actions.save_edit(&mut session).await {
        SaveOutcome::Saved(saved) => ctx.renderer.print_notice(&saved.notice),
        SaveOutcome::Invalid(errors) => {
            ctx.renderer.print_form_errors(&errors)?;
            bail!("task was not saved");
        }
        SaveOutcome::Failed(notice) => {
            ctx.renderer.print_notice(&notice)?;
            bail!("task was not saved");
        }
    }
}
