use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use taskdeck_shared::{SortKey, SortOrder, TaskPriority, TaskStatus, Visibility};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::view::StatusTab;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdeck",
    version,
    about = "Taskdeck: project task dashboard from the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rc-file", global = true)]
    pub rc_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List a project's tasks grouped into status tabs
    List(ListArgs),
    /// Show one task with its derived details
    Show { project: String, task: String },
    /// Create a task through the step-by-step form
    Create(CreateArgs),
    /// Edit fields of an existing task
    Edit(EditArgs),
    /// Move a task to another status
    Status {
        project: String,
        task: String,
        status: TaskStatus,
    },
    /// Change a task's priority
    Priority {
        project: String,
        task: String,
        priority: TaskPriority,
    },
    /// Assign a task; omit the member to unassign
    Assign {
        project: String,
        task: String,
        member: Option<String>,
    },
    /// Mark a task completed
    Complete { project: String, task: String },
    /// Delete a task
    Delete {
        project: String,
        task: String,
        #[arg(long)]
        area: Option<String>,
    },
    /// List a project's areas
    Areas { project: String },
    /// Recompute an area's progress from its tasks
    AreaRecalc { project: String, area: String },
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    pub project: String,

    #[arg(long)]
    pub area: Option<String>,

    /// Tab to print: `all` or a status
    #[arg(long, default_value = "all")]
    pub status: StatusTab,

    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub sort: Option<SortKey>,

    #[arg(long)]
    pub order: Option<SortOrder>,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long)]
    pub limit: Option<u32>,

    /// Fetch unfiltered and search/sort on this machine
    #[arg(long)]
    pub local: bool,

    /// Print the derived view as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct CreateArgs {
    pub project: String,

    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub due: String,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub priority: Option<TaskPriority>,

    #[arg(long)]
    pub area: Option<String>,

    #[arg(long)]
    pub assignee: Option<String>,

    #[arg(long = "collaborator")]
    pub collaborators: Vec<String>,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub week: Option<u32>,

    #[arg(long = "skill")]
    pub skills: Vec<String>,

    #[arg(long = "objective")]
    pub objectives: Vec<String>,

    #[arg(long)]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Args)]
pub struct EditArgs {
    pub project: String,
    pub task: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub due: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub priority: Option<TaskPriority>,

    #[arg(long)]
    pub status: Option<TaskStatus>,

    #[arg(long = "skill")]
    pub skills: Vec<String>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = GlobalCli::try_parse_from([
            "taskdeck",
            "list",
            "p1",
            "--status",
            "in-progress",
            "--sort",
            "priority",
            "-vv",
            "--rc",
            "color=off",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides[0].key, "color");
        let Command::List(args) = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(args.status, StatusTab::Status(TaskStatus::InProgress));
        assert_eq!(args.sort, Some(SortKey::Priority));
        assert_eq!(args.page, 1);
    }

    #[test]
    fn assign_without_member_unassigns() {
        let cli = GlobalCli::try_parse_from(["taskdeck", "assign", "p1", "t1"]).unwrap();
        assert!(matches!(cli.command, Command::Assign { member: None, .. }));
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(GlobalCli::try_parse_from(["taskdeck", "status", "p1", "t1", "done"]).is_err());
    }

    #[test]
    fn keyval_requires_equals() {
        assert!("color".parse::<KeyVal>().is_err());
        let kv = " api.url = https://x.test ".parse::<KeyVal>().unwrap();
        assert_eq!(kv.value, "https://x.test");
    }
}
