use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use taskdeck_shared::{MemberDto, ProjectAreaDto, TaskDto, TaskPriority, TaskStatus};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{calendar_date, display_date};
use crate::detail::{DueIn, ResourceAction, TaskDetail};
use crate::form::FormErrors;
use crate::notice::{Notice, NoticeLevel};
use crate::view::{StatusTab, TaskStats};

const RED: &str = "31";
const GREEN: &str = "32";
const YELLOW: &str = "33";
const CYAN: &str = "36";
const BOLD: &str = "1";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    #[cfg(test)]
    fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&self, tasks: &[&TaskDto], today: NaiveDate) -> anyhow::Result<()> {
        self.write_task_table(io::stdout().lock(), tasks, today)
    }

    fn write_task_table<W: Write>(
        &self,
        out: W,
        tasks: &[&TaskDto],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Status".to_string(),
            "Priority".to_string(),
            "Due".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let due = display_date(&task.due_date);
            let late = task.status != TaskStatus::Completed
                && calendar_date(&task.due_date).is_some_and(|d| d < today);
            let due = if late { self.paint(&due, RED) } else { due };

            rows.push(vec![
                self.paint(&task.id, YELLOW),
                self.status_cell(task.status),
                self.priority_cell(task.priority),
                due,
                task.title.clone(),
            ]);
        }

        write_table(out, headers, rows)
    }

    pub fn print_tab_counts(
        &self,
        counts: &[(StatusTab, usize)],
        active: StatusTab,
    ) -> anyhow::Result<()> {
        self.write_tab_counts(io::stdout().lock(), counts, active)
    }

    fn write_tab_counts<W: Write>(
        &self,
        mut out: W,
        counts: &[(StatusTab, usize)],
        active: StatusTab,
    ) -> anyhow::Result<()> {
        let cells: Vec<String> = counts
            .iter()
            .map(|(tab, count)| {
                let cell = format!("{} ({count})", tab.label());
                if *tab == active {
                    self.paint(&format!("[{cell}]"), BOLD)
                } else {
                    cell
                }
            })
            .collect();
        writeln!(out, "{}", cells.join("  "))?;
        Ok(())
    }

    pub fn print_stats(&self, stats: &TaskStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "{} tasks, {} completed ({}%), {} in progress, {} overdue, {} blocked",
            stats.total,
            stats.completed,
            stats.completion_rate,
            stats.in_progress,
            stats.overdue,
            stats.blocked
        )?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn print_task_detail(
        &self,
        detail: &TaskDetail,
        members: &[MemberDto],
        areas: &[ProjectAreaDto],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        self.write_task_detail(io::stdout().lock(), detail, members, areas, today)
    }

    fn write_task_detail<W: Write>(
        &self,
        mut out: W,
        detail: &TaskDetail,
        members: &[MemberDto],
        areas: &[ProjectAreaDto],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let task = detail.task();
        let assignee = detail.assignee(members);
        let due_in = detail.due_in(today);
        let due_in = match due_in {
            DueIn::Overdue(_) => self.paint(&due_in.describe(), RED),
            _ => due_in.describe(),
        };

        writeln!(out, "{}", self.paint(&task.title, BOLD))?;
        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "status      {}", self.status_cell(task.status))?;
        writeln!(out, "priority    {}", self.priority_cell(task.priority))?;
        writeln!(out, "due         {} ({due_in})", display_date(&task.due_date))?;
        if let Some(start) = task.start_date.as_deref() {
            writeln!(out, "start       {}", display_date(start))?;
        }
        writeln!(out, "assignee    {} [{}]", assignee.name, assignee.initials)?;
        if let Some(area) = detail.area_name(areas) {
            writeln!(out, "area        {area}")?;
        }
        writeln!(out, "visibility  {}", task.visibility.as_str())?;
        if let Some(week) = task.week {
            writeln!(out, "week        {week}")?;
        }
        if let Some(hours) = task.estimated_hours {
            writeln!(out, "estimate    {hours}h")?;
        }
        if let Some(description) = task.description.as_deref() {
            writeln!(out)?;
            writeln!(out, "{description}")?;
        }
        if !task.skills.is_empty() {
            writeln!(out, "skills      {}", task.skills.join(", "))?;
        }
        for objective in &task.learning_objectives {
            writeln!(out, "  - {objective}")?;
        }
        for resource in &task.resources {
            let target = match detail.resource_action(resource) {
                ResourceAction::Open(url) => url,
                ResourceAction::Download(id) => format!("download {id}"),
            };
            writeln!(out, "resource    {} ({}) {target}", resource.title, resource.kind.as_str())?;
        }
        Ok(())
    }

    pub fn print_area(&self, area: &ProjectAreaDto) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let counts = match (area.completed_task_count, area.task_count) {
            (Some(done), Some(total)) => format!(" ({done}/{total} tasks)"),
            _ => String::new(),
        };
        writeln!(
            out,
            "{}  {}  {}%{counts}",
            self.paint(&area.id, YELLOW),
            area.name,
            area.progress
        )?;
        Ok(())
    }

    pub fn print_notice(&self, notice: &Notice) -> anyhow::Result<()> {
        let code = match notice.level {
            NoticeLevel::Success => GREEN,
            NoticeLevel::Error => RED,
            NoticeLevel::Info => CYAN,
        };
        let line = self.paint(&notice.to_string(), code);
        if notice.is_error() {
            writeln!(io::stderr().lock(), "{line}")?;
        } else {
            writeln!(io::stdout().lock(), "{line}")?;
        }
        Ok(())
    }

    pub fn print_form_errors(&self, errors: &FormErrors) -> anyhow::Result<()> {
        let mut out = io::stderr().lock();
        for (field, message) in errors.iter() {
            writeln!(out, "{}: {}", field.key(), self.paint(message, RED))?;
        }
        Ok(())
    }

    fn status_cell(&self, status: TaskStatus) -> String {
        let code = match status {
            TaskStatus::Completed => GREEN,
            TaskStatus::Blocked | TaskStatus::Overdue => RED,
            TaskStatus::InProgress | TaskStatus::Submitted => CYAN,
            TaskStatus::Todo | TaskStatus::Upcoming => return status.label().to_string(),
        };
        self.paint(status.label(), code)
    }

    fn priority_cell(&self, priority: TaskPriority) -> String {
        match priority {
            TaskPriority::Critical => self.paint(priority.label(), RED),
            TaskPriority::High => self.paint(priority.label(), YELLOW),
            TaskPriority::Medium | TaskPriority::Low => priority.label().to_string(),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|h| UnicodeWidthStr::width(h.as_str()))
        .collect();

    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::task;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn strip_ansi_removes_color_codes() {
        assert_eq!(strip_ansi("\x1b[31mlate\x1b[0m"), "late");
    }

    #[test]
    fn table_aligns_wide_cells() {
        let mut long = task("t2", TaskStatus::InProgress);
        long.title = "Écrire le résumé".to_string();
        let short = task("t1", TaskStatus::Todo);
        let renderer = Renderer::plain();

        let text = render(|buf| renderer.write_task_table(buf, &[&short, &long], today()));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID Status"));
        assert!(lines[3].contains("In Progress"));
        assert!(lines[3].contains("2026-11-01"));
    }

    #[test]
    fn active_tab_is_marked() {
        let renderer = Renderer::plain();
        let counts = vec![
            (StatusTab::All, 3),
            (StatusTab::Status(TaskStatus::Todo), 2),
        ];
        let text = render(|buf| {
            renderer.write_tab_counts(buf, &counts, StatusTab::Status(TaskStatus::Todo))
        });
        assert_eq!(text, "All (3)  [To Do (2)]\n");
    }

    #[test]
    fn detail_shows_derived_values() {
        let mut t = task("t1", TaskStatus::Todo);
        t.description = Some("Build the page".to_string());
        let detail = TaskDetail::new(t);
        let renderer = Renderer::plain();

        let text = render(|buf| renderer.write_task_detail(buf, &detail, &[], &[], today()));
        assert!(text.contains("13 days remaining"));
        assert!(text.contains("assignee    Unassigned [?]"));
        assert!(text.contains("Build the page"));
    }
}
