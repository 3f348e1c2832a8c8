//! Wire types shared by every taskdeck
//! surface: task, project area, member and
//! the list/mutation argument shapes the
//! remote API speaks.

use std::fmt;
use std::str::FromStr;

use serde::{
  Deserialize,
  Serialize
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
  pub kind:  &'static str,
  pub value: String
}

impl fmt::Display for ParseEnumError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "unknown {}: {:?}",
      self.kind, self.value
    )
  }
}

impl std::error::Error
  for ParseEnumError
{
}

fn parse_variant<T: Copy>(
  kind: &'static str,
  raw: &str,
  all: &[T],
  as_str: fn(T) -> &'static str
) -> Result<T, ParseEnumError> {
  let needle =
    raw.trim().to_ascii_lowercase();
  all
    .iter()
    .copied()
    .find(|v| {
      as_str(*v).to_ascii_lowercase()
        == needle
    })
    .ok_or_else(|| ParseEnumError {
      kind,
      value: raw.to_string()
    })
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
  Todo,
  Upcoming,
  InProgress,
  Submitted,
  Completed,
  Blocked,
  Overdue
}

impl TaskStatus {
  pub const ALL: [TaskStatus; 7] = [
    TaskStatus::Todo,
    TaskStatus::Upcoming,
    TaskStatus::InProgress,
    TaskStatus::Submitted,
    TaskStatus::Completed,
    TaskStatus::Blocked,
    TaskStatus::Overdue
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | TaskStatus::Todo => "todo",
      | TaskStatus::Upcoming => {
        "upcoming"
      }
      | TaskStatus::InProgress => {
        "in-progress"
      }
      | TaskStatus::Submitted => {
        "submitted"
      }
      | TaskStatus::Completed => {
        "completed"
      }
      | TaskStatus::Blocked => {
        "blocked"
      }
      | TaskStatus::Overdue => {
        "overdue"
      }
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | TaskStatus::Todo => "To Do",
      | TaskStatus::Upcoming => {
        "Upcoming"
      }
      | TaskStatus::InProgress => {
        "In Progress"
      }
      | TaskStatus::Submitted => {
        "Submitted"
      }
      | TaskStatus::Completed => {
        "Completed"
      }
      | TaskStatus::Blocked => {
        "Blocked"
      }
      | TaskStatus::Overdue => {
        "Overdue"
      }
    }
  }
}

impl FromStr for TaskStatus {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_variant(
      "task status",
      s,
      &Self::ALL,
      Self::as_str
    )
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
  Low,
  Medium,
  High,
  Critical
}

impl TaskPriority {
  pub const ALL: [TaskPriority; 4] = [
    TaskPriority::Low,
    TaskPriority::Medium,
    TaskPriority::High,
    TaskPriority::Critical
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | TaskPriority::Low => "low",
      | TaskPriority::Medium => "medium",
      | TaskPriority::High => "high",
      | TaskPriority::Critical => {
        "critical"
      }
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | TaskPriority::Low => "Low",
      | TaskPriority::Medium => "Medium",
      | TaskPriority::High => "High",
      | TaskPriority::Critical => {
        "Critical"
      }
    }
  }

  /// Ascending urgency, used when sorting
  /// by priority.
  pub fn rank(self) -> u8 {
    match self {
      | TaskPriority::Low => 0,
      | TaskPriority::Medium => 1,
      | TaskPriority::High => 2,
      | TaskPriority::Critical => 3
    }
  }
}

impl FromStr for TaskPriority {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_variant(
      "task priority",
      s,
      &Self::ALL,
      Self::as_str
    )
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
  Public,
  #[default]
  Members,
  MentorsOnly,
  Private
}

impl Visibility {
  pub const ALL: [Visibility; 4] = [
    Visibility::Public,
    Visibility::Members,
    Visibility::MentorsOnly,
    Visibility::Private
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | Visibility::Public => "public",
      | Visibility::Members => {
        "members"
      }
      | Visibility::MentorsOnly => {
        "mentors-only"
      }
      | Visibility::Private => {
        "private"
      }
    }
  }
}

impl FromStr for Visibility {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_variant(
      "visibility",
      s,
      &Self::ALL,
      Self::as_str
    )
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
  #[default]
  Link,
  Document,
  Video,
  Guide,
  Template,
  Other
}

impl ResourceKind {
  pub const ALL: [ResourceKind; 6] = [
    ResourceKind::Link,
    ResourceKind::Document,
    ResourceKind::Video,
    ResourceKind::Guide,
    ResourceKind::Template,
    ResourceKind::Other
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | ResourceKind::Link => "link",
      | ResourceKind::Document => {
        "document"
      }
      | ResourceKind::Video => "video",
      | ResourceKind::Guide => "guide",
      | ResourceKind::Template => {
        "template"
      }
      | ResourceKind::Other => "other"
    }
  }
}

impl FromStr for ResourceKind {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_variant(
      "resource type",
      s,
      &Self::ALL,
      Self::as_str
    )
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "kebab-case")]
pub enum AreaStatus {
  Planned,
  InProgress,
  Completed,
  Blocked
}

impl AreaStatus {
  pub const ALL: [AreaStatus; 4] = [
    AreaStatus::Planned,
    AreaStatus::InProgress,
    AreaStatus::Completed,
    AreaStatus::Blocked
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | AreaStatus::Planned => "planned",
      | AreaStatus::InProgress => {
        "in-progress"
      }
      | AreaStatus::Completed => {
        "completed"
      }
      | AreaStatus::Blocked => "blocked"
    }
  }
}

impl FromStr for AreaStatus {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_variant(
      "area status",
      s,
      &Self::ALL,
      Self::as_str
    )
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
  #[default]
  DueDate,
  Priority,
  Title,
  CreatedAt,
  UpdatedAt
}

impl SortKey {
  pub const ALL: [SortKey; 5] = [
    SortKey::DueDate,
    SortKey::Priority,
    SortKey::Title,
    SortKey::CreatedAt,
    SortKey::UpdatedAt
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      | SortKey::DueDate => "dueDate",
      | SortKey::Priority => "priority",
      | SortKey::Title => "title",
      | SortKey::CreatedAt => {
        "createdAt"
      }
      | SortKey::UpdatedAt => {
        "updatedAt"
      }
    }
  }
}

impl FromStr for SortKey {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_variant(
      "sort key",
      s,
      &Self::ALL,
      Self::as_str
    )
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  #[default]
  Asc,
  Desc
}

impl SortOrder {
  pub const ALL: [SortOrder; 2] =
    [SortOrder::Asc, SortOrder::Desc];

  pub fn as_str(self) -> &'static str {
    match self {
      | SortOrder::Asc => "asc",
      | SortOrder::Desc => "desc"
    }
  }
}

impl FromStr for SortOrder {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_variant(
      "sort order",
      s,
      &Self::ALL,
      Self::as_str
    )
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDto {
  pub id:          String,
  pub title:       String,
  #[serde(rename = "type")]
  pub kind:        ResourceKind,
  #[serde(default)]
  pub url:         Option<String>,
  #[serde(default)]
  pub description: Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskDto {
  pub id:                  String,
  pub project_id:          String,
  #[serde(default)]
  pub project_area_id:     Option<String>,
  pub title:               String,
  #[serde(default)]
  pub description:         Option<String>,
  pub status:              TaskStatus,
  pub priority:            TaskPriority,
  #[serde(default)]
  pub assignee_id:         Option<String>,
  #[serde(default)]
  pub collaborator_ids:    Vec<String>,
  pub due_date:            String,
  #[serde(default)]
  pub start_date:          Option<String>,
  #[serde(default)]
  pub estimated_hours:     Option<f64>,
  #[serde(default)]
  pub actual_hours:        Option<f64>,
  #[serde(default)]
  pub week:                Option<u32>,
  #[serde(default)]
  pub weight:              Option<f64>,
  #[serde(default)]
  pub max_grade:           Option<f64>,
  #[serde(default)]
  pub grade:               Option<f64>,
  #[serde(default)]
  pub skills:              Vec<String>,
  #[serde(default)]
  pub learning_objectives: Vec<String>,
  #[serde(default)]
  pub visibility:          Visibility,
  #[serde(default)]
  pub resources: Vec<ResourceDto>,
  #[serde(default)]
  pub created_at:          String,
  #[serde(default)]
  pub updated_at:          String
}

/// Reads any JSON number as a whole
/// percentage in `0..=100`. Servers that
/// compute progress as a ratio send
/// fractions.
fn progress_percent<'de, D>(
  deserializer: D
) -> Result<u8, D::Error>
where
  D: serde::Deserializer<'de>
{
  let raw = f64::deserialize(deserializer)?;
  if !raw.is_finite() {
    return Ok(0);
  }
  Ok(raw.round().clamp(0.0, 100.0) as u8)
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAreaDto {
  pub id:                   String,
  pub project_id:           String,
  pub name:                 String,
  #[serde(default)]
  pub description:          Option<String>,
  pub status:               AreaStatus,
  #[serde(
    default,
    deserialize_with = "progress_percent"
  )]
  pub progress:             u8,
  #[serde(default)]
  pub task_count:           Option<u32>,
  #[serde(default)]
  pub completed_task_count: Option<u32>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
  pub id:       String,
  pub name:     String,
  #[serde(default)]
  pub role:     String,
  #[serde(default)]
  pub avatar:   Option<String>,
  #[serde(default)]
  pub initials: Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct TasksListArgs {
  pub project_id:      String,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub project_area_id: Option<String>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub status:          Option<TaskStatus>,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub search:          Option<String>,
  #[serde(default)]
  pub sort_by:         SortKey,
  #[serde(default)]
  pub sort_order:      SortOrder,
  pub page:            u32,
  pub limit:           u32
}

impl TasksListArgs {
  pub const DEFAULT_LIMIT: u32 = 50;

  pub fn for_project(
    project_id: impl Into<String>
  ) -> Self {
    Self {
      project_id:      project_id
        .into(),
      project_area_id: None,
      status:          None,
      search:          None,
      sort_by:         SortKey::default(),
      sort_order:      SortOrder::default(
      ),
      page:            1,
      limit:           Self::DEFAULT_LIMIT
    }
  }
}

#[derive(
  Debug, Clone, PartialEq, Serialize, Deserialize,
)]
pub struct TasksListResult {
  pub data:  Vec<TaskDto>,
  pub total: usize
}

#[derive(
  Debug, Clone, PartialEq, Serialize, Deserialize,
)]
pub struct MembersListResult {
  pub data: Vec<MemberDto>
}

#[derive(
  Debug, Clone, PartialEq, Serialize, Deserialize,
)]
pub struct AreasListResult {
  pub data: Vec<ProjectAreaDto>
}

/// Create payload. Empty optional lists
/// travel as absent keys, except
/// `resources` which is always present.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreate {
  pub project_id:          String,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub project_area_id:     Option<String>,
  pub title:               String,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub description:         Option<String>,
  pub status:              TaskStatus,
  pub priority:            TaskPriority,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub assignee_id:         Option<String>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub collaborator_ids:
    Option<Vec<String>>,
  pub due_date:            String,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub start_date:          Option<String>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub estimated_hours:     Option<f64>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub week:                Option<u32>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub weight:              Option<f64>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub max_grade:           Option<f64>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub skills:
    Option<Vec<String>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub learning_objectives:
    Option<Vec<String>>,
  pub visibility:          Visibility,
  pub resources: Vec<ResourceDto>
}

/// Partial update. Outer `None` leaves a
/// field untouched; `Some(None)` clears a
/// nullable field.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub title: Option<String>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub description:
    Option<Option<String>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub status: Option<TaskStatus>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub priority: Option<TaskPriority>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub project_area_id:
    Option<Option<String>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub assignee_id:
    Option<Option<String>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub collaborator_ids:
    Option<Vec<String>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub due_date: Option<String>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub start_date:
    Option<Option<String>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub estimated_hours:
    Option<Option<f64>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub actual_hours:
    Option<Option<f64>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub week: Option<Option<u32>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub weight: Option<Option<f64>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub max_grade: Option<Option<f64>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub grade: Option<Option<f64>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub skills: Option<Vec<String>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub learning_objectives:
    Option<Vec<String>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub visibility: Option<Visibility>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub resources:
    Option<Vec<ResourceDto>>
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdate {
  pub status: TaskStatus
}

#[derive(
  Debug, Clone, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssign {
  pub assignee_id: Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  Default,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAreaPatch {
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub name: Option<String>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub description:
    Option<Option<String>>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub status: Option<AreaStatus>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub progress: Option<u8>
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn area_progress_accepts_fractions() {
    let area = |progress: &str| {
      let raw = format!(
        r#"{{"id":"a1","projectId":"p1","name":"Web","status":"in-progress","progress":{progress}}}"#
      );
      serde_json::from_str::<ProjectAreaDto>(
        &raw
      )
      .unwrap()
      .progress
    };
    assert_eq!(area("66.7"), 67);
    assert_eq!(area("40"), 40);
    assert_eq!(area("140.2"), 100);
    assert_eq!(area("-3"), 0);

    let list: AreasListResult =
      serde_json::from_str(
        r#"{"data":[{"id":"a1","projectId":"p1","name":"Web","status":"planned","progress":33.333}]}"#
      )
      .unwrap();
    assert_eq!(list.data[0].progress, 33);
  }

  #[test]
  fn status_uses_wire_spelling() {
    let json = serde_json::to_string(
      &TaskStatus::InProgress
    )
    .unwrap();
    assert_eq!(json, "\"in-progress\"");
    assert_eq!(
      "In-Progress"
        .parse::<TaskStatus>()
        .unwrap(),
      TaskStatus::InProgress
    );
    assert!(
      "done".parse::<TaskStatus>().is_err()
    );
  }

  #[test]
  fn task_deserializes_with_sparse_fields()
  {
    let raw = r#"{
      "id": "t1",
      "projectId": "p1",
      "title": "Wireframes",
      "status": "todo",
      "priority": "high",
      "dueDate": "2026-11-01T00:00:00.000Z",
      "resources": [
        {"id": "r1", "title": "Figma", "type": "link", "url": "https://figma.com"}
      ]
    }"#;
    let task: TaskDto =
      serde_json::from_str(raw).unwrap();
    assert_eq!(
      task.visibility,
      Visibility::Members
    );
    assert!(task.skills.is_empty());
    assert_eq!(
      task.resources[0].kind,
      ResourceKind::Link
    );
  }

  #[test]
  fn create_payload_omits_absent_lists_but_keeps_resources()
   {
    let payload = TaskCreate {
      project_id:          "p1".into(),
      project_area_id:     None,
      title:               "Brief".into(),
      description:         None,
      status:              TaskStatus::Todo,
      priority:
        TaskPriority::Medium,
      assignee_id:         None,
      collaborator_ids:    None,
      due_date:            "2026-11-01T00:00:00.000Z".into(),
      start_date:          None,
      estimated_hours:     None,
      week:                None,
      weight:              None,
      max_grade:           None,
      skills:              None,
      learning_objectives: None,
      visibility:
        Visibility::Public,
      resources:           vec![]
    };
    let value =
      serde_json::to_value(&payload)
        .unwrap();
    assert!(value.get("skills").is_none());
    assert!(
      value.get("collaboratorIds").is_none()
    );
    assert_eq!(
      value["resources"],
      serde_json::json!([])
    );
  }

  #[test]
  fn patch_distinguishes_clear_from_untouched()
   {
    let patch = TaskPatch {
      assignee_id: Some(None),
      ..TaskPatch::default()
    };
    let value =
      serde_json::to_value(&patch).unwrap();
    assert_eq!(
      value,
      serde_json::json!({ "assigneeId": null })
    );
  }
}
