//! Task form buffer shared by the create wizard and the edit surface.
//!
//! The buffer is split into the slices the wizard steps own. Payload
//! assembly differs between the two paths on purpose: creation drops empty
//! optional lists (except `resources`), editing sends every list as-is.

use std::collections::{BTreeMap, BTreeSet};

use taskdeck_shared::{
    ResourceDto, ResourceKind, TaskCreate, TaskDto, TaskPatch, TaskPriority, TaskStatus,
    Visibility,
};
use tracing::debug;
use uuid::Uuid;

use crate::datetime::normalize_date;

pub const TITLE_REQUIRED: &str = "Title is required";
pub const DUE_DATE_REQUIRED: &str = "Due date is required";
pub const DUE_DATE_INVALID: &str = "Enter a valid due date";
pub const START_DATE_INVALID: &str = "Enter a valid start date";
pub const RESOURCE_TITLE_REQUIRED: &str = "Resource title is required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Title,
    Description,
    Status,
    Priority,
    ProjectArea,
    Assignee,
    Collaborators,
    DueDate,
    StartDate,
    EstimatedHours,
    Week,
    Skills,
    LearningObjectives,
    Visibility,
    Weight,
    MaxGrade,
    ActualHours,
    Grade,
    Resources,
}

impl FormField {
    /// Wire name of the field, also used as the inline error key.
    pub fn key(self) -> &'static str {
        match self {
            FormField::Title => "title",
            FormField::Description => "description",
            FormField::Status => "status",
            FormField::Priority => "priority",
            FormField::ProjectArea => "projectAreaId",
            FormField::Assignee => "assigneeId",
            FormField::Collaborators => "collaboratorIds",
            FormField::DueDate => "dueDate",
            FormField::StartDate => "startDate",
            FormField::EstimatedHours => "estimatedHours",
            FormField::Week => "week",
            FormField::Skills => "skills",
            FormField::LearningObjectives => "learningObjectives",
            FormField::Visibility => "visibility",
            FormField::Weight => "weight",
            FormField::MaxGrade => "maxGrade",
            FormField::ActualHours => "actualHours",
            FormField::Grade => "grade",
            FormField::Resources => "resources",
        }
    }
}

/// Inline, per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<FormField, String>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn clear_field(&mut self, field: FormField) {
        self.0.remove(&field);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicInfo {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub project_area_id: Option<String>,
    pub due_date: String,
}

impl Default for BasicInfo {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            project_area_id: None,
            due_date: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
    pub assignee_id: Option<String>,
    pub collaborator_ids: Vec<String>,
    pub start_date: String,
    pub estimated_hours: Option<f64>,
    pub week: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Learning {
    pub skills: Vec<String>,
    pub learning_objectives: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub visibility: Visibility,
    pub weight: Option<f64>,
    pub max_grade: Option<f64>,
    pub actual_hours: Option<f64>,
    pub grade: Option<f64>,
    pub resources: Vec<ResourceDto>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceDraft {
    pub title: String,
    pub kind: ResourceKind,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
    pub basic: BasicInfo,
    pub assignment: Assignment,
    pub learning: Learning,
    pub settings: Settings,
}

impl TaskForm {
    pub fn from_task(task: &TaskDto) -> Self {
        Self {
            basic: BasicInfo {
                title: task.title.clone(),
                description: task.description.clone().unwrap_or_default(),
                status: task.status,
                priority: task.priority,
                project_area_id: task.project_area_id.clone(),
                due_date: task.due_date.clone(),
            },
            assignment: Assignment {
                assignee_id: task.assignee_id.clone(),
                collaborator_ids: task.collaborator_ids.clone(),
                start_date: task.start_date.clone().unwrap_or_default(),
                estimated_hours: task.estimated_hours,
                week: task.week,
            },
            learning: Learning {
                skills: task.skills.clone(),
                learning_objectives: task.learning_objectives.clone(),
            },
            settings: Settings {
                visibility: task.visibility,
                weight: task.weight,
                max_grade: task.max_grade,
                actual_hours: task.actual_hours,
                grade: task.grade,
                resources: task.resources.clone(),
            },
        }
    }

    /// Required fields only: a non-blank title and a non-blank due date.
    pub fn validate_required(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        if self.basic.title.trim().is_empty() {
            errors.insert(FormField::Title, TITLE_REQUIRED);
        }
        if self.basic.due_date.trim().is_empty() {
            errors.insert(FormField::DueDate, DUE_DATE_REQUIRED);
        }
        errors
    }

    pub fn add_skill(&mut self, raw: &str) -> bool {
        push_unique(&mut self.learning.skills, raw)
    }

    pub fn remove_skill(&mut self, skill: &str) -> bool {
        remove_value(&mut self.learning.skills, skill)
    }

    pub fn add_objective(&mut self, raw: &str) -> bool {
        push_unique(&mut self.learning.learning_objectives, raw)
    }

    pub fn remove_objective(&mut self, index: usize) -> Option<String> {
        (index < self.learning.learning_objectives.len())
            .then(|| self.learning.learning_objectives.remove(index))
    }

    pub fn add_collaborator(&mut self, member_id: &str) -> bool {
        if self.assignment.assignee_id.as_deref() == Some(member_id.trim()) {
            return false;
        }
        push_unique(&mut self.assignment.collaborator_ids, member_id)
    }

    pub fn remove_collaborator(&mut self, member_id: &str) -> bool {
        remove_value(&mut self.assignment.collaborator_ids, member_id)
    }

    /// Appends a resource with a freshly minted id and returns that id.
    pub fn add_resource(&mut self, draft: ResourceDraft) -> Result<String, FormErrors> {
        let title = draft.title.trim();
        if title.is_empty() {
            let mut errors = FormErrors::default();
            errors.insert(FormField::Resources, RESOURCE_TITLE_REQUIRED);
            return Err(errors);
        }

        let id = Uuid::new_v4().to_string();
        self.settings.resources.push(ResourceDto {
            id: id.clone(),
            title: title.to_string(),
            kind: draft.kind,
            url: non_blank(&draft.url),
            description: non_blank(&draft.description),
        });
        debug!(resource_id = %id, kind = draft.kind.as_str(), "added resource to form");
        Ok(id)
    }

    pub fn remove_resource(&mut self, id: &str) -> bool {
        let before = self.settings.resources.len();
        self.settings.resources.retain(|r| r.id != id);
        before != self.settings.resources.len()
    }

    /// Create payload. Empty skills, objectives and collaborators are
    /// left out entirely; resources are always sent, even when empty.
    pub fn to_create(&self, project_id: &str) -> Result<TaskCreate, FormErrors> {
        let (due_date, start_date) = self.normalized_dates()?;

        Ok(TaskCreate {
            project_id: project_id.to_string(),
            project_area_id: self.basic.project_area_id.clone(),
            title: self.basic.title.trim().to_string(),
            description: non_blank(&self.basic.description),
            status: self.basic.status,
            priority: self.basic.priority,
            assignee_id: self.assignment.assignee_id.clone(),
            collaborator_ids: non_empty(&self.assignment.collaborator_ids),
            due_date,
            start_date,
            estimated_hours: self.assignment.estimated_hours,
            week: self.assignment.week,
            weight: self.settings.weight,
            max_grade: self.settings.max_grade,
            skills: non_empty(&self.learning.skills),
            learning_objectives: non_empty(&self.learning.learning_objectives),
            visibility: self.settings.visibility,
            resources: self.settings.resources.clone(),
        })
    }

    /// Edit payload. Every field is sent, lists included even when empty.
    pub fn to_patch(&self) -> Result<TaskPatch, FormErrors> {
        let (due_date, start_date) = self.normalized_dates()?;

        Ok(TaskPatch {
            title: Some(self.basic.title.trim().to_string()),
            description: Some(non_blank(&self.basic.description)),
            status: Some(self.basic.status),
            priority: Some(self.basic.priority),
            project_area_id: Some(self.basic.project_area_id.clone()),
            assignee_id: Some(self.assignment.assignee_id.clone()),
            collaborator_ids: Some(self.assignment.collaborator_ids.clone()),
            due_date: Some(due_date),
            start_date: Some(start_date),
            estimated_hours: Some(self.assignment.estimated_hours),
            actual_hours: Some(self.settings.actual_hours),
            week: Some(self.assignment.week),
            weight: Some(self.settings.weight),
            max_grade: Some(self.settings.max_grade),
            grade: Some(self.settings.grade),
            skills: Some(self.learning.skills.clone()),
            learning_objectives: Some(self.learning.learning_objectives.clone()),
            visibility: Some(self.settings.visibility),
            resources: Some(self.settings.resources.clone()),
        })
    }

    /// Compares a single field against another buffer.
    pub fn field_eq(&self, other: &TaskForm, field: FormField) -> bool {
        let (a, b) = (self, other);
        match field {
            FormField::Title => a.basic.title == b.basic.title,
            FormField::Description => a.basic.description == b.basic.description,
            FormField::Status => a.basic.status == b.basic.status,
            FormField::Priority => a.basic.priority == b.basic.priority,
            FormField::ProjectArea => a.basic.project_area_id == b.basic.project_area_id,
            FormField::Assignee => a.assignment.assignee_id == b.assignment.assignee_id,
            FormField::Collaborators => {
                a.assignment.collaborator_ids == b.assignment.collaborator_ids
            }
            FormField::DueDate => a.basic.due_date == b.basic.due_date,
            FormField::StartDate => a.assignment.start_date == b.assignment.start_date,
            FormField::EstimatedHours => {
                a.assignment.estimated_hours == b.assignment.estimated_hours
            }
            FormField::Week => a.assignment.week == b.assignment.week,
            FormField::Skills => a.learning.skills == b.learning.skills,
            FormField::LearningObjectives => {
                a.learning.learning_objectives == b.learning.learning_objectives
            }
            FormField::Visibility => a.settings.visibility == b.settings.visibility,
            FormField::Weight => a.settings.weight == b.settings.weight,
            FormField::MaxGrade => a.settings.max_grade == b.settings.max_grade,
            FormField::ActualHours => a.settings.actual_hours == b.settings.actual_hours,
            FormField::Grade => a.settings.grade == b.settings.grade,
            FormField::Resources => a.settings.resources == b.settings.resources,
        }
    }

    fn normalized_dates(&self) -> Result<(String, Option<String>), FormErrors> {
        let mut errors = self.validate_required();

        let due = if errors.get(FormField::DueDate).is_none() {
            match normalize_date(&self.basic.due_date) {
                Ok(due) => Some(due),
                Err(_) => {
                    errors.insert(FormField::DueDate, DUE_DATE_INVALID);
                    None
                }
            }
        } else {
            None
        };

        let start = if self.assignment.start_date.trim().is_empty() {
            None
        } else {
            match normalize_date(&self.assignment.start_date) {
                Ok(start) => Some(start),
                Err(_) => {
                    errors.insert(FormField::StartDate, START_DATE_INVALID);
                    None
                }
            }
        };

        errors.into_result()?;
        Ok((due.unwrap_or_default(), start))
    }
}

/// Edit buffer with per-field dirty tracking. Each edit re-compares only the
/// field it touched, so the cost of "has anything changed" stays flat.
#[derive(Debug, Clone)]
pub struct EditSession {
    task_id: String,
    original: TaskForm,
    form: TaskForm,
    dirty: BTreeSet<FormField>,
    errors: FormErrors,
}

impl EditSession {
    pub fn new(task: &TaskDto) -> Self {
        let form = TaskForm::from_task(task);
        Self {
            task_id: task.id.clone(),
            original: form.clone(),
            form,
            dirty: BTreeSet::new(),
            errors: FormErrors::default(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn form(&self) -> &TaskForm {
        &self.form
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    /// Applies `apply` to the buffer. `apply` must only touch `field`.
    pub fn edit<F>(&mut self, field: FormField, apply: F)
    where
        F: FnOnce(&mut TaskForm),
    {
        apply(&mut self.form);
        if self.form.field_eq(&self.original, field) {
            self.dirty.remove(&field);
        } else {
            self.dirty.insert(field);
        }
        self.errors.clear_field(field);
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_fields(&self) -> impl Iterator<Item = FormField> + '_ {
        self.dirty.iter().copied()
    }

    pub fn reset(&mut self) {
        self.form = self.original.clone();
        self.dirty.clear();
        self.errors.clear();
    }

    /// Validates and builds the edit payload, recording inline errors on
    /// failure.
    pub fn prepare(&mut self) -> Result<TaskPatch, FormErrors> {
        match self.form.to_patch() {
            Ok(patch) => {
                self.errors.clear();
                Ok(patch)
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }

    /// Adopts the saved server copy as the new baseline.
    pub fn commit(&mut self, saved: &TaskDto) {
        self.task_id = saved.id.clone();
        self.original = TaskForm::from_task(saved);
        self.form = self.original.clone();
        self.dirty.clear();
        self.errors.clear();
    }
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

fn push_unique(values: &mut Vec<String>, raw: &str) -> bool {
    let value = raw.trim();
    if value.is_empty() || values.iter().any(|v| v == value) {
        return false;
    }
    values.push(value.to_string());
    true
}

fn remove_value(values: &mut Vec<String>, value: &str) -> bool {
    let before = values.len();
    values.retain(|v| v != value);
    before != values.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::task;

    fn filled() -> TaskForm {
        let mut form = TaskForm::default();
        form.basic.title = "  Landing page  ".to_string();
        form.basic.due_date = "2026-11-03".to_string();
        form
    }

    #[test]
    fn required_fields_report_both_errors() {
        let errors = TaskForm::default().validate_required();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get(FormField::Title), Some(TITLE_REQUIRED));
        assert_eq!(errors.get(FormField::DueDate), Some(DUE_DATE_REQUIRED));
        assert!(filled().validate_required().is_empty());
    }

    #[test]
    fn create_payload_drops_empty_lists_but_keeps_resources() {
        let payload = filled().to_create("p1").unwrap();
        assert_eq!(payload.skills, None);
        assert_eq!(payload.learning_objectives, None);
        assert_eq!(payload.collaborator_ids, None);
        assert_eq!(payload.resources, Vec::<ResourceDto>::new());
        assert_eq!(payload.title, "Landing page");
        assert_eq!(payload.due_date, "2026-11-03T00:00:00.000Z");
        assert_eq!(payload.description, None);
    }

    #[test]
    fn create_payload_keeps_populated_lists() {
        let mut form = filled();
        form.add_skill("Figma");
        form.add_objective("Ship a prototype");
        form.add_collaborator("m2");
        let payload = form.to_create("p1").unwrap();
        assert_eq!(payload.skills, Some(vec!["Figma".to_string()]));
        assert_eq!(payload.collaborator_ids, Some(vec!["m2".to_string()]));
        assert_eq!(
            payload.learning_objectives,
            Some(vec!["Ship a prototype".to_string()])
        );
    }

    #[test]
    fn edit_payload_passes_empty_lists_through() {
        let patch = filled().to_patch().unwrap();
        assert_eq!(patch.skills, Some(vec![]));
        assert_eq!(patch.resources, Some(vec![]));
        assert_eq!(patch.collaborator_ids, Some(vec![]));
        assert_eq!(patch.description, Some(None));
    }

    #[test]
    fn invalid_dates_block_payload_assembly() {
        let mut form = filled();
        form.basic.due_date = "next sprint".to_string();
        form.assignment.start_date = "whenever".to_string();
        let errors = form.to_create("p1").unwrap_err();
        assert_eq!(errors.get(FormField::DueDate), Some(DUE_DATE_INVALID));
        assert_eq!(errors.get(FormField::StartDate), Some(START_DATE_INVALID));
    }

    #[test]
    fn list_helpers_trim_and_dedupe() {
        let mut form = TaskForm::default();
        assert!(form.add_skill(" rust "));
        assert!(!form.add_skill("rust"));
        assert!(!form.add_skill("   "));
        assert!(form.remove_skill("rust"));
        assert!(form.learning.skills.is_empty());

        form.assignment.assignee_id = Some("m1".to_string());
        assert!(!form.add_collaborator("m1"));
        assert!(form.add_collaborator("m2"));
        assert!(!form.add_collaborator(" m2 "));
        assert!(form.remove_collaborator("m2"));
        assert!(form.assignment.collaborator_ids.is_empty());

        assert!(form.add_objective("Learn"));
        assert_eq!(form.remove_objective(3), None);
        assert_eq!(form.remove_objective(0), Some("Learn".to_string()));
    }

    #[test]
    fn resources_need_a_title() {
        let mut form = TaskForm::default();
        let err = form
            .add_resource(ResourceDraft {
                title: " ".to_string(),
                ..ResourceDraft::default()
            })
            .unwrap_err();
        assert_eq!(err.get(FormField::Resources), Some(RESOURCE_TITLE_REQUIRED));

        let id = form
            .add_resource(ResourceDraft {
                title: "Style guide".to_string(),
                kind: ResourceKind::Guide,
                url: "https://example.test/guide".to_string(),
                description: String::new(),
            })
            .unwrap();
        assert_eq!(form.settings.resources[0].description, None);
        assert!(form.remove_resource(&id));
        assert!(!form.remove_resource(&id));
    }

    #[test]
    fn edit_session_tracks_dirtiness_per_field() {
        let original = task("t1", TaskStatus::Todo);
        let mut session = EditSession::new(&original);
        assert!(!session.is_dirty());

        session.edit(FormField::Title, |f| f.basic.title = "Renamed".to_string());
        session.edit(FormField::Priority, |f| f.basic.priority = TaskPriority::High);
        assert_eq!(
            session.dirty_fields().collect::<Vec<_>>(),
            [FormField::Title, FormField::Priority]
        );

        session.edit(FormField::Title, |f| f.basic.title = original.title.clone());
        assert_eq!(session.dirty_fields().collect::<Vec<_>>(), [FormField::Priority]);

        session.reset();
        assert!(!session.is_dirty());
    }

    #[test]
    fn edit_session_records_and_clears_errors() {
        let mut session = EditSession::new(&task("t1", TaskStatus::Todo));
        session.edit(FormField::Title, |f| f.basic.title.clear());
        assert!(session.prepare().is_err());
        assert_eq!(session.errors().get(FormField::Title), Some(TITLE_REQUIRED));

        session.edit(FormField::Title, |f| f.basic.title = "Back".to_string());
        assert!(session.errors().is_empty());
        assert!(session.prepare().is_ok());
    }
}
