use taskdeck_shared::{TaskDto, TaskPriority, TaskStatus, Visibility};

pub(crate) fn task(id: &str, status: TaskStatus) -> TaskDto {
    TaskDto {
        id: id.to_string(),
        project_id: "p1".to_string(),
        project_area_id: None,
        title: format!("Task {id}"),
        description: None,
        status,
        priority: TaskPriority::Medium,
        assignee_id: None,
        collaborator_ids: vec![],
        due_date: "2026-11-01T00:00:00.000Z".to_string(),
        start_date: None,
        estimated_hours: None,
        actual_hours: None,
        week: None,
        weight: None,
        max_grade: None,
        grade: None,
        skills: vec![],
        learning_objectives: vec![],
        visibility: Visibility::Members,
        resources: vec![],
        created_at: "2026-10-01T00:00:00.000Z".to_string(),
        updated_at: "2026-10-01T00:00:00.000Z".to_string(),
    }
}
