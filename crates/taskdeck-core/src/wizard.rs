//! Four-step task creation flow.

use taskdeck_shared::TaskDto;
use tracing::{debug, info, instrument, warn};

use crate::actions::{Mutated, TaskActions};
use crate::api::TaskApi;
use crate::form::{Assignment, BasicInfo, FormErrors, Learning, Settings, TaskForm};
use crate::notice::Notice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardStep {
    BasicInfo,
    Assignment,
    Learning,
    Resources,
}

impl WizardStep {
    pub const FIRST: WizardStep = WizardStep::BasicInfo;
    pub const ALL: [WizardStep; 4] = [
        WizardStep::BasicInfo,
        WizardStep::Assignment,
        WizardStep::Learning,
        WizardStep::Resources,
    ];

    /// 1-based position for step indicators.
    pub fn number(self) -> u8 {
        match self {
            WizardStep::BasicInfo => 1,
            WizardStep::Assignment => 2,
            WizardStep::Learning => 3,
            WizardStep::Resources => 4,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::BasicInfo => "Basic Information",
            WizardStep::Assignment => "Assignment & Scheduling",
            WizardStep::Learning => "Learning Objectives",
            WizardStep::Resources => "Resources & Settings",
        }
    }

    pub fn next(self) -> Option<WizardStep> {
        match self {
            WizardStep::BasicInfo => Some(WizardStep::Assignment),
            WizardStep::Assignment => Some(WizardStep::Learning),
            WizardStep::Learning => Some(WizardStep::Resources),
            WizardStep::Resources => None,
        }
    }

    pub fn previous(self) -> Option<WizardStep> {
        match self {
            WizardStep::BasicInfo => None,
            WizardStep::Assignment => Some(WizardStep::BasicInfo),
            WizardStep::Learning => Some(WizardStep::Assignment),
            WizardStep::Resources => Some(WizardStep::Learning),
        }
    }

    pub fn is_last(self) -> bool {
        self.next().is_none()
    }

    /// Required-field check owned by this step. Only the first step has
    /// required fields.
    fn validate(self, form: &TaskForm) -> FormErrors {
        match self {
            WizardStep::BasicInfo => form.validate_required(),
            WizardStep::Assignment | WizardStep::Learning | WizardStep::Resources => {
                FormErrors::default()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(Mutated<TaskDto>),
    /// Blocked locally; nothing was sent.
    Invalid(Notice),
    /// Sent and rejected; the wizard keeps its data.
    Failed(Notice),
}

#[derive(Debug, Clone)]
pub struct CreateWizard {
    project_id: String,
    step: WizardStep,
    form: TaskForm,
    errors: FormErrors,
    submitting: bool,
}

impl CreateWizard {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            step: WizardStep::FIRST,
            form: TaskForm::default(),
            errors: FormErrors::default(),
            submitting: false,
        }
    }

    /// Starts the buffer in a given area, as the area panels do.
    pub fn in_area(project_id: impl Into<String>, area_id: impl Into<String>) -> Self {
        let mut wizard = Self::new(project_id);
        wizard.form.basic.project_area_id = Some(area_id.into());
        wizard
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &TaskForm {
        &self.form
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn basic_mut(&mut self) -> &mut BasicInfo {
        &mut self.form.basic
    }

    pub fn assignment_mut(&mut self) -> &mut Assignment {
        &mut self.form.assignment
    }

    pub fn learning_mut(&mut self) -> &mut Learning {
        &mut self.form.learning
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.form.settings
    }

    /// Whole-buffer access for the list helpers on [`TaskForm`].
    pub fn form_mut(&mut self) -> &mut TaskForm {
        &mut self.form
    }

    /// Advances when the current step validates; otherwise records its
    /// errors and stays put. Returns the step the wizard ends up on.
    pub fn next(&mut self) -> WizardStep {
        let errors = self.step.validate(&self.form);
        if !errors.is_empty() {
            debug!(step = self.step.number(), errors = errors.len(), "step validation failed");
            self.errors = errors;
            return self.step;
        }

        self.errors.clear();
        if let Some(next) = self.step.next() {
            debug!(from = self.step.number(), to = next.title(), "wizard advanced");
            self.step = next;
        }
        self.step
    }

    pub fn previous(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Drops everything entered so far.
    pub fn cancel(&mut self) {
        debug!(step = self.step.number(), "wizard cancelled");
        self.reset();
    }

    fn reset(&mut self) {
        self.step = WizardStep::FIRST;
        self.form = TaskForm::default();
        self.errors.clear();
        self.submitting = false;
    }

    #[instrument(skip(self, actions), fields(project_id = %self.project_id, step = self.step.number()))]
    pub async fn submit<A: TaskApi>(&mut self, actions: &TaskActions<'_, A>) -> SubmitOutcome {
        if !self.step.is_last() {
            warn!("submit attempted before the final step");
            return SubmitOutcome::Invalid(Notice::error(
                "Not ready",
                "Finish every step before creating the task.",
            ));
        }

        let payload = match self.form.to_create(&self.project_id) {
            Ok(payload) => payload,
            Err(errors) => {
                self.errors = errors;
                return SubmitOutcome::Invalid(Notice::error(
                    "Missing information",
                    "Please fill in the required fields.",
                ));
            }
        };

        self.submitting = true;
        let result = actions.create_task(&payload).await;
        self.submitting = false;

        match result {
            Ok(created) => {
                info!(task_id = %created.value.id, "task created from wizard");
                self.reset();
                SubmitOutcome::Created(created)
            }
            Err(err) => SubmitOutcome::Failed(err.notice),
        }
    }
}

#[cfg(test)]
mod tests {
    use taskdeck_shared::TaskStatus;

    use super::*;
    use crate::form::{DUE_DATE_REQUIRED, FormField, TITLE_REQUIRED};
    use crate::memory::{ApiOp, MemoryTaskApi};

    fn wizard_at_last_step() -> CreateWizard {
        let mut wizard = CreateWizard::new("p1");
        wizard.basic_mut().title = "Landing page".to_string();
        wizard.basic_mut().due_date = "2026-11-03".to_string();
        while !wizard.step().is_last() {
            wizard.next();
        }
        wizard
    }

    #[test]
    fn transition_table_has_no_gaps() {
        for pair in WizardStep::ALL.windows(2) {
            assert_eq!(pair[0].next(), Some(pair[1]));
            assert_eq!(pair[1].previous(), Some(pair[0]));
        }
        assert_eq!(WizardStep::FIRST.previous(), None);
        assert_eq!(WizardStep::Resources.next(), None);
        let numbers: Vec<u8> = WizardStep::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, [1, 2, 3, 4]);
    }

    #[test]
    fn next_is_blocked_until_required_fields_exist() {
        let mut wizard = CreateWizard::new("p1");
        assert_eq!(wizard.next(), WizardStep::BasicInfo);
        assert_eq!(wizard.errors().len(), 2);
        assert_eq!(wizard.errors().get(FormField::Title), Some(TITLE_REQUIRED));
        assert_eq!(wizard.errors().get(FormField::DueDate), Some(DUE_DATE_REQUIRED));

        wizard.basic_mut().title = "Landing page".to_string();
        wizard.basic_mut().due_date = "2026-11-03".to_string();
        assert_eq!(wizard.next(), WizardStep::Assignment);
        assert!(wizard.errors().is_empty());
    }

    #[test]
    fn later_steps_advance_unconditionally_and_previous_floors() {
        let mut wizard = wizard_at_last_step();
        assert_eq!(wizard.step(), WizardStep::Resources);
        assert_eq!(wizard.next(), WizardStep::Resources);

        for _ in 0..5 {
            wizard.previous();
        }
        assert_eq!(wizard.step(), WizardStep::BasicInfo);
        assert_eq!(wizard.form().basic.title, "Landing page");
    }

    #[test]
    fn stepping_keeps_other_slices() {
        let mut wizard = wizard_at_last_step();
        wizard.form_mut().add_skill("Figma");
        wizard.previous();
        wizard.previous();
        wizard.assignment_mut().week = Some(3);
        wizard.next();
        wizard.next();
        assert_eq!(wizard.form().learning.skills, ["Figma"]);
        assert_eq!(wizard.form().assignment.week, Some(3));
    }

    #[test]
    fn cancel_discards_the_buffer() {
        let mut wizard = wizard_at_last_step();
        wizard.cancel();
        assert_eq!(wizard.step(), WizardStep::BasicInfo);
        assert_eq!(wizard.form(), &TaskForm::default());
    }

    #[test]
    fn area_wizard_prefills_area() {
        let wizard = CreateWizard::in_area("p1", "a1");
        assert_eq!(wizard.form().basic.project_area_id.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn submit_before_last_step_sends_nothing() {
        let api = MemoryTaskApi::new();
        let actions = TaskActions::new(&api, "p1");
        let mut wizard = CreateWizard::new("p1");
        let outcome = wizard.submit(&actions).await;
        assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn submit_revalidates_required_fields() {
        let api = MemoryTaskApi::new();
        let actions = TaskActions::new(&api, "p1");
        let mut wizard = wizard_at_last_step();
        wizard.basic_mut().title.clear();

        let outcome = wizard.submit(&actions).await;
        assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
        assert_eq!(wizard.errors().get(FormField::Title), Some(TITLE_REQUIRED));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn successful_submit_resets_the_wizard() {
        let api = MemoryTaskApi::new();
        let actions = TaskActions::new(&api, "p1");
        let mut wizard = wizard_at_last_step();

        let outcome = wizard.submit(&actions).await;
        let SubmitOutcome::Created(created) = outcome else {
            panic!("expected created outcome, got {outcome:?}");
        };
        assert_eq!(created.value.status, TaskStatus::Todo);
        assert_eq!(created.value.due_date, "2026-11-03T00:00:00.000Z");
        assert_eq!(wizard.step(), WizardStep::BasicInfo);
        assert_eq!(wizard.form(), &TaskForm::default());
    }

    #[tokio::test]
    async fn failed_submit_keeps_the_data() {
        let api = MemoryTaskApi::new();
        api.fail_next(ApiOp::CreateTask);
        let actions = TaskActions::new(&api, "p1");
        let mut wizard = wizard_at_last_step();

        let outcome = wizard.submit(&actions).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(ref n) if n.is_error()));
        assert_eq!(wizard.step(), WizardStep::Resources);
        assert_eq!(wizard.form().basic.title, "Landing page");
        assert!(!wizard.is_submitting());
    }
}
