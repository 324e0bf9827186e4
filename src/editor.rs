use crate::api::TaskApi;
use crate::app::Route;
use crate::form::{Field, Form};
use crate::models::{Priority, Task, TaskPayload};
use crate::request::RequestState;
use crate::validate::{self, FieldErrors};
use tracing::{error, info};

const PRIORITIES: &[&str] = &["low", "medium", "high"];
const STATUSES: &[&str] = &["pending", "completed"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorMode {
    Add,
    Edit(u64),
}

/// Add and edit screens share one form; edit also loads and deletes.
pub struct TaskEditor {
    pub mode: EditorMode,
    pub form: Form,
    pub load: RequestState<()>,
    pub save: RequestState<()>,
    pub confirm_delete: bool,
}

impl TaskEditor {
    fn with_mode(mode: EditorMode) -> TaskEditor {
        let mut form = Form::new(vec![
            Field::text("name", "Name"),
            Field::text("description", "Description"),
            Field::choice("priority", "Priority", PRIORITIES),
            Field::text("last_date", "Last date (YYYY-MM-DD)"),
            Field::choice("completed", "Status", STATUSES),
        ]);
        form.set("priority", Priority::Medium.as_str());
        TaskEditor {
            mode,
            form,
            load: RequestState::Idle,
            save: RequestState::Idle,
            confirm_delete: false,
        }
    }

    pub fn add() -> TaskEditor {
        TaskEditor::with_mode(EditorMode::Add)
    }

    /// Starts in the loading state; call [`TaskEditor::load`] next.
    pub fn edit(task_id: u64) -> TaskEditor {
        let mut editor = TaskEditor::with_mode(EditorMode::Edit(task_id));
        editor.load.start();
        editor
    }

    pub fn is_loading(&self) -> bool {
        self.load.is_loading()
    }

    pub async fn load<A: TaskApi>(&mut self, api: &A, owner: &str) {
        let EditorMode::Edit(task_id) = self.mode else {
            return;
        };
        self.load.start();
        match api.fetch_task(owner, task_id).await {
            Ok(task) => {
                self.fill(&task);
                self.load.succeed(());
            }
            Err(err) => {
                error!(task_id, error = %err, "could not load task");
                self.load.fail("Failed to load task");
            }
        }
    }

    fn fill(&mut self, task: &Task) {
        self.form.set("name", task.name.as_str());
        self.form
            .set("description", task.description.clone().unwrap_or_default());
        self.form.set(
            "priority",
            task.priority.map(Priority::as_str).unwrap_or_default(),
        );
        self.form
            .set("last_date", task.last_date.clone().unwrap_or_default());
        self.form.set(
            "completed",
            if task.completed { STATUSES[1] } else { STATUSES[0] },
        );
    }

    /// Checks every field at once and builds the full replacement payload.
    pub fn validate(&self) -> Result<TaskPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.form.value("name");
        let description = self.form.value("description");
        let priority = self.form.value("priority");
        let last_date = self.form.value("last_date");

        validate::check(&mut errors, "name", validate::task_name(name));
        validate::check(&mut errors, "description", validate::description(description));
        validate::check(&mut errors, "priority", validate::priority(priority));
        validate::check(&mut errors, "last_date", validate::last_date(last_date));

        match Priority::parse(priority) {
            Some(priority) if errors.is_empty() => Ok(TaskPayload {
                name: name.trim().to_string(),
                description: Some(description.to_string()).filter(|d| !d.is_empty()),
                completed: self.form.value("completed") == STATUSES[1],
                priority,
                last_date: Some(last_date.trim().to_string()).filter(|d| !d.is_empty()),
            }),
            _ => Err(errors),
        }
    }

    pub async fn submit<A: TaskApi>(&mut self, api: &A, owner: &str) -> Option<Route> {
        let payload = match self.validate() {
            Ok(payload) => {
                self.form.errors.clear();
                payload
            }
            Err(errors) => {
                self.form.errors = errors;
                return None;
            }
        };
        self.save.start();

        let result = match self.mode {
            EditorMode::Add => api.create_task(owner, &payload).await,
            EditorMode::Edit(task_id) => api.update_task(owner, task_id, &payload).await,
        };
        match result {
            Ok(()) => {
                info!(mode = ?self.mode, name = %payload.name, "task saved");
                self.save.succeed(());
                Some(Route::Tasks)
            }
            Err(err) => {
                error!(mode = ?self.mode, error = %err, "could not save task");
                self.save.fail(match self.mode {
                    EditorMode::Add => "Failed to create task. Please try again.",
                    EditorMode::Edit(_) => "Failed to update task. Please try again.",
                });
                None
            }
        }
    }

    /// Opens the danger-zone confirmation; nothing is sent yet.
    pub fn request_delete(&mut self) -> bool {
        if matches!(self.mode, EditorMode::Edit(_)) && self.load.value().is_some() {
            self.confirm_delete = true;
        }
        self.confirm_delete
    }

    pub fn cancel_delete(&mut self) {
        self.confirm_delete = false;
    }

    pub async fn confirm_delete<A: TaskApi>(&mut self, api: &A, owner: &str) -> Option<Route> {
        let EditorMode::Edit(task_id) = self.mode else {
            return None;
        };
        if !std::mem::take(&mut self.confirm_delete) {
            return None;
        }
        match api.delete_task(owner, task_id).await {
            Ok(()) => {
                info!(task_id, "task deleted");
                Some(Route::Tasks)
            }
            Err(err) => {
                error!(task_id, error = %err, "delete failed");
                self.save.fail("Failed to delete task. Please try again.");
                None
            }
        }
    }
}
