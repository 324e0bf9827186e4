//! In-memory `TaskApi` used by the controller tests.

use crate::api::TaskApi;
use crate::error::ApiError;
use crate::models::{
    Credentials, LoginResponse, NewUser, PasswordReset, Priority, Role, Task, TaskPage,
    TaskPayload, User,
};
use crate::tasks::PageQuery;
use std::collections::HashMap;
use std::sync::Mutex;

pub fn task(id: u64, name: &str, priority: Priority, completed: bool) -> Task {
    Task {
        id,
        name: name.to_string(),
        description: None,
        completed,
        priority: Some(priority),
        last_date: None,
        created_at: None,
        user: None,
    }
}

pub fn user(email: &str, name: &str, role: Role) -> User {
    User {
        email: email.to_string(),
        name: name.to_string(),
        role,
    }
}

#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, (u16, String)>>,
    tasks: Mutex<Vec<Task>>,
    users: Mutex<Vec<User>>,
    paginated: Mutex<Option<TaskPage>>,
    login_reply: Mutex<Option<LoginResponse>>,
    register_reply: Mutex<Option<String>>,
    pub payloads: Mutex<Vec<TaskPayload>>,
    pub new_users: Mutex<Vec<NewUser>>,
    pub resets: Mutex<Vec<(String, String, String, String)>>,
    pub otps: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn with_tasks(tasks: Vec<Task>) -> FakeApi {
        let api = FakeApi::default();
        *api.tasks.lock().unwrap() = tasks;
        api
    }

    pub fn with_users(users: Vec<User>) -> FakeApi {
        let api = FakeApi::default();
        *api.users.lock().unwrap() = users;
        api
    }

    pub fn set_paginated(&self, page: TaskPage) {
        *self.paginated.lock().unwrap() = Some(page);
    }

    pub fn set_login_reply(&self, reply: LoginResponse) {
        *self.login_reply.lock().unwrap() = Some(reply);
    }

    pub fn set_register_reply(&self, reply: &str) {
        *self.register_reply.lock().unwrap() = Some(reply.to_string());
    }

    /// Makes `method` answer with the given status and body from now on.
    pub fn fail(&self, method: &'static str, status: u16, body: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(method, (status, body.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.users.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(method.to_string());
        match self.failures.lock().unwrap().get(method) {
            Some((status, body)) => Err(ApiError::Status {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn not_found() -> ApiError {
    ApiError::Status {
        status: 404,
        body: "Not Found".to_string(),
    }
}

fn apply(task: &mut Task, payload: &TaskPayload) {
    task.name = payload.name.clone();
    task.description = payload.description.clone();
    task.completed = payload.completed;
    task.priority = Some(payload.priority);
    task.last_date = payload.last_date.clone();
}

impl TaskApi for FakeApi {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        self.record("login")?;
        let reply = self.login_reply.lock().unwrap().clone();
        let reply = reply.unwrap_or(LoginResponse {
            success: true,
            email: Some(credentials.email.clone()),
            role: Some(Role::User),
            name: Some("Test User".to_string()),
            message: None,
        });
        if reply.success {
            Ok(reply)
        } else {
            Err(ApiError::Rejected(reply.message.unwrap_or_default()))
        }
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), ApiError> {
        self.record("create_user")?;
        self.new_users.lock().unwrap().push(user.clone());
        Ok(())
    }

    async fn send_signup_otp(&self, _email: &str) -> Result<(), ApiError> {
        self.record("send_signup_otp")
    }

    async fn register(&self, user: &NewUser, otp: &str) -> Result<String, ApiError> {
        self.record("register")?;
        self.new_users.lock().unwrap().push(user.clone());
        self.otps.lock().unwrap().push(otp.to_string());
        let reply = self.register_reply.lock().unwrap().clone();
        Ok(reply.unwrap_or_else(|| "User registered successfully".to_string()))
    }

    async fn request_password_reset(&self, _email: &str) -> Result<(), ApiError> {
        self.record("request_password_reset")
    }

    async fn reset_password(&self, reset: &PasswordReset) -> Result<(), ApiError> {
        self.record("reset_password")?;
        self.resets.lock().unwrap().push((
            reset.email.clone(),
            reset.otp.clone(),
            reset.new_password.clone(),
            reset.confirm_password.clone(),
        ));
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.record("list_users")?;
        Ok(self.users())
    }

    async fn update_role(&self, email: &str, role: Role) -> Result<(), ApiError> {
        self.record("update_role")?;
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|user| user.email == email)
            .ok_or_else(not_found)?;
        user.role = role;
        Ok(())
    }

    async fn list_tasks(&self, _owner: &str) -> Result<Vec<Task>, ApiError> {
        self.record("list_tasks")?;
        Ok(self.tasks())
    }

    async fn list_tasks_paginated(
        &self,
        _owner: &str,
        _query: &PageQuery,
    ) -> Result<TaskPage, ApiError> {
        self.record("list_tasks_paginated")?;
        self.paginated.lock().unwrap().clone().ok_or_else(not_found)
    }

    async fn create_task(&self, _owner: &str, payload: &TaskPayload) -> Result<(), ApiError> {
        self.record("create_task")?;
        self.payloads.lock().unwrap().push(payload.clone());
        let mut tasks = self.tasks.lock().unwrap();
        let id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let mut created = task(id, &payload.name, payload.priority, payload.completed);
        apply(&mut created, payload);
        tasks.push(created);
        Ok(())
    }

    async fn fetch_task(&self, _owner: &str, task_id: u64) -> Result<Task, ApiError> {
        self.record("fetch_task")?;
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn update_task(
        &self,
        _owner: &str,
        task_id: u64,
        payload: &TaskPayload,
    ) -> Result<(), ApiError> {
        self.record("update_task")?;
        self.payloads.lock().unwrap().push(payload.clone());
        let mut tasks = self.tasks.lock().unwrap();
        let existing = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(not_found)?;
        apply(existing, payload);
        Ok(())
    }

    async fn delete_task(&self, _owner: &str, task_id: u64) -> Result<(), ApiError> {
        self.record("delete_task")?;
        self.tasks.lock().unwrap().retain(|t| t.id != task_id);
        Ok(())
    }
}
