use crate::error::ApiError;
use crate::models::{
    Credentials, LoginResponse, NewUser, PasswordReset, Role, Task, TaskPage, TaskPayload, User,
};
use crate::tasks::PageQuery;
use reqwest::{Client, Response, Url};
use serde_json::json;
use tracing::debug;

/// Query parameter naming the task owner on every `/tasks` endpoint.
pub const OWNER_PARAM: &str = "userEmail";

/// Every remote call the client makes. `ApiClient` talks HTTP; tests swap in
/// an in-memory fake.
#[allow(async_fn_in_trait)]
pub trait TaskApi {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;
    async fn create_user(&self, user: &NewUser) -> Result<(), ApiError>;
    async fn send_signup_otp(&self, email: &str) -> Result<(), ApiError>;
    async fn register(&self, user: &NewUser, otp: &str) -> Result<String, ApiError>;
    async fn request_password_reset(&self, email: &str) -> Result<(), ApiError>;
    async fn reset_password(&self, reset: &PasswordReset) -> Result<(), ApiError>;
    async fn list_users(&self) -> Result<Vec<User>, ApiError>;
    async fn update_role(&self, email: &str, role: Role) -> Result<(), ApiError>;
    async fn list_tasks(&self, owner: &str) -> Result<Vec<Task>, ApiError>;
    async fn list_tasks_paginated(
        &self,
        owner: &str,
        query: &PageQuery,
    ) -> Result<TaskPage, ApiError>;
    async fn create_task(&self, owner: &str, task: &TaskPayload) -> Result<(), ApiError>;
    async fn fetch_task(&self, owner: &str, task_id: u64) -> Result<Task, ApiError>;
    async fn update_task(
        &self,
        owner: &str,
        task_id: u64,
        task: &TaskPayload,
    ) -> Result<(), ApiError>;
    async fn delete_task(&self, owner: &str, task_id: u64) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: Url) -> ApiClient {
        ApiClient {
            client: Client::new(),
            base_url,
        }
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

// Non-2xx responses become `ApiError::Status` carrying the body text.
async fn ensure_success(res: Response) -> Result<Response, ApiError> {
    if res.status().is_success() {
        Ok(res)
    } else {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(ApiError::Status { status, body })
    }
}

impl TaskApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let url = self.url(&["users", "login"]);
        debug!(%url, email = %credentials.email, "login");

        let res = self.client.post(url).json(credentials).send().await?;
        let login = ensure_success(res).await?.json::<LoginResponse>().await?;
        if login.success {
            Ok(login)
        } else {
            Err(ApiError::Rejected(login.message.unwrap_or_default()))
        }
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), ApiError> {
        let url = self.url(&["users"]);
        debug!(%url, email = %user.email, "direct signup");

        let res = self.client.post(url).json(user).send().await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn send_signup_otp(&self, email: &str) -> Result<(), ApiError> {
        let url = self.url(&["auth", "send-otp"]);
        debug!(%url, email, "send signup otp");

        let res = self
            .client
            .post(url)
            .query(&[("email", email)])
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn register(&self, user: &NewUser, otp: &str) -> Result<String, ApiError> {
        let url = self.url(&["auth", "signup"]);
        debug!(%url, email = %user.email, "register");

        let res = self
            .client
            .post(url)
            .query(&[("otp", otp)])
            .json(user)
            .send()
            .await?;
        let text = ensure_success(res).await?.text().await?;
        Ok(text)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let url = self.url(&["auth", "forget-password"]);
        debug!(%url, email, "request password reset");

        let res = self
            .client
            .post(url)
            .json(&json!({ "email": email }))
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn reset_password(&self, reset: &PasswordReset) -> Result<(), ApiError> {
        let url = self.url(&["auth", "reset-password"]);
        debug!(%url, email = %reset.email, "reset password");

        let res = self.client.post(url).json(reset).send().await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let url = self.url(&["users"]);
        debug!(%url, "list users");

        let res = self.client.get(url).send().await?;
        let users = ensure_success(res).await?.json::<Vec<User>>().await?;
        Ok(users)
    }

    async fn update_role(&self, email: &str, role: Role) -> Result<(), ApiError> {
        let url = self.url(&["users", email, "role"]);
        debug!(%url, role = %role, "update role");

        let res = self
            .client
            .put(url)
            .json(&json!({ "role": role }))
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn list_tasks(&self, owner: &str) -> Result<Vec<Task>, ApiError> {
        let url = self.url(&["tasks"]);
        debug!(%url, owner, "list tasks");

        let res = self
            .client
            .get(url)
            .query(&[(OWNER_PARAM, owner)])
            .send()
            .await?;
        let tasks = ensure_success(res).await?.json::<Vec<Task>>().await?;
        Ok(tasks)
    }

    async fn list_tasks_paginated(
        &self,
        owner: &str,
        query: &PageQuery,
    ) -> Result<TaskPage, ApiError> {
        let url = self.url(&["tasks", "paginated"]);
        let params = query.params(owner);
        debug!(%url, ?params, "list tasks page");

        let res = self.client.get(url).query(&params).send().await?;
        let page = ensure_success(res).await?.json::<TaskPage>().await?;
        Ok(page)
    }

    async fn create_task(&self, owner: &str, task: &TaskPayload) -> Result<(), ApiError> {
        let url = self.url(&["tasks"]);
        debug!(%url, owner, name = %task.name, "create task");

        let res = self
            .client
            .post(url)
            .query(&[(OWNER_PARAM, owner)])
            .json(task)
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn fetch_task(&self, owner: &str, task_id: u64) -> Result<Task, ApiError> {
        let url = self.url(&["tasks", &task_id.to_string()]);
        debug!(%url, owner, "fetch task");

        let res = self
            .client
            .get(url)
            .query(&[(OWNER_PARAM, owner)])
            .send()
            .await?;
        let task = ensure_success(res).await?.json::<Task>().await?;
        Ok(task)
    }

    async fn update_task(
        &self,
        owner: &str,
        task_id: u64,
        task: &TaskPayload,
    ) -> Result<(), ApiError> {
        let url = self.url(&["tasks", &task_id.to_string()]);
        debug!(%url, owner, "update task");

        let res = self
            .client
            .put(url)
            .query(&[(OWNER_PARAM, owner)])
            .json(task)
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn delete_task(&self, owner: &str, task_id: u64) -> Result<(), ApiError> {
        let url = self.url(&["tasks", &task_id.to_string()]);
        debug!(%url, owner, "delete task");

        let res = self
            .client
            .delete(url)
            .query(&[(OWNER_PARAM, owner)])
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(Url::parse(base).unwrap())
    }

    #[test]
    fn test_url_joins_segments() {
        let api = client("http://localhost:8080");
        assert_eq!(
            api.url(&["tasks", "paginated"]).as_str(),
            "http://localhost:8080/tasks/paginated"
        );
    }

    #[test]
    fn test_url_keeps_base_path() {
        let api = client("https://example.com/api/");
        assert_eq!(
            api.url(&["users", "login"]).as_str(),
            "https://example.com/api/users/login"
        );
    }

    #[test]
    fn test_url_encodes_email_segment() {
        let api = client("http://localhost:8080");
        assert_eq!(
            api.url(&["users", "a b@example.com", "role"]).as_str(),
            "http://localhost:8080/users/a%20b@example.com/role"
        );
    }
}
