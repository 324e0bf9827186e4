use crate::api::TaskApi;
use crate::app::Route;
use crate::models::User;
use crate::request::RequestState;
use crate::session::SessionStore;
use ratatui::widgets::ListState;
use tracing::{error, info, warn};

pub struct AdminPanel {
    pub users: RequestState<Vec<User>>,
    pub state: ListState,
    pub notice: Option<String>,
    viewer: String,
}

impl AdminPanel {
    pub fn new(viewer: &str) -> AdminPanel {
        AdminPanel {
            users: RequestState::Idle,
            state: ListState::default(),
            notice: None,
            viewer: viewer.to_string(),
        }
    }

    /// Sends non-admins back to their tasks before anything loads.
    pub async fn mount<A: TaskApi>(&mut self, api: &A, session: &SessionStore) -> Option<Route> {
        if !session.is_admin() {
            info!("non-admin sent away from admin panel");
            return Some(Route::Tasks);
        }
        self.refresh(api, session).await;
        None
    }

    pub async fn refresh<A: TaskApi>(&mut self, api: &A, session: &SessionStore) {
        self.users.start();
        match api.list_users().await {
            Ok(users) => {
                self.sync_session(&users, session);
                let selected = self.state.selected().unwrap_or(0);
                self.state.select(if users.is_empty() {
                    None
                } else {
                    Some(selected.min(users.len() - 1))
                });
                self.users.succeed(users);
            }
            Err(err) => {
                error!(error = %err, "could not load users");
                self.users.fail("Failed to load users");
                self.state.select(None);
            }
        }
    }

    // Keeps the stored role and name in step with the server's row for the viewer.
    fn sync_session(&self, users: &[User], session: &SessionStore) {
        let Some(me) = users.iter().find(|user| user.email == self.viewer) else {
            return;
        };
        if session.role() != Some(me.role) {
            if let Err(err) = session.set_role(me.role) {
                warn!(error = %err, "could not update stored role");
            }
        }
        if !me.name.is_empty() && session.name().as_deref() != Some(me.name.as_str()) {
            if let Err(err) = session.set_name(&me.name) {
                warn!(error = %err, "could not update stored name");
            }
        }
    }

    pub fn users(&self) -> &[User] {
        self.users.value().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn selected_user(&self) -> Option<&User> {
        self.state.selected().and_then(|i| self.users().get(i))
    }

    /// The viewer's own row has no role editor.
    pub fn can_edit(&self, user: &User) -> bool {
        user.email != self.viewer
    }

    pub fn next(&mut self) {
        let len = self.users().len();
        if len > 0 {
            let i = self.state.selected().map_or(0, |i| (i + 1) % len);
            self.state.select(Some(i));
        }
    }

    pub fn previous(&mut self) {
        let len = self.users().len();
        if len > 0 {
            let i = self.state.selected().map_or(0, |i| (i + len - 1) % len);
            self.state.select(Some(i));
        }
    }

    /// Flips the selected user's role and reloads the whole list on success.
    pub async fn toggle_role<A: TaskApi>(&mut self, api: &A, session: &SessionStore) {
        let Some(user) = self.selected_user().cloned() else {
            return;
        };
        if !self.can_edit(&user) {
            return;
        }
        let role = user.role.toggled();
        match api.update_role(&user.email, role).await {
            Ok(()) => {
                info!(email = %user.email, role = %role, "role updated");
                self.notice = None;
                self.refresh(api, session).await;
            }
            Err(err) => {
                error!(email = %user.email, error = %err, "role update failed");
                self.notice = Some("Failed to update user role".to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::testing::{user, FakeApi};

    const ME: &str = "root@example.com";

    fn admin_session() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.toml"));
        store.set_identity(ME, Role::Admin, Some("Root")).unwrap();
        (dir, store)
    }

    fn api() -> FakeApi {
        FakeApi::with_users(vec![
            user(ME, "Root", Role::Admin),
            user("bo@example.com", "Bo", Role::User),
        ])
    }

    #[tokio::test]
    async fn test_non_admin_is_redirected_before_loading() {
        let (_dir, store) = admin_session();
        store.set_role(Role::User).unwrap();
        let api = api();
        let mut panel = AdminPanel::new(ME);

        assert_eq!(panel.mount(&api, &store).await, Some(Route::Tasks));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_role_change_refreshes_list() {
        let (_dir, store) = admin_session();
        let api = api();
        let mut panel = AdminPanel::new(ME);
        assert_eq!(panel.mount(&api, &store).await, None);

        panel.next();
        panel.toggle_role(&api, &store).await;

        assert_eq!(api.calls(), vec!["list_users", "update_role", "list_users"]);
        assert_eq!(panel.users()[1].role, Role::Admin);
        assert_eq!(panel.selected_user().map(|u| u.email.as_str()), Some("bo@example.com"));
    }

    #[tokio::test]
    async fn test_own_row_is_not_editable() {
        let (_dir, store) = admin_session();
        let api = api();
        let mut panel = AdminPanel::new(ME);
        panel.mount(&api, &store).await;

        assert!(!panel.can_edit(&panel.users()[0]));
        panel.toggle_role(&api, &store).await;
        assert_eq!(api.calls(), vec!["list_users"]);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_list() {
        let (_dir, store) = admin_session();
        let api = api();
        api.fail("update_role", 403, "Forbidden");
        let mut panel = AdminPanel::new(ME);
        panel.mount(&api, &store).await;
        panel.next();
        panel.toggle_role(&api, &store).await;

        assert_eq!(panel.notice.as_deref(), Some("Failed to update user role"));
        assert_eq!(panel.users()[1].role, Role::User);
    }

    #[tokio::test]
    async fn test_refresh_syncs_stored_name() {
        let (_dir, store) = admin_session();
        store.set_name("Old Name").unwrap();
        let api = api();
        let mut panel = AdminPanel::new(ME);
        panel.mount(&api, &store).await;
        assert_eq!(store.name().as_deref(), Some("Root"));
    }
}
