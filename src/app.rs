use crate::admin::AdminPanel;
use crate::api::TaskApi;
use crate::auth::{LoginScreen, ResetScreen, SignupScreen};
use crate::editor::TaskEditor;
use crate::form::Form;
use crate::session::SessionStore;
use crate::tasks::{can_modify, TaskList};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Login,
    Signup,
    ForgotPassword,
    Tasks,
    AddTask,
    EditTask(u64),
    Admin,
}

impl Route {
    fn requires_auth(self) -> bool {
        !matches!(self, Route::Login | Route::Signup | Route::ForgotPassword)
    }
}

pub enum Screen {
    Login(LoginScreen),
    Signup(SignupScreen),
    ForgotPassword(ResetScreen),
    Tasks(TaskList),
    Editor(TaskEditor),
    Admin(AdminPanel),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Insert,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub page_size: usize,
    pub search_debounce: Duration,
    pub otp_signup: bool,
}

pub struct App<A> {
    pub api: A,
    pub session: SessionStore,
    pub settings: Settings,
    pub route: Route,
    pub screen: Screen,
    pub input_mode: InputMode,
}

impl<A: TaskApi> App<A> {
    pub fn new(api: A, session: SessionStore, settings: Settings) -> App<A> {
        App {
            api,
            session,
            settings,
            route: Route::Login,
            screen: Screen::Login(LoginScreen::new()),
            input_mode: InputMode::Normal,
        }
    }

    /// Opens the first screen: the task list when signed in, login otherwise.
    pub async fn start(&mut self) {
        self.navigate(Route::Tasks).await;
    }

    /// The signed-in email, read fresh from the session.
    pub fn viewer(&self) -> String {
        self.session.email().unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.session.is_admin()
    }

    /// Mounts `route`, applying the auth and admin guards first.
    pub async fn navigate(&mut self, route: Route) {
        let mut route = route;
        loop {
            let signed_in = self.session.is_authenticated();
            route = match route {
                r if r.requires_auth() && !signed_in => Route::Login,
                Route::Login | Route::Signup if signed_in => Route::Tasks,
                r => r,
            };
            info!(?route, "navigate");
            self.route = route;
            self.input_mode = InputMode::Normal;

            let owner = self.viewer();
            self.screen = match route {
                Route::Login => Screen::Login(LoginScreen::new()),
                Route::Signup => Screen::Signup(SignupScreen::new(self.settings.otp_signup)),
                Route::ForgotPassword => Screen::ForgotPassword(ResetScreen::new()),
                Route::Tasks => {
                    let mut list =
                        TaskList::new(self.settings.page_size, self.settings.search_debounce);
                    list.refresh(&self.api, &owner).await;
                    Screen::Tasks(list)
                }
                Route::AddTask => Screen::Editor(TaskEditor::add()),
                Route::EditTask(task_id) => {
                    let mut editor = TaskEditor::edit(task_id);
                    editor.load(&self.api, &owner).await;
                    Screen::Editor(editor)
                }
                Route::Admin => {
                    let mut panel = AdminPanel::new(&owner);
                    if let Some(redirect) = panel.mount(&self.api, &self.session).await {
                        route = redirect;
                        continue;
                    }
                    Screen::Admin(panel)
                }
            };
            return;
        }
    }

    pub async fn logout(&mut self) {
        if let Err(err) = self.session.clear() {
            error!(error = %err, "could not clear session");
        }
        self.navigate(Route::Login).await;
    }

    /// Lets the debounced search settle; refreshes the list when it does.
    pub async fn tick(&mut self, now: Instant) {
        let owner = self.viewer();
        if let Screen::Tasks(list) = &mut self.screen {
            if list.tick(now) {
                list.refresh(&self.api, &owner).await;
            }
        }
    }

    /// Handles one key press. Returns true when the app should quit.
    pub async fn handle_input(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if self.input_mode == InputMode::Insert {
            self.handle_insert(key);
            return false;
        }
        match self.route {
            Route::Tasks => self.handle_tasks(key.code).await,
            Route::Admin => self.handle_admin(key.code).await,
            _ => self.handle_form(key.code).await,
        }
    }

    fn form_mut(&mut self) -> Option<&mut Form> {
        match &mut self.screen {
            Screen::Login(screen) => Some(&mut screen.form),
            Screen::Signup(screen) => Some(&mut screen.form),
            Screen::ForgotPassword(screen) => Some(&mut screen.form),
            Screen::Editor(editor) if !editor.is_loading() => Some(&mut editor.form),
            _ => None,
        }
    }

    fn handle_insert(&mut self, key: KeyEvent) {
        let now = Instant::now();
        if let Screen::Tasks(list) = &mut self.screen {
            let mut input = list.search_input.clone();
            match key.code {
                KeyCode::Char(c) => input.push(c),
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Esc | KeyCode::Enter => {
                    self.input_mode = InputMode::Normal;
                    return;
                }
                _ => return,
            }
            list.edit_search(input, now);
            return;
        }

        let Some(form) = self.form_mut() else {
            self.input_mode = InputMode::Normal;
            return;
        };
        match key.code {
            KeyCode::Char(c) => form.push_char(c),
            KeyCode::Backspace => form.pop_char(),
            KeyCode::Tab => form.focus_next(),
            KeyCode::BackTab => form.focus_previous(),
            KeyCode::Left => form.cycle_choice(false),
            KeyCode::Right => form.cycle_choice(true),
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            _ => {}
        }
    }

    async fn handle_tasks(&mut self, code: KeyCode) -> bool {
        let owner = self.viewer();
        let is_admin = self.is_admin();
        let Screen::Tasks(list) = &mut self.screen else {
            return false;
        };

        if list.pending_delete.is_some() {
            match code {
                KeyCode::Char('y') => list.confirm_delete(&self.api, &owner).await,
                KeyCode::Char('n') | KeyCode::Esc => list.cancel_delete(),
                _ => {}
            }
            return false;
        }

        let mut go = None;
        let mut refresh = true;
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('j') | KeyCode::Down => {
                list.next();
                refresh = false;
            }
            KeyCode::Char('k') | KeyCode::Up => {
                list.previous();
                refresh = false;
            }
            KeyCode::Char('n') => refresh = list.next_page(),
            KeyCode::Char('p') => refresh = list.previous_page(),
            KeyCode::Char('f') => list.cycle_priority_filter(),
            KeyCode::Char('c') => list.cycle_status_filter(),
            KeyCode::Char('s') => list.cycle_sort_key(),
            KeyCode::Char('o') => list.toggle_sort_dir(),
            KeyCode::Char('r') => {}
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Insert;
                refresh = false;
            }
            KeyCode::Char('d') => {
                list.request_delete(&owner, is_admin);
                refresh = false;
            }
            KeyCode::Char('a') => go = Some(Route::AddTask),
            KeyCode::Char('e') | KeyCode::Enter => {
                refresh = false;
                if let Some(task) = list.selected_task() {
                    if can_modify(task, &owner, is_admin) {
                        go = Some(Route::EditTask(task.id));
                    }
                }
            }
            KeyCode::Char('A') if is_admin => go = Some(Route::Admin),
            KeyCode::Char('L') => {
                self.logout().await;
                return false;
            }
            _ => refresh = false,
        }

        if let Some(route) = go {
            self.navigate(route).await;
        } else if refresh {
            list.refresh(&self.api, &owner).await;
        }
        false
    }

    async fn handle_admin(&mut self, code: KeyCode) -> bool {
        let Screen::Admin(panel) = &mut self.screen else {
            return false;
        };
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('j') | KeyCode::Down => panel.next(),
            KeyCode::Char('k') | KeyCode::Up => panel.previous(),
            KeyCode::Char('r') => panel.refresh(&self.api, &self.session).await,
            KeyCode::Enter | KeyCode::Char(' ') => {
                panel.toggle_role(&self.api, &self.session).await
            }
            KeyCode::Esc | KeyCode::Char('t') => self.navigate(Route::Tasks).await,
            KeyCode::Char('L') => self.logout().await,
            _ => {}
        }
        false
    }

    async fn handle_form(&mut self, code: KeyCode) -> bool {
        let owner = self.viewer();

        if let Screen::Editor(editor) = &mut self.screen {
            if editor.confirm_delete {
                let go = match code {
                    KeyCode::Char('y') => editor.confirm_delete(&self.api, &owner).await,
                    KeyCode::Char('n') | KeyCode::Esc => {
                        editor.cancel_delete();
                        None
                    }
                    _ => None,
                };
                if let Some(route) = go {
                    self.navigate(route).await;
                }
                return false;
            }
        }

        let go = match code {
            KeyCode::Char('i') => {
                if self.form_mut().is_some() {
                    self.input_mode = InputMode::Insert;
                }
                None
            }
            KeyCode::Tab | KeyCode::Char('j') | KeyCode::Down => {
                if let Some(form) = self.form_mut() {
                    form.focus_next();
                }
                None
            }
            KeyCode::BackTab | KeyCode::Char('k') | KeyCode::Up => {
                if let Some(form) = self.form_mut() {
                    form.focus_previous();
                }
                None
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') => {
                let forward = code != KeyCode::Left;
                if let Some(form) = self.form_mut() {
                    form.cycle_choice(forward);
                }
                None
            }
            KeyCode::Enter => self.submit(&owner).await,
            KeyCode::Char('D') => {
                if let Screen::Editor(editor) = &mut self.screen {
                    editor.request_delete();
                }
                None
            }
            KeyCode::Char('s') if self.route == Route::Login => Some(Route::Signup),
            KeyCode::Char('f') if self.route == Route::Login => Some(Route::ForgotPassword),
            KeyCode::Char('l') if !self.route.requires_auth() && self.route != Route::Login => {
                Some(Route::Login)
            }
            KeyCode::Esc if self.route.requires_auth() => Some(Route::Tasks),
            KeyCode::Char('q') => return true,
            _ => None,
        };

        if let Some(route) = go {
            self.navigate(route).await;
        }
        false
    }

    async fn submit(&mut self, owner: &str) -> Option<Route> {
        match &mut self.screen {
            Screen::Login(screen) => screen.submit(&self.api, &self.session).await,
            Screen::Signup(screen) => screen.submit(&self.api, &self.session).await,
            Screen::ForgotPassword(screen) => screen.submit(&self.api).await,
            Screen::Editor(editor) if !editor.is_loading() => {
                editor.submit(&self.api, owner).await
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Role};
    use crate::testing::{task, user, FakeApi};
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(api: FakeApi) -> (tempfile::TempDir, App<FakeApi>) {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionStore::new(dir.path().join("session.toml"));
        let settings = Settings {
            page_size: 5,
            search_debounce: Duration::from_millis(800),
            otp_signup: true,
        };
        (dir, App::new(api, session, settings))
    }

    async fn type_text(app: &mut App<FakeApi>, text: &str) {
        for c in text.chars() {
            app.handle_input(key(KeyCode::Char(c))).await;
        }
    }

    #[tokio::test]
    async fn test_signed_out_start_lands_on_login() {
        let (_dir, mut app) = app(FakeApi::default());
        app.start().await;
        assert_eq!(app.route, Route::Login);
        assert!(app.api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_login_by_keyboard() {
        let (_dir, mut app) = app(FakeApi::with_tasks(vec![task(
            1,
            "Alpha",
            Priority::Low,
            false,
        )]));
        app.start().await;

        app.handle_input(key(KeyCode::Char('i'))).await;
        type_text(&mut app, "ada@example.com").await;
        app.handle_input(key(KeyCode::Tab)).await;
        type_text(&mut app, "secret1").await;
        app.handle_input(key(KeyCode::Esc)).await;
        app.handle_input(key(KeyCode::Enter)).await;

        assert_eq!(app.route, Route::Tasks);
        assert_eq!(app.viewer(), "ada@example.com");
        match &app.screen {
            Screen::Tasks(list) => assert_eq!(list.tasks().len(), 1),
            _ => panic!("expected task list"),
        }
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (_dir, mut app) = app(FakeApi::default());
        app.session
            .set_identity("ada@example.com", Role::Admin, Some("Ada"))
            .unwrap();
        app.start().await;
        assert_eq!(app.route, Route::Tasks);

        app.handle_input(key(KeyCode::Char('L'))).await;

        assert_eq!(app.route, Route::Login);
        assert!(!app.session.is_authenticated());
        assert_eq!(app.session.role(), None);
        assert_eq!(app.session.name(), None);
    }

    #[tokio::test]
    async fn test_protected_routes_need_a_session() {
        let (_dir, mut app) = app(FakeApi::default());
        for route in [Route::Tasks, Route::AddTask, Route::EditTask(3), Route::Admin] {
            app.navigate(route).await;
            assert_eq!(app.route, Route::Login);
        }
    }

    #[tokio::test]
    async fn test_admin_route_redirects_plain_users() {
        let (_dir, mut app) = app(FakeApi::with_users(vec![user(
            "bo@example.com",
            "Bo",
            Role::User,
        )]));
        app.session
            .set_identity("bo@example.com", Role::User, None)
            .unwrap();
        app.navigate(Route::Admin).await;
        assert_eq!(app.route, Route::Tasks);
        assert!(!app.api.calls().contains(&"list_users".to_string()));
    }

    #[tokio::test]
    async fn test_declined_delete_keeps_task() {
        let (_dir, mut app) = app(FakeApi::with_tasks(vec![task(
            1,
            "Alpha",
            Priority::Low,
            false,
        )]));
        app.session
            .set_identity("ada@example.com", Role::User, None)
            .unwrap();
        app.start().await;

        app.handle_input(key(KeyCode::Char('d'))).await;
        app.handle_input(key(KeyCode::Char('n'))).await;

        assert!(!app.api.calls().contains(&"delete_task".to_string()));
        assert_eq!(app.api.tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_filter_key_resets_page_and_refreshes() {
        let tasks = (1..=12)
            .map(|i| task(i, &format!("task {}", i), Priority::High, false))
            .collect();
        let (_dir, mut app) = app(FakeApi::with_tasks(tasks));
        app.session
            .set_identity("ada@example.com", Role::User, None)
            .unwrap();
        app.start().await;
        app.handle_input(key(KeyCode::Char('n'))).await;
        if let Screen::Tasks(list) = &app.screen {
            assert_eq!(list.query.page, 1);
        }

        app.handle_input(key(KeyCode::Char('f'))).await;

        match &app.screen {
            Screen::Tasks(list) => {
                assert_eq!(list.query.page, 0);
                assert_eq!(list.query.priority, Some(Priority::Low));
                assert_eq!(list.view().map(|v| v.total_elements), Some(0));
            }
            _ => panic!("expected task list"),
        }
    }

    #[tokio::test]
    async fn test_search_waits_for_debounce() {
        let (_dir, mut app) = app(FakeApi::with_tasks(vec![
            task(1, "Alpha", Priority::Low, false),
            task(2, "Beta", Priority::High, false),
        ]));
        app.session
            .set_identity("ada@example.com", Role::User, None)
            .unwrap();
        app.start().await;
        let before = app.api.calls().len();

        app.handle_input(key(KeyCode::Char('/'))).await;
        type_text(&mut app, "bet").await;
        app.handle_input(key(KeyCode::Esc)).await;
        assert_eq!(app.api.calls().len(), before);

        app.tick(Instant::now() + Duration::from_secs(1)).await;

        match &app.screen {
            Screen::Tasks(list) => {
                assert_eq!(list.query.search, "bet");
                assert_eq!(list.tasks().len(), 1);
            }
            _ => panic!("expected task list"),
        }
    }

    #[tokio::test]
    async fn test_edit_and_save_returns_to_list() {
        let (_dir, mut app) = app(FakeApi::with_tasks(vec![task(
            4,
            "Alpha",
            Priority::Low,
            false,
        )]));
        app.session
            .set_identity("ada@example.com", Role::User, None)
            .unwrap();
        app.start().await;

        app.handle_input(key(KeyCode::Char('e'))).await;
        assert_eq!(app.route, Route::EditTask(4));
        app.handle_input(key(KeyCode::Enter)).await;

        assert_eq!(app.route, Route::Tasks);
        assert!(app.api.calls().contains(&"update_task".to_string()));
    }
}
