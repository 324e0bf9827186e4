//! Task list: query state, server pagination with a client-side fallback,
//! and delete confirmation.

use crate::api::{TaskApi, OWNER_PARAM};
use crate::debounce::Debouncer;
use crate::models::{Priority, Task, TaskPage};
use crate::request::RequestState;
use chrono::NaiveDateTime;
use ratatui::widgets::ListState;
use std::cmp::Ordering;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Priority,
    CreatedAt,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Priority => "priority",
            SortKey::CreatedAt => "createdAt",
        }
    }

    fn next(self) -> SortKey {
        match self {
            SortKey::Name => SortKey::Priority,
            SortKey::Priority => SortKey::CreatedAt,
            SortKey::CreatedAt => SortKey::Name,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }

    fn flipped(self) -> SortDir {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

/// The effective query. `search` is the debounced value, not the raw input.
#[derive(Clone, Debug, PartialEq)]
pub struct PageQuery {
    pub page: usize,
    pub size: usize,
    pub sort_by: SortKey,
    pub sort_dir: SortDir,
    pub search: String,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
}

impl PageQuery {
    pub fn new(size: usize) -> PageQuery {
        PageQuery {
            page: 0,
            size,
            sort_by: SortKey::CreatedAt,
            sort_dir: SortDir::Desc,
            search: String::new(),
            priority: None,
            completed: None,
        }
    }

    /// Query-string pairs for the paginated endpoint; inactive filters are left out.
    pub fn params(&self, owner: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            (OWNER_PARAM, owner.to_string()),
            ("page", self.page.to_string()),
            ("size", self.size.to_string()),
            ("sortBy", self.sort_by.as_str().to_string()),
            ("sortDir", self.sort_dir.as_str().to_string()),
        ];
        let search = self.search.trim();
        if !search.is_empty() {
            params.push(("search", search.to_string()));
        }
        if let Some(priority) = self.priority {
            params.push(("priority", priority.as_str().to_string()));
        }
        if let Some(completed) = self.completed {
            params.push(("completed", completed.to_string()));
        }
        params
    }
}

/// One rendered page plus the counts that go with it.
#[derive(Clone, Debug, PartialEq)]
pub struct PageView {
    pub tasks: Vec<Task>,
    pub total_pages: usize,
    pub total_elements: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl From<TaskPage> for PageView {
    fn from(page: TaskPage) -> PageView {
        PageView {
            tasks: page.tasks,
            total_pages: page.total_pages,
            total_elements: page.total_elements,
            has_next: page.has_next,
            has_previous: page.has_previous,
        }
    }
}

/// Which path produced the page.
#[derive(Clone, Debug, PartialEq)]
pub enum ListOutcome {
    Paginated(PageView),
    FallbackComputed(PageView),
}

impl ListOutcome {
    pub fn view(&self) -> &PageView {
        match self {
            ListOutcome::Paginated(view) | ListOutcome::FallbackComputed(view) => view,
        }
    }
}

fn created_at(task: &Task) -> Option<NaiveDateTime> {
    let raw = task.created_at.as_deref()?;
    raw.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

fn compare(a: &Task, b: &Task, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Priority => {
            let weight = |task: &Task| task.priority.map(Priority::weight).unwrap_or(0);
            weight(a).cmp(&weight(b))
        }
        SortKey::CreatedAt => created_at(a).cmp(&created_at(b)),
    }
}

fn matches_search(task: &Task, needle: &str) -> bool {
    let haystacks = [
        Some(task.name.as_str()),
        task.description.as_deref(),
        task.priority.map(Priority::as_str),
        task.user.as_ref().and_then(|owner| owner.name.as_deref()),
        task.user.as_ref().map(|owner| owner.email.as_str()),
    ];
    haystacks
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Filters, sorts and slices the full task list the way the paginated
/// endpoint would. Counts come from the filtered set.
pub fn compute_page(tasks: Vec<Task>, query: &PageQuery) -> PageView {
    let needle = query.search.trim().to_lowercase();
    let mut filtered: Vec<Task> = tasks
        .into_iter()
        .filter(|task| needle.is_empty() || matches_search(task, &needle))
        .filter(|task| query.priority.map_or(true, |p| task.priority == Some(p)))
        .filter(|task| query.completed.map_or(true, |c| task.completed == c))
        .collect();

    // stable sort: ties keep their original order in both directions
    filtered.sort_by(|a, b| {
        let ord = compare(a, b, query.sort_by);
        match query.sort_dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });

    let size = query.size.max(1);
    let total_elements = filtered.len();
    let total_pages = total_elements.div_ceil(size);
    let start = query.page.saturating_mul(size).min(total_elements);
    let end = (start + size).min(total_elements);

    PageView {
        tasks: filtered.drain(start..end).collect(),
        total_pages,
        total_elements,
        has_next: query.page + 1 < total_pages,
        has_previous: query.page > 0,
    }
}

/// Asks for the page from the server; if that fails, builds it from the full list.
pub async fn fetch_page<A: TaskApi>(
    api: &A,
    owner: &str,
    query: &PageQuery,
) -> Result<ListOutcome, String> {
    match api.list_tasks_paginated(owner, query).await {
        Ok(page) => Ok(ListOutcome::Paginated(page.into())),
        Err(err) => {
            warn!(error = %err, "paginated task query failed, computing page locally");
            match api.list_tasks(owner).await {
                Ok(all) => Ok(ListOutcome::FallbackComputed(compute_page(all, query))),
                Err(err) => {
                    error!(error = %err, "could not load tasks");
                    Err("Failed to load tasks".to_string())
                }
            }
        }
    }
}

/// Whether the viewer gets edit/delete controls for `task`.
pub fn can_modify(task: &Task, viewer: &str, is_admin: bool) -> bool {
    is_admin || task.owner_email().map_or(true, |owner| owner == viewer)
}

/// Owner name shown to admins on tasks they do not own.
pub fn owner_badge(task: &Task, viewer: &str, is_admin: bool) -> Option<String> {
    match task.owner_email() {
        Some(owner) if is_admin && owner != viewer => task.owner_label(),
        _ => None,
    }
}

pub struct TaskList {
    pub query: PageQuery,
    pub search_input: String,
    pub result: RequestState<ListOutcome>,
    pub state: ListState,
    pub pending_delete: Option<u64>,
    pub notice: Option<String>,
    search: Debouncer<String>,
    issued: u64,
}

impl TaskList {
    pub fn new(page_size: usize, debounce: Duration) -> TaskList {
        TaskList {
            query: PageQuery::new(page_size),
            search_input: String::new(),
            result: RequestState::Idle,
            state: ListState::default(),
            pending_delete: None,
            notice: None,
            search: Debouncer::new(debounce),
            issued: 0,
        }
    }

    pub fn view(&self) -> Option<&PageView> {
        self.result.value().map(ListOutcome::view)
    }

    pub fn tasks(&self) -> &[Task] {
        self.view().map(|view| view.tasks.as_slice()).unwrap_or_default()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.tasks().get(i))
    }

    /// Records a keystroke in the search box; the query changes later, in `tick`.
    pub fn edit_search(&mut self, input: String, now: Instant) {
        self.search_input = input.clone();
        self.search.push(input, now);
    }

    /// Applies a settled search term. Returns true when the query changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.search.poll(now) {
            Some(term) if term != self.query.search => {
                self.query.search = term;
                self.query.page = 0;
                true
            }
            _ => false,
        }
    }

    pub fn cycle_priority_filter(&mut self) {
        self.query.priority = match self.query.priority {
            None => Some(Priority::Low),
            Some(Priority::Low) => Some(Priority::Medium),
            Some(Priority::Medium) => Some(Priority::High),
            Some(Priority::High) => None,
        };
        self.query.page = 0;
    }

    pub fn cycle_status_filter(&mut self) {
        self.query.completed = match self.query.completed {
            None => Some(false),
            Some(false) => Some(true),
            Some(true) => None,
        };
        self.query.page = 0;
    }

    pub fn cycle_sort_key(&mut self) {
        self.query.sort_by = self.query.sort_by.next();
        self.query.page = 0;
    }

    pub fn toggle_sort_dir(&mut self) {
        self.query.sort_dir = self.query.sort_dir.flipped();
        self.query.page = 0;
    }

    pub fn next_page(&mut self) -> bool {
        if self.view().is_some_and(|view| view.has_next) {
            self.query.page += 1;
            true
        } else {
            false
        }
    }

    pub fn previous_page(&mut self) -> bool {
        if self.query.page > 0 {
            self.query.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self) {
        let len = self.tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Stamps a new refresh. Only the latest stamp may apply its result.
    pub fn begin_refresh(&mut self) -> (u64, PageQuery) {
        self.issued += 1;
        self.result.start();
        (self.issued, self.query.clone())
    }

    pub fn finish_refresh(&mut self, token: u64, outcome: Result<ListOutcome, String>) -> bool {
        if token != self.issued {
            info!(token, latest = self.issued, "dropping stale task page");
            return false;
        }
        match outcome {
            Ok(outcome) => {
                let len = outcome.view().tasks.len();
                self.result.succeed(outcome);
                self.state.select(if len == 0 { None } else { Some(0) });
            }
            Err(message) => {
                self.result.fail(message);
                self.state.select(None);
            }
        }
        true
    }

    pub async fn refresh<A: TaskApi>(&mut self, api: &A, owner: &str) {
        let (token, query) = self.begin_refresh();
        let outcome = fetch_page(api, owner, &query).await;
        self.finish_refresh(token, outcome);
    }

    /// Asks for confirmation before anything is sent.
    pub fn request_delete(&mut self, viewer: &str, is_admin: bool) -> bool {
        match self.selected_task() {
            Some(task) if can_modify(task, viewer, is_admin) => {
                self.pending_delete = Some(task.id);
                true
            }
            _ => false,
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the confirmed task and reloads the current page.
    pub async fn confirm_delete<A: TaskApi>(&mut self, api: &A, owner: &str) {
        let Some(task_id) = self.pending_delete.take() else {
            return;
        };
        match api.delete_task(owner, task_id).await {
            Ok(()) => {
                info!(task_id, "task deleted");
                self.notice = None;
                self.refresh(api, owner).await;
                if self.tasks().is_empty() && self.previous_page() {
                    self.refresh(api, owner).await;
                }
            }
            Err(err) => {
                error!(task_id, error = %err, "delete failed");
                self.notice = Some("Failed to delete task. Please try again.".to_string());
            }
        }
    }
}
