use crate::admin::AdminPanel;
use crate::api::TaskApi;
use crate::app::{App, InputMode, Route, Screen};
use crate::auth::{ResetStep, SignupStep};
use crate::editor::{EditorMode, TaskEditor};
use crate::form::Form;
use crate::request::RequestState;
use crate::tasks::{can_modify, owner_badge, ListOutcome, TaskList};
use crossterm::event::{self, Event as CEvent};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((r.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn key_hint(keys: &[(&'static str, &'static str)]) -> Text<'static> {
    let spans: Vec<Span<'static>> = keys
        .iter()
        .flat_map(|(key, action)| {
            [
                Span::styled(format!(" {} ", key), Style::default().fg(Color::Red)),
                Span::raw(format!(": {} ", action)),
            ]
        })
        .collect();
    Text::from(Line::from(spans))
}

fn get_legend<A: TaskApi>(app: &App<A>) -> Text<'static> {
    if app.input_mode == InputMode::Insert {
        return match app.route {
            Route::Tasks => key_hint(&[("Enter/Esc", "Done")]),
            _ => key_hint(&[
                ("Esc", "Normal Mode"),
                ("Tab", "Next Field"),
                ("Left/Right", "Change Choice"),
            ]),
        };
    }
    match &app.screen {
        Screen::Tasks(list) if list.pending_delete.is_some() => {
            key_hint(&[("y", "Delete"), ("n", "Keep")])
        }
        Screen::Editor(editor) if editor.confirm_delete => {
            key_hint(&[("y", "Delete"), ("n", "Keep")])
        }
        Screen::Tasks(_) => {
            let mut keys = vec![
                ("q", "Quit"),
                ("j/k", "Move"),
                ("n/p", "Page"),
                ("/", "Search"),
                ("f", "Priority"),
                ("c", "Status"),
                ("s", "Sort"),
                ("o", "Direction"),
                ("a", "Add"),
                ("e", "Edit"),
                ("d", "Delete"),
                ("L", "Logout"),
            ];
            if app.is_admin() {
                keys.push(("A", "Admin"));
            }
            key_hint(&keys)
        }
        Screen::Admin(_) => key_hint(&[
            ("j/k", "Move"),
            ("Enter", "Toggle Role"),
            ("r", "Refresh"),
            ("Esc", "Tasks"),
            ("L", "Logout"),
        ]),
        Screen::Login(_) => key_hint(&[
            ("i", "Insert"),
            ("Tab", "Next Field"),
            ("Enter", "Sign In"),
            ("s", "Sign Up"),
            ("f", "Forgot Password"),
            ("q", "Quit"),
        ]),
        Screen::Signup(_) | Screen::ForgotPassword(_) => key_hint(&[
            ("i", "Insert"),
            ("Tab", "Next Field"),
            ("Enter", "Submit"),
            ("l", "Sign In"),
            ("q", "Quit"),
        ]),
        Screen::Editor(editor) => {
            let mut keys = vec![
                ("i", "Insert"),
                ("Tab", "Next Field"),
                ("Space", "Change Choice"),
                ("Enter", "Save"),
                ("Esc", "Cancel"),
            ];
            if matches!(editor.mode, EditorMode::Edit(_)) {
                keys.push(("D", "Delete Task"));
            }
            key_hint(&keys)
        }
    }
}

fn banner<T>(request: &RequestState<T>) -> Option<Line<'static>> {
    match request {
        RequestState::Loading => Some(Line::from(Span::styled(
            "Working...",
            Style::default().fg(Color::Yellow),
        ))),
        RequestState::Error(message) => Some(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))),
        _ => None,
    }
}

fn form_lines(form: &Form, insert: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, field) in form.fields.iter().enumerate() {
        if field.hidden {
            continue;
        }
        let focused = i == form.focus;
        let marker = if focused && insert {
            "> "
        } else if focused {
            "* "
        } else {
            "  "
        };
        let value_style = if form.is_disabled(field.key) {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Green)),
            Span::styled(
                format!("{}: ", field.label),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(field.display(), value_style),
        ]));
        if let Some(error) = form.error(field.key) {
            lines.push(Line::from(Span::styled(
                format!("    {}", error),
                Style::default().fg(Color::Red),
            )));
        }
    }
    lines
}

fn render_form(
    f: &mut Frame,
    area: Rect,
    title: &str,
    intro: Option<&str>,
    form: &Form,
    request_line: Option<Line<'static>>,
    insert: bool,
) {
    let mut lines = Vec::new();
    if let Some(intro) = intro {
        lines.push(Line::from(Span::raw(intro.to_string())));
        lines.push(Line::from(""));
    }
    if let Some(line) = request_line {
        lines.push(line);
        lines.push(Line::from(""));
    }
    lines.extend(form_lines(form, insert));

    let height = (lines.len() as u16 + 2).min(area.height);
    let width = 70.min(area.width);
    let popup_area = centered_rect_absolute(width, height, area);
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .style(Style::default().fg(Color::Green)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, popup_area);
}

fn render_confirm(f: &mut Frame, area: Rect, message: &str) {
    let popup_area = centered_rect_absolute(60.min(area.width), 5.min(area.height), area);
    let paragraph = Paragraph::new(vec![
        Line::from(Span::raw(message.to_string())),
        Line::from(Span::styled(
            "This action cannot be undone. (y/n)",
            Style::default().fg(Color::Red),
        )),
    ])
    .block(Block::default().borders(Borders::ALL).title("Confirm"))
    .wrap(Wrap { trim: true });
    f.render_widget(Clear, popup_area);
    f.render_widget(paragraph, popup_area);
}

fn render_tasks(f: &mut Frame, area: Rect, list: &mut TaskList, viewer: &str, is_admin: bool, insert: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let query = &list.query;
    let search_style = if insert {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled("Search: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(list.search_input.clone(), search_style),
        Span::raw("  "),
        Span::styled("Priority: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(query.priority.map_or("all", |p| p.as_str())),
        Span::raw("  "),
        Span::styled("Status: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(match query.completed {
            None => "all",
            Some(true) => "completed",
            Some(false) => "pending",
        }),
        Span::raw("  "),
        Span::styled("Sort: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("{} {}", query.sort_by.as_str(), query.sort_dir.as_str())),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Filters"));
    f.render_widget(header, chunks[0]);

    let title = match list.result.value() {
        Some(outcome) => {
            let view = outcome.view();
            let source = match outcome {
                ListOutcome::Paginated(_) => "",
                ListOutcome::FallbackComputed(_) => " (offline paging)",
            };
            format!(
                "Tasks - page {}/{} - {} total{}",
                list.query.page + 1,
                view.total_pages.max(1),
                view.total_elements,
                source
            )
        }
        None => "Tasks".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let items: Vec<ListItem> = match &list.result {
        RequestState::Loading | RequestState::Idle => vec![ListItem::new("Loading tasks...")],
        RequestState::Error(message) => vec![ListItem::new(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        ))],
        RequestState::Success(outcome) if outcome.view().tasks.is_empty() => {
            vec![ListItem::new("No tasks available")]
        }
        RequestState::Success(outcome) => outcome
            .view()
            .tasks
            .iter()
            .map(|task| {
                let mut content = Vec::new();
                if task.completed {
                    content.push(Span::styled("DONE ", Style::default().fg(Color::Green)));
                }
                content.push(Span::raw(task.name.clone()));
                if let Some(priority) = task.priority {
                    let color = match priority.weight() {
                        3 => Color::Red,
                        2 => Color::Yellow,
                        _ => Color::Blue,
                    };
                    content.push(Span::styled(
                        format!(" [{}]", priority),
                        Style::default().fg(color),
                    ));
                }
                if let Some(date) = task.last_date.as_deref().filter(|d| !d.is_empty()) {
                    content.push(Span::raw(format!(" due {}", date)));
                }
                if let Some(owner) = owner_badge(task, viewer, is_admin) {
                    content.push(Span::styled(
                        format!(" {} ", owner),
                        Style::default().bg(Color::Yellow).fg(Color::Black),
                    ));
                }
                if !can_modify(task, viewer, is_admin) {
                    content.push(Span::styled(
                        " (read only)",
                        Style::default().fg(Color::DarkGray),
                    ));
                }
                ListItem::new(Line::from(content))
            })
            .collect(),
    };

    let tasks_widget = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    f.render_stateful_widget(tasks_widget, chunks[1], &mut list.state);

    if let Some(notice) = &list.notice {
        let notice_area = Rect { height: 1, ..chunks[1] };
        f.render_widget(
            Paragraph::new(Span::styled(notice.clone(), Style::default().fg(Color::Red)))
                .alignment(Alignment::Right),
            notice_area,
        );
    }

    if list.pending_delete.is_some() {
        render_confirm(f, area, "Are you sure you want to delete this task?");
    }
}

fn render_editor(f: &mut Frame, area: Rect, editor: &TaskEditor, insert: bool) {
    let title = match editor.mode {
        EditorMode::Add => "Add New Task",
        EditorMode::Edit(_) => "Edit Task",
    };
    if editor.is_loading() {
        let popup_area = centered_rect_absolute(30.min(area.width), 3.min(area.height), area);
        f.render_widget(
            Paragraph::new("Loading task...")
                .block(Block::default().borders(Borders::ALL).title(title)),
            popup_area,
        );
        return;
    }
    if let Some(message) = editor.load.error() {
        render_form(
            f,
            area,
            title,
            Some("Press Esc to go back."),
            &Form::new(Vec::new()),
            Some(Line::from(Span::styled(
                message.to_string(),
                Style::default().fg(Color::Red),
            ))),
            false,
        );
        return;
    }
    let intro = match editor.mode {
        EditorMode::Add => "Create a new task to help organize your work.",
        EditorMode::Edit(_) => "Update your task. Danger zone: press D to delete it.",
    };
    render_form(f, area, title, Some(intro), &editor.form, banner(&editor.save), insert);
    if editor.confirm_delete {
        render_confirm(f, area, "Are you sure you want to delete this task?");
    }
}

fn render_admin(f: &mut Frame, area: Rect, panel: &mut AdminPanel) {
    let mut block = Block::default().borders(Borders::ALL).title("Admin Panel - Users");
    if let Some(notice) = &panel.notice {
        block = block.title_bottom(Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let items: Vec<ListItem> = match &panel.users {
        RequestState::Loading | RequestState::Idle => vec![ListItem::new("Loading users...")],
        RequestState::Error(message) => vec![ListItem::new(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        ))],
        RequestState::Success(users) => users
            .iter()
            .map(|user| {
                let role_color = match user.role {
                    crate::models::Role::Admin => Color::Magenta,
                    crate::models::Role::User => Color::Blue,
                };
                let mut content = vec![
                    Span::raw(format!("{} <{}> ", user.name, user.email)),
                    Span::styled(user.role.to_string(), Style::default().fg(role_color)),
                ];
                if !panel.can_edit(user) {
                    content.push(Span::styled(" (you)", Style::default().fg(Color::DarkGray)));
                }
                ListItem::new(Line::from(content))
            })
            .collect(),
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, area, &mut panel.state);
}

fn draw<A: TaskApi>(f: &mut Frame, app: &mut App<A>) {
    let size = f.area();

    // Split the main layout into body and footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(size);

    let body_chunk = chunks[0];
    let footer_chunk = chunks[1];
    let legend = get_legend(app);
    let insert = app.input_mode == InputMode::Insert;
    let viewer = app.viewer();
    let is_admin = app.is_admin();

    match &mut app.screen {
        Screen::Login(screen) => render_form(
            f,
            body_chunk,
            "Sign In",
            Some("Sign in to your Task Manager account"),
            &screen.form,
            banner(&screen.request),
            insert,
        ),
        Screen::Signup(screen) => {
            let intro = match screen.step {
                SignupStep::Form => "Create your Task Manager account",
                SignupStep::Otp => "We sent a code to your email. Enter it to finish.",
            };
            render_form(
                f,
                body_chunk,
                "Sign Up",
                Some(intro),
                &screen.form,
                banner(&screen.request),
                insert,
            )
        }
        Screen::ForgotPassword(screen) => {
            let (title, intro) = match screen.step {
                ResetStep::Request => ("Forgot Password", "Enter your email to receive an OTP"),
                ResetStep::Reset => ("Reset Password", "Enter the OTP and your new password"),
            };
            render_form(
                f,
                body_chunk,
                title,
                Some(intro),
                &screen.form,
                banner(&screen.request),
                insert,
            )
        }
        Screen::Tasks(list) => render_tasks(f, body_chunk, list, &viewer, is_admin, insert),
        Screen::Editor(editor) => render_editor(f, body_chunk, editor, insert),
        Screen::Admin(panel) => render_admin(f, body_chunk, panel),
    }

    // Render the legend in the footer
    let legend = Paragraph::new(legend)
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    f.render_widget(legend, footer_chunk);
}

pub async fn run_app<B: Backend, A: TaskApi>(
    terminal: &mut Terminal<B>,
    mut app: App<A>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        // Handle input
        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if app.handle_input(key).await {
                    return Ok(());
                }
            }
        }
        app.tick(Instant::now()).await;
    }
}
