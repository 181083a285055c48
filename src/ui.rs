use crate::api::TaskBackend;
use crate::app::{Action, ActiveInput, App, Form, InputMode, Outcome};
use crate::models::{Filter, Task};
use crate::timestamp::display;
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

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

fn key_hint(key: &'static str, label: &'static str) -> Vec<Span<'static>> {
    vec![
        Span::styled(key, Style::default().fg(Color::Red)),
        Span::raw(label),
    ]
}

fn get_legend(input_mode: &InputMode) -> Text<'static> {
    let hints = match input_mode {
        InputMode::Normal => vec![
            key_hint(" q ", ": Quit "),
            key_hint(" j/k ", ": Move "),
            key_hint(" f ", ": Filter "),
            key_hint(" a ", ": Add "),
            key_hint(" e ", ": Edit "),
            key_hint(" c ", ": Complete "),
            key_hint(" d ", ": Delete "),
            key_hint(" r ", ": Refresh "),
            key_hint(" s ", ": Schedule "),
            key_hint(" g ", ": Suggest "),
            key_hint(" p ", ": Plan "),
        ],
        InputMode::Editing => vec![
            key_hint(" i ", ": Insert "),
            key_hint(" Tab ", ": Next Field "),
            key_hint(" Enter ", ": Submit "),
            key_hint(" Esc ", ": Cancel "),
        ],
        InputMode::Insert => vec![key_hint(" Esc ", ": Stop Typing ")],
    };
    Text::from(Line::from(hints.into_iter().flatten().collect::<Vec<_>>()))
}

fn filter_tabs(app: &App) -> Line<'static> {
    let tab = |filter: Filter, count: usize| {
        let style = if app.filter == filter {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Green)
        };
        Span::styled(format!(" {} ({}) ", filter.label(), count), style)
    };

    Line::from(vec![
        tab(Filter::All, app.tasks.len()),
        Span::raw(" "),
        tab(Filter::Active, app.active_count()),
        Span::raw(" "),
        tab(Filter::Completed, app.completed_count()),
    ])
}

fn bold(label: &'static str) -> Span<'static> {
    Span::styled(label, Style::default().add_modifier(Modifier::BOLD))
}

fn detail_lines(task: &Task) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![bold("Title: "), Span::raw(task.title.clone())]),
        Line::from(vec![bold("Due: "), Span::raw(display(&task.due_at))]),
        Line::from(vec![
            bold("Status: "),
            if task.is_done {
                Span::styled("Done", Style::default().fg(Color::Green))
            } else {
                Span::raw("Active")
            },
        ]),
        Line::from(vec![bold("Created: "), Span::raw(display(&task.created_at))]),
    ];

    if let Some(updated) = &task.updated_at {
        lines.push(Line::from(vec![bold("Updated: "), Span::raw(display(updated))]));
    }

    lines.push(Line::from(bold("Description: ")));
    match &task.description {
        Some(desc) => lines.extend(desc.lines().map(|l| Line::from(l.to_string()))),
        None => lines.push(Line::from("No description")),
    }
    lines
}

fn ai_text(app: &App) -> Text<'static> {
    if app.ai.loading {
        return Text::from("AI is thinking...");
    }
    if let Some(err) = &app.ai.last_error {
        return Text::styled(err.clone(), Style::default().fg(Color::Red));
    }
    match &app.ai.last_output {
        Some(output) => Text::from(output.clone()),
        None => Text::from("No AI output yet."),
    }
}

fn draw_form(f: &mut Frame, app: &App, area: Rect, form: &Form) {
    let field = |label: &'static str, value: &str, input: ActiveInput| {
        let style = if app.active_input == input {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        Line::from(vec![
            Span::styled(label, style.add_modifier(Modifier::BOLD)),
            Span::styled(value.to_string(), style),
        ])
    };

    let (title, lines) = match form {
        Form::Add | Form::Edit(_) => {
            let title = if matches!(form, Form::Add) {
                "New Task (title may carry @2024-01-01T09:00)"
            } else {
                "Edit Task"
            };
            (
                title.to_string(),
                vec![
                    field("Title: ", &app.form_title, ActiveInput::Title),
                    field("Description: ", &app.form_description, ActiveInput::Description),
                    field("Due: ", &app.form_due, ActiveInput::Due),
                ],
            )
        }
        Form::Hint(mode) => (
            format!("{}: describe your day", mode.label()),
            vec![field("> ", &app.ai_hint, ActiveInput::Hint)],
        ),
    };

    let popup_width_percentage = 60;
    let popup_width = (area.width * popup_width_percentage / 100).saturating_sub(2);
    let wrapped: usize = lines
        .iter()
        .map(|line| calculate_wrapped_lines(&line.to_string(), popup_width).max(1))
        .sum();
    let popup_height = std::cmp::min(wrapped as u16 + 2, area.height.saturating_sub(2));
    let popup_area = centered_rect_absolute(popup_width + 2, popup_height, area);

    let popup_block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Green));

    let input = Paragraph::new(lines)
        .block(popup_block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(input, popup_area);
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(size);

    let tabs_chunk = chunks[0];
    let body_chunk = chunks[1];
    let status_chunk = chunks[2];
    let footer_chunk = chunks[3];

    f.render_widget(Paragraph::new(filter_tabs(app)), tabs_chunk);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(body_chunk);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)].as_ref())
        .split(columns[1]);

    // Left panel: Task list
    let list_title = format!("Tasks ({})", app.filter.label());
    let visible = app.visible_tasks();
    let tasks_widget = if !visible.is_empty() {
        let tasks: Vec<ListItem> = visible
            .iter()
            .map(|task| {
                let due = Span::styled(
                    format!("{}  ", display(&task.due_at)),
                    Style::default().fg(Color::DarkGray),
                );
                let content = if task.is_done {
                    vec![
                        Span::styled("DONE ", Style::default().fg(Color::Green)),
                        due,
                        Span::styled(
                            task.title.clone(),
                            Style::default().add_modifier(Modifier::CROSSED_OUT),
                        ),
                    ]
                } else {
                    vec![due, Span::raw(task.title.clone())]
                };
                ListItem::new(Line::from(content))
            })
            .collect();

        List::new(tasks)
            .block(Block::default().borders(Borders::ALL).title(list_title))
            .highlight_style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ")
    } else {
        List::new(vec![ListItem::new("No tasks available")])
            .block(Block::default().borders(Borders::ALL).title(list_title))
    };

    f.render_stateful_widget(tasks_widget, columns[0], &mut app.state);

    // Right panel: Task details
    let detail_block = Block::default().borders(Borders::ALL).title("Task Details");
    let detail = match app.selected_task() {
        Some(task) => Paragraph::new(detail_lines(task)),
        None => Paragraph::new("Select a task to see its details"),
    };
    f.render_widget(detail.block(detail_block).wrap(Wrap { trim: true }), right[0]);

    // Right panel: AI output
    let ai_title = match app.ai.mode {
        Some(mode) => format!("AI Assistant - {}", mode.label()),
        None => "AI Assistant".to_string(),
    };
    let ai_widget = Paragraph::new(ai_text(app))
        .block(Block::default().borders(Borders::ALL).title(ai_title))
        .wrap(Wrap { trim: false });
    f.render_widget(ai_widget, right[1]);

    if let Some(form) = &app.form {
        draw_form(f, app, body_chunk, form);
    }

    if let Some(status) = &app.status {
        let line = Paragraph::new(status.clone()).style(Style::default().fg(Color::Yellow));
        f.render_widget(line, status_chunk);
    }

    // Render the legend in the footer
    let legend = Paragraph::new(get_legend(&app.input_mode))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    f.render_widget(legend, footer_chunk);
}

pub async fn run_app<B: Backend, T: TaskBackend + ?Sized>(
    terminal: &mut Terminal<B>,
    mut app: App,
    backend: &T,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        // Handle input
        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.handle_input(key, backend).await {
                    Outcome::Quit => return Ok(()),
                    Outcome::RunAi(mode) => {
                        // Show the loading state before blocking on the call
                        app.apply(Action::AiStarted(mode));
                        terminal.draw(|f| draw(f, &mut app))?;
                        app.run_ai(mode, backend).await;
                    }
                    Outcome::Continue => {}
                }
            }
        }
    }
}

fn calculate_wrapped_lines(text: &str, max_width: u16) -> usize {
    if max_width == 0 {
        return 0;
    }
    let mut line_count = 0;
    for line in text.lines() {
        let line_width = line.chars().count() as u16;
        line_count += line_width.div_ceil(max_width) as usize;
    }
    line_count
}
