use crate::core::SessionState;
use crate::tui::app::{App, FileFilter, Focus, Screen};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

pub fn draw(f: &mut Frame, app: &mut App) {
    match &app.screen {
        Screen::Chat => draw_chat(f, app),
        Screen::Browser => draw_browser(f, app),
        Screen::Viewer => draw_viewer(f, app),
    }
}

fn draw_chat(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(1),    // Body
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    let state = app.session.state();
    let state_color = match state {
        SessionState::Idle => Color::Gray,
        SessionState::Ready => Color::Green,
        SessionState::AwaitingVideo | SessionState::AwaitingModelResponse => Color::Yellow,
    };
    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            "YouTube Content Advisor",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(format!("[{state}]"), Style::default().fg(state_color)),
        Span::styled(
            format!("  {}", app.backend_label),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(chunks[1]);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // URL input
            Constraint::Length(7), // Transcript info
            Constraint::Min(6),    // Status
        ])
        .split(body[0]);

    app.url_input.render(f, sidebar[0]);
    draw_transcript_info(f, app, sidebar[1]);
    app.status.render(f, sidebar[2]);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(body[1]);

    let thinking = state == SessionState::AwaitingModelResponse;
    app.conversation
        .render(f, main[0], app.session.history(), thinking);
    app.message_input.render(f, main[1]);

    let focus_hint = match app.focus {
        Focus::Url => "[Enter] Load video",
        Focus::Message => "[Enter] Send",
    };
    let transcript_keys = if app.session.has_transcript() {
        "  [Ctrl+A] Analyze  [Ctrl+S] Save transcript  [Ctrl+E] Export"
    } else {
        ""
    };
    let help = Paragraph::new(format!(
        "{focus_hint}  [Tab] Switch{transcript_keys}  [Ctrl+L] Clear  [Ctrl+F] Files  [Ctrl+Q] Quit"
    ))
    .style(Style::default().fg(Color::Gray))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[2]);
}

fn draw_transcript_info(f: &mut Frame, app: &App, area: Rect) {
    let label = Style::default().fg(Color::Gray);
    let lines = match app.session.transcript() {
        Some(transcript) => {
            let last = transcript.segments().last();
            let length = last.map(|s| s.start + s.duration).unwrap_or_default();
            vec![
                Line::from(vec![
                    Span::styled("Source: ", label),
                    Span::raw(transcript.video_id.clone()),
                ]),
                Line::from(vec![
                    Span::styled("Language: ", label),
                    Span::raw(transcript.language.clone()),
                ]),
                Line::from(vec![
                    Span::styled("Segments: ", label),
                    Span::raw(format!(
                        "{} ({})",
                        transcript.segments().len(),
                        crate::core::format::format_timestamp(length)
                    )),
                ]),
                Line::from(vec![
                    Span::styled("Turns: ", label),
                    Span::raw(app.session.history().len().to_string()),
                ]),
                Line::from(Span::styled(
                    if app.thumbnail_brief.is_some() {
                        "Thumbnail brief ready (Ctrl+E)"
                    } else {
                        "Ctrl+S saves the transcript"
                    },
                    Style::default().fg(Color::DarkGray),
                )),
            ]
        }
        None => match (app.session.video_id(), app.session.last_error()) {
            (Some(video_id), _) => vec![Line::from(format!("Fetching {video_id}..."))],
            (None, Some(error)) => vec![
                Line::from(Span::styled("No transcript loaded", label)),
                Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))),
            ],
            (None, None) => vec![Line::from(Span::styled(
                "No transcript loaded",
                Style::default().fg(Color::DarkGray),
            ))],
        },
    };

    let info = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Transcript"));
    f.render_widget(info, area);
}

fn draw_browser(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(1)])
        .split(f.area());

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Filters
            Constraint::Length(3), // Search
        ])
        .split(chunks[0]);

    // Filter panel
    let filter_items: Vec<ListItem> = FileFilter::ALL
        .iter()
        .enumerate()
        .map(|(i, filter)| {
            let is_selected = *filter == app.filter;
            let style = if is_selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            let marker = if is_selected { "●" } else { "○" };

            ListItem::new(Line::from(Span::styled(
                format!("{marker} {} {}", i + 1, filter.label()),
                style,
            )))
        })
        .collect();

    let filters =
        List::new(filter_items).block(Block::default().borders(Borders::ALL).title("Filters"));
    f.render_widget(filters, left_chunks[0]);

    app.search_input.render(f, left_chunks[1]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(chunks[1]);

    app.file_list.render(f, right_chunks[0], "Saved files");

    let help = Paragraph::new(
        "[Enter] Open  [Del] Delete  [Space] Select  [/] Search  [1-4] Filters  [Esc] Back",
    )
    .style(Style::default().fg(Color::Gray))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, right_chunks[1]);
}

fn draw_viewer(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(f.area());

    if let Some(viewer) = &mut app.content_viewer {
        viewer.render(f, chunks[0]);
    }

    let help = Paragraph::new("[↑↓] Scroll  [PgUp/PgDn] Page  [Home/End] Top/Bottom  [Esc] Back")
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[1]);
}
