use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

const SPINNER: [&str; 4] = ["⠋", "⠙", "⠹", "⠸"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Busy,
    Error,
}

/// Current activity line plus a short, timestamped activity log.
pub struct StatusPanel {
    pub message: String,
    pub level: StatusLevel,
    pub logs: Vec<String>,
    pub max_logs: usize,
    ticks: usize,
}

impl StatusPanel {
    pub fn new() -> Self {
        Self {
            message: String::new(),
            level: StatusLevel::Info,
            logs: Vec::new(),
            max_logs: 50,
            ticks: 0,
        }
    }

    pub fn set(&mut self, level: StatusLevel, message: impl Into<String>) {
        let message = message.into();
        self.add_log(message.clone());
        self.level = level;
        self.message = message;
    }

    pub fn add_log(&mut self, log: String) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        let log_entry = format!("[{timestamp}] {log}");

        self.logs.push(log_entry);

        if self.logs.len() > self.max_logs {
            self.logs.remove(0);
        }
    }

    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // Current status
                Constraint::Min(1),    // Logs
            ])
            .split(area);

        let (prefix, style) = match self.level {
            StatusLevel::Info => ("", Style::default().fg(Color::Green)),
            StatusLevel::Busy => (
                SPINNER[self.ticks % SPINNER.len()],
                Style::default().fg(Color::Yellow),
            ),
            StatusLevel::Error => (
                "✗",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
        };
        let text = if prefix.is_empty() {
            self.message.clone()
        } else {
            format!("{prefix} {}", self.message)
        };
        let status = Paragraph::new(text)
            .style(style)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Status"));
        f.render_widget(status, chunks[0]);

        let visible = chunks[1].height.saturating_sub(2) as usize;
        let log_lines: Vec<Line> = self
            .logs
            .iter()
            .skip(self.logs.len().saturating_sub(visible))
            .map(|log| Line::from(Span::styled(log.as_str(), Style::default().fg(Color::Gray))))
            .collect();

        let logs_paragraph =
            Paragraph::new(log_lines).block(Block::default().borders(Borders::ALL).title("Log"));
        f.render_widget(logs_paragraph, chunks[1]);
    }

    pub fn reset(&mut self) {
        self.message.clear();
        self.level = StatusLevel::Info;
        self.logs.clear();
    }
}

impl Default for StatusPanel {
    fn default() -> Self {
        Self::new()
    }
}
