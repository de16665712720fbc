use crate::tui::components::chat::markdown_to_lines;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use std::path::PathBuf;

/// Read-only view of a saved file. Conversation exports are laid out as
/// markdown; transcripts get their timestamps dimmed.
pub struct Viewer {
    pub content: String,
    pub path: PathBuf,
    pub scroll: usize,
    total: usize,
    page: usize,
}

impl Viewer {
    pub fn new(content: String, path: PathBuf) -> Self {
        let total = content.lines().count();
        Self {
            content,
            path,
            scroll: 0,
            total,
            page: 1,
        }
    }

    fn is_markdown(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "md")
    }

    fn max_scroll(&self) -> usize {
        self.total.saturating_sub(self.page)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.scroll = match key.code {
            KeyCode::Up => self.scroll.saturating_sub(1),
            KeyCode::Down => self.scroll + 1,
            KeyCode::PageUp => self.scroll.saturating_sub(self.page),
            KeyCode::PageDown => self.scroll + self.page,
            KeyCode::Home => 0,
            KeyCode::End => self.max_scroll(),
            _ => return false,
        }
        .min(self.max_scroll());
        true
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(2) as usize;
        self.page = area.height.saturating_sub(2).max(1) as usize;

        let lines = layout(&self.content, self.is_markdown(), width);
        self.total = lines.len();
        self.scroll = self.scroll.min(self.max_scroll());

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let title = if self.total > self.page {
            format!(
                "{name} (lines {}-{} of {})",
                self.scroll + 1,
                (self.scroll + self.page).min(self.total),
                self.total
            )
        } else {
            name
        };

        let visible: Vec<Line> = lines.into_iter().skip(self.scroll).take(self.page).collect();
        let paragraph =
            Paragraph::new(visible).block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(paragraph, area);
    }
}

fn layout(content: &str, markdown: bool, width: usize) -> Vec<Line<'_>> {
    if markdown {
        return markdown_to_lines(content, width);
    }

    content
        .lines()
        .map(|line| match line.split_once("] ") {
            Some((stamp, text)) if line.starts_with('[') => Line::from(vec![
                Span::styled(format!("{stamp}] "), Style::default().fg(Color::DarkGray)),
                Span::raw(text),
            ]),
            _ => Line::from(line),
        })
        .collect()
}
