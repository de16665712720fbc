use crate::core::storage::{FileEntry, FileType};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
};

/// Saved files with a highlight cursor and per-row check marks for bulk delete.
pub struct FileList {
    pub items: Vec<FileEntry>,
    pub state: ListState,
    pub checked: Vec<bool>,
    page: usize,
}

impl FileList {
    pub fn new(items: Vec<FileEntry>) -> Self {
        let mut list = Self {
            items: Vec::new(),
            state: ListState::default(),
            checked: Vec::new(),
            page: 10,
        };
        list.update_items(items);
        list
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let last = self.items.len().saturating_sub(1);
        let current = self.state.selected().unwrap_or(0);
        match key.code {
            KeyCode::Up => self.previous(),
            KeyCode::Down => self.next(),
            KeyCode::PageUp => self.select_index(current.saturating_sub(self.page)),
            KeyCode::PageDown => self.select_index(current + self.page),
            KeyCode::Home => self.select_index(0),
            KeyCode::End => self.select_index(last),
            KeyCode::Char(' ') => self.toggle_checked(),
            _ => return false,
        }
        true
    }

    /// Wheel scrolling moves the cursor without wrapping.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        let current = self.state.selected().unwrap_or(0);
        match mouse.kind {
            MouseEventKind::ScrollUp => self.select_index(current.saturating_sub(1)),
            MouseEventKind::ScrollDown => self.select_index(current + 1),
            _ => return false,
        }
        true
    }

    pub fn next(&mut self) {
        if let Some(i) = self.state.selected() {
            self.select_index((i + 1) % self.items.len().max(1));
        }
    }

    pub fn previous(&mut self) {
        if let Some(i) = self.state.selected() {
            let i = if i == 0 { self.items.len() } else { i };
            self.select_index(i - 1);
        }
    }

    /// Clamps to the last entry; no-op on an empty list.
    pub fn select_index(&mut self, index: usize) {
        if self.items.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(index.min(self.items.len() - 1)));
        }
    }

    pub fn toggle_checked(&mut self) {
        if let Some(mark) = self.state.selected().and_then(|i| self.checked.get_mut(i)) {
            *mark = !*mark;
        }
    }

    pub fn get_selected(&self) -> Option<&FileEntry> {
        self.state.selected().and_then(|i| self.items.get(i))
    }

    /// Checked entries, or the highlighted one when nothing is checked.
    pub fn get_selected_items(&self) -> Vec<&FileEntry> {
        if !self.checked.contains(&true) {
            return self.get_selected().into_iter().collect();
        }

        self.items
            .iter()
            .zip(&self.checked)
            .filter_map(|(file, &checked)| checked.then_some(file))
            .collect()
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, title: &str) {
        self.page = area.height.saturating_sub(2).max(1) as usize;

        let items: Vec<ListItem> = self
            .items
            .iter()
            .zip(&self.checked)
            .map(|(file, &checked)| {
                let mark = if checked { "☑ " } else { "☐ " };
                let icon = match file.file_type {
                    FileType::Transcript => "📄",
                    FileType::Conversation => "💬",
                    FileType::Thumbnail => "🖼",
                };
                let modified: DateTime<Local> = file.modified.into();

                ListItem::new(Line::from(vec![
                    Span::raw(mark),
                    Span::raw(format!("{icon} ")),
                    Span::styled(file.name.as_str(), Style::default().fg(Color::White)),
                    Span::styled(
                        format!(
                            "  {}  {}",
                            modified.format("%Y-%m-%d %H:%M"),
                            file.size_label()
                        ),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();

        let title = format!("{title} ({})", self.items.len());
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            );

        f.render_stateful_widget(list, area, &mut self.state);
    }

    /// Replaces the entries, clearing check marks and keeping the cursor in range.
    pub fn update_items(&mut self, items: Vec<FileEntry>) {
        let cursor = self.state.selected().unwrap_or(0);
        self.checked = vec![false; items.len()];
        self.items = items;
        self.select_index(cursor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn entry(name: &str) -> FileEntry {
        FileEntry {
            path: PathBuf::from(name),
            name: name.to_string(),
            file_type: FileType::Transcript,
            size: 2048,
            modified: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn navigation_wraps_around() {
        let mut list = FileList::new(vec![entry("a"), entry("b"), entry("c")]);
        list.previous();
        assert_eq!(list.get_selected().unwrap().name, "c");
        list.next();
        assert_eq!(list.get_selected().unwrap().name, "a");
    }

    #[test]
    fn highlighted_entry_is_used_when_nothing_is_checked() {
        let mut list = FileList::new(vec![entry("a"), entry("b")]);
        list.next();
        let names: Vec<&str> = list
            .get_selected_items()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, ["b"]);

        list.toggle_checked();
        list.previous();
        list.toggle_checked();
        assert_eq!(list.get_selected_items().len(), 2);
    }

    #[test]
    fn shrinking_the_list_clamps_selection() {
        let mut list = FileList::new(vec![entry("a"), entry("b"), entry("c")]);
        list.handle_key(KeyEvent::new(KeyCode::End, KeyModifiers::NONE));
        assert_eq!(list.get_selected().unwrap().name, "c");
        list.update_items(vec![entry("a")]);
        assert_eq!(list.get_selected().unwrap().name, "a");
        list.update_items(Vec::new());
        assert!(list.get_selected().is_none());
    }

    #[test]
    fn empty_list_ignores_navigation() {
        let mut list = FileList::new(Vec::new());
        list.next();
        list.previous();
        list.toggle_checked();
        assert!(list.get_selected_items().is_empty());
    }
}
