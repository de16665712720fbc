use crate::core::{ConversationTurn, Role};
use crossterm::event::{KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

const SCROLL_STEP: usize = 3;

/// Conversation pane. Scrolling is counted from the bottom so new turns stay
/// in view unless the user has scrolled back.
pub struct ConversationView {
    scroll: usize,
    max_scroll: usize,
    page: usize,
}

impl ConversationView {
    pub fn new() -> Self {
        Self {
            scroll: 0,
            max_scroll: 0,
            page: 10,
        }
    }

    pub fn follow(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = (self.scroll + lines).min(self.max_scroll);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Up => self.scroll_up(1),
            KeyCode::Down => self.scroll_down(1),
            KeyCode::PageUp => self.scroll_up(self.page),
            KeyCode::PageDown => self.scroll_down(self.page),
            _ => return false,
        }
        true
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll_up(SCROLL_STEP),
            MouseEventKind::ScrollDown => self.scroll_down(SCROLL_STEP),
            _ => return false,
        }
        true
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, turns: &[ConversationTurn], thinking: bool) {
        let width = area.width.saturating_sub(2) as usize;
        let height = area.height.saturating_sub(2) as usize;

        let lines = conversation_lines(turns, thinking, width);
        self.page = height.max(1);
        self.max_scroll = lines.len().saturating_sub(height);
        self.scroll = self.scroll.min(self.max_scroll);
        let top = self.max_scroll - self.scroll;

        let title = if self.scroll > 0 {
            format!("Conversation (↑ {} lines)", self.scroll)
        } else {
            "Conversation".to_string()
        };

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .scroll((top.min(u16::MAX as usize) as u16, 0));
        f.render_widget(paragraph, area);
    }
}

impl Default for ConversationView {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders every turn, already wrapped to `width`.
pub fn conversation_lines(
    turns: &[ConversationTurn],
    thinking: bool,
    width: usize,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if turns.is_empty() && !thinking {
        lines.push(Line::from(Span::styled(
            "No messages yet. Load a video, then ask about titles, tags or the thumbnail.",
            Style::default().fg(Color::DarkGray),
        )));
        return lines;
    }

    for turn in turns {
        let (label, color) = match turn.role {
            Role::User => ("You", Color::Green),
            Role::Assistant => ("Assistant", Color::Cyan),
        };
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));

        match turn.role {
            Role::User => {
                push_wrapped(&mut lines, &turn.content, width, "", "", Style::default())
            }
            Role::Assistant => lines.extend(markdown_to_lines(&turn.content, width)),
        }
        lines.push(Line::default());
    }

    if thinking {
        lines.push(Line::from(Span::styled(
            "Assistant is thinking...",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// Minimal markdown layout for model replies: headings, lists, code blocks,
/// rules and tables. Inline emphasis is flattened to plain text.
pub fn markdown_to_lines(markdown: &str, width: usize) -> Vec<Line<'static>> {
    let width = width.max(10);
    let heading = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let code = Style::default().fg(Color::Yellow);
    let dim = Style::default().fg(Color::DarkGray);

    let mut lines = Vec::new();
    let mut text = String::new();
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut first_indent = String::new();
    let mut rest_indent = String::new();
    let mut in_heading = false;
    let mut in_cell = false;
    let mut cell = String::new();
    let mut row: Vec<String> = Vec::new();

    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                flush(&mut lines, &mut text, width, &mut first_indent, &rest_indent);
                in_heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                push_wrapped(&mut lines, &text, width, "", "", heading);
                text.clear();
                in_heading = false;
                blank(&mut lines);
            }
            Event::Start(Tag::List(start)) => {
                flush(&mut lines, &mut text, width, &mut first_indent, &rest_indent);
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                flush(&mut lines, &mut text, width, &mut first_indent, &rest_indent);
                lists.pop();
                if lists.is_empty() {
                    blank(&mut lines);
                }
            }
            Event::Start(Tag::Item) => {
                flush(&mut lines, &mut text, width, &mut first_indent, &rest_indent);
                let indent = "  ".repeat(lists.len().saturating_sub(1));
                let marker = match lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                rest_indent = format!("{indent}{}", " ".repeat(marker.chars().count()));
                first_indent = format!("{indent}{marker}");
            }
            Event::End(TagEnd::Item) => {
                flush(&mut lines, &mut text, width, &mut first_indent, &rest_indent);
                first_indent.clear();
                rest_indent.clear();
            }
            Event::End(TagEnd::Paragraph) => {
                flush(&mut lines, &mut text, width, &mut first_indent, &rest_indent);
                if lists.is_empty() {
                    blank(&mut lines);
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                flush(&mut lines, &mut text, width, &mut first_indent, &rest_indent);
            }
            Event::End(TagEnd::CodeBlock) => {
                for line in text.lines() {
                    lines.push(Line::from(Span::styled(format!("    {line}"), code)));
                }
                text.clear();
                blank(&mut lines);
            }
            Event::Start(Tag::TableCell) => {
                in_cell = true;
                cell.clear();
            }
            Event::End(TagEnd::TableCell) => {
                in_cell = false;
                row.push(cell.trim().to_string());
            }
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                let style = if matches!(event, Event::End(TagEnd::TableHead)) {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                push_wrapped(&mut lines, &row.join(" │ "), width, "", "  ", style);
                row.clear();
            }
            Event::End(TagEnd::Table) => blank(&mut lines),
            Event::Text(t) | Event::Code(t) => {
                if in_cell {
                    cell.push_str(&t);
                } else {
                    text.push_str(&t);
                }
            }
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            Event::Rule => {
                flush(&mut lines, &mut text, width, &mut first_indent, &rest_indent);
                lines.push(Line::from(Span::styled("─".repeat(width), dim)));
            }
            _ => {}
        }
    }

    if in_heading {
        push_wrapped(&mut lines, &text, width, "", "", heading);
    } else {
        flush(&mut lines, &mut text, width, &mut first_indent, &rest_indent);
    }
    while lines.last().is_some_and(|l| l.spans.is_empty()) {
        lines.pop();
    }
    lines
}

/// Emits pending text with the current list indentation. Later blocks in the
/// same item continue at the hanging indent.
fn flush(
    lines: &mut Vec<Line<'static>>,
    text: &mut String,
    width: usize,
    first_indent: &mut String,
    rest_indent: &str,
) {
    if text.trim().is_empty() {
        text.clear();
        return;
    }
    push_wrapped(lines, text, width, first_indent, rest_indent, Style::default());
    text.clear();
    *first_indent = rest_indent.to_string();
}

fn push_wrapped(
    lines: &mut Vec<Line<'static>>,
    text: &str,
    width: usize,
    first_indent: &str,
    rest_indent: &str,
    style: Style,
) {
    let options = textwrap::Options::new(width.max(1))
        .initial_indent(first_indent)
        .subsequent_indent(rest_indent);
    for line in textwrap::wrap(text.trim(), options) {
        lines.push(Line::from(Span::styled(line.into_owned(), style)));
    }
}

fn blank(lines: &mut Vec<Line<'static>>) {
    if lines.last().is_some_and(|l| !l.spans.is_empty()) {
        lines.push(Line::default());
    }
}
