use crate::config::{BackendKind, Settings};
use crate::core::{
    ANALYSIS_REQUEST, Backend, Effect, FileEntry, FileType, PromptBuilder, SessionEvent,
    SessionState, Session, StorageService, Transcript, TranscriptProvider, YoutubeTranscripts,
    extract_thumbnail_prompt, generate_reply,
};
use crate::error::{Error, Result};
use crate::tui::components::{
    ConversationView, FileList, InputField, StatusLevel, StatusPanel, Viewer,
};
use crate::tui::events::AppEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Chat,
    Browser,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Url,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFilter {
    All,
    Transcripts,
    Conversations,
    Thumbnails,
}

impl FileFilter {
    pub const ALL: [FileFilter; 4] = [
        FileFilter::All,
        FileFilter::Transcripts,
        FileFilter::Conversations,
        FileFilter::Thumbnails,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FileFilter::All => "All",
            FileFilter::Transcripts => "Transcripts",
            FileFilter::Conversations => "Conversations",
            FileFilter::Thumbnails => "Thumbnails",
        }
    }

    pub fn matches(self, file_type: FileType) -> bool {
        match self {
            FileFilter::All => true,
            FileFilter::Transcripts => file_type == FileType::Transcript,
            FileFilter::Conversations => file_type == FileType::Conversation,
            FileFilter::Thumbnails => file_type == FileType::Thumbnail,
        }
    }
}

/// Results sent back by background tasks.
#[derive(Debug)]
pub enum Update {
    TranscriptFetched { epoch: u64, outcome: Result<Transcript> },
    ReplyReceived { epoch: u64, outcome: Result<String> },
    Saved { what: &'static str, outcome: Result<PathBuf> },
}

pub struct App {
    pub screen: Screen,
    pub should_quit: bool,
    pub focus: Focus,
    pub session: Session,
    pub backend_label: String,

    // Chat screen
    pub url_input: InputField,
    pub message_input: InputField,
    pub conversation: ConversationView,
    pub status: StatusPanel,
    pub thumbnail_brief: Option<String>,
    pending_message: Option<String>,

    // Browser screen
    pub file_list: FileList,
    pub search_input: InputField,
    pub filter: FileFilter,

    // Viewer screen
    pub content_viewer: Option<Viewer>,

    // Services
    provider: YoutubeTranscripts,
    model: Backend,
    prompts: PromptBuilder,
    storage: StorageService,

    // Async communication
    updates_tx: mpsc::UnboundedSender<Update>,
    updates_rx: mpsc::UnboundedReceiver<Update>,
}

impl App {
    pub async fn new(settings: &Settings) -> Result<Self> {
        let provider = settings.transcripts()?;
        let model = settings.connect_model().await?;
        let storage = settings.storage();
        let files = storage.list_files().unwrap_or_default();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        let backend_label = match settings.backend {
            BackendKind::Bedrock => format!("Bedrock · {}", settings.model_id),
            BackendKind::Openai => format!("OpenAI · {}", settings.openai_model),
        };

        let mut url_input = InputField::new(
            "Video URL",
            "https://youtube.com/watch?v=... or a path to a .txt file",
        );
        url_input.focused = true;

        let mut status = StatusPanel::new();
        status.set(
            StatusLevel::Info,
            "Paste a YouTube link and press Enter to load its transcript",
        );

        Ok(Self {
            screen: Screen::Chat,
            should_quit: false,
            focus: Focus::Url,
            session: Session::new(),
            backend_label,

            url_input,
            message_input: InputField::new("Message", "Ask about titles, tags, the thumbnail..."),
            conversation: ConversationView::new(),
            status,
            thumbnail_brief: None,
            pending_message: None,

            file_list: FileList::new(files),
            search_input: InputField::new("Search", "Filter files..."),
            filter: FileFilter::All,

            content_viewer: None,

            provider,
            model,
            prompts: settings.prompts(),
            storage,

            updates_tx,
            updates_rx,
        })
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key)?,
            AppEvent::Key(_) => {}
            AppEvent::Mouse(mouse) => self.handle_mouse(mouse),
            AppEvent::Tick => self.handle_tick()?,
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            self.should_quit = true;
            return Ok(());
        }

        match &self.screen {
            Screen::Chat => self.handle_chat_key(key),
            Screen::Browser => self.handle_browser_key(key),
            Screen::Viewer => self.handle_viewer_key(key),
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('a') if ctrl => self.send_message(ANALYSIS_REQUEST.to_string(), false),
            KeyCode::Char('s') if ctrl => self.save_transcript(),
            KeyCode::Char('e') if ctrl => self.export_conversation(),
            KeyCode::Char('l') if ctrl => self.clear_conversation(),
            KeyCode::Char('f') if ctrl => self.open_browser(),
            KeyCode::Tab | KeyCode::BackTab => self.toggle_focus(),
            KeyCode::Enter => match self.focus {
                Focus::Url => self.submit_url(),
                Focus::Message => self.submit_message(),
            },
            KeyCode::Up | KeyCode::Down | KeyCode::PageUp | KeyCode::PageDown => {
                self.conversation.handle_key(key);
            }
            _ => {
                match self.focus {
                    Focus::Url => self.url_input.handle_key(key),
                    Focus::Message => self.message_input.handle_key(key),
                };
            }
        }
        Ok(())
    }

    fn handle_browser_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.search_input.focused {
            match key.code {
                KeyCode::Esc => {
                    self.search_input.focused = false;
                    self.search_input.clear();
                    self.apply_filter();
                }
                KeyCode::Enter => self.search_input.focused = false,
                _ => {
                    self.search_input.handle_key(key);
                    self.apply_filter();
                }
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Esc => self.screen = Screen::Chat,
            KeyCode::Enter => {
                if let Some(file) = self.file_list.get_selected().cloned()
                    && let Err(e) = self.open_file(file)
                {
                    self.report_error(&e);
                }
            }
            KeyCode::Delete => self.delete_selected_files(),
            KeyCode::Char('/') => self.search_input.focused = true,
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                self.filter = FileFilter::ALL[index];
                self.apply_filter();
            }
            _ => {
                self.file_list.handle_key(key);
            }
        }
        Ok(())
    }

    fn handle_viewer_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.screen = Screen::Browser;
                self.content_viewer = None;
            }
            _ => {
                if let Some(viewer) = &mut self.content_viewer {
                    viewer.handle_key(key);
                }
            }
        }
        Ok(())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match self.screen {
            Screen::Chat => {
                self.conversation.handle_mouse(mouse);
            }
            Screen::Browser => {
                self.file_list.handle_mouse(mouse);
            }
            Screen::Viewer => {}
        }
    }

    fn handle_tick(&mut self) -> Result<()> {
        self.status.tick();

        let mut updates = Vec::new();
        while let Ok(update) = self.updates_rx.try_recv() {
            updates.push(update);
        }
        for update in updates {
            self.apply_update(update);
        }
        self.sync_inputs();
        Ok(())
    }

    fn apply_update(&mut self, update: Update) {
        match update {
            Update::TranscriptFetched { epoch, outcome } => {
                let current = epoch == self.session.epoch();
                match self.session.transcript_loaded(epoch, outcome) {
                    Ok(()) if current => {
                        if let Some(transcript) = self.session.transcript() {
                            let message = format!(
                                "Transcript loaded: {} segments ({}). Ask away, or press Ctrl+A for a full analysis",
                                transcript.segments().len(),
                                transcript.language
                            );
                            self.status.set(StatusLevel::Info, message);
                        }
                        self.set_focus(Focus::Message);
                    }
                    Ok(()) => {}
                    Err(e) => self.report_error(&e),
                }
            }
            Update::ReplyReceived { epoch, outcome } => {
                let current = epoch == self.session.epoch();
                match self.session.response_received(epoch, outcome) {
                    Ok(()) if current => {
                        self.pending_message = None;
                        let brief = self
                            .session
                            .history()
                            .last()
                            .and_then(|turn| extract_thumbnail_prompt(&turn.content));
                        if brief.is_some() {
                            self.thumbnail_brief = brief;
                        }
                        self.status.set(StatusLevel::Info, "Reply received");
                        self.conversation.follow();
                    }
                    Ok(()) => {}
                    Err(e) => {
                        if let Some(text) = self.pending_message.take()
                            && self.message_input.value.is_empty()
                        {
                            self.message_input.set_value(&text);
                        }
                        self.report_error(&e);
                    }
                }
            }
            Update::Saved { what, outcome } => match outcome {
                Ok(path) => {
                    self.status
                        .set(StatusLevel::Info, format!("{what} saved to {}", path.display()));
                    if let Ok(files) = self.storage.list_files() {
                        self.file_list.update_items(files);
                    }
                }
                Err(e) => self.report_error(&e),
            },
        }
    }

    fn submit_url(&mut self) {
        if !self.url_input.enabled {
            return;
        }
        let value = self.url_input.value.trim().to_string();
        if value.is_empty() {
            return;
        }

        let path = Path::new(&value);
        if is_text_document(path) {
            self.load_document(path);
        } else {
            self.dispatch(SessionEvent::SubmitVideo(value));
        }
    }

    fn load_document(&mut self, path: &Path) {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                self.report_error(&e.into());
                return;
            }
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.txt".to_string());

        if self.dispatch(SessionEvent::LoadDocument { name: name.clone(), content }) {
            self.status.set(
                StatusLevel::Info,
                format!("Document {name} loaded. Ask away, or press Ctrl+A for a full analysis"),
            );
            self.set_focus(Focus::Message);
        }
    }

    fn submit_message(&mut self) {
        if !self.message_input.is_valid() {
            return;
        }
        let text = self.message_input.value.trim().to_string();
        self.send_message(text, true);
    }

    /// Typed messages are restored into the input if the model call fails.
    fn send_message(&mut self, text: String, typed: bool) {
        if self.refuse_while_busy() {
            return;
        }
        if self.dispatch(SessionEvent::SubmitMessage(text.clone())) {
            if typed {
                self.message_input.clear();
                self.pending_message = Some(text);
            }
            self.conversation.follow();
        }
    }

    fn clear_conversation(&mut self) {
        if self.refuse_while_busy() {
            return;
        }
        if self.dispatch(SessionEvent::Clear) {
            self.status.reset();
            self.status.set(StatusLevel::Info, "Conversation cleared");
            self.set_focus(Focus::Url);
        }
    }

    /// Runs one event through the session and starts whatever work it asks for.
    fn dispatch(&mut self, event: SessionEvent) -> bool {
        let resets = !matches!(event, SessionEvent::SubmitMessage(_));
        if resets {
            self.thumbnail_brief = None;
            self.pending_message = None;
            self.conversation.follow();
        }

        let accepted = match self.session.handle(event) {
            Ok(effect) => {
                self.run_effect(effect);
                true
            }
            Err(e) => {
                self.report_error(&e);
                false
            }
        };
        self.sync_inputs();
        accepted
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::FetchTranscript(ticket) => {
                self.status.set(
                    StatusLevel::Busy,
                    format!("Video received. Fetching the transcript for {}...", ticket.video_id),
                );

                let provider = self.provider.clone();
                let tx = self.updates_tx.clone();
                tokio::spawn(async move {
                    let outcome = provider.fetch(&ticket.video_id).await;
                    let _ = tx.send(Update::TranscriptFetched {
                        epoch: ticket.epoch,
                        outcome,
                    });
                });
            }
            Effect::CallModel(ticket) => {
                self.status.set(
                    StatusLevel::Busy,
                    format!("Currently reviewing with {}...", self.backend_label),
                );

                let model = self.model.clone();
                let prompts = self.prompts.clone();
                let tx = self.updates_tx.clone();
                tokio::spawn(async move {
                    let outcome = generate_reply(&prompts, &model, &ticket.request).await;
                    let _ = tx.send(Update::ReplyReceived {
                        epoch: ticket.epoch,
                        outcome,
                    });
                });
            }
        }
    }

    fn save_transcript(&mut self) {
        let Some(transcript) = self.session.transcript().cloned() else {
            self.status.set(StatusLevel::Error, "No transcript loaded yet");
            return;
        };

        let storage = self.storage.clone();
        let tx = self.updates_tx.clone();
        tokio::spawn(async move {
            let outcome = storage.save_transcript(&transcript).await;
            let _ = tx.send(Update::Saved {
                what: "Transcript",
                outcome,
            });
        });
    }

    fn export_conversation(&mut self) {
        if self.session.state() == SessionState::AwaitingModelResponse {
            self.status
                .set(StatusLevel::Error, "Wait for the reply before exporting");
            return;
        }
        let Some(video_id) = self.session.video_id().map(str::to_string) else {
            self.status.set(StatusLevel::Error, "Nothing to export yet");
            return;
        };

        let turns = self.session.history().to_vec();
        let brief = self.thumbnail_brief.clone();
        let storage = self.storage.clone();
        let tx = self.updates_tx.clone();
        tokio::spawn(async move {
            let outcome = storage.save_conversation(&video_id, &turns).await;
            let _ = tx.send(Update::Saved {
                what: "Conversation",
                outcome,
            });

            if let Some(brief) = brief {
                let outcome = storage.save_thumbnail_prompt(&video_id, &brief).await;
                let _ = tx.send(Update::Saved {
                    what: "Thumbnail brief",
                    outcome,
                });
            }
        });
    }

    fn report_error(&mut self, error: &Error) {
        tracing::warn!(error = %error, state = %self.session.state(), "action failed");
        self.status.set(StatusLevel::Error, error.user_message());
    }

    fn toggle_focus(&mut self) {
        let next = match self.focus {
            Focus::Url => Focus::Message,
            Focus::Message => Focus::Url,
        };
        self.set_focus(next);
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        self.url_input.focused = focus == Focus::Url;
        self.message_input.focused = focus == Focus::Message;
    }

    fn refuse_while_busy(&mut self) -> bool {
        let state = self.session.state();
        if state.is_busy() {
            self.status
                .set(StatusLevel::Error, format!("Still {state}; wait for it to finish"));
        }
        state.is_busy()
    }

    /// Input stays locked while a transcript or reply is outstanding.
    fn sync_inputs(&mut self) {
        let busy = self.session.state().is_busy();
        self.url_input.enabled = !busy;
        self.message_input.enabled = !busy && self.session.state() == SessionState::Ready;
    }

    fn open_browser(&mut self) {
        match self.storage.list_files() {
            Ok(files) => {
                let files = self.visible_files(files);
                self.file_list.update_items(files);
                self.screen = Screen::Browser;
            }
            Err(e) => self.report_error(&e),
        }
    }

    fn apply_filter(&mut self) {
        let files = self.visible_files(self.storage.list_files().unwrap_or_default());
        self.file_list.update_items(files);
    }

    fn visible_files(&self, files: Vec<FileEntry>) -> Vec<FileEntry> {
        let search = self.search_input.value.trim().to_lowercase();
        files
            .into_iter()
            .filter(|file| self.filter.matches(file.file_type))
            .filter(|file| search.is_empty() || file.name.to_lowercase().contains(&search))
            .collect()
    }

    fn open_file(&mut self, file: FileEntry) -> Result<()> {
        let content = std::fs::read_to_string(&file.path)?;
        self.content_viewer = Some(Viewer::new(content, file.path.clone()));
        self.screen = Screen::Viewer;
        Ok(())
    }

    fn delete_selected_files(&mut self) {
        let paths: Vec<PathBuf> = self
            .file_list
            .get_selected_items()
            .into_iter()
            .map(|file| file.path.clone())
            .collect();

        for path in &paths {
            if let Err(e) = self.storage.delete_file(path) {
                self.report_error(&e);
                break;
            }
        }
        if !paths.is_empty() {
            self.status
                .set(StatusLevel::Info, format!("Deleted {} file(s)", paths.len()));
        }
        self.apply_filter();
    }
}

fn is_text_document(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DecodingConfig;

    async fn app(data_dir: &Path) -> App {
        let settings = Settings {
            backend: BackendKind::Bedrock,
            region: Some("us-east-1".to_string()),
            model_id: "test-model".to_string(),
            openai_model: "test-model".to_string(),
            decoding: DecodingConfig {
                temperature: 0.5,
                max_output_tokens: 256,
            },
            input_budget: 10_000,
            languages: vec!["en".to_string()],
            data_dir: data_dir.to_path_buf(),
        };
        App::new(&settings).await.unwrap()
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, modifiers))
    }

    #[tokio::test]
    async fn busy_session_ignores_new_video_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "first line\nsecond line").unwrap();

        let mut app = app(dir.path()).await;
        app.load_document(&notes);
        assert_eq!(app.session.state(), SessionState::Ready);

        app.message_input.set_value("q1");
        app.handle_event(press(KeyCode::Enter, KeyModifiers::NONE)).unwrap();
        assert_eq!(app.session.state(), SessionState::AwaitingModelResponse);
        assert!(!app.url_input.enabled);

        app.handle_event(press(KeyCode::Tab, KeyModifiers::NONE)).unwrap();
        assert_eq!(app.focus, Focus::Url);
        app.url_input.set_value("https://youtu.be/dQw4w9WgXcQ");
        app.handle_event(press(KeyCode::Enter, KeyModifiers::NONE)).unwrap();
        assert_eq!(app.session.state(), SessionState::AwaitingModelResponse);
        assert_eq!(app.session.history().len(), 1);

        app.handle_event(press(KeyCode::Char('l'), KeyModifiers::CONTROL)).unwrap();
        assert_eq!(app.session.state(), SessionState::AwaitingModelResponse);
        assert_eq!(app.session.history().len(), 1);

        app.handle_event(press(KeyCode::Char('a'), KeyModifiers::CONTROL)).unwrap();
        assert_eq!(app.session.history().len(), 1);
        assert_eq!(app.status.level, StatusLevel::Error);
    }

    #[test]
    fn filters_match_their_file_type() {
        assert!(FileFilter::All.matches(FileType::Thumbnail));
        assert!(FileFilter::Transcripts.matches(FileType::Transcript));
        assert!(!FileFilter::Transcripts.matches(FileType::Conversation));
        assert!(FileFilter::Conversations.matches(FileType::Conversation));
        assert!(!FileFilter::Thumbnails.matches(FileType::Transcript));
    }

    #[test]
    fn only_existing_txt_files_count_as_documents() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.TXT");
        std::fs::write(&notes, "hello").unwrap();
        let markdown = dir.path().join("notes.md");
        std::fs::write(&markdown, "hello").unwrap();

        assert!(is_text_document(&notes));
        assert!(!is_text_document(&markdown));
        assert!(!is_text_document(&dir.path().join("missing.txt")));
        assert!(!is_text_document(Path::new("https://youtu.be/dQw4w9WgXcQ")));
    }
}
