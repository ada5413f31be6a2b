use ratatui::layout::Rect;
use ratatui::style::Color;
use std::path::Path;
use tokio::task::JoinHandle;

use crate::client::CompletionClient;
use crate::config::Settings;
use crate::conversation::{Conversation, Message, Role};
use crate::error::ChatError;
use crate::transcript::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Explicit theme value passed into the renderer; there is no process-wide
/// theme state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn fg(self) -> Color {
        match self {
            Theme::Light => Color::Black,
            Theme::Dark => Color::White,
        }
    }

    pub fn bg(self) -> Color {
        match self {
            Theme::Light => Color::White,
            Theme::Dark => Color::Reset,
        }
    }

    pub fn user(self) -> Color {
        match self {
            Theme::Light => Color::Blue,
            Theme::Dark => Color::Cyan,
        }
    }

    pub fn assistant(self) -> Color {
        match self {
            Theme::Light => Color::Green,
            Theme::Dark => Color::Magenta,
        }
    }

    pub fn dim(self) -> Color {
        Color::DarkGray
    }
}

/// What the path prompt popup is collecting a path for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPurpose {
    SaveTranscript,
    OpenTranscript,
}

#[derive(Debug)]
pub struct PathPrompt {
    pub purpose: PathPurpose,
    pub input: String,
    pub cursor: usize,
}

pub const SETTINGS_FIELDS: [&str; 3] = ["API Key", "API Base URL", "Model"];

/// In-progress edit of the settings triple, one field per row.
#[derive(Debug)]
pub struct SettingsEditor {
    pub values: [String; 3],
    pub cursors: [usize; 3],
    pub selected: usize,
}

impl SettingsEditor {
    pub fn from_settings(settings: &Settings) -> Self {
        let values = [
            settings.api_key.clone(),
            settings.api_base.clone(),
            settings.model.clone(),
        ];
        let cursors = [
            values[0].chars().count(),
            values[1].chars().count(),
            values[2].chars().count(),
        ];
        Self {
            values,
            cursors,
            selected: 0,
        }
    }

    pub fn to_settings(&self) -> Settings {
        Settings::new(&self.values[0], &self.values[1], &self.values[2])
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub theme: Theme,

    // Prompt input
    pub input: String,
    pub cursor: usize,

    // Dialogue state
    pub conversation: Conversation,
    pub transcript: Transcript,

    // Chat pane scroll state (dimensions updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub total_chat_lines: u16,
    pub chat_area: Option<Rect>,

    // In-flight completion (at most one)
    pub pending: Option<JoinHandle<Result<String, ChatError>>>,
    pub loading: bool,
    pub animation_frame: u8,

    // Status/error line, cleared on the next action
    pub status: Option<String>,

    // Popups
    pub settings_editor: Option<SettingsEditor>,
    pub path_prompt: Option<PathPrompt>,

    // Display-only copy of the configured model for the header; the send
    // path always reloads settings from disk.
    pub model_label: String,

    pub client: CompletionClient,
}

impl App {
    pub fn new() -> Self {
        let model_label = Settings::load()
            .map(|s| s.model)
            .unwrap_or_default();

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            theme: Theme::Dark,

            input: String::new(),
            cursor: 0,

            conversation: Conversation::new(),
            transcript: Transcript::new(),

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            total_chat_lines: 0,
            chat_area: None,

            pending: None,
            loading: false,
            animation_frame: 0,

            status: None,

            settings_editor: None,
            path_prompt: None,

            model_label,

            client: CompletionClient::new(),
        }
    }

    /// Send the typed prompt. Settings are reloaded from disk on every send
    /// and the send is rejected before any append or network call if the
    /// triple is incomplete. At most one request is in flight.
    pub fn submit_prompt(&mut self) {
        if self.input.trim().is_empty() || self.pending.is_some() {
            return;
        }
        self.status = None;

        let settings = match Settings::load() {
            Ok(settings) => settings,
            Err(e) => {
                self.status = Some(e.to_string());
                return;
            }
        };
        self.submit_with_settings(settings);
    }

    /// Validate then dispatch. Rejection happens before the user message is
    /// appended, so an incomplete config mutates nothing.
    pub fn submit_with_settings(&mut self, settings: Settings) {
        if !settings.is_complete() {
            self.status = Some(ChatError::ConfigIncomplete.to_string());
            return;
        }

        let prompt = std::mem::take(&mut self.input);
        self.cursor = 0;

        self.conversation.push(Message::user(prompt.clone()));
        self.transcript.append(Role::User, &prompt);

        let client = self.client.clone();
        let history = self.conversation.messages().to_vec();
        self.pending = Some(tokio::spawn(async move {
            client
                .complete(
                    &settings.api_key,
                    &settings.api_base,
                    &settings.model,
                    &history,
                )
                .await
        }));

        self.loading = true;
        self.scroll_to_bottom();
    }

    /// Apply a finished completion task, if any. Called from the event loop
    /// so conversation and transcript only ever mutate on this context. On
    /// failure the user's message stays appended; no assistant entry is added.
    pub async fn poll_completion(&mut self) {
        let finished = self
            .pending
            .as_ref()
            .map(|task| task.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.pending.take() {
            self.loading = false;
            match task.await {
                Ok(Ok(answer)) => {
                    self.conversation.push(Message::assistant(answer.clone()));
                    self.transcript.append(Role::Assistant, &answer);
                    self.scroll_to_bottom();
                }
                Ok(Err(e)) => {
                    self.status = Some(e.to_string());
                }
                Err(e) => {
                    self.status = Some(format!("completion task failed: {}", e));
                }
            }
        }
    }

    /// Clear the chat: empties both the conversation and the scrollback.
    /// Saved settings and any transcript files on disk are untouched.
    pub fn clear_chat(&mut self) {
        self.conversation.clear();
        self.transcript.clear();
        self.chat_scroll = 0;
        self.status = None;
    }

    pub fn save_transcript(&mut self, path: &Path) {
        match std::fs::write(path, self.transcript.to_text()) {
            Ok(()) => {
                self.status = Some(format!("Transcript saved to {}", path.display()));
            }
            Err(e) => {
                self.status = Some(format!("Could not save transcript: {}", e));
            }
        }
    }

    /// Open a saved transcript: replaces the scrollback with the file's raw
    /// text and resets the conversation. Only the visual text is restored;
    /// role-tagged turns are not reconstructed from it.
    pub fn open_transcript(&mut self, path: &Path) {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                self.conversation.clear();
                self.transcript.set_raw(&text);
                self.chat_scroll = 0;
                self.status = Some(format!("Opened {}", path.display()));
            }
            Err(e) => {
                self.status = Some(format!("Could not open transcript: {}", e));
            }
        }
    }

    pub fn open_settings_editor(&mut self) {
        match Settings::load() {
            Ok(settings) => {
                self.settings_editor = Some(SettingsEditor::from_settings(&settings));
            }
            Err(e) => {
                self.status = Some(e.to_string());
                self.settings_editor = Some(SettingsEditor::from_settings(&Settings::default()));
            }
        }
    }

    pub fn apply_settings_editor(&mut self) {
        if let Some(editor) = self.settings_editor.take() {
            let settings = editor.to_settings();
            match settings.save() {
                Ok(()) => {
                    self.model_label = settings.model;
                    self.status = Some("Settings saved".to_string());
                }
                Err(e) => {
                    self.status = Some(e.to_string());
                }
            }
        }
    }

    // Chat pane scrolling
    pub fn scroll_down(&mut self) {
        let max_scroll = self.total_chat_lines.saturating_sub(self.chat_height);
        if self.chat_scroll < max_scroll {
            self.chat_scroll = self.chat_scroll.saturating_add(1);
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
    }

    /// Scroll so the newest message (and the typing indicator) is visible.
    pub fn scroll_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for entry in self.transcript.entries() {
            for line in entry.text.lines() {
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // blank line after each entry
        }
        if self.loading {
            total_lines += 1; // typing indicator
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }

    /// Tick the ellipsis animation while a request is in flight.
    pub fn tick_animation(&mut self) {
        if self.loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
