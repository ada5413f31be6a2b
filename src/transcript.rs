use chrono::Local;

use crate::conversation::Role;

/// One rendered scrollback entry. `tag` selects the display color; text
/// loaded from a file carries no tag and renders in the default style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub tag: Option<Role>,
    pub text: String,
}

/// The rendered scrollback, kept apart from the structured conversation.
/// Saving writes this text verbatim; opening a file replaces it with raw
/// text and does not reconstruct role-tagged dialogue turns.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, role: Role, content: &str) {
        self.append_stamped(role, content, &timestamp());
    }

    fn append_stamped(&mut self, role: Role, content: &str, stamp: &str) {
        self.entries.push(TranscriptEntry {
            tag: Some(role),
            text: format!("{} {}: {}", stamp, role.speaker(), content),
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the scrollback with raw file content (File > Open).
    pub fn set_raw(&mut self, text: &str) {
        self.entries.clear();
        for line in text.lines() {
            self.entries.push(TranscriptEntry {
                tag: None,
                text: line.to_string(),
            });
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact text written by File > Save.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.text);
            out.push('\n');
        }
        out
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
