use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use std::path::PathBuf;

use crate::app::{App, InputMode, PathPrompt, PathPurpose};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string edits
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Apply a single key to a text field with a char cursor. Returns true if
/// the key was consumed.
fn edit_text(input: &mut String, cursor: &mut usize, code: KeyCode) -> bool {
    match code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
            true
        }
        KeyCode::Delete => {
            if *cursor < input.chars().count() {
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
            true
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
            true
        }
        KeyCode::Right => {
            *cursor = (*cursor + 1).min(input.chars().count());
            true
        }
        KeyCode::Home => {
            *cursor = 0;
            true
        }
        KeyCode::End => {
            *cursor = input.chars().count();
            true
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(input, *cursor);
            input.insert(byte_pos, c);
            *cursor += 1;
            true
        }
        _ => false,
    }
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Ctrl-C quits from anywhere
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Popups capture keys first
    if app.settings_editor.is_some() {
        handle_settings_editor(app, key);
        return;
    }
    if app.path_prompt.is_some() {
        handle_path_prompt(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_settings_editor(app: &mut App, key: KeyEvent) {
    let Some(editor) = app.settings_editor.as_mut() else {
        return;
    };

    match key.code {
        KeyCode::Esc => {
            // Discard edits
            app.settings_editor = None;
        }
        KeyCode::Enter => {
            app.apply_settings_editor();
        }
        KeyCode::Tab | KeyCode::Down => {
            editor.selected = (editor.selected + 1) % editor.values.len();
        }
        KeyCode::BackTab | KeyCode::Up => {
            editor.selected = editor
                .selected
                .checked_sub(1)
                .unwrap_or(editor.values.len() - 1);
        }
        code => {
            let i = editor.selected;
            edit_text(&mut editor.values[i], &mut editor.cursors[i], code);
        }
    }
}

fn handle_path_prompt(app: &mut App, key: KeyEvent) {
    let Some(prompt) = app.path_prompt.as_mut() else {
        return;
    };

    match key.code {
        KeyCode::Esc => {
            app.path_prompt = None;
        }
        KeyCode::Enter => {
            if let Some(prompt) = app.path_prompt.take() {
                if !prompt.input.is_empty() {
                    let path = PathBuf::from(&prompt.input);
                    match prompt.purpose {
                        PathPurpose::SaveTranscript => app.save_transcript(&path),
                        PathPurpose::OpenTranscript => app.open_transcript(&path),
                    }
                }
            }
        }
        code => {
            edit_text(&mut prompt.input, &mut prompt.cursor, code);
        }
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Enter the prompt line
        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
            app.cursor = app.input.chars().count();
        }

        // Settings editor
        KeyCode::Char('s') => app.open_settings_editor(),

        // Transcript file actions
        KeyCode::Char('w') => {
            app.path_prompt = Some(PathPrompt {
                purpose: PathPurpose::SaveTranscript,
                input: String::new(),
                cursor: 0,
            });
        }
        KeyCode::Char('o') => {
            app.path_prompt = Some(PathPrompt {
                purpose: PathPurpose::OpenTranscript,
                input: String::new(),
                cursor: 0,
            });
        }

        KeyCode::Char('c') => app.clear_chat(),
        KeyCode::Char('t') => app.theme = app.theme.toggled(),

        // Chat scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_prompt();
        }
        code => {
            let App { input, cursor, .. } = app;
            edit_text(input, cursor, code);
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            for _ in 0..3 {
                app.scroll_down();
            }
        }
        MouseEventKind::ScrollUp => {
            for _ in 0..3 {
                app.scroll_up();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_text_inserts_at_cursor_utf8_safely() {
        let mut input = "héllo".to_string();
        let mut cursor = 2;
        edit_text(&mut input, &mut cursor, KeyCode::Char('x'));
        assert_eq!(input, "héxllo");
        assert_eq!(cursor, 3);
    }

    #[test]
    fn edit_text_backspace_removes_before_cursor() {
        let mut input = "abc".to_string();
        let mut cursor = 3;
        edit_text(&mut input, &mut cursor, KeyCode::Backspace);
        assert_eq!(input, "ab");
        assert_eq!(cursor, 2);
    }

    #[test]
    fn edit_text_clamps_cursor_movement() {
        let mut input = "ab".to_string();
        let mut cursor = 0;
        edit_text(&mut input, &mut cursor, KeyCode::Left);
        assert_eq!(cursor, 0);
        edit_text(&mut input, &mut cursor, KeyCode::End);
        assert_eq!(cursor, 2);
        edit_text(&mut input, &mut cursor, KeyCode::Right);
        assert_eq!(cursor, 2);
    }
}
