use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap,
    },
};

use crate::app::{App, InputMode, PathPurpose, SETTINGS_FIELDS};
use crate::conversation::Role;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    // Paint the themed background across the whole frame first
    frame.render_widget(
        Block::default().style(Style::default().bg(app.theme.bg()).fg(app.theme.fg())),
        area,
    );

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.settings_editor.is_some() {
        render_settings_editor(app, frame, area);
    } else if app.path_prompt.is_some() {
        render_path_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let model = if app.model_label.is_empty() {
        "no model configured".to_string()
    } else {
        app.model_label.clone()
    };

    let title = Line::from(vec![
        Span::styled(" charla ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("[{}] ", model), Style::default().fg(app.theme.dim())),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(app.theme.dim()),
        ),
    ]);

    frame.render_widget(Paragraph::new(title), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.dim()))
        .title(" Chat ");

    let inner = block.inner(area);
    app.chat_area = Some(inner);
    app.chat_height = inner.height;
    app.chat_width = inner.width;

    let mut lines: Vec<Line> = Vec::new();
    for entry in app.transcript.entries() {
        let style = match entry.tag {
            Some(Role::User) => Style::default().fg(app.theme.user()),
            Some(Role::Assistant) => Style::default().fg(app.theme.assistant()),
            None => Style::default().fg(app.theme.fg()),
        };
        for text_line in entry.text.lines() {
            lines.push(Line::from(Span::styled(text_line.to_string(), style)));
        }
        if entry.text.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::default()); // blank line between entries
    }

    if app.loading {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("AI is thinking{}", dots),
            Style::default()
                .fg(app.theme.assistant())
                .add_modifier(Modifier::ITALIC),
        )));
    } else if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Press 'i' and type a prompt to start chatting.",
            Style::default().fg(app.theme.dim()),
        )));
    }

    // Wrapped line count feeds scroll clamping and scroll-to-bottom
    let wrap_width = inner.width.max(1) as usize;
    let total: usize = lines
        .iter()
        .map(|line| {
            let chars: usize = line.spans.iter().map(|span| span.content.chars().count()).sum();
            if chars == 0 {
                1
            } else {
                chars / wrap_width + 1
            }
        })
        .sum();
    app.total_chat_lines = total as u16;

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(paragraph, area);

    if app.total_chat_lines > app.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state =
            ScrollbarState::new(app.total_chat_lines as usize).position(app.chat_scroll as usize);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { app.theme.dim() };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Your Prompt ");

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(app.theme.fg()))
        .block(block);

    frame.render_widget(input, area);

    if editing && app.settings_editor.is_none() && app.path_prompt.is_none() {
        frame.set_cursor_position((area.x + 1 + app.cursor as u16, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let line = if let Some(status) = &app.status {
        Line::from(Span::styled(
            format!(" {} ", status),
            Style::default().fg(Color::Red),
        ))
    } else {
        let hints = match app.input_mode {
            InputMode::Editing => " Enter send | Esc back ",
            InputMode::Normal => {
                " i type | s settings | w save | o open | c clear | t theme | j/k scroll | q quit "
            }
        };
        Line::from(Span::styled(hints, Style::default().fg(app.theme.dim())))
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    let popup_width = width.min(area.width.saturating_sub(4));
    let popup_height = height.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    Rect::new(popup_x, popup_y, popup_width, popup_height)
}

fn render_settings_editor(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(editor) = app.settings_editor.as_ref() else {
        return;
    };

    let popup_area = centered_popup(area, 62, 11);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Settings (Enter save, Esc cancel, Tab next field) ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [key_label, key_field, base_label, base_field, model_label, model_field] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(inner);

    let label_areas = [key_label, base_label, model_label];
    let field_areas = [key_field, base_field, model_field];

    for i in 0..SETTINGS_FIELDS.len() {
        let selected = editor.selected == i;
        let label_style = if selected {
            Style::default().fg(Color::Yellow).bold()
        } else {
            Style::default().fg(app.theme.dim())
        };
        frame.render_widget(
            Paragraph::new(format!("{}:", SETTINGS_FIELDS[i])).style(label_style),
            label_areas[i],
        );

        // The key is secret; show it masked
        let shown = if i == 0 {
            "*".repeat(editor.values[i].chars().count())
        } else {
            editor.values[i].clone()
        };
        frame.render_widget(
            Paragraph::new(shown).style(Style::default().fg(Color::Cyan)),
            field_areas[i],
        );

        if selected {
            frame.set_cursor_position((
                field_areas[i].x + editor.cursors[i] as u16,
                field_areas[i].y,
            ));
        }
    }
}

fn render_path_prompt(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(prompt) = app.path_prompt.as_ref() else {
        return;
    };

    let title = match prompt.purpose {
        PathPurpose::SaveTranscript => " Save transcript to ",
        PathPurpose::OpenTranscript => " Open transcript from ",
    };

    let popup_area = centered_popup(area, 62, 3);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    let input = Paragraph::new(prompt.input.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, popup_area);
    frame.set_cursor_position((popup_area.x + 1 + prompt.cursor as u16, popup_area.y + 1));
}
