use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use legislator_chat::{Message, Role};
use crate::app::App;

const TITLE: &str = "Legislator Chatbot (Updated 2024)";
const SUBTITLE: &str = "Ask questions regarding current Senate legislature and receive up-to-date answers based on real documents";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let readiness = if app.conversation.is_backend_ready() {
        Span::styled(" ● ready ", Style::default().fg(Color::Green).bold())
    } else {
        Span::styled(" ○ indexing ", Style::default().fg(Color::Yellow).bold())
    };

    let title = Line::from(vec![
        Span::styled(format!(" {} ", TITLE), Style::default().fg(Color::Cyan).bold()),
        readiness,
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let subtitle = Line::from(Span::styled(
        format!(" {}", SUBTITLE),
        Style::default().fg(Color::Gray),
    ));

    let header = Paragraph::new(vec![title, subtitle]).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Lines for one message. Content is split on '\n' only so blank lines and
/// indentation come through exactly as sent.
fn message_lines(msg: &Message) -> Vec<Line<'_>> {
    let (label, color, alignment) = match msg.role {
        Role::User => ("You:", Color::Cyan, Alignment::Right),
        Role::Assistant => ("Assistant:", Color::Yellow, Alignment::Left),
    };

    let mut lines = Vec::new();
    lines.push(
        Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .alignment(alignment),
    );
    for line in msg.content.split('\n') {
        lines.push(Line::raw(line).alignment(alignment));
    }
    lines.push(Line::default());
    lines
}

/// The log as rendered inside the chat block, thinking indicator included.
fn chat_paragraph(app: &App) -> Paragraph<'_> {
    let mut lines: Vec<Line> = app
        .conversation
        .messages()
        .iter()
        .flat_map(message_lines)
        .collect();

    if app.conversation.is_awaiting_response() {
        lines.push(Line::from(Span::styled(
            "Assistant:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false })
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    let total_lines = chat_paragraph(app).line_count(area.width.saturating_sub(2));
    app.sync_chat_view(
        area.height.saturating_sub(2),
        u16::try_from(total_lines).unwrap_or(u16::MAX),
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.base_url));

    let chat = chat_paragraph(app)
        .block(block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    let mut scrollbar_state = ScrollbarState::new(app.chat_lines as usize)
        .position(app.chat_scroll as usize);
    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight),
        area,
        &mut scrollbar_state,
    );
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let awaiting = app.conversation.is_awaiting_response();
    let border_color = if awaiting { Color::DarkGray } else { Color::Yellow };
    let title = if awaiting {
        " Waiting for answer... "
    } else if app.conversation.pending_input.trim().is_empty() {
        " Type your question... "
    } else {
        " Enter to send "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .conversation
        .pending_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    if !awaiting {
        let cursor_x = u16::try_from(cursor_pos - scroll_offset).unwrap_or(0);
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints = if app.conversation.is_awaiting_response() {
        " ↑/↓ PgUp/PgDn scroll · Esc quit "
    } else {
        " Enter send · ↑/↓ PgUp/PgDn scroll · Ctrl+End latest · Esc quit "
    };

    let footer = Paragraph::new(Line::from(Span::styled(
        hints,
        Style::default().fg(Color::White),
    )))
    .style(Style::default().bg(Color::Blue));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use legislator_chat::controller::{self, Submission};
    use legislator_chat::{Backend, ChatError};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct Offline;

    #[async_trait]
    impl Backend for Offline {
        async fn health(&self) -> Result<(), ChatError> {
            Err(ChatError::connectivity("offline"))
        }

        async fn chat(&self, _message: &str) -> Result<String, ChatError> {
            Err(ChatError::connectivity("offline"))
        }
    }

    fn test_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(Arc::new(Offline), "http://127.0.0.1:8000", tx)
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    /// Answer to one question, delivered the way the event loop would.
    fn answer(app: &mut App, text: &str) {
        let sent = controller::submit(&mut app.conversation, "Summarize the bill");
        assert!(matches!(sent, Submission::Dispatch(_)));
        app.apply_reply(Ok(text.to_string()));
    }

    #[test]
    fn long_answer_scrolls_into_view() {
        let mut terminal = Terminal::new(TestBackend::new(22, 12)).unwrap();
        let mut app = test_app();
        app.apply_health(Ok(()));
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let words: Vec<String> = (0..10).map(|i| format!("word{:07}", i)).collect();
        answer(&mut app, &format!("{} ZZEND", words.join(" ")));
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen(&terminal);
        assert!(text.contains("ZZEND"), "newest answer tail not visible:\n{}", text);
        assert!(text.contains("word0000009"));

        // Nothing past the bottom to scroll into
        let bottom = app.chat_scroll;
        app.scroll_down(100);
        assert_eq!(app.chat_scroll, bottom);
    }

    #[test]
    fn wide_characters_count_by_display_width() {
        let mut terminal = Terminal::new(TestBackend::new(22, 12)).unwrap();
        let mut app = test_app();
        app.apply_health(Ok(()));
        answer(&mut app, &format!("{}END", "参议院法案".repeat(6)));
        terminal.draw(|f| render(&mut app, f)).unwrap();

        assert!(screen(&terminal).contains("END"));
    }

    #[test]
    fn message_lines_keep_blank_lines() {
        let msg = Message::assistant("first\n\n  indented\n");
        let lines = message_lines(&msg);
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["Assistant:", "first", "", "  indented", "", ""]);
    }

    #[test]
    fn user_lines_align_right() {
        let msg = Message::user("hi");
        let lines = message_lines(&msg);
        assert!(lines[..2].iter().all(|l| l.alignment == Some(Alignment::Right)));
    }
}
