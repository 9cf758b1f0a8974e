use crate::app::App;
use crate::chat::Message;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Paragraph, Widget, Wrap},
};

pub fn render_history(app: &App, area: Rect, buf: &mut Buffer) {
    let content = if app.chat.timeline.is_empty() {
        Text::from(vec![
            Line::from("Welcome to the Anime Recommender!"),
            Line::from(""),
            Line::from("Ask for a recommendation to get started, or open a"),
            Line::from("saved conversation from the sidebar (Ctrl+B)."),
        ])
    } else {
        let mut lines = Vec::new();
        for msg in &app.chat.timeline {
            let (prefix, style) = if msg.is_user() {
                ("You: ", Style::default().fg(Color::Cyan))
            } else {
                ("Assistant: ", Style::default().fg(Color::Green))
            };

            if msg.is_placeholder() {
                lines.push(Line::from(vec![
                    Span::styled(prefix, style.add_modifier(Modifier::BOLD)),
                    Span::styled(typing_dots(app.tick_count), Style::default().fg(Color::Gray)),
                ]));
                lines.push(Line::from(""));
                continue;
            }

            let mut content_lines = msg.visible_text().lines();
            let first_line = content_lines.next().unwrap_or_default().to_string();
            lines.push(Line::from(vec![
                Span::styled(prefix, style.add_modifier(Modifier::BOLD)),
                Span::styled(first_line, Style::default().fg(Color::White)),
            ]));
            for line in content_lines {
                lines.push(Line::from(vec![
                    Span::raw("    "),
                    Span::styled(line.to_string(), Style::default().fg(Color::White)),
                ]));
            }
            lines.push(Line::from(""));
        }
        Text::from(lines)
    };

    // Follow the newest line unless the user scrolled up. Long
    // messages wrap, so the offset counts wrapped rows, not raw lines.
    let inner_width = area.width.saturating_sub(2).max(1);
    let inner_height = area.height.saturating_sub(2);
    let total = content.lines.iter().fold(0u16, |rows, line| {
        let width = u16::try_from(line.width()).unwrap_or(u16::MAX);
        rows.saturating_add(wrapped_rows(width, inner_width))
    });
    let scroll = follow_offset(total, inner_height, app.chat.scroll_from_bottom);

    let chat_widget = Paragraph::new(content)
        .block(
            Block::bordered()
                .title("Chat (↑↓ to scroll)")
                .border_type(BorderType::Rounded),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    chat_widget.render(area, buf);
}

/// The three-dot typing indicator, cycling with the frame counter.
fn typing_dots(tick_count: u64) -> String {
    let dots = (tick_count / 8) % 4;
    ".".repeat(dots as usize + 1)
}

/// Rows a line occupies once wrapped to `width` columns.
fn wrapped_rows(line_width: u16, width: u16) -> u16 {
    if line_width == 0 {
        1
    } else {
        line_width.div_ceil(width)
    }
}

/// Scroll offset keeping the newest row visible, minus however far the
/// user has scrolled up.
fn follow_offset(total_rows: u16, height: u16, from_bottom: u16) -> u16 {
    total_rows.saturating_sub(height).saturating_sub(from_bottom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_rows_counts_overflow_lines() {
        assert_eq!(wrapped_rows(0, 10), 1);
        assert_eq!(wrapped_rows(10, 10), 1);
        assert_eq!(wrapped_rows(11, 10), 2);
        assert_eq!(wrapped_rows(35, 10), 4);
    }

    #[test]
    fn follow_offset_pins_newest_row() {
        // 12 rows in an 8-row viewport leaves 4 rows above the fold.
        assert_eq!(follow_offset(12, 8, 0), 4);
        assert_eq!(follow_offset(12, 8, 3), 1);
        // Scrolling past the top clamps at zero.
        assert_eq!(follow_offset(12, 8, 40), 0);
        // A short history never scrolls.
        assert_eq!(follow_offset(5, 8, 0), 0);
    }

    #[test]
    fn one_long_wrapped_message_still_follows_bottom() {
        let rows = wrapped_rows(95, 10);
        assert_eq!(rows, 10);
        // The single pre-wrap line must not be mistaken for one row.
        assert_eq!(follow_offset(rows, 4, 0), 6);
    }
}
