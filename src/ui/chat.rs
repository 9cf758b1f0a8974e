use crate::app::{App, Modal};
use crate::ui::{centered_rect, history};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Clear, List, ListItem, ListState, Paragraph, StatefulWidget, Widget},
};

pub fn render_chat(app: &App, area: Rect, buf: &mut Buffer) {
    let body = if app.chat.sidebar_open {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(30), Constraint::Min(1)])
            .split(area);
        render_sidebar(app, columns[0], buf);
        columns[1]
    } else {
        area
    };

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(1),    // Chat history
            Constraint::Length(3), // Input box
            Constraint::Length(3), // Help
        ])
        .split(body);

    let username = app
        .session
        .as_ref()
        .map(|s| s.username.as_str())
        .unwrap_or("?");
    let title = Paragraph::new(format!("Anime Recommender Chatbot — {username}"))
        .block(
            Block::bordered()
                .title(conversation_title(app))
                .title_alignment(Alignment::Center)
                .border_type(BorderType::Rounded),
        )
        .fg(Color::Green)
        .alignment(Alignment::Center);
    title.render(main_layout[0], buf);

    history::render_history(app, main_layout[1], buf);

    let input_text = if app.chat.is_busy() {
        "Please wait...".to_string()
    } else {
        format!("> {}", app.chat.draft)
    };
    let input_widget = Paragraph::new(input_text)
        .block(
            Block::bordered()
                .title("Type your message")
                .border_type(BorderType::Rounded),
        )
        .fg(if app.chat.is_busy() {
            Color::DarkGray
        } else {
            Color::Yellow
        });
    input_widget.render(main_layout[2], buf);

    let help_text = if app.chat.sidebar_open {
        "↑↓: select • Enter: open • n: new • r: rename • d: delete • Esc: close sidebar"
    } else {
        "Enter: send • Ctrl+B: conversations • Ctrl+L: logout • Ctrl+C: quit"
    };
    let help = Paragraph::new(help_text)
        .block(
            Block::bordered()
                .title("Controls")
                .border_type(BorderType::Rounded),
        )
        .fg(Color::Yellow)
        .alignment(Alignment::Center);
    help.render(main_layout[3], buf);

    render_modal(app, area, buf);
}

fn conversation_title(app: &App) -> String {
    app.chat
        .active
        .as_ref()
        .and_then(|id| app.chat.conversations.iter().find(|c| &c.id == id))
        .map(|c| c.title.clone())
        .unwrap_or_else(|| "New chat".to_string())
}

fn render_sidebar(app: &App, area: Rect, buf: &mut Buffer) {
    let items: Vec<ListItem> = app
        .chat
        .conversations
        .iter()
        .map(|c| {
            ListItem::new(vec![
                Line::from(Span::styled(
                    c.title.clone(),
                    Style::default().fg(Color::White),
                )),
                Line::from(Span::styled(
                    c.updated_at.clone(),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::bordered()
                .title("Conversations")
                .border_type(BorderType::Rounded),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !app.chat.conversations.is_empty() {
        state.select(Some(app.chat.selected));
    }
    StatefulWidget::render(list, area, buf, &mut state);
}

fn render_modal(app: &App, area: Rect, buf: &mut Buffer) {
    match &app.modal {
        Modal::None => {}
        Modal::NewConversation { title } => {
            render_title_prompt("New conversation", title, area, buf);
        }
        Modal::Rename { title, .. } => {
            render_title_prompt("Rename conversation", title, area, buf);
        }
        Modal::ConfirmDelete { title, .. } => {
            let popup = centered_rect(50, 20, area);
            Clear.render(popup, buf);
            let confirm = Paragraph::new(vec![
                Line::from(format!("Delete \"{title}\"?")),
                Line::from(""),
                Line::from("y: delete • n: cancel"),
            ])
            .block(
                Block::bordered()
                    .title("Confirm delete")
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(Color::Red)),
            )
            .alignment(Alignment::Center);
            confirm.render(popup, buf);
        }
    }
}

fn render_title_prompt(heading: &str, title: &str, area: Rect, buf: &mut Buffer) {
    let popup = centered_rect(50, 20, area);
    Clear.render(popup, buf);
    let prompt = Paragraph::new(vec![
        Line::from(format!("> {title}")),
        Line::from(""),
        Line::from("Enter: save • Esc: cancel"),
    ])
    .block(
        Block::bordered()
            .title(heading.to_string())
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    prompt.render(popup, buf);
}
