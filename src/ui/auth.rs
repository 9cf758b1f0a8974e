use crate::app::{App, LoginField, RegisterField};
use crate::ui::centered_rect;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Block, BorderType, Paragraph, Widget},
};

fn field(value: &str, title: &str, focused: bool, masked: bool) -> Paragraph<'static> {
    let shown = if masked {
        "*".repeat(value.chars().count())
    } else {
        value.to_string()
    };
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Paragraph::new(shown).block(
        Block::bordered()
            .title(title.to_string())
            .border_type(BorderType::Rounded)
            .border_style(border_style),
    )
}

pub fn render_login(app: &App, area: Rect, buf: &mut Buffer) {
    let form_area = centered_rect(50, 60, area);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Username
            Constraint::Length(3), // Password
            Constraint::Length(1), // Notice / error
            Constraint::Length(3), // Help
        ])
        .split(form_area);

    let title = Paragraph::new("Anime Recommender")
        .block(
            Block::bordered()
                .title("Login")
                .title_alignment(Alignment::Center)
                .border_type(BorderType::Rounded),
        )
        .fg(Color::Green)
        .alignment(Alignment::Center);
    title.render(layout[0], buf);

    field(
        &app.login.username,
        "Username",
        app.login.focus == LoginField::Username,
        false,
    )
    .render(layout[1], buf);
    field(
        &app.login.password,
        "Password",
        app.login.focus == LoginField::Password,
        true,
    )
    .render(layout[2], buf);

    let notice = if app.login.busy {
        Paragraph::new("Signing in...").fg(Color::Yellow)
    } else if let Some(error) = &app.login.error {
        Paragraph::new(error.clone()).fg(Color::Red)
    } else if let Some(flash) = &app.login.flash {
        Paragraph::new(flash.clone()).fg(Color::Green)
    } else {
        Paragraph::new("")
    };
    notice.alignment(Alignment::Center).render(layout[3], buf);

    let help = Paragraph::new("Tab: switch field • Enter: sign in • Ctrl+R: register • Esc: quit")
        .block(
            Block::bordered()
                .title("Controls")
                .border_type(BorderType::Rounded),
        )
        .fg(Color::Yellow)
        .alignment(Alignment::Center);
    help.render(layout[4], buf);
}

pub fn render_register(app: &App, area: Rect, buf: &mut Buffer) {
    let form_area = centered_rect(50, 80, area);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(3), // Username
            Constraint::Length(3), // Email
            Constraint::Length(3), // Password
            Constraint::Length(3), // Confirm
            Constraint::Length(1), // Notice / error
            Constraint::Length(3), // Help
        ])
        .split(form_area);

    let title = Paragraph::new("Create an account")
        .block(
            Block::bordered()
                .title("Register")
                .title_alignment(Alignment::Center)
                .border_type(BorderType::Rounded),
        )
        .fg(Color::Green)
        .alignment(Alignment::Center);
    title.render(layout[0], buf);

    let focus = app.register.focus;
    field(
        &app.register.username,
        "Username",
        focus == RegisterField::Username,
        false,
    )
    .render(layout[1], buf);
    field(
        &app.register.email,
        "Email",
        focus == RegisterField::Email,
        false,
    )
    .render(layout[2], buf);
    field(
        &app.register.password,
        "Password",
        focus == RegisterField::Password,
        true,
    )
    .render(layout[3], buf);
    field(
        &app.register.confirm,
        "Confirm password",
        focus == RegisterField::Confirm,
        true,
    )
    .render(layout[4], buf);

    let notice = if app.register.busy {
        Paragraph::new("Creating account...").fg(Color::Yellow)
    } else if let Some(error) = &app.register.error {
        Paragraph::new(error.clone()).fg(Color::Red)
    } else {
        Paragraph::new("")
    };
    notice.alignment(Alignment::Center).render(layout[5], buf);

    let help = Paragraph::new("Tab: next field • Enter: create account • Esc: back to login")
        .block(
            Block::bordered()
                .title("Controls")
                .border_type(BorderType::Rounded),
        )
        .fg(Color::Yellow)
        .alignment(Alignment::Center);
    help.render(layout[6], buf);
}
