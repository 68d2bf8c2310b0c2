use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use parque_portal_core::{AuthState, User};

use crate::app::{App, LoginFocus};

use super::styles;

const SPINNER_FRAMES: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

/// Fixed dialog width shared by every screen
const DIALOG_WIDTH: u16 = 46;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, chunks[0]);

    match app.flow.state() {
        AuthState::Loading => render_loading(frame, app, chunks[1]),
        AuthState::Authenticated(user) => render_signed_in(frame, app, user, chunks[1]),
        AuthState::Unauthenticated => render_login(frame, app, chunks[1]),
    }

    render_status_bar(frame, app, chunks[2]);
}

fn render_title_bar(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::dim_style());

    let paragraph = Paragraph::new(Line::from(Span::styled("  Parque-e", styles::title_style())))
        .block(block);
    frame.render_widget(paragraph, area);
}

fn spinner(app: &App) -> &'static str {
    SPINNER_FRAMES[app.tick % SPINNER_FRAMES.len()]
}

fn render_loading(frame: &mut Frame, app: &App, area: Rect) {
    let dialog = centered_rect_fixed(DIALOG_WIDTH, 5, area);
    frame.render_widget(Clear, dialog);

    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::raw("   "),
            Span::styled(spinner(app), styles::title_style()),
            Span::styled("  Checking your session...", styles::dim_style()),
        ]),
    ];

    render_dialog(frame, lines, dialog);
}

fn render_signed_in(frame: &mut Frame, app: &App, user: &User, area: Rect) {
    let dialog = centered_rect_fixed(DIALOG_WIDTH, 10, area);
    frame.render_widget(Clear, dialog);

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("   Access granted!", styles::granted_style())),
        Line::from(vec![
            Span::styled("   Welcome, ", styles::field_style()),
            Span::styled(user.username.clone(), styles::username_style()),
        ]),
        Line::from(""),
    ];

    if app.flow.has_pending_redirect() {
        lines.push(Line::from(vec![
            Span::raw("   "),
            Span::styled(spinner(app), styles::title_style()),
            Span::styled("  Redirecting in a few seconds...", styles::dim_style()),
        ]));
    } else {
        lines.push(Line::from(Span::styled(
            "   Your session is active.",
            styles::dim_style(),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   [b]", styles::key_hint_style()),
        Span::styled(" Back to login   ", styles::dim_style()),
        Span::styled("[o]", styles::key_hint_style()),
        Span::styled(" Log out", styles::dim_style()),
    ]));

    render_dialog(frame, lines, dialog);
}

fn render_login(frame: &mut Frame, app: &App, area: Rect) {
    let height = if app.login_error.is_some() || app.login_pending { 11 } else { 9 };
    let dialog = centered_rect_fixed(DIALOG_WIDTH, height, area);
    frame.render_widget(Clear, dialog);

    let mut lines = vec![
        Line::from(Span::styled("            Sign in to Parque-e", styles::title_style())),
        Line::from(""),
    ];

    let username_display = format!("{:<16}", app.login_username);
    lines.push(form_field(
        "Username",
        username_display,
        app.login_focus == LoginFocus::Username,
    ));

    let password_masked: String = "*".repeat(app.login_password.chars().count().min(16));
    lines.push(form_field(
        "Password",
        format!("{:<16}", password_masked),
        app.login_focus == LoginFocus::Password,
    ));

    // Login button (centered)
    let button_focused = app.login_focus == LoginFocus::Button;
    let button_style = if button_focused {
        styles::focused_style()
    } else {
        styles::field_style()
    };
    let label = if button_focused { " ▶ Login ◀ " } else { "   Login   " };
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("               ["),
        Span::styled(label, button_style),
        Span::raw("]"),
    ]));

    if app.login_pending {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(" Signing in...", styles::dim_style())));
    } else if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    render_dialog(frame, lines, dialog);
}

fn form_field(label: &str, value: String, focused: bool) -> Line<'static> {
    let style = if focused {
        styles::focused_style()
    } else {
        styles::field_style()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::raw("      "),
        Span::styled(format!("{}: [", label), styles::dim_style()),
        Span::styled(format!("{}{}", value, cursor), style),
        Span::styled("]", styles::dim_style()),
    ])
}

fn render_dialog(frame: &mut Frame, lines: Vec<Line>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::dialog_border_style())
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" {} ", app.api_url()),
    };

    let shortcuts = match app.flow.state() {
        AuthState::Unauthenticated => "[Tab] next field | [Esc] quit",
        AuthState::Authenticated(_) => "[b]ack | l[o]g out | [q]uit",
        AuthState::Loading => "[q]uit",
    };
    let right_text = format!(" {} ", shortcuts);

    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::dim_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::dim_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
