use ratatui::style::{Color, Modifier, Style};

// Parque-e palette
pub const BRAND: Color = Color::Rgb(46, 139, 87);
pub const GRANTED: Color = Color::Rgb(120, 200, 120);
pub const KEY_HINT: Color = Color::Rgb(214, 176, 72);
pub const DANGER: Color = Color::Rgb(210, 80, 70);
pub const DIM: Color = Color::Rgb(120, 124, 130);
pub const FOCUS_BG: Color = Color::Rgb(36, 60, 48);
pub const BAR_BG: Color = Color::Rgb(24, 32, 28);

pub fn title_style() -> Style {
    Style::default().fg(BRAND).add_modifier(Modifier::BOLD)
}

/// Focused form field or button
pub fn focused_style() -> Style {
    Style::default()
        .fg(Color::White)
        .bg(FOCUS_BG)
        .add_modifier(Modifier::BOLD)
}

pub fn field_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn dim_style() -> Style {
    Style::default().fg(DIM)
}

pub fn username_style() -> Style {
    Style::default().fg(KEY_HINT).add_modifier(Modifier::BOLD)
}

pub fn granted_style() -> Style {
    Style::default().fg(GRANTED).add_modifier(Modifier::BOLD)
}

pub fn error_style() -> Style {
    Style::default().fg(DANGER)
}

pub fn dialog_border_style() -> Style {
    Style::default().fg(BRAND)
}

pub fn status_bar_style() -> Style {
    Style::default().bg(BAR_BG).fg(Color::White)
}

pub fn key_hint_style() -> Style {
    Style::default().fg(KEY_HINT)
}
