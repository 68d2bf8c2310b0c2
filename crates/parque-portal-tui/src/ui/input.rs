//! Keyboard input handling for the TUI.
//!
//! Each authentication state has its own key map; the login form is the
//! only one that edits text.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{can_add_password_char, can_add_username_char, App, LoginFocus};
use parque_portal_core::AuthState;

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    let signed_in = match app.flow.state() {
        AuthState::Loading => return Ok(matches!(key.code, KeyCode::Esc | KeyCode::Char('q'))),
        AuthState::Authenticated(_) => true,
        AuthState::Unauthenticated => false,
    };

    if signed_in {
        handle_authenticated_input(app, key).await
    } else {
        Ok(handle_login_input(app, key))
    }
}

async fn handle_authenticated_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Char('b') | KeyCode::Char('B') | KeyCode::Esc => {
            app.return_to_login();
        }
        KeyCode::Char('o') | KeyCode::Char('O') => {
            app.logout().await;
        }
        KeyCode::Char('q') => return Ok(true),
        _ => {}
    }
    Ok(false)
}

fn handle_login_input(app: &mut App, key: KeyEvent) -> bool {
    // No edits while a submission is in flight
    if app.login_pending {
        return false;
    }

    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            return true;
        }
        KeyCode::Tab | KeyCode::Down => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Username,
            };
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Username,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => {
                app.login_focus = LoginFocus::Password;
            }
            LoginFocus::Password | LoginFocus::Button => {
                app.request_login();
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(app.login_username.chars().count(), c) {
                    app.login_username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    false
}
