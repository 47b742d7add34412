use crate::app::{App, Effects, MenuItem, SportFlag};
use crate::state::app_state::AdminFocus;
use crate::state::messages::{ChatCommand, NetworkRequest};
use crossterm::event::KeyCode::Char;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

pub async fn handle_key_bindings(
    key_event: KeyEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    chat_commands: &mpsc::Sender<ChatCommand>,
) {
    let mut guard = app.lock().await;

    // While composing a chat message every key goes to the input line.
    if guard.state.active_tab == MenuItem::Chat && guard.state.chat.composing {
        let effects = match (key_event.code, key_event.modifiers) {
            (Char('c'), KeyModifiers::CONTROL) => {
                crate::cleanup_terminal();
                std::process::exit(0);
            }
            (KeyCode::Enter, _) => guard.chat_submit(),
            (KeyCode::Esc, _) => {
                guard.state.chat.composing = false;
                guard.state.chat.input.clear();
                Effects::none()
            }
            (KeyCode::Backspace, _) => {
                guard.state.chat.input.pop();
                Effects::none()
            }
            (Char(c), _) => {
                guard.state.chat.input.push(c);
                Effects::none()
            }
            _ => Effects::none(),
        };
        drop(guard);
        dispatch(effects, network_requests, chat_commands).await;
        return;
    }

    // An open admin prompt takes every key as well.
    if guard.state.active_tab == MenuItem::Admin && guard.state.admin.prompt.is_some() {
        let effects = match (key_event.code, key_event.modifiers) {
            (Char('c'), KeyModifiers::CONTROL) => {
                crate::cleanup_terminal();
                std::process::exit(0);
            }
            (KeyCode::Enter, _) => guard.admin_submit_prompt(),
            (KeyCode::Esc, _) => {
                guard.admin_cancel_prompt();
                Effects::none()
            }
            (KeyCode::Backspace, _) => {
                guard.admin_prompt_backspace();
                Effects::none()
            }
            (Char(c), _) => guard.admin_prompt_char(c),
            _ => Effects::none(),
        };
        drop(guard);
        dispatch(effects, network_requests, chat_commands).await;
        return;
    }

    let admin_focus = guard.state.admin.focus;
    let effects = match (guard.state.active_tab, key_event.code, key_event.modifiers) {
        // Quit
        (_, Char('q'), _) | (_, Char('c'), KeyModifiers::CONTROL) => {
            crate::cleanup_terminal();
            std::process::exit(0);
        }

        // Tab switching
        (_, Char('1'), _) => guard.update_tab(MenuItem::Sports),
        (_, Char('2'), _) => guard.update_tab(MenuItem::Schedule),
        (_, Char('3'), _) => guard.update_tab(MenuItem::Standings),
        (_, Char('4'), _) => guard.update_tab(MenuItem::Live),
        (_, Char('5'), _) => guard.update_tab(MenuItem::Chat),
        (_, Char('6'), _) => guard.update_tab(MenuItem::Admin),
        (_, Char('?'), _) => guard.update_tab(MenuItem::Help),
        (MenuItem::Help, KeyCode::Esc, _) => guard.exit_help(),

        // Sports
        (MenuItem::Sports, Char('j') | KeyCode::Down, _) => {
            guard.state.sports.down();
            Effects::none()
        }
        (MenuItem::Sports, Char('k') | KeyCode::Up, _) => {
            guard.state.sports.up();
            Effects::none()
        }
        (MenuItem::Sports, Char('c') | KeyCode::Tab, _) => guard.sports_next_category(),
        (MenuItem::Sports, KeyCode::Enter, _) => guard.sports_open_table(),

        // Schedule
        (MenuItem::Schedule, Char('l') | KeyCode::Right, _) => guard.schedule_shift_day(true),
        (MenuItem::Schedule, Char('h') | KeyCode::Left, _) => guard.schedule_shift_day(false),
        (MenuItem::Schedule, Char('j') | KeyCode::Down, _) => {
            guard.schedule_scroll(true);
            Effects::none()
        }
        (MenuItem::Schedule, Char('k') | KeyCode::Up, _) => {
            guard.schedule_scroll(false);
            Effects::none()
        }

        // Points tables
        (MenuItem::Standings, Char('j') | KeyCode::Down, _) => {
            guard.state.standings.scroll_offset = guard.state.standings.scroll_offset.saturating_add(1);
            Effects::none()
        }
        (MenuItem::Standings, Char('k') | KeyCode::Up, _) => {
            guard.state.standings.scroll_offset = guard.state.standings.scroll_offset.saturating_sub(1);
            Effects::none()
        }
        (MenuItem::Standings, KeyCode::Esc, _) => guard.update_tab(MenuItem::Sports),

        // Live
        (MenuItem::Live, Char('r'), _) => Effects::request(NetworkRequest::RefreshRunning),

        // Chat
        (MenuItem::Chat, Char('i') | KeyCode::Enter, _) => {
            if guard.state.chat.sport_id.is_some() {
                guard.state.chat.composing = true;
            }
            Effects::none()
        }
        (MenuItem::Chat, Char('k') | KeyCode::Up, _) => {
            guard.state.chat.scroll_offset = guard.state.chat.scroll_offset.saturating_add(1);
            Effects::none()
        }
        (MenuItem::Chat, Char('j') | KeyCode::Down, _) => {
            guard.state.chat.scroll_offset = guard.state.chat.scroll_offset.saturating_sub(1);
            Effects::none()
        }

        // Admin
        (MenuItem::Admin, KeyCode::Tab, _) => {
            guard.admin_cycle_focus();
            Effects::none()
        }
        (MenuItem::Admin, Char('j') | KeyCode::Down, _) => guard.admin_move(true),
        (MenuItem::Admin, Char('k') | KeyCode::Up, _) => guard.admin_move(false),
        (MenuItem::Admin, Char('a'), _) => {
            guard.admin_add();
            Effects::none()
        }
        (MenuItem::Admin, Char('x') | KeyCode::Delete, _) => {
            guard.admin_delete();
            Effects::none()
        }
        (MenuItem::Admin, Char('e'), _) => {
            guard.admin_edit();
            Effects::none()
        }
        (MenuItem::Admin, Char('u'), _) => {
            guard.admin_edit_stream();
            Effects::none()
        }
        (MenuItem::Admin, Char('d'), _) => {
            guard.admin_edit_fest_start();
            Effects::none()
        }
        (MenuItem::Admin, Char('n'), _) if admin_focus == AdminFocus::Sports => {
            guard.admin_toggle_flag(SportFlag::Nrr)
        }
        (MenuItem::Admin, Char('g'), _) if admin_focus == AdminFocus::Sports => {
            guard.admin_toggle_flag(SportFlag::Gd)
        }
        (MenuItem::Admin, Char('p'), _) if admin_focus == AdminFocus::Sports => {
            guard.admin_toggle_flag(SportFlag::Pd)
        }
        (MenuItem::Admin, Char('s'), _) => guard.admin_cycle_status(),
        (MenuItem::Admin, Char('+') | Char('='), _) => guard.admin_adjust_points(1),
        (MenuItem::Admin, Char('-'), _) => guard.admin_adjust_points(-1),
        (MenuItem::Admin, Char('t'), _) => {
            guard.admin_toggle_export_format();
            Effects::none()
        }
        (MenuItem::Admin, Char('E'), _) => guard.admin_export(),
        (MenuItem::Admin, Char('L'), _) => guard.admin_sign_out(),

        // Global
        (_, Char('f'), _) => {
            guard.toggle_full_screen();
            Effects::none()
        }
        (_, Char('"'), _) => {
            guard.toggle_show_logs();
            Effects::none()
        }

        _ => Effects::none(),
    };

    drop(guard);
    dispatch(effects, network_requests, chat_commands).await;
}

pub async fn dispatch(
    effects: Effects,
    network_requests: &mpsc::Sender<NetworkRequest>,
    chat_commands: &mpsc::Sender<ChatCommand>,
) {
    if effects.is_empty() {
        return;
    }
    for request in effects.network {
        let _ = network_requests.send(request).await;
    }
    for command in effects.chat {
        let _ = chat_commands.send(command).await;
    }
}
