mod app;
mod components;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::state::app_settings::{AppSettings, DataSource};
use crate::state::chat::ChatWorker;
use crate::state::messages::{ChatCommand, ChatResponse, NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{AdminAccess, LoadingState, NetworkWorker};
use crate::state::refresher::PeriodicRefresher;
use anyhow::Context;
use chrono::Utc;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use fest_api::auth::AuthClient;
use fest_api::cache::CacheEventKind;
use fest_api::client::{FestApi, StoreConfig};
use fest_api::store::{FestStore, MemoryStore};
use fest_api::sync::FestData;
use log::{error, info, warn};
use std::io::Stdout;
use std::sync::Arc;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Duration;
use tui::{Terminal, backend::CrosstermBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if handle_cli_args() {
        return Ok(());
    }

    better_panic::install();

    let settings = AppSettings::load();
    let (store, access) = connect(&settings).await?;
    let data = FestData::new(store).with_tie_break(settings.tie_break);

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal();

    tui_logger::init_logger(log::LevelFilter::Error)?;
    tui_logger::set_default_level(log::LevelFilter::Error);

    let chat_name = settings.chat_name.clone();
    let app = Arc::new(Mutex::new(App::new(settings)));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);
    let (chat_cmd_tx, chat_cmd_rx) = mpsc::channel::<ChatCommand>(100);
    let (chat_resp_tx, chat_resp_rx) = mpsc::channel::<ChatResponse>(100);

    // Input handler thread
    let input_handler = tokio::spawn(input_handler_task(ui_event_tx.clone()));

    // Cache watcher: views reload when data they show is invalidated
    let cache_task = tokio::spawn(cache_watcher_task(data.clone(), ui_event_tx.clone()));

    // Network thread
    let network_worker = NetworkWorker::new(data.clone(), access, network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Chat thread
    let chat_worker = ChatWorker::new(data, chat_name, chat_cmd_rx, chat_resp_tx);
    let chat_task = tokio::spawn(chat_worker.run());

    // Running matches refresh thread (every 30s)
    let periodic_updater = PeriodicRefresher::new(network_req_tx.clone());
    let periodic_task = tokio::spawn(periodic_updater.run());

    // Clock tick thread for the countdown and notifications
    let tick_tx = ui_event_tx.clone();
    let tick_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            if tick_tx.send(UiEvent::Tick).await.is_err() {
                break;
            }
        }
    });

    let _ = ui_event_tx.send(UiEvent::AppStarted).await;

    main_ui_loop(
        terminal,
        app,
        ui_event_rx,
        network_req_tx,
        network_resp_rx,
        chat_cmd_tx,
        chat_resp_rx,
    )
    .await;

    input_handler.abort();
    cache_task.abort();
    network_task.abort();
    chat_task.abort();
    periodic_task.abort();
    tick_task.abort();

    Ok(())
}

/// Builds the store for the configured data source and, when hosted, signs in
/// with the configured credentials so the admin tab can check the role.
async fn connect(settings: &AppSettings) -> anyhow::Result<(Arc<dyn FestStore>, AdminAccess)> {
    match &settings.source {
        DataSource::Hosted { url, anon_key } => {
            let api = FestApi::new(StoreConfig::new(url.as_str(), anon_key.as_str()));
            let auth = AuthClient::new(api.clone());
            let session = match &settings.credentials {
                Some(creds) => match auth.sign_in(&creds.email, &creds.password).await {
                    Ok(session) => Some(session),
                    Err(e) => {
                        warn!("sign in failed, continuing read-only: {e}");
                        None
                    }
                },
                None => None,
            };
            info!("using hosted store at {url}");
            Ok((Arc::new(api), AdminAccess::Hosted { auth, session }))
        }
        DataSource::Snapshot(Some(path)) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading fest snapshot {}", path.display()))?;
            let store = MemoryStore::from_json(&json)
                .with_context(|| format!("parsing fest snapshot {}", path.display()))?;
            Ok((Arc::new(store), AdminAccess::Local))
        }
        DataSource::Snapshot(None) => {
            let store = MemoryStore::demo().context("loading demo data")?;
            Ok((Arc::new(store), AdminAccess::Local))
        }
    }
}

fn handle_cli_args() -> bool {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return false;
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            true
        }
        "-V" | "--version" => {
            println!("festui {}", env!("CARGO_PKG_VERSION"));
            true
        }
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "festui - college sports festival terminal UI

Usage:
  festui
  festui --help
  festui --version

Environment:
  FESTUI_STORE_URL     Hosted store base URL (with FESTUI_STORE_KEY)
  FESTUI_STORE_KEY     Public API key for the hosted store
  FESTUI_FEST_JSON     Path to a local fest JSON snapshot (default: built-in demo)
  FESTUI_EMAIL         Admin account email for the hosted store
  FESTUI_PASSWORD      Admin account password
  FESTUI_CHAT_NAME     Name shown on chat messages (default Anonymous)
  FESTUI_TIEBREAK      Tie-break mode: flag-gated or literal (default flag-gated)
  FESTUI_EXPORT_DIR    Directory for backup exports (default .)
  FESTUI_LOG           Log level: error, warn, info, debug, trace"
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    mut ui_events: mpsc::Receiver<UiEvent>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
    chat_commands: mpsc::Sender<ChatCommand>,
    mut chat_responses: mpsc::Receiver<ChatResponse>,
) {
    let mut loading = LoadingState::default();

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let should_redraw = handle_ui_event(ui_event, &app, &network_requests, &chat_commands).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw =
                    handle_network_response(response, &app, &network_requests, &chat_commands, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = chat_responses.recv() => {
                handle_chat_response(response, &app).await;
                let mut app_guard = app.lock().await;
                draw::draw(&mut terminal, &mut app_guard, loading);
            }
        }
    }
}

async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    chat_commands: &mpsc::Sender<ChatCommand>,
) -> bool {
    match ui_event {
        UiEvent::AppStarted => {
            let effects = app.lock().await.startup();
            keys::dispatch(effects, network_requests, chat_commands).await;
            true
        }
        UiEvent::KeyPressed(key_event) => {
            keys::handle_key_bindings(key_event, app, network_requests, chat_commands).await;
            true
        }
        UiEvent::Resize => true,
        UiEvent::Tick => {
            app.lock().await.on_tick(Utc::now());
            true
        }
        UiEvent::DataInvalidated(key) => {
            let effects = app.lock().await.on_data_invalidated(&key);
            keys::dispatch(effects, network_requests, chat_commands).await;
            false
        }
    }
}

async fn handle_chat_response(response: ChatResponse, app: &Arc<Mutex<App>>) {
    let mut guard = app.lock().await;
    guard.on_chat_update(&response.sport_id, response.update);
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    network_requests: &mpsc::Sender<NetworkRequest>,
    chat_commands: &mpsc::Sender<ChatCommand>,
    loading: &mut LoadingState,
) -> bool {
    let mut guard = app.lock().await;
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        NetworkResponse::SettingsLoaded { settings } => guard.on_settings_loaded(settings),
        NetworkResponse::SportsLoaded { category, sports } => guard.on_sports_loaded(category, sports),
        NetworkResponse::ScheduleLoaded { day, matches } => guard.on_schedule_loaded(day, matches),
        NetworkResponse::StandingsLoaded { sport_id, sport, tables, fixtures } => {
            guard.on_standings_loaded(sport_id, sport, tables, fixtures)
        }
        NetworkResponse::RunningLoaded { matches } => guard.on_running_loaded(matches),
        NetworkResponse::AdminLoaded { scope, view } => guard.on_admin_loaded(scope, view),
        NetworkResponse::AdminChecked { gate } => {
            let effects = guard.on_admin_checked(gate);
            drop(guard);
            keys::dispatch(effects, network_requests, chat_commands).await;
            return !loading.is_loading;
        }
        NetworkResponse::Saved { message } => guard.on_saved(message),
        NetworkResponse::Exported { paths } => guard.on_exported(paths),
        NetworkResponse::Error { message } => {
            error!("Network error: {message}");
            guard.on_error(message);
        }
    }
    !loading.is_loading
}

/// Forwards cache invalidations to the UI loop. Refreshes are ignored: the
/// request that refreshed the entry already delivered the new data.
async fn cache_watcher_task(data: FestData, ui_events: mpsc::Sender<UiEvent>) {
    let mut events = data.cache().subscribe();
    while let Some(event) = events.recv().await {
        if event.kind != CacheEventKind::Invalidated {
            continue;
        }
        if ui_events.send(UiEvent::DataInvalidated(event.key)).await.is_err() {
            break;
        }
    }
}

async fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    loop {
        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.send(ui_event).await.is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::Hide);
    let _ = execute!(stdout, terminal::EnterAlternateScreen);
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = terminal::enable_raw_mode();
}

pub fn cleanup_terminal() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, cursor::MoveTo(0, 0));
    let _ = execute!(stdout, terminal::Clear(terminal::ClearType::All));
    let _ = execute!(stdout, terminal::LeaveAlternateScreen);
    let _ = execute!(stdout, cursor::Show);
    let _ = terminal::disable_raw_mode();
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
