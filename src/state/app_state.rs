use crate::app::MenuItem;
use crate::state::admin_form::AdminPrompt;
use crate::state::messages::{AdminScope, AdminView};
use chrono::{DateTime, Local, Utc};
use fest_api::auth::AdminGate;
use fest_api::countdown::Countdown;
use fest_api::export::ExportFormat;
use fest_api::ranking::Standing;
use fest_api::{FestDay, Group, MatchWithSport, Sport, SportCategory, Team};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub const NOTIFICATION_TTL: Duration = Duration::from_secs(4);
const CHAT_SCROLLBACK: usize = 200;

// ---------------------------------------------------------------------------
// Sports browser
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SportsState {
    pub category: SportCategory,
    pub sports: Vec<Sport>,
    pub selected: usize,
    pub loaded: bool,
}

impl SportsState {
    /// Replace the list, keeping the cursor on the same sport when it is still there.
    pub fn load(&mut self, sports: Vec<Sport>) {
        let keep = self.selected_sport().map(|s| s.id.clone());
        self.sports = sports;
        self.loaded = true;
        self.selected = keep
            .and_then(|id| self.sports.iter().position(|s| s.id == id))
            .unwrap_or(0);
    }

    pub fn selected_sport(&self) -> Option<&Sport> {
        self.sports.get(self.selected)
    }

    pub fn next_category(&mut self) {
        self.category = self.category.next();
        self.sports.clear();
        self.selected = 0;
        self.loaded = false;
    }

    pub fn down(&mut self) {
        if self.selected + 1 < self.sports.len() {
            self.selected += 1;
        }
    }

    pub fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ScheduleState {
    pub day: FestDay,
    pub matches: Vec<MatchWithSport>,
    pub scroll_offset: u16,
    pub loaded: bool,
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self {
            day: FestDay::Day1,
            matches: Vec::new(),
            scroll_offset: 0,
            loaded: false,
        }
    }
}

impl ScheduleState {
    /// Move to another day. Returns false at either end of the festival.
    pub fn shift_day(&mut self, forward: bool) -> bool {
        let next = if forward { self.day.next() } else { self.day.prev() };
        match next {
            Some(day) => {
                self.day = day;
                self.matches.clear();
                self.scroll_offset = 0;
                self.loaded = false;
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Points tables
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StandingsState {
    pub sport_id: Option<String>,
    pub sport: Option<Sport>,
    pub tables: Vec<(Group, Vec<Standing>)>,
    /// Every match of the sport, in schedule order.
    pub fixtures: Vec<MatchWithSport>,
    pub scroll_offset: u16,
    pub loaded: bool,
}

impl StandingsState {
    /// Point the view at another sport and forget what was shown for the old one.
    pub fn show(&mut self, sport_id: &str) -> bool {
        if self.sport_id.as_deref() == Some(sport_id) {
            return false;
        }
        *self = Self { sport_id: Some(sport_id.to_string()), ..Self::default() };
        true
    }
}

// ---------------------------------------------------------------------------
// Live matches
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct LiveState {
    pub matches: Vec<MatchWithSport>,
    pub refreshed_at: Option<DateTime<Local>>,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatLine {
    pub id: String,
    pub username: String,
    pub message: String,
    /// Local "HH:MM" of the post.
    pub time: String,
    pub is_system: bool,
}

impl From<fest_api::ChatMessage> for ChatLine {
    fn from(msg: fest_api::ChatMessage) -> Self {
        let time = msg
            .created_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Local).format("%H:%M").to_string())
            .unwrap_or_default();
        Self {
            id: msg.id,
            username: msg.username,
            message: msg.message,
            time,
            is_system: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct ChatState {
    /// Sport whose room is shown; updates for any other sport are ignored.
    pub sport_id: Option<String>,
    pub sport_name: String,
    pub messages: Vec<ChatLine>,
    pub input: String,
    pub composing: bool,
    pub scroll_offset: u16,
    pub connected: bool,
    seen_ids: HashSet<String>,
}

impl ChatState {
    pub fn switch_to(&mut self, sport: &Sport) {
        *self = Self {
            sport_id: Some(sport.id.clone()),
            sport_name: sport.name.clone(),
            ..Self::default()
        };
    }

    pub fn is_showing(&self, sport_id: &str) -> bool {
        self.sport_id.as_deref() == Some(sport_id)
    }

    pub fn load_history(&mut self, history: Vec<fest_api::ChatMessage>) {
        for msg in history {
            self.ingest(msg.into());
        }
    }

    /// Append unless a message with the same id is already shown.
    pub fn ingest(&mut self, line: ChatLine) {
        if !line.id.is_empty() && !self.seen_ids.insert(line.id.clone()) {
            return;
        }
        self.messages.push(line);
        if self.messages.len() > CHAT_SCROLLBACK {
            let remove_count = self.messages.len() - CHAT_SCROLLBACK;
            for dropped in self.messages.drain(0..remove_count) {
                self.seen_ids.remove(&dropped.id);
            }
        }
    }

    pub fn push_system(&mut self, body: impl Into<String>) {
        let body = body.into();
        if let Some(last) = self.messages.last()
            && last.is_system
            && last.message == body
        {
            return;
        }
        self.messages.push(ChatLine {
            id: String::new(),
            username: "system".to_string(),
            message: body,
            time: Local::now().format("%H:%M").to_string(),
            is_system: true,
        });
    }

    /// Take the typed message for sending. Blank input just closes the composer.
    pub fn submit_input(&mut self) -> Option<String> {
        let msg = self.input.trim().to_string();
        self.composing = false;
        self.input.clear();
        if msg.is_empty() {
            return None;
        }
        self.scroll_offset = 0;
        Some(msg)
    }
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdminFocus {
    #[default]
    Sports,
    Groups,
    Teams,
    Matches,
}

impl AdminFocus {
    pub fn next(self) -> Self {
        match self {
            AdminFocus::Sports => AdminFocus::Groups,
            AdminFocus::Groups => AdminFocus::Teams,
            AdminFocus::Teams => AdminFocus::Matches,
            AdminFocus::Matches => AdminFocus::Sports,
        }
    }
}

#[derive(Debug, Default)]
pub struct AdminState {
    /// `None` until the access check has answered.
    pub gate: Option<AdminGate>,
    pub focus: AdminFocus,
    /// What the lists were last requested for.
    pub scope: AdminScope,
    pub sports: Vec<Sport>,
    pub groups: Vec<Group>,
    /// Teams of the scoped group.
    pub teams: Vec<Team>,
    /// Fixtures of the scoped sport.
    pub matches: Vec<MatchWithSport>,
    pub selected_sport: usize,
    pub selected_group: usize,
    pub selected_team: usize,
    pub selected_match: usize,
    pub prompt: Option<AdminPrompt>,
    pub export_format: ExportFormat,
    pub last_export: Vec<PathBuf>,
}

impl AdminState {
    pub fn is_granted(&self) -> bool {
        self.gate.is_some_and(|g| g.is_granted())
    }

    pub fn load(&mut self, view: AdminView) {
        if view.sport_id != self.scope.sport_id {
            self.selected_match = 0;
        }
        if view.group_id != self.scope.group_id {
            self.selected_team = 0;
        }
        self.selected_sport = position_of(&view.sports, view.sport_id.as_deref(), |s| &s.id);
        self.selected_group = position_of(&view.groups, view.group_id.as_deref(), |g| &g.id);
        self.selected_team = self.selected_team.min(view.teams.len().saturating_sub(1));
        self.selected_match = self.selected_match.min(view.matches.len().saturating_sub(1));
        self.scope = AdminScope { sport_id: view.sport_id, group_id: view.group_id };
        self.sports = view.sports;
        self.groups = view.groups;
        self.teams = view.teams;
        self.matches = view.matches;
    }

    /// Forget everything shown, e.g. after losing access.
    pub fn clear(&mut self) {
        *self = Self {
            gate: self.gate,
            export_format: self.export_format,
            ..Self::default()
        };
    }

    pub fn cycle_focus(&mut self) {
        self.focus = self.focus.next();
    }

    /// Move the cursor of the focused list. Returns the new scope when the
    /// move picked another sport or group.
    pub fn move_cursor(&mut self, down: bool) -> Option<AdminScope> {
        let (selected, len) = match self.focus {
            AdminFocus::Sports => (&mut self.selected_sport, self.sports.len()),
            AdminFocus::Groups => (&mut self.selected_group, self.groups.len()),
            AdminFocus::Teams => (&mut self.selected_team, self.teams.len()),
            AdminFocus::Matches => (&mut self.selected_match, self.matches.len()),
        };
        let before = *selected;
        if down {
            if *selected + 1 < len {
                *selected += 1;
            }
        } else {
            *selected = selected.saturating_sub(1);
        }
        if *selected == before {
            return None;
        }
        match self.focus {
            AdminFocus::Sports => {
                self.scope = AdminScope { sport_id: self.selected_sport().map(|s| s.id.clone()), group_id: None };
                Some(self.scope.clone())
            }
            AdminFocus::Groups => {
                self.scope.group_id = self.selected_group().map(|g| g.id.clone());
                Some(self.scope.clone())
            }
            AdminFocus::Teams | AdminFocus::Matches => None,
        }
    }

    pub fn selected_sport(&self) -> Option<&Sport> {
        self.sports.get(self.selected_sport)
    }

    pub fn selected_group(&self) -> Option<&Group> {
        self.groups.get(self.selected_group)
    }

    pub fn selected_match(&self) -> Option<&MatchWithSport> {
        self.matches.get(self.selected_match)
    }

    pub fn selected_team(&self) -> Option<&Team> {
        self.teams.get(self.selected_team)
    }
}

fn position_of<T>(rows: &[T], id: Option<&str>, id_of: impl Fn(&T) -> &String) -> usize {
    id.and_then(|id| rows.iter().position(|row| id_of(row) == id)).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub is_error: bool,
    pub shown_at: Instant,
}

// ---------------------------------------------------------------------------
// Root app state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AppState {
    pub active_tab: MenuItem,
    pub previous_tab: MenuItem,
    pub show_logs: bool,
    pub fest_start: Option<DateTime<Utc>>,
    pub countdown: Option<Countdown>,
    pub notification: Option<Notification>,
    pub sports: SportsState,
    pub schedule: ScheduleState,
    pub standings: StandingsState,
    pub live: LiveState,
    pub chat: ChatState,
    pub admin: AdminState,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&mut self, message: impl Into<String>, is_error: bool) {
        self.notification = Some(Notification {
            message: message.into(),
            is_error,
            shown_at: Instant::now(),
        });
    }

    pub fn expire_notification(&mut self, now: Instant) {
        if self
            .notification
            .as_ref()
            .is_some_and(|n| now.duration_since(n.shown_at) >= NOTIFICATION_TTL)
        {
            self.notification = None;
        }
    }
}
