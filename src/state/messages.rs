use crate::state::network::LoadingState;
use crossterm::event::KeyEvent;
use fest_api::auth::AdminGate;
use fest_api::cache::QueryKey;
use fest_api::export::ExportFormat;
use fest_api::ranking::Standing;
use chrono::{DateTime, Utc};
use fest_api::sync::MatchDraft;
use fest_api::{
    ChatMessage, FestDay, Group, MatchPatch, MatchStatus, MatchWithSport, Settings, Sport, SportCategory,
    SportPatch, Team, TeamPatch,
};
use std::path::PathBuf;

/// Sport and group the admin lists are scoped to. `None` lets the worker
/// pick the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminScope {
    pub sport_id: Option<String>,
    pub group_id: Option<String>,
}

/// Everything the admin tab shows for one scope.
#[derive(Debug, Default)]
pub struct AdminView {
    pub sports: Vec<Sport>,
    pub sport_id: Option<String>,
    pub groups: Vec<Group>,
    pub group_id: Option<String>,
    pub teams: Vec<Team>,
    /// Every match of the scoped sport.
    pub matches: Vec<MatchWithSport>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NetworkRequest {
    LoadSettings,
    LoadSports { category: SportCategory },
    LoadSchedule { day: FestDay },
    LoadStandings { sport_id: String },
    LoadRunning,
    /// Re-read running matches even if the cached copy is fresh.
    RefreshRunning,
    LoadAdmin { scope: AdminScope },
    CheckAdmin,
    SignOut,
    UpdateFestStart { start: DateTime<Utc> },
    UpdateSport { sport_id: String, patch: SportPatch },
    SetSportStream { sport_id: String, url: String },
    CreateGroup { sport_id: String, name: String },
    DeleteGroup { group_id: String },
    CreateTeam { group_id: String, name: String },
    UpdateTeam { team_id: String, patch: TeamPatch },
    DeleteTeam { team_id: String },
    CreateMatch { draft: MatchDraft },
    UpdateMatch { match_id: String, patch: MatchPatch },
    SetMatchStatus { match_id: String, status: MatchStatus },
    DeleteMatch { match_id: String },
    Export { format: ExportFormat, dir: PathBuf },
}

/// Each load response names what it was requested for, so the app can drop
/// answers for a view it has since moved away from.
#[derive(Debug)]
pub enum NetworkResponse {
    LoadingStateChanged { loading_state: LoadingState },
    SettingsLoaded { settings: Option<Settings> },
    SportsLoaded { category: SportCategory, sports: Vec<Sport> },
    ScheduleLoaded { day: FestDay, matches: Vec<MatchWithSport> },
    StandingsLoaded {
        sport_id: String,
        sport: Option<Sport>,
        tables: Vec<(Group, Vec<Standing>)>,
        fixtures: Vec<MatchWithSport>,
    },
    RunningLoaded { matches: Vec<MatchWithSport> },
    AdminLoaded { scope: AdminScope, view: AdminView },
    AdminChecked { gate: AdminGate },
    Saved { message: String },
    Exported { paths: Vec<PathBuf> },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    Open { sport_id: String },
    Close,
    Send { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    History(Vec<ChatMessage>),
    Connected,
    Disconnected,
    Message(ChatMessage),
    Error(String),
}

/// Chat worker output, tagged with the sport whose room produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub sport_id: String,
    pub update: ChatUpdate,
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    KeyPressed(KeyEvent),
    Resize,
    AppStarted,
    /// Once a second: countdown and notification expiry.
    Tick,
    DataInvalidated(QueryKey),
}
