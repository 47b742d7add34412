use crate::state::app_settings::AppSettings;
use crate::state::admin_form::{self, AdminPrompt, PromptKind};
use crate::state::app_state::{AdminFocus, AppState, ChatLine, ChatState};
use crate::state::messages::{AdminScope, AdminView, ChatCommand, ChatUpdate, NetworkRequest};
use chrono::{DateTime, Local, Utc};
use fest_api::auth::AdminGate;
use fest_api::cache::QueryKey;
use fest_api::countdown;
use fest_api::ranking::Standing;
use fest_api::{FestDay, Group, MatchWithSport, Settings, Sport, SportCategory, SportPatch, TeamPatch};
use log::debug;
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MenuItem {
    #[default]
    Sports,
    Schedule,
    Standings,
    Live,
    Chat,
    Admin,
    Help,
}

impl MenuItem {
    pub const TABS: [MenuItem; 6] = [
        MenuItem::Sports,
        MenuItem::Schedule,
        MenuItem::Standings,
        MenuItem::Live,
        MenuItem::Chat,
        MenuItem::Admin,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            MenuItem::Sports => "Sports",
            MenuItem::Schedule => "Schedule",
            MenuItem::Standings => "Points Table",
            MenuItem::Live => "Live",
            MenuItem::Chat => "Chat",
            MenuItem::Admin => "Admin",
            MenuItem::Help => "Help",
        }
    }
}

/// A tie-break column a sport can switch on or off.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SportFlag {
    Nrr,
    Gd,
    Pd,
}

/// Work the key handler or main loop has to hand to the workers once the
/// app lock is released.
#[derive(Debug, Default, PartialEq)]
pub struct Effects {
    pub network: Vec<NetworkRequest>,
    pub chat: Vec<ChatCommand>,
}

impl Effects {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn request(request: NetworkRequest) -> Self {
        Self { network: vec![request], chat: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.network.is_empty() && self.chat.is_empty()
    }

    fn and(mut self, other: Effects) -> Self {
        self.network.extend(other.network);
        self.chat.extend(other.chat);
        self
    }
}

pub struct App {
    pub settings: AppSettings,
    pub state: AppState,
}

impl App {
    pub fn new(settings: AppSettings) -> Self {
        if let Some(level) = settings.log_level {
            log::set_max_level(level);
            tui_logger::set_default_level(level);
        }

        Self { state: AppState::new(), settings }
    }

    /// Everything the first screen and the header need.
    pub fn startup(&self) -> Effects {
        Effects {
            network: vec![
                NetworkRequest::LoadSettings,
                NetworkRequest::LoadSports { category: self.state.sports.category },
                NetworkRequest::LoadRunning,
                NetworkRequest::CheckAdmin,
            ],
            chat: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Network response handlers, called from main_ui_loop
    // -----------------------------------------------------------------------

    pub fn on_settings_loaded(&mut self, settings: Option<Settings>) {
        self.state.fest_start = settings.as_ref().and_then(Settings::fest_start);
        self.on_tick(Utc::now());
    }

    pub fn on_sports_loaded(&mut self, category: SportCategory, sports: Vec<Sport>) {
        if category != self.state.sports.category {
            debug!("dropping sports for {} (showing {})", category.as_str(), self.state.sports.category.as_str());
            return;
        }
        self.state.sports.load(sports);
    }

    pub fn on_schedule_loaded(&mut self, day: FestDay, matches: Vec<MatchWithSport>) {
        if day != self.state.schedule.day {
            debug!("dropping schedule for {} (showing {})", day.label(), self.state.schedule.day.label());
            return;
        }
        self.state.schedule.matches = matches;
        self.state.schedule.loaded = true;
    }

    pub fn on_standings_loaded(
        &mut self,
        sport_id: String,
        sport: Option<Sport>,
        tables: Vec<(Group, Vec<Standing>)>,
        fixtures: Vec<MatchWithSport>,
    ) {
        if self.state.standings.sport_id.as_deref() != Some(sport_id.as_str()) {
            debug!("dropping points tables for {sport_id}");
            return;
        }
        self.state.standings.sport = sport;
        self.state.standings.tables = tables;
        self.state.standings.fixtures = fixtures;
        self.state.standings.loaded = true;
    }

    pub fn on_running_loaded(&mut self, matches: Vec<MatchWithSport>) {
        self.state.live.matches = matches;
        self.state.live.refreshed_at = Some(Local::now());
    }

    pub fn on_admin_loaded(&mut self, scope: AdminScope, view: AdminView) {
        let admin = &mut self.state.admin;
        if !admin.is_granted() {
            return;
        }
        if scope != admin.scope {
            debug!("dropping admin lists for {scope:?}");
            return;
        }
        admin.load(view);
    }

    pub fn on_admin_checked(&mut self, gate: AdminGate) -> Effects {
        let admin = &mut self.state.admin;
        admin.gate = Some(gate);
        if !gate.is_granted() {
            admin.clear();
            return Effects::none();
        }
        if self.state.active_tab == MenuItem::Admin {
            return Effects::request(self.load_admin());
        }
        Effects::none()
    }

    fn load_admin(&self) -> NetworkRequest {
        NetworkRequest::LoadAdmin { scope: self.state.admin.scope.clone() }
    }

    pub fn on_saved(&mut self, message: String) {
        self.state.notify(message, false);
    }

    pub fn on_exported(&mut self, paths: Vec<PathBuf>) {
        let names: Vec<String> = paths
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        self.state.notify(format!("Exported {}", names.join(", ")), false);
        self.state.admin.last_export = paths;
    }

    pub fn on_error(&mut self, message: String) {
        self.state.notify(message, true);
    }

    /// A cached query the current screen reads has gone stale: ask for it again.
    pub fn on_data_invalidated(&self, key: &QueryKey) -> Effects {
        let state = &self.state;
        let request = match key {
            QueryKey::Settings => Some(NetworkRequest::LoadSettings),
            QueryKey::RunningMatches => Some(NetworkRequest::LoadRunning),
            QueryKey::SportsByCategory(category)
                if state.active_tab == MenuItem::Sports && *category == state.sports.category =>
            {
                Some(NetworkRequest::LoadSports { category: *category })
            }
            QueryKey::MatchesByDate(day)
                if state.active_tab == MenuItem::Schedule && *day == state.schedule.day =>
            {
                Some(NetworkRequest::LoadSchedule { day: *day })
            }
            QueryKey::Sport(id) | QueryKey::GroupsBySport(id) | QueryKey::MatchesBySport(id)
                if state.active_tab == MenuItem::Standings
                    && state.standings.sport_id.as_deref() == Some(id.as_str()) =>
            {
                Some(NetworkRequest::LoadStandings { sport_id: id.clone() })
            }
            QueryKey::TeamsByGroup(group_id) if state.active_tab == MenuItem::Standings => {
                let shown = state.standings.tables.iter().any(|(g, _)| g.id == *group_id);
                match (&state.standings.sport_id, shown) {
                    (Some(sport_id), true) => {
                        Some(NetworkRequest::LoadStandings { sport_id: sport_id.clone() })
                    }
                    _ => None,
                }
            }
            key if state.active_tab == MenuItem::Admin
                && state.admin.is_granted()
                && self.admin_reads(key) =>
            {
                Some(self.load_admin())
            }
            _ => None,
        };
        request.map(Effects::request).unwrap_or_default()
    }

    /// Whether the admin lists were read from `key`.
    fn admin_reads(&self, key: &QueryKey) -> bool {
        let scope = &self.state.admin.scope;
        match key {
            QueryKey::Sports => true,
            QueryKey::GroupsBySport(id) | QueryKey::MatchesBySport(id) => {
                scope.sport_id.as_deref() == Some(id.as_str())
            }
            QueryKey::TeamsByGroup(id) => scope.group_id.as_deref() == Some(id.as_str()),
            _ => false,
        }
    }

    // -----------------------------------------------------------------------
    // Chat updates
    // -----------------------------------------------------------------------

    pub fn on_chat_update(&mut self, sport_id: &str, update: ChatUpdate) {
        let chat = &mut self.state.chat;
        if !chat.is_showing(sport_id) {
            debug!("dropping chat update for {sport_id}");
            return;
        }
        match update {
            ChatUpdate::History(history) => chat.load_history(history),
            ChatUpdate::Connected => {
                chat.connected = true;
                chat.push_system(format!("joined {} chat", chat.sport_name));
            }
            ChatUpdate::Disconnected => {
                if chat.connected {
                    chat.push_system("chat disconnected, retrying...");
                }
                chat.connected = false;
            }
            ChatUpdate::Message(msg) => chat.ingest(ChatLine::from(msg)),
            ChatUpdate::Error(message) => chat.push_system(format!("chat error: {message}")),
        }
    }

    pub fn chat_submit(&mut self) -> Effects {
        match self.state.chat.submit_input() {
            Some(message) => Effects {
                network: Vec::new(),
                chat: vec![ChatCommand::Send { message }],
            },
            None => Effects::none(),
        }
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    pub fn on_tick(&mut self, now: DateTime<Utc>) {
        self.state.countdown = self
            .state
            .fest_start
            .map(|start| countdown::time_until(start, now));
        self.state.expire_notification(std::time::Instant::now());
    }

    // -----------------------------------------------------------------------
    // Tab management
    // -----------------------------------------------------------------------

    pub fn update_tab(&mut self, next: MenuItem) -> Effects {
        if self.state.active_tab == next {
            return Effects::none();
        }
        let mut effects = Effects::none();
        if self.state.active_tab == MenuItem::Chat {
            self.state.chat = ChatState::default();
            effects.chat.push(ChatCommand::Close);
        }
        self.state.previous_tab = self.state.active_tab;
        self.state.active_tab = next;
        effects.and(self.enter_tab())
    }

    fn enter_tab(&mut self) -> Effects {
        let state = &mut self.state;
        match state.active_tab {
            MenuItem::Sports => {
                Effects::request(NetworkRequest::LoadSports { category: state.sports.category })
            }
            MenuItem::Schedule => {
                state.schedule.scroll_offset = 0;
                Effects::request(NetworkRequest::LoadSchedule { day: state.schedule.day })
            }
            MenuItem::Standings => {
                let Some(sport) = state.sports.selected_sport() else {
                    state.notify("Pick a sport on the Sports tab first", true);
                    return Effects::none();
                };
                let sport_id = sport.id.clone();
                state.standings.show(&sport_id);
                Effects::request(NetworkRequest::LoadStandings { sport_id })
            }
            MenuItem::Live => Effects::request(NetworkRequest::LoadRunning),
            MenuItem::Chat => {
                let Some(sport) = state.sports.selected_sport().cloned() else {
                    state.notify("Pick a sport on the Sports tab first", true);
                    return Effects::none();
                };
                state.chat.switch_to(&sport);
                Effects {
                    network: Vec::new(),
                    chat: vec![ChatCommand::Open { sport_id: sport.id }],
                }
            }
            MenuItem::Admin => match state.admin.gate {
                Some(gate) if gate.is_granted() => {
                    Effects::request(NetworkRequest::LoadAdmin { scope: state.admin.scope.clone() })
                }
                Some(_) => Effects::none(),
                None => Effects::request(NetworkRequest::CheckAdmin),
            },
            MenuItem::Help => Effects::none(),
        }
    }

    pub fn exit_help(&mut self) -> Effects {
        if self.state.active_tab == MenuItem::Help {
            return self.update_tab(self.state.previous_tab);
        }
        Effects::none()
    }

    pub fn toggle_show_logs(&mut self) {
        self.state.show_logs = !self.state.show_logs;
    }

    pub fn toggle_full_screen(&mut self) {
        self.settings.full_screen = !self.settings.full_screen;
    }

    // -----------------------------------------------------------------------
    // Sports
    // -----------------------------------------------------------------------

    pub fn sports_next_category(&mut self) -> Effects {
        self.state.sports.next_category();
        Effects::request(NetworkRequest::LoadSports { category: self.state.sports.category })
    }

    /// Open the points table of the highlighted sport.
    pub fn sports_open_table(&mut self) -> Effects {
        if self.state.sports.selected_sport().is_none() {
            return Effects::none();
        }
        if self.state.active_tab == MenuItem::Standings {
            return Effects::none();
        }
        self.update_tab(MenuItem::Standings)
    }

    // -----------------------------------------------------------------------
    // Schedule
    // -----------------------------------------------------------------------

    pub fn schedule_shift_day(&mut self, forward: bool) -> Effects {
        if self.state.schedule.shift_day(forward) {
            Effects::request(NetworkRequest::LoadSchedule { day: self.state.schedule.day })
        } else {
            Effects::none()
        }
    }

    pub fn schedule_scroll(&mut self, down: bool) {
        let schedule = &mut self.state.schedule;
        schedule.scroll_offset = if down {
            let max = schedule.matches.len().saturating_sub(1) as u16;
            (schedule.scroll_offset + 1).min(max)
        } else {
            schedule.scroll_offset.saturating_sub(1)
        };
    }

    // -----------------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------------

    /// The admin lists accept actions only with access and no open prompt.
    fn admin_focused(&self, focus: AdminFocus) -> bool {
        let admin = &self.state.admin;
        admin.is_granted() && admin.prompt.is_none() && admin.focus == focus
    }

    pub fn admin_cycle_focus(&mut self) {
        self.state.admin.cycle_focus();
    }

    pub fn admin_move(&mut self, down: bool) -> Effects {
        match self.state.admin.move_cursor(down) {
            Some(scope) => Effects::request(NetworkRequest::LoadAdmin { scope }),
            None => Effects::none(),
        }
    }

    pub fn admin_cycle_status(&mut self) -> Effects {
        if !self.admin_focused(AdminFocus::Matches) {
            return Effects::none();
        }
        let Some(selected) = self.state.admin.selected_match() else {
            return Effects::none();
        };
        Effects::request(NetworkRequest::SetMatchStatus {
            match_id: selected.details.id.clone(),
            status: selected.details.status.cycle(),
        })
    }

    pub fn admin_adjust_points(&mut self, delta: i32) -> Effects {
        if !self.admin_focused(AdminFocus::Teams) {
            return Effects::none();
        }
        let Some(team) = self.state.admin.selected_team() else {
            return Effects::none();
        };
        Effects::request(NetworkRequest::UpdateTeam {
            team_id: team.id.clone(),
            patch: TeamPatch { points: Some((team.points + delta).max(0)), ..TeamPatch::default() },
        })
    }

    /// Flip one of the selected sport's tie-break columns.
    pub fn admin_toggle_flag(&mut self, flag: SportFlag) -> Effects {
        if !self.admin_focused(AdminFocus::Sports) {
            return Effects::none();
        }
        let Some(sport) = self.state.admin.selected_sport() else {
            return Effects::none();
        };
        let mut patch = SportPatch::default();
        match flag {
            SportFlag::Nrr => patch.uses_nrr = Some(!sport.uses_nrr),
            SportFlag::Gd => patch.uses_gd = Some(!sport.uses_gd),
            SportFlag::Pd => patch.uses_pd = Some(!sport.uses_pd),
        }
        Effects::request(NetworkRequest::UpdateSport { sport_id: sport.id.clone(), patch })
    }

    fn open_prompt(&mut self, prompt: Option<AdminPrompt>) {
        match prompt {
            Some(prompt) => self.state.admin.prompt = Some(prompt),
            None => self.state.notify("Nothing selected", true),
        }
    }

    /// Open the "add" form of the focused list.
    pub fn admin_add(&mut self) {
        let admin = &self.state.admin;
        if !admin.is_granted() || admin.prompt.is_some() {
            return;
        }
        let kind = match admin.focus {
            AdminFocus::Sports => return,
            AdminFocus::Groups => admin
                .selected_sport()
                .map(|s| PromptKind::NewGroup { sport_id: s.id.clone() }),
            AdminFocus::Teams => admin
                .selected_group()
                .map(|g| PromptKind::NewTeam { group_id: g.id.clone() }),
            AdminFocus::Matches => admin.selected_sport().map(|s| PromptKind::NewMatch {
                sport_id: s.id.clone(),
                group_name: admin.selected_group().map(|g| g.name.clone()),
            }),
        };
        self.open_prompt(kind.map(AdminPrompt::new));
    }

    /// Ask to confirm deleting the focused row.
    pub fn admin_delete(&mut self) {
        let admin = &self.state.admin;
        if !admin.is_granted() || admin.prompt.is_some() {
            return;
        }
        let kind = match admin.focus {
            AdminFocus::Sports => return,
            AdminFocus::Groups => admin.selected_group().map(|g| PromptKind::DeleteGroup {
                group_id: g.id.clone(),
                name: g.name.clone(),
            }),
            AdminFocus::Teams => admin.selected_team().map(|t| PromptKind::DeleteTeam {
                team_id: t.id.clone(),
                name: t.name.clone(),
            }),
            AdminFocus::Matches => admin.selected_match().map(|m| PromptKind::DeleteMatch {
                match_id: m.details.id.clone(),
                name: m.details.match_name.clone(),
            }),
        };
        self.open_prompt(kind.map(AdminPrompt::new));
    }

    /// Edit the focused sport's scoring rules or the focused team's statistics.
    pub fn admin_edit(&mut self) {
        let admin = &self.state.admin;
        if !admin.is_granted() || admin.prompt.is_some() {
            return;
        }
        let prompt = match admin.focus {
            AdminFocus::Sports => admin.selected_sport().map(|s| {
                AdminPrompt::with_input(
                    PromptKind::Scoring { sport_id: s.id.clone() },
                    admin_form::scoring_line(s),
                )
            }),
            AdminFocus::Teams => admin.selected_team().map(|t| {
                AdminPrompt::with_input(
                    PromptKind::TeamStats { team_id: t.id.clone() },
                    admin_form::team_stats_line(t),
                )
            }),
            AdminFocus::Groups | AdminFocus::Matches => return,
        };
        self.open_prompt(prompt);
    }

    /// Edit the stream link of the focused sport or match.
    pub fn admin_edit_stream(&mut self) {
        let admin = &self.state.admin;
        if !admin.is_granted() || admin.prompt.is_some() {
            return;
        }
        let prompt = match admin.focus {
            AdminFocus::Sports => admin.selected_sport().map(|s| {
                AdminPrompt::with_input(
                    PromptKind::SportStream { sport_id: s.id.clone() },
                    s.live_stream_url.clone().unwrap_or_default(),
                )
            }),
            AdminFocus::Matches => admin.selected_match().map(|m| {
                AdminPrompt::with_input(
                    PromptKind::MatchStream { match_id: m.details.id.clone() },
                    m.details.live_stream_url.clone().unwrap_or_default(),
                )
            }),
            AdminFocus::Groups | AdminFocus::Teams => return,
        };
        self.open_prompt(prompt);
    }

    pub fn admin_edit_fest_start(&mut self) {
        let admin = &self.state.admin;
        if !admin.is_granted() || admin.prompt.is_some() {
            return;
        }
        let current = self
            .state
            .fest_start
            .map(|start| start.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        self.state.admin.prompt = Some(AdminPrompt::with_input(PromptKind::FestStart, current));
    }

    /// A typed character. On a delete confirmation `y` deletes and any other
    /// key cancels.
    pub fn admin_prompt_char(&mut self, c: char) -> Effects {
        let Some(prompt) = self.state.admin.prompt.as_mut() else {
            return Effects::none();
        };
        if prompt.kind.is_confirm() {
            if c.eq_ignore_ascii_case(&'y') {
                return self.admin_submit_prompt();
            }
            self.admin_cancel_prompt();
            return Effects::none();
        }
        prompt.input.push(c);
        Effects::none()
    }

    pub fn admin_prompt_backspace(&mut self) {
        if let Some(prompt) = self.state.admin.prompt.as_mut() {
            prompt.input.pop();
        }
    }

    pub fn admin_cancel_prompt(&mut self) {
        self.state.admin.prompt = None;
    }

    /// Send what the prompt describes. A line that does not parse keeps the
    /// prompt open and says what is wrong.
    pub fn admin_submit_prompt(&mut self) -> Effects {
        let Some(prompt) = self.state.admin.prompt.as_ref() else {
            return Effects::none();
        };
        match prompt.submit() {
            Ok(request) => {
                self.state.admin.prompt = None;
                Effects::request(request)
            }
            Err(message) => {
                self.state.notify(message, true);
                Effects::none()
            }
        }
    }

    pub fn admin_sign_out(&mut self) -> Effects {
        if self.state.admin.gate.is_none() || self.state.admin.prompt.is_some() {
            return Effects::none();
        }
        Effects::request(NetworkRequest::SignOut)
    }

    pub fn admin_toggle_export_format(&mut self) {
        let admin = &mut self.state.admin;
        admin.export_format = admin.export_format.toggle();
    }

    pub fn admin_export(&self) -> Effects {
        if !self.state.admin.is_granted() {
            return Effects::none();
        }
        Effects::request(NetworkRequest::Export {
            format: self.state.admin.export_format,
            dir: self.settings.export_dir.clone(),
        })
    }

    /// Matches currently in progress, for the header banner.
    pub fn running_count(&self) -> usize {
        self.state.live.matches.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fest_api::countdown::Countdown;
    use crate::state::messages::AdminScope;
    use fest_api::{ChatMessage, Match, MatchStatus, Team};

    fn app() -> App {
        App::new(AppSettings::default())
    }

    fn sport(id: &str) -> Sport {
        Sport { id: id.into(), name: id.to_uppercase(), ..Sport::default() }
    }

    fn app_with_sports() -> App {
        let mut app = app();
        app.on_sports_loaded(SportCategory::Team, vec![sport("cricket"), sport("football")]);
        app
    }

    fn running(id: &str, status: MatchStatus) -> MatchWithSport {
        MatchWithSport {
            details: Match { id: id.into(), status, ..Match::default() },
            sport: None,
        }
    }

    #[test]
    fn startup_loads_header_and_first_tab() {
        let effects = app().startup();
        assert_eq!(
            effects.network,
            vec![
                NetworkRequest::LoadSettings,
                NetworkRequest::LoadSports { category: SportCategory::Team },
                NetworkRequest::LoadRunning,
                NetworkRequest::CheckAdmin,
            ]
        );
    }

    #[test]
    fn stale_schedule_answer_is_dropped() {
        let mut app = app();
        app.update_tab(MenuItem::Schedule);
        app.schedule_shift_day(true);
        app.on_schedule_loaded(FestDay::Day1, vec![running("m-01", MatchStatus::Upcoming)]);
        assert!(!app.state.schedule.loaded);
        app.on_schedule_loaded(FestDay::Day2, vec![running("m-06", MatchStatus::Upcoming)]);
        assert_eq!(app.state.schedule.matches.len(), 1);
    }

    #[test]
    fn stale_sports_answer_is_dropped() {
        let mut app = app();
        app.sports_next_category();
        app.on_sports_loaded(SportCategory::Team, vec![sport("cricket")]);
        assert!(app.state.sports.sports.is_empty());
    }

    #[test]
    fn standings_follow_selected_sport() {
        let mut app = app_with_sports();
        app.state.sports.down();
        let effects = app.sports_open_table();
        assert_eq!(app.state.active_tab, MenuItem::Standings);
        assert_eq!(
            effects.network,
            vec![NetworkRequest::LoadStandings { sport_id: "football".into() }]
        );

        app.on_standings_loaded("cricket".into(), Some(sport("cricket")), Vec::new(), Vec::new());
        assert!(!app.state.standings.loaded);
        app.on_standings_loaded(
            "football".into(),
            Some(sport("football")),
            Vec::new(),
            vec![running("m-12", MatchStatus::Upcoming)],
        );
        assert!(app.state.standings.loaded);
        assert_eq!(app.state.standings.fixtures.len(), 1);

        assert_eq!(
            app.on_data_invalidated(&QueryKey::MatchesBySport("football".into())).network,
            vec![NetworkRequest::LoadStandings { sport_id: "football".into() }]
        );
        assert!(app.on_data_invalidated(&QueryKey::MatchesBySport("cricket".into())).is_empty());
    }

    #[test]
    fn chat_room_is_scoped_to_the_tab() {
        let mut app = app_with_sports();
        let effects = app.update_tab(MenuItem::Chat);
        assert_eq!(effects.chat, vec![ChatCommand::Open { sport_id: "cricket".into() }]);

        let msg = ChatMessage { id: "c-7".into(), sport_id: "cricket".into(), ..ChatMessage::default() };
        app.on_chat_update("football", ChatUpdate::Message(msg.clone()));
        assert!(app.state.chat.messages.is_empty());
        app.on_chat_update("cricket", ChatUpdate::Message(msg));
        assert_eq!(app.state.chat.messages.len(), 1);

        let effects = app.update_tab(MenuItem::Live);
        assert_eq!(effects.chat, vec![ChatCommand::Close]);
        assert_eq!(effects.network, vec![NetworkRequest::LoadRunning]);
        assert!(app.state.chat.sport_id.is_none());
    }

    #[test]
    fn chat_without_sport_notifies() {
        let mut app = app();
        let effects = app.update_tab(MenuItem::Chat);
        assert!(effects.is_empty());
        assert!(app.state.notification.as_ref().is_some_and(|n| n.is_error));
    }

    #[test]
    fn invalidation_reloads_only_what_is_shown() {
        let mut app = app();
        app.update_tab(MenuItem::Schedule);
        assert_eq!(
            app.on_data_invalidated(&QueryKey::MatchesByDate(FestDay::Day1)).network,
            vec![NetworkRequest::LoadSchedule { day: FestDay::Day1 }]
        );
        assert!(app.on_data_invalidated(&QueryKey::MatchesByDate(FestDay::Day3)).is_empty());
        assert!(app.on_data_invalidated(&QueryKey::Teams).is_empty());
        assert_eq!(
            app.on_data_invalidated(&QueryKey::RunningMatches).network,
            vec![NetworkRequest::LoadRunning]
        );
    }

    fn group(id: &str, sport_id: &str, name: &str) -> Group {
        Group { id: id.into(), sport_id: sport_id.into(), name: name.into() }
    }

    fn cricket_view() -> AdminView {
        AdminView {
            sports: vec![sport("chess"), sport("cricket")],
            sport_id: Some("cricket".into()),
            groups: vec![group("cricket-a", "cricket", "Group A"), group("cricket-b", "cricket", "Group B")],
            group_id: Some("cricket-a".into()),
            teams: vec![Team { id: "t-cs".into(), name: "CSE".into(), points: 0, ..Team::default() }],
            matches: vec![running("m-01", MatchStatus::Running)],
        }
    }

    /// An app on the admin tab, granted, showing the cricket lists.
    fn admin_app() -> App {
        let mut app = app();
        app.update_tab(MenuItem::Admin);
        app.on_admin_checked(AdminGate::Granted);
        app.on_admin_loaded(AdminScope::default(), cricket_view());
        app
    }

    fn focus(app: &mut App, focus: AdminFocus) {
        while app.state.admin.focus != focus {
            app.admin_cycle_focus();
        }
    }

    #[test]
    fn admin_actions_need_access() {
        let mut app = app();
        app.update_tab(MenuItem::Admin);
        app.on_admin_loaded(AdminScope::default(), cricket_view());
        assert!(app.state.admin.matches.is_empty());
        focus(&mut app, AdminFocus::Matches);
        assert!(app.admin_cycle_status().is_empty());

        let effects = app.on_admin_checked(AdminGate::Granted);
        assert_eq!(effects.network, vec![NetworkRequest::LoadAdmin { scope: AdminScope::default() }]);
        app.on_admin_loaded(AdminScope::default(), cricket_view());
        assert_eq!(
            app.admin_cycle_status().network,
            vec![NetworkRequest::SetMatchStatus {
                match_id: "m-01".into(),
                status: MatchStatus::Completed
            }]
        );
    }

    #[test]
    fn points_never_go_negative() {
        let mut app = admin_app();
        focus(&mut app, AdminFocus::Teams);
        assert_eq!(
            app.admin_adjust_points(-1).network,
            vec![NetworkRequest::UpdateTeam {
                team_id: "t-cs".into(),
                patch: TeamPatch { points: Some(0), ..TeamPatch::default() },
            }]
        );
    }

    #[test]
    fn moving_between_sports_rescopes_the_lists() {
        let mut app = admin_app();
        assert_eq!(app.state.admin.selected_sport, 1);
        assert_eq!(app.state.admin.scope.group_id.as_deref(), Some("cricket-a"));

        let effects = app.admin_move(false);
        let chess = AdminScope { sport_id: Some("chess".into()), group_id: None };
        assert_eq!(effects.network, vec![NetworkRequest::LoadAdmin { scope: chess.clone() }]);
        assert!(app.admin_move(false).is_empty());

        // A late answer for cricket no longer applies.
        app.on_admin_loaded(AdminScope::default(), cricket_view());
        assert_eq!(app.state.admin.scope, chess);

        focus(&mut app, AdminFocus::Matches);
        assert!(app.admin_move(true).is_empty());
    }

    #[test]
    fn moving_between_groups_keeps_the_sport() {
        let mut app = admin_app();
        focus(&mut app, AdminFocus::Groups);
        assert_eq!(
            app.admin_move(true).network,
            vec![NetworkRequest::LoadAdmin {
                scope: AdminScope { sport_id: Some("cricket".into()), group_id: Some("cricket-b".into()) },
            }]
        );
    }

    #[test]
    fn admin_invalidation_follows_the_scope() {
        let app = admin_app();
        let reload = vec![NetworkRequest::LoadAdmin {
            scope: AdminScope { sport_id: Some("cricket".into()), group_id: Some("cricket-a".into()) },
        }];
        assert_eq!(app.on_data_invalidated(&QueryKey::Sports).network, reload);
        assert_eq!(app.on_data_invalidated(&QueryKey::MatchesBySport("cricket".into())).network, reload);
        assert_eq!(app.on_data_invalidated(&QueryKey::TeamsByGroup("cricket-a".into())).network, reload);
        assert!(app.on_data_invalidated(&QueryKey::TeamsByGroup("cricket-b".into())).is_empty());
        assert!(app.on_data_invalidated(&QueryKey::GroupsBySport("chess".into())).is_empty());
    }

    #[test]
    fn team_stats_prompt_is_prefilled_and_submitted() {
        let mut app = admin_app();
        focus(&mut app, AdminFocus::Teams);
        app.admin_edit();
        assert_eq!(
            app.state.admin.prompt.as_ref().map(|p| p.input.as_str()),
            Some("0 0 0 0 0 0.000 0 0")
        );

        // Ignored while a prompt is open.
        assert!(app.admin_adjust_points(1).is_empty());

        while app.state.admin.prompt.as_ref().is_some_and(|p| !p.input.is_empty()) {
            app.admin_prompt_backspace();
        }
        for c in "1 1 0 0 2 0.75 0 0".chars() {
            app.admin_prompt_char(c);
        }
        let effects = app.admin_submit_prompt();
        assert!(app.state.admin.prompt.is_none());
        let [NetworkRequest::UpdateTeam { team_id, patch }] = effects.network.as_slice() else {
            panic!("expected one team update, got {:?}", effects.network);
        };
        assert_eq!(team_id, "t-cs");
        assert_eq!(patch.points, Some(2));
        assert_eq!(patch.net_run_rate, Some(0.75));
    }

    #[test]
    fn bad_prompt_input_stays_open_with_an_error() {
        let mut app = admin_app();
        focus(&mut app, AdminFocus::Matches);
        app.admin_add();
        for c in "9 10:00 A vs B".chars() {
            app.admin_prompt_char(c);
        }
        assert!(app.admin_submit_prompt().is_empty());
        assert!(app.state.admin.prompt.is_some());
        assert!(app.state.notification.as_ref().is_some_and(|n| n.is_error));

        app.admin_cancel_prompt();
        assert!(app.state.admin.prompt.is_none());
    }

    #[test]
    fn new_match_uses_the_scoped_sport_and_group() {
        let mut app = admin_app();
        focus(&mut app, AdminFocus::Matches);
        app.admin_add();
        for c in "1 10:00 CSE vs ECE".chars() {
            app.admin_prompt_char(c);
        }
        let effects = app.admin_submit_prompt();
        let [NetworkRequest::CreateMatch { draft }] = effects.network.as_slice() else {
            panic!("expected a new match, got {:?}", effects.network);
        };
        assert_eq!(draft.sport_id, "cricket");
        assert_eq!(draft.group_name, "Group A");
        assert_eq!(draft.match_date, FestDay::Day1);
    }

    #[test]
    fn delete_needs_a_y() {
        let mut app = admin_app();
        focus(&mut app, AdminFocus::Groups);
        app.admin_delete();
        assert!(app.admin_prompt_char('n').is_empty());
        assert!(app.state.admin.prompt.is_none());

        app.admin_delete();
        assert_eq!(
            app.admin_prompt_char('y').network,
            vec![NetworkRequest::DeleteGroup { group_id: "cricket-a".into() }]
        );
        assert!(app.state.admin.prompt.is_none());
    }

    #[test]
    fn sport_flags_toggle_from_current_value() {
        let mut app = admin_app();
        let effects = app.admin_toggle_flag(SportFlag::Gd);
        assert_eq!(
            effects.network,
            vec![NetworkRequest::UpdateSport {
                sport_id: "cricket".into(),
                patch: SportPatch { uses_gd: Some(true), ..SportPatch::default() },
            }]
        );
        focus(&mut app, AdminFocus::Teams);
        assert!(app.admin_toggle_flag(SportFlag::Gd).is_empty());
    }

    #[test]
    fn fest_start_prompt_shows_current_start() {
        let mut app = admin_app();
        app.state.fest_start = Some(Utc.with_ymd_and_hms(2027, 1, 22, 3, 30, 0).unwrap());
        app.admin_edit_fest_start();
        assert_eq!(
            app.state.admin.prompt,
            Some(AdminPrompt::with_input(PromptKind::FestStart, "2027-01-22 03:30"))
        );
        assert_eq!(
            app.admin_submit_prompt().network,
            vec![NetworkRequest::UpdateFestStart {
                start: Utc.with_ymd_and_hms(2027, 1, 22, 3, 30, 0).unwrap()
            }]
        );
    }

    #[test]
    fn signing_out_clears_the_admin_lists() {
        let mut app = admin_app();
        assert_eq!(app.admin_sign_out().network, vec![NetworkRequest::SignOut]);
        app.on_admin_checked(AdminGate::NotSignedIn);
        assert!(!app.state.admin.is_granted());
        assert!(app.state.admin.sports.is_empty());
        assert!(app.state.admin.matches.is_empty());
        assert_eq!(app.state.admin.scope, AdminScope::default());
    }

    #[test]
    fn countdown_tracks_fest_start() {
        let mut app = app();
        app.state.fest_start = Some(Utc.with_ymd_and_hms(2027, 1, 22, 3, 30, 0).unwrap());
        app.on_tick(Utc.with_ymd_and_hms(2027, 1, 22, 3, 29, 0).unwrap());
        assert_eq!(app.state.countdown.map(|c| c.display()), Some("0d 00h 01m 00s".into()));
        app.on_tick(Utc.with_ymd_and_hms(2027, 1, 22, 3, 30, 0).unwrap());
        assert_eq!(app.state.countdown, Some(Countdown::Live));
    }
}
