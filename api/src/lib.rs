pub mod auth;
pub mod cache;
pub mod client;
pub mod countdown;
pub mod export;
pub mod postgrest;
pub mod ranking;
pub mod realtime;
pub mod store;
pub mod sync;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain types, also the row shapes of the hosted store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SportCategory {
    #[default]
    Team,
    Individual,
    Minor,
}

impl SportCategory {
    pub const ALL: [SportCategory; 3] = [
        SportCategory::Team,
        SportCategory::Individual,
        SportCategory::Minor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SportCategory::Team => "team",
            SportCategory::Individual => "individual",
            SportCategory::Minor => "minor",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SportCategory::Team => "Team Sports",
            SportCategory::Individual => "Individual Sports",
            SportCategory::Minor => "Minor Sports",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SportCategory::Team => SportCategory::Individual,
            SportCategory::Individual => SportCategory::Minor,
            SportCategory::Minor => SportCategory::Team,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sport {
    pub id: String,
    pub name: String,
    pub category: SportCategory,
    pub icon: String,
    pub description: Option<String>,
    pub live_stream_url: Option<String>,
    pub win_points: u32,
    pub draw_points: u32,
    pub loss_points: u32,
    pub uses_nrr: bool,
    pub uses_gd: bool,
    pub uses_pd: bool,
}

impl Sport {
    pub fn tie_break_flags(&self) -> ranking::TieBreakFlags {
        ranking::TieBreakFlags {
            uses_nrr: self.uses_nrr,
            uses_gd: self.uses_gd,
            uses_pd: self.uses_pd,
        }
    }

    /// Points awarded for a single result under this sport's scoring rules.
    pub fn points_for(&self, outcome: Outcome) -> u32 {
        match outcome {
            Outcome::Win => self.win_points,
            Outcome::Draw => self.draw_points,
            Outcome::Loss => self.loss_points,
        }
    }

    /// "W/D/L" summary of the scoring rules, e.g. "2/1/0".
    pub fn scoring_summary(&self) -> String {
        format!("{}/{}/{}", self.win_points, self.draw_points, self.loss_points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub sport_id: String,
    pub name: String,
}

/// Standings row. All statistics are entered by admins; nothing here is
/// derived from recorded match results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub matches_played: i32,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub points: i32,
    pub net_run_rate: f64,
    pub goal_difference: i32,
    pub point_difference: i32,
}

/// The four festival days. Stored as the day-of-month code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FestDay {
    #[default]
    #[serde(rename = "22")]
    Day1,
    #[serde(rename = "23")]
    Day2,
    #[serde(rename = "24")]
    Day3,
    #[serde(rename = "25")]
    Day4,
}

impl FestDay {
    pub const ALL: [FestDay; 4] = [FestDay::Day1, FestDay::Day2, FestDay::Day3, FestDay::Day4];

    pub fn code(&self) -> &'static str {
        match self {
            FestDay::Day1 => "22",
            FestDay::Day2 => "23",
            FestDay::Day3 => "24",
            FestDay::Day4 => "25",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FestDay::Day1 => "Day 1",
            FestDay::Day2 => "Day 2",
            FestDay::Day3 => "Day 3",
            FestDay::Day4 => "Day 4",
        }
    }

    pub fn date_label(&self) -> &'static str {
        match self {
            FestDay::Day1 => "Jan 22",
            FestDay::Day2 => "Jan 23",
            FestDay::Day3 => "Jan 24",
            FestDay::Day4 => "Jan 25",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        FestDay::ALL.into_iter().find(|d| d.code() == code)
    }

    pub fn next(self) -> Option<Self> {
        match self {
            FestDay::Day1 => Some(FestDay::Day2),
            FestDay::Day2 => Some(FestDay::Day3),
            FestDay::Day3 => Some(FestDay::Day4),
            FestDay::Day4 => None,
        }
    }

    pub fn prev(self) -> Option<Self> {
        match self {
            FestDay::Day1 => None,
            FestDay::Day2 => Some(FestDay::Day1),
            FestDay::Day3 => Some(FestDay::Day2),
            FestDay::Day4 => Some(FestDay::Day3),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Group,
    Eliminator,
    Semifinal,
    Final,
}

impl MatchType {
    pub fn label(&self) -> &'static str {
        match self {
            MatchType::Group => "Group",
            MatchType::Eliminator => "Eliminator",
            MatchType::Semifinal => "Semi-final",
            MatchType::Final => "Final",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Upcoming,
    Running,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Upcoming => "upcoming",
            MatchStatus::Running => "running",
            MatchStatus::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchStatus::Upcoming => "UPCOMING",
            MatchStatus::Running => "LIVE",
            MatchStatus::Completed => "DONE",
        }
    }

    /// Admin status toggle order: upcoming → running → completed → upcoming.
    pub fn cycle(self) -> Self {
        match self {
            MatchStatus::Upcoming => MatchStatus::Running,
            MatchStatus::Running => MatchStatus::Completed,
            MatchStatus::Completed => MatchStatus::Upcoming,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub sport_id: String,
    pub match_name: String,
    pub match_date: FestDay,
    pub match_time: String,
    pub venue: Option<String>,
    pub team_a: Option<String>,
    pub team_b: Option<String>,
    pub match_type: MatchType,
    pub group_name: Option<String>,
    pub status: MatchStatus,
    pub live_stream_url: Option<String>,
}

impl Match {
    pub fn is_running(&self) -> bool {
        self.status == MatchStatus::Running
    }
}

/// The slice of a sport embedded in match list reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SportSummary {
    pub name: String,
    pub category: SportCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A match row joined with its owning sport (`select=*,sports(...)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchWithSport {
    #[serde(flatten)]
    pub details: Match,
    #[serde(rename = "sports", default)]
    pub sport: Option<SportSummary>,
}

impl MatchWithSport {
    pub fn sport_name(&self) -> &str {
        self.sport.as_ref().map(|s| s.name.as_str()).unwrap_or("")
    }
}

pub const SETTINGS_ID: &str = "global";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: String,
    pub fest_start_date: String,
}

impl Settings {
    pub fn fest_start(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::parse_from_rfc3339(&self.fest_start_date)
            .ok()
            .map(|dt| dt.with_timezone(&chrono::Utc))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sport_id: String,
    pub username: String,
    pub message: String,
    pub created_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Write payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewGroup {
    pub sport_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTeam {
    pub group_id: String,
    pub name: String,
    pub matches_played: i32,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub points: i32,
    pub net_run_rate: f64,
    pub goal_difference: i32,
    pub point_difference: i32,
}

impl NewTeam {
    /// A team with every statistic at zero.
    pub fn new(group_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn into_team(self, id: String) -> Team {
        Team {
            id,
            group_id: self.group_id,
            name: self.name,
            matches_played: self.matches_played,
            wins: self.wins,
            losses: self.losses,
            draws: self.draws,
            points: self.points,
            net_run_rate: self.net_run_rate,
            goal_difference: self.goal_difference,
            point_difference: self.point_difference,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMatch {
    pub sport_id: String,
    pub match_name: String,
    pub match_date: FestDay,
    pub match_time: String,
    pub venue: Option<String>,
    pub team_a: Option<String>,
    pub team_b: Option<String>,
    pub match_type: MatchType,
    pub group_name: Option<String>,
    pub status: MatchStatus,
    pub live_stream_url: Option<String>,
}

impl NewMatch {
    pub fn into_match(self, id: String) -> Match {
        Match {
            id,
            sport_id: self.sport_id,
            match_name: self.match_name,
            match_date: self.match_date,
            match_time: self.match_time,
            venue: self.venue,
            team_a: self.team_a,
            team_b: self.team_b,
            match_type: self.match_type,
            group_name: self.group_name,
            status: self.status,
            live_stream_url: self.live_stream_url,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub sport_id: String,
    pub username: String,
    pub message: String,
}

// Partial updates. `None` leaves a column untouched; for nullable columns
// `Some(None)` writes NULL.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fest_start_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SportPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_stream_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses_nrr: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses_gd: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses_pd: Option<bool>,
}

impl SportPatch {
    pub fn apply(&self, sport: &mut Sport) {
        if let Some(v) = &self.name {
            sport.name = v.clone();
        }
        if let Some(v) = &self.icon {
            sport.icon = v.clone();
        }
        if let Some(v) = &self.description {
            sport.description = v.clone();
        }
        if let Some(v) = &self.live_stream_url {
            sport.live_stream_url = v.clone();
        }
        if let Some(v) = self.win_points {
            sport.win_points = v;
        }
        if let Some(v) = self.draw_points {
            sport.draw_points = v;
        }
        if let Some(v) = self.loss_points {
            sport.loss_points = v;
        }
        if let Some(v) = self.uses_nrr {
            sport.uses_nrr = v;
        }
        if let Some(v) = self.uses_gd {
            sport.uses_gd = v;
        }
        if let Some(v) = self.uses_pd {
            sport.uses_pd = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches_played: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wins: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub losses: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draws: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_run_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_difference: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point_difference: Option<i32>,
}

impl TeamPatch {
    pub fn is_empty(&self) -> bool {
        *self == TeamPatch::default()
    }

    pub fn apply(&self, team: &mut Team) {
        if let Some(v) = &self.name {
            team.name = v.clone();
        }
        if let Some(v) = self.matches_played {
            team.matches_played = v;
        }
        if let Some(v) = self.wins {
            team.wins = v;
        }
        if let Some(v) = self.losses {
            team.losses = v;
        }
        if let Some(v) = self.draws {
            team.draws = v;
        }
        if let Some(v) = self.points {
            team.points = v;
        }
        if let Some(v) = self.net_run_rate {
            team.net_run_rate = v;
        }
        if let Some(v) = self.goal_difference {
            team.goal_difference = v;
        }
        if let Some(v) = self.point_difference {
            team.point_difference = v;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_date: Option<FestDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MatchStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_stream_url: Option<Option<String>>,
}

impl MatchPatch {
    pub fn status(status: MatchStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn apply(&self, m: &mut Match) {
        if let Some(v) = &self.match_name {
            m.match_name = v.clone();
        }
        if let Some(v) = self.match_date {
            m.match_date = v;
        }
        if let Some(v) = &self.match_time {
            m.match_time = v.clone();
        }
        if let Some(v) = &self.venue {
            m.venue = v.clone();
        }
        if let Some(v) = self.match_type {
            m.match_type = v;
        }
        if let Some(v) = &self.group_name {
            m.group_name = v.clone();
        }
        if let Some(v) = self.status {
            m.status = v;
        }
        if let Some(v) = &self.live_stream_url {
            m.live_stream_url = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fest_day_uses_day_codes_on_the_wire() {
        assert_eq!(serde_json::to_string(&FestDay::Day3).unwrap(), "\"24\"");
        let day: FestDay = serde_json::from_str("\"25\"").unwrap();
        assert_eq!(day, FestDay::Day4);
        assert_eq!(FestDay::from_code("22"), Some(FestDay::Day1));
        assert_eq!(FestDay::from_code("26"), None);
    }

    #[test]
    fn fest_day_navigation_stops_at_the_ends() {
        assert_eq!(FestDay::Day1.prev(), None);
        assert_eq!(FestDay::Day4.next(), None);
        assert_eq!(FestDay::Day2.next(), Some(FestDay::Day3));
    }

    #[test]
    fn match_status_cycle_wraps() {
        assert_eq!(MatchStatus::Upcoming.cycle(), MatchStatus::Running);
        assert_eq!(MatchStatus::Running.cycle(), MatchStatus::Completed);
        assert_eq!(MatchStatus::Completed.cycle(), MatchStatus::Upcoming);
    }

    #[test]
    fn match_with_sport_reads_joined_rows() {
        let row = r#"{
            "id": "m1", "sport_id": "cricket", "match_name": "CSE vs ECE",
            "match_date": "23", "match_time": "10:00", "venue": null,
            "team_a": "CSE", "team_b": "ECE", "match_type": "semifinal",
            "group_name": null, "status": "running", "live_stream_url": null,
            "sports": { "name": "Cricket", "category": "team", "icon": "🏏" }
        }"#;
        let m: MatchWithSport = serde_json::from_str(row).unwrap();
        assert_eq!(m.details.match_date, FestDay::Day2);
        assert_eq!(m.details.match_type, MatchType::Semifinal);
        assert!(m.details.is_running());
        assert_eq!(m.sport_name(), "Cricket");
    }

    #[test]
    fn team_patch_serializes_only_set_columns() {
        let patch = TeamPatch {
            points: Some(6),
            net_run_rate: Some(0.25),
            ..TeamPatch::default()
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value, serde_json::json!({ "points": 6, "net_run_rate": 0.25 }));
    }

    #[test]
    fn nullable_patch_column_can_be_cleared() {
        let patch = MatchPatch {
            venue: Some(None),
            ..MatchPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "venue": null })
        );
    }

    #[test]
    fn scoring_rules_lookup() {
        let sport = Sport {
            win_points: 3,
            draw_points: 1,
            loss_points: 0,
            ..Sport::default()
        };
        assert_eq!(sport.points_for(Outcome::Win), 3);
        assert_eq!(sport.points_for(Outcome::Draw), 1);
        assert_eq!(sport.scoring_summary(), "3/1/0");
    }
}
