use crate::state::messages::NetworkRequest;
use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use fest_api::sync::MatchDraft;
use fest_api::{FestDay, MatchPatch, Sport, SportPatch, Team, TeamPatch};

/// What an open admin prompt writes, and to which row.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptKind {
    NewGroup { sport_id: String },
    NewTeam { group_id: String },
    NewMatch { sport_id: String, group_name: Option<String> },
    TeamStats { team_id: String },
    Scoring { sport_id: String },
    SportStream { sport_id: String },
    MatchStream { match_id: String },
    FestStart,
    DeleteGroup { group_id: String, name: String },
    DeleteTeam { team_id: String, name: String },
    DeleteMatch { match_id: String, name: String },
}

impl PromptKind {
    pub fn title(&self) -> String {
        match self {
            PromptKind::NewGroup { .. } => "New group".to_string(),
            PromptKind::NewTeam { .. } => "New team".to_string(),
            PromptKind::NewMatch { .. } => "New match".to_string(),
            PromptKind::TeamStats { .. } => "Team statistics".to_string(),
            PromptKind::Scoring { .. } => "Scoring rules".to_string(),
            PromptKind::SportStream { .. } => "Sport stream URL".to_string(),
            PromptKind::MatchStream { .. } => "Match stream URL".to_string(),
            PromptKind::FestStart => "Fest start".to_string(),
            PromptKind::DeleteGroup { name, .. } => format!("Delete group {name} and its teams?"),
            PromptKind::DeleteTeam { name, .. } => format!("Delete team {name}?"),
            PromptKind::DeleteMatch { name, .. } => format!("Delete match {name}?"),
        }
    }

    /// The expected input, shown under the prompt.
    pub fn hint(&self) -> &'static str {
        match self {
            PromptKind::NewGroup { .. } | PromptKind::NewTeam { .. } => "name",
            PromptKind::NewMatch { .. } => "<day 1-4> <HH:MM> <team A> vs <team B> [@ venue]",
            PromptKind::TeamStats { .. } => "P W L D Pts NRR GD PD",
            PromptKind::Scoring { .. } => "win draw loss points",
            PromptKind::SportStream { .. } | PromptKind::MatchStream { .. } => {
                "URL, empty to clear"
            }
            PromptKind::FestStart => "YYYY-MM-DD HH:MM (UTC) or RFC 3339",
            PromptKind::DeleteGroup { .. }
            | PromptKind::DeleteTeam { .. }
            | PromptKind::DeleteMatch { .. } => "y to delete, any other key to cancel",
        }
    }

    pub fn is_confirm(&self) -> bool {
        matches!(
            self,
            PromptKind::DeleteGroup { .. } | PromptKind::DeleteTeam { .. } | PromptKind::DeleteMatch { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminPrompt {
    pub kind: PromptKind,
    pub input: String,
}

impl AdminPrompt {
    pub fn new(kind: PromptKind) -> Self {
        Self { kind, input: String::new() }
    }

    pub fn with_input(kind: PromptKind, input: impl Into<String>) -> Self {
        Self { kind, input: input.into() }
    }

    /// The write the typed line stands for, or what is wrong with it.
    pub fn submit(&self) -> Result<NetworkRequest, String> {
        let input = self.input.trim();
        let request = match &self.kind {
            PromptKind::NewGroup { sport_id } => NetworkRequest::CreateGroup {
                sport_id: sport_id.clone(),
                name: input.to_string(),
            },
            PromptKind::NewTeam { group_id } => NetworkRequest::CreateTeam {
                group_id: group_id.clone(),
                name: input.to_string(),
            },
            PromptKind::NewMatch { sport_id, group_name } => NetworkRequest::CreateMatch {
                draft: parse_match_line(sport_id, group_name.as_deref(), input)?,
            },
            PromptKind::TeamStats { team_id } => NetworkRequest::UpdateTeam {
                team_id: team_id.clone(),
                patch: parse_team_stats(input)?,
            },
            PromptKind::Scoring { sport_id } => NetworkRequest::UpdateSport {
                sport_id: sport_id.clone(),
                patch: parse_scoring(input)?,
            },
            PromptKind::SportStream { sport_id } => NetworkRequest::SetSportStream {
                sport_id: sport_id.clone(),
                url: input.to_string(),
            },
            PromptKind::MatchStream { match_id } => NetworkRequest::UpdateMatch {
                match_id: match_id.clone(),
                patch: MatchPatch {
                    live_stream_url: Some((!input.is_empty()).then(|| input.to_string())),
                    ..MatchPatch::default()
                },
            },
            PromptKind::FestStart => NetworkRequest::UpdateFestStart { start: parse_fest_start(input)? },
            PromptKind::DeleteGroup { group_id, .. } => {
                NetworkRequest::DeleteGroup { group_id: group_id.clone() }
            }
            PromptKind::DeleteTeam { team_id, .. } => {
                NetworkRequest::DeleteTeam { team_id: team_id.clone() }
            }
            PromptKind::DeleteMatch { match_id, .. } => {
                NetworkRequest::DeleteMatch { match_id: match_id.clone() }
            }
        };
        Ok(request)
    }
}

/// A team's statistics in the order the stats prompt takes them.
pub fn team_stats_line(team: &Team) -> String {
    format!(
        "{} {} {} {} {} {:.3} {} {}",
        team.matches_played,
        team.wins,
        team.losses,
        team.draws,
        team.points,
        team.net_run_rate,
        team.goal_difference,
        team.point_difference
    )
}

pub fn scoring_line(sport: &Sport) -> String {
    format!("{} {} {}", sport.win_points, sport.draw_points, sport.loss_points)
}

fn whole_number<T: std::str::FromStr>(token: &str) -> Result<T, String> {
    token.parse().map_err(|_| format!("'{token}' is not a whole number"))
}

fn parse_team_stats(input: &str) -> Result<TeamPatch, String> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let [p, w, l, d, pts, nrr, gd, pd] = tokens.as_slice() else {
        return Err("Expected 8 values: P W L D Pts NRR GD PD".to_string());
    };
    let net_run_rate: f64 = nrr
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| format!("'{nrr}' is not a number"))?;
    Ok(TeamPatch {
        matches_played: Some(whole_number(p)?),
        wins: Some(whole_number(w)?),
        losses: Some(whole_number(l)?),
        draws: Some(whole_number(d)?),
        points: Some(whole_number(pts)?),
        net_run_rate: Some(net_run_rate),
        goal_difference: Some(whole_number(gd)?),
        point_difference: Some(whole_number(pd)?),
        ..TeamPatch::default()
    })
}

fn parse_scoring(input: &str) -> Result<SportPatch, String> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let [win, draw, loss] = tokens.as_slice() else {
        return Err("Expected 3 values: win draw loss".to_string());
    };
    Ok(SportPatch {
        win_points: Some(whole_number(win)?),
        draw_points: Some(whole_number(draw)?),
        loss_points: Some(whole_number(loss)?),
        ..SportPatch::default()
    })
}

/// Day as 1-4 or as its date code ("22".."25").
fn parse_day(token: &str) -> Result<FestDay, String> {
    let by_index = token
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| FestDay::ALL.get(i).copied());
    by_index
        .or_else(|| FestDay::from_code(token))
        .ok_or_else(|| format!("'{token}' is not a fest day (1-4)"))
}

fn parse_match_line(sport_id: &str, group_name: Option<&str>, input: &str) -> Result<MatchDraft, String> {
    let mut parts = input.splitn(3, char::is_whitespace);
    let (Some(day), Some(time), Some(rest)) = (parts.next(), parts.next(), parts.next()) else {
        return Err("Expected <day> <HH:MM> <team A> vs <team B>".to_string());
    };
    let match_date = parse_day(day)?;
    NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| format!("'{time}' is not a time (HH:MM)"))?;

    let (fixture, venue) = match rest.split_once(" @ ") {
        Some((fixture, venue)) => (fixture.trim(), venue.trim()),
        None => (rest.trim(), ""),
    };
    let (team_a, team_b, match_name) = match fixture.split_once(" vs ") {
        Some((a, b)) => (a.trim(), b.trim(), ""),
        None => ("", "", fixture),
    };

    Ok(MatchDraft {
        sport_id: sport_id.to_string(),
        match_name: match_name.to_string(),
        match_date,
        match_time: time.to_string(),
        venue: venue.to_string(),
        team_a: team_a.to_string(),
        team_b: team_b.to_string(),
        group_name: group_name.unwrap_or_default().to_string(),
        ..MatchDraft::default()
    })
}

fn parse_fest_start(input: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(start) = DateTime::parse_from_rfc3339(input) {
        return Ok(start.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M")
        .map(|naive| naive.and_utc())
        .map_err(|_| format!("'{input}' is not a date (YYYY-MM-DD HH:MM)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stats(input: &str) -> Result<NetworkRequest, String> {
        AdminPrompt::with_input(PromptKind::TeamStats { team_id: "t-cs".into() }, input).submit()
    }

    #[test]
    fn team_stats_line_parses_every_column() {
        let team = Team {
            matches_played: 3,
            wins: 2,
            losses: 1,
            points: 4,
            net_run_rate: -0.25,
            ..Team::default()
        };
        let line = team_stats_line(&team);
        assert_eq!(line, "3 2 1 0 4 -0.250 0 0");

        let Ok(NetworkRequest::UpdateTeam { team_id, patch }) = stats(&line) else {
            panic!("expected a team update");
        };
        assert_eq!(team_id, "t-cs");
        assert_eq!(patch.wins, Some(2));
        assert_eq!(patch.net_run_rate, Some(-0.25));
        assert_eq!(patch.point_difference, Some(0));
        assert_eq!(patch.name, None);
    }

    #[test]
    fn team_stats_reject_bad_values() {
        assert_eq!(stats("1 2 3").unwrap_err(), "Expected 8 values: P W L D Pts NRR GD PD");
        assert_eq!(stats("1 1 0 0 2 NaN 0 0").unwrap_err(), "'NaN' is not a number");
        assert_eq!(stats("1 1 0 0 2 inf 0 0").unwrap_err(), "'inf' is not a number");
        assert_eq!(stats("1 one 0 0 2 0 0 0").unwrap_err(), "'one' is not a whole number");
    }

    #[test]
    fn scoring_rules_must_be_non_negative() {
        let prompt = AdminPrompt::with_input(PromptKind::Scoring { sport_id: "chess".into() }, "1 0 0");
        assert_eq!(
            prompt.submit(),
            Ok(NetworkRequest::UpdateSport {
                sport_id: "chess".into(),
                patch: SportPatch {
                    win_points: Some(1),
                    draw_points: Some(0),
                    loss_points: Some(0),
                    ..SportPatch::default()
                },
            })
        );
        let negative = AdminPrompt::with_input(PromptKind::Scoring { sport_id: "chess".into() }, "2 -1 0");
        assert_eq!(negative.submit().unwrap_err(), "'-1' is not a whole number");
    }

    #[test]
    fn match_line_names_the_fixture_from_its_teams() {
        let kind = PromptKind::NewMatch { sport_id: "cricket".into(), group_name: Some("Group A".into()) };
        let prompt = AdminPrompt::with_input(kind, "2 14:30 CSE vs ECE @ Main Ground");
        let Ok(NetworkRequest::CreateMatch { draft }) = prompt.submit() else {
            panic!("expected a match draft");
        };
        assert_eq!(draft.match_date, FestDay::Day2);
        assert_eq!(draft.match_time, "14:30");
        assert_eq!(draft.venue, "Main Ground");
        assert_eq!(draft.group_name, "Group A");

        let insert = draft.validate().unwrap();
        assert_eq!(insert.match_name, "CSE vs ECE");
        assert_eq!(insert.team_b.as_deref(), Some("ECE"));
    }

    #[test]
    fn match_line_without_teams_keeps_its_name() {
        let kind = PromptKind::NewMatch { sport_id: "pentathlon".into(), group_name: None };
        let prompt = AdminPrompt::with_input(kind, "25 09:00 Heats 1");
        let Ok(NetworkRequest::CreateMatch { draft }) = prompt.submit() else {
            panic!("expected a match draft");
        };
        assert_eq!(draft.match_date, FestDay::Day4);
        assert_eq!(draft.match_name, "Heats 1");
        assert!(draft.team_a.is_empty());
        assert!(draft.venue.is_empty());
    }

    #[test]
    fn match_line_rejects_bad_day_and_time() {
        let kind = PromptKind::NewMatch { sport_id: "cricket".into(), group_name: None };
        let day = AdminPrompt::with_input(kind.clone(), "5 10:00 A vs B").submit();
        assert_eq!(day.unwrap_err(), "'5' is not a fest day (1-4)");
        let time = AdminPrompt::with_input(kind.clone(), "1 25:00 A vs B").submit();
        assert_eq!(time.unwrap_err(), "'25:00' is not a time (HH:MM)");
        let short = AdminPrompt::with_input(kind, "1 10:00").submit();
        assert!(short.is_err());
    }

    #[test]
    fn blank_stream_url_clears_the_link() {
        let prompt = AdminPrompt::with_input(PromptKind::MatchStream { match_id: "m-02".into() }, "  ");
        let Ok(NetworkRequest::UpdateMatch { patch, .. }) = prompt.submit() else {
            panic!("expected a match update");
        };
        assert_eq!(patch.live_stream_url, Some(None));
        assert_eq!(patch.status, None);
    }

    #[test]
    fn fest_start_accepts_plain_and_rfc3339_dates() {
        let expected = Utc.with_ymd_and_hms(2027, 1, 22, 3, 30, 0).unwrap();
        assert_eq!(parse_fest_start("2027-01-22 03:30"), Ok(expected));
        assert_eq!(parse_fest_start("2027-01-22T09:00:00+05:30"), Ok(expected));
        assert!(parse_fest_start("next friday").is_err());
    }

    #[test]
    fn delete_prompts_only_confirm() {
        let kind = PromptKind::DeleteGroup { group_id: "cricket-b".into(), name: "Group B".into() };
        assert!(kind.is_confirm());
        assert_eq!(kind.title(), "Delete group Group B and its teams?");
        assert_eq!(
            AdminPrompt::new(kind).submit(),
            Ok(NetworkRequest::DeleteGroup { group_id: "cricket-b".into() })
        );
    }
}
