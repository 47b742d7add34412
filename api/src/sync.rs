//! Cached reads and cache-invalidating writes over a [`FestStore`].
//!
//! Every read goes through the shared [`QueryCache`]. Every mutation is
//! validated, written, and only after the store acknowledged it are the
//! affected partitions invalidated:
//!
//! | write                               | invalidates        |
//! |-------------------------------------|--------------------|
//! | settings                            | settings           |
//! | sport                               | sports, sport      |
//! | create group                        | groups             |
//! | delete group                        | groups, teams      |
//! | create/update/delete team           | teams              |
//! | create/update/status/delete match   | matches            |
use crate::cache::{FromQueryData, QueryCache, QueryData, QueryKey, QueryRoot};
use crate::client::{ApiError, ApiResult};
use crate::export::ExportSet;
use crate::ranking::{self, Standing, TieBreakFlags, TieBreakMode};
use crate::realtime::ChatSubscription;
use crate::store::{FestStore, MatchFilter};
use crate::{
    ChatMessage, FestDay, Group, Match, MatchPatch, MatchStatus, MatchType, MatchWithSport,
    NewChatMessage, NewGroup, NewMatch, NewTeam, Settings, SettingsPatch, Sport, SportCategory,
    SportPatch, Team, TeamPatch,
};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// How often the running-matches banner is re-read.
pub const RUNNING_MATCHES_REFRESH: Duration = Duration::from_secs(30);
/// Chat history shown when a room is opened.
pub const CHAT_HISTORY_LIMIT: usize = 100;
pub const ANONYMOUS_USER: &str = "Anonymous";

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug)]
pub enum SyncError {
    /// Rejected before anything was sent to the store.
    Validation(String),
    Store {
        action: &'static str,
        source: ApiError,
    },
    /// A cache entry held a different kind of data than its key implies.
    CacheShape(QueryKey),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Validation(msg) => write!(f, "{msg}"),
            SyncError::Store { action, source } => write!(f, "Failed to {action}: {source}"),
            SyncError::CacheShape(key) => write!(f, "Unexpected cached data for {key}"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn store_err(action: &'static str) -> impl FnOnce(ApiError) -> SyncError {
    move |source| SyncError::Store { action, source }
}

/// Fields of the admin "add match" form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchDraft {
    pub sport_id: String,
    pub match_name: String,
    pub match_date: FestDay,
    pub match_time: String,
    pub venue: String,
    pub team_a: String,
    pub team_b: String,
    pub match_type: MatchType,
    pub group_name: String,
    pub live_stream_url: String,
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl MatchDraft {
    /// Check the draft and turn it into an insert payload. With both teams
    /// filled in the name becomes "A vs B"; blank optional fields become null.
    pub fn validate(&self) -> SyncResult<NewMatch> {
        if self.sport_id.trim().is_empty() || self.match_time.trim().is_empty() {
            return Err(SyncError::Validation("Please fill sport and time".to_string()));
        }
        let team_a = non_blank(&self.team_a);
        let team_b = non_blank(&self.team_b);
        let match_name = match (&team_a, &team_b) {
            (Some(a), Some(b)) => format!("{a} vs {b}"),
            _ => self.match_name.trim().to_string(),
        };
        if match_name.is_empty() {
            return Err(SyncError::Validation(
                "Please enter match name or both teams".to_string(),
            ));
        }
        Ok(NewMatch {
            sport_id: self.sport_id.trim().to_string(),
            match_name,
            match_date: self.match_date,
            match_time: self.match_time.trim().to_string(),
            venue: non_blank(&self.venue),
            team_a,
            team_b,
            match_type: self.match_type,
            group_name: non_blank(&self.group_name),
            status: MatchStatus::Upcoming,
            live_stream_url: non_blank(&self.live_stream_url),
        })
    }
}

/// Cached access to festival data. Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct FestData {
    store: Arc<dyn FestStore>,
    cache: Arc<QueryCache>,
    tie_break: TieBreakMode,
}

impl fmt::Debug for FestData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FestData")
            .field("cache", &self.cache.stats())
            .field("tie_break", &self.tie_break)
            .finish()
    }
}

impl FestData {
    pub fn new(store: Arc<dyn FestStore>) -> Self {
        Self {
            store,
            cache: Arc::new(QueryCache::new()),
            tie_break: TieBreakMode::default(),
        }
    }

    pub fn with_tie_break(mut self, mode: TieBreakMode) -> Self {
        self.tie_break = mode;
        self
    }

    pub fn tie_break(&self) -> TieBreakMode {
        self.tie_break
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn FestStore> {
        &self.store
    }

    async fn read<T, F, Fut>(&self, key: QueryKey, action: &'static str, load: F) -> SyncResult<T>
    where
        T: FromQueryData,
        F: FnOnce(Arc<dyn FestStore>) -> Fut,
        Fut: Future<Output = ApiResult<QueryData>>,
    {
        let store = self.store.clone();
        let data = self
            .cache
            .fetch(&key, || load(store))
            .await
            .map_err(store_err(action))?;
        T::from_query_data(&data).ok_or(SyncError::CacheShape(key))
    }

    /// Like `read`, but reloads even a fresh entry.
    async fn reread<T, F, Fut>(&self, key: QueryKey, action: &'static str, load: F) -> SyncResult<T>
    where
        T: FromQueryData,
        F: FnOnce(Arc<dyn FestStore>) -> Fut,
        Fut: Future<Output = ApiResult<QueryData>>,
    {
        let store = self.store.clone();
        let data = self
            .cache
            .refetch(&key, || load(store))
            .await
            .map_err(store_err(action))?;
        T::from_query_data(&data).ok_or(SyncError::CacheShape(key))
    }

    fn invalidate(&self, roots: &[QueryRoot]) {
        for root in roots {
            self.cache.invalidate(*root);
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn settings(&self) -> SyncResult<Option<Settings>> {
        self.read(QueryKey::Settings, "load settings", |store| async move {
            store.settings().await.map(QueryData::Settings)
        })
        .await
    }

    pub async fn fest_start(&self) -> SyncResult<Option<DateTime<Utc>>> {
        Ok(self.settings().await?.and_then(|s| s.fest_start()))
    }

    pub async fn sports(&self) -> SyncResult<Vec<Sport>> {
        self.read(QueryKey::Sports, "load sports", |store| async move {
            store.sports(None).await.map(QueryData::Sports)
        })
        .await
    }

    pub async fn sports_by_category(&self, category: SportCategory) -> SyncResult<Vec<Sport>> {
        self.read(
            QueryKey::SportsByCategory(category),
            "load sports",
            move |store| async move { store.sports(Some(category)).await.map(QueryData::Sports) },
        )
        .await
    }

    pub async fn sport(&self, id: &str) -> SyncResult<Option<Sport>> {
        let id = id.to_string();
        self.read(QueryKey::Sport(id.clone()), "load sport", |store| async move {
            store.sport(&id).await.map(QueryData::Sport)
        })
        .await
    }

    pub async fn groups_for_sport(&self, sport_id: &str) -> SyncResult<Vec<Group>> {
        let sport_id = sport_id.to_string();
        self.read(
            QueryKey::GroupsBySport(sport_id.clone()),
            "load groups",
            |store| async move { store.groups(Some(&sport_id)).await.map(QueryData::Groups) },
        )
        .await
    }

    pub async fn all_groups(&self) -> SyncResult<Vec<Group>> {
        self.read(QueryKey::Groups, "load groups", |store| async move {
            store.groups(None).await.map(QueryData::Groups)
        })
        .await
    }

    /// A group's teams as stored, unranked.
    pub async fn group_teams(&self, group_id: &str) -> SyncResult<Vec<Team>> {
        let group_id = group_id.to_string();
        self.read(
            QueryKey::TeamsByGroup(group_id.clone()),
            "load teams",
            |store| async move { store.teams(Some(&group_id)).await.map(QueryData::Teams) },
        )
        .await
    }

    /// A group's points table, ranked with the sport's tie-breakers.
    pub async fn group_standings(
        &self,
        group_id: &str,
        flags: TieBreakFlags,
    ) -> SyncResult<Vec<Standing>> {
        let teams = self.group_teams(group_id).await?;
        Ok(ranking::standings(teams, flags, self.tie_break))
    }

    /// Every group of a sport with its points table.
    pub async fn sport_tables(&self, sport_id: &str) -> SyncResult<Vec<(Group, Vec<Standing>)>> {
        let flags = self
            .sport(sport_id)
            .await?
            .map_or(TieBreakFlags::NONE, |s| s.tie_break_flags());
        let groups = self.groups_for_sport(sport_id).await?;
        let mut tables = Vec::with_capacity(groups.len());
        for group in groups {
            let table = self.group_standings(&group.id, flags).await?;
            tables.push((group, table));
        }
        Ok(tables)
    }

    pub async fn all_teams(&self) -> SyncResult<Vec<Team>> {
        let mut teams: Vec<Team> = self
            .read(QueryKey::Teams, "load teams", |store| async move {
                store.teams(None).await.map(QueryData::Teams)
            })
            .await?;
        ranking::default_order(&mut teams);
        Ok(teams)
    }

    pub async fn matches_by_date(&self, day: FestDay) -> SyncResult<Vec<MatchWithSport>> {
        self.read(QueryKey::MatchesByDate(day), "load matches", move |store| async move {
            store.matches(&MatchFilter::OnDay(day)).await.map(QueryData::Matches)
        })
        .await
    }

    pub async fn matches_by_sport(&self, sport_id: &str) -> SyncResult<Vec<MatchWithSport>> {
        let filter = MatchFilter::ForSport(sport_id.to_string());
        self.read(
            QueryKey::MatchesBySport(sport_id.to_string()),
            "load matches",
            |store| async move { store.matches(&filter).await.map(QueryData::Matches) },
        )
        .await
    }

    pub async fn all_matches(&self) -> SyncResult<Vec<MatchWithSport>> {
        self.read(QueryKey::Matches, "load matches", |store| async move {
            store.matches(&MatchFilter::All).await.map(QueryData::Matches)
        })
        .await
    }

    pub async fn running_matches(&self) -> SyncResult<Vec<MatchWithSport>> {
        self.read(QueryKey::RunningMatches, "load live matches", |store| async move {
            store.matches(&MatchFilter::Running).await.map(QueryData::Matches)
        })
        .await
    }

    /// Force a re-read of the running matches, whatever their freshness.
    /// Observers get a `Refreshed` event only, so views do not reload twice.
    pub async fn refresh_running_matches(&self) -> SyncResult<Vec<MatchWithSport>> {
        self.reread(QueryKey::RunningMatches, "load live matches", |store| async move {
            store.matches(&MatchFilter::Running).await.map(QueryData::Matches)
        })
        .await
    }

    /// Current matches, teams and groups for a backup.
    pub async fn export_set(&self) -> SyncResult<ExportSet> {
        Ok(ExportSet {
            matches: self.all_matches().await?,
            teams: self.all_teams().await?,
            groups: self.all_groups().await?,
        })
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub async fn update_fest_start(&self, start: DateTime<Utc>) -> SyncResult<()> {
        let patch = SettingsPatch {
            fest_start_date: Some(start.to_rfc3339()),
        };
        self.store
            .update_settings(&patch)
            .await
            .map_err(store_err("update fest start date"))?;
        info!("fest start date set to {start}");
        self.invalidate(&[QueryRoot::Settings]);
        Ok(())
    }

    pub async fn update_sport(&self, id: &str, patch: &SportPatch) -> SyncResult<()> {
        if patch.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
            return Err(SyncError::Validation("Sport name cannot be empty".to_string()));
        }
        self.store
            .update_sport(id, patch)
            .await
            .map_err(store_err("update sport"))?;
        self.invalidate(&[QueryRoot::Sports, QueryRoot::Sport]);
        Ok(())
    }

    /// Set or clear (blank `url`) a sport's live stream link.
    pub async fn set_sport_stream(&self, id: &str, url: &str) -> SyncResult<()> {
        let patch = SportPatch {
            live_stream_url: Some(non_blank(url)),
            ..SportPatch::default()
        };
        self.update_sport(id, &patch).await
    }

    pub async fn create_group(&self, sport_id: &str, name: &str) -> SyncResult<Group> {
        let (Some(sport_id), Some(name)) = (non_blank(sport_id), non_blank(name)) else {
            return Err(SyncError::Validation(
                "Select a sport and enter group name".to_string(),
            ));
        };
        let group = self
            .store
            .insert_group(&NewGroup { sport_id, name })
            .await
            .map_err(store_err("create group"))?;
        self.invalidate(&[QueryRoot::Groups]);
        Ok(group)
    }

    pub async fn delete_group(&self, id: &str) -> SyncResult<()> {
        self.store
            .delete_group(id)
            .await
            .map_err(store_err("delete group"))?;
        self.invalidate(&[QueryRoot::Groups, QueryRoot::Teams]);
        Ok(())
    }

    /// Add a team with every statistic at zero.
    pub async fn create_team(&self, group_id: &str, name: &str) -> SyncResult<Team> {
        let (Some(group_id), Some(name)) = (non_blank(group_id), non_blank(name)) else {
            return Err(SyncError::Validation(
                "Select a group and enter team name".to_string(),
            ));
        };
        let team = self
            .store
            .insert_team(&NewTeam::new(group_id, name))
            .await
            .map_err(store_err("add team"))?;
        self.invalidate(&[QueryRoot::Teams]);
        Ok(team)
    }

    pub async fn update_team(&self, id: &str, patch: &TeamPatch) -> SyncResult<()> {
        if patch.is_empty() {
            return Err(SyncError::Validation("Nothing to update".to_string()));
        }
        if patch.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
            return Err(SyncError::Validation("Team name cannot be empty".to_string()));
        }
        if patch.net_run_rate.is_some_and(|nrr| !nrr.is_finite()) {
            return Err(SyncError::Validation("Net run rate must be a number".to_string()));
        }
        self.store
            .update_team(id, patch)
            .await
            .map_err(store_err("update team"))?;
        self.invalidate(&[QueryRoot::Teams]);
        Ok(())
    }

    pub async fn delete_team(&self, id: &str) -> SyncResult<()> {
        self.store
            .delete_team(id)
            .await
            .map_err(store_err("delete team"))?;
        self.invalidate(&[QueryRoot::Teams]);
        Ok(())
    }

    pub async fn create_match(&self, draft: &MatchDraft) -> SyncResult<Match> {
        let new_match = draft.validate()?;
        let created = self
            .store
            .insert_match(&new_match)
            .await
            .map_err(store_err("add match"))?;
        debug!("created match {} ({})", created.id, created.match_name);
        self.invalidate(&[QueryRoot::Matches]);
        Ok(created)
    }

    pub async fn update_match(&self, id: &str, patch: &MatchPatch) -> SyncResult<()> {
        if patch.match_name.as_ref().is_some_and(|n| n.trim().is_empty()) {
            return Err(SyncError::Validation("Match name cannot be empty".to_string()));
        }
        self.store
            .update_match(id, patch)
            .await
            .map_err(store_err("update match"))?;
        self.invalidate(&[QueryRoot::Matches]);
        Ok(())
    }

    pub async fn set_match_status(&self, id: &str, status: MatchStatus) -> SyncResult<()> {
        self.store
            .update_match(id, &MatchPatch::status(status))
            .await
            .map_err(store_err("update match status"))?;
        info!("match {id} is now {}", status.as_str());
        self.invalidate(&[QueryRoot::Matches]);
        Ok(())
    }

    pub async fn delete_match(&self, id: &str) -> SyncResult<()> {
        self.store
            .delete_match(id)
            .await
            .map_err(store_err("delete match"))?;
        self.invalidate(&[QueryRoot::Matches]);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Chat (uncached)
    // -----------------------------------------------------------------------

    pub async fn chat_history(&self, sport_id: &str) -> SyncResult<Vec<ChatMessage>> {
        self.store
            .chat_history(sport_id, CHAT_HISTORY_LIMIT)
            .await
            .map_err(store_err("load chat"))
    }

    /// Post to a sport's chat. A blank name posts as "Anonymous"; a blank
    /// message is rejected.
    pub async fn send_chat(&self, sport_id: &str, username: &str, message: &str) -> SyncResult<()> {
        let Some(message) = non_blank(message) else {
            return Err(SyncError::Validation("Message is empty".to_string()));
        };
        let username = non_blank(username).unwrap_or_else(|| ANONYMOUS_USER.to_string());
        self.store
            .insert_chat_message(&NewChatMessage {
                sport_id: sport_id.to_string(),
                username,
                message,
            })
            .await
            .map_err(store_err("send message"))
    }

    pub fn subscribe_chat(&self, sport_id: &str) -> ChatSubscription {
        self.store.subscribe_chat(sport_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEventKind;
    use crate::store::{FestSnapshot, MemoryStore};

    fn team(id: &str, group: &str, points: i32, nrr: f64) -> Team {
        Team {
            id: id.into(),
            group_id: group.into(),
            name: id.to_uppercase(),
            points,
            net_run_rate: nrr,
            ..Team::default()
        }
    }

    fn cricket() -> Sport {
        Sport {
            id: "cricket".into(),
            name: "Cricket".into(),
            category: SportCategory::Team,
            win_points: 2,
            draw_points: 1,
            uses_nrr: true,
            ..Sport::default()
        }
    }

    fn fixture() -> (Arc<MemoryStore>, FestData) {
        let store = Arc::new(MemoryStore::new(FestSnapshot {
            settings: Some(Settings {
                id: crate::SETTINGS_ID.into(),
                fest_start_date: "2027-01-22T03:30:00Z".into(),
            }),
            sports: vec![cricket()],
            groups: vec![Group {
                id: "g1".into(),
                sport_id: "cricket".into(),
                name: "Group A".into(),
            }],
            teams: vec![
                team("mech", "g1", 2, -0.2),
                team("ece", "g1", 4, 0.1),
                team("cse", "g1", 4, 0.5),
            ],
            matches: vec![Match {
                id: "m1".into(),
                sport_id: "cricket".into(),
                match_name: "CSE vs ECE".into(),
                match_time: "09:00".into(),
                ..Match::default()
            }],
            chat_messages: vec![],
        }));
        let data = FestData::new(store.clone());
        (store, data)
    }

    fn names(table: &[Standing]) -> Vec<&str> {
        table.iter().map(|s| s.team.id.as_str()).collect()
    }

    #[tokio::test]
    async fn standings_rank_cached_rows() {
        let (store, data) = fixture();
        let table = data
            .group_standings("g1", cricket().tie_break_flags())
            .await
            .unwrap();
        assert_eq!(names(&table), vec!["cse", "ece", "mech"]);
        assert_eq!(table[0].position, 1);

        let reads = store.reads();
        data.group_standings("g1", cricket().tie_break_flags())
            .await
            .unwrap();
        assert_eq!(store.reads(), reads);
    }

    #[tokio::test]
    async fn team_update_reranks_on_next_read() {
        let (_store, data) = fixture();
        let flags = cricket().tie_break_flags();
        data.group_standings("g1", flags).await.unwrap();

        data.update_team(
            "mech",
            &TeamPatch {
                points: Some(6),
                ..TeamPatch::default()
            },
        )
        .await
        .unwrap();

        assert!(!data.cache().is_fresh(&QueryKey::TeamsByGroup("g1".into())));
        let table = data.group_standings("g1", flags).await.unwrap();
        assert_eq!(names(&table), vec!["mech", "cse", "ece"]);
    }

    #[tokio::test]
    async fn status_change_invalidates_every_match_view() {
        let (store, data) = fixture();
        assert!(data.running_matches().await.unwrap().is_empty());
        data.matches_by_date(FestDay::Day1).await.unwrap();
        let mut events = data.cache().subscribe();

        data.set_match_status("m1", MatchStatus::Running).await.unwrap();

        let event = events
            .recv_for(|e| e.key == QueryKey::RunningMatches)
            .await
            .unwrap();
        assert_eq!(event.kind, CacheEventKind::Invalidated);
        assert!(!data.cache().is_fresh(&QueryKey::MatchesByDate(FestDay::Day1)));

        let reads = store.reads();
        let running = data.running_matches().await.unwrap();
        assert_eq!(store.reads(), reads + 1);
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].details.id, "m1");
    }

    #[tokio::test]
    async fn failed_write_leaves_cache_fresh() {
        let (store, data) = fixture();
        data.group_teams("g1").await.unwrap();
        store.set_fail_writes(true);

        let err = data.delete_team("cse").await.unwrap_err();
        assert!(matches!(err, SyncError::Store { action: "delete team", .. }));
        assert!(err.to_string().starts_with("Failed to delete team"));
        assert!(data.cache().is_fresh(&QueryKey::TeamsByGroup("g1".into())));
    }

    #[tokio::test]
    async fn deleting_group_invalidates_groups_and_teams() {
        let (_store, data) = fixture();
        data.groups_for_sport("cricket").await.unwrap();
        data.all_teams().await.unwrap();

        data.delete_group("g1").await.unwrap();

        assert!(!data.cache().is_fresh(&QueryKey::GroupsBySport("cricket".into())));
        assert!(!data.cache().is_fresh(&QueryKey::Teams));
        assert!(data.all_teams().await.unwrap().is_empty());
        assert!(data.group_teams("g1").await.unwrap().is_empty());
        assert!(data.sport_tables("cricket").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cascade_empties_the_deleted_groups_cached_teams() {
        let (store, data) = fixture();
        assert_eq!(data.group_teams("g1").await.unwrap().len(), 3);

        data.delete_group("g1").await.unwrap();

        assert!(!data.cache().is_fresh(&QueryKey::TeamsByGroup("g1".into())));
        let reads = store.reads();
        assert!(data.group_teams("g1").await.unwrap().is_empty());
        assert_eq!(store.reads(), reads + 1);
    }

    #[tokio::test]
    async fn non_finite_run_rate_is_rejected() {
        let (store, data) = fixture();
        data.group_teams("g1").await.unwrap();
        for nrr in [f64::NAN, f64::INFINITY] {
            let err = data
                .update_team(
                    "cse",
                    &TeamPatch {
                        net_run_rate: Some(nrr),
                        ..TeamPatch::default()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, SyncError::Validation(_)));
        }
        assert!(data.cache().is_fresh(&QueryKey::TeamsByGroup("g1".into())));
        assert_eq!(store.snapshot().teams.iter().find(|t| t.id == "cse").map(|t| t.net_run_rate), Some(0.5));
    }

    #[tokio::test]
    async fn validation_fails_before_store_is_touched() {
        let (store, data) = fixture();
        store.set_fail_writes(true);

        let err = data.create_team("g1", "   ").await.unwrap_err();
        assert_eq!(err.to_string(), "Select a group and enter team name");
        let err = data.create_group("", "Group B").await.unwrap_err();
        assert_eq!(err.to_string(), "Select a sport and enter group name");
        let err = data
            .create_match(&MatchDraft {
                sport_id: "cricket".into(),
                ..MatchDraft::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Please fill sport and time");
    }

    #[test]
    fn match_draft_names_itself_from_teams() {
        let draft = MatchDraft {
            sport_id: "cricket".into(),
            match_time: "10:00".into(),
            match_name: "ignored".into(),
            team_a: "CSE".into(),
            team_b: "ECE".into(),
            venue: "  ".into(),
            ..MatchDraft::default()
        };
        let new_match = draft.validate().unwrap();
        assert_eq!(new_match.match_name, "CSE vs ECE");
        assert_eq!(new_match.venue, None);
        assert_eq!(new_match.status, MatchStatus::Upcoming);

        let nameless = MatchDraft {
            team_a: "CSE".into(),
            team_b: String::new(),
            match_name: String::new(),
            ..draft
        };
        assert_eq!(
            nameless.validate().unwrap_err().to_string(),
            "Please enter match name or both teams"
        );
    }

    #[tokio::test]
    async fn created_team_starts_at_zero_and_appears() {
        let (_store, data) = fixture();
        data.group_teams("g1").await.unwrap();
        let created = data.create_team("g1", "Civil").await.unwrap();
        assert_eq!(created.points, 0);
        assert_eq!(created.net_run_rate, 0.0);
        let teams = data.group_teams("g1").await.unwrap();
        assert_eq!(teams.len(), 4);
    }

    #[tokio::test]
    async fn refresh_rereads_running_matches_even_when_fresh() {
        let (store, data) = fixture();
        data.running_matches().await.unwrap();
        let reads = store.reads();
        let mut events = data.cache().subscribe();
        data.refresh_running_matches().await.unwrap();
        assert_eq!(store.reads(), reads + 1);
        assert!(data.cache().is_fresh(&QueryKey::RunningMatches));
        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, CacheEventKind::Refreshed);
    }

    #[tokio::test]
    async fn stream_url_blank_clears_it() {
        let (_store, data) = fixture();
        data.set_sport_stream("cricket", "https://stream.example/live").await.unwrap();
        assert_eq!(
            data.sport("cricket").await.unwrap().unwrap().live_stream_url.as_deref(),
            Some("https://stream.example/live")
        );
        data.set_sport_stream("cricket", " ").await.unwrap();
        assert_eq!(data.sport("cricket").await.unwrap().unwrap().live_stream_url, None);
    }

    #[tokio::test]
    async fn chat_posts_anonymously_when_name_blank() {
        let (_store, data) = fixture();
        data.send_chat("cricket", "  ", " what a catch ").await.unwrap();
        let history = data.chat_history("cricket").await.unwrap();
        assert_eq!(history[0].username, ANONYMOUS_USER);
        assert_eq!(history[0].message, "what a catch");
        assert!(matches!(
            data.send_chat("cricket", "a", "   ").await,
            Err(SyncError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn fest_start_comes_from_settings() {
        let (_store, data) = fixture();
        let start = data.fest_start().await.unwrap().unwrap();
        assert_eq!(start.to_rfc3339(), "2027-01-22T03:30:00+00:00");

        let later = start + chrono::Duration::days(1);
        data.update_fest_start(later).await.unwrap();
        assert_eq!(data.fest_start().await.unwrap(), Some(later));
    }
}
