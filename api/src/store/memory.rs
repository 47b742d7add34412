use crate::client::{ApiError, ApiResult};
use crate::realtime::{ChatEvent, ChatSubscription};
use crate::store::{FestStore, MatchFilter};
use crate::{
    ChatMessage, Group, Match, MatchPatch, MatchWithSport, NewChatMessage, NewGroup, NewMatch,
    NewTeam, Settings, SettingsPatch, Sport, SportCategory, SportPatch, SportSummary, Team,
    TeamPatch,
};
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc};

/// Bundled demo festival, used when no hosted store is configured.
const DEMO_FEST_JSON: &str = include_str!("../../data/demo_fest.json");

/// Every table of the store in one serializable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FestSnapshot {
    pub settings: Option<Settings>,
    pub sports: Vec<Sport>,
    pub groups: Vec<Group>,
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
    pub chat_messages: Vec<ChatMessage>,
}

/// In-process store with the same filters, ordering and cascade rules as the
/// hosted one.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<FestSnapshot>,
    next_id: AtomicU64,
    reads: AtomicUsize,
    fail_writes: AtomicBool,
    chat_feed: broadcast::Sender<ChatMessage>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(FestSnapshot::default())
    }
}

impl MemoryStore {
    pub fn new(snapshot: FestSnapshot) -> Self {
        let (chat_feed, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(snapshot),
            next_id: AtomicU64::new(1),
            reads: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            chat_feed,
        }
    }

    pub fn from_json(json: &str) -> ApiResult<Self> {
        let snapshot: FestSnapshot = serde_json::from_str(json)
            .map_err(|e| ApiError::Other(format!("invalid festival snapshot: {e}")))?;
        Ok(Self::new(snapshot))
    }

    pub fn demo() -> ApiResult<Self> {
        Self::from_json(DEMO_FEST_JSON)
    }

    pub fn snapshot(&self) -> FestSnapshot {
        self.lock().clone()
    }

    /// Number of read calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail until switched off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, FestSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> MutexGuard<'_, FestSnapshot> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.lock()
    }

    fn write(&self) -> ApiResult<MutexGuard<'_, FestSnapshot>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ApiError::Other("store rejected the write".to_string()));
        }
        Ok(self.lock())
    }

    fn new_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

fn not_found(table: &str, id: &str) -> ApiError {
    ApiError::NotFound(format!("{table} {id}"))
}

fn join_sport(m: &Match, sports: &[Sport], with_icon: bool) -> MatchWithSport {
    let sport = sports.iter().find(|s| s.id == m.sport_id).map(|s| SportSummary {
        name: s.name.clone(),
        category: s.category,
        icon: with_icon.then(|| s.icon.clone()),
    });
    MatchWithSport { details: m.clone(), sport }
}

#[async_trait]
impl FestStore for MemoryStore {
    async fn settings(&self) -> ApiResult<Option<Settings>> {
        Ok(self.read().settings.clone())
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> ApiResult<()> {
        let mut state = self.write()?;
        let settings = state
            .settings
            .as_mut()
            .ok_or_else(|| not_found("settings", crate::SETTINGS_ID))?;
        if let Some(start) = &patch.fest_start_date {
            settings.fest_start_date = start.clone();
        }
        Ok(())
    }

    async fn sports(&self, category: Option<SportCategory>) -> ApiResult<Vec<Sport>> {
        let mut sports: Vec<Sport> = self
            .read()
            .sports
            .iter()
            .filter(|s| category.is_none_or(|c| s.category == c))
            .cloned()
            .collect();
        sports.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sports)
    }

    async fn sport(&self, id: &str) -> ApiResult<Option<Sport>> {
        Ok(self.read().sports.iter().find(|s| s.id == id).cloned())
    }

    async fn update_sport(&self, id: &str, patch: &SportPatch) -> ApiResult<()> {
        let mut state = self.write()?;
        let sport = state
            .sports
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found("sports", id))?;
        patch.apply(sport);
        Ok(())
    }

    async fn groups(&self, sport_id: Option<&str>) -> ApiResult<Vec<Group>> {
        let mut groups: Vec<Group> = self
            .read()
            .groups
            .iter()
            .filter(|g| sport_id.is_none_or(|id| g.sport_id == id))
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn insert_group(&self, group: &NewGroup) -> ApiResult<Group> {
        let id = self.new_id("group");
        let mut state = self.write()?;
        let created = Group {
            id,
            sport_id: group.sport_id.clone(),
            name: group.name.clone(),
        };
        state.groups.push(created.clone());
        Ok(created)
    }

    async fn delete_group(&self, id: &str) -> ApiResult<()> {
        let mut state = self.write()?;
        let before = state.groups.len();
        state.groups.retain(|g| g.id != id);
        if state.groups.len() == before {
            return Err(not_found("groups", id));
        }
        let teams_before = state.teams.len();
        state.teams.retain(|t| t.group_id != id);
        debug!(
            "deleted group {id} and {} team(s)",
            teams_before - state.teams.len()
        );
        Ok(())
    }

    async fn teams(&self, group_id: Option<&str>) -> ApiResult<Vec<Team>> {
        let state = self.read();
        match group_id {
            Some(id) => Ok(state
                .teams
                .iter()
                .filter(|t| t.group_id == id)
                .cloned()
                .collect()),
            None => {
                let mut teams = state.teams.clone();
                crate::ranking::default_order(&mut teams);
                Ok(teams)
            }
        }
    }

    async fn insert_team(&self, team: &NewTeam) -> ApiResult<Team> {
        let id = self.new_id("team");
        let mut state = self.write()?;
        let created = team.clone().into_team(id);
        state.teams.push(created.clone());
        Ok(created)
    }

    async fn update_team(&self, id: &str, patch: &TeamPatch) -> ApiResult<()> {
        let mut state = self.write()?;
        let team = state
            .teams
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("teams", id))?;
        patch.apply(team);
        Ok(())
    }

    async fn delete_team(&self, id: &str) -> ApiResult<()> {
        let mut state = self.write()?;
        let before = state.teams.len();
        state.teams.retain(|t| t.id != id);
        if state.teams.len() == before {
            return Err(not_found("teams", id));
        }
        Ok(())
    }

    async fn matches(&self, filter: &MatchFilter) -> ApiResult<Vec<MatchWithSport>> {
        let state = self.read();
        let mut rows: Vec<&Match> = state
            .matches
            .iter()
            .filter(|m| match filter {
                MatchFilter::All => true,
                MatchFilter::OnDay(day) => m.match_date == *day,
                MatchFilter::ForSport(sport_id) => m.sport_id == *sport_id,
                MatchFilter::Running => m.is_running(),
            })
            .collect();

        match filter {
            MatchFilter::All | MatchFilter::ForSport(_) => rows.sort_by(|a, b| {
                a.match_date
                    .cmp(&b.match_date)
                    .then_with(|| a.match_time.cmp(&b.match_time))
            }),
            MatchFilter::OnDay(_) | MatchFilter::Running => {
                rows.sort_by(|a, b| a.match_time.cmp(&b.match_time))
            }
        }

        let with_icon = *filter == MatchFilter::Running;
        Ok(rows
            .into_iter()
            .map(|m| join_sport(m, &state.sports, with_icon))
            .collect())
    }

    async fn insert_match(&self, m: &NewMatch) -> ApiResult<Match> {
        let id = self.new_id("match");
        let mut state = self.write()?;
        let created = m.clone().into_match(id);
        state.matches.push(created.clone());
        Ok(created)
    }

    async fn update_match(&self, id: &str, patch: &MatchPatch) -> ApiResult<()> {
        let mut state = self.write()?;
        let m = state
            .matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| not_found("matches", id))?;
        patch.apply(m);
        Ok(())
    }

    async fn delete_match(&self, id: &str) -> ApiResult<()> {
        let mut state = self.write()?;
        let before = state.matches.len();
        state.matches.retain(|m| m.id != id);
        if state.matches.len() == before {
            return Err(not_found("matches", id));
        }
        Ok(())
    }

    async fn chat_history(&self, sport_id: &str, limit: usize) -> ApiResult<Vec<ChatMessage>> {
        let state = self.read();
        let messages: Vec<&ChatMessage> = state
            .chat_messages
            .iter()
            .filter(|m| m.sport_id == sport_id)
            .collect();
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.into_iter().skip(skip).cloned().collect())
    }

    async fn insert_chat_message(&self, message: &NewChatMessage) -> ApiResult<()> {
        let id = self.new_id("chat");
        let created = ChatMessage {
            id,
            sport_id: message.sport_id.clone(),
            username: message.username.clone(),
            message: message.message.clone(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        self.write()?.chat_messages.push(created.clone());
        // No live subscribers is fine.
        let _ = self.chat_feed.send(created);
        Ok(())
    }

    fn subscribe_chat(&self, sport_id: &str) -> ChatSubscription {
        let (tx, rx) = mpsc::channel(64);
        let mut feed = self.chat_feed.subscribe();
        let sport = sport_id.to_string();

        let task = tokio::spawn({
            let sport = sport.clone();
            async move {
                if tx.send(ChatEvent::Connected).await.is_err() {
                    return;
                }
                loop {
                    match feed.recv().await {
                        Ok(msg) if msg.sport_id == sport => {
                            if tx.send(ChatEvent::Message(msg)).await.is_err() {
                                return;
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!("chat feed for {sport} skipped {missed} message(s)");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            let _ = tx.send(ChatEvent::Disconnected).await;
                            return;
                        }
                    }
                }
            }
        });

        ChatSubscription::from_parts(sport, rx, task)
    }
}
