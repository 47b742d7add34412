//! The persistence seam. Everything durable lives behind [`FestStore`]; the
//! sync layer only caches what these calls return.
pub mod memory;

use crate::client::ApiResult;
use crate::realtime::ChatSubscription;
use crate::{
    ChatMessage, FestDay, Group, Match, MatchPatch, MatchWithSport, NewChatMessage, NewGroup,
    NewMatch, NewTeam, Settings, SettingsPatch, Sport, SportCategory, SportPatch, Team, TeamPatch,
};
use async_trait::async_trait;

pub use memory::{FestSnapshot, MemoryStore};

/// Which match rows a list read returns, and in which order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchFilter {
    /// Every match, by day then time.
    All,
    /// One festival day, by time.
    OnDay(FestDay),
    /// One sport, by day then time.
    ForSport(String),
    /// Status `running`, by time.
    Running,
}

#[async_trait]
pub trait FestStore: Send + Sync {
    /// The global settings row, `None` when it has not been created.
    async fn settings(&self) -> ApiResult<Option<Settings>>;
    async fn update_settings(&self, patch: &SettingsPatch) -> ApiResult<()>;

    /// Sports ordered by name, optionally restricted to one category.
    async fn sports(&self, category: Option<SportCategory>) -> ApiResult<Vec<Sport>>;
    async fn sport(&self, id: &str) -> ApiResult<Option<Sport>>;
    async fn update_sport(&self, id: &str, patch: &SportPatch) -> ApiResult<()>;

    /// Groups ordered by name, optionally restricted to one sport.
    async fn groups(&self, sport_id: Option<&str>) -> ApiResult<Vec<Group>>;
    async fn insert_group(&self, group: &NewGroup) -> ApiResult<Group>;
    /// Removes the group and, at the storage tier, all of its teams.
    async fn delete_group(&self, id: &str) -> ApiResult<()>;

    /// Teams of one group in storage order, or every team by points descending.
    async fn teams(&self, group_id: Option<&str>) -> ApiResult<Vec<Team>>;
    async fn insert_team(&self, team: &NewTeam) -> ApiResult<Team>;
    async fn update_team(&self, id: &str, patch: &TeamPatch) -> ApiResult<()>;
    async fn delete_team(&self, id: &str) -> ApiResult<()>;

    async fn matches(&self, filter: &MatchFilter) -> ApiResult<Vec<MatchWithSport>>;
    async fn insert_match(&self, m: &NewMatch) -> ApiResult<Match>;
    async fn update_match(&self, id: &str, patch: &MatchPatch) -> ApiResult<()>;
    async fn delete_match(&self, id: &str) -> ApiResult<()>;

    /// The latest `limit` chat messages of a sport, oldest first.
    async fn chat_history(&self, sport_id: &str, limit: usize) -> ApiResult<Vec<ChatMessage>>;
    async fn insert_chat_message(&self, message: &NewChatMessage) -> ApiResult<()>;

    /// Start receiving chat inserts for one sport. Must be called inside a
    /// tokio runtime; the subscription stops when the handle is dropped.
    fn subscribe_chat(&self, sport_id: &str) -> ChatSubscription;
}
