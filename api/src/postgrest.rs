/// Query-string shapes for the hosted store's REST endpoints
/// (`/rest/v1/<table>?select=..&col=eq.v&order=a.asc&limit=n`).
use crate::{FestDay, MatchStatus, SportCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Sports,
    Groups,
    Teams,
    Matches,
    Settings,
    ChatMessages,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Sports => "sports",
            Table::Groups => "groups",
            Table::Teams => "teams",
            Table::Matches => "matches",
            Table::Settings => "settings",
            Table::ChatMessages => "chat_messages",
        }
    }
}

/// Embedded sport columns for match list reads.
pub const MATCH_WITH_SPORT: &str = "*,sports(name,category)";
/// The running-matches banner also shows the sport icon.
pub const MATCH_WITH_SPORT_ICON: &str = "*,sports(name,category,icon)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: Table,
    columns: String,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
}

impl Select {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{column}.{dir}"));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns.clone())];
        params.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            params.push(("order".to_string(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

/// Row filter for update/delete by primary key.
pub fn by_id(id: &str) -> Vec<(String, String)> {
    vec![("id".to_string(), format!("eq.{id}"))]
}

// ---------------------------------------------------------------------------
// Canned reads, one per cache partition
// ---------------------------------------------------------------------------

pub fn sports(category: Option<SportCategory>) -> Select {
    let select = Select::from(Table::Sports);
    let select = match category {
        Some(c) => select.eq("category", c.as_str()),
        None => select,
    };
    select.order("name", true)
}

pub fn sport(id: &str) -> Select {
    Select::from(Table::Sports).eq("id", id)
}

pub fn groups(sport_id: Option<&str>) -> Select {
    let select = Select::from(Table::Groups);
    let select = match sport_id {
        Some(id) => select.eq("sport_id", id),
        None => select,
    };
    select.order("name", true)
}

/// Group-scoped reads are left unordered; callers rank them.
pub fn teams(group_id: Option<&str>) -> Select {
    match group_id {
        Some(id) => Select::from(Table::Teams).eq("group_id", id),
        None => Select::from(Table::Teams).order("points", false),
    }
}

pub fn matches_all() -> Select {
    Select::from(Table::Matches)
        .columns(MATCH_WITH_SPORT)
        .order("match_date", true)
        .order("match_time", true)
}

pub fn matches_by_date(day: FestDay) -> Select {
    Select::from(Table::Matches)
        .columns(MATCH_WITH_SPORT)
        .eq("match_date", day.code())
        .order("match_time", true)
}

pub fn matches_by_sport(sport_id: &str) -> Select {
    Select::from(Table::Matches)
        .columns(MATCH_WITH_SPORT)
        .eq("sport_id", sport_id)
        .order("match_date", true)
        .order("match_time", true)
}

pub fn matches_running() -> Select {
    Select::from(Table::Matches)
        .columns(MATCH_WITH_SPORT_ICON)
        .eq("status", MatchStatus::Running.as_str())
        .order("match_time", true)
}

pub fn settings(id: &str) -> Select {
    Select::from(Table::Settings).eq("id", id)
}

/// Newest first; callers reverse to get chronological order.
pub fn chat_history(sport_id: &str, limit: usize) -> Select {
    Select::from(Table::ChatMessages)
        .eq("sport_id", sport_id)
        .order("created_at", false)
        .limit(limit)
}
