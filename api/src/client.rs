use crate::postgrest::{self, Select, Table};
use crate::realtime::{ChatSubscription, RealtimeConfig};
use crate::store::{FestStore, MatchFilter};
use crate::{
    ChatMessage, Group, Match, MatchPatch, MatchWithSport, NewChatMessage, NewGroup, NewMatch,
    NewTeam, SETTINGS_ID, Settings, SettingsPatch, Sport, SportCategory, SportPatch, Team,
    TeamPatch,
};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

/// Where the hosted store lives and the public key it expects on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub url: String,
    pub anon_key: String,
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let url = url.into().trim().trim_end_matches('/').to_string();
        Self { url, anon_key: anon_key.into() }
    }

    pub fn realtime_url(&self) -> String {
        let ws_base = if let Some(rest) = self.url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.url.clone()
        };
        format!(
            "{ws_base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            self.anon_key
        )
    }
}

/// Client for the hosted store's REST, auth and RPC endpoints.
#[derive(Debug, Clone)]
pub struct FestApi {
    client: Client,
    config: StoreConfig,
    timeout: Duration,
    access_token: Arc<RwLock<Option<String>>>,
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    /// Non-success status: (status, url, message from the response body).
    Api(StatusCode, String, String),
    Parsing(reqwest::Error, String),
    NotFound(String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(status, url, msg) => write!(f, "API error {status} for {url}: {msg}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Network(e, _) | ApiError::Parsing(e, _) => Some(e),
            _ => None,
        }
    }
}

impl FestApi {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent("festui/0.2 (terminal festival viewer)")
                .build()
                .unwrap_or_default(),
            config,
            timeout: Duration::from_secs(10),
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Use a signed-in user's token instead of the anon key for later calls.
    /// Clones of this client share the token.
    pub fn set_access_token(&self, token: Option<String>) {
        *self
            .access_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn bearer(&self) -> String {
        self.access_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    fn endpoint(&self, path: &str, params: &[(String, String)]) -> ApiResult<Url> {
        let base = format!("{}/{path}", self.config.url);
        let parsed = if params.is_empty() {
            Url::parse(&base)
        } else {
            Url::parse_with_params(&base, params)
        };
        parsed.map_err(|e| ApiError::Other(format!("invalid url {base}: {e}")))
    }

    fn request_as(&self, method: Method, url: Url, token: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .timeout(self.timeout)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(token)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let token = self.bearer();
        self.request_as(method, url, &token)
    }

    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        url: &str,
    ) -> ApiResult<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api(status, url.to_owned(), error_message(&body)));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parsing(e, url.to_owned()))
    }

    // -----------------------------------------------------------------------
    // REST primitives
    // -----------------------------------------------------------------------

    async fn select<T: DeserializeOwned>(&self, select: &Select) -> ApiResult<Vec<T>> {
        let url = self.endpoint(&format!("rest/v1/{}", select.table.name()), &select.params())?;
        let url_str = url.to_string();
        debug!("GET {url_str}");
        self.send(self.request(Method::GET, url), &url_str).await
    }

    async fn insert<B, T>(&self, table: Table, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&format!("rest/v1/{}", table.name()), &[])?;
        let url_str = url.to_string();
        debug!("POST {url_str}");
        let rows: Vec<T> = self
            .send(
                self.request(Method::POST, url)
                    .header("Prefer", "return=representation")
                    .json(body),
                &url_str,
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ApiError::Other(format!("insert into {} returned no row", table.name())))
    }

    /// PATCH/DELETE by id. Zero affected rows is reported as `NotFound`.
    async fn write_by_id<B>(&self, method: Method, table: Table, id: &str, body: Option<&B>) -> ApiResult<()>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(&format!("rest/v1/{}", table.name()), &postgrest::by_id(id))?;
        let url_str = url.to_string();
        debug!("{method} {url_str}");
        let mut builder = self
            .request(method, url)
            .header("Prefer", "return=representation");
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let rows: Vec<serde_json::Value> = self.send(builder, &url_str).await?;
        if rows.is_empty() {
            return Err(ApiError::NotFound(format!("{} {id}", table.name())));
        }
        Ok(())
    }

    async fn update<B: Serialize + ?Sized>(&self, table: Table, id: &str, body: &B) -> ApiResult<()> {
        self.write_by_id(Method::PATCH, table, id, Some(body)).await
    }

    async fn delete(&self, table: Table, id: &str) -> ApiResult<()> {
        self.write_by_id::<()>(Method::DELETE, table, id, None).await
    }

    /// Call a database function exposed over RPC.
    pub(crate) async fn rpc<B, T>(&self, function: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&format!("rest/v1/rpc/{function}"), &[])?;
        let url_str = url.to_string();
        self.send(self.request(Method::POST, url).json(body), &url_str)
            .await
    }

    pub(crate) async fn auth_post<B, T>(
        &self,
        path: &str,
        params: &[(String, String)],
        body: &B,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&format!("auth/v1/{path}"), params)?;
        let url_str = url.to_string();
        let anon = self.config.anon_key.clone();
        self.send(self.request_as(Method::POST, url, &anon).json(body), &url_str)
            .await
    }

    pub(crate) async fn auth_get<T: DeserializeOwned>(&self, path: &str, token: &str) -> ApiResult<T> {
        let url = self.endpoint(&format!("auth/v1/{path}"), &[])?;
        let url_str = url.to_string();
        self.send(self.request_as(Method::GET, url, token), &url_str)
            .await
    }
}

/// Pull a human-readable message out of an error body from the store.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    ["message", "error_description", "msg", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(ToString::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl FestStore for FestApi {
    async fn settings(&self) -> ApiResult<Option<Settings>> {
        let rows: Vec<Settings> = self.select(&postgrest::settings(SETTINGS_ID)).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> ApiResult<()> {
        self.update(Table::Settings, SETTINGS_ID, patch).await
    }

    async fn sports(&self, category: Option<SportCategory>) -> ApiResult<Vec<Sport>> {
        self.select(&postgrest::sports(category)).await
    }

    async fn sport(&self, id: &str) -> ApiResult<Option<Sport>> {
        let rows: Vec<Sport> = self.select(&postgrest::sport(id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_sport(&self, id: &str, patch: &SportPatch) -> ApiResult<()> {
        self.update(Table::Sports, id, patch).await
    }

    async fn groups(&self, sport_id: Option<&str>) -> ApiResult<Vec<Group>> {
        self.select(&postgrest::groups(sport_id)).await
    }

    async fn insert_group(&self, group: &NewGroup) -> ApiResult<Group> {
        self.insert(Table::Groups, group).await
    }

    async fn delete_group(&self, id: &str) -> ApiResult<()> {
        self.delete(Table::Groups, id).await
    }

    async fn teams(&self, group_id: Option<&str>) -> ApiResult<Vec<Team>> {
        self.select(&postgrest::teams(group_id)).await
    }

    async fn insert_team(&self, team: &NewTeam) -> ApiResult<Team> {
        self.insert(Table::Teams, team).await
    }

    async fn update_team(&self, id: &str, patch: &TeamPatch) -> ApiResult<()> {
        self.update(Table::Teams, id, patch).await
    }

    async fn delete_team(&self, id: &str) -> ApiResult<()> {
        self.delete(Table::Teams, id).await
    }

    async fn matches(&self, filter: &MatchFilter) -> ApiResult<Vec<MatchWithSport>> {
        let select = match filter {
            MatchFilter::All => postgrest::matches_all(),
            MatchFilter::OnDay(day) => postgrest::matches_by_date(*day),
            MatchFilter::ForSport(sport_id) => postgrest::matches_by_sport(sport_id),
            MatchFilter::Running => postgrest::matches_running(),
        };
        self.select(&select).await
    }

    async fn insert_match(&self, m: &NewMatch) -> ApiResult<Match> {
        self.insert(Table::Matches, m).await
    }

    async fn update_match(&self, id: &str, patch: &MatchPatch) -> ApiResult<()> {
        self.update(Table::Matches, id, patch).await
    }

    async fn delete_match(&self, id: &str) -> ApiResult<()> {
        self.delete(Table::Matches, id).await
    }

    async fn chat_history(&self, sport_id: &str, limit: usize) -> ApiResult<Vec<ChatMessage>> {
        let mut rows: Vec<ChatMessage> = self
            .select(&postgrest::chat_history(sport_id, limit))
            .await?;
        rows.reverse();
        Ok(rows)
    }

    async fn insert_chat_message(&self, message: &NewChatMessage) -> ApiResult<()> {
        let _: ChatMessage = self.insert(Table::ChatMessages, message).await?;
        Ok(())
    }

    fn subscribe_chat(&self, sport_id: &str) -> ChatSubscription {
        let config = RealtimeConfig {
            url: self.config.realtime_url(),
            api_key: self.config.anon_key.clone(),
            access_token: self.bearer(),
        };
        ChatSubscription::open(config, sport_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchStatus;
    use mockito::Matcher;

    fn api_for(server: &mockito::ServerGuard) -> FestApi {
        FestApi::new(StoreConfig::new(server.url(), "anon"))
    }

    #[test]
    fn realtime_url_switches_scheme() {
        let cfg = StoreConfig::new("https://fest.example.co/", "k");
        assert_eq!(
            cfg.realtime_url(),
            "wss://fest.example.co/realtime/v1/websocket?apikey=k&vsn=1.0.0"
        );
        let local = StoreConfig::new("http://127.0.0.1:54321", "k");
        assert!(local.realtime_url().starts_with("ws://127.0.0.1:54321/"));
    }

    #[test]
    fn error_message_prefers_store_message_field() {
        assert_eq!(
            error_message(r#"{"code":"23505","message":"duplicate key value"}"#),
            "duplicate key value"
        );
        assert_eq!(error_message("bad gateway"), "bad gateway");
    }

    #[tokio::test]
    async fn group_teams_are_fetched_with_filter_and_keys() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/teams")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), "*".into()),
                Matcher::UrlEncoded("group_id".into(), "eq.g1".into()),
            ]))
            .match_header("apikey", "anon")
            .match_header("authorization", "Bearer anon")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id":"t1","group_id":"g1","name":"CSE","matches_played":2,"wins":2,
                    "losses":0,"draws":0,"points":4,"net_run_rate":0.5,
                    "goal_difference":0,"point_difference":0}]"#,
            )
            .create_async()
            .await;

        let teams = api_for(&server).teams(Some("g1")).await.unwrap();
        mock.assert_async().await;
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].name, "CSE");
        assert_eq!(teams[0].net_run_rate, 0.5);
    }

    #[tokio::test]
    async fn running_matches_request_embeds_sport() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/matches")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("status".into(), "eq.running".into()),
                Matcher::UrlEncoded("select".into(), postgrest::MATCH_WITH_SPORT_ICON.into()),
            ]))
            .with_status(200)
            .with_body(
                r#"[{"id":"m1","sport_id":"cricket","match_name":"CSE vs ECE","match_date":"22",
                    "match_time":"09:00","venue":"Main Ground","team_a":"CSE","team_b":"ECE",
                    "match_type":"group","group_name":"Group A","status":"running",
                    "live_stream_url":null,"sports":{"name":"Cricket","category":"team","icon":"🏏"}}]"#,
            )
            .create_async()
            .await;

        let rows = api_for(&server).matches(&MatchFilter::Running).await.unwrap();
        mock.assert_async().await;
        assert_eq!(rows[0].details.status, MatchStatus::Running);
        assert_eq!(rows[0].sport.as_ref().and_then(|s| s.icon.as_deref()), Some("🏏"));
    }

    #[tokio::test]
    async fn missing_settings_row_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/settings")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.global".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        assert_eq!(api_for(&server).settings().await.unwrap(), None);
    }

    #[tokio::test]
    async fn insert_posts_json_and_returns_created_row() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/groups")
            .match_header("prefer", "return=representation")
            .match_body(Matcher::Json(serde_json::json!({
                "sport_id": "football", "name": "Group C"
            })))
            .with_status(201)
            .with_body(r#"[{"id":"g9","sport_id":"football","name":"Group C"}]"#)
            .create_async()
            .await;

        let group = api_for(&server)
            .insert_group(&NewGroup {
                sport_id: "football".into(),
                name: "Group C".into(),
            })
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(group.id, "g9");
    }

    #[tokio::test]
    async fn update_touching_no_rows_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/rest/v1/matches")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.gone".into()))
            .match_body(Matcher::Json(serde_json::json!({ "status": "running" })))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let err = api_for(&server)
            .update_match("gone", &MatchPatch::status(MatchStatus::Running))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)), "{err}");
    }

    #[tokio::test]
    async fn rejected_write_carries_store_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/rest/v1/teams")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.t1".into()))
            .with_status(403)
            .with_body(r#"{"code":"42501","message":"permission denied for table teams"}"#)
            .create_async()
            .await;

        let err = api_for(&server).delete_team("t1").await.unwrap_err();
        match err {
            ApiError::Api(status, _, msg) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(msg, "permission denied for table teams");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn access_token_replaces_anon_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/rest/v1/teams")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.t1".into()))
            .match_header("authorization", "Bearer user-jwt")
            .match_header("apikey", "anon")
            .with_status(200)
            .with_body(r#"[{"id":"t1"}]"#)
            .create_async()
            .await;

        let api = api_for(&server);
        api.clone().set_access_token(Some("user-jwt".into()));
        api.update_team(
            "t1",
            &TeamPatch {
                points: Some(2),
                ..TeamPatch::default()
            },
        )
        .await
        .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn chat_history_comes_back_oldest_first() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/chat_messages")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("sport_id".into(), "eq.chess".into()),
                Matcher::UrlEncoded("order".into(), "created_at.desc".into()),
                Matcher::UrlEncoded("limit".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"[{"id":"c2","sport_id":"chess","username":"b","message":"second","created_at":"2026-01-22T10:01:00Z"},
                    {"id":"c1","sport_id":"chess","username":"a","message":"first","created_at":"2026-01-22T10:00:00Z"}]"#,
            )
            .create_async()
            .await;

        let history = api_for(&server).chat_history("chess", 2).await.unwrap();
        let ids: Vec<&str> = history.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }
}
