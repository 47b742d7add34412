use crate::state::messages::{AdminScope, AdminView, NetworkRequest, NetworkResponse};
use chrono::Utc;
use fest_api::auth::{AdminGate, AuthClient};
use fest_api::export;
use fest_api::sync::FestData;
use log::{debug, error, info};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
pub const ERROR_CHAR: char = '!';

#[derive(Debug, Copy, Clone)]
pub struct LoadingState {
    pub is_loading: bool,
    pub spinner_char: char,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self { is_loading: false, spinner_char: ' ' }
    }
}

/// How the admin surface is gated for this run.
#[derive(Debug, Clone)]
pub enum AdminAccess {
    /// Local snapshot data, no accounts to check.
    Local,
    /// Hosted data; the signed-in session (if any) is checked for the admin role.
    Hosted { auth: AuthClient, session: Option<fest_api::auth::Session> },
}

pub struct NetworkWorker {
    data: FestData,
    access: AdminAccess,
    requests: mpsc::Receiver<NetworkRequest>,
    responses: mpsc::Sender<NetworkResponse>,
    is_loading: Arc<AtomicBool>,
}

impl NetworkWorker {
    pub fn new(
        data: FestData,
        access: AdminAccess,
        requests: mpsc::Receiver<NetworkRequest>,
        responses: mpsc::Sender<NetworkResponse>,
    ) -> Self {
        Self {
            data,
            access,
            requests,
            responses,
            is_loading: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(mut self) {
        while let Some(request) = self.requests.recv().await {
            // The periodic refresh stays quiet; everything else spins.
            let animate = request != NetworkRequest::RefreshRunning;
            if animate {
                self.start_loading_animation().await;
            }

            let result = self.handle(request).await;

            debug!("network request complete");
            if animate {
                self.stop_loading_animation(result.is_ok()).await;
            }

            let response = result.unwrap_or_else(|err| {
                error!("{err}");
                NetworkResponse::Error { message: err.to_string() }
            });

            if let Err(e) = self.responses.send(response).await {
                error!("Failed to send network response: {e}");
                break;
            }
        }
    }

    async fn handle(&mut self, request: NetworkRequest) -> anyhow::Result<NetworkResponse> {
        match request {
            NetworkRequest::LoadSettings => Ok(NetworkResponse::SettingsLoaded {
                settings: self.data.settings().await?,
            }),
            NetworkRequest::LoadSports { category } => Ok(NetworkResponse::SportsLoaded {
                category,
                sports: self.data.sports_by_category(category).await?,
            }),
            NetworkRequest::LoadSchedule { day } => Ok(NetworkResponse::ScheduleLoaded {
                day,
                matches: self.data.matches_by_date(day).await?,
            }),
            NetworkRequest::LoadStandings { sport_id } => {
                debug!("loading points tables for {sport_id}");
                let sport = self.data.sport(&sport_id).await?;
                let tables = self.data.sport_tables(&sport_id).await?;
                let fixtures = self.data.matches_by_sport(&sport_id).await?;
                Ok(NetworkResponse::StandingsLoaded { sport_id, sport, tables, fixtures })
            }
            NetworkRequest::LoadRunning => Ok(NetworkResponse::RunningLoaded {
                matches: self.data.running_matches().await?,
            }),
            NetworkRequest::RefreshRunning => Ok(NetworkResponse::RunningLoaded {
                matches: self.data.refresh_running_matches().await?,
            }),
            NetworkRequest::LoadAdmin { scope } => {
                let view = self.load_admin(&scope).await?;
                Ok(NetworkResponse::AdminLoaded { scope, view })
            }
            NetworkRequest::CheckAdmin => Ok(NetworkResponse::AdminChecked {
                gate: self.admin_gate().await?,
            }),
            NetworkRequest::SignOut => self.sign_out(),
            NetworkRequest::Export { format, dir } => {
                self.require_admin().await?;
                self.handle_export(format, &dir).await
            }
            write => {
                self.require_admin().await?;
                let message = self.handle_write(write).await?;
                Ok(NetworkResponse::Saved { message })
            }
        }
    }

    /// The admin lists for `scope`, falling back to the first sport and
    /// group when the requested one is gone.
    async fn load_admin(&self, scope: &AdminScope) -> anyhow::Result<AdminView> {
        let sports = self.data.sports().await?;
        let sport_id = scope
            .sport_id
            .clone()
            .filter(|id| sports.iter().any(|s| s.id == *id))
            .or_else(|| sports.first().map(|s| s.id.clone()));
        let Some(sport) = sport_id.as_deref() else {
            return Ok(AdminView { sports, ..AdminView::default() });
        };

        let groups = self.data.groups_for_sport(sport).await?;
        let matches = self.data.matches_by_sport(sport).await?;
        let group_id = scope
            .group_id
            .clone()
            .filter(|id| groups.iter().any(|g| g.id == *id))
            .or_else(|| groups.first().map(|g| g.id.clone()));
        let teams = match group_id.as_deref() {
            Some(group) => self.data.group_teams(group).await?,
            None => Vec::new(),
        };
        debug!("admin view: sport {sport}, group {group_id:?}");
        Ok(AdminView {
            sports,
            sport_id,
            groups,
            group_id,
            teams,
            matches,
        })
    }

    /// Runs an admin write. The caller has already checked access.
    async fn handle_write(&self, request: NetworkRequest) -> anyhow::Result<String> {
        let data = &self.data;
        let message = match request {
            NetworkRequest::UpdateFestStart { start } => {
                data.update_fest_start(start).await?;
                "Fest start date updated".to_string()
            }
            NetworkRequest::UpdateSport { sport_id, patch } => {
                data.update_sport(&sport_id, &patch).await?;
                "Sport updated".to_string()
            }
            NetworkRequest::SetSportStream { sport_id, url } => {
                data.set_sport_stream(&sport_id, &url).await?;
                "Stream link saved".to_string()
            }
            NetworkRequest::CreateGroup { sport_id, name } => {
                let group = data.create_group(&sport_id, &name).await?;
                format!("Group {} created", group.name)
            }
            NetworkRequest::DeleteGroup { group_id } => {
                data.delete_group(&group_id).await?;
                "Group deleted".to_string()
            }
            NetworkRequest::CreateTeam { group_id, name } => {
                let team = data.create_team(&group_id, &name).await?;
                format!("Team {} added", team.name)
            }
            NetworkRequest::UpdateTeam { team_id, patch } => {
                data.update_team(&team_id, &patch).await?;
                "Team updated successfully".to_string()
            }
            NetworkRequest::DeleteTeam { team_id } => {
                data.delete_team(&team_id).await?;
                "Team deleted".to_string()
            }
            NetworkRequest::CreateMatch { draft } => {
                let created = data.create_match(&draft).await?;
                format!("Match {} added", created.match_name)
            }
            NetworkRequest::UpdateMatch { match_id, patch } => {
                data.update_match(&match_id, &patch).await?;
                "Match updated".to_string()
            }
            NetworkRequest::SetMatchStatus { match_id, status } => {
                data.set_match_status(&match_id, status).await?;
                format!("Match marked {}", status.as_str())
            }
            NetworkRequest::DeleteMatch { match_id } => {
                data.delete_match(&match_id).await?;
                "Match deleted".to_string()
            }
            other => anyhow::bail!("not an admin write: {other:?}"),
        };
        Ok(message)
    }

    fn sign_out(&mut self) -> anyhow::Result<NetworkResponse> {
        match &mut self.access {
            AdminAccess::Local => anyhow::bail!("Local data has no account to sign out of"),
            AdminAccess::Hosted { auth, session } => {
                auth.sign_out();
                *session = None;
                info!("signed out");
                Ok(NetworkResponse::AdminChecked { gate: AdminGate::NotSignedIn })
            }
        }
    }

    async fn admin_gate(&self) -> anyhow::Result<AdminGate> {
        match &self.access {
            AdminAccess::Local => Ok(AdminGate::Granted),
            AdminAccess::Hosted { auth, session } => auth
                .admin_gate(session.as_ref())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to check admin access: {e}")),
        }
    }

    async fn require_admin(&self) -> anyhow::Result<()> {
        let gate = self.admin_gate().await?;
        if !gate.is_granted() {
            anyhow::bail!("{}", gate.message());
        }
        Ok(())
    }

    async fn handle_export(
        &self,
        format: fest_api::export::ExportFormat,
        dir: &Path,
    ) -> anyhow::Result<NetworkResponse> {
        let set = self.data.export_set().await?;
        let files = export::export_all(&set, format, Utc::now())?;
        if files.is_empty() {
            anyhow::bail!("Nothing to export");
        }
        let paths = export::write_files(dir, &files)?;
        info!("exported {} file(s) to {}", paths.len(), dir.display());
        Ok(NetworkResponse::Exported { paths })
    }

    async fn start_loading_animation(&self) {
        self.is_loading.store(true, Ordering::Relaxed);

        let mut loading_state =
            LoadingState { is_loading: true, spinner_char: SPINNER_CHARS[0] };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged { loading_state })
            .await;

        let responses = self.responses.clone();
        let is_loading = self.is_loading.clone();

        tokio::spawn(async move {
            let mut spinner_index = 1;
            let mut interval = tokio::time::interval(Duration::from_millis(33));
            loop {
                interval.tick().await;
                if !is_loading.load(Ordering::Relaxed) {
                    break;
                }
                loading_state.spinner_char = SPINNER_CHARS[spinner_index];
                spinner_index = (spinner_index + 1) % SPINNER_CHARS.len();
                let _ = responses
                    .send(NetworkResponse::LoadingStateChanged { loading_state })
                    .await;
            }
        });
    }

    async fn stop_loading_animation(&self, is_ok: bool) {
        self.is_loading.store(false, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(15)).await;

        let spinner_char = if is_ok { ' ' } else { ERROR_CHAR };
        let _ = self
            .responses
            .send(NetworkResponse::LoadingStateChanged {
                loading_state: LoadingState { is_loading: false, spinner_char },
            })
            .await;
    }
}
