//! Email/password accounts and the admin role check.
use crate::client::{ApiError, ApiResult, FestApi};
use log::info;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: u64,
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account is usable right away.
    Session(Session),
    /// The account exists but its email must be confirmed first.
    ConfirmationPending(AuthUser),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Moderator,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }
}

/// Whether the admin surface may be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminGate {
    Granted,
    NotSignedIn,
    NotAdmin,
}

impl AdminGate {
    pub fn is_granted(&self) -> bool {
        *self == AdminGate::Granted
    }

    pub fn message(&self) -> &'static str {
        match self {
            AdminGate::Granted => "Admin access granted",
            AdminGate::NotSignedIn => "Please log in to access this page",
            AdminGate::NotAdmin => "You do not have admin access",
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    Invalid(String),
    Api(ApiError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Invalid(msg) => write!(f, "{msg}"),
            // Auth failures carry a user-facing message from the server.
            AuthError::Api(ApiError::Api(_, _, msg)) => write!(f, "{msg}"),
            AuthError::Api(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<ApiError> for AuthError {
    fn from(e: ApiError) -> Self {
        AuthError::Api(e)
    }
}

fn check_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::Invalid("Please fill in all fields".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    api: FestApi,
}

impl AuthClient {
    /// Shares the access token with `api`: signing in makes later store calls
    /// run as the signed-in user.
    pub fn new(api: FestApi) -> Self {
        Self { api }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        check_credentials(email, password)?;
        let params = vec![("grant_type".to_string(), "password".to_string())];
        let session: Session = self
            .api
            .auth_post("token", &params, &json!({ "email": email.trim(), "password": password }))
            .await?;
        self.api.set_access_token(Some(session.access_token.clone()));
        info!("signed in as {}", session.user.email.as_deref().unwrap_or(&session.user.id));
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        check_credentials(email, password)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Invalid(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let body: Value = self
            .api
            .auth_post("signup", &[], &json!({ "email": email.trim(), "password": password }))
            .await?;

        let malformed = |e: serde_json::Error| {
            AuthError::Api(ApiError::Other(format!("unexpected signup response: {e}")))
        };
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body).map_err(malformed)?;
            self.api.set_access_token(Some(session.access_token.clone()));
            Ok(SignUpOutcome::Session(session))
        } else {
            let user = body.get("user").cloned().unwrap_or(body);
            let user: AuthUser = serde_json::from_value(user).map_err(malformed)?;
            Ok(SignUpOutcome::ConfirmationPending(user))
        }
    }

    /// Forget the session locally; later calls use the public key again.
    pub fn sign_out(&self) {
        self.api.set_access_token(None);
    }

    /// The user behind `session`, or `None` when the token is no longer valid.
    pub async fn current_user(&self, session: &Session) -> ApiResult<Option<AuthUser>> {
        match self.api.auth_get::<AuthUser>("user", &session.access_token).await {
            Ok(user) => Ok(Some(user)),
            Err(ApiError::Api(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _, _)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn has_role(&self, user_id: &str, role: Role) -> ApiResult<bool> {
        self.api
            .rpc("has_role", &json!({ "_user_id": user_id, "_role": role.as_str() }))
            .await
    }

    pub async fn admin_gate(&self, session: Option<&Session>) -> ApiResult<AdminGate> {
        let Some(session) = session else {
            return Ok(AdminGate::NotSignedIn);
        };
        let Some(user) = self.current_user(session).await? else {
            return Ok(AdminGate::NotSignedIn);
        };
        if self.has_role(&user.id, Role::Admin).await? {
            Ok(AdminGate::Granted)
        } else {
            Ok(AdminGate::NotAdmin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StoreConfig;
    use mockito::Matcher;

    fn auth_for(server: &mockito::ServerGuard) -> AuthClient {
        AuthClient::new(FestApi::new(StoreConfig::new(server.url(), "anon")))
    }

    fn session_json() -> &'static str {
        r#"{"access_token":"user-jwt","token_type":"bearer","expires_in":3600,
            "refresh_token":"r1","user":{"id":"u1","email":"admin@fest.edu","role":"authenticated"}}"#
    }

    fn session() -> Session {
        serde_json::from_str(session_json()).unwrap()
    }

    #[tokio::test]
    async fn empty_fields_are_rejected_locally() {
        let server = mockito::Server::new_async().await;
        let err = auth_for(&server).sign_in(" ", "secret").await.unwrap_err();
        assert_eq!(err.to_string(), "Please fill in all fields");
        let err = auth_for(&server).sign_up("a@b.c", "12345").await.unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 6 characters");
    }

    #[tokio::test]
    async fn sign_in_uses_password_grant_and_keeps_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
            .match_body(Matcher::Json(json!({ "email": "admin@fest.edu", "password": "hunter22" })))
            .with_status(200)
            .with_body(session_json())
            .create_async()
            .await;
        let role_check = server
            .mock("POST", "/rest/v1/rpc/has_role")
            .match_header("authorization", "Bearer user-jwt")
            .match_body(Matcher::Json(json!({ "_user_id": "u1", "_role": "admin" })))
            .with_status(200)
            .with_body("true")
            .create_async()
            .await;

        let auth = auth_for(&server);
        let session = auth.sign_in("admin@fest.edu", "hunter22").await.unwrap();
        assert_eq!(session.user.id, "u1");
        assert!(auth.has_role("u1", Role::Admin).await.unwrap());
        role_check.assert_async().await;
    }

    #[tokio::test]
    async fn bad_credentials_surface_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#)
            .create_async()
            .await;

        let err = auth_for(&server).sign_in("a@b.c", "wrongpass").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn sign_up_without_session_awaits_confirmation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/signup")
            .with_status(200)
            .with_body(r#"{"id":"u2","email":"new@fest.edu","confirmation_sent_at":"2027-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let outcome = auth_for(&server).sign_up("new@fest.edu", "secret1").await.unwrap();
        assert_eq!(
            outcome,
            SignUpOutcome::ConfirmationPending(AuthUser {
                id: "u2".into(),
                email: Some("new@fest.edu".into())
            })
        );
    }

    #[tokio::test]
    async fn expired_session_is_not_signed_in() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth/v1/user")
            .match_header("authorization", "Bearer user-jwt")
            .with_status(401)
            .with_body(r#"{"msg":"invalid JWT"}"#)
            .create_async()
            .await;

        let auth = auth_for(&server);
        assert_eq!(auth.current_user(&session()).await.unwrap(), None);
        assert_eq!(auth.admin_gate(Some(&session())).await.unwrap(), AdminGate::NotSignedIn);
        assert_eq!(auth.admin_gate(None).await.unwrap(), AdminGate::NotSignedIn);
    }

    #[tokio::test]
    async fn signed_in_non_admin_is_refused() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth/v1/user")
            .with_status(200)
            .with_body(r#"{"id":"u1","email":"fan@fest.edu"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/rest/v1/rpc/has_role")
            .with_status(200)
            .with_body("false")
            .create_async()
            .await;

        let gate = auth_for(&server).admin_gate(Some(&session())).await.unwrap();
        assert_eq!(gate, AdminGate::NotAdmin);
        assert_eq!(gate.message(), "You do not have admin access");
    }
}
