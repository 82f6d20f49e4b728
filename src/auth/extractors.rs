use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::Redirect,
};
use tracing::{debug, error};
use uuid::Uuid;

use crate::{sessions::SessionManager, state::AppState};

pub const SESSION_COOKIE: &str = "health_sid";
pub const LOGIN_PATH: &str = "/login";

/// Read the session token out of the `Cookie` header(s).
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn set_session_cookie(id: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={id}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow { user_id: Uuid, user_name: String },
    Deny,
}

/// Authorization gate: an active session allows, anything else denies.
/// A store failure denies as well.
pub async fn require_auth(sessions: &SessionManager, session_id: Option<&str>) -> Access {
    let Some(id) = session_id else {
        return Access::Deny;
    };
    match sessions.get(id).await {
        Ok(Some(s)) => Access::Allow {
            user_id: s.user_id,
            user_name: s.user_name,
        },
        Ok(None) => Access::Deny,
        Err(e) => {
            error!(error = %e, "session lookup failed");
            Access::Deny
        }
    }
}

/// Extracts the logged-in user or redirects to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub user_name: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_cookie(&parts.headers);
        match require_auth(state.auth.sessions(), token.as_deref()).await {
            Access::Allow { user_id, user_name } => Ok(CurrentUser { user_id, user_name }),
            Access::Deny => {
                debug!("no active session; redirecting to login");
                Err(Redirect::to(LOGIN_PATH))
            }
        }
    }
}
