use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use tracing::{debug, instrument};

use crate::{
    auth::{
        dto::{LoginForm, RegisterForm},
        extractors::{clear_session_cookie, session_cookie, set_session_cookie, CurrentUser, LOGIN_PATH},
        services::AuthError,
    },
    state::AppState,
    views,
};

pub const HOME_PATH: &str = "/halaman-utama";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", get(logout))
}

pub fn home_routes() -> Router<AppState> {
    Router::new().route(HOME_PATH, get(home))
}

fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::DuplicateEmail => StatusCode::CONFLICT,
        AuthError::Persistence(_) | AuthError::RegistrationFailed(_) | AuthError::Hashing(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn login_form() -> Html<String> {
    views::login(&[])
}

pub async fn register_form() -> Html<String> {
    views::register(&[])
}

#[instrument(skip(state, headers, form))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let session = match state.auth.login(&form).await {
        Ok(s) => s,
        Err(e) => return (status_for(&e), views::login(&e.messages())).into_response(),
    };

    // a fresh login never reuses the token the client arrived with
    if let Some(previous) = session_cookie(&headers) {
        state.auth.logout(&previous).await;
    }

    let cookie = set_session_cookie(
        &session.id,
        state.auth.sessions().ttl().whole_seconds(),
        state.config.session.cookie_secure,
    );
    ([(header::SET_COOKIE, cookie)], Redirect::to(HOME_PATH)).into_response()
}

#[instrument(skip(state, form))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    match state.auth.register(&form).await {
        Ok(_) => Redirect::to(LOGIN_PATH).into_response(),
        Err(e) => (status_for(&e), views::register(&e.messages())).into_response(),
    }
}

#[instrument(skip(state, headers))]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_cookie(&headers) {
        state.auth.logout(&id).await;
        debug!("session destroyed");
    }
    ([(header::SET_COOKIE, clear_session_cookie())], Redirect::to("/")).into_response()
}

#[instrument(skip(user), fields(user_id = %user.user_id))]
pub async fn home(user: CurrentUser) -> Html<String> {
    views::home(&user.user_name)
}
