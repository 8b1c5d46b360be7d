//! Session authentication
//!
//! A successful login stores an opaque token in the `bookz_session` cookie;
//! the token is looked up in the `sessions` table on every request.
//! [`CurrentUser`] rejects with 401 (JSON API), [`PageUser`] redirects to
//! the login page (HTML).

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use bookz_common::db::models::User;
use bookz_common::db::{settings, users};
use serde::Deserialize;
use tracing::{info, warn};

use crate::ui::redirect_with;
use crate::{ApiError, AppState};

pub const SESSION_COOKIE: &str = "bookz_session";

/// Logged-in user for JSON endpoints
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Logged-in user for HTML pages
#[derive(Debug, Clone)]
pub struct PageUser(pub User);

async fn session_user(parts: &Parts, state: &AppState) -> Result<Option<User>, ApiError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    Ok(users::user_for_session(&state.db, cookie.value()).await?)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        session_user(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("Login required".to_string()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for PageUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match session_user(parts, state).await {
            Ok(Some(user)) => Ok(PageUser(user)),
            Ok(None) => Err(Redirect::to("/login").into_response()),
            Err(e) => Err(e.into_response()),
        }
    }
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}

async fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar, ApiError> {
    let ttl = settings::get_session_timeout_seconds(&state.db).await?;
    let token = users::create_session(&state.db, &user.guid, ttl).await?;
    Ok(jar.add(session_cookie(token)))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let result: Result<(CookieJar, User), ApiError> = async {
        let user = users::verify_credentials(&state.db, &form.username, &form.password).await?;
        start_session(&state, jar, &user).await.map(|jar| (jar, user))
    }
    .await;

    match result {
        Ok((jar, user)) => {
            info!(username = %user.username, "User logged in");
            (jar, Redirect::to("/")).into_response()
        }
        Err(e) => {
            warn!(username = %form.username, "Login failed: {}", e);
            redirect_with("/login", "err", &e.user_message()).into_response()
        }
    }
}

/// POST /register
///
/// The first account can always be created; later ones only while
/// `allow_registration` is true.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let result: Result<CookieJar, ApiError> = async {
        let open = users::count_users(&state.db).await? == 0
            || settings::get_allow_registration(&state.db).await?;
        if !open {
            return Err(ApiError::Forbidden("Registration is closed".to_string()));
        }

        let user = users::create_user(&state.db, &form.username, &form.password).await?;
        start_session(&state, jar, &user).await
    }
    .await;

    match result {
        Ok(jar) => (jar, redirect_with("/", "msg", "Welcome to bookz")).into_response(),
        Err(e) => redirect_with("/register", "err", &e.user_message()).into_response(),
    }
}

/// POST /logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Err(e) = users::delete_session(&state.db, cookie.value()).await {
            warn!("Failed to delete session: {}", e);
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, redirect_with("/login", "msg", "Logged out")).into_response()
}
