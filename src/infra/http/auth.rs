//! Session cookies, principal extractors, and the account routes.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query, State},
    http::StatusCode,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum::Form;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

use crate::application::accounts::{AccountError, Principal};
use crate::presentation::views::{
    LayoutContext, LoginTemplate, LoginView, SignupTemplate, SignupView, ViewerView,
    render_template_response,
};

use super::RouterState;
use super::forms::{LoginForm, SignupForm};

pub const SESSION_COOKIE: &str = "brusio_session";

/// The optional signed-in principal.
pub struct CurrentUser(pub Option<Principal>);

impl CurrentUser {
    pub fn viewer(&self) -> Option<ViewerView> {
        self.0.as_ref().map(|principal| ViewerView {
            username: principal.username.clone(),
        })
    }
}

impl FromRequestParts<RouterState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &RouterState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_principal(parts, state)))
    }
}

/// Extractor for routes that demand authentication; unauthenticated requests
/// are redirected to the login form with `next` pointing back here.
pub struct RequireUser(pub Principal);

impl FromRequestParts<RouterState> for RequireUser {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &RouterState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_principal(parts, state) {
            Some(principal) => Ok(Self(principal)),
            None => Err(LoginRedirect {
                next: parts.uri.path().to_string(),
            }),
        }
    }
}

pub struct LoginRedirect {
    next: String,
}

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to(&format!("/auth/login/?next={}", self.next)).into_response()
    }
}

fn resolve_principal(parts: &Parts, state: &RouterState) -> Option<Principal> {
    let jar = CookieJar::from_headers(&parts.headers);
    let cookie = jar.get(SESSION_COOKIE)?;
    let session_id = Uuid::parse_str(cookie.value()).ok()?;
    state.accounts.resolve(session_id)
}

/// Accept only site-local redirect targets; anything the URL parser treats as
/// absolute could bounce a victim to a foreign origin.
pub(crate) fn sanitize_next(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.starts_with('/') || trimmed.starts_with("//") {
        return None;
    }
    if Url::parse(trimmed).is_ok() {
        return None;
    }
    Some(trimmed.to_string())
}

fn session_cookie(session_id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextQuery {
    next: Option<String>,
}

pub async fn login_form(
    current: CurrentUser,
    Query(query): Query<NextQuery>,
) -> Response {
    let next = query
        .next
        .as_deref()
        .and_then(sanitize_next)
        .unwrap_or_default();

    let view = LayoutContext::new(
        current.viewer(),
        LoginView {
            username: String::new(),
            next,
            error: None,
        },
    );
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

pub async fn login(
    State(state): State<RouterState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.accounts.login(&form.username, &form.password).await {
        Ok(session_id) => {
            let target = sanitize_next(&form.next).unwrap_or_else(|| "/".to_string());
            (jar.add(session_cookie(session_id)), Redirect::to(&target)).into_response()
        }
        Err(AccountError::Repo(err)) => crate::application::error::HttpError::from_error(
            "infra::http::auth::login",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &err,
        )
        .into_response(),
        Err(_) => {
            let view = LayoutContext::new(
                None,
                LoginView {
                    username: form.username,
                    next: sanitize_next(&form.next).unwrap_or_default(),
                    error: Some("Invalid username or password.".to_string()),
                },
            );
            render_template_response(LoginTemplate { view }, StatusCode::OK)
        }
    }
}

pub async fn signup_form(current: CurrentUser) -> Response {
    let view = LayoutContext::new(
        current.viewer(),
        SignupView {
            username: String::new(),
            error: None,
        },
    );
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

pub async fn signup(
    State(state): State<RouterState>,
    Form(form): Form<SignupForm>,
) -> Response {
    match state.accounts.signup(&form.username, &form.password).await {
        Ok(_) => Redirect::to("/auth/login/").into_response(),
        Err(AccountError::Repo(err)) => crate::application::error::HttpError::from_error(
            "infra::http::auth::signup",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &err,
        )
        .into_response(),
        Err(err) => {
            let view = LayoutContext::new(
                None,
                SignupView {
                    username: form.username,
                    error: Some(err.to_string()),
                },
            );
            render_template_response(SignupTemplate { view }, StatusCode::OK)
        }
    }
}

pub async fn logout(State(state): State<RouterState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE)
        && let Ok(session_id) = Uuid::parse_str(cookie.value())
    {
        state.accounts.logout(session_id);
    }

    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (jar, Redirect::to("/")).into_response()
}
