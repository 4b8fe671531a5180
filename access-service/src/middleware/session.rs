use std::sync::Arc;

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use service_core::axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{
    acl::{build_access_context, AccessContext, Identity},
    services::{
        new_session_id, RequestSession, StoreWrite, SESSION_ID_COOKIE, SESSION_TOKEN_COOKIE,
    },
    AppState,
};

/// Attach a [`RequestSession`] to the request and write its changes back
/// to the session store and the response cookies.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let session_id = jar.get(SESSION_ID_COOKIE).map(|c| c.value().to_string());

    let server = match &session_id {
        Some(id) => match state.sessions.get(id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read server-side session");
                None
            }
        },
        None => None,
    };

    let token = jar.get(SESSION_TOKEN_COOKIE).map(|c| c.value().to_string());
    let session = RequestSession::new(state.tokens.clone(), server, token, Utc::now());
    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;

    let changes = session.finish();
    let mut cookies = changes.cookies;

    match changes.store {
        StoreWrite::Keep => {}
        StoreWrite::Put { record, rotate } => {
            let reuse = session_id.clone().filter(|_| !rotate && server.is_some());
            if rotate {
                if let Some(old) = &session_id {
                    if let Err(e) = state.sessions.remove(old).await {
                        tracing::error!(error = %e, "Failed to drop rotated session");
                    }
                }
            }
            let id = reuse.unwrap_or_else(new_session_id);
            let expiry_seconds = state.tokens.cookie_settings().lifetime.num_seconds();
            match state.sessions.put(&id, record, expiry_seconds).await {
                Ok(()) => {
                    if session_id.as_deref() != Some(id.as_str()) {
                        cookies.push(state.tokens.build_cookie(SESSION_ID_COOKIE, id));
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to store session"),
            }
        }
        StoreWrite::Remove => {
            if let Some(id) = &session_id {
                if let Err(e) = state.sessions.remove(id).await {
                    tracing::error!(error = %e, "Failed to remove session");
                }
            }
        }
    }

    append_cookies(&mut response, cookies);
    response
}

fn append_cookies(response: &mut Response, cookies: Vec<Cookie<'static>>) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => {
                tracing::error!(cookie = %cookie.name(), error = %e, "Unencodable cookie");
            }
        }
    }
}

/// The [`RequestSession`] of the current request.
pub struct CurrentSession(pub RequestSession);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestSession>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Session missing from request extensions"
                ))
            })
    }
}

/// The ACL for the caller of the current request.
pub struct Access(pub AccessContext);

#[async_trait]
impl FromRequestParts<AppState> for Access {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;

        let identity = match session.lidnr() {
            Some(lidnr) => match state.repository.find_member(lidnr).await? {
                Some(member) => Identity::Member(Arc::new(member)),
                None => {
                    tracing::warn!(lidnr, "Session refers to an unknown member");
                    Identity::Guest
                }
            },
            None => Identity::Guest,
        };

        let context = build_access_context(&state.acl, identity, Utc::now())
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;
        Ok(Access(context))
    }
}
