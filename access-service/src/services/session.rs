//! Per-request session resolution.
//!
//! The server-side session is trusted as is. Without one, a presented
//! `GEWISSESSTOKEN` is validated and, when valid, used to re-establish the
//! server-side session. A corrupt token is cleared so the browser stops
//! sending it. Once a request has started revoking its session the token is
//! never validated again within that request.

use std::sync::{Arc, Mutex, MutexGuard};

use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Utc};

use super::session_store::{SessionRecord, SESSION_ID_COOKIE};
use super::session_token::{SessionTokenService, TokenVerdict, DELETED_COOKIE_VALUE};
use crate::models::Lidnr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing presented.
    Guest,
    /// Identity taken from the server-side session.
    Server(Lidnr),
    /// Identity recovered from a valid token; the server-side session must be re-established.
    Restored(Lidnr),
    /// Token verified but past its expiry.
    Expired,
    /// Token failed verification; the cookie must be cleared.
    Corrupt,
    /// The session is being revoked in this request.
    Revoked,
}

impl Resolution {
    pub fn lidnr(self) -> Option<Lidnr> {
        match self {
            Resolution::Server(lidnr) | Resolution::Restored(lidnr) => Some(lidnr),
            _ => None,
        }
    }

    pub fn clears_cookie(self) -> bool {
        self == Resolution::Corrupt
    }

    pub fn reestablishes(self) -> bool {
        matches!(self, Resolution::Restored(_))
    }

    pub fn outcome(self) -> &'static str {
        match self {
            Resolution::Guest => "guest",
            Resolution::Server(_) => "server",
            Resolution::Restored(_) => "restored",
            Resolution::Expired => "expired",
            Resolution::Corrupt => "corrupt",
            Resolution::Revoked => "revoked",
        }
    }
}

/// Decide who the request is from.
pub fn resolve_session(
    server: Option<Lidnr>,
    token: Option<&str>,
    revoking: bool,
    tokens: &SessionTokenService,
    now: DateTime<Utc>,
) -> Resolution {
    if revoking {
        return Resolution::Revoked;
    }
    if let Some(lidnr) = server {
        return Resolution::Server(lidnr);
    }
    let Some(token) = token.filter(|t| !t.is_empty() && *t != DELETED_COOKIE_VALUE) else {
        return Resolution::Guest;
    };

    match tokens.decode_and_validate(token, now) {
        TokenVerdict::Valid(lidnr) => Resolution::Restored(lidnr),
        TokenVerdict::Expired => Resolution::Expired,
        TokenVerdict::Invalid => Resolution::Corrupt,
    }
}

/// What the session middleware must write back after the handler ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Keep,
    /// Store the record. `rotate` asks for a fresh session id.
    Put { record: SessionRecord, rotate: bool },
    Remove,
}

#[derive(Debug, Clone)]
pub struct SessionChanges {
    pub store: StoreWrite,
    pub cookies: Vec<Cookie<'static>>,
}

#[derive(Debug)]
struct SessionState {
    server: Option<SessionRecord>,
    token: Option<String>,
    now: DateTime<Utc>,
    resolved: Option<Resolution>,
    revoking: bool,
    login: Option<SessionRecord>,
}

/// The session of one request, shared between the session middleware and
/// the handlers through request extensions.
#[derive(Clone)]
pub struct RequestSession {
    state: Arc<Mutex<SessionState>>,
    tokens: Arc<SessionTokenService>,
}

impl RequestSession {
    pub fn new(
        tokens: Arc<SessionTokenService>,
        server: Option<SessionRecord>,
        token: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                server,
                token,
                now,
                resolved: None,
                revoking: false,
                login: None,
            })),
            tokens,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve on first use; later calls return the same answer until the
    /// session is logged in or revoked.
    pub fn resolution(&self) -> Resolution {
        let mut state = self.state();
        if let Some(resolution) = state.resolved {
            return resolution;
        }
        let resolution = resolve_session(
            state.server.map(|record| record.lidnr),
            state.token.as_deref(),
            state.revoking,
            &self.tokens,
            state.now,
        );
        tracing::debug!(outcome = resolution.outcome(), "Resolved session");
        super::metrics::record_session_resolution(resolution.outcome());
        state.resolved = Some(resolution);
        resolution
    }

    pub fn lidnr(&self) -> Option<Lidnr> {
        if let Some(record) = self.state().login {
            return Some(record.lidnr);
        }
        self.resolution().lidnr()
    }

    /// Start a session for `lidnr`, issuing a long-lived token when `remember` is set.
    pub fn login(&self, lidnr: Lidnr, remember: bool) {
        let mut state = self.state();
        state.revoking = false;
        state.login = Some(SessionRecord { lidnr, remember });
        state.resolved = Some(Resolution::Server(lidnr));
    }

    /// Clear the session, the remember flag and both cookies.
    pub fn logout(&self) {
        let mut state = self.state();
        state.revoking = true;
        state.login = None;
        state.resolved = Some(Resolution::Revoked);
    }

    pub fn is_revoking(&self) -> bool {
        self.state().revoking
    }

    /// Changes to persist once the handler is done.
    pub fn finish(&self) -> SessionChanges {
        let resolution = self.resolution();
        let state = self.state();

        if state.revoking {
            return SessionChanges {
                store: StoreWrite::Remove,
                cookies: vec![
                    self.tokens.removal_cookie(),
                    self.tokens.expired_cookie(SESSION_ID_COOKIE),
                ],
            };
        }

        if let Some(record) = state.login {
            let mut cookies = Vec::new();
            if record.remember {
                match self.tokens.encode_session(record.lidnr, state.now) {
                    Ok(issued) => cookies.push(issued.cookie),
                    Err(e) => {
                        tracing::error!(lidnr = record.lidnr, error = %e, "Failed to issue session token");
                    }
                }
            } else if state.token.is_some() {
                cookies.push(self.tokens.removal_cookie());
            }
            return SessionChanges {
                store: StoreWrite::Put {
                    record,
                    rotate: true,
                },
                cookies,
            };
        }

        let store = match resolution.lidnr() {
            Some(lidnr) if resolution.reestablishes() => StoreWrite::Put {
                record: SessionRecord {
                    lidnr,
                    remember: true,
                },
                rotate: false,
            },
            _ => StoreWrite::Keep,
        };
        let mut cookies = Vec::new();
        if resolution.clears_cookie() {
            cookies.push(self.tokens.removal_cookie());
        }
        SessionChanges { store, cookies }
    }
}
