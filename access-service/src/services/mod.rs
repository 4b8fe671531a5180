//! Services layer for access-service.
//!
//! Authentication, member lookup, session tokens and the per-request
//! session state machine.

mod auth;
pub mod error;
pub mod metrics;
mod repository;
pub mod session;
pub mod session_store;
pub mod session_token;

pub use auth::{AuthService, Credentials};
pub use error::ServiceError;
pub use repository::{MemberCredentials, MemberRepository, MemoryRepository};
pub use session::{resolve_session, RequestSession, Resolution, SessionChanges, StoreWrite};
pub use session_store::{
    new_session_id, MemorySessionStore, SessionRecord, SessionStore, SESSION_ID_COOKIE,
};
pub use session_token::{
    IssuedSession, SessionClaims, SessionTokenService, TokenVerdict,
    COMPANY_SESSION_TOKEN_COOKIE, SESSION_TOKEN_COOKIE,
};
