use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::session::{IdentityResponse, LoginRequest, LoginResponse, MessageResponse},
    middleware::{Access, CurrentSession},
    services::Credentials,
    utils::{Password, ValidatedForm},
    AppState,
};

/// Log in with membership number or e-mail address and password.
pub async fn login(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    ValidatedForm(req): ValidatedForm<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let remember = req.remember();
    let member = state
        .auth_service
        .authenticate(Credentials::Password {
            login: req.login,
            password: Password::new(req.password),
        })
        .await?;

    session.login(member.lidnr, remember);

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            lidnr: member.lidnr,
            full_name: member.full_name,
            remember,
        }),
    ))
}

/// End the session and make the browser drop its session cookies.
pub async fn logout(CurrentSession(session): CurrentSession) -> impl IntoResponse {
    session.logout();
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}

/// Who the caller is, and which roles the ACL searches for them.
pub async fn me(Access(access): Access) -> Json<IdentityResponse> {
    let member = access.member();
    Json(IdentityResponse {
        role: access.role_id().to_string(),
        lidnr: member.map(|m| m.lidnr),
        full_name: member.map(|m| m.full_name.clone()),
        roles: access
            .acl()
            .role_lineage(access.role_id())
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}
