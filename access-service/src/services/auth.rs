use std::sync::Arc;

use crate::{
    models::Member,
    services::{MemberRepository, ServiceError},
    utils::{verify_against_dummy, verify_password, Password},
};

/// What a caller presents to log in.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Membership number or e-mail address with the account password.
    Password { login: String, password: Password },
    /// Retired pin-code login. No caller may construct a flow that reaches it.
    Pin { lidnr: i64, pin: String },
}

#[derive(Clone)]
pub struct AuthService {
    repository: Arc<dyn MemberRepository>,
}

impl AuthService {
    pub fn new(repository: Arc<dyn MemberRepository>) -> Self {
        Self { repository }
    }

    /// Check credentials and return the member they belong to.
    ///
    /// Unknown accounts, accounts without a password and wrong passwords all
    /// produce [`ServiceError::InvalidCredentials`].
    ///
    /// # Panics
    ///
    /// On [`Credentials::Pin`]; the pin flow has been removed.
    pub async fn authenticate(&self, credentials: Credentials) -> Result<Member, ServiceError> {
        match credentials {
            Credentials::Password { login, password } => {
                self.authenticate_password(&login, &password).await
            }
            Credentials::Pin { .. } => {
                panic!("pin login has been removed and must not be reachable")
            }
        }
    }

    async fn authenticate_password(
        &self,
        login: &str,
        password: &Password,
    ) -> Result<Member, ServiceError> {
        let Some(credentials) = self.repository.find_credentials(login).await? else {
            verify_against_dummy(password);
            tracing::info!("Login attempt for unknown account");
            return Err(ServiceError::InvalidCredentials);
        };

        if !verify_password(password, &credentials.password_hash) {
            tracing::info!(lidnr = credentials.lidnr, "Login attempt with wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        let member = self
            .repository
            .find_member(credentials.lidnr)
            .await?
            .ok_or(ServiceError::MemberNotFound(credentials.lidnr))?;

        tracing::info!(lidnr = member.lidnr, "Member logged in");
        Ok(member)
    }
}
