//! Extractors that run `validator` rules before a handler sees its input.
//!
//! Malformed input is a 400; input that parses but breaks a rule is a 422
//! carrying the offending fields.

use async_trait::async_trait;
use service_core::axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Form,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// URL-encoded form body that passed its validation rules.
pub struct ValidatedForm<T>(pub T);

/// Query string that passed its validation rules.
pub struct ValidatedQuery<T>(pub T);

fn validated<T: Validate>(value: T) -> Result<T, AppError> {
    value.validate()?;
    Ok(value)
}

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedForm<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                AppError::BadRequest(anyhow::anyhow!("Invalid form: {}", rejection.body_text()))
            })?;
        validated(value).map(ValidatedForm)
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                AppError::BadRequest(anyhow::anyhow!("Invalid query: {}", rejection.body_text()))
            })?;
        validated(value).map(ValidatedQuery)
    }
}
