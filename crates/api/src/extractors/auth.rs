use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use leadflow_services::{RequesterContext, ServiceError};

use crate::{error::ApiError, state::AppState};

/// The authenticated caller, resolved from the bearer token into the
/// context every engine operation takes.
#[derive(Debug, Clone)]
pub struct AuthUser(pub RequesterContext);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;

        let claims = app_state.auth.verify_access_token(token)?;
        let user_id = claims.user_id()?;

        let ctx = app_state
            .engine
            .hierarchy
            .context_for(user_id)
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(_) => ApiError::Unauthorized("Unknown user".to_string()),
                other => other.into(),
            })?;
        Ok(AuthUser(ctx))
    }
}
