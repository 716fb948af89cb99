use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use contracts::shared::api_response::ApiResponse;
use contracts::system::auth::TokenClaims;

/// Claims of the authenticated caller, placed into extensions by `require_auth`.
///
/// A route outside the auth layer gets a JSON 401 instead of a panic.
pub struct CurrentUser(pub TokenClaims);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiResponse<()>>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<TokenClaims>() {
            Some(claims) => Ok(CurrentUser(claims.clone())),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Authentication required")),
            )),
        }
    }
}
