//! Caller identity extractor for Axum handlers.
//!
//! Identity is established upstream; this server trusts the forwarded
//! `x-user-id`, `x-department-id` and `x-subscription-tier` headers.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use reportdesk::{DepartmentId, SubscriptionTier, TierClaim, UserContext};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const DEPARTMENT_HEADER: &str = "x-department-id";
pub const TIER_HEADER: &str = "x-subscription-tier";

/// The calling user, as forwarded by the identity layer.
///
/// ```ignore
/// async fn my_handler(Caller(user): Caller) -> Result<Json<()>> {
///     tracing::info!(user = %user.user_id.as_ref(), "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Caller(pub UserContext);

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let user_id = header(headers, USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", USER_ID_HEADER)))?;

        // An unknown tier is kept as-is so the access policy can deny it
        let tier = header(headers, TIER_HEADER)
            .map(TierClaim::from)
            .unwrap_or(TierClaim::Known(SubscriptionTier::Free));

        Ok(Caller(UserContext::new(
            user_id,
            header(headers, DEPARTMENT_HEADER).map(DepartmentId::from),
            tier,
        )))
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Caller::from_headers(&parts.headers)
    }
}
