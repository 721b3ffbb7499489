use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthGate, Claims};
use crate::error::ApiError;

/// Identity attached to the request by `authenticate`.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub username: String,
    pub is_admin: Option<bool>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.username,
            is_admin: claims.is_admin,
        }
    }
}

/// Attach claims from a bearer token, if one is present and verifies.
///
/// Never rejects: a missing, malformed, expired or badly signed token leaves
/// the request unauthenticated and the policy checks below decide what that
/// means for the route.
pub async fn authenticate(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match gate.verify(&token) {
            Ok(claims) => {
                request.extensions_mut().insert(AuthUser::from(claims));
            }
            Err(err) => {
                tracing::debug!("discarding bearer token: {}", err);
            }
        }
    }

    next.run(request).await
}

/// Policy check: any authenticated user.
pub async fn require_login(request: Request, next: Next) -> Result<Response, ApiError> {
    if request.extensions().get::<AuthUser>().is_none() {
        return Err(ApiError::unauthorized("Authentication required"));
    }

    Ok(next.run(request).await)
}

/// Policy check: authenticated admin.
///
/// Only an explicit `false` admin claim is rejected; tokens that omit the
/// claim keep their access.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin != Some(false) => Ok(next.run(request).await),
        _ => Err(ApiError::unauthorized("Admin privileges required")),
    }
}

/// Policy check: admin, or a username claim matching the path identifier.
///
/// Same admin-claim handling as `require_admin`.
pub async fn require_self_or_admin(
    Path(identifier): Path<String>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin != Some(false) || user.username == identifier => {
            Ok(next.run(request).await)
        }
        _ => Err(ApiError::unauthorized("Admin privileges or ownership required")),
    }
}

/// Pull the token out of `Authorization: Bearer <token>`, matching the
/// scheme case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def".to_string()));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc".to_string()));
        assert_eq!(bearer_token(&headers("BEARER abc")), Some("abc".to_string()));
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert_eq!(bearer_token(&headers("Token abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
