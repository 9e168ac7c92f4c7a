use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{extract_bearer_token, AuthError, JwtService, UserRole, UserSession};

/// JWT authentication middleware
pub async fn jwt_auth_middleware(
    State(jwt_service): State<JwtService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = extract_bearer_token(auth_header)?;
    let session = jwt_service.extract_user_session(token)?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Coach or Admin middleware, guards the operator console
pub async fn coach_or_admin_middleware(request: Request, next: Next) -> Result<Response, AuthError> {
    let session = request
        .extensions()
        .get::<UserSession>()
        .ok_or(AuthError::InsufficientPermissions)?;

    if !session.role.can_access(&UserRole::Coach) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// CORS configuration for the web client
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Security headers middleware
pub fn security_headers_layer() -> tower_http::set_header::SetResponseHeaderLayer<axum::http::HeaderValue> {
    tower_http::set_header::SetResponseHeaderLayer::overriding(
        axum::http::header::HeaderName::from_static("x-content-type-options"),
        axum::http::HeaderValue::from_static("nosniff"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_permissions() {
        let admin = UserRole::Admin;
        let coach = UserRole::Coach;
        let athlete = UserRole::Athlete;

        assert!(admin.can_access(&admin));
        assert!(admin.can_access(&coach));
        assert!(admin.can_access(&athlete));

        assert!(coach.can_access(&coach));
        assert!(coach.can_access(&athlete));
        assert!(!coach.can_access(&admin));

        assert!(athlete.can_access(&athlete));
        assert!(!athlete.can_access(&coach));
        assert!(!athlete.can_access(&admin));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(UserRole::from_str("Coach"), Some(UserRole::Coach));
        assert_eq!(UserRole::from_str("authenticated"), None);
        assert_eq!(UserRole::Admin.as_str(), "admin");
    }
}
