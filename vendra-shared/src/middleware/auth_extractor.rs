use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, DecodingKey, Validation, Algorithm};

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims, UserRole};

pub const DEV_JWT_SECRET: &str = "development-secret-change-in-production";
pub const DEV_INTERNAL_TOKEN: &str = "development-internal-token";
pub const INTERNAL_TOKEN_HEADER: &str = "X-Internal-Token";

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = validate_jwt(&token, &jwt_secret())?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

pub fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string())
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme"))
}

/// Decodes and verifies an HS256 access token. Also used by the socket handshake.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::new(ErrorCode::TokenExpired, "token has expired")
        }
        _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
    })?;

    Ok(token_data.claims)
}

/// Optional auth extractor
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(Self(Some(user))),
            Err(_) => Ok(Self(None)),
        }
    }
}

/// Require the `admin` role claim. 401 without a valid token, 403 otherwise.
pub struct AdminUser(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::Admin {
            return Err(AppError::new(ErrorCode::Forbidden, "admin access required"));
        }
        Ok(Self(user))
    }
}

/// Service state that knows the token `/internal/*` callers must present.
/// The same configured value is handed to the service's [`crate::clients::internal::InternalClient`]s.
pub trait InternalTokenSource {
    fn internal_token(&self) -> &str;
}

impl<T: InternalTokenSource> InternalTokenSource for std::sync::Arc<T> {
    fn internal_token(&self) -> &str {
        (**self).internal_token()
    }
}

/// Service-to-service caller holding the shared internal token.
pub struct InternalCaller;

#[axum::async_trait]
impl<S> FromRequestParts<S> for InternalCaller
where
    S: InternalTokenSource + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let expected = state.internal_token();
        let provided = parts
            .headers
            .get(INTERNAL_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing internal token"))?;

        if provided != expected {
            return Err(AppError::new(ErrorCode::Forbidden, "invalid internal token"));
        }
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn token_for(role: UserRole, secret: &str) -> String {
        let claims = Claims::new(Uuid::now_v7(), role, 3600).with_email("ana@example.com");
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn app() -> Router {
        Router::new()
            .route("/me", get(|user: AuthUser| async move { user.role.to_string() }))
            .route("/admin", get(|AdminUser(user): AdminUser| async move { user.id.to_string() }))
    }

    async fn status_of(path: &str, auth: Option<String>) -> StatusCode {
        let mut req = Request::builder().uri(path);
        if let Some(value) = auth {
            req = req.header("Authorization", value);
        }
        app().oneshot(req.body(Body::empty()).unwrap()).await.unwrap().status()
    }

    #[tokio::test]
    async fn missing_header_is_401() {
        assert_eq!(status_of("/me", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_of("/admin", None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_scheme_is_401() {
        let token = token_for(UserRole::Admin, &jwt_secret());
        assert_eq!(status_of("/admin", Some(format!("Basic {token}"))).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bad_signature_is_401() {
        let token = token_for(UserRole::Admin, "some-other-secret");
        assert_eq!(status_of("/admin", Some(format!("Bearer {token}"))).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_admin_is_403() {
        let token = token_for(UserRole::Vendedor, &jwt_secret());
        assert_eq!(status_of("/me", Some(format!("Bearer {token}"))).await, StatusCode::OK);
        assert_eq!(status_of("/admin", Some(format!("Bearer {token}"))).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_claim_is_accepted() {
        let token = token_for(UserRole::Admin, &jwt_secret());
        assert_eq!(status_of("/admin", Some(format!("Bearer {token}"))).await, StatusCode::OK);
    }

    struct TokenState {
        token: String,
    }

    impl InternalTokenSource for TokenState {
        fn internal_token(&self) -> &str {
            &self.token
        }
    }

    async fn internal_status(configured: &str, header: Option<&str>) -> StatusCode {
        let app = Router::new()
            .route("/internal/ping", get(|_caller: InternalCaller| async { "pong" }))
            .with_state(std::sync::Arc::new(TokenState { token: configured.to_string() }));
        let mut req = Request::builder().uri("/internal/ping");
        if let Some(value) = header {
            req = req.header(INTERNAL_TOKEN_HEADER, value);
        }
        app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap().status()
    }

    #[tokio::test]
    async fn internal_caller_checks_configured_token() {
        assert_eq!(internal_status("configured-secret", Some("configured-secret")).await, StatusCode::OK);
        assert_eq!(internal_status("configured-secret", Some(DEV_INTERNAL_TOKEN)).await, StatusCode::FORBIDDEN);
        assert_eq!(internal_status("configured-secret", None).await, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn validate_jwt_reads_email_claim() {
        let secret = "unit-secret";
        let claims = validate_jwt(&token_for(UserRole::Comprador, secret), secret).unwrap();
        assert_eq!(claims.email.as_deref(), Some("ana@example.com"));
        assert_eq!(claims.role, UserRole::Comprador);
    }
}
