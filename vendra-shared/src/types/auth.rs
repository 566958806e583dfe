use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marketplace role stored on `users.role` and carried in the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Comprador,
    Vendedor,
    Agente,
    EmpresaConstructora,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Comprador => "comprador",
            UserRole::Vendedor => "vendedor",
            UserRole::Agente => "agente",
            UserRole::EmpresaConstructora => "empresa_constructora",
            UserRole::Admin => "admin",
        }
    }

    /// Roles allowed to publish listings once their application clears.
    pub fn is_seller(&self) -> bool {
        matches!(
            self,
            UserRole::Vendedor | UserRole::Agente | UserRole::EmpresaConstructora
        )
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comprador" => Ok(UserRole::Comprador),
            "vendedor" => Ok(UserRole::Vendedor),
            "agente" => Ok(UserRole::Agente),
            "empresa_constructora" => Ok(UserRole::EmpresaConstructora),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// Access token claims issued by the identity provider (HS256).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, role: UserRole, duration_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            role,
            email: None,
            name: None,
            iat: now,
            exp: now + duration_secs,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            email: claims.email,
            name: claims.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [
            UserRole::Comprador,
            UserRole::Vendedor,
            UserRole::Agente,
            UserRole::EmpresaConstructora,
            UserRole::Admin,
        ] {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), role);
        }
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&UserRole::EmpresaConstructora).unwrap();
        assert_eq!(json, "\"empresa_constructora\"");
    }

    #[test]
    fn only_listing_roles_are_sellers() {
        assert!(UserRole::Vendedor.is_seller());
        assert!(UserRole::EmpresaConstructora.is_seller());
        assert!(!UserRole::Comprador.is_seller());
        assert!(!UserRole::Admin.is_seller());
    }

    #[test]
    fn claims_without_email_still_decode() {
        let json = serde_json::json!({
            "sub": Uuid::nil(),
            "role": "comprador",
            "iat": 0,
            "exp": 10,
        });
        let claims: Claims = serde_json::from_value(json).unwrap();
        assert!(claims.email.is_none());
        assert!(claims.is_expired());
        assert!(!claims.is_admin());
    }
}
