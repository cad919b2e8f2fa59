//! API handlers for the Activos REST endpoints

pub mod asignaciones;
pub mod auth;
pub mod equipos;
pub mod health;
pub mod openapi;
pub mod usuarios;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};

use crate::{error::AppError, models::usuario::UserClaims, AppState};

/// Extract the raw token from the Authorization header or, failing that,
/// from the `jwt` session cookie
pub(crate) fn extraer_token(parts: &Parts) -> Option<String> {
    if let Some(valor) = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = valor.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    parts
        .headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .map(str::trim)
                .find_map(|par| par.strip_prefix("jwt="))
                .map(str::to_string)
        })
}

/// Extractor for authenticated user from JWT token. Fails closed: any
/// missing, malformed or expired token answers 401 before the handler runs.
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extraer_token(parts).ok_or_else(|| {
            AppError::Authentication(
                "No has iniciado sesión. Por favor inicia sesión para acceder".to_string(),
            )
        })?;

        let claims = UserClaims::from_token(&token, &state.config.auth.jwt_secret)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Authentication("Token expirado".to_string())
                }
                _ => AppError::Authentication("Token inválido".to_string()),
            })?;

        Ok(AuthenticatedUser(claims))
    }
}
