//! Authentication endpoints

use axum::{
    extract::State,
    http::{request::Parts, StatusCode},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{validation_errors, AppError, AppResult},
    models::{
        equipo::Equipo,
        usuario::{CrearUsuario, Credenciales, Usuario},
    },
    response::ApiResponse,
    AppState,
};

use super::{extraer_token, AuthenticatedUser};

/// Token plus the authenticated user
#[derive(Serialize, ToSchema)]
pub struct SesionData {
    pub token: String,
    pub user: Usuario,
}

/// Token verification result
#[derive(Serialize, ToSchema)]
pub struct VerificacionData {
    pub valid: bool,
    pub user: Usuario,
}

/// Authenticated user with their currently assigned equipment
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioConEquipos {
    #[serde(flatten)]
    pub usuario: Usuario,
    pub equipos_asignados: Vec<Equipo>,
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = Credenciales,
    responses(
        (status = 200, description = "Login successful", body = SesionData),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(credenciales): Json<Credenciales>,
) -> AppResult<Json<ApiResponse<SesionData>>> {
    credenciales.validate().map_err(|e| validation_errors(&e))?;

    let (token, user) = state
        .services
        .usuarios
        .authenticate(&credenciales.email, &credenciales.password)
        .await?;

    Ok(ApiResponse::exito(
        SesionData { token, user },
        "Login exitoso",
    ))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = CrearUsuario,
    responses(
        (status = 201, description = "User registered", body = SesionData),
        (status = 400, description = "Invalid input or duplicate id/email")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(usuario): Json<CrearUsuario>,
) -> AppResult<(StatusCode, Json<ApiResponse<SesionData>>)> {
    usuario.validate().map_err(|e| validation_errors(&e))?;

    let (token, user) = state.services.usuarios.register(usuario).await?;

    Ok(ApiResponse::creado(
        SesionData { token, user },
        "Usuario registrado exitosamente",
    ))
}

/// Log out. Tokens are stateless; this is an acknowledgement for clients
/// that clear their stored token.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout acknowledged")
    )
)]
pub async fn logout() -> Json<ApiResponse<()>> {
    ApiResponse::sin_datos("Logout exitoso")
}

/// Verify the presented token and return its user
#[utoipa::path(
    post,
    path = "/auth/verify-token",
    tag = "auth",
    responses(
        (status = 200, description = "Token is valid", body = VerificacionData),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn verify_token(
    State(state): State<AppState>,
    parts: Parts,
) -> AppResult<Json<ApiResponse<VerificacionData>>> {
    let token = extraer_token(&parts)
        .ok_or_else(|| AppError::Authentication("No token provided".to_string()))?;

    let user = state.services.usuarios.verify_token(&token).await?;

    Ok(ApiResponse::exito(
        VerificacionData { valid: true, user },
        "Token válido",
    ))
}

/// Current user with their assigned equipment
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Authenticated user", body = UsuarioConEquipos),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<UsuarioConEquipos>>> {
    let usuario = state.services.usuarios.get_by_id(claims.user_id).await?;
    let equipos_asignados = state
        .services
        .usuarios
        .equipos_asignados(claims.user_id)
        .await?;

    Ok(ApiResponse::exito(
        UsuarioConEquipos {
            usuario,
            equipos_asignados,
        },
        "Usuario obtenido exitosamente",
    ))
}
