//! User management endpoints

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use crate::{
    error::{validation_errors, AppError, AppResult},
    models::{
        equipo::Equipo,
        usuario::{
            ActualizarUsuario, CrearUsuario, Usuario, UsuarioStats, ESPEC_FILTROS_USUARIOS,
        },
    },
    query::ApiFeatures,
    response::{ApiResponse, Paginacion},
    AppState,
};

use super::AuthenticatedUser;

/// Paginated user listing payload
#[derive(Serialize)]
pub struct ListaUsuarios {
    pub usuarios: Vec<Value>,
    pub pagination: Paginacion,
}

/// List users with filtering, search and pagination. Inactive users are
/// excluded unless the query says otherwise (`activo=false` or `activo=all`).
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("activo" = Option<String>, Query, description = "true (default), false or all"),
        ("search" = Option<String>, Query, description = "Substring search over nombre/email/idUsuario/cargo"),
        ("sort" = Option<String>, Query, description = "Comma-separated fields, - prefix for descending"),
        ("fields" = Option<String>, Query, description = "Comma-separated attribute projection"),
        ("pagina" = Option<i64>, Query, description = "Page number (default 1)"),
        ("limite" = Option<i64>, Query, description = "Page size (default 10, max 100)")
    ),
    responses(
        (status = 200, description = "Paginated users", body = [Usuario]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Requires admin or tecnico role")
    )
)]
pub async fn list_usuarios(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(mut params): Query<HashMap<String, String>>,
) -> AppResult<Json<ApiResponse<ListaUsuarios>>> {
    claims.require_gestor()?;

    // Default to active users; "all" lifts the filter
    match params.get("activo").map(String::as_str) {
        None => {
            params.insert("activo".to_string(), "true".to_string());
        }
        Some("all") => {
            params.remove("activo");
        }
        Some(_) => {}
    }

    let features = ApiFeatures::desde_query(&params, &ESPEC_FILTROS_USUARIOS)?;
    let (usuarios, total) = state.services.usuarios.search(&features).await?;

    let usuarios = usuarios
        .into_iter()
        .map(|u| serde_json::to_value(u).map(|v| features.proyectar(v)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(ApiResponse::exito(
        ListaUsuarios {
            usuarios,
            pagination: Paginacion::new(features.pagina(), features.limite(), total),
        },
        "Usuarios obtenidos exitosamente",
    ))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = Usuario),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_usuario(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Usuario>>> {
    if claims.user_id != id {
        claims.require_gestor()?;
    }

    let usuario = state.services.usuarios.get_by_id(id).await?;
    Ok(ApiResponse::exito(usuario, "Usuario obtenido exitosamente"))
}

/// Create a new user (admin only)
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CrearUsuario,
    responses(
        (status = 201, description = "User created", body = Usuario),
        (status = 400, description = "Invalid input or duplicate id/email"),
        (status = 403, description = "Requires admin role")
    )
)]
pub async fn create_usuario(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(usuario): Json<CrearUsuario>,
) -> AppResult<(StatusCode, Json<ApiResponse<Usuario>>)> {
    claims.require_admin()?;
    usuario.validate().map_err(|e| validation_errors(&e))?;

    let (_, creado) = state.services.usuarios.register(usuario).await?;
    Ok(ApiResponse::creado(creado, "Usuario creado exitosamente"))
}

/// Update an existing user
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    request_body = ActualizarUsuario,
    responses(
        (status = 200, description = "User updated", body = Usuario),
        (status = 400, description = "Invalid input or duplicate email"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_usuario(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(cambios): Json<ActualizarUsuario>,
) -> AppResult<Json<ApiResponse<Usuario>>> {
    if claims.user_id != id {
        claims.require_gestor()?;
    }
    // Only admins may change roles or the activo flag
    if (cambios.rol.is_some() || cambios.activo.is_some()) && !claims.is_admin() {
        return Err(AppError::Authorization(
            "Se requieren privilegios de administrador".to_string(),
        ));
    }
    cambios.validate().map_err(|e| validation_errors(&e))?;

    let actualizado = state.services.usuarios.update(id, cambios).await?;
    Ok(ApiResponse::exito(
        actualizado,
        "Usuario actualizado exitosamente",
    ))
}

/// Soft-delete a user (blocked while they hold an active assignment)
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deactivated"),
        (status = 400, description = "User holds an active assignment"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_usuario(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    claims.require_admin()?;

    state.services.usuarios.soft_delete(id).await?;
    Ok(ApiResponse::sin_datos("Usuario eliminado exitosamente"))
}

/// Permanently remove a user
#[utoipa::path(
    delete,
    path = "/users/{id}/permanent",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User removed"),
        (status = 400, description = "User holds an active assignment"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_usuario_permanente(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    claims.require_admin()?;

    state.services.usuarios.hard_delete(id).await?;
    Ok(ApiResponse::sin_datos("Usuario eliminado permanentemente"))
}

/// Reactivate a soft-deleted user
#[utoipa::path(
    patch,
    path = "/users/{id}/reactivar",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User reactivated", body = Usuario),
        (status = 404, description = "User not found")
    )
)]
pub async fn reactivar_usuario(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Usuario>>> {
    claims.require_admin()?;

    let usuario = state.services.usuarios.reactivate(id).await?;
    Ok(ApiResponse::exito(usuario, "Usuario reactivado exitosamente"))
}

/// Aggregate user statistics
#[utoipa::path(
    get,
    path = "/users/stats",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User statistics", body = UsuarioStats),
        (status = 403, description = "Requires admin or tecnico role")
    )
)]
pub async fn stats_usuarios(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<UsuarioStats>>> {
    claims.require_gestor()?;

    let stats = state.services.usuarios.stats().await?;
    Ok(ApiResponse::exito(stats, "Estadísticas obtenidas exitosamente"))
}

/// Equipment currently assigned to a user
#[utoipa::path(
    get,
    path = "/users/{id}/equipos",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Assigned equipment", body = [Equipo]),
        (status = 404, description = "User not found")
    )
)]
pub async fn equipos_de_usuario(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<Equipo>>>> {
    if claims.user_id != id {
        claims.require_gestor()?;
    }

    let equipos = state.services.usuarios.equipos_asignados(id).await?;
    Ok(ApiResponse::exito(
        equipos,
        "Equipos asignados obtenidos exitosamente",
    ))
}
