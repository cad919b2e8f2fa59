//! Assignment management endpoints

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    error::AppResult,
    models::asignacion::{
        Asignacion, AsignacionConEquipo, AsignacionConUsuario, AsignacionDetalle,
        CrearAsignacion, FinalizarAsignacion, ESPEC_FILTROS_ASIGNACIONES,
    },
    query::ApiFeatures,
    response::{ApiResponse, Paginacion},
    AppState,
};

use super::AuthenticatedUser;

/// Paginated assignment listing payload
#[derive(Serialize)]
pub struct ListaAsignaciones {
    pub asignaciones: Vec<AsignacionDetalle>,
    pub pagination: Paginacion,
}

/// Create a new assignment
#[utoipa::path(
    post,
    path = "/asignaciones",
    tag = "asignaciones",
    security(("bearer_auth" = [])),
    request_body = CrearAsignacion,
    responses(
        (status = 201, description = "Assignment created", body = Asignacion),
        (status = 400, description = "Equipment already assigned"),
        (status = 403, description = "Requires admin or tecnico role"),
        (status = 404, description = "User or equipment not found")
    )
)]
pub async fn crear_asignacion(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(asignacion): Json<CrearAsignacion>,
) -> AppResult<(StatusCode, Json<ApiResponse<Asignacion>>)> {
    claims.require_gestor()?;

    let creada = state.services.asignaciones.crear(asignacion).await?;
    Ok(ApiResponse::creado(creada, "Asignación creada exitosamente"))
}

/// List assignments (both references joined in)
#[utoipa::path(
    get,
    path = "/asignaciones",
    tag = "asignaciones",
    security(("bearer_auth" = [])),
    params(
        ("activo" = Option<bool>, Query, description = "Filter by active flag"),
        ("pagina" = Option<i64>, Query, description = "Page number (default 1)"),
        ("limite" = Option<i64>, Query, description = "Page size (default 10, max 100)")
    ),
    responses(
        (status = 200, description = "Paginated assignments", body = [AsignacionDetalle]),
        (status = 403, description = "Requires admin or tecnico role")
    )
)]
pub async fn list_asignaciones(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<ApiResponse<ListaAsignaciones>>> {
    claims.require_gestor()?;

    let features = ApiFeatures::desde_query(&params, &ESPEC_FILTROS_ASIGNACIONES)?;
    let (asignaciones, total) = state.services.asignaciones.obtener_todas(&features).await?;

    Ok(ApiResponse::exito(
        ListaAsignaciones {
            asignaciones,
            pagination: Paginacion::new(features.pagina(), features.limite(), total),
        },
        "Asignaciones obtenidas correctamente",
    ))
}

/// Get one assignment by ID
#[utoipa::path(
    get,
    path = "/asignaciones/{id}",
    tag = "asignaciones",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment details", body = AsignacionDetalle),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn get_asignacion(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<AsignacionDetalle>>> {
    claims.require_gestor()?;

    let asignacion = state.services.asignaciones.obtener_detalle(id).await?;
    Ok(ApiResponse::exito(
        asignacion,
        "Asignación obtenida correctamente",
    ))
}

/// Finalize an assignment: stamps the return date and moves the equipment
/// to Reposo
#[utoipa::path(
    put,
    path = "/asignaciones/{id}",
    tag = "asignaciones",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Assignment ID")),
    request_body = FinalizarAsignacion,
    responses(
        (status = 200, description = "Assignment finalized", body = Asignacion),
        (status = 400, description = "Assignment already finalized"),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn finalizar_asignacion(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    datos: Option<Json<FinalizarAsignacion>>,
) -> AppResult<Json<ApiResponse<Asignacion>>> {
    claims.require_gestor()?;

    let datos = datos.map(|Json(d)| d).unwrap_or_default();
    let finalizada = state.services.asignaciones.finalizar(id, datos).await?;
    Ok(ApiResponse::exito(
        finalizada,
        "Asignación finalizada correctamente",
    ))
}

/// All assignments of a user
#[utoipa::path(
    get,
    path = "/asignaciones/usuario/{usuarioId}",
    tag = "asignaciones",
    security(("bearer_auth" = [])),
    params(("usuarioId" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User's assignments", body = [AsignacionConEquipo])
    )
)]
pub async fn asignaciones_por_usuario(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(usuario_id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<AsignacionConEquipo>>>> {
    claims.require_gestor()?;

    let asignaciones = state.services.asignaciones.por_usuario(usuario_id).await?;
    Ok(ApiResponse::exito(
        asignaciones,
        "Asignaciones por usuario obtenidas",
    ))
}

/// Assignment history of an equipment item
#[utoipa::path(
    get,
    path = "/asignaciones/equipo/{equipoId}",
    tag = "asignaciones",
    security(("bearer_auth" = [])),
    params(("equipoId" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment's assignment history", body = [AsignacionConUsuario])
    )
)]
pub async fn historial_por_equipo(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(equipo_id): Path<i32>,
) -> AppResult<Json<ApiResponse<Vec<AsignacionConUsuario>>>> {
    claims.require_gestor()?;

    let asignaciones = state
        .services
        .asignaciones
        .historial_equipo(equipo_id)
        .await?;
    Ok(ApiResponse::exito(
        asignaciones,
        "Historial del equipo obtenido",
    ))
}
