//! Equipment management endpoints

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{validation_errors, AppError, AppResult},
    models::{
        asignacion::AsignacionConUsuario,
        equipo::{
            ActualizarEquipo, CrearEquipo, Equipo, EstadisticaEstado, ESPEC_FILTROS_EQUIPOS,
        },
    },
    query::ApiFeatures,
    response::{ApiResponse, Paginacion},
    AppState,
};

use super::AuthenticatedUser;

/// Paginated equipment listing payload
#[derive(Serialize)]
pub struct ListaEquipos {
    pub equipos: Vec<Value>,
    pub pagination: Paginacion,
}

/// Result of the identifier backfill
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigracionIds {
    pub migrados: u64,
}

async fn listar(
    state: &AppState,
    params: &HashMap<String, String>,
) -> AppResult<ListaEquipos> {
    let features = ApiFeatures::desde_query(params, &ESPEC_FILTROS_EQUIPOS)?;
    let (equipos, total) = state.services.equipos.search(&features).await?;

    let equipos = equipos
        .into_iter()
        .map(|e| serde_json::to_value(e).map(|v| features.proyectar(v)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(ListaEquipos {
        equipos,
        pagination: Paginacion::new(features.pagina(), features.limite(), total),
    })
}

/// List equipment with filtering, search and pagination
#[utoipa::path(
    get,
    path = "/equipos",
    tag = "equipos",
    security(("bearer_auth" = [])),
    params(
        ("estado" = Option<String>, Query, description = "Filter by lifecycle state"),
        ("tipoEquipo" = Option<String>, Query, description = "Filter by equipment type"),
        ("marca" = Option<String>, Query, description = "Filter by brand"),
        ("valorCompra[gte]" = Option<String>, Query, description = "Comparison filters: gte, gt, lte, lt"),
        ("search" = Option<String>, Query, description = "Substring search over idEquipo/serial/marca/modelo/tipoEquipo/estado"),
        ("sort" = Option<String>, Query, description = "Comma-separated fields, - prefix for descending"),
        ("fields" = Option<String>, Query, description = "Comma-separated attribute projection"),
        ("pagina" = Option<i64>, Query, description = "Page number (default 1)"),
        ("limite" = Option<i64>, Query, description = "Page size (default 10, max 100)")
    ),
    responses(
        (status = 200, description = "Paginated equipment", body = [Equipo]),
        (status = 400, description = "Invalid filter parameter"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_equipos(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<ApiResponse<ListaEquipos>>> {
    let lista = listar(&state, &params).await?;
    Ok(ApiResponse::exito(lista, "Equipos obtenidos con éxito"))
}

/// Substring search shortcut: /equipos/search?q=term
#[utoipa::path(
    get,
    path = "/equipos/search",
    tag = "equipos",
    security(("bearer_auth" = [])),
    params(
        ("q" = String, Query, description = "Search term"),
        ("pagina" = Option<i64>, Query, description = "Page number"),
        ("limite" = Option<i64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Matching equipment", body = [Equipo]),
        (status = 400, description = "Missing search term")
    )
)]
pub async fn search_equipos(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<ApiResponse<ListaEquipos>>> {
    if params
        .get("q")
        .map(|q| q.trim().is_empty())
        .unwrap_or(true)
    {
        return Err(AppError::validation("El parámetro de búsqueda q es requerido"));
    }

    let lista = listar(&state, &params).await?;
    Ok(ApiResponse::exito(lista, "Búsqueda realizada con éxito"))
}

/// Get equipment by store key or EQ-#### identifier
#[utoipa::path(
    get,
    path = "/equipos/{id}",
    tag = "equipos",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Store key or EQ-#### identifier")),
    responses(
        (status = 200, description = "Equipment details", body = Equipo),
        (status = 400, description = "Malformed id"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn get_equipo(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Equipo>>> {
    let equipo = state.services.equipos.get_flexible(&id).await?;
    Ok(ApiResponse::exito(equipo, "Equipo obtenido con éxito"))
}

/// Register new equipment; idEquipo is generated at creation
#[utoipa::path(
    post,
    path = "/equipos",
    tag = "equipos",
    security(("bearer_auth" = [])),
    request_body = CrearEquipo,
    responses(
        (status = 201, description = "Equipment created", body = Equipo),
        (status = 400, description = "Invalid input or duplicate serial"),
        (status = 403, description = "Requires admin or tecnico role")
    )
)]
pub async fn create_equipo(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(equipo): Json<CrearEquipo>,
) -> AppResult<(StatusCode, Json<ApiResponse<Equipo>>)> {
    claims.require_gestor()?;
    equipo.validate().map_err(|e| validation_errors(&e))?;

    let creado = state.services.equipos.create(equipo).await?;
    Ok(ApiResponse::creado(creado, "Equipo creado con éxito"))
}

/// Update equipment (direct administrative state changes included)
#[utoipa::path(
    put,
    path = "/equipos/{id}",
    tag = "equipos",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Store key or EQ-#### identifier")),
    request_body = ActualizarEquipo,
    responses(
        (status = 200, description = "Equipment updated", body = Equipo),
        (status = 400, description = "Invalid input or duplicate serial"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn update_equipo(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(cambios): Json<ActualizarEquipo>,
) -> AppResult<Json<ApiResponse<Equipo>>> {
    claims.require_gestor()?;
    cambios.validate().map_err(|e| validation_errors(&e))?;

    let actualizado = state.services.equipos.update(&id, cambios).await?;
    Ok(ApiResponse::exito(actualizado, "Equipo actualizado con éxito"))
}

/// Delete equipment; blocked while an assignment is still open
#[utoipa::path(
    delete,
    path = "/equipos/{id}",
    tag = "equipos",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Store key or EQ-#### identifier")),
    responses(
        (status = 200, description = "Equipment deleted"),
        (status = 400, description = "Equipment has an active assignment"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn delete_equipo(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    claims.require_gestor()?;

    state.services.equipos.delete(&id).await?;
    Ok(ApiResponse::sin_datos("Equipo eliminado con éxito"))
}

/// Equipment in a given state (Bodega, Reposo or Alistamiento)
#[utoipa::path(
    get,
    path = "/equipos/estado/{estado}",
    tag = "equipos",
    security(("bearer_auth" = [])),
    params(("estado" = String, Path, description = "Bodega, Reposo or Alistamiento")),
    responses(
        (status = 200, description = "Equipment in the state", body = [Equipo]),
        (status = 400, description = "State not consultable")
    )
)]
pub async fn equipos_por_estado(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(estado): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<Equipo>>>> {
    let equipos = state.services.equipos.por_estado(&estado).await?;
    Ok(ApiResponse::exito(
        equipos,
        format!("Equipos en {} obtenidos correctamente", estado),
    ))
}

/// Get equipment by serial number
#[utoipa::path(
    get,
    path = "/equipos/serial/{serial}",
    tag = "equipos",
    security(("bearer_auth" = [])),
    params(("serial" = String, Path, description = "Serial number")),
    responses(
        (status = 200, description = "Equipment details", body = Equipo),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn equipo_por_serial(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(serial): Path<String>,
) -> AppResult<Json<ApiResponse<Equipo>>> {
    let equipo = state.services.equipos.get_by_serial(&serial).await?;
    Ok(ApiResponse::exito(equipo, "Equipo obtenido con éxito"))
}

/// Equipment counts grouped by state
#[utoipa::path(
    get,
    path = "/equipos/stats/estados",
    tag = "equipos",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Counts per state", body = [EstadisticaEstado])
    )
)]
pub async fn stats_por_estado(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Vec<EstadisticaEstado>>>> {
    let stats = state.services.equipos.stats_por_estado().await?;
    Ok(ApiResponse::exito(
        stats,
        "Estadísticas por estado obtenidas correctamente",
    ))
}

/// Assignment history of an equipment item
#[utoipa::path(
    get,
    path = "/equipos/{id}/historial",
    tag = "equipos",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Store key or EQ-#### identifier")),
    responses(
        (status = 200, description = "Assignment history", body = [AsignacionConUsuario]),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn historial_equipo(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<AsignacionConUsuario>>>> {
    let historial = state.services.equipos.historial(&id).await?;
    Ok(ApiResponse::exito(
        historial,
        "Historial de asignaciones obtenido",
    ))
}

/// Backfill identifiers for legacy equipment rows (admin maintenance)
#[utoipa::path(
    post,
    path = "/equipos/migrar-ids",
    tag = "equipos",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Backfill finished", body = MigracionIds),
        (status = 403, description = "Requires admin role")
    )
)]
pub async fn migrar_ids(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ApiResponse<MigracionIds>>> {
    claims.require_admin()?;

    let migrados = state.services.equipos.migrar_ids().await?;
    Ok(ApiResponse::exito(
        MigracionIds { migrados },
        "Migración de identificadores completada",
    ))
}
