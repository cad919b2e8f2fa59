//! Asignacion (equipment-to-user assignment) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;

use crate::query::{CampoFiltro, EspecFiltros, TipoCampo};

/// Accessory checklist handed out with the equipment
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Accesorios {
    #[serde(default)]
    pub cargador_laptop: bool,
    #[serde(default)]
    pub docking_station: bool,
    #[serde(default)]
    pub cargador_docking: bool,
    #[serde(default)]
    pub monitor: bool,
    #[serde(default)]
    pub maleta: bool,
    #[serde(default)]
    pub guaya_adaptador: bool,
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct AsignacionRow {
    id: i32,
    usuario_id: i32,
    equipo_id: i32,
    accesorios: Json<Accesorios>,
    fecha_asignacion: DateTime<Utc>,
    fecha_devolucion: Option<DateTime<Utc>>,
    motivo_devolucion: Option<String>,
    activo: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AsignacionRow> for Asignacion {
    fn from(row: AsignacionRow) -> Self {
        Asignacion {
            id: row.id,
            usuario: row.usuario_id,
            equipo: row.equipo_id,
            accesorios: row.accesorios.0,
            fecha_asignacion: row.fecha_asignacion,
            fecha_devolucion: row.fecha_devolucion,
            motivo_devolucion: row.motivo_devolucion,
            activo: row.activo,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Assignment model
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Asignacion {
    pub id: i32,
    /// Referenced user id
    pub usuario: i32,
    /// Referenced equipment id
    pub equipo: i32,
    pub accesorios: Accesorios,
    pub fecha_asignacion: DateTime<Utc>,
    pub fecha_devolucion: Option<DateTime<Utc>>,
    pub motivo_devolucion: Option<String>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short user shape joined into assignment reads
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioResumen {
    pub id: i32,
    pub id_usuario: String,
    pub nombre: String,
    pub cargo: Option<String>,
    pub sede: Option<String>,
}

/// Short equipment shape joined into assignment reads
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EquipoResumen {
    pub id: i32,
    pub id_equipo: Option<String>,
    pub tipo_equipo: String,
    pub marca: String,
    pub modelo: String,
    pub serial: String,
    pub estado: String,
}

/// Assignment with the referenced user joined in (equipment history view)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AsignacionConUsuario {
    #[serde(flatten)]
    pub asignacion: Asignacion,
    pub usuario_detalle: UsuarioResumen,
}

/// Assignment with the referenced equipment joined in (per-user view)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AsignacionConEquipo {
    #[serde(flatten)]
    pub asignacion: Asignacion,
    pub equipo_detalle: EquipoResumen,
}

/// Assignment with both references joined in (listing / detail view)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AsignacionDetalle {
    #[serde(flatten)]
    pub asignacion: Asignacion,
    pub usuario_detalle: UsuarioResumen,
    pub equipo_detalle: EquipoResumen,
}

/// Create assignment request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrearAsignacion {
    pub usuario: i32,
    pub equipo: i32,
    #[serde(default)]
    pub accesorios: Accesorios,
    pub fecha_asignacion: Option<DateTime<Utc>>,
}

/// Finalize assignment request
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalizarAsignacion {
    pub motivo_devolucion: Option<String>,
}

/// Filterable surface of the asignaciones listing
pub const ESPEC_FILTROS_ASIGNACIONES: EspecFiltros = EspecFiltros {
    campos: &[CampoFiltro {
        nombre: "activo",
        columna: "a.activo",
        tipo: TipoCampo::Booleano,
    }],
    busqueda: &[],
    orden: &[
        ("fechaAsignacion", "a.fecha_asignacion"),
        ("fechaDevolucion", "a.fecha_devolucion"),
        ("createdAt", "a.created_at"),
    ],
    orden_defecto: "a.fecha_asignacion DESC",
};
