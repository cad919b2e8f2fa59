//! Equipo model and related types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use validator::Validate;

use crate::query::{CampoFiltro, EspecFiltros, TipoCampo};

/// Equipment categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TipoEquipo {
    Laptop,
    Desktop,
    Monitor,
    Impresora,
    Telefono,
    Tablet,
    Servidor,
    Router,
    Switch,
    Otro,
}

impl TipoEquipo {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoEquipo::Laptop => "Laptop",
            TipoEquipo::Desktop => "Desktop",
            TipoEquipo::Monitor => "Monitor",
            TipoEquipo::Impresora => "Impresora",
            TipoEquipo::Telefono => "Telefono",
            TipoEquipo::Tablet => "Tablet",
            TipoEquipo::Servidor => "Servidor",
            TipoEquipo::Router => "Router",
            TipoEquipo::Switch => "Switch",
            TipoEquipo::Otro => "Otro",
        }
    }
}

impl std::fmt::Display for TipoEquipo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TipoEquipo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Laptop" => Ok(TipoEquipo::Laptop),
            "Desktop" => Ok(TipoEquipo::Desktop),
            "Monitor" => Ok(TipoEquipo::Monitor),
            "Impresora" => Ok(TipoEquipo::Impresora),
            "Telefono" => Ok(TipoEquipo::Telefono),
            "Tablet" => Ok(TipoEquipo::Tablet),
            "Servidor" => Ok(TipoEquipo::Servidor),
            "Router" => Ok(TipoEquipo::Router),
            "Switch" => Ok(TipoEquipo::Switch),
            "Otro" => Ok(TipoEquipo::Otro),
            _ => Err(format!("Tipo de equipo no válido: {}", s)),
        }
    }
}

/// Equipment lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Estado {
    Bodega,
    Asignado,
    Reposo,
    Alistamiento,
    Mantenimiento,
    Baja,
}

impl Estado {
    pub fn as_str(&self) -> &'static str {
        match self {
            Estado::Bodega => "Bodega",
            Estado::Asignado => "Asignado",
            Estado::Reposo => "Reposo",
            Estado::Alistamiento => "Alistamiento",
            Estado::Mantenimiento => "Mantenimiento",
            Estado::Baja => "Baja",
        }
    }

    /// States from which equipment can be handed out
    pub fn disponible(&self) -> bool {
        matches!(self, Estado::Bodega | Estado::Reposo | Estado::Alistamiento)
    }
}

impl std::fmt::Display for Estado {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Estado {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bodega" => Ok(Estado::Bodega),
            "Asignado" => Ok(Estado::Asignado),
            "Reposo" => Ok(Estado::Reposo),
            "Alistamiento" => Ok(Estado::Alistamiento),
            "Mantenimiento" => Ok(Estado::Mantenimiento),
            "Baja" => Ok(Estado::Baja),
            _ => Err(format!("Estado no válido: {}", s)),
        }
    }
}

/// Warranty block
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Garantia {
    pub fecha_vencimiento: Option<NaiveDate>,
    #[serde(default = "garantia_estado_defecto")]
    pub estado: String,
}

fn garantia_estado_defecto() -> String {
    "No aplica".to_string()
}

/// Technical specifications, stored as JSONB
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Especificaciones {
    pub procesador: Option<String>,
    pub memoria: Option<String>,
    pub almacenamiento: Option<String>,
    pub sistema_operativo: Option<String>,
    pub otros: Option<String>,
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct EquipoRow {
    id: i32,
    id_equipo: Option<String>,
    serial: String,
    marca: String,
    modelo: String,
    tipo_equipo: String,
    estado: String,
    ubicacion: String,
    observaciones: Option<String>,
    fecha_adquisicion: Option<NaiveDate>,
    valor_compra: Option<Decimal>,
    proveedor: Option<String>,
    garantia_vencimiento: Option<NaiveDate>,
    garantia_estado: String,
    especificaciones: Option<Json<Especificaciones>>,
    ultima_asignacion: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EquipoRow> for Equipo {
    fn from(row: EquipoRow) -> Self {
        let hoy = Utc::now().date_naive();
        // Read-side derived fields, computed instead of stored
        let edad_en_dias = row
            .fecha_adquisicion
            .map(|fecha| (hoy - fecha).num_days());
        let estado_garantia = match row.garantia_vencimiento {
            Some(vencimiento) if vencimiento > hoy => "Vigente".to_string(),
            Some(_) => "Vencida".to_string(),
            None => "Sin información".to_string(),
        };

        Equipo {
            id: row.id,
            id_equipo: row.id_equipo,
            serial: row.serial,
            marca: row.marca,
            modelo: row.modelo,
            tipo_equipo: row.tipo_equipo.parse().unwrap_or(TipoEquipo::Otro),
            estado: row.estado.parse().unwrap_or(Estado::Bodega),
            ubicacion: row.ubicacion,
            observaciones: row.observaciones,
            fecha_adquisicion: row.fecha_adquisicion,
            valor_compra: row.valor_compra,
            proveedor: row.proveedor,
            garantia: Garantia {
                fecha_vencimiento: row.garantia_vencimiento,
                estado: row.garantia_estado,
            },
            especificaciones: row.especificaciones.map(|Json(e)| e),
            ultima_asignacion: row.ultima_asignacion,
            edad_en_dias,
            estado_garantia,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Full equipment model
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Equipo {
    pub id: i32,
    /// Sequential human-facing identifier (EQ-0001, EQ-0002, ...)
    pub id_equipo: Option<String>,
    pub serial: String,
    pub marca: String,
    pub modelo: String,
    pub tipo_equipo: TipoEquipo,
    pub estado: Estado,
    pub ubicacion: String,
    pub observaciones: Option<String>,
    pub fecha_adquisicion: Option<NaiveDate>,
    pub valor_compra: Option<Decimal>,
    pub proveedor: Option<String>,
    pub garantia: Garantia,
    pub especificaciones: Option<Especificaciones>,
    pub ultima_asignacion: Option<i32>,
    /// Days since acquisition, when known
    pub edad_en_dias: Option<i64>,
    /// Derived from the warranty expiry date
    pub estado_garantia: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrearEquipo {
    #[validate(length(min = 3, message = "El serial debe tener al menos 3 caracteres"))]
    pub serial: String,
    #[validate(length(min = 1, message = "La marca es requerida"))]
    pub marca: String,
    #[validate(length(min = 1, message = "El modelo es requerido"))]
    pub modelo: String,
    pub tipo_equipo: TipoEquipo,
    pub estado: Option<Estado>,
    pub ubicacion: Option<String>,
    pub observaciones: Option<String>,
    pub fecha_adquisicion: Option<NaiveDate>,
    pub valor_compra: Option<Decimal>,
    pub proveedor: Option<String>,
    pub garantia: Option<Garantia>,
    pub especificaciones: Option<Especificaciones>,
}

/// Update equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActualizarEquipo {
    #[validate(length(min = 3, message = "El serial debe tener al menos 3 caracteres"))]
    pub serial: Option<String>,
    pub marca: Option<String>,
    pub modelo: Option<String>,
    pub tipo_equipo: Option<TipoEquipo>,
    pub estado: Option<Estado>,
    pub ubicacion: Option<String>,
    pub observaciones: Option<String>,
    pub fecha_adquisicion: Option<NaiveDate>,
    pub valor_compra: Option<Decimal>,
    pub proveedor: Option<String>,
    pub garantia: Option<Garantia>,
    pub especificaciones: Option<Especificaciones>,
}

/// Per-state equipment count
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct EstadisticaEstado {
    pub estado: String,
    pub cantidad: i64,
}

/// Filterable surface of the equipos listing
pub const ESPEC_FILTROS_EQUIPOS: EspecFiltros = EspecFiltros {
    campos: &[
        CampoFiltro {
            nombre: "estado",
            columna: "estado",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "tipoEquipo",
            columna: "tipo_equipo",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "marca",
            columna: "marca",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "modelo",
            columna: "modelo",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "serial",
            columna: "serial",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "ubicacion",
            columna: "ubicacion",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "proveedor",
            columna: "proveedor",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "idEquipo",
            columna: "id_equipo",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "valorCompra",
            columna: "valor_compra",
            tipo: TipoCampo::Decimal,
        },
        CampoFiltro {
            nombre: "fechaAdquisicion",
            columna: "fecha_adquisicion",
            tipo: TipoCampo::Fecha,
        },
    ],
    busqueda: &["id_equipo", "serial", "marca", "modelo", "tipo_equipo", "estado"],
    orden: &[
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
        ("idEquipo", "id_equipo"),
        ("serial", "serial"),
        ("marca", "marca"),
        ("modelo", "modelo"),
        ("estado", "estado"),
        ("valorCompra", "valor_compra"),
    ],
    orden_defecto: "created_at DESC",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estados_disponibles() {
        assert!(Estado::Bodega.disponible());
        assert!(Estado::Reposo.disponible());
        assert!(Estado::Alistamiento.disponible());
        assert!(!Estado::Asignado.disponible());
        assert!(!Estado::Mantenimiento.disponible());
        assert!(!Estado::Baja.disponible());
    }

    #[test]
    fn estado_serializa_en_espanol() {
        assert_eq!(
            serde_json::to_value(Estado::Bodega).unwrap(),
            serde_json::json!("Bodega")
        );
        assert_eq!("Mantenimiento".parse::<Estado>().unwrap(), Estado::Mantenimiento);
        assert!("bodega".parse::<Estado>().is_err());
    }
}
