//! Equipment management service

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        asignacion::AsignacionConUsuario,
        equipo::{ActualizarEquipo, CrearEquipo, Equipo, Estado, EstadisticaEstado},
    },
    query::ApiFeatures,
    repository::Repository,
};

/// Warranty sub-states accepted from clients
const ESTADOS_GARANTIA: &[&str] = &["Vigente", "Vencida", "No aplica"];

/// States a client may list equipment by through /equipos/estado/:estado
const ESTADOS_CONSULTABLES: &[Estado] = &[Estado::Bodega, Estado::Reposo, Estado::Alistamiento];

#[derive(Clone)]
pub struct EquiposService {
    repository: Repository,
}

impl EquiposService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Resolve an equipment reference that may be either the numeric store
    /// key or the human-facing EQ-#### identifier
    pub async fn get_flexible(&self, referencia: &str) -> AppResult<Equipo> {
        if referencia.starts_with("EQ-") {
            return self.repository.equipos.get_by_id_equipo(referencia).await;
        }
        let id: i32 = referencia
            .parse()
            .map_err(|_| AppError::BadRequest("ID de equipo no válido".to_string()))?;
        self.repository.equipos.get_by_id(id).await
    }

    /// Get equipment by serial
    pub async fn get_by_serial(&self, serial: &str) -> AppResult<Equipo> {
        self.repository.equipos.get_by_serial(serial).await
    }

    /// Paginated equipment search
    pub async fn search(&self, features: &ApiFeatures) -> AppResult<(Vec<Equipo>, i64)> {
        self.repository.equipos.search(features).await
    }

    /// Create new equipment; the identifier is generated at insert time
    pub async fn create(&self, mut equipo: CrearEquipo) -> AppResult<Equipo> {
        equipo.serial = equipo.serial.trim().to_uppercase();
        Self::validar_datos(
            equipo.fecha_adquisicion,
            equipo.garantia.as_ref().map(|g| g.estado.as_str()),
            equipo.valor_compra,
        )?;

        if self
            .repository
            .equipos
            .serial_exists(&equipo.serial, None)
            .await?
        {
            return Err(AppError::Duplicate("El serial ya está registrado".to_string()));
        }

        self.repository.equipos.create(&equipo).await
    }

    /// Update equipment, resolved by flexible reference
    pub async fn update(&self, referencia: &str, mut cambios: ActualizarEquipo) -> AppResult<Equipo> {
        let actual = self.get_flexible(referencia).await?;

        Self::validar_datos(
            cambios.fecha_adquisicion,
            cambios.garantia.as_ref().map(|g| g.estado.as_str()),
            cambios.valor_compra,
        )?;

        if let Some(serial) = &cambios.serial {
            let serial = serial.trim().to_uppercase();
            if self
                .repository
                .equipos
                .serial_exists(&serial, Some(actual.id))
                .await?
            {
                return Err(AppError::Duplicate("El serial ya está registrado".to_string()));
            }
            cambios.serial = Some(serial);
        }

        self.repository.equipos.update(actual.id, &cambios).await
    }

    /// Hard-delete equipment; blocked while an assignment is still open
    pub async fn delete(&self, referencia: &str) -> AppResult<()> {
        let equipo = self.get_flexible(referencia).await?;

        if self
            .repository
            .asignaciones
            .existe_sin_devolucion_para_equipo(equipo.id)
            .await?
        {
            return Err(AppError::BadRequest(
                "No se puede eliminar el equipo mientras tenga una asignación activa".to_string(),
            ));
        }

        self.repository.equipos.delete(equipo.id).await
    }

    /// Equipment in one of the consultable states
    pub async fn por_estado(&self, estado: &str) -> AppResult<Vec<Equipo>> {
        let estado: Estado = estado
            .parse()
            .map_err(|_| AppError::BadRequest("Estado no válido".to_string()))?;
        if !ESTADOS_CONSULTABLES.contains(&estado) {
            return Err(AppError::BadRequest("Estado no válido".to_string()));
        }
        self.repository.equipos.por_estado(estado).await
    }

    /// Equipment counts grouped by state
    pub async fn stats_por_estado(&self) -> AppResult<Vec<EstadisticaEstado>> {
        self.repository.equipos.stats_por_estado().await
    }

    /// Assignment history of an equipment item
    pub async fn historial(&self, referencia: &str) -> AppResult<Vec<AsignacionConUsuario>> {
        let equipo = self.get_flexible(referencia).await?;
        self.repository.asignaciones.historial_equipo(equipo.id).await
    }

    /// Backfill identifiers for legacy rows without one
    pub async fn migrar_ids(&self) -> AppResult<u64> {
        self.repository.equipos.migrar_ids().await
    }

    fn validar_datos(
        fecha_adquisicion: Option<chrono::NaiveDate>,
        garantia_estado: Option<&str>,
        valor_compra: Option<rust_decimal::Decimal>,
    ) -> AppResult<()> {
        let mut errores = Vec::new();

        if let Some(fecha) = fecha_adquisicion {
            if fecha > Utc::now().date_naive() {
                errores.push("La fecha de adquisición no puede ser futura".to_string());
            }
        }
        if let Some(estado) = garantia_estado {
            if !ESTADOS_GARANTIA.contains(&estado) {
                errores.push(format!("Estado de garantía no válido: {}", estado));
            }
        }
        if let Some(valor) = valor_compra {
            if valor.is_sign_negative() {
                errores.push("El valor de compra no puede ser negativo".to_string());
            }
        }

        if errores.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errores))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn rechaza_fecha_de_adquisicion_futura() {
        let futura = Utc::now().date_naive() + Duration::days(2);
        assert!(EquiposService::validar_datos(Some(futura), None, None).is_err());
        let pasada = Utc::now().date_naive() - Duration::days(2);
        assert!(EquiposService::validar_datos(Some(pasada), None, None).is_ok());
    }

    #[test]
    fn rechaza_estado_de_garantia_desconocido() {
        assert!(EquiposService::validar_datos(None, Some("Vigente"), None).is_ok());
        assert!(EquiposService::validar_datos(None, Some("Eterna"), None).is_err());
    }

    #[test]
    fn rechaza_valor_de_compra_negativo() {
        use rust_decimal::Decimal;
        assert!(EquiposService::validar_datos(None, None, Some(Decimal::new(-1, 0))).is_err());
        assert!(EquiposService::validar_datos(None, None, Some(Decimal::new(100, 0))).is_ok());
    }
}
