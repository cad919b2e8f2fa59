//! Assignment lifecycle service

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::asignacion::{
        Asignacion, AsignacionConEquipo, AsignacionConUsuario, AsignacionDetalle,
        CrearAsignacion, FinalizarAsignacion,
    },
    query::ApiFeatures,
    repository::Repository,
};

#[derive(Clone)]
pub struct AsignacionesService {
    repository: Repository,
}

impl AsignacionesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create an assignment: both references must exist and the equipment
    /// must not already be actively assigned. The pre-check produces the
    /// friendly message; the partial unique index is what actually closes
    /// the race under concurrent requests.
    pub async fn crear(&self, asignacion: CrearAsignacion) -> AppResult<Asignacion> {
        let usuario = self
            .repository
            .usuarios
            .get_by_id(asignacion.usuario)
            .await
            .map_err(|_| AppError::NotFound("El usuario no existe".to_string()))?;

        if !usuario.activo {
            return Err(AppError::BadRequest(
                "No se puede asignar equipo a un usuario inactivo".to_string(),
            ));
        }

        self.repository
            .equipos
            .get_by_id(asignacion.equipo)
            .await
            .map_err(|_| AppError::NotFound("El equipo no existe".to_string()))?;

        if self
            .repository
            .asignaciones
            .existe_activa_para_equipo(asignacion.equipo)
            .await?
        {
            return Err(AppError::BadRequest(
                "Este equipo ya está asignado a otro usuario".to_string(),
            ));
        }

        self.repository.asignaciones.create(&asignacion).await
    }

    /// Paginated listing with user and equipment joined in
    pub async fn obtener_todas(
        &self,
        features: &ApiFeatures,
    ) -> AppResult<(Vec<AsignacionDetalle>, i64)> {
        self.repository.asignaciones.list(features).await
    }

    /// Single assignment with both references joined in
    pub async fn obtener_detalle(&self, id: i32) -> AppResult<AsignacionDetalle> {
        self.repository.asignaciones.get_detalle(id).await
    }

    /// Finalize an assignment: stamps the return date and moves the
    /// equipment to Reposo
    pub async fn finalizar(
        &self,
        id: i32,
        datos: FinalizarAsignacion,
    ) -> AppResult<Asignacion> {
        self.repository
            .asignaciones
            .finalizar(id, datos.motivo_devolucion, Utc::now())
            .await
    }

    /// All assignments of a user, newest first
    pub async fn por_usuario(&self, usuario_id: i32) -> AppResult<Vec<AsignacionConEquipo>> {
        self.repository.asignaciones.por_usuario(usuario_id).await
    }

    /// Assignment history of an equipment item, newest first
    pub async fn historial_equipo(&self, equipo_id: i32) -> AppResult<Vec<AsignacionConUsuario>> {
        self.repository.asignaciones.historial_equipo(equipo_id).await
    }
}
