//! Business logic services

pub mod asignaciones;
pub mod equipos;
pub mod usuarios;

use sqlx::{Pool, Postgres};

use crate::{config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub usuarios: usuarios::UsuariosService,
    pub equipos: equipos::EquiposService,
    pub asignaciones: asignaciones::AsignacionesService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, auth_config: AuthConfig) -> Self {
        Self {
            usuarios: usuarios::UsuariosService::new(repository.clone(), auth_config),
            equipos: equipos::EquiposService::new(repository.clone()),
            asignaciones: asignaciones::AsignacionesService::new(repository.clone()),
            repository,
        }
    }

    /// Connection pool handle, for readiness probes
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.repository.pool
    }
}
