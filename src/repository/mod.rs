//! Repository layer for database operations

pub mod asignaciones;
pub mod equipos;
pub mod usuarios;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub usuarios: usuarios::UsuariosRepository,
    pub equipos: equipos::EquiposRepository,
    pub asignaciones: asignaciones::AsignacionesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            usuarios: usuarios::UsuariosRepository::new(pool.clone()),
            equipos: equipos::EquiposRepository::new(pool.clone()),
            asignaciones: asignaciones::AsignacionesRepository::new(pool.clone()),
            pool,
        }
    }
}
