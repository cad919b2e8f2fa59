//! Usuarios repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::usuario::{
        ActualizarUsuario, CrearUsuario, PorRol, Usuario, UsuarioRow, UsuarioStats,
    },
    query::ApiFeatures,
};

#[derive(Clone)]
pub struct UsuariosRepository {
    pool: Pool<Postgres>,
}

impl UsuariosRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Usuario> {
        sqlx::query_as::<_, UsuarioRow>("SELECT * FROM usuarios WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Usuario::from)
            .ok_or_else(|| AppError::NotFound(format!("Usuario con id {} no encontrado", id)))
    }

    /// Get user by email, case-insensitive
    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<Usuario>> {
        let row = sqlx::query_as::<_, UsuarioRow>(
            "SELECT * FROM usuarios WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Usuario::from))
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM usuarios WHERE LOWER(email) = LOWER($1) AND id != $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM usuarios WHERE LOWER(email) = LOWER($1))",
            )
            .bind(email)
            .fetch_one(&self.pool)
            .await?
        };
        Ok(exists)
    }

    /// Check if the human-facing id already exists
    pub async fn id_usuario_exists(&self, id_usuario: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM usuarios WHERE id_usuario = $1)")
                .bind(id_usuario)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Insert a new user. `nombre` and `email` arrive already normalized and
    /// `password_hash` already hashed (explicit pipeline steps in the service).
    pub async fn create(&self, usuario: &CrearUsuario, password_hash: &str) -> AppResult<Usuario> {
        let rol = usuario
            .rol
            .map(|r| r.as_str())
            .unwrap_or("user");

        let row = sqlx::query_as::<_, UsuarioRow>(
            r#"
            INSERT INTO usuarios (id_usuario, nombre, email, password, cargo, sede, gerencia, rol)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&usuario.id_usuario)
        .bind(&usuario.nombre)
        .bind(&usuario.email)
        .bind(password_hash)
        .bind(&usuario.cargo)
        .bind(&usuario.sede)
        .bind(&usuario.gerencia)
        .bind(rol)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Update an existing user with the provided fields
    pub async fn update(
        &self,
        id: i32,
        cambios: &ActualizarUsuario,
        password_hash: Option<String>,
    ) -> AppResult<Usuario> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE usuarios SET updated_at = NOW()");

        if let Some(nombre) = &cambios.nombre {
            qb.push(", nombre = ").push_bind(nombre.clone());
        }
        if let Some(email) = &cambios.email {
            qb.push(", email = ").push_bind(email.clone());
        }
        if let Some(hash) = password_hash {
            qb.push(", password = ").push_bind(hash);
        }
        if let Some(cargo) = &cambios.cargo {
            qb.push(", cargo = ").push_bind(cargo.clone());
        }
        if let Some(sede) = &cambios.sede {
            qb.push(", sede = ").push_bind(sede.clone());
        }
        if let Some(gerencia) = &cambios.gerencia {
            qb.push(", gerencia = ").push_bind(gerencia.clone());
        }
        if let Some(rol) = cambios.rol {
            qb.push(", rol = ").push_bind(rol.as_str());
        }
        if let Some(activo) = cambios.activo {
            qb.push(", activo = ").push_bind(activo);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING *");

        qb.build_query_as::<UsuarioRow>()
            .fetch_optional(&self.pool)
            .await?
            .map(Usuario::from)
            .ok_or_else(|| AppError::NotFound(format!("Usuario con id {} no encontrado", id)))
    }

    /// Stamp the last-access timestamp
    pub async fn stamp_ultimo_acceso(&self, id: i32) -> AppResult<()> {
        sqlx::query("UPDATE usuarios SET ultimo_acceso = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Soft delete: flip the activo flag
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE usuarios SET activo = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Usuario con id {} no encontrado",
                id
            )));
        }
        Ok(())
    }

    /// Reactivate a soft-deleted user
    pub async fn reactivate(&self, id: i32) -> AppResult<Usuario> {
        sqlx::query_as::<_, UsuarioRow>(
            "UPDATE usuarios SET activo = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Usuario::from)
        .ok_or_else(|| AppError::NotFound(format!("Usuario con id {} no encontrado", id)))
    }

    /// Permanently remove a user (their assignment history goes with them)
    pub async fn hard_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM usuarios WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Usuario con id {} no encontrado",
                id
            )));
        }
        Ok(())
    }

    /// Paginated search; the count reuses the page's WHERE clause
    pub async fn search(&self, features: &ApiFeatures) -> AppResult<(Vec<Usuario>, i64)> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT * FROM usuarios");
        features.aplicar_where(&mut qb);
        features.aplicar_orden_y_pagina(&mut qb);
        let usuarios = qb
            .build_query_as::<UsuarioRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Usuario::from)
            .collect();

        let mut qc: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM usuarios");
        features.aplicar_where(&mut qc);
        let total: i64 = qc.build_query_scalar().fetch_one(&self.pool).await?;

        Ok((usuarios, total))
    }

    /// Aggregate user counts
    pub async fn stats(&self) -> AppResult<UsuarioStats> {
        let row: (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE activo),
                   COUNT(*) FILTER (WHERE NOT activo),
                   COUNT(*) FILTER (WHERE rol = 'admin'),
                   COUNT(*) FILTER (WHERE rol = 'tecnico')
            FROM usuarios
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let (total, activos, inactivos, admins, tecnicos) = row;
        let porcentaje_activos = if total > 0 {
            let porcentaje = activos as f64 * 100.0 / total as f64;
            (porcentaje * 100.0).round() / 100.0
        } else {
            0.0
        };

        Ok(UsuarioStats {
            total,
            activos,
            inactivos,
            por_rol: PorRol {
                admin: admins,
                tecnico: tecnicos,
                user: total - admins - tecnicos,
            },
            porcentaje_activos,
        })
    }
}
