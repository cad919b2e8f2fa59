//! Asignaciones repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{types::Json, Pool, Postgres, QueryBuilder, Row};

use crate::{
    error::{AppError, AppResult},
    models::asignacion::{
        Accesorios, Asignacion, AsignacionConEquipo, AsignacionConUsuario, AsignacionDetalle,
        AsignacionRow, CrearAsignacion, EquipoResumen, UsuarioResumen,
    },
    query::ApiFeatures,
};

/// Joined columns fetched for assignment detail shapes
const COLUMNAS_DETALLE: &str = r#"
    a.id, a.usuario_id, a.equipo_id, a.accesorios, a.fecha_asignacion,
    a.fecha_devolucion, a.motivo_devolucion, a.activo, a.created_at, a.updated_at,
    u.id AS u_id, u.id_usuario AS u_id_usuario, u.nombre AS u_nombre,
    u.cargo AS u_cargo, u.sede AS u_sede,
    e.id AS e_id, e.id_equipo AS e_id_equipo, e.tipo_equipo AS e_tipo_equipo,
    e.marca AS e_marca, e.modelo AS e_modelo, e.serial AS e_serial, e.estado AS e_estado
"#;

fn asignacion_de_fila(row: &sqlx::postgres::PgRow) -> Asignacion {
    let accesorios: Json<Accesorios> = row.get("accesorios");
    Asignacion {
        id: row.get("id"),
        usuario: row.get("usuario_id"),
        equipo: row.get("equipo_id"),
        accesorios: accesorios.0,
        fecha_asignacion: row.get("fecha_asignacion"),
        fecha_devolucion: row.get("fecha_devolucion"),
        motivo_devolucion: row.get("motivo_devolucion"),
        activo: row.get("activo"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn usuario_de_fila(row: &sqlx::postgres::PgRow) -> UsuarioResumen {
    UsuarioResumen {
        id: row.get("u_id"),
        id_usuario: row.get("u_id_usuario"),
        nombre: row.get("u_nombre"),
        cargo: row.get("u_cargo"),
        sede: row.get("u_sede"),
    }
}

fn equipo_de_fila(row: &sqlx::postgres::PgRow) -> EquipoResumen {
    EquipoResumen {
        id: row.get("e_id"),
        id_equipo: row.get("e_id_equipo"),
        tipo_equipo: row.get("e_tipo_equipo"),
        marca: row.get("e_marca"),
        modelo: row.get("e_modelo"),
        serial: row.get("e_serial"),
        estado: row.get("e_estado"),
    }
}

#[derive(Clone)]
pub struct AsignacionesRepository {
    pool: Pool<Postgres>,
}

impl AsignacionesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get assignment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Asignacion> {
        sqlx::query_as::<_, AsignacionRow>("SELECT * FROM asignaciones WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Asignacion::from)
            .ok_or_else(|| {
                AppError::NotFound(format!("Asignación con id {} no encontrada", id))
            })
    }

    /// Get assignment with both references joined in
    pub async fn get_detalle(&self, id: i32) -> AppResult<AsignacionDetalle> {
        let sql = format!(
            r#"
            SELECT {} FROM asignaciones a
            JOIN usuarios u ON u.id = a.usuario_id
            JOIN equipos e ON e.id = a.equipo_id
            WHERE a.id = $1
            "#,
            COLUMNAS_DETALLE
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Asignación con id {} no encontrada", id))
            })?;

        Ok(AsignacionDetalle {
            asignacion: asignacion_de_fila(&row),
            usuario_detalle: usuario_de_fila(&row),
            equipo_detalle: equipo_de_fila(&row),
        })
    }

    /// Paginated listing with both references joined in
    pub async fn list(&self, features: &ApiFeatures) -> AppResult<(Vec<AsignacionDetalle>, i64)> {
        let base = format!(
            r#"
            SELECT {} FROM asignaciones a
            JOIN usuarios u ON u.id = a.usuario_id
            JOIN equipos e ON e.id = a.equipo_id
            "#,
            COLUMNAS_DETALLE
        );
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(base);
        features.aplicar_where(&mut qb);
        features.aplicar_orden_y_pagina(&mut qb);

        let filas = qb.build().fetch_all(&self.pool).await?;
        let asignaciones = filas
            .iter()
            .map(|row| AsignacionDetalle {
                asignacion: asignacion_de_fila(row),
                usuario_detalle: usuario_de_fila(row),
                equipo_detalle: equipo_de_fila(row),
            })
            .collect();

        let mut qc: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM asignaciones a");
        features.aplicar_where(&mut qc);
        let total: i64 = qc.build_query_scalar().fetch_one(&self.pool).await?;

        Ok((asignaciones, total))
    }

    /// Whether the equipment currently has an active assignment
    pub async fn existe_activa_para_equipo(&self, equipo_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM asignaciones WHERE equipo_id = $1 AND activo)",
        )
        .bind(equipo_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Whether the equipment has any assignment that was never returned
    pub async fn existe_sin_devolucion_para_equipo(&self, equipo_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM asignaciones WHERE equipo_id = $1 AND fecha_devolucion IS NULL)",
        )
        .bind(equipo_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Whether the user currently holds an active assignment
    pub async fn usuario_tiene_activa(&self, usuario_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM asignaciones WHERE usuario_id = $1 AND activo)",
        )
        .bind(usuario_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create an assignment and move the equipment to Asignado, atomically.
    /// The partial unique index on (equipo_id) WHERE activo turns a lost race
    /// into a constraint violation instead of a double assignment.
    pub async fn create(&self, asignacion: &CrearAsignacion) -> AppResult<Asignacion> {
        let mut tx = self.pool.begin().await?;

        let fecha = asignacion.fecha_asignacion.unwrap_or_else(Utc::now);

        let resultado = sqlx::query_as::<_, AsignacionRow>(
            r#"
            INSERT INTO asignaciones (usuario_id, equipo_id, accesorios, fecha_asignacion)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(asignacion.usuario)
        .bind(asignacion.equipo)
        .bind(Json(asignacion.accesorios.clone()))
        .bind(fecha)
        .fetch_one(&mut *tx)
        .await;

        let creada: Asignacion = match resultado {
            Ok(fila) => fila.into(),
            Err(sqlx::Error::Database(db))
                if db.code().as_deref() == Some("23505")
                    && db.constraint() == Some("uniq_asignacion_activa") =>
            {
                return Err(AppError::BadRequest(
                    "Este equipo ya está asignado a otro usuario".to_string(),
                ));
            }
            Err(otro) => return Err(otro.into()),
        };

        sqlx::query(
            "UPDATE equipos SET estado = 'Asignado', ultima_asignacion = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(creada.id)
        .bind(asignacion.equipo)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(creada)
    }

    /// Finalize an assignment and move the equipment to Reposo, atomically
    pub async fn finalizar(
        &self,
        id: i32,
        motivo: Option<String>,
        fecha_devolucion: DateTime<Utc>,
    ) -> AppResult<Asignacion> {
        let mut tx = self.pool.begin().await?;

        let actual = sqlx::query_as::<_, AsignacionRow>(
            "SELECT * FROM asignaciones WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Asignación con id {} no encontrada", id)))?;

        let actual: Asignacion = actual.into();
        if !actual.activo {
            return Err(AppError::BadRequest(
                "La asignación ya fue finalizada".to_string(),
            ));
        }

        let fila = sqlx::query_as::<_, AsignacionRow>(
            r#"
            UPDATE asignaciones
            SET activo = FALSE, fecha_devolucion = $1, motivo_devolucion = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(fecha_devolucion)
        .bind(motivo)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE equipos SET estado = 'Reposo', updated_at = NOW() WHERE id = $1")
            .bind(actual.equipo)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(fila.into())
    }

    /// All assignments of a user, newest first, equipment joined in
    pub async fn por_usuario(&self, usuario_id: i32) -> AppResult<Vec<AsignacionConEquipo>> {
        let sql = format!(
            r#"
            SELECT {} FROM asignaciones a
            JOIN usuarios u ON u.id = a.usuario_id
            JOIN equipos e ON e.id = a.equipo_id
            WHERE a.usuario_id = $1
            ORDER BY a.fecha_asignacion DESC
            "#,
            COLUMNAS_DETALLE
        );

        let filas = sqlx::query(&sql)
            .bind(usuario_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(filas
            .iter()
            .map(|row| AsignacionConEquipo {
                asignacion: asignacion_de_fila(row),
                equipo_detalle: equipo_de_fila(row),
            })
            .collect())
    }

    /// Assignment history of an equipment item, newest first, user joined in
    pub async fn historial_equipo(&self, equipo_id: i32) -> AppResult<Vec<AsignacionConUsuario>> {
        let sql = format!(
            r#"
            SELECT {} FROM asignaciones a
            JOIN usuarios u ON u.id = a.usuario_id
            JOIN equipos e ON e.id = a.equipo_id
            WHERE a.equipo_id = $1
            ORDER BY a.fecha_asignacion DESC
            "#,
            COLUMNAS_DETALLE
        );

        let filas = sqlx::query(&sql)
            .bind(equipo_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(filas
            .iter()
            .map(|row| AsignacionConUsuario {
                asignacion: asignacion_de_fila(row),
                usuario_detalle: usuario_de_fila(row),
            })
            .collect())
    }
}
