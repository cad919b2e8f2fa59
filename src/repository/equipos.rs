//! Equipos repository for database operations

use sqlx::{types::Json, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::equipo::{
        ActualizarEquipo, CrearEquipo, Equipo, EquipoRow, Estado, EstadisticaEstado,
    },
    query::ApiFeatures,
};

/// Scalar expression computing the next EQ-#### identifier from the highest
/// existing suffix. Evaluated inside the insert itself; the unique index on
/// id_equipo arbitrates concurrent winners.
const SIGUIENTE_ID_EQUIPO: &str = "(SELECT 'EQ-' || LPAD((COALESCE(MAX(CAST(SUBSTRING(id_equipo FROM 4) AS INTEGER)), 0) + 1)::TEXT, 4, '0') FROM equipos WHERE id_equipo ~ '^EQ-[0-9]{4}$')";

/// Attempts before giving up on identifier generation under contention
const MAX_REINTENTOS_ID: usize = 5;

#[derive(Clone)]
pub struct EquiposRepository {
    pool: Pool<Postgres>,
}

impl EquiposRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get equipment by store key
    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipo> {
        sqlx::query_as::<_, EquipoRow>("SELECT * FROM equipos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Equipo::from)
            .ok_or_else(|| AppError::NotFound(format!("Equipo con id {} no encontrado", id)))
    }

    /// Get equipment by its human-facing identifier
    pub async fn get_by_id_equipo(&self, id_equipo: &str) -> AppResult<Equipo> {
        sqlx::query_as::<_, EquipoRow>("SELECT * FROM equipos WHERE id_equipo = $1")
            .bind(id_equipo)
            .fetch_optional(&self.pool)
            .await?
            .map(Equipo::from)
            .ok_or_else(|| {
                AppError::NotFound(format!("Equipo {} no encontrado", id_equipo))
            })
    }

    /// Get equipment by serial (serials are stored upper-cased)
    pub async fn get_by_serial(&self, serial: &str) -> AppResult<Equipo> {
        sqlx::query_as::<_, EquipoRow>("SELECT * FROM equipos WHERE UPPER(serial) = UPPER($1)")
            .bind(serial)
            .fetch_optional(&self.pool)
            .await?
            .map(Equipo::from)
            .ok_or_else(|| {
                AppError::NotFound(format!("Equipo con serial {} no encontrado", serial))
            })
    }

    /// Check if a serial is already registered
    pub async fn serial_exists(&self, serial: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM equipos WHERE UPPER(serial) = UPPER($1) AND id != $2)",
            )
            .bind(serial)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM equipos WHERE UPPER(serial) = UPPER($1))",
            )
            .bind(serial)
            .fetch_one(&self.pool)
            .await?
        };
        Ok(exists)
    }

    /// Insert new equipment. The identifier is computed and written in the
    /// same statement; a concurrent create that lands on the same candidate
    /// loses on the unique index and is retried with the next number.
    pub async fn create(&self, equipo: &CrearEquipo) -> AppResult<Equipo> {
        for _ in 0..MAX_REINTENTOS_ID {
            match self.try_insert(equipo).await {
                Ok(row) => return Ok(row.into()),
                Err(sqlx::Error::Database(db))
                    if db.code().as_deref() == Some("23505")
                        && db.constraint() == Some("uniq_equipos_id_equipo") =>
                {
                    tracing::warn!("idEquipo en conflicto, reintentando");
                    continue;
                }
                Err(otro) => return Err(otro.into()),
            }
        }
        Err(AppError::Internal(
            "No fue posible generar un idEquipo único".to_string(),
        ))
    }

    async fn try_insert(&self, equipo: &CrearEquipo) -> Result<EquipoRow, sqlx::Error> {
        let estado = equipo.estado.unwrap_or(Estado::Bodega);
        let ubicacion = equipo
            .ubicacion
            .clone()
            .unwrap_or_else(|| "Bodega Principal".to_string());
        let (garantia_vencimiento, garantia_estado) = match &equipo.garantia {
            Some(g) => (g.fecha_vencimiento, g.estado.clone()),
            None => (None, "No aplica".to_string()),
        };

        let sql = format!(
            r#"
            INSERT INTO equipos (
                id_equipo, serial, marca, modelo, tipo_equipo, estado, ubicacion,
                observaciones, fecha_adquisicion, valor_compra, proveedor,
                garantia_vencimiento, garantia_estado, especificaciones
            )
            VALUES ({}, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
            SIGUIENTE_ID_EQUIPO
        );

        sqlx::query_as::<_, EquipoRow>(&sql)
            .bind(&equipo.serial)
            .bind(&equipo.marca)
            .bind(&equipo.modelo)
            .bind(equipo.tipo_equipo.as_str())
            .bind(estado.as_str())
            .bind(ubicacion)
            .bind(&equipo.observaciones)
            .bind(equipo.fecha_adquisicion)
            .bind(equipo.valor_compra)
            .bind(&equipo.proveedor)
            .bind(garantia_vencimiento)
            .bind(garantia_estado)
            .bind(equipo.especificaciones.clone().map(Json))
            .fetch_one(&self.pool)
            .await
    }

    /// Update equipment with the provided fields
    pub async fn update(&self, id: i32, cambios: &ActualizarEquipo) -> AppResult<Equipo> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE equipos SET updated_at = NOW()");

        if let Some(serial) = &cambios.serial {
            qb.push(", serial = ").push_bind(serial.clone());
        }
        if let Some(marca) = &cambios.marca {
            qb.push(", marca = ").push_bind(marca.clone());
        }
        if let Some(modelo) = &cambios.modelo {
            qb.push(", modelo = ").push_bind(modelo.clone());
        }
        if let Some(tipo) = cambios.tipo_equipo {
            qb.push(", tipo_equipo = ").push_bind(tipo.as_str());
        }
        if let Some(estado) = cambios.estado {
            qb.push(", estado = ").push_bind(estado.as_str());
        }
        if let Some(ubicacion) = &cambios.ubicacion {
            qb.push(", ubicacion = ").push_bind(ubicacion.clone());
        }
        if let Some(observaciones) = &cambios.observaciones {
            qb.push(", observaciones = ").push_bind(observaciones.clone());
        }
        if let Some(fecha) = cambios.fecha_adquisicion {
            qb.push(", fecha_adquisicion = ").push_bind(fecha);
        }
        if let Some(valor) = cambios.valor_compra {
            qb.push(", valor_compra = ").push_bind(valor);
        }
        if let Some(proveedor) = &cambios.proveedor {
            qb.push(", proveedor = ").push_bind(proveedor.clone());
        }
        if let Some(garantia) = &cambios.garantia {
            qb.push(", garantia_vencimiento = ")
                .push_bind(garantia.fecha_vencimiento);
            qb.push(", garantia_estado = ")
                .push_bind(garantia.estado.clone());
        }
        if let Some(especificaciones) = &cambios.especificaciones {
            qb.push(", especificaciones = ")
                .push_bind(Json(especificaciones.clone()));
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING *");

        qb.build_query_as::<EquipoRow>()
            .fetch_optional(&self.pool)
            .await?
            .map(Equipo::from)
            .ok_or_else(|| AppError::NotFound(format!("Equipo con id {} no encontrado", id)))
    }

    /// Hard delete (the service guards against active assignments first)
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM equipos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Equipo con id {} no encontrado",
                id
            )));
        }
        Ok(())
    }

    /// Paginated search; the count reuses the page's WHERE clause
    pub async fn search(&self, features: &ApiFeatures) -> AppResult<(Vec<Equipo>, i64)> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT * FROM equipos");
        features.aplicar_where(&mut qb);
        features.aplicar_orden_y_pagina(&mut qb);
        let equipos = qb
            .build_query_as::<EquipoRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Equipo::from)
            .collect();

        let mut qc: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM equipos");
        features.aplicar_where(&mut qc);
        let total: i64 = qc.build_query_scalar().fetch_one(&self.pool).await?;

        Ok((equipos, total))
    }

    /// All equipment in a given state, newest first
    pub async fn por_estado(&self, estado: Estado) -> AppResult<Vec<Equipo>> {
        let filas = sqlx::query_as::<_, EquipoRow>(
            "SELECT * FROM equipos WHERE estado = $1 ORDER BY created_at DESC",
        )
        .bind(estado.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(filas.into_iter().map(Equipo::from).collect())
    }

    /// Equipment counts grouped by state
    pub async fn stats_por_estado(&self) -> AppResult<Vec<EstadisticaEstado>> {
        let stats = sqlx::query_as::<_, EstadisticaEstado>(
            "SELECT estado, COUNT(*) AS cantidad FROM equipos GROUP BY estado ORDER BY cantidad DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Equipment currently assigned to a user
    pub async fn asignados_a_usuario(&self, usuario_id: i32) -> AppResult<Vec<Equipo>> {
        let filas = sqlx::query_as::<_, EquipoRow>(
            r#"
            SELECT e.* FROM equipos e
            JOIN asignaciones a ON a.equipo_id = e.id
            WHERE a.usuario_id = $1 AND a.activo
            ORDER BY a.fecha_asignacion DESC
            "#,
        )
        .bind(usuario_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(filas.into_iter().map(Equipo::from).collect())
    }

    /// Assign identifiers to legacy rows that lack one. Returns how many
    /// rows were migrated.
    pub async fn migrar_ids(&self) -> AppResult<u64> {
        let pendientes: Vec<i32> = sqlx::query_scalar(
            "SELECT id FROM equipos WHERE id_equipo IS NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let sql = format!(
            "UPDATE equipos SET id_equipo = {}, updated_at = NOW() WHERE id = $1",
            SIGUIENTE_ID_EQUIPO
        );

        let mut migrados = 0;
        for id in pendientes {
            sqlx::query(&sql).bind(id).execute(&self.pool).await?;
            migrados += 1;
        }
        Ok(migrados)
    }
}
