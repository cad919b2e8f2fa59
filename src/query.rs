//! Query-string driven filtering, sorting, field limiting and pagination.
//!
//! Translates the raw query-string map of a list endpoint into a WHERE
//! clause, an ORDER BY clause and LIMIT/OFFSET values. The WHERE clause is
//! applied identically to the page query and the count query, so pagination
//! metadata always matches the filter that produced the page.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use crate::error::{AppError, AppResult};

/// Default page size when no limit parameter is sent
pub const LIMITE_DEFECTO: i64 = 10;
/// Uniform upper bound on page size
pub const LIMITE_MAXIMO: i64 = 100;

/// Keys consumed by pagination/sorting/projection/search rather than filtering
const CAMPOS_RESERVADOS: &[&str] = &[
    "pagina", "page", "limite", "limit", "sort", "fields", "search", "buscar", "q",
];

/// Value type a filterable field parses into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipoCampo {
    Texto,
    Entero,
    Decimal,
    Fecha,
    Booleano,
}

/// One filterable field: JSON name, backing column, value type
pub struct CampoFiltro {
    pub nombre: &'static str,
    pub columna: &'static str,
    pub tipo: TipoCampo,
}

/// Per-entity specification handed to the builder
pub struct EspecFiltros {
    /// Fields accepted as filter parameters
    pub campos: &'static [CampoFiltro],
    /// Columns OR-matched by the `search` parameter
    pub busqueda: &'static [&'static str],
    /// Sortable fields: JSON name to column
    pub orden: &'static [(&'static str, &'static str)],
    /// Default ORDER BY clause body
    pub orden_defecto: &'static str,
}

/// Parsed filter value, bound positionally into the query
#[derive(Debug, Clone)]
pub enum Valor {
    Texto(String),
    Entero(i64),
    Decimal(Decimal),
    Fecha(NaiveDate),
    Booleano(bool),
}

#[derive(Debug, Clone)]
struct Condicion {
    columna: &'static str,
    operador: &'static str,
    valor: Valor,
}

/// Query features extracted from a request's query string
pub struct ApiFeatures {
    condiciones: Vec<Condicion>,
    busqueda: Option<(String, &'static [&'static str])>,
    orden: String,
    campos: Option<Vec<String>>,
    pagina: i64,
    limite: i64,
}

impl ApiFeatures {
    /// Parse the query-string map against an entity specification.
    /// Order of concerns is fixed: filter, sort, field limiting, pagination.
    pub fn desde_query(
        params: &HashMap<String, String>,
        espec: &EspecFiltros,
    ) -> AppResult<Self> {
        let mut condiciones = Vec::new();

        for (clave, valor) in params {
            let clave = clave.as_str();
            if CAMPOS_RESERVADOS.contains(&clave) {
                continue;
            }

            let (nombre, operador) = separar_operador(clave)?;
            let campo = espec
                .campos
                .iter()
                .find(|c| c.nombre == nombre)
                .ok_or_else(|| {
                    AppError::validation(format!("Parámetro de filtro no válido: {}", nombre))
                })?;

            condiciones.push(Condicion {
                columna: campo.columna,
                operador,
                valor: parsear_valor(campo, valor)?,
            });
        }

        // Deterministic clause order regardless of map iteration
        condiciones.sort_by(|a, b| (a.columna, a.operador).cmp(&(b.columna, b.operador)));

        let busqueda = params
            .get("search")
            .or_else(|| params.get("buscar"))
            .or_else(|| params.get("q"))
            .filter(|s| !s.trim().is_empty())
            .filter(|_| !espec.busqueda.is_empty())
            .map(|s| (s.trim().to_string(), espec.busqueda));

        let orden = match params.get("sort").filter(|s| !s.trim().is_empty()) {
            Some(lista) => parsear_orden(lista, espec)?,
            None => espec.orden_defecto.to_string(),
        };

        let campos = params
            .get("fields")
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.split(',').map(|c| c.trim().to_string()).collect());

        // Spanish spelling wins when both are present
        let pagina = parametro_numerico(params, "pagina", "page", 1)?.max(1);
        let limite = parametro_numerico(params, "limite", "limit", LIMITE_DEFECTO)?
            .clamp(1, LIMITE_MAXIMO);

        Ok(Self {
            condiciones,
            busqueda,
            orden,
            campos,
            pagina,
            limite,
        })
    }

    /// Append a fixed equality condition (repository-side filters such as
    /// "only active rows")
    pub fn con_condicion(mut self, columna: &'static str, valor: Valor) -> Self {
        self.condiciones.push(Condicion {
            columna,
            operador: "=",
            valor,
        });
        self
    }

    /// Push the WHERE clause (conditions plus search block) onto a builder.
    /// Both the page query and the count query call this with the same
    /// features, which is what keeps their filters identical.
    pub fn aplicar_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut primero = true;

        for condicion in &self.condiciones {
            separador(qb, &mut primero);
            qb.push(condicion.columna);
            qb.push(" ");
            qb.push(condicion.operador);
            qb.push(" ");
            match &condicion.valor {
                Valor::Texto(v) => qb.push_bind(v.clone()),
                Valor::Entero(v) => qb.push_bind(*v),
                Valor::Decimal(v) => qb.push_bind(*v),
                Valor::Fecha(v) => qb.push_bind(*v),
                Valor::Booleano(v) => qb.push_bind(*v),
            };
        }

        if let Some((termino, columnas)) = &self.busqueda {
            separador(qb, &mut primero);
            qb.push("(");
            for (i, columna) in columnas.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(*columna);
                qb.push(" ILIKE ");
                qb.push_bind(format!("%{}%", termino));
            }
            qb.push(")");
        }
    }

    /// Push ORDER BY / LIMIT / OFFSET onto the page query
    pub fn aplicar_orden_y_pagina(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" ORDER BY ");
        qb.push(&self.orden);
        qb.push(" LIMIT ");
        qb.push_bind(self.limite);
        qb.push(" OFFSET ");
        qb.push_bind(self.offset());
    }

    pub fn pagina(&self) -> i64 {
        self.pagina
    }

    pub fn limite(&self) -> i64 {
        self.limite
    }

    pub fn offset(&self) -> i64 {
        (self.pagina - 1) * self.limite
    }

    /// Read-side field limiting: retain only the requested attributes of a
    /// serialized row. Without a `fields` parameter the value is untouched.
    pub fn proyectar(&self, valor: Value) -> Value {
        let Some(campos) = &self.campos else {
            return valor;
        };
        match valor {
            Value::Object(mapa) => Value::Object(
                mapa.into_iter()
                    .filter(|(k, _)| campos.iter().any(|c| c == k))
                    .collect(),
            ),
            otro => otro,
        }
    }
}

fn separador(qb: &mut QueryBuilder<'_, Postgres>, primero: &mut bool) {
    if *primero {
        qb.push(" WHERE ");
        *primero = false;
    } else {
        qb.push(" AND ");
    }
}

/// Split `nombre` / `nombre[op]` into field name and SQL comparison operator
fn separar_operador(clave: &str) -> AppResult<(&str, &'static str)> {
    let Some(inicio) = clave.find('[') else {
        return Ok((clave, "="));
    };
    if !clave.ends_with(']') {
        return Err(AppError::validation(format!(
            "Parámetro de filtro mal formado: {}",
            clave
        )));
    }
    let nombre = &clave[..inicio];
    let operador = match &clave[inicio + 1..clave.len() - 1] {
        "gte" => ">=",
        "gt" => ">",
        "lte" => "<=",
        "lt" => "<",
        otro => {
            return Err(AppError::validation(format!(
                "Operador de filtro no válido: {}",
                otro
            )))
        }
    };
    Ok((nombre, operador))
}

fn parsear_valor(campo: &CampoFiltro, crudo: &str) -> AppResult<Valor> {
    let invalido = || {
        AppError::validation(format!(
            "Valor no válido para el campo {}: {}",
            campo.nombre, crudo
        ))
    };
    match campo.tipo {
        TipoCampo::Texto => Ok(Valor::Texto(crudo.to_string())),
        TipoCampo::Entero => crudo.parse().map(Valor::Entero).map_err(|_| invalido()),
        TipoCampo::Decimal => crudo.parse().map(Valor::Decimal).map_err(|_| invalido()),
        TipoCampo::Fecha => crudo.parse().map(Valor::Fecha).map_err(|_| invalido()),
        TipoCampo::Booleano => match crudo {
            "true" => Ok(Valor::Booleano(true)),
            "false" => Ok(Valor::Booleano(false)),
            _ => Err(invalido()),
        },
    }
}

/// Comma-separated sort list, `-` prefix for descending
fn parsear_orden(lista: &str, espec: &EspecFiltros) -> AppResult<String> {
    let mut partes = Vec::new();
    for crudo in lista.split(',') {
        let crudo = crudo.trim();
        if crudo.is_empty() {
            continue;
        }
        let (nombre, direccion) = match crudo.strip_prefix('-') {
            Some(resto) => (resto, "DESC"),
            None => (crudo, "ASC"),
        };
        let columna = espec
            .orden
            .iter()
            .find(|(n, _)| *n == nombre)
            .map(|(_, c)| *c)
            .ok_or_else(|| {
                AppError::validation(format!("Campo de ordenamiento no válido: {}", nombre))
            })?;
        partes.push(format!("{} {}", columna, direccion));
    }
    if partes.is_empty() {
        return Err(AppError::validation("Lista de ordenamiento vacía"));
    }
    Ok(partes.join(", "))
}

/// First non-empty of the Spanish/English parameter pair
fn parametro_numerico(
    params: &HashMap<String, String>,
    espanol: &str,
    ingles: &str,
    defecto: i64,
) -> AppResult<i64> {
    let crudo = params
        .get(espanol)
        .or_else(|| params.get(ingles))
        .filter(|s| !s.trim().is_empty());
    match crudo {
        None => Ok(defecto),
        Some(s) => s.trim().parse().map_err(|_| {
            AppError::validation(format!(
                "El parámetro {} debe ser un número entero",
                espanol
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESPEC: EspecFiltros = EspecFiltros {
        campos: &[
            CampoFiltro {
                nombre: "estado",
                columna: "estado",
                tipo: TipoCampo::Texto,
            },
            CampoFiltro {
                nombre: "valorCompra",
                columna: "valor_compra",
                tipo: TipoCampo::Decimal,
            },
            CampoFiltro {
                nombre: "activo",
                columna: "activo",
                tipo: TipoCampo::Booleano,
            },
        ],
        busqueda: &["serial", "marca"],
        orden: &[("createdAt", "created_at"), ("marca", "marca")],
        orden_defecto: "created_at DESC",
    };

    fn params(pares: &[(&str, &str)]) -> HashMap<String, String> {
        pares
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sql_de(features: &ApiFeatures) -> String {
        let mut qb = QueryBuilder::new("SELECT * FROM equipos");
        features.aplicar_where(&mut qb);
        qb.sql().to_string()
    }

    #[test]
    fn claves_reservadas_no_filtran() {
        let features = ApiFeatures::desde_query(
            &params(&[("pagina", "2"), ("limite", "5"), ("sort", "marca")]),
            &ESPEC,
        )
        .unwrap();
        assert_eq!(sql_de(&features), "SELECT * FROM equipos");
        assert_eq!(features.pagina(), 2);
        assert_eq!(features.limite(), 5);
        assert_eq!(features.offset(), 5);
    }

    #[test]
    fn sufijo_de_operador_se_traduce() {
        let features = ApiFeatures::desde_query(
            &params(&[("valorCompra[gte]", "100"), ("estado", "Bodega")]),
            &ESPEC,
        )
        .unwrap();
        let sql = sql_de(&features);
        assert!(sql.contains("estado = $1"), "{}", sql);
        assert!(sql.contains("valor_compra >= $2"), "{}", sql);
    }

    #[test]
    fn operador_desconocido_es_rechazado() {
        let error = ApiFeatures::desde_query(&params(&[("valorCompra[ne]", "1")]), &ESPEC);
        assert!(error.is_err());
    }

    #[test]
    fn campo_desconocido_es_rechazado() {
        let error = ApiFeatures::desde_query(&params(&[("color", "rojo")]), &ESPEC);
        assert!(error.is_err());
    }

    #[test]
    fn busqueda_genera_bloque_or() {
        let features =
            ApiFeatures::desde_query(&params(&[("search", "dell")]), &ESPEC).unwrap();
        let sql = sql_de(&features);
        assert!(sql.contains("serial ILIKE $1 OR marca ILIKE $2"), "{}", sql);
    }

    #[test]
    fn orden_con_prefijo_descendente() {
        let features =
            ApiFeatures::desde_query(&params(&[("sort", "-createdAt,marca")]), &ESPEC).unwrap();
        assert_eq!(features.orden, "created_at DESC, marca ASC");
    }

    #[test]
    fn orden_por_defecto() {
        let features = ApiFeatures::desde_query(&params(&[]), &ESPEC).unwrap();
        assert_eq!(features.orden, "created_at DESC");
    }

    #[test]
    fn limite_se_acota_uniformemente() {
        let features = ApiFeatures::desde_query(&params(&[("limite", "500")]), &ESPEC).unwrap();
        assert_eq!(features.limite(), LIMITE_MAXIMO);
        let features = ApiFeatures::desde_query(&params(&[("limite", "0")]), &ESPEC).unwrap();
        assert_eq!(features.limite(), 1);
    }

    #[test]
    fn pagina_espanola_gana_sobre_inglesa() {
        let features =
            ApiFeatures::desde_query(&params(&[("pagina", "3"), ("page", "7")]), &ESPEC).unwrap();
        assert_eq!(features.pagina(), 3);
    }

    #[test]
    fn proyeccion_limita_campos() {
        let features =
            ApiFeatures::desde_query(&params(&[("fields", "serial,marca")]), &ESPEC).unwrap();
        let fila = serde_json::json!({"serial": "SN1", "marca": "Dell", "modelo": "X1"});
        let proyectada = features.proyectar(fila);
        assert_eq!(
            proyectada,
            serde_json::json!({"serial": "SN1", "marca": "Dell"})
        );
    }

    #[test]
    fn sin_fields_no_proyecta() {
        let features = ApiFeatures::desde_query(&params(&[]), &ESPEC).unwrap();
        let fila = serde_json::json!({"serial": "SN1", "marca": "Dell"});
        assert_eq!(features.proyectar(fila.clone()), fila);
    }
}
