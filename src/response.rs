//! Uniform JSON response envelope

use axum::{http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Envelope message: a single string or a list (validation errors)
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Mensaje {
    Uno(String),
    Varios(Vec<String>),
}

impl From<&str> for Mensaje {
    fn from(s: &str) -> Self {
        Mensaje::Uno(s.to_string())
    }
}

impl From<String> for Mensaje {
    fn from(s: String) -> Self {
        Mensaje::Uno(s)
    }
}

impl From<Vec<String>> for Mensaje {
    fn from(v: Vec<String>) -> Self {
        Mensaje::Varios(v)
    }
}

/// Envelope wrapping every successful response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Mensaje,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// 200 envelope with data
    pub fn exito(data: T, message: impl Into<Mensaje>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
            timestamp: Utc::now(),
        })
    }

    /// 201 envelope with data
    pub fn creado(data: T, message: impl Into<Mensaje>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::CREATED,
            Json(Self {
                success: true,
                message: message.into(),
                data: Some(data),
                timestamp: Utc::now(),
            }),
        )
    }

    /// Envelope without data (deletes, logout)
    pub fn sin_datos(message: impl Into<Mensaje>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: None,
            timestamp: Utc::now(),
        })
    }
}

/// Pagination metadata attached to list payloads
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginacion {
    pub pagina: i64,
    pub limite: i64,
    pub total_paginas: i64,
    pub total: i64,
}

impl Paginacion {
    /// Build metadata for a page. `total` must be counted under the same
    /// filter the page itself was fetched with.
    pub fn new(pagina: i64, limite: i64, total: i64) -> Self {
        let total_paginas = if limite > 0 {
            (total + limite - 1) / limite
        } else {
            0
        };
        Self {
            pagina,
            limite,
            total_paginas,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_paginas_redondea_hacia_arriba() {
        assert_eq!(Paginacion::new(1, 5, 12).total_paginas, 3);
        assert_eq!(Paginacion::new(1, 5, 10).total_paginas, 2);
        assert_eq!(Paginacion::new(1, 10, 0).total_paginas, 0);
        assert_eq!(Paginacion::new(1, 10, 1).total_paginas, 1);
    }

    #[test]
    fn mensaje_serializa_plano_o_lista() {
        let uno = serde_json::to_value(Mensaje::from("ok")).unwrap();
        assert_eq!(uno, serde_json::json!("ok"));
        let varios = serde_json::to_value(Mensaje::from(vec!["a".to_string(), "b".to_string()]))
            .unwrap();
        assert_eq!(varios, serde_json::json!(["a", "b"]));
    }
}
