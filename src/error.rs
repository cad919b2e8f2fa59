//! Error types for the Activos server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use once_cell::sync::OnceCell;
use serde_json::json;
use thiserror::Error;

/// Run mode the process was started with, set once from the loaded
/// configuration. Controls whether error responses carry internal detail.
static RUN_MODE: OnceCell<String> = OnceCell::new();

/// Record the run mode for error rendering. Later calls are ignored.
pub fn set_run_mode(mode: &str) {
    let _ = RUN_MODE.set(mode.to_string());
}

fn is_production() -> bool {
    RUN_MODE.get().map(|m| m == "production").unwrap_or(false)
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error")]
    Validation(Vec<String>),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Single-message validation failure
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(vec![msg.into()])
    }

    /// Map a unique-index violation to the field it guards, so duplicate-key
    /// conflicts come back as a 400 naming the offending field.
    fn duplicate_field(constraint: &str) -> Option<&'static str> {
        match constraint {
            "uniq_usuarios_email" => Some("email"),
            "uniq_usuarios_id_usuario" => Some("idUsuario"),
            "uniq_equipos_serial" => Some("serial"),
            "uniq_equipos_id_equipo" => Some("idEquipo"),
            "uniq_asignacion_activa" => Some("equipo"),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, detail): (StatusCode, serde_json::Value, Option<String>) =
            match &self {
                AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, json!(msg), None),
                AppError::Authorization(msg) => (StatusCode::FORBIDDEN, json!(msg), None),
                AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!(msg), None),
                AppError::Validation(msgs) => (StatusCode::BAD_REQUEST, json!(msgs), None),
                AppError::Duplicate(msg) => (StatusCode::BAD_REQUEST, json!(msg), None),
                AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!(msg), None),
                AppError::Database(e) => match e {
                    sqlx::Error::RowNotFound => {
                        (StatusCode::NOT_FOUND, json!("Recurso no encontrado"), None)
                    }
                    sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                        let msg = db
                            .constraint()
                            .and_then(Self::duplicate_field)
                            .map(|campo| format!("El {} ya existe", campo))
                            .unwrap_or_else(|| "El registro ya existe".to_string());
                        (StatusCode::BAD_REQUEST, json!(msg), None)
                    }
                    _ => {
                        tracing::error!("Database error: {:?}", e);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            json!("Error de base de datos"),
                            Some(format!("{:?}", e)),
                        )
                    }
                },
                AppError::Internal(msg) => {
                    tracing::error!("Internal error: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!("Error interno del servidor"),
                        Some(msg.clone()),
                    )
                }
            };

        let mut body = json!({
            "success": false,
            "message": message,
            "timestamp": Utc::now().to_rfc3339(),
        });

        // Internal detail leaves the process only outside production
        if !is_production() {
            if let Some(detail) = detail {
                body["stack"] = json!(detail);
            }
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Collect `validator` failures into the error-list shape the API reports.
pub fn validation_errors(errors: &validator::ValidationErrors) -> AppError {
    let mut messages: Vec<String> = Vec::new();
    for (field, errs) in errors.field_errors() {
        for err in errs {
            let msg = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("El campo {} no es válido", field));
            messages.push(msg);
        }
    }
    messages.sort();
    AppError::Validation(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_constraint_maps_to_field() {
        assert_eq!(AppError::duplicate_field("uniq_equipos_serial"), Some("serial"));
        assert_eq!(AppError::duplicate_field("uniq_usuarios_email"), Some("email"));
        assert_eq!(AppError::duplicate_field("pk_something"), None);
    }
}
