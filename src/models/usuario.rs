//! Usuario model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::query::{CampoFiltro, EspecFiltros, TipoCampo};

/// System role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Rol {
    User,
    Admin,
    Tecnico,
}

impl Rol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rol::User => "user",
            Rol::Admin => "admin",
            Rol::Tecnico => "tecnico",
        }
    }
}

impl std::fmt::Display for Rol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Rol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Rol::User),
            "admin" => Ok(Rol::Admin),
            "tecnico" => Ok(Rol::Tecnico),
            _ => Err(format!("Rol no válido: {}", s)),
        }
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct UsuarioRow {
    id: i32,
    id_usuario: String,
    nombre: String,
    email: String,
    password: String,
    cargo: Option<String>,
    sede: Option<String>,
    gerencia: Option<String>,
    rol: String,
    activo: bool,
    ultimo_acceso: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UsuarioRow> for Usuario {
    fn from(row: UsuarioRow) -> Self {
        Usuario {
            id: row.id,
            id_usuario: row.id_usuario,
            nombre: row.nombre,
            email: row.email,
            password: row.password,
            cargo: row.cargo,
            sede: row.sede,
            gerencia: row.gerencia,
            rol: row.rol.parse().unwrap_or(Rol::User),
            activo: row.activo,
            ultimo_acceso: row.ultimo_acceso,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Full user model
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Usuario {
    pub id: i32,
    /// Human-facing unique identifier
    pub id_usuario: String,
    pub nombre: String,
    pub email: String,
    /// Argon2 hash, never serialized
    #[serde(skip_serializing)]
    pub password: String,
    pub cargo: Option<String>,
    pub sede: Option<String>,
    pub gerencia: Option<String>,
    pub rol: Rol,
    pub activo: bool,
    pub ultimo_acceso: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Register / create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrearUsuario {
    #[validate(length(min = 3, message = "El idUsuario debe tener al menos 3 caracteres"))]
    pub id_usuario: String,
    #[validate(length(
        min = 2,
        max = 50,
        message = "El nombre debe tener entre 2 y 50 caracteres"
    ))]
    pub nombre: String,
    #[validate(email(message = "El formato del email es inválido"))]
    pub email: String,
    #[validate(length(min = 8, message = "La contraseña debe tener al menos 8 caracteres"))]
    pub password: String,
    pub cargo: Option<String>,
    pub sede: Option<String>,
    pub gerencia: Option<String>,
    pub rol: Option<Rol>,
}

/// Update user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActualizarUsuario {
    #[validate(length(
        min = 2,
        max = 50,
        message = "El nombre debe tener entre 2 y 50 caracteres"
    ))]
    pub nombre: Option<String>,
    #[validate(email(message = "El formato del email es inválido"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "La contraseña debe tener al menos 8 caracteres"))]
    pub password: Option<String>,
    pub cargo: Option<String>,
    pub sede: Option<String>,
    pub gerencia: Option<String>,
    pub rol: Option<Rol>,
    pub activo: Option<bool>,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct Credenciales {
    #[validate(email(message = "El formato del email es inválido"))]
    pub email: String,
    #[validate(length(min = 1, message = "La contraseña es obligatoria"))]
    pub password: String,
}

/// User statistics payload
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsuarioStats {
    pub total: i64,
    pub activos: i64,
    pub inactivos: i64,
    pub por_rol: PorRol,
    pub porcentaje_activos: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PorRol {
    pub admin: i64,
    pub tecnico: i64,
    pub user: i64,
}

/// JWT claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub rol: Rol,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.rol == Rol::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Se requieren privilegios de administrador".to_string(),
            ))
        }
    }

    /// Require asset-management privileges (admin or tecnico)
    pub fn require_gestor(&self) -> Result<(), AppError> {
        match self.rol {
            Rol::Admin | Rol::Tecnico => Ok(()),
            Rol::User => Err(AppError::Authorization(
                "No tienes permisos para realizar esta acción".to_string(),
            )),
        }
    }
}

/// Filterable surface of the usuarios listing
pub const ESPEC_FILTROS_USUARIOS: EspecFiltros = EspecFiltros {
    campos: &[
        CampoFiltro {
            nombre: "activo",
            columna: "activo",
            tipo: TipoCampo::Booleano,
        },
        CampoFiltro {
            nombre: "rol",
            columna: "rol",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "cargo",
            columna: "cargo",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "sede",
            columna: "sede",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "gerencia",
            columna: "gerencia",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "email",
            columna: "email",
            tipo: TipoCampo::Texto,
        },
        CampoFiltro {
            nombre: "idUsuario",
            columna: "id_usuario",
            tipo: TipoCampo::Texto,
        },
    ],
    busqueda: &["nombre", "email", "id_usuario", "cargo"],
    orden: &[
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
        ("nombre", "nombre"),
        ("email", "email"),
        ("ultimoAcceso", "ultimo_acceso"),
    ],
    orden_defecto: "created_at DESC",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_roundtrip() {
        let claims = UserClaims {
            sub: "ana@example.com".to_string(),
            user_id: 7,
            rol: Rol::Tecnico,
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
        };
        let token = claims.create_token("secreto").unwrap();
        let decodificado = UserClaims::from_token(&token, "secreto").unwrap();
        assert_eq!(decodificado.user_id, 7);
        assert_eq!(decodificado.rol, Rol::Tecnico);
    }

    #[test]
    fn token_con_secreto_incorrecto_falla() {
        let claims = UserClaims {
            sub: "ana@example.com".to_string(),
            user_id: 7,
            rol: Rol::User,
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
        };
        let token = claims.create_token("secreto").unwrap();
        assert!(UserClaims::from_token(&token, "otro").is_err());
    }

    #[test]
    fn gates_por_rol() {
        let base = UserClaims {
            sub: "x".to_string(),
            user_id: 1,
            rol: Rol::User,
            exp: 0,
            iat: 0,
        };
        assert!(base.require_gestor().is_err());
        assert!(base.require_admin().is_err());

        let tecnico = UserClaims {
            rol: Rol::Tecnico,
            ..base.clone()
        };
        assert!(tecnico.require_gestor().is_ok());
        assert!(tecnico.require_admin().is_err());

        let admin = UserClaims {
            rol: Rol::Admin,
            ..base
        };
        assert!(admin.require_gestor().is_ok());
        assert!(admin.require_admin().is_ok());
    }
}
