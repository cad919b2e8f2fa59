//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        equipo::Equipo,
        usuario::{ActualizarUsuario, CrearUsuario, Usuario, UserClaims, UsuarioStats},
    },
    query::ApiFeatures,
    repository::Repository,
};

/// Word-wise capitalization applied to names before persisting. Explicit
/// pipeline step, not a storage hook, so ordering stays visible and testable.
pub fn capitalizar_nombre(nombre: &str) -> String {
    nombre
        .split_whitespace()
        .map(|palabra| {
            let mut caracteres = palabra.chars();
            match caracteres.next() {
                Some(primera) => {
                    primera.to_uppercase().collect::<String>()
                        + &caracteres.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone)]
pub struct UsuariosService {
    repository: Repository,
    config: AuthConfig,
}

impl UsuariosService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by email and return a JWT token plus the user.
    /// Unknown email, inactive account and wrong password all answer with the
    /// same message so the response does not reveal which one failed.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, Usuario)> {
        let credenciales_invalidas =
            || AppError::Authentication("Email o contraseña incorrectos".to_string());

        let usuario = self
            .repository
            .usuarios
            .get_by_email(email)
            .await?
            .ok_or_else(credenciales_invalidas)?;

        if !usuario.activo {
            return Err(credenciales_invalidas());
        }

        if !self.verify_password(&usuario, password)? {
            return Err(credenciales_invalidas());
        }

        self.repository
            .usuarios
            .stamp_ultimo_acceso(usuario.id)
            .await?;

        let token = self.create_token(&usuario)?;
        Ok((token, usuario))
    }

    /// Register a new user and log them in
    pub async fn register(&self, mut usuario: CrearUsuario) -> AppResult<(String, Usuario)> {
        if self
            .repository
            .usuarios
            .id_usuario_exists(&usuario.id_usuario)
            .await?
        {
            return Err(AppError::Duplicate("El ID de usuario ya existe".to_string()));
        }
        if self
            .repository
            .usuarios
            .email_exists(&usuario.email, None)
            .await?
        {
            return Err(AppError::Duplicate("El email ya está registrado".to_string()));
        }

        // Normalization pipeline, in declared order
        usuario.nombre = capitalizar_nombre(&usuario.nombre);
        usuario.email = usuario.email.trim().to_lowercase();
        let hash = self.hash_password(&usuario.password)?;

        let creado = self.repository.usuarios.create(&usuario, &hash).await?;
        self.repository
            .usuarios
            .stamp_ultimo_acceso(creado.id)
            .await?;

        let token = self.create_token(&creado)?;
        Ok((token, creado))
    }

    /// Decode a token and return the user it references, if still valid
    pub async fn verify_token(&self, token: &str) -> AppResult<Usuario> {
        let claims = UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Token inválido".to_string()))?;

        let usuario = self.repository.usuarios.get_by_id(claims.user_id).await?;
        if !usuario.activo {
            return Err(AppError::Authentication("Usuario no válido".to_string()));
        }
        Ok(usuario)
    }

    /// Create a JWT token for a user
    pub fn create_token(&self, usuario: &Usuario) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: usuario.email.clone(),
            user_id: usuario.id,
            rol: usuario.rol,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("No fue posible crear el token: {}", e)))
    }

    /// Verify a password against the stored hash
    fn verify_password(&self, usuario: &Usuario, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&usuario.password)
            .map_err(|_| AppError::Internal("Hash de contraseña inválido".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("No fue posible hashear la contraseña: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Usuario> {
        self.repository.usuarios.get_by_id(id).await
    }

    /// Paginated user search
    pub async fn search(&self, features: &ApiFeatures) -> AppResult<(Vec<Usuario>, i64)> {
        self.repository.usuarios.search(features).await
    }

    /// Update an existing user
    pub async fn update(&self, id: i32, mut cambios: ActualizarUsuario) -> AppResult<Usuario> {
        self.repository.usuarios.get_by_id(id).await?;

        if let Some(email) = &cambios.email {
            if self.repository.usuarios.email_exists(email, Some(id)).await? {
                return Err(AppError::Duplicate(
                    "El email ya está en uso por otro usuario".to_string(),
                ));
            }
        }

        if let Some(nombre) = &cambios.nombre {
            cambios.nombre = Some(capitalizar_nombre(nombre));
        }
        if let Some(email) = &cambios.email {
            cambios.email = Some(email.trim().to_lowercase());
        }
        let hash = match &cambios.password {
            Some(password) => Some(self.hash_password(password)?),
            None => None,
        };

        self.repository.usuarios.update(id, &cambios, hash).await
    }

    /// Soft-delete a user; blocked while they hold an active assignment
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        self.repository.usuarios.get_by_id(id).await?;

        if self.repository.asignaciones.usuario_tiene_activa(id).await? {
            return Err(AppError::BadRequest(
                "No se puede desactivar el usuario mientras tenga una asignación activa"
                    .to_string(),
            ));
        }

        self.repository.usuarios.soft_delete(id).await
    }

    /// Permanently remove a user; same active-assignment guard
    pub async fn hard_delete(&self, id: i32) -> AppResult<()> {
        self.repository.usuarios.get_by_id(id).await?;

        if self.repository.asignaciones.usuario_tiene_activa(id).await? {
            return Err(AppError::BadRequest(
                "No se puede eliminar el usuario mientras tenga una asignación activa".to_string(),
            ));
        }

        self.repository.usuarios.hard_delete(id).await
    }

    /// Reactivate a soft-deleted user
    pub async fn reactivate(&self, id: i32) -> AppResult<Usuario> {
        self.repository.usuarios.reactivate(id).await
    }

    /// Aggregate user counts
    pub async fn stats(&self) -> AppResult<UsuarioStats> {
        self.repository.usuarios.stats().await
    }

    /// Equipment currently assigned to a user
    pub async fn equipos_asignados(&self, id: i32) -> AppResult<Vec<Equipo>> {
        self.repository.usuarios.get_by_id(id).await?;
        self.repository.equipos.asignados_a_usuario(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitaliza_cada_palabra() {
        assert_eq!(capitalizar_nombre("juan pérez"), "Juan Pérez");
        assert_eq!(capitalizar_nombre("MARIA GOMEZ"), "Maria Gomez");
        assert_eq!(capitalizar_nombre("ana"), "Ana");
    }

    #[test]
    fn capitaliza_normaliza_espacios() {
        assert_eq!(capitalizar_nombre("  luis   rojas  "), "Luis Rojas");
        assert_eq!(capitalizar_nombre(""), "");
    }
}
