//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{asignaciones, auth, equipos, health, usuarios};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Activos API",
        version = "1.0.0",
        description = "IT Asset Tracking REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Activos Team")
    ),
    servers(
        (url = "/api", description = "API root")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::logout,
        auth::verify_token,
        auth::me,
        // Usuarios
        usuarios::list_usuarios,
        usuarios::get_usuario,
        usuarios::create_usuario,
        usuarios::update_usuario,
        usuarios::delete_usuario,
        usuarios::delete_usuario_permanente,
        usuarios::reactivar_usuario,
        usuarios::stats_usuarios,
        usuarios::equipos_de_usuario,
        // Equipos
        equipos::list_equipos,
        equipos::search_equipos,
        equipos::get_equipo,
        equipos::create_equipo,
        equipos::update_equipo,
        equipos::delete_equipo,
        equipos::equipos_por_estado,
        equipos::equipo_por_serial,
        equipos::stats_por_estado,
        equipos::historial_equipo,
        equipos::migrar_ids,
        // Asignaciones
        asignaciones::crear_asignacion,
        asignaciones::list_asignaciones,
        asignaciones::get_asignacion,
        asignaciones::finalizar_asignacion,
        asignaciones::asignaciones_por_usuario,
        asignaciones::historial_por_equipo,
    ),
    components(
        schemas(
            // Auth
            auth::SesionData,
            auth::VerificacionData,
            auth::UsuarioConEquipos,
            // Usuarios
            crate::models::usuario::Usuario,
            crate::models::usuario::CrearUsuario,
            crate::models::usuario::ActualizarUsuario,
            crate::models::usuario::Credenciales,
            crate::models::usuario::UsuarioStats,
            crate::models::usuario::PorRol,
            crate::models::usuario::Rol,
            // Equipos
            crate::models::equipo::Equipo,
            crate::models::equipo::CrearEquipo,
            crate::models::equipo::ActualizarEquipo,
            crate::models::equipo::TipoEquipo,
            crate::models::equipo::Estado,
            crate::models::equipo::Garantia,
            crate::models::equipo::Especificaciones,
            crate::models::equipo::EstadisticaEstado,
            equipos::MigracionIds,
            // Asignaciones
            crate::models::asignacion::Asignacion,
            crate::models::asignacion::Accesorios,
            crate::models::asignacion::CrearAsignacion,
            crate::models::asignacion::FinalizarAsignacion,
            crate::models::asignacion::AsignacionDetalle,
            crate::models::asignacion::AsignacionConUsuario,
            crate::models::asignacion::AsignacionConEquipo,
            crate::models::asignacion::UsuarioResumen,
            crate::models::asignacion::EquipoResumen,
            // Envelope
            crate::response::Mensaje,
            crate::response::Paginacion,
            // Health
            health::HealthResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User management"),
        (name = "equipos", description = "Equipment management"),
        (name = "asignaciones", description = "Assignment management")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
