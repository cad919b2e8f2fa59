//! Activos Server - IT Asset Tracking System
//!
//! A Rust REST API server for managing users, equipment and assignments.

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use activos_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");
    activos_server::error::set_run_mode(&config.run_mode);

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            format!("activos_server={},tower_http=debug", config.logging.level).into()
        });

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Activos Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool);
    let services = Services::new(repository, config.auth.clone());

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration from the allowed-origins list; an empty list keeps
    // the permissive development default
    let cors = if state.config.cors.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors
            .allowed_origins
            .iter()
            .filter_map(|origen| origen.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Login throttling
    let governor_conf = Box::new(
        GovernorConfigBuilder::default()
            .per_second(state.config.limits.login_per_seconds)
            .burst_size(state.config.limits.login_burst)
            .finish()
            .expect("Invalid rate limit configuration"),
    );
    let login_routes: Router<AppState> = Router::new()
        .route("/auth/login", post(api::auth::login))
        .layer(GovernorLayer {
            config: Box::leak(governor_conf),
        });

    let api_routes = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .merge(login_routes)
        .route("/auth/register", post(api::auth::register))
        .route("/auth/logout", post(api::auth::logout))
        .route("/auth/verify-token", post(api::auth::verify_token))
        .route("/auth/me", get(api::auth::me))
        // Usuarios
        .route("/users", get(api::usuarios::list_usuarios))
        .route("/users", post(api::usuarios::create_usuario))
        .route("/users/stats", get(api::usuarios::stats_usuarios))
        .route("/users/:id", get(api::usuarios::get_usuario))
        .route("/users/:id", put(api::usuarios::update_usuario))
        .route("/users/:id", delete(api::usuarios::delete_usuario))
        .route(
            "/users/:id/permanent",
            delete(api::usuarios::delete_usuario_permanente),
        )
        .route(
            "/users/:id/reactivar",
            patch(api::usuarios::reactivar_usuario),
        )
        .route("/users/:id/equipos", get(api::usuarios::equipos_de_usuario))
        // Equipos
        .route("/equipos", get(api::equipos::list_equipos))
        .route("/equipos", post(api::equipos::create_equipo))
        .route("/equipos/search", get(api::equipos::search_equipos))
        .route("/equipos/migrar-ids", post(api::equipos::migrar_ids))
        .route("/equipos/stats/estados", get(api::equipos::stats_por_estado))
        .route(
            "/equipos/estado/:estado",
            get(api::equipos::equipos_por_estado),
        )
        .route(
            "/equipos/serial/:serial",
            get(api::equipos::equipo_por_serial),
        )
        .route("/equipos/:id", get(api::equipos::get_equipo))
        .route("/equipos/:id", put(api::equipos::update_equipo))
        .route("/equipos/:id", delete(api::equipos::delete_equipo))
        .route("/equipos/:id/historial", get(api::equipos::historial_equipo))
        // Asignaciones
        .route("/asignaciones", post(api::asignaciones::crear_asignacion))
        .route("/asignaciones", get(api::asignaciones::list_asignaciones))
        .route("/asignaciones/:id", get(api::asignaciones::get_asignacion))
        .route(
            "/asignaciones/:id",
            put(api::asignaciones::finalizar_asignacion),
        )
        .route(
            "/asignaciones/usuario/:usuarioId",
            get(api::asignaciones::asignaciones_por_usuario),
        )
        .route(
            "/asignaciones/equipo/:equipoId",
            get(api::asignaciones::historial_por_equipo),
        )
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .route("/health", get(api::health::health_check))
        .with_state(state.clone())
        .nest("/api", api_routes)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(state.config.limits.body_limit_bytes))
        .layer(cors)
}

/// Resolve on SIGINT or SIGTERM so the listener drains before exiting
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
