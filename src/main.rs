use school_portal::{
    AppState, BcryptHasher, HasherState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    seed::seed_database,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Startup order: configuration (fail-fast), logging, database and migrations, optional
/// seeding, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration. Panics when JWT_SECRET or DATABASE_URL is missing.
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging. RUST_LOG wins over the defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "school_portal=debug,tower_http=info,axum=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to apply database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
    let hasher = Arc::new(BcryptHasher::default()) as HasherState;

    // 4. Sample data. A failure here is logged; the server still starts.
    if config.seed_database {
        if let Err(e) = seed_database(repo.as_ref(), hasher.as_ref()).await {
            tracing::error!(error = %e, "failed to seed database");
        }
    }

    // 5. Router and server.
    let port = config.port;
    let app = create_router(AppState::new(config, repo, hasher));

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: could not bind {addr}: {e}"));

    tracing::info!("Listening on {addr}");
    tracing::info!(
        "API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui"
    );

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server terminated");
    }
}
