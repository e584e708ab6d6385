use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use trackshift::configuration::get_configuration;
use trackshift::startup::{run, AuthComponents};
use trackshift::telemetry::init_telemetry;
use trackshift::users::PgUserRepository;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = get_configuration().map_err(|e| {
        tracing::error!("Failed to read configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    let users = Arc::new(PgUserRepository::new(pool));

    // Refuse to serve with missing or weak secrets
    let components = AuthComponents::build(users, &configuration).map_err(|e| {
        tracing::error!("Invalid authentication settings: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!(
        address = %address,
        environment = ?configuration.application.environment,
        "Server listening"
    );

    run(listener, components)?.await
}
