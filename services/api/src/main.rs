use anyhow::Result;
use tracing::info;

use api::{
    config::{Settings, StorageBackend},
    jwt::JwtService,
    payment::PaymentClient,
    repositories::run_migrations,
    routes, AppState,
};
use common::database::{health_check, init_pool};

#[tokio::main]
async fn main() -> Result<()> {
    common::telemetry::init_tracing();

    info!("Starting API service");

    let settings = Settings::load()?;
    let jwt_service = JwtService::new(&settings.jwt)?;
    let payment_client = PaymentClient::new(settings.payment.clone());

    let app_state = match settings.storage {
        StorageBackend::Postgres => {
            let pool = init_pool(&settings.database).await?;

            // Check database connectivity
            if health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            run_migrations(&pool).await?;
            info!("Database migrations applied");

            AppState::postgres(pool, jwt_service, payment_client)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on shutdown");
            AppState::memory(jwt_service, payment_client)
        }
    };

    info!("API service initialized successfully");

    let app = routes::create_router(app_state);

    let address = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
