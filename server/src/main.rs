use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use tickets_server::config::Config;
use tickets_server::logging;
use tickets_server::repository::PgUnitOfWorkProvider;
use tickets_server::routes::create_routes;
use tickets_server::service::OrderService;
use tickets_server::state::AppState;
use tickets_server::MIGRATOR;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let config = Config::from_env()?;
    tracing::dispatcher::set_global_default(logging::build_dispatch(&config.logging)?)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout)
        .connect(&config.database.url)
        .await?;

    tracing::info!("Successfully connected to database");

    if config.database.run_migrations {
        MIGRATOR.run(&pool).await?;
        tracing::info!("Migrations run successfully");
    }

    let store = PgUnitOfWorkProvider::new(pool, config.database.lock_timeout);
    let orders = OrderService::new(store, config.orders);
    let app = create_routes(AppState::new(orders), &config);

    let addr = config.server.socket_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        max_tickets_per_order = config.orders.max_tickets_per_order,
        "Server running at http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
