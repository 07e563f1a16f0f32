use axum_helpers::cors_layer_from_env;
use axum_helpers::server::create_production_app;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::ChangeNotifier;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod app;
mod config;
mod events;
mod openapi;
mod state;

use config::Config;
use events::NatsEventPublisher;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Before any fallible operation, so startup errors are colored too
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    observability::init_metrics().map_err(|e| eyre::eyre!("Metrics recorder failed: {}", e))?;

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    database::postgres::run_migrations::<migration::Migrator>(&db, config.app.name)
        .await
        .map_err(|e| eyre::eyre!("Migrations failed: {}", e))?;

    // Notifications are optional; an unreachable broker only disables them
    let nats = match &config.nats_url {
        Some(url) => {
            info!(url = %url, "Connecting to NATS");
            match async_nats::connect(url.as_str()).await {
                Ok(client) => {
                    info!(topic = %config.events_topic, "NATS connected, user events enabled");
                    Some(client)
                }
                Err(e) => {
                    warn!(error = %e, "Failed to connect to NATS, user events disabled");
                    None
                }
            }
        }
        None => {
            info!("NATS_URL not set, user events disabled");
            None
        }
    };

    let notifier = match &nats {
        Some(client) => ChangeNotifier::new(
            Arc::new(NatsEventPublisher::new(client.clone())),
            config.events_topic.clone(),
        ),
        None => ChangeNotifier::disabled(),
    };

    let cors = cors_layer_from_env(&config.environment)?;

    let state = AppState {
        config,
        db,
        nats,
        notifier,
    };

    let app = app::build_app(
        state.config.app.clone(),
        api::routes(&state),
        api::ready_router(state.clone()),
        cors,
    );

    info!(
        name = state.config.app.name,
        version = state.config.app.version,
        "Starting user directory"
    );

    let server = state.config.server.clone();
    create_production_app(app, &server, async move {
        if let Some(client) = &state.nats {
            match client.flush().await {
                Ok(()) => info!("NATS client flushed"),
                Err(e) => tracing::error!(error = %e, "Error flushing NATS client"),
            }
        }

        info!("Closing database connections");
        match state.db.close().await {
            Ok(()) => info!("PostgreSQL connection closed"),
            Err(e) => tracing::error!(error = %e, "Error closing PostgreSQL"),
        }
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("User directory shutdown complete");
    Ok(())
}
