//! Shared application state.

use domain_users::ChangeNotifier;

/// Cloned into every router that needs it; all fields are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    pub db: database::postgres::DatabaseConnection,
    /// Kept so shutdown can flush pending messages
    pub nats: Option<async_nats::Client>,
    pub notifier: ChangeNotifier,
}
