//! Users Domain
//!
//! A directory of user records with unique emails.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, hypermedia links
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌────────────────┐
//! │   Service   │ ──▶ │ ChangeNotifier │  ← best-effort create/delete events
//! └──────┬──────┘     └────────────────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← in-memory or PostgreSQL
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_users::{handlers, InMemoryUserRepository, UserService};
//!
//! let service = UserService::new(InMemoryUserRepository::new());
//! let router = handlers::router(service);
//! ```

pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod validation;

pub use error::{UserError, UserResult};
pub use events::{ChangeNotifier, EventPublisher, PublishError, UserEvent, UserEventType};
pub use handlers::{ApiDoc, BASE_PATH};
pub use models::{Link, NewUser, SearchParams, User, UserRequest, UserResource};
pub use postgres::PgUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
pub use validation::{FieldError, FieldErrors, validate_collect_all, validate_fail_fast};
